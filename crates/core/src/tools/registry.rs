// crates/core/src/tools/registry.rs
//! Declarative tool catalogue: names, descriptions, parameter schemas,
//! and category tags. The registry decides which subset a chat request
//! exposes to the model.

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::llm::ToolSpec;

/// Shared schema fragment: `project_id` accepts an integer tracker id or a
/// string slug/display name.
fn project_id_schema() -> Value {
    json!({
        "type": ["integer", "string"],
        "description": "Project as integer tracker id or string slug/display name"
    })
}

/// Tool groupings used by phase-1 category selection. A closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolCategory {
    TrackerCore,
    TrackerAnalytics,
    CacheControl,
}

impl ToolCategory {
    pub const ALL: [ToolCategory; 3] = [
        ToolCategory::TrackerCore,
        ToolCategory::TrackerAnalytics,
        ToolCategory::CacheControl,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolCategory::TrackerCore => "tracker-core",
            ToolCategory::TrackerAnalytics => "tracker-analytics",
            ToolCategory::CacheControl => "cache-control",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "tracker-core" => Some(ToolCategory::TrackerCore),
            "tracker-analytics" => Some(ToolCategory::TrackerAnalytics),
            "cache-control" => Some(ToolCategory::CacheControl),
            _ => None,
        }
    }
}

impl std::fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-deployment category toggles, as sent in `enabledTools`. Categories
/// absent from the map default to enabled.
#[derive(Debug, Clone, Default)]
pub struct EnabledCategories(HashMap<String, bool>);

impl EnabledCategories {
    pub fn new(map: HashMap<String, bool>) -> Self {
        Self(map)
    }

    pub fn is_enabled(&self, category: ToolCategory) -> bool {
        self.0.get(category.as_str()).copied().unwrap_or(true)
    }

    /// Enabled categories in declaration order.
    pub fn enabled(&self) -> Vec<ToolCategory> {
        ToolCategory::ALL
            .into_iter()
            .filter(|c| self.is_enabled(*c))
            .collect()
    }
}

/// One tool in the catalogue.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub category: ToolCategory,
    schema: fn() -> Value,
}

impl ToolDescriptor {
    pub fn input_schema(&self) -> Value {
        (self.schema)()
    }

    /// Wire shape for the model.
    pub fn to_spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.to_string(),
            description: self.description.to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// The static tool catalogue.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    /// The built-in catalogue for the gateway.
    pub fn builtin() -> Self {
        Self { tools: builtin_tools() }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Tools in a category that the deployer has enabled.
    pub fn tools_for_category(
        &self,
        category: ToolCategory,
        enabled: &EnabledCategories,
    ) -> Vec<&ToolDescriptor> {
        if !enabled.is_enabled(category) {
            return Vec::new();
        }
        self.tools.iter().filter(|t| t.category == category).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn only_project() -> Value {
    json!({
        "type": "object",
        "properties": {"project_id": project_id_schema()},
        "required": ["project_id"]
    })
}

fn builtin_tools() -> Vec<ToolDescriptor> {
    vec![
        // ── tracker-core ────────────────────────────────────────────────
        ToolDescriptor {
            name: "list_issues",
            description: "List issues matching filters (project, status, tracker, priority, assignee, version). Returns up to 100 rows plus the total count.",
            category: ToolCategory::TrackerCore,
            schema: || json!({
                "type": "object",
                "properties": {
                    "project_id": project_id_schema(),
                    "status": {"type": "string", "enum": ["open", "closed", "all"]},
                    "tracker": {"type": "string", "description": "Tracker name, e.g. bug, feature, story"},
                    "priority": {"type": "string", "description": "Priority name, e.g. high, urgent"},
                    "assigned_to_id": {"type": "integer"},
                    "version": {"type": "string", "description": "Fixed version (sprint) name"},
                    "limit": {"type": "integer", "minimum": 1, "maximum": 100}
                },
                "required": ["project_id"]
            }),
        },
        ToolDescriptor {
            name: "get_issue",
            description: "Fetch a single issue by id, including its change journal.",
            category: ToolCategory::TrackerCore,
            schema: || json!({
                "type": "object",
                "properties": {"issue_id": {"type": "integer"}},
                "required": ["issue_id"]
            }),
        },
        ToolDescriptor {
            name: "list_projects",
            description: "List all projects visible to the gateway credential.",
            category: ToolCategory::TrackerCore,
            schema: || json!({"type": "object", "properties": {}}),
        },
        ToolDescriptor {
            name: "list_versions",
            description: "List versions (sprints) for a project.",
            category: ToolCategory::TrackerCore,
            schema: only_project,
        },
        // ── tracker-analytics ───────────────────────────────────────────
        ToolDescriptor {
            name: "sprint_status",
            description: "Sprint status for a version: committed/completed/blocked counts, completion percentage, and burndown assessment.",
            category: ToolCategory::TrackerAnalytics,
            schema: || json!({
                "type": "object",
                "properties": {
                    "project_id": project_id_schema(),
                    "version": {"type": "string", "description": "Sprint (version) name; defaults to the current sprint"}
                },
                "required": ["project_id"]
            }),
        },
        ToolDescriptor {
            name: "backlog_analytics",
            description: "Backlog health: open totals, priority mix, estimation coverage, aging, and this month's churn.",
            category: ToolCategory::TrackerAnalytics,
            schema: only_project,
        },
        ToolDescriptor {
            name: "team_workload",
            description: "Open issues per assignee, unassigned count, and overloaded members.",
            category: ToolCategory::TrackerAnalytics,
            schema: only_project,
        },
        ToolDescriptor {
            name: "cycle_time",
            description: "Lead time and cycle time averages over closed issues, plus the reopened-ticket rate.",
            category: ToolCategory::TrackerAnalytics,
            schema: only_project,
        },
        ToolDescriptor {
            name: "bug_analytics",
            description: "Bug metrics: open/closed totals, critical open bugs, bug-to-story ratio, average resolution time.",
            category: ToolCategory::TrackerAnalytics,
            schema: only_project,
        },
        ToolDescriptor {
            name: "release_status",
            description: "Completion status per release. Give a version name for one release, or just the project for all of them.",
            category: ToolCategory::TrackerAnalytics,
            schema: || json!({
                "type": "object",
                "properties": {
                    "project_id": project_id_schema(),
                    "version": {"type": "string"}
                },
                "required": ["project_id"]
            }),
        },
        ToolDescriptor {
            name: "velocity_trend",
            description: "Completed issues per sprint over the most recent closed sprints, with the trend direction.",
            category: ToolCategory::TrackerAnalytics,
            schema: || json!({
                "type": "object",
                "properties": {
                    "project_id": project_id_schema(),
                    "sprints": {"type": "integer", "minimum": 1, "default": 5}
                },
                "required": ["project_id"]
            }),
        },
        ToolDescriptor {
            name: "throughput",
            description: "Issues created vs. closed per ISO week over the last N weeks.",
            category: ToolCategory::TrackerAnalytics,
            schema: || json!({
                "type": "object",
                "properties": {
                    "project_id": project_id_schema(),
                    "weeks": {"type": "integer", "minimum": 1, "default": 4}
                },
                "required": ["project_id"]
            }),
        },
        ToolDescriptor {
            name: "tasks_in_progress",
            description: "Count of open issues currently in progress.",
            category: ToolCategory::TrackerAnalytics,
            schema: only_project,
        },
        ToolDescriptor {
            name: "blocked_tasks",
            description: "Count of open issues sitting in the blocked status.",
            category: ToolCategory::TrackerAnalytics,
            schema: only_project,
        },
        ToolDescriptor {
            name: "get_bug_count",
            description: "Exact live bug count straight from the tracker, bypassing the analytics cache.",
            category: ToolCategory::TrackerAnalytics,
            schema: || json!({
                "type": "object",
                "properties": {
                    "project_id": project_id_schema(),
                    "scope": {"type": "string", "enum": ["open", "closed", "all"], "default": "open"}
                },
                "required": ["project_id"]
            }),
        },
        ToolDescriptor {
            name: "get_sprint_issue_count",
            description: "Exact live issue count for one sprint (version), straight from the tracker.",
            category: ToolCategory::TrackerAnalytics,
            schema: || json!({
                "type": "object",
                "properties": {
                    "project_id": project_id_schema(),
                    "version": {"type": "string"}
                },
                "required": ["project_id", "version"]
            }),
        },
        ToolDescriptor {
            name: "get_backlog_count",
            description: "Exact live count of open issues in a project, straight from the tracker.",
            category: ToolCategory::TrackerAnalytics,
            schema: only_project,
        },
        // ── cache-control ───────────────────────────────────────────────
        ToolDescriptor {
            name: "cache_control",
            description: "Control the analytics cache: turn it on or off, refresh it, or report its status.",
            category: ToolCategory::CacheControl,
            schema: || json!({
                "type": "object",
                "properties": {
                    "action": {"type": "string", "enum": ["on", "off", "refresh", "status"]}
                },
                "required": ["action"]
            }),
        },
    ]
}
