// crates/core/src/redmine/mod.rs
//! HTTP client for the Redmine-style tracker REST surface.

pub mod client;
pub mod types;

pub use client::{IssueFetch, RedmineClient};
pub use types::{EnumKind, EnumValue, IssueFilters, StatusChange, StatusFilter};
