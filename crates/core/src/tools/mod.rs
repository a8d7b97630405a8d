// crates/core/src/tools/mod.rs
//! Tool catalogue and dispatch.

pub mod executor;
pub mod registry;

pub use executor::ToolExecutor;
pub use registry::{EnabledCategories, ToolCategory, ToolDescriptor, ToolRegistry};
