// crates/core/src/lib.rs
pub mod analytics;
pub mod cache;
pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod redmine;
pub mod tools;

pub use config::{Config, ConfigError, ProjectIdent};
pub use error::*;
