// crates/types/src/lib.rs
//! Shared plain types for the redmine-copilot gateway: tracker domain
//! records, the analytic snapshot, report shapes, and chat wire types.

pub mod chat;
pub mod records;
pub mod reports;
pub mod snapshot;

pub use chat::*;
pub use records::*;
pub use reports::*;
pub use snapshot::*;
