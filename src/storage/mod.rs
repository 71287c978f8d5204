mod file;
mod memory;
mod repository;
mod snapshot;
mod sqlite;

pub use file::*;
pub use memory::*;
pub use repository::*;
pub use snapshot::*;
pub use sqlite::*;

/// SQL migration for the tabs table
pub const MIGRATION_001_TABS: &str = include_str!("migrations/001_tabs.sql");
