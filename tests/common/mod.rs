// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::collections::BTreeMap;

use anyhow::Result;
use tabkeeper::application::TabService;
use tabkeeper::domain::{Cents, ParticipantId};
use tabkeeper::storage::{FileRepository, MemoryRepository, SqliteRepository};
use tempfile::TempDir;

/// Helper to create a test service backed by memory
pub fn memory_service() -> TabService<MemoryRepository> {
    TabService::new(MemoryRepository::new())
}

/// Helper to create a test service with a temporary JSON file
pub async fn file_service() -> Result<(TabService<FileRepository>, TempDir)> {
    let temp_dir = TempDir::new()?;
    let repo = FileRepository::open(temp_dir.path().join("tabs.json")).await?;
    Ok((TabService::new(repo), temp_dir))
}

/// Helper to create a test service with a temporary database
pub async fn sqlite_service() -> Result<(TabService<SqliteRepository>, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let url = format!("sqlite:{}?mode=rwc", db_path.display());
    let service = TabService::new(SqliteRepository::init(&url).await?);
    Ok((service, temp_dir))
}

pub fn users(ids: &[&str]) -> Vec<ParticipantId> {
    ids.iter().map(|id| id.to_string()).collect()
}

pub fn owed(entries: &[(&str, Cents)]) -> BTreeMap<ParticipantId, Cents> {
    entries
        .iter()
        .map(|(id, amount)| (id.to_string(), *amount))
        .collect()
}
