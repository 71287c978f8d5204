use anyhow::{Context, Result};
use std::io::Read;

use crate::application::TabService;
use crate::storage::{TabId, TabRepository};

use super::TabExport;

/// Importer for loading exported tabs back into a store
pub struct Importer<'a, R> {
    service: &'a TabService<R>,
}

impl<'a, R: TabRepository> Importer<'a, R> {
    pub fn new(service: &'a TabService<R>) -> Self {
        Self { service }
    }

    /// Import a JSON export as a new tab. The log is replayed before anything
    /// is stored, so an export that breaks ledger rules is rejected whole.
    pub async fn import_json<Rd: Read>(&self, mut reader: Rd) -> Result<TabId> {
        let mut contents = String::new();
        reader.read_to_string(&mut contents)?;

        let export: TabExport =
            serde_json::from_str(&contents).context("Invalid tab export")?;

        let id = self.service.import_snapshot(export.tab).await?;
        tracing::info!(tab_id = %id, source_id = %export.id, "imported tab");
        Ok(id)
    }
}
