use std::collections::HashMap;

use anyhow::{Result, bail};
use tokio::sync::RwLock;

use super::{TabId, TabRepository, TabSnapshot, new_tab_id};

/// Repository that keeps snapshots in process memory. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryRepository {
    tabs: RwLock<HashMap<TabId, TabSnapshot>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tabs.
    pub async fn len(&self) -> usize {
        self.tabs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tabs.read().await.is_empty()
    }
}

impl TabRepository for MemoryRepository {
    async fn create(&self, snapshot: &TabSnapshot) -> Result<TabId> {
        let id = new_tab_id();
        self.tabs.write().await.insert(id.clone(), snapshot.clone());
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Option<TabSnapshot>> {
        Ok(self.tabs.read().await.get(id).cloned())
    }

    async fn update(&self, id: &str, snapshot: &TabSnapshot) -> Result<()> {
        let mut tabs = self.tabs.write().await;
        match tabs.get_mut(id) {
            Some(existing) => {
                *existing = snapshot.clone();
                Ok(())
            }
            None => bail!("cannot update tab {}: no such record", id),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if self.tabs.write().await.remove(id).is_none() {
            bail!("cannot delete tab {}: no such record", id);
        }
        Ok(())
    }
}
