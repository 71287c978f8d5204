use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tokio::sync::Mutex;

use super::{TabId, TabRepository, TabSnapshot, new_tab_id};

/// Repository backed by a single JSON document mapping tab id to snapshot.
///
/// The whole document is held in memory and rewritten on every mutation.
pub struct FileRepository {
    path: PathBuf,
    tabs: Mutex<BTreeMap<TabId, TabSnapshot>>,
}

impl FileRepository {
    /// Load the document at `path`, creating an empty one (and its parent
    /// directories) if it does not exist yet.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let tabs = if tokio::fs::try_exists(&path)
            .await
            .with_context(|| format!("Failed to check {}", path.display()))?
        {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Invalid tab database {}", path.display()))?
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            tracing::info!(path = %path.display(), "creating empty tab database");
            let empty = BTreeMap::new();
            write_document(&path, &empty).await?;
            empty
        };

        Ok(Self {
            path,
            tabs: Mutex::new(tabs),
        })
    }
}

impl TabRepository for FileRepository {
    async fn create(&self, snapshot: &TabSnapshot) -> Result<TabId> {
        let mut tabs = self.tabs.lock().await;
        let id = new_tab_id();
        tabs.insert(id.clone(), snapshot.clone());
        if let Err(err) = write_document(&self.path, &tabs).await {
            tabs.remove(&id);
            return Err(err);
        }
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Option<TabSnapshot>> {
        Ok(self.tabs.lock().await.get(id).cloned())
    }

    async fn update(&self, id: &str, snapshot: &TabSnapshot) -> Result<()> {
        let mut tabs = self.tabs.lock().await;
        let Some(existing) = tabs.get_mut(id) else {
            bail!("cannot update tab {}: no such record", id);
        };
        let previous = std::mem::replace(existing, snapshot.clone());

        if let Err(err) = write_document(&self.path, &tabs).await {
            tabs.insert(id.to_string(), previous);
            return Err(err);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut tabs = self.tabs.lock().await;
        let Some(previous) = tabs.remove(id) else {
            bail!("cannot delete tab {}: no such record", id);
        };

        if let Err(err) = write_document(&self.path, &tabs).await {
            tabs.insert(id.to_string(), previous);
            return Err(err);
        }
        Ok(())
    }
}

/// Write the document to a temporary file, then rename it over `path`.
async fn write_document(path: &Path, tabs: &BTreeMap<TabId, TabSnapshot>) -> Result<()> {
    let json = serde_json::to_string(tabs).context("Failed to serialize tabs")?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, json)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}
