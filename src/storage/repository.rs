use std::future::Future;
use std::path::Path;

use anyhow::Result;
use serde::Deserialize;

use super::{FileRepository, MemoryRepository, SqliteRepository, TabSnapshot};

/// Identifier assigned to a tab by the repository that stores it.
pub type TabId = String;

/// Persistence for tab snapshots.
///
/// Implementations only move snapshots around; ledger rules are enforced by
/// the service when snapshots are turned back into tabs.
pub trait TabRepository: Send + Sync {
    /// Store a new tab and return its freshly generated id.
    fn create(&self, snapshot: &TabSnapshot) -> impl Future<Output = Result<TabId>> + Send;

    fn get(&self, id: &str) -> impl Future<Output = Result<Option<TabSnapshot>>> + Send;

    /// Replace an existing tab. Fails if `id` is unknown.
    fn update(&self, id: &str, snapshot: &TabSnapshot) -> impl Future<Output = Result<()>> + Send;

    /// Remove an existing tab. Fails if `id` is unknown.
    fn delete(&self, id: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Which backend to use for tab storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    File,
    Sqlite,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Memory => "memory",
            StorageBackend::File => "file",
            StorageBackend::Sqlite => "sqlite",
        }
    }
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A repository chosen at runtime from configuration.
pub enum Store {
    Memory(MemoryRepository),
    File(FileRepository),
    Sqlite(SqliteRepository),
}

impl Store {
    /// Open (creating if needed) the store for `backend` at `path`.
    /// `path` is ignored by the memory backend.
    pub async fn open(backend: StorageBackend, path: &Path) -> Result<Self> {
        tracing::debug!(%backend, path = %path.display(), "opening tab store");
        Ok(match backend {
            StorageBackend::Memory => Store::Memory(MemoryRepository::new()),
            StorageBackend::File => Store::File(FileRepository::open(path).await?),
            StorageBackend::Sqlite => {
                let url = format!("sqlite:{}?mode=rwc", path.display());
                Store::Sqlite(SqliteRepository::init(&url).await?)
            }
        })
    }
}

impl TabRepository for Store {
    async fn create(&self, snapshot: &TabSnapshot) -> Result<TabId> {
        match self {
            Store::Memory(repo) => repo.create(snapshot).await,
            Store::File(repo) => repo.create(snapshot).await,
            Store::Sqlite(repo) => repo.create(snapshot).await,
        }
    }

    async fn get(&self, id: &str) -> Result<Option<TabSnapshot>> {
        match self {
            Store::Memory(repo) => repo.get(id).await,
            Store::File(repo) => repo.get(id).await,
            Store::Sqlite(repo) => repo.get(id).await,
        }
    }

    async fn update(&self, id: &str, snapshot: &TabSnapshot) -> Result<()> {
        match self {
            Store::Memory(repo) => repo.update(id, snapshot).await,
            Store::File(repo) => repo.update(id, snapshot).await,
            Store::Sqlite(repo) => repo.update(id, snapshot).await,
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        match self {
            Store::Memory(repo) => repo.delete(id).await,
            Store::File(repo) => repo.delete(id).await,
            Store::Sqlite(repo) => repo.delete(id).await,
        }
    }
}

/// Generate a new tab id.
pub(crate) fn new_tab_id() -> TabId {
    uuid::Uuid::new_v4().to_string()
}
