use anyhow::{Context, Result, bail};
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use super::{MIGRATION_001_TABS, TabId, TabRepository, TabSnapshot, new_tab_id};

/// Repository storing each tab snapshot as a JSON document in SQLite.
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_TABS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }
}

impl TabRepository for SqliteRepository {
    async fn create(&self, snapshot: &TabSnapshot) -> Result<TabId> {
        let id = new_tab_id();
        let now = Utc::now().to_rfc3339();
        let json = serde_json::to_string(snapshot)?;

        sqlx::query(
            r#"
            INSERT INTO tabs (id, name, snapshot, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&snapshot.name)
        .bind(json)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .context("Failed to save tab")?;

        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Option<TabSnapshot>> {
        let row = sqlx::query("SELECT snapshot FROM tabs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch tab")?;

        match row {
            Some(row) => {
                let json: String = row.get("snapshot");
                let snapshot = serde_json::from_str(&json)
                    .with_context(|| format!("Invalid snapshot stored for tab {}", id))?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    async fn update(&self, id: &str, snapshot: &TabSnapshot) -> Result<()> {
        let json = serde_json::to_string(snapshot)?;

        let result = sqlx::query("UPDATE tabs SET name = ?, snapshot = ?, updated_at = ? WHERE id = ?")
            .bind(&snapshot.name)
            .bind(json)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update tab")?;

        if result.rows_affected() == 0 {
            bail!("cannot update tab {}: no such record", id);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM tabs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete tab")?;

        if result.rows_affected() == 0 {
            bail!("cannot delete tab {}: no such record", id);
        }
        Ok(())
    }
}
