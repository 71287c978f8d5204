use std::collections::BTreeMap;

use tokio::sync::Mutex;

use crate::domain::{Cents, LedgerError, ParticipantId, ParticipantPolicy, Tab, Transaction};
use crate::storage::{TabId, TabRepository, TabSnapshot, TransactionSnapshot, from_snapshot, to_snapshot};

use super::{AppError, TabView};

/// Application service providing high-level operations on tabs.
/// This is the primary interface for any client (HTTP API, CLI, ...).
///
/// Every mutation loads the stored snapshot, applies one ledger operation and
/// stores the result. Mutations are serialised so two concurrent requests
/// cannot overwrite each other's changes within this process.
pub struct TabService<R> {
    repo: R,
    policy: ParticipantPolicy,
    write_lock: Mutex<()>,
}

impl<R: TabRepository> TabService<R> {
    /// Create a new tab service with the given repository.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            policy: ParticipantPolicy::default(),
            write_lock: Mutex::new(()),
        }
    }

    /// Choose how unknown owers are handled by every tab this service loads.
    pub fn with_policy(mut self, policy: ParticipantPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ParticipantPolicy {
        self.policy
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    // ========================
    // Tab operations
    // ========================

    /// Create a new tab with zero balances and return its id.
    pub async fn new_tab(
        &self,
        name: impl Into<String>,
        users: Vec<ParticipantId>,
    ) -> Result<TabId, AppError> {
        let tab = Tab::new(name, users)?.with_policy(self.policy);
        let id = self.repo.create(&to_snapshot(&tab)).await?;

        tracing::info!(tab_id = %id, name = tab.name(), users = tab.participants().len(), "created tab");
        Ok(id)
    }

    /// Store an externally produced snapshot as a new tab, after checking that
    /// its log replays cleanly.
    pub async fn import_snapshot(&self, snapshot: TabSnapshot) -> Result<TabId, AppError> {
        let tab = from_snapshot(snapshot, self.policy)?;
        let id = self.repo.create(&to_snapshot(&tab)).await?;

        tracing::info!(tab_id = %id, transactions = tab.transactions().len(), "imported tab snapshot");
        Ok(id)
    }

    /// Load a tab, replaying its stored log.
    pub async fn load_tab(&self, id: &str) -> Result<Tab, AppError> {
        let snapshot = self.get_snapshot(id).await?;
        from_snapshot(snapshot, self.policy).map_err(|source| {
            tracing::error!(tab_id = id, error = %source, "stored tab failed to replay");
            AppError::CorruptTab {
                id: id.to_string(),
                source,
            }
        })
    }

    /// Get the balances and pairwise debts of a tab.
    pub async fn get_tab(&self, id: &str) -> Result<TabView, AppError> {
        let tab = self.load_tab(id).await?;
        Ok(TabView::from(&tab))
    }

    /// Get the stored snapshot of a tab.
    pub async fn get_snapshot(&self, id: &str) -> Result<TabSnapshot, AppError> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| AppError::TabNotFound(id.to_string()))
    }

    /// Get the net balance of every participant.
    pub async fn get_balances(&self, id: &str) -> Result<BTreeMap<ParticipantId, Cents>, AppError> {
        Ok(self.load_tab(id).await?.balances())
    }

    /// List a tab's transactions, oldest first.
    pub async fn list_transactions(&self, id: &str) -> Result<Vec<TransactionSnapshot>, AppError> {
        Ok(self.get_snapshot(id).await?.transactions)
    }

    /// Delete a tab.
    pub async fn delete_tab(&self, id: &str) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;

        self.get_snapshot(id).await?;
        self.repo.delete(id).await?;

        tracing::info!(tab_id = id, "deleted tab");
        Ok(())
    }

    // ========================
    // Ledger operations
    // ========================

    /// Add a participant to an existing tab.
    pub async fn add_participant(&self, id: &str, user: impl Into<ParticipantId>) -> Result<(), AppError> {
        let user = user.into();
        self.mutate(id, |tab| tab.add_participant(user)).await?;
        tracing::info!(tab_id = id, "added participant");
        Ok(())
    }

    /// Record an arbitrary split: `paid_by` paid `amount`, and each entry of
    /// `owed_by` owes them the given share.
    pub async fn add_transaction(
        &self,
        id: &str,
        paid_by: impl Into<ParticipantId>,
        amount: Cents,
        owed_by: BTreeMap<ParticipantId, Cents>,
    ) -> Result<TransactionSnapshot, AppError> {
        let transaction = Transaction::new(paid_by, amount, owed_by);
        let recorded = TransactionSnapshot::from(&transaction);

        self.mutate(id, |tab| tab.add_transaction(transaction)).await?;

        tracing::info!(tab_id = id, paid_by = %recorded.paid_by, amount, "recorded transaction");
        Ok(recorded)
    }

    /// Record an equal split of `amount` among `users`, paid by `paid_by`.
    pub async fn add_equal_split(
        &self,
        id: &str,
        paid_by: &str,
        amount: Cents,
        users: &[ParticipantId],
    ) -> Result<TransactionSnapshot, AppError> {
        let recorded = self
            .mutate(id, |tab| {
                tab.add_equal_split(paid_by, amount, users)
                    .map(TransactionSnapshot::from)
            })
            .await?;

        tracing::info!(tab_id = id, paid_by, amount, users = users.len(), "recorded equal split");
        Ok(recorded)
    }

    /// Load, apply one ledger operation, store. Nothing is written when the
    /// operation fails.
    async fn mutate<T, F>(&self, id: &str, operation: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Tab) -> Result<T, LedgerError>,
    {
        let _guard = self.write_lock.lock().await;

        let mut tab = self.load_tab(id).await?;
        let output = operation(&mut tab).inspect_err(|err| {
            tracing::debug!(tab_id = id, error = %err, "ledger rejected operation");
        })?;
        self.repo.update(id, &to_snapshot(&tab)).await?;

        Ok(output)
    }
}
