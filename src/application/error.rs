use thiserror::Error;

use crate::domain::LedgerError;
use crate::storage::TabId;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("tab <{0}> does not exist")]
    TabNotFound(TabId),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Stored tab {id} is inconsistent: {source}")]
    CorruptTab { id: TabId, source: LedgerError },

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}
