use thiserror::Error;

use super::ParticipantId;

/// Validation failures raised by the ledger. A tab that returns one of these
/// is left exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Must have at least one involved user")]
    NoInvolvedUsers,

    #[error("Participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    #[error("Participant already exists: {0}")]
    DuplicateParticipant(ParticipantId),
}
