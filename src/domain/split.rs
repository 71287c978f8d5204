use super::{Cents, LedgerError, ParticipantId, ensure_positive};

/// The portion of an amount charged to one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    pub participant: ParticipantId,
    pub amount: Cents,
}

impl Share {
    pub fn new(participant: impl Into<ParticipantId>, amount: Cents) -> Self {
        Self {
            participant: participant.into(),
            amount,
        }
    }
}

/// Split `amount` evenly across `involved`, in input order.
///
/// Every participant receives `amount / n`; the first `amount % n` entries
/// receive one extra cent, so the shares always sum to `amount` exactly.
/// Duplicate ids are not merged: each occurrence gets its own share.
pub fn split_equally<S: AsRef<str>>(
    amount: Cents,
    involved: &[S],
) -> Result<Vec<Share>, LedgerError> {
    ensure_positive(amount)?;
    if involved.is_empty() {
        return Err(LedgerError::NoInvolvedUsers);
    }

    let count = involved.len() as Cents;
    let base_share = amount / count;
    let remainder = (amount % count) as usize;

    Ok(involved
        .iter()
        .enumerate()
        .map(|(index, participant)| {
            let extra = if index < remainder { 1 } else { 0 };
            Share::new(participant.as_ref(), base_share + extra)
        })
        .collect())
}
