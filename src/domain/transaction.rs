use std::collections::BTreeMap;

use super::{Cents, ParticipantId, Share};

/// A transaction records one payment: who paid, how much, and how much each
/// participant owes the payer for it.
/// Transactions are immutable once appended to a tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    paid_by: ParticipantId,
    /// Amount in cents (always positive once accepted by a tab)
    amount: Cents,
    owed_by: BTreeMap<ParticipantId, Cents>,
}

impl Transaction {
    /// Create an arbitrary-split transaction. Validation happens when the
    /// transaction is added to a tab.
    pub fn new(
        paid_by: impl Into<ParticipantId>,
        amount: Cents,
        owed_by: BTreeMap<ParticipantId, Cents>,
    ) -> Self {
        Self {
            paid_by: paid_by.into(),
            amount,
            owed_by,
        }
    }

    /// Build a transaction from computed shares. A participant appearing in
    /// several shares owes the sum of all of them; zero shares are left out.
    pub fn from_shares(paid_by: impl Into<ParticipantId>, amount: Cents, shares: &[Share]) -> Self {
        let mut owed_by: BTreeMap<ParticipantId, Cents> = BTreeMap::new();
        for share in shares.iter().filter(|share| share.amount != 0) {
            *owed_by.entry(share.participant.clone()).or_insert(0) += share.amount;
        }
        Self::new(paid_by, amount, owed_by)
    }

    pub fn paid_by(&self) -> &str {
        &self.paid_by
    }

    pub fn amount(&self) -> Cents {
        self.amount
    }

    pub fn owed_by(&self) -> &BTreeMap<ParticipantId, Cents> {
        &self.owed_by
    }

    /// Iterate the `(ower, share)` pairs that move money between two distinct
    /// participants. A payer owing itself cancels out and is skipped.
    pub fn debts(&self) -> impl Iterator<Item = (&str, Cents)> {
        self.owed_by
            .iter()
            .filter(move |(ower, _)| ower.as_str() != self.paid_by)
            .map(|(ower, share)| (ower.as_str(), *share))
    }
}
