use std::collections::BTreeMap;

use super::Cents;

/// Opaque identifier of a tab participant.
pub type ParticipantId = String;

/// A member of a tab and the pairwise debts it holds with every counterparty.
///
/// Each entry in `owed_by` is a signed net amount: positive means the
/// counterparty owes this participant, negative means this participant owes
/// the counterparty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    id: ParticipantId,
    owed_by: BTreeMap<ParticipantId, Cents>,
}

impl Participant {
    pub fn new(id: impl Into<ParticipantId>) -> Self {
        Self {
            id: id.into(),
            owed_by: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Net amounts per counterparty.
    pub fn owed_by(&self) -> &BTreeMap<ParticipantId, Cents> {
        &self.owed_by
    }

    /// Net amount `counterparty` owes this participant (negative if it is the other way round).
    pub fn net_with(&self, counterparty: &str) -> Cents {
        self.owed_by.get(counterparty).copied().unwrap_or(0)
    }

    /// Net position across every counterparty, saturating at the bounds of [`Cents`].
    pub fn balance(&self) -> Cents {
        self.owed_by
            .values()
            .fold(0, |total, amount| total.saturating_add(*amount))
    }

    /// Record that `counterparty` owes this participant `amount` more.
    pub(crate) fn should_be_paid_by(&mut self, counterparty: &str, amount: Cents) {
        *self.owed_by.entry(counterparty.to_string()).or_insert(0) += amount;
    }

    /// Record that this participant owes `counterparty` `amount` more.
    pub(crate) fn should_pay(&mut self, counterparty: &str, amount: Cents) {
        *self.owed_by.entry(counterparty.to_string()).or_insert(0) -= amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_participant_has_zero_balance() {
        let participant = Participant::new("alice");
        assert_eq!(participant.id(), "alice");
        assert_eq!(participant.balance(), 0);
        assert!(participant.owed_by().is_empty());
    }

    #[test]
    fn test_debts_accumulate_per_counterparty() {
        let mut participant = Participant::new("alice");
        participant.should_be_paid_by("bob", 500);
        participant.should_be_paid_by("bob", 250);
        participant.should_pay("carol", 300);

        assert_eq!(participant.net_with("bob"), 750);
        assert_eq!(participant.net_with("carol"), -300);
        assert_eq!(participant.net_with("dave"), 0);
        assert_eq!(participant.balance(), 450);
    }

    #[test]
    fn test_opposite_debts_net_out() {
        let mut participant = Participant::new("alice");
        participant.should_be_paid_by("bob", 1000);
        participant.should_pay("bob", 1000);

        assert_eq!(participant.net_with("bob"), 0);
        assert_eq!(participant.balance(), 0);
    }
}
