use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{
    Cents, LedgerError, Participant, ParticipantId, Transaction, ensure_positive, split_equally,
};

/// How a tab treats owers that are not yet participants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantPolicy {
    /// Reject transactions that mention unknown owers.
    #[default]
    Strict,
    /// Register unknown owers as new participants when the transaction is applied.
    Implicit,
}

impl ParticipantPolicy {
    pub fn from_allow_implicit(allow_implicit_participants: bool) -> Self {
        if allow_implicit_participants {
            ParticipantPolicy::Implicit
        } else {
            ParticipantPolicy::Strict
        }
    }

    pub fn allows_implicit(&self) -> bool {
        matches!(self, ParticipantPolicy::Implicit)
    }
}

/// A named ledger: the participants of a group and the append-only log of
/// what they paid for each other.
///
/// Every mutation is all-or-nothing. Balances are always the fold of the log
/// over the participant set, see [`Tab::replay`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    name: String,
    /// Insertion ordered, ids are unique
    participants: Vec<Participant>,
    transactions: Vec<Transaction>,
    policy: ParticipantPolicy,
}

impl Tab {
    /// Create a tab with the given participants and an empty log.
    pub fn new<I, S>(name: impl Into<String>, participant_ids: I) -> Result<Self, LedgerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<ParticipantId>,
    {
        let mut tab = Self {
            name: name.into(),
            participants: Vec::new(),
            transactions: Vec::new(),
            policy: ParticipantPolicy::default(),
        };

        for id in participant_ids {
            tab.add_participant(id)?;
        }

        Ok(tab)
    }

    pub fn with_policy(mut self, policy: ParticipantPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Rebuild a tab by replaying `transactions` over a fresh ledger.
    pub fn replay<I, S>(
        name: impl Into<String>,
        participant_ids: I,
        transactions: impl IntoIterator<Item = Transaction>,
        policy: ParticipantPolicy,
    ) -> Result<Self, LedgerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<ParticipantId>,
    {
        let mut tab = Self::new(name, participant_ids)?.with_policy(policy);
        for transaction in transactions {
            tab.add_transaction(transaction)?;
        }
        Ok(tab)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> ParticipantPolicy {
        self.policy
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant_ids(&self) -> Vec<ParticipantId> {
        self.participants.iter().map(|p| p.id().to_string()).collect()
    }

    pub fn participant(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.participant(id).is_some()
    }

    /// The ordered, read-only transaction log.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Net balance of every participant.
    pub fn balances(&self) -> BTreeMap<ParticipantId, Cents> {
        self.participants
            .iter()
            .map(|p| (p.id().to_string(), p.balance()))
            .collect()
    }

    /// Add a participant with an empty debt map.
    pub fn add_participant(&mut self, id: impl Into<ParticipantId>) -> Result<(), LedgerError> {
        let id = id.into();
        if self.contains(&id) {
            return Err(LedgerError::DuplicateParticipant(id));
        }
        self.participants.push(Participant::new(id));
        Ok(())
    }

    /// Apply a transaction to the debt graph and append it to the log.
    ///
    /// For every `(ower, share)` the payer is owed `share` more by the ower and
    /// the ower owes the payer `share` more.
    pub fn add_transaction(&mut self, transaction: Transaction) -> Result<(), LedgerError> {
        let new_participants = self.validate(&transaction)?;

        // Nothing below can fail
        for id in new_participants {
            self.participants.push(Participant::new(id));
        }

        for (ower, share) in transaction.debts() {
            if let Some(payer) = self.participant_mut(transaction.paid_by()) {
                payer.should_be_paid_by(ower, share);
            }
            if let Some(debtor) = self.participant_mut(ower) {
                debtor.should_pay(transaction.paid_by(), share);
            }
        }

        self.transactions.push(transaction);
        Ok(())
    }

    /// Split `amount` equally among `involved` and record it as paid by `paid_by`.
    /// Returns the transaction that was appended.
    pub fn add_equal_split<S: AsRef<str>>(
        &mut self,
        paid_by: &str,
        amount: Cents,
        involved: &[S],
    ) -> Result<&Transaction, LedgerError> {
        let shares = split_equally(amount, involved)?;
        self.add_transaction(Transaction::from_shares(paid_by, amount, &shares))?;
        Ok(&self.transactions[self.transactions.len() - 1])
    }

    /// Check a transaction against the current state. Returns the owers that
    /// must be registered first (empty under the strict policy).
    fn validate(&self, transaction: &Transaction) -> Result<Vec<ParticipantId>, LedgerError> {
        ensure_positive(transaction.amount())?;

        if let Some((ower, share)) = transaction.owed_by().iter().find(|(_, share)| **share <= 0) {
            return Err(LedgerError::InvalidAmount(format!(
                "share {} owed by {} must be greater than zero",
                share, ower
            )));
        }

        if !self.contains(transaction.paid_by()) {
            return Err(LedgerError::ParticipantNotFound(
                transaction.paid_by().to_string(),
            ));
        }

        let mut missing = Vec::new();
        for ower in transaction.owed_by().keys() {
            if self.contains(ower) {
                continue;
            }
            if !self.policy.allows_implicit() {
                return Err(LedgerError::ParticipantNotFound(ower.clone()));
            }
            missing.push(ower.clone());
        }

        self.check_overflow(transaction)?;

        Ok(missing)
    }

    /// Apply the transaction's debts to copies of the affected debt maps and
    /// make sure every pairwise entry and every resulting balance fits in
    /// [`Cents`].
    fn check_overflow(&self, transaction: &Transaction) -> Result<(), LedgerError> {
        let overflow = || {
            LedgerError::InvalidAmount(format!(
                "transaction of {} paid by {} overflows the tab's balances",
                transaction.amount(),
                transaction.paid_by()
            ))
        };

        let mut touched: BTreeMap<&str, BTreeMap<ParticipantId, Cents>> = BTreeMap::new();
        let payer = transaction.paid_by();

        for (ower, share) in transaction.debts() {
            for (id, counterparty, delta) in [(payer, ower, share), (ower, payer, -share)] {
                let owed_by = touched.entry(id).or_insert_with(|| {
                    self.participant(id)
                        .map(|p| p.owed_by().clone())
                        .unwrap_or_default()
                });
                let entry = owed_by.entry(counterparty.to_string()).or_insert(0);
                *entry = entry.checked_add(delta).ok_or_else(overflow)?;
            }
        }

        for owed_by in touched.values() {
            owed_by
                .values()
                .try_fold(0 as Cents, |total, amount| total.checked_add(*amount))
                .ok_or_else(overflow)?;
        }

        Ok(())
    }

    fn participant_mut(&mut self, id: &str) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owed(entries: &[(&str, Cents)]) -> BTreeMap<ParticipantId, Cents> {
        entries
            .iter()
            .map(|(id, share)| (id.to_string(), *share))
            .collect()
    }

    fn abc() -> Tab {
        Tab::new("trip", ["a", "b", "c"]).unwrap()
    }

    #[test]
    fn test_new_tab_has_zero_balances() {
        let tab = abc();

        assert_eq!(tab.name(), "trip");
        assert_eq!(tab.participant_ids(), vec!["a", "b", "c"]);
        assert!(tab.transactions().is_empty());
        assert!(tab.balances().values().all(|b| *b == 0));
    }

    #[test]
    fn test_new_tab_rejects_duplicate_participants() {
        let result = Tab::new("trip", ["a", "b", "a"]);
        assert_eq!(
            result,
            Err(LedgerError::DuplicateParticipant("a".to_string()))
        );
    }

    #[test]
    fn test_balances_are_keyed_by_id_while_participants_keep_insertion_order() {
        let tab = Tab::new("trip", ["zed", "amy", "kim"]).unwrap();

        assert_eq!(tab.participant_ids(), vec!["zed", "amy", "kim"]);
        assert_eq!(
            tab.balances().keys().collect::<Vec<_>>(),
            vec!["amy", "kim", "zed"]
        );
    }

    #[test]
    fn test_add_participant() {
        let mut tab = abc();
        tab.add_participant("d").unwrap();

        assert_eq!(tab.participant_ids(), vec!["a", "b", "c", "d"]);
        assert_eq!(tab.balances().get("d"), Some(&0));
    }

    #[test]
    fn test_add_existing_participant_fails() {
        let mut tab = abc();
        let before = tab.clone();

        assert_eq!(
            tab.add_participant("b"),
            Err(LedgerError::DuplicateParticipant("b".to_string()))
        );
        assert_eq!(tab, before);
    }

    #[test]
    fn test_add_transaction_updates_balances() {
        let mut tab = abc();
        tab.add_transaction(Transaction::new("a", 10, owed(&[("b", 5), ("c", 5)])))
            .unwrap();

        let balances = tab.balances();
        assert_eq!(balances.get("a"), Some(&10));
        assert_eq!(balances.get("b"), Some(&-5));
        assert_eq!(balances.get("c"), Some(&-5));
        assert_eq!(tab.transactions().len(), 1);
    }

    #[test]
    fn test_add_transaction_tracks_pairwise_debts() {
        let mut tab = abc();
        tab.add_transaction(Transaction::new("a", 10, owed(&[("b", 5), ("c", 5)])))
            .unwrap();
        tab.add_transaction(Transaction::new("b", 10, owed(&[("c", 10)])))
            .unwrap();

        let a = tab.participant("a").unwrap();
        let b = tab.participant("b").unwrap();
        let c = tab.participant("c").unwrap();

        assert_eq!(a.net_with("b"), 5);
        assert_eq!(a.net_with("c"), 5);
        assert_eq!(b.net_with("a"), -5);
        assert_eq!(b.net_with("c"), 10);
        assert_eq!(c.net_with("a"), -5);
        assert_eq!(c.net_with("b"), -10);

        assert_eq!(a.balance(), 10);
        assert_eq!(b.balance(), 5);
        assert_eq!(c.balance(), -15);
    }

    #[test]
    fn test_unknown_payer_leaves_tab_unchanged() {
        let mut tab = abc();
        let before = tab.clone();

        let result = tab.add_transaction(Transaction::new("zed", 10, owed(&[("a", 10)])));

        assert_eq!(
            result,
            Err(LedgerError::ParticipantNotFound("zed".to_string()))
        );
        assert_eq!(tab, before);
    }

    #[test]
    fn test_unknown_payer_rejected_even_when_implicit() {
        let mut tab = abc().with_policy(ParticipantPolicy::Implicit);

        let result = tab.add_transaction(Transaction::new("zed", 10, owed(&[("a", 10)])));

        assert!(matches!(result, Err(LedgerError::ParticipantNotFound(_))));
        assert!(!tab.contains("zed"));
    }

    #[test]
    fn test_unknown_ower_rejected_in_strict_mode() {
        let mut tab = abc();
        let before = tab.clone();

        let result = tab.add_transaction(Transaction::new("a", 10, owed(&[("b", 5), ("zed", 5)])));

        assert_eq!(
            result,
            Err(LedgerError::ParticipantNotFound("zed".to_string()))
        );
        assert_eq!(tab, before);
    }

    #[test]
    fn test_unknown_ower_registered_in_implicit_mode() {
        let mut tab = abc().with_policy(ParticipantPolicy::Implicit);

        tab.add_transaction(Transaction::new("a", 10, owed(&[("b", 5), ("zed", 5)])))
            .unwrap();

        assert_eq!(tab.participant_ids(), vec!["a", "b", "c", "zed"]);
        assert_eq!(tab.balances().get("zed"), Some(&-5));
        assert_eq!(tab.balances().get("a"), Some(&10));
    }

    #[test]
    fn test_invalid_amounts_rejected() {
        let mut tab = abc();
        let before = tab.clone();

        for amount in [0, -1] {
            let result = tab.add_transaction(Transaction::new("a", amount, owed(&[("b", 1)])));
            assert!(matches!(result, Err(LedgerError::InvalidAmount(_))));
        }
        for share in [-10, 0] {
            let result = tab.add_transaction(Transaction::new("a", 10, owed(&[("b", share)])));
            assert!(matches!(result, Err(LedgerError::InvalidAmount(_))));
        }

        assert_eq!(tab, before);
    }

    #[test]
    fn test_overflowing_balance_is_rejected() {
        let mut tab = abc();
        let before = tab.clone();

        let result = tab.add_transaction(Transaction::new(
            "a",
            Cents::MAX,
            owed(&[("b", Cents::MAX), ("c", Cents::MAX)]),
        ));

        assert!(matches!(result, Err(LedgerError::InvalidAmount(_))));
        assert_eq!(tab, before);
        assert!(tab.balances().values().all(|b| *b == 0));
    }

    #[test]
    fn test_overflowing_pairwise_debt_is_rejected() {
        let mut tab = abc();
        tab.add_transaction(Transaction::new("a", Cents::MAX, owed(&[("b", Cents::MAX)])))
            .unwrap();
        let before = tab.clone();

        let result = tab.add_transaction(Transaction::new("a", Cents::MAX, owed(&[("b", Cents::MAX)])));

        assert!(matches!(result, Err(LedgerError::InvalidAmount(_))));
        assert_eq!(tab, before);
        assert_eq!(tab.balances().get("a"), Some(&Cents::MAX));
        assert_eq!(tab.balances().get("b"), Some(&-Cents::MAX));

        // Paying the debt back still works
        tab.add_transaction(Transaction::new("b", 5, owed(&[("a", 5)])))
            .unwrap();
        assert_eq!(tab.balances().get("a"), Some(&(Cents::MAX - 5)));
    }

    #[test]
    fn test_equal_split_smaller_than_group_omits_zero_shares() {
        let mut tab = Tab::new("t", ["a", "b", "c", "d"]).unwrap();
        let transaction = tab.add_equal_split("a", 2, &["a", "b", "c", "d"]).unwrap();

        assert_eq!(transaction.owed_by(), &owed(&[("a", 1), ("b", 1)]));
        assert_eq!(tab.balances().get("b"), Some(&-1));
        assert_eq!(tab.balances().get("c"), Some(&0));
    }

    #[test]
    fn test_arbitrary_split_need_not_match_amount() {
        let mut tab = abc();
        tab.add_transaction(Transaction::new("a", 100, owed(&[("b", 30)])))
            .unwrap();

        assert_eq!(tab.balances().get("a"), Some(&30));
        assert_eq!(tab.balances().get("b"), Some(&-30));
        assert_eq!(tab.transactions()[0].amount(), 100);
    }

    #[test]
    fn test_equal_split_including_payer() {
        let mut tab = abc();
        let transaction = tab.add_equal_split("a", 8, &["a", "b", "c"]).unwrap();

        assert_eq!(transaction.owed_by(), &owed(&[("a", 3), ("b", 3), ("c", 2)]));

        let balances = tab.balances();
        assert_eq!(balances.get("a"), Some(&5));
        assert_eq!(balances.get("b"), Some(&-3));
        assert_eq!(balances.get("c"), Some(&-2));
    }

    #[test]
    fn test_equal_split_duplicate_participant_is_charged_twice() {
        let mut tab = abc();
        let transaction = tab.add_equal_split("a", 9, &["b", "c", "b"]).unwrap();

        assert_eq!(transaction.owed_by(), &owed(&[("b", 6), ("c", 3)]));
        assert_eq!(tab.balances().get("b"), Some(&-6));
        assert_eq!(tab.balances().get("a"), Some(&9));
    }

    #[test]
    fn test_equal_split_with_unknown_participant_is_atomic() {
        let mut tab = abc();
        let before = tab.clone();

        let result = tab.add_equal_split("a", 9, &["b", "zed"]);

        assert!(matches!(result, Err(LedgerError::ParticipantNotFound(_))));
        assert_eq!(tab, before);
    }

    #[test]
    fn test_equal_split_errors() {
        let mut tab = abc();
        let nobody: [&str; 0] = [];

        assert!(matches!(
            tab.add_equal_split("a", 0, &["b"]),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            tab.add_equal_split("a", 10, &nobody),
            Err(LedgerError::NoInvolvedUsers)
        ));
    }

    #[test]
    fn test_money_is_conserved() {
        let mut tab = Tab::new("house", ["a", "b", "c", "d"]).unwrap();
        let transactions = vec![
            Transaction::new("a", 1000, owed(&[("b", 250), ("c", 250), ("d", 500)])),
            Transaction::new("b", 333, owed(&[("a", 111), ("b", 111), ("c", 111)])),
            Transaction::new("d", 50, owed(&[("c", 50)])),
        ];

        for transaction in transactions {
            let before: Cents = tab.balances().values().sum();
            tab.add_transaction(transaction).unwrap();
            let after: Cents = tab.balances().values().sum();
            assert_eq!(before, after);
            assert_eq!(after, 0);
        }
    }

    #[test]
    fn test_replay_reproduces_balances() {
        let mut tab = abc();
        tab.add_transaction(Transaction::new("a", 10, owed(&[("b", 5), ("c", 5)])))
            .unwrap();
        tab.add_equal_split("c", 7, &["a", "b"]).unwrap();

        let replayed = Tab::replay(
            tab.name(),
            tab.participant_ids(),
            tab.transactions().to_vec(),
            tab.policy(),
        )
        .unwrap();

        assert_eq!(replayed, tab);
        assert_eq!(replayed.balances(), tab.balances());
    }
}
