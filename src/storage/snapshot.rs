use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Cents, LedgerError, ParticipantId, ParticipantPolicy, Tab, Transaction};

/// Serializable form of a tab, as stored by every repository backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabSnapshot {
    pub name: String,
    /// Participant ids in insertion order
    pub users: Vec<ParticipantId>,
    #[serde(default)]
    pub transactions: Vec<TransactionSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSnapshot {
    pub paid_by: ParticipantId,
    pub amount: Cents,
    pub owed_by: BTreeMap<ParticipantId, Cents>,
}

impl From<&Transaction> for TransactionSnapshot {
    fn from(transaction: &Transaction) -> Self {
        Self {
            paid_by: transaction.paid_by().to_string(),
            amount: transaction.amount(),
            owed_by: transaction.owed_by().clone(),
        }
    }
}

impl From<TransactionSnapshot> for Transaction {
    fn from(snapshot: TransactionSnapshot) -> Self {
        Transaction::new(snapshot.paid_by, snapshot.amount, snapshot.owed_by)
    }
}

/// Capture a tab's participants and log.
pub fn to_snapshot(tab: &Tab) -> TabSnapshot {
    TabSnapshot {
        name: tab.name().to_string(),
        users: tab.participant_ids(),
        transactions: tab.transactions().iter().map(Into::into).collect(),
    }
}

/// Rebuild a tab by replaying the snapshot's log. Snapshots that break ledger
/// invariants (unknown ids, duplicate users, bad amounts) are rejected.
pub fn from_snapshot(snapshot: TabSnapshot, policy: ParticipantPolicy) -> Result<Tab, LedgerError> {
    Tab::replay(
        snapshot.name,
        snapshot.users,
        snapshot.transactions.into_iter().map(Transaction::from),
        policy,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tab() -> Tab {
        let mut tab = Tab::new("new-tab", ["user1", "user2", "user3"]).unwrap();
        tab.add_transaction(Transaction::new(
            "user1",
            10,
            BTreeMap::from([("user2".to_string(), 5), ("user3".to_string(), 5)]),
        ))
        .unwrap();
        tab.add_transaction(Transaction::new(
            "user2",
            10,
            BTreeMap::from([("user3".to_string(), 10)]),
        ))
        .unwrap();
        tab
    }

    #[test]
    fn test_to_snapshot() {
        let snapshot = to_snapshot(&sample_tab());

        assert_eq!(snapshot.name, "new-tab");
        assert_eq!(snapshot.users, vec!["user1", "user2", "user3"]);
        assert_eq!(snapshot.transactions.len(), 2);
        assert_eq!(snapshot.transactions[1].paid_by, "user2");
        assert_eq!(snapshot.transactions[1].owed_by.get("user3"), Some(&10));
    }

    #[test]
    fn test_from_snapshot_replays_balances() {
        let tab = from_snapshot(to_snapshot(&sample_tab()), ParticipantPolicy::Strict).unwrap();

        let balances = tab.balances();
        assert_eq!(balances.get("user1"), Some(&10));
        assert_eq!(balances.get("user2"), Some(&5));
        assert_eq!(balances.get("user3"), Some(&-15));
        assert_eq!(tab.transactions().len(), 2);
    }

    #[test]
    fn test_roundtrip_preserves_tab() {
        let tab = sample_tab();
        let restored = from_snapshot(to_snapshot(&tab), tab.policy()).unwrap();

        assert_eq!(restored, tab);
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(to_snapshot(&sample_tab())).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "name": "new-tab",
                "users": ["user1", "user2", "user3"],
                "transactions": [
                    { "paidBy": "user1", "amount": 10, "owedBy": { "user2": 5, "user3": 5 } },
                    { "paidBy": "user2", "amount": 10, "owedBy": { "user3": 10 } }
                ]
            })
        );
    }

    #[test]
    fn test_from_snapshot_rejects_unknown_payer() {
        let snapshot = TabSnapshot {
            name: "broken".into(),
            users: vec!["a".into()],
            transactions: vec![TransactionSnapshot {
                paid_by: "ghost".into(),
                amount: 10,
                owed_by: BTreeMap::from([("a".to_string(), 10)]),
            }],
        };

        assert_eq!(
            from_snapshot(snapshot, ParticipantPolicy::Strict),
            Err(LedgerError::ParticipantNotFound("ghost".to_string()))
        );
    }
}
