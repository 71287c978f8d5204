use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Cents, ParticipantId, Tab};

/// Read model of a tab: every participant's balance and who they are owed by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabView {
    pub name: String,
    pub users: BTreeMap<ParticipantId, UserView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub balance: Cents,
    /// Net amount per counterparty, negative when this user owes them
    pub owed_by: BTreeMap<ParticipantId, Cents>,
}

impl From<&Tab> for TabView {
    fn from(tab: &Tab) -> Self {
        Self {
            name: tab.name().to_string(),
            users: tab
                .participants()
                .iter()
                .map(|p| {
                    (
                        p.id().to_string(),
                        UserView {
                            balance: p.balance(),
                            owed_by: p.owed_by().clone(),
                        },
                    )
                })
                .collect(),
        }
    }
}
