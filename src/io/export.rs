use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

use crate::application::TabService;
use crate::domain::{Cents, ParticipantId};
use crate::storage::{TabId, TabRepository, TabSnapshot};

/// Full export of one tab: its stored snapshot plus the balances derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabExport {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub id: TabId,
    pub tab: TabSnapshot,
    pub balances: BTreeMap<ParticipantId, Cents>,
}

/// Exporter for converting a tab to CSV or JSON
pub struct Exporter<'a, R> {
    service: &'a TabService<R>,
}

impl<'a, R: TabRepository> Exporter<'a, R> {
    pub fn new(service: &'a TabService<R>) -> Self {
        Self { service }
    }

    /// Export the transaction log to CSV, one row per ower of each transaction.
    /// Returns the number of transactions written.
    pub async fn export_transactions_csv<W: Write>(&self, id: &str, writer: W) -> Result<usize> {
        let transactions = self.service.list_transactions(id).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["sequence", "paid_by", "amount", "ower", "share"])?;

        for (sequence, transaction) in transactions.iter().enumerate() {
            for (ower, share) in &transaction.owed_by {
                csv_writer.write_record([
                    &(sequence + 1).to_string(),
                    &transaction.paid_by,
                    &transaction.amount.to_string(),
                    ower,
                    &share.to_string(),
                ])?;
            }
        }

        csv_writer.flush()?;
        Ok(transactions.len())
    }

    /// Export participant balances to CSV.
    pub async fn export_balances_csv<W: Write>(&self, id: &str, writer: W) -> Result<usize> {
        let balances = self.service.get_balances(id).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["user", "balance"])?;
        for (user, balance) in &balances {
            csv_writer.write_record([user.as_str(), balance.to_string().as_str()])?;
        }

        csv_writer.flush()?;
        Ok(balances.len())
    }

    /// Export the tab as a JSON document.
    pub async fn export_json<W: Write>(&self, id: &str, mut writer: W) -> Result<TabExport> {
        let tab = self.service.get_snapshot(id).await?;
        let balances = self.service.get_balances(id).await?;

        let export = TabExport {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            id: id.to_string(),
            tab,
            balances,
        };

        let json = serde_json::to_string_pretty(&export)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(export)
    }
}
