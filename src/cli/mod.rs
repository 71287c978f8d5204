use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::application::TabService;
use crate::domain::{Cents, ParticipantId, ensure_positive, format_cents, parse_cents};
use crate::io::{Exporter, Importer};
use crate::settings::Settings;
use crate::storage::{StorageBackend, Store};

/// Tabkeeper - shared expense tabs
#[derive(Parser)]
#[command(name = "tabkeeper")]
#[command(about = "Split bills with a group and keep track of who owes whom")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to ./tabkeeper.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Storage backend, overrides the configuration
    #[arg(long, value_enum, global = true)]
    pub storage: Option<StorageBackend>,

    /// Storage file path, overrides the configuration
    #[arg(long, global = true)]
    pub path: Option<PathBuf>,

    /// Register unknown owers instead of rejecting the transaction
    #[arg(long, global = true)]
    pub allow_implicit: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to bind (overrides the configuration)
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on (overrides the configuration)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Create a new tab and print its id
    Create {
        /// Tab name
        name: String,

        /// Participant id (repeatable)
        #[arg(short, long = "user")]
        users: Vec<ParticipantId>,
    },

    /// Show balances and who owes whom
    Show {
        /// Tab id
        id: String,
    },

    /// Add a participant to a tab
    AddUser {
        /// Tab id
        id: String,

        /// Participant id
        user: ParticipantId,
    },

    /// Record a payment with an arbitrary split
    Pay {
        /// Tab id
        id: String,

        /// Amount paid (e.g., "50.00" or "50")
        amount: String,

        /// Participant who paid
        #[arg(long)]
        by: ParticipantId,

        /// Share owed by a participant, as ID=AMOUNT (repeatable)
        #[arg(long = "owed", value_parser = parse_owed)]
        owed: Vec<(ParticipantId, Cents)>,
    },

    /// Record a payment split equally
    Split {
        /// Tab id
        id: String,

        /// Amount paid (e.g., "50.00" or "50")
        amount: String,

        /// Participant who paid
        #[arg(long)]
        by: ParticipantId,

        /// Participants sharing the cost, in remainder order
        #[arg(long, num_args = 1..)]
        among: Vec<ParticipantId>,
    },

    /// List a tab's transactions
    History {
        /// Tab id
        id: String,
    },

    /// Delete a tab
    Delete {
        /// Tab id
        id: String,
    },

    /// Export a tab
    Export {
        /// Tab id
        id: String,

        /// What to write
        #[arg(short, long, value_enum, default_value = "json")]
        format: ExportFormat,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a tab from a JSON export
    Import {
        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Full snapshot and balances
    Json,
    /// One row per share of each transaction
    Csv,
    /// One row per participant balance
    Balances,
}

/// Parse `ID=AMOUNT` into a participant id and an amount in cents.
fn parse_owed(input: &str) -> Result<(ParticipantId, Cents), String> {
    let (id, amount) = input
        .split_once('=')
        .ok_or_else(|| format!("expected ID=AMOUNT, got '{}'", input))?;
    if id.is_empty() {
        return Err(format!("missing participant id in '{}'", input));
    }
    let cents = parse_cents(amount).map_err(|err| err.to_string())?;
    Ok((id.to_string(), cents))
}

/// Parse a command line amount and reject zero or negative values.
fn parse_amount(amount: &str) -> Result<Cents> {
    let cents = parse_cents(amount)?;
    Ok(ensure_positive(cents)?)
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tabkeeper={level}")));

    // A second initialisation (e.g. in tests) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

impl Cli {
    /// Merge configuration with command line overrides.
    fn settings(&self) -> Result<Settings> {
        let mut settings =
            Settings::new(self.config.as_deref()).context("Failed to load configuration")?;

        if let Some(backend) = self.storage {
            settings.storage.backend = backend;
        }
        if let Some(path) = &self.path {
            settings.storage.path = path.clone();
        }
        if self.allow_implicit {
            settings.app.allow_implicit_participants = true;
        }
        if self.verbose {
            settings.app.level = "debug".to_string();
        }
        if let Commands::Serve { bind, port } = &self.command {
            if let Some(bind) = bind {
                settings.server.bind = bind.clone();
            }
            if let Some(port) = port {
                settings.server.port = *port;
            }
        }

        Ok(settings)
    }

    pub async fn run(self) -> Result<()> {
        let settings = self.settings()?;
        init_tracing(&settings.app.level);

        let store = Store::open(settings.storage.backend, &settings.storage.path).await?;
        let service = TabService::new(store).with_policy(settings.participant_policy());

        match self.command {
            Commands::Serve { .. } => {
                let addr = settings.server_addr();
                let listener = tokio::net::TcpListener::bind(&addr)
                    .await
                    .with_context(|| format!("Failed to bind {}", addr))?;
                crate::server::run_with_listener(Arc::new(service), listener).await?;
            }

            Commands::Create { name, users } => {
                let id = service.new_tab(name, users).await?;
                println!("{}", id);
            }

            Commands::Show { id } => {
                run_show_command(&service, &id).await?;
            }

            Commands::AddUser { id, user } => {
                service.add_participant(&id, user.clone()).await?;
                println!("Added {} to tab {}", user, id);
            }

            Commands::Pay {
                id,
                amount,
                by,
                owed,
            } => {
                let amount_cents = parse_amount(&amount)?;
                if owed.is_empty() {
                    bail!("At least one --owed ID=AMOUNT is required");
                }

                let mut owed_by: BTreeMap<ParticipantId, Cents> = BTreeMap::new();
                for (user, share) in owed {
                    *owed_by.entry(user).or_insert(0) += share;
                }

                let recorded = service
                    .add_transaction(&id, by, amount_cents, owed_by)
                    .await?;
                println!(
                    "Recorded payment: {} paid {}",
                    recorded.paid_by,
                    format_cents(recorded.amount)
                );
            }

            Commands::Split {
                id,
                amount,
                by,
                among,
            } => {
                let amount_cents = parse_amount(&amount)?;
                let recorded = service
                    .add_equal_split(&id, &by, amount_cents, &among)
                    .await?;

                println!(
                    "Recorded split: {} paid {}",
                    recorded.paid_by,
                    format_cents(recorded.amount)
                );
                for (user, share) in &recorded.owed_by {
                    println!("  {:<20} {:>12}", user, format_cents(*share));
                }
            }

            Commands::History { id } => {
                run_history_command(&service, &id).await?;
            }

            Commands::Delete { id } => {
                service.delete_tab(&id).await?;
                println!("Deleted tab {}", id);
            }

            Commands::Export { id, format, output } => {
                run_export_command(&service, &id, format, output).await?;
            }

            Commands::Import { input } => {
                let importer = Importer::new(&service);
                let id = match input {
                    Some(path) => {
                        let file = std::fs::File::open(&path)
                            .with_context(|| format!("Failed to open {}", path.display()))?;
                        importer.import_json(file).await?
                    }
                    None => importer.import_json(std::io::stdin().lock()).await?,
                };
                println!("{}", id);
            }
        }

        Ok(())
    }
}

async fn run_show_command(service: &TabService<Store>, id: &str) -> Result<()> {
    let view = service.get_tab(id).await?;

    println!("Tab: {}", view.name);
    if view.users.is_empty() {
        println!("No participants.");
        return Ok(());
    }

    println!("{:<20} {:>12}", "USER", "BALANCE");
    println!("{}", "-".repeat(33));
    for (user, entry) in &view.users {
        println!("{:<20} {:>12}", user, format_cents(entry.balance));
    }

    let mut debts = Vec::new();
    for (user, entry) in &view.users {
        for (counterparty, amount) in &entry.owed_by {
            if *amount > 0 {
                debts.push((counterparty, user, *amount));
            }
        }
    }

    if !debts.is_empty() {
        println!();
        for (debtor, creditor, amount) in debts {
            println!("{} owes {} {}", debtor, creditor, format_cents(amount));
        }
    }

    Ok(())
}

async fn run_history_command(service: &TabService<Store>, id: &str) -> Result<()> {
    let transactions = service.list_transactions(id).await?;

    if transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    println!("{:<5} {:<20} {:>12}  {}", "#", "PAID BY", "AMOUNT", "OWED BY");
    println!("{}", "-".repeat(60));
    for (index, transaction) in transactions.iter().enumerate() {
        let owed = transaction
            .owed_by
            .iter()
            .map(|(user, share)| format!("{}={}", user, format_cents(*share)))
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "{:<5} {:<20} {:>12}  {}",
            index + 1,
            transaction.paid_by,
            format_cents(transaction.amount),
            owed
        );
    }

    Ok(())
}

async fn run_export_command(
    service: &TabService<Store>,
    id: &str,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let exporter = Exporter::new(service);

    let writer: Box<dyn std::io::Write> = match &output {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout().lock()),
    };

    match format {
        ExportFormat::Json => {
            exporter.export_json(id, writer).await?;
        }
        ExportFormat::Csv => {
            let count = exporter.export_transactions_csv(id, writer).await?;
            if output.is_some() {
                eprintln!("Exported {} transaction(s)", count);
            }
        }
        ExportFormat::Balances => {
            let count = exporter.export_balances_csv(id, writer).await?;
            if output.is_some() {
                eprintln!("Exported {} balance(s)", count);
            }
        }
    }

    Ok(())
}
