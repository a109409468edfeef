use std::error::Error;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use clap::{Args, Parser, Subcommand};
use config::{Config, ConfigError, Environment, File};
use engine::{
    AccountId, Engine, HistoryFilter, LedgerSettings, Money, SplitType, SqlStore, Transaction,
    TransactionDraft, TransactionEdit,
};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use serde::Deserialize;
use uuid::Uuid;

mod export;

#[derive(Parser, Debug)]
#[command(name = "tandem_cli")]
#[command(about = "Record shared expenses and settle up from the terminal")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:./tandem.db?mode=rwc")]
    database_url: String,

    /// Configuration file holding the `[ledger]` section.
    #[arg(long, default_value = "config/tandem")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List accounts and the total balance.
    Accounts,
    /// Record an expense. Amounts below 1.000 are read as thousands.
    Add(ExpenseArgs),
    /// Record income.
    Income(IncomeArgs),
    /// Move money between two accounts.
    Transfer(TransferArgs),
    /// Record the counterparty's fixed fund deposit.
    Deposit(DateArg),
    /// Change amount, description or date of a transaction.
    Edit(EditArgs),
    Delete {
        id: Uuid,
    },
    /// Show the open items and the suggested payment.
    Bill,
    /// Settle the current bill against the amount received.
    Settle {
        #[arg(value_parser = parse_money)]
        payment: i64,
    },
    ShowSettlement {
        id: Uuid,
    },
    /// Undo a settlement and reopen what it closed.
    Reopen {
        id: Uuid,
    },
    History {
        #[arg(long, value_parser = parse_filter, default_value = "counterparty")]
        filter: HistoryFilter,
    },
    Stats {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
    },
    /// Write the history as CSV to stdout.
    Export {
        #[arg(long, value_parser = parse_filter, default_value = "all")]
        filter: HistoryFilter,
    },
    /// Overwrite the balance of an account.
    SetBalance {
        #[arg(value_parser = parse_account)]
        account: AccountId,
        #[arg(allow_hyphen_values = true, value_parser = parse_balance)]
        balance: i64,
    },
}

#[derive(Args, Debug)]
struct DateArg {
    /// Day in the ledger timezone (YYYY-MM-DD), today when omitted.
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[derive(Args, Debug)]
struct ExpenseArgs {
    #[arg(value_parser = parse_money)]
    amount: i64,
    description: String,
    #[arg(long, value_parser = parse_split, default_value = "me_only")]
    split: SplitType,
    #[arg(long, value_parser = parse_account, default_value = "CASH")]
    account: AccountId,
    #[command(flatten)]
    date: DateArg,
}

#[derive(Args, Debug)]
struct IncomeArgs {
    #[arg(value_parser = parse_money)]
    amount: i64,
    description: String,
    #[arg(long, value_parser = parse_account, default_value = "PRIMARY_BANK")]
    account: AccountId,
    #[command(flatten)]
    date: DateArg,
}

#[derive(Args, Debug)]
struct TransferArgs {
    #[arg(value_parser = parse_money)]
    amount: i64,
    #[arg(value_parser = parse_account)]
    from: AccountId,
    #[arg(value_parser = parse_account)]
    to: AccountId,
    #[command(flatten)]
    date: DateArg,
}

#[derive(Args, Debug)]
struct EditArgs {
    id: Uuid,
    #[arg(long, value_parser = parse_money)]
    amount: Option<i64>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    date: Option<NaiveDate>,
}

fn parse_money(raw: &str) -> Result<i64, String> {
    Money::parse_shorthand(raw)
        .map(Money::minor)
        .map_err(|err| err.to_string())
}

fn parse_balance(raw: &str) -> Result<i64, String> {
    raw.parse::<Money>()
        .map(Money::minor)
        .map_err(|err| err.to_string())
}

fn parse_split(raw: &str) -> Result<SplitType, String> {
    SplitType::try_from(raw).map_err(|err| err.to_string())
}

fn parse_account(raw: &str) -> Result<AccountId, String> {
    AccountId::try_from(raw).map_err(|err| err.to_string())
}

fn parse_filter(raw: &str) -> Result<HistoryFilter, String> {
    HistoryFilter::try_from(raw).map_err(|err| err.to_string())
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    ledger: LedgerSettings,
}

fn load_ledger_settings(path: &str) -> Result<LedgerSettings, ConfigError> {
    let settings = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix("TANDEM")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize::<ConfigFile>().map(|file| file.ledger)
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Noon of `date` in the ledger timezone, or now.
fn occurred_at(date: Option<NaiveDate>, settings: &LedgerSettings) -> DateTime<Utc> {
    date.and_then(|day| day.and_hms_opt(12, 0, 0))
        .and_then(|noon| settings.timezone.from_local_datetime(&noon).earliest())
        .map_or_else(Utc::now, |local| local.with_timezone(&Utc))
}

fn print_transaction(tx: &Transaction, settings: &LedgerSettings) {
    let date = tx.occurred_at.with_timezone(&settings.timezone);
    let target = match tx.to_account_id {
        Some(to) => format!("{} -> {}", tx.account_id, to),
        None => tx.account_id.to_string(),
    };
    let state = if tx.is_locked() {
        "locked"
    } else if tx.is_settled {
        "settled"
    } else {
        "open"
    };
    println!(
        "{id}  {date}  {amount:>12}  {kind:<10} {split:<17} {state:<7} {target}  {description}",
        id = tx.id,
        date = date.format("%Y-%m-%d"),
        amount = Money::new(tx.amount_minor).to_string(),
        kind = tx.kind.as_str(),
        split = tx.split.as_str(),
        description = tx.description,
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = load_ledger_settings(&cli.config)?;
    let db = connect_db(&cli.database_url).await?;
    let mut engine = Engine::builder()
        .store(SqlStore::new(db))
        .settings(settings.clone())
        .build()
        .await?;

    match cli.command {
        Command::Accounts => {
            for account in engine.accounts() {
                println!(
                    "{:<18} {:<28} {:>14}",
                    account.id.as_str(),
                    account.name,
                    Money::new(account.balance).to_string()
                );
            }
            println!("{:<47} {:>14}", "total", Money::new(engine.total_balance()?).to_string());
        }
        Command::Add(args) => {
            let draft = TransactionDraft::expense(
                args.amount,
                &args.description,
                args.account,
                args.split,
                occurred_at(args.date.date, &settings),
            );
            let id = engine.create_transaction(draft).await?;
            println!("created expense: {id}");
        }
        Command::Income(args) => {
            let draft = TransactionDraft::income(
                args.amount,
                &args.description,
                args.account,
                occurred_at(args.date.date, &settings),
            );
            let id = engine.create_transaction(draft).await?;
            println!("created income: {id}");
        }
        Command::Transfer(args) => {
            let id = engine
                .transfer(
                    args.amount,
                    args.from,
                    args.to,
                    occurred_at(args.date.date, &settings),
                )
                .await?;
            println!("created transfer: {id}");
        }
        Command::Deposit(args) => {
            let id = engine
                .counterparty_deposit(occurred_at(args.date, &settings))
                .await?;
            println!(
                "recorded deposit of {}: {id}",
                Money::new(settings.deposit_amount)
            );
        }
        Command::Edit(args) => {
            let current = engine.transaction(args.id)?;
            let edit = TransactionEdit {
                amount_minor: args.amount.unwrap_or(current.amount_minor),
                description: args
                    .description
                    .unwrap_or_else(|| current.description.clone()),
                occurred_at: match args.date {
                    Some(day) => occurred_at(Some(day), &settings),
                    None => current.occurred_at,
                },
            };
            engine.edit_transaction(args.id, edit).await?;
            println!("updated: {}", args.id);
        }
        Command::Delete { id } => {
            engine.delete_transaction(id).await?;
            println!("deleted: {id}");
        }
        Command::Bill => {
            let bill = engine.bill()?;
            for tx in &bill.items {
                print_transaction(tx, &settings);
            }
            println!("net debt:          {}", Money::new(bill.net_debt));
            println!("suggested payment: {}", Money::new(bill.suggested_payment));
        }
        Command::Settle { payment } => {
            let outcome = engine.settle_bill(payment, Utc::now()).await?;
            println!(
                "settlement {}: closed {} items, surplus {}",
                outcome.settlement_id,
                outcome.settled_ids.len(),
                Money::new(outcome.surplus)
            );
            if let Some(carry) = &outcome.carry_forward {
                print_transaction(carry, &settings);
            }
        }
        Command::ShowSettlement { id } => {
            let view = engine.settlement_view(id)?;
            for tx in &view.items {
                print_transaction(tx, &settings);
            }
            println!("items total: {}", Money::new(view.items_total));
            println!("paid:        {}", Money::new(view.amount_paid));
            if let Some(carry) = &view.carry_forward {
                println!("carried forward:");
                print_transaction(carry, &settings);
            }
        }
        Command::Reopen { id } => {
            engine.reopen_settlement(id).await?;
            println!("reopened settlement: {id}");
        }
        Command::History { filter } => {
            for tx in engine.history(filter) {
                print_transaction(tx, &settings);
            }
        }
        Command::Stats { year, month } => {
            let today = Utc::now().with_timezone(&settings.timezone);
            let stats = engine.monthly_stats(
                year.unwrap_or_else(|| today.year()),
                month.unwrap_or_else(|| today.month()),
            )?;
            println!("{}-{:02}", stats.year, stats.month);
            println!("income:  {}", Money::new(stats.income));
            println!("expense: {}", Money::new(stats.expense));
            for day in stats.days.iter().filter(|d| d.income != 0 || d.expense != 0) {
                println!(
                    "  {:02}  +{:>12}  -{:>12}",
                    day.day,
                    Money::new(day.income).to_string(),
                    Money::new(day.expense).to_string()
                );
            }
        }
        Command::Export { filter } => {
            export::write_csv(std::io::stdout().lock(), engine.history(filter), settings.timezone)?;
        }
        Command::SetBalance { account, balance } => {
            engine.set_account_balance(account, balance).await?;
            println!("{account}: {}", Money::new(balance));
        }
    }

    Ok(())
}
