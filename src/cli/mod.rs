use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};

use crate::application::{AppError, LedgerService, RegistrationRequest};
use crate::config::ServiceOptions;
use crate::domain::{format_cents, Cents, Ledger, Transaction, TransactionType};

/// Cash Manager - track income and expenses against a running balance
#[derive(Parser)]
#[command(name = "cash-manager")]
#[command(about = "Record income and expenses against a running balance")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "CASH_MANAGER_DB", default_value = "cash-manager.db")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Create an account and sign in
    Register {
        /// Full name shown on the dashboard
        #[arg(short, long)]
        name: String,

        /// Email address used to sign in
        #[arg(short, long)]
        email: String,

        /// Password (prompted twice if omitted)
        #[arg(long)]
        password: Option<String>,

        /// Password confirmation (defaults to --password when that is given)
        #[arg(long)]
        confirm_password: Option<String>,
    },

    /// Sign in to an existing account
    Login {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (prompted if omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign out
    Logout,

    /// Show the signed-in account
    Whoami,

    /// Record an income or expense
    Add {
        /// Amount (e.g., "12.50" or "12")
        amount: String,

        /// What the money was for
        #[arg(short, long)]
        description: String,

        /// Transaction type: income or expense
        #[arg(short = 't', long = "type", default_value = "income")]
        kind: String,
    },

    /// Delete a transaction
    Delete {
        /// Transaction ID
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// List transactions, newest first
    History {
        /// Maximum number of transactions to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show the current balance
    Balance,

    /// Show name, balance and history
    Dashboard,

    /// Export your transactions
    Export {
        /// Format: csv, json
        #[arg(short, long, default_value = "csv")]
        format: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

impl Cli {
    pub fn options(&self) -> ServiceOptions {
        ServiceOptions::new(&self.database)
    }

    pub async fn run(self) -> Result<()> {
        let options = self.options();

        match self.command {
            Commands::Init => {
                LedgerService::init(&options).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Register {
                name,
                email,
                password,
                confirm_password,
            } => {
                let service = open_service(&options).await?;
                let (password, confirm_password) = match password {
                    Some(password) => {
                        let confirm = confirm_password.unwrap_or_else(|| password.clone());
                        (password, confirm)
                    }
                    None => (
                        rpassword::prompt_password("Password: ")?,
                        rpassword::prompt_password("Confirm password: ")?,
                    ),
                };

                let user = service
                    .register(RegistrationRequest {
                        full_name: name,
                        email,
                        password,
                        confirm_password,
                    })
                    .await
                    .map_err(|err| surface(err, "Registration failed."))?;

                println!("Welcome, {}! You are signed in as {}.", user.full_name, user.email);
            }

            Commands::Login { email, password } => {
                let service = open_service(&options).await?;
                let password = match password {
                    Some(password) => password,
                    None => rpassword::prompt_password("Password: ")?,
                };

                let user = service
                    .sign_in(&email, &password)
                    .await
                    .map_err(|err| surface(err, "Login failed."))?;
                println!("Signed in as {}", user.email);
            }

            Commands::Logout => {
                let service = open_service(&options).await?;
                service.sign_out().await?;
                println!("Signed out.");
            }

            Commands::Whoami => {
                let service = open_service(&options).await?;
                match service.current_user() {
                    Some(user) => match service.profile(&user.uid).await? {
                        Some(profile) => println!("{} <{}>", profile.full_name, user.email),
                        None => println!("{}", user.email),
                    },
                    None => println!("Not signed in."),
                }
            }

            Commands::Add {
                amount,
                description,
                kind,
            } => {
                let service = open_service(&options).await?;
                let kind: TransactionType = kind.parse()?;
                let transaction = service
                    .add_own_transaction(&description, &amount, kind)
                    .await
                    .map_err(|err| surface(err, "Failed to add transaction."))?;

                println!(
                    "Added {}: {} {} ({})",
                    transaction.kind,
                    signed_display(&transaction),
                    transaction.description,
                    transaction.id
                );
            }

            Commands::Delete { id, yes } => {
                let service = open_service(&options).await?;
                if !yes && !confirm("Delete this transaction?")? {
                    println!("Cancelled.");
                    return Ok(());
                }

                service
                    .delete_own_transaction(&id)
                    .await
                    .map_err(|err| surface(err, "Failed to delete."))?;
                println!("Deleted transaction {}", id);
            }

            Commands::History { limit } => {
                let service = open_service(&options).await?;
                let user_id = service.current_user_id().map_err(not_signed_in)?;
                let ledger = service.ledger(&user_id).await?;
                print_history(&ledger, limit);
            }

            Commands::Balance => {
                let service = open_service(&options).await?;
                let user_id = service.current_user_id().map_err(not_signed_in)?;
                let balance = service.balance(&user_id).await?;
                println!("{}", dollars(balance));
            }

            Commands::Dashboard => {
                let service = open_service(&options).await?;
                let dashboard = service.dashboard().await.map_err(not_signed_in)?;
                println!("Cash Manager");
                println!("{}", dashboard.display_name());
                println!();
                print_balance_card(&dashboard.ledger);
                println!();
                print_history(&dashboard.ledger, None);
            }

            Commands::Export { format, output } => {
                let service = open_service(&options).await?;
                let user_id = service.current_user_id().map_err(not_signed_in)?;
                run_export_command(&service, &user_id, &format, output.as_deref()).await?;
            }
        }

        Ok(())
    }
}

async fn open_service(options: &ServiceOptions) -> Result<LedgerService> {
    LedgerService::connect(options).await.with_context(|| {
        format!(
            "Failed to open {}. Run `init` first?",
            options.database_path
        )
    })
}

/// Turn a service failure into the message shown to the user. Local input
/// errors are shown as they are; anything else is logged and wrapped.
fn surface(err: AppError, message: &'static str) -> anyhow::Error {
    match err {
        AppError::Validation(_) => err.into(),
        AppError::NotSignedIn => not_signed_in(err),
        other => {
            tracing::error!(error = %other, "{message}");
            anyhow::Error::new(other).context(message)
        }
    }
}

fn not_signed_in(err: AppError) -> anyhow::Error {
    match err {
        AppError::NotSignedIn => anyhow::anyhow!("Not signed in. Use `login` or `register` first."),
        other => other.into(),
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn dollars(cents: Cents) -> String {
    format!("${}", format_cents(cents))
}

fn signed_display(transaction: &Transaction) -> String {
    let sign = if transaction.is_income() { "+" } else { "-" };
    format!("{}{}", sign, dollars(transaction.amount_cents))
}

fn print_balance_card(ledger: &Ledger) {
    println!("CURRENT BALANCE  {}", dollars(ledger.balance));
    println!(
        "Income {}  Expenses {}",
        dollars(ledger.income_total),
        dollars(ledger.expense_total)
    );
    if ledger.is_solvent() {
        println!("You're doing great!");
    } else {
        println!("Expenses exceed income");
    }
}

fn print_history(ledger: &Ledger, limit: Option<usize>) {
    if ledger.is_empty() {
        println!("No transactions yet. Add one with `add`!");
        return;
    }

    println!(
        "{:<12} {:>12} {:<32} {:<8} ID",
        "DATE", "AMOUNT", "DESCRIPTION", "TYPE"
    );
    println!("{}", "-".repeat(100));

    let shown = limit.unwrap_or(ledger.transactions.len());
    for transaction in ledger.transactions.iter().take(shown) {
        println!(
            "{:<12} {:>12} {:<32} {:<8} {}",
            transaction.created_at.with_timezone(&Local).format("%Y-%m-%d"),
            signed_display(transaction),
            truncate(&transaction.description, 32),
            transaction.kind,
            transaction.id
        );
    }
}

async fn run_export_command(
    service: &LedgerService,
    user_id: &str,
    format: &str,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::stdout;

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match format {
        "csv" => {
            let count = exporter.export_history_csv(user_id, writer).await?;
            if output.is_some() {
                eprintln!("Exported {} transactions", count);
            }
        }
        "json" => {
            let snapshot = exporter.export_history_json(user_id, writer).await?;
            if output.is_some() {
                eprintln!("Exported {} transactions", snapshot.transactions.len());
            }
        }
        _ => {
            anyhow::bail!("Invalid export format '{}'. Valid formats: csv, json", format);
        }
    }

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
