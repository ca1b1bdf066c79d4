mod commands;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use commands::init::{DB_FILE, WORKSPACE_DIR};
use fieldservice::config::Config;
use fieldservice::db::Database;
use fieldservice::expenses::MonthFilter;
use fieldservice::models::CallStatus;

#[derive(Parser)]
#[command(name = "fieldservice")]
#[command(about = "Field-service portal: service calls and expense claims")]
#[command(version)]
struct Cli {
    /// Use this database file instead of the workspace one
    #[arg(long, global = true, env = "FIELDSERVICE_DB")]
    db: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true, env = "FIELDSERVICE_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a portal workspace in the current directory
    Init {
        /// Restore the default configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Sign in as an engineer
    Login {
        /// Engineer email
        email: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in engineer
    Whoami,

    /// List your service calls by status
    Calls {
        /// Only show one bucket (assigned, in_progress, closed)
        #[arg(short, long)]
        status: Option<CallStatus>,
    },

    /// Show service call details
    Show {
        /// Service call ID
        id: i64,
    },

    /// Start work on an assigned call
    Start {
        /// Service call ID
        id: i64,
    },

    /// Close an in-progress call
    Close {
        /// Service call ID
        id: i64,
    },

    /// List your expenses with totals
    Expenses {
        /// Month label ("November 2025", "2025-11") or "all"
        #[arg(short, long, default_value = "all")]
        month: MonthFilter,
    },

    /// List months that have expenses, newest first
    Months,

    /// Export your calls and expense summary as JSON
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Month label or "all"
        #[arg(short, long, default_value = "all")]
        month: MonthFilter,
    },

    /// Re-render calls and expenses whenever they change
    Watch {
        /// Month label or "all"
        #[arg(short, long, default_value = "all")]
        month: MonthFilter,
        /// Poll interval in milliseconds (overrides config)
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Dispatcher tools for populating the store
    Dispatch {
        #[command(subcommand)]
        action: DispatchCommands,
    },
}

#[derive(Subcommand)]
enum DispatchCommands {
    /// Register an engineer
    Engineer {
        name: String,
        email: String,
    },
    /// Create a customer
    Customer {
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    /// Assign a new service call to an engineer
    Call {
        /// Ticket reference, e.g. SC-1042
        ticket: String,
        /// Call title
        title: String,
        #[arg(long)]
        customer: i64,
        /// Engineer email
        #[arg(long)]
        engineer: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Priority (low, medium, high, critical)
        #[arg(short, long, default_value = "medium")]
        priority: String,
        /// Category (installation, repair, maintenance, inspection, other)
        #[arg(short, long, default_value = "other")]
        category: String,
        #[arg(short, long)]
        location: Option<String>,
        /// "YYYY-MM-DD HH:MM" (UTC) or RFC 3339
        #[arg(long)]
        scheduled: Option<String>,
    },
    /// Record an expense submission for an engineer
    Expense {
        /// Engineer email
        #[arg(long)]
        engineer: String,
        /// Expense date, YYYY-MM-DD
        date: String,
        /// Amount, e.g. 85.50
        amount: String,
        description: String,
        /// Category (travel, meals, materials, fuel, accommodation, other)
        #[arg(short, long, default_value = "other")]
        category: String,
        /// Currency code (defaults to the configured currency)
        #[arg(long)]
        currency: Option<String>,
        /// Status (draft, submitted, under_review, approved, rejected, paid)
        #[arg(short, long, default_value = "submitted")]
        status: String,
        /// Related service call ID
        #[arg(long)]
        call: Option<i64>,
    },
}

fn find_workspace_dir() -> Result<PathBuf> {
    let mut current = env::current_dir()?;

    loop {
        let candidate = current.join(WORKSPACE_DIR);
        if candidate.is_dir() {
            return Ok(candidate);
        }

        if !current.pop() {
            bail!("Not a fieldservice workspace (or any parent). Run 'fieldservice init' first.");
        }
    }
}

/// Configuration for `command`. `init` never reads the existing file, so
/// `init --force` can replace a malformed one.
fn config_for(command: &Commands, workspace_dir: Option<&Path>) -> Result<Config> {
    match (command, workspace_dir) {
        (Commands::Init { .. }, _) | (_, None) => Ok(Config::default()),
        (_, Some(dir)) => Config::load(dir),
    }
}

fn get_db(override_path: Option<&Path>) -> Result<Database> {
    let db_path = match override_path {
        Some(path) => path.to_path_buf(),
        None => find_workspace_dir()?.join(DB_FILE),
    };
    Database::open(&db_path).context("Failed to open database")
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env("FIELDSERVICE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let workspace_dir = find_workspace_dir().ok();
    let config = config_for(&cli.command, workspace_dir.as_deref())?;
    init_tracing(cli.log_json || config.log_json);

    let db_override = cli.db.as_deref();

    match cli.command {
        Commands::Init { force } => {
            let cwd = env::current_dir()?;
            commands::init::run(&cwd, force)
        }

        Commands::Login { email } => {
            let db = get_db(db_override)?;
            commands::session::login(&db, &email)
        }

        Commands::Logout => {
            let db = get_db(db_override)?;
            commands::session::logout(&db)
        }

        Commands::Whoami => {
            let db = get_db(db_override)?;
            commands::session::whoami(&db)
        }

        Commands::Calls { status } => {
            let db = get_db(db_override)?;
            let engineer = commands::session::require_engineer(&db)?;
            commands::calls::list(&db, engineer.id, status)
        }

        Commands::Show { id } => {
            let db = get_db(db_override)?;
            let engineer = commands::session::require_engineer(&db)?;
            commands::calls::show(&db, engineer.id, id)
        }

        Commands::Start { id } => {
            let db = get_db(db_override)?;
            let engineer = commands::session::require_engineer(&db)?;
            commands::status::start(&db, engineer.id, id)
        }

        Commands::Close { id } => {
            let db = get_db(db_override)?;
            let engineer = commands::session::require_engineer(&db)?;
            commands::status::close(&db, engineer.id, id)
        }

        Commands::Expenses { month } => {
            let db = get_db(db_override)?;
            let engineer = commands::session::require_engineer(&db)?;
            commands::expenses::list(&db, engineer.id, &month)
        }

        Commands::Months => {
            let db = get_db(db_override)?;
            let engineer = commands::session::require_engineer(&db)?;
            commands::expenses::months(&db, engineer.id)
        }

        Commands::Export { output, month } => {
            let db = get_db(db_override)?;
            let engineer = commands::session::require_engineer(&db)?;
            commands::export::run_json(&db, engineer.id, &month, output.as_deref())
        }

        Commands::Watch { month, interval_ms } => {
            let db = get_db(db_override)?;
            let engineer = commands::session::require_engineer(&db)?;
            let interval = Duration::from_millis(interval_ms.unwrap_or(config.poll_interval_ms).max(50));
            commands::watch::run(&db, engineer.id, &month, interval)
        }

        Commands::Dispatch { action } => {
            let db = get_db(db_override)?;
            match action {
                DispatchCommands::Engineer { name, email } => {
                    commands::dispatch::engineer(&db, &name, &email)
                }
                DispatchCommands::Customer {
                    name,
                    email,
                    phone,
                    company,
                    address,
                } => commands::dispatch::customer(
                    &db,
                    &name,
                    email.as_deref(),
                    phone.as_deref(),
                    company.as_deref(),
                    address.as_deref(),
                ),
                DispatchCommands::Call {
                    ticket,
                    title,
                    customer,
                    engineer,
                    description,
                    priority,
                    category,
                    location,
                    scheduled,
                } => commands::dispatch::call(
                    &db,
                    &commands::dispatch::CallArgs {
                        ticket: &ticket,
                        customer_id: customer,
                        engineer_email: &engineer,
                        title: &title,
                        description: description.as_deref(),
                        priority: &priority,
                        category: &category,
                        location: location.as_deref(),
                        scheduled: scheduled.as_deref(),
                    },
                ),
                DispatchCommands::Expense {
                    engineer,
                    date,
                    amount,
                    description,
                    category,
                    currency,
                    status,
                    call,
                } => commands::dispatch::expense(
                    &db,
                    &commands::dispatch::ExpenseArgs {
                        engineer_email: &engineer,
                        date: &date,
                        category: &category,
                        amount: &amount,
                        currency: currency.as_deref().unwrap_or(&config.default_currency),
                        description: &description,
                        service_call_id: call,
                        status: &status,
                    },
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldservice::config::CONFIG_FILE;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_init_force_repairs_corrupt_config() {
        let dir = tempdir().unwrap();
        commands::init::run(dir.path(), false).unwrap();
        let workspace = dir.path().join(WORKSPACE_DIR);
        fs::write(workspace.join(CONFIG_FILE), "{ not json").unwrap();

        let init = Commands::Init { force: true };
        assert_eq!(config_for(&init, Some(workspace.as_path())).unwrap(), Config::default());
        assert!(config_for(&Commands::Whoami, Some(workspace.as_path())).is_err());

        commands::init::run(dir.path(), true).unwrap();
        assert!(config_for(&Commands::Whoami, Some(workspace.as_path())).is_ok());
    }

    #[test]
    fn test_config_outside_workspace_is_default() {
        assert_eq!(config_for(&Commands::Months, None).unwrap(), Config::default());
    }
}
