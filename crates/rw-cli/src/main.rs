use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use uuid::Uuid;

mod commands;

use commands::{OutputFormat, EXIT_FATAL};

#[derive(Parser)]
#[command(name = "rentwatch")]
#[command(about = "Rental inventory reconciliation", long_about = None)]
struct Cli {
    /// Layered config paths in merge order. Defaults to config/base.yaml when present.
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check copies against open rentals and repair what is safe to repair
    Reconcile {
        /// Report planned actions without calling any procedure (`--dry-run false` to repair)
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        dry_run: bool,

        /// all | reserved-only
        #[arg(long, default_value = "reserved-only", value_parser = commands::parse_scope)]
        scope: rw_schemas::Scope,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Post items that need attention to the Discord alerts webhook
        #[arg(long, default_value_t = false)]
        notify: bool,
    },

    /// List overdue rentals and expired DIBS holds
    Overdue {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Post the briefing to the Discord briefing webhook
        #[arg(long, default_value_t = false)]
        notify: bool,
    },

    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> site -> local...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Invoke the store's transition procedures by hand
    Admin {
        #[command(subcommand)]
        cmd: AdminCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    /// Connectivity and schema probe
    Status,
}

#[derive(Subcommand)]
enum AdminCmd {
    /// Force-return a copy of a game (back to AVAILABLE, open rental closed)
    Return {
        #[arg(long)]
        game_id: i64,

        /// Acknowledge that this writes to the live store.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },

    /// Rent an available copy of a game to a renter
    Rent {
        #[arg(long)]
        game_id: i64,

        #[arg(long)]
        renter_name: String,

        /// Member user id, when the renter has an account
        #[arg(long)]
        user_id: Option<Uuid>,

        /// Acknowledge that this writes to the live store.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Dev-time convenience; a missing file is fine.
    let _ = dotenvy::from_filename(".env.local");

    // Usage errors exit 1 so that 2 stays reserved for "pass needs attention".
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_FATAL } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    init_tracing();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config_paths = commands::config_paths(cli.config_paths);

    match cli.cmd {
        Commands::Reconcile {
            dry_run,
            scope,
            format,
            notify,
        } => {
            commands::reconcile::run_reconcile(
                &config_paths,
                commands::reconcile::ReconcileArgs {
                    dry_run,
                    scope,
                    format,
                    notify,
                },
            )
            .await
        }

        Commands::Overdue { format, notify } => {
            commands::overdue::run_overdue(&config_paths, format, notify).await?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Db { cmd } => match cmd {
            DbCmd::Status => commands::db::run_status(&config_paths).await,
        },

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = rw_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
            Ok(ExitCode::SUCCESS)
        }

        Commands::Admin { cmd } => {
            match cmd {
                AdminCmd::Return { game_id, yes } => {
                    commands::admin::run_return(&config_paths, game_id, yes).await?
                }
                AdminCmd::Rent {
                    game_id,
                    renter_name,
                    user_id,
                    yes,
                } => {
                    commands::admin::run_rent(&config_paths, game_id, &renter_name, user_id, yes)
                        .await?
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Logs go to stderr; stdout carries only command output.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
