//! `reminders` - send membership renewal and expiration reminders.
//!
//! # Commands
//!
//! - `reminders run` - Run one dispatch cycle and print the report
//! - `reminders daemon` - Run on the configured cron schedule until Ctrl-C
//! - `reminders send-test <key> --to <addr>` - Preview a notice with sample values
//! - `reminders notices [--type renewal|expiration]` - List configured notices
//! - `reminders notice save|delete` - Edit the notice catalog
//! - `reminders periods` / `reminders types` - List trigger periods and notice types
//! - `reminders trail <subscriber>` - Show a member's audit notes

use clap::{Parser, Subcommand, ValueEnum};
use reminders::prelude::*;
use reminders_config::ConfigManager;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;

#[derive(Parser)]
#[command(name = "reminders")]
#[command(version)]
#[command(about = "Scheduled renewal and expiration reminders for membership sites")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML, JSON or env). May be repeated; later files win.
    #[arg(short, long = "config", global = true)]
    config: Vec<PathBuf>,

    /// `.env` file to read. Defaults to `.env` in the working directory, if any.
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one dispatch cycle
    Run,

    /// Run on the configured schedule until interrupted
    Daemon,

    /// Send a notice with sample values to an operator address
    SendTest {
        /// Notice key; unknown keys fall back to the first notice
        key: NoticeKey,

        #[arg(long)]
        to: String,
    },

    /// List configured notices
    Notices {
        #[arg(long = "type", value_enum)]
        notice_type: Option<TypeArg>,
    },

    /// Edit the notice catalog
    Notice {
        #[command(subcommand)]
        command: NoticeCommands,
    },

    /// List trigger periods
    Periods,

    /// List notice types
    Types,

    /// Show a member's audit notes
    Trail { subscriber: u64 },
}

#[derive(Subcommand)]
enum NoticeCommands {
    /// Add a notice, or replace the one at `--key`
    Save {
        #[arg(long)]
        key: Option<NoticeKey>,

        #[arg(long = "type", value_enum)]
        notice_type: TypeArg,

        /// Period key such as `+1week` or `-1day`
        #[arg(long, allow_hyphen_values = true)]
        period: TriggerPeriod,

        #[arg(long)]
        subject: String,

        #[arg(long)]
        message: String,
    },

    /// Remove a notice
    Delete { key: NoticeKey },
}

#[derive(Clone, Copy, ValueEnum)]
enum TypeArg {
    Renewal,
    Expiration,
}

impl From<TypeArg> for NoticeType {
    fn from(arg: TypeArg) -> Self {
        match arg {
            TypeArg::Renewal => NoticeType::Renewal,
            TypeArg::Expiration => NoticeType::Expiration,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = LogConfig::from_env().init();

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn execute(cli: Cli) -> AppResult<()> {
    let mut builder = ConfigManager::builder().load_dotenv(cli.env_file).load_env();
    for path in cli.config {
        builder = builder.add_file(path);
    }
    let service = ReminderService::open(builder.build()?).await?;

    match cli.command {
        Commands::Run => {
            let report = service.run_once().await?;
            print_json(&report)
        }
        Commands::Daemon => {
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!(error = %e, "Could not listen for Ctrl-C");
                }
            };
            run_daemon(Arc::new(service), shutdown).await
        }
        Commands::SendTest { key, to } => {
            let rendered = service.send_test(key, &to).await?;
            print_json(&rendered)
        }
        Commands::Notices { notice_type } => {
            let notices = service.notices(notice_type.map(NoticeType::from)).await?;
            print_json(&notices)
        }
        Commands::Notice { command } => match command {
            NoticeCommands::Save {
                key,
                notice_type,
                period,
                subject,
                message,
            } => {
                let notice = Notice::new(notice_type.into(), period, subject, message);
                let key = service.save_notice(key, notice).await?;
                print_json(&json!({ "saved": key }))
            }
            NoticeCommands::Delete { key } => {
                let removed = service.delete_notice(key).await?;
                print_json(&json!({ "deleted": key, "notice": removed }))
            }
        },
        Commands::Periods => {
            let periods: Vec<_> = service
                .scheduler()
                .list_periods()
                .into_iter()
                .map(|(period, label)| json!({ "key": period.as_str(), "label": label }))
                .collect();
            print_json(&periods)
        }
        Commands::Types => {
            let types: Vec<_> = service
                .scheduler()
                .list_notice_types()
                .into_iter()
                .map(|(notice_type, label)| json!({ "key": notice_type.as_str(), "label": label }))
                .collect();
            print_json(&types)
        }
        Commands::Trail { subscriber } => {
            let entries = service.audit_trail(subscriber).await?;
            print_json(&entries)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> AppResult<()> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::InvalidArgument(e.to_string()))?;
    println!("{}", out);
    Ok(())
}
