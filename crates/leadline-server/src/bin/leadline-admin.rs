//! Operator CLI for the lead ledgers.
//!
//! Reads the same configuration as the server, so it talks to the same
//! database and lead API.

use clap::{Parser, Subcommand};
use leadline_leads::{
    parse_window, LeadError, LeadSubmitter, LedgerFilter, NpaClient, RetryOutcome,
};
use leadline_server::config::{load_config, resolve_config_path};
use leadline_types::{Channel, RejectionCategory};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Inspect and repair lead submissions.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file; falls back to LEADLINE_CONFIG_PATH, then config.toml.
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List failed submissions, oldest first
    ListFailed {
        /// Include entries already resolved by a retry
        #[arg(long)]
        all: bool,
    },

    /// Re-attempt one failed submission
    Retry { id: i64 },

    /// Re-attempt every unresolved failed submission
    RetryAll,

    /// List rejected leads
    ListRejected {
        /// Window such as 24h, 7d, or 2w
        #[arg(long)]
        since: Option<String>,
        #[arg(long, value_parser = parse_channel)]
        channel: Option<Channel>,
        #[arg(long, value_parser = parse_category)]
        category: Option<RejectionCategory>,
    },

    /// List succeeded submissions for reconciliation with the lead system
    Reconcile {
        #[arg(long)]
        since: Option<String>,
        #[arg(long, value_parser = parse_channel)]
        channel: Option<Channel>,
    },

    /// List sessions still open after the given age
    ListAbandoned {
        #[arg(long, default_value = "1h")]
        older_than: String,
    },
}

fn parse_channel(value: &str) -> Result<Channel, String> {
    value.parse().map_err(|e| format!("{e}"))
}

fn parse_category(value: &str) -> Result<RejectionCategory, String> {
    value.parse().map_err(|e| format!("{e}"))
}

fn filter(since: Option<&str>, channel: Option<Channel>) -> Result<LedgerFilter, String> {
    let filter = LedgerFilter {
        channel,
        ..LedgerFilter::default()
    };
    match since {
        Some(window) => Ok(filter.within(parse_window(window).map_err(|e| e.to_string())?)),
        None => Ok(filter),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (resolved_config_path, _) = resolve_config_path(cli.config.clone());
    let config_path = resolved_config_path.as_deref().or(Some("config.toml"));
    let config = load_config(config_path)
        .expect("failed to load configuration; check the --config path");

    let filter_directive =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter_directive)
        .with_writer(std::io::stderr)
        .init();

    let pool = leadline_db::create_pool(&config.database.path, config.database.runtime_settings())
        .expect("failed to open database; check database.path in config");
    {
        let conn = pool
            .get()
            .expect("failed to get database connection for migrations");
        leadline_db::run_migrations(&conn).expect("failed to run database migrations");
    }
    let lead_api = NpaClient::new(config.lead_api.clone()).expect("failed to build lead API client");
    let submitter = LeadSubmitter::new(pool, Arc::new(lead_api));

    match run(cli.command, &submitter).await {
        Ok(code) => code,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, submitter: &LeadSubmitter) -> Result<ExitCode, String> {
    let lead_error = |e: LeadError| e.to_string();
    match command {
        Command::ListFailed { all } => {
            let failed = submitter.list_failed(all).await.map_err(lead_error)?;
            if failed.is_empty() {
                println!("no failed submissions");
            }
            for entry in failed {
                println!(
                    "#{} session={} channel={} retries={} {}created={}",
                    entry.id,
                    entry.session_id,
                    entry.channel.as_str(),
                    entry.retry_count,
                    if entry.resolved { "resolved " } else { "" },
                    entry.created_at,
                );
                println!(
                    "    {} | {} | {} | {}",
                    entry.lead.full_name,
                    entry.lead.phone,
                    entry.lead.zip_code,
                    entry.lead.vehicle_label(),
                );
                for line in entry.error.lines().filter(|l| !l.trim().is_empty()) {
                    println!("    ! {line}");
                }
            }
        }
        Command::Retry { id } => match submitter.retry(id).await.map_err(lead_error)? {
            RetryOutcome::Succeeded { record_id } => {
                println!("#{id} delivered, record {record_id}");
            }
            RetryOutcome::Failed { error, retry_count } => {
                println!("#{id} failed again (attempt {retry_count}): {error}");
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::RetryAll => {
            let summary = submitter.retry_all().await.map_err(lead_error)?;
            println!(
                "retried {}: {} delivered, {} still failing",
                summary.succeeded + summary.failed,
                summary.succeeded,
                summary.failed
            );
            if summary.failed > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::ListRejected {
            since,
            channel,
            category,
        } => {
            let filter = LedgerFilter {
                category,
                ..filter(since.as_deref(), channel)?
            };
            let rejected = submitter.list_rejected(filter).await.map_err(lead_error)?;
            if rejected.is_empty() {
                println!("no rejected leads");
            }
            for entry in rejected {
                println!(
                    "#{} session={} channel={} category={} at={}",
                    entry.id,
                    entry.session_id,
                    entry.channel.as_str(),
                    entry.category.as_str(),
                    entry.rejected_at,
                );
                println!(
                    "    {} | {} | {} | {}: {}",
                    entry.lead.full_name,
                    entry.lead.zip_code,
                    entry.lead.vehicle_label(),
                    entry.category.as_str(),
                    entry.reason,
                );
            }
        }
        Command::Reconcile { since, channel } => {
            let filter = filter(since.as_deref(), channel)?;
            let succeeded = submitter
                .reconcile_succeeded(filter)
                .await
                .map_err(lead_error)?;
            println!("{} succeeded submission(s)", succeeded.len());
            for entry in succeeded {
                println!(
                    "record={} session={} channel={} at={} {} | {}",
                    entry.record_id,
                    entry.session_id,
                    entry.channel.as_str(),
                    entry.submitted_at,
                    entry.lead.full_name,
                    entry.lead.vehicle_label(),
                );
            }
        }
        Command::ListAbandoned { older_than } => {
            let age = parse_window(&older_than).map_err(|e| e.to_string())?;
            let sessions = submitter.list_abandoned(age).await.map_err(lead_error)?;
            if sessions.is_empty() {
                println!("no abandoned sessions");
            }
            for session in sessions {
                println!(
                    "session={} channel={} key={} from={} last_prompt={} updated={}",
                    session.id,
                    session.channel.as_str(),
                    session.session_key,
                    session.from_number.as_deref().unwrap_or("-"),
                    session.last_prompt_field.as_deref().unwrap_or("-"),
                    session.updated_at,
                );
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
