use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use jobtrail::classify::openai;
use jobtrail::config::Config;
use jobtrail::db::{self, application_repo, processed_repo, Database};
use jobtrail::error::ConfigError;
use jobtrail::merge::run_cleanup;
use jobtrail::secrets::env_secret;
use jobtrail::sync::{SyncOptions, SyncRunner};
use jobtrail::{GmailClient, JobtrailError, OpenAiClassifier};

#[derive(Parser)]
#[command(name = "jobtrail", version, about = "Track job applications from your inbox")]
struct Cli {
    /// Path to the JSON config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch and classify new inbox messages.
    Sync {
        /// Only look at messages newer than this many hours.
        #[arg(long)]
        hours: Option<u32>,
        /// Upper bound on messages examined.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Remove duplicate application records.
    Cleanup,
    /// Print store statistics.
    Stats,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), JobtrailError> {
    let config = match &cli.config {
        Some(path) => jobtrail::load_config(path)?,
        None => Config::default(),
    };
    let db = open_database(&config)?;

    match cli.command {
        Command::Sync { hours, limit } => sync(&config, db, hours, limit).await,
        Command::Cleanup => cleanup(&db),
        Command::Stats => stats(&db),
    }
}

fn open_database(config: &Config) -> Result<Database, JobtrailError> {
    let path = match &config.database_path {
        Some(p) => PathBuf::from(p),
        None => db::default_database_path().ok_or_else(|| ConfigError::Validation {
            message: "could not determine home directory; set database_path in the config"
                .to_string(),
        })?,
    };
    Ok(Database::open(&path)?)
}

async fn sync(
    config: &Config,
    db: Database,
    hours: Option<u32>,
    limit: Option<usize>,
) -> Result<(), JobtrailError> {
    let access_token = env_secret(&config.gmail.access_token_env).map_err(|e| {
        ConfigError::Validation {
            message: e.to_string(),
        }
    })?;
    let api_key = env_secret(&config.classifier.api_key_env).map_err(|e| {
        ConfigError::Validation {
            message: e.to_string(),
        }
    })?;

    let provider = Arc::new(GmailClient::new(access_token));
    let classifier = Arc::new(OpenAiClassifier::new(
        api_key,
        config
            .classifier
            .base_url
            .as_deref()
            .unwrap_or(openai::DEFAULT_BASE_URL),
        config
            .classifier
            .model
            .as_deref()
            .unwrap_or(openai::DEFAULT_MODEL),
    ));

    let options = SyncOptions {
        lookback_hours: hours.or(config.sync.lookback_hours),
        max_messages: limit.unwrap_or(config.sync.max_messages),
        checkpoint_interval: config.sync.checkpoint_interval,
        retry: config.sync.retry.policy(),
    };

    let runner = SyncRunner::new(db, provider, classifier, options);
    let cancel = runner.cancel_flag();
    ctrlc::set_handler(move || {
        eprintln!("interrupt received, finishing current message...");
        cancel.store(true, Ordering::SeqCst);
    })
    .map_err(|e| ConfigError::Validation {
        message: format!("failed to install interrupt handler: {e}"),
    })?;

    let report = runner.run().await?;
    println!(
        "sync done: {} created, {} updated, {} unchanged, {} not job-related, {} skipped, {} failed",
        report.created,
        report.updated,
        report.unchanged,
        report.not_job_related,
        report.skipped,
        report.failed,
    );
    Ok(())
}

fn cleanup(db: &Database) -> Result<(), JobtrailError> {
    let report = run_cleanup(db)?;
    info!(
        examined = report.examined,
        deleted = report.deleted,
        "cleanup finished"
    );
    println!(
        "cleanup done: examined {} record(s), removed {} duplicate(s)",
        report.examined, report.deleted
    );
    Ok(())
}

fn stats(db: &Database) -> Result<(), JobtrailError> {
    let (total, by_status, changes, processed, job_related, last) = db.with_conn(|conn| {
        Ok((
            application_repo::count(conn)?,
            application_repo::count_by_status(conn)?,
            application_repo::count_status_changes(conn)?,
            processed_repo::count(conn)?,
            processed_repo::count_job_related(conn)?,
            processed_repo::last_processed_at(conn)?,
        ))
    })?;

    println!("applications: {total}");
    for (status, count) in by_status {
        println!("  {status}: {count}");
    }
    println!("status changes: {changes}");
    println!("processed messages: {processed} ({job_related} job-related)");
    match last {
        Some(at) => println!("last processed: {at}"),
        None => println!("last processed: never"),
    }
    Ok(())
}
