//! Boardsync CLI - outbox-driven search index synchronization

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use boardsync_core::config::{Config, SearchConfig};
use boardsync_core::index::{
    ElasticsearchClient, IndexBackend, IndexField, JobIndexField, MemoryIndex,
};
use boardsync_core::job::{CareerLevel, EmploymentType, PositionCategory, RemotePolicy};
use boardsync_core::outbox::{EventStatus, OutboxStore, SqliteOutboxStore, TargetType};
use boardsync_core::query::{SearchQueryExecutor, SortOption, SortOrder};
use boardsync_core::search::{JobSearch, JobSearchRequest, JobSearchResponse};
use boardsync_core::storage::{Database, DatabaseConfig};
use boardsync_core::sync::{SyncReport, SyncRunner, SyncScheduler, job_sync_task};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "boardsync")]
#[command(author, version, about = "Keep the job board's search index in sync", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the outbox sync worker
    Sync {
        #[command(subcommand)]
        action: SyncAction,
    },

    /// Inspect and repair outbox events
    Outbox {
        #[command(subcommand)]
        action: OutboxAction,
    },

    /// Query the search index
    Search {
        #[command(subcommand)]
        action: SearchAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run health check
    Doctor,
}

#[derive(Subcommand)]
enum SyncAction {
    /// Tick the worker until interrupted (Ctrl-C)
    Run {
        /// Seconds between ticks (defaults to sync.interval_secs)
        #[arg(short, long)]
        interval: Option<u64>,
        /// Index into an in-process store instead of the search cluster
        #[arg(long)]
        memory_index: bool,
    },
    /// Process one batch of pending events and exit
    Once {
        /// Index into an in-process store instead of the search cluster
        #[arg(long)]
        memory_index: bool,
    },
}

#[derive(Subcommand)]
enum OutboxAction {
    /// List recent events, newest first
    List {
        /// WAIT, PROCESSING, COMPLETED or FAILED
        #[arg(short, long)]
        status: Option<String>,
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },
    /// Move FAILED events back to WAIT
    Requeue {
        /// Only events below this retry count (defaults to sync.max_retries)
        #[arg(long)]
        max_retries: Option<u32>,
        /// Restrict to one target type (e.g. JOB)
        #[arg(short, long)]
        target_type: Option<String>,
    },
}

#[derive(Subcommand)]
enum SearchAction {
    /// Search job postings
    Jobs(JobSearchArgs),
}

#[derive(Args)]
struct JobSearchArgs {
    /// Full-text match on the title
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    company: Option<String>,
    /// ENTRY, JUNIOR, MID, SENIOR or LEAD
    #[arg(long)]
    career_level: Option<String>,
    #[arg(long)]
    employment_type: Option<String>,
    #[arg(long)]
    position_category: Option<String>,
    /// REMOTE, HYBRID or ONSITE
    #[arg(long)]
    remote_policy: Option<String>,
    /// Tech category; repeat for several
    #[arg(long = "tech")]
    tech: Vec<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    min_years: Option<u32>,
    #[arg(long)]
    max_years: Option<u32>,
    /// First result offset (inclusive)
    #[arg(long, allow_negative_numbers = true)]
    from: Option<i64>,
    /// Last result offset (exclusive)
    #[arg(long, allow_negative_numbers = true)]
    to: Option<i64>,
    /// Index field to sort by (e.g. popularity.view_count)
    #[arg(long)]
    sort: Option<String>,
    /// Sort ascending instead of descending
    #[arg(long, requires = "sort")]
    asc: bool,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so `--format json` output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("boardsync=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sync { action } => {
            let config = Config::load()?;
            let db = open_database(&config).await?;
            cmd_sync(&db, &config, action, cli.format, cli.quiet).await
        }

        Commands::Outbox { action } => {
            let config = Config::load()?;
            let db = open_database(&config).await?;
            cmd_outbox(&db, &config, action, cli.format, cli.quiet).await
        }

        Commands::Search { action } => {
            let config = Config::load()?;
            cmd_search(&config, action, cli.format, cli.quiet).await
        }

        Commands::Config { action } => cmd_config(action, cli.quiet),

        Commands::Doctor => cmd_doctor(cli.quiet).await,
    }
}

async fn open_database(config: &Config) -> anyhow::Result<Database> {
    Database::new(DatabaseConfig::from_settings(&config.database)).await
}

fn open_backend(search: &SearchConfig, memory_index: bool) -> anyhow::Result<Arc<dyn IndexBackend>> {
    if memory_index {
        return Ok(Arc::new(MemoryIndex::new()));
    }
    let client = ElasticsearchClient::from_config(search)
        .context("Failed to build search cluster client")?;
    Ok(Arc::new(client))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse an upper-case keyword flag such as `--career-level senior`
fn parse_keyword<T>(flag: &str, value: &str, parse: fn(&str) -> Option<T>) -> anyhow::Result<T> {
    parse(&value.trim().to_uppercase())
        .ok_or_else(|| anyhow::anyhow!("Invalid value for --{}: '{}'", flag, value))
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_sync(
    db: &Database,
    config: &Config,
    action: SyncAction,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    match action {
        SyncAction::Run {
            interval,
            memory_index,
        } => {
            let backend = open_backend(&config.search, memory_index)?;
            let task = job_sync_task(config, db.pool().clone(), backend);
            let interval = Duration::from_secs(interval.unwrap_or(config.sync.interval_secs));
            let scheduler = SyncScheduler::new(Arc::new(task)).with_interval(interval);

            let cancel = CancellationToken::new();
            let shutdown = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Shutdown requested, waiting for the active run");
                    shutdown.cancel();
                }
            });

            if !quiet {
                println!(
                    "Sync worker running every {}s (Ctrl-C to stop)",
                    interval.as_secs()
                );
            }
            scheduler.run(cancel).await?;
            if !quiet {
                println!("Sync worker stopped.");
            }
        }
        SyncAction::Once { memory_index } => {
            let backend = open_backend(&config.search, memory_index)?;
            let task = job_sync_task(config, db.pool().clone(), backend);
            let released = task.release_in_flight().await?;
            if released > 0 {
                info!(released, "Released in-flight events from an interrupted run");
            }
            let report = task.run().await?;
            match format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Text if !quiet => print_report(&report),
                OutputFormat::Text => {}
            }
        }
    }
    Ok(())
}

fn print_report(report: &SyncReport) {
    if report.is_empty() {
        println!("No pending events.");
        return;
    }
    println!(
        "Processed {} {} event(s): {} completed, {} failed",
        report.claimed, report.target_type, report.completed, report.failed
    );
    if report.released > 0 {
        println!("  {} event(s) returned to WAIT for the next run", report.released);
    }
    for failure in &report.failures {
        println!(
            "  [!!] event {} (target {}): {}",
            failure.event_id, failure.target_id, failure.message
        );
    }
}

async fn cmd_outbox(
    db: &Database,
    config: &Config,
    action: OutboxAction,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let store = SqliteOutboxStore::new(db.pool().clone());

    match action {
        OutboxAction::List { status, limit } => {
            let status = status
                .map(|s| parse_keyword("status", &s, EventStatus::parse))
                .transpose()?;
            let events = store.list_recent(status, limit).await?;

            if format == OutputFormat::Json {
                return print_json(&events);
            }
            if events.is_empty() {
                if !quiet {
                    println!("No outbox events found.");
                }
                return Ok(());
            }
            if !quiet {
                println!("Outbox events:");
            }
            for e in events {
                let error = e
                    .error_message
                    .as_deref()
                    .map(|m| format!("  {}", m))
                    .unwrap_or_default();
                println!(
                    "  {:>6}  {:<14} {:>8}  {:<8} {:<10} retries={}  {}{}",
                    e.id,
                    e.target_type,
                    e.target_id,
                    e.update_type,
                    e.status,
                    e.retry_count,
                    e.updated_at.format("%Y-%m-%d %H:%M:%S"),
                    error
                );
            }
        }
        OutboxAction::Requeue {
            max_retries,
            target_type,
        } => {
            let target_type = target_type
                .map(|t| parse_keyword("target-type", &t, TargetType::parse))
                .transpose()?;
            let max_retries = max_retries.unwrap_or(config.sync.max_retries);
            let requeued = store.requeue_failed(target_type, max_retries).await?;

            match format {
                OutputFormat::Json => print_json(&serde_json::json!({ "requeued": requeued }))?,
                OutputFormat::Text if !quiet => {
                    println!(
                        "Requeued {} failed event(s) (retry count below {}).",
                        requeued, max_retries
                    );
                }
                OutputFormat::Text => {}
            }
        }
    }
    Ok(())
}

impl JobSearchArgs {
    fn to_request(&self) -> anyhow::Result<JobSearchRequest> {
        Ok(JobSearchRequest {
            title: self.title.clone(),
            company: self.company.clone(),
            career_level: self
                .career_level
                .as_deref()
                .map(|v| parse_keyword("career-level", v, CareerLevel::parse))
                .transpose()?,
            employment_type: self
                .employment_type
                .as_deref()
                .map(|v| parse_keyword("employment-type", v, EmploymentType::parse))
                .transpose()?,
            position_category: self
                .position_category
                .as_deref()
                .map(|v| parse_keyword("position-category", v, PositionCategory::parse))
                .transpose()?,
            remote_policy: self
                .remote_policy
                .as_deref()
                .map(|v| parse_keyword("remote-policy", v, RemotePolicy::parse))
                .transpose()?,
            tech_categories: self.tech.iter().map(|t| t.trim().to_uppercase()).collect(),
            location: self.location.clone(),
            min_years: self.min_years,
            max_years: self.max_years,
            from: self.from,
            to: self.to,
        })
    }

    fn sort_option(&self) -> anyhow::Result<Option<SortOption>> {
        let Some(field) = self.sort.as_deref() else {
            return Ok(None);
        };
        let field = JobIndexField::from_field_name(field)
            .ok_or_else(|| anyhow::anyhow!("Unknown sort field: '{}'", field))?;
        let order = if self.asc {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        };
        Ok(Some(SortOption::new(field.field_name(), order)))
    }
}

async fn cmd_search(
    config: &Config,
    action: SearchAction,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    match action {
        SearchAction::Jobs(args) => {
            let mut command = args.to_request()?.to_command();
            if let Some(sort) = args.sort_option()? {
                command = command.sort(sort);
            }

            let backend = open_backend(&config.search, false)?;
            let search = JobSearch::from_config(SearchQueryExecutor::new(backend), &config.search);
            let response = JobSearchResponse::from(search.search(&command).await?);

            if format == OutputFormat::Json {
                return print_json(&response);
            }
            if response.jobs.is_empty() {
                if !quiet {
                    println!("No matching jobs.");
                }
                return Ok(());
            }
            for job in &response.jobs {
                let closed = if job.is_closed { " [closed]" } else { "" };
                println!("  #{} {} @ {}{}", job.job_id, job.title, job.company, closed);
                if !quiet {
                    let mut details = Vec::new();
                    if let Some(level) = &job.career_level {
                        details.push(level.clone());
                    }
                    if let Some(policy) = &job.remote_policy {
                        details.push(policy.clone());
                    }
                    if !job.tech_categories.is_empty() {
                        details.push(job.tech_categories.join(", "));
                    }
                    if !details.is_empty() {
                        println!("      {}", details.join(" | "));
                    }
                    println!("      {}", job.url);
                }
            }
            if !quiet && response.has_next {
                println!();
                println!("More results available; page with --from/--to.");
            }
        }
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let items = config.list()?;
            for (key, value) in items {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

async fn cmd_doctor(quiet: bool) -> anyhow::Result<()> {
    if !quiet {
        println!("Boardsync Health Check");
        println!("======================");
        println!();
    }

    let mut all_ok = true;

    let config = match Config::load() {
        Ok(config) => {
            if !quiet {
                println!("[OK] Configuration: Valid");
            }
            config
        }
        Err(e) => {
            if !quiet {
                println!("[!!] Configuration: Error - {}", e);
                println!("     Falling back to defaults");
            }
            all_ok = false;
            Config::default()
        }
    };

    if !quiet {
        match Config::config_path() {
            Ok(path) if path.exists() => println!("[OK] Config file: {}", path.display()),
            Ok(path) => println!("[--] Config file: {} (using defaults)", path.display()),
            Err(e) => println!("[!!] Config file: Error - {}", e),
        }
    }

    match open_database(&config).await {
        Ok(db) => match db.health_check().await {
            Ok(()) => {
                if !quiet {
                    println!("[OK] Database: Connected");
                    println!("     Path: {}", db.path().display());
                }
                match db.migration_status().await {
                    Ok(status) if status.needs_migration => {
                        all_ok = false;
                        if !quiet {
                            println!(
                                "[!!] Database: Migrations pending (v{} -> v{})",
                                status.current_version, status.target_version
                            );
                        }
                    }
                    Ok(status) => {
                        if !quiet {
                            println!("[OK] Database: Schema v{}", status.current_version);
                        }
                    }
                    Err(e) => {
                        all_ok = false;
                        if !quiet {
                            println!("[!!] Database: Migration check failed - {}", e);
                        }
                    }
                }

                let store = SqliteOutboxStore::new(db.pool().clone());
                if !quiet {
                    for status in [EventStatus::Wait, EventStatus::Processing, EventStatus::Failed] {
                        let count = store.count_by_status(status).await.unwrap_or_default();
                        println!("     Outbox {}: {}", status, count);
                    }
                }
            }
            Err(e) => {
                all_ok = false;
                if !quiet {
                    println!("[!!] Database: Health check failed - {}", e);
                }
            }
        },
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Database: Failed to initialize - {}", e);
            }
        }
    }

    let url = config.search.resolved_url();
    let ping = match ElasticsearchClient::from_config(&config.search) {
        Ok(client) => client.ping().await,
        Err(e) => Err(e),
    };
    match ping {
        Ok(()) => {
            if !quiet {
                println!("[OK] Search cluster: {}", url);
            }
        }
        Err(e) => {
            all_ok = false;
            warn!(url = %url, error = %e, "Search cluster unreachable");
            if !quiet {
                println!("[!!] Search cluster: {} - {}", url, e);
                if let Some(hint) = e.suggestion() {
                    println!("     Try: {}", hint);
                }
            }
        }
    }

    if !quiet {
        println!();
        if all_ok {
            println!("All checks passed!");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }

    Ok(())
}
