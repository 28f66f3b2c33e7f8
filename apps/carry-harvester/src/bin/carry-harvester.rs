//! Scheduled carry scanner with chat publishing.
//!
//! Wires: schedule → RefreshCycle (ISS → engine → SQLite/CSV) → Telegram.
//! The bot long-polls for /start, /stop and /top in a background task.
//!
//! Usage:
//!   carry-harvester --config configs/carry.toml run
//!   carry-harvester once --dry-run
//!   carry-harvester next --count 6

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use carry_harvester::bot::{self, LatestViews};
use carry_harvester::format;
use carry_harvester::telegram::BotApi;
use carry_harvester::{HarvesterConfig, RefreshCycle, RunStats, Runner, DEFAULT_CONFIG_PATH};
use quantlaxmi_carry_store::{SqliteSubscriberStore, SubscriberStore};

#[derive(Parser, Debug)]
#[command(name = "carry-harvester")]
#[command(about = "MOEX futures carry scanner with Telegram publishing")]
#[command(version)]
struct Cli {
    /// Path to the TOML config
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run scheduled cycles and the bot until Ctrl+C
    Run,

    /// Run a single cycle now and print the ranked tables
    Once {
        /// Compute and print only; nothing is persisted
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the next scheduled slots
    Next {
        #[arg(long, default_value_t = 5)]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(LevelFilter::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = HarvesterConfig::load(&cli.config)?;

    match cli.command {
        Commands::Run => run(config).await,
        Commands::Once { dry_run } => once(config, dry_run).await,
        Commands::Next { count } => next(&config, count),
    }
}

async fn run(config: HarvesterConfig) -> Result<()> {
    let token = config.telegram.token()?;
    let schedule = config.schedule.build()?;
    let cycle = RefreshCycle::from_config(&config)?;

    let subscribers: Arc<dyn SubscriberStore> = Arc::new(
        SqliteSubscriberStore::open(&config.storage.subscribers_path).with_context(|| {
            format!(
                "Failed to open subscriber store {}",
                config.storage.subscribers_path.display()
            )
        })?,
    );
    let api = Arc::new(BotApi::new(
        &config.telegram.api_base,
        &token,
        Duration::from_secs(config.telegram.poll_timeout_secs),
    )?);
    let latest: LatestViews = Arc::new(RwLock::new(None));
    let stats = Arc::new(RunStats::default());

    info!(
        contracts = cycle.universe().len(),
        sinks = ?cycle.sink_names(),
        subscribers = subscribers.list()?.len(),
        offset = %schedule.offset(),
        "Carry Harvester starting"
    );

    tokio::spawn(bot::poll_updates(
        api.clone(),
        subscribers.clone(),
        latest.clone(),
        config.telegram.poll_timeout_secs,
    ));

    let runner = Runner {
        schedule,
        cycle,
        notifier: api,
        subscribers,
        latest,
        stats: stats.clone(),
    };

    info!("Scheduler running. Press Ctrl+C to stop.");

    tokio::select! {
        _ = runner.run() => {
            info!("Scheduler finished");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received, shutting down");
        }
    }

    let [ok, failed, sent, undelivered] = stats.snapshot();
    println!("\n--- Carry Harvester Summary ---");
    println!("Cycles ok:       {}", ok);
    println!("Cycles failed:   {}", failed);
    println!("Messages sent:   {}", sent);
    println!("Undelivered:     {}", undelivered);

    Ok(())
}

async fn once(config: HarvesterConfig, dry_run: bool) -> Result<()> {
    let mut cycle = RefreshCycle::from_config(&config)?;
    let output = cycle.run(!dry_run).await?;
    let views = &output.views;

    println!("\n=== Carry as of {} ===", views.as_of.format("%d.%m.%Y %H:%M:%S"));
    println!("{}", format::carry_header());
    for (i, r) in views.top_carry.iter().enumerate() {
        println!("{}", format::carry_row(i, r));
    }

    println!("\n=== Top spreads ===");
    println!("{}", format::spread_header());
    for (i, r) in views.top_spreads.iter().enumerate() {
        println!("{}", format::spread_row(i, r));
    }

    println!("\n=== Bottom spreads ===");
    println!("{}", format::spread_header());
    for (i, r) in views.bottom_spreads.iter().enumerate() {
        println!("{}", format::spread_row(i, r));
    }

    for diagnostic in &output.batch.diagnostics {
        println!("  ! {}", diagnostic);
    }
    println!(
        "\n{} futures rows, {} carry records, {} spreads, persisted: {}",
        output.futures_rows,
        output.batch.carry.len(),
        output.batch.spreads.len(),
        output.persisted
    );
    Ok(())
}

fn next(config: &HarvesterConfig, count: usize) -> Result<()> {
    let schedule = config.schedule.build()?;
    for slot in schedule.upcoming(&Utc::now(), count) {
        println!("{}", slot.format("%a %d.%m.%Y %H:%M %:z"));
    }
    Ok(())
}
