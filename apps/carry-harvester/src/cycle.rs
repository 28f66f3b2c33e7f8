//! One refresh cycle: fetch → compute → persist.
//!
//! The batch is fully computed before any sink is touched, so a retrieval or
//! structural failure persists nothing. Persistence goes to all sinks or none.

use anyhow::{Context, Result};
use chrono::{FixedOffset, NaiveDateTime, Utc};
use quantlaxmi_carry::{CarryBatch, CarryEngine, RankedViews};
use quantlaxmi_carry_store::{append_all, CsvHistory, CycleBatch, HistorySink, SqliteHistory};
use quantlaxmi_connectors_moex::{IssClient, QuoteProvider};
use tracing::info;

use crate::config::HarvesterConfig;

pub struct CycleOutput {
    pub batch: CarryBatch,
    pub views: RankedViews,
    /// Raw futures rows of the snapshot.
    pub futures_rows: usize,
    pub persisted: bool,
}

pub struct RefreshCycle {
    provider: Box<dyn QuoteProvider>,
    engine: CarryEngine,
    universe: Vec<String>,
    sinks: Vec<Box<dyn HistorySink>>,
    exchange_offset: FixedOffset,
}

impl RefreshCycle {
    pub fn new(
        provider: Box<dyn QuoteProvider>,
        engine: CarryEngine,
        universe: Vec<String>,
        exchange_offset: FixedOffset,
    ) -> Self {
        Self {
            provider,
            engine,
            universe,
            sinks: Vec::new(),
            exchange_offset,
        }
    }

    /// ISS client plus the sinks enabled in `[storage]`.
    pub fn from_config(config: &HarvesterConfig) -> Result<Self> {
        let universe = config.universe.resolve()?;
        let client = IssClient::new(config.iss.base_url.clone(), config.iss.asset_codes())
            .with_timeout(config.iss.timeout())
            .context("Failed to build ISS client")?;
        let offset = config.schedule.build()?.offset();

        let mut cycle = Self::new(
            Box::new(client),
            CarryEngine::new(config.report.top_n),
            universe,
            offset,
        );
        if config.storage.sqlite_enabled {
            let sqlite = SqliteHistory::open(&config.storage.sqlite_path).with_context(|| {
                format!(
                    "Failed to open history database {}",
                    config.storage.sqlite_path.display()
                )
            })?;
            cycle = cycle.with_sink(Box::new(sqlite));
        }
        if config.storage.csv_enabled {
            cycle = cycle.with_sink(Box::new(CsvHistory::new(&config.storage.data_dir)));
        }
        Ok(cycle)
    }

    pub fn with_sink(mut self, sink: Box<dyn HistorySink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn universe(&self) -> &[String] {
        &self.universe
    }

    pub fn sink_names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Wall clock in the exchange offset, used when the provider reports no
    /// snapshot time.
    fn exchange_now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.exchange_offset).naive_local()
    }

    pub async fn run(&mut self, persist: bool) -> Result<CycleOutput> {
        let market = self
            .provider
            .snapshot(&self.universe)
            .await
            .context("Failed to fetch market snapshot")?;

        let as_of = market.as_of().unwrap_or_else(|| self.exchange_now());
        let (batch, views) = self
            .engine
            .compute_ranked(as_of, &market.futures_quotes(), &market.underlying_quotes())
            .context("Carry computation rejected the snapshot")?;

        if persist {
            let cycle = CycleBatch::new(&market.futures.rows, &batch);
            append_all(&mut self.sinks, &cycle).context("Failed to persist cycle")?;
        }

        info!(
            as_of = %as_of,
            futures = market.futures.rows.len(),
            shares = market.shares.rows.len(),
            carry = batch.carry.len(),
            spreads = batch.spreads.len(),
            top_n = self.engine.top_n(),
            persisted = persist && !self.sinks.is_empty(),
            "[CYCLE] Refresh complete"
        );

        Ok(CycleOutput {
            futures_rows: market.futures.rows.len(),
            persisted: persist && !self.sinks.is_empty(),
            batch,
            views,
        })
    }
}
