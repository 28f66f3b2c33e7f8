//! # Configuration Loading
//!
//! TOML configuration for the harvester. Every section has defaults, so an
//! empty file (or a file with only `[universe]`) is valid. Secrets never live
//! here; the bot token comes from the environment.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use quantlaxmi_carry::{AssetCodeMap, DEFAULT_TOP_N};
use quantlaxmi_connectors_moex::DEFAULT_BASE_URL;
use serde::Deserialize;

use crate::schedule::WeeklySchedule;

pub const DEFAULT_CONFIG_PATH: &str = "configs/carry.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HarvesterConfig {
    pub iss: IssSection,
    pub universe: UniverseSection,
    pub schedule: ScheduleSection,
    pub storage: StorageSection,
    pub telegram: TelegramSection,
    pub report: ReportSection,
}

/// Market-data endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IssSection {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Extra futures asset-code substitutions, applied over the built-in table.
    pub asset_overrides: BTreeMap<String, String>,
}

impl Default for IssSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            asset_overrides: BTreeMap::new(),
        }
    }
}

impl IssSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn asset_codes(&self) -> AssetCodeMap {
        AssetCodeMap::with_overrides(self.asset_overrides.clone())
    }
}

/// Futures contracts to scan: inline list, or a comma-separated file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UniverseSection {
    pub contracts: Vec<String>,
    pub contracts_file: Option<PathBuf>,
}

impl UniverseSection {
    /// Inline contracts win over the file. Empty result is an error.
    pub fn resolve(&self) -> Result<Vec<String>> {
        let contracts = if !self.contracts.is_empty() {
            clean_codes(self.contracts.iter().map(String::as_str))
        } else if let Some(path) = &self.contracts_file {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Could not read contracts file: {}", path.display()))?;
            clean_codes(raw.split(','))
        } else {
            Vec::new()
        };

        if contracts.is_empty() {
            anyhow::bail!("Contract universe is empty: set universe.contracts or universe.contracts_file");
        }
        Ok(contracts)
    }
}

fn clean_codes<'a>(codes: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for code in codes.map(str::trim).filter(|c| !c.is_empty()) {
        if !out.iter().any(|c| c == code) {
            out.push(code.to_string());
        }
    }
    out
}

/// Publication slots. Default mirrors `34 11,16,23 * * MON-FRI` in Moscow time.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleSection {
    pub times: Vec<String>,
    pub weekdays: String,
    pub utc_offset_hours: i32,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            times: vec!["11:34".into(), "16:34".into(), "23:34".into()],
            weekdays: "Mon-Fri".to_string(),
            utc_offset_hours: 3,
        }
    }
}

impl ScheduleSection {
    pub fn build(&self) -> Result<WeeklySchedule> {
        WeeklySchedule::parse(&self.times, &self.weekdays, self.utc_offset_hours)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Root of the daily CSV tree.
    pub data_dir: PathBuf,
    pub sqlite_path: PathBuf,
    pub subscribers_path: PathBuf,
    pub csv_enabled: bool,
    pub sqlite_enabled: bool,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            sqlite_path: PathBuf::from("data/spread.db"),
            subscribers_path: PathBuf::from("data/subscribers.db"),
            csv_enabled: true,
            sqlite_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramSection {
    pub api_base: String,
    /// Environment variable holding the bot token.
    pub token_env: String,
    /// `getUpdates` long-poll timeout.
    pub poll_timeout_secs: u64,
}

impl Default for TelegramSection {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
            token_env: "TELEGRAM_BOT_TOKEN".to_string(),
            poll_timeout_secs: 30,
        }
    }
}

impl TelegramSection {
    /// Bot token from the environment (after `.env` has been loaded).
    pub fn token(&self) -> Result<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("Telegram token not set: export {}", self.token_env))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportSection {
    pub top_n: usize,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl HarvesterConfig {
    /// Load configuration from file path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = std::fs::read_to_string(path)
            .map_err(|_| anyhow::anyhow!("Could not find config file: {}", path.display()))?;
        Self::parse(&config_str)
    }

    pub fn parse(config_str: &str) -> Result<Self> {
        toml::from_str(config_str).map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))
    }
}
