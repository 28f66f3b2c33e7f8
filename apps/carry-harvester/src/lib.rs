//! # Carry Harvester
//!
//! Scheduled MOEX futures carry scanner. Each cycle fetches quotes for the
//! configured contract universe, computes outright and calendar-spread carry,
//! appends the results to SQLite and daily CSV files, and publishes the
//! ranked summaries to chat subscribers.
//!
//! ## Binaries
//! - `carry-harvester run`: scheduler plus bot command loop
//! - `carry-harvester once`: a single cycle printed to the console
//! - `carry-harvester next`: upcoming schedule slots

pub mod bot;
pub mod config;
pub mod cycle;
pub mod format;
pub mod runner;
pub mod schedule;
pub mod telegram;

pub use config::{HarvesterConfig, DEFAULT_CONFIG_PATH};
pub use cycle::{CycleOutput, RefreshCycle};
pub use runner::{RunStats, Runner};
pub use schedule::WeeklySchedule;
