//! Quote snapshots consumed by the engine and the records it derives.
//!
//! All timestamps are exchange-local wall time (`NaiveDateTime`), the way the
//! provider reports them. Prices are `Option<f64>`: `None` means the
//! instrument has not traded in the session.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Cash instrument quote from one refresh snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnderlyingQuote {
    /// Instrument code, unique per snapshot (e.g. `SBER`).
    pub code: String,
    pub short_name: String,
    /// Last traded price.
    pub last: Option<f64>,
    /// Shares per exchange lot.
    pub lot_size: u32,
    pub trade_ts: Option<NaiveDateTime>,
}

/// Futures contract quote from one refresh snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuturesQuote {
    /// Contract code, unique per snapshot (e.g. `SRZ4`).
    pub code: String,
    pub short_name: String,
    /// Underlying instrument code after normalization.
    pub underlying_code: Option<String>,
    /// Last traded price (per contract, in underlying price units × multiplier).
    pub last: Option<f64>,
    /// Units of the underlying delivered per contract.
    pub lot_multiplier: u32,
    /// Last trading day.
    pub expiry: NaiveDate,
    pub trade_ts: Option<NaiveDateTime>,
}

/// One futures contract joined to its underlying, with derived carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarryRecord {
    /// As-of timestamp of the refresh cycle that produced the record.
    pub cycle_ts: NaiveDateTime,
    pub contract_code: String,
    pub futures_short_name: String,
    pub underlying_code: String,
    pub underlying_short_name: String,
    pub futures_last: Option<f64>,
    pub underlying_last: Option<f64>,
    pub lot_multiplier: u32,
    pub underlying_lot_size: u32,
    pub expiry: NaiveDate,
    pub futures_trade_ts: Option<NaiveDateTime>,
    pub underlying_trade_ts: Option<NaiveDateTime>,
    /// Calendar days to expiry, inclusive of the expiry day. May be zero or negative.
    pub days_to_expiry: i64,
    /// Premium of the contract over `underlying_last × lot_multiplier`, in percent.
    pub carry_pct: Option<f64>,
    pub carry_pct_annualized: Option<f64>,
}

/// Calendar spread between two consecutive expiries on one underlying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadRecord {
    pub cycle_ts: NaiveDateTime,
    pub underlying_code: String,
    pub near_contract: String,
    pub far_contract: String,
    /// `"<near short name>-<far short name>"`.
    pub spread_name: String,
    pub near_expiry: NaiveDate,
    pub far_expiry: NaiveDate,
    /// Days to the far leg's expiry.
    pub days_to_expiry: i64,
    pub spread_carry_pct: f64,
    /// Absent when `days_to_expiry <= 0`.
    pub spread_carry_pct_annualized: Option<f64>,
}
