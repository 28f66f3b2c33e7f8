//! Decoded FORTS futures and TQBR shares snapshots.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use quantlaxmi_carry::{AssetCodeMap, FuturesQuote, UnderlyingQuote};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{IssError, IssResult};
use crate::table::{IssRow, IssTable};

pub const FUTURES_SECURITY_COLUMNS: &[&str] = &[
    "SECID",
    "SHORTNAME",
    "LASTDELDATE",
    "SECTYPE",
    "ASSETCODE",
    "PREVOPENPOSITION",
    "LOTVOLUME",
    "INITIALMARGIN",
];
pub const FUTURES_MARKETDATA_COLUMNS: &[&str] =
    &["SYSTIME", "SECID", "LAST", "OPENPOSITION", "NUMTRADES", "TIME"];
pub const SHARES_SECURITY_COLUMNS: &[&str] = &["SECID", "SHORTNAME", "LOTSIZE"];
pub const SHARES_MARKETDATA_COLUMNS: &[&str] = &["SECID", "BID", "OFFER", "LAST", "TIME", "SYSTIME"];

/// One futures contract as reported by the exchange, after asset-code
/// normalization. Persisted verbatim with each cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuturesSnapshotRow {
    pub secid: String,
    pub short_name: String,
    pub last_del_date: NaiveDate,
    pub sec_type: Option<String>,
    pub asset_code: Option<String>,
    pub prev_open_position: Option<f64>,
    pub lot_volume: u32,
    pub initial_margin: Option<f64>,
    pub systime: Option<NaiveDateTime>,
    pub last: Option<f64>,
    pub open_position: Option<f64>,
    pub num_trades: Option<u64>,
    pub time: Option<NaiveTime>,
}

impl FuturesSnapshotRow {
    fn decode(sec: &IssRow<'_>, md: &IssRow<'_>, assets: &AssetCodeMap) -> IssResult<Self> {
        let asset_code = sec
            .opt_string("ASSETCODE")?
            .map(|code| assets.normalize(&code).to_string());
        Ok(Self {
            secid: sec.string("SECID")?,
            short_name: sec.string("SHORTNAME")?,
            last_del_date: sec.date("LASTDELDATE")?,
            sec_type: sec.opt_string("SECTYPE")?,
            asset_code,
            prev_open_position: sec.opt_f64("PREVOPENPOSITION")?,
            lot_volume: sec.u32("LOTVOLUME")?,
            initial_margin: sec.opt_f64("INITIALMARGIN")?,
            systime: md.opt_datetime("SYSTIME")?,
            last: md.opt_f64("LAST")?,
            open_position: md.opt_f64("OPENPOSITION")?,
            num_trades: md.opt_u64("NUMTRADES")?,
            time: md.opt_time("TIME")?,
        })
    }

    pub fn trade_ts(&self) -> Option<NaiveDateTime> {
        trade_ts(self.systime, self.time)
    }

    pub fn to_quote(&self) -> FuturesQuote {
        FuturesQuote {
            code: self.secid.clone(),
            short_name: self.short_name.clone(),
            underlying_code: self.asset_code.clone(),
            last: self.last,
            lot_multiplier: self.lot_volume,
            expiry: self.last_del_date,
            trade_ts: self.trade_ts(),
        }
    }
}

/// One share as reported on the main equity board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharesSnapshotRow {
    pub secid: String,
    pub short_name: String,
    pub lot_size: u32,
    pub bid: Option<f64>,
    pub offer: Option<f64>,
    pub last: Option<f64>,
    pub time: Option<NaiveTime>,
    pub systime: Option<NaiveDateTime>,
}

impl SharesSnapshotRow {
    fn decode(sec: &IssRow<'_>, md: &IssRow<'_>) -> IssResult<Self> {
        Ok(Self {
            secid: sec.string("SECID")?,
            short_name: sec.string("SHORTNAME")?,
            lot_size: sec.u32("LOTSIZE")?,
            bid: md.opt_f64("BID")?,
            offer: md.opt_f64("OFFER")?,
            last: md.opt_f64("LAST")?,
            time: md.opt_time("TIME")?,
            systime: md.opt_datetime("SYSTIME")?,
        })
    }

    pub fn to_quote(&self) -> UnderlyingQuote {
        UnderlyingQuote {
            code: self.secid.clone(),
            short_name: self.short_name.clone(),
            last: self.last,
            lot_size: self.lot_size,
            trade_ts: trade_ts(self.systime, self.time),
        }
    }
}

/// ISS reports trade time-of-day only; the date comes from the system clock.
fn trade_ts(systime: Option<NaiveDateTime>, time: Option<NaiveTime>) -> Option<NaiveDateTime> {
    Some(systime?.date().and_time(time?))
}

fn sections(root: &Value, sec_cols: &[&str], md_cols: &[&str]) -> IssResult<(IssTable, IssTable)> {
    let securities = IssTable::from_response(root, "securities")?;
    let marketdata = IssTable::from_response(root, "marketdata")?;
    securities.require(sec_cols)?;
    marketdata.require(md_cols)?;
    Ok((securities, marketdata))
}

/// Decode joined rows, skipping rows with an unparseable cell. Any other
/// error aborts the snapshot.
fn decode_rows<T>(
    pairs: &[(IssRow<'_>, IssRow<'_>)],
    decode: impl Fn(&IssRow<'_>, &IssRow<'_>) -> IssResult<T>,
) -> IssResult<Vec<T>> {
    let mut rows = Vec::with_capacity(pairs.len());
    for (sec, md) in pairs {
        match decode(sec, md) {
            Ok(row) => rows.push(row),
            Err(e @ IssError::BadCell { .. }) => {
                warn!(error = %e, "[ISS] Skipping undecodable row");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(rows)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FuturesSnapshot {
    /// Latest `SYSTIME` across rows, if the exchange reported any.
    pub as_of: Option<NaiveDateTime>,
    pub rows: Vec<FuturesSnapshotRow>,
}

impl FuturesSnapshot {
    /// Decode a `securities.json` body from the FORTS board. Rows with an
    /// unparseable cell are logged and dropped.
    pub fn decode(body: &str, assets: &AssetCodeMap) -> IssResult<Self> {
        let root: Value = serde_json::from_str(body)?;
        let (securities, marketdata) =
            sections(&root, FUTURES_SECURITY_COLUMNS, FUTURES_MARKETDATA_COLUMNS)?;

        let pairs = securities.join_on_secid(&marketdata)?;
        let rows = decode_rows(&pairs, |sec, md| FuturesSnapshotRow::decode(sec, md, assets))?;
        let as_of = rows.iter().filter_map(|r| r.systime).max();

        Ok(Self { as_of, rows })
    }

    pub fn quotes(&self) -> Vec<FuturesQuote> {
        self.rows.iter().map(FuturesSnapshotRow::to_quote).collect()
    }

    /// Distinct normalized asset codes, sorted.
    pub fn asset_codes(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|r| r.asset_code.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SharesSnapshot {
    pub rows: Vec<SharesSnapshotRow>,
}

impl SharesSnapshot {
    /// Decode a `securities.json` body from the TQBR board.
    pub fn decode(body: &str) -> IssResult<Self> {
        let root: Value = serde_json::from_str(body)?;
        let (securities, marketdata) =
            sections(&root, SHARES_SECURITY_COLUMNS, SHARES_MARKETDATA_COLUMNS)?;

        let pairs = securities.join_on_secid(&marketdata)?;
        let rows = decode_rows(&pairs, SharesSnapshotRow::decode)?;

        Ok(Self { rows })
    }

    pub fn quotes(&self) -> Vec<UnderlyingQuote> {
        self.rows.iter().map(SharesSnapshotRow::to_quote).collect()
    }
}
