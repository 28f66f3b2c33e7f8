//! Flat row encoding shared by the SQLite and CSV sinks.
//!
//! Every history table starts with `cycle_ts`; the remaining columns come
//! from the row type. Values are encoded once as SQLite values and rendered
//! to text for CSV.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use quantlaxmi_carry::{CarryRecord, SpreadRecord};
use quantlaxmi_connectors_moex::FuturesSnapshotRow;
use rusqlite::types::Value;

pub const CYCLE_TS_COLUMN: &str = "cycle_ts";

const DATE_FMT: &str = "%Y-%m-%d";
const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";
const TIME_FMT: &str = "%H:%M:%S";

/// SQLite storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
}

impl ColumnType {
    pub fn sql(self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
        }
    }
}

/// A row type with a fixed history table.
pub trait HistoryRow {
    const TABLE: &'static str;
    /// Columns after `cycle_ts`, in value order.
    const COLUMNS: &'static [(&'static str, ColumnType)];

    fn values(&self) -> Vec<Value>;
}

pub fn timestamp(ts: NaiveDateTime) -> Value {
    Value::Text(ts.format(DATETIME_FMT).to_string())
}

fn opt_timestamp(ts: Option<NaiveDateTime>) -> Value {
    ts.map(timestamp).unwrap_or(Value::Null)
}

fn date(d: NaiveDate) -> Value {
    Value::Text(d.format(DATE_FMT).to_string())
}

fn opt_time(t: Option<NaiveTime>) -> Value {
    t.map(|t| Value::Text(t.format(TIME_FMT).to_string()))
        .unwrap_or(Value::Null)
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn opt_text(s: Option<&str>) -> Value {
    s.map(text).unwrap_or(Value::Null)
}

fn real(x: Option<f64>) -> Value {
    x.map(Value::Real).unwrap_or(Value::Null)
}

fn int(n: i64) -> Value {
    Value::Integer(n)
}

/// CSV rendering of one encoded value. `NULL` is an empty field.
pub fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(n) => n.to_string(),
        Value::Real(x) => x.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => String::from_utf8_lossy(b).into_owned(),
    }
}

impl HistoryRow for FuturesSnapshotRow {
    const TABLE: &'static str = "futures";
    const COLUMNS: &'static [(&'static str, ColumnType)] = &[
        ("secid", ColumnType::Text),
        ("short_name", ColumnType::Text),
        ("last_del_date", ColumnType::Text),
        ("sec_type", ColumnType::Text),
        ("asset_code", ColumnType::Text),
        ("prev_open_position", ColumnType::Real),
        ("lot_volume", ColumnType::Integer),
        ("initial_margin", ColumnType::Real),
        ("systime", ColumnType::Text),
        ("last", ColumnType::Real),
        ("open_position", ColumnType::Real),
        ("num_trades", ColumnType::Integer),
        ("time", ColumnType::Text),
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.secid),
            text(&self.short_name),
            date(self.last_del_date),
            opt_text(self.sec_type.as_deref()),
            opt_text(self.asset_code.as_deref()),
            real(self.prev_open_position),
            int(i64::from(self.lot_volume)),
            real(self.initial_margin),
            opt_timestamp(self.systime),
            real(self.last),
            real(self.open_position),
            self.num_trades
                .and_then(|n| i64::try_from(n).ok())
                .map(int)
                .unwrap_or(Value::Null),
            opt_time(self.time),
        ]
    }
}

impl HistoryRow for CarryRecord {
    const TABLE: &'static str = "carry";
    const COLUMNS: &'static [(&'static str, ColumnType)] = &[
        ("contract_code", ColumnType::Text),
        ("futures_short_name", ColumnType::Text),
        ("underlying_code", ColumnType::Text),
        ("underlying_short_name", ColumnType::Text),
        ("futures_last", ColumnType::Real),
        ("underlying_last", ColumnType::Real),
        ("lot_multiplier", ColumnType::Integer),
        ("underlying_lot_size", ColumnType::Integer),
        ("expiry", ColumnType::Text),
        ("futures_trade_ts", ColumnType::Text),
        ("underlying_trade_ts", ColumnType::Text),
        ("days_to_expiry", ColumnType::Integer),
        ("carry_pct", ColumnType::Real),
        ("carry_pct_annualized", ColumnType::Real),
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.contract_code),
            text(&self.futures_short_name),
            text(&self.underlying_code),
            text(&self.underlying_short_name),
            real(self.futures_last),
            real(self.underlying_last),
            int(i64::from(self.lot_multiplier)),
            int(i64::from(self.underlying_lot_size)),
            date(self.expiry),
            opt_timestamp(self.futures_trade_ts),
            opt_timestamp(self.underlying_trade_ts),
            int(self.days_to_expiry),
            real(self.carry_pct),
            real(self.carry_pct_annualized),
        ]
    }
}

impl HistoryRow for SpreadRecord {
    const TABLE: &'static str = "spread";
    const COLUMNS: &'static [(&'static str, ColumnType)] = &[
        ("underlying_code", ColumnType::Text),
        ("near_contract", ColumnType::Text),
        ("far_contract", ColumnType::Text),
        ("spread_name", ColumnType::Text),
        ("near_expiry", ColumnType::Text),
        ("far_expiry", ColumnType::Text),
        ("days_to_expiry", ColumnType::Integer),
        ("spread_carry_pct", ColumnType::Real),
        ("spread_carry_pct_annualized", ColumnType::Real),
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.underlying_code),
            text(&self.near_contract),
            text(&self.far_contract),
            text(&self.spread_name),
            date(self.near_expiry),
            date(self.far_expiry),
            int(self.days_to_expiry),
            Value::Real(self.spread_carry_pct),
            real(self.spread_carry_pct_annualized),
        ]
    }
}

/// Header row: `cycle_ts` followed by the row type's columns.
pub fn header<R: HistoryRow>() -> Vec<&'static str> {
    std::iter::once(CYCLE_TS_COLUMN)
        .chain(R::COLUMNS.iter().map(|(name, _)| *name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spread() -> SpreadRecord {
        let day = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        SpreadRecord {
            cycle_ts: day.and_hms_opt(11, 34, 5).unwrap(),
            underlying_code: "SBER".to_string(),
            near_contract: "SRH5".to_string(),
            far_contract: "SRM5".to_string(),
            spread_name: "SBRF-3.25-SBRF-6.25".to_string(),
            near_expiry: NaiveDate::from_ymd_opt(2025, 3, 20).unwrap(),
            far_expiry: NaiveDate::from_ymd_opt(2025, 6, 19).unwrap(),
            days_to_expiry: 109,
            spread_carry_pct: 2.45,
            spread_carry_pct_annualized: None,
        }
    }

    #[test]
    fn test_values_match_columns() {
        let row = spread();
        assert_eq!(row.values().len(), SpreadRecord::COLUMNS.len());
        assert_eq!(header::<SpreadRecord>()[0], "cycle_ts");
        assert_eq!(header::<SpreadRecord>().len(), SpreadRecord::COLUMNS.len() + 1);
    }

    #[test]
    fn test_render() {
        let values = spread().values();
        let rendered: Vec<String> = values.iter().map(render).collect();
        assert_eq!(rendered[4], "2025-03-20");
        assert_eq!(rendered[6], "109");
        assert_eq!(rendered[7], "2.45");
        assert_eq!(rendered[8], "");
    }
}
