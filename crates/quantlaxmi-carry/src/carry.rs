//! Single-contract carry: futures premium over the underlying deliverable.
//!
//! ```text
//! days_to_expiry       = (expiry − as_of.date) + 1
//! carry_pct            = (F − S × lot) / (S × lot) × 100
//! carry_pct_annualized = carry_pct / days_to_expiry × 365
//! ```
//!
//! Annualization uses the unrounded carry; both outputs are rounded to two
//! decimals afterwards.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::types::{CarryRecord, FuturesQuote, UnderlyingQuote};

/// Day-count basis for annualization.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Calendar days to expiry, counting the expiry day itself.
pub fn days_to_expiry(expiry: NaiveDate, as_of: NaiveDate) -> i64 {
    (expiry - as_of).num_days() + 1
}

/// Round to two decimals, ties to even.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Scale a period percentage to a 365-day basis. `None` when `days == 0`.
pub fn annualize(pct: f64, days: i64) -> Option<f64> {
    if days == 0 {
        return None;
    }
    finite(pct / days as f64 * DAYS_PER_YEAR)
}

pub(crate) fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Unrounded carry in percent. `None` when a price is missing or the
/// deliverable notional is zero.
pub fn carry_pct(
    futures_last: Option<f64>,
    underlying_last: Option<f64>,
    lot_multiplier: u32,
) -> Option<f64> {
    let futures = futures_last?;
    let notional = underlying_last? * f64::from(lot_multiplier);
    if notional == 0.0 {
        return None;
    }
    finite((futures - notional) / notional * 100.0)
}

/// Inner-join futures to underlyings and derive carry per contract.
///
/// Futures without an underlying code, or whose code has no matching
/// underlying quote, are dropped. Output keeps the futures input order.
pub fn compute_carry(
    futures: &[FuturesQuote],
    underlyings: &[UnderlyingQuote],
    as_of: NaiveDateTime,
) -> Vec<CarryRecord> {
    let by_code: HashMap<&str, &UnderlyingQuote> = underlyings
        .iter()
        .map(|u| (u.code.as_str(), u))
        .collect();
    let today = as_of.date();

    futures
        .iter()
        .filter_map(|f| {
            let underlying = by_code.get(f.underlying_code.as_deref()?)?;
            Some(carry_record(f, underlying, as_of, today))
        })
        .collect()
}

fn carry_record(
    f: &FuturesQuote,
    u: &UnderlyingQuote,
    as_of: NaiveDateTime,
    today: NaiveDate,
) -> CarryRecord {
    let days = days_to_expiry(f.expiry, today);
    let raw = carry_pct(f.last, u.last, f.lot_multiplier);
    let annualized = raw.and_then(|pct| annualize(pct, days));

    CarryRecord {
        cycle_ts: as_of,
        contract_code: f.code.clone(),
        futures_short_name: f.short_name.clone(),
        underlying_code: u.code.clone(),
        underlying_short_name: u.short_name.clone(),
        futures_last: f.last,
        underlying_last: u.last,
        lot_multiplier: f.lot_multiplier,
        underlying_lot_size: u.lot_size,
        expiry: f.expiry,
        futures_trade_ts: f.trade_ts,
        underlying_trade_ts: u.trade_ts,
        days_to_expiry: days,
        carry_pct: raw.map(round2),
        carry_pct_annualized: annualized.map(round2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn as_of() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 12, 18)
            .unwrap()
            .and_hms_opt(11, 34, 0)
            .unwrap()
    }

    fn underlying(code: &str, last: Option<f64>) -> UnderlyingQuote {
        UnderlyingQuote {
            code: code.to_string(),
            short_name: format!("{code} ao"),
            last,
            lot_size: 10,
            trade_ts: Some(as_of()),
        }
    }

    fn future(code: &str, asset: &str, last: Option<f64>, lot: u32, days: i64) -> FuturesQuote {
        FuturesQuote {
            code: code.to_string(),
            short_name: format!("{code}-short"),
            underlying_code: Some(asset.to_string()),
            last,
            lot_multiplier: lot,
            expiry: as_of().date() + Duration::days(days),
            trade_ts: Some(as_of()),
        }
    }

    #[test]
    fn test_days_to_expiry_counts_expiry_day() {
        let today = as_of().date();
        assert_eq!(days_to_expiry(today, today), 1);
        assert_eq!(days_to_expiry(today + Duration::days(30), today), 31);
        assert_eq!(days_to_expiry(today - Duration::days(1), today), 0);
        assert_eq!(days_to_expiry(today - Duration::days(5), today), -4);
    }

    #[test]
    fn test_round2_ties_to_even() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(-1.236), -1.24);
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.375), 0.38);
    }

    #[test]
    fn test_carry_with_lot_multiplier() {
        // SBER at 250.00, contract on 100 shares at 25300 → 1.2% premium
        let pct = carry_pct(Some(25_300.0), Some(250.0), 100).unwrap();
        assert!((pct - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_carry_missing_or_zero_denominator_is_absent() {
        assert_eq!(carry_pct(Some(100.0), Some(0.0), 1), None);
        assert_eq!(carry_pct(Some(100.0), None, 1), None);
        assert_eq!(carry_pct(None, Some(100.0), 1), None);
        assert_eq!(carry_pct(Some(100.0), Some(100.0), 0), None);
    }

    #[test]
    fn test_annualize_zero_days_is_absent() {
        assert_eq!(annualize(2.0, 0), None);
        let negative = annualize(2.0, -4).unwrap();
        assert!((negative - (-182.5)).abs() < 1e-9);
    }

    #[test]
    fn test_compute_carry_inner_join() {
        let underlyings = vec![underlying("SBER", Some(100.0))];
        let futures = vec![
            future("SRZ4", "SBER", Some(102.0), 1, 30),
            future("LKZ4", "LKOH", Some(7000.0), 1, 30),
            FuturesQuote {
                underlying_code: None,
                ..future("SIZ4", "SBER", Some(101.0), 1, 30)
            },
        ];

        let records = compute_carry(&futures, &underlyings, as_of());
        assert_eq!(records.len(), 1);

        let r = &records[0];
        assert_eq!(r.contract_code, "SRZ4");
        assert_eq!(r.underlying_short_name, "SBER ao");
        assert_eq!(r.days_to_expiry, 31);
        assert_eq!(r.carry_pct, Some(2.0));
        assert_eq!(r.carry_pct_annualized, Some(23.55));
        assert_eq!(r.cycle_ts, as_of());
    }

    #[test]
    fn test_compute_carry_keeps_row_with_zero_underlying() {
        let underlyings = vec![underlying("GAZP", Some(0.0))];
        let futures = vec![future("GZZ4", "GAZP", Some(13_000.0), 100, 30)];

        let records = compute_carry(&futures, &underlyings, as_of());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].carry_pct, None);
        assert_eq!(records[0].carry_pct_annualized, None);
    }

    #[test]
    fn test_compute_carry_expiry_day_has_no_annualized_value() {
        let underlyings = vec![underlying("SBER", Some(100.0))];
        let futures = vec![future("SRZ4", "SBER", Some(101.0), 1, -1)];

        let records = compute_carry(&futures, &underlyings, as_of());
        assert_eq!(records[0].days_to_expiry, 0);
        assert_eq!(records[0].carry_pct, Some(1.0));
        assert_eq!(records[0].carry_pct_annualized, None);
    }

    #[test]
    fn test_compute_carry_preserves_futures_order() {
        let underlyings = vec![underlying("SBER", Some(100.0)), underlying("GAZP", Some(130.0))];
        let futures = vec![
            future("SRH5", "SBER", Some(104.0), 1, 90),
            future("GZZ4", "GAZP", Some(131.0), 1, 30),
            future("SRZ4", "SBER", Some(102.0), 1, 30),
        ];

        let codes: Vec<String> = compute_carry(&futures, &underlyings, as_of())
            .into_iter()
            .map(|r| r.contract_code)
            .collect();
        assert_eq!(codes, vec!["SRH5", "GZZ4", "SRZ4"]);
    }
}
