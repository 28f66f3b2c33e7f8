//! Calendar-spread carry between consecutive expiries on one underlying.
//!
//! ```text
//! spread_carry_pct = (far.F − near.F) / (near.S × near.lot) × 100
//! days_to_expiry   = (far.expiry − as_of.date) + 1
//! ```
//!
//! Degenerate pairs are skipped with a [`SpreadDiagnostic`] rather than an
//! error, so one broken contract never costs the rest of the batch.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::warn;

use crate::carry::{annualize, days_to_expiry, finite, round2};
use crate::types::{CarryRecord, SpreadRecord};

/// Input that made a spread pair unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegenerateSide {
    /// Underlying last price zero or missing.
    Underlying,
    /// Near leg last price zero or missing.
    NearLeg,
    /// Far leg last price zero or missing.
    FarLeg,
    /// Near leg lot multiplier is zero.
    NearLotMultiplier,
}

impl fmt::Display for DegenerateSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegenerateSide::Underlying => write!(f, "underlying price"),
            DegenerateSide::NearLeg => write!(f, "near leg price"),
            DegenerateSide::FarLeg => write!(f, "far leg price"),
            DegenerateSide::NearLotMultiplier => write!(f, "near leg lot multiplier"),
        }
    }
}

/// Non-fatal condition raised while deriving spreads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpreadDiagnostic {
    /// Pair dropped; every degenerate side is listed.
    Skipped {
        spread_name: String,
        sides: Vec<DegenerateSide>,
    },
    /// Row kept without an annualized value.
    AnnualizationSkipped {
        spread_name: String,
        days_to_expiry: i64,
    },
}

impl SpreadDiagnostic {
    pub fn spread_name(&self) -> &str {
        match self {
            SpreadDiagnostic::Skipped { spread_name, .. }
            | SpreadDiagnostic::AnnualizationSkipped { spread_name, .. } => spread_name,
        }
    }
}

impl fmt::Display for SpreadDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpreadDiagnostic::Skipped { spread_name, sides } => {
                let sides: Vec<String> = sides.iter().map(ToString::to_string).collect();
                write!(
                    f,
                    "{spread_name}: skipped, zero or missing {}",
                    sides.join(", ")
                )
            }
            SpreadDiagnostic::AnnualizationSkipped {
                spread_name,
                days_to_expiry,
            } => write!(
                f,
                "{spread_name}: not annualized, days to expiry {days_to_expiry}"
            ),
        }
    }
}

/// Spread rows of one cycle plus the diagnostics raised deriving them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpreadOutcome {
    pub records: Vec<SpreadRecord>,
    pub diagnostics: Vec<SpreadDiagnostic>,
}

/// Derive calendar spreads from one cycle's carry records.
///
/// Groups are visited in ascending underlying code; within a group legs are
/// ordered by expiry, then contract code.
pub fn compute_spreads(carry: &[CarryRecord], as_of: NaiveDateTime) -> SpreadOutcome {
    let mut groups: BTreeMap<&str, Vec<&CarryRecord>> = BTreeMap::new();
    for record in carry {
        groups
            .entry(record.underlying_code.as_str())
            .or_default()
            .push(record);
    }

    let today = as_of.date();
    let mut outcome = SpreadOutcome::default();

    for legs in groups.values_mut() {
        if legs.len() < 2 {
            continue;
        }
        legs.sort_by(|a, b| {
            a.expiry
                .cmp(&b.expiry)
                .then_with(|| a.contract_code.cmp(&b.contract_code))
        });
        for pair in legs.windows(2) {
            spread_pair(pair[0], pair[1], as_of, today, &mut outcome);
        }
    }

    for diagnostic in &outcome.diagnostics {
        warn!(spread = diagnostic.spread_name(), "[SPREAD] {}", diagnostic);
    }

    outcome
}

fn spread_pair(
    near: &CarryRecord,
    far: &CarryRecord,
    as_of: NaiveDateTime,
    today: NaiveDate,
    outcome: &mut SpreadOutcome,
) {
    let spread_name = format!("{}-{}", near.futures_short_name, far.futures_short_name);

    let mut sides = Vec::new();
    let underlying = usable_price(near.underlying_last);
    let near_last = usable_price(near.futures_last);
    let far_last = usable_price(far.futures_last);
    if underlying.is_none() {
        sides.push(DegenerateSide::Underlying);
    }
    if near_last.is_none() {
        sides.push(DegenerateSide::NearLeg);
    }
    if far_last.is_none() {
        sides.push(DegenerateSide::FarLeg);
    }
    if near.lot_multiplier == 0 {
        sides.push(DegenerateSide::NearLotMultiplier);
    }

    let computed = match (underlying, near_last, far_last) {
        (Some(s), Some(n), Some(f)) if sides.is_empty() => {
            finite((f - n) / (s * f64::from(near.lot_multiplier)) * 100.0)
        }
        _ => None,
    };
    let Some(pct) = computed else {
        outcome
            .diagnostics
            .push(SpreadDiagnostic::Skipped { spread_name, sides });
        return;
    };

    let days = days_to_expiry(far.expiry, today);
    let annualized = if days > 0 { annualize(pct, days) } else { None };
    if days <= 0 {
        outcome
            .diagnostics
            .push(SpreadDiagnostic::AnnualizationSkipped {
                spread_name: spread_name.clone(),
                days_to_expiry: days,
            });
    }

    outcome.records.push(SpreadRecord {
        cycle_ts: as_of,
        underlying_code: near.underlying_code.clone(),
        near_contract: near.contract_code.clone(),
        far_contract: far.contract_code.clone(),
        spread_name,
        near_expiry: near.expiry,
        far_expiry: far.expiry,
        days_to_expiry: days,
        spread_carry_pct: round2(pct),
        spread_carry_pct_annualized: annualized.map(round2),
    });
}

fn usable_price(price: Option<f64>) -> Option<f64> {
    price.filter(|p| *p != 0.0 && p.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn as_of() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 12, 18)
            .unwrap()
            .and_hms_opt(16, 34, 0)
            .unwrap()
    }

    fn leg(code: &str, asset: &str, futures: Option<f64>, spot: Option<f64>, days: i64) -> CarryRecord {
        CarryRecord {
            cycle_ts: as_of(),
            contract_code: code.to_string(),
            futures_short_name: format!("{asset}-{code}"),
            underlying_code: asset.to_string(),
            underlying_short_name: asset.to_string(),
            futures_last: futures,
            underlying_last: spot,
            lot_multiplier: 1,
            underlying_lot_size: 10,
            expiry: as_of().date() + Duration::days(days),
            futures_trade_ts: None,
            underlying_trade_ts: None,
            days_to_expiry: days + 1,
            carry_pct: None,
            carry_pct_annualized: None,
        }
    }

    #[test]
    fn test_one_row_per_adjacent_pair() {
        let carry = vec![
            leg("SRU5", "SBER", Some(108.0), Some(100.0), 270),
            leg("SRZ4", "SBER", Some(102.0), Some(100.0), 1),
            leg("SRH5", "SBER", Some(105.0), Some(100.0), 90),
            leg("GZZ4", "GAZP", Some(131.0), Some(130.0), 1),
        ];
        let outcome = compute_spreads(&carry, as_of());

        assert!(outcome.diagnostics.is_empty());
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].near_contract, "SRZ4");
        assert_eq!(outcome.records[0].far_contract, "SRH5");
        assert_eq!(outcome.records[0].spread_name, "SBER-SRZ4-SBER-SRH5");
        assert_eq!(outcome.records[1].near_contract, "SRH5");
        assert_eq!(outcome.records[1].far_contract, "SRU5");
        assert_eq!(outcome.records[1].spread_carry_pct, 3.0);
    }

    #[test]
    fn test_groups_visited_in_code_order() {
        let carry = vec![
            leg("SRZ4", "SBER", Some(102.0), Some(100.0), 1),
            leg("SRH5", "SBER", Some(105.0), Some(100.0), 90),
            leg("GZZ4", "GAZP", Some(131.0), Some(130.0), 1),
            leg("GZH5", "GAZP", Some(133.0), Some(130.0), 90),
        ];
        let outcome = compute_spreads(&carry, as_of());
        let codes: Vec<&str> = outcome
            .records
            .iter()
            .map(|r| r.underlying_code.as_str())
            .collect();
        assert_eq!(codes, vec!["GAZP", "SBER"]);
    }

    #[test]
    fn test_same_expiry_ordered_by_contract_code() {
        let carry = vec![
            leg("SRZ4B", "SBER", Some(103.0), Some(100.0), 30),
            leg("SRZ4A", "SBER", Some(102.0), Some(100.0), 30),
        ];
        let outcome = compute_spreads(&carry, as_of());
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].near_contract, "SRZ4A");
        assert_eq!(outcome.records[0].far_contract, "SRZ4B");
    }

    #[test]
    fn test_zero_underlying_skips_pair_with_one_diagnostic() {
        let carry = vec![
            leg("SRZ4", "SBER", Some(102.0), Some(0.0), 30),
            leg("SRH5", "SBER", Some(105.0), Some(0.0), 90),
        ];
        let outcome = compute_spreads(&carry, as_of());

        assert!(outcome.records.is_empty());
        assert_eq!(
            outcome.diagnostics,
            vec![SpreadDiagnostic::Skipped {
                spread_name: "SBER-SRZ4-SBER-SRH5".to_string(),
                sides: vec![DegenerateSide::Underlying],
            }]
        );
    }

    #[test]
    fn test_diagnostic_lists_every_degenerate_side() {
        let carry = vec![
            leg("SRZ4", "SBER", None, Some(0.0), 30),
            leg("SRH5", "SBER", Some(0.0), Some(0.0), 90),
        ];
        let outcome = compute_spreads(&carry, as_of());

        assert_eq!(outcome.diagnostics.len(), 1);
        match &outcome.diagnostics[0] {
            SpreadDiagnostic::Skipped { sides, .. } => assert_eq!(
                sides,
                &vec![
                    DegenerateSide::Underlying,
                    DegenerateSide::NearLeg,
                    DegenerateSide::FarLeg
                ]
            ),
            other => panic!("unexpected diagnostic: {other:?}"),
        }
        assert!(outcome.diagnostics[0].to_string().contains("near leg price"));
        assert_eq!(outcome.diagnostics[0].spread_name(), "SBER-SRZ4-SBER-SRH5");
    }

    #[test]
    fn test_zero_lot_multiplier_skips_pair() {
        let mut near = leg("SRZ4", "SBER", Some(102.0), Some(100.0), 30);
        near.lot_multiplier = 0;
        let carry = vec![near, leg("SRH5", "SBER", Some(105.0), Some(100.0), 90)];
        let outcome = compute_spreads(&carry, as_of());

        assert!(outcome.records.is_empty());
        assert_eq!(outcome.diagnostics.len(), 1);
    }

    #[test]
    fn test_expired_far_leg_keeps_base_value() {
        let carry = vec![
            leg("SRZ4A", "SBER", Some(102.0), Some(100.0), -3),
            leg("SRZ4B", "SBER", Some(104.0), Some(100.0), -1),
        ];
        let outcome = compute_spreads(&carry, as_of());

        assert_eq!(outcome.records.len(), 1);
        let r = &outcome.records[0];
        assert_eq!(r.days_to_expiry, 0);
        assert_eq!(r.spread_carry_pct, 2.0);
        assert_eq!(r.spread_carry_pct_annualized, None);
        assert!(matches!(
            outcome.diagnostics[0],
            SpreadDiagnostic::AnnualizationSkipped { days_to_expiry: 0, .. }
        ));
    }

    #[test]
    fn test_singleton_groups_contribute_nothing() {
        let carry = vec![
            leg("SRZ4", "SBER", Some(102.0), Some(100.0), 30),
            leg("GZZ4", "GAZP", Some(131.0), Some(130.0), 30),
        ];
        let outcome = compute_spreads(&carry, as_of());
        assert!(outcome.records.is_empty());
        assert!(outcome.diagnostics.is_empty());
    }
}
