//! Top-N views over a cycle's batches.

use std::cmp::Ordering;

use crate::types::{CarryRecord, SpreadRecord};

/// Rows per ranked view unless configured otherwise.
pub const DEFAULT_TOP_N: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Descending,
    Ascending,
}

/// Stable top-`n` by an optional key. Rows without a key rank last in either
/// direction; equal keys keep their batch order.
pub fn rank_by<T, F>(rows: &[T], key: F, direction: Direction, n: usize) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> Option<f64>,
{
    let mut ranked: Vec<&T> = rows.iter().collect();
    ranked.sort_by(|a, b| match (key(a), key(b)) {
        (Some(x), Some(y)) => match direction {
            Direction::Descending => y.total_cmp(&x),
            Direction::Ascending => x.total_cmp(&y),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    ranked.into_iter().take(n).cloned().collect()
}

/// Highest annualized carry first.
pub fn top_carry(carry: &[CarryRecord], n: usize) -> Vec<CarryRecord> {
    rank_by(carry, |r| r.carry_pct_annualized, Direction::Descending, n)
}

/// Highest annualized spread carry first.
pub fn top_spreads(spreads: &[SpreadRecord], n: usize) -> Vec<SpreadRecord> {
    rank_by(
        spreads,
        |r| r.spread_carry_pct_annualized,
        Direction::Descending,
        n,
    )
}

/// Lowest annualized spread carry first.
pub fn bottom_spreads(spreads: &[SpreadRecord], n: usize) -> Vec<SpreadRecord> {
    rank_by(
        spreads,
        |r| r.spread_carry_pct_annualized,
        Direction::Ascending,
        n,
    )
}
