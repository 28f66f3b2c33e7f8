//! One refresh cycle's computation: validate, join, derive, rank.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use tracing::info;

use crate::carry::compute_carry;
use crate::error::{CarryError, Dataset};
use crate::ranking::{bottom_spreads, top_carry, top_spreads, DEFAULT_TOP_N};
use crate::spread::{compute_spreads, SpreadDiagnostic};
use crate::types::{CarryRecord, FuturesQuote, SpreadRecord, UnderlyingQuote};

/// Everything one cycle produced, tagged with its as-of timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct CarryBatch {
    pub as_of: NaiveDateTime,
    pub carry: Vec<CarryRecord>,
    pub spreads: Vec<SpreadRecord>,
    pub diagnostics: Vec<SpreadDiagnostic>,
}

impl CarryBatch {
    pub fn ranked(&self, n: usize) -> RankedViews {
        RankedViews {
            as_of: self.as_of,
            top_carry: top_carry(&self.carry, n),
            top_spreads: top_spreads(&self.spreads, n),
            bottom_spreads: bottom_spreads(&self.spreads, n),
        }
    }
}

/// The three published views of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedViews {
    pub as_of: NaiveDateTime,
    pub top_carry: Vec<CarryRecord>,
    pub top_spreads: Vec<SpreadRecord>,
    pub bottom_spreads: Vec<SpreadRecord>,
}

/// Stateless carry engine. Holds only the ranking depth.
#[derive(Debug, Clone, Copy)]
pub struct CarryEngine {
    top_n: usize,
}

impl Default for CarryEngine {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl CarryEngine {
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Compute carry and spread batches for one snapshot pair.
    ///
    /// Fails only on structural problems. Zero joined rows is a success with
    /// empty batches.
    pub fn compute(
        &self,
        as_of: NaiveDateTime,
        futures: &[FuturesQuote],
        underlyings: &[UnderlyingQuote],
    ) -> Result<CarryBatch, CarryError> {
        validate(Dataset::Futures, futures.iter().map(|f| f.code.as_str()))?;
        validate(
            Dataset::Underlying,
            underlyings.iter().map(|u| u.code.as_str()),
        )?;

        let carry = compute_carry(futures, underlyings, as_of);
        let spread = compute_spreads(&carry, as_of);

        info!(
            as_of = %as_of,
            futures = futures.len(),
            underlyings = underlyings.len(),
            carry_rows = carry.len(),
            spread_rows = spread.records.len(),
            diagnostics = spread.diagnostics.len(),
            "[CARRY] Cycle computed"
        );

        Ok(CarryBatch {
            as_of,
            carry,
            spreads: spread.records,
            diagnostics: spread.diagnostics,
        })
    }

    /// [`compute`](Self::compute) followed by ranking at the engine's depth.
    pub fn compute_ranked(
        &self,
        as_of: NaiveDateTime,
        futures: &[FuturesQuote],
        underlyings: &[UnderlyingQuote],
    ) -> Result<(CarryBatch, RankedViews), CarryError> {
        let batch = self.compute(as_of, futures, underlyings)?;
        let views = batch.ranked(self.top_n);
        Ok((batch, views))
    }
}

fn validate<'a>(
    dataset: Dataset,
    codes: impl ExactSizeIterator<Item = &'a str>,
) -> Result<(), CarryError> {
    if codes.len() == 0 {
        return Err(CarryError::EmptyDataset(dataset));
    }
    let mut seen = HashSet::new();
    for code in codes {
        if !seen.insert(code) {
            return Err(CarryError::DuplicateCode {
                dataset,
                code: code.to_string(),
            });
        }
    }
    Ok(())
}
