//! Append-only per-cycle history.
//!
//! Sinks write in two steps. `stage` does everything that can fail for
//! reasons of the data or the layout (serialization, directories, file
//! checks) without touching persisted history; `commit` makes the staged
//! cycle visible. [`append_all`] stages every sink before committing any, and
//! rolls all of them back if one fails.

use chrono::NaiveDateTime;
use quantlaxmi_carry::{CarryBatch, CarryRecord, SpreadRecord};
use quantlaxmi_connectors_moex::FuturesSnapshotRow;
use tracing::warn;

use crate::error::StoreResult;

/// Everything persisted for one refresh cycle, tagged with its as-of time.
#[derive(Debug, Clone, Copy)]
pub struct CycleBatch<'a> {
    pub cycle_ts: NaiveDateTime,
    pub futures: &'a [FuturesSnapshotRow],
    pub carry: &'a [CarryRecord],
    pub spreads: &'a [SpreadRecord],
}

impl<'a> CycleBatch<'a> {
    pub fn new(futures: &'a [FuturesSnapshotRow], batch: &'a CarryBatch) -> Self {
        Self {
            cycle_ts: batch.as_of,
            futures,
            carry: &batch.carry,
            spreads: &batch.spreads,
        }
    }

    pub fn row_count(&self) -> usize {
        self.futures.len() + self.carry.len() + self.spreads.len()
    }
}

/// Destination for cycle batches.
pub trait HistorySink: Send {
    fn name(&self) -> &'static str;

    /// Prepare the cycle. Persisted history is unchanged on return, success
    /// or not.
    fn stage(&mut self, batch: &CycleBatch<'_>) -> StoreResult<()>;

    /// Make the staged cycle visible. Leaves nothing behind on error.
    fn commit(&mut self) -> StoreResult<()>;

    /// Discard the staged cycle, or undo the last commit where the medium
    /// allows it.
    fn rollback(&mut self);

    /// Whether [`rollback`](Self::rollback) can undo a completed commit.
    fn undoes_commit(&self) -> bool {
        false
    }

    fn append(&mut self, batch: &CycleBatch<'_>) -> StoreResult<()> {
        self.stage(batch)?;
        self.commit()
    }
}

/// Persist one cycle to every sink, or to none.
///
/// Sinks whose commit can be undone are committed first, so the only commit
/// that cannot be reverted is the last one.
pub fn append_all(sinks: &mut [Box<dyn HistorySink>], batch: &CycleBatch<'_>) -> StoreResult<()> {
    for i in 0..sinks.len() {
        if let Err(e) = sinks[i].stage(batch) {
            warn!(sink = sinks[i].name(), error = %e, "[STORE] Stage failed, cycle discarded");
            sinks[..=i].iter_mut().for_each(|s| s.rollback());
            return Err(e);
        }
    }

    let mut order: Vec<usize> = (0..sinks.len()).collect();
    order.sort_by_key(|&i| !sinks[i].undoes_commit());

    for &i in &order {
        if let Err(e) = sinks[i].commit() {
            warn!(sink = sinks[i].name(), error = %e, "[STORE] Commit failed, rolling back cycle");
            for &j in &order {
                sinks[j].rollback();
            }
            return Err(e);
        }
    }
    Ok(())
}
