//! Scheduled cycle loop.
//!
//! Cycles run inline in this task, so two never overlap. After each cycle the
//! next slot is computed from the current time, which skips any slot missed
//! while the previous cycle was running.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use quantlaxmi_carry_store::SubscriberStore;
use tracing::{error, info, warn};

use crate::bot::{publish, LatestViews};
use crate::cycle::RefreshCycle;
use crate::schedule::WeeklySchedule;
use crate::telegram::Notifier;

/// Counters shared with the binary for the shutdown summary.
#[derive(Debug, Default)]
pub struct RunStats {
    pub cycles_ok: AtomicUsize,
    pub cycles_failed: AtomicUsize,
    pub messages_sent: AtomicUsize,
    pub messages_failed: AtomicUsize,
}

impl RunStats {
    pub fn snapshot(&self) -> [usize; 4] {
        [
            self.cycles_ok.load(Ordering::Relaxed),
            self.cycles_failed.load(Ordering::Relaxed),
            self.messages_sent.load(Ordering::Relaxed),
            self.messages_failed.load(Ordering::Relaxed),
        ]
    }
}

pub struct Runner {
    pub schedule: WeeklySchedule,
    pub cycle: RefreshCycle,
    pub notifier: Arc<dyn Notifier>,
    pub subscribers: Arc<dyn SubscriberStore>,
    pub latest: LatestViews,
    pub stats: Arc<RunStats>,
}

impl Runner {
    /// One cycle with failure containment. Returns whether it succeeded.
    pub async fn tick(&mut self) -> bool {
        let output = match self.cycle.run(true).await {
            Ok(output) => output,
            Err(e) => {
                self.stats.cycles_failed.fetch_add(1, Ordering::Relaxed);
                error!(error = %format!("{e:#}"), "[CYCLE] Refresh failed, nothing persisted or published");
                return false;
            }
        };

        self.stats.cycles_ok.fetch_add(1, Ordering::Relaxed);
        *self.latest.write().await = Some(output.views.clone());

        match publish(
            self.notifier.as_ref(),
            self.subscribers.as_ref(),
            &output.views,
        )
        .await
        {
            Ok(sent) => {
                self.stats.messages_sent.fetch_add(sent.sent, Ordering::Relaxed);
                self.stats.messages_failed.fetch_add(sent.failed, Ordering::Relaxed);
            }
            Err(e) => warn!(error = %e, "[CYCLE] Publishing failed"),
        }
        true
    }

    /// Sleep until each scheduled slot and run a cycle, forever.
    pub async fn run(mut self) {
        loop {
            let now = Utc::now();
            let Some(next) = self.schedule.next_after(&now) else {
                warn!("[CYCLE] Schedule yields no future slot, stopping");
                return;
            };
            let wait = (next.with_timezone(&Utc) - now)
                .to_std()
                .unwrap_or_default();
            info!(next = %next, wait_secs = wait.as_secs(), "[CYCLE] Waiting for next slot");

            tokio::time::sleep(wait).await;
            self.tick().await;
        }
    }
}
