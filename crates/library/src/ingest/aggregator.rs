//! Outcome tallying.
//!
//! Every outcome of a run passes through [`aggregate`]. The run total is
//! returned at the end; in the meantime, non-empty windows are persisted as
//! refresh history on every tick and once more when the run drains.

use libris_book::{IngestOutcome, RefreshStats};
use libris_cache::BookStore;
use std::time::Duration;
use time::UtcDateTime;
use tokio::sync::mpsc::Receiver;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{info, warn};

const PROGRESS_EVERY: u64 = 100;

pub(super) async fn aggregate(
    store: &dyn BookStore,
    mut outcomes: Receiver<IngestOutcome>,
    every: Duration,
) -> RefreshStats {
    let mut total = RefreshStats::default();
    let mut window = RefreshStats::default();
    let mut ticker = interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            outcome = outcomes.recv() => match outcome {
                Some(outcome) => {
                    total.record(outcome);
                    window.record(outcome);
                    if total.total() % PROGRESS_EVERY == 0 {
                        info!(processed = total.total(), stats = %total, "progress");
                    }
                },
                None => break,
            },
            _ = ticker.tick() => flush(store, &mut window).await,
        }
    }
    flush(store, &mut window).await;
    total.stop = UtcDateTime::now();
    total
}

async fn flush(store: &dyn BookStore, window: &mut RefreshStats) {
    let stats = window.rotate();
    if stats.is_empty() {
        return;
    }
    if let Err(e) = store.record_refresh(&stats).await {
        warn!(error = ?e, stats = %stats, "could not record refresh statistics");
    }
}
