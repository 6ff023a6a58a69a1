//! Batched search-index updates.
//!
//! Added books queue up here and reach the index in batches: when
//! `size` books are waiting, on every tick of the flush interval, and once
//! more when the run drains. Flushes run one at a time so a later batch can
//! never overtake an earlier one.

use libris_book::Book;
use libris_cache::SearchIndex;
use std::time::Duration;
use tokio::sync::mpsc::Receiver;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{instrument, warn};

/// Returns the number of books that made it into the index.
pub(super) async fn batch_index(
    index: &dyn SearchIndex,
    mut books: Receiver<Book>,
    size: usize,
    every: Duration,
) -> u64 {
    let size = size.max(1);
    let mut pending = Vec::with_capacity(size);
    let mut indexed = 0;
    let mut ticker = interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            book = books.recv() => match book {
                Some(book) => {
                    pending.push(book);
                    if pending.len() >= size {
                        indexed += flush(index, &mut pending).await;
                    }
                },
                None => break,
            },
            _ = ticker.tick() => indexed += flush(index, &mut pending).await,
        }
    }
    indexed + flush(index, &mut pending).await
}

#[instrument(level = "debug", skip_all, fields(books = pending.len()))]
async fn flush(index: &dyn SearchIndex, pending: &mut Vec<Book>) -> u64 {
    if pending.is_empty() {
        return 0;
    }
    let batch = std::mem::take(pending);
    match index.index(&batch).await {
        Ok(()) => batch.len() as u64,
        Err(e) => {
            warn!(error = ?e, books = batch.len(), "search index flush failed");
            0
        },
    }
}
