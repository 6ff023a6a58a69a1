//! Refresh runs.
//!
//! A run moves through [`RunState`]s under the [`Coordinator`]:
//!
//! 1. **Scanning** lists the import directory and claims up to `batch_size`
//!    `*.epub` files that haven't been seen yet this run.
//! 2. **Distributing** processes the claimed files, at most `workers` at a
//!    time. Scanning and distributing alternate until a pass claims fewer
//!    files than the batch size.
//! 3. **Draining** waits for the last index and statistics flushes.
//!
//! Outcomes flow to the aggregator, and added books to the index batcher,
//! over channels. All three run concurrently within the run's task. Every
//! outcome is also broadcast to receivers from [`Pipeline::subscribe`].
//! Only a failure to list the import directory aborts a run; everything that
//! goes wrong with a single file becomes that file's outcome.

mod aggregator;
mod batcher;
pub mod error;
mod import;
mod worker;

pub use self::import::import_records;
use self::error::{ErrorKind, Result};
use crate::Context;
use crate::coordinator::{Coordinator, RunGuard, RunState};
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use exn::ResultExt;
use futures::{StreamExt, TryStreamExt, stream};
use libris_book::{Book, IngestOutcome, RefreshStats};
use libris_cache::{BookStore, SearchIndex};
use libris_storage::{BackendHandle, FileInfo};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::mpsc::{self, Sender};
use tracing::{debug, error, info, instrument, warn};

const EXTENSION: &str = "epub";
/// Outcomes a lagging subscriber may fall behind by before it misses some.
const OUTCOME_BACKLOG: usize = 1024;

/// Where files come from and where they go.
#[derive(Clone)]
pub struct Backends {
    /// Scanned for new books.
    pub import: BackendHandle,
    /// Receives added books when organizing.
    pub library: BackendHandle,
    /// Receives files that were rejected.
    pub quarantine: BackendHandle,
}

pub struct Pipeline {
    ctx: Arc<Context>,
    backends: Backends,
    store: Arc<dyn BookStore>,
    index: Arc<dyn SearchIndex>,
    coordinator: Coordinator,
    outcomes: broadcast::Sender<IngestOutcome>,
}

impl Pipeline {
    pub fn new(ctx: Context, backends: Backends, store: Arc<dyn BookStore>, index: Arc<dyn SearchIndex>) -> Self {
        let (outcomes, _) = broadcast::channel(OUTCOME_BACKLOG);
        Self { ctx: Arc::new(ctx), backends, store, index, coordinator: Coordinator::new(), outcomes }
    }

    /// Per-file outcomes of every run started after subscribing, one per
    /// enumerated book file.
    pub fn subscribe(&self) -> broadcast::Receiver<IngestOutcome> {
        self.outcomes.subscribe()
    }

    pub fn state(&self) -> RunState {
        self.coordinator.current_state()
    }

    /// Run one refresh over the import directory.
    ///
    /// Returns `None` without doing anything when another run is active.
    pub async fn run(&self) -> LibraryResult<Option<RefreshStats>> {
        let Some(guard) = self.coordinator.try_start() else {
            warn!(state = %self.state(), "refresh already in progress");
            return Ok(None);
        };
        let stats = self.run_inner(&guard).await.or_raise(|| LibraryErrorKind::Ingest)?;
        guard.finish();
        Ok(Some(stats))
    }

    /// Refresh every `interval` until `shutdown` resolves. An active run is
    /// always allowed to finish.
    pub async fn watch(&self, interval: Duration, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        loop {
            match self.run().await {
                Ok(Some(stats)) => info!(%stats, "refresh complete"),
                Ok(None) => {},
                Err(e) => error!(error = ?e, "refresh failed"),
            }
            tokio::select! {
                () = &mut shutdown => break,
                () = tokio::time::sleep(interval) => {},
            }
        }
    }

    #[instrument(skip_all, fields(import = self.backends.import.name()))]
    async fn run_inner(&self, guard: &RunGuard<'_>) -> Result<RefreshStats> {
        let (outcome_tx, outcome_rx) = mpsc::channel(self.ctx.workers * 4);
        let (book_tx, book_rx) = mpsc::channel(self.ctx.index_batch_size * 2);
        let (distributed, stats, indexed) = tokio::join!(
            self.distribute(guard, outcome_tx, book_tx),
            aggregator::aggregate(self.store.as_ref(), outcome_rx, self.ctx.stats_interval),
            batcher::batch_index(
                self.index.as_ref(),
                book_rx,
                self.ctx.index_batch_size,
                self.ctx.index_flush_interval
            ),
        );
        if let Err(e) = distributed {
            error!(error = ?e, %stats, "refresh aborted");
            return Err(e);
        }
        info!(%stats, indexed, "refresh finished");
        Ok(stats)
    }

    async fn distribute(
        &self,
        guard: &RunGuard<'_>,
        outcomes: Sender<IngestOutcome>,
        books: Sender<Book>,
    ) -> Result<()> {
        let mut seen = HashSet::new();
        loop {
            guard.set(RunState::Scanning);
            let candidates = self.enumerate(&seen).await?;
            if candidates.is_empty() {
                if seen.is_empty() {
                    info!("no new books found");
                }
                break;
            }
            let exhausted = self.ctx.batch_size == 0 || candidates.len() < self.ctx.batch_size;
            debug!(files = candidates.len(), "claimed files");
            seen.extend(candidates.iter().map(|file| file.path.clone()));

            guard.set(RunState::Distributing);
            let mut results =
                stream::iter(candidates).map(|file| self.ingest(file)).buffer_unordered(self.ctx.workers.max(1));
            while let Some((outcome, book)) = results.next().await {
                if let Some(book) = book
                    && books.send(book).await.is_err()
                {
                    warn!("search index batcher stopped early");
                }
                // No subscribers is not an error.
                let _ = self.outcomes.send(outcome);
                if outcomes.send(outcome).await.is_err() {
                    warn!("aggregator stopped early");
                }
            }
            if exhausted {
                break;
            }
        }
        guard.set(RunState::Draining);
        Ok(())
    }

    /// Unseen book files in the import directory, at most `batch_size` of them.
    async fn enumerate(&self, seen: &HashSet<PathBuf>) -> Result<Vec<FileInfo>> {
        let limit = match self.ctx.batch_size {
            0 => usize::MAX,
            n => n,
        };
        let mut listing = self.backends.import.list_stream(None);
        let mut candidates = Vec::new();
        while let Some(file) = listing.try_next().await.or_raise(|| ErrorKind::Enumerate)? {
            if file.has_extension(EXTENSION) && !seen.contains(&file.path) {
                candidates.push(file);
                if candidates.len() >= limit {
                    break;
                }
            }
        }
        Ok(candidates)
    }
}
