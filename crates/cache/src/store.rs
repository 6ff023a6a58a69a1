//! The narrow contracts the ingest pipeline depends on.
//!
//! [`Repository`](crate::Repository) implements both against SQLite. The
//! pipeline only ever sees `dyn BookStore` and `dyn SearchIndex`, which keeps
//! it testable with stores that fail on demand.

use crate::error::Result;
use async_trait::async_trait;
use libris_book::{Book, RefreshStats};
use std::path::{Path, PathBuf};

/// Counts from a best-effort bulk import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub added: u64,
    /// Records skipped because their hash or path was already stored.
    pub duplicates: u64,
}

#[async_trait]
pub trait BookStore: Send + Sync {
    /// Whether a book is already recorded at exactly this path.
    async fn contains_path(&self, path: &Path) -> Result<bool>;

    /// Path of the stored book with this identity hash, if any.
    async fn lookup(&self, hash: &str) -> Result<Option<PathBuf>>;

    async fn exists(&self, hash: &str) -> Result<bool> {
        Ok(self.lookup(hash).await?.is_some())
    }

    /// Store a single book.
    ///
    /// Fails with [`Duplicate`](crate::error::ErrorKind::Duplicate) when the
    /// hash or path is taken, and with [`Busy`](crate::error::ErrorKind::Busy)
    /// when the write should be tried again.
    async fn insert(&self, book: &Book) -> Result<()>;

    /// Store many books, skipping those whose hash or path is already taken.
    ///
    /// Returns the books that were actually stored, in batch order.
    async fn insert_batch(&self, books: &[Book]) -> Result<Vec<Book>>;

    async fn record_refresh(&self, stats: &RefreshStats) -> Result<()>;

    /// Point a stored book at a new location. Returns `false` when no book
    /// has this hash.
    async fn update_path(&self, hash: &str, path: &Path) -> Result<bool>;

    /// Record where the cover of a stored book was written.
    async fn update_cover(&self, hash: &str, cover_path: &Path) -> Result<bool>;
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Add (or replace) the full-text entries of these books.
    async fn index(&self, books: &[Book]) -> Result<()>;
}
