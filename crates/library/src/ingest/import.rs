use super::error::{ErrorKind, Result};
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use exn::ResultExt;
use libris_book::{Book, BookInput};
use libris_cache::{BatchReport, BookStore, SearchIndex};
use tracing::{debug, info, instrument};

/// Store bare book records in batches of `batch_size` and index the ones
/// that were actually stored.
///
/// Records whose work is already known are counted as duplicates without
/// touching the store. Within a batch, insertion is best-effort: a record
/// that collides with another is skipped and counted, never fatal. Only a
/// failing store aborts the import.
pub async fn import_records(
    store: &dyn BookStore,
    index: &dyn SearchIndex,
    records: Vec<BookInput>,
    batch_size: usize,
) -> LibraryResult<BatchReport> {
    import_records_inner(store, index, records, batch_size).await.or_raise(|| LibraryErrorKind::Import)
}

#[instrument(skip_all, fields(records = records.len()))]
async fn import_records_inner(
    store: &dyn BookStore,
    index: &dyn SearchIndex,
    records: Vec<BookInput>,
    batch_size: usize,
) -> Result<BatchReport> {
    let books: Vec<Book> = records.into_iter().map(Book::from).collect();
    let mut report = BatchReport::default();
    for chunk in books.chunks(batch_size.max(1)) {
        let mut fresh = Vec::with_capacity(chunk.len());
        for book in chunk {
            match store.exists(&book.hash).await.or_raise(|| ErrorKind::Store)? {
                true => report.duplicates += 1,
                false => fresh.push(book.clone()),
            }
        }
        let stored = store.insert_batch(&fresh).await.or_raise(|| ErrorKind::Store)?;
        index.index(&stored).await.or_raise(|| ErrorKind::Store)?;
        let skipped = fresh.len() - stored.len();
        debug!(added = stored.len(), skipped, "imported batch");
        report.added += stored.len() as u64;
        report.duplicates += skipped as u64;
    }
    info!(added = report.added, duplicates = report.duplicates, "import complete");
    Ok(report)
}
