//! Per-file processing.
//!
//! Nothing escapes a worker: every failure is logged and turned into the
//! file's [`IngestOutcome`]. Rejected files are then moved out of the import
//! directory so they aren't picked up again.

use super::Pipeline;
use libris_book::{Book, IngestOutcome};
use libris_cache::error::ErrorKind as CacheErrorKind;
use libris_epub::extract_bytes;
use libris_epub::models::Epub;
use libris_storage::error::Result as StorageResult;
use libris_storage::{FileInfo, StorageBackend, transfer};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

type Processed = (IngestOutcome, Option<Book>);

impl Pipeline {
    /// Process one claimed file. Added books are returned for indexing.
    #[instrument(skip_all, fields(path = %file.path.display()))]
    pub(super) async fn ingest(&self, file: FileInfo) -> Processed {
        let (outcome, book) = self.ingest_inner(&file).await;
        debug!(%outcome, "processed");
        if outcome.is_rejected() {
            self.dispose(&file.path, outcome).await;
        }
        (outcome, book)
    }

    async fn ingest_inner(&self, file: &FileInfo) -> Processed {
        match self.ctx.retry.run(|| self.store.contains_path(&file.path)).await {
            Ok(true) => return (IngestOutcome::Old, None),
            Ok(false) => {},
            Err(e) => {
                warn!(error = ?e, "could not check for a stored copy");
                return (IngestOutcome::StoreError, None);
            },
        }

        let Some(mut epub) = self.parse(file).await else {
            return (IngestOutcome::Invalid, None);
        };
        let mut book = Book::from_epub(&epub, &file.path, file.size, file.modified);
        let cover = epub.cover.take();
        if !self.ctx.keeps(book.size, &book.language) {
            debug!(size = book.size, language = %book.language, "rejected by filter");
            return (IngestOutcome::Invalid, None);
        }

        match self.ctx.retry.run(|| self.store.lookup(&book.hash)).await {
            Ok(Some(existing)) => {
                debug!(hash = %book.hash, existing = %existing.display(), "same work already stored");
                return (IngestOutcome::Duplicate, None);
            },
            Ok(None) => {},
            Err(e) => {
                warn!(error = ?e, "could not look up book");
                return (IngestOutcome::StoreError, None);
            },
        }

        let target = match self.library_target(&book).await {
            Ok(target) => target,
            Err(outcome) => return (outcome, None),
        };

        match self.ctx.retry.run(|| self.store.insert(&book)).await {
            Ok(()) => {},
            Err(e) if matches!(&*e, CacheErrorKind::Duplicate) => {
                debug!(hash = %book.hash, "lost the race for this work");
                return (IngestOutcome::Duplicate, None);
            },
            Err(e) => {
                warn!(error = ?e, "could not store book");
                return (IngestOutcome::StoreError, None);
            },
        }

        let relocated = match target {
            Some(target) => self.relocate(&mut book, target).await,
            None => false,
        };
        let resident = match relocated {
            true => self.backends.library.as_ref(),
            false => self.backends.import.as_ref(),
        };
        if let Some(cover) = cover {
            self.store_cover(&mut book, resident, &cover).await;
        }
        (IngestOutcome::Added, Some(book))
    }

    async fn parse(&self, file: &FileInfo) -> Option<Epub> {
        let bytes = match self.backends.import.read(&file.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = ?e, "could not read file");
                return None;
            },
        };
        let path = file.path.clone();
        match tokio::task::spawn_blocking(move || extract_bytes(path, bytes)).await {
            Ok(Ok(epub)) => Some(epub),
            Ok(Err(e)) => {
                debug!(error = ?e, "not a usable EPUB");
                None
            },
            Err(e) => {
                warn!(error = %e, "extraction task failed");
                None
            },
        }
    }

    /// The organized location of `book`, if organizing. An occupied target
    /// means the library already holds this work.
    async fn library_target(&self, book: &Book) -> Result<Option<PathBuf>, IngestOutcome> {
        let Some(generator) = &self.ctx.organize else {
            return Ok(None);
        };
        let target = match generator.generate(book) {
            Ok(path) => PathBuf::from(path),
            Err(e) => {
                warn!(error = ?e, "could not generate library path");
                return Err(IngestOutcome::Invalid);
            },
        };
        match self.backends.library.exists(&target).await {
            Ok(false) => Ok(Some(target)),
            Ok(true) => {
                debug!(target = %target.display(), "library path taken");
                Err(IngestOutcome::Duplicate)
            },
            Err(e) => {
                warn!(error = ?e, target = %target.display(), "could not check library path");
                Err(IngestOutcome::StoreError)
            },
        }
    }

    /// Move an added book into the library. Returns whether it moved.
    async fn relocate(&self, book: &mut Book, target: PathBuf) -> bool {
        let moved =
            transfer(self.backends.import.as_ref(), &book.path, self.backends.library.as_ref(), &target).await;
        if let Err(e) = moved {
            warn!(error = ?e, target = %target.display(), "could not move book into the library");
            return false;
        }
        let updated = self.ctx.retry.run(|| self.store.update_path(&book.hash, &target)).await;
        match updated {
            Ok(true) => {},
            Ok(false) => warn!(hash = %book.hash, "stored book disappeared before its path was updated"),
            Err(e) => warn!(error = ?e, target = %target.display(), "could not record library path"),
        }
        book.path = target;
        true
    }

    async fn store_cover(&self, book: &mut Book, backend: &dyn StorageBackend, cover: &[u8]) {
        let cover_path = book.cover_sibling();
        if let Err(e) = backend.write(&cover_path, cover).await {
            warn!(error = ?e, cover = %cover_path.display(), "could not write cover");
            return;
        }
        let recorded = self.ctx.retry.run(|| self.store.update_cover(&book.hash, &cover_path)).await;
        match recorded {
            Ok(_) => book.cover_path = Some(cover_path),
            Err(e) => warn!(error = ?e, "could not record cover path"),
        }
    }

    /// Take a rejected file out of the import directory. Best-effort.
    async fn dispose(&self, path: &Path, outcome: IngestOutcome) {
        let import = self.backends.import.as_ref();
        let result = match (outcome, self.ctx.allow_deletes) {
            (IngestOutcome::Duplicate, true) => import.delete(path).await,
            _ => self.quarantine(path).await,
        };
        if let Err(e) = result {
            warn!(error = ?e, path = %path.display(), %outcome, "could not remove file from the import directory");
        }
    }

    /// Move a file into quarantine without replacing one rejected earlier.
    async fn quarantine(&self, path: &Path) -> StorageResult<()> {
        let quarantine = self.backends.quarantine.as_ref();
        let mut target = path.to_path_buf();
        let mut n = 0;
        while quarantine.exists(&target).await? {
            n += 1;
            target = numbered(path, n);
        }
        if n > 0 {
            debug!(path = %path.display(), target = %target.display(), "quarantine name taken");
        }
        transfer(self.backends.import.as_ref(), path, quarantine, &target).await
    }
}

/// `dir/name.epub` becomes `dir/name-<n>.epub`.
fn numbered(path: &Path, n: u32) -> PathBuf {
    let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}-{n}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{n}"),
    };
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("broken.epub", 1, "broken-1.epub")]
    #[case("shelf/broken.epub", 12, "shelf/broken-12.epub")]
    #[case("README", 2, "README-2")]
    fn test_numbered(#[case] path: &str, #[case] n: u32, #[case] expected: &str) {
        assert_eq!(numbered(Path::new(path), n), PathBuf::from(expected));
    }
}
