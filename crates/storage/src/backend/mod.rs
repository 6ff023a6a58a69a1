//! Storage backend trait and implementations.
//!
//! The import directory, the library directory and the quarantine directory
//! are each a [`StorageBackend`]. Paths passed to a backend are always
//! relative to its root.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::FileInfo;
use crate::error::Result;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::Path;
use std::pin::Pin;
use tracing::instrument;

pub type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;

/// Unified interface for storage backends.
///
/// # Path Handling
/// All paths are relative to the storage root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations should
/// enforce this validation.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use libris_storage::{backend::StorageBackend, error::Result};
///
/// async fn size_of_book(backend: &dyn StorageBackend) -> Result<u64> {
///     let path = Path::new("b/Dan_Brown/Dan_Brown-Inferno.epub");
///     match backend.exists(path).await? {
///         true => Ok(backend.stat(path).await?.size),
///         false => Ok(0),
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend, used for logging only.
    fn name(&self) -> &str;

    /// List all files under an optional prefix.
    ///
    /// Default implementation of this method is to collect all the results
    /// from [`list_stream()`](Self::list_stream) into a [`Vec`] before
    /// returning.
    async fn list(&self, prefix: Option<&Path>) -> Result<Vec<FileInfo>> {
        self.list_stream(prefix).try_collect().await
    }

    /// Stream file metadata under an optional prefix.
    ///
    /// Files are yielded as they are discovered, in no particular order. A
    /// prefix that doesn't exist yields an empty stream, not an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// # use libris_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut stream = backend.list_stream(None);
    /// while let Some(info) = stream.try_next().await? {
    ///     println!("{}: {} bytes", info.path.display(), info.size);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a>;

    /// Check if a file exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write file contents, creating parent directories as needed.
    ///
    /// Overwrites an existing file.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Delete a file.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn delete(&self, path: &Path) -> Result<()>;

    /// Rename/move a file within the same backend.
    ///
    /// Parent directories of the destination are created as needed, and an
    /// existing destination is overwritten. Returns
    /// [`NotFound`](crate::error::ErrorKind::NotFound) if the source file
    /// does not exist.
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Get file metadata without reading contents.
    async fn stat(&self, path: &Path) -> Result<FileInfo>;
}

/// Move a file from one backend to another.
///
/// Backends don't share a root, so this is a copy followed by a delete. The
/// source is only removed once the target has been written.
#[instrument(level = "debug", skip_all, fields(source = source.name(), target = target.name(), from = %from.display()))]
pub async fn transfer(source: &dyn StorageBackend, from: &Path, target: &dyn StorageBackend, to: &Path) -> Result<()> {
    let data = source.read(from).await?;
    target.write(to, &data).await?;
    source.delete(from).await
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transfer() {
        let source = MockBackend::with_files([("in/book.epub", b"PK".to_vec())]).with_name("import");
        let target = MockBackend::default().with_name("failed");
        transfer(&source, Path::new("in/book.epub"), &target, Path::new("book.epub")).await.unwrap();
        assert!(!source.exists(Path::new("in/book.epub")).await.unwrap());
        assert_eq!(target.read(Path::new("book.epub")).await.unwrap(), b"PK");
    }

    #[tokio::test]
    async fn test_transfer_missing_source_leaves_target_untouched() {
        let source = MockBackend::default();
        let target = MockBackend::default();
        assert!(transfer(&source, Path::new("nope.epub"), &target, Path::new("nope.epub")).await.is_err());
        assert!(target.list(None).await.unwrap().is_empty());
    }
}
