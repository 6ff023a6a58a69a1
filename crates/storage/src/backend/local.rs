//! Local filesystem storage backend, via `tokio::fs`.

use crate::backend::FileInfoStream;
use crate::error::ErrorKind;
use crate::{FileInfo, StorageBackend, error::Result, path::validate as validate_path};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use std::fs::{Metadata, create_dir_all as sync_create_dir};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::fs::{self, DirEntry};

enum WalkEntry {
    File(FileInfo),
    Descend(PathBuf),
    Skip,
}

/// Files in a directory on the local filesystem.
///
/// ```no_run
/// use libris_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let import = LocalBackend::new("import", "/srv/books/import")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    /// Absolute; created on construction if missing.
    root: PathBuf,
}
impl LocalBackend {
    /// Create a backend rooted at `root`, creating the directory (and its
    /// parents) if it doesn't exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPath`](ErrorKind::InvalidPath) if the path is not
    /// absolute or exists but isn't a directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }

        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            // Only happens once at startup; not worth an async constructor.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }

        Ok(Self { name: name.into(), root })
    }

    /// Get the absolute path for a relative storage path.
    ///
    /// Validates the path and joins it with the root directory.
    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    /// Convert an absolute path back to a relative storage path.
    ///
    /// Strips the root prefix and re-validates what remains.
    fn relative_path(&self, absolute: impl AsRef<Path>) -> Result<PathBuf> {
        let absolute = absolute.as_ref();
        if !absolute.is_absolute() {
            exn::bail!(ErrorKind::BackendError(format!(
                "attempting to get relative path of non-absolute path `{:?}`",
                absolute
            )))
        }
        let relative = absolute.strip_prefix(&self.root).or_raise(|| {
            ErrorKind::BackendError(format!("path `{:?}` is not within root `{:?}`", absolute, self.root))
        })?;
        // Validate path will also canonicalize it.
        Ok(validate_path(relative)?)
    }

    /// Shared by listing and stat.
    fn metadata(path: &Path, metadata: Metadata) -> Result<FileInfo> {
        let modified = OffsetDateTime::from(metadata.modified().map_err(ErrorKind::Io)?).to_utc();
        Ok(FileInfo::new(path, metadata.len(), modified))
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Classify one directory entry. Split out of the walk so that `?` works;
    /// inside `stream!` every error has to be yielded by hand.
    async fn process_entry(&self, entry: DirEntry, prefix: Option<&Path>) -> Result<WalkEntry> {
        let path = entry.path();
        let metadata = entry.metadata().await.map_err(|e| Self::map_io_error(e, &path))?;
        let relative = self.relative_path(&path)?;
        if let Some(pfx) = prefix
            && !relative.starts_with(pfx)
        {
            return Ok(WalkEntry::Skip);
        }
        if metadata.is_dir() {
            return Ok(WalkEntry::Descend(path));
        }
        if metadata.is_file() {
            return Ok(WalkEntry::File(Self::metadata(&relative, metadata)?));
        }
        // Note: silently drop what is most likely a broken symlink.
        Ok(WalkEntry::Skip)
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    // Depth-first walk with an explicit stack; recursion and async streams
    // don't mix.
    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let validated_prefix = match prefix.map(validate_path).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Result::Err(e) })),
        };

        let start_dir = validated_prefix
            .as_ref()
            // Walk from the prefix's parent, so a prefix that is a file or
            // doesn't exist yet is not an error. `Path::starts_with` is
            // component-based: "b/Brown" matches "b/Brown/x.epub" but not
            // "b/Browning/x.epub".
            .map(|prefix| self.root.join(prefix).parent().unwrap_or_else(|| &self.root).to_path_buf())
            .unwrap_or_else(|| self.root.clone());
        let mut stack = vec![start_dir];

        Box::pin(stream! {
            'dirs: while let Some(current) = stack.pop() {
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    // A directory that doesn't exist (yet) is empty, not an error.
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(err) => {
                        yield Err(exn::Exn::from(Self::map_io_error(err, &current)));
                        continue 'dirs;
                    }
                };

                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(e) => { yield Err(exn::Exn::from(Self::map_io_error(e, &current))); continue 'entries; },
                    };
                    match self.process_entry(entry, validated_prefix.as_deref()).await {
                        Ok(WalkEntry::File(f)) => yield Ok(f),
                        Ok(WalkEntry::Descend(d)) => stack.push(d),
                        Ok(WalkEntry::Skip) => {},
                        Err(e) => yield Err(e),
                    };
                }
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::try_exists(&abs_path).await.map_err(ErrorKind::Io)?)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::read(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, path))?;
        }
        Ok(fs::write(&abs_path, data).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::remove_file(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from_path = self.absolute_path(from)?;
        let to_path = self.absolute_path(to)?;
        if let Some(parent) = to_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, to))?;
        }
        Ok(fs::rename(&from_path, &to_path).await.map_err(|e| Self::map_io_error(e, to))?)
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let abs_path = self.absolute_path(path)?;
        let metadata = fs::metadata(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?;
        Self::metadata(path, metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, LocalBackend) {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("import", temp_dir.path()).unwrap();
        (temp_dir, backend)
    }

    #[test]
    fn test_new_requires_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalBackend::new("import", temp_dir.path()).is_ok());
        assert!(LocalBackend::new("import", "relative/import").is_err());
        assert!(LocalBackend::new("import", "./import").is_err());
    }

    #[test]
    fn test_new_creates_missing_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("db/failed");
        LocalBackend::new("failed", &root).unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_new_rejects_file_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("books");
        std::fs::write(&file, b"").unwrap();
        let err = LocalBackend::new("library", &file).err().unwrap();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }

    #[test]
    fn test_absolute_and_relative_paths() {
        let (temp_dir, backend) = setup();
        let abs = temp_dir.path().join("b/Dan_Brown/Inferno.epub");
        assert_eq!(backend.absolute_path(Path::new("b/Dan_Brown/Inferno.epub")).unwrap(), abs);
        assert_eq!(backend.relative_path(&abs).unwrap(), Path::new("b/Dan_Brown/Inferno.epub"));
        assert!(backend.absolute_path(Path::new("../etc/passwd")).is_err());
        assert!(backend.relative_path(PathBuf::from("/elsewhere/book.epub")).is_err());
    }

    #[tokio::test]
    async fn test_write_read_delete() {
        let (_dir, backend) = setup();
        let path = Path::new("nested/dir/book.epub");
        backend.write(path, b"PK\x03\x04").await.unwrap();
        assert!(backend.exists(path).await.unwrap());
        assert_eq!(backend.read(path).await.unwrap(), b"PK\x03\x04");
        backend.delete(path).await.unwrap();
        assert!(!backend.exists(path).await.unwrap());
        let err = backend.delete(path).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rename_creates_directories() {
        let (_dir, backend) = setup();
        backend.write(Path::new("inferno.epub"), b"data").await.unwrap();
        backend.rename(Path::new("inferno.epub"), Path::new("b/Dan_Brown/Dan_Brown-Inferno.epub")).await.unwrap();
        assert!(!backend.exists(Path::new("inferno.epub")).await.unwrap());
        assert_eq!(backend.read(Path::new("b/Dan_Brown/Dan_Brown-Inferno.epub")).await.unwrap(), b"data");
        let err = backend.rename(Path::new("inferno.epub"), Path::new("x.epub")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stat() {
        let (_dir, backend) = setup();
        backend.write(Path::new("book.epub"), b"12345").await.unwrap();
        let info = backend.stat(Path::new("book.epub")).await.unwrap();
        assert_eq!(info.path, PathBuf::from("book.epub"));
        assert_eq!(info.size, 5);
        assert!(info.modified <= time::UtcDateTime::now());
    }

    #[tokio::test]
    async fn test_list_walks_subdirectories() {
        let (_dir, backend) = setup();
        backend.write(Path::new("a.epub"), b"1").await.unwrap();
        backend.write(Path::new("author/b.epub"), b"2").await.unwrap();
        backend.write(Path::new("author/series/c.epub"), b"3").await.unwrap();
        let mut paths: Vec<_> = backend.list(None).await.unwrap().into_iter().map(|f| f.path).collect();
        paths.sort();
        assert_eq!(paths, [
            PathBuf::from("a.epub"),
            PathBuf::from("author/b.epub"),
            PathBuf::from("author/series/c.epub")
        ]);
    }

    #[tokio::test]
    async fn test_list_with_prefix() {
        let (_dir, backend) = setup();
        backend.write(Path::new("b/Brown/inferno.epub"), b"data").await.unwrap();
        backend.write(Path::new("b/Browning/poems.epub"), b"data").await.unwrap();
        let files = backend.list(Some(Path::new("b/Brown"))).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, Path::new("b/Brown/inferno.epub"));
        assert!(backend.list(Some(Path::new("nonexistent/"))).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_empty_directory() {
        let (_dir, backend) = setup();
        assert!(backend.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_path_security() {
        let (_dir, backend) = setup();
        assert!(backend.read(Path::new("../etc/passwd")).await.is_err());
        assert!(backend.read(Path::new("etc/../../passwd")).await.is_err());
        assert!(backend.write(Path::new("../escape.epub"), b"data").await.is_err());
        assert!(backend.delete(Path::new("../../file")).await.is_err());
    }
}
