//! Whole-archive extraction.

use crate::archive::Archive;
use crate::cover;
use crate::error::{ErrorKind, Result};
use crate::models::Epub;
use crate::package::Package;
use exn::ResultExt;
use std::io::{Read, Seek};
use tracing::instrument;

/// Reads bibliographic metadata out of an EPUB archive.
///
/// Construction validates that the input is a zip archive; everything else
/// is checked by [`metadata`](Self::metadata).
pub struct Extractor<R: Read + Seek> {
    archive: Archive<R>,
}
impl<R: Read + Seek> Extractor<R> {
    pub fn new(reader: R) -> Result<Self> {
        Ok(Self { archive: Archive::new(reader)? })
    }

    /// Locates and parses the package document, then reads every field.
    ///
    /// `fallback_title` is used when the package has no title (usually the
    /// file stem). Publish dates and covers that can't be understood are
    /// dropped without failing the extraction.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `META-INF/container.xml` is missing or names no package document
    /// - The package document is missing or is not well-formed XML
    #[instrument(level = "debug", skip(self))]
    pub fn metadata(mut self, fallback_title: &str) -> Result<Epub> {
        let package_path = self.archive.package_path()?;
        let text = self.archive.read_text(&package_path)?;
        let package = Package::parse(&package_path, &text)?;
        let cover = package.cover_path().and_then(|path| match self.archive.read(&path) {
            Ok(bytes) => cover::normalize(&bytes),
            Err(e) => {
                tracing::debug!(path = %path, error = ?e, "cover referenced but unreadable");
                None
            },
        });
        Ok(Epub {
            title: package.title().unwrap_or_else(|| fallback_title.to_string()),
            author: package.author(),
            description: package.description(),
            language: package.language(),
            publisher: package.publisher(),
            isbn: package.isbn(),
            series: package.series(),
            published: package.published(),
            cover,
        })
    }
}
impl<R: Read + Seek> std::fmt::Debug for Extractor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor").finish_non_exhaustive()
    }
}

/// Open a file on disk for extraction.
pub(crate) fn open(path: &std::path::Path) -> Result<Extractor<std::io::BufReader<std::fs::File>>> {
    let file = std::fs::File::open(path).or_raise(|| ErrorKind::Io)?;
    Extractor::new(std::io::BufReader::new(file))
}
