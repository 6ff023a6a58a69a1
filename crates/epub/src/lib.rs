//! EPUB metadata extraction.
//!
//! An EPUB is a zip archive containing `META-INF/container.xml`, which points
//! at an OPF package document, which describes the book. This crate reads
//! that chain and produces an [`Epub`](models::Epub) of raw bibliographic
//! fields plus an optional JPEG cover.
//!
//! Malformed input of any kind is reported through [`error::ErrorKind`];
//! nothing in here is expected to panic on bad archives.

mod archive;
mod consts;
mod cover;
mod date;
pub mod error;
mod extract;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
mod isbn;
pub mod models;
mod package;
mod xml;

use std::io::Cursor;
use std::path::Path;
use tracing::instrument;

pub use crate::date::parse as parse_publish_date;
use crate::error::Result;
pub use crate::extract::Extractor;
pub use crate::isbn::is_valid as is_valid_isbn;
use crate::models::Epub;

/// Extract metadata from an EPUB file on disk.
///
/// The file stem doubles as the title when the package document has none.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn extract_file(path: impl AsRef<Path>) -> Result<Epub> {
    let path = path.as_ref();
    extract::open(path)?.metadata(&fallback_title(path))
}

/// Extract metadata from an EPUB already read into memory.
///
/// `path` is only used as the fallback title and for diagnostics.
#[instrument(skip_all, fields(path = %path.as_ref().display(), size = bytes.as_ref().len()))]
pub fn extract_bytes(path: impl AsRef<Path>, bytes: impl AsRef<[u8]>) -> Result<Epub> {
    Extractor::new(Cursor::new(bytes.as_ref()))?.metadata(&fallback_title(path.as_ref()))
}

fn fallback_title(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cover::tests::png_bytes;
    use crate::error::ErrorKind;
    use crate::fixtures::EpubBuilder;
    use crate::models::Series;
    use std::ops::Deref;

    fn full_book() -> Vec<u8> {
        EpubBuilder::package(
            r#"<dc:title>Leviathan Wakes</dc:title>
               <dc:creator opf:role="aut">Corey, James S. A.</dc:creator>
               <dc:language>en-GB</dc:language>
               <dc:publisher>Orbit</dc:publisher>
               <dc:description>Humanity has colonized the solar system.</dc:description>
               <dc:identifier opf:scheme="ISBN">urn:isbn:9780306406157</dc:identifier>
               <dc:date opf:event="publication">2011-06-15T00:00:00+00:00</dc:date>
               <meta name="calibre:series" content="The Expanse"/>
               <meta name="calibre:series_index" content="1"/>
               <meta name="cover" content="cover"/>"#,
            r#"<item id="cover" href="images/cover.png" media-type="image/png"/>"#,
        )
        .entry("OEBPS/images/cover.png", png_bytes())
        .build()
    }

    #[test]
    fn test_extract_bytes() {
        let epub = extract_bytes("import/leviathan.epub", full_book()).unwrap();
        assert_eq!(epub.title, "Leviathan Wakes");
        assert_eq!(epub.author.as_deref(), Some("Corey, James S. A."));
        assert_eq!(epub.language.as_deref(), Some("en-GB"));
        assert_eq!(epub.publisher.as_deref(), Some("Orbit"));
        assert_eq!(epub.isbn.as_deref(), Some("9780306406157"));
        assert_eq!(epub.series, Some(Series { name: "The Expanse".to_string(), index: 1.0 }));
        assert_eq!(epub.published.map(|d| d.year()), Some(2011));
        assert!(epub.has_cover());
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let bytes = full_book();
        let first = extract_bytes("a.epub", &bytes).unwrap();
        let second = extract_bytes("a.epub", &bytes).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_extract_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leviathan.epub");
        std::fs::write(&path, full_book()).unwrap();
        let epub = extract_file(&path).unwrap();
        assert_eq!(epub.title, "Leviathan Wakes");
    }

    #[test]
    fn test_extract_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_file(dir.path().join("nope.epub")).unwrap_err();
        assert_eq!(err.deref(), &ErrorKind::Io);
    }

    #[test]
    fn test_title_falls_back_to_file_stem() {
        let bytes = EpubBuilder::package("<dc:creator>Anonymous</dc:creator>", "").build();
        let epub = extract_bytes("import/Beowulf.epub", bytes).unwrap();
        assert_eq!(epub.title, "Beowulf");
    }

    #[test]
    fn test_broken_cover_is_no_cover() {
        let bytes = EpubBuilder::package(
            r#"<dc:title>T</dc:title><meta name="cover" content="c"/>"#,
            r#"<item id="c" href="cover.jpg" media-type="image/jpeg"/>"#,
        )
        .entry("OEBPS/cover.jpg", "not a jpeg")
        .build();
        let epub = extract_bytes("t.epub", bytes).unwrap();
        assert!(!epub.has_cover());
        assert_eq!(epub.cover, None);
    }

    #[test]
    fn test_missing_cover_entry_is_no_cover() {
        let bytes = EpubBuilder::package(
            r#"<dc:title>T</dc:title><meta name="cover" content="c"/>"#,
            r#"<item id="c" href="cover.jpg" media-type="image/jpeg"/>"#,
        )
        .build();
        assert!(!extract_bytes("t.epub", bytes).unwrap().has_cover());
    }

    #[test]
    fn test_not_a_zip() {
        let err = extract_bytes("t.epub", b"just some text").unwrap_err();
        assert_eq!(err.deref(), &ErrorKind::Archive);
    }

    #[test]
    fn test_truncated_zip() {
        let mut bytes = full_book();
        bytes.truncate(bytes.len() / 2);
        assert!(extract_bytes("t.epub", bytes).is_err());
    }

    #[test]
    fn test_missing_package_document() {
        let bytes = EpubBuilder::default().entry("META-INF/container.xml", fixtures::CONTAINER).build();
        let err = extract_bytes("t.epub", bytes).unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::MissingEntry(_)));
    }

    #[test]
    fn test_malformed_package_document() {
        let bytes = EpubBuilder::default()
            .entry("META-INF/container.xml", fixtures::CONTAINER)
            .entry("OEBPS/content.opf", "<package><metadata></package>")
            .build();
        let err = extract_bytes("t.epub", bytes).unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::MalformedXml(_)));
    }
}
