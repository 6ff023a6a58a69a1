use crate::identity::identity;
use crate::keys::MatchKeys;
use crate::normalize::{normalize, normalize_language, plain_text};
use libris_epub::models::{Epub, Series};
use std::path::{Path, PathBuf};
use time::UtcDateTime;

/// The canonical record for one physical file.
///
/// `hash` identifies the *work*, not the bytes: two files whose canonical
/// author and title reduce to the same key are duplicates of each other.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Book {
    pub hash: String,
    pub title: String,
    pub author: String,
    /// Two-letter code where known, otherwise the lowercased original.
    pub language: String,
    pub description: String,
    pub publisher: Option<String>,
    pub isbn: Option<String>,
    pub series: Option<Series>,
    pub published: Option<UtcDateTime>,
    /// File size in bytes.
    pub size: u64,
    /// Modification time of the file when it was ingested.
    pub added: UtcDateTime,
    pub has_cover: bool,
    pub cover_path: Option<PathBuf>,
    /// Location relative to the import (or library) root.
    pub path: PathBuf,
    pub keys: MatchKeys,
}
impl Book {
    /// Canonicalize freshly extracted metadata.
    ///
    /// The cover bytes are not kept; callers that want to store the cover
    /// should take them from the [`Epub`] before or after this call.
    pub fn from_epub(epub: &Epub, path: impl AsRef<Path>, size: u64, added: UtcDateTime) -> Self {
        Self::canonical(
            &epub.title,
            epub.author.as_deref().unwrap_or_default(),
            epub.language.as_deref().unwrap_or_default(),
            epub.description.as_deref().unwrap_or_default(),
            path,
        )
        .with_details(epub, size, added)
    }

    /// Canonical title, author and language, plus everything derived from them.
    pub(crate) fn canonical(
        title: &str,
        author: &str,
        language: &str,
        description: &str,
        path: impl AsRef<Path>,
    ) -> Self {
        let title = normalize(title, true, false);
        let author = normalize(author, true, true);
        Self {
            hash: identity(&author, &title),
            keys: MatchKeys::new(format!("{title} {author}")),
            language: normalize_language(language),
            description: plain_text(description),
            publisher: None,
            isbn: None,
            series: None,
            published: None,
            size: 0,
            added: UtcDateTime::now(),
            has_cover: false,
            cover_path: None,
            path: path.as_ref().to_path_buf(),
            title,
            author,
        }
    }

    fn with_details(mut self, epub: &Epub, size: u64, added: UtcDateTime) -> Self {
        self.publisher = epub.publisher.as_deref().map(str::trim).filter(|p| !p.is_empty()).map(str::to_string);
        self.isbn = epub.isbn.clone();
        self.series = epub.series.clone();
        self.published = epub.published.map(|date| date.to_utc());
        self.size = size;
        self.added = added;
        self.has_cover = epub.has_cover();
        self
    }

    /// Where the cover of this book is stored: next to the book, as a JPEG.
    pub fn cover_sibling(&self) -> PathBuf {
        self.path.with_extension("jpg")
    }
}
