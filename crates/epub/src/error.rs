//! Extraction Error Types
//!
//! Every failure in this crate is a format failure: the archive is either a
//! readable EPUB or it is not. None of them are worth retrying.

use derive_more::{Display, Error};

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The file could not be read from disk.
    #[display("could not read file")]
    Io,
    /// The bytes are not a readable zip archive.
    #[display("not a valid zip archive")]
    Archive,
    /// A required archive entry is absent or unreadable.
    #[display("missing archive entry: {_0}")]
    MissingEntry(#[error(not(source))] String),
    /// `META-INF/container.xml` does not point at a package document.
    #[display("cannot locate package manifest")]
    Container,
    /// An XML document inside the archive could not be parsed.
    #[display("malformed XML in archive entry: {_0}")]
    MalformedXml(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Bytes on disk don't change between attempts.
        false
    }
}
