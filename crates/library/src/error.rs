//! Library Error Types
//!
//! Per-file failures never surface here: the ingest pipeline turns them into
//! an [`IngestOutcome`](libris_book::IngestOutcome). What is left are the
//! failures that stop a whole operation.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("issue with path generation from template")]
    Template,
    /// A refresh run was aborted.
    #[display("ingest run failed")]
    Ingest,
    /// A bulk import of book records was aborted.
    #[display("bulk import failed")]
    Import,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            // An unreadable import directory may well be readable next time.
            Self::Ingest => true,
            Self::Template | Self::Import => false,
        }
    }
}
