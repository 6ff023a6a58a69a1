//! Cache Error Types
//!
//! Every `sqlx::Error` is classified on the way out so that callers can tell
//! a locked database (try again later) from a unique-key rejection (the book
//! is already known) without looking at SQLite result codes themselves.

use derive_more::{Display, Error};
use exn::ResultExt;

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    /// The database was locked or the pool ran dry. Worth another attempt.
    #[display("database busy")]
    Busy,
    /// A book with the same hash (or at the same path) is already stored.
    #[display("duplicate key")]
    Duplicate,
    #[display("database migration error")]
    Migration,
    /// A value could not be converted to or from its stored representation.
    #[display("invalid cache data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
    #[display("invalid query: {_0}")]
    InvalidQuery(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy)
    }
}

// Primary SQLite result codes, see https://www.sqlite.org/rescode.html
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

fn classify(err: &sqlx::Error) -> ErrorKind {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => ErrorKind::Duplicate,
        sqlx::Error::Database(db) => match db.code().and_then(|code| code.parse::<i32>().ok()) {
            // Extended result codes keep the primary code in the low byte.
            Some(code) if matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED) => ErrorKind::Busy,
            _ => ErrorKind::Database,
        },
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => ErrorKind::Busy,
        _ => ErrorKind::Database,
    }
}

/// Raise a `sqlx` failure as the [`ErrorKind`] it corresponds to.
pub(crate) trait SqlxResultExt<T> {
    fn or_classify(self) -> Result<T>;
}
impl<T> SqlxResultExt<T> for std::result::Result<T, sqlx::Error> {
    #[track_caller]
    fn or_classify(self) -> Result<T> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => {
                let kind = classify(&err);
                Err(err).or_raise(|| kind)
            },
        }
    }
}
