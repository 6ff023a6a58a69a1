//! SQLite book store and search index.
//!
//! The database is the system of record for which works are known: a book's
//! identity `hash` is unique, as is the `path` of the file it was read from.
//! Lexical and phonetic match keys are stored alongside each book for
//! all-terms search, and an FTS5 table over author, title and description is
//! kept up to date by the ingest pipeline's index batcher.
//!
//! The ingest pipeline talks to the database through the [`BookStore`] and
//! [`SearchIndex`] traits; operators use the query methods on [`Repository`].

mod db;
pub mod error;
mod models;
mod repo;
mod store;

pub use crate::db::{DEFAULT_MAX_CONNECTIONS, Database};
pub use crate::repo::Repository;
pub use crate::store::{BatchReport, BookStore, SearchIndex};
