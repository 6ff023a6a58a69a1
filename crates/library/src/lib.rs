//! The ingestion pipeline.
//!
//! A [`Pipeline`] turns the EPUB files in an import directory into stored,
//! searchable books. At most one run is active at a time; the [`Coordinator`]
//! enforces that and reports which phase the active run is in.
//!
//! Each file ends up with exactly one [`IngestOutcome`](libris_book::IngestOutcome).
//! Files that can't be used leave the import directory for the quarantine
//! directory, so a rerun only ever sees new work.

mod context;
mod coordinator;
pub mod error;
pub mod ingest;
mod retry;
mod template;

pub use crate::context::Context;
pub use crate::coordinator::{Coordinator, RunGuard, RunState};
pub use crate::ingest::{Backends, Pipeline, import_records};
pub use crate::retry::RetryPolicy;
pub use crate::template::{DEFAULT_TEMPLATE, PathGenerator};
