//! Canonical book records.
//!
//! Raw metadata is noisy: `"BROWN, DAN"`, `"Dan Brown"` and `"brown, dan "`
//! are the same person. This crate turns extracted metadata into a [`Book`]
//! whose title and author are canonical, whose `hash` identifies the work,
//! and whose match keys drive search.

mod consts;
mod identity;
mod keys;
pub mod models;
mod normalize;

pub use crate::consts::UNKNOWN;
pub use crate::identity::identity;
pub use crate::keys::{MatchKeys, general_key, lexical_keys, phonetic_keys};
pub use crate::models::{Book, BookInput, IngestOutcome, RefreshStats};
pub use crate::normalize::{normalize, normalize_language};
