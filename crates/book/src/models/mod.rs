mod book;
mod input;
mod outcome;
mod stats;

pub use self::book::Book;
pub use self::input::BookInput;
pub use self::outcome::IngestOutcome;
pub use self::stats::RefreshStats;
pub use libris_epub::models::Series;
