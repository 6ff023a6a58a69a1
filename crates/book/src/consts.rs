use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

/// Placeholder for titles and authors that are missing entirely.
pub const UNKNOWN: &str = "Unknown";

/// Articles and conjunctions (English, French, Dutch) ignored by the general key.
pub(crate) const STOP_WORDS: [&str; 10] = ["le", "la", "et", "de", "het", "en", "the", "and", "a", "an"];

// Canonicalization.
regex!(PUBLICATION_YEAR, r"\((1|2)[0-9]{3}\)");
regex!(PRINTING_MARKER, r"(?i)/ druk [0-9]+");
regex!(POSSESSIVE, r"'S\b");
regex!(REPEATED_SPACES, r" {2,}");
regex!(MARKUP_TAG, r"<[^>]*>");
regex!(WHITESPACE, r"\s+");

// Identity.
regex!(LEADING_NUMBERS, r"^ *[0-9]+");
regex!(BETWEEN_PARENTHESES, r"\(.*\)");
regex!(BETWEEN_BRACKETS, r"\[.*\]");
regex!(LEADING_ZERO, r"^ *(0)([0-9]+) ");
regex!(NOT_ALPHANUMERIC, r"[^a-z0-9]+");
regex!(NOT_LOWERCASE, r"[^a-z]+");
