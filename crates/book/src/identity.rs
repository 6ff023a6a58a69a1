//! Deduplication identity.
//!
//! Two files share an identity when their canonical author and title reduce
//! to the same key. The reduction is deliberately lossy: it is meant to
//! collapse different editions of one work, not to fingerprint file content.

use crate::consts::{BETWEEN_BRACKETS, BETWEEN_PARENTHESES, LEADING_NUMBERS, LEADING_ZERO, NOT_ALPHANUMERIC};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Derive the deduplication key for a canonical author and title.
///
/// The surname is removed from the title as a plain substring before being
/// prepended, so a title that happens to contain the surname elsewhere loses
/// that part too. Existing keys depend on this.
///
/// ```
/// use libris_book::identity;
/// assert_eq!(identity("Dan Brown", "The Da Vinci Code"), "brownthedavincicode");
/// assert_eq!(identity("Dan Brown", "the da vinci code (2003)"), "brownthedavincicode");
/// ```
pub fn identity(author: impl AsRef<str>, title: impl AsRef<str>) -> String {
    let author = author.as_ref().to_lowercase().replace('-', " ");
    let mut title = title.as_ref().to_lowercase();
    let last_name = author.rsplit(' ').next().unwrap_or_default();

    if !author.is_empty() {
        title = title.replace(&author, "");
    }
    if !last_name.is_empty() {
        title = title.replace(last_name, "");
    }
    let title = LEADING_NUMBERS.replace(&title, "");

    let key = strip_diacritics(&format!("{last_name} {title}"));
    let key = BETWEEN_PARENTHESES.replace_all(key.trim(), " ");
    let key = BETWEEN_BRACKETS.replace_all(&key, " ");
    let key = key.replace(": a novel", " ");
    let key = LEADING_ZERO.replace(&key, " $2 ");
    NOT_ALPHANUMERIC.replace_all(&key, "").into_owned()
}

/// Decompose, drop combining marks, recompose.
pub(crate) fn strip_diacritics(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect()
}
