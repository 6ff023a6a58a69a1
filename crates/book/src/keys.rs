//! Search keys.
//!
//! Lexical keys support exact all-terms matching; phonetic keys catch
//! spelling variants ("Bourne" and "Born" share a code). Both are sets, so
//! word order never matters.

use crate::consts::{NOT_LOWERCASE, STOP_WORDS};
use rphonetic::{DoubleMetaphone, Encoder};
use std::collections::BTreeSet;
use std::sync::LazyLock;

static METAPHONE: LazyLock<DoubleMetaphone> = LazyLock::new(DoubleMetaphone::default);

/// Both key sets for one string, usually `"<title> <author>"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatchKeys {
    pub phonetic: BTreeSet<String>,
    pub lexical: BTreeSet<String>,
}
impl MatchKeys {
    pub fn new(s: impl AsRef<str>) -> Self {
        let s = s.as_ref();
        Self { phonetic: phonetic_keys(s), lexical: lexical_keys(s) }
    }
}

/// Primary double-metaphone code of every word.
///
/// Only `a-z` survive per word; accented letters are dropped rather than
/// transliterated, and words with nothing left produce no code.
pub fn phonetic_keys(s: impl AsRef<str>) -> BTreeSet<String> {
    s.as_ref().split_whitespace().filter_map(metaphone).collect()
}

/// Every word, lowercased, with anything but letters and digits removed.
///
/// ```
/// use libris_book::lexical_keys;
/// let keys = lexical_keys("The Lord of the Rings: The Two Towers");
/// assert_eq!(keys.into_iter().collect::<Vec<_>>(), ["lord", "of", "rings", "the", "towers", "two"]);
/// ```
pub fn lexical_keys(s: impl AsRef<str>) -> BTreeSet<String> {
    s.as_ref()
        .split_whitespace()
        .map(|word| word.to_lowercase().chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect()
}

/// A single coarse key: stop words removed, the remaining phonetic codes
/// concatenated in sorted order.
pub fn general_key(s: impl AsRef<str>) -> String {
    let s = s.as_ref().to_lowercase();
    let s = NOT_LOWERCASE.replace_all(&s, " ");
    let words = s.split_whitespace().filter(|word| !STOP_WORDS.contains(word)).collect::<Vec<_>>();
    phonetic_keys(words.join(" ")).into_iter().collect()
}

fn metaphone(word: &str) -> Option<String> {
    let word = word.to_lowercase();
    let word = NOT_LOWERCASE.replace_all(&word, "");
    if word.is_empty() {
        return None;
    }
    Some(METAPHONE.encode(&word)).filter(|code| !code.is_empty())
}
