//! Display- and comparison-ready forms of noisy metadata strings.

use crate::consts::{MARKUP_TAG, POSSESSIVE, PRINTING_MARKER, PUBLICATION_YEAR, REPEATED_SPACES, UNKNOWN, WHITESPACE};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Canonicalize a title or author.
///
/// - `capitalize` title-cases every word (`"dan BROWN"` to `"Dan Brown"`).
/// - `reorder` turns `"Last, First"` into `"First Last"`, but only when the
///   string holds exactly one comma.
///
/// Years in parentheses and `/ druk <n>` printing markers are removed, periods
/// become spaces, and typographic quotes are folded to ASCII. Empty input
/// yields `"Unknown"`.
///
/// ```
/// use libris_book::normalize;
/// assert_eq!(normalize("brown, dan  ", true, true), "Dan Brown");
/// assert_eq!(normalize("1984 (2001)", true, false), "1984");
/// assert_eq!(normalize("", true, true), "Unknown");
/// ```
pub fn normalize(s: impl AsRef<str>, capitalize: bool, reorder: bool) -> String {
    let s = s.as_ref();
    if s.trim().is_empty() {
        return UNKNOWN.to_string();
    }
    let mut s = match capitalize {
        true => POSSESSIVE.replace_all(&title_case(&s.to_lowercase()), "'s").into_owned(),
        false => s.to_string(),
    };
    if reorder && let Some(swapped) = swap_comma_name(&s) {
        s = swapped;
    }
    let s = PUBLICATION_YEAR.replace_all(&s, "");
    let s = PRINTING_MARKER.replace_all(&s, "");
    let s: String = s
        .chars()
        .map(|c| match c {
            '“' | '”' | '‹' | '›' => '"',
            '‘' | '’' => '\'',
            '_' | '.' => ' ',
            c => c,
        })
        .collect();
    let s = REPEATED_SPACES.replace_all(&s, " ");
    match s.trim() {
        "" => UNKNOWN.to_string(),
        s => s.to_string(),
    }
}

/// `"Last, First"` to `"First Last"`. Ambiguous with more than one comma.
fn swap_comma_name(s: &str) -> Option<String> {
    match s.split(',').collect::<Vec<_>>().as_slice() {
        [last, first] => Some(format!("{} {}", first.trim(), last.trim())),
        _ => None,
    }
}

/// Upper-case the first letter of every word.
///
/// Word boundaries are whitespace and ASCII punctuation, so `o'brien` becomes
/// `O'Brien`. Letters, digits, underscores and non-ASCII symbols continue a word.
fn title_case(s: &str) -> String {
    let mut boundary = true;
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match boundary {
            true => out.extend(c.to_uppercase()),
            false => out.push(c),
        }
        boundary = match c.is_ascii() {
            true => !(c.is_ascii_alphanumeric() || c == '_'),
            false => c.is_whitespace(),
        };
    }
    out
}

static LANGUAGES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let dutch = ["nld", "dutch", "nederlands", "nederland", "nl-nl", "nl_nl", "dut"].map(|v| (v, "nl"));
    let german = ["deutsch", "deutsche", "duits", "german", "ger", "de-de", "de_de"].map(|v| (v, "de"));
    let english = ["english", "engels", "eng", "uk", "us", "en-us", "en-gb", "en-en", "en_us", "en_gb", "en_en"]
        .map(|v| (v, "en"));
    dutch.into_iter().chain(german).chain(english).collect()
});

/// Map language names and locale tags onto two-letter codes.
///
/// Only Dutch, German and English variants are known. Anything else is
/// returned lowercased.
///
/// ```
/// use libris_book::normalize_language;
/// assert_eq!(normalize_language("Nederlands"), "nl");
/// assert_eq!(normalize_language("en-GB"), "en");
/// assert_eq!(normalize_language("FR"), "fr");
/// ```
pub fn normalize_language(s: impl AsRef<str>) -> String {
    let s = s.as_ref().trim().to_lowercase();
    match LANGUAGES.get(s.as_str()) {
        Some(code) => code.to_string(),
        None => s,
    }
}

/// Strip markup from a description and collapse its whitespace.
pub(crate) fn plain_text(s: &str) -> String {
    let s = MARKUP_TAG.replace_all(s, " ");
    WHITESPACE.replace_all(&s, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("brown, dan  ", true, true, "Dan Brown")]
    #[case("  dan  brown  ", true, true, "Dan Brown")]
    #[case("DAN BROWN", true, false, "Dan Brown")]
    #[case("1984 (2001)", true, false, "1984")]
    #[case("1984 / druk 2", true, false, "1984")]
    #[case("1984 / DRUK 12", false, false, "1984")]
    #[case("j.r.r. tolkien", true, true, "J R R Tolkien")]
    #[case("the hitchhiker's guide", true, false, "The Hitchhiker's Guide")]
    #[case("o'sullivan, maggie", true, true, "Maggie O'Sullivan")]
    #[case("pratchett, terry, gaiman, neil", true, true, "Pratchett, Terry, Gaiman, Neil")]
    #[case("Brown, Dan", false, false, "Brown, Dan")]
    #[case("“Quoted” ‘Title’", false, false, "\"Quoted\" 'Title'")]
    #[case("snake_case_title", false, false, "snake case title")]
    #[case("", true, true, "Unknown")]
    #[case("   ", false, false, "Unknown")]
    #[case("(1999)", false, false, "Unknown")]
    fn test_normalize(#[case] input: &str, #[case] capitalize: bool, #[case] reorder: bool, #[case] expected: &str) {
        assert_eq!(normalize(input, capitalize, reorder), expected);
    }

    #[test]
    fn test_normalize_is_stable() {
        let once = normalize("brown, dan (2003) / druk 4", true, true);
        assert_eq!(normalize(&once, true, true), once);
    }

    #[rstest]
    #[case("Ünïcödé straße", "Ünïcödé Straße")]
    #[case("rock-'n-roll", "Rock-'N-Roll")]
    #[case("über_alles", "Über_alles")]
    fn test_title_case(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(title_case(input), expected);
    }

    #[rstest]
    #[case("nld", "nl")]
    #[case("Dutch", "nl")]
    #[case("nl_NL", "nl")]
    #[case("duits", "de")]
    #[case("de-DE", "de")]
    #[case("ENG", "en")]
    #[case("us", "en")]
    #[case("en_gb", "en")]
    #[case(" en-US ", "en")]
    #[case("fr-FR", "fr-fr")]
    #[case("Español", "español")]
    #[case("", "")]
    fn test_normalize_language(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_language(input), expected);
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(plain_text("<p>A  <b>bold</b>\n story.</p>"), "A bold story.");
        assert_eq!(plain_text("   "), "");
    }
}
