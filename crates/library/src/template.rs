//! Path templating for library organization.
//!
//! Turns a canonical [`Book`] into a relative path inside the library
//! directory using an [upon] template. Besides upon's builtins, templates
//! can use three library-specific functions:
//!
//! - **`safe`** removes everything but ASCII letters, digits, spaces and
//!   hyphens, and falls back to `unknown` when nothing is left.
//! - **`shorten`** cuts strings longer than 35 bytes down to 30.
//! - **`initial`** is the first character of the last word.
//!
//! After rendering, spaces become underscores and runs of underscores
//! collapse to one.
//!
//! # Template Variables
//!
//! | Variable        | Type             | Description                       |
//! |-----------------|------------------|-----------------------------------|
//! | `title`         | `String`         | Canonical title                   |
//! | `author`        | `String`         | Canonical author                  |
//! | `language`      | `String`         | Language code                     |
//! | `hash`          | `String`         | Identity hash                     |
//! | `series.name`   | `Option<String>` | Series name                       |
//! | `series.index`  | `Option<f64>`    | Position within the series        |
//!
//! # Example
//!
//! ```
//! use libris_book::{Book, BookInput};
//! use libris_library::{DEFAULT_TEMPLATE, PathGenerator};
//!
//! let book = Book::from(BookInput {
//!     title: "The Da Vinci Code".into(),
//!     author: "Brown, Dan".into(),
//!     ..Default::default()
//! });
//! let generator: PathGenerator = DEFAULT_TEMPLATE.parse().unwrap();
//! assert_eq!(generator.generate(&book).unwrap(), "B/Dan_Brown/Dan_Brown-The_Da_Vinci_Code.epub");
//! ```

use crate::error::{Error, ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use libris_book::Book;
use libris_storage::validate_path;
use std::str::FromStr;
use tracing::instrument;
use upon::{Engine, Template};

/// `<initial>/<author>/<author>-<title>.epub`
pub const DEFAULT_TEMPLATE: &str =
    "{{ author | safe | initial }}/{{ author | safe }}/{{ author | safe }}-{{ title | safe | shorten }}.epub";

/// Renders library paths for books.
///
/// The template is compiled when parsed, so syntax errors surface at
/// construction rather than halfway through an import.
pub struct PathGenerator {
    engine: Engine<'static>,
    template: Template<'static>,
}
impl FromStr for PathGenerator {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut engine = Engine::new();
        addons::configure(&mut engine);
        let template = engine.compile(s.to_string()).or_raise(|| ErrorKind::Template)?;
        Ok(Self { engine, template })
    }
}
impl std::fmt::Debug for PathGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathGenerator").finish_non_exhaustive()
    }
}
impl PathGenerator {
    /// Render, normalize and validate the library path of `book`.
    #[instrument(skip_all, fields(hash = %book.hash))]
    pub fn generate(&self, book: &Book) -> Result<String> {
        let path =
            self.template.render(&self.engine, Self::parameters(book)).to_string().or_raise(|| ErrorKind::Template)?;
        Self::normalize(path)
    }

    fn normalize(s: impl Into<String>) -> Result<String> {
        let mut path = s.into().trim().split('/').map(str::trim).collect::<Vec<_>>().join("/").replace(' ', "_");
        while path.contains("__") {
            path = path.replace("__", "_");
        }
        let path = validate_path(&path).or_raise(|| ErrorKind::Template)?;
        Ok(path.to_str().ok_or_raise(|| ErrorKind::Template)?.to_string())
    }

    fn parameters(book: &Book) -> upon::Value {
        let series = book.series.as_ref().map(|series| {
            upon::value! {
                name: series.name.as_str(),
                index: series.index,
            }
        });
        upon::value! {
            title: &book.title,
            author: &book.author,
            language: &book.language,
            hash: &book.hash,
            series: series,
        }
    }
}

mod addons {
    use libris_book::UNKNOWN;
    use upon::Engine;

    const SHORTEN_OVER: usize = 35;
    const SHORTEN_TO: usize = 30;

    fn safe(s: &str) -> String {
        let kept: String = s.chars().filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == '-').collect();
        match kept.trim() {
            "" => UNKNOWN.to_lowercase(),
            kept => kept.to_string(),
        }
    }

    fn shorten(s: &str) -> String {
        match s.len() > SHORTEN_OVER {
            true => s[..s.floor_char_boundary(SHORTEN_TO)].trim().to_string(),
            false => s.to_string(),
        }
    }

    fn initial(s: &str) -> String {
        s.split(' ').next_back().and_then(|word| word.chars().next()).map(String::from).unwrap_or_default()
    }

    pub(crate) fn configure(engine: &mut Engine<'_>) {
        engine.add_function("safe", safe);
        engine.add_function("shorten", shorten);
        engine.add_function("initial", initial);
    }

}
