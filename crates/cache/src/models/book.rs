use crate::error::{Error, ErrorKind};
use exn::{OptionExt, ResultExt};
use libris_book::models::{Book, Series};
use libris_book::MatchKeys;
use std::collections::BTreeSet;
use std::path::PathBuf;
use time::UtcDateTime;

/// Which of the two key sets a `book_keys` row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyKind {
    Lexical,
    Phonetic,
}
impl KeyKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Lexical => "lexical",
            Self::Phonetic => "phonetic",
        }
    }
}

/// One row of the `book_rows` view: the `books` columns plus both key sets
/// as JSON arrays.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BookRow {
    pub(crate) hash: String,
    pub(crate) path: String,
    pub(crate) title: String,
    pub(crate) author: String,
    pub(crate) language: String,
    pub(crate) description: String,
    pub(crate) publisher: Option<String>,
    pub(crate) isbn: Option<String>,
    pub(crate) series: Option<String>,
    pub(crate) series_index: Option<f64>,
    pub(crate) published_at: Option<i64>,
    pub(crate) size: i64,
    pub(crate) added_at: i64,
    pub(crate) has_cover: bool,
    pub(crate) cover_path: Option<String>,
    pub(crate) lexical_keys: String,
    pub(crate) phonetic_keys: String,
}
pub(crate) fn path_to_string(path: &std::path::Path, what: &'static str) -> Result<String, Error> {
    Ok(path.to_str().ok_or_raise(|| ErrorKind::InvalidData(what))?.to_string())
}

impl TryFrom<&Book> for BookRow {
    type Error = Error;
    fn try_from(book: &Book) -> Result<Self, Self::Error> {
        Ok(Self {
            hash: book.hash.clone(),
            path: path_to_string(&book.path, "path")?,
            title: book.title.clone(),
            author: book.author.clone(),
            language: book.language.clone(),
            description: book.description.clone(),
            publisher: book.publisher.clone(),
            isbn: book.isbn.clone(),
            series: book.series.as_ref().map(|s| s.name.clone()),
            series_index: book.series.as_ref().map(|s| s.index),
            published_at: book.published.map(|p| p.unix_timestamp()),
            size: i64::try_from(book.size).or_raise(|| ErrorKind::InvalidData("size"))?,
            added_at: book.added.unix_timestamp(),
            has_cover: book.has_cover,
            cover_path: book.cover_path.as_deref().map(|p| path_to_string(p, "cover path")).transpose()?,
            lexical_keys: serde_json::to_string(&book.keys.lexical).or_raise(|| ErrorKind::InvalidData("lexical keys"))?,
            phonetic_keys: serde_json::to_string(&book.keys.phonetic)
                .or_raise(|| ErrorKind::InvalidData("phonetic keys"))?,
        })
    }
}

impl TryFrom<BookRow> for Book {
    type Error = Error;
    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        let lexical: BTreeSet<String> =
            serde_json::from_str(&row.lexical_keys).or_raise(|| ErrorKind::InvalidData("lexical keys"))?;
        let phonetic: BTreeSet<String> =
            serde_json::from_str(&row.phonetic_keys).or_raise(|| ErrorKind::InvalidData("phonetic keys"))?;
        Ok(Self {
            hash: row.hash,
            title: row.title,
            author: row.author,
            language: row.language,
            description: row.description,
            publisher: row.publisher,
            isbn: row.isbn,
            series: row.series.map(|name| Series { name, index: row.series_index.unwrap_or_default() }),
            published: row
                .published_at
                .map(UtcDateTime::from_unix_timestamp)
                .transpose()
                .or_raise(|| ErrorKind::InvalidData("published"))?,
            size: u64::try_from(row.size).or_raise(|| ErrorKind::InvalidData("size"))?,
            added: UtcDateTime::from_unix_timestamp(row.added_at).or_raise(|| ErrorKind::InvalidData("added"))?,
            has_cover: row.has_cover,
            cover_path: row.cover_path.map(PathBuf::from),
            path: PathBuf::from(row.path),
            keys: MatchKeys { phonetic, lexical },
        })
    }
}
