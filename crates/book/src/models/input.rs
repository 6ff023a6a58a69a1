use super::Book;
use std::path::PathBuf;

/// A bare record for bulk imports, typically deserialized from JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BookInput {
    pub title: String,
    pub author: String,
    pub language: String,
    pub description: String,
    pub path: PathBuf,
}
impl From<BookInput> for Book {
    fn from(input: BookInput) -> Self {
        Book::canonical(&input.title, &input.author, &input.language, &input.description, input.path)
    }
}
