use super::Series;
use time::OffsetDateTime;

/// Raw bibliographic fields read from an EPUB package document.
///
/// Nothing here is normalized beyond whitespace trimming; canonicalization
/// happens when this is turned into a library record.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Epub {
    /// First `title` element, or the file stem when the package has none.
    pub title: String,
    /// First `creator` element.
    pub author: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub publisher: Option<String>,
    /// First checksum-valid ISBN-10/13 from `source` or `identifier`.
    pub isbn: Option<String>,
    pub series: Option<Series>,
    /// `None` when no date was present or its shape was unrecognized.
    pub published: Option<OffsetDateTime>,
    /// Cover image re-encoded as JPEG.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub cover: Option<Vec<u8>>,
}
impl Epub {
    pub fn has_cover(&self) -> bool {
        self.cover.as_ref().is_some_and(|c| !c.is_empty())
    }
}
