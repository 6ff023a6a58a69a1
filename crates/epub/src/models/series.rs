/// A book's position within a named series.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Series {
    /// Series name, with any embedded `#<index>` suffix removed.
    pub name: String,
    /// Position in the series. Fractional positions (novellas, `2.5`) are
    /// common enough that this is not an integer; `0.0` when unknown.
    pub index: f64,
}
impl Series {
    /// Build a series entry from a raw name, splitting off an embedded
    /// `Name #3` style index when present.
    ///
    /// The embedded index only wins when the name contains exactly one `#`
    /// and the part after it parses as a number; otherwise `index` is kept.
    ///
    /// ```
    /// use libris_epub::models::Series;
    /// let series = Series::parse("Discworld #7", 0.0).unwrap();
    /// assert_eq!(series.name, "Discworld");
    /// assert_eq!(series.index, 7.0);
    /// assert!(Series::parse("   ", 1.0).is_none());
    /// ```
    pub fn parse(raw: impl AsRef<str>, index: f64) -> Option<Self> {
        let raw = raw.as_ref().trim();
        let (name, index) = match raw.split('#').collect::<Vec<_>>().as_slice() {
            [name, position] => match position.trim().parse::<f64>() {
                Ok(position) => (name.trim(), position),
                Err(_) => (raw, index),
            },
            _ => (raw, index),
        };
        match name.is_empty() {
            true => None,
            false => Some(Self { name: name.to_string(), index }),
        }
    }
}
