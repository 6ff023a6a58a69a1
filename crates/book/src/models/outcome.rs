use derive_more::Display;

/// What happened to one input file during a run. Emitted exactly once per file.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum IngestOutcome {
    /// This exact file is already in the library.
    #[display("old")]
    Old,
    #[display("added")]
    Added,
    /// Another file with the same identity is already in the library.
    #[display("duplicate")]
    Duplicate,
    /// Unreadable, or rejected by the keep-filter.
    #[display("invalid")]
    Invalid,
    /// Persistence failed after every retry.
    #[display("store error")]
    StoreError,
}
impl IngestOutcome {
    /// Outcomes after which the source file should leave the import directory.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Duplicate | Self::Invalid | Self::StoreError)
    }
}
