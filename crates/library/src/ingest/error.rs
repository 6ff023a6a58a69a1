use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The import directory could not be listed. Aborts the run.
    #[display("could not enumerate the import directory")]
    Enumerate,
    #[display("could not write to the book store")]
    Store,
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Enumerate => true,
            Self::Store => false,
        }
    }
}
