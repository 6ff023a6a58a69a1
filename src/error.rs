use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not open the database")]
    Database,
    #[display("could not open the {_0} directory")]
    Storage(#[error(not(source))] &'static str),
    #[display("refresh failed")]
    Refresh,
    #[display("query failed")]
    Query,
    #[display("could not read book records from {}", _0.display())]
    Records(#[error(not(source))] PathBuf),
    #[display("import failed")]
    Import,
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database | Self::Refresh)
    }
}
