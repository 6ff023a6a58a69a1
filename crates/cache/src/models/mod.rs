mod book;
mod refresh;

pub(crate) use self::book::{BookRow, KeyKind, path_to_string};
pub(crate) use self::refresh::RefreshRow;
