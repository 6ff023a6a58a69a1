mod epub;
mod series;

pub use self::epub::Epub;
pub use self::series::Series;
