use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

pub(crate) const CONTAINER_PATH: &str = "META-INF/container.xml";
pub(crate) const ISBN_URN_PREFIX: &str = "urn:isbn:";
/// Shortest identifier worth checking; anything shorter can't be an ISBN-10.
pub(crate) const ISBN_MIN_LENGTH: usize = 10;
/// `opf:event` values that mark a date as the publication date.
pub(crate) const PUBLICATION_EVENTS: [&str; 3] = ["original-publication", "published", "publication"];

pub(crate) const META_CALIBRE_SERIES: &str = "calibre:series";
pub(crate) const META_CALIBRE_SERIES_INDEX: &str = "calibre:series_index";
pub(crate) const PROPERTY_COLLECTION: &str = "belongs-to-collection";
pub(crate) const PROPERTY_COLLECTION_TYPE: &str = "collection-type";
pub(crate) const PROPERTY_GROUP_POSITION: &str = "group-position";

regex!(ISBN_SEPARATORS, r"[\s-]+");
// The date part is always the first 10 characters, whatever separator follows it.
regex!(DATE_TIME_SEPARATOR, r"^(\d{4}-\d{2}-\d{2}) (\d{2}:)");
