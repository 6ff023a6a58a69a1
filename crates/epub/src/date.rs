//! Publish date parsing.
//!
//! EPUB producers write dates in whatever shape their tooling prefers. The
//! accepted shapes are:
//!
//! | Example                            | Shape                                 |
//! |------------------------------------|---------------------------------------|
//! | `2012-02-13T20:20:58.175203+00:00` | RFC 3339 with fractional seconds      |
//! | `2012-02-13T20:20:58+01:00`        | date, `T`, time, offset               |
//! | `2012-02-13 20:20:58+01:00`        | date, space, time, offset             |
//! | `2012-02-13T20:20:58Z`             | `Z`-suffixed UTC                      |
//! | `2012-02-13T20:20:58`              | date and time without offset (as UTC) |
//! | `2012-02-13`                       | bare date (midnight UTC)              |
//!
//! Anything else parses to `None`. A bad date never fails an extraction.

use crate::consts::DATE_TIME_SEPARATOR;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

/// Parse a publish date in any of the accepted shapes, assuming UTC when no
/// offset is present.
///
/// ```
/// use libris_epub::parse_publish_date;
/// assert_eq!(parse_publish_date("2019-04-01").unwrap().year(), 2019);
/// assert!(parse_publish_date("April 2019").is_none());
/// ```
pub fn parse(value: impl AsRef<str>) -> Option<OffsetDateTime> {
    let value = value.as_ref().trim();
    // RFC 3339 requires the `T`; some producers write a space instead.
    let value = DATE_TIME_SEPARATOR.replace(value, "${1}T${2}");
    if let Ok(parsed) = OffsetDateTime::parse(&value, &Rfc3339) {
        return Some(parsed);
    }
    let datetime = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    if let Ok(parsed) = PrimitiveDateTime::parse(&value, &datetime) {
        return Some(parsed.assume_utc());
    }
    let date = format_description!("[year]-[month]-[day]");
    Date::parse(&value, &date).ok().map(|d| d.midnight().assume_utc())
}
