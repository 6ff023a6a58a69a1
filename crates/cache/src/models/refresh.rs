use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use libris_book::RefreshStats;
use time::UtcDateTime;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RefreshRow {
    pub(crate) started_at: i64,
    pub(crate) stopped_at: i64,
    pub(crate) old: i64,
    pub(crate) added: i64,
    pub(crate) duplicate: i64,
    pub(crate) invalid: i64,
    pub(crate) errors: i64,
}

fn count(value: u64) -> Result<i64, Error> {
    i64::try_from(value).or_raise(|| ErrorKind::InvalidData("refresh count"))
}

fn uncount(value: i64) -> Result<u64, Error> {
    u64::try_from(value).or_raise(|| ErrorKind::InvalidData("refresh count"))
}

impl TryFrom<&RefreshStats> for RefreshRow {
    type Error = Error;
    fn try_from(stats: &RefreshStats) -> Result<Self, Self::Error> {
        Ok(Self {
            started_at: stats.start.unix_timestamp(),
            stopped_at: stats.stop.unix_timestamp(),
            old: count(stats.old)?,
            added: count(stats.added)?,
            duplicate: count(stats.duplicate)?,
            invalid: count(stats.invalid)?,
            errors: count(stats.errors)?,
        })
    }
}

impl TryFrom<RefreshRow> for RefreshStats {
    type Error = Error;
    fn try_from(row: RefreshRow) -> Result<Self, Self::Error> {
        Ok(Self {
            start: UtcDateTime::from_unix_timestamp(row.started_at).or_raise(|| ErrorKind::InvalidData("started at"))?,
            stop: UtcDateTime::from_unix_timestamp(row.stopped_at).or_raise(|| ErrorKind::InvalidData("stopped at"))?,
            old: uncount(row.old)?,
            added: uncount(row.added)?,
            duplicate: uncount(row.duplicate)?,
            invalid: uncount(row.invalid)?,
            errors: uncount(row.errors)?,
        })
    }
}
