use crate::PathGenerator;
use crate::error::Result;
use crate::retry::RetryPolicy;
use crate::template::DEFAULT_TEMPLATE;
use libris_book::normalize_language;
use libris_config::Config;
use std::time::Duration;

/// Everything a run needs to know that isn't a backend or a store.
#[derive(Debug)]
pub struct Context {
    pub workers: usize,
    /// Files claimed per enumeration pass; `0` claims everything.
    pub batch_size: usize,
    pub index_batch_size: usize,
    pub index_flush_interval: Duration,
    pub stats_interval: Duration,
    pub retry: RetryPolicy,
    pub allow_deletes: bool,
    /// Set when added books are moved into the library directory.
    pub organize: Option<PathGenerator>,
    pub accepted_languages: Vec<String>,
    pub max_size: u64,
}
impl Context {
    pub fn from_config(config: &Config) -> Result<Self> {
        let organize = match config.organize {
            true => Some(DEFAULT_TEMPLATE.parse()?),
            false => None,
        };
        Ok(Self {
            workers: config.workers.max(1),
            batch_size: config.batch_size,
            index_batch_size: config.index.batch_size.max(1),
            index_flush_interval: config.index.flush_interval(),
            stats_interval: config.stats_interval(),
            retry: RetryPolicy::from(&config.retry),
            allow_deletes: config.allow_deletes,
            organize,
            accepted_languages: config.accepted_languages.iter().map(normalize_language).collect(),
            max_size: config.max_size,
        })
    }

    /// Whether a parsed book passes the size and language filters.
    pub fn keeps(&self, size: u64, language: &str) -> bool {
        let size_ok = self.max_size == 0 || size <= self.max_size;
        let language_ok = self.accepted_languages.is_empty() || self.accepted_languages.iter().any(|l| l == language);
        size_ok && language_ok
    }
}
impl Default for Context {
    fn default() -> Self {
        Self {
            workers: 6,
            batch_size: 1000,
            index_batch_size: 50,
            index_flush_interval: Duration::from_secs(5),
            stats_interval: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            allow_deletes: false,
            organize: None,
            accepted_languages: Vec::new(),
            max_size: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_from_config() {
        let config = Config {
            workers: 2,
            organize: true,
            accepted_languages: vec![" NL ".to_string(), "Dutch".to_string(), "en-GB".to_string(), "fr".to_string()],
            ..Config::default()
        };
        let ctx = Context::from_config(&config).unwrap();
        assert_eq!(ctx.workers, 2);
        assert!(ctx.organize.is_some());
        assert_eq!(ctx.accepted_languages, ["nl", "nl", "en", "fr"]);
        assert_eq!(ctx.index_flush_interval, Duration::from_secs(5));
    }

    #[rstest]
    #[case::unfiltered(0, &[], 10_000, "xx", true)]
    #[case::too_big(100, &[], 101, "en", false)]
    #[case::at_limit(100, &[], 100, "en", true)]
    #[case::accepted(0, &["nl", "en"], 1, "en", true)]
    #[case::rejected(0, &["nl"], 1, "en", false)]
    fn test_keeps(
        #[case] max_size: u64,
        #[case] languages: &[&str],
        #[case] size: u64,
        #[case] language: &str,
        #[case] expected: bool,
    ) {
        let ctx = Context {
            max_size,
            accepted_languages: languages.iter().map(|l| l.to_string()).collect(),
            ..Context::default()
        };
        assert_eq!(ctx.keeps(size, language), expected);
    }

    #[rstest]
    #[case("dutch")]
    #[case("nl-NL")]
    #[case("Nederlands")]
    fn test_configured_language_spellings_match_books(#[case] configured: &str) {
        let config = Config { accepted_languages: vec![configured.to_string()], ..Config::default() };
        let ctx = Context::from_config(&config).unwrap();
        assert!(ctx.keeps(1, &normalize_language("nl_NL")));
        assert!(!ctx.keeps(1, "en"));
    }
}
