use super::IngestOutcome;
use time::UtcDateTime;

/// Outcome counts over one reporting window.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RefreshStats {
    pub start: UtcDateTime,
    pub stop: UtcDateTime,
    pub old: u64,
    pub added: u64,
    pub duplicate: u64,
    pub invalid: u64,
    pub errors: u64,
}
impl Default for RefreshStats {
    fn default() -> Self {
        Self::starting_at(UtcDateTime::now())
    }
}
impl RefreshStats {
    pub fn starting_at(start: UtcDateTime) -> Self {
        Self { start, stop: start, old: 0, added: 0, duplicate: 0, invalid: 0, errors: 0 }
    }

    pub fn record(&mut self, outcome: IngestOutcome) {
        let counter = match outcome {
            IngestOutcome::Old => &mut self.old,
            IngestOutcome::Added => &mut self.added,
            IngestOutcome::Duplicate => &mut self.duplicate,
            IngestOutcome::Invalid => &mut self.invalid,
            IngestOutcome::StoreError => &mut self.errors,
        };
        *counter += 1;
        self.stop = UtcDateTime::now();
    }

    pub fn total(&self) -> u64 {
        self.old + self.added + self.duplicate + self.invalid + self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Close this window and open the next one.
    pub fn rotate(&mut self) -> Self {
        let now = UtcDateTime::now();
        let mut finished = std::mem::replace(self, Self::starting_at(now));
        finished.stop = now;
        finished
    }
}
impl std::fmt::Display for RefreshStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} added, {} old, {} duplicate, {} invalid, {} errors",
            self.added, self.old, self.duplicate, self.invalid, self.errors
        )
    }
}
