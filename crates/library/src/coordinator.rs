//! Run exclusivity.
//!
//! The coordinator owns the run state. A run can only begin through
//! [`Coordinator::try_start`], and the returned [`RunGuard`] puts the state
//! back to [`Idle`](RunState::Idle) when dropped, whether the run finished,
//! failed, or panicked.

use derive_more::Display;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    #[display("idle")]
    Idle = 0,
    /// Enumerating the import directory.
    #[display("scanning")]
    Scanning = 1,
    /// Workers are processing claimed files.
    #[display("distributing")]
    Distributing = 2,
    /// Waiting on the final index and statistics flushes.
    #[display("draining")]
    Draining = 3,
}
impl RunState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Scanning,
            2 => Self::Distributing,
            3 => Self::Draining,
            _ => Self::Idle,
        }
    }
}

#[derive(Debug, Default)]
pub struct Coordinator {
    state: AtomicU8,
}
impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the coordinator for a new run. Returns `None` if a run is
    /// already active.
    pub fn try_start(&self) -> Option<RunGuard<'_>> {
        self.state
            .compare_exchange(RunState::Idle as u8, RunState::Scanning as u8, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard { coordinator: self })
    }

    pub fn current_state(&self) -> RunState {
        RunState::from_u8(self.state.load(Ordering::Acquire))
    }
}

/// Proof that the holder owns the active run.
#[derive(Debug)]
#[must_use = "dropping the guard ends the run"]
pub struct RunGuard<'a> {
    coordinator: &'a Coordinator,
}
impl RunGuard<'_> {
    /// Move the active run into another phase. Use [`finish`](Self::finish)
    /// (or drop the guard) to return to idle.
    pub fn set(&self, state: RunState) {
        if state != RunState::Idle {
            self.coordinator.state.store(state as u8, Ordering::Release);
        }
    }

    pub fn finish(self) {}
}
impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.state.store(RunState::Idle as u8, Ordering::Release);
    }
}
