//! Pipeline phases.
//!
//! ```text
//! Idle ──> Cleaning ──> Building ──> Watching
//! ```
//!
//! Phases only move forward; the watch phase lasts until the process is
//! signalled.

use std::fmt;

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Idle,
    Cleaning,
    Building,
    Watching,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Cleaning => "cleaning",
            Self::Building => "building",
            Self::Watching => "watching",
        };
        f.write_str(name)
    }
}

/// Current phase of one pipeline run.
#[derive(Debug)]
pub struct PhaseTracker {
    current: Mutex<Phase>,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self {
            current: Mutex::new(Phase::Idle),
        }
    }
}

impl PhaseTracker {
    pub fn current(&self) -> Phase {
        *self.current.lock()
    }

    /// Move to `next`. Backward or repeated transitions are ignored.
    pub fn advance(&self, next: Phase) -> bool {
        let mut current = self.current.lock();
        if next <= *current {
            return false;
        }
        crate::debug!("build"; "{} -> {}", *current, next);
        *current = next;
        true
    }
}
