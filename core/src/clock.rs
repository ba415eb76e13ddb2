//! Engine clock — the single source of "now" for cooldowns and renewals.
//!
//! RULE: Nothing outside this module calls `Utc::now()`. Cooldown and
//! renewal windows are judged against `EngineClock::now()` so tests can
//! move time by hand.

use crate::types::Timestamp;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineClock {
    mode: ClockMode,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
enum ClockMode {
    System,
    Manual { at: Timestamp },
}

impl EngineClock {
    /// Follows the host wall clock.
    pub fn system() -> Self {
        Self { mode: ClockMode::System }
    }

    /// Frozen at `at` until advanced.
    pub fn manual(at: Timestamp) -> Self {
        Self { mode: ClockMode::Manual { at } }
    }

    pub fn now(&self) -> Timestamp {
        match self.mode {
            ClockMode::System => Utc::now(),
            ClockMode::Manual { at } => at,
        }
    }

    /// Move a manual clock forward. Returns `None` for a system clock or
    /// when the new instant falls outside the representable range, leaving
    /// the clock where it was.
    pub fn advance(&mut self, by: Duration) -> Option<Timestamp> {
        match &mut self.mode {
            ClockMode::System => None,
            ClockMode::Manual { at } => {
                *at = at.checked_add_signed(by)?;
                Some(*at)
            }
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self.mode, ClockMode::Manual { .. })
    }
}
