//! Reference clock — the "now" every date-derived field is computed against.
//!
//! Ages and tenures depend on the day the batch runs. Production runs use
//! the system clock; tests and reproducible reruns pin a fixed instant.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferenceClock {
    as_of: NaiveDateTime,
    pinned: bool,
}

impl ReferenceClock {
    /// Local wall-clock time, read once at construction.
    pub fn system() -> Self {
        Self {
            as_of: Local::now().naive_local(),
            pinned: false,
        }
    }

    pub fn fixed(as_of: NaiveDateTime) -> Self {
        Self { as_of, pinned: true }
    }

    /// Midnight of `date`.
    pub fn on(date: NaiveDate) -> Self {
        Self::fixed(date.and_time(NaiveTime::MIN))
    }

    /// Pinned instant if given, otherwise the system clock.
    pub fn from_option(as_of: Option<NaiveDateTime>) -> Self {
        as_of.map_or_else(Self::system, Self::fixed)
    }

    pub fn as_of(&self) -> NaiveDateTime {
        self.as_of
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }
}
