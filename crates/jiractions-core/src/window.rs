//! The observation window bounding emitted actions.

use crate::time::{self, TimeParseError};
use chrono::{DateTime, Utc};
use std::fmt;

/// A half-open `[start, end)` interval in UTC.
///
/// The same inclusion rule applies to create, update, and comment events:
/// an event is emitted iff `start <= timestamp < end`. History outside the
/// window is still consumed during reconstruction so that in-window actions
/// see correct baseline values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// Error returned for an invalid window configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    /// `start` must be strictly before `end`.
    #[error("window start {start} is not before end {end}")]
    Empty {
        /// Configured start bound.
        start: DateTime<Utc>,
        /// Configured end bound.
        end: DateTime<Utc>,
    },
    /// A bound failed to parse.
    #[error(transparent)]
    Parse(#[from] TimeParseError),
}

impl Window {
    /// Build a window from explicit bounds.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::Empty`] unless `start < end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, WindowError> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(WindowError::Empty { start, end })
        }
    }

    /// Build a window from configuration strings accepted by
    /// [`time::parse_datetime`].
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::Parse`] for an unparseable bound and
    /// [`WindowError::Empty`] unless `start < end`.
    pub fn parse(start: &str, end: &str) -> Result<Self, WindowError> {
        Self::new(time::parse_datetime(start)?, time::parse_datetime(end)?)
    }

    /// Returns true when `ts` lies inside the half-open interval.
    #[must_use]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }

    /// The inclusive start bound.
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// The exclusive end bound.
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
