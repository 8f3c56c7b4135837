//! Human-readable duration grammar.
//!
//! A duration is one or more ASCII digits followed by exactly one unit
//! letter: `S` (seconds), `M` (minutes) or `H` (hours), case-insensitive.
//! Penalties additionally accept the sentinel `-`, meaning "no penalty",
//! which parses to a zero duration.
//!
//! The validator and the optimizer both go through [`parse_duration`] so
//! they can never disagree about what is accepted.

use std::time::Duration;
use thiserror::Error;

/// Sentinel accepted in place of a penalty duration.
pub const NO_PENALTY: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
}

impl TimeUnit {
    fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'S' => Some(TimeUnit::Second),
            'M' => Some(TimeUnit::Minute),
            'H' => Some(TimeUnit::Hour),
            _ => None,
        }
    }

    fn seconds(self) -> u64 {
        match self {
            TimeUnit::Second => 1,
            TimeUnit::Minute => 60,
            TimeUnit::Hour => 60 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("duration is empty")]
    Empty,
    #[error("duration '{0}' must start with a whole number")]
    MissingCount(String),
    #[error("duration '{0}' must end with a single unit letter S, M or H")]
    BadUnit(String),
    #[error("duration '{0}' is too large")]
    Overflow(String),
}

/// Parse `<digits><unit>` into a [`Duration`].
pub fn parse_duration(s: &str) -> Result<Duration, DurationError> {
    let mut chars = s.chars();
    let unit = match chars.next_back() {
        Some(c) => c,
        None => return Err(DurationError::Empty),
    };
    let digits = chars.as_str();

    let unit = TimeUnit::from_letter(unit).ok_or_else(|| DurationError::BadUnit(s.to_string()))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DurationError::MissingCount(s.to_string()));
    }

    let count: u64 = digits
        .parse()
        .map_err(|_| DurationError::Overflow(s.to_string()))?;
    let secs = count
        .checked_mul(unit.seconds())
        .ok_or_else(|| DurationError::Overflow(s.to_string()))?;

    Ok(Duration::from_secs(secs))
}

/// Parse a penalty: either a duration or the `-` sentinel.
pub fn parse_penalty(s: &str) -> Result<Duration, DurationError> {
    if s == NO_PENALTY {
        return Ok(Duration::ZERO);
    }
    parse_duration(s)
}
