use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

//
// ─── CLOCK ─────────────────────────────────────────────────────────────────────
//

/// A simple clock abstraction for deterministic time in services and tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }
}

//
// ─── DATE CODEC ────────────────────────────────────────────────────────────────
//

/// Canonical timestamp representation used in stored and incoming records,
/// e.g. `2026-02-01 10:15:30:250+0000`.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S:%3f%z";

/// Literal that clients send to mean "no timestamp supplied".
const NULL_SENTINEL: &str = "null";

/// A timestamp literal that is present, non-sentinel, and not in the
/// canonical format. Client-visible as an `InvalidDateFormat` error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid date format: {literal}")]
pub struct InvalidTimestamp {
    pub literal: String,
}

/// Parses an optional canonical-format timestamp literal.
///
/// The three outcomes are distinct so merge logic can pattern-match them
/// exhaustively: `Ok(None)` for an absent value or the `"null"` sentinel,
/// `Ok(Some(_))` for a well-formed literal, and `Err` for a malformed one.
///
/// # Errors
///
/// Returns `InvalidTimestamp` if the literal fails to parse.
pub fn parse_timestamp(value: Option<&str>) -> Result<Option<DateTime<Utc>>, InvalidTimestamp> {
    let Some(literal) = value else {
        return Ok(None);
    };
    if literal.eq_ignore_ascii_case(NULL_SENTINEL) {
        return Ok(None);
    }
    DateTime::parse_from_str(literal, CANONICAL_FORMAT)
        .map(|t| Some(t.with_timezone(&Utc)))
        .map_err(|_| InvalidTimestamp {
            literal: literal.to_owned(),
        })
}

/// Formats a timestamp in the canonical representation.
#[must_use]
pub fn format_timestamp(t: DateTime<Utc>) -> String {
    t.format(CANONICAL_FORMAT).to_string()
}

/// The timestamp max rule used for access and completion times.
///
/// Both absent yields `now`; exactly one absent yields the other; otherwise
/// the chronologically later of the two (an exact tie keeps `current`, which
/// is then equal to `incoming` anyway).
#[must_use]
pub fn latest_of(
    current: Option<DateTime<Utc>>,
    incoming: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    match (current, incoming) {
        (None, None) => now,
        (None, Some(t)) | (Some(t), None) => t,
        (Some(cur), Some(inc)) => {
            if inc > cur {
                inc
            } else {
                cur
            }
        }
    }
}

//
// ─── TEST TIME ─────────────────────────────────────────────────────────────────
//

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
