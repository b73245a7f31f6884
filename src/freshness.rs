use chrono::format::{self, Parsed, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use std::time::Duration;
use thiserror::Error;

/// Default tolerance window for server-reported timestamps.
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(60);

/// Offset-carrying layouts tried after RFC 3339. `%#z` takes `Z`, `+hh`, `+hhmm` and `+hh:mm`.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y%m%dT%H%M%S%.f%#z",
    "%Y%m%dT%H%M%#z",
];

/// Zone-naive layouts; values are read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y%m%dT%H%M%S%.f",
    "%Y%m%dT%H%M%S%.fZ",
    "%Y%m%dT%H%M",
];

/// Hour-only layouts, read as the top of the hour in UTC.
const HOUR_FORMATS: &[&str] = &["%Y-%m-%dT%H", "%Y%m%dT%H"];

/// Date-only layouts, read as midnight UTC.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    #[error("empty timestamp")]
    Empty,

    #[error("invalid ISO-8601 timestamp {input:?}")]
    Invalid { input: String },

    #[error("tolerance {0:?} is out of range")]
    Tolerance(Duration),
}

/// Parse an ISO-8601 date-time into UTC.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, TimestampError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TimestampError::Empty);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, format) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    for format in HOUR_FORMATS {
        if let Some(naive) = parse_hour(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    for format in DATE_FORMATS {
        if let Some(midnight) = NaiveDate::parse_from_str(trimmed, format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
        {
            return Ok(midnight.and_utc());
        }
    }

    Err(TimestampError::Invalid {
        input: trimmed.to_string(),
    })
}

fn parse_hour(input: &str, format: &str) -> Option<NaiveDateTime> {
    let mut parsed = Parsed::new();
    format::parse(&mut parsed, input, StrftimeItems::new(format)).ok()?;
    parsed.set_minute(0).ok()?;
    parsed.to_naive_datetime_with_offset(0).ok()
}

/// Checks that a server timestamp lies within a tolerance window around "now".
///
/// The window is symmetric: timestamps slightly in the future (clock skew
/// between client and server) pass as long as they are within tolerance.
/// The boundary itself counts as fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessCheck {
    tolerance: TimeDelta,
}

impl FreshnessCheck {
    pub fn new(tolerance: Duration) -> Result<Self, TimestampError> {
        let tolerance =
            TimeDelta::from_std(tolerance).map_err(|_| TimestampError::Tolerance(tolerance))?;
        Ok(Self { tolerance })
    }

    pub fn tolerance(&self) -> TimeDelta {
        self.tolerance
    }

    /// Freshness relative to an explicit reference time.
    pub fn is_fresh_at(&self, timestamp: &str, now: DateTime<Utc>) -> Result<bool, TimestampError> {
        let parsed = parse_timestamp(timestamp)?;
        Ok((now - parsed).abs() <= self.tolerance)
    }

    /// Freshness relative to the current UTC wall clock.
    pub fn is_fresh(&self, timestamp: &str) -> Result<bool, TimestampError> {
        self.is_fresh_at(timestamp, Utc::now())
    }
}

impl Default for FreshnessCheck {
    fn default() -> Self {
        Self {
            tolerance: TimeDelta::seconds(60),
        }
    }
}

/// Fixed one-minute freshness check against the current UTC time.
pub fn is_within_one_minute(timestamp: &str) -> Result<bool, TimestampError> {
    FreshnessCheck::default().is_fresh(timestamp)
}
