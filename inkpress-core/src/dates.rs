//! Timestamp parsing for frontmatter `date` / `modified` fields.
//!
//! Accepted forms:
//! - `YYYY-MM-DD` (midnight)
//! - `YYYY-MM-DD HH:MM[:SS]`, also with a `T` separator
//! - ISO-8601 / RFC 3339 with `Z` or a numeric offset
//!
//! Values without an explicit offset are interpreted in the site timezone
//! and recorded with that offset. Archive buckets and feed timestamps are
//! derived from the recorded value.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    #[error("unrecognised date {raw:?}")]
    Unrecognised { raw: String },

    #[error("invalid timezone offset {raw:?}")]
    InvalidOffset { raw: String },
}

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a frontmatter timestamp, attaching `site_offset` to naive values.
pub fn parse_timestamp(
    raw: &str,
    site_offset: FixedOffset,
) -> Result<DateTime<FixedOffset>, DateError> {
    let value = raw.trim();
    let unrecognised = || DateError::Unrecognised {
        raw: raw.to_string(),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt);
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Ok(dt);
        }
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(unrecognised)?;

    naive
        .and_local_timezone(site_offset)
        .single()
        .ok_or_else(unrecognised)
}

/// Parse a configured timezone offset: `Z`, `UTC`, `+HH:MM`, `-HHMM` or `+HH`.
pub fn parse_offset(raw: &str) -> Result<FixedOffset, DateError> {
    let value = raw.trim();
    let invalid = || DateError::InvalidOffset {
        raw: raw.to_string(),
    };

    if value.is_empty() || value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc")
    {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = if let Some(rest) = value.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = value.strip_prefix('-') {
        (-1, rest)
    } else {
        return Err(invalid());
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().map_err(|_| invalid())?, 0),
        4 => (
            digits[..2].parse::<i32>().map_err(|_| invalid())?,
            digits[2..].parse::<i32>().map_err(|_| invalid())?,
        ),
        _ => return Err(invalid()),
    };
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Calendar date of `timestamp` as seen in the site timezone.
pub fn site_date(timestamp: &DateTime<FixedOffset>, site_offset: FixedOffset) -> NaiveDate {
    timestamp.with_timezone(&site_offset).date_naive()
}
