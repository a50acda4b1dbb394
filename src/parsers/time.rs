use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::America::Chicago;
use chrono_tz::Tz;
use thiserror::Error;

/// All bare date/time input is interpreted in this zone before being
/// normalized to UTC for storage.
pub const REFERENCE_TZ: Tz = Chicago;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    #[error("empty time input")]
    Empty,
    #[error("unrecognized date '{0}': expected YYYY, YYYY-MM or YYYY-MM-DD")]
    BadDate(String),
    #[error("unrecognized time '{0}': expected HH:MM or HH:MM:SS")]
    BadTime(String),
    #[error("trailing input after date and time: '{0}'")]
    TrailingInput(String),
    #[error("'{0}' is not a valid calendar date/time")]
    OutOfRange(String),
}

/// Completes a partial, human-typed date/time string into an absolute instant.
///
/// Accepted shapes, whitespace-separated date then optional time:
/// `2025`, `2025-05`, `2025-05-02`, `2025-05-02 15:04`, `2025-05-02 15:04:05`.
/// Missing month/day default to 01, missing time fields to 00, and short
/// digit runs are treated as zero-padded (`5` -> `05`). The completed wall
/// clock is read in [`REFERENCE_TZ`] and returned as UTC. Timezone suffixes
/// are rejected; this is a defaults completer, not a timezone parser.
pub fn parse_flexible_time(input: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TimeParseError::Empty);
    }

    let mut fields = trimmed.split_whitespace();
    let date_part = fields.next().expect("non-empty input has a first field");
    let time_part = fields.next();
    if let Some(extra) = fields.next() {
        return Err(TimeParseError::TrailingInput(extra.to_string()));
    }

    let (year, month, day) = split_date(date_part)?;
    let (hour, minute, second) = match time_part {
        Some(part) => split_time(part)?,
        None => (0, 0, 0),
    };

    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| TimeParseError::OutOfRange(trimmed.to_string()))?;
    let time = NaiveTime::from_hms_opt(hour, minute, second)
        .ok_or_else(|| TimeParseError::OutOfRange(trimmed.to_string()))?;
    let naive = NaiveDateTime::new(date, time);

    // earliest() picks the first wall-clock reading across a DST fold; a
    // nonexistent local time (spring-forward gap) has no reading at all.
    REFERENCE_TZ
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| TimeParseError::OutOfRange(trimmed.to_string()))
}

fn split_date(part: &str) -> Result<(i32, u32, u32), TimeParseError> {
    let segments: Vec<&str> = part.split('-').collect();
    if segments.is_empty() || segments.len() > 3 {
        return Err(TimeParseError::BadDate(part.to_string()));
    }

    let year = parse_segment(segments[0]).ok_or_else(|| TimeParseError::BadDate(part.to_string()))?;
    let month = match segments.get(1) {
        Some(seg) => parse_segment(seg).ok_or_else(|| TimeParseError::BadDate(part.to_string()))?,
        None => 1,
    };
    let day = match segments.get(2) {
        Some(seg) => parse_segment(seg).ok_or_else(|| TimeParseError::BadDate(part.to_string()))?,
        None => 1,
    };

    Ok((year as i32, month, day))
}

fn split_time(part: &str) -> Result<(u32, u32, u32), TimeParseError> {
    let segments: Vec<&str> = part.split(':').collect();
    if segments.is_empty() || segments.len() > 3 {
        return Err(TimeParseError::BadTime(part.to_string()));
    }

    let hour = parse_segment(segments[0]).ok_or_else(|| TimeParseError::BadTime(part.to_string()))?;
    let minute = match segments.get(1) {
        Some(seg) => parse_segment(seg).ok_or_else(|| TimeParseError::BadTime(part.to_string()))?,
        None => 0,
    };
    let second = match segments.get(2) {
        Some(seg) => parse_segment(seg).ok_or_else(|| TimeParseError::BadTime(part.to_string()))?,
        None => 0,
    };

    Ok((hour, minute, second))
}

/// Digits only; a short segment like "5" reads as the zero-padded "05".
/// Anything non-numeric (including a stray timezone suffix) fails the parse.
fn parse_segment(segment: &str) -> Option<u32> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}
