//! Parsing of upstream `period` strings.
//!
//! Seen forms: `2024-04-01` (daily), `2024-04-01T07` (UTC hourly) and
//! `2024-04-01T00-07` (local hourly with offset hours). Offsets with minutes
//! (`-07:00`, `+0530`) are accepted too.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::GridMixError;

/// A local-clock timestamp and the UTC offset (seconds) that came with it.
pub fn parse_period(raw: &str) -> Result<(NaiveDateTime, Option<i32>), GridMixError> {
    let raw = raw.trim();
    let malformed = || GridMixError::MalformedRow(format!("unparsable period {raw:?}"));

    let (date_part, time_part) = match raw.split_once('T') {
        Some((d, t)) => (d, Some(t)),
        None => (raw, None),
    };
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_| malformed())?;

    let Some(time_part) = time_part else {
        return Ok((date.and_time(NaiveTime::MIN), None));
    };

    let hour_digits: String = time_part.chars().take_while(|c| c.is_ascii_digit()).collect();
    if hour_digits.len() != 2 {
        return Err(malformed());
    }
    let hour: u32 = hour_digits.parse().map_err(|_| malformed())?;
    let mut rest = &time_part[2..];

    let mut minute = 0;
    if let Some(stripped) = rest.strip_prefix(':') {
        let digits: String = stripped.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.len() != 2 {
            return Err(malformed());
        }
        minute = digits.parse().map_err(|_| malformed())?;
        rest = &stripped[2..];
    }

    let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(malformed)?;
    let offset = parse_offset(rest).ok_or_else(malformed)?;
    Ok((date.and_time(time), offset))
}

/// `""` → no offset, `Z` → 0, `-07` / `+05:30` / `-0800` → seconds east of UTC.
fn parse_offset(raw: &str) -> Option<Option<i32>> {
    if raw.is_empty() {
        return Some(None);
    }
    if raw == "Z" {
        return Some(Some(0));
    }
    let sign = match raw.chars().next()? {
        '+' => 1,
        '-' => -1,
        _ => return None,
    };
    let digits: String = raw[1..].chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(Some(sign * (hours * 3600 + minutes * 60)))
}
