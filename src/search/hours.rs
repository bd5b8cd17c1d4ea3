//! Opening-hours parsing and open-now determination.
//!
//! Hour strings arrive scraped, in the form "9:00 AM to 10:00 PM". Any
//! parse failure, or a missing entry for today, yields "not open" rather
//! than an error: open-now is a surfacing signal, not a load-bearing one.

use chrono::{Local, Timelike};

use crate::models::DayHours;

/// Is the restaurant open at this moment, local time?
pub fn is_open_now(hours: &[DayHours]) -> bool {
    let now = Local::now();
    let weekday = now.format("%A").to_string();
    is_open_at(hours, &weekday, now.hour() * 100 + now.minute())
}

/// Is the restaurant open on `weekday` at `hhmm` (24-hour HHMM integer)?
pub fn is_open_at(hours: &[DayHours], weekday: &str, hhmm: u32) -> bool {
    let Some(today) = hours.iter().find(|d| d.day.eq_ignore_ascii_case(weekday)) else {
        return false;
    };
    let Some((open, close)) = parse_range(&today.hours) else {
        return false;
    };

    if close < open {
        // Overnight span, e.g. 6:00 PM to 1:00 AM
        hhmm >= open || hhmm < close
    } else {
        hhmm >= open && hhmm < close
    }
}

/// Parse "H:MM AM/PM to H:MM AM/PM" into (open, close) HHMM integers.
fn parse_range(s: &str) -> Option<(u32, u32)> {
    let (open, close) = s.split_once(" to ")?;
    Some((parse_time(open)?, parse_time(close)?))
}

/// Parse "H:MM AM/PM" (or "H AM/PM") into a 24-hour HHMM integer.
fn parse_time(s: &str) -> Option<u32> {
    let (time, meridiem) = s.trim().rsplit_once(' ')?;
    let (hour, minute) = match time.split_once(':') {
        Some((h, m)) => (h.trim().parse::<u32>().ok()?, m.trim().parse::<u32>().ok()?),
        None => (time.trim().parse::<u32>().ok()?, 0),
    };
    if hour == 0 || hour > 12 || minute > 59 {
        return None;
    }

    let hour24 = match (meridiem.trim().to_ascii_uppercase().as_str(), hour) {
        ("AM", 12) => 0,
        ("AM", h) => h,
        ("PM", 12) => 12,
        ("PM", h) => h + 12,
        _ => return None,
    };
    Some(hour24 * 100 + minute)
}
