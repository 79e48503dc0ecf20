//! Date formatting for the `date` filter
//!
//! Format strings use single-character codes (PHP style). Any other character
//! is copied through, and a backslash copies the next character verbatim.
//!
//! Timezone offsets follow the JavaScript convention: minutes *behind* UTC, so
//! UTC+02:00 is `-120`.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Timelike, Utc};
use serde_json::Value;
use std::fmt::Write;

const DAYS: [&str; 7] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"];

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// An instant together with its wall-clock view in the requested offset
///
/// Codes that describe the moment itself (`U`, `B`) read `instant`; calendar
/// and clock codes read `local`.
struct ShiftedDate<'a> {
    instant: DateTime<Utc>,
    local: DateTime<FixedOffset>,
    abbr: Option<&'a str>,
}

impl<'a> ShiftedDate<'a> {
    fn new(instant: DateTime<Utc>, tz_offset: i32, abbr: Option<&'a str>) -> Self {
        let offset = tz_offset
            .checked_mul(60)
            .and_then(FixedOffset::west_opt)
            .unwrap_or_else(|| Utc.fix());
        Self {
            instant,
            local: instant.with_timezone(&offset),
            abbr,
        }
    }

    fn offset_seconds(&self) -> i32 {
        self.local.offset().local_minus_utc()
    }

    fn offset_string(&self, colon: bool) -> String {
        let seconds = self.offset_seconds();
        let sign = if seconds < 0 { '-' } else { '+' };
        let minutes = seconds.abs() / 60;
        if colon {
            format!("{sign}{:02}:{:02}", minutes / 60, minutes % 60)
        } else {
            format!("{sign}{:02}{:02}", minutes / 60, minutes % 60)
        }
    }

    fn hour12(&self) -> u32 {
        match self.local.hour() % 12 {
            0 => 12,
            h => h,
        }
    }

    fn write_code(&self, code: char, out: &mut String) -> bool {
        let local = &self.local;
        let weekday = local.weekday();
        // Writing to a String cannot fail
        let _ = match code {
            'd' => write!(out, "{:02}", local.day()),
            'D' => out.write_str(&DAYS[weekday.num_days_from_monday() as usize][..3]),
            'j' => write!(out, "{}", local.day()),
            'l' => out.write_str(DAYS[weekday.num_days_from_monday() as usize]),
            'N' => write!(out, "{}", weekday.number_from_monday()),
            'S' => out.write_str(ordinal_suffix(local.day())),
            'w' => write!(out, "{}", weekday.num_days_from_sunday()),
            'z' => write!(out, "{}", local.ordinal0()),
            'W' => write!(out, "{}", local.iso_week().week()),
            'F' => out.write_str(MONTHS[local.month0() as usize]),
            'm' => write!(out, "{:02}", local.month()),
            'M' => out.write_str(&MONTHS[local.month0() as usize][..3]),
            'n' => write!(out, "{}", local.month()),
            't' => write!(out, "{}", days_in_month(local.year(), local.month())),
            'L' => write!(out, "{}", u8::from(is_leap_year(local.year()))),
            'o' => write!(out, "{}", local.iso_week().year()),
            'Y' => write!(out, "{}", local.year()),
            'y' => write!(out, "{:02}", local.year().rem_euclid(100)),
            'a' => out.write_str(if local.hour() < 12 { "am" } else { "pm" }),
            'A' => out.write_str(if local.hour() < 12 { "AM" } else { "PM" }),
            'B' => write!(out, "{:03}", swatch_beat(&self.instant)),
            'g' => write!(out, "{}", self.hour12()),
            'G' => write!(out, "{}", local.hour()),
            'h' => write!(out, "{:02}", self.hour12()),
            'H' => write!(out, "{:02}", local.hour()),
            'i' => write!(out, "{:02}", local.minute()),
            's' => write!(out, "{:02}", local.second()),
            'u' => write!(out, "{:03}", local.timestamp_subsec_millis() % 1000),
            'O' => out.write_str(&self.offset_string(false)),
            'P' => out.write_str(&self.offset_string(true)),
            'T' => match self.abbr {
                Some(abbr) => out.write_str(abbr),
                None if self.offset_seconds() == 0 => out.write_str("UTC"),
                None => write!(out, "GMT{}", self.offset_string(false)),
            },
            'Z' => write!(out, "{}", self.offset_seconds()),
            'c' => write!(
                out,
                "{}{}",
                local.format("%Y-%m-%dT%H:%M:%S"),
                self.offset_string(true)
            ),
            'r' => write!(
                out,
                "{} {}",
                local.format("%a, %d %b %Y %H:%M:%S"),
                self.offset_string(false)
            ),
            'U' => write!(out, "{}", self.instant.timestamp()),
            _ => return false,
        };
        true
    }
}

/// Format `date` according to `format`
///
/// `tz_offset` is in minutes behind UTC; `abbr` names the zone for `T`.
pub fn format(date: &DateTime<Utc>, format: &str, tz_offset: i32, abbr: Option<&str>) -> String {
    let shifted = ShiftedDate::new(*date, tz_offset, abbr);
    let mut out = String::with_capacity(format.len() * 2);
    let mut chars = format.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
            continue;
        }
        if !shifted.write_code(ch, &mut out) {
            out.push(ch);
        }
    }

    out
}

/// Interpret a context value as an instant
///
/// Accepts epoch milliseconds, RFC 3339 strings and `YYYY-MM-DD[ HH:MM:SS]`
/// strings (read as UTC).
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            Utc.timestamp_millis_opt(millis).single()
        }
        Value::String(s) => parse_date_str(s.trim()),
        _ => None,
    }
}

fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(s) {
        return Some(date.with_timezone(&Utc));
    }

    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map_or(31, |last| last.day())
}

/// Swatch Internet Time, measured from UTC+1
fn swatch_beat(instant: &DateTime<Utc>) -> u32 {
    let seconds = (instant.num_seconds_from_midnight() + 3600) % 86_400;
    (f64::from(seconds) / 86.4) as u32
}
