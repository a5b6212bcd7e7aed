//! time parsing utilities for wake rules
//!
//! supports:
//! - time literals: "10", "10:30", "10:30:15" (two digits per field)
//! - weekday names: "Monday".."Sunday" and "Mon".."Sun", as written
//! - interval units: sec/s, min/m, hour/h

use chrono::{Datelike, NaiveTime, Weekday};
use strsim::levenshtein;

const WEEKDAYS: [(Weekday, &str, &str); 7] = [
    (Weekday::Mon, "Monday", "Mon"),
    (Weekday::Tue, "Tuesday", "Tue"),
    (Weekday::Wed, "Wednesday", "Wed"),
    (Weekday::Thu, "Thursday", "Thu"),
    (Weekday::Fri, "Friday", "Fri"),
    (Weekday::Sat, "Saturday", "Sat"),
    (Weekday::Sun, "Sunday", "Sun"),
];

const UNITS: [(&str, u64); 6] = [
    ("sec", 1),
    ("s", 1),
    ("min", 60),
    ("m", 60),
    ("hour", 3600),
    ("h", 3600),
];

/// parse a `hh[:mm[:ss]]` literal; missing fields default to zero
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }

    let mut fields = [0u32; 3];
    for (slot, part) in fields.iter_mut().zip(&parts) {
        if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *slot = part.parse().ok()?;
    }

    NaiveTime::from_hms_opt(fields[0], fields[1], fields[2])
}

/// parse a weekday name, full or three-letter, with the capitalization it is listed with
pub fn parse_weekday(s: &str) -> Option<Weekday> {
    WEEKDAYS
        .iter()
        .find(|(_, full, abbrev)| *full == s || *abbrev == s)
        .map(|(day, _, _)| *day)
}

/// three-letter name of a weekday
pub fn weekday_abbrev(day: Weekday) -> &'static str {
    WEEKDAYS
        .iter()
        .find(|(d, _, _)| *d == day)
        .map(|(_, _, abbrev)| *abbrev)
        .unwrap_or("?")
}

/// closest weekday name to a misspelled one
pub fn suggest_weekday(s: &str) -> Option<&'static str> {
    let names = WEEKDAYS
        .iter()
        .flat_map(|(_, full, abbrev)| [*full, *abbrev]);
    closest(s, names)
}

/// seconds per unit for an interval unit keyword
pub fn unit_seconds(unit: &str) -> Option<u64> {
    UNITS.iter().find(|(u, _)| *u == unit).map(|(_, secs)| *secs)
}

/// all accepted unit keywords, for error messages
pub fn unit_names() -> Vec<&'static str> {
    UNITS.iter().map(|(u, _)| *u).collect()
}

/// pick the candidate with the smallest edit distance, if it is close enough
pub fn closest<'a>(word: &str, candidates: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let lower = word.to_lowercase();
    candidates
        .map(|c| (c, levenshtein(&lower, &c.to_lowercase())))
        .filter(|(_, distance)| *distance <= 2)
        .min_by_key(|(_, distance)| *distance)
        .map(|(c, _)| c)
}

/// check if the weekday of `date` is one of `days`
pub fn is_day_match<D: Datelike>(days: &[Weekday], date: &D) -> bool {
    days.contains(&date.weekday())
}

/// strict containment: `start < time < end`
///
/// there is no wraparound, a window whose end is before its start never matches.
pub fn is_time_between(start: NaiveTime, end: NaiveTime, time: NaiveTime) -> bool {
    start < time && time < end
}
