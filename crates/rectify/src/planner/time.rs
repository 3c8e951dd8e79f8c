//! Day and time-range normalization for heterogeneous SIS feeds.
//!
//! The availability and enrollment feeds express days and times in several
//! shapes: Spanish day names with or without diacritics ("MIÉRCOLES",
//! "miercoles"), English names, numeric day codes, and free-form time text
//! such as "08:00 - 10:30" or "de 8:00 a 10:30". Everything downstream of
//! this module works with one canonical representation.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Canonical day of the week.
///
/// `Unknown` is a sentinel for unrecognized input; normalization never fails.
/// Sessions on an unknown day impose no conflict constraint and never match
/// a requested free day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
    Unknown,
}

impl Day {
    pub fn is_known(self) -> bool {
        self != Day::Unknown
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
            Day::Saturday => "Saturday",
            Day::Sunday => "Sunday",
            Day::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps raw day input to a canonical [`Day`].
///
/// Accepts Spanish names (with diacritics stripped), English names, and
/// numeric day codes 1-7 (Monday = 1). Anything else maps to `Day::Unknown`.
pub fn canonical_day(raw: &str) -> Day {
    let normalized = fold_ascii(raw);
    match normalized.as_str() {
        "lunes" | "monday" | "1" => Day::Monday,
        "martes" | "tuesday" | "2" => Day::Tuesday,
        "miercoles" | "wednesday" | "3" => Day::Wednesday,
        "jueves" | "thursday" | "4" => Day::Thursday,
        "viernes" | "friday" | "5" => Day::Friday,
        "sabado" | "saturday" | "6" => Day::Saturday,
        "domingo" | "sunday" | "7" => Day::Sunday,
        _ => Day::Unknown,
    }
}

/// Lowercases and strips diacritics, keeping only alphanumeric characters.
pub fn fold_ascii(raw: &str) -> String {
    raw.chars()
        .filter_map(|c| match c.to_lowercase().next().unwrap_or(c) {
            'á' | 'à' | 'ä' | 'â' => Some('a'),
            'é' | 'è' | 'ë' | 'ê' => Some('e'),
            'í' | 'ì' | 'ï' | 'î' => Some('i'),
            'ó' | 'ò' | 'ö' | 'ô' => Some('o'),
            'ú' | 'ù' | 'ü' | 'û' => Some('u'),
            'ñ' => Some('n'),
            c if c.is_alphanumeric() => Some(c),
            _ => None,
        })
        .collect()
}

/// A minute-of-day range within a single day.
///
/// Invariant: `start_minute < end_minute` once constructed through
/// [`parse_time_range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_minute: u16,
    pub end_minute: u16,
}

impl TimeRange {
    /// Half-open interval intersection. Touching endpoints do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start_minute < other.end_minute && other.start_minute < self.end_minute
    }

    /// Renders the range back to "HH:MM - HH:MM" for display.
    pub fn label(&self) -> String {
        format!(
            "{:02}:{:02} - {:02}:{:02}",
            self.start_minute / 60,
            self.start_minute % 60,
            self.end_minute / 60,
            self.end_minute % 60
        )
    }
}

fn clock_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([01]?\d|2[0-3]):([0-5]\d)").unwrap())
}

/// Extracts the first two `HH:MM` pairs from free-form text.
///
/// Returns `None` if fewer than two valid clock readings are found. Swapped
/// pairs are reordered so that start <= end; a zero-length range (identical
/// pairs) also yields `None` since it can constrain nothing.
pub fn parse_time_range(raw: &str) -> Option<TimeRange> {
    let mut minutes = clock_regex().captures_iter(raw).map(|caps| {
        let hours: u16 = caps[1].parse().unwrap_or(0);
        let mins: u16 = caps[2].parse().unwrap_or(0);
        hours * 60 + mins
    });

    let a = minutes.next()?;
    let b = minutes.next()?;
    let (start_minute, end_minute) = if a <= b { (a, b) } else { (b, a) };
    if start_minute == end_minute {
        return None;
    }
    Some(TimeRange {
        start_minute,
        end_minute,
    })
}

/// Parses a single `HH:MM` reading as minute-of-day.
pub fn parse_clock(raw: &str) -> Option<u16> {
    clock_regex().captures(raw).map(|caps| {
        let hours: u16 = caps[1].parse().unwrap_or(0);
        let mins: u16 = caps[2].parse().unwrap_or(0);
        hours * 60 + mins
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_day_spanish_diacritics() {
        assert_eq!(canonical_day("MIÉRCOLES"), Day::Wednesday);
        assert_eq!(canonical_day("miercoles"), Day::Wednesday);
        assert_eq!(canonical_day("Sábado"), Day::Saturday);
        assert_eq!(canonical_day("LUNES"), Day::Monday);
    }

    #[test]
    fn test_canonical_day_english_and_numeric() {
        assert_eq!(canonical_day("Tuesday"), Day::Tuesday);
        assert_eq!(canonical_day("5"), Day::Friday);
        assert_eq!(canonical_day("7"), Day::Sunday);
    }

    #[test]
    fn test_canonical_day_unrecognized() {
        assert_eq!(canonical_day("someday"), Day::Unknown);
        assert_eq!(canonical_day(""), Day::Unknown);
        assert_eq!(canonical_day("0"), Day::Unknown);
    }

    #[test]
    fn test_parse_time_range_free_text() {
        let range = parse_time_range("de 08:00 a 10:30").unwrap();
        assert_eq!(range.start_minute, 8 * 60);
        assert_eq!(range.end_minute, 10 * 60 + 30);
    }

    #[test]
    fn test_parse_time_range_swapped_pairs() {
        let range = parse_time_range("14:00 - 12:00").unwrap();
        assert_eq!(range.start_minute, 12 * 60);
        assert_eq!(range.end_minute, 14 * 60);
    }

    #[test]
    fn test_parse_time_range_insufficient_readings() {
        assert!(parse_time_range("08:00").is_none());
        assert!(parse_time_range("no times here").is_none());
        assert!(parse_time_range("").is_none());
    }

    #[test]
    fn test_parse_time_range_zero_length() {
        assert!(parse_time_range("09:00 - 09:00").is_none());
    }

    #[test]
    fn test_overlaps_half_open() {
        let a = TimeRange {
            start_minute: 480,
            end_minute: 600,
        };
        let b = TimeRange {
            start_minute: 600,
            end_minute: 720,
        };
        // Touching endpoints do not overlap
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));

        let c = TimeRange {
            start_minute: 590,
            end_minute: 650,
        };
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&a));
    }

    #[test]
    fn test_range_label() {
        let range = parse_time_range("8:00 - 10:05").unwrap();
        assert_eq!(range.label(), "08:00 - 10:05");
    }
}
