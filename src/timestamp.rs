//! Capture time extraction from sidecar JSON
//!
//! Sidecars carry a human-formatted capture time such as
//! `Nov 2, 2022, 4:54:41 PM UTC`. Some exports put a narrow no-break space
//! (U+202F) before the AM/PM marker; it is normalized to a plain space
//! before parsing.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use filetime::FileTime;
use log::info;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::OrganizeError;

/// Narrow no-break space found between the time and the AM/PM marker
pub const NARROW_NO_BREAK_SPACE: char = '\u{202F}';

/// Layout of the date/time part, without the zone designator
const FORMATTED_TIME_LAYOUT: &str = "%b %d, %Y, %I:%M:%S %p";

#[derive(Debug, Deserialize)]
struct Sidecar {
    #[serde(rename = "photoTakenTime")]
    photo_taken_time: Option<TakenTime>,
}

#[derive(Debug, Deserialize)]
struct TakenTime {
    formatted: Option<String>,
}

/// Replace narrow no-break spaces with ordinary spaces
pub fn normalize_formatted_time(formatted: &str) -> String {
    formatted.replace(NARROW_NO_BREAK_SPACE, " ")
}

/// Zone abbreviations and their offsets east of UTC, in minutes
///
/// Standard and daylight names map to their own fixed offset, so `PST` is
/// always UTC-8 and `PDT` always UTC-7. Ambiguous names resolve the way the
/// usual JVM zone names do (`CST` is US Central, `IST` is India).
const ZONE_ABBREVIATIONS: &[(&str, i32)] = &[
    ("UTC", 0),
    ("UT", 0),
    ("GMT", 0),
    ("Z", 0),
    ("WET", 0),
    ("WEST", 60),
    ("CET", 60),
    ("CEST", 120),
    ("MET", 60),
    ("MEST", 120),
    ("EET", 120),
    ("EEST", 180),
    ("MSK", 180),
    ("IST", 330),
    ("PKT", 300),
    ("ICT", 420),
    ("WIB", 420),
    ("HKT", 480),
    ("SGT", 480),
    ("AWST", 480),
    ("JST", 540),
    ("KST", 540),
    ("ACST", 570),
    ("ACDT", 630),
    ("AEST", 600),
    ("AEDT", 660),
    ("NZST", 720),
    ("NZDT", 780),
    ("NST", -210),
    ("NDT", -150),
    ("AST", -240),
    ("ADT", -180),
    ("EST", -300),
    ("EDT", -240),
    ("CST", -360),
    ("CDT", -300),
    ("MST", -420),
    ("MDT", -360),
    ("PST", -480),
    ("PDT", -420),
    ("AKST", -540),
    ("AKDT", -480),
    ("HST", -600),
];

/// Offset for a zone designator: an abbreviation such as `UTC` or `PST`,
/// `+HHMM`, `+HH:MM`, or either numeric form prefixed with `GMT`/`UTC`
fn parse_zone(zone: &str) -> Option<FixedOffset> {
    if let Some((_, minutes)) = ZONE_ABBREVIATIONS
        .iter()
        .find(|(name, _)| zone.eq_ignore_ascii_case(name))
    {
        return FixedOffset::east_opt(minutes * 60);
    }

    let zone = ["GMT", "UTC"]
        .iter()
        .find_map(|prefix| {
            zone.get(..prefix.len())
                .filter(|p| p.eq_ignore_ascii_case(prefix))
                .map(|_| &zone[prefix.len()..])
        })
        .unwrap_or(zone);

    let (sign, digits) = match zone.as_bytes().first()? {
        b'+' => (1, &zone[1..]),
        b'-' => (-1, &zone[1..]),
        _ => return None,
    };
    let digits: String = digits.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Parse a formatted capture time into an absolute instant
pub fn parse_formatted_time(formatted: &str) -> Result<DateTime<Utc>, OrganizeError> {
    let normalized = normalize_formatted_time(formatted);
    let trimmed = normalized.trim();

    let (date_time, zone) = trimmed
        .rsplit_once(' ')
        .ok_or_else(|| OrganizeError::timestamp(format!("no zone designator in {formatted:?}")))?;
    let offset = parse_zone(zone)
        .ok_or_else(|| OrganizeError::timestamp(format!("unknown zone {zone:?} in {formatted:?}")))?;

    let naive = NaiveDateTime::parse_from_str(date_time.trim_end(), FORMATTED_TIME_LAYOUT)
        .map_err(|e| OrganizeError::timestamp(format!("failed to parse {formatted:?}: {e}")))?;

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| OrganizeError::timestamp(format!("ambiguous time {formatted:?}")))
}

/// Extract `photoTakenTime.formatted` from sidecar JSON text
pub fn formatted_time_from_json(json: &str) -> Result<String, OrganizeError> {
    let sidecar: Sidecar = serde_json::from_str(json)?;
    sidecar
        .photo_taken_time
        .and_then(|t| t.formatted)
        .ok_or_else(|| OrganizeError::timestamp("missing photoTakenTime.formatted"))
}

/// Read a sidecar file and parse its capture instant
pub fn read_capture_instant(sidecar_path: &Path) -> Result<DateTime<Utc>, OrganizeError> {
    info!("parsing photo taken time from JSON file: {}", sidecar_path.display());

    let content = fs::read_to_string(sidecar_path).map_err(|e| OrganizeError::io(sidecar_path, e))?;
    let formatted = formatted_time_from_json(&content).map_err(|e| e.with_path(sidecar_path))?;
    parse_formatted_time(&formatted).map_err(|e| e.with_path(sidecar_path))
}

/// Set a file's last-modified time, leaving its access time untouched
pub fn apply_modified_time(path: &Path, instant: DateTime<Utc>) -> Result<(), OrganizeError> {
    let file_time = FileTime::from_unix_time(instant.timestamp(), instant.timestamp_subsec_nanos());
    filetime::set_file_mtime(path, file_time).map_err(|e| OrganizeError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrganizeErrorKind;
    use chrono::{Datelike, NaiveDate, Timelike};
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_parse_narrow_no_break_space() {
        let instant = parse_formatted_time("Nov 2, 2022, 4:54:41\u{202f}PM UTC").unwrap();
        assert_eq!(instant, utc(2022, 11, 2, 16, 54, 41));
    }

    #[test]
    fn test_parse_plain_space() {
        let instant = parse_formatted_time("Nov 2, 2022, 4:54:41 PM UTC").unwrap();
        assert_eq!(instant, utc(2022, 11, 2, 16, 54, 41));
    }

    #[test]
    fn test_parse_midnight_and_noon() {
        assert_eq!(
            parse_formatted_time("Jan 1, 2020, 12:00:00 AM UTC").unwrap(),
            utc(2020, 1, 1, 0, 0, 0)
        );
        assert_eq!(
            parse_formatted_time("Jan 1, 2020, 12:00:00 PM UTC").unwrap(),
            utc(2020, 1, 1, 12, 0, 0)
        );
    }

    #[test]
    fn test_parse_numeric_offset() {
        assert_eq!(
            parse_formatted_time("Mar 15, 2021, 10:30:00 AM +02:00").unwrap(),
            utc(2021, 3, 15, 8, 30, 0)
        );
        assert_eq!(
            parse_formatted_time("Mar 15, 2021, 10:30:00 AM -0500").unwrap(),
            utc(2021, 3, 15, 15, 30, 0)
        );
    }

    #[test]
    fn test_parse_zone_abbreviations() {
        assert_eq!(
            parse_formatted_time("Nov 2, 2022, 4:54:41 PM PST").unwrap(),
            utc(2022, 11, 3, 0, 54, 41)
        );
        assert_eq!(
            parse_formatted_time("Nov 2, 2022, 4:54:41 PM EST").unwrap(),
            utc(2022, 11, 2, 21, 54, 41)
        );
        assert_eq!(
            parse_formatted_time("Nov 2, 2022, 4:54:41\u{202f}PM CET").unwrap(),
            utc(2022, 11, 2, 15, 54, 41)
        );
        assert_eq!(
            parse_formatted_time("Jul 4, 2021, 9:00:00 AM PDT").unwrap(),
            utc(2021, 7, 4, 16, 0, 0)
        );
        assert_eq!(
            parse_formatted_time("Jan 1, 2020, 12:00:00 AM IST").unwrap(),
            utc(2019, 12, 31, 18, 30, 0)
        );
        assert_eq!(
            parse_formatted_time("Jan 1, 2020, 12:00:00 AM gmt").unwrap(),
            utc(2020, 1, 1, 0, 0, 0)
        );
    }

    #[test]
    fn test_parse_prefixed_offset() {
        assert_eq!(
            parse_formatted_time("Mar 15, 2021, 10:30:00 AM GMT+02:00").unwrap(),
            utc(2021, 3, 15, 8, 30, 0)
        );
        assert_eq!(
            parse_formatted_time("Mar 15, 2021, 10:30:00 AM UTC-0530").unwrap(),
            utc(2021, 3, 15, 16, 0, 0)
        );
    }

    #[test]
    fn test_parse_failures() {
        for bad in [
            "",
            "not a date",
            "Nov 2, 2022, 4:54:41 PM",
            "Nov 2, 2022, 4:54:41 PM XYZT",
            "Nov 2, 2022, 4:54:41 PM +2",
            "Nov 2, 2022, 4:54:41 PM +0275",
            "Foo 2, 2022, 4:54:41 PM UTC",
            "Nov 32, 2022, 4:54:41 PM UTC",
            "2022-11-02T16:54:41Z",
        ] {
            let err = parse_formatted_time(bad).unwrap_err();
            assert_eq!(err.kind, OrganizeErrorKind::TimestampParse, "{bad:?}");
        }
    }

    #[test]
    fn test_formatted_time_from_json() {
        let json = r#"{"title":"a.jpg","photoTakenTime":{"timestamp":"1667408081","formatted":"Nov 2, 2022, 4:54:41 PM UTC"}}"#;
        assert_eq!(
            formatted_time_from_json(json).unwrap(),
            "Nov 2, 2022, 4:54:41 PM UTC"
        );

        let err = formatted_time_from_json(r#"{"title":"a.jpg"}"#).unwrap_err();
        assert_eq!(err.kind, OrganizeErrorKind::TimestampParse);

        let err = formatted_time_from_json(r#"{"photoTakenTime":{"timestamp":"1"}}"#).unwrap_err();
        assert_eq!(err.kind, OrganizeErrorKind::TimestampParse);

        let err = formatted_time_from_json("{ nope").unwrap_err();
        assert_eq!(err.kind, OrganizeErrorKind::Json);
    }

    #[test]
    fn test_read_capture_instant_and_apply() {
        let dir = tempdir().unwrap();
        let sidecar = dir.path().join("a.jpg.json");
        let media = dir.path().join("a.jpg");
        fs::write(
            &sidecar,
            r#"{"photoTakenTime":{"formatted":"Jan 1, 2020, 12:00:00 AM UTC"}}"#,
        )
        .unwrap();
        fs::write(&media, b"jpeg").unwrap();

        let instant = read_capture_instant(&sidecar).unwrap();
        apply_modified_time(&media, instant).unwrap();

        let modified = FileTime::from_last_modification_time(&fs::metadata(&media).unwrap());
        assert_eq!(modified.unix_seconds(), 1_577_836_800);
    }

    #[test]
    fn test_read_capture_instant_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = read_capture_instant(&path).unwrap_err();
        assert_eq!(err.kind, OrganizeErrorKind::NotFound);
        assert_eq!(err.path, Some(path));
    }

    proptest! {
        #[test]
        fn prop_formatted_round_trip(
            year in 1971i32..2100,
            month in 1u32..=12,
            day in 1u32..=28,
            hour in 0u32..24,
            minute in 0u32..60,
            second in 0u32..60,
            narrow in any::<bool>(),
        ) {
            let naive = NaiveDate::from_ymd_opt(year, month, day)
                .unwrap()
                .and_hms_opt(hour, minute, second)
                .unwrap();
            let separator = if narrow { "\u{202f}" } else { " " };
            let formatted = format!(
                "{}{}{} UTC",
                naive.format("%b %-d, %Y, %-I:%M:%S"),
                separator,
                naive.format("%p"),
            );

            let parsed = parse_formatted_time(&formatted).unwrap();
            prop_assert_eq!(parsed.year(), year);
            prop_assert_eq!(parsed.hour(), hour);
            prop_assert_eq!(parsed.naive_utc(), naive);
        }

        #[test]
        fn prop_garbage_never_panics(input in "\\PC{0,40}") {
            let _ = parse_formatted_time(&input);
        }
    }
}
