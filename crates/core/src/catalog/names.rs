//! Timestamp parsers for archive naming conventions
//!
//! - Model B run directory: `..._YYYYMMDDHHMMSS...` (first match wins)
//! - Model B geometry file: `..._YYYYMMDDHHMMSS_...`
//! - Perimeter snapshot directory: last `_` segment is `YYYYMMDDHHMM`
//! - Model A catalog: ISO-like date-time text

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::error::ParseError;

static RUN_DIR_STAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"_(\d{8})(\d{6})").expect("valid regex")
});

static RUN_FILE_STAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"_(\d{14})_").expect("valid regex")
});

const COMPACT_SECONDS: &str = "%Y%m%d%H%M%S";
const COMPACT_MINUTES: &str = "%Y%m%d%H%M";

/// Start timestamp embedded in a Model B run directory name
///
/// # Errors
/// Returns `ParseError` if no `_YYYYMMDDHHMMSS` group is present or it is not a
/// valid calendar time.
pub fn parse_run_dir_name(name: &str) -> Result<NaiveDateTime, ParseError> {
    let caps = RUN_DIR_STAMP
        .captures(name)
        .ok_or_else(|| ParseError::new(name, "no _YYYYMMDDHHMMSS group"))?;
    let stamp = format!("{}{}", &caps[1], &caps[2]);
    NaiveDateTime::parse_from_str(&stamp, COMPACT_SECONDS)
        .map_err(|e| ParseError::new(name, e.to_string()))
}

/// Timestamp embedded in a Model B geometry file name
///
/// # Errors
/// Returns `ParseError` if no `_YYYYMMDDHHMMSS_` group is present or it is not a
/// valid calendar time.
pub fn parse_run_file_name(name: &str) -> Result<NaiveDateTime, ParseError> {
    let caps = RUN_FILE_STAMP
        .captures(name)
        .ok_or_else(|| ParseError::new(name, "no _YYYYMMDDHHMMSS_ group"))?;
    NaiveDateTime::parse_from_str(&caps[1], COMPACT_SECONDS)
        .map_err(|e| ParseError::new(name, e.to_string()))
}

/// Observation timestamp of a perimeter snapshot directory
///
/// # Errors
/// Returns `ParseError` if the last `_` segment is not `YYYYMMDDHHMM`.
pub fn parse_snapshot_dir_name(name: &str) -> Result<NaiveDateTime, ParseError> {
    let last = name.rsplit('_').next().unwrap_or(name);
    if last.len() != 12 || !last.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::new(name, "last segment is not YYYYMMDDHHMM"));
    }
    NaiveDateTime::parse_from_str(last, COMPACT_MINUTES)
        .map_err(|e| ParseError::new(name, e.to_string()))
}

/// Forecast-issue time from the Model A catalog
///
/// # Errors
/// Returns `ParseError` if none of the accepted layouts match.
pub fn parse_forecast_timestamp(text: &str) -> Result<NaiveDateTime, ParseError> {
    const LAYOUTS: [&str; 8] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%Y/%m/%d %H:%M:%S",
        COMPACT_SECONDS,
    ];
    let text = text.trim();
    LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(text, layout).ok())
        .ok_or_else(|| ParseError::new(text, "unrecognised date-time layout"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_run_dir_name() {
        assert_eq!(
            parse_run_dir_name("K52125_sim_20230815101011").unwrap(),
            at(2023, 8, 15, 10, 10, 11)
        );
        // Trailing milliseconds after the stamp are ignored
        assert_eq!(
            parse_run_dir_name("BCWS_2023_K52125_20230815101011123").unwrap(),
            at(2023, 8, 15, 10, 10, 11)
        );
        assert!(parse_run_dir_name("notes").is_err());
        assert!(parse_run_dir_name("run_20231345101011").is_err());
    }

    #[test]
    fn test_run_file_name() {
        assert_eq!(
            parse_run_file_name("perimeter_20230815221011_final.geojson").unwrap(),
            at(2023, 8, 15, 22, 10, 11)
        );
        assert!(parse_run_file_name("perimeter_20230815221011.geojson").is_err());
    }

    #[test]
    fn test_snapshot_dir_name() {
        assert_eq!(
            parse_snapshot_dir_name("prot_current_fire_polys_202310241608").unwrap(),
            at(2023, 10, 24, 16, 8, 0)
        );
        assert!(parse_snapshot_dir_name("prot_current_fire_polys_latest").is_err());
        assert!(parse_snapshot_dir_name("prot_current_fire_polys_20231024160").is_err());
        assert!(parse_snapshot_dir_name("prot_202313241608").is_err());
    }

    #[test]
    fn test_forecast_timestamp_layouts() {
        let expected = at(2023, 8, 15, 10, 0, 0);
        for text in [
            "2023-08-15 10:00:00",
            "2023-08-15T10:00:00",
            "2023-08-15 10:00",
            " 2023-08-15 10:00:00.000 ",
            "20230815100000",
        ] {
            assert_eq!(parse_forecast_timestamp(text).unwrap(), expected, "{text}");
        }
        assert!(parse_forecast_timestamp("yesterday").is_err());
    }
}
