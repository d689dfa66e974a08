use std::collections::BTreeMap;

use brel_core::{Channel, FetchError, ReleaseVersion};
use chrono::{Days, NaiveDate};
use log::debug;
use serde::Deserialize;

/// An ESR line counts as supported while its newest point release is at
/// most this many days older than the newest ESR point release overall.
pub const ESR_WINDOW_DAYS: u64 = 90;

/// Rapid-release versioning starts at 4; older lines used `1.5`, `3.6`, ...
const FIRST_RAPID_RELEASE: u32 = 4;

/// A version announced by the release calendar but not shipped yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpcomingRelease {
    pub major: u32,
    pub channel: Channel,
    pub release_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct RawSchedule {
    release: Option<String>,
}

/// Read a `{"<version>": "<date>"}` release map into tracked versions.
///
/// `N.0` maps to `N`. Pre-rapid-release lines keep their minor (`3.5`).
/// Point releases such as `120.0.1` are dropped.
///
/// # Errors
/// Returns an error when the body is not a string map.
pub fn parse_releases(url: &str, body: &str) -> Result<BTreeMap<ReleaseVersion, NaiveDate>, FetchError> {
    let raw: BTreeMap<String, String> = brel_core::http::parse_json(url, body)?;

    let mut releases = BTreeMap::new();
    for (key, date) in raw {
        let Some(version) = release_version(&key) else {
            continue;
        };
        let Some(date) = parse_day(&date) else {
            debug!("{url}: `{key}` has unreadable date `{date}`");
            continue;
        };
        releases.insert(version, date);
    }
    Ok(releases)
}

fn release_version(key: &str) -> Option<ReleaseVersion> {
    let key = key.trim().trim_end_matches("esr");
    let mut parts = key.split('.');
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    if minor == 0 {
        Some(ReleaseVersion::from_major(major))
    } else if major < FIRST_RAPID_RELEASE {
        key.parse().ok()
    } else {
        None
    }
}

/// ESR majors still supported according to the ESR point-release map.
///
/// # Errors
/// Returns an error when the body is not a string map.
pub fn active_esr_majors(url: &str, body: &str) -> Result<Vec<u32>, FetchError> {
    let raw: BTreeMap<String, String> = brel_core::http::parse_json(url, body)?;

    let mut newest_per_major: BTreeMap<u32, NaiveDate> = BTreeMap::new();
    for (key, date) in raw {
        let major = key
            .trim()
            .split('.')
            .next()
            .and_then(|major| major.parse::<u32>().ok());
        let (Some(major), Some(date)) = (major, parse_day(&date)) else {
            continue;
        };
        let newest = newest_per_major.entry(major).or_insert(date);
        if date > *newest {
            *newest = date;
        }
    }

    let Some(&latest) = newest_per_major.values().max() else {
        return Ok(Vec::new());
    };
    let cutoff = latest
        .checked_sub_days(Days::new(ESR_WINDOW_DAYS))
        .unwrap_or(NaiveDate::MIN);

    Ok(newest_per_major
        .into_iter()
        .filter(|(_, newest)| *newest >= cutoff)
        .map(|(major, _)| major)
        .collect())
}

/// Release date from a release-calendar entry.
///
/// # Errors
/// Returns an error when the body is not a schedule object.
pub fn parse_schedule_date(url: &str, body: &str) -> Result<Option<NaiveDate>, FetchError> {
    let schedule: RawSchedule = brel_core::http::parse_json(url, body)?;
    Ok(schedule.release.as_deref().and_then(parse_day))
}

fn parse_day(raw: &str) -> Option<NaiveDate> {
    let day = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> ReleaseVersion {
        s.parse().expect("valid version in test")
    }

    #[test]
    fn release_map_keeps_majors_and_legacy_minors() {
        let body = r#"{
            "1.0": "2004-11-09",
            "1.5": "2005-11-29",
            "3.6": "2010-01-21",
            "3.6.28": "2012-03-13",
            "33.1": "2014-11-10",
            "120.0": "2023-11-21",
            "120.0.1": "2023-11-30"
        }"#;
        let releases = parse_releases("https://trains.test", body).expect("release map");

        let versions: Vec<String> = releases.keys().map(ToString::to_string).collect();
        assert_eq!(versions, ["1", "1.5", "3.6", "120"]);
        assert_eq!(releases.get(&v("120")), NaiveDate::from_ymd_opt(2023, 11, 21).as_ref());
    }

    #[test]
    fn esr_lines_outside_the_window_are_dropped() {
        let body = r#"{
            "102.0": "2022-06-28",
            "102.15.0": "2023-08-29",
            "115.0": "2023-07-04",
            "115.5.0": "2023-11-21",
            "128.0": "2024-07-09",
            "128.1.0": "2024-07-30",
            "115.14.0": "2024-07-30"
        }"#;
        let majors = active_esr_majors("https://trains.test", body).expect("esr map");
        assert_eq!(majors, [115, 128]);
    }

    #[test]
    fn empty_esr_map_has_no_active_lines() {
        let majors = active_esr_majors("https://trains.test", "{}").expect("esr map");
        assert!(majors.is_empty());
    }

    #[test]
    fn schedule_date_takes_day_part() {
        let body = r#"{"version": "122", "nightly_start": "2023-10-23", "release": "2024-01-23 00:00:00+00:00"}"#;
        assert_eq!(
            parse_schedule_date("https://trains.test", body).expect("schedule"),
            NaiveDate::from_ymd_opt(2024, 1, 23)
        );
    }

    #[test]
    fn schedule_without_release_has_no_date() {
        assert_eq!(
            parse_schedule_date("https://trains.test", r#"{"version": "130"}"#).expect("schedule"),
            None
        );
    }

    #[test]
    fn non_map_body_is_a_parse_error() {
        assert!(matches!(
            parse_releases("https://trains.test", "[]"),
            Err(FetchError::Parse { .. })
        ));
    }
}
