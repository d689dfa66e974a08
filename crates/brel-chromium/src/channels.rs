use std::collections::BTreeMap;

use brel_core::{
    BrowserConfig, Channel, FetchError, ReleaseVersion, UpstreamFact, VersionScheme,
};
use chrono::NaiveDate;
use log::debug;
use serde::Deserialize;

const SOURCE: &str = "chromestatus";

/// One milestone as chromestatus describes it.
#[derive(Debug, Deserialize)]
struct RawMilestone {
    version: serde_json::Value,
    #[serde(default)]
    stable_date: Option<String>,
}

/// chromestatus guards its JSON with `)]}'` against XSSI.
#[must_use]
pub fn strip_xssi_prefix(body: &str) -> &str {
    body.trim_start()
        .strip_prefix(")]}'")
        .unwrap_or(body)
        .trim_start()
}

/// Turn a chromestatus `channels` (or milestone range) payload into facts.
///
/// Buckets are classified with the config's channel names; `planned` is
/// used for every bucket when `planned` is set, which is how milestone
/// range responses (keyed by milestone number) are read.
///
/// # Errors
/// Returns an error when the body is not a JSON object of milestones.
pub fn parse_channels(
    url: &str,
    body: &str,
    config: &BrowserConfig,
    planned: bool,
) -> Result<Vec<UpstreamFact>, FetchError> {
    let buckets: BTreeMap<String, serde_json::Value> =
        brel_core::http::parse_json(url, strip_xssi_prefix(body))?;

    let mut facts = Vec::new();
    for (name, raw) in buckets {
        let channel = if planned {
            Channel::Planned
        } else if let Some(channel) = config.channels.classify(&name) {
            channel
        } else {
            debug!("chromestatus: skipping bucket `{name}`");
            continue;
        };

        // Unrelated keys (for example `stable_cut`) are not milestone objects.
        let Ok(milestone) = serde_json::from_value::<RawMilestone>(raw) else {
            debug!("chromestatus: bucket `{name}` is not a milestone");
            continue;
        };

        let version = milestone_version(&milestone.version).ok_or_else(|| {
            FetchError::unexpected_shape(
                SOURCE,
                format!("bucket `{name}` has version {}", milestone.version),
            )
        })?;
        let release_date = milestone.stable_date.as_deref().and_then(parse_timestamp_date);
        let release_notes = matches!(channel, Channel::Stable | Channel::Beta)
            .then(|| config.release_notes_for(&version, release_date))
            .flatten();

        facts.push(
            UpstreamFact::new(version, channel)
                .with_date(release_date)
                .with_notes(release_notes),
        );
    }

    Ok(facts)
}

fn milestone_version(raw: &serde_json::Value) -> Option<ReleaseVersion> {
    let text = match raw {
        serde_json::Value::Number(number) => number.to_string(),
        serde_json::Value::String(text) => text.clone(),
        _ => return None,
    };
    ReleaseVersion::parse_with(&text, VersionScheme::Integer).ok()
}

/// `2024-02-06T00:00:00` or `2024-02-06` to a date.
fn parse_timestamp_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHANNELS: &str = r#")]}'
{
  "canary": {"version": 124, "earliest_beta": "2024-03-06T00:00:00", "stable_date": "2024-04-16T00:00:00"},
  "canary_asan": {"version": 124, "stable_date": "2024-04-16T00:00:00"},
  "dev": {"version": 123, "stable_date": "2024-03-19T00:00:00"},
  "beta": {"version": 123, "stable_date": "2024-03-19T00:00:00"},
  "stable": {"version": 122, "stable_date": "2024-02-20T00:00:00"},
  "stable_cut": "2024-02-14"
}"#;

    fn version_of(facts: &[UpstreamFact], channel: Channel) -> Option<String> {
        facts
            .iter()
            .find(|fact| fact.channel == channel)
            .map(|fact| fact.version.to_string())
    }

    #[test]
    fn strip_xssi_prefix_handles_plain_json() {
        assert_eq!(strip_xssi_prefix("{}"), "{}");
        assert_eq!(strip_xssi_prefix(")]}'\n{}"), "{}");
    }

    #[test]
    fn classifies_buckets_with_config_names() {
        let config = BrowserConfig::chrome_desktop();
        let facts = parse_channels("https://chromestatus.test", CHANNELS, &config, false)
            .expect("channels parse");

        assert_eq!(facts.len(), 3);
        assert_eq!(version_of(&facts, Channel::Stable).as_deref(), Some("122"));
        assert_eq!(version_of(&facts, Channel::Beta).as_deref(), Some("123"));
        assert_eq!(version_of(&facts, Channel::Nightly).as_deref(), Some("124"));
    }

    #[test]
    fn stable_fact_carries_date_and_notes() {
        let config = BrowserConfig::chrome_desktop();
        let facts = parse_channels("https://chromestatus.test", CHANNELS, &config, false)
            .expect("channels parse");
        let stable = facts
            .iter()
            .find(|fact| fact.channel == Channel::Stable)
            .expect("stable fact present");

        assert_eq!(stable.release_date, NaiveDate::from_ymd_opt(2024, 2, 20));
        assert_eq!(
            stable.release_notes.as_deref(),
            Some("https://chromereleases.googleblog.com/2024/02/stable-channel-update-for-desktop.html")
        );
    }

    #[test]
    fn nightly_fact_has_no_release_notes() {
        let config = BrowserConfig::chrome_desktop();
        let facts = parse_channels("https://chromestatus.test", CHANNELS, &config, false)
            .expect("channels parse");
        let nightly = facts
            .iter()
            .find(|fact| fact.channel == Channel::Nightly)
            .expect("nightly fact present");
        assert!(nightly.release_notes.is_none());
    }

    #[test]
    fn milestone_range_is_read_as_planned() {
        let config = BrowserConfig::chrome_desktop();
        let body = r#"{"125": {"version": 125, "stable_date": "2024-05-14T00:00:00"}, "126": {"version": "126"}}"#;
        let facts = parse_channels("https://chromestatus.test", body, &config, true)
            .expect("range parses");

        assert_eq!(facts.len(), 2);
        assert!(facts.iter().all(|fact| fact.channel == Channel::Planned));
        assert!(facts[1].release_date.is_none());
    }

    #[test]
    fn non_numeric_version_is_an_unexpected_shape() {
        let config = BrowserConfig::chrome_desktop();
        let body = r#"{"stable": {"version": "latest"}}"#;
        let result = parse_channels("https://chromestatus.test", body, &config, false);
        assert!(matches!(result, Err(FetchError::UnexpectedShape { source_name: "chromestatus", .. })));
    }

    #[test]
    fn body_that_is_not_an_object_fails_to_parse() {
        let config = BrowserConfig::chrome_desktop();
        let result = parse_channels("https://chromestatus.test", "[]", &config, false);
        assert!(matches!(result, Err(FetchError::Parse { .. })));
    }
}
