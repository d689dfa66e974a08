use std::collections::BTreeMap;

use async_trait::async_trait;
use brel_core::{
    BrowserConfig, Channel, Device, Endpoints, FetchError, FetchSettings, ReleaseFetcher,
    ReleaseVersion, UpstreamFact,
};
use chrono::NaiveDate;
use log::{info, warn};

use crate::releases::{UpcomingRelease, active_esr_majors, parse_releases, parse_schedule_date};

/// Channels that follow the newest release, one major apart.
const UPCOMING: [Channel; 3] = [Channel::Beta, Channel::Nightly, Channel::Planned];

#[derive(Debug, Clone)]
pub struct FirefoxFetcher {
    client: reqwest::Client,
    settings: FetchSettings,
}

impl FirefoxFetcher {
    #[must_use]
    pub fn new(client: reqwest::Client, settings: FetchSettings) -> Self {
        Self { client, settings }
    }

    async fn upcoming(&self, schedule_url: &str, current: u32, config: &BrowserConfig) -> Vec<UpcomingRelease> {
        let mut upcoming = Vec::with_capacity(UPCOMING.len());
        for (offset, channel) in (1..).zip(UPCOMING) {
            let major = current + offset;
            let url = format!("{schedule_url}{major}");
            let release_date = match brel_core::http::get_text(&self.client, &url, &self.settings)
                .await
                .and_then(|body| parse_schedule_date(&url, &body))
            {
                Ok(date) => date,
                Err(error) => {
                    warn!("{}: no calendar entry for {major}: {error}", config.id);
                    None
                }
            };
            // Planned releases only exist once the calendar lists them.
            if channel == Channel::Planned && release_date.is_none() {
                continue;
            }
            upcoming.push(UpcomingRelease {
                major,
                channel,
                release_date,
            });
        }
        upcoming
    }
}

/// Turn shipped releases, supported ESR lines and calendar entries into facts.
#[must_use]
pub fn build_facts(
    releases: &BTreeMap<ReleaseVersion, NaiveDate>,
    esr_majors: &[u32],
    upcoming: &[UpcomingRelease],
    config: &BrowserConfig,
) -> Vec<UpstreamFact> {
    let mut facts: Vec<UpstreamFact> = releases
        .iter()
        .map(|(version, date)| {
            UpstreamFact::new(version.clone(), Channel::Stable)
                .with_date(Some(*date))
                .with_notes(config.release_notes_for(version, Some(*date)))
        })
        .collect();

    facts.extend(esr_majors.iter().map(|&major| {
        let version = ReleaseVersion::from_major(major);
        let date = releases.get(&version).copied();
        UpstreamFact::new(version, Channel::Esr).with_date(date)
    }));

    facts.extend(upcoming.iter().map(|release| {
        let version = ReleaseVersion::from_major(release.major);
        let notes = (release.channel == Channel::Beta)
            .then(|| config.release_notes_for(&version, release.release_date))
            .flatten();
        UpstreamFact::new(version, release.channel)
            .with_date(release.release_date)
            .with_notes(notes)
    }));

    facts
}

#[async_trait]
impl ReleaseFetcher for FirefoxFetcher {
    fn name(&self) -> &'static str {
        "firefox"
    }

    async fn fetch(&self, config: &BrowserConfig) -> Result<Vec<UpstreamFact>, FetchError> {
        let Endpoints::Firefox {
            releases_url,
            esr_url,
            schedule_url,
        } = &config.endpoints
        else {
            return Err(FetchError::unexpected_shape(
                "whattrainisitnow",
                format!("{} has no release calendar endpoint", config.id),
            ));
        };

        let body = brel_core::http::get_text(&self.client, releases_url, &self.settings).await?;
        let releases = parse_releases(releases_url, &body)?;
        let current = releases
            .keys()
            .map(ReleaseVersion::major)
            .max()
            .ok_or_else(|| FetchError::unexpected_shape("whattrainisitnow", "empty release map"))?;

        // Only desktop builds ship an extended support line.
        let esr_majors = if config.device == Device::Desktop {
            let body = brel_core::http::get_text(&self.client, esr_url, &self.settings).await?;
            active_esr_majors(esr_url, &body)?
        } else {
            Vec::new()
        };

        let upcoming = self.upcoming(schedule_url, current, config).await;
        let facts = build_facts(&releases, &esr_majors, &upcoming, config);
        info!(
            "{}: {} release(s), newest {current}, ESR {:?}",
            config.id,
            facts.len(),
            esr_majors
        );
        Ok(facts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date in test")
    }

    fn history() -> BTreeMap<ReleaseVersion, NaiveDate> {
        BTreeMap::from([
            (ReleaseVersion::from_major(115), day(2023, 7, 4)),
            (ReleaseVersion::from_major(120), day(2023, 11, 21)),
        ])
    }

    #[test]
    fn shipped_releases_become_stable_with_notes() {
        let config = BrowserConfig::firefox_desktop();
        let facts = build_facts(&history(), &[], &[], &config);

        assert_eq!(facts.len(), 2);
        assert!(facts.iter().all(|fact| fact.channel == Channel::Stable));
        assert_eq!(
            facts[1].release_notes.as_deref(),
            Some("https://developer.mozilla.org/docs/Mozilla/Firefox/Releases/120")
        );
    }

    #[test]
    fn esr_lines_reuse_the_release_date() {
        let config = BrowserConfig::firefox_desktop();
        let facts = build_facts(&history(), &[115], &[], &config);

        let esr = facts
            .iter()
            .find(|fact| fact.channel == Channel::Esr)
            .expect("esr fact");
        assert_eq!(esr.version, ReleaseVersion::from_major(115));
        assert_eq!(esr.release_date, Some(day(2023, 7, 4)));
    }

    #[test]
    fn upcoming_releases_keep_their_channel() {
        let config = BrowserConfig::firefox_android();
        let upcoming = [
            UpcomingRelease {
                major: 121,
                channel: Channel::Beta,
                release_date: Some(day(2023, 12, 19)),
            },
            UpcomingRelease {
                major: 122,
                channel: Channel::Nightly,
                release_date: None,
            },
        ];
        let facts = build_facts(&history(), &[], &upcoming, &config);

        let beta = facts
            .iter()
            .find(|fact| fact.channel == Channel::Beta)
            .expect("beta fact");
        assert_eq!(beta.release_date, Some(day(2023, 12, 19)));
        assert!(beta.release_notes.is_some());

        let nightly = facts
            .iter()
            .find(|fact| fact.channel == Channel::Nightly)
            .expect("nightly fact");
        assert!(nightly.release_notes.is_none());
    }

    #[tokio::test]
    async fn fetch_rejects_config_from_another_family() {
        let fetcher = FirefoxFetcher::new(reqwest::Client::new(), FetchSettings::default());
        let result = fetcher.fetch(&BrowserConfig::edge_desktop()).await;
        assert!(matches!(result, Err(FetchError::UnexpectedShape { .. })));
    }
}
