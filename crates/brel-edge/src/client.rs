use std::collections::BTreeMap;

use async_trait::async_trait;
use brel_core::{
    BrowserConfig, Channel, Endpoints, FetchError, FetchSettings, ReleaseFetcher, ReleaseVersion,
    UpstreamFact,
};
use log::{info, warn};

use crate::products::{ProductRelease, parse_products};
use crate::schedule::{ScheduleEntry, parse_schedule};

#[derive(Debug, Clone)]
pub struct EdgeFetcher {
    client: reqwest::Client,
    settings: FetchSettings,
}

impl EdgeFetcher {
    #[must_use]
    pub fn new(client: reqwest::Client, settings: FetchSettings) -> Self {
        Self { client, settings }
    }
}

/// Combine the products feed with the release schedule.
///
/// The stable product's date comes from the schedule when it lists an exact
/// day and falls back to the first publication otherwise. Older rows with
/// an exact day become stable releases the feed no longer lists. Beta and
/// dev releases carry their projected stable date. Schedule rows past
/// every product become planned releases.
#[must_use]
pub fn build_facts(
    products: &[ProductRelease],
    schedule: &BTreeMap<u32, ScheduleEntry>,
    config: &BrowserConfig,
) -> Vec<UpstreamFact> {
    let mut facts = Vec::new();

    for product in products {
        let version = ReleaseVersion::from_major(product.major);
        let scheduled = schedule.get(&product.major);
        let release_date = match product.channel {
            Channel::Stable => scheduled
                .filter(|entry| !entry.projected)
                .map(|entry| entry.stable)
                .or(product.first_published),
            _ => scheduled.map(|entry| entry.stable),
        };
        let notes = match product.channel {
            Channel::Stable | Channel::Beta => config.release_notes_for(&version, release_date),
            _ => None,
        };

        let mut fact = UpstreamFact::new(version, product.channel)
            .with_date(release_date)
            .with_notes(notes);
        if let Some(platform) = &product.platform {
            fact = fact.with_platform(platform.clone());
        }
        facts.push(fact);
    }

    let stable_major = products
        .iter()
        .find(|product| product.channel == Channel::Stable)
        .map(|product| product.major);
    if let Some(stable) = stable_major {
        for (&major, entry) in schedule.range(..stable) {
            if entry.projected {
                continue;
            }
            let version = ReleaseVersion::from_major(major);
            let notes = config.release_notes_for(&version, Some(entry.stable));
            facts.push(
                UpstreamFact::new(version, Channel::Stable)
                    .with_date(Some(entry.stable))
                    .with_notes(notes),
            );
        }
    }

    let newest_product = products.iter().map(|product| product.major).max();
    if let Some(newest) = newest_product {
        for (&major, entry) in schedule.range(newest + 1..) {
            facts.push(
                UpstreamFact::new(ReleaseVersion::from_major(major), Channel::Planned)
                    .with_date(Some(entry.stable)),
            );
        }
    }

    facts
}

#[async_trait]
impl ReleaseFetcher for EdgeFetcher {
    fn name(&self) -> &'static str {
        "edge"
    }

    async fn fetch(&self, config: &BrowserConfig) -> Result<Vec<UpstreamFact>, FetchError> {
        let Endpoints::Edge {
            edgeupdates_url,
            release_schedule_url,
        } = &config.endpoints
        else {
            return Err(FetchError::unexpected_shape(
                "edgeupdates",
                format!("{} has no edgeupdates endpoint", config.id),
            ));
        };

        let body = brel_core::http::get_text(&self.client, edgeupdates_url, &self.settings).await?;
        let products = parse_products(edgeupdates_url, &body, config)?;
        if !products.iter().any(|product| product.channel == Channel::Stable) {
            return Err(FetchError::unexpected_shape(
                "edgeupdates",
                "no stable product listed",
            ));
        }

        let schedule =
            match brel_core::http::get_text(&self.client, release_schedule_url, &self.settings)
                .await
            {
                Ok(markdown) => parse_schedule(&markdown),
                Err(error) => {
                    warn!("{}: release schedule unavailable: {error}", config.id);
                    BTreeMap::new()
                }
            };

        let facts = build_facts(&products, &schedule, config);
        info!(
            "{}: edgeupdates reported {} release(s), schedule {} row(s)",
            config.id,
            facts.len(),
            schedule.len()
        );
        Ok(facts)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date in test")
    }

    fn product(channel: Channel, major: u32, published: Option<NaiveDate>) -> ProductRelease {
        ProductRelease {
            channel,
            major,
            first_published: published,
            platform: Some("Windows".to_string()),
        }
    }

    fn entry(stable: NaiveDate, projected: bool) -> ScheduleEntry {
        ScheduleEntry { stable, projected }
    }

    #[test]
    fn stable_prefers_exact_schedule_date() {
        let config = BrowserConfig::edge_desktop();
        let schedule = BTreeMap::from([(121, entry(day(2024, 1, 25), false))]);
        let facts = build_facts(
            &[product(Channel::Stable, 121, Some(day(2024, 1, 26)))],
            &schedule,
            &config,
        );

        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].release_date, Some(day(2024, 1, 25)));
        assert_eq!(facts[0].platform.as_deref(), Some("Windows"));
        assert!(facts[0].release_notes.is_some());
    }

    #[test]
    fn stable_falls_back_to_publication_when_only_week_is_known() {
        let config = BrowserConfig::edge_desktop();
        let schedule = BTreeMap::from([(121, entry(day(2024, 1, 22), true))]);
        let facts = build_facts(
            &[product(Channel::Stable, 121, Some(day(2024, 1, 26)))],
            &schedule,
            &config,
        );
        assert_eq!(facts[0].release_date, Some(day(2024, 1, 26)));
    }

    #[test]
    fn prerelease_products_carry_projected_dates_and_later_rows_are_planned() {
        let config = BrowserConfig::edge_desktop();
        let schedule = BTreeMap::from([
            (122, entry(day(2024, 2, 22), true)),
            (123, entry(day(2024, 3, 21), true)),
            (124, entry(day(2024, 4, 18), true)),
        ]);
        let facts = build_facts(
            &[
                product(Channel::Stable, 121, Some(day(2024, 1, 25))),
                product(Channel::Beta, 122, None),
                product(Channel::Nightly, 123, None),
            ],
            &schedule,
            &config,
        );

        let beta = facts
            .iter()
            .find(|fact| fact.channel == Channel::Beta)
            .expect("beta fact");
        assert_eq!(beta.release_date, Some(day(2024, 2, 22)));

        let planned: Vec<_> = facts
            .iter()
            .filter(|fact| fact.channel == Channel::Planned)
            .map(|fact| fact.version.to_string())
            .collect();
        assert_eq!(planned, ["124"]);
    }

    #[test]
    fn older_exact_rows_become_stable_history() {
        let config = BrowserConfig::edge_desktop();
        let schedule = BTreeMap::from([
            (119, entry(day(2023, 11, 2), false)),
            (120, entry(day(2023, 12, 4), true)),
            (121, entry(day(2024, 1, 25), false)),
        ]);
        let facts = build_facts(
            &[product(Channel::Stable, 121, None)],
            &schedule,
            &config,
        );

        let stable: Vec<_> = facts
            .iter()
            .filter(|fact| fact.channel == Channel::Stable)
            .map(|fact| (fact.version.to_string(), fact.release_date))
            .collect();
        assert_eq!(
            stable,
            [
                ("121".to_string(), Some(day(2024, 1, 25))),
                ("119".to_string(), Some(day(2023, 11, 2))),
            ]
        );
    }

    #[tokio::test]
    async fn fetch_rejects_config_from_another_family() {
        let fetcher = EdgeFetcher::new(reqwest::Client::new(), FetchSettings::default());
        let result = fetcher.fetch(&BrowserConfig::chrome_desktop()).await;
        assert!(matches!(result, Err(FetchError::UnexpectedShape { .. })));
    }
}
