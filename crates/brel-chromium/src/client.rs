use async_trait::async_trait;
use brel_core::{
    BrowserConfig, Channel, Endpoints, FetchError, FetchSettings, ReleaseFetcher, UpstreamFact,
};
use log::{info, warn};

use crate::channels::parse_channels;

/// How many milestones past canary to request as planned releases.
const PLANNED_AHEAD: u32 = 2;

#[derive(Debug, Clone)]
pub struct ChromiumFetcher {
    client: reqwest::Client,
    settings: FetchSettings,
}

impl ChromiumFetcher {
    #[must_use]
    pub fn new(client: reqwest::Client, settings: FetchSettings) -> Self {
        Self { client, settings }
    }

    async fn fetch_planned(
        &self,
        base_url: &str,
        after: u32,
        config: &BrowserConfig,
    ) -> Result<Vec<UpstreamFact>, FetchError> {
        let url = planned_range_url(base_url, after + 1, after + PLANNED_AHEAD);
        let body = brel_core::http::get_text(&self.client, &url, &self.settings).await?;
        parse_channels(&url, &body, config, true)
    }
}

fn planned_range_url(base_url: &str, start: u32, end: u32) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{base_url}{separator}start={start}&end={end}")
}

#[async_trait]
impl ReleaseFetcher for ChromiumFetcher {
    fn name(&self) -> &'static str {
        "chromium"
    }

    async fn fetch(&self, config: &BrowserConfig) -> Result<Vec<UpstreamFact>, FetchError> {
        let Endpoints::Chromium { chromestatus_url } = &config.endpoints else {
            return Err(FetchError::unexpected_shape(
                "chromestatus",
                format!("{} has no chromestatus endpoint", config.id),
            ));
        };

        let body = brel_core::http::get_text(&self.client, chromestatus_url, &self.settings).await?;
        let mut facts = parse_channels(chromestatus_url, &body, config, false)?;

        let newest = facts
            .iter()
            .filter(|fact| fact.channel == Channel::Nightly)
            .map(|fact| fact.version.major())
            .max();
        if let Some(newest) = newest {
            match self.fetch_planned(chromestatus_url, newest, config).await {
                Ok(planned) => facts.extend(planned),
                Err(error) => warn!("{}: planned milestones unavailable: {error}", config.id),
            }
        }

        info!("{}: chromestatus reported {} release(s)", config.id, facts.len());
        Ok(facts)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const CHANNELS: &str = r#")]}'
{
  "stable": {"version": 122, "stable_date": "2024-02-20T00:00:00"},
  "beta": {"version": 123, "stable_date": "2024-03-19T00:00:00"},
  "canary": {"version": 124, "stable_date": "2024-04-16T00:00:00"}
}"#;

    const PLANNED: &str = r#")]}'
{
  "125": {"version": 125, "stable_date": "2024-05-14T00:00:00"},
  "126": {"version": 126, "stable_date": "2024-06-11T00:00:00"}
}"#;

    async fn chromestatus(planned: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v0/channels"))
            .and(query_param("start", "125"))
            .respond_with(planned)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v0/channels"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CHANNELS))
            .mount(&server)
            .await;
        server
    }

    fn config_for(server: &MockServer) -> BrowserConfig {
        let mut config = BrowserConfig::chrome_desktop();
        config.endpoints = Endpoints::Chromium {
            chromestatus_url: format!("{}/api/v0/channels", server.uri()),
        };
        config
    }

    fn fetcher() -> ChromiumFetcher {
        ChromiumFetcher::new(
            reqwest::Client::new(),
            FetchSettings {
                retry_delays_secs: vec![0],
                ..FetchSettings::default()
            },
        )
    }

    fn channels_of(facts: &[UpstreamFact]) -> Vec<(String, Channel)> {
        facts
            .iter()
            .map(|fact| (fact.version.to_string(), fact.channel))
            .collect()
    }

    #[tokio::test]
    async fn fetch_adds_planned_milestones_after_canary() {
        let server = chromestatus(ResponseTemplate::new(200).set_body_string(PLANNED)).await;
        let facts = fetcher()
            .fetch(&config_for(&server))
            .await
            .expect("chromestatus fetch succeeds");

        let planned: Vec<_> = channels_of(&facts)
            .into_iter()
            .filter(|(_, channel)| *channel == Channel::Planned)
            .map(|(version, _)| version)
            .collect();
        assert_eq!(planned, ["125", "126"]);
    }

    #[tokio::test]
    async fn planned_lookup_failure_keeps_channel_facts() {
        let server = chromestatus(ResponseTemplate::new(404)).await;
        let facts = fetcher()
            .fetch(&config_for(&server))
            .await
            .expect("channel facts survive a failed planned lookup");

        let mut seen = channels_of(&facts);
        seen.sort();
        assert_eq!(
            seen,
            [
                ("122".to_string(), Channel::Stable),
                ("123".to_string(), Channel::Beta),
                ("124".to_string(), Channel::Nightly),
            ]
        );
    }

    #[test]
    fn planned_range_url_appends_query() {
        assert_eq!(
            planned_range_url("https://chromestatus.com/api/v0/channels", 125, 126),
            "https://chromestatus.com/api/v0/channels?start=125&end=126"
        );
        assert_eq!(
            planned_range_url("https://example.test/channels?x=1", 3, 4),
            "https://example.test/channels?x=1&start=3&end=4"
        );
    }

    #[tokio::test]
    async fn fetch_rejects_config_from_another_family() {
        let fetcher = ChromiumFetcher::new(reqwest::Client::new(), FetchSettings::default());
        let result = fetcher.fetch(&BrowserConfig::firefox_desktop()).await;
        assert!(matches!(result, Err(FetchError::UnexpectedShape { .. })));
    }
}
