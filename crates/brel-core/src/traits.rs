use async_trait::async_trait;

use crate::config::BrowserConfig;
use crate::error::FetchError;
use crate::types::UpstreamFact;

/// A source of upstream release facts for one vendor family.
#[async_trait]
pub trait ReleaseFetcher: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetch and normalize everything upstream currently reports for `config`.
    async fn fetch(&self, config: &BrowserConfig) -> Result<Vec<UpstreamFact>, FetchError>;
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::types::Channel;
    use crate::version::ReleaseVersion;

    struct FixedFetcher(Vec<UpstreamFact>);

    #[async_trait]
    impl ReleaseFetcher for FixedFetcher {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn fetch(&self, _config: &BrowserConfig) -> Result<Vec<UpstreamFact>, FetchError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn boxed_fetcher_is_usable_through_dyn() {
        let fetcher: Box<dyn ReleaseFetcher> = Box::new(FixedFetcher(vec![UpstreamFact::new(
            ReleaseVersion::from_major(120),
            Channel::Stable,
        )]));

        let facts = fetcher
            .fetch(&BrowserConfig::chrome_desktop())
            .await
            .expect("fixed fetcher succeeds");

        assert_eq!(fetcher.name(), "fixed");
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].channel, Channel::Stable);
    }
}
