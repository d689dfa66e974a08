use std::collections::BTreeMap;

use brel_core::{BrowserConfig, Channel, FetchError};
use chrono::NaiveDate;
use log::debug;
use serde::Deserialize;

const SOURCE: &str = "edgeupdates";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawProduct {
    product: String,
    #[serde(default)]
    releases: Vec<RawRelease>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawRelease {
    product_version: String,
    #[serde(default)]
    published_time: Option<String>,
    #[serde(default)]
    platform: Option<String>,
}

/// The newest major an Edge product currently serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRelease {
    pub channel: Channel,
    pub major: u32,
    /// Earliest listed publication of that major.
    pub first_published: Option<NaiveDate>,
    pub platform: Option<String>,
}

/// Read the edgeupdates products payload.
///
/// Products whose name is not one of the config's channel names (for
/// example `Policy` or `EdgeUpdate`) are skipped.
///
/// # Errors
/// Returns an error when the body is not a product list or a classified
/// product lists a version without a numeric major.
pub fn parse_products(
    url: &str,
    body: &str,
    config: &BrowserConfig,
) -> Result<Vec<ProductRelease>, FetchError> {
    let products: Vec<RawProduct> = brel_core::http::parse_json(url, body)?;

    let mut newest: BTreeMap<Channel, ProductRelease> = BTreeMap::new();
    for product in products {
        let Some(channel) = config.channels.classify(&product.product) else {
            debug!("edgeupdates: skipping product `{}`", product.product);
            continue;
        };

        for release in product.releases {
            let major = major_of(&release.product_version).ok_or_else(|| {
                FetchError::unexpected_shape(
                    SOURCE,
                    format!("{} lists version `{}`", product.product, release.product_version),
                )
            })?;
            let published = release
                .published_time
                .as_deref()
                .and_then(|raw| raw.get(..10))
                .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok());

            let entry = newest.entry(channel).or_insert_with(|| ProductRelease {
                channel,
                major,
                first_published: None,
                platform: None,
            });
            if major > entry.major {
                *entry = ProductRelease {
                    channel,
                    major,
                    first_published: None,
                    platform: None,
                };
            }
            if major == entry.major
                && published.is_some()
                && (entry.first_published.is_none() || published < entry.first_published)
            {
                entry.first_published = published;
                entry.platform = release.platform;
            }
        }
    }

    Ok(newest.into_values().collect())
}

fn major_of(product_version: &str) -> Option<u32> {
    product_version.split('.').next()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCTS: &str = r#"[
      {"Product": "Stable", "Releases": [
        {"ReleaseId": 1, "Platform": "Windows", "Architecture": "x64", "ProductVersion": "120.0.2210.91", "PublishedTime": "2023-12-21T21:05:00"},
        {"ReleaseId": 2, "Platform": "MacOS", "Architecture": "universal", "ProductVersion": "120.0.2210.61", "PublishedTime": "2023-12-07T20:00:00"},
        {"ReleaseId": 3, "Platform": "Windows", "Architecture": "x64", "ProductVersion": "119.0.2151.97", "PublishedTime": "2023-11-30T20:00:00"}
      ]},
      {"Product": "Beta", "Releases": [
        {"ReleaseId": 4, "Platform": "Windows", "ProductVersion": "121.0.2277.4", "PublishedTime": "2023-12-08T00:00:00"}
      ]},
      {"Product": "Dev", "Releases": [
        {"ReleaseId": 5, "Platform": "Linux", "ProductVersion": "122.0.2308.0", "PublishedTime": "2023-12-19T00:00:00"}
      ]},
      {"Product": "Policy", "Releases": [
        {"ReleaseId": 6, "ProductVersion": "not-a-version"}
      ]}
    ]"#;

    #[test]
    fn newest_major_per_product_with_earliest_publication() {
        let config = BrowserConfig::edge_desktop();
        let products = parse_products("https://edgeupdates.test", PRODUCTS, &config)
            .expect("products parse");

        assert_eq!(products.len(), 3);
        let stable = products
            .iter()
            .find(|p| p.channel == Channel::Stable)
            .expect("stable product");
        assert_eq!(stable.major, 120);
        assert_eq!(stable.first_published, NaiveDate::from_ymd_opt(2023, 12, 7));
        assert_eq!(stable.platform.as_deref(), Some("MacOS"));
    }

    #[test]
    fn dev_product_maps_to_nightly() {
        let config = BrowserConfig::edge_desktop();
        let products = parse_products("https://edgeupdates.test", PRODUCTS, &config)
            .expect("products parse");
        let nightly = products
            .iter()
            .find(|p| p.channel == Channel::Nightly)
            .expect("dev product");
        assert_eq!(nightly.major, 122);
    }

    #[test]
    fn bad_version_in_tracked_product_is_unexpected_shape() {
        let config = BrowserConfig::edge_desktop();
        let body = r#"[{"Product": "Stable", "Releases": [{"ProductVersion": "x.y"}]}]"#;
        let result = parse_products("https://edgeupdates.test", body, &config);
        assert!(matches!(result, Err(FetchError::UnexpectedShape { source_name: "edgeupdates", .. })));
    }
}
