use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::types::Channel;
use crate::version::{ReleaseVersion, VersionScheme};

const CHROMESTATUS_URL: &str = "https://chromestatus.com/api/v0/channels";
const CHROME_DESKTOP_NOTES: &str =
    "https://chromereleases.googleblog.com/{year}/{month}/stable-channel-update-for-desktop.html";
const CHROME_ANDROID_NOTES: &str =
    "https://chromereleases.googleblog.com/{year}/{month}/chrome-for-android-update.html";
const EDGE_UPDATES_URL: &str = "https://edgeupdates.microsoft.com/api/products?view=enterprise";
const EDGE_SCHEDULE_URL: &str = "https://raw.githubusercontent.com/MicrosoftDocs/Edge-Enterprise/public/edgeenterprise/microsoft-edge-release-schedule.md";
const FIREFOX_RELEASES_URL: &str = "https://whattrainisitnow.com/api/firefox/releases/";
const FIREFOX_ESR_URL: &str = "https://whattrainisitnow.com/api/esr/releases/";
const FIREFOX_SCHEDULE_URL: &str = "https://whattrainisitnow.com/api/release/schedule/?version=";

/// Chromium 82 was never shipped.
const CHROMIUM_SKIPPED: &[u32] = &[82];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VendorFamily {
    Chromium,
    Edge,
    Firefox,
}

impl VendorFamily {
    #[must_use]
    pub fn scheme(self) -> VersionScheme {
        match self {
            Self::Chromium | Self::Edge => VersionScheme::Integer,
            Self::Firefox => VersionScheme::Dotted,
        }
    }
}

impl fmt::Display for VendorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chromium => write!(f, "Chromium"),
            Self::Edge => write!(f, "Edge"),
            Self::Firefox => write!(f, "Firefox"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Desktop,
    Mobile,
}

/// Vendor spelling of each upstream bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelNames {
    pub release: &'static str,
    pub beta: &'static str,
    pub nightly: &'static str,
}

impl ChannelNames {
    /// Map a vendor bucket name onto a normalized channel.
    #[must_use]
    pub fn classify(&self, name: &str) -> Option<Channel> {
        if name == self.release {
            Some(Channel::Stable)
        } else if name == self.beta {
            Some(Channel::Beta)
        } else if name == self.nightly {
            Some(Channel::Nightly)
        } else {
            None
        }
    }
}

/// Upstream endpoints. Only fetchers read these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoints {
    Chromium {
        chromestatus_url: String,
    },
    Edge {
        edgeupdates_url: String,
        release_schedule_url: String,
    },
    Firefox {
        releases_url: String,
        esr_url: String,
        schedule_url: String,
    },
}

/// Everything needed to track one (browser, device) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserConfig {
    pub id: &'static str,
    pub title: &'static str,
    pub family: VendorFamily,
    pub device: Device,
    pub bcd_file: PathBuf,
    pub bcd_browser_name: &'static str,
    pub engine: &'static str,
    pub channels: ChannelNames,
    pub first_release: u32,
    pub skipped_releases: BTreeSet<u32>,
    /// URL template. `{version}` is always filled in; `{year}` and
    /// `{month}` come from the release date.
    pub release_notes: Option<&'static str>,
    pub endpoints: Endpoints,
}

impl BrowserConfig {
    #[must_use]
    pub fn scheme(&self) -> VersionScheme {
        self.family.scheme()
    }

    #[must_use]
    pub fn is_skipped(&self, version: &ReleaseVersion) -> bool {
        self.skipped_releases
            .iter()
            .any(|&skipped| version.is_bare_major(skipped))
    }

    #[must_use]
    pub fn is_below_first(&self, version: &ReleaseVersion) -> bool {
        *version < ReleaseVersion::from_major(self.first_release)
    }

    /// True when the version may exist in the tracked history.
    #[must_use]
    pub fn tracks(&self, version: &ReleaseVersion) -> bool {
        !self.is_skipped(version) && !self.is_below_first(version)
    }

    /// Release notes link for `version`, or `None` when the template needs
    /// a date and none is known.
    #[must_use]
    pub fn release_notes_for(
        &self,
        version: &ReleaseVersion,
        release_date: Option<NaiveDate>,
    ) -> Option<String> {
        let url = self.release_notes?.replace("{version}", &version.to_string());
        if !url.contains("{year}") && !url.contains("{month}") {
            return Some(url);
        }
        let date = release_date?;
        Some(
            url.replace("{year}", &format!("{:04}", date.year()))
                .replace("{month}", &format!("{:02}", date.month())),
        )
    }

    pub fn extend_skipped(&mut self, extra: impl IntoIterator<Item = u32>) {
        self.skipped_releases.extend(extra);
    }

    #[must_use]
    pub fn chrome_desktop() -> Self {
        Self::chromium(
            "chrome_desktop",
            "Chrome for Desktop",
            Device::Desktop,
            "chrome",
            1,
            CHROME_DESKTOP_NOTES,
        )
    }

    #[must_use]
    pub fn chrome_android() -> Self {
        Self::chromium(
            "chrome_android",
            "Chrome for Android",
            Device::Mobile,
            "chrome_android",
            25,
            CHROME_ANDROID_NOTES,
        )
    }

    #[must_use]
    pub fn webview_android() -> Self {
        Self::chromium(
            "webview_android",
            "Webview for Android",
            Device::Mobile,
            "webview_android",
            37,
            CHROME_ANDROID_NOTES,
        )
    }

    fn chromium(
        id: &'static str,
        title: &'static str,
        device: Device,
        bcd_browser_name: &'static str,
        first_release: u32,
        release_notes: &'static str,
    ) -> Self {
        Self {
            id,
            title,
            family: VendorFamily::Chromium,
            device,
            bcd_file: PathBuf::from(format!("browsers/{bcd_browser_name}.json")),
            bcd_browser_name,
            engine: "Blink",
            channels: ChannelNames {
                release: "stable",
                beta: "beta",
                nightly: "canary",
            },
            first_release,
            skipped_releases: CHROMIUM_SKIPPED.iter().copied().collect(),
            release_notes: Some(release_notes),
            endpoints: Endpoints::Chromium {
                chromestatus_url: CHROMESTATUS_URL.to_string(),
            },
        }
    }

    #[must_use]
    pub fn edge_desktop() -> Self {
        // Legacy EdgeHTML ended at 18; Chromium-based Edge started at 79.
        let mut skipped: BTreeSet<u32> = (19..=78).collect();
        skipped.insert(12);
        skipped.insert(82);

        Self {
            id: "edge_desktop",
            title: "Edge for Desktop",
            family: VendorFamily::Edge,
            device: Device::Desktop,
            bcd_file: PathBuf::from("browsers/edge.json"),
            bcd_browser_name: "edge",
            engine: "Blink",
            channels: ChannelNames {
                release: "Stable",
                beta: "Beta",
                nightly: "Dev",
            },
            first_release: 12,
            skipped_releases: skipped,
            release_notes: Some(
                "https://learn.microsoft.com/deployedge/microsoft-edge-relnote-archive-stable-channel#version-{version}",
            ),
            endpoints: Endpoints::Edge {
                edgeupdates_url: EDGE_UPDATES_URL.to_string(),
                release_schedule_url: EDGE_SCHEDULE_URL.to_string(),
            },
        }
    }

    #[must_use]
    pub fn firefox_desktop() -> Self {
        Self::firefox(
            "firefox_desktop",
            "Firefox for Desktop",
            Device::Desktop,
            "firefox",
            1,
            BTreeSet::new(),
            "https://developer.mozilla.org/docs/Mozilla/Firefox/Releases/{version}",
        )
    }

    #[must_use]
    pub fn firefox_android() -> Self {
        let skipped = [11, 12, 13].into_iter().chain(69..=78).collect();
        Self::firefox(
            "firefox_android",
            "Firefox for Android",
            Device::Mobile,
            "firefox_android",
            4,
            skipped,
            "https://www.mozilla.org/firefox/android/{version}/releasenotes/",
        )
    }

    fn firefox(
        id: &'static str,
        title: &'static str,
        device: Device,
        bcd_browser_name: &'static str,
        first_release: u32,
        skipped_releases: BTreeSet<u32>,
        release_notes: &'static str,
    ) -> Self {
        Self {
            id,
            title,
            family: VendorFamily::Firefox,
            device,
            bcd_file: PathBuf::from(format!("browsers/{bcd_browser_name}.json")),
            bcd_browser_name,
            engine: "Gecko",
            channels: ChannelNames {
                release: "release",
                beta: "beta",
                nightly: "nightly",
            },
            first_release,
            skipped_releases,
            release_notes: Some(release_notes),
            endpoints: Endpoints::Firefox {
                releases_url: FIREFOX_RELEASES_URL.to_string(),
                esr_url: FIREFOX_ESR_URL.to_string(),
                schedule_url: FIREFOX_SCHEDULE_URL.to_string(),
            },
        }
    }

    /// Every tracked pair, in reporting order.
    #[must_use]
    pub fn presets() -> Vec<Self> {
        vec![
            Self::chrome_desktop(),
            Self::chrome_android(),
            Self::webview_android(),
            Self::edge_desktop(),
            Self::firefox_desktop(),
            Self::firefox_android(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> ReleaseVersion {
        s.parse().expect("valid release version in test")
    }

    #[test]
    fn chromium_presets_skip_82() {
        for config in [
            BrowserConfig::chrome_desktop(),
            BrowserConfig::chrome_android(),
            BrowserConfig::webview_android(),
        ] {
            assert!(config.is_skipped(&v("82")), "{} should skip 82", config.id);
            assert!(!config.is_skipped(&v("83")));
        }
    }

    #[test]
    fn edge_skips_legacy_gap_but_keeps_edgehtml_releases() {
        let config = BrowserConfig::edge_desktop();
        assert!(config.is_skipped(&v("12")));
        assert!(config.is_skipped(&v("50")));
        assert!(config.is_skipped(&v("78")));
        assert!(!config.is_skipped(&v("18")));
        assert!(!config.is_skipped(&v("79")));
    }

    #[test]
    fn first_release_bounds_dotted_versions() {
        let config = BrowserConfig::firefox_android();
        assert!(config.is_below_first(&v("3.6")));
        assert!(!config.is_below_first(&v("4")));
        assert!(!config.tracks(&v("12")));
        assert!(config.tracks(&v("68")));
    }

    #[test]
    fn channel_names_classify_vendor_buckets() {
        let edge = BrowserConfig::edge_desktop();
        assert_eq!(edge.channels.classify("Stable"), Some(Channel::Stable));
        assert_eq!(edge.channels.classify("Dev"), Some(Channel::Nightly));
        assert_eq!(edge.channels.classify("Canary"), None);
        assert_eq!(edge.channels.classify("stable"), None);
    }

    #[test]
    fn release_notes_template_substitutes_version() {
        let config = BrowserConfig::firefox_desktop();
        assert_eq!(
            config.release_notes_for(&v("128"), None).as_deref(),
            Some("https://developer.mozilla.org/docs/Mozilla/Firefox/Releases/128")
        );
    }

    #[test]
    fn chrome_desktop_and_android_link_different_release_posts() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 21);
        let desktop = BrowserConfig::chrome_desktop().release_notes_for(&v("125"), day);
        let android = BrowserConfig::chrome_android().release_notes_for(&v("125"), day);
        let webview = BrowserConfig::webview_android().release_notes_for(&v("125"), day);

        assert_eq!(
            desktop.as_deref(),
            Some("https://chromereleases.googleblog.com/2024/05/stable-channel-update-for-desktop.html")
        );
        assert_eq!(
            android.as_deref(),
            Some("https://chromereleases.googleblog.com/2024/05/chrome-for-android-update.html")
        );
        assert_ne!(desktop, android);
        assert_eq!(android, webview);
    }

    #[test]
    fn dated_template_without_date_gives_no_link() {
        let config = BrowserConfig::chrome_desktop();
        assert_eq!(config.release_notes_for(&v("125"), None), None);
    }

    #[test]
    fn presets_have_unique_ids_and_files() {
        let presets = BrowserConfig::presets();
        let ids: BTreeSet<_> = presets.iter().map(|c| c.id).collect();
        let files: BTreeSet<_> = presets.iter().map(|c| c.bcd_file.clone()).collect();
        assert_eq!(ids.len(), presets.len());
        assert_eq!(files.len(), presets.len());
    }
}
