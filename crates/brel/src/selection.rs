use std::collections::BTreeMap;

use brel_core::{BrowserConfig, Device, VendorFamily};

/// Browser a preset belongs to, as chosen on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Browser {
    Chrome,
    WebView,
    Edge,
    Firefox,
}

impl Browser {
    #[must_use]
    pub fn of(config: &BrowserConfig) -> Self {
        match config.family {
            VendorFamily::Edge => Self::Edge,
            VendorFamily::Firefox => Self::Firefox,
            VendorFamily::Chromium if config.bcd_browser_name == "webview_android" => Self::WebView,
            VendorFamily::Chromium => Self::Chrome,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct BrowserFilter {
    pub chrome: bool,
    pub webview: bool,
    pub edge: bool,
    pub firefox: bool,
    pub all: bool,
}

impl BrowserFilter {
    /// No browser flag at all selects every browser.
    fn accepts(self, browser: Browser) -> bool {
        if self.all || !(self.chrome || self.webview || self.edge || self.firefox) {
            return true;
        }
        match browser {
            Browser::Chrome => self.chrome,
            Browser::WebView => self.webview,
            Browser::Edge => self.edge,
            Browser::Firefox => self.firefox,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    pub desktop: bool,
    pub mobile: bool,
    pub all: bool,
}

impl DeviceFilter {
    fn accepts(self, device: Device) -> bool {
        if self.all || !(self.desktop || self.mobile) {
            return true;
        }
        match device {
            Device::Desktop => self.desktop,
            Device::Mobile => self.mobile,
        }
    }
}

/// The browser/device pairs chosen for one run, in reporting order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    configs: Vec<BrowserConfig>,
}

impl Selection {
    #[must_use]
    pub fn from_filters(browsers: BrowserFilter, devices: DeviceFilter) -> Self {
        Self::from_presets(BrowserConfig::presets(), browsers, devices)
    }

    #[must_use]
    pub fn from_presets(
        presets: Vec<BrowserConfig>,
        browsers: BrowserFilter,
        devices: DeviceFilter,
    ) -> Self {
        let configs = presets
            .into_iter()
            .filter(|config| browsers.accepts(Browser::of(config)) && devices.accepts(config.device))
            .collect();
        Self { configs }
    }

    /// Add skip entries from the settings file, keyed by preset id.
    #[must_use]
    pub fn with_extra_skips(mut self, extra: &BTreeMap<String, Vec<u32>>) -> Self {
        for config in &mut self.configs {
            if let Some(majors) = extra.get(config.id) {
                config.extend_skipped(majors.iter().copied());
            }
        }
        self
    }

    #[must_use]
    pub fn configs(&self) -> &[BrowserConfig] {
        &self.configs
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

impl IntoIterator for Selection {
    type Item = BrowserConfig;
    type IntoIter = std::vec::IntoIter<BrowserConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.configs.into_iter()
    }
}
