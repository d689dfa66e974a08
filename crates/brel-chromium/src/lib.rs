mod channels;
mod client;

pub use channels::{parse_channels, strip_xssi_prefix};
pub use client::ChromiumFetcher;
