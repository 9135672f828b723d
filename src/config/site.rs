//! `[site]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[site]` section in quill.toml.
///
/// # Example
/// ```toml
/// [site]
/// url = "https://example.com"
/// html_url_extension = ""   # pretty urls
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteSection {
    /// Absolute site url, without trailing slash. Prefixes every entry `url`.
    #[serde(default = "defaults::site::url")]
    #[educe(Default = defaults::site::url())]
    pub url: String,

    /// Extension that replaces a rendered entry's own extension in its url.
    #[serde(default = "defaults::site::html_url_extension")]
    #[educe(Default = defaults::site::html_url_extension())]
    pub html_url_extension: String,
}

impl SiteSection {
    /// Public url for a path relative to the output root.
    pub fn url_for(&self, rel: &str) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), rel.trim_start_matches('/'))
    }
}
