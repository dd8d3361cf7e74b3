//! Client configuration: endpoints, HTTP timeouts and per-data-kind cache lifetimes.

use std::time::Duration;

use crate::user_agent;

/// Default Wikidata API endpoint (used for `wbgetentities`).
pub const DEFAULT_WIKIDATA_API_URL: &str = "https://www.wikidata.org/w/api.php";

/// Default Wikidata Query Service SPARQL endpoint.
pub const DEFAULT_SPARQL_URL: &str = "https://query.wikidata.org/bigdata/namespace/wdq/sparql";

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;

const HOUR_SECS: u64 = 60 * 60;
const DAY_SECS: u64 = 24 * HOUR_SECS;

/// How long each kind of fetched data stays in the cache.
///
/// `Duration::MAX` means the entry never expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheLifetimes {
    /// Parsed page text, templates and categories.
    pub page_parse: Duration,
    /// The SPARQL-sourced directory of all Wikisources.
    pub directory: Duration,
    /// A page's Wikidata item number.
    pub wikidata_item: Duration,
    /// Index page info (namespace, canonical URL).
    pub index_page_info: Duration,
    /// Raw rendered Index page HTML.
    pub index_page_html: Duration,
    /// A site's namespace table.
    pub namespaces: Duration,
    /// Wikidata entities fetched with `wbgetentities`.
    pub wikidata_entity: Duration,
}

impl Default for CacheLifetimes {
    fn default() -> Self {
        Self {
            page_parse: Duration::from_secs(HOUR_SECS),
            directory: Duration::from_secs(30 * DAY_SECS),
            wikidata_item: Duration::from_secs(DAY_SECS),
            index_page_info: Duration::from_secs(DAY_SECS),
            index_page_html: Duration::from_secs(5 * 60),
            namespaces: Duration::MAX,
            wikidata_entity: Duration::from_secs(HOUR_SECS),
        }
    }
}

/// Configuration for a [`WikisourceApi`](crate::WikisourceApi).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Wikidata API endpoint.
    pub wikidata_api_url: String,
    /// SPARQL endpoint.
    pub sparql_url: String,
    /// When set, every per-site API call goes to `{site_base_url}/w/api.php`
    /// instead of `https://{domain}/w/api.php`.
    pub site_base_url: Option<String>,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout.
    pub read_timeout: Duration,
    /// User-Agent header sent with every request.
    pub user_agent: String,
    /// Cache lifetimes per data kind.
    pub cache_lifetimes: CacheLifetimes,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            wikidata_api_url: DEFAULT_WIKIDATA_API_URL.to_string(),
            sparql_url: DEFAULT_SPARQL_URL.to_string(),
            site_base_url: None,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
            user_agent: user_agent::default_user_agent(),
            cache_lifetimes: CacheLifetimes::default(),
        }
    }
}

impl ClientConfig {
    /// Routes all per-site API calls to one base URL (mirrors, mock servers).
    #[must_use]
    pub fn with_site_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.site_base_url = Some(trim_base(base_url.into()));
        self
    }

    /// Overrides the Wikidata API endpoint.
    #[must_use]
    pub fn with_wikidata_api_url(mut self, url: impl Into<String>) -> Self {
        self.wikidata_api_url = url.into();
        self
    }

    /// Overrides the SPARQL endpoint.
    #[must_use]
    pub fn with_sparql_url(mut self, url: impl Into<String>) -> Self {
        self.sparql_url = url.into();
        self
    }

    /// Sets the connect and read timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }

    /// Replaces the cache lifetime table.
    #[must_use]
    pub fn with_cache_lifetimes(mut self, lifetimes: CacheLifetimes) -> Self {
        self.cache_lifetimes = lifetimes;
        self
    }
}

fn trim_base(mut base_url: String) -> String {
    while base_url.ends_with('/') {
        base_url.pop();
    }
    base_url
}
