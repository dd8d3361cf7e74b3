//! Static regexes and CSS selectors shared by the extractors.

use std::sync::LazyLock;

use regex::Regex;
use scraper::Selector;
use url::Url;

/// Compiles a regex at static init; panics on invalid pattern.
pub fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Parses a CSS selector at static init; panics on invalid selector.
pub fn compile_static_selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid static selector '{css}': {e}"))
}

macro_rules! selector {
    ($name:ident, $css:expr) => {
        pub(crate) static $name: LazyLock<Selector> =
            LazyLock::new(|| compile_static_selector($css));
    };
}

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| compile_static_regex($regex));
    };
}

// Language subdomain of a Wikisource host; no subdomain (or `www`) is the multilingual site.
regex!(
    WIKISOURCE_HOST_RE,
    r"(?i)//(?:([a-z]{2,3}(?:-[a-z]+)*)\.)?(?:m\.)?wikisource\.org(?:[/:?#]|$)"
);
regex!(PAGE_TITLE_URL_RE, r"(?i)wikisource\.org/wiki/([^?#]+)");
regex!(PAGE_NUMBER_RE, r"/(\d+)");
regex!(WIKI_PATH_TITLE_RE, r"/wiki/([^?#]+)");
regex!(QUERY_TITLE_RE, r"[?&]title=([^&#]+)");
// One whole class token: the legacy `quality4` or the current `prp-pagequality-4`.
regex!(QUALITY_CLASS_RE, r"^(?:prp-page)?quality-?([0-4])$");
regex!(
    SCAN_IMAGE_RE,
    r"(?i)^(?:https?:)?//upload\.wikimedia\.org/\S+\.(?:djvu|pdf)\.jpg$"
);

selector!(ANCHOR_SELECTOR, "a[href]");
selector!(CLASSED_ANCHOR_SELECTOR, "a[class]");
selector!(PAGELIST_ANCHOR_SELECTOR, ".index-pagelist a[href]");
selector!(ID_SELECTOR, "[id]");
selector!(IMAGE_SELECTOR, "img[src]");

/// Resolves a possibly relative URL string against a base URL.
///
/// Returns the value as-is if it already starts with `http://` or `https://`;
/// normalizes `//...` to `https:...`; otherwise joins with `base_url`.
#[must_use]
pub fn absolutize_url(value: &str, base_url: &Url) -> Option<String> {
    if value.starts_with("http://") || value.starts_with("https://") {
        return Some(value.to_string());
    }
    if value.starts_with("//") {
        return Some(format!("https:{value}"));
    }
    base_url.join(value).ok().map(|url| url.to_string())
}

/// Percent-decodes a URL component and turns underscores into spaces.
#[must_use]
pub fn title_from_url_component(component: &str) -> String {
    let decoded = urlencoding::decode(component)
        .map_or_else(|_| component.to_string(), std::borrow::Cow::into_owned);
    decoded.replace('_', " ")
}
