//! Pure extraction functions over rendered wiki HTML and Wikisource URLs.
//!
//! Nothing here touches the network. Every function takes a string and returns
//! owned data, so parsed documents never live across an `.await`.
//!
//! - [`extract_microformat`] - `ws-*` microformat values by element ID
//! - [`extract_subpage_links`] - same-subtree, non-redirect wiki links in document order
//! - [`extract_page_list_entries`] - entries of an Index page's `index-pagelist` widget
//! - [`extract_quality`] - lowest nonzero page quality on an Index page
//! - [`extract_scan_image`] - the scan thumbnail of an Index page

mod patterns;

pub(crate) use patterns::compile_static_regex;
pub use patterns::{absolutize_url, title_from_url_component};

use std::collections::HashMap;

use scraper::Html;
use url::Url;

use crate::index_page::PageListEntry;

use patterns::{
    ANCHOR_SELECTOR, CLASSED_ANCHOR_SELECTOR, ID_SELECTOR, IMAGE_SELECTOR, PAGE_NUMBER_RE,
    PAGE_TITLE_URL_RE, PAGELIST_ANCHOR_SELECTOR, QUALITY_CLASS_RE, QUERY_TITLE_RE,
    SCAN_IMAGE_RE, WIKI_PATH_TITLE_RE, WIKISOURCE_HOST_RE,
};

/// Language code of the multilingual Wikisource at `wikisource.org`.
pub const MULTILINGUAL_CODE: &str = "mul";

const REDIRECT_CLASS: &str = "mw-redirect";
const WIKI_PATH_PREFIX: &str = "/wiki/";

/// Returns the Wikisource language code of `url`, or `None` if it is not a
/// Wikisource URL. The bare `wikisource.org` (and `www.`) host is `mul`.
#[must_use]
pub fn language_code_from_url(url: &str) -> Option<String> {
    let captures = WIKISOURCE_HOST_RE.captures(url)?;
    let code = captures
        .get(1)
        .map(|m| m.as_str().to_ascii_lowercase())
        .filter(|code| code != "www")
        .unwrap_or_else(|| MULTILINGUAL_CODE.to_string());
    Some(code)
}

/// Returns the decoded page title of a `.../wiki/<title>` Wikisource URL.
#[must_use]
pub fn page_title_from_url(url: &str) -> Option<String> {
    PAGE_TITLE_URL_RE
        .captures(url)
        .map(|caps| title_from_url_component(&caps[1]))
        .filter(|title| !title.is_empty())
}

/// Returns the trimmed text of the first element carrying each of `ids`.
///
/// Every requested ID is present in the result; a missing element yields an
/// empty string.
#[must_use]
pub fn extract_microformat(html: &str, ids: &[&str]) -> HashMap<String, String> {
    let document = Html::parse_fragment(html);
    let mut found: HashMap<String, String> = HashMap::with_capacity(ids.len());
    for element in document.select(&ID_SELECTOR) {
        let Some(id) = element.value().id() else {
            continue;
        };
        if ids.contains(&id) && !found.contains_key(id) {
            let text: String = element.text().collect();
            found.insert(id.to_string(), text.trim().to_string());
        }
    }
    ids.iter()
        .map(|id| {
            let value = found.remove(*id).unwrap_or_default();
            ((*id).to_string(), value)
        })
        .collect()
}

/// Returns the titles of pages under `title` linked from `html`, in document order.
///
/// Links marked `mw-redirect` are skipped, as is anything outside
/// `/wiki/<title>` and its `/` subpages. Fragments are dropped and underscores
/// become spaces. Repeats are kept; callers track what they have visited.
#[must_use]
pub fn extract_subpage_links(html: &str, title: &str) -> Vec<String> {
    let base = format!("{WIKI_PATH_PREFIX}{}", title.replace(' ', "_"));
    let document = Html::parse_fragment(html);
    let mut links = Vec::new();
    for anchor in document.select(&ANCHOR_SELECTOR) {
        if anchor.value().classes().any(|class| class == REDIRECT_CLASS) {
            continue;
        }
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let href = urlencoding::decode(href)
            .map_or_else(|_| href.to_string(), std::borrow::Cow::into_owned);
        let Some(rest) = href.strip_prefix(&base) else {
            continue;
        };
        if !(rest.is_empty() || rest.starts_with('/') || rest.starts_with('#')) {
            continue;
        }
        let path = href.strip_prefix(WIKI_PATH_PREFIX).unwrap_or(&href);
        let path = path.split('#').next().unwrap_or(path);
        links.push(path.replace('_', " "));
    }
    links
}

/// Extracts the entries of an Index page's `index-pagelist` widget.
///
/// Relative hrefs are resolved against `base_url`. Fields that cannot be
/// found are `None`.
#[must_use]
pub fn extract_page_list_entries(html: &str, base_url: &Url) -> Vec<PageListEntry> {
    let document = Html::parse_document(html);
    document
        .select(&PAGELIST_ANCHOR_SELECTOR)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            let label: String = anchor.text().collect();
            Some(PageListEntry {
                number: PAGE_NUMBER_RE
                    .captures(href)
                    .and_then(|caps| caps[1].parse().ok()),
                label: label.trim().to_string(),
                quality: anchor.value().classes().find_map(quality_from_class),
                title: page_title_from_href(href),
                url: absolutize_url(href, base_url).unwrap_or_else(|| href.to_string()),
            })
        })
        .collect()
}

/// Returns the lowest quality in 1..=4 carried by any anchor in `html`.
///
/// Quality 0 ("without text") never counts. `None` when no anchor carries a
/// quality class from 1 to 4.
#[must_use]
pub fn extract_quality(html: &str) -> Option<u8> {
    let document = Html::parse_document(html);
    document
        .select(&CLASSED_ANCHOR_SELECTOR)
        .flat_map(|anchor| anchor.value().classes().filter_map(quality_from_class))
        .filter(|quality| (1..=4).contains(quality))
        .min()
}

/// Returns the first Wikimedia-hosted `.djvu.jpg` / `.pdf.jpg` image source.
#[must_use]
pub fn extract_scan_image(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&IMAGE_SELECTOR)
        .filter_map(|img| img.value().attr("src"))
        .find(|src| SCAN_IMAGE_RE.is_match(src))
        .map(|src| {
            if src.starts_with("//") {
                format!("https:{src}")
            } else {
                src.to_string()
            }
        })
}

/// Quality digit of a single class token, e.g. `prp-pagequality-3`.
fn quality_from_class(class: &str) -> Option<u8> {
    QUALITY_CLASS_RE
        .captures(class)
        .and_then(|caps| caps[1].parse().ok())
}

fn page_title_from_href(href: &str) -> Option<String> {
    WIKI_PATH_TITLE_RE
        .captures(href)
        .or_else(|| QUERY_TITLE_RE.captures(href))
        .map(|caps| title_from_url_component(&caps[1]))
}
