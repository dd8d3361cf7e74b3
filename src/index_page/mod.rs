//! Index pages: the scan-backed proofreading unit of a digitized work.
//!
//! An [`IndexPage`] starts unloaded. One of the loaders resolves it to a page
//! in the wiki's Index namespace; every other accessor fails with
//! [`WikisourceError::NotLoaded`] until then. A loaded page cannot be
//! reloaded.

mod page_list;

pub use page_list::{PageList, PageListEntry, PageListField};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};
use url::Url;

use crate::api::{ApiRequest, fetch_text};
use crate::cache::{self, keys};
use crate::error::WikisourceError;
use crate::extract::{
    absolutize_url, extract_page_list_entries, extract_quality, extract_scan_image,
    page_title_from_url,
};
use crate::wikisource::{NS_NAME_INDEX, NS_NAME_PAGE, Wikisource};

/// Upper bound on pages returned by the API-backed page list.
pub const MAX_EXISTING_PAGES: usize = 500;

const WHAT: &str = "Index page";

/// An Index page on one Wikisource.
#[derive(Debug, Clone)]
pub struct IndexPage {
    wikisource: Wikisource,
    page_info: Option<PageInfo>,
}

/// `prop=info&inprop=url` output for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PageInfo {
    #[serde(default)]
    pageid: Option<u64>,
    ns: i64,
    title: String,
    #[serde(default)]
    canonicalurl: Option<String>,
    #[serde(default)]
    missing: bool,
}

impl IndexPage {
    pub(crate) fn new(wikisource: Wikisource) -> Self {
        Self {
            wikisource,
            page_info: None,
        }
    }

    /// The Wikisource hosting this Index page.
    #[must_use]
    pub fn wikisource(&self) -> &Wikisource {
        &self.wikisource
    }

    /// True once a loader has succeeded.
    #[must_use]
    pub fn loaded(&self) -> bool {
        self.page_info.is_some()
    }

    /// Loads the Index page at a `https://xx.wikisource.org/wiki/Index:...` URL.
    ///
    /// # Errors
    ///
    /// - [`WikisourceError::AlreadyLoaded`] if this page is already loaded
    /// - [`WikisourceError::UnrecognizedUrl`] if no title can be found in `url`
    /// - [`WikisourceError::IndexPageNotFound`] if the page does not exist
    /// - [`WikisourceError::NotAnIndexPage`] if it is outside the Index namespace
    #[instrument(skip(self))]
    pub async fn load_from_url(&mut self, url: &str) -> Result<(), WikisourceError> {
        if self.loaded() {
            return Err(WikisourceError::AlreadyLoaded {
                what: WHAT.to_string(),
            });
        }
        let title = page_title_from_url(url).ok_or_else(|| WikisourceError::UnrecognizedUrl {
            url: url.to_string(),
        })?;

        let api = self.wikisource.api();
        let key = keys::index_page_info(url);
        if let Some(info) = cache::get_json::<PageInfo>(api.cache(), &key).await {
            debug!(title = %info.title, "Using cached Index page info");
            self.page_info = Some(info);
            return Ok(());
        }

        let request = ApiRequest::new("query")
            .param("titles", title.as_str())
            .param("prop", "info")
            .param("inprop", "url");
        let pages = self
            .wikisource
            .send_api_request(request, "query.pages")
            .await?;
        let mut info = first_page_info(&pages)
            .filter(|info| !info.missing)
            .ok_or_else(|| WikisourceError::IndexPageNotFound {
                url: url.to_string(),
            })?;

        let index_ns = self.wikisource.namespace_id(NS_NAME_INDEX).await?;
        if index_ns != Some(info.ns) {
            return Err(WikisourceError::NotAnIndexPage {
                url: url.to_string(),
            });
        }
        info.canonicalurl.get_or_insert_with(|| url.to_string());

        cache::set_json(
            api.cache(),
            &key,
            &info,
            api.config().cache_lifetimes.index_page_info,
        )
        .await;
        self.page_info = Some(info);
        Ok(())
    }

    /// Loads the Index page with the given full title (e.g. `Index:Foo.djvu`).
    ///
    /// # Errors
    ///
    /// Same as [`load_from_url`](Self::load_from_url).
    pub async fn load_from_title(&mut self, title: &str) -> Result<(), WikisourceError> {
        let domain = self.wikisource.domain_name().await?;
        let url = format!("https://{domain}/wiki/{}", encode_title(title));
        self.load_from_url(&url).await
    }

    fn info(&self) -> Result<&PageInfo, WikisourceError> {
        self.page_info
            .as_ref()
            .ok_or_else(|| WikisourceError::not_loaded(WHAT))
    }

    /// Canonical URL of the page.
    ///
    /// # Errors
    ///
    /// Returns [`WikisourceError::NotLoaded`] before a load.
    pub fn url(&self) -> Result<&str, WikisourceError> {
        let info = self.info()?;
        Ok(info.canonicalurl.as_deref().unwrap_or_default())
    }

    /// Full page title, including the namespace prefix.
    ///
    /// # Errors
    ///
    /// Returns [`WikisourceError::NotLoaded`] before a load.
    pub fn title(&self) -> Result<&str, WikisourceError> {
        Ok(&self.info()?.title)
    }

    /// Rendered HTML of the page, through a short-lived cache.
    ///
    /// # Errors
    ///
    /// Returns [`WikisourceError::NotLoaded`] before a load, or an upstream
    /// error if the fetch fails.
    pub async fn html(&self) -> Result<String, WikisourceError> {
        let url = self.url()?;
        let api = self.wikisource.api();
        let key = keys::index_page_html(url);
        if let Some(html) = cache::get_json::<String>(api.cache(), &key).await {
            info!(title = %self.title()?, "Using cached HTML for index page");
            return Ok(html);
        }
        let html = fetch_text(api.client(), url, None).await?;
        cache::set_json(
            api.cache(),
            &key,
            &html,
            api.config().cache_lifetimes.index_page_html,
        )
        .await;
        Ok(html)
    }

    /// The scan's pages.
    ///
    /// By default the list is scraped from the page's `index-pagelist` and
    /// includes pages that do not exist yet. With `only_existing`, one API
    /// query lists existing pages only (at most [`MAX_EXISTING_PAGES`]),
    /// sorted by page number; the API has no page labels, so each label is
    /// the page number.
    ///
    /// # Errors
    ///
    /// Returns [`WikisourceError::NotLoaded`] before a load, or an upstream
    /// error if a fetch fails.
    #[instrument(skip(self))]
    pub async fn page_list(&self, only_existing: bool) -> Result<PageList, WikisourceError> {
        let base_url = self.base_url()?;
        if only_existing {
            return self.existing_pages(&base_url).await;
        }
        let html = self.html().await?;
        Ok(extract_page_list_entries(&html, &base_url)
            .into_iter()
            .collect())
    }

    async fn existing_pages(&self, base_url: &Url) -> Result<PageList, WikisourceError> {
        let Some(page_ns) = self.wikisource.namespace_id(NS_NAME_PAGE).await? else {
            debug!("No Page namespace on this wiki");
            return Ok(PageList::default());
        };
        let title = self.title()?;
        let unprefixed = title.split_once(':').map_or(title, |(_, rest)| rest);
        let request = ApiRequest::new("query")
            .param("generator", "prefixsearch")
            .param("gpssearch", format!("{unprefixed}/"))
            .param("gpsnamespace", page_ns.to_string())
            .param("gpslimit", MAX_EXISTING_PAGES.to_string())
            .param("prop", "proofread|info")
            .param("inprop", "url")
            .param("redirects", "1");
        let pages = self
            .wikisource
            .send_api_request_once(&request, "query.pages")
            .await?;

        let mut entries: Vec<PageListEntry> = pages
            .as_array()
            .into_iter()
            .flatten()
            .filter(|page| page.get("missing").is_none())
            .filter_map(|page| existing_page_entry(page, base_url))
            .collect();
        entries.sort_by_key(|entry| (entry.number.is_none(), entry.number));
        entries.truncate(MAX_EXISTING_PAGES);
        Ok(entries.into_iter().collect())
    }

    /// Lowest nonzero page quality shown on the page; `None` if undetermined.
    ///
    /// # Errors
    ///
    /// Returns [`WikisourceError::NotLoaded`] before a load, or an upstream
    /// error if the HTML fetch fails.
    pub async fn quality(&self) -> Result<Option<u8>, WikisourceError> {
        Ok(extract_quality(&self.html().await?))
    }

    /// URL of the scan thumbnail shown on the page.
    ///
    /// # Errors
    ///
    /// Returns [`WikisourceError::NotLoaded`] before a load, or an upstream
    /// error if the HTML fetch fails.
    pub async fn image(&self) -> Result<Option<String>, WikisourceError> {
        Ok(extract_scan_image(&self.html().await?))
    }

    /// The first page-list entry whose `field` equals `value`.
    ///
    /// # Errors
    ///
    /// Same as [`page_list`](Self::page_list).
    pub async fn child_page_info(
        &self,
        value: &str,
        field: PageListField,
    ) -> Result<Option<PageListEntry>, WikisourceError> {
        Ok(self.page_list(false).await?.find(field, value).cloned())
    }

    fn base_url(&self) -> Result<Url, WikisourceError> {
        let url = self.url()?;
        Url::parse(url).map_err(|error| {
            WikisourceError::invalid_response("Index page info", &format!("bad URL '{url}': {error}"))
        })
    }
}

fn first_page_info(pages: &Value) -> Option<PageInfo> {
    let page = pages.as_array()?.first()?;
    serde_json::from_value(page.clone()).ok()
}

fn existing_page_entry(page: &Value, base_url: &Url) -> Option<PageListEntry> {
    let title = page.get("title")?.as_str()?;
    let number: Option<u32> = title.rsplit('/').next().and_then(|n| n.parse().ok());
    let quality = page
        .pointer("/proofread/quality")
        .and_then(Value::as_u64)
        .and_then(|q| u8::try_from(q).ok());
    let url = page
        .get("canonicalurl")
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .or_else(|| absolutize_url(&format!("/wiki/{}", encode_title(title)), base_url))?;
    Some(PageListEntry {
        number,
        label: number.map(|n| n.to_string()).unwrap_or_default(),
        quality,
        title: Some(title.to_string()),
        url,
    })
}

/// Encodes a page title for a `/wiki/` path, keeping `:` and `/` readable.
fn encode_title(title: &str) -> String {
    urlencoding::encode(&title.replace(' ', "_"))
        .replace("%3A", ":")
        .replace("%2F", "/")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::WikisourceApi;
    use serde_json::json;

    fn unloaded() -> IndexPage {
        WikisourceApi::new()
            .unwrap()
            .wikisource_for_code("en")
            .index_page()
    }

    #[test]
    fn test_accessors_fail_before_load() {
        let page = unloaded();
        assert!(!page.loaded());
        assert!(matches!(page.url(), Err(WikisourceError::NotLoaded { .. })));
        assert!(matches!(page.title(), Err(WikisourceError::NotLoaded { .. })));
    }

    #[tokio::test]
    async fn test_async_accessors_fail_before_load() {
        let page = unloaded();
        let err = page.page_list(false).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotLoaded);
        assert!(matches!(page.quality().await, Err(WikisourceError::NotLoaded { .. })));
    }

    #[tokio::test]
    async fn test_load_rejects_non_wikisource_url_without_request() {
        let mut page = unloaded();
        let err = page
            .load_from_url("https://example.com/some/page")
            .await
            .unwrap_err();
        assert!(matches!(err, WikisourceError::UnrecognizedUrl { .. }));
        assert!(!page.loaded());
    }

    #[test]
    fn test_encode_title() {
        assert_eq!(
            encode_title("Index:The Emancipated, vol. I, 1890.djvu"),
            "Index:The_Emancipated%2C_vol._I%2C_1890.djvu"
        );
        assert_eq!(encode_title("Index:A/B"), "Index:A/B");
    }

    #[test]
    fn test_existing_page_entry() {
        let base = Url::parse("https://en.wikisource.org/wiki/Index:Foo.djvu").unwrap();
        let page = json!({
            "pageid": 7,
            "ns": 104,
            "title": "Page:Foo.djvu/12",
            "proofread": {"quality": 3, "quality_text": "Proofread"}
        });
        let entry = existing_page_entry(&page, &base).unwrap();
        assert_eq!(entry.number, Some(12));
        assert_eq!(entry.label, "12");
        assert_eq!(entry.quality, Some(3));
        assert_eq!(entry.url, "https://en.wikisource.org/wiki/Page:Foo.djvu/12");
    }

    #[test]
    fn test_first_page_info_missing_flag() {
        let pages = json!([{"ns": 106, "title": "Index:Nope.djvu", "missing": true}]);
        assert!(first_page_info(&pages).unwrap().missing);
        assert!(first_page_info(&json!([])).is_none());
    }
}
