use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use crate::api::{self, ApiRequest};
use crate::cache::{self, keys};
use crate::edition::Edition;
use crate::error::WikisourceError;
use crate::extract::MULTILINGUAL_CODE;
use crate::index_page::IndexPage;
use crate::work::Work;

use super::WikisourceApi;

/// Canonical name of the ProofreadPage Index namespace.
pub const NS_NAME_INDEX: &str = "Index";
/// Canonical name of the ProofreadPage Page namespace.
pub const NS_NAME_PAGE: &str = "Page";

const BARE_DOMAIN: &str = "wikisource.org";

/// One language edition of Wikisource.
///
/// Cheap to clone. The namespace table and domain name are resolved at most
/// once per handle (and its clones).
#[derive(Clone)]
pub struct Wikisource {
    inner: Arc<SiteInner>,
}

struct SiteInner {
    api: WikisourceApi,
    language_code: String,
    language_name: Option<String>,
    wikidata_item: Option<String>,
    namespaces: OnceCell<HashMap<String, i64>>,
    domain: OnceCell<String>,
}

impl fmt::Debug for Wikisource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wikisource")
            .field("language_code", &self.inner.language_code)
            .field("language_name", &self.inner.language_name)
            .field("wikidata_item", &self.inner.wikidata_item)
            .finish_non_exhaustive()
    }
}

impl Wikisource {
    pub(crate) fn new(
        api: WikisourceApi,
        language_code: String,
        language_name: Option<String>,
        wikidata_item: Option<String>,
    ) -> Self {
        Self {
            inner: Arc::new(SiteInner {
                api,
                language_code,
                language_name,
                wikidata_item,
                namespaces: OnceCell::new(),
                domain: OnceCell::new(),
            }),
        }
    }

    /// The client this site was resolved through.
    #[must_use]
    pub fn api(&self) -> &WikisourceApi {
        &self.inner.api
    }

    /// Wikimedia language code, e.g. `en`, `bn` or `mul`.
    #[must_use]
    pub fn language_code(&self) -> &str {
        &self.inner.language_code
    }

    /// The language's name for itself, when known from the directory.
    #[must_use]
    pub fn language_name(&self) -> Option<&str> {
        self.inner.language_name.as_deref()
    }

    /// This site's Wikidata item, when known from the directory.
    #[must_use]
    pub fn wikidata_item(&self) -> Option<&str> {
        self.inner.wikidata_item.as_deref()
    }

    /// Host name of this Wikisource.
    ///
    /// Uses the official website recorded on the site's Wikidata item, then
    /// `{code}.wikisource.org`, then `wikisource.org` for `mul`.
    ///
    /// # Errors
    ///
    /// Returns an upstream error if the Wikidata item cannot be fetched.
    pub async fn domain_name(&self) -> Result<String, WikisourceError> {
        self.inner
            .domain
            .get_or_try_init(|| self.resolve_domain_name())
            .await
            .cloned()
    }

    async fn resolve_domain_name(&self) -> Result<String, WikisourceError> {
        if let Some(item) = self.wikidata_item() {
            let entity = self.api().fetch_wikidata_entity(item).await?;
            if let Some(host) = entity.official_website_host() {
                return Ok(host);
            }
            debug!(item, "No official website on Wikidata item");
        }
        Ok(default_domain(self.language_code()))
    }

    /// URL of this site's `api.php`.
    ///
    /// # Errors
    ///
    /// Returns an upstream error if the domain name cannot be resolved.
    pub async fn api_url(&self) -> Result<String, WikisourceError> {
        if let Some(base) = &self.api().config().site_base_url {
            return Ok(format!("{base}/w/api.php"));
        }
        Ok(format!("https://{}/w/api.php", self.domain_name().await?))
    }

    /// Numeric ID of the namespace with the given canonical name.
    ///
    /// `Ok(None)` when the wiki has no such namespace (e.g. no ProofreadPage
    /// extension installed).
    ///
    /// # Errors
    ///
    /// Returns an upstream error if the site info query fails.
    pub async fn namespace_id(&self, canonical_name: &str) -> Result<Option<i64>, WikisourceError> {
        let namespaces = self
            .inner
            .namespaces
            .get_or_try_init(|| self.fetch_namespaces())
            .await?;
        Ok(namespaces.get(canonical_name).copied())
    }

    #[instrument(skip(self), fields(code = %self.language_code()))]
    async fn fetch_namespaces(&self) -> Result<HashMap<String, i64>, WikisourceError> {
        let key = keys::namespaces(self.language_code());
        let api = self.api();
        if let Some(namespaces) = cache::get_json(api.cache(), &key).await {
            debug!("Using cached namespaces");
            return Ok(namespaces);
        }
        let request = ApiRequest::new("query")
            .param("meta", "siteinfo")
            .param("siprop", "namespaces");
        let raw = self.send_api_request(request, "query.namespaces").await?;
        let namespaces = canonical_namespace_ids(&raw);
        cache::set_json(
            api.cache(),
            &key,
            &namespaces,
            api.config().cache_lifetimes.namespaces,
        )
        .await;
        Ok(namespaces)
    }

    /// Sends a MediaWiki API request to this site, following continuations.
    ///
    /// # Errors
    ///
    /// See [`api::send_api_request`].
    pub async fn send_api_request(
        &self,
        request: ApiRequest,
        result_key: &str,
    ) -> Result<Value, WikisourceError> {
        let api_url = self.api_url().await?;
        api::send_api_request(self.api().client(), &api_url, request, result_key).await
    }

    /// Sends a single MediaWiki API request to this site.
    ///
    /// # Errors
    ///
    /// See [`api::send_api_request_once`].
    pub async fn send_api_request_once(
        &self,
        request: &ApiRequest,
        result_key: &str,
    ) -> Result<Value, WikisourceError> {
        let api_url = self.api_url().await?;
        api::send_api_request_once(self.api().client(), &api_url, request, result_key).await
    }

    /// An Edition for `page_title` on this site. Subpage titles are
    /// truncated to their top-level page.
    #[must_use]
    pub fn edition(&self, page_title: &str) -> Edition {
        Edition::new(self.clone(), page_title)
    }

    /// A Work handle for a Wikidata item.
    #[must_use]
    pub fn work(&self, wikidata_id: &str) -> Work {
        self.api().work(wikidata_id)
    }

    /// A new, unloaded Index page on this site.
    #[must_use]
    pub fn index_page(&self) -> IndexPage {
        IndexPage::new(self.clone())
    }

    /// Loads the Index page at `url`.
    ///
    /// # Errors
    ///
    /// See [`IndexPage::load_from_url`].
    pub async fn index_page_from_url(&self, url: &str) -> Result<IndexPage, WikisourceError> {
        let mut index_page = self.index_page();
        index_page.load_from_url(url).await?;
        Ok(index_page)
    }

    /// Loads the Index page titled `title`.
    ///
    /// # Errors
    ///
    /// See [`IndexPage::load_from_title`].
    pub async fn index_page_from_title(&self, title: &str) -> Result<IndexPage, WikisourceError> {
        let mut index_page = self.index_page();
        index_page.load_from_title(title).await?;
        Ok(index_page)
    }
}

fn default_domain(language_code: &str) -> String {
    if language_code.is_empty() || language_code == MULTILINGUAL_CODE {
        BARE_DOMAIN.to_string()
    } else {
        format!("{language_code}.{BARE_DOMAIN}")
    }
}

/// Canonical name to ID, from a `siteinfo` namespaces object (or array).
fn canonical_namespace_ids(raw: &Value) -> HashMap<String, i64> {
    let entries: Box<dyn Iterator<Item = &Value>> = match raw {
        Value::Object(map) => Box::new(map.values()),
        Value::Array(list) => Box::new(list.iter()),
        _ => Box::new(std::iter::empty()),
    };
    entries
        .filter_map(|ns| {
            let canonical = ns.get("canonical")?.as_str()?;
            let id = ns.get("id")?.as_i64()?;
            Some((canonical.to_string(), id))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use crate::{MemoryCache, NoCache};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    #[test]
    fn test_default_domain() {
        assert_eq!(default_domain("bn"), "bn.wikisource.org");
        assert_eq!(default_domain("mul"), "wikisource.org");
        assert_eq!(default_domain(""), "wikisource.org");
    }

    #[test]
    fn test_canonical_namespace_ids() {
        let raw = json!({
            "0": {"id": 0, "case": "first-letter", "name": "", "content": true},
            "104": {"id": 104, "name": "Page", "canonical": "Page"},
            "106": {"id": 106, "name": "Index", "canonical": "Index"},
            "102": {"id": 102, "name": "সূচী", "canonical": "Index talk"}
        });
        let ids = canonical_namespace_ids(&raw);
        assert_eq!(ids.get("Index"), Some(&106));
        assert_eq!(ids.get("Page"), Some(&104));
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn test_domain_without_wikidata_item_needs_no_request() {
        let api = WikisourceApi::new().unwrap();
        let site = api.wikisource_for_code("de");
        assert_eq!(site.domain_name().await.unwrap(), "de.wikisource.org");
        assert_eq!(
            site.api_url().await.unwrap(),
            "https://de.wikisource.org/w/api.php"
        );
    }

    #[tokio::test]
    async fn test_domain_prefers_official_website() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/wikidata"))
            .and(query_param("ids", "Q19035838"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "entities": {"Q19035838": {
                    "id": "Q19035838",
                    "claims": {"P856": [{"mainsnak": {"datavalue": {"value": "https://wikisource.org/"}}}]}
                }}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config =
            ClientConfig::default().with_wikidata_api_url(format!("{}/wikidata", mock_server.uri()));
        let api = WikisourceApi::with_config(config, Arc::new(NoCache)).unwrap();
        let site = Wikisource::new(
            api,
            "mul".to_string(),
            Some("multiple languages".to_string()),
            Some("Q19035838".to_string()),
        );
        assert_eq!(site.domain_name().await.unwrap(), "wikisource.org");
        assert_eq!(site.domain_name().await.unwrap(), "wikisource.org");
    }

    #[tokio::test]
    async fn test_namespace_lookup_is_fetched_once() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("meta", "siteinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "batchcomplete": true,
                "query": {"namespaces": {
                    "104": {"id": 104, "name": "Page", "canonical": "Page"},
                    "106": {"id": 106, "name": "Index", "canonical": "Index"}
                }}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = ClientConfig::default().with_site_base_url(mock_server.uri());
        let api = WikisourceApi::with_config(config, Arc::new(MemoryCache::new())).unwrap();
        let site = api.wikisource_for_code("en");
        assert_eq!(site.namespace_id(NS_NAME_INDEX).await.unwrap(), Some(106));
        assert_eq!(site.namespace_id(NS_NAME_PAGE).await.unwrap(), Some(104));
        assert_eq!(site.namespace_id("Author").await.unwrap(), None);

        // A fresh handle for the same code reads the shared cache.
        let again = api.wikisource_for_code("en");
        assert_eq!(again.namespace_id(NS_NAME_INDEX).await.unwrap(), Some(106));
    }
}
