//! Entry point: the shared client and the directory of Wikisources.
//!
//! # Example
//!
//! ```no_run
//! use wikisource_api::WikisourceApi;
//!
//! # async fn example() -> Result<(), wikisource_api::WikisourceError> {
//! let api = WikisourceApi::new()?;
//! let bengali = api.fetch_wikisource("bn").await?;
//! println!("{}", bengali.domain_name().await?);
//! # Ok(())
//! # }
//! ```

mod directory;
mod site;

pub use directory::DIRECTORY_QUERY;
pub use site::{NS_NAME_INDEX, NS_NAME_PAGE, Wikisource};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument};

use crate::api::{WikidataEntity, WikidataQuery, build_http_client, fetch_entity};
use crate::cache::{self, Cache, NoCache, keys};
use crate::config::ClientConfig;
use crate::error::WikisourceError;
use crate::extract::language_code_from_url;
use crate::work::Work;

/// Shared client for all Wikisource and Wikidata lookups.
///
/// Cloning is cheap; clones share the HTTP client, configuration and cache.
#[derive(Clone)]
pub struct WikisourceApi {
    inner: Arc<ApiInner>,
}

struct ApiInner {
    client: Client,
    config: ClientConfig,
    cache: Arc<dyn Cache>,
}

impl fmt::Debug for WikisourceApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WikisourceApi")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl WikisourceApi {
    /// Creates a client with default configuration and no cache.
    ///
    /// # Errors
    ///
    /// Returns [`WikisourceError::Http`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, WikisourceError> {
        Self::with_config(ClientConfig::default(), Arc::new(NoCache))
    }

    /// Creates a client with default configuration and the given cache.
    ///
    /// # Errors
    ///
    /// Returns [`WikisourceError::Http`] if the HTTP client cannot be built.
    pub fn with_cache(cache: Arc<dyn Cache>) -> Result<Self, WikisourceError> {
        Self::with_config(ClientConfig::default(), cache)
    }

    /// Creates a client from explicit configuration and cache.
    ///
    /// # Errors
    ///
    /// Returns [`WikisourceError::Http`] if the HTTP client cannot be built.
    pub fn with_config(
        config: ClientConfig,
        cache: Arc<dyn Cache>,
    ) -> Result<Self, WikisourceError> {
        let client = build_http_client(&config)?;
        Ok(Self {
            inner: Arc::new(ApiInner {
                client,
                config,
                cache,
            }),
        })
    }

    /// The configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub(crate) fn client(&self) -> &Client {
        &self.inner.client
    }

    pub(crate) fn cache(&self) -> &dyn Cache {
        self.inner.cache.as_ref()
    }

    /// Fetches every Wikisource listed on Wikidata.
    ///
    /// # Errors
    ///
    /// Returns an upstream error if the SPARQL query fails.
    pub async fn fetch_wikisources(&self) -> Result<Vec<Wikisource>, WikisourceError> {
        self.fetch_wikisources_with_ttl(None).await
    }

    /// Like [`fetch_wikisources`](Self::fetch_wikisources), caching a fresh
    /// result for `ttl` instead of the configured directory lifetime.
    ///
    /// # Errors
    ///
    /// Returns an upstream error if the SPARQL query fails.
    #[instrument(skip(self))]
    pub async fn fetch_wikisources_with_ttl(
        &self,
        ttl: Option<Duration>,
    ) -> Result<Vec<Wikisource>, WikisourceError> {
        let rows = match cache::get_json::<Vec<HashMap<String, String>>>(
            self.cache(),
            keys::WIKISOURCES,
        )
        .await
        {
            Some(rows) => {
                debug!(rows = rows.len(), "Using cached directory of Wikisources");
                rows
            }
            None => {
                let rows = self
                    .run_sparql(&WikidataQuery::new(DIRECTORY_QUERY))
                    .await?;
                if !rows.is_empty() {
                    let ttl = ttl.unwrap_or(self.config().cache_lifetimes.directory);
                    cache::set_json(self.cache(), keys::WIKISOURCES, &rows, ttl).await;
                }
                rows
            }
        };
        Ok(directory::sites_from_rows(self, &rows))
    }

    /// Finds the Wikisource for `code` in the directory.
    ///
    /// # Errors
    ///
    /// Returns [`WikisourceError::LanguageNotFound`] naming `code` when no
    /// Wikisource has that code, or an upstream error if the directory fetch fails.
    #[instrument(skip(self))]
    pub async fn fetch_wikisource(&self, code: &str) -> Result<Wikisource, WikisourceError> {
        self.fetch_wikisources()
            .await?
            .into_iter()
            .find(|site| site.language_code() == code)
            .ok_or_else(|| WikisourceError::language_not_found(code))
    }

    /// Builds a Wikisource handle from any URL on that Wikisource.
    ///
    /// Returns `None` for URLs that are not on a `wikisource.org` host. No
    /// request is made.
    #[must_use]
    pub fn new_wikisource_from_url(&self, url: &str) -> Option<Wikisource> {
        let Some(code) = language_code_from_url(url) else {
            debug!(url, "Unable to find Wikisource URL");
            return None;
        };
        Some(self.wikisource_for_code(&code))
    }

    /// Builds a Wikisource handle for `code` without consulting the directory.
    ///
    /// The handle has no language name or Wikidata item, so its domain is
    /// derived from the code alone.
    #[must_use]
    pub fn wikisource_for_code(&self, code: &str) -> Wikisource {
        Wikisource::new(self.clone(), code.to_string(), None, None)
    }

    /// Fetches a Wikidata entity, through the cache.
    ///
    /// # Errors
    ///
    /// Returns [`WikisourceError::EntityNotFound`] for unknown IDs, or an
    /// upstream error if the request fails.
    #[instrument(skip(self))]
    pub async fn fetch_wikidata_entity(&self, id: &str) -> Result<WikidataEntity, WikisourceError> {
        let key = keys::wikidata_entity(id);
        if let Some(entity) = cache::get_json::<WikidataEntity>(self.cache(), &key).await {
            debug!(id, "Using cached Wikidata entity");
            return Ok(entity);
        }
        let entity = fetch_entity(self.client(), &self.config().wikidata_api_url, id).await?;
        cache::set_json(
            self.cache(),
            &key,
            &entity,
            self.config().cache_lifetimes.wikidata_entity,
        )
        .await;
        Ok(entity)
    }

    /// A Work handle for a Wikidata item.
    #[must_use]
    pub fn work(&self, wikidata_id: &str) -> Work {
        Work::new(self.clone(), wikidata_id)
    }

    /// Runs a SPARQL query against the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns an upstream error if the request fails or the XML is malformed.
    pub async fn run_sparql(
        &self,
        query: &WikidataQuery,
    ) -> Result<Vec<HashMap<String, String>>, WikisourceError> {
        query.fetch(self.client(), &self.config().sparql_url).await
    }
}
