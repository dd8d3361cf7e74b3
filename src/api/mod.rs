//! Read-only access to the MediaWiki API, the Wikidata API and the Wikidata
//! Query Service.
//!
//! # Architecture
//!
//! - [`ApiRequest`] - Ordered parameter set for one MediaWiki API action
//! - [`send_api_request`] - Sends a request and loops over `continue` tokens,
//!   merging array and object results across batches
//! - [`WikidataEntity`] - Typed `wbgetentities` payload
//! - [`WikidataQuery`] - SPARQL query returning one field map per result row

mod http_client;
mod sparql;
mod wikidata;

pub(crate) use http_client::build_http_client;
pub use sparql::{WikidataQuery, entity_id_from_uri, parse_sparql_results};
pub use wikidata::{
    Claim, DataValue, LanguageValue, PROP_EDITION_OF, PROP_HAS_EDITION, PROP_INSTANCE_OF,
    PROP_LANGUAGE_OF_WORK, PROP_OFFICIAL_WEBSITE, PROP_WIKIMEDIA_LANGUAGE_CODE,
    QID_WIKISOURCE_LANGUAGE_EDITION, Sitelink, Snak, WikidataEntity, is_entity_id,
};
pub(crate) use wikidata::fetch_entity;

use reqwest::Client;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::error::WikisourceError;

/// Parameters for one MediaWiki API call.
///
/// `format=json` and `formatversion=2` are always sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    params: Vec<(String, String)>,
}

impl ApiRequest {
    /// Starts a request for the given `action`.
    #[must_use]
    pub fn new(action: &str) -> Self {
        let mut request = Self { params: Vec::new() };
        request.set("action", action);
        request.set("format", "json");
        request.set("formatversion", "2");
        request
    }

    /// Adds or replaces a parameter.
    #[must_use]
    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Adds or replaces a parameter in place.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(existing) = self.params.iter_mut().find(|(k, _)| k == key) {
            existing.1 = value;
        } else {
            self.params.push((key.to_string(), value));
        }
    }

    /// Returns the value of a parameter, if set.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All parameters in insertion order.
    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

/// Sends `request` to `api_url`, following `continue` tokens until the API
/// reports no further batches.
///
/// `result_key` is a dot-delimited path into each response (e.g.
/// `query.pages`). Array values are concatenated and objects merged
/// recursively across batches. The loop also stops when the value at
/// `result_key` is missing or is neither an array nor an object.
///
/// # Errors
///
/// Returns [`WikisourceError::Api`] for API error objects and
/// [`WikisourceError::Http`] / [`WikisourceError::InvalidResponse`] for
/// transport and decoding failures.
#[tracing::instrument(skip(client, request), fields(action = request.get("action")))]
pub async fn send_api_request(
    client: &Client,
    api_url: &str,
    mut request: ApiRequest,
    result_key: &str,
) -> Result<Value, WikisourceError> {
    let mut data = Value::Null;
    loop {
        let mut body = fetch_api_json(client, api_url, &request).await?;
        let Some(batch) = take_path(&mut body, result_key).filter(is_collection) else {
            break;
        };
        merge_recursive(&mut data, batch);

        match body.get("continue").and_then(Value::as_object) {
            Some(continuation) => {
                for (key, value) in continuation {
                    request.set(key, param_string(value));
                }
            }
            None => break,
        }
    }
    Ok(data)
}

/// Sends `request` once, ignoring any continuation.
///
/// # Errors
///
/// Same as [`send_api_request`].
#[tracing::instrument(skip(client, request), fields(action = request.get("action")))]
pub async fn send_api_request_once(
    client: &Client,
    api_url: &str,
    request: &ApiRequest,
    result_key: &str,
) -> Result<Value, WikisourceError> {
    let mut body = fetch_api_json(client, api_url, request).await?;
    Ok(take_path(&mut body, result_key).unwrap_or(Value::Null))
}

async fn fetch_api_json(
    client: &Client,
    api_url: &str,
    request: &ApiRequest,
) -> Result<Value, WikisourceError> {
    debug!(api_url, params = ?request.params(), "API request");
    let url = Url::parse_with_params(api_url, request.params())
        .map_err(|error| WikisourceError::http(api_url, &format!("invalid API URL: {error}")))?;
    let body = fetch_json(client, url.as_str()).await?;
    if let Some(error) = body.get("error") {
        return Err(api_error(error));
    }
    Ok(body)
}

/// Converts a MediaWiki/Wikibase `error` object into [`WikisourceError::Api`].
pub(crate) fn api_error(error: &Value) -> WikisourceError {
    let field = |name: &str| {
        error
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    WikisourceError::Api {
        code: field("code"),
        info: field("info"),
    }
}

/// GETs `url` and decodes the body as JSON.
pub(crate) async fn fetch_json(client: &Client, url: &str) -> Result<Value, WikisourceError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|error| WikisourceError::http(url, &error.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(WikisourceError::http(
            url,
            &format!("HTTP {}", status.as_u16()),
        ));
    }
    response
        .json::<Value>()
        .await
        .map_err(|error| WikisourceError::invalid_response(url, &error.to_string()))
}

/// GETs `url` and returns the body as text.
pub(crate) async fn fetch_text(
    client: &Client,
    url: &str,
    accept: Option<&str>,
) -> Result<String, WikisourceError> {
    let mut request = client.get(url);
    if let Some(accept) = accept {
        request = request.header(reqwest::header::ACCEPT, accept);
    }
    let response = request
        .send()
        .await
        .map_err(|error| WikisourceError::http(url, &error.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(WikisourceError::http(
            url,
            &format!("HTTP {}", status.as_u16()),
        ));
    }
    response
        .text()
        .await
        .map_err(|error| WikisourceError::invalid_response(url, &error.to_string()))
}

fn is_collection(value: &Value) -> bool {
    value.is_array() || value.is_object()
}

fn take_path(body: &mut Value, dotted: &str) -> Option<Value> {
    let pointer = format!("/{}", dotted.replace('.', "/"));
    body.pointer_mut(&pointer).map(Value::take)
}

fn param_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Merges `from` into `into`: arrays concatenate, objects merge key by key,
/// anything else replaces.
pub(crate) fn merge_recursive(into: &mut Value, from: Value) {
    match (into, from) {
        (Value::Array(existing), Value::Array(more)) => existing.extend(more),
        (Value::Object(existing), Value::Object(more)) => merge_objects(existing, more),
        (slot, other) => *slot = other,
    }
}

fn merge_objects(existing: &mut Map<String, Value>, more: Map<String, Value>) {
    for (key, value) in more {
        match existing.get_mut(&key) {
            Some(slot) => merge_recursive(slot, value),
            None => {
                existing.insert(key, value);
            }
        }
    }
}
