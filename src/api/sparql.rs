//! SPARQL queries against the Wikidata Query Service.
//!
//! Results are requested as SPARQL XML and flattened into one
//! `binding name -> value` map per result row, taking the text of either the
//! `<literal>` or the `<uri>` child of each `<binding>`.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::WikisourceError;

use super::fetch_text;

const SPARQL_RESULTS_XML: &str = "application/sparql-results+xml";
const ENTITY_URI_PREFIX: &str = "http://www.wikidata.org/entity/";

/// A SPARQL query to run against the Wikidata Query Service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikidataQuery {
    query: String,
}

impl WikidataQuery {
    /// Wraps a SPARQL query string.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }

    /// The query text.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Runs the query and returns one field map per result row.
    pub(crate) async fn fetch(
        &self,
        client: &Client,
        endpoint: &str,
    ) -> Result<Vec<HashMap<String, String>>, WikisourceError> {
        let url = Url::parse_with_params(endpoint, &[("query", self.query.as_str())]).map_err(
            |error| WikisourceError::http(endpoint, &format!("invalid SPARQL endpoint: {error}")),
        )?;
        debug!(endpoint, "Running SPARQL query");
        let xml = fetch_text(client, url.as_str(), Some(SPARQL_RESULTS_XML)).await?;
        parse_sparql_results(&xml)
    }
}

/// Parses a SPARQL XML results document.
///
/// # Errors
///
/// Returns [`WikisourceError::InvalidResponse`] if the XML is malformed.
pub fn parse_sparql_results(xml: &str) -> Result<Vec<HashMap<String, String>>, WikisourceError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut rows = Vec::new();
    let mut row: Option<HashMap<String, String>> = None;
    let mut binding: Option<String> = None;
    let mut value: Option<String> = None;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(element) => match element.local_name().as_ref() {
                b"result" => row = Some(HashMap::new()),
                b"binding" => binding = binding_name(&element)?,
                b"literal" | b"uri" => value = Some(String::new()),
                _ => {}
            },
            Event::Empty(element) => {
                if matches!(element.local_name().as_ref(), b"literal" | b"uri")
                    && let (Some(row), Some(name)) = (row.as_mut(), binding.as_ref())
                {
                    row.insert(name.clone(), String::new());
                }
            }
            Event::Text(text) => {
                if let Some(value) = value.as_mut() {
                    value.push_str(&text.unescape().map_err(xml_error)?);
                }
            }
            Event::CData(data) => {
                if let Some(value) = value.as_mut() {
                    value.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::End(element) => match element.local_name().as_ref() {
                b"literal" | b"uri" => {
                    if let (Some(row), Some(name), Some(text)) =
                        (row.as_mut(), binding.as_ref(), value.take())
                    {
                        row.insert(name.clone(), text);
                    }
                }
                b"binding" => binding = None,
                b"result" => rows.extend(row.take()),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rows)
}

fn binding_name(element: &BytesStart<'_>) -> Result<Option<String>, WikisourceError> {
    let attribute = element.try_get_attribute("name").map_err(xml_error)?;
    attribute
        .map(|attr| {
            attr.unescape_value()
                .map(|name| name.into_owned())
                .map_err(xml_error)
        })
        .transpose()
}

fn xml_error(error: impl std::fmt::Display) -> WikisourceError {
    WikisourceError::invalid_response("SPARQL endpoint", &error.to_string())
}

/// Strips the Wikidata entity URI prefix, leaving the bare item ID.
#[must_use]
pub fn entity_id_from_uri(uri: &str) -> &str {
    uri.strip_prefix(ENTITY_URI_PREFIX)
        .or_else(|| uri.strip_prefix("https://www.wikidata.org/entity/"))
        .unwrap_or(uri)
}
