//! Wikidata entities as returned by `wbgetentities`.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::WikisourceError;
use crate::extract::compile_static_regex;

use super::{api_error, fetch_json};

/// Wikidata property: instance of.
pub const PROP_INSTANCE_OF: &str = "P31";
/// Wikidata property: language of work or name.
pub const PROP_LANGUAGE_OF_WORK: &str = "P407";
/// Wikidata property: Wikimedia language code.
pub const PROP_WIKIMEDIA_LANGUAGE_CODE: &str = "P424";
/// Wikidata property: edition or translation of.
pub const PROP_EDITION_OF: &str = "P629";
/// Wikidata property: has edition or translation.
pub const PROP_HAS_EDITION: &str = "P747";
/// Wikidata property: official website.
pub const PROP_OFFICIAL_WEBSITE: &str = "P856";
/// Wikidata item: Wikisource language edition.
pub const QID_WIKISOURCE_LANGUAGE_EDITION: &str = "Q15156455";

static ENTITY_ID_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"^Q[1-9]\d*$"));

/// Returns true if `id` looks like a Wikidata item ID (`Q` followed by digits).
#[must_use]
pub fn is_entity_id(id: &str) -> bool {
    ENTITY_ID_RE.is_match(id)
}

/// A Wikidata item: labels, claims and sitelinks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WikidataEntity {
    /// The item ID, e.g. `Q42`.
    pub id: String,
    /// Labels keyed by language code.
    #[serde(default)]
    pub labels: HashMap<String, LanguageValue>,
    /// Statements keyed by property ID.
    #[serde(default)]
    pub claims: HashMap<String, Vec<Claim>>,
    /// Sitelinks keyed by site ID (e.g. `enwikisource`).
    #[serde(default)]
    pub sitelinks: HashMap<String, Sitelink>,
}

/// A language-tagged string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageValue {
    /// Language code.
    pub language: String,
    /// The text.
    pub value: String,
}

/// One statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// The main value of the statement.
    pub mainsnak: Snak,
}

/// The value part of a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snak {
    /// Absent for "no value" / "unknown value" snaks.
    #[serde(default)]
    pub datavalue: Option<DataValue>,
}

/// Raw datavalue; its shape depends on the property's datatype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataValue {
    /// A string for URL/string properties, an object with `id` for items.
    pub value: Value,
}

/// A link from an item to a page on a Wikimedia site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sitelink {
    /// Site ID, e.g. `enwikisource`.
    pub site: String,
    /// Page title on that site.
    pub title: String,
}

impl WikidataEntity {
    /// Label in `language`, if present.
    #[must_use]
    pub fn label(&self, language: &str) -> Option<&str> {
        self.labels.get(language).map(|l| l.value.as_str())
    }

    /// All datavalues recorded for `property`.
    pub fn claim_values<'a>(&'a self, property: &str) -> impl Iterator<Item = &'a Value> + 'a {
        self.claims
            .get(property)
            .into_iter()
            .flatten()
            .filter_map(|claim| claim.mainsnak.datavalue.as_ref())
            .map(|datavalue| &datavalue.value)
    }

    /// Item IDs referenced by `property`, in statement order.
    #[must_use]
    pub fn claim_entity_ids(&self, property: &str) -> Vec<String> {
        self.claim_values(property)
            .filter_map(|value| value.get("id").and_then(Value::as_str))
            .map(ToString::to_string)
            .collect()
    }

    /// String values recorded for `property` (URLs, codes).
    #[must_use]
    pub fn claim_strings(&self, property: &str) -> Vec<String> {
        self.claim_values(property)
            .filter_map(Value::as_str)
            .map(ToString::to_string)
            .collect()
    }

    /// Host of the first official-website URL, if any.
    #[must_use]
    pub fn official_website_host(&self) -> Option<String> {
        self.claim_strings(PROP_OFFICIAL_WEBSITE)
            .iter()
            .find_map(|url| Url::parse(url).ok()?.host_str().map(ToString::to_string))
    }

    /// Sitelink for `site`, if present.
    #[must_use]
    pub fn sitelink(&self, site: &str) -> Option<&Sitelink> {
        self.sitelinks.get(site)
    }
}

/// Fetches one entity with `wbgetentities`.
pub(crate) async fn fetch_entity(
    client: &Client,
    wikidata_api_url: &str,
    id: &str,
) -> Result<WikidataEntity, WikisourceError> {
    let url = Url::parse_with_params(
        wikidata_api_url,
        &[("action", "wbgetentities"), ("ids", id), ("format", "json")],
    )
    .map_err(|error| {
        WikisourceError::http(wikidata_api_url, &format!("invalid Wikidata URL: {error}"))
    })?;
    debug!(id, "Fetching Wikidata entity");
    let body = fetch_json(client, url.as_str()).await?;
    if let Some(error) = body.get("error") {
        return Err(api_error(error));
    }
    let Some(raw) = body.get("entities").and_then(|entities| entities.get(id)) else {
        return Err(WikisourceError::EntityNotFound { id: id.to_string() });
    };
    if raw.get("missing").is_some() {
        return Err(WikisourceError::EntityNotFound { id: id.to_string() });
    }
    serde_json::from_value(raw.clone())
        .map_err(|error| WikisourceError::invalid_response("Wikidata", &error.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_entity() -> WikidataEntity {
        serde_json::from_value(json!({
            "id": "Q19098887",
            "labels": {"en": {"language": "en", "value": "Bengali Wikisource"}},
            "claims": {
                "P856": [{"mainsnak": {"datavalue": {"value": "https://bn.wikisource.org/", "type": "string"}}}],
                "P629": [
                    {"mainsnak": {"datavalue": {"value": {"entity-type": "item", "id": "Q170583"}, "type": "wikibase-entityid"}}},
                    {"mainsnak": {"snaktype": "novalue"}}
                ]
            },
            "sitelinks": {"enwikisource": {"site": "enwikisource", "title": "Pride and Prejudice"}}
        }))
        .unwrap()
    }

    #[test]
    fn test_entity_accessors() {
        let entity = sample_entity();
        assert_eq!(entity.label("en"), Some("Bengali Wikisource"));
        assert_eq!(entity.label("fr"), None);
        assert_eq!(entity.claim_entity_ids(PROP_EDITION_OF), vec!["Q170583"]);
        assert_eq!(
            entity.official_website_host().as_deref(),
            Some("bn.wikisource.org")
        );
        assert_eq!(
            entity.sitelink("enwikisource").map(|s| s.title.as_str()),
            Some("Pride and Prejudice")
        );
        assert!(entity.claim_entity_ids(PROP_HAS_EDITION).is_empty());
    }

    #[test]
    fn test_entity_defaults_for_missing_sections() {
        let entity: WikidataEntity = serde_json::from_value(json!({"id": "Q1"})).unwrap();
        assert!(entity.labels.is_empty());
        assert!(entity.official_website_host().is_none());
    }

    #[test]
    fn test_is_entity_id() {
        assert!(is_entity_id("Q42"));
        assert!(!is_entity_id("Q0"));
        assert!(!is_entity_id("P31"));
        assert!(!is_entity_id("Q42 } ?x ?y"));
    }
}
