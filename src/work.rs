//! Works: the Wikidata-level grouping of Editions.

use std::collections::HashSet;

use tracing::{debug, instrument, warn};

use crate::api::{
    PROP_EDITION_OF, PROP_HAS_EDITION, WikidataEntity, WikidataQuery, entity_id_from_uri,
    is_entity_id,
};
use crate::edition::Edition;
use crate::error::WikisourceError;
use crate::extract::MULTILINGUAL_CODE;
use crate::wikisource::WikisourceApi;

const WIKISOURCE_SITE_SUFFIX: &str = "wikisource";
const MULTILINGUAL_SITE: &str = "sourceswiki";

/// A literary work, identified by its Wikidata item.
#[derive(Debug, Clone)]
pub struct Work {
    api: WikisourceApi,
    wikidata_id: String,
}

impl Work {
    pub(crate) fn new(api: WikisourceApi, wikidata_id: &str) -> Self {
        Self {
            api,
            wikidata_id: wikidata_id.to_string(),
        }
    }

    /// The Wikidata item ID.
    #[must_use]
    pub fn wikidata_id(&self) -> &str {
        &self.wikidata_id
    }

    /// The work's Wikidata entity.
    ///
    /// # Errors
    ///
    /// Returns [`WikisourceError::EntityNotFound`] for unknown items.
    pub async fn entity(&self) -> Result<WikidataEntity, WikisourceError> {
        self.api.fetch_wikidata_entity(&self.wikidata_id).await
    }

    /// The work's label in `language`.
    ///
    /// # Errors
    ///
    /// Returns an upstream error if the entity cannot be fetched.
    pub async fn label(&self, language: &str) -> Result<Option<String>, WikisourceError> {
        Ok(self.entity().await?.label(language).map(ToString::to_string))
    }

    /// Editions of this work hosted on any Wikisource.
    ///
    /// Edition items are those named by the work's "has edition" claims plus
    /// those whose "edition or translation of" claim points back at the work.
    /// Each Wikisource sitelink of the work or of an edition item becomes one
    /// [`Edition`]; repeats are dropped.
    ///
    /// # Errors
    ///
    /// Returns an upstream error if a Wikidata lookup or the SPARQL query fails.
    #[instrument(skip(self), fields(work = %self.wikidata_id))]
    pub async fn editions(&self) -> Result<Vec<Edition>, WikisourceError> {
        let work = self.entity().await?;
        let mut links = wikisource_sitelinks(&work);

        for edition_id in self.edition_ids(&work).await? {
            match self.api.fetch_wikidata_entity(&edition_id).await {
                Ok(entity) => links.extend(wikisource_sitelinks(&entity)),
                Err(WikisourceError::EntityNotFound { id }) => {
                    warn!(id = %id, "Skipping missing edition item");
                }
                Err(error) => return Err(error),
            }
        }

        let mut seen = HashSet::new();
        Ok(links
            .into_iter()
            .filter(|link| seen.insert(link.clone()))
            .map(|(code, title)| self.api.wikisource_for_code(&code).edition(&title))
            .collect())
    }

    async fn edition_ids(&self, work: &WikidataEntity) -> Result<Vec<String>, WikisourceError> {
        let mut ids = work.claim_entity_ids(PROP_HAS_EDITION);
        if is_entity_id(&self.wikidata_id) {
            let query = WikidataQuery::new(format!(
                "SELECT ?edition WHERE {{ ?edition wdt:{PROP_EDITION_OF} wd:{} . }}",
                self.wikidata_id
            ));
            for row in self.api.run_sparql(&query).await? {
                if let Some(uri) = row.get("edition") {
                    ids.push(entity_id_from_uri(uri).to_string());
                }
            }
        }
        let mut seen = HashSet::new();
        ids.retain(|id| seen.insert(id.clone()));
        debug!(count = ids.len(), "Found edition items");
        Ok(ids)
    }
}

/// `(language code, page title)` for each Wikisource sitelink, ordered by site.
fn wikisource_sitelinks(entity: &WikidataEntity) -> Vec<(String, String)> {
    let mut links: Vec<(String, String)> = entity
        .sitelinks
        .values()
        .filter_map(|link| Some((site_language_code(&link.site)?, link.title.clone())))
        .collect();
    links.sort();
    links
}

/// Language code of a Wikisource site ID: `enwikisource` is `en`,
/// `zh_min_nanwikisource` is `zh-min-nan`, `sourceswiki` is `mul`.
fn site_language_code(site: &str) -> Option<String> {
    if site == MULTILINGUAL_SITE {
        return Some(MULTILINGUAL_CODE.to_string());
    }
    site.strip_suffix(WIKISOURCE_SITE_SUFFIX)
        .filter(|code| !code.is_empty())
        .map(|code| code.replace('_', "-"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_site_language_code() {
        assert_eq!(site_language_code("enwikisource").as_deref(), Some("en"));
        assert_eq!(
            site_language_code("zh_min_nanwikisource").as_deref(),
            Some("zh-min-nan")
        );
        assert_eq!(site_language_code("sourceswiki").as_deref(), Some("mul"));
        assert_eq!(site_language_code("enwiki"), None);
        assert_eq!(site_language_code("wikisource"), None);
    }

    #[test]
    fn test_wikisource_sitelinks_sorted_and_filtered() {
        let entity: WikidataEntity = serde_json::from_value(json!({
            "id": "Q1",
            "sitelinks": {
                "frwikisource": {"site": "frwikisource", "title": "Orgueil et Préjugés"},
                "enwiki": {"site": "enwiki", "title": "Pride and Prejudice"},
                "enwikisource": {"site": "enwikisource", "title": "Pride and Prejudice"}
            }
        }))
        .unwrap();
        assert_eq!(
            wikisource_sitelinks(&entity),
            vec![
                ("en".to_string(), "Pride and Prejudice".to_string()),
                ("fr".to_string(), "Orgueil et Préjugés".to_string()),
            ]
        );
    }
}
