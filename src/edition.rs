//! Editions: one on-wiki rendering of a work on one Wikisource.
//!
//! An [`Edition`] is an unresolved handle (site + title). Metadata is
//! resolved into an [`EditionMetadata`] snapshot from the page's parse
//! output, which is memoized by the configured cache.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::api::{ApiRequest, PROP_EDITION_OF, WikidataEntity};
use crate::cache::{self, keys};
use crate::error::WikisourceError;
use crate::extract::{extract_microformat, extract_subpage_links};
use crate::index_page::IndexPage;
use crate::wikisource::{NS_NAME_INDEX, Wikisource};
use crate::work::Work;

/// Default number of subpages returned by [`Edition::subpages`].
pub const DEFAULT_SUBPAGE_LIMIT: usize = 100;

/// Element IDs of the `ws-*` microformat.
pub const MICROFORMAT_IDS: [&str; 5] = ["ws-title", "ws-author", "ws-year", "ws-publisher", "ws-place"];

const MISSING_TITLE_CODE: &str = "missingtitle";

/// One Edition of a work, identified by its top-level page title.
#[derive(Debug, Clone)]
pub struct Edition {
    wikisource: Wikisource,
    initial_title: String,
}

/// Resolved Edition metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditionMetadata {
    /// Normalized top-level page title.
    pub page_title: String,
    /// `ws-title`, or the page title when the page has none.
    pub title: String,
    /// `ws-author` split on `/`; empty when absent.
    pub authors: Vec<String>,
    /// `ws-year`.
    pub year: Option<String>,
    /// `ws-publisher`.
    pub publisher: Option<String>,
    /// `ws-place`.
    pub place: Option<String>,
}

/// The subset of `action=parse` output that Editions use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct PageParse {
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) text: String,
    #[serde(default)]
    pub(crate) templates: Vec<TemplateLink>,
    #[serde(default)]
    pub(crate) categories: Vec<CategoryLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct TemplateLink {
    pub(crate) ns: i64,
    pub(crate) title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct CategoryLink {
    pub(crate) category: String,
    #[serde(default)]
    pub(crate) hidden: bool,
}

impl Edition {
    pub(crate) fn new(wikisource: Wikisource, page_title: &str) -> Self {
        let top_level = page_title.split('/').next().unwrap_or(page_title);
        Self {
            wikisource,
            initial_title: top_level.to_string(),
        }
    }

    /// The Wikisource hosting this Edition.
    #[must_use]
    pub fn wikisource(&self) -> &Wikisource {
        &self.wikisource
    }

    /// The top-level page title.
    ///
    /// With `normalize`, the title is the one MediaWiki reports for the page
    /// (capitalization and underscores fixed), which costs a page parse.
    ///
    /// # Errors
    ///
    /// Returns [`WikisourceError::PageNotFound`] if the page does not exist.
    pub async fn page_title(&self, normalize: bool) -> Result<String, WikisourceError> {
        if !normalize {
            return Ok(self.initial_title.clone());
        }
        Ok(self.fetch_page_parse(&self.initial_title).await?.title)
    }

    /// Resolves title, authors, year, publisher and place.
    ///
    /// # Errors
    ///
    /// Returns [`WikisourceError::PageNotFound`] if the page does not exist.
    pub async fn metadata(&self) -> Result<EditionMetadata, WikisourceError> {
        let parse = self.fetch_page_parse(&self.initial_title).await?;
        Ok(metadata_from_parse(&parse))
    }

    /// Raw `ws-*` microformat values; missing elements are empty strings.
    ///
    /// # Errors
    ///
    /// Returns [`WikisourceError::PageNotFound`] if the page does not exist.
    pub async fn microformat_data(&self) -> Result<HashMap<String, String>, WikisourceError> {
        let parse = self.fetch_page_parse(&self.initial_title).await?;
        Ok(extract_microformat(&parse.text, &MICROFORMAT_IDS))
    }

    /// Category names of the top-level page.
    ///
    /// # Errors
    ///
    /// Returns [`WikisourceError::PageNotFound`] if the page does not exist.
    pub async fn categories(&self, exclude_hidden: bool) -> Result<Vec<String>, WikisourceError> {
        let parse = self.fetch_page_parse(&self.initial_title).await?;
        Ok(parse
            .categories
            .iter()
            .filter(|category| !(exclude_hidden && category.hidden))
            .map(|category| category.category.replace('_', " "))
            .collect())
    }

    /// The Wikidata item linked to the top-level page, if any.
    ///
    /// # Errors
    ///
    /// Returns an upstream error if the page props query fails.
    #[instrument(skip(self), fields(title = %self.initial_title))]
    pub async fn wikidata_item(&self) -> Result<Option<String>, WikisourceError> {
        let page_title = self.page_title(true).await?;
        let api = self.wikisource.api();
        let key = keys::edition_wikidata_item(self.wikisource.language_code(), &page_title);
        if let Some(item) = cache::get_json::<Option<String>>(api.cache(), &key).await {
            debug!(page_title = %page_title, "Using cached Wikidata number");
            return Ok(item);
        }
        let request = ApiRequest::new("query")
            .param("titles", page_title.as_str())
            .param("prop", "pageprops")
            .param("ppprop", "wikibase_item");
        let pages = self
            .wikisource
            .send_api_request(request, "query.pages")
            .await?;
        let item = pages
            .as_array()
            .and_then(|pages| pages.first())
            .and_then(|page| page.pointer("/pageprops/wikibase_item"))
            .and_then(serde_json::Value::as_str)
            .map(ToString::to_string);
        debug!(page_title = %page_title, "Caching Wikidata number");
        cache::set_json(
            api.cache(),
            &key,
            &item,
            api.config().cache_lifetimes.wikidata_item,
        )
        .await;
        Ok(item)
    }

    /// The Wikidata entity of this Edition, if the page is linked to one.
    ///
    /// # Errors
    ///
    /// Returns an upstream error if either lookup fails.
    pub async fn wikidata_entity(&self) -> Result<Option<WikidataEntity>, WikisourceError> {
        match self.wikidata_item().await? {
            Some(item) => Ok(Some(self.wikisource.api().fetch_wikidata_entity(&item).await?)),
            None => Ok(None),
        }
    }

    /// The Work this Edition is an edition of, via "edition or translation of".
    ///
    /// # Errors
    ///
    /// Returns an upstream error if a lookup fails.
    pub async fn work(&self) -> Result<Option<Work>, WikisourceError> {
        let Some(entity) = self.wikidata_entity().await? else {
            return Ok(None);
        };
        let Some(work_id) = entity.claim_entity_ids(PROP_EDITION_OF).into_iter().next() else {
            info!(item = %entity.id, "Edition item has no {PROP_EDITION_OF} claim");
            return Ok(None);
        };
        Ok(Some(self.wikisource.api().work(&work_id)))
    }

    /// Subpage titles in the order they are linked, depth first.
    ///
    /// Stops as soon as `limit` titles have been found. Each title appears
    /// once, and the top-level page itself is never included.
    ///
    /// # Errors
    ///
    /// Returns [`WikisourceError::PageNotFound`] if a linked page does not
    /// exist, or an upstream error if a parse fails.
    #[instrument(skip(self), fields(title = %self.initial_title))]
    pub async fn subpages(&self, limit: usize) -> Result<Vec<String>, WikisourceError> {
        let mut found = Vec::new();
        if limit == 0 {
            return Ok(found);
        }
        let root_parse = self.fetch_page_parse(&self.initial_title).await?;
        let root = root_parse.title;
        let mut visited = HashSet::from([root.clone()]);
        let mut stack = vec![extract_subpage_links(&root_parse.text, &root).into_iter()];

        while let Some(links) = stack.last_mut() {
            let Some(title) = links.next() else {
                stack.pop();
                continue;
            };
            if !visited.insert(title.clone()) {
                continue;
            }
            found.push(title.clone());
            if found.len() >= limit {
                debug!(limit, last = %title, "Reached subpage limit");
                break;
            }
            let children = self.linked_subpages(&title).await?;
            stack.push(children.into_iter());
        }
        Ok(found)
    }

    async fn linked_subpages(&self, title: &str) -> Result<Vec<String>, WikisourceError> {
        debug!(title, "Getting subpages");
        let parse = self.fetch_page_parse(title).await?;
        Ok(extract_subpage_links(&parse.text, title))
    }

    /// Index pages transcluded anywhere in this Edition, keyed by title.
    ///
    /// Empty when the wiki has no Index namespace.
    ///
    /// # Errors
    ///
    /// Returns an upstream error if a listing, parse or Index page load fails.
    #[instrument(skip(self), fields(title = %self.initial_title))]
    pub async fn index_pages(&self) -> Result<BTreeMap<String, IndexPage>, WikisourceError> {
        let mut index_pages = BTreeMap::new();
        let Some(index_ns) = self.wikisource.namespace_id(NS_NAME_INDEX).await? else {
            debug!("No Index namespace on this wiki");
            return Ok(index_pages);
        };
        let root_parse = self.fetch_page_parse(&self.initial_title).await?;

        for subpage in self.prefixed_titles(&root_parse.title).await? {
            let fetched;
            let parse = if subpage == root_parse.title {
                &root_parse
            } else {
                fetched = self.fetch_page_parse(&subpage).await?;
                &fetched
            };
            for template in parse.templates.iter().filter(|t| t.ns == index_ns) {
                if index_pages.contains_key(&template.title) {
                    continue;
                }
                debug!(index = %template.title, "Linking an index page");
                let index_page = self.wikisource.index_page_from_title(&template.title).await?;
                index_pages.insert(template.title.clone(), index_page);
            }
        }
        Ok(index_pages)
    }

    /// The top-level page and all its `/` subpages, from the page listing.
    async fn prefixed_titles(&self, page_title: &str) -> Result<Vec<String>, WikisourceError> {
        let request = ApiRequest::new("query")
            .param("list", "allpages")
            .param("apprefix", page_title)
            .param("aplimit", "max");
        let pages = self
            .wikisource
            .send_api_request(request, "query.allpages")
            .await?;
        let subpage_prefix = format!("{page_title}/");
        Ok(pages
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|page| page.get("title").and_then(serde_json::Value::as_str))
            .filter(|title| *title == page_title || title.starts_with(&subpage_prefix))
            .map(ToString::to_string)
            .collect())
    }

    /// Parse output for `title`, through the cache.
    #[instrument(skip(self))]
    pub(crate) async fn fetch_page_parse(&self, title: &str) -> Result<PageParse, WikisourceError> {
        let api = self.wikisource.api();
        let key = keys::edition_parse(self.wikisource.language_code(), title);
        if let Some(parse) = cache::get_json::<PageParse>(api.cache(), &key).await {
            debug!(title, "Using cached page parse data");
            return Ok(parse);
        }
        let request = ApiRequest::new("parse")
            .param("page", title)
            .param("prop", "text|templates|categories");
        let raw = match self.wikisource.send_api_request(request, "parse").await {
            Ok(raw) => raw,
            Err(WikisourceError::Api { code, .. }) if code == MISSING_TITLE_CODE => {
                return Err(WikisourceError::PageNotFound {
                    title: title.to_string(),
                    code,
                });
            }
            Err(error) => return Err(error),
        };
        let parse: PageParse = serde_json::from_value(raw).map_err(|error| {
            WikisourceError::invalid_response("parse API", &error.to_string())
        })?;
        cache::set_json(api.cache(), &key, &parse, api.config().cache_lifetimes.page_parse).await;
        Ok(parse)
    }
}

fn metadata_from_parse(parse: &PageParse) -> EditionMetadata {
    let mut fields = extract_microformat(&parse.text, &MICROFORMAT_IDS);
    let mut field = |id: &str| fields.remove(id).filter(|value| !value.is_empty());

    let title = field("ws-title").unwrap_or_else(|| parse.title.clone());
    let authors = field("ws-author")
        .map(|authors| {
            authors
                .split('/')
                .map(str::trim)
                .filter(|author| !author.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();

    EditionMetadata {
        page_title: parse.title.clone(),
        title,
        authors,
        year: field("ws-year"),
        publisher: field("ws-publisher"),
        place: field("ws-place"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::WikisourceApi;

    fn parse_with_text(text: &str) -> PageParse {
        PageParse {
            title: "The Emancipated".to_string(),
            text: text.to_string(),
            templates: Vec::new(),
            categories: Vec::new(),
        }
    }

    #[test]
    fn test_new_truncates_to_top_level_title() {
        let site = WikisourceApi::new().unwrap().wikisource_for_code("en");
        let edition = site.edition("The Emancipated/Volume 1/Chapter 2");
        assert_eq!(edition.initial_title, "The Emancipated");
    }

    #[test]
    fn test_metadata_from_microformat() {
        let parse = parse_with_text(
            r#"<div class="mw-parser-output">
<span id="ws-title">The Emancipated</span>
<span id="ws-author">George Gissing / Someone Else</span>
<span id="ws-year">1890</span>
<span id="ws-publisher">Richard Bentley and Son</span>
</div>"#,
        );
        let metadata = metadata_from_parse(&parse);
        assert_eq!(metadata.title, "The Emancipated");
        assert_eq!(metadata.authors, vec!["George Gissing", "Someone Else"]);
        assert_eq!(metadata.year.as_deref(), Some("1890"));
        assert_eq!(metadata.publisher.as_deref(), Some("Richard Bentley and Son"));
        assert_eq!(metadata.place, None);
    }

    #[test]
    fn test_metadata_authors_trimmed_and_empty_segments_dropped() {
        let parse = parse_with_text(r#"<span id="ws-author">A / / B </span>"#);
        assert_eq!(metadata_from_parse(&parse).authors, vec!["A", "B"]);

        let parse = parse_with_text(r#"<span id="ws-author"> / </span>"#);
        assert!(metadata_from_parse(&parse).authors.is_empty());
    }

    #[test]
    fn test_metadata_title_falls_back_to_page_title() {
        let metadata = metadata_from_parse(&parse_with_text("<p>No microformat here.</p>"));
        assert_eq!(metadata.title, "The Emancipated");
        assert!(metadata.authors.is_empty());
        assert_eq!(metadata.year, None);
    }

    #[test]
    fn test_page_parse_decodes_formatversion_2() {
        let raw = serde_json::json!({
            "title": "Hamlet",
            "pageid": 1,
            "text": "<div></div>",
            "templates": [{"ns": 106, "title": "Index:Hamlet.djvu", "exists": true}],
            "categories": [
                {"sortkey": "", "category": "Plays", "hidden": false},
                {"sortkey": "", "category": "Index_validated", "hidden": true}
            ]
        });
        let parse: PageParse = serde_json::from_value(raw).unwrap();
        assert_eq!(parse.templates[0].ns, 106);
        assert!(parse.categories[1].hidden);
    }
}
