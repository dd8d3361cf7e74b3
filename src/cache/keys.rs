//! Cache key construction.
//!
//! Keys that embed page titles are scoped by language code, since the same
//! title exists on many Wikisources.

/// Key for the raw SPARQL directory rows.
pub(crate) const WIKISOURCES: &str = "wikisources";

pub(crate) fn namespaces(language_code: &str) -> String {
    format!("namespaces{language_code}")
}

pub(crate) fn edition_parse(language_code: &str, title: &str) -> String {
    format!("edition.{}", md5_hex(&format!("{language_code}:{title}")))
}

pub(crate) fn edition_wikidata_item(language_code: &str, title: &str) -> String {
    format!("edition.wikidataitem.{language_code}:{title}")
}

pub(crate) fn index_page_info(url: &str) -> String {
    format!("indexpage{}", md5_hex(url))
}

pub(crate) fn index_page_html(url: &str) -> String {
    format!("indexpagehtml{}", md5_hex(url))
}

pub(crate) fn wikidata_entity(id: &str) -> String {
    format!("wikisourceapi.wikidataentity.{id}")
}

fn md5_hex(value: &str) -> String {
    format!("{:x}", md5::compute(value.as_bytes()))
}
