//! The SPARQL-sourced directory of Wikisource language editions.

use std::collections::{HashMap, HashSet};

use crate::api::entity_id_from_uri;

use super::{Wikisource, WikisourceApi};

/// Selects every Wikisource language edition with its Wikimedia language
/// code and the language's own name for itself. The multilingual `mul`
/// edition has no such label, so it takes the English one.
pub const DIRECTORY_QUERY: &str = "SELECT ?item ?langCode ?langName WHERE { \
?item wdt:P31 wd:Q15156455 . \
?item wdt:P424 ?langCode . \
?item wdt:P407 ?lang . \
?lang rdfs:label ?langName . \
FILTER(LANG(?langName) = ?langCode || (?langCode = \"mul\" && LANG(?langName) = \"en\")) . \
}";

/// One site per distinct language code, in row order.
pub(super) fn sites_from_rows(
    api: &WikisourceApi,
    rows: &[HashMap<String, String>],
) -> Vec<Wikisource> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter_map(|row| {
            let code = row.get("langCode")?;
            if !seen.insert(code.clone()) {
                return None;
            }
            Some(Wikisource::new(
                api.clone(),
                code.clone(),
                row.get("langName").cloned(),
                row.get("item").map(|uri| entity_id_from_uri(uri).to_string()),
            ))
        })
        .collect()
}
