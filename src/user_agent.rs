//! Shared User-Agent string for MediaWiki, Wikidata and SPARQL traffic.
//!
//! Wikimedia's User-Agent policy asks clients to identify themselves with a
//! name, version and contact URL.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://wikisource.org/wiki/Wikisource:Scriptorium";

/// Default User-Agent for all outbound requests.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("wikisource-api/{version} (metadata-client; +{PROJECT_UA_URL})")
}
