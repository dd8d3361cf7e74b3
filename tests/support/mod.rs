//! Shared helpers for integration tests.

#![allow(dead_code)]

#[path = "../../src/test_support/socket_guard.rs"]
pub mod socket_guard;

use std::sync::Arc;

use serde_json::{Value, json};
use wikisource_api::{Cache, ClientConfig, WikisourceApi};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_PATH: &str = "/w/api.php";
pub const WIKIDATA_PATH: &str = "/wikidata/api.php";
pub const SPARQL_PATH: &str = "/sparql";
pub const INDEX_NS: i64 = 106;
pub const PAGE_NS: i64 = 104;

/// A client whose site, Wikidata and SPARQL traffic all goes to `server`.
pub fn mock_api(server: &MockServer, cache: Arc<dyn Cache>) -> WikisourceApi {
    let config = ClientConfig::default()
        .with_site_base_url(server.uri())
        .with_wikidata_api_url(format!("{}{WIKIDATA_PATH}", server.uri()))
        .with_sparql_url(format!("{}{SPARQL_PATH}", server.uri()));
    WikisourceApi::with_config(config, cache).unwrap()
}

/// Mounts a `siteinfo` response with the ProofreadPage namespaces.
pub async fn mount_namespaces(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("meta", "siteinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "batchcomplete": true,
            "query": {"namespaces": {
                "0": {"id": 0, "case": "first-letter", "name": "", "content": true},
                "104": {"id": PAGE_NS, "name": "Page", "canonical": "Page"},
                "106": {"id": INDEX_NS, "name": "Index", "canonical": "Index"}
            }}
        })))
        .mount(server)
        .await;
}

/// `action=parse` output for `title` with no templates or categories.
pub fn parse_body(title: &str, html: &str) -> Value {
    json!({"parse": {
        "title": title,
        "pageid": 1,
        "text": html,
        "templates": [],
        "categories": []
    }})
}

/// Mounts an `action=parse` response for `page`, expecting `calls` requests
/// when given.
pub async fn mount_parse(server: &MockServer, page: &str, body: Value, calls: Option<u64>) {
    let mock = Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("action", "parse"))
        .and(query_param("page", page))
        .respond_with(ResponseTemplate::new(200).set_body_json(body));
    match calls {
        Some(calls) => mock.expect(calls).mount(server).await,
        None => mock.mount(server).await,
    }
}

/// Body of a `prop=info&inprop=url` response for one page.
pub fn page_info_body(ns: i64, title: &str, canonical_url: &str) -> Value {
    json!({
        "batchcomplete": true,
        "query": {"pages": [{
            "pageid": 42,
            "ns": ns,
            "title": title,
            "contentmodel": "proofread-index",
            "canonicalurl": canonical_url
        }]}
    })
}

/// Mounts a `wbgetentities` response for one entity.
pub async fn mount_entity(server: &MockServer, id: &str, entity: Value) {
    let mut entities = serde_json::Map::new();
    entities.insert(id.to_string(), entity);
    Mock::given(method("GET"))
        .and(path(WIKIDATA_PATH))
        .and(query_param("action", "wbgetentities"))
        .and(query_param("ids", id))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"entities": entities})))
        .mount(server)
        .await;
}

/// SPARQL XML results with one `<uri>` or `<literal>` binding per cell.
pub fn sparql_xml(rows: &[&[(&str, &str)]]) -> String {
    let mut xml = String::from(
        "<?xml version='1.0' encoding='UTF-8'?>\n\
         <sparql xmlns='http://www.w3.org/2005/sparql-results#'><head/><results>",
    );
    for row in rows {
        xml.push_str("<result>");
        for (name, value) in *row {
            let element = if value.starts_with("http://") { "uri" } else { "literal" };
            xml.push_str(&format!(
                "<binding name='{name}'><{element}>{value}</{element}></binding>"
            ));
        }
        xml.push_str("</result>");
    }
    xml.push_str("</results></sparql>");
    xml
}
