//! Integration tests for Index page loading and page lists.

mod support;

use std::sync::Arc;

use serde_json::json;
use support::socket_guard::start_mock_server_or_skip;
use support::{API_PATH, INDEX_NS, PAGE_NS, mock_api, mount_namespaces, page_info_body};
use wikisource_api::{ErrorKind, MemoryCache, NoCache, PageListField, WikisourceError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INDEX_URL: &str = "https://en.wikisource.org/wiki/Index:Foo.djvu";

const INDEX_HTML: &str = r#"<!DOCTYPE html><html><body>
<div class="prp-index-image">
  <img src="//upload.wikimedia.org/wikipedia/commons/thumb/f/f0/Foo.djvu/page1-300px-Foo.djvu.jpg">
</div>
<div class="index-pagelist">
  <a href="/wiki/Page:Foo.djvu/1" class="prp-pagequality-0 quality0" title="Page:Foo.djvu/1">Cover</a>
  <a href="/wiki/Page:Foo.djvu/2" class="prp-pagequality-4 quality4" title="Page:Foo.djvu/2">i</a>
  <a href="/wiki/Page:Foo.djvu/3" class="prp-pagequality-3 quality3" title="Page:Foo.djvu/3">1</a>
  <a href="/w/index.php?title=Page:Foo.djvu/4&amp;action=edit&amp;redlink=1" class="new" title="Page:Foo.djvu/4 (page does not exist)">2</a>
</div>
</body></html>"#;

async fn mount_index_info(server: &MockServer, ns: i64) {
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("prop", "info"))
        .and(query_param("titles", "Index:Foo.djvu"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_info_body(
            ns,
            "Index:Foo.djvu",
            &format!("{}/wiki/Index:Foo.djvu", server.uri()),
        )))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_load_and_scrape_page_list() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_namespaces(&server).await;
    mount_index_info(&server, INDEX_NS).await;
    Mock::given(method("GET"))
        .and(path("/wiki/Index:Foo.djvu"))
        .respond_with(ResponseTemplate::new(200).set_body_string(INDEX_HTML))
        .expect(1)
        .mount(&server)
        .await;

    let api = mock_api(&server, Arc::new(MemoryCache::new()));
    let site = api.new_wikisource_from_url(INDEX_URL).unwrap();
    let index_page = site.index_page_from_url(INDEX_URL).await.unwrap();

    assert!(index_page.loaded());
    assert_eq!(index_page.title().unwrap(), "Index:Foo.djvu");
    assert_eq!(
        index_page.url().unwrap(),
        format!("{}/wiki/Index:Foo.djvu", server.uri())
    );

    let pages = index_page.page_list(false).await.unwrap();
    assert_eq!(pages.len(), 4);
    let cover = pages.by_number(1).unwrap();
    assert_eq!(cover.label, "Cover");
    assert_eq!(cover.quality, Some(0));
    assert_eq!(cover.url, format!("{}/wiki/Page:Foo.djvu/1", server.uri()));
    let red_link = pages.get("page-4").unwrap();
    assert_eq!(red_link.quality, None);
    assert_eq!(red_link.title.as_deref(), Some("Page:Foo.djvu/4"));

    assert_eq!(index_page.quality().await.unwrap(), Some(3));
    assert_eq!(
        index_page.image().await.unwrap().as_deref(),
        Some("https://upload.wikimedia.org/wikipedia/commons/thumb/f/f0/Foo.djvu/page1-300px-Foo.djvu.jpg")
    );

    let by_label = index_page
        .child_page_info("i", PageListField::Label)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_label.number, Some(2));
    let by_number = index_page
        .child_page_info("3", PageListField::Number)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_number.label, "1");
    assert!(
        index_page
            .child_page_info("99", PageListField::Number)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_second_load_is_rejected() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_namespaces(&server).await;
    mount_index_info(&server, INDEX_NS).await;

    let api = mock_api(&server, Arc::new(NoCache));
    let site = api.wikisource_for_code("en");
    let mut index_page = site.index_page();
    assert!(!index_page.loaded());
    assert_eq!(index_page.title().unwrap_err().kind(), ErrorKind::NotLoaded);

    index_page.load_from_url(INDEX_URL).await.unwrap();
    let err = index_page.load_from_url(INDEX_URL).await.unwrap_err();
    assert!(matches!(err, WikisourceError::AlreadyLoaded { .. }));
    assert_eq!(err.kind(), ErrorKind::NotLoaded);
    assert_eq!(index_page.title().unwrap(), "Index:Foo.djvu");
}

#[tokio::test]
async fn test_page_outside_index_namespace_is_rejected() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_namespaces(&server).await;
    mount_index_info(&server, 0).await;

    let api = mock_api(&server, Arc::new(NoCache));
    let err = api
        .wikisource_for_code("en")
        .index_page_from_url(INDEX_URL)
        .await
        .unwrap_err();
    assert!(matches!(err, WikisourceError::NotAnIndexPage { ref url } if url == INDEX_URL));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_missing_index_page_is_not_found() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_namespaces(&server).await;
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("prop", "info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "batchcomplete": true,
            "query": {"pages": [{"ns": INDEX_NS, "title": "Index:Foo.djvu", "missing": true}]}
        })))
        .mount(&server)
        .await;

    let api = mock_api(&server, Arc::new(NoCache));
    let err = api
        .wikisource_for_code("en")
        .index_page_from_url(INDEX_URL)
        .await
        .unwrap_err();
    assert!(matches!(err, WikisourceError::IndexPageNotFound { .. }));
}

#[tokio::test]
async fn test_existing_only_page_list_is_sorted_by_number() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_namespaces(&server).await;
    mount_index_info(&server, INDEX_NS).await;
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("generator", "prefixsearch"))
        .and(query_param("gpssearch", "Foo.djvu/"))
        .and(query_param("gpsnamespace", PAGE_NS.to_string().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "continue": {"gpsoffset": 3, "continue": "gpsoffset||"},
            "query": {"pages": [
                {"pageid": 11, "ns": PAGE_NS, "title": "Page:Foo.djvu/10", "proofread": {"quality": 3, "quality_text": "Proofread"}},
                {"pageid": 12, "ns": PAGE_NS, "title": "Page:Foo.djvu/2", "proofread": {"quality": 4, "quality_text": "Validated"}},
                {"ns": PAGE_NS, "title": "Page:Foo.djvu/1", "missing": true}
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = mock_api(&server, Arc::new(NoCache));
    let index_page = api
        .wikisource_for_code("en")
        .index_page_from_url(INDEX_URL)
        .await
        .unwrap();
    let pages = index_page.page_list(true).await.unwrap();

    let numbers: Vec<Option<u32>> = pages.iter().map(|entry| entry.number).collect();
    assert_eq!(numbers, vec![Some(2), Some(10)]);
    let labels: Vec<&str> = pages.iter().map(|entry| entry.label.as_str()).collect();
    assert_eq!(labels, vec!["2", "10"]);
    assert_eq!(pages.quality(), Some(3));
    assert_eq!(
        pages.by_number(2).unwrap().url,
        format!("{}/wiki/Page:Foo.djvu/2", server.uri())
    );
}
