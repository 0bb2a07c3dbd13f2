use std::time::Duration;

use mockito::{Matcher, Mock, Server, ServerGuard};
use pretty_assertions::assert_eq;
use tempfile::{tempdir, TempDir};
use wp_reference_client::{
    types::{DocumentKind, ReferencePage, ResultKind},
    ClientConfig, Filter, ReferenceClient,
};
use wp_reference_core::{ReferenceError, ReferenceService};

const PAGE_ONE: &str = include_str!("fixtures/search_page_1.html");
const PAGE_LAST: &str = include_str!("fixtures/search_page_last.html");
const NOT_FOUND: &str = include_str!("fixtures/search_not_found.html");
const FUNCTION_PAGE: &str = include_str!("fixtures/document_function.html");
const METHOD_PAGE: &str = include_str!("fixtures/document_method.html");

struct Harness {
    server: ServerGuard,
    service: ReferenceService,
    _cache: TempDir,
}

async fn harness(max_pages: u32, max_cache_entries: usize) -> Harness {
    let server = Server::new_async().await;
    let cache = tempdir().expect("tempdir");
    let client = ReferenceClient::with_config(ClientConfig {
        base_url: server.url(),
        cache_dir: cache.path().join("reference"),
        request_timeout: Duration::from_secs(5),
    })
    .expect("client");
    Harness {
        server,
        service: ReferenceService::new(client, max_pages, max_cache_entries),
        _cache: cache,
    }
}

/// Points fixture links at the mock server.
fn localize(html: &str, server: &ServerGuard) -> String {
    html.replace("https://developer.wordpress.org", &server.url())
}

/// Unregistered mock for one `?s=absint&paged=N` results page.
fn results_page(server: &mut ServerGuard, paged: &str, status: usize, body: &str) -> Mock {
    server
        .mock("GET", "/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("s".into(), "absint".into()),
            Matcher::UrlEncoded("paged".into(), paged.into()),
        ]))
        .with_status(status)
        .with_header("content-type", "text/html; charset=UTF-8")
        .with_body(body)
}

fn result_count(page: &ReferencePage) -> usize {
    match page {
        ReferencePage::Listing(listing) => listing.len(),
        ReferencePage::Document(_) => 1,
    }
}

#[tokio::test]
async fn merges_pages_until_last_page() {
    let mut h = harness(5, 1000).await;
    let page_one = results_page(&mut h.server, "1", 200, PAGE_ONE)
        .create_async()
        .await;
    let page_two = results_page(&mut h.server, "2", 200, PAGE_LAST)
        .create_async()
        .await;
    let page_three = results_page(&mut h.server, "3", 200, PAGE_ONE)
        .expect(0)
        .create_async()
        .await;

    let page = h.service.search("absint", &[]).await.unwrap();

    let ReferencePage::Listing(listing) = page else {
        panic!("expected a listing");
    };
    assert_eq!(listing.len(), 3);
    let titles: Vec<_> = listing.iter().map(|(index, item)| (index, item.title.as_str())).collect();
    assert_eq!(
        titles,
        vec![(1, "absint()"), (2, "absint_value"), (3, "WP_Absint_List")]
    );
    assert_eq!(listing.get(2).map(|item| item.kind), Some(ResultKind::Hook));
    assert_eq!(listing.get(3).map(|item| item.kind), Some(ResultKind::Class));

    page_one.assert_async().await;
    page_two.assert_async().await;
    page_three.assert_async().await;
}

#[tokio::test]
async fn stops_at_page_limit() {
    let mut h = harness(2, 1000).await;
    let _page_one = results_page(&mut h.server, "1", 200, PAGE_ONE)
        .create_async()
        .await;
    let page_two = results_page(&mut h.server, "2", 200, PAGE_ONE)
        .create_async()
        .await;
    let page_three = results_page(&mut h.server, "3", 200, PAGE_LAST)
        .expect(0)
        .create_async()
        .await;

    let page = h.service.search("absint", &[]).await.unwrap();

    assert_eq!(result_count(&page), 4);
    page_two.assert_async().await;
    page_three.assert_async().await;
}

#[tokio::test]
async fn skips_unavailable_pages() {
    let mut h = harness(5, 1000).await;
    let _page_one = results_page(&mut h.server, "1", 200, PAGE_ONE)
        .create_async()
        .await;
    let page_two = results_page(&mut h.server, "2", 500, "oops")
        .create_async()
        .await;
    let page_three = results_page(&mut h.server, "3", 200, PAGE_LAST)
        .create_async()
        .await;

    let page = h.service.search("absint", &[]).await.unwrap();

    assert_eq!(result_count(&page), 3);
    page_two.assert_async().await;
    page_three.assert_async().await;
}

#[tokio::test]
async fn not_found_page_reports_not_found() {
    let mut h = harness(5, 1000).await;
    let _page_one = results_page(&mut h.server, "1", 200, NOT_FOUND)
        .create_async()
        .await;

    let error = h.service.search("absint", &[]).await.unwrap_err();

    assert!(matches!(error, ReferenceError::NotFound), "{error:?}");
    assert_eq!(h.service.client().disk_cache().len().await.unwrap(), 0);
    assert!(!h.service.client().last_results().exists().await);
}

#[tokio::test]
async fn server_error_is_connectivity_failure() {
    let mut h = harness(5, 1000).await;
    let _page_one = results_page(&mut h.server, "1", 503, "unavailable")
        .create_async()
        .await;

    let error = h.service.search("absint", &[]).await.unwrap_err();

    assert!(matches!(error, ReferenceError::Connectivity(_)), "{error:?}");
}

#[tokio::test]
async fn empty_keyword_is_rejected_before_any_request() {
    let h = harness(5, 1000).await;
    let error = h.service.search(" -_- ", &[]).await.unwrap_err();
    assert!(matches!(error, ReferenceError::EmptyKeyword));
    assert_eq!(
        error.to_string(),
        "Please enter search keyword. e.g : 'wp-reference absint'."
    );
}

#[tokio::test]
async fn redirected_search_yields_document() {
    let mut h = harness(5, 1000).await;
    let _redirect = h
        .server
        .mock("GET", "/")
        .match_query(Matcher::UrlEncoded("s".into(), "absint".into()))
        .with_status(301)
        .with_header("location", "/reference/functions/absint/")
        .create_async()
        .await;
    let _document = h
        .server
        .mock("GET", "/reference/functions/absint/")
        .with_status(200)
        .with_body(FUNCTION_PAGE)
        .create_async()
        .await;

    let page = h.service.search("absint", &[]).await.unwrap();

    let ReferencePage::Document(document) = page else {
        panic!("expected a document");
    };
    let expected_url = format!("{}/reference/functions/absint/", h.server.url());
    assert_eq!(document.kind, DocumentKind::Function);
    assert_eq!(document.page_url, expected_url);
    assert_eq!(document.structure, "absint( mixed $maybeint )");

    let index = h.service.client().last_results().load().await.expect("index");
    assert_eq!(index.single(), Some(expected_url.as_str()));
}

#[tokio::test]
async fn uncacheable_search_still_returns_results() {
    let mut h = harness(5, 1000).await;
    let term = "a".repeat(200);
    let _page_one = h
        .server
        .mock("GET", "/")
        .match_query(Matcher::UrlEncoded("s".into(), term.clone()))
        .with_status(200)
        .with_body(PAGE_LAST)
        .create_async()
        .await;

    // The snapshot file name outgrows the file system limit.
    let page = h.service.search(&term, &[]).await.unwrap();

    assert_eq!(result_count(&page), 1);
    assert!(matches!(page, ReferencePage::Listing(_)));
    let index = h.service.client().last_results().load().await.expect("index");
    assert_eq!(
        index.get(1),
        Some("https://developer.wordpress.org/reference/classes/wp_absint_list/")
    );
}

#[tokio::test]
async fn second_search_is_served_from_cache() {
    let mut h = harness(5, 1000).await;
    let page_one = results_page(&mut h.server, "1", 200, PAGE_LAST)
        .expect(1)
        .create_async()
        .await;

    let first = h.service.search("absint", &[]).await.unwrap();
    let second = h.service.search("absint", &[]).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(h.service.client().disk_cache().len().await.unwrap(), 1);
    page_one.assert_async().await;
}

#[tokio::test]
async fn filters_change_the_cache_key() {
    let mut h = harness(5, 1000).await;
    let page_one = results_page(&mut h.server, "1", 200, PAGE_LAST)
        .expect(2)
        .create_async()
        .await;

    h.service.search("absint", &[]).await.unwrap();
    h.service.search("absint", &[Filter::Hook]).await.unwrap();

    assert_eq!(h.service.client().disk_cache().len().await.unwrap(), 2);
    page_one.assert_async().await;
}

#[tokio::test]
async fn select_without_history_fails() {
    let h = harness(5, 1000).await;
    let error = h.service.select_by_id(1).await.unwrap_err();
    assert!(matches!(error, ReferenceError::EmptyHistory));
}

#[tokio::test]
async fn select_opens_listed_document() {
    let mut h = harness(5, 1000).await;
    let listing = localize(PAGE_LAST, &h.server);
    let _page_one = results_page(&mut h.server, "1", 200, &listing)
        .create_async()
        .await;
    let document_mock = h
        .server
        .mock("GET", "/reference/classes/wp_absint_list/")
        .with_status(200)
        .with_body(METHOD_PAGE)
        .expect(1)
        .create_async()
        .await;

    h.service.search("absint", &[]).await.unwrap();
    assert!(h.service.select_by_id(7).await.unwrap().is_none());

    let page = h.service.select_by_id(1).await.unwrap().expect("document");
    let ReferencePage::Document(document) = page else {
        panic!("expected a document");
    };
    assert_eq!(document.kind, DocumentKind::Class);
    assert!(document.parameters.is_some());

    // The document replaced the listing in the index; a repeat is a cache hit.
    let index = h.service.client().last_results().load().await.expect("index");
    assert_eq!(index.len(), 1);
    h.service.select_by_id(1).await.unwrap().expect("cached document");
    document_mock.assert_async().await;
}

#[tokio::test]
async fn prune_keeps_cache_within_limit() {
    let mut h = harness(5, 1).await;
    let listing = localize(PAGE_LAST, &h.server);
    let _page_one = results_page(&mut h.server, "1", 200, &listing)
        .create_async()
        .await;
    let _document = h
        .server
        .mock("GET", "/reference/classes/wp_absint_list/")
        .with_status(200)
        .with_body(METHOD_PAGE)
        .create_async()
        .await;

    h.service.search("absint", &[]).await.unwrap();
    h.service.select_by_id(1).await.unwrap().expect("document");

    let cache = h.service.client().disk_cache();
    assert_eq!(cache.len().await.unwrap(), 1);
    assert!(h.service.client().last_results().exists().await);
}

#[tokio::test]
async fn browser_target_consumes_single_document() {
    let mut h = harness(5, 1000).await;
    let home = format!("{}/reference/", h.server.url());
    assert_eq!(h.service.browser_target().await.unwrap(), home);

    let listing = localize(PAGE_ONE, &h.server);
    let _page_one = results_page(&mut h.server, "1", 200, &listing)
        .create_async()
        .await;
    let _page_two = results_page(&mut h.server, "2", 200, PAGE_LAST)
        .create_async()
        .await;
    h.service.search("absint", &[]).await.unwrap();
    assert_eq!(h.service.browser_target().await.unwrap(), home);

    let _document = h
        .server
        .mock("GET", "/reference/functions/absint/")
        .with_status(200)
        .with_body(FUNCTION_PAGE)
        .create_async()
        .await;
    h.service.select_by_id(1).await.unwrap().expect("document");

    let target = h.service.browser_target().await.unwrap();
    assert_eq!(target, format!("{}/reference/functions/absint/", h.server.url()));
    assert!(!h.service.client().last_results().exists().await);
    assert_eq!(h.service.browser_target().await.unwrap(), home);
}

#[tokio::test]
async fn clear_cache_removes_snapshots_and_history() {
    let mut h = harness(5, 1000).await;
    let _page_one = results_page(&mut h.server, "1", 200, PAGE_LAST)
        .create_async()
        .await;
    h.service.search("absint", &[]).await.unwrap();

    let status = h.service.cache_status().await.unwrap();
    assert_eq!(status.entries, 1);
    assert!(status.has_last_results);

    h.service.clear_cache().await.unwrap();

    let status = h.service.cache_status().await.unwrap();
    assert!(!status.exists);
    assert_eq!(status.entries, 0);
    assert!(!status.has_last_results);
}
