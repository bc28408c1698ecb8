//! Integration tests for debounced infinite scroll.
//!
//! Mock expectations on the page-2 listing request are the real
//! assertions: they count how many fetches the watcher actually caused.

use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use diplostore_integration_tests::{catalog_client, init_tracing, stories_body, story_json};
use diplostore_storefront::catalog::CatalogClient;
use diplostore_storefront::scroll::ScrollWatcher;

const DEBOUNCE: Duration = Duration::from_millis(50);

/// Give an armed debounce task comfortably enough time to fire.
const SETTLE: Duration = Duration::from_millis(300);

async fn mount_page(server: &MockServer, page: &str, stories: &[serde_json::Value], total: u64) {
    Mock::given(method("GET"))
        .and(path("/stories"))
        .and(query_param("page", page))
        .respond_with(ResponseTemplate::new(200).set_body_json(stories_body(stories, total)))
        .mount(server)
        .await;
}

/// A catalog with page 1 applied and more pages remaining.
async fn primed_catalog(server: &MockServer) -> CatalogClient {
    let page_one = [
        story_json(1, "a", "A", "1.00", "misc"),
        story_json(2, "b", "B", "2.00", "misc"),
    ];
    mount_page(server, "1", &page_one, 4).await;

    let client = catalog_client(&server.uri(), 2);
    client.fetch_page(1).await.expect("page 1 loads");
    assert!(client.has_more());
    client
}

#[tokio::test]
async fn rapid_sentinel_events_fetch_one_page() {
    init_tracing();
    let server = MockServer::start().await;
    let client = primed_catalog(&server).await;

    let page_two = [story_json(3, "c", "C", "3.00", "misc")];
    Mock::given(method("GET"))
        .and(path("/stories"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stories_body(&page_two, 4)))
        .expect(1)
        .mount(&server)
        .await;

    let watcher = ScrollWatcher::with_debounce(client.clone(), DEBOUNCE);
    watcher.attach();

    // The viewport spams events as the sentinel scrolls into view.
    watcher.sentinel_visible();
    watcher.sentinel_visible();
    watcher.sentinel_visible();

    tokio::time::sleep(SETTLE).await;

    assert_eq!(client.current_page(), 2);
    assert_eq!(client.products().len(), 3);
}

#[tokio::test]
async fn disconnect_before_the_delay_prevents_the_fetch() {
    let server = MockServer::start().await;
    let client = primed_catalog(&server).await;

    Mock::given(method("GET"))
        .and(path("/stories"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stories_body(&[], 4)))
        .expect(0)
        .mount(&server)
        .await;

    let watcher = ScrollWatcher::with_debounce(client.clone(), DEBOUNCE);
    watcher.attach();
    watcher.sentinel_visible();
    watcher.disconnect();

    tokio::time::sleep(SETTLE).await;

    assert_eq!(client.current_page(), 1);
}

#[tokio::test]
async fn exhausted_listing_ignores_the_sentinel() {
    let server = MockServer::start().await;
    let page_one = [
        story_json(1, "a", "A", "1.00", "misc"),
        story_json(2, "b", "B", "2.00", "misc"),
    ];
    // Everything fits on page 1.
    mount_page(&server, "1", &page_one, 2).await;

    Mock::given(method("GET"))
        .and(path("/stories"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stories_body(&[], 2)))
        .expect(0)
        .mount(&server)
        .await;

    let client = catalog_client(&server.uri(), 2);
    client.fetch_page(1).await.expect("page 1 loads");
    assert!(!client.has_more());

    let watcher = ScrollWatcher::with_debounce(client, DEBOUNCE);
    watcher.attach();
    watcher.sentinel_visible();

    tokio::time::sleep(SETTLE).await;
}

#[tokio::test]
async fn a_new_sentinel_after_the_fetch_pages_again() {
    let server = MockServer::start().await;
    let client = primed_catalog(&server).await;

    let page_two = [story_json(3, "c", "C", "3.00", "misc")];
    let page_three = [story_json(4, "d", "D", "4.00", "misc")];
    mount_page(&server, "2", &page_two, 4).await;
    mount_page(&server, "3", &page_three, 4).await;

    let watcher = ScrollWatcher::with_debounce(client.clone(), DEBOUNCE);
    watcher.attach();

    watcher.sentinel_visible();
    tokio::time::sleep(SETTLE).await;
    assert_eq!(client.current_page(), 2);

    watcher.sentinel_visible();
    tokio::time::sleep(SETTLE).await;
    assert_eq!(client.current_page(), 3);

    assert_eq!(client.products().len(), 4);
    assert!(!client.has_more());
}
