//! Integration tests for single-product fetches by slug.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use diplostore_core::{ProductId, StockStatus};
use diplostore_integration_tests::catalog_client;
use diplostore_storefront::catalog::{
    CatalogError, PLACEHOLDER_IMAGE, UNCATEGORIZED, UNNAMED_PRODUCT,
};

#[tokio::test]
async fn detail_fetch_normalizes_the_story() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stories/products/worn-tape"))
        .and(query_param("token", "test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "story": {
                "id": 7,
                "slug": "worn-tape",
                "content": {
                    "name": "Worn Tape",
                    "price": "20.00",
                    "regular_price": "20.00",
                    "sale_price": "15.00",
                    "stock_status": "outofstock",
                    "image": { "filename": "https://img.example/tape.jpg" },
                    "category": "music",
                    "description": "A well-loved cassette."
                }
            }
        })))
        .mount(&server)
        .await;

    let client = catalog_client(&server.uri(), 24);
    let product = client.get_product("worn-tape").await.expect("story loads");

    assert_eq!(product.id, ProductId::new(7));
    assert_eq!(product.slug, "worn-tape");
    assert_eq!(product.name, "Worn Tape");
    assert!(product.on_sale());
    assert_eq!(product.effective_price(), "15.00");
    assert_eq!(product.regular_price, "20.00");
    assert_eq!(product.stock_status, StockStatus::OutOfStock);
    assert!(!product.stock_status.is_available());
    assert_eq!(product.image, "https://img.example/tape.jpg");
    assert_eq!(product.description, "A well-loved cassette.");
}

#[tokio::test]
async fn detail_fetches_are_cached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stories/products/worn-tape"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "story": { "id": 7, "slug": "worn-tape", "content": { "name": "Worn Tape" } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = catalog_client(&server.uri(), 24);
    let first = client.get_product("worn-tape").await.expect("network fetch");
    let second = client.get_product("worn-tape").await.expect("cache fetch");

    assert_eq!(first, second);
}

#[tokio::test]
async fn unknown_slug_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stories/products/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_string("story not found"))
        .mount(&server)
        .await;

    let client = catalog_client(&server.uri(), 24);
    let err = client.get_product("ghost").await.expect_err("404 surfaces");

    assert!(matches!(err, CatalogError::NotFound(slug) if slug == "ghost"));
}

#[tokio::test]
async fn missing_content_falls_back_to_placeholders() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stories/products/bare"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "story": { "id": 9, "slug": "bare" }
        })))
        .mount(&server)
        .await;

    let client = catalog_client(&server.uri(), 24);
    let product = client.get_product("bare").await.expect("story loads");

    assert_eq!(product.name, UNNAMED_PRODUCT);
    assert_eq!(product.price, "0");
    assert_eq!(product.regular_price, "0");
    assert!(product.sale_price.is_none());
    assert_eq!(product.stock_status, StockStatus::InStock);
    assert_eq!(product.image, PLACEHOLDER_IMAGE);
    assert_eq!(product.category, UNCATEGORIZED);
    assert!(product.description.is_empty());
}
