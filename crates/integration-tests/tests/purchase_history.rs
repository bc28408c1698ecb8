//! Integration tests for the purchase history client.

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use diplostore_core::CurrencyCode;
use diplostore_integration_tests::backend_config;
use diplostore_storefront::services::history::{HistoryClient, HistoryError};

fn client(server_uri: &str) -> HistoryClient {
    HistoryClient::new(&backend_config(server_uri)).expect("history client builds")
}

#[tokio::test]
async fn history_returns_parsed_records() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/purchase-history"))
        .and(body_partial_json(json!({ "token": "tkn-123" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "order_id": "ord_1010",
                "total": "40.00",
                "currency": "USD",
                "status": "paid",
                "created_at": "2024-06-02T09:30:00Z"
            },
            {
                "order_id": "ord_1009",
                "total": "12.50",
                "currency": "USD",
                "status": "refunded",
                "created_at": "2024-05-01T12:00:00Z"
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let token = SecretString::from("tkn-123");
    let records = client(&server.uri())
        .fetch(&token)
        .await
        .expect("history loads");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].order_id, "ord_1010");
    assert_eq!(records[0].total, Decimal::new(4000, 2));
    assert_eq!(records[0].currency, CurrencyCode::USD);
    assert_eq!(records[0].status, "paid");
    assert_eq!(records[1].order_id, "ord_1009");
}

#[tokio::test]
async fn stale_token_reads_as_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/purchase-history"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .mount(&server)
        .await;

    let token = SecretString::from("tkn-stale");
    let err = client(&server.uri())
        .fetch(&token)
        .await
        .expect_err("401 surfaces");

    assert!(err.is_unauthorized());
    assert!(matches!(err, HistoryError::Api { status: 401, .. }));
}

#[tokio::test]
async fn malformed_history_is_a_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/purchase-history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "orders": "nope" })))
        .mount(&server)
        .await;

    let token = SecretString::from("tkn-123");
    let err = client(&server.uri())
        .fetch(&token)
        .await
        .expect_err("bad shape surfaces");

    assert!(matches!(err, HistoryError::Parse(_)));
    assert!(!err.is_unauthorized());
}
