//! Integration tests for `ListingsClient` over the real `reqwest` transport.
//!
//! Each test stands up a local `wiremock` server, so no real network traffic
//! is made. Retry tests use millisecond back-off so they finish quickly.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use agrilink_client::{ErrorKind, ListingsClient, ListingsQuery, ReqwestTransport, RetryPolicy};
use agrilink_core::{ListingDraft, ProductImage};
use rust_decimal::Decimal;

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        base_delay: Duration::from_millis(1),
        rate_limit_base_delay: Duration::from_millis(1),
        server_error_base_delay: Duration::from_millis(1),
        timeout_base_delay: Duration::from_millis(1),
        max_jitter_fraction: 0.0,
        ..RetryPolicy::default()
    }
}

/// Client against `server` with a bearer token and millisecond back-off.
fn test_client(server: &MockServer) -> ListingsClient {
    let transport = ReqwestTransport::new(
        &format!("{}/api/v1", server.uri()),
        Some("test-token".to_owned()),
        5,
        "agrilink-test/0.1",
    )
    .expect("failed to build test transport");
    ListingsClient::new(transport).with_retry_policy(fast_retry())
}

fn draft() -> ListingDraft {
    ListingDraft {
        name: "Fresh Tomatoes".to_owned(),
        description: "Ripe plum tomatoes picked this morning.".to_owned(),
        category: "vegetables".to_owned(),
        unit_price: Some(Decimal::from(2500)),
        unit_of_measurement: "crate".to_owned(),
        quantity_available: Some(40),
        minimum_order_quantity: Some(1),
        farm_address: "64f1c2a9b3e4d5f6a7b8c9d0".to_owned(),
        images: vec![ProductImage {
            url: "https://cdn.agrilink.test/tomatoes.jpg".to_owned(),
            filename: "tomatoes.jpg".to_owned(),
            alt: None,
            is_primary: false,
        }],
        ..ListingDraft::default()
    }
}

fn listing_json(id: &str) -> serde_json::Value {
    json!({
        "_id": id,
        "farmerId": "farmer_1",
        "produceName": "Fresh Tomatoes",
        "category": "vegetables",
        "unitPrice": 2500,
        "unitOfMeasurement": "crate",
        "quantityAvailable": 40,
        "status": "active",
        "images": [{ "url": "https://cdn.agrilink.test/tomatoes.jpg", "isPrimary": true }],
        "createdAt": "2026-05-01T09:00:00Z"
    })
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_listing_sends_bearer_token_and_normalizes_nested_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/listings"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(json!({ "produceName": "Fresh Tomatoes" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(&json!({
            "success": true,
            "data": { "data": listing_json("lst_100") }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let listing = test_client(&server)
        .create_listing(&draft())
        .await
        .expect("create should succeed");

    assert_eq!(listing.id, "lst_100");
    assert_eq!(listing.farmer_id, "farmer_1");
    assert_eq!(listing.primary_image().unwrap().url, "https://cdn.agrilink.test/tomatoes.jpg");
}

#[tokio::test]
async fn invalid_draft_never_reaches_the_server() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let draft = ListingDraft {
        unit_price: Some(Decimal::ZERO),
        ..draft()
    };
    let err = test_client(&server).create_listing(&draft).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.field_errors().unwrap().contains_key("unitPrice"));
}

#[tokio::test]
async fn server_field_errors_are_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/listings"))
        .respond_with(ResponseTemplate::new(422).set_body_json(&json!({
            "success": false,
            "errors": { "unitPrice": ["Price exceeds regional cap"] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = test_client(&server).create_listing(&draft()).await.unwrap_err();

    assert_eq!(err.status(), 422);
    assert_eq!(err.kind(), ErrorKind::Client);
    assert_eq!(
        err.field_errors().unwrap()["unitPrice"],
        ["Price exceeds regional cap"]
    );
    assert_eq!(err.user_message(), "Validation failed with 1 error(s)");
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_listing_accepts_flat_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/listings/lst_7"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(&json!({ "success": true, "data": listing_json("lst_7") })),
        )
        .mount(&server)
        .await;

    let listing = test_client(&server).get_listing("lst_7").await.unwrap();
    assert_eq!(listing.id, "lst_7");
    assert_eq!(listing.quantity_available, 40);
}

#[tokio::test]
async fn not_found_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/listings/missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(&json!({ "message": "Listing not found" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = test_client(&server).get_listing("missing").await.unwrap_err();
    assert_eq!(err.status(), 404);
    assert_eq!(err.user_message(), "Listing not found");
}

#[tokio::test]
async fn server_error_is_retried_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/listings/lst_9"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/listings/lst_9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&listing_json("lst_9")))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let listing = client.get_listing("lst_9").await.unwrap();

    assert_eq!(listing.id, "lst_9");
    assert_eq!(client.log().error_entries().len(), 2);
}

#[tokio::test]
async fn list_listings_forwards_filters_and_reads_pagination() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/listings"))
        .and(query_param("page", "3"))
        .and(query_param("limit", "2"))
        .and(query_param("search", "tomato"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "success": true,
            "data": {
                "listings": [listing_json("a"), listing_json("b")],
                "pagination": { "currentPage": 3, "perPage": 2, "total": 9, "lastPage": 5 }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let query = ListingsQuery {
        search: Some("tomato".to_owned()),
        ..ListingsQuery::default()
    }
    .page(3, 2);
    let page = test_client(&server).list_listings(&query).await.unwrap();

    assert_eq!(page.listings.len(), 2);
    let pagination = page.pagination.unwrap();
    assert_eq!(pagination.page, 3);
    assert_eq!(pagination.total, 9);
    assert_eq!(pagination.total_pages, 5);
}

// ---------------------------------------------------------------------------
// Delete and health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_listing_accepts_empty_body() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/v1/listings/lst_3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    test_client(&server).delete_listing("lst_3").await.unwrap();
}

#[tokio::test]
async fn health_check_reports_reachability_without_retrying() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/listings"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    assert!(!test_client(&server).health_check().await);
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let transport =
        ReqwestTransport::new("http://127.0.0.1:9/api", None, 1, "agrilink-test/0.1").unwrap();
    let client = ListingsClient::new(transport).with_retry_policy(RetryPolicy::no_retry());

    let err = client.get_listing("lst_1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(err.status(), 0);
}
