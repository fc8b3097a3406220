//! End-to-end tests for the webhook route against in-memory storage.

use analytics_axum::{SIGNATURE_HEADER, WebhookState, webhook_routes};
use analytics_webhooks::{
    AnalyticsWebhookService, HmacValidator, InMemoryAnalyticsStorage, RateLimit,
    WebhookRateLimiter,
};
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const SECRET: &str = "test-secret";
const SCENARIO_BODY: &str = r#"{"eventType":"x","timestamp":1700000000,"data":{"requestId":"req_1","query":"q","timestamp":1700000000}}"#;

struct TestApp {
    router: Router,
    storage: Arc<InMemoryAnalyticsStorage>,
}

fn test_app(rate_limit: Option<RateLimit>) -> TestApp {
    let storage = Arc::new(InMemoryAnalyticsStorage::new());
    let service = AnalyticsWebhookService::new(Arc::new(HmacValidator::new(SECRET)), storage.clone());

    let mut state = WebhookState::new(Arc::new(service));
    if let Some(limit) = rate_limit {
        state = state.with_rate_limiter(Arc::new(WebhookRateLimiter::with_limit(limit)));
    }

    TestApp {
        router: webhook_routes("/webhook", state),
        storage,
    }
}

fn signed_request(body: &str) -> Request<Body> {
    let signature = HmacValidator::new(SECRET).sign_header(body.as_bytes());
    Request::builder()
        .method(Method::POST)
        .uri("/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

mod scenarios {
    use super::*;

    #[tokio::test]
    async fn a_valid_delivery_is_stored() {
        let app = test_app(None);

        let response = app.router.oneshot(signed_request(SCENARIO_BODY)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(body_string(response).await, r#"{"success":true,"status":"ok"}"#);

        assert_eq!(app.storage.write_count(), 1);
        let doc = app.storage.get("req_1").await.unwrap();
        assert_eq!(doc.record.query, "q");
        assert_eq!(doc.record.timestamp, 1700000000);
        assert!(doc.received_at > 0);
    }

    #[tokio::test]
    async fn b_missing_signature_header_is_bad_request() {
        let app = test_app(None);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/webhook")
            .body(Body::from(SCENARIO_BODY))
            .unwrap();

        let response = app.router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(app.storage.write_count(), 0);
    }

    #[tokio::test]
    async fn c_wrong_method_is_not_allowed() {
        let app = test_app(None);
        let request = Request::builder()
            .method(Method::GET)
            .uri("/webhook")
            .body(Body::empty())
            .unwrap();

        let response = app.router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(app.storage.write_count(), 0);
    }

    #[tokio::test]
    async fn d_empty_request_id_is_unauthorized() {
        let app = test_app(None);
        let body = r#"{"eventType":"x","timestamp":1700000000,"data":{"requestId":"","query":"q","timestamp":1700000000}}"#;

        let response = app.router.oneshot(signed_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(app.storage.write_count(), 0);
    }

    #[tokio::test]
    async fn e_wrong_signature_is_unauthorized() {
        let app = test_app(None);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/webhook")
            .header(SIGNATURE_HEADER, "sha256=0000")
            .body(Body::from(SCENARIO_BODY))
            .unwrap();

        let response = app.router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_string(response).await, "Failed to process webhook");
        assert_eq!(app.storage.write_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn f_burst_over_capacity_is_rate_limited_until_refill() {
        let app = test_app(Some(RateLimit {
            requests_per_second: 1,
            burst: 3,
        }));

        for _ in 0..3 {
            let response = app.router.clone().oneshot(signed_request(SCENARIO_BODY)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        for _ in 0..2 {
            let response = app.router.clone().oneshot(signed_request(SCENARIO_BODY)).await.unwrap();
            assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
            assert_eq!(response.headers()[header::RETRY_AFTER], "1");
            assert_eq!(response.headers()["x-ratelimit-retry-after"], "1");
        }
        assert_eq!(app.storage.write_count(), 3);

        tokio::time::advance(Duration::from_secs(1)).await;

        let response = app.router.oneshot(signed_request(SCENARIO_BODY)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(app.storage.write_count(), 4);
        assert_eq!(app.storage.len().await, 1);
    }
}

#[tokio::test]
async fn bare_hex_signature_is_accepted() {
    let app = test_app(None);
    let signature = HmacValidator::new(SECRET).sign(SCENARIO_BODY.as_bytes());
    let request = Request::builder()
        .method(Method::POST)
        .uri("/webhook")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(SCENARIO_BODY))
        .unwrap();

    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_json_is_unauthorized() {
    let app = test_app(None);

    let response = app.router.oneshot(signed_request("{not json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.storage.write_count(), 0);
}

#[tokio::test]
async fn storage_failure_is_unauthorized() {
    let app = test_app(None);
    app.storage.fail_writes(true);

    let response = app.router.oneshot(signed_request(SCENARIO_BODY)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn oversized_body_is_bad_request() {
    let storage = Arc::new(InMemoryAnalyticsStorage::new());
    let service = AnalyticsWebhookService::new(Arc::new(HmacValidator::new(SECRET)), storage.clone());
    let router: Router = webhook_routes(
        "/webhook",
        WebhookState::new(Arc::new(service)).with_max_body_bytes(16),
    );

    let response = router.oneshot(signed_request(SCENARIO_BODY)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(storage.write_count(), 0);
}

#[tokio::test]
async fn redelivery_overwrites_single_document() {
    let app = test_app(None);
    let second = r#"{"eventType":"x","timestamp":1700000100,"data":{"requestId":"req_1","query":"updated","timestamp":1700000100}}"#;

    let first = app.router.clone().oneshot(signed_request(SCENARIO_BODY)).await.unwrap();
    let again = app.router.oneshot(signed_request(second)).await.unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(again.status(), StatusCode::OK);
    assert_eq!(app.storage.len().await, 1);
    assert_eq!(app.storage.get("req_1").await.unwrap().record.query, "updated");
}

#[tokio::test]
async fn wrong_method_does_not_consume_tokens() {
    let app = test_app(Some(RateLimit {
        requests_per_second: 1,
        burst: 1,
    }));
    let get = Request::builder()
        .method(Method::GET)
        .uri("/webhook")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(get).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let response = app.router.oneshot(signed_request(SCENARIO_BODY)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn rate_limit_applies_before_signature_check() {
    let app = test_app(Some(RateLimit {
        requests_per_second: 1,
        burst: 1,
    }));
    let unsigned = || {
        Request::builder()
            .method(Method::POST)
            .uri("/webhook")
            .body(Body::from(SCENARIO_BODY))
            .unwrap()
    };

    let response = app.router.clone().oneshot(unsigned()).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.router.oneshot(unsigned()).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}
