// HTTP tests for the Lab Booking API
// The full router runs against in-memory stores; every request goes through auth and JSON handling

use super::*;
use axum::body::Bytes;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::catalog::ProductKind;
use crate::coupons::DiscountKind;
use crate::payments::webhook::{sign, SIGNATURE_HEADER};
use crate::testing::{bearer, Fixture, TEST_WEBHOOK_SECRET};

// ============================================================================
// Test Helpers
// ============================================================================

fn server(fx: &Fixture) -> TestServer {
    TestServer::new(create_router(fx.state())).unwrap()
}

fn auth(user: &AuthenticatedUser) -> (HeaderName, HeaderValue) {
    (
        header::AUTHORIZATION,
        HeaderValue::from_str(&bearer(user)).unwrap(),
    )
}

fn amount(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        other => other.to_string().parse().unwrap(),
    }
}

/// One CBC test at 500, offered at 400
fn booking_payload(fx: &Fixture) -> Value {
    let test_id = fx
        .catalog
        .add(ProductKind::LabTest, "CBC", Some(dec!(500)), Some(dec!(400)));
    json!({
        "items": [{ "product_type": "lab_test", "product_id": test_id, "patient": Uuid::new_v4() }],
        "base_total": 500,
        "offer_total": 400,
        "final_amount": 400
    })
}

async fn create_booking(server: &TestServer, fx: &Fixture, user: &AuthenticatedUser) -> Value {
    let (name, value) = auth(user);
    let response = server
        .post("/api/bookings")
        .add_header(name, value)
        .json(&booking_payload(fx))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()
}

// ============================================================================
// Calculation and creation
// ============================================================================

#[tokio::test]
async fn test_calculate_returns_totals_without_persisting() {
    let fx = Fixture::new();
    let server = server(&fx);
    let customer = fx.customer();
    let (name, value) = auth(&customer);

    let response = server
        .post("/api/bookings/calculate")
        .add_header(name, value)
        .json(&booking_payload(&fx))
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(amount(&body["base_total"]), dec!(500));
    assert_eq!(amount(&body["final_amount"]), dec!(400));
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(fx.store.commit_count(), 0);
}

#[tokio::test]
async fn test_calculate_reports_mismatch_details() {
    let fx = Fixture::new();
    let server = server(&fx);
    let customer = fx.customer();
    let (name, value) = auth(&customer);
    let mut payload = booking_payload(&fx);
    payload["final_amount"] = json!(250);

    let response = server
        .post("/api/bookings/calculate")
        .add_header(name, value)
        .json(&payload)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["error_code"], "TOTAL_MISMATCH");
    assert_eq!(body["details"]["field"], "final_amount");
}

#[tokio::test]
async fn test_requests_without_token_are_unauthorized() {
    let fx = Fixture::new();
    let server = server(&fx);

    let response = server
        .post("/api/bookings/calculate")
        .json(&booking_payload(&fx))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_booking_returns_detail() {
    let fx = Fixture::new();
    let server = server(&fx);
    let customer = fx.customer();

    let body = create_booking(&server, &fx, &customer).await;

    assert_eq!(body["status"], "open");
    assert_eq!(body["customer_status"], "registered");
    assert_eq!(body["user_id"], customer.user_id.to_string());
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert!(body["ref_id"].as_str().unwrap().starts_with("dp"));
}

#[tokio::test]
async fn test_unknown_product_type_rejected() {
    let fx = Fixture::new();
    let server = server(&fx);
    let customer = fx.customer();
    let (name, value) = auth(&customer);

    let response = server
        .post("/api/bookings")
        .add_header(name, value)
        .json(&json!({
            "items": [{ "product_type": "vaccine", "product_id": Uuid::new_v4(), "patient": Uuid::new_v4() }],
            "base_total": 0,
            "offer_total": 0,
            "final_amount": 0
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error_code"], "INVALID_PRODUCT_KIND");
}

// ============================================================================
// CRM updates
// ============================================================================

#[tokio::test]
async fn test_crm_update_requires_staff() {
    let fx = Fixture::new();
    let server = server(&fx);
    let customer = fx.customer();
    let booking = create_booking(&server, &fx, &customer).await;
    let (name, value) = auth(&customer);

    let response = server
        .patch(&format!("/api/bookings/{}", booking["id"].as_str().unwrap()))
        .add_header(name, value)
        .json(&json!({ "action_type": "add_remark", "remarks": "let me in" }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_invalid_status_transition_is_bad_request() {
    let fx = Fixture::new();
    let server = server(&fx);
    let customer = fx.customer();
    let staff = fx.staff();
    let booking = create_booking(&server, &fx, &customer).await;
    let (name, value) = auth(&staff);

    let response = server
        .patch(&format!("/api/bookings/{}", booking["id"].as_str().unwrap()))
        .add_header(name, value)
        .json(&json!({
            "action_type": "update_status",
            "remarks": "skip ahead",
            "status": "completed"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["error_code"], "INVALID_TRANSITION");
    assert_eq!(body["details"]["from"], "open");
    assert_eq!(body["details"]["to"], "completed");
}

#[tokio::test]
async fn test_cash_payment_over_http() {
    let fx = Fixture::new();
    let server = server(&fx);
    let customer = fx.customer();
    let staff = fx.staff();
    let booking = create_booking(&server, &fx, &customer).await;
    let id = booking["id"].as_str().unwrap();
    let (name, value) = auth(&staff);

    let response = server
        .patch(&format!("/api/bookings/{}", id))
        .add_header(name, value)
        .json(&json!({
            "action_type": "update_payment",
            "remarks": "collected at door",
            "payment_method": "cash",
            "expected_version": 1
        }))
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["status"], "payment_collected");
    assert_eq!(body["payment_status"], "success");
    assert_eq!(body["version"], 2);
}

#[tokio::test]
async fn test_stale_version_conflicts() {
    let fx = Fixture::new();
    let server = server(&fx);
    let customer = fx.customer();
    let staff = fx.staff();
    let booking = create_booking(&server, &fx, &customer).await;
    let (name, value) = auth(&staff);

    let response = server
        .patch(&format!("/api/bookings/{}", booking["id"].as_str().unwrap()))
        .add_header(name, value)
        .json(&json!({
            "action_type": "add_remark",
            "remarks": "late writer",
            "expected_version": 9
        }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["error_code"], "CONCURRENT_MODIFICATION");
}

#[tokio::test]
async fn test_actions_are_newest_first() {
    let fx = Fixture::new();
    let server = server(&fx);
    let customer = fx.customer();
    let staff = fx.staff();
    let booking = create_booking(&server, &fx, &customer).await;
    let id = booking["id"].as_str().unwrap();

    let (name, value) = auth(&staff);
    server
        .patch(&format!("/api/bookings/{}", id))
        .add_header(name, value)
        .json(&json!({ "action_type": "add_remark", "remarks": "called customer" }))
        .await
        .assert_status_ok();

    let (name, value) = auth(&customer);
    let response = server
        .get(&format!("/api/bookings/{}/actions", id))
        .add_header(name, value)
        .await;

    response.assert_status_ok();
    let actions = response.json::<Vec<Value>>();
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0]["action"], "add_remark");
    assert_eq!(actions[0]["notes"], "called customer");
    assert_eq!(actions[1]["action"], "create");
}

#[tokio::test]
async fn test_client_cancel() {
    let fx = Fixture::new();
    let server = server(&fx);
    let customer = fx.customer();
    let booking = create_booking(&server, &fx, &customer).await;
    let (name, value) = auth(&customer);

    let response = server
        .patch(&format!(
            "/api/client/bookings/{}",
            booking["id"].as_str().unwrap()
        ))
        .add_header(name, value)
        .json(&json!({ "action": "cancel" }))
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["status"], "cancelled");
    assert_eq!(body["customer_status"], "cancelled");
}

// ============================================================================
// Coupons
// ============================================================================

#[tokio::test]
async fn test_coupon_validate_applies_discount() {
    let fx = Fixture::new();
    let server = server(&fx);
    let customer = fx.customer();
    let coupon = fx
        .coupons
        .add_coupon(DiscountKind::Percent, dec!(20), Some(dec!(50)));
    let (name, value) = auth(&customer);

    let response = server
        .post("/api/coupons/validate")
        .add_header(name, value)
        .json(&json!({ "coupon_code": coupon.code.to_lowercase(), "base_total": 500 }))
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["valid"], true);
    assert_eq!(amount(&body["discount"]), dec!(50));
    assert_eq!(amount(&body["final_amount"]), dec!(450));
}

#[tokio::test]
async fn test_coupon_validate_unknown_code_is_invalid() {
    let fx = Fixture::new();
    let server = server(&fx);
    let customer = fx.customer();
    let (name, value) = auth(&customer);

    let response = server
        .post("/api/coupons/validate")
        .add_header(name, value)
        .json(&json!({ "coupon_code": "NOPE", "base_total": 500 }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["valid"], false);
    assert_eq!(amount(&body["discount"]), Decimal::ZERO);
    assert_eq!(amount(&body["final_amount"]), dec!(500));
}

// ============================================================================
// Payment webhook
// ============================================================================

async fn booking_with_payment_link(server: &TestServer, fx: &Fixture) -> String {
    let customer = fx.customer();
    let staff = fx.staff();
    let booking = create_booking(server, fx, &customer).await;
    let id = booking["id"].as_str().unwrap().to_string();
    let (name, value) = auth(&staff);

    server
        .patch(&format!("/api/bookings/{}", id))
        .add_header(name, value)
        .json(&json!({
            "action_type": "update_payment",
            "remarks": "sending link",
            "payment_method": "online"
        }))
        .await
        .assert_status_ok();
    id
}

#[tokio::test]
async fn test_signed_webhook_settles_payment() {
    let fx = Fixture::new();
    let server = server(&fx);
    let id = booking_with_payment_link(&server, &fx).await;
    let body = br#"{"order_id":"plink_1","status":"paid","payment_id":"pay_9"}"#.to_vec();
    let signature = sign(TEST_WEBHOOK_SECRET, &body);

    let response = server
        .post("/api/payments/webhook")
        .add_header(
            HeaderName::from_bytes(SIGNATURE_HEADER.as_bytes()).unwrap(),
            HeaderValue::from_str(&signature).unwrap(),
        )
        .bytes(Bytes::from(body))
        .await;

    response.assert_status_ok();
    let booking = response.json::<Value>();
    assert_eq!(booking["id"], id.as_str());
    assert_eq!(booking["payment_status"], "success");
    assert_eq!(booking["status"], "payment_collected");
}

#[tokio::test]
async fn test_webhook_with_bad_signature_is_forbidden() {
    let fx = Fixture::new();
    let server = server(&fx);
    let id = booking_with_payment_link(&server, &fx).await;
    let body = br#"{"order_id":"plink_1","status":"paid"}"#.to_vec();

    let response = server
        .post("/api/payments/webhook")
        .add_header(
            HeaderName::from_bytes(SIGNATURE_HEADER.as_bytes()).unwrap(),
            HeaderValue::from_static("deadbeef"),
        )
        .bytes(Bytes::from(body))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let stored = fx.store.booking(id.parse().unwrap()).unwrap();
    assert_eq!(stored.payment_status, crate::bookings::PaymentStatus::Initiated);
}

#[tokio::test]
async fn test_webhook_without_configured_secret_is_forbidden() {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let fx = Fixture::new();
    let mut state = fx.state();
    state.payment_webhook_secret = None;
    let body = br#"{"order_id":"plink_1","status":"paid"}"#.to_vec();

    let response = create_router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/payments/webhook")
                .header(SIGNATURE_HEADER, sign(TEST_WEBHOOK_SECRET, &body))
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ============================================================================
// OpenAPI
// ============================================================================

#[tokio::test]
async fn test_openapi_document_lists_booking_paths() {
    let fx = Fixture::new();
    let server = server(&fx);

    let response = server.get("/api-docs/openapi.json").await;

    response.assert_status_ok();
    let doc = response.json::<Value>();
    assert!(doc["paths"]["/api/bookings"].is_object());
    assert!(doc["paths"]["/api/payments/webhook"].is_object());
    assert!(doc["components"]["securitySchemes"]["bearer_auth"].is_object());
}
