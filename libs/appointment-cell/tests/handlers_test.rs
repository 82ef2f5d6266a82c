use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use serde_json::{json, Value};
use tower::ServiceExt;

use appointment_cell::router::{appointment_routes, blocked_slot_routes, settings_routes};
use appointment_cell::services::InMemorySchedulingStore;
use appointment_cell::AppState;
use patient_cell::InMemoryPatientDirectory;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn create_app(config: &TestConfig) -> Router {
    let state = Arc::new(AppState::with_backends(
        config.to_app_config(),
        Arc::new(InMemorySchedulingStore::with_default_catalog()),
        Arc::new(InMemoryPatientDirectory::new()),
    ));

    Router::new()
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/blocked-slots", blocked_slot_routes(state.clone()))
        .nest("/settings", settings_routes(state))
}

// Two days out keeps the slot clear of the lead time; Sundays are skipped
fn bookable_date() -> NaiveDate {
    let date = Utc::now().date_naive() + Duration::days(2);
    if date.weekday() == Weekday::Sun {
        date + Duration::days(1)
    } else {
        date
    }
}

fn booking_body(date: NaiveDate, time: &str) -> Value {
    json!({
        "service_type": "gastro_consultation",
        "date": date.format("%Y-%m-%d").to_string(),
        "time": time,
        "reason": "Recurring abdominal pain",
        "patient_data": {
            "first_name": "Ana",
            "last_name": "Torres",
            "birth_date": "1985-04-12",
            "phone": "3312345678"
        }
    })
}

fn json_request(method: &str, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(bearer) = bearer {
        builder = builder.header("Authorization", bearer);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_available_slots_requires_both_parameters() {
    let config = TestConfig::default();
    let app = create_app(&config);

    let (status, _) = send(&app, json_request("GET", "/appointments/available-slots?service=endoscopy", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_available_slots_rejects_unknown_service() {
    let config = TestConfig::default();
    let app = create_app(&config);
    let uri = format!("/appointments/available-slots?date={}&service=dentistry", bookable_date());

    let (status, body) = send(&app, json_request("GET", &uri, None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("dentistry"));
}

#[tokio::test]
async fn test_available_slots_for_past_date_is_empty_with_reason() {
    let config = TestConfig::default();
    let app = create_app(&config);

    let (status, body) = send(
        &app,
        json_request("GET", "/appointments/available-slots?date=2000-01-03&service=endoscopy", None, None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["message"], "past date");
}

#[tokio::test]
async fn test_available_slots_lists_times() {
    let config = TestConfig::default();
    let app = create_app(&config);
    let uri = format!("/appointments/available-slots?date={}&service=gastro_consultation", bookable_date());

    let (status, body) = send(&app, json_request("GET", &uri, None, None)).await;

    assert_eq!(status, StatusCode::OK);
    let slots = body["data"].as_array().unwrap();
    assert!(!slots.is_empty());
    assert!(slots.contains(&json!("12:00")));
}

#[tokio::test]
async fn test_available_dates_skip_sundays() {
    let config = TestConfig::default();
    let app = create_app(&config);

    let (status, body) = send(&app, json_request("GET", "/appointments/available-dates?days=10", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    let dates = body["data"].as_array().unwrap();
    assert_eq!(dates.len(), 10);
    for raw in dates {
        let date = NaiveDate::parse_from_str(raw.as_str().unwrap(), "%Y-%m-%d").unwrap();
        assert_ne!(date.weekday(), Weekday::Sun);
    }
}

#[tokio::test]
async fn test_anonymous_booking_then_conflict() {
    let config = TestConfig::default();
    let app = create_app(&config);
    let date = bookable_date();

    let (status, body) = send(&app, json_request("POST", "/appointments", None, Some(booking_body(date, "12:00")))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "pending");

    let (status, _) = send(&app, json_request("POST", "/appointments", None, Some(booking_body(date, "12:00")))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let uri = format!("/appointments/available-slots?date={}&service=gastro_consultation", date);
    let (_, body) = send(&app, json_request("GET", &uri, None, None)).await;
    assert!(!body["data"].as_array().unwrap().contains(&json!("12:00")));
}

#[tokio::test]
async fn test_booking_with_invalid_token_is_rejected() {
    let config = TestConfig::default();
    let app = create_app(&config);
    let user = TestUser::patient("patient@example.com");
    let bad = format!("Bearer {}", JwtTestUtils::create_invalid_signature_token(&user));

    let (status, _) = send(
        &app,
        json_request("POST", "/appointments", Some(&bad), Some(booking_body(bookable_date(), "12:00"))),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_disabled_mode_blocks_booking() {
    let config = TestConfig::default();
    let app = create_app(&config);
    let admin = JwtTestUtils::bearer(&TestUser::admin("admin@example.com"), &config);

    let (status, body) = send(
        &app,
        json_request("PUT", "/settings/appointment-mode", Some(&admin), Some(json!({ "mode": "disabled" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["mode"], "disabled");

    let (status, body) = send(&app, json_request("GET", "/settings/appointment-mode", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["mode"], "disabled");

    let (status, _) = send(
        &app,
        json_request("POST", "/appointments", None, Some(booking_body(bookable_date(), "12:00"))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_auto_accept_confirms_booking() {
    let config = TestConfig::default();
    let app = create_app(&config);
    let admin = JwtTestUtils::bearer(&TestUser::admin("admin@example.com"), &config);

    send(
        &app,
        json_request("PUT", "/settings/appointment-mode", Some(&admin), Some(json!({ "mode": "auto_accept" }))),
    )
    .await;

    let (status, body) = send(
        &app,
        json_request("POST", "/appointments", None, Some(booking_body(bookable_date(), "11:30"))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "confirmed");
    assert!(body["data"]["confirmed_at"].is_string());
}

#[tokio::test]
async fn test_patients_cannot_change_the_mode() {
    let config = TestConfig::default();
    let app = create_app(&config);
    let patient = JwtTestUtils::bearer(&TestUser::patient("patient@example.com"), &config);

    let (status, _) = send(
        &app,
        json_request("PUT", "/settings/appointment-mode", Some(&patient), Some(json!({ "mode": "disabled" }))),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_blocked_slot_administration() {
    let config = TestConfig::default();
    let app = create_app(&config);
    let admin = JwtTestUtils::bearer(&TestUser::admin("admin@example.com"), &config);
    let date = bookable_date();

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/blocked-slots",
            Some(&admin),
            Some(json!({ "date": date, "is_full_day": true, "reason": "Holiday" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = send(&app, json_request("GET", &format!("/blocked-slots?date={}", date), None, None)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let uri = format!("/appointments/available-slots?date={}&service=colonoscopy", date);
    let (_, body) = send(&app, json_request("GET", &uri, None, None)).await;
    assert_eq!(body["data"], json!([]));

    let (status, _) = send(&app, json_request("DELETE", &format!("/blocked-slots/{}", id), Some(&admin), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, json_request("DELETE", &format!("/blocked-slots/{}", id), Some(&admin), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_partial_block_requires_times() {
    let config = TestConfig::default();
    let app = create_app(&config);
    let admin = JwtTestUtils::bearer(&TestUser::admin("admin@example.com"), &config);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/blocked-slots",
            Some(&admin),
            Some(json!({ "date": bookable_date(), "start_time": "10:00" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_blocking_requires_admin() {
    let config = TestConfig::default();
    let app = create_app(&config);
    let patient = JwtTestUtils::bearer(&TestUser::patient("patient@example.com"), &config);

    let (status, _) = send(
        &app,
        json_request("POST", "/blocked-slots", Some(&patient), Some(json!({ "date": bookable_date(), "is_full_day": true }))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        json_request("POST", "/blocked-slots", None, Some(json!({ "date": bookable_date(), "is_full_day": true }))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_patient_cancels_own_booking_and_slot_reopens() {
    let config = TestConfig::default();
    let app = create_app(&config);
    let user = TestUser::patient("patient@example.com");
    let patient = JwtTestUtils::bearer(&user, &config);
    let other = JwtTestUtils::bearer(&TestUser::patient("other@example.com"), &config);
    let admin = JwtTestUtils::bearer(&TestUser::admin("admin@example.com"), &config);
    let date = bookable_date();

    let (status, body) = send(
        &app,
        json_request("POST", "/appointments", Some(&patient), Some(booking_body(date, "09:00"))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["data"]["id"].as_str().unwrap().to_string();
    let status_uri = format!("/appointments/{}/status", id);

    let (status, _) = send(
        &app,
        json_request("PATCH", &status_uri, Some(&other), Some(json!({ "status": "cancelled" }))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        json_request("PATCH", &status_uri, Some(&patient), Some(json!({ "status": "cancelled" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");

    let (status, _) = send(
        &app,
        json_request("PATCH", &status_uri, Some(&admin), Some(json!({ "status": "confirmed" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, json_request("POST", "/appointments", None, Some(booking_body(date, "09:00")))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_caregiver_cancels_booking_made_for_dependent() {
    let config = TestConfig::default();
    let app = create_app(&config);
    let caregiver = JwtTestUtils::bearer(&TestUser::patient("caregiver@example.com"), &config);

    let mut body = booking_body(bookable_date(), "10:00");
    body["is_caregiver"] = json!(true);
    body["caregiver_data"] = json!({
        "first_name": "Luis",
        "last_name": "Torres",
        "phone": "3398765432",
        "relationship": "son"
    });

    let (status, body) = send(&app, json_request("POST", "/appointments", Some(&caregiver), Some(body))).await;
    assert_eq!(status, StatusCode::OK);
    let status_uri = format!("/appointments/{}/status", body["data"]["id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        json_request("PATCH", &status_uri, Some(&caregiver), Some(json!({ "status": "cancelled" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");
}

#[tokio::test]
async fn test_status_change_requires_authentication() {
    let config = TestConfig::default();
    let app = create_app(&config);

    let (status, _) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/appointments/{}/status", uuid::Uuid::new_v4()),
            None,
            Some(json!({ "status": "cancelled" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
