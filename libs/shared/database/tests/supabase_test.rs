use reqwest::Method;
use serde_json::{json, Value};
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{header, method, path, query_param};

use shared_database::supabase::{is_conflict, SupabaseClient, SupabaseError};
use shared_utils::test_utils::TestConfig;

fn client_for(server: &MockServer) -> SupabaseClient {
    let config = TestConfig {
        supabase_url: server.uri(),
        ..TestConfig::default()
    };
    SupabaseClient::new(&config.to_app_config())
}

#[tokio::test]
async fn test_get_sends_api_key_and_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .and(query_param("is_active", "eq.true"))
        .and(header("apikey", "test-anon-key"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let rows: Vec<Value> = client
        .request(Method::GET, "/rest/v1/services?is_active=eq.true", Some("test-token"), None)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_unique_violation_is_reported_as_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(header("prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"appointments_active_slot_idx\""
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result: anyhow::Result<Vec<Value>> = client
        .request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            None,
            Some(json!({"status": "pending"})),
            Some(SupabaseClient::representation_headers()),
        )
        .await;

    let err = result.unwrap_err();
    assert!(is_conflict(&err));
}

#[tokio::test]
async fn test_server_error_is_not_a_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .request::<Vec<Value>>(Method::GET, "/rest/v1/appointments", None, None)
        .await
        .unwrap_err();

    assert!(!is_conflict(&err));
    assert_eq!(
        err.downcast_ref::<SupabaseError>(),
        Some(&SupabaseError::Api { status: 503, message: "unavailable".to_string() })
    );
}

#[tokio::test]
async fn test_empty_body_deserializes_as_null() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/blocked_slots"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let value: Value = client
        .request(Method::DELETE, "/rest/v1/blocked_slots?id=eq.1", None, None)
        .await
        .unwrap();

    assert!(value.is_null());
}
