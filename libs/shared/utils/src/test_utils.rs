use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use chrono::{Duration, Offset, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::{AppConfig, StoreBackend};
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub scheduling_store: StoreBackend,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            scheduling_store: StoreBackend::Supabase,
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_role_key: "test-service-role-key".to_string(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            clinic_utc_offset: Utc.fix(),
            max_advance_days: 7,
            min_advance_hours: 2,
            min_minutes_between_same_patient: 60,
            scheduling_store: self.scheduling_store,
            bind_addr: "127.0.0.1:0".to_string(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn bearer(user: &TestUser, config: &TestConfig) -> String {
        format!("Bearer {}", Self::create_test_token(user, &config.jwt_secret, Some(1)))
    }
}

/// Canned PostgREST rows shaped like the tables in `migrations/`.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn service_response(id: &str, service_type: &str, category: &str, duration_minutes: i32) -> serde_json::Value {
        json!({
            "id": id,
            "name": format!("Service {}", service_type),
            "service_type": service_type,
            "category": category,
            "duration_minutes": duration_minutes,
            "description": null,
            "price": 800.0,
            "is_active": true
        })
    }

    pub fn appointment_response(id: &str, patient_id: &str, service_id: &str, appointment_date: &str, status: &str) -> serde_json::Value {
        json!({
            "id": id,
            "appointment_date": appointment_date,
            "status": status,
            "reason": "Abdominal pain",
            "notes": null,
            "confirmed_at": null,
            "patient_id": patient_id,
            "service_id": service_id,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn booked_slot_response(appointment_date: &str, status: &str) -> serde_json::Value {
        json!({
            "appointment_date": appointment_date,
            "status": status
        })
    }

    pub fn blocked_slot_response(
        id: &str,
        date: &str,
        start_time: Option<&str>,
        end_time: Option<&str>,
        service_type: Option<&str>,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "date": date,
            "start_time": start_time,
            "end_time": end_time,
            "reason": "Staff meeting",
            "is_full_day": start_time.is_none() && end_time.is_none(),
            "service_type": service_type,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn patient_response(id: &str, user_id: Option<&str>) -> serde_json::Value {
        json!({
            "id": id,
            "first_name": "Ana",
            "last_name": "Torres",
            "birth_date": "1985-04-12",
            "phone": "3312345678",
            "address": null,
            "weight": null,
            "height": null,
            "chronic_diseases": null,
            "user_id": user_id,
            "caregiver_id": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn system_config_response(key: &str, value: &str) -> serde_json::Value {
        json!({
            "key": key,
            "value": value
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
