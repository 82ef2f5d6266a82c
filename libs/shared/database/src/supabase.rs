use anyhow::{anyhow, Result};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

use shared_config::AppConfig;

/// Classified PostgREST failure, carried inside the `anyhow::Error` returned by
/// [`SupabaseClient::request`] so callers can `downcast_ref` on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupabaseError {
    /// Unique or exclusion constraint violation (SQLSTATE 23505 / 23P01).
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Authentication error: {0}")]
    Unauthorized(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl SupabaseError {
    fn from_response(status: StatusCode, body: &str) -> Self {
        let code = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("code").and_then(|c| c.as_str()).map(str::to_string));

        match (status.as_u16(), code.as_deref()) {
            (_, Some("23505")) | (_, Some("23P01")) => SupabaseError::Conflict(body.to_string()),
            (401, _) | (403, _) => SupabaseError::Unauthorized(body.to_string()),
            (404, _) => SupabaseError::NotFound(body.to_string()),
            (status, _) => SupabaseError::Api { status, message: body.to_string() },
        }
    }
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
    service_role_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
            service_role_key: config.supabase_service_role_key.clone(),
        }
    }

    /// Key used for server-side reads and writes that are not made on behalf of a user.
    pub fn service_role_key(&self) -> &str {
        &self.service_role_key
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let failure = SupabaseError::from_response(status, &text);
            match failure {
                SupabaseError::Conflict(_) => warn!("API conflict ({}): {}", status, text),
                _ => error!("API error ({}): {}", status, text),
            }
            return Err(anyhow!(failure));
        }

        // PostgREST answers 204 with an empty body when no representation is requested
        let payload = if text.trim().is_empty() { "null" } else { text.as_str() };
        let data = serde_json::from_str::<T>(payload)?;
        Ok(data)
    }

    /// `Prefer: return=representation` so writes echo the affected rows.
    pub fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    /// Upsert variant of [`Self::representation_headers`].
    pub fn upsert_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=merge-duplicates,return=representation"),
        );
        headers
    }
}

/// True when the error came from a constraint violation in the datastore.
pub fn is_conflict(error: &anyhow::Error) -> bool {
    matches!(error.downcast_ref::<SupabaseError>(), Some(SupabaseError::Conflict(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_unique_violation_by_sqlstate() {
        let body = r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#;
        let failure = SupabaseError::from_response(StatusCode::BAD_REQUEST, body);
        assert!(matches!(failure, SupabaseError::Conflict(_)));
    }

    #[test]
    fn foreign_key_violation_is_not_a_conflict() {
        let body = r#"{"code":"23503","message":"insert or update violates foreign key constraint"}"#;
        assert_eq!(
            SupabaseError::from_response(StatusCode::CONFLICT, body),
            SupabaseError::Api { status: 409, message: body.to_string() }
        );
        assert!(matches!(
            SupabaseError::from_response(StatusCode::CONFLICT, r#"{"code":"23P01"}"#),
            SupabaseError::Conflict(_)
        ));
    }

    #[test]
    fn classifies_by_status() {
        assert!(matches!(
            SupabaseError::from_response(StatusCode::CONFLICT, ""),
            SupabaseError::Api { status: 409, .. }
        ));
        assert!(matches!(
            SupabaseError::from_response(StatusCode::UNAUTHORIZED, "nope"),
            SupabaseError::Unauthorized(_)
        ));
        assert_eq!(
            SupabaseError::from_response(StatusCode::BAD_GATEWAY, "down"),
            SupabaseError::Api { status: 502, message: "down".to_string() }
        );
    }

    #[test]
    fn conflict_survives_anyhow_wrapping() {
        let err = anyhow!(SupabaseError::Conflict("dup".to_string()));
        assert!(is_conflict(&err));
        assert!(!is_conflict(&anyhow!("plain failure")));
    }
}
