// libs/appointment-cell/src/services/store/supabase.rs
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{is_conflict, SupabaseClient};

use crate::models::{
    AcceptanceMode, Appointment, AppointmentError, AppointmentStatus, BlockedSlot, BookedSlot,
    NewAppointment, NewBlockedSlot, Service, ServiceType,
};

use super::{SchedulingStore, APPOINTMENT_MODE_KEY};

/// PostgREST-backed store. Double booking is prevented by the partial unique
/// index on `appointments(appointment_date)` for pending and confirmed rows.
pub struct SupabaseSchedulingStore {
    supabase: SupabaseClient,
}

impl SupabaseSchedulingStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, AppointmentError> {
        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            Some(self.supabase.service_role_key()),
            None,
        ).await.map_err(database_error)?;

        rows.into_iter().map(decode).collect()
    }

    async fn write<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Vec<T>, anyhow::Error> {
        let rows: Vec<Value> = self.supabase.request_with_headers(
            method,
            path,
            Some(self.supabase.service_role_key()),
            body,
            Some(SupabaseClient::representation_headers()),
        ).await?;

        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(Into::into))
            .collect()
    }
}

fn database_error(e: anyhow::Error) -> AppointmentError {
    AppointmentError::DatabaseError(e.to_string())
}

fn decode<T: DeserializeOwned>(row: Value) -> Result<T, AppointmentError> {
    serde_json::from_value(row)
        .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse row: {}", e)))
}

fn timestamp(instant: DateTime<Utc>) -> String {
    urlencoding::encode(&instant.to_rfc3339()).into_owned()
}

#[async_trait]
impl SchedulingStore for SupabaseSchedulingStore {
    async fn find_service(&self, service_type: ServiceType) -> Result<Option<Service>, AppointmentError> {
        let path = format!(
            "/rest/v1/services?service_type=eq.{}&is_active=eq.true&limit=1",
            service_type
        );
        Ok(self.fetch::<Service>(&path).await?.into_iter().next())
    }

    async fn list_active_services(&self) -> Result<Vec<Service>, AppointmentError> {
        self.fetch("/rest/v1/services?is_active=eq.true&order=category.asc,name.asc").await
    }

    async fn list_non_terminal_appointments(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BookedSlot>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?select=appointment_date,status&appointment_date=gte.{}&appointment_date=lt.{}&status=in.(pending,confirmed)&order=appointment_date.asc",
            timestamp(from),
            timestamp(to)
        );
        self.fetch(&path).await
    }

    async fn list_blackout_windows(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        service_type: Option<ServiceType>,
    ) -> Result<Vec<BlockedSlot>, AppointmentError> {
        let mut path = format!(
            "/rest/v1/blocked_slots?date=gte.{}&date=lte.{}&order=date.asc,start_time.asc",
            from, to
        );
        if let Some(service_type) = service_type {
            path.push_str(&format!("&or=(service_type.is.null,service_type.eq.{})", service_type));
        }
        self.fetch(&path).await
    }

    async fn insert_appointment_atomically(&self, appointment: NewAppointment) -> Result<Appointment, AppointmentError> {
        let now = Utc::now().to_rfc3339();
        let body = json!({
            "appointment_date": appointment.appointment_date.to_rfc3339(),
            "service_id": appointment.service_id,
            "patient_id": appointment.patient_id,
            "status": appointment.status,
            "confirmed_at": appointment.confirmed_at.map(|t| t.to_rfc3339()),
            "reason": appointment.reason,
            "created_at": now,
            "updated_at": now
        });

        let created: Vec<Appointment> = match self.write(Method::POST, "/rest/v1/appointments", Some(body)).await {
            Ok(rows) => rows,
            Err(e) if is_conflict(&e) => {
                info!("Slot {} was taken by a concurrent booking", appointment.appointment_date);
                return Err(AppointmentError::SlotNoLongerAvailable);
            }
            Err(e) => return Err(database_error(e)),
        };

        created
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::DatabaseError("Insert returned no appointment".to_string()))
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        self.fetch::<Appointment>(&path)
            .await?
            .into_iter()
            .next()
            .ok_or(AppointmentError::NotFound)
    }

    async fn update_appointment_status(
        &self,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
        confirmed_at: Option<DateTime<Utc>>,
        notes: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        let mut body = json!({
            "status": to,
            "updated_at": Utc::now().to_rfc3339()
        });
        if let Some(confirmed_at) = confirmed_at {
            body["confirmed_at"] = json!(confirmed_at.to_rfc3339());
        }
        if let Some(notes) = notes {
            body["notes"] = json!(notes);
        }

        let path = format!("/rest/v1/appointments?id=eq.{}&status=eq.{}", id, from);
        let updated: Vec<Appointment> = match self.write(Method::PATCH, &path, Some(body)).await {
            Ok(rows) => rows,
            Err(e) if is_conflict(&e) => {
                info!("Appointment {} lost its slot before moving to {}", id, to);
                return Err(AppointmentError::SlotNoLongerAvailable);
            }
            Err(e) => return Err(database_error(e)),
        };

        match updated.into_iter().next() {
            Some(appointment) => Ok(appointment),
            None => {
                // Either the row is gone or its status moved on since it was read
                self.get_appointment(id).await?;
                warn!("Appointment {} is no longer {}, status update skipped", id, from);
                Err(AppointmentError::StatusChanged)
            }
        }
    }

    async fn create_blackout_window(&self, window: NewBlockedSlot) -> Result<BlockedSlot, AppointmentError> {
        let body = json!({
            "date": window.date,
            "start_time": window.start_time.map(|t| t.format("%H:%M:%S").to_string()),
            "end_time": window.end_time.map(|t| t.format("%H:%M:%S").to_string()),
            "reason": window.reason,
            "is_full_day": window.is_full_day,
            "service_type": window.service_type,
            "created_at": Utc::now().to_rfc3339()
        });

        let created: Vec<BlockedSlot> = self
            .write(Method::POST, "/rest/v1/blocked_slots", Some(body))
            .await
            .map_err(database_error)?;

        created
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::DatabaseError("Insert returned no blocked slot".to_string()))
    }

    async fn delete_blackout_window(&self, id: Uuid) -> Result<(), AppointmentError> {
        let path = format!("/rest/v1/blocked_slots?id=eq.{}", id);
        let deleted: Vec<Value> = self
            .write(Method::DELETE, &path, None)
            .await
            .map_err(database_error)?;

        if deleted.is_empty() {
            return Err(AppointmentError::BlockedSlotNotFound);
        }
        debug!("Deleted blocked slot {}", id);
        Ok(())
    }

    async fn get_acceptance_mode(&self) -> Result<AcceptanceMode, AppointmentError> {
        let path = format!("/rest/v1/system_config?key=eq.{}&limit=1", APPOINTMENT_MODE_KEY);
        let rows: Vec<Value> = self.fetch(&path).await?;

        let raw = rows
            .first()
            .and_then(|row| row.get("value"))
            .and_then(|value| value.as_str());

        Ok(match raw {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("Stored appointment mode '{}' is not recognised, using default", raw);
                AcceptanceMode::default()
            }),
            None => AcceptanceMode::default(),
        })
    }

    async fn set_acceptance_mode(&self, mode: AcceptanceMode) -> Result<AcceptanceMode, AppointmentError> {
        let body = json!({
            "key": APPOINTMENT_MODE_KEY,
            "value": mode.as_str(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let path = "/rest/v1/system_config?on_conflict=key";
        let _: Value = self.supabase.request_with_headers(
            Method::POST,
            path,
            Some(self.supabase.service_role_key()),
            Some(body),
            Some(SupabaseClient::upsert_headers()),
        ).await.map_err(database_error)?;

        info!("Appointment mode set to {}", mode.as_str());
        Ok(mode)
    }
}
