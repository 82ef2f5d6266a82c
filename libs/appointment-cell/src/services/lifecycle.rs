// libs/appointment-cell/src/services/lifecycle.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};
use crate::services::store::SchedulingStore;

/// Who is asking for a status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusActor {
    Admin,
    /// A signed-in user, with the patient records they answer for.
    Patient(Vec<Uuid>),
}

pub struct AppointmentLifecycleService {
    store: Arc<dyn SchedulingStore>,
}

impl AppointmentLifecycleService {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !Self::get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            AppointmentStatus::Confirmed => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            // Terminal states - no transitions allowed
            AppointmentStatus::Cancelled
            | AppointmentStatus::Completed
            | AppointmentStatus::NoShow => vec![],
        }
    }

    pub async fn change_status(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
        notes: Option<String>,
        actor: StatusActor,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.store.get_appointment(appointment_id).await?;

        if let StatusActor::Patient(owned) = &actor {
            if !owned.contains(&appointment.patient_id) {
                return Err(AppointmentError::Forbidden(
                    "You can only change your own appointments".to_string(),
                ));
            }
            if new_status != AppointmentStatus::Cancelled {
                return Err(AppointmentError::Forbidden(
                    "Patients can only cancel appointments".to_string(),
                ));
            }
        }

        Self::validate_status_transition(appointment.status, new_status)?;

        let confirmed_at = (new_status == AppointmentStatus::Confirmed).then_some(now);
        let updated = self
            .store
            .update_appointment_status(appointment_id, appointment.status, new_status, confirmed_at, notes)
            .await?;

        info!("Appointment {} moved from {} to {}", appointment_id, appointment.status, new_status);
        Ok(updated)
    }
}
