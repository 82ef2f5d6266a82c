// libs/appointment-cell/src/services/admission.rs
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tracing::{debug, info, instrument, warn};

use patient_cell::{PatientDirectory, PatientResolution};

use crate::models::{
    AcceptanceMode, Appointment, AppointmentError, AppointmentStatus, NewAppointment, ServiceType,
};
use crate::services::availability::{AvailabilityService, ExclusionReason};
use crate::services::clock::ClinicClock;
use crate::services::policy::BookingPolicy;
use crate::services::store::SchedulingStore;

#[derive(Debug, Clone)]
pub struct AdmissionRequest {
    pub service_type: ServiceType,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub reason: String,
    pub patient: PatientResolution,
}

/// Clinic state captured when the request arrives.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionContext {
    pub mode: AcceptanceMode,
    pub now: DateTime<Utc>,
}

pub struct BookingAdmissionService {
    store: Arc<dyn SchedulingStore>,
    patients: Arc<dyn PatientDirectory>,
    availability: AvailabilityService,
    policy: BookingPolicy,
    clock: ClinicClock,
}

impl BookingAdmissionService {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        patients: Arc<dyn PatientDirectory>,
        policy: BookingPolicy,
        clock: ClinicClock,
    ) -> Self {
        Self {
            availability: AvailabilityService::new(store.clone(), policy, clock),
            store,
            patients,
            policy,
            clock,
        }
    }

    /// Re-checks the requested slot and inserts the appointment. Nothing is
    /// written unless every rule passes; the insert itself decides races.
    #[instrument(skip(self, request, context), fields(service = %request.service_type, date = %request.date, time = %request.time))]
    pub async fn admit_booking(
        &self,
        request: AdmissionRequest,
        context: AdmissionContext,
    ) -> Result<Appointment, AppointmentError> {
        let reason = request.reason.trim();
        if reason.is_empty() {
            return Err(AppointmentError::ValidationError("A reason for the visit is required".to_string()));
        }

        let service = self
            .store
            .find_service(request.service_type)
            .await?
            .ok_or(AppointmentError::ServiceNotFound)?;

        let (status, confirmed_at) = match context.mode {
            AcceptanceMode::Disabled => {
                info!("Booking rejected: online booking is disabled");
                return Err(AppointmentError::BookingDisabled);
            }
            AcceptanceMode::AutoAccept => (AppointmentStatus::Confirmed, Some(context.now)),
            AcceptanceMode::ManualConfirm => (AppointmentStatus::Pending, None),
        };

        self.policy.validate_date(request.date, self.clock.local(context.now))?;

        let slot = self
            .availability
            .candidate_slots(request.date, request.service_type)
            .into_iter()
            .find(|slot| slot.start == request.time)
            .ok_or_else(|| {
                AppointmentError::InvalidTime(format!(
                    "{} is not a bookable {} slot on {}",
                    request.time.format("%H:%M"),
                    request.service_type,
                    request.date
                ))
            })?;

        // Advisory only; the insert below is what actually excludes a double booking
        let exclusions = self
            .availability
            .exclusions_for(request.date, request.service_type, context.now)
            .await?;
        if let Some(excluded) = exclusions.reason(&slot) {
            match excluded {
                ExclusionReason::LeadTime => debug!("Slot is inside the minimum lead time"),
                ExclusionReason::Blackout => debug!("Slot is blocked by the clinic"),
                ExclusionReason::Booked => debug!("Slot is already booked"),
            }
            return Err(AppointmentError::SlotNoLongerAvailable);
        }

        let patient_id = self.patients.resolve_or_create(request.patient).await?;

        let appointment = NewAppointment {
            appointment_date: self.clock.to_utc(request.date, request.time),
            service_id: service.id,
            patient_id,
            status,
            confirmed_at,
            reason: reason.to_string(),
        };

        match self.store.insert_appointment_atomically(appointment).await {
            Ok(created) => {
                info!("Appointment {} admitted as {}", created.id, created.status);
                Ok(created)
            }
            Err(AppointmentError::SlotNoLongerAvailable) => {
                warn!("Lost the race for the slot to a concurrent booking");
                Err(AppointmentError::SlotNoLongerAvailable)
            }
            Err(e) => Err(e),
        }
    }
}
