// libs/appointment-cell/src/services/store/memory.rs
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    AcceptanceMode, Appointment, AppointmentError, AppointmentStatus, BlockedSlot, BookedSlot,
    NewAppointment, NewBlockedSlot, Service, ServiceType,
};
use crate::services::calendar::{category_for, slot_minutes};

use super::SchedulingStore;

/// Process-local store. Every write happens under a single write lock, which
/// gives the same exclusion the unique index provides in Postgres.
#[derive(Default)]
pub struct InMemorySchedulingStore {
    services: RwLock<Vec<Service>>,
    appointments: RwLock<Vec<Appointment>>,
    blocked_slots: RwLock<Vec<BlockedSlot>>,
    acceptance_mode: RwLock<Option<AcceptanceMode>>,
}

impl InMemorySchedulingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_services(services: Vec<Service>) -> Self {
        Self {
            services: RwLock::new(services),
            ..Self::default()
        }
    }

    /// The clinic's standard catalog: two consultations and two procedures.
    pub fn with_default_catalog() -> Self {
        Self::with_services(ServiceType::ALL.into_iter().map(default_service).collect())
    }

    pub async fn appointments(&self) -> Vec<Appointment> {
        self.appointments.read().await.clone()
    }

    pub async fn blocked_slots(&self) -> Vec<BlockedSlot> {
        self.blocked_slots.read().await.clone()
    }
}

fn default_service(service_type: ServiceType) -> Service {
    let category = category_for(service_type);
    let (name, price) = match service_type {
        ServiceType::GastroConsultation => ("Gastroenterology consultation", 800.0),
        ServiceType::NutritionConsultation => ("Nutrition consultation", 600.0),
        ServiceType::Endoscopy => ("Upper endoscopy", 3500.0),
        ServiceType::Colonoscopy => ("Colonoscopy", 4500.0),
    };

    Service {
        id: Uuid::new_v4(),
        name: name.to_string(),
        service_type,
        category,
        duration_minutes: slot_minutes(category) as i32,
        description: None,
        price: Some(price),
        is_active: true,
    }
}

#[async_trait]
impl SchedulingStore for InMemorySchedulingStore {
    async fn find_service(&self, service_type: ServiceType) -> Result<Option<Service>, AppointmentError> {
        Ok(self
            .services
            .read()
            .await
            .iter()
            .find(|s| s.service_type == service_type && s.is_active)
            .cloned())
    }

    async fn list_active_services(&self) -> Result<Vec<Service>, AppointmentError> {
        let mut services: Vec<Service> = self
            .services
            .read()
            .await
            .iter()
            .filter(|s| s.is_active)
            .cloned()
            .collect();
        services.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.name.cmp(&b.name)));
        Ok(services)
    }

    async fn list_non_terminal_appointments(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BookedSlot>, AppointmentError> {
        let mut booked: Vec<BookedSlot> = self
            .appointments
            .read()
            .await
            .iter()
            .filter(|a| a.status.occupies_slot())
            .filter(|a| a.appointment_date >= from && a.appointment_date < to)
            .map(|a| BookedSlot {
                appointment_date: a.appointment_date,
                status: a.status,
            })
            .collect();
        booked.sort_by_key(|slot| slot.appointment_date);
        Ok(booked)
    }

    async fn list_blackout_windows(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        service_type: Option<ServiceType>,
    ) -> Result<Vec<BlockedSlot>, AppointmentError> {
        let mut windows: Vec<BlockedSlot> = self
            .blocked_slots
            .read()
            .await
            .iter()
            .filter(|w| w.date >= from && w.date <= to)
            .filter(|w| service_type.map_or(true, |t| w.applies_to(t)))
            .cloned()
            .collect();
        windows.sort_by_key(|w| (w.date, w.start_time));
        Ok(windows)
    }

    async fn insert_appointment_atomically(&self, appointment: NewAppointment) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.write().await;

        let taken = appointments
            .iter()
            .any(|a| a.status.occupies_slot() && a.appointment_date == appointment.appointment_date);
        if taken && appointment.status.occupies_slot() {
            debug!("Slot {} already taken", appointment.appointment_date);
            return Err(AppointmentError::SlotNoLongerAvailable);
        }

        let now = Utc::now();
        let created = Appointment {
            id: Uuid::new_v4(),
            appointment_date: appointment.appointment_date,
            status: appointment.status,
            reason: appointment.reason,
            notes: None,
            confirmed_at: appointment.confirmed_at,
            patient_id: appointment.patient_id,
            service_id: appointment.service_id,
            created_at: now,
            updated_at: now,
        };
        appointments.push(created.clone());
        Ok(created)
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        self.appointments
            .read()
            .await
            .iter()
            .find(|a| a.id == id)
            .cloned()
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
        let mut appointments = self.appointments.write().await;
        let index = appointments
            .iter()
            .position(|a| a.id == id)
            .ok_or(AppointmentError::NotFound)?;

        if appointments[index].status != from {
            return Err(AppointmentError::StatusChanged);
        }
        let appointment = &mut appointments[index];
        appointment.status = to;
        if confirmed_at.is_some() {
            appointment.confirmed_at = confirmed_at;
        }
        if notes.is_some() {
            appointment.notes = notes;
        }
        appointment.updated_at = Utc::now();
        Ok(appointment.clone())
    }

    async fn create_blackout_window(&self, window: NewBlockedSlot) -> Result<BlockedSlot, AppointmentError> {
        let created = BlockedSlot {
            id: Uuid::new_v4(),
            date: window.date,
            start_time: window.start_time,
            end_time: window.end_time,
            reason: window.reason,
            is_full_day: window.is_full_day,
            service_type: window.service_type,
            created_at: Utc::now(),
        };
        self.blocked_slots.write().await.push(created.clone());
        Ok(created)
    }

    async fn delete_blackout_window(&self, id: Uuid) -> Result<(), AppointmentError> {
        let mut windows = self.blocked_slots.write().await;
        let before = windows.len();
        windows.retain(|w| w.id != id);
        if windows.len() == before {
            return Err(AppointmentError::BlockedSlotNotFound);
        }
        Ok(())
    }

    async fn get_acceptance_mode(&self) -> Result<AcceptanceMode, AppointmentError> {
        Ok(self.acceptance_mode.read().await.unwrap_or_default())
    }

    async fn set_acceptance_mode(&self, mode: AcceptanceMode) -> Result<AcceptanceMode, AppointmentError> {
        *self.acceptance_mode.write().await = Some(mode);
        Ok(mode)
    }
}
