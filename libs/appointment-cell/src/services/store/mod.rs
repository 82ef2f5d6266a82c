// libs/appointment-cell/src/services/store/mod.rs
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{
    AcceptanceMode, Appointment, AppointmentError, AppointmentStatus, BlockedSlot, BookedSlot,
    NewAppointment, NewBlockedSlot, Service, ServiceType,
};

pub mod memory;
pub mod supabase;

pub use memory::InMemorySchedulingStore;
pub use supabase::SupabaseSchedulingStore;

/// System configuration key holding the clinic's [`AcceptanceMode`].
pub const APPOINTMENT_MODE_KEY: &str = "appointment_mode";

/// Persistence the scheduling services read from and write to.
///
/// `insert_appointment_atomically` is the only double-booking guard: two
/// non-terminal appointments can never share the same instant, and the loser
/// of a race gets [`AppointmentError::SlotNoLongerAvailable`].
#[async_trait]
pub trait SchedulingStore: Send + Sync {
    async fn find_service(&self, service_type: ServiceType) -> Result<Option<Service>, AppointmentError>;

    async fn list_active_services(&self) -> Result<Vec<Service>, AppointmentError>;

    /// Pending and confirmed appointments in `[from, to)`.
    async fn list_non_terminal_appointments(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BookedSlot>, AppointmentError>;

    /// Windows dated within `from..=to`. With a service type, only windows that
    /// are unscoped or scoped to it.
    async fn list_blackout_windows(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        service_type: Option<ServiceType>,
    ) -> Result<Vec<BlockedSlot>, AppointmentError>;

    async fn insert_appointment_atomically(&self, appointment: NewAppointment) -> Result<Appointment, AppointmentError>;

    async fn get_appointment(&self, id: Uuid) -> Result<Appointment, AppointmentError>;

    /// Moves the appointment from `from` to `to` only if it is still in `from`.
    /// A row that changed underneath yields [`AppointmentError::StatusChanged`].
    async fn update_appointment_status(
        &self,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
        confirmed_at: Option<DateTime<Utc>>,
        notes: Option<String>,
    ) -> Result<Appointment, AppointmentError>;

    async fn create_blackout_window(&self, window: NewBlockedSlot) -> Result<BlockedSlot, AppointmentError>;

    async fn delete_blackout_window(&self, id: Uuid) -> Result<(), AppointmentError>;

    /// Falls back to [`AcceptanceMode::default`] when nothing is stored.
    async fn get_acceptance_mode(&self) -> Result<AcceptanceMode, AppointmentError>;

    async fn set_acceptance_mode(&self, mode: AcceptanceMode) -> Result<AcceptanceMode, AppointmentError>;
}
