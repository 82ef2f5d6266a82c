// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate, NaiveTime};
use std::fmt;
use std::str::FromStr;

use patient_cell::{CaregiverData, PatientData, PatientError};
use shared_config::AppConfig;
use shared_models::error::AppError;

// ==============================================================================
// SERVICE CATALOG
// ==============================================================================

/// A bookable offering. The catalog rows themselves live in the datastore.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    GastroConsultation,
    NutritionConsultation,
    Endoscopy,
    Colonoscopy,
}

impl ServiceType {
    pub const ALL: [ServiceType; 4] = [
        ServiceType::GastroConsultation,
        ServiceType::NutritionConsultation,
        ServiceType::Endoscopy,
        ServiceType::Colonoscopy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::GastroConsultation => "gastro_consultation",
            ServiceType::NutritionConsultation => "nutrition_consultation",
            ServiceType::Endoscopy => "endoscopy",
            ServiceType::Colonoscopy => "colonoscopy",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ServiceType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| AppointmentError::InvalidServiceType(s.to_string()))
    }
}

/// Short appointments run 30 minutes, procedures 60.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    Consultation,
    Procedure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub service_type: ServiceType,
    pub category: ServiceCategory,
    pub duration_minutes: i32,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub is_active: bool,
}

// ==============================================================================
// CALENDAR MODELS
// ==============================================================================

/// Opening hours for one category on one kind of day. `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaySchedule {
    Open(OperatingWindow),
    Closed,
}

/// A bookable start time and the end of the period it would occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CandidateSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl CandidateSlot {
    /// Clock label in `HH:MM` form, the format exposed to clients.
    pub fn label(&self) -> String {
        self.start.format("%H:%M").to_string()
    }
}

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

impl AppointmentStatus {
    /// Pending and confirmed appointments hold their slot; the rest are history.
    pub fn occupies_slot(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }

    pub fn is_terminal(&self) -> bool {
        !self.occupies_slot()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::NoShow => "no_show",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub appointment_date: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub reason: String,
    pub notes: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub patient_id: Uuid,
    pub service_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The slice of an appointment the availability resolver needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookedSlot {
    pub appointment_date: DateTime<Utc>,
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
    pub appointment_date: DateTime<Utc>,
    pub service_id: Uuid,
    pub patient_id: Uuid,
    pub status: AppointmentStatus,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub reason: String,
}

// ==============================================================================
// BLACKOUT WINDOWS
// ==============================================================================

/// Administrator-defined closure. Full-day windows carry no times; partial
/// windows always carry both, with `start_time < end_time`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedSlot {
    pub id: Uuid,
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub reason: Option<String>,
    pub is_full_day: bool,
    pub service_type: Option<ServiceType>,
    pub created_at: DateTime<Utc>,
}

impl BlockedSlot {
    pub fn applies_to(&self, service_type: ServiceType) -> bool {
        self.service_type.map_or(true, |scope| scope == service_type)
    }

    /// Whether the slot period `[start, end)` intersects this window.
    pub fn blocks(&self, slot: &CandidateSlot) -> bool {
        if self.is_full_day {
            return true;
        }
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => slot.start < end && start < slot.end,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBlockedSlot {
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub reason: Option<String>,
    pub is_full_day: bool,
    pub service_type: Option<ServiceType>,
}

// ==============================================================================
// CONFIGURATION MODELS
// ==============================================================================

/// How a newly admitted booking starts its life.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AcceptanceMode {
    Disabled,
    AutoAccept,
    #[default]
    ManualConfirm,
}

impl AcceptanceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcceptanceMode::Disabled => "disabled",
            AcceptanceMode::AutoAccept => "auto_accept",
            AcceptanceMode::ManualConfirm => "manual_confirm",
        }
    }
}

impl FromStr for AcceptanceMode {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disabled" => Ok(AcceptanceMode::Disabled),
            "auto_accept" => Ok(AcceptanceMode::AutoAccept),
            "manual_confirm" => Ok(AcceptanceMode::ManualConfirm),
            other => Err(AppointmentError::ValidationError(format!("Unknown appointment mode: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingRules {
    pub max_advance_days: i64,
    pub min_advance_hours: i64,
    /// Declared by the clinic but not enforced anywhere in admission.
    pub min_minutes_between_same_patient: i64,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            max_advance_days: 7,
            min_advance_hours: 2,
            min_minutes_between_same_patient: 60,
        }
    }
}

impl BookingRules {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_advance_days: config.max_advance_days,
            min_advance_hours: config.min_advance_hours,
            min_minutes_between_same_patient: config.min_minutes_between_same_patient,
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AvailableSlotsQuery {
    pub date: Option<String>,
    pub service: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailableDatesQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub service_type: String,
    pub date: NaiveDate,
    pub time: String,
    pub reason: String,
    pub patient_data: PatientData,
    #[serde(default)]
    pub is_caregiver: bool,
    pub caregiver_data: Option<CaregiverData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBlockedSlotRequest {
    pub date: NaiveDate,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub reason: Option<String>,
    #[serde(default)]
    pub is_full_day: bool,
    pub service_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockedSlotQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentModeRequest {
    pub mode: AcceptanceMode,
}

/// Accepts `HH:MM` and `HH:MM:SS`.
pub fn parse_clock_time(raw: &str) -> Result<NaiveTime, AppointmentError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| AppointmentError::InvalidTime(format!("'{}' is not a valid HH:MM time", raw)))
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error, PartialEq)]
pub enum AppointmentError {
    #[error("Unknown service type: {0}")]
    InvalidServiceType(String),

    #[error("Service not found")]
    ServiceNotFound,

    #[error("Online booking is currently disabled")]
    BookingDisabled,

    #[error("The selected time is no longer available, please pick another time")]
    SlotNoLongerAvailable,

    #[error("Invalid appointment date: {0}")]
    InvalidDate(String),

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Appointment not found")]
    NotFound,

    #[error("Blocked slot not found")]
    BlockedSlotNotFound,

    #[error("Cannot change appointment status from {from} to {to}")]
    InvalidStatusTransition { from: AppointmentStatus, to: AppointmentStatus },

    #[error("Appointment status changed while updating it, reload and try again")]
    StatusChanged,

    #[error("Not authorized: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<PatientError> for AppointmentError {
    fn from(e: PatientError) -> Self {
        match e {
            PatientError::ValidationError(msg) => AppointmentError::ValidationError(msg),
            PatientError::NotFound => AppointmentError::ValidationError("Patient not found".to_string()),
            PatientError::DatabaseError(msg) => AppointmentError::DatabaseError(msg),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        let message = e.to_string();
        match e {
            AppointmentError::InvalidServiceType(_)
            | AppointmentError::InvalidDate(_)
            | AppointmentError::InvalidTime(_)
            | AppointmentError::InvalidStatusTransition { .. } => AppError::BadRequest(message),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::ServiceNotFound
            | AppointmentError::NotFound
            | AppointmentError::BlockedSlotNotFound => AppError::NotFound(message),
            AppointmentError::BookingDisabled => AppError::Forbidden(message),
            AppointmentError::Forbidden(msg) => AppError::Forbidden(msg),
            AppointmentError::SlotNoLongerAvailable
            | AppointmentError::StatusChanged => AppError::Conflict(message),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
