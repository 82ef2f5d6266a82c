use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub phone: String,
    pub address: Option<String>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub chronic_diseases: Option<String>,
    pub user_id: Option<String>,
    pub caregiver_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Caregiver {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub relationship: Option<String>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Patient details submitted with a booking form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientData {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub phone: String,
    pub address: Option<String>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub chronic_diseases: Option<String>,
}

impl PatientData {
    pub fn validate(&self) -> Result<(), PatientError> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(PatientError::ValidationError("Patient name is required".to_string()));
        }
        if self.phone.trim().is_empty() {
            return Err(PatientError::ValidationError("Patient phone is required".to_string()));
        }
        if self.weight.is_some_and(|w| w <= 0.0) || self.height.is_some_and(|h| h <= 0.0) {
            return Err(PatientError::ValidationError("Weight and height must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaregiverData {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub relationship: Option<String>,
}

/// Everything needed to find or register the patient an appointment is for.
#[derive(Debug, Clone)]
pub struct PatientResolution {
    pub patient_data: PatientData,
    /// Authenticated account making the booking, if any.
    pub user_id: Option<String>,
    /// Set when an authenticated user books on behalf of someone they care for.
    pub caregiver: Option<CaregiverData>,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
