use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Caregiver, CaregiverData, Patient, PatientData, PatientError, PatientResolution};

/// Patient records as seen by the booking flow: it only ever needs a stable id.
#[async_trait]
pub trait PatientDirectory: Send + Sync {
    /// Reuses the authenticated user's own patient record when there is one,
    /// otherwise registers a new patient (and caregiver, when booking for someone else).
    async fn resolve_or_create(&self, resolution: PatientResolution) -> Result<Uuid, PatientError>;

    /// Patients the user answers for: their own record plus every dependent
    /// registered through one of their caregiver profiles.
    async fn patients_for_user(&self, user_id: &str) -> Result<Vec<Uuid>, PatientError>;
}

fn caregiver_owner(resolution: &PatientResolution) -> Option<(&CaregiverData, &str)> {
    match (&resolution.caregiver, resolution.user_id.as_deref()) {
        (Some(caregiver), Some(user_id)) => Some((caregiver, user_id)),
        (Some(_), None) => {
            debug!("Ignoring caregiver details on an anonymous booking");
            None
        }
        _ => None,
    }
}

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn fetch_ids(&self, path: &str) -> Result<Vec<Uuid>> {
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            Some(self.supabase.service_role_key()),
            None,
        ).await?;

        result
            .into_iter()
            .map(|mut row| serde_json::from_value(row["id"].take()).map_err(Into::into))
            .collect()
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Option<Patient>> {
        let path = format!(
            "/rest/v1/patients?user_id=eq.{}&limit=1",
            urlencoding::encode(user_id)
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(self.supabase.service_role_key()),
            None,
        ).await?;

        result
            .into_iter()
            .next()
            .map(serde_json::from_value)
            .transpose()
            .map_err(Into::into)
    }

    async fn create_caregiver(&self, data: &CaregiverData, user_id: &str) -> Result<Caregiver> {
        debug!("Creating caregiver for user {}", user_id);

        let caregiver_data = json!({
            "first_name": data.first_name,
            "last_name": data.last_name,
            "phone": data.phone,
            "relationship": data.relationship,
            "user_id": user_id,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/caregivers",
            Some(self.supabase.service_role_key()),
            Some(caregiver_data),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let row = result.into_iter().next().ok_or_else(|| anyhow!("Failed to create caregiver"))?;
        Ok(serde_json::from_value(row)?)
    }

    async fn create_patient(
        &self,
        data: &PatientData,
        user_id: Option<&str>,
        caregiver_id: Option<Uuid>,
    ) -> Result<Patient> {
        let patient_data = json!({
            "first_name": data.first_name,
            "last_name": data.last_name,
            "birth_date": data.birth_date.format("%Y-%m-%d").to_string(),
            "phone": data.phone,
            "address": data.address,
            "weight": data.weight,
            "height": data.height,
            "chronic_diseases": data.chronic_diseases,
            "user_id": user_id,
            "caregiver_id": caregiver_id,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/patients",
            Some(self.supabase.service_role_key()),
            Some(patient_data),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let row = result.into_iter().next().ok_or_else(|| anyhow!("Failed to create patient profile"))?;
        let patient: Patient = serde_json::from_value(row)?;
        info!("Patient profile created with ID: {}", patient.id);
        Ok(patient)
    }
}

fn database_error(e: anyhow::Error) -> PatientError {
    PatientError::DatabaseError(e.to_string())
}

#[async_trait]
impl PatientDirectory for PatientService {
    async fn resolve_or_create(&self, resolution: PatientResolution) -> Result<Uuid, PatientError> {
        resolution.patient_data.validate()?;

        if let Some((caregiver, user_id)) = caregiver_owner(&resolution) {
            let caregiver = self.create_caregiver(caregiver, user_id).await.map_err(database_error)?;
            let patient = self
                .create_patient(&resolution.patient_data, None, Some(caregiver.id))
                .await
                .map_err(database_error)?;
            return Ok(patient.id);
        }

        if let Some(user_id) = resolution.user_id.as_deref() {
            if let Some(existing) = self.find_by_user(user_id).await.map_err(database_error)? {
                debug!("Reusing patient {} for user {}", existing.id, user_id);
                return Ok(existing.id);
            }
        }

        let patient = self
            .create_patient(&resolution.patient_data, resolution.user_id.as_deref(), None)
            .await
            .map_err(database_error)?;
        Ok(patient.id)
    }

    async fn patients_for_user(&self, user_id: &str) -> Result<Vec<Uuid>, PatientError> {
        let user = urlencoding::encode(user_id);
        let caregiver_ids = self
            .fetch_ids(&format!("/rest/v1/caregivers?user_id=eq.{}&select=id", user))
            .await
            .map_err(database_error)?;

        let path = if caregiver_ids.is_empty() {
            format!("/rest/v1/patients?user_id=eq.{}&select=id", user)
        } else {
            let ids = caregiver_ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(",");
            format!("/rest/v1/patients?select=id&or=(user_id.eq.{},caregiver_id.in.({}))", user, ids)
        };

        self.fetch_ids(&path).await.map_err(database_error)
    }
}

/// Process-local directory used by tests and `SCHEDULING_STORE=memory` runs.
#[derive(Default)]
pub struct InMemoryPatientDirectory {
    patients: RwLock<Vec<Patient>>,
    caregivers: RwLock<Vec<Caregiver>>,
}

impl InMemoryPatientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn patients(&self) -> Vec<Patient> {
        self.patients.read().await.clone()
    }

    pub async fn caregivers(&self) -> Vec<Caregiver> {
        self.caregivers.read().await.clone()
    }

    fn new_patient(data: &PatientData, user_id: Option<&str>, caregiver_id: Option<Uuid>) -> Patient {
        let now = Utc::now();
        Patient {
            id: Uuid::new_v4(),
            first_name: data.first_name.clone(),
            last_name: data.last_name.clone(),
            birth_date: data.birth_date,
            phone: data.phone.clone(),
            address: data.address.clone(),
            weight: data.weight,
            height: data.height,
            chronic_diseases: data.chronic_diseases.clone(),
            user_id: user_id.map(str::to_string),
            caregiver_id,
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
impl PatientDirectory for InMemoryPatientDirectory {
    async fn resolve_or_create(&self, resolution: PatientResolution) -> Result<Uuid, PatientError> {
        resolution.patient_data.validate()?;

        let mut patients = self.patients.write().await;

        if let Some((data, user_id)) = caregiver_owner(&resolution) {
            let now = Utc::now();
            let caregiver = Caregiver {
                id: Uuid::new_v4(),
                first_name: data.first_name.clone(),
                last_name: data.last_name.clone(),
                phone: data.phone.clone(),
                relationship: data.relationship.clone(),
                user_id: user_id.to_string(),
                created_at: now,
                updated_at: now,
            };
            let patient = Self::new_patient(&resolution.patient_data, None, Some(caregiver.id));
            self.caregivers.write().await.push(caregiver);
            let id = patient.id;
            patients.push(patient);
            return Ok(id);
        }

        if let Some(user_id) = resolution.user_id.as_deref() {
            if let Some(existing) = patients.iter().find(|p| p.user_id.as_deref() == Some(user_id)) {
                return Ok(existing.id);
            }
        }

        let patient = Self::new_patient(&resolution.patient_data, resolution.user_id.as_deref(), None);
        let id = patient.id;
        patients.push(patient);
        Ok(id)
    }

    async fn patients_for_user(&self, user_id: &str) -> Result<Vec<Uuid>, PatientError> {
        let patients = self.patients.read().await;
        let caregiver_ids: Vec<Uuid> = self
            .caregivers
            .read()
            .await
            .iter()
            .filter(|c| c.user_id == user_id)
            .map(|c| c.id)
            .collect();

        Ok(patients
            .iter()
            .filter(|p| {
                p.user_id.as_deref() == Some(user_id)
                    || p.caregiver_id.is_some_and(|id| caregiver_ids.contains(&id))
            })
            .map(|p| p.id)
            .collect())
    }
}
