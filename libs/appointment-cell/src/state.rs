// libs/appointment-cell/src/state.rs
use std::sync::Arc;

use tracing::info;

use patient_cell::{InMemoryPatientDirectory, PatientDirectory, PatientService};
use shared_config::{AppConfig, StoreBackend};

use crate::models::BookingRules;
use crate::services::{
    AppointmentLifecycleService, AvailabilityService, BlackoutService, BookingAdmissionService,
    BookingPolicy, ClinicClock, InMemorySchedulingStore, SchedulingStore, SupabaseSchedulingStore,
};

/// Shared handler state, built once at startup.
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub rules: BookingRules,
    pub clock: ClinicClock,
    pub store: Arc<dyn SchedulingStore>,
    pub patients: Arc<dyn PatientDirectory>,
}

impl AppState {
    pub fn from_config(config: AppConfig) -> Self {
        let (store, patients): (Arc<dyn SchedulingStore>, Arc<dyn PatientDirectory>) = match config.scheduling_store {
            StoreBackend::Supabase => (
                Arc::new(SupabaseSchedulingStore::new(&config)) as Arc<dyn SchedulingStore>,
                Arc::new(PatientService::new(&config)) as Arc<dyn PatientDirectory>,
            ),
            StoreBackend::Memory => {
                info!("Using in-memory scheduling store; data is lost on restart");
                (
                    Arc::new(InMemorySchedulingStore::with_default_catalog()) as Arc<dyn SchedulingStore>,
                    Arc::new(InMemoryPatientDirectory::new()) as Arc<dyn PatientDirectory>,
                )
            }
        };

        Self::with_backends(config, store, patients)
    }

    pub fn with_backends(
        config: AppConfig,
        store: Arc<dyn SchedulingStore>,
        patients: Arc<dyn PatientDirectory>,
    ) -> Self {
        Self {
            rules: BookingRules::from_config(&config),
            clock: ClinicClock::new(config.clinic_utc_offset),
            config: Arc::new(config),
            store,
            patients,
        }
    }

    pub fn policy(&self) -> BookingPolicy {
        BookingPolicy::new(self.rules)
    }

    pub fn availability_service(&self) -> AvailabilityService {
        AvailabilityService::new(self.store.clone(), self.policy(), self.clock)
    }

    pub fn admission_service(&self) -> BookingAdmissionService {
        BookingAdmissionService::new(self.store.clone(), self.patients.clone(), self.policy(), self.clock)
    }

    pub fn blackout_service(&self) -> BlackoutService {
        BlackoutService::new(self.store.clone())
    }

    pub fn lifecycle_service(&self) -> AppointmentLifecycleService {
        AppointmentLifecycleService::new(self.store.clone())
    }
}
