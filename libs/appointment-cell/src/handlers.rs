// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::{NaiveDate, Utc};
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use patient_cell::PatientResolution;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::{optional_user, require_admin};

use crate::models::{
    parse_clock_time, AppointmentError, AppointmentModeRequest, AvailableDatesQuery, AvailableSlotsQuery,
    BlockedSlotQuery, BookAppointmentRequest, CreateBlockedSlotRequest, ServiceType, UpdateStatusRequest,
};
use crate::services::admission::{AdmissionContext, AdmissionRequest};
use crate::services::lifecycle::StatusActor;
use crate::state::AppState;

const DEFAULT_DATE_COUNT: u32 = 7;
const MAX_DATE_COUNT: u32 = 31;

// ==============================================================================
// SERVICE CATALOG
// ==============================================================================

#[axum::debug_handler]
pub async fn list_services(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let services = state.store.list_active_services().await?;

    Ok(Json(json!({
        "success": true,
        "data": services
    })))
}

// ==============================================================================
// AVAILABILITY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_available_dates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailableDatesQuery>,
) -> Result<Json<Value>, AppError> {
    let count = query.days.unwrap_or(DEFAULT_DATE_COUNT).min(MAX_DATE_COUNT);
    let today = state.clock.today(Utc::now());

    let dates: Vec<String> = state
        .policy()
        .upcoming_bookable_dates(today, count)
        .into_iter()
        .map(|date| date.format("%Y-%m-%d").to_string())
        .collect();

    Ok(Json(json!({
        "success": true,
        "data": dates
    })))
}

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let (raw_date, raw_service) = match (query.date.as_deref(), query.service.as_deref()) {
        (Some(date), Some(service)) => (date, service),
        _ => return Err(AppError::BadRequest("Both date and service are required".to_string())),
    };

    let service_type: ServiceType = raw_service.parse()?;
    let date = NaiveDate::parse_from_str(raw_date.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("'{}' is not a valid YYYY-MM-DD date", raw_date)))?;

    let availability = state
        .availability_service()
        .check_availability(date, service_type, Utc::now())
        .await?;

    if let Some(rejection) = availability.rejection {
        return Ok(Json(json!({
            "success": true,
            "data": [],
            "message": rejection.to_string()
        })));
    }

    Ok(Json(json!({
        "success": true,
        "data": availability.slots
    })))
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

/// Books a slot. Anonymous callers are allowed; a valid bearer token links the
/// booking to the caller's own patient record.
#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppState>>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let user = optional_user(auth, &state.config)?;

    let service_type: ServiceType = request.service_type.parse()?;
    let time = parse_clock_time(&request.time)?;

    let caregiver = if request.is_caregiver {
        let data = request.caregiver_data.ok_or_else(|| {
            AppError::ValidationError("caregiver_data is required when booking as a caregiver".to_string())
        })?;
        Some(data)
    } else {
        None
    };

    let context = AdmissionContext {
        mode: state.store.get_acceptance_mode().await?,
        now: Utc::now(),
    };

    let admission = AdmissionRequest {
        service_type,
        date: request.date,
        time,
        reason: request.reason,
        patient: PatientResolution {
            patient_data: request.patient_data,
            user_id: user.map(|u| u.id),
            caregiver,
        },
    };

    let appointment = state.admission_service().admit_booking(admission, context).await?;

    Ok(Json(json!({
        "success": true,
        "data": appointment,
        "message": if appointment.confirmed_at.is_some() {
            "Appointment confirmed"
        } else {
            "Appointment requested, awaiting confirmation"
        }
    })))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = if user.is_admin() {
        StatusActor::Admin
    } else {
        let owned = state
            .patients
            .patients_for_user(&user.id)
            .await
            .map_err(AppointmentError::from)?;
        StatusActor::Patient(owned)
    };

    debug!("User {} changing appointment {} to {}", user.id, appointment_id, request.status);

    let appointment = state
        .lifecycle_service()
        .change_status(appointment_id, request.status, request.notes, actor, Utc::now())
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": appointment
    })))
}

// ==============================================================================
// BLOCKED SLOT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_blocked_slots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BlockedSlotQuery>,
) -> Result<Json<Value>, AppError> {
    let today = state.clock.today(Utc::now());
    let blocked = state.blackout_service().list(query.date, today).await?;

    Ok(Json(json!({
        "success": true,
        "data": blocked
    })))
}

#[axum::debug_handler]
pub async fn create_blocked_slot(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateBlockedSlotRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let blocked = state.blackout_service().create(request).await?;

    Ok(Json(json!({
        "success": true,
        "data": blocked
    })))
}

#[axum::debug_handler]
pub async fn delete_blocked_slot(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(blocked_slot_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    state.blackout_service().delete(blocked_slot_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Blocked slot removed"
    })))
}

// ==============================================================================
// SETTINGS HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_appointment_mode(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let mode = state.store.get_acceptance_mode().await?;

    Ok(Json(json!({
        "success": true,
        "data": { "mode": mode }
    })))
}

#[axum::debug_handler]
pub async fn update_appointment_mode(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(request): Json<AppointmentModeRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let mode = state.store.set_acceptance_mode(request.mode).await?;
    info!("Appointment mode changed to {} by {}", mode.as_str(), user.id);

    Ok(Json(json!({
        "success": true,
        "data": { "mode": mode }
    })))
}
