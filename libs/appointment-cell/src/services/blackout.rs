// libs/appointment-cell/src/services/blackout.rs
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{
    parse_clock_time, AppointmentError, BlockedSlot, CreateBlockedSlotRequest, NewBlockedSlot, ServiceType,
};
use crate::services::store::SchedulingStore;

/// How far ahead an undated listing reaches.
const LISTING_SPAN_DAYS: i64 = 365;

pub struct BlackoutService {
    store: Arc<dyn SchedulingStore>,
}

impl BlackoutService {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, request: CreateBlockedSlotRequest) -> Result<BlockedSlot, AppointmentError> {
        let window = validate_request(request)?;
        let created = self.store.create_blackout_window(window).await?;
        info!(
            "Blocked {} ({})",
            created.date,
            match (created.start_time, created.end_time) {
                (Some(start), Some(end)) => format!("{}-{}", start.format("%H:%M"), end.format("%H:%M")),
                _ => "full day".to_string(),
            }
        );
        Ok(created)
    }

    /// A single day when `date` is given, otherwise everything from `today` on.
    pub async fn list(&self, date: Option<NaiveDate>, today: NaiveDate) -> Result<Vec<BlockedSlot>, AppointmentError> {
        let (from, to) = match date {
            Some(date) => (date, date),
            None => (today, today + Duration::days(LISTING_SPAN_DAYS)),
        };
        self.store.list_blackout_windows(from, to, None).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppointmentError> {
        self.store.delete_blackout_window(id).await?;
        info!("Removed blocked slot {}", id);
        Ok(())
    }
}

fn validate_request(request: CreateBlockedSlotRequest) -> Result<NewBlockedSlot, AppointmentError> {
    let service_type = request
        .service_type
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(str::parse::<ServiceType>)
        .transpose()?;

    let reason = request
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());

    if request.is_full_day {
        if request.start_time.is_some() || request.end_time.is_some() {
            debug!("Discarding times on a full-day block");
        }
        return Ok(NewBlockedSlot {
            date: request.date,
            start_time: None,
            end_time: None,
            reason,
            is_full_day: true,
            service_type,
        });
    }

    let (start, end) = match (request.start_time.as_deref(), request.end_time.as_deref()) {
        (Some(start), Some(end)) => (parse_clock_time(start)?, parse_clock_time(end)?),
        _ => {
            return Err(AppointmentError::ValidationError(
                "start_time and end_time are required unless is_full_day is set".to_string(),
            ))
        }
    };

    if start >= end {
        return Err(AppointmentError::ValidationError(
            "start_time must be before end_time".to_string(),
        ));
    }

    Ok(NewBlockedSlot {
        date: request.date,
        start_time: Some(start),
        end_time: Some(end),
        reason,
        is_full_day: false,
        service_type,
    })
}
