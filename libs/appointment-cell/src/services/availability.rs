// libs/appointment-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

use crate::models::{AppointmentError, BlockedSlot, CandidateSlot, ServiceType};
use crate::services::calendar::{category_for, slot_minutes, window_for};
use crate::services::clock::ClinicClock;
use crate::services::policy::{BookingPolicy, DateRejection};
use crate::services::slots::generate_slots;
use crate::services::store::SchedulingStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionReason {
    LeadTime,
    Blackout,
    Booked,
}

/// Everything that can take a candidate slot off the table on one day.
#[derive(Debug, Clone)]
pub struct SlotExclusions {
    date: NaiveDate,
    cutoff: NaiveDateTime,
    booked: Vec<NaiveDateTime>,
    blackouts: Vec<BlockedSlot>,
}

impl SlotExclusions {
    pub fn reason(&self, slot: &CandidateSlot) -> Option<ExclusionReason> {
        let starts_at = self.date.and_time(slot.start);

        if starts_at < self.cutoff {
            Some(ExclusionReason::LeadTime)
        } else if self.blackouts.iter().any(|window| window.blocks(slot)) {
            Some(ExclusionReason::Blackout)
        } else if self.booked.contains(&starts_at) {
            Some(ExclusionReason::Booked)
        } else {
            None
        }
    }
}

/// Result of an availability lookup; `rejection` explains an empty list
/// caused by the date itself.
#[derive(Debug, Clone)]
pub struct SlotAvailability {
    pub slots: Vec<String>,
    pub rejection: Option<DateRejection>,
}

pub struct AvailabilityService {
    store: Arc<dyn SchedulingStore>,
    policy: BookingPolicy,
    clock: ClinicClock,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn SchedulingStore>, policy: BookingPolicy, clock: ClinicClock) -> Self {
        Self { store, policy, clock }
    }

    pub fn candidate_slots(&self, date: NaiveDate, service_type: ServiceType) -> Vec<CandidateSlot> {
        let category = category_for(service_type);
        generate_slots(&window_for(category, date.weekday()), slot_minutes(category))
    }

    pub async fn exclusions_for(
        &self,
        date: NaiveDate,
        service_type: ServiceType,
        now: DateTime<Utc>,
    ) -> Result<SlotExclusions, AppointmentError> {
        let (day_start, day_end) = self.clock.day_bounds(date);

        let booked = self
            .store
            .list_non_terminal_appointments(day_start, day_end)
            .await?
            .into_iter()
            .filter(|slot| slot.status.occupies_slot())
            .map(|slot| self.clock.local(slot.appointment_date))
            .collect();

        let blackouts = self
            .store
            .list_blackout_windows(date, date, Some(service_type))
            .await?
            .into_iter()
            .filter(|window| window.date == date && window.applies_to(service_type))
            .collect();

        Ok(SlotExclusions {
            date,
            cutoff: self.policy.lead_time_cutoff(self.clock.local(now)),
            booked,
            blackouts,
        })
    }

    pub async fn check_availability(
        &self,
        date: NaiveDate,
        service_type: ServiceType,
        now: DateTime<Utc>,
    ) -> Result<SlotAvailability, AppointmentError> {
        if let Err(rejection) = self.policy.validate_date(date, self.clock.local(now)) {
            debug!("No slots for {} on {}: {}", service_type, date, rejection);
            return Ok(SlotAvailability { slots: Vec::new(), rejection: Some(rejection) });
        }

        let candidates = self.candidate_slots(date, service_type);
        if candidates.is_empty() {
            return Ok(SlotAvailability { slots: Vec::new(), rejection: None });
        }

        let exclusions = self.exclusions_for(date, service_type, now).await?;
        let slots: Vec<String> = candidates
            .iter()
            .filter(|slot| exclusions.reason(slot).is_none())
            .map(CandidateSlot::label)
            .collect();

        debug!(
            "{} of {} slots open for {} on {}",
            slots.len(),
            candidates.len(),
            service_type,
            date
        );

        Ok(SlotAvailability { slots, rejection: None })
    }

    /// Open start times for the day as `HH:MM`, ascending. An unbookable date
    /// yields an empty list rather than an error.
    pub async fn resolve_available_slots(
        &self,
        date: NaiveDate,
        service_type: ServiceType,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, AppointmentError> {
        Ok(self.check_availability(date, service_type, now).await?.slots)
    }
}
