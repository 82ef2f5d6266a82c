// libs/appointment-cell/src/services/slots.rs
use chrono::{NaiveTime, Timelike};

use crate::models::{CandidateSlot, DaySchedule};

/// Lays fixed-length slots end to end across the day's window. A trailing
/// period shorter than `duration_minutes` is never offered.
pub fn generate_slots(schedule: &DaySchedule, duration_minutes: u32) -> Vec<CandidateSlot> {
    let window = match schedule {
        DaySchedule::Open(window) => window,
        DaySchedule::Closed => return Vec::new(),
    };
    if duration_minutes == 0 {
        return Vec::new();
    }

    let step = duration_minutes * 60;
    let end = window.end.num_seconds_from_midnight();
    let mut slots = Vec::new();
    let mut start = window.start.num_seconds_from_midnight();

    while start + step <= end {
        if let (Some(slot_start), Some(slot_end)) = (at(start), at(start + step)) {
            slots.push(CandidateSlot { start: slot_start, end: slot_end });
        }
        start += step;
    }

    slots
}

fn at(seconds: u32) -> Option<NaiveTime> {
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)
}
