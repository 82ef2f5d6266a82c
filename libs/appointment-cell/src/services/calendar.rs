// libs/appointment-cell/src/services/calendar.rs
use chrono::{NaiveTime, Weekday};

use crate::models::{DaySchedule, OperatingWindow, ServiceCategory, ServiceType};

pub const CONSULTATION_SLOT_MINUTES: u32 = 30;
pub const PROCEDURE_SLOT_MINUTES: u32 = 60;

pub fn category_for(service_type: ServiceType) -> ServiceCategory {
    match service_type {
        ServiceType::GastroConsultation | ServiceType::NutritionConsultation => ServiceCategory::Consultation,
        ServiceType::Endoscopy | ServiceType::Colonoscopy => ServiceCategory::Procedure,
    }
}

pub fn slot_minutes(category: ServiceCategory) -> u32 {
    match category {
        ServiceCategory::Consultation => CONSULTATION_SLOT_MINUTES,
        ServiceCategory::Procedure => PROCEDURE_SLOT_MINUTES,
    }
}

/// Opening hours per category. Sunday is closed for everything.
pub fn window_for(category: ServiceCategory, weekday: Weekday) -> DaySchedule {
    let hours = match (category, weekday) {
        (_, Weekday::Sun) => return DaySchedule::Closed,
        (ServiceCategory::Consultation, Weekday::Sat) => ((9, 0), (14, 0)),
        (ServiceCategory::Consultation, _) => ((8, 0), (12, 30)),
        (ServiceCategory::Procedure, Weekday::Sat) => ((10, 0), (14, 0)),
        (ServiceCategory::Procedure, _) => ((10, 0), (12, 0)),
    };

    match (clock(hours.0), clock(hours.1)) {
        (Some(start), Some(end)) => DaySchedule::Open(OperatingWindow { start, end }),
        _ => DaySchedule::Closed,
    }
}

fn clock((hour, minute): (u32, u32)) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(hour, minute, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(category: ServiceCategory, weekday: Weekday) -> OperatingWindow {
        match window_for(category, weekday) {
            DaySchedule::Open(window) => window,
            DaySchedule::Closed => panic!("expected {:?} to be open on {:?}", category, weekday),
        }
    }

    #[test]
    fn every_service_has_a_category() {
        assert_eq!(category_for(ServiceType::GastroConsultation), ServiceCategory::Consultation);
        assert_eq!(category_for(ServiceType::NutritionConsultation), ServiceCategory::Consultation);
        assert_eq!(category_for(ServiceType::Endoscopy), ServiceCategory::Procedure);
        assert_eq!(category_for(ServiceType::Colonoscopy), ServiceCategory::Procedure);
    }

    #[test]
    fn sunday_is_closed_for_all_categories() {
        assert_eq!(window_for(ServiceCategory::Consultation, Weekday::Sun), DaySchedule::Closed);
        assert_eq!(window_for(ServiceCategory::Procedure, Weekday::Sun), DaySchedule::Closed);
    }

    #[test]
    fn weekday_and_saturday_hours() {
        let weekday = open(ServiceCategory::Consultation, Weekday::Wed);
        assert_eq!(weekday.start, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(weekday.end, NaiveTime::from_hms_opt(12, 30, 0).unwrap());

        let saturday = open(ServiceCategory::Procedure, Weekday::Sat);
        assert_eq!(saturday.start, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert_eq!(saturday.end, NaiveTime::from_hms_opt(14, 0, 0).unwrap());
    }

    #[test]
    fn every_open_window_is_well_formed() {
        for category in [ServiceCategory::Consultation, ServiceCategory::Procedure] {
            for weekday in [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri, Weekday::Sat] {
                let window = open(category, weekday);
                assert!(window.start < window.end);
            }
        }
    }
}
