//! Booking-window policy for self-service appointments.
//!
//! Pure: the caller supplies `now`, nothing reads a clock. Checks run in a
//! fixed order and the first failure wins:
//! 1. strictly in the future
//! 2. at least the minimum lead time away
//! 3. not on a weekend day
//! 4. start hour inside business hours
//!
//! Overlap with other bookings is not this module's concern; the ledger
//! guards the per-doctor slot.

use chrono::{Datelike, Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SchedulingConfig;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulingRejection {
    #[error("Appointment time must be in the future")]
    PastOrPresent,

    #[error("Appointments must be scheduled at least {hours} hours in advance")]
    InsufficientLeadTime { hours: i64 },

    #[error("Appointments are only available on weekdays")]
    WeekendNotAllowed,

    #[error("Appointments are only available between {open}:00 and {close}:00")]
    OutsideBusinessHours { open: u32, close: u32 },
}

impl SchedulingRejection {
    pub fn code(&self) -> &'static str {
        match self {
            Self::PastOrPresent => "PAST_OR_PRESENT",
            Self::InsufficientLeadTime { .. } => "INSUFFICIENT_LEAD_TIME",
            Self::WeekendNotAllowed => "WEEKEND_NOT_ALLOWED",
            Self::OutsideBusinessHours { .. } => "OUTSIDE_BUSINESS_HOURS",
        }
    }
}

/// Decide whether `proposed` is an admissible start time as seen from `now`.
pub fn validate(
    proposed: NaiveDateTime,
    now: NaiveDateTime,
    config: &SchedulingConfig,
) -> Result<(), SchedulingRejection> {
    if proposed <= now {
        return Err(SchedulingRejection::PastOrPresent);
    }

    // An unrepresentable lead time means no start is ever far enough away.
    let earliest = Duration::try_hours(config.minimum_lead_time_hours)
        .and_then(|lead| now.checked_add_signed(lead));
    if earliest.map_or(true, |earliest| proposed < earliest) {
        return Err(SchedulingRejection::InsufficientLeadTime {
            hours: config.minimum_lead_time_hours,
        });
    }

    if config.weekend_days.contains(&proposed.weekday()) {
        return Err(SchedulingRejection::WeekendNotAllowed);
    }

    let hour = proposed.hour();
    if hour < config.business_open_hour || hour >= config.business_close_hour {
        return Err(SchedulingRejection::OutsideBusinessHours {
            open: config.business_open_hour,
            close: config.business_close_hour,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Weekday};

    // 2026-03-02 is a Monday.
    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn rules() -> SchedulingConfig {
        SchedulingConfig::default()
    }

    #[test]
    fn calendar_anchor_is_monday() {
        assert_eq!(at(2, 0, 0).weekday(), Weekday::Mon);
    }

    #[test]
    fn weekday_business_hours_with_lead_time_accepted() {
        let now = at(2, 9, 0);
        // Thursday 10:00, three days out
        assert_eq!(validate(at(5, 10, 0), now, &rules()), Ok(()));
    }

    #[test]
    fn every_weekday_slot_accepted() {
        let now = at(1, 7, 0); // Sunday
        for day in 2..=6 {
            for hour in 8..18 {
                assert_eq!(
                    validate(at(day, hour, 30), now, &rules()),
                    Ok(()),
                    "day {day} hour {hour}"
                );
            }
        }
    }

    #[test]
    fn past_rejected_first() {
        let now = at(4, 12, 0);
        // Sunday 03:00 in the past breaks every rule; the first one wins.
        assert_eq!(
            validate(at(1, 3, 0), now, &rules()),
            Err(SchedulingRejection::PastOrPresent)
        );
    }

    #[test]
    fn present_moment_is_rejected() {
        let now = at(4, 12, 0);
        assert_eq!(
            validate(now, now, &rules()),
            Err(SchedulingRejection::PastOrPresent)
        );
    }

    #[test]
    fn within_lead_time_rejected_even_in_business_hours() {
        let now = at(3, 9, 0);
        assert_eq!(
            validate(at(3, 15, 0), now, &rules()),
            Err(SchedulingRejection::InsufficientLeadTime { hours: 24 })
        );
        assert_eq!(
            validate(at(4, 8, 59), now, &rules()),
            Err(SchedulingRejection::InsufficientLeadTime { hours: 24 })
        );
    }

    #[test]
    fn exactly_lead_time_is_enough() {
        let now = at(3, 9, 0);
        assert_eq!(validate(at(4, 9, 0), now, &rules()), Ok(()));
    }

    #[test]
    fn weekend_rejected() {
        let now = at(2, 9, 0);
        assert_eq!(
            validate(at(7, 10, 0), now, &rules()),
            Err(SchedulingRejection::WeekendNotAllowed)
        );
        assert_eq!(
            validate(at(8, 10, 0), now, &rules()),
            Err(SchedulingRejection::WeekendNotAllowed)
        );
    }

    #[test]
    fn weekend_checked_before_hours() {
        let now = at(2, 9, 0);
        assert_eq!(
            validate(at(7, 22, 0), now, &rules()),
            Err(SchedulingRejection::WeekendNotAllowed)
        );
    }

    #[test]
    fn business_hour_boundaries() {
        let now = at(2, 9, 0);
        let outside = Err(SchedulingRejection::OutsideBusinessHours { open: 8, close: 18 });
        assert_eq!(validate(at(5, 7, 59), now, &rules()), outside);
        assert_eq!(validate(at(5, 18, 0), now, &rules()), outside);
        assert_eq!(validate(at(5, 8, 0), now, &rules()), Ok(()));
        assert_eq!(validate(at(5, 17, 59), now, &rules()), Ok(()));
    }

    #[test]
    fn configured_rules_apply() {
        let config = SchedulingConfig {
            minimum_lead_time_hours: 2,
            business_open_hour: 7,
            business_close_hour: 20,
            weekend_days: vec![Weekday::Sun],
        };
        let now = at(2, 9, 0);
        assert_eq!(validate(at(2, 19, 0), now, &config), Ok(()));
        assert_eq!(validate(at(7, 10, 0), now, &config), Ok(()));
        assert_eq!(
            validate(at(8, 10, 0), now, &config),
            Err(SchedulingRejection::WeekendNotAllowed)
        );
        assert_eq!(
            validate(at(2, 10, 0), now, &config),
            Err(SchedulingRejection::InsufficientLeadTime { hours: 2 })
        );
    }

    #[test]
    fn overflowing_lead_time_rejects_instead_of_panicking() {
        let config = SchedulingConfig {
            minimum_lead_time_hours: i64::MAX,
            ..rules()
        };
        assert_eq!(
            validate(at(5, 10, 0), at(2, 9, 0), &config),
            Err(SchedulingRejection::InsufficientLeadTime { hours: i64::MAX })
        );

        let config = SchedulingConfig {
            minimum_lead_time_hours: 10_000_000_000,
            ..rules()
        };
        assert!(validate(at(5, 10, 0), at(2, 9, 0), &config).is_err());
    }

    #[test]
    fn rejection_codes_are_stable() {
        assert_eq!(SchedulingRejection::PastOrPresent.code(), "PAST_OR_PRESENT");
        assert_eq!(
            SchedulingRejection::OutsideBusinessHours { open: 8, close: 18 }.to_string(),
            "Appointments are only available between 8:00 and 18:00"
        );
    }
}
