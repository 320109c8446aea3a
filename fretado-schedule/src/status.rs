use chrono::{Duration, NaiveDateTime};
use fretado_core::{BusinessRules, ValidationError};
use fretado_shared::{Trip, TripSchedule, TripStatus};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Closed interval `[start, end]` a trip occupies its vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TripWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// One-way trips (and round trips with no return entered) get a synthetic
    /// end of `one_way_window_hours` after departure.
    pub fn of(schedule: &TripSchedule, rules: &BusinessRules) -> Self {
        let start = schedule.departure();
        let synthetic = start + Duration::hours(i64::from(rules.one_way_window_hours));
        let end = if schedule.one_way {
            synthetic
        } else {
            schedule.scheduled_return().unwrap_or(synthetic)
        };
        Self { start, end }
    }

    /// Inclusive: windows that only touch at an endpoint still overlap.
    pub fn overlaps(&self, other: &TripWindow) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at <= self.end
    }
}

/// First match wins; a stored `Cancelled` is never recomputed.
pub fn derive_status(stored: TripStatus, window: &TripWindow, now: NaiveDateTime, rules: &BusinessRules) -> TripStatus {
    let horizon = now + Duration::days(i64::from(rules.upcoming_window_days));

    if stored == TripStatus::Cancelled {
        TripStatus::Cancelled
    } else if window.start > horizon {
        TripStatus::Created
    } else if window.contains(now) {
        TripStatus::InProgress
    } else if now < window.start {
        TripStatus::Upcoming
    } else if window.end < now {
        TripStatus::Ended
    } else {
        TripStatus::Undefined
    }
}

/// Time-driven trip status
#[derive(Debug, Clone, Default)]
pub struct TripScheduler {
    rules: BusinessRules,
}

impl TripScheduler {
    pub fn new(rules: BusinessRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &BusinessRules {
        &self.rules
    }

    pub fn window(&self, schedule: &TripSchedule) -> TripWindow {
        TripWindow::of(schedule, &self.rules)
    }

    pub fn status(&self, trip: &Trip, now: NaiveDateTime) -> TripStatus {
        let status = derive_status(trip.status, &self.window(&trip.schedule), now, &self.rules);
        if status == TripStatus::Undefined {
            warn!(trip_id = %trip.id, departure = %trip.schedule.departure(), "Trip status could not be derived");
        }
        status
    }

    /// Recompute the status in place. Returns true only when it changed, so an
    /// already-correct trip is never written again.
    pub fn refresh(&self, trip: &mut Trip, now: NaiveDateTime) -> bool {
        let status = self.status(trip, now);
        if status == trip.status {
            return false;
        }
        trip.status = status;
        true
    }

    /// A round trip needs a return that is not before the departure
    pub fn validate_schedule(&self, schedule: &TripSchedule) -> Result<(), ValidationError> {
        if schedule.one_way {
            return Ok(());
        }
        match schedule.scheduled_return() {
            None => Err(ValidationError::InvalidSchedule {
                reason: "round trip has no return date and time".to_string(),
            }),
            Some(back) if back < schedule.departure() => Err(ValidationError::InvalidSchedule {
                reason: format!("return {} is before departure {}", back, schedule.departure()),
            }),
            Some(_) => Ok(()),
        }
    }
}
