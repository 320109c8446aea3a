use crate::models::lifecycle::Lifecycle;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trip status in the lifecycle. Everything but `Cancelled` is derived from time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    #[default]
    Undefined,
    Created,
    Upcoming,
    InProgress,
    Ended,
    Cancelled,
}

impl TripStatus {
    /// Trips in these states never block a vehicle.
    pub fn releases_vehicle(&self) -> bool {
        matches!(self, TripStatus::Cancelled | TripStatus::Ended)
    }
}

/// Departure and return as entered (local wall-clock time)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripSchedule {
    pub depart_date: NaiveDate,
    pub depart_time: NaiveTime,
    pub return_date: Option<NaiveDate>,
    pub return_time: Option<NaiveTime>,
    pub one_way: bool,
}

impl TripSchedule {
    pub fn one_way(depart_date: NaiveDate, depart_time: NaiveTime) -> Self {
        Self {
            depart_date,
            depart_time,
            return_date: None,
            return_time: None,
            one_way: true,
        }
    }

    pub fn round_trip(departure: NaiveDateTime, back: NaiveDateTime) -> Self {
        Self {
            depart_date: departure.date(),
            depart_time: departure.time(),
            return_date: Some(back.date()),
            return_time: Some(back.time()),
            one_way: false,
        }
    }

    pub fn departure(&self) -> NaiveDateTime {
        self.depart_date.and_time(self.depart_time)
    }

    /// Stored return instant, if both parts were entered
    pub fn scheduled_return(&self) -> Option<NaiveDateTime> {
        match (self.return_date, self.return_time) {
            (Some(date), Some(time)) => Some(date.and_time(time)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub origin: String,
    pub destination: String,
    pub schedule: TripSchedule,
    pub vehicle_id: Option<Uuid>,
    /// Seat counts copied from the vehicle layout when the vehicle is assigned
    pub seats_first_floor: u32,
    pub seats_second_floor: u32,
    pub status: TripStatus,
    pub lifecycle: Lifecycle,
    pub version: u64,
}

impl Trip {
    pub fn new(origin: String, destination: String, schedule: TripSchedule) -> Self {
        Self {
            id: Uuid::new_v4(),
            origin,
            destination,
            schedule,
            vehicle_id: None,
            seats_first_floor: 0,
            seats_second_floor: 0,
            status: TripStatus::Undefined,
            lifecycle: Lifecycle::Active,
            version: 0,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.seats_first_floor + self.seats_second_floor
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == TripStatus::Cancelled
    }
}
