use crate::status::{TripScheduler, TripWindow};
use chrono::NaiveDateTime;
use fretado_catalog::seats_out_of_range;
use fretado_core::ConflictError;
use fretado_shared::{Layout, SeatNumber, Trip};
use uuid::Uuid;

/// The first other trip on `vehicle_id` whose window overlaps `candidate`.
///
/// Inactive trips and trips that are cancelled or ended (after refreshing their
/// status against `now`) never block the vehicle. `excluding` is the trip being edited.
pub fn find_vehicle_conflict<'a>(
    trips: impl IntoIterator<Item = &'a Trip>,
    vehicle_id: Uuid,
    candidate: &TripWindow,
    excluding: Option<Uuid>,
    scheduler: &TripScheduler,
    now: NaiveDateTime,
) -> Option<&'a Trip> {
    trips.into_iter().find(|trip| {
        trip.vehicle_id == Some(vehicle_id)
            && Some(trip.id) != excluding
            && trip.lifecycle.is_active()
            && !scheduler.status(trip, now).releases_vehicle()
            && scheduler.window(&trip.schedule).overlaps(candidate)
    })
}

/// Every allocated seat must exist on the new vehicle. The error lists each
/// offending seat.
pub fn check_capacity<'a>(
    allocated: impl IntoIterator<Item = &'a SeatNumber>,
    capacity: u32,
    layout: Option<&Layout>,
) -> Result<(), ConflictError> {
    let seats = seats_out_of_range(allocated, capacity, layout);
    if seats.is_empty() {
        Ok(())
    } else {
        Err(ConflictError::SeatsExceedCapacity { seats, capacity })
    }
}
