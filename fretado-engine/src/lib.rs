pub mod bookings;
pub mod fleet;
pub mod state;
pub mod telemetry;
pub mod trips;

pub use bookings::{BookingWarning, OrderSummary, SaveOutcome};
pub use fleet::{SeatCounts, VehicleDraft};
pub use state::BookingEngine;
pub use trips::{CancellationSummary, TripDraft};
