pub mod models;
pub mod pii;

pub use models::layout::{Cell, CellKind, Floor, Layout};
pub use models::lifecycle::Lifecycle;
pub use models::order::{BookingStatus, Order, Payer, PayerDocument, PaymentRecord, Reservation, ReservationState};
pub use models::passenger::Passenger;
pub use models::seat::SeatNumber;
pub use models::trip::{Trip, TripSchedule, TripStatus};
pub use models::vehicle::Vehicle;
pub use pii::Masked;
