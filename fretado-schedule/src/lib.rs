pub mod conflict;
pub mod status;

pub use conflict::{check_capacity, find_vehicle_conflict};
pub use status::{derive_status, TripScheduler, TripWindow};
