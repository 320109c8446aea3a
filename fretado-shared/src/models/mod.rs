pub mod layout;
pub mod lifecycle;
pub mod order;
pub mod passenger;
pub mod seat;
pub mod trip;
pub mod vehicle;
