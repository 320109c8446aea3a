pub mod grid;
pub mod inventory;

pub use grid::{flatten, unflatten, Grid, GridCell};
pub use inventory::{seats_out_of_range, validate_layout, LayoutError, SeatInventory};
