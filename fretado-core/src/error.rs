use fretado_shared::SeatNumber;
use rust_decimal::Decimal;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Layout,
    Vehicle,
    Trip,
    Order,
    Reservation,
    Passenger,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Layout => "layout",
            EntityKind::Vehicle => "vehicle",
            EntityKind::Trip => "trip",
            EntityKind::Order => "order",
            EntityKind::Reservation => "reservation",
            EntityKind::Passenger => "passenger",
        };
        f.write_str(name)
    }
}

/// Rejected input. Raised before anything is written.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Order must contain at least one reservation")]
    NoReservations,

    #[error("Reservation for seat {seat} has no passenger")]
    MissingPassenger { seat: SeatNumber },

    #[error("Payer has neither a national ID nor a passport")]
    MissingPayerDocument,

    #[error("Invalid payer document: {reason}")]
    InvalidPayerDocument { reason: String },

    #[error("Missing required field {entity}.{field}")]
    MissingField { entity: EntityKind, field: &'static str },

    #[error("Payment total must not be negative")]
    NegativeTotal,

    #[error("Payment total {total} is not a valid amount")]
    InvalidTotal { total: Decimal },

    #[error("Payments of {paid} exceed the order total of {total}")]
    PaymentExceedsTotal { total: Decimal, paid: Decimal },

    #[error("Payment record {index} has an invalid {field}")]
    InvalidPaymentRecord { index: usize, field: &'static str },

    #[error("Seat {seat} is assigned more than once")]
    DuplicateSeat { seat: SeatNumber },

    #[error("Seat {seat} does not exist on this trip")]
    SeatOutOfRange { seat: SeatNumber },

    #[error("Invalid seat token {token:?}")]
    InvalidSeatToken { token: String },

    #[error("Layout has no seats")]
    NoSeats,

    #[error("Layout repeats seat numbers: {}", join_seats(.seats))]
    DuplicateSeatNumbers { seats: Vec<SeatNumber> },

    #[error("Invalid schedule: {reason}")]
    InvalidSchedule { reason: String },
}

/// The request was valid but collides with current data; re-prompt with fresh state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConflictError {
    #[error("Seat {seat} is already taken")]
    SeatTaken { seat: SeatNumber },

    #[error("Vehicle {vehicle_id} is already booked by trip {trip_id}")]
    VehicleDoubleBooked { vehicle_id: Uuid, trip_id: Uuid },

    #[error("Seats {} exceed the vehicle capacity of {capacity}", join_seats(.seats))]
    SeatsExceedCapacity { seats: Vec<SeatNumber>, capacity: u32 },

    #[error("Plate {plate} is already used by an active vehicle")]
    DuplicatePlate { plate: String },

    #[error("{entity} {id} was modified concurrently")]
    StaleWrite { entity: EntityKind, id: Uuid },

    #[error("{entity} {id} is cancelled")]
    AlreadyCancelled { entity: EntityKind, id: Uuid },
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Conflict: {0}")]
    Conflict(#[from] ConflictError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: Uuid },

    /// A cascade was only partly applied; re-run the operation.
    #[error("Inconsistent state after {operation}: {detail}")]
    ConsistencyFault { operation: String, detail: String },

    /// The store rejected a commit and applied nothing.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CoreError {
    pub fn not_found(entity: EntityKind, id: Uuid) -> Self {
        CoreError::NotFound { entity, id }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::Conflict(ConflictError::StaleWrite { .. })
                | CoreError::ConsistencyFault { .. }
                | CoreError::Storage(_)
        )
    }
}

fn join_seats(seats: &[SeatNumber]) -> String {
    seats
        .iter()
        .map(SeatNumber::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
