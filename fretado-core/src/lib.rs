pub mod account;
pub mod clock;
pub mod error;
pub mod repository;
pub mod rules;
pub mod unit_of_work;

pub use account::AccountContext;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ConflictError, CoreError, EntityKind, ValidationError};
pub use repository::{BookingStore, PassengerDirectory};
pub use rules::BusinessRules;
pub use unit_of_work::{CommitReceipt, Mutation, UnitOfWork};

pub type CoreResult<T> = Result<T, CoreError>;
