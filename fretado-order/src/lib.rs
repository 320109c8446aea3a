pub mod changes;
pub mod document;
pub mod finance;
pub mod manager;

pub use changes::{ChangeHandler, ChangePlan, ChangeSet, OrderDraft, PayerDraft, ReservationDraft, ValidatedOrder};
pub use document::{payer_document, validate_cpf, validate_passport};
pub use finance::{parse_amount, LedgerError, LedgerSummary, PaymentLedger, PaymentRecordDraft};
pub use manager::{OrderStateMachine, StatusTransition, TransitionError};
