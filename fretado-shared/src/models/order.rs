use crate::models::seat::SeatNumber;
use crate::pii::Masked;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Order status, also shown on every reservation that is not individually cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    /// Only seen before the first evaluation
    #[default]
    Undefined,
    PaymentPending,
    Paid,
    Cancelled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BookingStatus::Undefined => "UNDEFINED",
            BookingStatus::PaymentPending => "PAYMENT_PENDING",
            BookingStatus::Paid => "PAID",
            BookingStatus::Cancelled => "CANCELLED",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "number", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayerDocument {
    NationalId(String),
    Passport(String),
}

impl fmt::Display for PayerDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayerDocument::NationalId(number) => write!(f, "CPF {}", number),
            PayerDocument::Passport(number) => write!(f, "passport {}", number),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payer {
    pub name: String,
    pub document: Masked<PayerDocument>,
    pub rg: Option<String>,
    pub method: String,
    pub total: Decimal,
}

/// One installment recorded against an order. Amounts are recorded, not processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub method: String,
}

/// Billing unit grouping one or more reservations for a single payer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub payer: Payer,
    pub payment_records: Vec<PaymentRecord>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub edited_at: DateTime<Utc>,
    pub version: u64,
}

impl Order {
    pub fn new(trip_id: Uuid, payer: Payer) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            trip_id,
            payer,
            payment_records: Vec::new(),
            status: BookingStatus::Undefined,
            created_at: now,
            edited_at: now,
            version: 0,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == BookingStatus::Cancelled
    }
}

/// Only cancellation is stored per reservation; any other status comes from the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationState {
    #[default]
    Active,
    Cancelled { at: DateTime<Utc> },
}

/// One passenger on one seat of one trip, under one order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub order_id: Uuid,
    pub trip_id: Uuid,
    pub seat_number: SeatNumber,
    pub passenger_id: Uuid,
    pub is_payer: bool,
    pub state: ReservationState,
    pub version: u64,
}

impl Reservation {
    pub fn new(order_id: Uuid, trip_id: Uuid, seat_number: SeatNumber, passenger_id: Uuid, is_payer: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            trip_id,
            seat_number,
            passenger_id,
            is_payer,
            state: ReservationState::Active,
            version: 0,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.state, ReservationState::Cancelled { .. })
    }

    /// Mark as cancelled (never delete). Returns false if it already was.
    pub fn cancel(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.state = ReservationState::Cancelled { at };
        true
    }

    /// Status as displayed: its own cancellation, otherwise whatever the order shows
    pub fn effective_status(&self, order_status: BookingStatus) -> BookingStatus {
        if self.is_cancelled() {
            BookingStatus::Cancelled
        } else {
            order_status
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reservation_mirrors_order_until_cancelled() {
        let mut reservation = Reservation::new(Uuid::new_v4(), Uuid::new_v4(), SeatNumber::from("4"), Uuid::new_v4(), false);

        assert_eq!(reservation.effective_status(BookingStatus::Paid), BookingStatus::Paid);
        assert!(reservation.cancel(Utc::now()));
        assert!(!reservation.cancel(Utc::now()));
        assert_eq!(reservation.effective_status(BookingStatus::Paid), BookingStatus::Cancelled);
    }

    #[test]
    fn test_payer_document_is_masked_in_debug() {
        let payer = Payer {
            name: "Maria Souza".to_string(),
            document: Masked(PayerDocument::NationalId("52998224725".to_string())),
            rg: None,
            method: "PIX".to_string(),
            total: Decimal::new(10000, 2),
        };

        let debug = format!("{:?}", payer);
        assert!(!debug.contains("52998224725"));

        let json = serde_json::to_value(&payer).unwrap();
        assert_eq!(json["document"]["number"], "52998224725");
    }
}
