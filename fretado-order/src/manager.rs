use crate::finance::PaymentLedger;
use chrono::{DateTime, Utc};
use fretado_core::{ConflictError, CoreError, EntityKind};
use fretado_shared::{BookingStatus, Order, Reservation};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Status change produced by one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    pub from: BookingStatus,
    pub to: BookingStatus,
}

impl StatusTransition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Lifecycle of an order and the reservations beneath it.
///
/// Only cancellation is stored on a reservation. Every other status a
/// reservation shows is its order's, derived on read via
/// `Reservation::effective_status`.
pub struct OrderStateMachine;

impl OrderStateMachine {
    /// Cancelled once every reservation is, otherwise paid iff nothing remains to pay
    pub fn derive_status(reservations: &[Reservation], total: Decimal, paid: Decimal) -> BookingStatus {
        if reservations.iter().all(Reservation::is_cancelled) {
            BookingStatus::Cancelled
        } else if paid >= total {
            BookingStatus::Paid
        } else {
            BookingStatus::PaymentPending
        }
    }

    /// Recompute the order status after its reservations or payments changed
    pub fn reevaluate(order: &mut Order, reservations: &[Reservation], at: DateTime<Utc>) -> StatusTransition {
        let paid = PaymentLedger::paid(&order.payment_records);
        let to = Self::derive_status(reservations, order.payer.total, paid);
        let transition = StatusTransition {
            from: order.status,
            to,
        };
        if transition.changed() {
            order.status = to;
            order.edited_at = at;
        }
        transition
    }

    /// Cancel one reservation, then re-evaluate its order.
    /// Cancelling the last active reservation cancels the order.
    pub fn cancel_reservation(
        order: &mut Order,
        reservations: &mut [Reservation],
        reservation_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<StatusTransition, TransitionError> {
        let reservation = reservations
            .iter_mut()
            .find(|r| r.id == reservation_id)
            .ok_or(TransitionError::ReservationNotFound(reservation_id))?;

        if reservation.order_id != order.id {
            return Err(TransitionError::ForeignReservation {
                reservation_id,
                order_id: order.id,
            });
        }
        if !reservation.cancel(at) {
            return Err(TransitionError::ReservationAlreadyCancelled(reservation_id));
        }

        Ok(Self::reevaluate(order, reservations, at))
    }

    /// Cancel the order and force-cancel everything under it.
    /// Returns the ids of reservations that changed; cancelling again changes nothing.
    pub fn cancel_order(order: &mut Order, reservations: &mut [Reservation], at: DateTime<Utc>) -> Vec<Uuid> {
        let cancelled: Vec<Uuid> = reservations
            .iter_mut()
            .filter(|r| r.order_id == order.id)
            .filter_map(|r| r.cancel(at).then_some(r.id))
            .collect();

        if order.status != BookingStatus::Cancelled {
            order.status = BookingStatus::Cancelled;
            order.edited_at = at;
        }
        cancelled
    }

    /// A cancelled order has no active reservation left. With status derived on
    /// read, this is the only way a reservation could disagree with its order.
    pub fn is_mirrored(order: &Order, reservations: &[Reservation]) -> bool {
        order.status != BookingStatus::Cancelled
            || reservations
                .iter()
                .filter(|r| r.order_id == order.id)
                .all(Reservation::is_cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransitionError {
    #[error("Reservation not found: {0}")]
    ReservationNotFound(Uuid),

    #[error("Reservation {reservation_id} does not belong to order {order_id}")]
    ForeignReservation { reservation_id: Uuid, order_id: Uuid },

    #[error("Reservation already cancelled: {0}")]
    ReservationAlreadyCancelled(Uuid),
}

impl From<TransitionError> for CoreError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::ReservationNotFound(id) | TransitionError::ForeignReservation { reservation_id: id, .. } => {
                CoreError::not_found(EntityKind::Reservation, id)
            }
            TransitionError::ReservationAlreadyCancelled(id) => ConflictError::AlreadyCancelled {
                entity: EntityKind::Reservation,
                id,
            }
            .into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finance::PaymentRecordDraft;
    use fretado_shared::{Masked, Payer, PayerDocument, SeatNumber};
    use proptest::prelude::*;

    fn order(total: Decimal) -> Order {
        Order::new(
            Uuid::new_v4(),
            Payer {
                name: "Carla Reis".to_string(),
                document: Masked(PayerDocument::Passport("YB998877".to_string())),
                rg: None,
                method: "PIX".to_string(),
                total,
            },
        )
    }

    fn reservations(order: &Order, seats: &[&str]) -> Vec<Reservation> {
        seats
            .iter()
            .map(|s| Reservation::new(order.id, order.trip_id, SeatNumber::from(*s), Uuid::new_v4(), false))
            .collect()
    }

    #[test]
    fn test_order_lifecycle() {
        let mut order = order(Decimal::new(100, 0));
        let mut seats = reservations(&order, &["1", "2"]);

        // Undefined → PaymentPending
        let t = OrderStateMachine::reevaluate(&mut order, &seats, Utc::now());
        assert_eq!((t.from, t.to), (BookingStatus::Undefined, BookingStatus::PaymentPending));

        // PaymentPending → Paid
        PaymentLedger::add_record(&mut order, &PaymentRecordDraft::new("2024-05-01", "100", "PIX"), 2).unwrap();
        OrderStateMachine::reevaluate(&mut order, &seats, Utc::now());
        assert_eq!(order.status, BookingStatus::Paid);
        assert!(OrderStateMachine::is_mirrored(&order, &seats));

        // One cancelled seat keeps the order alive
        let first = seats[0].id;
        let t = OrderStateMachine::cancel_reservation(&mut order, &mut seats, first, Utc::now()).unwrap();
        assert!(!t.changed());
        assert_eq!(seats[0].effective_status(order.status), BookingStatus::Cancelled);
        assert_eq!(seats[1].effective_status(order.status), BookingStatus::Paid);

        // The last one cascades to the order
        let second = seats[1].id;
        let t = OrderStateMachine::cancel_reservation(&mut order, &mut seats, second, Utc::now()).unwrap();
        assert_eq!(t.to, BookingStatus::Cancelled);
        assert!(OrderStateMachine::is_mirrored(&order, &seats));
    }

    #[test]
    fn test_cancel_twice_is_rejected() {
        let mut order = order(Decimal::new(50, 0));
        let mut seats = reservations(&order, &["1", "2"]);
        let id = seats[0].id;

        OrderStateMachine::cancel_reservation(&mut order, &mut seats, id, Utc::now()).unwrap();
        let again = OrderStateMachine::cancel_reservation(&mut order, &mut seats, id, Utc::now());
        assert_eq!(again, Err(TransitionError::ReservationAlreadyCancelled(id)));
    }

    #[test]
    fn test_cancel_order_forces_reservations() {
        let mut order = order(Decimal::new(50, 0));
        let mut seats = reservations(&order, &["1", "2", "3"]);
        seats[2].cancel(Utc::now());

        let changed = OrderStateMachine::cancel_order(&mut order, &mut seats, Utc::now());
        assert_eq!(changed.len(), 2);
        assert_eq!(order.status, BookingStatus::Cancelled);
        assert!(seats.iter().all(Reservation::is_cancelled));

        let again = OrderStateMachine::cancel_order(&mut order, &mut seats, Utc::now());
        assert!(again.is_empty());
    }

    #[test]
    fn test_zero_total_is_paid() {
        let order = order(Decimal::ZERO);
        let seats = reservations(&order, &["1"]);
        assert_eq!(
            OrderStateMachine::derive_status(&seats, Decimal::ZERO, Decimal::ZERO),
            BookingStatus::Paid
        );
    }

    proptest! {
        #[test]
        fn prop_status_follows_reservations_and_payments(
            cancelled in prop::collection::vec(any::<bool>(), 1..6),
            total_cents in 0i64..100_000,
            paid_share in 0i64..=100,
        ) {
            let total = Decimal::new(total_cents, 2);
            let paid = Decimal::new(total_cents * paid_share / 100, 2);
            let mut order = order(total);
            let mut seats = reservations(&order, &vec!["1"; cancelled.len()]);
            for (seat, cancel) in seats.iter_mut().zip(&cancelled) {
                if *cancel {
                    seat.cancel(Utc::now());
                }
            }

            let status = OrderStateMachine::derive_status(&seats, total, paid);
            if cancelled.iter().all(|c| *c) {
                prop_assert_eq!(status, BookingStatus::Cancelled);
            } else if paid == total {
                prop_assert_eq!(status, BookingStatus::Paid);
            } else {
                prop_assert_eq!(status, BookingStatus::PaymentPending);
            }

            order.status = status;
            prop_assert!(OrderStateMachine::is_mirrored(&order, &seats));
        }
    }
}
