use crate::document::payer_document;
use crate::finance::{PaymentLedger, PaymentRecordDraft};
use crate::manager::{OrderStateMachine, StatusTransition, TransitionError};
use chrono::{DateTime, Utc};
use fretado_core::{BusinessRules, EntityKind, ValidationError};
use fretado_shared::{Masked, Order, Payer, PaymentRecord, Reservation, SeatNumber};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use uuid::Uuid;

/// Payer fields as entered on the order form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerDraft {
    pub name: String,
    pub national_id: Option<String>,
    pub passport: Option<String>,
    pub rg: Option<String>,
    pub method: String,
    pub total: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationDraft {
    /// Set when editing a reservation that already exists
    pub reservation_id: Option<Uuid>,
    pub seat_number: String,
    pub passenger_id: Option<Uuid>,
    pub is_payer: bool,
}

impl ReservationDraft {
    pub fn new(seat_number: impl Into<String>, passenger_id: Uuid) -> Self {
        Self {
            reservation_id: None,
            seat_number: seat_number.into(),
            passenger_id: Some(passenger_id),
            is_payer: false,
        }
    }
}

/// A whole order save: creation when `order_id` is empty, edit otherwise
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub order_id: Option<Uuid>,
    pub payer: PayerDraft,
    pub payments: Vec<PaymentRecordDraft>,
    pub reservations: Vec<ReservationDraft>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedReservation {
    pub reservation_id: Option<Uuid>,
    pub seat_number: SeatNumber,
    pub passenger_id: Uuid,
    pub is_payer: bool,
}

/// A draft that passed every check that needs no stored data
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedOrder {
    pub order_id: Option<Uuid>,
    pub payer: Payer,
    pub payment_records: Vec<PaymentRecord>,
    pub reservations: Vec<ValidatedReservation>,
}

impl ValidatedOrder {
    pub fn seats(&self) -> impl Iterator<Item = &SeatNumber> {
        self.reservations.iter().map(|r| &r.seat_number)
    }
}

/// What an edit does to the reservations already stored for the order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangePlan {
    /// New reservations and reservations whose seat changed. Only these are
    /// checked against the trip's occupancy.
    pub seats_to_check: Vec<SeatNumber>,
    /// Active reservations left out of the draft; they get cancelled
    pub removed: Vec<Uuid>,
}

/// Result of applying a validated draft
#[derive(Debug, Clone)]
pub struct ChangeSet {
    pub order: Order,
    /// Every reservation of the order after the change, cancelled ones included
    pub reservations: Vec<Reservation>,
    /// The subset of `reservations` that must be written
    pub changed: Vec<Reservation>,
    pub transition: StatusTransition,
}

/// Turns order form drafts into orders and reservations
pub struct ChangeHandler;

impl ChangeHandler {
    /// Checks that need no stored data, in a fixed order: draft shape, payer
    /// document, payments, then seats repeated within the draft.
    pub fn validate(draft: &OrderDraft, rules: &BusinessRules) -> Result<ValidatedOrder, ValidationError> {
        if draft.reservations.is_empty() {
            return Err(ValidationError::NoReservations);
        }
        let name = draft.payer.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingField {
                entity: EntityKind::Order,
                field: "payer.name",
            });
        }

        let mut reservations = Vec::with_capacity(draft.reservations.len());
        for entry in &draft.reservations {
            let seat_number = SeatNumber::new(&entry.seat_number);
            if seat_number.is_blank() || seat_number.as_str().chars().count() > rules.seat_token_max_len {
                return Err(ValidationError::InvalidSeatToken {
                    token: entry.seat_number.clone(),
                });
            }
            let passenger_id = entry
                .passenger_id
                .ok_or_else(|| ValidationError::MissingPassenger {
                    seat: seat_number.clone(),
                })?;
            reservations.push(ValidatedReservation {
                reservation_id: entry.reservation_id,
                seat_number,
                passenger_id,
                is_payer: entry.is_payer,
            });
        }

        let document = payer_document(draft.payer.national_id.as_deref(), draft.payer.passport.as_deref())?;

        let total = PaymentLedger::parse_total(&draft.payer.total, rules.payment_scale)?;
        let payment_records = PaymentLedger::parse_records(&draft.payments, rules.payment_scale)?;
        PaymentLedger::check_within_total(total, &payment_records)?;

        let mut seen = HashSet::new();
        if let Some(repeated) = reservations.iter().find(|r| !seen.insert(&r.seat_number)) {
            return Err(ValidationError::DuplicateSeat {
                seat: repeated.seat_number.clone(),
            });
        }

        Ok(ValidatedOrder {
            order_id: draft.order_id,
            payer: Payer {
                name: name.to_string(),
                document: Masked(document),
                rg: draft
                    .payer
                    .rg
                    .as_deref()
                    .map(str::trim)
                    .filter(|rg| !rg.is_empty())
                    .map(str::to_string),
                method: draft.payer.method.trim().to_string(),
                total,
            },
            payment_records,
            reservations,
        })
    }

    /// Compare the draft with what is stored for the order. `existing` holds the
    /// order's reservations; it is empty for a new order.
    pub fn plan(existing: &[Reservation], validated: &ValidatedOrder) -> Result<ChangePlan, TransitionError> {
        let stored: HashMap<Uuid, &Reservation> = existing.iter().map(|r| (r.id, r)).collect();
        let mut seats_to_check = BTreeSet::new();
        let mut kept = HashSet::new();

        for entry in &validated.reservations {
            match entry.reservation_id {
                None => {
                    seats_to_check.insert(entry.seat_number.clone());
                }
                Some(id) => {
                    let current = stored.get(&id).ok_or(TransitionError::ReservationNotFound(id))?;
                    if current.is_cancelled() {
                        return Err(TransitionError::ReservationAlreadyCancelled(id));
                    }
                    if current.seat_number != entry.seat_number {
                        seats_to_check.insert(entry.seat_number.clone());
                    }
                    kept.insert(id);
                }
            }
        }

        let removed = existing
            .iter()
            .filter(|r| !r.is_cancelled() && !kept.contains(&r.id))
            .map(|r| r.id)
            .collect();

        Ok(ChangePlan {
            seats_to_check: seats_to_check.into_iter().collect(),
            removed,
        })
    }

    /// Build the order and its reservations from a validated draft, cancel the
    /// removed ones and re-evaluate the order status.
    pub fn apply(
        trip_id: Uuid,
        existing_order: Option<Order>,
        existing: Vec<Reservation>,
        validated: ValidatedOrder,
        plan: &ChangePlan,
        at: DateTime<Utc>,
    ) -> ChangeSet {
        let mut order = match existing_order {
            Some(mut order) => {
                order.payer = validated.payer;
                order.payment_records = validated.payment_records;
                order.edited_at = at;
                order
            }
            None => {
                let mut order = Order::new(trip_id, validated.payer);
                order.payment_records = validated.payment_records;
                order.created_at = at;
                order.edited_at = at;
                order
            }
        };

        let before: HashMap<Uuid, Reservation> = existing.iter().map(|r| (r.id, r.clone())).collect();
        let mut reservations = existing;

        for entry in validated.reservations {
            match entry
                .reservation_id
                .and_then(|id| reservations.iter_mut().find(|r| r.id == id))
            {
                Some(current) => {
                    current.seat_number = entry.seat_number;
                    current.passenger_id = entry.passenger_id;
                    current.is_payer = entry.is_payer;
                }
                None => reservations.push(Reservation::new(
                    order.id,
                    trip_id,
                    entry.seat_number,
                    entry.passenger_id,
                    entry.is_payer,
                )),
            }
        }

        for reservation in reservations.iter_mut().filter(|r| plan.removed.contains(&r.id)) {
            reservation.cancel(at);
        }

        let transition = OrderStateMachine::reevaluate(&mut order, &reservations, at);

        let changed = reservations
            .iter()
            .filter(|r| before.get(&r.id) != Some(*r))
            .cloned()
            .collect();

        ChangeSet {
            order,
            reservations,
            changed,
            transition,
        }
    }
}
