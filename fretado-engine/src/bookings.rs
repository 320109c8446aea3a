use crate::state::BookingEngine;
use fretado_catalog::{seats_out_of_range, SeatInventory};
use fretado_core::{AccountContext, ConflictError, CoreError, CoreResult, EntityKind, UnitOfWork, ValidationError};
use fretado_order::{
    ChangeHandler, LedgerSummary, OrderDraft, OrderStateMachine, PaymentLedger, PaymentRecordDraft, StatusTransition,
};
use fretado_shared::{BookingStatus, Layout, Order, Reservation, SeatNumber, Trip};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Non-blocking findings of a save. The order was stored anyway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingWarning {
    /// The passenger already travels on this trip under another reservation
    DuplicatePassenger { passenger_id: Uuid, seat: SeatNumber },
}

#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub order: Order,
    pub reservations: Vec<Reservation>,
    pub warnings: Vec<BookingWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: Uuid,
    pub status: BookingStatus,
    pub total: Decimal,
    pub paid: Decimal,
    pub remaining: Decimal,
}

impl BookingEngine {
    /// Create an order (no `order_id` in the draft) or save an edit of one.
    ///
    /// Nothing is written unless every check passes. Seat availability is only
    /// checked for new reservations and changed seats.
    pub async fn save_order(&self, ctx: &AccountContext, trip_id: Uuid, draft: OrderDraft) -> CoreResult<SaveOutcome> {
        let validated = ChangeHandler::validate(&draft, self.rules())?;

        let trip = self.bookable_trip(ctx, trip_id).await?;
        let (existing_order, existing) = match validated.order_id {
            Some(order_id) => {
                let order = self.load_order(ctx, order_id).await?;
                if order.trip_id != trip_id {
                    return Err(CoreError::not_found(EntityKind::Order, order_id));
                }
                if order.is_cancelled() {
                    return Err(ConflictError::AlreadyCancelled {
                        entity: EntityKind::Order,
                        id: order_id,
                    }
                    .into());
                }
                let reservations = self.store.reservations_for_order(ctx, order_id).await?;
                (Some(order), reservations)
            }
            None => (None, Vec::new()),
        };
        let plan = ChangeHandler::plan(&existing, &validated)?;

        for reservation in &validated.reservations {
            self.active_passenger(ctx, reservation.passenger_id).await?;
        }

        self.check_seat_range(ctx, &trip, &plan.seats_to_check).await?;

        let inventory = self.inventory(ctx, trip_id).await?;
        for seat in &plan.seats_to_check {
            let available = match validated.order_id {
                Some(order_id) => inventory.is_seat_available_for_order(seat, order_id),
                None => inventory.is_seat_available(seat, None),
            };
            if !available {
                debug!(trip_id = %trip_id, seat = %seat, "Seat already taken");
                return Err(ConflictError::SeatTaken { seat: seat.clone() }.into());
            }
        }

        let mut warnings = Vec::new();
        let mut in_draft = HashSet::new();
        for reservation in &validated.reservations {
            let elsewhere = match validated.order_id {
                Some(order_id) => inventory.duplicate_passenger_outside_order(reservation.passenger_id, order_id),
                None => inventory.duplicate_passenger(reservation.passenger_id, None),
            };
            if elsewhere || !in_draft.insert(reservation.passenger_id) {
                warnings.push(BookingWarning::DuplicatePassenger {
                    passenger_id: reservation.passenger_id,
                    seat: reservation.seat_number.clone(),
                });
            }
        }

        let set = ChangeHandler::apply(trip_id, existing_order, existing, validated, &plan, self.timestamp());
        let order_id = set.order.id;

        let mut work = UnitOfWork::new("save_order");
        // re-put at the version read above: a concurrent allocation on this trip fails one of the two commits
        work.put_trip(trip);
        work.put_order(set.order);
        for reservation in set.changed {
            work.put_reservation(reservation);
        }
        self.store.commit(ctx, work).await?;

        if !warnings.is_empty() {
            warn!(order_id = %order_id, warnings = ?warnings, "Order saved with warnings");
        }
        info!(
            order_id = %order_id,
            trip_id = %trip_id,
            seats = plan.seats_to_check.len(),
            cancelled = plan.removed.len(),
            status = %set.transition.to,
            "Order saved"
        );

        Ok(SaveOutcome {
            order: self.load_order(ctx, order_id).await?,
            reservations: self.store.reservations_for_order(ctx, order_id).await?,
            warnings,
        })
    }

    /// Record a payment. Rejected without any change if it would exceed the total.
    pub async fn add_payment(
        &self,
        ctx: &AccountContext,
        order_id: Uuid,
        draft: PaymentRecordDraft,
    ) -> CoreResult<LedgerSummary> {
        let mut order = self.open_order(ctx, order_id).await?;
        PaymentLedger::add_record(&mut order, &draft, self.rules().payment_scale)?;
        self.commit_payments(ctx, order, "add_payment").await
    }

    pub async fn remove_payment(&self, ctx: &AccountContext, order_id: Uuid, index: usize) -> CoreResult<LedgerSummary> {
        let mut order = self.open_order(ctx, order_id).await?;
        PaymentLedger::remove_record(&mut order, index, self.rules().payment_scale)?;
        self.commit_payments(ctx, order, "remove_payment").await
    }

    /// Cancel one reservation. The last active one takes its order with it.
    pub async fn cancel_reservation(&self, ctx: &AccountContext, reservation_id: Uuid) -> CoreResult<StatusTransition> {
        let reservation = self.load_reservation(ctx, reservation_id).await?;
        let mut order = self.load_order(ctx, reservation.order_id).await?;
        let mut reservations = self.store.reservations_for_order(ctx, order.id).await?;

        let transition =
            OrderStateMachine::cancel_reservation(&mut order, &mut reservations, reservation_id, self.timestamp())?;

        let mut work = UnitOfWork::new("cancel_reservation");
        work.put_order(order);
        for cancelled in reservations.into_iter().filter(|r| r.id == reservation_id) {
            work.put_reservation(cancelled);
        }
        self.store.commit(ctx, work).await?;

        info!(reservation_id = %reservation_id, order_status = %transition.to, "Reservation cancelled");
        Ok(transition)
    }

    /// Cancel the order and every reservation under it.
    ///
    /// Cancelling a fully cancelled order is a conflict; one left half cancelled is finished.
    pub async fn cancel_order(&self, ctx: &AccountContext, order_id: Uuid) -> CoreResult<Vec<Uuid>> {
        let mut order = self.load_order(ctx, order_id).await?;
        let mut reservations = self.store.reservations_for_order(ctx, order_id).await?;
        if order.is_cancelled() && reservations.iter().all(Reservation::is_cancelled) {
            return Err(ConflictError::AlreadyCancelled {
                entity: EntityKind::Order,
                id: order_id,
            }
            .into());
        }

        let cancelled = OrderStateMachine::cancel_order(&mut order, &mut reservations, self.timestamp());

        let mut work = UnitOfWork::new("cancel_order");
        work.put_order(order);
        for reservation in reservations.into_iter().filter(|r| cancelled.contains(&r.id)) {
            work.put_reservation(reservation);
        }
        self.store.commit(ctx, work).await?;

        info!(order_id = %order_id, reservations = cancelled.len(), "Order cancelled");
        Ok(cancelled)
    }

    /// Seats held by reservations that are not cancelled
    pub async fn occupied_seats(&self, ctx: &AccountContext, trip_id: Uuid) -> CoreResult<BTreeSet<SeatNumber>> {
        Ok(self.inventory(ctx, trip_id).await?.occupied_seats())
    }

    pub async fn is_seat_available(
        &self,
        ctx: &AccountContext,
        trip_id: Uuid,
        seat: &SeatNumber,
        excluding_reservation: Option<Uuid>,
    ) -> CoreResult<bool> {
        Ok(self
            .inventory(ctx, trip_id)
            .await?
            .is_seat_available(seat, excluding_reservation))
    }

    /// Free seats in display order. Without a layout, seats are numbered `1..=capacity`.
    pub async fn available_seats(&self, ctx: &AccountContext, trip_id: Uuid) -> CoreResult<Vec<SeatNumber>> {
        let trip = self.load_trip(ctx, trip_id).await?;
        let inventory = self.inventory(ctx, trip_id).await?;
        match self.trip_layout(ctx, &trip).await? {
            Some(layout) => Ok(inventory.available_seats(&layout)),
            None => Ok(inventory.available_by_count(trip.capacity())),
        }
    }

    pub async fn duplicate_passenger_in_trip(
        &self,
        ctx: &AccountContext,
        trip_id: Uuid,
        passenger_id: Uuid,
        excluding_reservation: Option<Uuid>,
    ) -> CoreResult<bool> {
        Ok(self
            .inventory(ctx, trip_id)
            .await?
            .duplicate_passenger(passenger_id, excluding_reservation))
    }

    pub async fn order_summary(&self, ctx: &AccountContext, order_id: Uuid) -> CoreResult<OrderSummary> {
        let order = self.load_order(ctx, order_id).await?;
        let ledger = PaymentLedger::summary(&order, self.rules().payment_scale);
        Ok(OrderSummary {
            order_id,
            status: order.status,
            total: ledger.total,
            paid: ledger.paid,
            remaining: ledger.remaining,
        })
    }

    /// Displayed status: the reservation's own cancellation, otherwise its order's status
    pub async fn reservation_status(&self, ctx: &AccountContext, reservation_id: Uuid) -> CoreResult<BookingStatus> {
        let reservation = self.load_reservation(ctx, reservation_id).await?;
        let order = self.load_order(ctx, reservation.order_id).await?;
        Ok(reservation.effective_status(order.status))
    }

    /// Occupancy snapshot of one trip
    pub async fn inventory(&self, ctx: &AccountContext, trip_id: Uuid) -> CoreResult<SeatInventory> {
        let orders = self.store.orders_for_trip(ctx, trip_id).await?;
        let reservations = self.store.reservations_for_trip(ctx, trip_id).await?;
        Ok(SeatInventory::from_bookings(&orders, &reservations))
    }

    async fn bookable_trip(&self, ctx: &AccountContext, trip_id: Uuid) -> CoreResult<Trip> {
        let trip = self.load_trip(ctx, trip_id).await?;
        if !trip.lifecycle.is_active() {
            return Err(CoreError::not_found(EntityKind::Trip, trip_id));
        }
        if trip.is_cancelled() {
            return Err(ConflictError::AlreadyCancelled {
                entity: EntityKind::Trip,
                id: trip_id,
            }
            .into());
        }
        Ok(trip)
    }

    async fn open_order(&self, ctx: &AccountContext, order_id: Uuid) -> CoreResult<Order> {
        let order = self.load_order(ctx, order_id).await?;
        if order.is_cancelled() {
            return Err(ConflictError::AlreadyCancelled {
                entity: EntityKind::Order,
                id: order_id,
            }
            .into());
        }
        Ok(order)
    }

    async fn commit_payments(&self, ctx: &AccountContext, mut order: Order, operation: &'static str) -> CoreResult<LedgerSummary> {
        let reservations = self.store.reservations_for_order(ctx, order.id).await?;
        let transition = OrderStateMachine::reevaluate(&mut order, &reservations, self.timestamp());
        order.edited_at = self.timestamp();
        let summary = PaymentLedger::summary(&order, self.rules().payment_scale);
        let order_id = order.id;

        let mut work = UnitOfWork::new(operation);
        work.put_order(order);
        self.store.commit(ctx, work).await?;

        info!(order_id = %order_id, paid = %summary.paid, remaining = %summary.remaining, status = %transition.to, "{}", operation);
        Ok(summary)
    }

    /// Seats are only range-checked when the trip has a vehicle to check against
    async fn check_seat_range(&self, ctx: &AccountContext, trip: &Trip, seats: &[SeatNumber]) -> CoreResult<()> {
        if trip.vehicle_id.is_none() || seats.is_empty() {
            return Ok(());
        }
        let layout = self.trip_layout(ctx, trip).await?;
        match seats_out_of_range(seats, trip.capacity(), layout.as_ref()).into_iter().next() {
            Some(seat) => Err(ValidationError::SeatOutOfRange { seat }.into()),
            None => Ok(()),
        }
    }

    async fn trip_layout(&self, ctx: &AccountContext, trip: &Trip) -> CoreResult<Option<Layout>> {
        match trip.vehicle_id {
            Some(vehicle_id) => {
                let vehicle = self.load_vehicle(ctx, vehicle_id).await?;
                self.vehicle_layout(ctx, &vehicle).await
            }
            None => Ok(None),
        }
    }
}
