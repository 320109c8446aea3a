use crate::state::BookingEngine;
use fretado_catalog::SeatInventory;
use fretado_core::{AccountContext, ConflictError, CoreError, CoreResult, EntityKind, UnitOfWork, ValidationError};
use fretado_order::OrderStateMachine;
use fretado_schedule::{check_capacity, find_vehicle_conflict, TripWindow};
use fretado_shared::{Floor, Trip, TripSchedule, TripStatus, Vehicle};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripDraft {
    pub origin: String,
    pub destination: String,
    pub schedule: TripSchedule,
    pub vehicle_id: Option<Uuid>,
}

/// What one `cancel_trip` run changed. All zeros when the trip was already fully cancelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationSummary {
    pub trip_changed: bool,
    pub orders_cancelled: usize,
    pub reservations_cancelled: usize,
}

impl CancellationSummary {
    pub fn is_noop(&self) -> bool {
        !self.trip_changed && self.orders_cancelled == 0 && self.reservations_cancelled == 0
    }
}

impl BookingEngine {
    pub async fn create_trip(&self, ctx: &AccountContext, draft: TripDraft) -> CoreResult<Trip> {
        let origin = draft.origin.trim();
        let destination = draft.destination.trim();
        for (field, value) in [("origin", origin), ("destination", destination)] {
            if value.is_empty() {
                return Err(ValidationError::MissingField {
                    entity: EntityKind::Trip,
                    field,
                }
                .into());
            }
        }
        self.scheduler.validate_schedule(&draft.schedule)?;

        let mut trip = Trip::new(origin.to_string(), destination.to_string(), draft.schedule);
        let mut work = UnitOfWork::new("create_trip");
        if let Some(vehicle_id) = draft.vehicle_id {
            let vehicle = self.assignable_vehicle(ctx, vehicle_id).await?;
            self.ensure_vehicle_free(ctx, &trip, vehicle_id).await?;
            self.copy_seat_counts(ctx, &mut trip, &vehicle).await?;
            trip.vehicle_id = Some(vehicle_id);
            // vehicle re-put at its read version: two trips racing for it cannot both commit
            work.put_vehicle(vehicle);
        }
        self.scheduler.refresh(&mut trip, self.now());

        work.put_trip(trip.clone());
        self.store.commit(ctx, work).await?;

        info!(trip_id = %trip.id, status = ?trip.status, vehicle_id = ?trip.vehicle_id, "Trip created");
        self.load_trip(ctx, trip.id).await
    }

    /// Move a trip in time. Its vehicle must still be free in the new window.
    pub async fn reschedule_trip(&self, ctx: &AccountContext, trip_id: Uuid, schedule: TripSchedule) -> CoreResult<Trip> {
        let mut trip = self.editable_trip(ctx, trip_id).await?;
        self.scheduler.validate_schedule(&schedule)?;
        trip.schedule = schedule;

        let mut work = UnitOfWork::new("reschedule_trip");
        if let Some(vehicle_id) = trip.vehicle_id {
            let vehicle = self.load_vehicle(ctx, vehicle_id).await?;
            self.ensure_vehicle_free(ctx, &trip, vehicle_id).await?;
            work.put_vehicle(vehicle);
        }
        self.scheduler.refresh(&mut trip, self.now());

        work.put_trip(trip);
        self.store.commit(ctx, work).await?;

        info!(trip_id = %trip_id, "Trip rescheduled");
        self.load_trip(ctx, trip_id).await
    }

    /// Put the trip on another vehicle. Every seat already sold must exist on it.
    pub async fn reassign_vehicle(&self, ctx: &AccountContext, trip_id: Uuid, vehicle_id: Uuid) -> CoreResult<Trip> {
        let mut trip = self.editable_trip(ctx, trip_id).await?;
        let vehicle = self.assignable_vehicle(ctx, vehicle_id).await?;
        self.ensure_vehicle_free(ctx, &trip, vehicle_id).await?;

        let layout = self.vehicle_layout(ctx, &vehicle).await?;
        let capacity = layout.as_ref().map_or(0, |l| l.total_seats());
        let occupied = self.inventory(ctx, trip_id).await?.occupied_seats();
        check_capacity(&occupied, capacity, layout.as_ref())?;

        self.copy_seat_counts(ctx, &mut trip, &vehicle).await?;
        trip.vehicle_id = Some(vehicle_id);

        let mut work = UnitOfWork::new("reassign_vehicle");
        work.put_vehicle(vehicle);
        work.put_trip(trip);
        self.store.commit(ctx, work).await?;

        info!(trip_id = %trip_id, vehicle_id = %vehicle_id, capacity, "Vehicle reassigned");
        self.load_trip(ctx, trip_id).await
    }

    /// Trip with its status brought up to date. Written back only if it changed.
    pub async fn get_trip(&self, ctx: &AccountContext, trip_id: Uuid) -> CoreResult<Trip> {
        let mut trip = self.load_trip(ctx, trip_id).await?;
        if !self.scheduler.refresh(&mut trip, self.now()) {
            return Ok(trip);
        }

        let mut work = UnitOfWork::new("refresh_trip_status");
        work.put_trip(trip);
        self.store.commit(ctx, work).await?;
        self.load_trip(ctx, trip_id).await
    }

    /// Active trips by departure, statuses refreshed.
    ///
    /// Each refresh stands alone, so the write-back is split into commits that
    /// fit the store's batch limit.
    pub async fn list_trips(&self, ctx: &AccountContext) -> CoreResult<Vec<Trip>> {
        let mut trips = self.store.active_trips(ctx).await?;
        let now = self.now();

        let mut refreshed = Vec::new();
        for trip in trips.iter_mut() {
            if self.scheduler.refresh(trip, now) {
                refreshed.push(trip.clone());
            }
        }
        if refreshed.is_empty() {
            return Ok(trips);
        }

        for chunk in refreshed.chunks(self.store.batch_limit().max(1)) {
            let mut work = UnitOfWork::new("refresh_trip_status");
            for trip in chunk {
                work.put_trip(trip.clone());
            }
            self.store.commit(ctx, work).await?;
        }
        debug!(refreshed = refreshed.len(), "Trip statuses written back");
        self.store.active_trips(ctx).await
    }

    /// Cancel the trip with every order and reservation under it, in one commit.
    ///
    /// Safe to repeat: a second run changes nothing, and a run after a partial
    /// cancellation finishes it.
    pub async fn cancel_trip(&self, ctx: &AccountContext, trip_id: Uuid) -> CoreResult<CancellationSummary> {
        let mut trip = self.load_trip(ctx, trip_id).await?;
        let orders = self.store.orders_for_trip(ctx, trip_id).await?;
        let mut reservations = self.store.reservations_for_trip(ctx, trip_id).await?;
        let at = self.timestamp();

        let mut summary = CancellationSummary::default();
        let mut work = UnitOfWork::new("cancel_trip");

        for mut order in orders {
            let was_cancelled = order.is_cancelled();
            let changed = OrderStateMachine::cancel_order(&mut order, &mut reservations, at);
            if !was_cancelled {
                summary.orders_cancelled += 1;
                work.put_order(order);
            }
            summary.reservations_cancelled += changed.len();
            for reservation in reservations.iter().filter(|r| changed.contains(&r.id)) {
                work.put_reservation(reservation.clone());
            }
        }

        if trip.status != TripStatus::Cancelled {
            trip.status = TripStatus::Cancelled;
            summary.trip_changed = true;
        }

        if summary.is_noop() {
            return Ok(summary);
        }

        // keeps concurrent bookings on this trip from slipping past the cancellation
        work.put_trip(trip);
        self.store.commit(ctx, work).await?;

        info!(
            trip_id = %trip_id,
            orders = summary.orders_cancelled,
            reservations = summary.reservations_cancelled,
            "Trip cancelled"
        );
        Ok(summary)
    }

    pub async fn deactivate_trip(&self, ctx: &AccountContext, trip_id: Uuid) -> CoreResult<Trip> {
        let mut trip = self.load_trip(ctx, trip_id).await?;
        if !trip.lifecycle.deactivate(self.timestamp()) {
            return Ok(trip);
        }

        let mut work = UnitOfWork::new("deactivate_trip");
        work.put_trip(trip);
        self.store.commit(ctx, work).await?;
        self.load_trip(ctx, trip_id).await
    }

    /// Check that every cascade under the trip completed.
    ///
    /// Fails with `ConsistencyFault` naming the operation to re-run.
    pub async fn audit_trip_cascade(&self, ctx: &AccountContext, trip_id: Uuid) -> CoreResult<()> {
        let trip = self.load_trip(ctx, trip_id).await?;
        let orders = self.store.orders_for_trip(ctx, trip_id).await?;
        let reservations = self.store.reservations_for_trip(ctx, trip_id).await?;

        if trip.is_cancelled() {
            let open_orders = orders.iter().filter(|o| !o.is_cancelled()).count();
            let open_reservations = reservations.iter().filter(|r| !r.is_cancelled()).count();
            if open_orders > 0 || open_reservations > 0 {
                error!(trip_id = %trip_id, open_orders, open_reservations, "Trip cancellation was only partly applied");
                return Err(CoreError::ConsistencyFault {
                    operation: "cancel_trip".to_string(),
                    detail: format!(
                        "trip {} is cancelled but {} orders and {} reservations are not",
                        trip_id, open_orders, open_reservations
                    ),
                });
            }
        }

        let mut by_order: HashMap<Uuid, Vec<_>> = HashMap::new();
        for reservation in &reservations {
            by_order.entry(reservation.order_id).or_default().push(reservation.clone());
        }
        for order in &orders {
            let own = by_order.remove(&order.id).unwrap_or_default();
            if !OrderStateMachine::is_mirrored(order, &own) {
                error!(order_id = %order.id, "Order cancellation was only partly applied");
                return Err(CoreError::ConsistencyFault {
                    operation: "cancel_order".to_string(),
                    detail: format!("order {} is cancelled but has active reservations", order.id),
                });
            }
        }

        let doubled = SeatInventory::from_bookings(&orders, &reservations).double_booked_seats();
        if !doubled.is_empty() {
            error!(trip_id = %trip_id, seats = ?doubled, "Seats held by more than one reservation");
            return Err(CoreError::ConsistencyFault {
                operation: "save_order".to_string(),
                detail: format!("trip {} has seats held twice: {:?}", trip_id, doubled),
            });
        }
        Ok(())
    }

    /// The trip currently blocking `vehicle_id` during `window`, if any
    pub async fn vehicle_conflict(
        &self,
        ctx: &AccountContext,
        vehicle_id: Uuid,
        window: TripWindow,
        excluding: Option<Uuid>,
    ) -> CoreResult<Option<Uuid>> {
        let trips = self.store.trips_for_vehicle(ctx, vehicle_id).await?;
        Ok(find_vehicle_conflict(&trips, vehicle_id, &window, excluding, &self.scheduler, self.now()).map(|t| t.id))
    }

    /// Active and not cancelled
    async fn editable_trip(&self, ctx: &AccountContext, trip_id: Uuid) -> CoreResult<Trip> {
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

    async fn assignable_vehicle(&self, ctx: &AccountContext, vehicle_id: Uuid) -> CoreResult<Vehicle> {
        let vehicle = self.load_vehicle(ctx, vehicle_id).await?;
        if !vehicle.lifecycle.is_active() {
            return Err(CoreError::not_found(EntityKind::Vehicle, vehicle_id));
        }
        Ok(vehicle)
    }

    async fn ensure_vehicle_free(&self, ctx: &AccountContext, trip: &Trip, vehicle_id: Uuid) -> CoreResult<()> {
        let window = self.scheduler.window(&trip.schedule);
        match self.vehicle_conflict(ctx, vehicle_id, window, Some(trip.id)).await? {
            Some(blocking) => {
                warn!(vehicle_id = %vehicle_id, trip_id = %trip.id, blocking = %blocking, "Vehicle double-booked");
                Err(ConflictError::VehicleDoubleBooked {
                    vehicle_id,
                    trip_id: blocking,
                }
                .into())
            }
            None => Ok(()),
        }
    }

    async fn copy_seat_counts(&self, ctx: &AccountContext, trip: &mut Trip, vehicle: &Vehicle) -> CoreResult<()> {
        let layout = self.vehicle_layout(ctx, vehicle).await?;
        trip.seats_first_floor = layout.as_ref().map_or(0, |l| l.seat_count(Floor::First));
        trip.seats_second_floor = layout.as_ref().map_or(0, |l| l.seat_count(Floor::Second));
        Ok(())
    }
}
