use chrono::{DateTime, NaiveDateTime, Utc};
use fretado_core::{
    AccountContext, BookingStore, BusinessRules, Clock, CoreError, CoreResult, EntityKind, PassengerDirectory,
    SystemClock,
};
use fretado_schedule::TripScheduler;
use fretado_shared::{Layout, Order, Passenger, Reservation, Trip, Vehicle};
use fretado_store::{Config, InMemoryStore};
use std::sync::Arc;
use uuid::Uuid;

/// Entry point for every booking workflow.
///
/// Stateless apart from its collaborators: each operation reads what it needs
/// from the store, decides with the pure modules, and commits one unit of work.
#[derive(Clone)]
pub struct BookingEngine {
    pub(crate) store: Arc<dyn BookingStore>,
    pub(crate) passengers: Arc<dyn PassengerDirectory>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) scheduler: TripScheduler,
}

impl BookingEngine {
    pub fn new(
        store: Arc<dyn BookingStore>,
        passengers: Arc<dyn PassengerDirectory>,
        clock: Arc<dyn Clock>,
        rules: BusinessRules,
    ) -> Self {
        Self {
            store,
            passengers,
            clock,
            scheduler: TripScheduler::new(rules),
        }
    }

    /// Engine over a fresh in-memory store, which also serves passengers
    pub fn in_memory(config: &Config) -> (Self, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new(config.store.clone()));
        let engine = Self::new(
            store.clone(),
            store.clone(),
            Arc::new(SystemClock),
            config.business_rules.clone(),
        );
        (engine, store)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn rules(&self) -> &BusinessRules {
        self.scheduler.rules()
    }

    pub(crate) fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub(crate) fn timestamp(&self) -> DateTime<Utc> {
        self.clock.timestamp()
    }

    pub(crate) async fn load_layout(&self, ctx: &AccountContext, id: Uuid) -> CoreResult<Layout> {
        self.store
            .layout(ctx, id)
            .await?
            .ok_or_else(|| CoreError::not_found(EntityKind::Layout, id))
    }

    pub(crate) async fn load_vehicle(&self, ctx: &AccountContext, id: Uuid) -> CoreResult<Vehicle> {
        self.store
            .vehicle(ctx, id)
            .await?
            .ok_or_else(|| CoreError::not_found(EntityKind::Vehicle, id))
    }

    pub(crate) async fn load_trip(&self, ctx: &AccountContext, id: Uuid) -> CoreResult<Trip> {
        self.store
            .trip(ctx, id)
            .await?
            .ok_or_else(|| CoreError::not_found(EntityKind::Trip, id))
    }

    pub(crate) async fn load_order(&self, ctx: &AccountContext, id: Uuid) -> CoreResult<Order> {
        self.store
            .order(ctx, id)
            .await?
            .ok_or_else(|| CoreError::not_found(EntityKind::Order, id))
    }

    pub(crate) async fn load_reservation(&self, ctx: &AccountContext, id: Uuid) -> CoreResult<Reservation> {
        self.store
            .reservation(ctx, id)
            .await?
            .ok_or_else(|| CoreError::not_found(EntityKind::Reservation, id))
    }

    /// Passenger that can still be assigned to a seat
    pub(crate) async fn active_passenger(&self, ctx: &AccountContext, id: Uuid) -> CoreResult<Passenger> {
        self.passengers
            .passenger(ctx, id)
            .await?
            .filter(|p| p.lifecycle.is_active())
            .ok_or_else(|| CoreError::not_found(EntityKind::Passenger, id))
    }

    /// Layout of the vehicle, if it has one. A vehicle without a layout has no seats.
    pub(crate) async fn vehicle_layout(&self, ctx: &AccountContext, vehicle: &Vehicle) -> CoreResult<Option<Layout>> {
        match vehicle.layout_id {
            Some(layout_id) => self.store.layout(ctx, layout_id).await,
            None => Ok(None),
        }
    }
}
