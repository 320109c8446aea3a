use crate::account::AccountContext;
use crate::unit_of_work::{CommitReceipt, UnitOfWork};
use crate::CoreResult;
use async_trait::async_trait;
use fretado_shared::{Layout, Order, Passenger, Reservation, Trip, Vehicle};
use uuid::Uuid;

/// Document store the booking engine reads from and commits to.
///
/// Lookups by id return the record whatever its lifecycle, so historical
/// references still resolve. Listing queries return active records only.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn layout(&self, ctx: &AccountContext, id: Uuid) -> CoreResult<Option<Layout>>;

    async fn vehicle(&self, ctx: &AccountContext, id: Uuid) -> CoreResult<Option<Vehicle>>;

    async fn active_vehicles(&self, ctx: &AccountContext) -> CoreResult<Vec<Vehicle>>;

    async fn trip(&self, ctx: &AccountContext, id: Uuid) -> CoreResult<Option<Trip>>;

    async fn active_trips(&self, ctx: &AccountContext) -> CoreResult<Vec<Trip>>;

    /// Active trips that reference the vehicle
    async fn trips_for_vehicle(&self, ctx: &AccountContext, vehicle_id: Uuid) -> CoreResult<Vec<Trip>>;

    async fn order(&self, ctx: &AccountContext, id: Uuid) -> CoreResult<Option<Order>>;

    async fn orders_for_trip(&self, ctx: &AccountContext, trip_id: Uuid) -> CoreResult<Vec<Order>>;

    async fn reservation(&self, ctx: &AccountContext, id: Uuid) -> CoreResult<Option<Reservation>>;

    async fn reservations_for_order(&self, ctx: &AccountContext, order_id: Uuid) -> CoreResult<Vec<Reservation>>;

    async fn reservations_for_trip(&self, ctx: &AccountContext, trip_id: Uuid) -> CoreResult<Vec<Reservation>>;

    /// Most mutations one `commit` accepts
    fn batch_limit(&self) -> usize;

    /// Apply every mutation or none of them
    async fn commit(&self, ctx: &AccountContext, work: UnitOfWork) -> CoreResult<CommitReceipt>;
}

/// Passenger records are maintained outside the booking engine
#[async_trait]
pub trait PassengerDirectory: Send + Sync {
    async fn passenger(&self, ctx: &AccountContext, id: Uuid) -> CoreResult<Option<Passenger>>;

    async fn active_passengers(&self, ctx: &AccountContext) -> CoreResult<Vec<Passenger>>;
}
