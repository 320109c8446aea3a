use crate::app_config::StoreConfig;
use async_trait::async_trait;
use fretado_core::{
    AccountContext, BookingStore, CommitReceipt, ConflictError, CoreError, CoreResult, Mutation,
    PassengerDirectory, UnitOfWork,
};
use fretado_shared::{Layout, Order, Passenger, Reservation, Trip, Vehicle};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Everything one account owns
#[derive(Debug, Default)]
struct Partition {
    layouts: HashMap<Uuid, Layout>,
    vehicles: HashMap<Uuid, Vehicle>,
    trips: HashMap<Uuid, Trip>,
    orders: HashMap<Uuid, Order>,
    reservations: HashMap<Uuid, Reservation>,
    passengers: HashMap<Uuid, Passenger>,
}

impl Partition {
    fn stored_version(&self, mutation: &Mutation) -> u64 {
        let id = mutation.id();
        let version = match mutation {
            Mutation::Layout(_) => self.layouts.get(&id).map(|r| r.version),
            Mutation::Vehicle(_) => self.vehicles.get(&id).map(|r| r.version),
            Mutation::Trip(_) => self.trips.get(&id).map(|r| r.version),
            Mutation::Order(_) => self.orders.get(&id).map(|r| r.version),
            Mutation::Reservation(_) => self.reservations.get(&id).map(|r| r.version),
        };
        version.unwrap_or(0)
    }

    fn apply(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::Layout(mut r) => {
                r.version += 1;
                self.layouts.insert(r.id, r);
            }
            Mutation::Vehicle(mut r) => {
                r.version += 1;
                self.vehicles.insert(r.id, r);
            }
            Mutation::Trip(mut r) => {
                r.version += 1;
                self.trips.insert(r.id, r);
            }
            Mutation::Order(mut r) => {
                r.version += 1;
                self.orders.insert(r.id, r);
            }
            Mutation::Reservation(mut r) => {
                r.version += 1;
                self.reservations.insert(r.id, r);
            }
        }
    }
}

/// Booking store kept in process memory, partitioned by account.
///
/// A commit holds the write lock for the whole unit: versions are checked
/// first and nothing is written unless every check passes.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    config: StoreConfig,
    partitions: RwLock<HashMap<String, Partition>>,
    fail_next_commit: AtomicBool,
    commits: AtomicU64,
}

impl InMemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Make the next commit fail with a storage error, applying nothing
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Number of successful commits so far
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    /// Passengers are owned by another service; this seeds the local copy.
    pub async fn upsert_passenger(&self, ctx: &AccountContext, passenger: Passenger) {
        let mut partitions = self.partitions.write().await;
        partitions
            .entry(ctx.account_id.clone())
            .or_default()
            .passengers
            .insert(passenger.id, passenger);
    }

    async fn read<T>(&self, ctx: &AccountContext, f: impl FnOnce(&Partition) -> T) -> T
    where
        T: Default,
    {
        let partitions = self.partitions.read().await;
        partitions.get(&ctx.account_id).map(f).unwrap_or_default()
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn layout(&self, ctx: &AccountContext, id: Uuid) -> CoreResult<Option<Layout>> {
        Ok(self.read(ctx, |p| p.layouts.get(&id).cloned()).await)
    }

    async fn vehicle(&self, ctx: &AccountContext, id: Uuid) -> CoreResult<Option<Vehicle>> {
        Ok(self.read(ctx, |p| p.vehicles.get(&id).cloned()).await)
    }

    async fn active_vehicles(&self, ctx: &AccountContext) -> CoreResult<Vec<Vehicle>> {
        let mut vehicles: Vec<Vehicle> = self
            .read(ctx, |p| {
                p.vehicles
                    .values()
                    .filter(|v| v.lifecycle.is_active())
                    .cloned()
                    .collect()
            })
            .await;
        vehicles.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        Ok(vehicles)
    }

    async fn trip(&self, ctx: &AccountContext, id: Uuid) -> CoreResult<Option<Trip>> {
        Ok(self.read(ctx, |p| p.trips.get(&id).cloned()).await)
    }

    async fn active_trips(&self, ctx: &AccountContext) -> CoreResult<Vec<Trip>> {
        let mut trips: Vec<Trip> = self
            .read(ctx, |p| {
                p.trips
                    .values()
                    .filter(|t| t.lifecycle.is_active())
                    .cloned()
                    .collect()
            })
            .await;
        trips.sort_by_key(|t| (t.schedule.departure(), t.id));
        Ok(trips)
    }

    async fn trips_for_vehicle(&self, ctx: &AccountContext, vehicle_id: Uuid) -> CoreResult<Vec<Trip>> {
        let trips = self.active_trips(ctx).await?;
        Ok(trips
            .into_iter()
            .filter(|t| t.vehicle_id == Some(vehicle_id))
            .collect())
    }

    async fn order(&self, ctx: &AccountContext, id: Uuid) -> CoreResult<Option<Order>> {
        Ok(self.read(ctx, |p| p.orders.get(&id).cloned()).await)
    }

    async fn orders_for_trip(&self, ctx: &AccountContext, trip_id: Uuid) -> CoreResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .read(ctx, |p| {
                p.orders
                    .values()
                    .filter(|o| o.trip_id == trip_id)
                    .cloned()
                    .collect()
            })
            .await;
        orders.sort_by_key(|o| (o.created_at, o.id));
        Ok(orders)
    }

    async fn reservation(&self, ctx: &AccountContext, id: Uuid) -> CoreResult<Option<Reservation>> {
        Ok(self.read(ctx, |p| p.reservations.get(&id).cloned()).await)
    }

    async fn reservations_for_order(&self, ctx: &AccountContext, order_id: Uuid) -> CoreResult<Vec<Reservation>> {
        let mut reservations: Vec<Reservation> = self
            .read(ctx, |p| {
                p.reservations
                    .values()
                    .filter(|r| r.order_id == order_id)
                    .cloned()
                    .collect()
            })
            .await;
        reservations.sort_by(|a, b| a.seat_number.cmp(&b.seat_number).then(a.id.cmp(&b.id)));
        Ok(reservations)
    }

    async fn reservations_for_trip(&self, ctx: &AccountContext, trip_id: Uuid) -> CoreResult<Vec<Reservation>> {
        let mut reservations: Vec<Reservation> = self
            .read(ctx, |p| {
                p.reservations
                    .values()
                    .filter(|r| r.trip_id == trip_id)
                    .cloned()
                    .collect()
            })
            .await;
        reservations.sort_by(|a, b| a.seat_number.cmp(&b.seat_number).then(a.id.cmp(&b.id)));
        Ok(reservations)
    }

    fn batch_limit(&self) -> usize {
        self.config.max_batch_size
    }

    async fn commit(&self, ctx: &AccountContext, work: UnitOfWork) -> CoreResult<CommitReceipt> {
        let operation = work.operation();
        if work.len() > self.config.max_batch_size {
            return Err(CoreError::Storage(format!(
                "{} writes {} records, more than the batch limit of {}",
                operation,
                work.len(),
                self.config.max_batch_size
            )));
        }

        let mut partitions = self.partitions.write().await;

        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            warn!(account = %ctx.account_id, operation, "Commit failed, nothing applied");
            return Err(CoreError::Storage(format!("{} was not committed", operation)));
        }

        let partition = partitions.entry(ctx.account_id.clone()).or_default();

        for mutation in work.mutations() {
            let stored = partition.stored_version(mutation);
            if stored != mutation.expected_version() {
                debug!(
                    operation,
                    entity = %mutation.entity(),
                    id = %mutation.id(),
                    stored,
                    expected = mutation.expected_version(),
                    "Stale write rejected"
                );
                return Err(ConflictError::StaleWrite {
                    entity: mutation.entity(),
                    id: mutation.id(),
                }
                .into());
            }
        }

        let applied = work.len();
        for mutation in work.into_mutations() {
            partition.apply(mutation);
        }
        self.commits.fetch_add(1, Ordering::SeqCst);

        info!(account = %ctx.account_id, actor = ?ctx.actor, operation, applied, "Committed");
        Ok(CommitReceipt { operation, applied })
    }
}

#[async_trait]
impl PassengerDirectory for InMemoryStore {
    async fn passenger(&self, ctx: &AccountContext, id: Uuid) -> CoreResult<Option<Passenger>> {
        Ok(self.read(ctx, |p| p.passengers.get(&id).cloned()).await)
    }

    async fn active_passengers(&self, ctx: &AccountContext) -> CoreResult<Vec<Passenger>> {
        let mut passengers: Vec<Passenger> = self
            .read(ctx, |p| {
                p.passengers
                    .values()
                    .filter(|p| p.lifecycle.is_active())
                    .cloned()
                    .collect()
            })
            .await;
        passengers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(passengers)
    }
}
