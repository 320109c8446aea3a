use crate::error::EntityKind;
use fretado_shared::{Layout, Order, Reservation, Trip, Vehicle};
use uuid::Uuid;

/// A record to write. Its `version` is the version it was read at (0 for new records);
/// the store rejects the whole unit if any record moved on in the meantime.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Layout(Layout),
    Vehicle(Vehicle),
    Trip(Trip),
    Order(Order),
    Reservation(Reservation),
}

impl Mutation {
    pub fn entity(&self) -> EntityKind {
        match self {
            Mutation::Layout(_) => EntityKind::Layout,
            Mutation::Vehicle(_) => EntityKind::Vehicle,
            Mutation::Trip(_) => EntityKind::Trip,
            Mutation::Order(_) => EntityKind::Order,
            Mutation::Reservation(_) => EntityKind::Reservation,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Mutation::Layout(r) => r.id,
            Mutation::Vehicle(r) => r.id,
            Mutation::Trip(r) => r.id,
            Mutation::Order(r) => r.id,
            Mutation::Reservation(r) => r.id,
        }
    }

    pub fn expected_version(&self) -> u64 {
        match self {
            Mutation::Layout(r) => r.version,
            Mutation::Vehicle(r) => r.version,
            Mutation::Trip(r) => r.version,
            Mutation::Order(r) => r.version,
            Mutation::Reservation(r) => r.version,
        }
    }
}

/// Pending writes committed all together or not at all
#[derive(Debug, Clone)]
pub struct UnitOfWork {
    operation: &'static str,
    mutations: Vec<Mutation>,
}

impl UnitOfWork {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            mutations: Vec::new(),
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Queue a write. A later put of the same record replaces the earlier one.
    pub fn put(&mut self, mutation: Mutation) -> &mut Self {
        let key = (mutation.entity(), mutation.id());
        match self
            .mutations
            .iter_mut()
            .find(|m| (m.entity(), m.id()) == key)
        {
            Some(existing) => *existing = mutation,
            None => self.mutations.push(mutation),
        }
        self
    }

    pub fn put_layout(&mut self, layout: Layout) -> &mut Self {
        self.put(Mutation::Layout(layout))
    }

    pub fn put_vehicle(&mut self, vehicle: Vehicle) -> &mut Self {
        self.put(Mutation::Vehicle(vehicle))
    }

    pub fn put_trip(&mut self, trip: Trip) -> &mut Self {
        self.put(Mutation::Trip(trip))
    }

    pub fn put_order(&mut self, order: Order) -> &mut Self {
        self.put(Mutation::Order(order))
    }

    pub fn put_reservation(&mut self, reservation: Reservation) -> &mut Self {
        self.put(Mutation::Reservation(reservation))
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn into_mutations(self) -> Vec<Mutation> {
        self.mutations
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub operation: &'static str,
    pub applied: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fretado_shared::TripSchedule;

    fn trip() -> Trip {
        let date = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let time = chrono::NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        Trip::new("Curitiba".into(), "Florianópolis".into(), TripSchedule::one_way(date, time))
    }

    #[test]
    fn test_same_record_is_written_once() {
        let mut trip = trip();
        let mut work = UnitOfWork::new("cancel_trip");

        work.put_trip(trip.clone());
        trip.origin = "Joinville".into();
        work.put_trip(trip.clone());

        assert_eq!(work.len(), 1);
        match &work.mutations()[0] {
            Mutation::Trip(queued) => assert_eq!(queued.origin, "Joinville"),
            other => panic!("unexpected mutation {:?}", other),
        }
    }
}
