use fretado_core::{CoreError, ValidationError};
use fretado_shared::{BookingStatus, Cell, Layout, Order, Reservation, SeatNumber};
use std::collections::{BTreeSet, HashMap, HashSet};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("Layout has no seats")]
    NoSeats,

    #[error("Seat numbers used more than once: {0:?}")]
    DuplicateSeatNumbers(Vec<SeatNumber>),

    #[error("Invalid seat token: {0:?}")]
    InvalidSeatToken(String),
}

impl From<LayoutError> for ValidationError {
    fn from(err: LayoutError) -> Self {
        match err {
            LayoutError::NoSeats => ValidationError::NoSeats,
            LayoutError::DuplicateSeatNumbers(seats) => ValidationError::DuplicateSeatNumbers { seats },
            LayoutError::InvalidSeatToken(token) => ValidationError::InvalidSeatToken { token },
        }
    }
}

impl From<LayoutError> for CoreError {
    fn from(err: LayoutError) -> Self {
        CoreError::Validation(err.into())
    }
}

/// A layout needs at least one seat cell, and seat numbers must be unique
/// across both floors. Seat cells may be left unnumbered.
pub fn validate_layout<'a>(
    cells: impl IntoIterator<Item = &'a Cell>,
    max_token_len: usize,
) -> Result<(), LayoutError> {
    let mut seen = HashSet::new();
    let mut duplicates = BTreeSet::new();
    let mut seats = 0usize;

    for cell in cells.into_iter().filter(|c| c.is_seat()) {
        seats += 1;
        let Some(number) = &cell.seat_number else {
            continue;
        };
        if number.is_blank() || number.as_str().chars().count() > max_token_len {
            return Err(LayoutError::InvalidSeatToken(number.to_string()));
        }
        if !seen.insert(number.clone()) {
            duplicates.insert(number.clone());
        }
    }

    if seats == 0 {
        return Err(LayoutError::NoSeats);
    }
    if !duplicates.is_empty() {
        return Err(LayoutError::DuplicateSeatNumbers(duplicates.into_iter().collect()));
    }
    Ok(())
}

/// Seats that do not fit a vehicle of `capacity` seats.
///
/// Numeric tokens must lie in `1..=capacity`. Other tokens only fit when the
/// layout (if known) has a seat with that exact token.
pub fn seats_out_of_range<'a>(
    seats: impl IntoIterator<Item = &'a SeatNumber>,
    capacity: u32,
    layout: Option<&Layout>,
) -> Vec<SeatNumber> {
    let layout_seats = layout.map(Layout::seat_numbers);
    let offending: BTreeSet<SeatNumber> = seats
        .into_iter()
        .filter(|seat| match seat.numeric() {
            Some(n) => n == 0 || n > capacity,
            None => !layout_seats
                .as_ref()
                .is_some_and(|known| known.contains(*seat)),
        })
        .cloned()
        .collect();
    offending.into_iter().collect()
}

#[derive(Debug, Clone)]
struct Booking {
    reservation_id: Uuid,
    order_id: Uuid,
    seat: SeatNumber,
    passenger_id: Uuid,
}

/// Seat occupancy of one trip, built from a snapshot of its orders and reservations.
/// Only reservations whose displayed status is not `Cancelled` hold a seat.
#[derive(Debug, Clone, Default)]
pub struct SeatInventory {
    active: Vec<Booking>,
}

impl SeatInventory {
    pub fn from_bookings(orders: &[Order], reservations: &[Reservation]) -> Self {
        let order_status: HashMap<Uuid, BookingStatus> =
            orders.iter().map(|o| (o.id, o.status)).collect();

        let active = reservations
            .iter()
            .filter(|r| {
                let parent = order_status
                    .get(&r.order_id)
                    .copied()
                    .unwrap_or(BookingStatus::Undefined);
                r.effective_status(parent) != BookingStatus::Cancelled
            })
            .map(|r| Booking {
                reservation_id: r.id,
                order_id: r.order_id,
                seat: r.seat_number.clone(),
                passenger_id: r.passenger_id,
            })
            .collect();

        Self { active }
    }

    pub fn occupied_seats(&self) -> BTreeSet<SeatNumber> {
        self.active.iter().map(|b| b.seat.clone()).collect()
    }

    /// True unless a non-cancelled reservation other than `excluding` holds the seat
    pub fn is_seat_available(&self, seat: &SeatNumber, excluding: Option<Uuid>) -> bool {
        !self
            .active
            .iter()
            .any(|b| &b.seat == seat && Some(b.reservation_id) != excluding)
    }

    /// Availability while re-saving a whole order: its own reservations never block
    /// its seats, so passengers of one order can swap seats.
    pub fn is_seat_available_for_order(&self, seat: &SeatNumber, order_id: Uuid) -> bool {
        !self
            .active
            .iter()
            .any(|b| &b.seat == seat && b.order_id != order_id)
    }

    pub fn duplicate_passenger(&self, passenger_id: Uuid, excluding: Option<Uuid>) -> bool {
        self.active
            .iter()
            .any(|b| b.passenger_id == passenger_id && Some(b.reservation_id) != excluding)
    }

    pub fn duplicate_passenger_outside_order(&self, passenger_id: Uuid, order_id: Uuid) -> bool {
        self.active
            .iter()
            .any(|b| b.passenger_id == passenger_id && b.order_id != order_id)
    }

    /// Seats held by more than one active reservation (corrupt data)
    pub fn double_booked_seats(&self) -> Vec<SeatNumber> {
        let mut seen = HashSet::new();
        let doubled: BTreeSet<SeatNumber> = self
            .active
            .iter()
            .filter(|b| !seen.insert(&b.seat))
            .map(|b| b.seat.clone())
            .collect();
        doubled.into_iter().collect()
    }

    /// Free numbered seats of the layout, in display order
    pub fn available_seats(&self, layout: &Layout) -> Vec<SeatNumber> {
        let occupied = self.occupied_seats();
        layout
            .seat_numbers()
            .into_iter()
            .filter(|seat| !occupied.contains(seat))
            .collect()
    }

    /// Free seats when only a seat count is known (`1..=capacity`)
    pub fn available_by_count(&self, capacity: u32) -> Vec<SeatNumber> {
        let occupied = self.occupied_seats();
        (1..=capacity)
            .map(SeatNumber::from)
            .filter(|seat| !occupied.contains(seat))
            .collect()
    }

    pub fn occupied_count(&self) -> usize {
        self.active.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fretado_shared::{CellKind, Masked, Payer, PayerDocument};
    use rust_decimal::Decimal;

    fn order(trip_id: Uuid) -> Order {
        let mut order = Order::new(
            trip_id,
            Payer {
                name: "João Lima".to_string(),
                document: Masked(PayerDocument::Passport("FX123456".to_string())),
                rg: None,
                method: "PIX".to_string(),
                total: Decimal::new(30000, 2),
            },
        );
        order.status = BookingStatus::PaymentPending;
        order
    }

    fn three_seat_layout() -> Layout {
        Layout::new(
            None,
            vec![Cell::seat(0, 0, "1"), Cell::seat(0, 1, "2"), Cell::seat(1, 0, "3")],
            None,
        )
    }

    #[test]
    fn test_cancelled_reservation_frees_seat() {
        let trip_id = Uuid::new_v4();
        let order = order(trip_id);
        let seat = |n: &str| SeatNumber::from(n);

        let r1 = Reservation::new(order.id, trip_id, seat("1"), Uuid::new_v4(), true);
        let r2 = Reservation::new(order.id, trip_id, seat("2"), Uuid::new_v4(), false);
        let mut r3 = Reservation::new(order.id, trip_id, seat("3"), Uuid::new_v4(), false);
        r3.cancel(Utc::now());

        let inventory = SeatInventory::from_bookings(&[order], &[r1.clone(), r2, r3]);

        let occupied: Vec<SeatNumber> = inventory.occupied_seats().into_iter().collect();
        assert_eq!(occupied, vec![seat("1"), seat("2")]);
        assert!(inventory.is_seat_available(&seat("3"), None));
        assert!(!inventory.is_seat_available(&seat("1"), None));
        assert!(inventory.is_seat_available(&seat("1"), Some(r1.id)));
        assert_eq!(inventory.available_seats(&three_seat_layout()), vec![seat("3")]);
    }

    #[test]
    fn test_cancelled_order_frees_all_seats() {
        let trip_id = Uuid::new_v4();
        let mut order = order(trip_id);
        order.status = BookingStatus::Cancelled;
        let reservation = Reservation::new(order.id, trip_id, SeatNumber::from("1"), Uuid::new_v4(), true);

        let inventory = SeatInventory::from_bookings(&[order], &[reservation]);
        assert!(inventory.occupied_seats().is_empty());
    }

    #[test]
    fn test_duplicate_passenger_ignores_excluded_reservation() {
        let trip_id = Uuid::new_v4();
        let order = order(trip_id);
        let passenger = Uuid::new_v4();
        let reservation = Reservation::new(order.id, trip_id, SeatNumber::from("1"), passenger, true);
        let reservation_id = reservation.id;

        let inventory = SeatInventory::from_bookings(&[order], &[reservation]);
        assert!(inventory.duplicate_passenger(passenger, None));
        assert!(!inventory.duplicate_passenger(passenger, Some(reservation_id)));
        assert!(!inventory.duplicate_passenger(Uuid::new_v4(), None));
    }

    #[test]
    fn test_validate_layout() {
        assert_eq!(validate_layout(three_seat_layout().all_cells(), 3), Ok(()));

        let no_seats = [Cell::new(0, 0, CellKind::Bathroom)];
        assert_eq!(validate_layout(&no_seats, 3), Err(LayoutError::NoSeats));

        let upstairs = Layout::new(
            None,
            vec![Cell::seat(0, 0, "1"), Cell::seat(0, 1, "2")],
            Some(vec![Cell::seat(0, 0, "2")]),
        );
        assert_eq!(
            validate_layout(upstairs.all_cells(), 3),
            Err(LayoutError::DuplicateSeatNumbers(vec![SeatNumber::from("2")]))
        );

        let long_token = [Cell::seat(0, 0, "1000")];
        assert_eq!(
            validate_layout(&long_token, 3),
            Err(LayoutError::InvalidSeatToken("1000".to_string()))
        );
    }

    #[test]
    fn test_seats_out_of_range() {
        let seats = [SeatNumber::from("12"), SeatNumber::from("45"), SeatNumber::from("0"), SeatNumber::from("3A")];

        let offending = seats_out_of_range(&seats, 40, None);
        assert_eq!(
            offending,
            vec![SeatNumber::from("0"), SeatNumber::from("45"), SeatNumber::from("3A")]
        );

        let layout = Layout::new(None, vec![Cell::seat(0, 0, "3A")], None);
        let offending = seats_out_of_range(&seats, 40, Some(&layout));
        assert_eq!(offending, vec![SeatNumber::from("0"), SeatNumber::from("45")]);
    }

    #[test]
    fn test_available_by_count() {
        let trip_id = Uuid::new_v4();
        let order = order(trip_id);
        let reservation = Reservation::new(order.id, trip_id, SeatNumber::from("1"), Uuid::new_v4(), true);

        let inventory = SeatInventory::from_bookings(&[order], &[reservation]);
        assert_eq!(inventory.occupied_count(), 1);
        assert_eq!(inventory.available_by_count(3), vec![SeatNumber::from("2"), SeatNumber::from("3")]);
    }
}
