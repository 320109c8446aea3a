use crate::models::lifecycle::Lifecycle;
use crate::models::seat::SeatNumber;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// What occupies a grid position on a bus floor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    Seat,
    Bathroom,
    Stair,
    Fridge,
    #[default]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Floor {
    First,
    Second,
}

/// One addressed position of a floor, as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub row: u32,
    pub col: u32,
    pub kind: CellKind,
    pub seat_number: Option<SeatNumber>,
}

impl Cell {
    pub fn new(row: u32, col: u32, kind: CellKind) -> Self {
        Self {
            row,
            col,
            kind,
            seat_number: None,
        }
    }

    pub fn seat(row: u32, col: u32, seat_number: impl Into<SeatNumber>) -> Self {
        Self {
            row,
            col,
            kind: CellKind::Seat,
            seat_number: Some(seat_number.into()),
        }
    }

    pub fn is_seat(&self) -> bool {
        self.kind == CellKind::Seat
    }
}

/// Seat/amenity map of a vehicle, one sparse cell list per floor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub id: Uuid,
    pub name: Option<String>,
    pub first_floor: Vec<Cell>,
    pub second_floor: Option<Vec<Cell>>,
    pub lifecycle: Lifecycle,
    pub version: u64,
}

impl Layout {
    /// An empty second floor is stored as no second floor at all.
    pub fn new(name: Option<String>, first_floor: Vec<Cell>, second_floor: Option<Vec<Cell>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            first_floor,
            second_floor: second_floor.filter(|cells| !cells.is_empty()),
            lifecycle: Lifecycle::Active,
            version: 0,
        }
    }

    pub fn cells(&self, floor: Floor) -> &[Cell] {
        match floor {
            Floor::First => &self.first_floor,
            Floor::Second => self.second_floor.as_deref().unwrap_or(&[]),
        }
    }

    pub fn all_cells(&self) -> impl Iterator<Item = &Cell> {
        self.first_floor
            .iter()
            .chain(self.second_floor.iter().flatten())
    }

    pub fn has_two_floors(&self) -> bool {
        self.second_floor.as_ref().is_some_and(|cells| !cells.is_empty())
    }

    pub fn seat_count(&self, floor: Floor) -> u32 {
        self.cells(floor).iter().filter(|c| c.is_seat()).count() as u32
    }

    pub fn total_seats(&self) -> u32 {
        self.seat_count(Floor::First) + self.seat_count(Floor::Second)
    }

    /// Numbered seats across both floors
    pub fn seat_numbers(&self) -> BTreeSet<SeatNumber> {
        self.all_cells()
            .filter(|c| c.is_seat())
            .filter_map(|c| c.seat_number.clone())
            .collect()
    }
}
