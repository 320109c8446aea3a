//! Conversion between the stored sparse cell list of a floor and the dense
//! row/column grid that editors and renderers work with.
//!
//! Pure data transformation: no validation happens here (see `inventory`).

use fretado_shared::{Cell, CellKind, SeatNumber};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GridCell {
    pub kind: CellKind,
    pub seat_number: Option<SeatNumber>,
}

impl GridCell {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn seat(seat_number: impl Into<SeatNumber>) -> Self {
        Self {
            kind: CellKind::Seat,
            seat_number: Some(seat_number.into()),
        }
    }

    pub fn of_kind(kind: CellKind) -> Self {
        Self {
            kind,
            seat_number: None,
        }
    }
}

/// Dense floor grid, indexed `[row][col]`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Grid {
    rows: Vec<Vec<GridCell>>,
}

impl Grid {
    /// `height x width` grid of empty cells
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            rows: vec![vec![GridCell::empty(); width]; height],
        }
    }

    pub fn from_rows(rows: Vec<Vec<GridCell>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<GridCell>] {
        &self.rows
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&GridCell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Overwrite one position. Returns false when it is outside the grid.
    pub fn set(&mut self, row: usize, col: usize, cell: GridCell) -> bool {
        match self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            Some(slot) => {
                *slot = cell;
                true
            }
            None => false,
        }
    }
}

/// One entry per grid position. Only seat cells carry a seat number.
pub fn flatten(grid: &Grid) -> Vec<Cell> {
    let mut cells = Vec::with_capacity(grid.height() * grid.width());
    for (row, columns) in grid.rows.iter().enumerate() {
        for (col, cell) in columns.iter().enumerate() {
            let seat_number = match cell.kind {
                CellKind::Seat => cell.seat_number.clone(),
                _ => None,
            };
            cells.push(Cell {
                row: row as u32,
                col: col as u32,
                kind: cell.kind,
                seat_number,
            });
        }
    }
    cells
}

/// Grid sized `(max(row)+1) x (max(col)+1)`, empty except for the addressed cells.
///
/// An empty list yields an empty grid; callers treat that as "no floor".
/// With duplicate coordinates the last cell wins.
pub fn unflatten(cells: &[Cell]) -> Grid {
    let (Some(max_row), Some(max_col)) = (
        cells.iter().map(|c| c.row).max(),
        cells.iter().map(|c| c.col).max(),
    ) else {
        return Grid::default();
    };

    let mut grid = Grid::new(max_row as usize + 1, max_col as usize + 1);
    for cell in cells {
        grid.set(
            cell.row as usize,
            cell.col as usize,
            GridCell {
                kind: cell.kind,
                seat_number: cell.seat_number.clone(),
            },
        );
    }
    grid
}

/// `unflatten` for an optional floor: no cells means no floor.
pub fn floor_grid(cells: Option<&[Cell]>) -> Option<Grid> {
    cells.filter(|c| !c.is_empty()).map(unflatten)
}
