use crate::state::BookingEngine;
use fretado_catalog::{flatten, grid::floor_grid, validate_layout, Grid};
use fretado_core::{AccountContext, ConflictError, CoreError, CoreResult, EntityKind, UnitOfWork, ValidationError};
use fretado_shared::{Cell, Floor, Layout, Vehicle};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VehicleDraft {
    pub identifier: String,
    pub plate: String,
    pub company: String,
    pub layout_id: Option<Uuid>,
}

/// Seat counts derived from a layout's cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatCounts {
    pub first_floor: u32,
    pub second_floor: u32,
    pub total: u32,
    pub has_two_floors: bool,
}

impl SeatCounts {
    pub fn of(layout: &Layout) -> Self {
        Self {
            first_floor: layout.seat_count(Floor::First),
            second_floor: layout.seat_count(Floor::Second),
            total: layout.total_seats(),
            has_two_floors: layout.has_two_floors(),
        }
    }
}

impl BookingEngine {
    pub async fn create_layout(
        &self,
        ctx: &AccountContext,
        name: Option<String>,
        first_floor: Vec<Cell>,
        second_floor: Option<Vec<Cell>>,
    ) -> CoreResult<Layout> {
        let layout = Layout::new(name, first_floor, second_floor);
        validate_layout(layout.all_cells(), self.rules().seat_token_max_len)?;

        let mut work = UnitOfWork::new("create_layout");
        work.put_layout(layout.clone());
        self.store.commit(ctx, work).await?;

        info!(layout_id = %layout.id, seats = layout.total_seats(), "Layout created");
        self.load_layout(ctx, layout.id).await
    }

    /// Store a layout drawn in the grid editor
    pub async fn create_layout_from_grids(
        &self,
        ctx: &AccountContext,
        name: Option<String>,
        first_floor: &Grid,
        second_floor: Option<&Grid>,
    ) -> CoreResult<Layout> {
        self.create_layout(ctx, name, flatten(first_floor), second_floor.map(flatten))
            .await
    }

    /// The layout as editor grids. A missing second floor is `None`, never an empty grid.
    pub async fn layout_grids(&self, ctx: &AccountContext, layout_id: Uuid) -> CoreResult<(Grid, Option<Grid>)> {
        let layout = self.load_layout(ctx, layout_id).await?;
        let first = floor_grid(Some(layout.first_floor.as_slice())).unwrap_or_default();
        Ok((first, floor_grid(layout.second_floor.as_deref())))
    }

    /// Save changes to an existing layout. `layout.version` must be the version it was read at.
    pub async fn update_layout(&self, ctx: &AccountContext, mut layout: Layout) -> CoreResult<Layout> {
        let stored = self.load_layout(ctx, layout.id).await?;
        if !stored.lifecycle.is_active() {
            return Err(CoreError::not_found(EntityKind::Layout, layout.id));
        }
        layout.second_floor = layout.second_floor.filter(|cells| !cells.is_empty());
        validate_layout(layout.all_cells(), self.rules().seat_token_max_len)?;

        let mut work = UnitOfWork::new("update_layout");
        work.put_layout(layout.clone());
        self.store.commit(ctx, work).await?;

        info!(layout_id = %layout.id, "Layout updated");
        self.load_layout(ctx, layout.id).await
    }

    pub async fn deactivate_layout(&self, ctx: &AccountContext, layout_id: Uuid) -> CoreResult<Layout> {
        let mut layout = self.load_layout(ctx, layout_id).await?;
        if !layout.lifecycle.deactivate(self.timestamp()) {
            return Ok(layout);
        }

        let mut work = UnitOfWork::new("deactivate_layout");
        work.put_layout(layout);
        self.store.commit(ctx, work).await?;
        self.load_layout(ctx, layout_id).await
    }

    pub async fn seat_counts(&self, ctx: &AccountContext, layout_id: Uuid) -> CoreResult<SeatCounts> {
        Ok(SeatCounts::of(&self.load_layout(ctx, layout_id).await?))
    }

    pub async fn create_vehicle(&self, ctx: &AccountContext, draft: VehicleDraft) -> CoreResult<Vehicle> {
        let required = [
            ("identifier", &draft.identifier),
            ("plate", &draft.plate),
            ("company", &draft.company),
        ];
        let missing = required
            .iter()
            .find(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| *field);
        if let Some(field) = missing {
            return Err(ValidationError::MissingField {
                entity: EntityKind::Vehicle,
                field,
            }
            .into());
        }

        if let Some(layout_id) = draft.layout_id {
            let layout = self.load_layout(ctx, layout_id).await?;
            if !layout.lifecycle.is_active() {
                return Err(CoreError::not_found(EntityKind::Layout, layout_id));
            }
        }

        let vehicle = Vehicle::new(
            draft.identifier.trim().to_string(),
            draft.plate.trim().to_string(),
            draft.company.trim().to_string(),
            draft.layout_id,
        );

        let plate_key = vehicle.plate_key();
        let active = self.store.active_vehicles(ctx).await?;
        if active.iter().any(|v| v.plate_key() == plate_key) {
            return Err(ConflictError::DuplicatePlate { plate: vehicle.plate }.into());
        }

        let mut work = UnitOfWork::new("create_vehicle");
        work.put_vehicle(vehicle.clone());
        self.store.commit(ctx, work).await?;

        info!(vehicle_id = %vehicle.id, identifier = %vehicle.identifier, "Vehicle created");
        self.load_vehicle(ctx, vehicle.id).await
    }

    /// Soft-delete. Trips keep their reference so past bookings still resolve.
    pub async fn deactivate_vehicle(&self, ctx: &AccountContext, vehicle_id: Uuid) -> CoreResult<Vehicle> {
        let mut vehicle = self.load_vehicle(ctx, vehicle_id).await?;
        if !vehicle.lifecycle.deactivate(self.timestamp()) {
            return Ok(vehicle);
        }

        let mut work = UnitOfWork::new("deactivate_vehicle");
        work.put_vehicle(vehicle);
        self.store.commit(ctx, work).await?;
        self.load_vehicle(ctx, vehicle_id).await
    }
}
