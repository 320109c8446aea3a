#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use fretado_core::{AccountContext, FixedClock};
use fretado_engine::telemetry::init_tracing;
use fretado_engine::{BookingEngine, TripDraft, VehicleDraft};
use fretado_order::{OrderDraft, PayerDraft, PaymentRecordDraft, ReservationDraft};
use fretado_shared::{Cell, Passenger, SeatNumber, Trip, TripSchedule, Vehicle};
use fretado_store::{Config, InMemoryStore};
use std::sync::Arc;
use uuid::Uuid;

pub struct Fixture {
    pub engine: BookingEngine,
    pub store: Arc<InMemoryStore>,
    pub ctx: AccountContext,
}

pub fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, day)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .unwrap()
}

/// Engine frozen at 2024-05-01 12:00
pub fn fixture() -> Fixture {
    fixture_at(at(1, 12, 0))
}

pub fn fixture_at(now: NaiveDateTime) -> Fixture {
    fixture_with(&Config::default(), now)
}

pub fn fixture_with(config: &Config, now: NaiveDateTime) -> Fixture {
    init_tracing("fretado_engine=debug,fretado_store=debug");
    let (engine, store) = BookingEngine::in_memory(config);
    Fixture {
        engine: engine.with_clock(Arc::new(FixedClock::new(now))),
        store,
        ctx: AccountContext::new("viacao-aurora").with_actor("balcao-1"),
    }
}

/// Seats "1"..="n", four to a row
pub fn seat_cells(n: u32) -> Vec<Cell> {
    (1..=n)
        .map(|i| Cell::seat((i - 1) / 4, (i - 1) % 4, SeatNumber::from(i)))
        .collect()
}

pub fn seat(token: &str) -> SeatNumber {
    SeatNumber::from(token)
}

impl Fixture {
    pub async fn vehicle_with_seats(&self, plate: &str, seats: u32) -> Vehicle {
        let layout = self
            .engine
            .create_layout(&self.ctx, Some(format!("{} lugares", seats)), seat_cells(seats), None)
            .await
            .unwrap();
        self.engine
            .create_vehicle(
                &self.ctx,
                VehicleDraft {
                    identifier: format!("Ônibus {}", plate),
                    plate: plate.to_string(),
                    company: "Aurora Turismo".to_string(),
                    layout_id: Some(layout.id),
                },
            )
            .await
            .unwrap()
    }

    pub async fn trip(&self, schedule: TripSchedule, vehicle_id: Option<Uuid>) -> Trip {
        self.engine
            .create_trip(
                &self.ctx,
                TripDraft {
                    origin: "Curitiba".to_string(),
                    destination: "Foz do Iguaçu".to_string(),
                    schedule,
                    vehicle_id,
                },
            )
            .await
            .unwrap()
    }

    /// Round trip on May 10th, 08:00 to 20:00, on a fresh 40-seat bus
    pub async fn booked_trip(&self) -> Trip {
        let vehicle = self.vehicle_with_seats("ABC-1234", 40).await;
        self.trip(
            TripSchedule::round_trip(at(10, 8, 0), at(10, 20, 0)),
            Some(vehicle.id),
        )
        .await
    }

    pub async fn passenger(&self, name: &str) -> Uuid {
        let passenger = Passenger::new(name.to_string(), None, false);
        let id = passenger.id;
        self.store.upsert_passenger(&self.ctx, passenger).await;
        id
    }

    pub async fn order_draft(&self, total: &str, seats: &[&str]) -> OrderDraft {
        let mut reservations = Vec::new();
        for (i, token) in seats.iter().enumerate() {
            let passenger_id = self.passenger(&format!("Passageiro {}", i + 1)).await;
            let mut reservation = ReservationDraft::new(*token, passenger_id);
            reservation.is_payer = i == 0;
            reservations.push(reservation);
        }
        OrderDraft {
            order_id: None,
            payer: PayerDraft {
                name: "Helena Duarte".to_string(),
                national_id: Some("529.982.247-25".to_string()),
                passport: None,
                rg: None,
                method: "PIX".to_string(),
                total: total.to_string(),
            },
            payments: Vec::new(),
            reservations,
        }
    }
}

pub fn payment(amount: &str) -> PaymentRecordDraft {
    PaymentRecordDraft::new("2024-05-01", amount, "PIX")
}
