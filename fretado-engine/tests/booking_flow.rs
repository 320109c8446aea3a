mod common;

use common::{fixture, payment, seat};
use fretado_core::{ConflictError, CoreError, EntityKind, ValidationError};
use fretado_engine::BookingWarning;
use fretado_order::ReservationDraft;
use fretado_shared::BookingStatus;
use rust_decimal::Decimal;

#[tokio::test]
async fn test_cancelled_reservation_frees_its_seat() -> anyhow::Result<()> {
    let f = fixture();
    let vehicle = f.vehicle_with_seats("QWE-1A23", 3).await;
    let trip = f
        .trip(
            fretado_shared::TripSchedule::round_trip(common::at(10, 8, 0), common::at(10, 20, 0)),
            Some(vehicle.id),
        )
        .await;

    let draft = f.order_draft("300", &["1", "2", "3"]).await;
    let saved = f.engine.save_order(&f.ctx, trip.id, draft).await?;
    let third = saved
        .reservations
        .iter()
        .find(|r| r.seat_number == seat("3"))
        .map(|r| r.id)
        .unwrap();

    f.engine.cancel_reservation(&f.ctx, third).await?;

    let occupied: Vec<_> = f.engine.occupied_seats(&f.ctx, trip.id).await?.into_iter().collect();
    assert_eq!(occupied, vec![seat("1"), seat("2")]);
    assert!(f.engine.is_seat_available(&f.ctx, trip.id, &seat("3"), None).await?);
    assert_eq!(f.engine.available_seats(&f.ctx, trip.id).await?, vec![seat("3")]);
    assert_eq!(f.engine.reservation_status(&f.ctx, third).await?, BookingStatus::Cancelled);
    Ok(())
}

#[tokio::test]
async fn test_payments_settle_order_and_reject_overpayment() -> anyhow::Result<()> {
    let f = fixture();
    let trip = f.booked_trip().await;
    let saved = f.engine.save_order(&f.ctx, trip.id, f.order_draft("100,00", &["7"]).await).await?;
    let order_id = saved.order.id;
    assert_eq!(saved.order.status, BookingStatus::PaymentPending);

    f.engine.add_payment(&f.ctx, order_id, payment("40,00")).await?;
    let summary = f.engine.add_payment(&f.ctx, order_id, payment("60.00")).await?;
    assert_eq!(summary.paid, Decimal::new(10000, 2));
    assert_eq!(summary.remaining, Decimal::ZERO);

    let status = f.engine.order_summary(&f.ctx, order_id).await?.status;
    assert_eq!(status, BookingStatus::Paid);
    let reservation = saved.reservations[0].id;
    assert_eq!(f.engine.reservation_status(&f.ctx, reservation).await?, BookingStatus::Paid);

    let commits = f.store.commit_count();
    let err = f.engine.add_payment(&f.ctx, order_id, payment("10,00")).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Validation(ValidationError::PaymentExceedsTotal { .. })
    ));
    assert_eq!(f.store.commit_count(), commits);

    let summary = f.engine.order_summary(&f.ctx, order_id).await?;
    assert_eq!(summary.paid, Decimal::new(100, 0));
    assert_eq!(summary.status, BookingStatus::Paid);

    // removing a payment reopens the balance
    let summary = f.engine.remove_payment(&f.ctx, order_id, 0).await?;
    assert_eq!(summary.remaining, Decimal::new(40, 0));
    let status = f.engine.order_summary(&f.ctx, order_id).await?.status;
    assert_eq!(status, BookingStatus::PaymentPending);
    Ok(())
}

#[tokio::test]
async fn test_invalid_order_writes_nothing() -> anyhow::Result<()> {
    let f = fixture();
    let trip = f.booked_trip().await;
    let commits = f.store.commit_count();

    let mut no_passenger = f.order_draft("100", &["1"]).await;
    no_passenger.reservations[0].passenger_id = None;
    let err = f.engine.save_order(&f.ctx, trip.id, no_passenger).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(ValidationError::MissingPassenger { .. })));

    let mut bad_cpf = f.order_draft("100", &["1"]).await;
    bad_cpf.payer.national_id = Some("123.456.789-00".to_string());
    let err = f.engine.save_order(&f.ctx, trip.id, bad_cpf).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(ValidationError::InvalidPayerDocument { .. })));

    let mut bad_record = f.order_draft("100", &["1"]).await;
    bad_record.payments.push(fretado_order::PaymentRecordDraft::new("2024-05-01", "10", ""));
    let err = f.engine.save_order(&f.ctx, trip.id, bad_record).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Validation(ValidationError::InvalidPaymentRecord { field: "method", .. })
    ));

    let out_of_range = f.order_draft("100", &["41"]).await;
    let err = f.engine.save_order(&f.ctx, trip.id, out_of_range).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Validation(ValidationError::SeatOutOfRange { ref seat }) if *seat == seat_41()
    ));

    let mut unknown_passenger = f.order_draft("100", &["1"]).await;
    unknown_passenger.reservations[0].passenger_id = Some(uuid::Uuid::new_v4());
    let err = f.engine.save_order(&f.ctx, trip.id, unknown_passenger).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { entity: EntityKind::Passenger, .. }));

    assert_eq!(f.store.commit_count(), commits);
    assert!(f.engine.occupied_seats(&f.ctx, trip.id).await?.is_empty());
    Ok(())
}

fn seat_41() -> fretado_shared::SeatNumber {
    seat("41")
}

#[tokio::test]
async fn test_taken_seat_is_a_conflict() -> anyhow::Result<()> {
    let f = fixture();
    let trip = f.booked_trip().await;
    f.engine.save_order(&f.ctx, trip.id, f.order_draft("100", &["5"]).await).await?;

    let err = f
        .engine
        .save_order(&f.ctx, trip.id, f.order_draft("100", &["6", "5"]).await)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(ConflictError::SeatTaken { ref seat }) if seat.as_str() == "5"));
    assert_eq!(f.engine.occupied_seats(&f.ctx, trip.id).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_edit_swaps_seats_and_cancels_dropped_reservation() -> anyhow::Result<()> {
    let f = fixture();
    let trip = f.booked_trip().await;
    let draft = f.order_draft("150", &["1", "2", "3"]).await;
    let saved = f.engine.save_order(&f.ctx, trip.id, draft.clone()).await?;
    f.engine.save_order(&f.ctx, trip.id, f.order_draft("50", &["9"]).await).await?;

    let by_seat = |token: &str| {
        saved
            .reservations
            .iter()
            .find(|r| r.seat_number == seat(token))
            .cloned()
            .unwrap()
    };
    let (one, two) = (by_seat("1"), by_seat("2"));

    // passengers of seats 1 and 2 swap, seat 3 is dropped
    let mut edit = draft;
    edit.order_id = Some(saved.order.id);
    edit.reservations = vec![
        ReservationDraft {
            reservation_id: Some(one.id),
            seat_number: "2".to_string(),
            passenger_id: Some(one.passenger_id),
            is_payer: true,
        },
        ReservationDraft {
            reservation_id: Some(two.id),
            seat_number: "1".to_string(),
            passenger_id: Some(two.passenger_id),
            is_payer: false,
        },
    ];
    let edited = f.engine.save_order(&f.ctx, trip.id, edit.clone()).await?;

    assert_eq!(edited.order.id, saved.order.id);
    assert_eq!(edited.reservations.len(), 3);
    assert_eq!(edited.reservations.iter().filter(|r| r.is_cancelled()).count(), 1);
    let occupied: Vec<_> = f.engine.occupied_seats(&f.ctx, trip.id).await?.into_iter().collect();
    assert_eq!(occupied, vec![seat("1"), seat("2"), seat("9")]);

    // moving onto another order's seat is refused
    let mut steal = edit;
    steal.reservations[0].seat_number = "9".to_string();
    let err = f.engine.save_order(&f.ctx, trip.id, steal).await.unwrap_err();
    assert!(matches!(err, CoreError::Conflict(ConflictError::SeatTaken { .. })));
    Ok(())
}

#[tokio::test]
async fn test_duplicate_passenger_is_only_a_warning() -> anyhow::Result<()> {
    let f = fixture();
    let trip = f.booked_trip().await;
    let first = f.engine.save_order(&f.ctx, trip.id, f.order_draft("100", &["1"]).await).await?;
    let passenger_id = first.reservations[0].passenger_id;

    let mut second = f.order_draft("100", &["2"]).await;
    second.reservations[0].passenger_id = Some(passenger_id);
    let saved = f.engine.save_order(&f.ctx, trip.id, second).await?;

    assert_eq!(
        saved.warnings,
        vec![BookingWarning::DuplicatePassenger {
            passenger_id,
            seat: seat("2"),
        }]
    );
    assert!(f.engine.duplicate_passenger_in_trip(&f.ctx, trip.id, passenger_id, None).await?);
    assert_eq!(f.engine.occupied_seats(&f.ctx, trip.id).await?.len(), 2);

    let json = serde_json::to_value(&saved.warnings[0])?;
    assert_eq!(json["kind"], "DUPLICATE_PASSENGER");
    Ok(())
}

#[tokio::test]
async fn test_cancelling_last_reservation_cancels_order() -> anyhow::Result<()> {
    let f = fixture();
    let trip = f.booked_trip().await;
    let saved = f.engine.save_order(&f.ctx, trip.id, f.order_draft("80", &["1", "2"]).await).await?;

    let first = f.engine.cancel_reservation(&f.ctx, saved.reservations[0].id).await?;
    assert_eq!(first.to, BookingStatus::PaymentPending);

    let again = f.engine.cancel_reservation(&f.ctx, saved.reservations[0].id).await.unwrap_err();
    assert!(matches!(
        again,
        CoreError::Conflict(ConflictError::AlreadyCancelled { entity: EntityKind::Reservation, .. })
    ));

    let last = f.engine.cancel_reservation(&f.ctx, saved.reservations[1].id).await?;
    assert_eq!(last.to, BookingStatus::Cancelled);
    assert!(f.engine.occupied_seats(&f.ctx, trip.id).await?.is_empty());

    let err = f.engine.add_payment(&f.ctx, saved.order.id, payment("10")).await.unwrap_err();
    assert!(matches!(err, CoreError::Conflict(ConflictError::AlreadyCancelled { .. })));
    Ok(())
}

#[tokio::test]
async fn test_cancel_order_twice() -> anyhow::Result<()> {
    let f = fixture();
    let trip = f.booked_trip().await;
    let saved = f.engine.save_order(&f.ctx, trip.id, f.order_draft("80", &["1", "2"]).await).await?;

    let cancelled = f.engine.cancel_order(&f.ctx, saved.order.id).await?;
    assert_eq!(cancelled.len(), 2);
    for reservation in &saved.reservations {
        assert_eq!(f.engine.reservation_status(&f.ctx, reservation.id).await?, BookingStatus::Cancelled);
    }

    let err = f.engine.cancel_order(&f.ctx, saved.order.id).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Conflict(ConflictError::AlreadyCancelled { entity: EntityKind::Order, .. })
    ));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_allocations_of_one_seat() -> anyhow::Result<()> {
    let f = fixture();
    let trip_id = f.booked_trip().await.id;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let engine = f.engine.clone();
        let ctx = f.ctx.clone();
        let draft = f.order_draft("100", &["12"]).await;
        tasks.push(tokio::spawn(async move { engine.save_order(&ctx, trip_id, draft).await }));
    }

    let mut successes = 0;
    for task in tasks {
        match task.await? {
            Ok(_) => successes += 1,
            Err(CoreError::Conflict(ConflictError::SeatTaken { .. } | ConflictError::StaleWrite { .. })) => {}
            Err(other) => anyhow::bail!("unexpected error: {other}"),
        }
    }

    assert_eq!(successes, 1);
    let inventory = f.engine.inventory(&f.ctx, trip_id).await?;
    assert_eq!(inventory.occupied_count(), 1);
    assert!(inventory.double_booked_seats().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_out_of_range_amounts_are_rejected() -> anyhow::Result<()> {
    let f = fixture();
    let trip = f.booked_trip().await;

    let huge = f.order_draft("79228162514264337593543950335", &["1"]).await;
    let err = f.engine.save_order(&f.ctx, trip.id, huge).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(ValidationError::InvalidTotal { .. })));

    let saved = f.engine.save_order(&f.ctx, trip.id, f.order_draft("100", &["1"]).await).await?;
    let order_id = saved.order.id;
    let commits = f.store.commit_count();

    for amount in ["79228162514264337593543950335", "99.999"] {
        let err = f.engine.add_payment(&f.ctx, order_id, payment(amount)).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::InvalidPaymentRecord { index: 0, field: "amount" })
        ));
    }
    assert_eq!(f.store.commit_count(), commits);

    let summary = f.engine.order_summary(&f.ctx, order_id).await?;
    assert_eq!(summary.paid, Decimal::ZERO);
    assert_eq!(summary.status, BookingStatus::PaymentPending);
    Ok(())
}
