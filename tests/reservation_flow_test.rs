use chrono::Duration as ChronoDuration;
use slotbook::adapters::{InMemoryGrid, InMemoryReservationStore, LogNotifier, SandboxGateway};
use slotbook::domain::ports::{HoldStatus, PaymentGateway, ReservationStore, SlotGrid};
use slotbook::{
    BookingError, ClientId, Coordinator, Money, ProviderId, ReservationStatus, RetryPolicy, Slot,
    SlotState, Weekday,
};
use std::sync::Arc;

type TestCoordinator = Coordinator<InMemoryGrid, InMemoryReservationStore, SandboxGateway>;

struct Harness {
    coordinator: TestCoordinator,
    gateway: SandboxGateway,
    grid: InMemoryGrid,
    store: InMemoryReservationStore,
}

fn harness() -> Harness {
    let grid = InMemoryGrid::new();
    let store = InMemoryReservationStore::new();
    let gateway = SandboxGateway::new();
    let coordinator = Coordinator::new(
        grid.clone(),
        store.clone(),
        gateway.clone(),
        Arc::new(LogNotifier),
        RetryPolicy::immediate(3),
    );
    Harness {
        coordinator,
        gateway,
        grid,
        store,
    }
}

fn slot() -> Slot {
    Slot::single(Weekday::Tuesday, 10).unwrap()
}

#[tokio::test]
async fn test_decline_frees_slot_and_cancels_hold() {
    let h = harness();
    let client = ClientId::new();
    let provider = ProviderId::new();

    let reservation = h
        .coordinator
        .create(client, provider, slot(), Money::gbp(2000))
        .await
        .unwrap();
    assert_eq!(reservation.status, ReservationStatus::Pending);
    assert!(!h.grid.is_free(provider, &slot()).await.unwrap());

    let declined = h.coordinator.decline(reservation.id, provider).await.unwrap();
    assert_eq!(declined.status, ReservationStatus::Declined);

    assert_eq!(h.gateway.outstanding_holds().await, 0);
    assert_eq!(
        h.gateway.hold_state(&reservation.hold_id).await,
        Some(HoldStatus::Cancelled)
    );
    assert!(h.grid.is_free(provider, &slot()).await.unwrap());

    // Another client can take the slot straight away.
    let rebooked = h
        .coordinator
        .create(ClientId::new(), provider, slot(), Money::gbp(2000))
        .await
        .unwrap();
    assert_eq!(rebooked.status, ReservationStatus::Pending);
}

#[tokio::test]
async fn test_expiry_frees_slot_for_rebooking() {
    let h = harness();
    let provider = ProviderId::new();

    let reservation = h
        .coordinator
        .create(ClientId::new(), provider, slot(), Money::gbp(3000))
        .await
        .unwrap();

    // Zero timeout makes every pending record stale.
    let expired = h
        .coordinator
        .sweep_expired(ChronoDuration::zero())
        .await
        .unwrap();
    assert_eq!(expired, 1);

    let record = h.coordinator.reservation(reservation.id).await.unwrap();
    assert_eq!(record.status, ReservationStatus::Expired);
    assert_eq!(h.gateway.outstanding_holds().await, 0);
    assert!(h.grid.is_free(provider, &slot()).await.unwrap());

    let rebooked = h
        .coordinator
        .create(ClientId::new(), provider, slot(), Money::gbp(3000))
        .await
        .unwrap();
    assert_eq!(rebooked.status, ReservationStatus::Pending);
}

#[tokio::test]
async fn test_duplicate_approve_is_idempotent() {
    let h = harness();
    let provider = ProviderId::new();

    let reservation = h
        .coordinator
        .create(ClientId::new(), provider, slot(), Money::gbp(2000))
        .await
        .unwrap();

    let approved = h.coordinator.approve(reservation.id, provider).await.unwrap();
    assert_eq!(approved.status, ReservationStatus::Approved);

    // Replay of the same approve: no error, no second capture.
    let replayed = h.coordinator.approve(reservation.id, provider).await.unwrap();
    assert_eq!(replayed.status, ReservationStatus::Approved);

    assert_eq!(
        h.gateway.hold_state(&reservation.hold_id).await,
        Some(HoldStatus::Captured)
    );
    assert_eq!(h.gateway.outstanding_holds().await, 0);
    // The slot stays booked.
    assert!(!h.grid.is_free(provider, &slot()).await.unwrap());
}

#[tokio::test]
async fn test_clear_replay_is_noop() {
    let h = harness();
    let client = ClientId::new();
    let provider = ProviderId::new();

    let reservation = h
        .coordinator
        .create(client, provider, slot(), Money::gbp(2000))
        .await
        .unwrap();

    let cleared = h.coordinator.clear(reservation.id, client).await.unwrap();
    assert_eq!(cleared.status, ReservationStatus::Cleared);

    let replayed = h.coordinator.clear(reservation.id, client).await.unwrap();
    assert_eq!(replayed.status, ReservationStatus::Cleared);
    assert_eq!(h.gateway.outstanding_holds().await, 0);
}

#[tokio::test]
async fn test_conflicting_verb_on_resolved_reservation() {
    let h = harness();
    let client = ClientId::new();
    let provider = ProviderId::new();

    let reservation = h
        .coordinator
        .create(client, provider, slot(), Money::gbp(2000))
        .await
        .unwrap();
    h.coordinator.decline(reservation.id, provider).await.unwrap();

    // A different verb after resolution is rejected, not replayed.
    let err = h.coordinator.approve(reservation.id, provider).await.unwrap_err();
    assert!(matches!(err, BookingError::InvalidState { .. }));

    let err = h.coordinator.clear(reservation.id, client).await.unwrap_err();
    assert!(matches!(err, BookingError::InvalidState { .. }));
}

#[tokio::test]
async fn test_expire_after_approve_is_noop() {
    let h = harness();
    let provider = ProviderId::new();

    let reservation = h
        .coordinator
        .create(ClientId::new(), provider, slot(), Money::gbp(2000))
        .await
        .unwrap();
    h.coordinator.approve(reservation.id, provider).await.unwrap();

    let record = h.coordinator.expire(reservation.id).await.unwrap();
    assert_eq!(record.status, ReservationStatus::Approved);

    // The capture stands and the booking keeps its slot.
    assert_eq!(
        h.gateway.hold_state(&reservation.hold_id).await,
        Some(HoldStatus::Captured)
    );
    assert!(!h.grid.is_free(provider, &slot()).await.unwrap());
}

#[tokio::test]
async fn test_wrong_actor_is_forbidden() {
    let h = harness();
    let client = ClientId::new();
    let provider = ProviderId::new();

    let reservation = h
        .coordinator
        .create(client, provider, slot(), Money::gbp(2000))
        .await
        .unwrap();

    let err = h
        .coordinator
        .approve(reservation.id, ProviderId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Forbidden { .. }));

    let err = h
        .coordinator
        .clear(reservation.id, ClientId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Forbidden { .. }));

    // Still pending and still holding the slot.
    let record = h.coordinator.reservation(reservation.id).await.unwrap();
    assert_eq!(record.status, ReservationStatus::Pending);
    assert_eq!(h.gateway.outstanding_holds().await, 1);
}

#[tokio::test]
async fn test_declined_payment_leaves_no_trace() {
    let h = harness();
    let provider = ProviderId::new();

    h.gateway.decline_next_authorize();
    let err = h
        .coordinator
        .create(ClientId::new(), provider, slot(), Money::gbp(2000))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::PaymentDeclined { .. }));

    assert_eq!(h.gateway.outstanding_holds().await, 0);
    assert!(h.grid.is_free(provider, &slot()).await.unwrap());
}

#[tokio::test]
async fn test_transient_gateway_outage_is_retried() {
    let h = harness();
    let provider = ProviderId::new();

    h.gateway.fail_authorize_times(2);
    let reservation = h
        .coordinator
        .create(ClientId::new(), provider, slot(), Money::gbp(2000))
        .await
        .unwrap();
    assert_eq!(reservation.status, ReservationStatus::Pending);
    assert_eq!(h.gateway.outstanding_holds().await, 1);
}

#[tokio::test]
async fn test_exhausted_outage_surfaces_as_unavailable() {
    let h = harness();
    let provider = ProviderId::new();

    h.gateway.fail_authorize_times(5);
    let err = h
        .coordinator
        .create(ClientId::new(), provider, slot(), Money::gbp(2000))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::GatewayUnavailable { .. }));
    assert!(h.grid.is_free(provider, &slot()).await.unwrap());
}

#[tokio::test]
async fn test_second_create_on_taken_slot_is_rejected() {
    let h = harness();
    let provider = ProviderId::new();

    h.coordinator
        .create(ClientId::new(), provider, slot(), Money::gbp(2000))
        .await
        .unwrap();

    let err = h
        .coordinator
        .create(ClientId::new(), provider, slot(), Money::gbp(2000))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::SlotUnavailable));

    // Only the winner's hold exists.
    assert_eq!(h.gateway.outstanding_holds().await, 1);
}

#[tokio::test]
async fn test_span_reservation_covers_all_hours() {
    let h = harness();
    let provider = ProviderId::new();
    let long_slot = Slot::new(Weekday::Friday, 9, 3).unwrap();

    h.coordinator
        .create(ClientId::new(), provider, long_slot, Money::gbp(6000))
        .await
        .unwrap();

    // Any overlapping slot is now taken.
    let overlap = Slot::single(Weekday::Friday, 11).unwrap();
    let err = h
        .coordinator
        .create(ClientId::new(), provider, overlap, Money::gbp(2000))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::SlotUnavailable));

    // The hour after the span is still bookable.
    let after = Slot::single(Weekday::Friday, 12).unwrap();
    assert!(h
        .coordinator
        .create(ClientId::new(), provider, after, Money::gbp(2000))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_approve_refuses_cancelled_hold() {
    let h = harness();
    let provider = ProviderId::new();

    let reservation = h
        .coordinator
        .create(ClientId::new(), provider, slot(), Money::gbp(2000))
        .await
        .unwrap();

    // The hold is released out from under the approval, as a concurrent
    // expiry does before its record transition lands.
    h.gateway.cancel(&reservation.hold_id).await.unwrap();

    let err = h.coordinator.approve(reservation.id, provider).await.unwrap_err();
    assert!(matches!(err, BookingError::InvalidState { .. }));

    // No booking was confirmed on the released hold.
    let record = h.coordinator.reservation(reservation.id).await.unwrap();
    assert_eq!(record.status, ReservationStatus::Pending);
    assert_eq!(
        h.gateway.hold_state(&reservation.hold_id).await,
        Some(HoldStatus::Cancelled)
    );
    assert_eq!(
        h.grid
            .slot_state(provider, (Weekday::Tuesday, 10))
            .await
            .unwrap(),
        SlotState::Held(reservation.id)
    );
}

#[tokio::test]
async fn test_capture_outage_leaves_record_pending_and_retryable() {
    let h = harness();
    let provider = ProviderId::new();

    let reservation = h
        .coordinator
        .create(ClientId::new(), provider, slot(), Money::gbp(2000))
        .await
        .unwrap();

    // Outage outlasts the backoff budget; no partial transition persists.
    h.gateway.fail_capture_times(3);
    let err = h.coordinator.approve(reservation.id, provider).await.unwrap_err();
    assert!(matches!(err, BookingError::GatewayUnavailable { .. }));
    assert!(err.is_retryable());

    let record = h.coordinator.reservation(reservation.id).await.unwrap();
    assert_eq!(record.status, ReservationStatus::Pending);
    assert_eq!(
        h.gateway.hold_state(&reservation.hold_id).await,
        Some(HoldStatus::Authorized)
    );

    // Gateway back: resubmitting the approve completes it.
    let approved = h.coordinator.approve(reservation.id, provider).await.unwrap();
    assert_eq!(approved.status, ReservationStatus::Approved);
    assert_eq!(
        h.gateway.hold_state(&reservation.hold_id).await,
        Some(HoldStatus::Captured)
    );
}

#[tokio::test]
async fn test_cancel_outage_leaves_record_for_resubmission() {
    let h = harness();
    let provider = ProviderId::new();

    let reservation = h
        .coordinator
        .create(ClientId::new(), provider, slot(), Money::gbp(2000))
        .await
        .unwrap();

    h.gateway.fail_cancel_times(3);
    let err = h.coordinator.decline(reservation.id, provider).await.unwrap_err();
    assert!(matches!(err, BookingError::GatewayUnavailable { .. }));

    // Still pending, still holding slot and hold, so the sweeper or a
    // retried decline can finish the release.
    let record = h.coordinator.reservation(reservation.id).await.unwrap();
    assert_eq!(record.status, ReservationStatus::Pending);
    assert!(!h.grid.is_free(provider, &slot()).await.unwrap());
    assert_eq!(
        h.gateway.hold_state(&reservation.hold_id).await,
        Some(HoldStatus::Authorized)
    );

    let declined = h.coordinator.decline(reservation.id, provider).await.unwrap();
    assert_eq!(declined.status, ReservationStatus::Declined);
    assert!(h.grid.is_free(provider, &slot()).await.unwrap());
    assert_eq!(h.gateway.outstanding_holds().await, 0);
}

#[tokio::test]
async fn test_approve_replay_reasserts_booked_slot() {
    let h = harness();
    let provider = ProviderId::new();

    let reservation = h
        .coordinator
        .create(ClientId::new(), provider, slot(), Money::gbp(2000))
        .await
        .unwrap();

    // Record approved but the grid flip never landed.
    h.store
        .transition(reservation.id, ReservationStatus::Approved)
        .await
        .unwrap();

    let replayed = h.coordinator.approve(reservation.id, provider).await.unwrap();
    assert_eq!(replayed.status, ReservationStatus::Approved);
    assert_eq!(
        h.grid
            .slot_state(provider, (Weekday::Tuesday, 10))
            .await
            .unwrap(),
        SlotState::Booked(reservation.id)
    );
}

#[tokio::test]
async fn test_sweep_only_expires_stale_pending() {
    let h = harness();
    let provider = ProviderId::new();

    let reservation = h
        .coordinator
        .create(ClientId::new(), provider, slot(), Money::gbp(2000))
        .await
        .unwrap();

    // A generous timeout leaves the fresh reservation alone.
    let expired = h
        .coordinator
        .sweep_expired(ChronoDuration::hours(24))
        .await
        .unwrap();
    assert_eq!(expired, 0);

    let record = h.coordinator.reservation(reservation.id).await.unwrap();
    assert_eq!(record.status, ReservationStatus::Pending);
}
