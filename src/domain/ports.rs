use crate::domain::model::{
    ClientId, HoldId, Money, ProviderId, Reservation, ReservationId, ReservationStatus, SlotState,
};
use crate::domain::slot::Slot;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Context attached to a payment authorization so gateway-side records can
/// be traced back to the booking that created them.
#[derive(Debug, Clone)]
pub struct HoldMetadata {
    pub client_id: ClientId,
    pub provider_id: ProviderId,
    pub slot: Slot,
}

/// State of a hold as the gateway's own records report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HoldStatus {
    Authorized,
    Captured,
    Cancelled,
}

/// External card-holding gateway. Commands are acknowledged facts: once a
/// call returns Ok the outcome is durable on the gateway side and must be
/// recorded, never re-derived.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Place a hold on the card. No money moves yet.
    async fn authorize(&self, amount: &Money, metadata: &HoldMetadata) -> Result<HoldId>;

    /// Capture an authorized hold. Must only be treated as done on Ok.
    async fn capture(&self, hold_id: &HoldId) -> Result<()>;

    /// Release an authorized hold. Idempotent: cancelling an already
    /// resolved hold is a no-op on the gateway side.
    async fn cancel(&self, hold_id: &HoldId) -> Result<()>;

    /// How a hold stands in the gateway's records. A `HoldNotFound` from
    /// `capture` must be confirmed through this before treating the hold
    /// as captured.
    async fn hold_status(&self, hold_id: &HoldId) -> Result<HoldStatus>;
}

/// Persisted reservation records, one document each, with a conditional
/// status transition instead of read-modify-write.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn insert(&self, reservation: Reservation) -> Result<()>;

    async fn find_by_id(&self, id: ReservationId) -> Result<Reservation>;

    /// Compare-and-set `pending -> to`. Fails with `InvalidState` when the
    /// record already left pending, returning no mutation.
    async fn transition(&self, id: ReservationId, to: ReservationStatus) -> Result<Reservation>;

    /// Pending records created before `cutoff`, for the expiry sweep.
    async fn find_pending_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Reservation>>;

    /// All records referencing a provider, newest first.
    async fn find_by_provider(&self, provider_id: ProviderId) -> Result<Vec<Reservation>>;
}

/// Result of `mark_free`. A stale release is benign: the newer holder wins
/// and the caller only logs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released,
    AlreadyFree,
    StaleHolder(ReservationId),
}

/// Per-provider availability grid behind atomic per-document updates.
/// `mark_held` is the sole arbiter between racing reservation attempts.
#[async_trait]
pub trait SlotGrid: Send + Sync {
    async fn slot_state(&self, provider_id: ProviderId, day_hour: (crate::domain::slot::Weekday, u8))
        -> Result<SlotState>;

    async fn is_free(&self, provider_id: ProviderId, slot: &Slot) -> Result<bool>;

    /// Hold every hour the slot covers, in one conditional update. Fails
    /// with `SlotConflict` and no side effect unless all hours are free.
    async fn mark_held(
        &self,
        provider_id: ProviderId,
        slot: &Slot,
        reservation_id: ReservationId,
    ) -> Result<()>;

    /// Flip a held slot to its confirmed state after capture.
    async fn mark_booked(
        &self,
        provider_id: ProviderId,
        slot: &Slot,
        reservation_id: ReservationId,
    ) -> Result<()>;

    /// Free the slot if still held by `expected`. Idempotent when already
    /// free; a different holder is reported, not an error.
    async fn mark_free(
        &self,
        provider_id: ProviderId,
        slot: &Slot,
        expected: ReservationId,
    ) -> Result<ReleaseOutcome>;
}

/// Fire-and-forget notification dispatch. Failures are logged by the
/// caller and never block a state transition.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn reservation_resolved(&self, reservation: &Reservation) -> Result<()>;
}

// Lets the binary pick a gateway implementation at runtime while the
// coordinator stays generic.
#[async_trait]
impl<T: PaymentGateway + ?Sized> PaymentGateway for std::sync::Arc<T> {
    async fn authorize(&self, amount: &Money, metadata: &HoldMetadata) -> Result<HoldId> {
        (**self).authorize(amount, metadata).await
    }

    async fn capture(&self, hold_id: &HoldId) -> Result<()> {
        (**self).capture(hold_id).await
    }

    async fn cancel(&self, hold_id: &HoldId) -> Result<()> {
        (**self).cancel(hold_id).await
    }

    async fn hold_status(&self, hold_id: &HoldId) -> Result<HoldStatus> {
        (**self).hold_status(hold_id).await
    }
}
