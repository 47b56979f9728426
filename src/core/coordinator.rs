use crate::core::retry::{with_backoff, RetryPolicy};
use crate::domain::model::{
    ClientId, Money, ProviderId, Reservation, ReservationId, ReservationStatus,
};
use crate::domain::ports::{
    HoldMetadata, HoldStatus, Notifier, PaymentGateway, ReleaseOutcome, ReservationStore, SlotGrid,
};
use crate::domain::slot::Slot;
use crate::utils::error::{BookingError, Result};
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;

/// Orchestrates the reservation lifecycle across the grid, the record store
/// and the payment gateway. The only writer of record status and slot
/// state; every cross-resource step assumes interleaving with other
/// workers and compensates instead of rolling back.
pub struct Coordinator<G, S, P>
where
    G: SlotGrid,
    S: ReservationStore,
    P: PaymentGateway,
{
    grid: G,
    store: S,
    gateway: P,
    notifier: Arc<dyn Notifier>,
    retry: RetryPolicy,
}

impl<G, S, P> Coordinator<G, S, P>
where
    G: SlotGrid,
    S: ReservationStore,
    P: PaymentGateway,
{
    pub fn new(
        grid: G,
        store: S,
        gateway: P,
        notifier: Arc<dyn Notifier>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            grid,
            store,
            gateway,
            notifier,
            retry,
        }
    }

    /// Reserve a slot for a client: authorize a hold, persist a pending
    /// record, then claim the grid slot. Nothing is persisted before a
    /// hold exists, and a lost `mark_held` race is compensated by
    /// cancelling that hold, so no authorized hold is ever left dangling.
    pub async fn create(
        &self,
        client_id: ClientId,
        provider_id: ProviderId,
        slot: Slot,
        amount: Money,
    ) -> Result<Reservation> {
        // Cheap precheck; the conditional mark_held below is the real guard.
        if !self.grid.is_free(provider_id, &slot).await? {
            return Err(BookingError::SlotUnavailable);
        }

        let metadata = HoldMetadata {
            client_id,
            provider_id,
            slot,
        };
        let hold_id = with_backoff(&self.retry, "payment.authorize", || {
            self.gateway.authorize(&amount, &metadata)
        })
        .await?;

        tracing::debug!(
            "Authorized hold {} for {} on {}",
            hold_id,
            amount,
            slot
        );

        let reservation = Reservation::pending(client_id, provider_id, slot, amount, hold_id);
        if let Err(e) = self.store.insert(reservation.clone()).await {
            // Hold exists but no record will reference it: release it now.
            self.cancel_hold_or_log(&reservation).await;
            return Err(e);
        }

        match self
            .grid
            .mark_held(provider_id, &slot, reservation.id)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    "Reservation {} pending for slot {} (provider {})",
                    reservation.id,
                    slot,
                    provider_id
                );
                Ok(reservation)
            }
            Err(e) => {
                // Lost the race after authorization. Compensation is
                // mandatory: cancel the hold, retire the record, then
                // report the slot as taken.
                tracing::info!(
                    "Reservation {} lost slot race for {}: {}",
                    reservation.id,
                    slot,
                    e
                );
                self.cancel_hold_or_log(&reservation).await;
                if let Err(te) = self
                    .store
                    .transition(reservation.id, ReservationStatus::Declined)
                    .await
                {
                    tracing::error!(
                        "reconciliation: reservation {} stuck pending after lost race: {}",
                        reservation.id,
                        te
                    );
                }
                match e {
                    BookingError::SlotConflict => Err(BookingError::SlotUnavailable),
                    other => Err(other),
                }
            }
        }
    }

    /// Provider accepts a pending reservation. The hold is captured first;
    /// the record only becomes approved once the gateway acknowledged the
    /// capture, and the grid slot turns into a confirmed booking.
    pub async fn approve(
        &self,
        id: ReservationId,
        acting_provider: ProviderId,
    ) -> Result<Reservation> {
        let reservation = self.store.find_by_id(id).await?;

        if reservation.provider_id != acting_provider {
            return Err(BookingError::Forbidden {
                reason: "Reservation belongs to a different provider".to_string(),
            });
        }
        if reservation.status == ReservationStatus::Approved {
            // Duplicate approve request; the capture already happened.
            // Re-assert the grid flip in case the first attempt lost it.
            self.grid
                .mark_booked(acting_provider, &reservation.slot, id)
                .await?;
            tracing::debug!("Reservation {} already approved, replay ignored", id);
            return Ok(reservation);
        }
        if reservation.status.is_terminal() {
            return Err(BookingError::InvalidState {
                reason: format!("Reservation is {}", reservation.status),
            });
        }

        let capture = with_backoff(&self.retry, "payment.capture", || {
            self.gateway.capture(&reservation.hold_id)
        })
        .await;

        if let Err(e) = capture {
            match e {
                // Gateway no longer holds it. Only a confirmed capture may
                // back an approval; a concurrent expiry cancels the hold
                // first, and that hold must never turn into a booking.
                BookingError::HoldNotFound { .. } => {
                    match self.gateway.hold_status(&reservation.hold_id).await {
                        Ok(HoldStatus::Captured) => {
                            tracing::warn!(
                                "Hold {} already captured while approving {}",
                                reservation.hold_id,
                                id
                            );
                        }
                        Ok(status) => {
                            tracing::error!(
                                "reconciliation: hold {} is {:?}, refusing to approve reservation {}",
                                reservation.hold_id,
                                status,
                                id
                            );
                            return Err(BookingError::InvalidState {
                                reason: "Payment hold was already released".to_string(),
                            });
                        }
                        Err(BookingError::HoldNotFound { .. }) => {
                            tracing::error!(
                                "reconciliation: hold {} unknown at gateway, refusing to approve reservation {}",
                                reservation.hold_id,
                                id
                            );
                            return Err(BookingError::InvalidState {
                                reason: "Payment hold was already released".to_string(),
                            });
                        }
                        Err(other) => return Err(other),
                    }
                }
                other => return Err(other),
            }
        }

        let updated = match self
            .store
            .transition(id, ReservationStatus::Approved)
            .await
        {
            Ok(updated) => updated,
            Err(e) => {
                // Capture acknowledged but the record left pending in the
                // meantime (expiry race). The money side is resolved; flag
                // for manual reconciliation instead of double-resolving.
                tracing::error!(
                    "reconciliation: hold {} captured but reservation {} not pending: {}",
                    reservation.hold_id,
                    id,
                    e
                );
                return Err(e);
            }
        };

        self.grid
            .mark_booked(acting_provider, &updated.slot, id)
            .await?;

        tracing::info!("Reservation {} approved, slot {} booked", id, updated.slot);
        self.notify(&updated);
        Ok(updated)
    }

    /// Provider turns down a pending reservation.
    pub async fn decline(
        &self,
        id: ReservationId,
        acting_provider: ProviderId,
    ) -> Result<Reservation> {
        let reservation = self.store.find_by_id(id).await?;
        if reservation.provider_id != acting_provider {
            return Err(BookingError::Forbidden {
                reason: "Reservation belongs to a different provider".to_string(),
            });
        }
        if reservation.status == ReservationStatus::Declined {
            tracing::debug!("Reservation {} already declined, replay ignored", id);
            return Ok(reservation);
        }
        self.release(reservation, ReservationStatus::Declined).await
    }

    /// Client withdraws their own pending reservation.
    pub async fn clear(&self, id: ReservationId, acting_client: ClientId) -> Result<Reservation> {
        let reservation = self.store.find_by_id(id).await?;
        if reservation.client_id != acting_client {
            return Err(BookingError::Forbidden {
                reason: "Reservation belongs to a different client".to_string(),
            });
        }
        if reservation.status == ReservationStatus::Cleared {
            tracing::debug!("Reservation {} already cleared, replay ignored", id);
            return Ok(reservation);
        }
        self.release(reservation, ReservationStatus::Cleared).await
    }

    /// Force-release a reservation that sat pending past the timeout.
    /// Invoked by the sweeper; a record that already left pending is a
    /// logged no-op, never a second hold resolution.
    pub async fn expire(&self, id: ReservationId) -> Result<Reservation> {
        let reservation = self.store.find_by_id(id).await?;
        if reservation.status.is_terminal() {
            tracing::debug!(
                "Expire skipped, reservation {} is already {}",
                id,
                reservation.status
            );
            return Ok(reservation);
        }
        self.release(reservation, ReservationStatus::Expired).await
    }

    /// One expiry pass: force-expire every reservation pending longer than
    /// `timeout`. Returns how many were expired.
    pub async fn sweep_expired(&self, timeout: ChronoDuration) -> Result<usize> {
        let cutoff = Utc::now() - timeout;
        let stale = self.store.find_pending_older_than(cutoff).await?;
        if stale.is_empty() {
            return Ok(0);
        }

        tracing::info!("Expiry sweep found {} stale pending reservations", stale.len());
        let mut expired = 0;
        for reservation in stale {
            match self.expire(reservation.id).await {
                Ok(r) if r.status == ReservationStatus::Expired => expired += 1,
                Ok(r) => {
                    // Raced with a provider or client action; their
                    // transition won.
                    tracing::debug!("Sweep skipped {}: resolved as {}", r.id, r.status);
                }
                Err(e) => {
                    tracing::warn!(
                        "Sweep could not expire {}: {} (left for next pass)",
                        reservation.id,
                        e
                    );
                }
            }
        }
        Ok(expired)
    }

    pub async fn reservation(&self, id: ReservationId) -> Result<Reservation> {
        self.store.find_by_id(id).await
    }

    pub async fn provider_reservations(&self, provider_id: ProviderId) -> Result<Vec<Reservation>> {
        self.store.find_by_provider(provider_id).await
    }

    /// The single release path shared by decline, clear and expire:
    /// cancel the hold, retire the record, free the slot, notify.
    async fn release(&self, reservation: Reservation, to: ReservationStatus) -> Result<Reservation> {
        debug_assert!(to.is_terminal());

        // Cancel before the record transition. Cancel is idempotent at the
        // gateway, so a retried release never double-releases money; if the
        // gateway stays down the record remains pending for the sweeper.
        with_backoff(&self.retry, "payment.cancel", || {
            self.gateway.cancel(&reservation.hold_id)
        })
        .await
        .or_else(|e| match e {
            BookingError::HoldNotFound { ref hold_id } => {
                tracing::debug!("Hold {} already resolved, cancel is a no-op", hold_id);
                Ok(())
            }
            other => Err(other),
        })?;

        let updated = self.store.transition(reservation.id, to).await?;

        match self
            .grid
            .mark_free(updated.provider_id, &updated.slot, updated.id)
            .await?
        {
            ReleaseOutcome::Released => {}
            ReleaseOutcome::AlreadyFree => {
                tracing::debug!("Slot {} already free releasing {}", updated.slot, updated.id);
            }
            ReleaseOutcome::StaleHolder(holder) => {
                // Benign race: a newer reservation holds the slot now.
                tracing::warn!(
                    "Stale release by {}: slot {} is held by {}",
                    updated.id,
                    updated.slot,
                    holder
                );
            }
        }

        tracing::info!("Reservation {} {}, slot {} released", updated.id, to, updated.slot);
        self.notify(&updated);
        Ok(updated)
    }

    /// Best-effort hold cancellation during compensation. Failure leaves an
    /// orphaned authorization, which is logged for manual reconciliation.
    async fn cancel_hold_or_log(&self, reservation: &Reservation) {
        let result = with_backoff(&self.retry, "payment.cancel", || {
            self.gateway.cancel(&reservation.hold_id)
        })
        .await;

        match result {
            Ok(()) => {}
            Err(BookingError::HoldNotFound { .. }) => {}
            Err(e) => {
                tracing::error!(
                    "reconciliation: failed to cancel hold {} for reservation {}: {}",
                    reservation.hold_id,
                    reservation.id,
                    e
                );
            }
        }
    }

    fn notify(&self, reservation: &Reservation) {
        let notifier = Arc::clone(&self.notifier);
        let reservation = reservation.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.reservation_resolved(&reservation).await {
                tracing::warn!(
                    "Notification for reservation {} failed: {}",
                    reservation.id,
                    e
                );
            }
        });
    }
}
