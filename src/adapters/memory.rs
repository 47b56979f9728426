use crate::domain::model::{
    ProviderId, Reservation, ReservationId, ReservationStatus, SlotState,
};
use crate::domain::ports::{ReleaseOutcome, ReservationStore, SlotGrid};
use crate::domain::slot::{Slot, Weekday};
use crate::utils::error::{BookingError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-memory reservation documents. Mirrors the contract of a document
/// store with per-document conditional updates: `transition` is a
/// compare-and-set on the status field, never read-modify-write.
#[derive(Clone, Default)]
pub struct InMemoryReservationStore {
    records: Arc<Mutex<HashMap<ReservationId, Reservation>>>,
}

impl InMemoryReservationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn insert(&self, reservation: Reservation) -> Result<()> {
        let mut records = self.records.lock().await;
        if records.contains_key(&reservation.id) {
            return Err(BookingError::StorageError {
                message: format!("Duplicate reservation id {}", reservation.id),
            });
        }
        records.insert(reservation.id, reservation);
        Ok(())
    }

    async fn find_by_id(&self, id: ReservationId) -> Result<Reservation> {
        let records = self.records.lock().await;
        records.get(&id).cloned().ok_or(BookingError::NotFound {
            id: id.to_string(),
        })
    }

    async fn transition(&self, id: ReservationId, to: ReservationStatus) -> Result<Reservation> {
        let mut records = self.records.lock().await;
        let record = records.get_mut(&id).ok_or(BookingError::NotFound {
            id: id.to_string(),
        })?;

        if record.status != ReservationStatus::Pending {
            return Err(BookingError::InvalidState {
                reason: format!("Reservation is {}, expected pending", record.status),
            });
        }

        record.status = to;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn find_pending_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Reservation>> {
        let records = self.records.lock().await;
        Ok(records
            .values()
            .filter(|r| r.status == ReservationStatus::Pending && r.created_at < cutoff)
            .cloned()
            .collect())
    }

    async fn find_by_provider(&self, provider_id: ProviderId) -> Result<Vec<Reservation>> {
        let records = self.records.lock().await;
        let mut found: Vec<Reservation> = records
            .values()
            .filter(|r| r.provider_id == provider_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}

type ProviderGrid = HashMap<(Weekday, u8), SlotState>;

/// In-memory availability grids, one document per provider. Each mutation
/// evaluates its condition and applies under one lock acquisition, which
/// is exactly the per-document atomic conditional update the real store
/// offers. Absent entries are `Free`.
#[derive(Clone, Default)]
pub struct InMemoryGrid {
    grids: Arc<Mutex<HashMap<ProviderId, ProviderGrid>>>,
}

impl InMemoryGrid {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SlotGrid for InMemoryGrid {
    async fn slot_state(
        &self,
        provider_id: ProviderId,
        day_hour: (Weekday, u8),
    ) -> Result<SlotState> {
        let grids = self.grids.lock().await;
        Ok(grids
            .get(&provider_id)
            .and_then(|grid| grid.get(&day_hour))
            .copied()
            .unwrap_or(SlotState::Free))
    }

    async fn is_free(&self, provider_id: ProviderId, slot: &Slot) -> Result<bool> {
        let grids = self.grids.lock().await;
        let Some(grid) = grids.get(&provider_id) else {
            return Ok(true);
        };
        Ok(slot.hours().all(|hour| {
            matches!(
                grid.get(&(slot.day(), hour)).copied().unwrap_or(SlotState::Free),
                SlotState::Free
            )
        }))
    }

    async fn mark_held(
        &self,
        provider_id: ProviderId,
        slot: &Slot,
        reservation_id: ReservationId,
    ) -> Result<()> {
        let mut grids = self.grids.lock().await;
        let grid = grids.entry(provider_id).or_default();

        // Condition and mutation under one acquisition: all hours free or
        // nothing changes.
        let conflict = slot.hours().any(|hour| {
            !matches!(
                grid.get(&(slot.day(), hour)).copied().unwrap_or(SlotState::Free),
                SlotState::Free
            )
        });
        if conflict {
            return Err(BookingError::SlotConflict);
        }

        for hour in slot.hours() {
            grid.insert((slot.day(), hour), SlotState::Held(reservation_id));
        }
        Ok(())
    }

    async fn mark_booked(
        &self,
        provider_id: ProviderId,
        slot: &Slot,
        reservation_id: ReservationId,
    ) -> Result<()> {
        let mut grids = self.grids.lock().await;
        let grid = grids.entry(provider_id).or_default();

        for hour in slot.hours() {
            let key = (slot.day(), hour);
            match grid.get(&key).copied().unwrap_or(SlotState::Free) {
                SlotState::Held(holder) if holder == reservation_id => {
                    grid.insert(key, SlotState::Booked(reservation_id));
                }
                SlotState::Booked(holder) if holder == reservation_id => {}
                other => {
                    tracing::warn!(
                        "Booking {} expected to hold {} {:02}:00, found {:?}",
                        reservation_id,
                        slot.day(),
                        hour,
                        other
                    );
                }
            }
        }
        Ok(())
    }

    async fn mark_free(
        &self,
        provider_id: ProviderId,
        slot: &Slot,
        expected: ReservationId,
    ) -> Result<ReleaseOutcome> {
        let mut grids = self.grids.lock().await;
        let grid = grids.entry(provider_id).or_default();

        let mut released_any = false;
        let mut stale_holder = None;
        let mut all_free = true;

        for hour in slot.hours() {
            let key = (slot.day(), hour);
            match grid.get(&key).copied().unwrap_or(SlotState::Free) {
                SlotState::Free => {}
                SlotState::Held(holder) if holder == expected => {
                    grid.insert(key, SlotState::Free);
                    released_any = true;
                    all_free = false;
                }
                SlotState::Held(holder) | SlotState::Booked(holder) => {
                    stale_holder = Some(holder);
                    all_free = false;
                }
            }
        }

        if released_any {
            Ok(ReleaseOutcome::Released)
        } else if all_free {
            Ok(ReleaseOutcome::AlreadyFree)
        } else {
            // Safe because stale_holder is set whenever a non-matching
            // occupant was seen and nothing was released.
            Ok(ReleaseOutcome::StaleHolder(stale_holder.unwrap_or(expected)))
        }
    }
}
