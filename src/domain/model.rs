use crate::domain::slot::Slot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationId(Uuid);

impl ReservationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ReservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderId(Uuid);

impl ProviderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ProviderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Gateway-issued reference to an authorized payment hold. Opaque to us.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HoldId(String);

impl HoldId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HoldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Amount in minor units (pence, cents) with an ISO currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub minor_units: u64,
    pub currency: String,
}

impl Money {
    pub fn new(minor_units: u64, currency: impl Into<String>) -> Self {
        Self {
            minor_units,
            currency: currency.into(),
        }
    }

    pub fn gbp(minor_units: u64) -> Self {
        Self::new(minor_units, "GBP")
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02} {}",
            self.minor_units / 100,
            self.minor_units % 100,
            self.currency
        )
    }
}

/// Canonical status vocabulary. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Approved,
    Declined,
    Cleared,
    Expired,
}

impl ReservationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Declined => "declined",
            Self::Cleared => "cleared",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The persisted booking record. Client and provider are referenced by id
/// only; this record never owns either aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub client_id: ClientId,
    pub provider_id: ProviderId,
    pub slot: Slot,
    pub amount: Money,
    pub hold_id: HoldId,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn pending(
        client_id: ClientId,
        provider_id: ProviderId,
        slot: Slot,
        amount: Money,
        hold_id: HoldId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ReservationId::new(),
            client_id,
            provider_id,
            slot,
            amount,
            hold_id,
            status: ReservationStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// State of one grid hour. Slots are toggled, never created or destroyed;
/// anything absent from the grid is `Free`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "reservation_id")]
pub enum SlotState {
    Free,
    /// Transient lock while the referenced reservation is pending.
    Held(ReservationId),
    /// Confirmed booking; never reverts to free through the release path.
    Booked(ReservationId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::slot::Weekday;

    #[test]
    fn test_terminal_statuses() {
        assert!(!ReservationStatus::Pending.is_terminal());
        for status in [
            ReservationStatus::Approved,
            ReservationStatus::Declined,
            ReservationStatus::Cleared,
            ReservationStatus::Expired,
        ] {
            assert!(status.is_terminal());
        }
    }

    #[test]
    fn test_new_reservation_is_pending() {
        let slot = Slot::single(Weekday::Tuesday, 10).unwrap();
        let r = Reservation::pending(
            ClientId::new(),
            ProviderId::new(),
            slot,
            Money::gbp(2000),
            HoldId::new("hold_1"),
        );
        assert_eq!(r.status, ReservationStatus::Pending);
        assert_eq!(r.created_at, r.updated_at);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::gbp(2000).to_string(), "20.00 GBP");
        assert_eq!(Money::gbp(2005).to_string(), "20.05 GBP");
    }
}
