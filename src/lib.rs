pub mod adapters;
pub mod api;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{
    HttpPaymentGateway, InMemoryGrid, InMemoryReservationStore, LogNotifier, SandboxGateway,
    WebhookNotifier,
};
pub use config::ServerConfig;
pub use core::{Coordinator, ExpirySweeper, RetryPolicy};
pub use domain::model::{
    ClientId, HoldId, Money, ProviderId, Reservation, ReservationId, ReservationStatus, SlotState,
};
pub use domain::slot::{Slot, Weekday};
pub use utils::error::{BookingError, Result};
