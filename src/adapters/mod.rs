// Adapters layer: concrete implementations of the domain ports (storage,
// payment gateway, notifications).

pub mod gateway;
pub mod memory;
pub mod notifier;

pub use gateway::{HttpPaymentGateway, SandboxGateway};
pub use memory::{InMemoryGrid, InMemoryReservationStore};
pub use notifier::{LogNotifier, WebhookNotifier};
