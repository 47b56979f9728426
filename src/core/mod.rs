pub mod coordinator;
pub mod retry;
pub mod sweeper;

pub use crate::domain::model::{Reservation, ReservationStatus};
pub use crate::domain::ports::{Notifier, PaymentGateway, ReservationStore, SlotGrid};
pub use crate::utils::error::Result;
pub use coordinator::Coordinator;
pub use retry::RetryPolicy;
pub use sweeper::ExpirySweeper;
