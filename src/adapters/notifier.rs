use crate::domain::model::Reservation;
use crate::domain::ports::Notifier;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ReservationNotification<'a> {
    reservation_id: String,
    client_id: String,
    provider_id: String,
    status: &'a str,
    slot: String,
}

/// Posts reservation outcomes to the email dispatch service. The
/// coordinator fires these without awaiting the result, so a dead
/// endpoint can never hold up a transition.
pub struct WebhookNotifier {
    client: Client,
    endpoint: String,
}

impl WebhookNotifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn reservation_resolved(&self, reservation: &Reservation) -> Result<()> {
        let body = ReservationNotification {
            reservation_id: reservation.id.to_string(),
            client_id: reservation.client_id.to_string(),
            provider_id: reservation.provider_id.to_string(),
            status: reservation.status.as_str(),
            slot: reservation.slot.to_string(),
        };

        self.client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        tracing::debug!(
            "Notified {} outcome for reservation {}",
            reservation.status,
            reservation.id
        );
        Ok(())
    }
}

/// Notifier that only logs. Default when no endpoint is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn reservation_resolved(&self, reservation: &Reservation) -> Result<()> {
        tracing::info!(
            "Reservation {} resolved as {} ({})",
            reservation.id,
            reservation.status,
            reservation.slot
        );
        Ok(())
    }
}
