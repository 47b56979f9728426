use crate::domain::model::{HoldId, Money};
use crate::domain::ports::{HoldMetadata, HoldStatus, PaymentGateway};
use crate::utils::error::{BookingError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Serialize)]
struct AuthorizeRequest {
    amount_minor: u64,
    currency: String,
    client_id: String,
    provider_id: String,
    slot: String,
}

#[derive(Debug, Deserialize)]
struct AuthorizeResponse {
    hold_id: String,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct HoldStatusResponse {
    status: HoldStatus,
}

/// Adapter for a card-holding gateway spoken to over JSON/HTTP.
///
/// Transport failures and 5xx responses surface as `GatewayUnavailable`
/// so the coordinator's backoff can retry them; 402 means the card was
/// declined and 404 means the hold is already resolved on the gateway.
pub struct HttpPaymentGateway {
    client: Client,
    base_url: String,
}

impl HttpPaymentGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn unavailable(reason: impl std::fmt::Display) -> BookingError {
        BookingError::GatewayUnavailable {
            reason: reason.to_string(),
        }
    }

    async fn decode_decline(response: reqwest::Response) -> BookingError {
        let reason = match response.json::<GatewayErrorBody>().await {
            Ok(body) if !body.message.is_empty() => body.message,
            _ => "declined by gateway".to_string(),
        };
        BookingError::PaymentDeclined { reason }
    }

    /// Shared handling for capture/cancel style commands on a hold.
    async fn post_hold_command(&self, hold_id: &HoldId, command: &str) -> Result<()> {
        let url = self.url(&format!("/holds/{}/{}", hold_id, command));
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(Self::unavailable)?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(BookingError::HoldNotFound {
                hold_id: hold_id.to_string(),
            }),
            status if status.is_server_error() => {
                Err(Self::unavailable(format!("{} returned {}", command, status)))
            }
            status => Err(BookingError::StorageError {
                message: format!("Unexpected gateway response {} for {}", status, command),
            }),
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn authorize(&self, amount: &Money, metadata: &HoldMetadata) -> Result<HoldId> {
        let url = self.url("/holds");
        let body = AuthorizeRequest {
            amount_minor: amount.minor_units,
            currency: amount.currency.clone(),
            client_id: metadata.client_id.to_string(),
            provider_id: metadata.provider_id.to_string(),
            slot: metadata.slot.to_string(),
        };

        tracing::debug!("POST {} ({})", url, amount);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(Self::unavailable)?;

        match response.status() {
            status if status.is_success() => {
                let parsed: AuthorizeResponse =
                    response.json().await.map_err(Self::unavailable)?;
                Ok(HoldId::new(parsed.hold_id))
            }
            StatusCode::PAYMENT_REQUIRED | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(Self::decode_decline(response).await)
            }
            status if status.is_server_error() => {
                Err(Self::unavailable(format!("authorize returned {}", status)))
            }
            status => Err(BookingError::StorageError {
                message: format!("Unexpected gateway response {} for authorize", status),
            }),
        }
    }

    async fn capture(&self, hold_id: &HoldId) -> Result<()> {
        self.post_hold_command(hold_id, "capture").await
    }

    async fn cancel(&self, hold_id: &HoldId) -> Result<()> {
        self.post_hold_command(hold_id, "cancel").await
    }

    async fn hold_status(&self, hold_id: &HoldId) -> Result<HoldStatus> {
        let url = self.url(&format!("/holds/{}", hold_id));
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Self::unavailable)?;

        match response.status() {
            status if status.is_success() => {
                let parsed: HoldStatusResponse =
                    response.json().await.map_err(Self::unavailable)?;
                Ok(parsed.status)
            }
            StatusCode::NOT_FOUND => Err(BookingError::HoldNotFound {
                hold_id: hold_id.to_string(),
            }),
            status if status.is_server_error() => {
                Err(Self::unavailable(format!("hold lookup returned {}", status)))
            }
            status => Err(BookingError::StorageError {
                message: format!("Unexpected gateway response {} for hold lookup", status),
            }),
        }
    }
}

/// In-process gateway with scriptable outcomes, used in development and in
/// tests that exercise the coordinator without a network.
///
/// Holds live in a map so tests can assert the invariant that matters:
/// after any sequence of operations, no authorized hold is left
/// outstanding for a reservation that is not pending.
#[derive(Clone, Default)]
pub struct SandboxGateway {
    holds: Arc<Mutex<HashMap<String, HoldStatus>>>,
    decline_next: Arc<AtomicBool>,
    authorize_outages: Arc<AtomicU32>,
    capture_outages: Arc<AtomicU32>,
    cancel_outages: Arc<AtomicU32>,
}

impl SandboxGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next authorize is declined.
    pub fn decline_next_authorize(&self) {
        self.decline_next.store(true, Ordering::SeqCst);
    }

    /// Next `n` authorize calls fail as unavailable.
    pub fn fail_authorize_times(&self, n: u32) {
        self.authorize_outages.store(n, Ordering::SeqCst);
    }

    /// Next `n` capture calls fail as unavailable.
    pub fn fail_capture_times(&self, n: u32) {
        self.capture_outages.store(n, Ordering::SeqCst);
    }

    /// Next `n` cancel calls fail as unavailable.
    pub fn fail_cancel_times(&self, n: u32) {
        self.cancel_outages.store(n, Ordering::SeqCst);
    }

    pub async fn hold_state(&self, hold_id: &HoldId) -> Option<HoldStatus> {
        self.holds.lock().await.get(hold_id.as_str()).copied()
    }

    /// Holds still authorized and not yet captured or cancelled.
    pub async fn outstanding_holds(&self) -> usize {
        self.holds
            .lock()
            .await
            .values()
            .filter(|state| **state == HoldStatus::Authorized)
            .count()
    }

    fn take_outage(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn authorize(&self, amount: &Money, metadata: &HoldMetadata) -> Result<HoldId> {
        if Self::take_outage(&self.authorize_outages) {
            return Err(BookingError::GatewayUnavailable {
                reason: "sandbox outage".to_string(),
            });
        }
        if self.decline_next.swap(false, Ordering::SeqCst) {
            return Err(BookingError::PaymentDeclined {
                reason: "sandbox decline".to_string(),
            });
        }

        let hold_id = format!("sb_{}", Uuid::new_v4());
        self.holds
            .lock()
            .await
            .insert(hold_id.clone(), HoldStatus::Authorized);
        tracing::debug!(
            "Sandbox hold {} authorized for {} (provider {})",
            hold_id,
            amount,
            metadata.provider_id
        );
        Ok(HoldId::new(hold_id))
    }

    async fn capture(&self, hold_id: &HoldId) -> Result<()> {
        if Self::take_outage(&self.capture_outages) {
            return Err(BookingError::GatewayUnavailable {
                reason: "sandbox outage".to_string(),
            });
        }

        let mut holds = self.holds.lock().await;
        match holds.get(hold_id.as_str()).copied() {
            Some(HoldStatus::Authorized) | Some(HoldStatus::Captured) => {
                // Capturing a captured hold is idempotent.
                holds.insert(hold_id.as_str().to_string(), HoldStatus::Captured);
                Ok(())
            }
            Some(HoldStatus::Cancelled) | None => Err(BookingError::HoldNotFound {
                hold_id: hold_id.to_string(),
            }),
        }
    }

    async fn cancel(&self, hold_id: &HoldId) -> Result<()> {
        if Self::take_outage(&self.cancel_outages) {
            return Err(BookingError::GatewayUnavailable {
                reason: "sandbox outage".to_string(),
            });
        }

        let mut holds = self.holds.lock().await;
        match holds.get(hold_id.as_str()).copied() {
            // Cancel tolerates repeats and already-resolved holds.
            Some(HoldStatus::Authorized) | Some(HoldStatus::Cancelled) => {
                holds.insert(hold_id.as_str().to_string(), HoldStatus::Cancelled);
                Ok(())
            }
            Some(HoldStatus::Captured) => Ok(()),
            None => Err(BookingError::HoldNotFound {
                hold_id: hold_id.to_string(),
            }),
        }
    }

    async fn hold_status(&self, hold_id: &HoldId) -> Result<HoldStatus> {
        self.holds
            .lock()
            .await
            .get(hold_id.as_str())
            .copied()
            .ok_or(BookingError::HoldNotFound {
                hold_id: hold_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ClientId, ProviderId};
    use crate::domain::slot::{Slot, Weekday};

    fn metadata() -> HoldMetadata {
        HoldMetadata {
            client_id: ClientId::new(),
            provider_id: ProviderId::new(),
            slot: Slot::single(Weekday::Tuesday, 10).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_sandbox_hold_lifecycle() {
        let gateway = SandboxGateway::new();
        let hold = gateway
            .authorize(&Money::gbp(2000), &metadata())
            .await
            .unwrap();

        assert_eq!(gateway.outstanding_holds().await, 1);
        gateway.capture(&hold).await.unwrap();
        assert_eq!(gateway.outstanding_holds().await, 0);

        // Idempotent capture, tolerated cancel-after-capture.
        gateway.capture(&hold).await.unwrap();
        gateway.cancel(&hold).await.unwrap();
        assert_eq!(
            gateway.hold_state(&hold).await,
            Some(HoldStatus::Captured)
        );
    }

    #[tokio::test]
    async fn test_sandbox_cancel_is_idempotent() {
        let gateway = SandboxGateway::new();
        let hold = gateway
            .authorize(&Money::gbp(1500), &metadata())
            .await
            .unwrap();

        gateway.cancel(&hold).await.unwrap();
        gateway.cancel(&hold).await.unwrap();
        assert_eq!(
            gateway.hold_state(&hold).await,
            Some(HoldStatus::Cancelled)
        );

        // Cancelled holds cannot be captured any more.
        let err = gateway.capture(&hold).await.unwrap_err();
        assert!(matches!(err, BookingError::HoldNotFound { .. }));
    }

    #[tokio::test]
    async fn test_sandbox_scripted_failures() {
        let gateway = SandboxGateway::new();

        gateway.decline_next_authorize();
        let err = gateway
            .authorize(&Money::gbp(2000), &metadata())
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::PaymentDeclined { .. }));

        gateway.fail_authorize_times(1);
        let err = gateway
            .authorize(&Money::gbp(2000), &metadata())
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::GatewayUnavailable { .. }));

        // Outage consumed, next authorize succeeds.
        assert!(gateway.authorize(&Money::gbp(2000), &metadata()).await.is_ok());
    }
}
