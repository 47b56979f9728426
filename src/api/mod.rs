pub mod auth;
pub mod handlers;

use crate::core::Coordinator;
use crate::domain::ports::{PaymentGateway, ReservationStore, SlotGrid};
use crate::utils::error::BookingError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;

/// HTTP surface for the four lifecycle operations. The sweeper is the
/// only caller of expire, so it has no route.
pub fn build_router<G, S, P>(coordinator: Arc<Coordinator<G, S, P>>) -> Router
where
    G: SlotGrid + Send + Sync + 'static,
    S: ReservationStore + Send + Sync + 'static,
    P: PaymentGateway + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(handlers::health))
        .route("/reservations", post(handlers::create_reservation))
        .route("/reservations/:id", get(handlers::get_reservation))
        .route("/reservations/:id/approve", post(handlers::approve_reservation))
        .route("/reservations/:id/decline", post(handlers::decline_reservation))
        .route("/reservations/:id/clear", post(handlers::clear_reservation))
        .route(
            "/providers/:id/reservations",
            get(handlers::list_provider_reservations),
        )
        .with_state(coordinator)
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    pub retryable: bool,
    pub suggestion: &'static str,
}

/// Response wrapper that maps the error taxonomy onto statuses without
/// leaking internal state.
pub struct ApiError(pub BookingError);

impl From<BookingError> for ApiError {
    fn from(e: BookingError) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match &self.0 {
            BookingError::InvalidSlot { .. } => "invalid_slot",
            BookingError::SlotUnavailable | BookingError::SlotConflict => "slot_unavailable",
            BookingError::PaymentDeclined { .. } => "payment_declined",
            BookingError::GatewayUnavailable { .. } | BookingError::HttpError(_) => {
                "gateway_unavailable"
            }
            BookingError::Forbidden { .. } => "forbidden",
            BookingError::InvalidState { .. } => "invalid_state",
            BookingError::NotFound { .. } => "not_found",
            _ => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match &self.0 {
            BookingError::InvalidSlot { .. } => StatusCode::BAD_REQUEST,
            BookingError::SlotUnavailable | BookingError::SlotConflict => StatusCode::CONFLICT,
            BookingError::PaymentDeclined { .. } => StatusCode::PAYMENT_REQUIRED,
            BookingError::GatewayUnavailable { .. } | BookingError::HttpError(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            BookingError::Forbidden { .. } => StatusCode::FORBIDDEN,
            BookingError::InvalidState { .. } => StatusCode::CONFLICT,
            BookingError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }
        let body = ErrorBody {
            error: self.kind(),
            message: self.0.user_friendly_message(),
            retryable: self.0.is_retryable(),
            suggestion: self.0.recovery_suggestion(),
        };
        (status, Json(body)).into_response()
    }
}
