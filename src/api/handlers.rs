use crate::api::auth::{Principal, Role};
use crate::api::ApiError;
use crate::core::Coordinator;
use crate::domain::model::{
    ClientId, Money, ProviderId, Reservation, ReservationId, ReservationStatus,
};
use crate::domain::ports::{PaymentGateway, ReservationStore, SlotGrid};
use crate::domain::slot::{Slot, Weekday};
use crate::utils::error::BookingError;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    pub provider_id: Uuid,
    pub day: String,
    pub hour: u8,
    #[serde(default = "default_span")]
    pub span_hours: u8,
    pub amount_minor: u64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_span() -> u8 {
    1
}

fn default_currency() -> String {
    "GBP".to_string()
}

/// Outward shape of a reservation. The gateway hold reference stays
/// internal.
#[derive(Debug, Serialize)]
pub struct ReservationView {
    pub id: Uuid,
    pub client_id: Uuid,
    pub provider_id: Uuid,
    pub day: String,
    pub hour: u8,
    pub span_hours: u8,
    pub amount_minor: u64,
    pub currency: String,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationView {
    fn from(r: Reservation) -> Self {
        Self {
            id: *r.id.as_uuid(),
            client_id: *r.client_id.as_uuid(),
            provider_id: *r.provider_id.as_uuid(),
            day: r.slot.day().to_string(),
            hour: r.slot.hour(),
            span_hours: r.slot.span_hours(),
            amount_minor: r.amount.minor_units,
            currency: r.amount.currency.clone(),
            status: r.status,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

fn require_role(principal: &Principal, role: Role) -> Result<(), ApiError> {
    if principal.role == role {
        Ok(())
    } else {
        Err(ApiError(BookingError::Forbidden {
            reason: format!("This action requires the {:?} role", role),
        }))
    }
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn create_reservation<G, S, P>(
    State(coordinator): State<Arc<Coordinator<G, S, P>>>,
    principal: Principal,
    Json(body): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ReservationView>), ApiError>
where
    G: SlotGrid,
    S: ReservationStore,
    P: PaymentGateway,
{
    require_role(&principal, Role::Client)?;

    let day = Weekday::parse(&body.day)?;
    let slot = Slot::new(day, body.hour, body.span_hours)?;
    let amount = Money::new(body.amount_minor, body.currency);

    let reservation = coordinator
        .create(
            ClientId::from_uuid(principal.id),
            ProviderId::from_uuid(body.provider_id),
            slot,
            amount,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(reservation.into())))
}

pub async fn get_reservation<G, S, P>(
    State(coordinator): State<Arc<Coordinator<G, S, P>>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationView>, ApiError>
where
    G: SlotGrid,
    S: ReservationStore,
    P: PaymentGateway,
{
    let reservation = coordinator.reservation(ReservationId::from_uuid(id)).await?;

    let allowed = match principal.role {
        Role::Admin => true,
        Role::Client => reservation.client_id == ClientId::from_uuid(principal.id),
        Role::Provider => reservation.provider_id == ProviderId::from_uuid(principal.id),
    };
    if !allowed {
        return Err(ApiError(BookingError::Forbidden {
            reason: "Reservation belongs to someone else".to_string(),
        }));
    }

    Ok(Json(reservation.into()))
}

pub async fn approve_reservation<G, S, P>(
    State(coordinator): State<Arc<Coordinator<G, S, P>>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationView>, ApiError>
where
    G: SlotGrid,
    S: ReservationStore,
    P: PaymentGateway,
{
    require_role(&principal, Role::Provider)?;
    let reservation = coordinator
        .approve(
            ReservationId::from_uuid(id),
            ProviderId::from_uuid(principal.id),
        )
        .await?;
    Ok(Json(reservation.into()))
}

pub async fn decline_reservation<G, S, P>(
    State(coordinator): State<Arc<Coordinator<G, S, P>>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationView>, ApiError>
where
    G: SlotGrid,
    S: ReservationStore,
    P: PaymentGateway,
{
    require_role(&principal, Role::Provider)?;
    let reservation = coordinator
        .decline(
            ReservationId::from_uuid(id),
            ProviderId::from_uuid(principal.id),
        )
        .await?;
    Ok(Json(reservation.into()))
}

pub async fn clear_reservation<G, S, P>(
    State(coordinator): State<Arc<Coordinator<G, S, P>>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationView>, ApiError>
where
    G: SlotGrid,
    S: ReservationStore,
    P: PaymentGateway,
{
    require_role(&principal, Role::Client)?;
    let reservation = coordinator
        .clear(
            ReservationId::from_uuid(id),
            ClientId::from_uuid(principal.id),
        )
        .await?;
    Ok(Json(reservation.into()))
}

pub async fn list_provider_reservations<G, S, P>(
    State(coordinator): State<Arc<Coordinator<G, S, P>>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ReservationView>>, ApiError>
where
    G: SlotGrid,
    S: ReservationStore,
    P: PaymentGateway,
{
    let allowed = match principal.role {
        Role::Admin => true,
        Role::Provider => principal.id == id,
        Role::Client => false,
    };
    if !allowed {
        return Err(ApiError(BookingError::Forbidden {
            reason: "Only the provider themselves or an admin may list these".to_string(),
        }));
    }

    let reservations = coordinator
        .provider_reservations(ProviderId::from_uuid(id))
        .await?;
    Ok(Json(reservations.into_iter().map(Into::into).collect()))
}
