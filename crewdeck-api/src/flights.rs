use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crewdeck_core::events::OpsEvent;
use crewdeck_core::flight::{Flight, FlightStatus};

use crate::auth::AuthPilot;
use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ReserveFlightRequest {
    pub va_id: Uuid,
    pub route_id: Uuid,
    pub fleet_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ListFlightsQuery {
    pub va_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct PositionReportRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_ft: f64,
    pub ground_speed_kt: f64,
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/flights", post(reserve_flight).get(list_flights))
        .route("/v1/flights/{id}", get(get_flight))
        .route("/v1/flights/{id}/start", post(start_flight))
        .route("/v1/flights/{id}/cancel", post(cancel_flight))
        .route("/v1/flights/{id}/position", post(report_position))
}

// ============================================================================
// Handlers
// ============================================================================

async fn reserve_flight(
    State(state): State<AppState>,
    Extension(AuthPilot(pilot_id)): Extension<AuthPilot>,
    Json(req): Json<ReserveFlightRequest>,
) -> Result<(StatusCode, Json<Flight>), ApiError> {
    let flight = state
        .flights
        .reserve(pilot_id, req.va_id, req.route_id, req.fleet_id)
        .await?;

    let _ = state.events_tx.send(OpsEvent::FlightReserved {
        va_id: flight.va_id,
        flight_id: flight.id,
        pilot_id,
        flight_number: flight.flight_number.clone(),
        at: flight.reserved_at,
    });

    Ok((StatusCode::CREATED, Json(flight)))
}

async fn list_flights(
    State(state): State<AppState>,
    Extension(AuthPilot(pilot_id)): Extension<AuthPilot>,
    Query(query): Query<ListFlightsQuery>,
) -> Result<Json<Vec<Flight>>, ApiError> {
    let flights = state
        .flight_repo
        .list_for_pilot(pilot_id, query.va_id)
        .await
        .map_err(|e| ApiError::store("reservation", e))?;

    Ok(Json(flights))
}

async fn get_flight(
    State(state): State<AppState>,
    Extension(AuthPilot(pilot_id)): Extension<AuthPilot>,
    Path(flight_id): Path<Uuid>,
) -> Result<Json<Flight>, ApiError> {
    let flight = state
        .flight_repo
        .get_flight(flight_id)
        .await
        .map_err(|e| ApiError::store("reservation", e))?
        .filter(|f| f.is_owned_by(pilot_id))
        .ok_or_else(|| ApiError::not_found("reservation", "flight"))?;

    Ok(Json(flight))
}

async fn start_flight(
    State(state): State<AppState>,
    Extension(AuthPilot(pilot_id)): Extension<AuthPilot>,
    Path(flight_id): Path<Uuid>,
) -> Result<Json<Flight>, ApiError> {
    let flight = state.flights.start(flight_id, pilot_id).await?;

    let _ = state.events_tx.send(OpsEvent::FlightStarted {
        va_id: flight.va_id,
        flight_id: flight.id,
        pilot_id,
        flight_number: flight.flight_number.clone(),
        at: flight.departure_time.unwrap_or_else(Utc::now),
    });

    Ok(Json(flight))
}

async fn cancel_flight(
    State(state): State<AppState>,
    Extension(AuthPilot(pilot_id)): Extension<AuthPilot>,
    Path(flight_id): Path<Uuid>,
) -> Result<Json<Flight>, ApiError> {
    let flight = state.flights.cancel(flight_id, pilot_id).await?;

    let _ = state.events_tx.send(OpsEvent::FlightCancelled {
        va_id: flight.va_id,
        flight_id: flight.id,
        pilot_id,
        at: flight.cancelled_at.unwrap_or_else(Utc::now),
    });

    Ok(Json(flight))
}

/// Relays a live position fix onto the airline's event stream. Accepted only
/// while the flight is in progress; nothing is persisted.
async fn report_position(
    State(state): State<AppState>,
    Extension(AuthPilot(pilot_id)): Extension<AuthPilot>,
    Path(flight_id): Path<Uuid>,
    Json(req): Json<PositionReportRequest>,
) -> Result<StatusCode, ApiError> {
    let flight = state
        .flight_repo
        .get_flight(flight_id)
        .await
        .map_err(|e| ApiError::store("reservation", e))?
        .ok_or_else(|| ApiError::not_found("reservation", "flight"))?;

    if !flight.is_owned_by(pilot_id) || flight.status != FlightStatus::InProgress {
        return Err(ApiError::Conflict {
            stage: "reservation",
            message: format!("flight is {}, not in_progress", flight.status),
        });
    }

    let _ = state.events_tx.send(OpsEvent::PositionReport {
        va_id: flight.va_id,
        flight_id,
        pilot_id,
        latitude: req.latitude,
        longitude: req.longitude,
        altitude_ft: req.altitude_ft,
        ground_speed_kt: req.ground_speed_kt,
        at: Utc::now(),
    });

    Ok(StatusCode::ACCEPTED)
}
