use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::{headers::Origin, TypedHeader};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crewdeck_core::flight::FlightStatus;
use crewdeck_dispatch::{
    DispatchError, DispatchTicket, FuelUnits, PlanData, PlanLocator, PlanSpec, PushOutcome,
    PushPayload,
};

use crate::auth::AuthPilot;
use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct OpenDispatchRequest {
    /// Free-text aircraft, e.g. "B738" or "Boeing 737-800 Zibo". Falls back
    /// to the reserved fleet aircraft when omitted.
    pub aircraft: Option<String>,
    pub units: Option<FuelUnits>,
    pub cost_index: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub user_handle: String,
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/flights/{id}/dispatch", post(open_dispatch))
        .route("/v1/flights/{id}/plan", get(flight_plan))
        .route("/v1/dispatch/{token}/closed", post(surface_closed))
        .route("/v1/dispatch/{token}/resolve", post(resolve_manual))
        .route("/v1/dispatch/{token}/plan", get(await_plan))
}

/// The provider push callback carries no bearer token; it is gated on the
/// Origin header instead.
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/v1/dispatch/callback", post(provider_callback))
}

// ============================================================================
// Handlers
// ============================================================================

async fn open_dispatch(
    State(state): State<AppState>,
    Extension(AuthPilot(pilot_id)): Extension<AuthPilot>,
    Path(flight_id): Path<Uuid>,
    Json(req): Json<OpenDispatchRequest>,
) -> Result<(StatusCode, Json<DispatchTicket>), ApiError> {
    let flight = state
        .flight_repo
        .get_flight(flight_id)
        .await
        .map_err(|e| ApiError::store("dispatch", e))?
        .ok_or_else(|| ApiError::not_found("dispatch", "flight"))?;

    if !flight.is_owned_by(pilot_id) || flight.status != FlightStatus::Reserved {
        return Err(ApiError::Conflict {
            stage: "dispatch",
            message: format!("flight is {}, not reserved", flight.status),
        });
    }

    let route = state
        .routes
        .route(flight.route_id)
        .await
        .map_err(|e| ApiError::store("dispatch", e))?
        .ok_or_else(|| ApiError::not_found("dispatch", "route"))?;

    let aircraft_code = resolve_aircraft(&state, flight.fleet_id, req.aircraft.as_deref()).await?;

    let spec = PlanSpec {
        origin: route.origin,
        destination: route.destination,
        aircraft_code,
        flight_number: flight.flight_number.clone(),
        units: req.units.unwrap_or(FuelUnits::Kgs),
        cost_index: req.cost_index,
    };

    let ticket = state
        .bridge
        .request_plan(flight_id, pilot_id, &state.portal_origin, spec)?;

    Ok((StatusCode::CREATED, Json(ticket)))
}

/// The aircraft sent to the provider: explicit free text wins, otherwise the
/// fleet assignment's type code. Both go through the type table so a pilot
/// can type "737-800 zibo" and still dispatch a B738.
async fn resolve_aircraft(
    state: &AppState,
    fleet_id: Option<Uuid>,
    requested: Option<&str>,
) -> Result<String, ApiError> {
    let text = match requested.map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => text.to_string(),
        None => {
            let fleet_id = fleet_id.ok_or_else(|| ApiError::BadRequest {
                stage: "dispatch",
                message: "no aircraft given and the flight has no fleet assignment".to_string(),
            })?;
            state
                .fleet
                .aircraft(fleet_id)
                .await
                .map_err(|e| ApiError::store("dispatch", e))?
                .ok_or_else(|| ApiError::not_found("dispatch", "fleet aircraft"))?
                .type_code
        }
    };

    match state.aircraft_types.resolve(&text).code() {
        Some(code) => Ok(code.to_string()),
        None => Err(DispatchError::InvalidAircraftCode(text).into()),
    }
}

async fn provider_callback(
    State(state): State<AppState>,
    origin: Option<TypedHeader<Origin>>,
    Json(payload): Json<PushPayload>,
) -> Json<serde_json::Value> {
    let origin = origin
        .map(|TypedHeader(o)| o.to_string())
        .unwrap_or_default();
    let outcome = state.bridge.deliver_push(&origin, &payload);

    // Always 200: the provider retries on failure and there is nothing it
    // could do differently with a rejection.
    Json(json!({
        "outcome": match outcome {
            PushOutcome::Resolved => "resolved",
            PushOutcome::Ignored => "ignored",
        }
    }))
}

/// Dispatch tokens travel through the provider's pages, so possession of
/// the string proves nothing. Only the pilot who opened one may drive its
/// resolution; unknown or expired tokens fall through to the bridge's own
/// timeout handling.
fn require_token_owner(state: &AppState, token: &str, pilot_id: Uuid) -> Result<(), ApiError> {
    match state.bridge.pilot_for(token) {
        Some(owner) if owner != pilot_id => Err(ApiError::Forbidden {
            stage: "dispatch",
            message: "dispatch token belongs to another pilot".to_string(),
        }),
        _ => Ok(()),
    }
}

async fn surface_closed(
    State(state): State<AppState>,
    Extension(AuthPilot(pilot_id)): Extension<AuthPilot>,
    Path(token): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_token_owner(&state, &token, pilot_id)?;
    state.bridge.surface_closed(&token)?;
    Ok(StatusCode::ACCEPTED)
}

async fn resolve_manual(
    State(state): State<AppState>,
    Extension(AuthPilot(pilot_id)): Extension<AuthPilot>,
    Path(token): Path<String>,
    Json(req): Json<ResolveRequest>,
) -> Result<StatusCode, ApiError> {
    require_token_owner(&state, &token, pilot_id)?;
    state.bridge.resolve_manual(&token, &req.user_handle)?;
    Ok(StatusCode::ACCEPTED)
}

/// Long-poll for the plan behind a dispatch token. Blocks until the token
/// resolves one way or the other, fetches the plan, and records the winning
/// plan id on the flight.
async fn await_plan(
    State(state): State<AppState>,
    Extension(AuthPilot(pilot_id)): Extension<AuthPilot>,
    Path(token): Path<String>,
) -> Result<Json<PlanData>, ApiError> {
    require_token_owner(&state, &token, pilot_id)?;

    // Capture the flight binding before awaiting; the entry is gone once the
    // expiry watchdog fires.
    let flight_id = state.bridge.flight_for(&token);

    let locator = state.bridge.await_resolution(&token).await?;
    let plan = state.bridge.fetch_plan(&locator).await?;

    if let Some(flight_id) = flight_id {
        let stored = state
            .flight_repo
            .set_plan_id(flight_id, &plan.plan_id)
            .await
            .map_err(|e| ApiError::store("dispatch", e))?;

        // First writer wins. If a concurrent resolution already recorded a
        // different plan, serve that one so every caller sees the same plan.
        if let Some(stored_id) = stored {
            if stored_id != plan.plan_id {
                let plan = state.bridge.fetch_plan(&PlanLocator::Id(stored_id)).await?;
                return Ok(Json(plan));
            }
        }
    }

    Ok(Json(plan))
}

/// Re-fetch the plan recorded for a flight. Idempotent; used when the pilot
/// returns to the briefing page after dispatch.
async fn flight_plan(
    State(state): State<AppState>,
    Extension(AuthPilot(pilot_id)): Extension<AuthPilot>,
    Path(flight_id): Path<Uuid>,
) -> Result<Json<PlanData>, ApiError> {
    let flight = state
        .flight_repo
        .get_flight(flight_id)
        .await
        .map_err(|e| ApiError::store("dispatch", e))?
        .filter(|f| f.is_owned_by(pilot_id))
        .ok_or_else(|| ApiError::not_found("dispatch", "flight"))?;

    let plan_id = flight.plan_id.ok_or_else(|| {
        ApiError::Dispatch(DispatchError::PlanUnavailable(
            "no plan recorded for this flight".to_string(),
        ))
    })?;

    let plan = state.bridge.fetch_plan(&PlanLocator::Id(plan_id)).await?;
    Ok(Json(plan))
}
