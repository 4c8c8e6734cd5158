use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    routing::post,
    Json, Router,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PilotClaims {
    pub sub: Uuid,
    pub exp: usize,
}

/// Authenticated pilot identity, injected into request extensions by the
/// middleware. Role checks happen per virtual airline in the handlers, not
/// here: a token only proves who is calling.
#[derive(Debug, Clone, Copy)]
pub struct AuthPilot(pub Uuid);

// ============================================================================
// Pilot Authentication Middleware
// ============================================================================

pub async fn pilot_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // 1. Extract token from Authorization header
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // 2. Decode and validate JWT
    let token_data = decode::<PilotClaims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| StatusCode::UNAUTHORIZED)?;

    // 3. Inject pilot identity into request extensions
    req.extensions_mut().insert(AuthPilot(token_data.claims.sub));

    Ok(next.run(req).await)
}

// ============================================================================
// Dev Token Mint
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/auth/token", post(mint_dev_token))
}

#[derive(Debug, Deserialize)]
struct DevTokenRequest {
    pilot_id: Uuid,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
}

/// Mints a bearer token for a pilot id without any identity check. Only
/// answers when `auth.allow_dev_tokens` is set; production configs leave it
/// off and the route reports not found.
async fn mint_dev_token(
    State(state): State<AppState>,
    Json(req): Json<DevTokenRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if !state.auth.allow_dev_tokens {
        return Err(ApiError::not_found("auth", "route"));
    }

    let claims = PilotClaims {
        sub: req.pilot_id,
        exp: (Utc::now() + Duration::seconds(state.auth.expiration as i64)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.auth.secret.as_bytes()),
    )
    .map_err(|e| ApiError::internal("auth", e))?;

    Ok(Json(AuthResponse { token }))
}
