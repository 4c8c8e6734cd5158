use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crewdeck_core::repository::StoreError;
use crewdeck_dispatch::DispatchError;
use crewdeck_flights::FlightError;
use crewdeck_pirep::{SubmitError, ValidationError};

/// Failures surfaced to portal clients. Every error body carries the
/// machine-readable `code` and the pipeline `stage` that produced it, so
/// the frontend can route the user back to the right screen.
#[derive(Debug)]
pub enum ApiError {
    Reservation(FlightError),
    Dispatch(DispatchError),
    Pirep(SubmitError),
    Validation(ValidationError),
    BadRequest {
        stage: &'static str,
        message: String,
    },
    Forbidden {
        stage: &'static str,
        message: String,
    },
    NotFound {
        stage: &'static str,
        what: &'static str,
    },
    Conflict {
        stage: &'static str,
        message: String,
    },
    Store {
        stage: &'static str,
        source: StoreError,
    },
    Internal {
        stage: &'static str,
        source: anyhow::Error,
    },
}

impl ApiError {
    pub fn store(stage: &'static str, source: StoreError) -> Self {
        Self::Store { stage, source }
    }

    pub fn not_found(stage: &'static str, what: &'static str) -> Self {
        Self::NotFound { stage, what }
    }

    pub fn internal(stage: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            stage,
            source: source.into(),
        }
    }
}

impl From<FlightError> for ApiError {
    fn from(err: FlightError) -> Self {
        Self::Reservation(err)
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        Self::Dispatch(err)
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        Self::Pirep(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, stage, message) = match self {
            ApiError::Reservation(err) => {
                let (status, code) = match &err {
                    FlightError::NotFound(_) => (StatusCode::NOT_FOUND, "flight_not_found"),
                    FlightError::NotEligible => (StatusCode::FORBIDDEN, "not_eligible"),
                    FlightError::RouteNotFound(_) => (StatusCode::NOT_FOUND, "route_not_found"),
                    FlightError::InvalidTransition { .. } => {
                        (StatusCode::CONFLICT, "invalid_transition")
                    }
                    FlightError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
                };
                (status, code, "reservation", err.to_string())
            }
            ApiError::Dispatch(err) => {
                let (status, code) = match &err {
                    DispatchError::InvalidAircraftCode(_) => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "invalid_aircraft_code")
                    }
                    DispatchError::GenerationTimeout => {
                        (StatusCode::GATEWAY_TIMEOUT, "generation_timeout")
                    }
                    DispatchError::ManualResolutionRequired => {
                        (StatusCode::CONFLICT, "manual_resolution_required")
                    }
                    DispatchError::PlanUnavailable(_) => {
                        (StatusCode::BAD_GATEWAY, "plan_unavailable")
                    }
                };
                (status, code, "dispatch", err.to_string())
            }
            ApiError::Pirep(err) => {
                let (status, code) = match &err {
                    SubmitError::FlightNotFound(_) => (StatusCode::NOT_FOUND, "flight_not_found"),
                    SubmitError::InvalidTransition { .. } => {
                        (StatusCode::CONFLICT, "invalid_transition")
                    }
                    SubmitError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
                };
                (status, code, "pirep", err.to_string())
            }
            ApiError::Validation(err) => {
                let (status, code) = match &err {
                    ValidationError::ReportNotFound(_) => {
                        (StatusCode::NOT_FOUND, "report_not_found")
                    }
                    ValidationError::AlreadyValidated(_) => {
                        (StatusCode::CONFLICT, "already_validated")
                    }
                    ValidationError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
                    ValidationError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
                };
                (status, code, "validation", err.to_string())
            }
            ApiError::BadRequest { stage, message } => {
                (StatusCode::BAD_REQUEST, "bad_request", stage, message)
            }
            ApiError::Forbidden { stage, message } => {
                (StatusCode::FORBIDDEN, "forbidden", stage, message)
            }
            ApiError::NotFound { stage, what } => (
                StatusCode::NOT_FOUND,
                "not_found",
                stage,
                format!("{} not found", what),
            ),
            // Every ambient 409 in this API is a transition guard refusing a
            // request, so they all share the invalid_transition code.
            ApiError::Conflict { stage, message } => {
                (StatusCode::CONFLICT, "invalid_transition", stage, message)
            }
            ApiError::Store { stage, source } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                stage,
                source.to_string(),
            ),
            ApiError::Internal { stage, source } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                stage,
                source.to_string(),
            ),
        };

        let message = if status.is_server_error() {
            tracing::error!("Internal error in {} stage: {}", stage, message);
            "Internal Server Error".to_string()
        } else {
            message
        };

        let body = Json(json!({
            "error": message,
            "code": code,
            "stage": stage,
        }));

        (status, body).into_response()
    }
}
