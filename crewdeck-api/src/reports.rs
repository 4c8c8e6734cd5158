use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crewdeck_core::events::OpsEvent;
use crewdeck_core::report::{FlightReport, ReportSubmission, ValidationStatus};
use crewdeck_core::telemetry::TelemetrySummary;
use crewdeck_pirep::Verdict;

use crate::auth::AuthPilot;
use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ReportsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub verdict: Verdict,
    pub admin_notes: Option<String>,
    /// Staff may override the suggested score; omitted means "use it as-is".
    pub points_override: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    #[serde(flatten)]
    pub report: FlightReport,
    pub telemetry_summary: TelemetrySummary,
}

impl From<FlightReport> for ReportResponse {
    fn from(report: FlightReport) -> Self {
        let telemetry_summary = TelemetrySummary::from_samples(&report.telemetry);
        Self {
            report,
            telemetry_summary,
        }
    }
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/flights/{id}/report", post(submit_report))
        .route("/v1/reports/{id}", get(get_report))
        .route("/v1/reports/{id}/validate", post(validate_report))
        .route("/v1/vas/{va_id}/reports", get(list_va_reports))
}

// ============================================================================
// Handlers
// ============================================================================

async fn submit_report(
    State(state): State<AppState>,
    Extension(AuthPilot(pilot_id)): Extension<AuthPilot>,
    Path(flight_id): Path<Uuid>,
    Json(submission): Json<ReportSubmission>,
) -> Result<(StatusCode, Json<ReportResponse>), ApiError> {
    let report = state.assembler.submit(flight_id, pilot_id, submission).await?;

    let _ = state.events_tx.send(OpsEvent::ReportFiled {
        va_id: report.va_id,
        flight_id: report.flight_id,
        report_id: report.id,
        pilot_id,
        flight_number: report.flight_number.clone(),
        at: report.submitted_at,
    });

    Ok((StatusCode::CREATED, Json(report.into())))
}

async fn get_report(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
) -> Result<Json<ReportResponse>, ApiError> {
    let report = state
        .report_repo
        .get_report(report_id)
        .await
        .map_err(|e| ApiError::store("pirep", e))?
        .ok_or_else(|| ApiError::not_found("pirep", "report"))?;

    Ok(Json(report.into()))
}

/// Staff view of an airline's report queue, newest first. Requires an active
/// owner or admin membership in that airline.
async fn list_va_reports(
    State(state): State<AppState>,
    Extension(AuthPilot(pilot_id)): Extension<AuthPilot>,
    Path(va_id): Path<Uuid>,
    Query(query): Query<ReportsQuery>,
) -> Result<Json<Vec<FlightReport>>, ApiError> {
    require_staff(&state, pilot_id, va_id).await?;

    let status = match query.status.as_deref() {
        None => None,
        Some(raw) => Some(ValidationStatus::parse(raw).ok_or_else(|| ApiError::BadRequest {
            stage: "validation",
            message: format!("unknown status filter: {}", raw),
        })?),
    };

    let reports = state
        .report_repo
        .list_for_va(va_id, status)
        .await
        .map_err(|e| ApiError::store("validation", e))?;

    Ok(Json(reports))
}

async fn validate_report(
    State(state): State<AppState>,
    Extension(AuthPilot(admin_id)): Extension<AuthPilot>,
    Path(report_id): Path<Uuid>,
    Json(req): Json<ValidateRequest>,
) -> Result<Json<ReportResponse>, ApiError> {
    let report = state
        .validation
        .validate(
            report_id,
            admin_id,
            req.verdict,
            req.admin_notes,
            req.points_override,
        )
        .await?;

    let _ = state.events_tx.send(OpsEvent::ReportValidated {
        va_id: report.va_id,
        report_id: report.id,
        pilot_id: report.pilot_id,
        status: report.validation_status,
        points_awarded: report.points_awarded.unwrap_or(0),
        at: report.validated_at.unwrap_or_else(Utc::now),
    });

    Ok(Json(report.into()))
}

async fn require_staff(state: &AppState, pilot_id: Uuid, va_id: Uuid) -> Result<(), ApiError> {
    let membership = state
        .memberships
        .membership(pilot_id, va_id)
        .await
        .map_err(|e| ApiError::store("validation", e))?;

    let allowed = membership
        .map(|m| m.active && m.role.can_validate())
        .unwrap_or(false);

    if !allowed {
        return Err(ApiError::Forbidden {
            stage: "validation",
            message: "requires an active owner or admin membership".to_string(),
        });
    }
    Ok(())
}
