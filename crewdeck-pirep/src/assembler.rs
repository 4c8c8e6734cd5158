use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crewdeck_core::directory::RouteDirectory;
use crewdeck_core::report::{FlightReport, ReportSubmission};
use crewdeck_core::repository::{
    FlightRepository, ReportRepository, StoreError, TransitionOutcome,
};

/// Turns a pilot's submission into a pending report, completing the flight
/// in the same serialized step. The guarded transition on the flight is the
/// single winner-selection point for double submissions.
pub struct ReportAssembler {
    flights: Arc<dyn FlightRepository>,
    reports: Arc<dyn ReportRepository>,
    routes: Arc<dyn RouteDirectory>,
}

impl ReportAssembler {
    pub fn new(
        flights: Arc<dyn FlightRepository>,
        reports: Arc<dyn ReportRepository>,
        routes: Arc<dyn RouteDirectory>,
    ) -> Self {
        Self {
            flights,
            reports,
            routes,
        }
    }

    /// Transition: in_progress → completed, plus a pending FlightReport.
    /// Telemetry is stored exactly as submitted; implausible figures are
    /// logged for the validating staff member, never rejected here.
    pub async fn submit(
        &self,
        flight_id: Uuid,
        pilot_id: Uuid,
        submission: ReportSubmission,
    ) -> Result<FlightReport, SubmitError> {
        let flight = self
            .flights
            .get_flight(flight_id)
            .await?
            .ok_or(SubmitError::FlightNotFound(flight_id))?;

        if !flight.is_owned_by(pilot_id) {
            return Err(SubmitError::InvalidTransition {
                from: flight.status.to_string(),
                to: "completed".to_string(),
            });
        }

        if submission.distance_nm < 0.0 || submission.fuel_used_kg < 0.0 {
            tracing::warn!(
                "Flight {}: implausible figures in submission (distance {} nm, fuel {} kg)",
                flight_id,
                submission.distance_nm,
                submission.fuel_used_kg
            );
        }
        if submission.landing_rate_fpm > 0.0 {
            tracing::warn!(
                "Flight {}: landing rate {} fpm reads as climbing at touchdown",
                flight_id,
                submission.landing_rate_fpm
            );
        }

        let (origin, destination) = match self.routes.route(flight.route_id).await? {
            Some(route) => (route.origin, route.destination),
            None => {
                // ZZZZ is the ICAO filler for "no code assigned".
                tracing::warn!("Flight {}: route {} is gone", flight_id, flight.route_id);
                ("ZZZZ".to_string(), "ZZZZ".to_string())
            }
        };

        let report = FlightReport::pending(&flight, origin, destination, submission);
        match self.reports.file_report(&report, Utc::now()).await? {
            TransitionOutcome::Applied(report) => {
                tracing::info!(
                    "Report {} filed for flight {} ({} samples)",
                    report.id,
                    flight_id,
                    report.telemetry.len()
                );
                Ok(report)
            }
            TransitionOutcome::Conflict(actual) => Err(SubmitError::InvalidTransition {
                from: actual.to_string(),
                to: "completed".to_string(),
            }),
            TransitionOutcome::Missing => Err(SubmitError::FlightNotFound(flight_id)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Flight not found: {0}")]
    FlightNotFound(Uuid),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}
