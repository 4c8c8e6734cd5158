use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::flight::Flight;
use crate::telemetry::TelemetrySample;

/// Review state of a filed report
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Pending => "pending",
            ValidationStatus::Approved => "approved",
            ValidationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<ValidationStatus> {
        match s {
            "pending" => Some(ValidationStatus::Pending),
            "approved" => Some(ValidationStatus::Approved),
            "rejected" => Some(ValidationStatus::Rejected),
            _ => None,
        }
    }
}

/// What the pilot files after landing: actuals plus the raw telemetry track.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportSubmission {
    pub actual_departure: DateTime<Utc>,
    pub actual_arrival: DateTime<Utc>,
    pub duration_minutes: i32,
    pub distance_nm: f64,
    pub fuel_used_kg: f64,
    /// Signed feet per minute at touchdown; negative means descending.
    pub landing_rate_fpm: f64,
    #[serde(default)]
    pub telemetry: Vec<TelemetrySample>,
}

/// A pilot report awaiting (or past) staff review. Pilot, VA and route
/// endpoints are copied in at filing time so listings and standing credit
/// never need a join back to the flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightReport {
    pub id: Uuid,
    pub flight_id: Uuid,
    pub pilot_id: Uuid,
    pub va_id: Uuid,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub actual_departure: DateTime<Utc>,
    pub actual_arrival: DateTime<Utc>,
    pub duration_minutes: i32,
    pub distance_nm: f64,
    pub fuel_used_kg: f64,
    pub landing_rate_fpm: f64,
    pub telemetry: Vec<TelemetrySample>,
    pub validation_status: ValidationStatus,
    pub points_awarded: Option<i32>,
    pub validated_by: Option<Uuid>,
    pub admin_notes: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
}

impl FlightReport {
    pub fn pending(
        flight: &Flight,
        origin: String,
        destination: String,
        submission: ReportSubmission,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            flight_id: flight.id,
            pilot_id: flight.pilot_id,
            va_id: flight.va_id,
            flight_number: flight.flight_number.clone(),
            origin,
            destination,
            actual_departure: submission.actual_departure,
            actual_arrival: submission.actual_arrival,
            duration_minutes: submission.duration_minutes,
            distance_nm: submission.distance_nm,
            fuel_used_kg: submission.fuel_used_kg,
            landing_rate_fpm: submission.landing_rate_fpm,
            telemetry: submission.telemetry,
            validation_status: ValidationStatus::Pending,
            points_awarded: None,
            validated_by: None,
            admin_notes: None,
            submitted_at: Utc::now(),
            validated_at: None,
        }
    }

    /// Record a verdict. The pending-state guard lives in the repository.
    pub fn apply_verdict(&mut self, record: &ValidationRecord) {
        self.validation_status = record.status;
        self.points_awarded = Some(record.points_awarded);
        self.validated_by = Some(record.validated_by);
        self.admin_notes = record.admin_notes.clone();
        self.validated_at = Some(record.validated_at);
    }

    pub fn hours_flown(&self) -> f64 {
        f64::from(self.duration_minutes) / 60.0
    }
}

/// The terminal verdict written exactly once per report.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationRecord {
    pub status: ValidationStatus,
    pub points_awarded: i32,
    pub validated_by: Uuid,
    pub admin_notes: Option<String>,
    pub validated_at: DateTime<Utc>,
}
