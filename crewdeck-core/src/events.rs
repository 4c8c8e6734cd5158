use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::report::ValidationStatus;

/// Activity fan-out for connected portal clients. Events are broadcast
/// in-process and filtered per VA at the stream edge.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpsEvent {
    FlightReserved {
        va_id: Uuid,
        flight_id: Uuid,
        pilot_id: Uuid,
        flight_number: String,
        at: DateTime<Utc>,
    },
    FlightStarted {
        va_id: Uuid,
        flight_id: Uuid,
        pilot_id: Uuid,
        flight_number: String,
        at: DateTime<Utc>,
    },
    FlightCancelled {
        va_id: Uuid,
        flight_id: Uuid,
        pilot_id: Uuid,
        at: DateTime<Utc>,
    },
    ReportFiled {
        va_id: Uuid,
        flight_id: Uuid,
        report_id: Uuid,
        pilot_id: Uuid,
        flight_number: String,
        at: DateTime<Utc>,
    },
    ReportValidated {
        va_id: Uuid,
        report_id: Uuid,
        pilot_id: Uuid,
        status: ValidationStatus,
        points_awarded: i32,
        at: DateTime<Utc>,
    },
    PositionReport {
        va_id: Uuid,
        flight_id: Uuid,
        pilot_id: Uuid,
        latitude: f64,
        longitude: f64,
        altitude_ft: f64,
        ground_speed_kt: f64,
        at: DateTime<Utc>,
    },
}

impl OpsEvent {
    /// VA the event belongs to, used by the stream edge to filter.
    pub fn va_id(&self) -> Uuid {
        match self {
            OpsEvent::FlightReserved { va_id, .. }
            | OpsEvent::FlightStarted { va_id, .. }
            | OpsEvent::FlightCancelled { va_id, .. }
            | OpsEvent::ReportFiled { va_id, .. }
            | OpsEvent::ReportValidated { va_id, .. }
            | OpsEvent::PositionReport { va_id, .. } => *va_id,
        }
    }
}
