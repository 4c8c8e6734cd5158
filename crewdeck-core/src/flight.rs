use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Flight status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlightStatus {
    Reserved,
    InProgress,
    Completed,
    Cancelled,
}

impl FlightStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlightStatus::Reserved => "reserved",
            FlightStatus::InProgress => "in_progress",
            FlightStatus::Completed => "completed",
            FlightStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<FlightStatus> {
        match s {
            "reserved" => Some(FlightStatus::Reserved),
            "in_progress" => Some(FlightStatus::InProgress),
            "completed" => Some(FlightStatus::Completed),
            "cancelled" => Some(FlightStatus::Cancelled),
            _ => None,
        }
    }

    /// Completed and cancelled flights never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlightStatus::Completed | FlightStatus::Cancelled)
    }
}

impl std::fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pilot's reservation of a route, tracked from booking to validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flight {
    pub id: Uuid,
    pub pilot_id: Uuid,
    pub va_id: Uuid,
    pub route_id: Uuid,
    pub fleet_id: Option<Uuid>,
    /// Copied from the route at reservation time so later route edits
    /// don't rewrite history.
    pub flight_number: String,
    pub status: FlightStatus,
    /// External plan identifier, set at most once by the dispatch bridge.
    pub plan_id: Option<String>,
    pub reserved_at: DateTime<Utc>,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Flight {
    pub fn reserve(
        pilot_id: Uuid,
        va_id: Uuid,
        route_id: Uuid,
        fleet_id: Option<Uuid>,
        flight_number: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            pilot_id,
            va_id,
            route_id,
            fleet_id,
            flight_number,
            status: FlightStatus::Reserved,
            plan_id: None,
            reserved_at: Utc::now(),
            departure_time: None,
            arrival_time: None,
            cancelled_at: None,
        }
    }

    pub fn is_owned_by(&self, pilot_id: Uuid) -> bool {
        self.pilot_id == pilot_id
    }

    /// Stamp departure and move to in_progress. Status guards live in the
    /// repository; this only records the transition.
    pub fn start(&mut self, at: DateTime<Utc>) {
        self.status = FlightStatus::InProgress;
        self.departure_time = Some(at);
    }

    /// Stamp arrival and move to completed.
    pub fn complete(&mut self, at: DateTime<Utc>) {
        self.status = FlightStatus::Completed;
        self.arrival_time = Some(at);
    }

    /// Move to the terminal cancelled state. Cancelled flights stay
    /// queryable for listings and audit.
    pub fn cancel(&mut self, at: DateTime<Utc>) {
        self.status = FlightStatus::Cancelled;
        self.cancelled_at = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names_round_trip() {
        for status in [
            FlightStatus::Reserved,
            FlightStatus::InProgress,
            FlightStatus::Completed,
            FlightStatus::Cancelled,
        ] {
            assert_eq!(FlightStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(FlightStatus::parse("boarding"), None);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&FlightStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn test_reserve_starts_clean() {
        let flight = Flight::reserve(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            None,
            "CDK101".to_string(),
        );
        assert_eq!(flight.status, FlightStatus::Reserved);
        assert!(flight.plan_id.is_none());
        assert!(flight.departure_time.is_none());
        assert!(flight.arrival_time.is_none());
    }
}
