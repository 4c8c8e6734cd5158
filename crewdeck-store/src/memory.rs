use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crewdeck_core::directory::{
    FleetAircraft, FleetDirectory, Membership, MembershipDirectory, Route, RouteDirectory,
};
use crewdeck_core::flight::{Flight, FlightStatus};
use crewdeck_core::report::{FlightReport, ValidationRecord, ValidationStatus};
use crewdeck_core::repository::{
    FlightRepository, ReportRepository, StandingRepository, StoreError, StoreResult,
    TransitionOutcome,
};
use crewdeck_core::standing::{PilotStanding, StandingDelta};

#[derive(Default)]
struct State {
    flights: HashMap<Uuid, Flight>,
    reports: HashMap<Uuid, FlightReport>,
    report_by_flight: HashMap<Uuid, Uuid>,
    standings: HashMap<(Uuid, Uuid), PilotStanding>,
    memberships: HashMap<(Uuid, Uuid), Membership>,
    routes: HashMap<Uuid, Route>,
    fleet: HashMap<Uuid, FleetAircraft>,
}

/// In-memory backend for development and tests. A single mutex serializes
/// every operation, which gives the guarded transitions the same atomicity
/// the SQL backend gets from its conditional UPDATEs.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_membership(&self, membership: Membership) {
        let mut state = self.state.lock().expect("lock poisoned");
        state
            .memberships
            .insert((membership.pilot_id, membership.va_id), membership);
    }

    pub fn seed_route(&self, route: Route) {
        let mut state = self.state.lock().expect("lock poisoned");
        state.routes.insert(route.id, route);
    }

    pub fn seed_aircraft(&self, aircraft: FleetAircraft) {
        let mut state = self.state.lock().expect("lock poisoned");
        state.fleet.insert(aircraft.id, aircraft);
    }
}

#[async_trait]
impl FlightRepository for MemoryStore {
    async fn insert(&self, flight: &Flight) -> StoreResult<()> {
        let mut state = self.state.lock().expect("lock poisoned");
        if state.flights.contains_key(&flight.id) {
            return Err(StoreError::Duplicate("flight"));
        }
        state.flights.insert(flight.id, flight.clone());
        Ok(())
    }

    async fn get_flight(&self, id: Uuid) -> StoreResult<Option<Flight>> {
        let state = self.state.lock().expect("lock poisoned");
        Ok(state.flights.get(&id).cloned())
    }

    async fn list_for_pilot(
        &self,
        pilot_id: Uuid,
        va_id: Option<Uuid>,
    ) -> StoreResult<Vec<Flight>> {
        let state = self.state.lock().expect("lock poisoned");
        let mut flights: Vec<Flight> = state
            .flights
            .values()
            .filter(|f| f.pilot_id == pilot_id && va_id.map_or(true, |va| f.va_id == va))
            .cloned()
            .collect();
        flights.sort_by(|a, b| b.reserved_at.cmp(&a.reserved_at));
        Ok(flights)
    }

    async fn mark_started(
        &self,
        id: Uuid,
        pilot_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<TransitionOutcome<Flight, FlightStatus>> {
        let mut state = self.state.lock().expect("lock poisoned");
        let Some(flight) = state.flights.get_mut(&id) else {
            return Ok(TransitionOutcome::Missing);
        };
        if flight.status != FlightStatus::Reserved || !flight.is_owned_by(pilot_id) {
            return Ok(TransitionOutcome::Conflict(flight.status));
        }
        flight.start(at);
        Ok(TransitionOutcome::Applied(flight.clone()))
    }

    async fn mark_cancelled(
        &self,
        id: Uuid,
        pilot_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<TransitionOutcome<Flight, FlightStatus>> {
        let mut state = self.state.lock().expect("lock poisoned");
        let Some(flight) = state.flights.get_mut(&id) else {
            return Ok(TransitionOutcome::Missing);
        };
        if flight.status != FlightStatus::Reserved || !flight.is_owned_by(pilot_id) {
            return Ok(TransitionOutcome::Conflict(flight.status));
        }
        flight.cancel(at);
        Ok(TransitionOutcome::Applied(flight.clone()))
    }

    async fn set_plan_id(&self, id: Uuid, plan_id: &str) -> StoreResult<Option<String>> {
        let mut state = self.state.lock().expect("lock poisoned");
        let Some(flight) = state.flights.get_mut(&id) else {
            return Ok(None);
        };
        if flight.plan_id.is_none() {
            flight.plan_id = Some(plan_id.to_string());
        }
        Ok(flight.plan_id.clone())
    }
}

#[async_trait]
impl ReportRepository for MemoryStore {
    async fn file_report(
        &self,
        report: &FlightReport,
        at: DateTime<Utc>,
    ) -> StoreResult<TransitionOutcome<FlightReport, FlightStatus>> {
        let mut state = self.state.lock().expect("lock poisoned");
        let Some(flight) = state.flights.get_mut(&report.flight_id) else {
            return Ok(TransitionOutcome::Missing);
        };
        if flight.status != FlightStatus::InProgress || !flight.is_owned_by(report.pilot_id) {
            return Ok(TransitionOutcome::Conflict(flight.status));
        }
        flight.complete(at);
        state.report_by_flight.insert(report.flight_id, report.id);
        state.reports.insert(report.id, report.clone());
        Ok(TransitionOutcome::Applied(report.clone()))
    }

    async fn get_report(&self, id: Uuid) -> StoreResult<Option<FlightReport>> {
        let state = self.state.lock().expect("lock poisoned");
        Ok(state.reports.get(&id).cloned())
    }

    async fn get_by_flight(&self, flight_id: Uuid) -> StoreResult<Option<FlightReport>> {
        let state = self.state.lock().expect("lock poisoned");
        Ok(state
            .report_by_flight
            .get(&flight_id)
            .and_then(|id| state.reports.get(id))
            .cloned())
    }

    async fn list_for_va(
        &self,
        va_id: Uuid,
        status: Option<ValidationStatus>,
    ) -> StoreResult<Vec<FlightReport>> {
        let state = self.state.lock().expect("lock poisoned");
        let mut reports: Vec<FlightReport> = state
            .reports
            .values()
            .filter(|r| {
                r.va_id == va_id && status.map_or(true, |s| r.validation_status == s)
            })
            .cloned()
            .collect();
        reports.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(reports)
    }

    async fn finalize(
        &self,
        id: Uuid,
        record: &ValidationRecord,
        credit: Option<StandingDelta>,
    ) -> StoreResult<TransitionOutcome<FlightReport, ValidationStatus>> {
        let mut state = self.state.lock().expect("lock poisoned");
        let Some(report) = state.reports.get_mut(&id) else {
            return Ok(TransitionOutcome::Missing);
        };
        if report.validation_status != ValidationStatus::Pending {
            return Ok(TransitionOutcome::Conflict(report.validation_status));
        }
        report.apply_verdict(record);
        let updated = report.clone();
        if let Some(delta) = credit {
            let standing = state
                .standings
                .entry((updated.pilot_id, updated.va_id))
                .or_insert_with(|| PilotStanding::zero(updated.pilot_id, updated.va_id));
            standing.apply(&delta);
        }
        Ok(TransitionOutcome::Applied(updated))
    }
}

#[async_trait]
impl StandingRepository for MemoryStore {
    async fn get_standing(&self, pilot_id: Uuid, va_id: Uuid) -> StoreResult<PilotStanding> {
        let state = self.state.lock().expect("lock poisoned");
        Ok(state
            .standings
            .get(&(pilot_id, va_id))
            .cloned()
            .unwrap_or_else(|| PilotStanding::zero(pilot_id, va_id)))
    }

    async fn leaderboard(&self, va_id: Uuid, limit: i64) -> StoreResult<Vec<PilotStanding>> {
        let state = self.state.lock().expect("lock poisoned");
        let mut standings: Vec<PilotStanding> = state
            .standings
            .values()
            .filter(|s| s.va_id == va_id)
            .cloned()
            .collect();
        standings.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then(b.hours.total_cmp(&a.hours))
        });
        standings.truncate(limit.max(0) as usize);
        Ok(standings)
    }
}

#[async_trait]
impl MembershipDirectory for MemoryStore {
    async fn membership(&self, pilot_id: Uuid, va_id: Uuid) -> StoreResult<Option<Membership>> {
        let state = self.state.lock().expect("lock poisoned");
        Ok(state.memberships.get(&(pilot_id, va_id)).cloned())
    }
}

#[async_trait]
impl RouteDirectory for MemoryStore {
    async fn route(&self, route_id: Uuid) -> StoreResult<Option<Route>> {
        let state = self.state.lock().expect("lock poisoned");
        Ok(state.routes.get(&route_id).cloned())
    }
}

#[async_trait]
impl FleetDirectory for MemoryStore {
    async fn aircraft(&self, fleet_id: Uuid) -> StoreResult<Option<FleetAircraft>> {
        let state = self.state.lock().expect("lock poisoned");
        Ok(state.fleet.get(&fleet_id).cloned())
    }
}
