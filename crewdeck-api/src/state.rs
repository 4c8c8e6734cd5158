use std::sync::Arc;

use crewdeck_core::directory::{FleetDirectory, MembershipDirectory, RouteDirectory};
use crewdeck_core::events::OpsEvent;
use crewdeck_core::repository::{FlightRepository, ReportRepository, StandingRepository};
use crewdeck_dispatch::{AircraftTypeTable, DispatchBridge};
use crewdeck_flights::FlightManager;
use crewdeck_pirep::{ReportAssembler, ValidationWorkflow};
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
    pub allow_dev_tokens: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub flights: Arc<FlightManager>,
    pub assembler: Arc<ReportAssembler>,
    pub validation: Arc<ValidationWorkflow>,
    pub bridge: DispatchBridge,
    pub flight_repo: Arc<dyn FlightRepository>,
    pub report_repo: Arc<dyn ReportRepository>,
    pub standing_repo: Arc<dyn StandingRepository>,
    pub memberships: Arc<dyn MembershipDirectory>,
    pub routes: Arc<dyn RouteDirectory>,
    pub fleet: Arc<dyn FleetDirectory>,
    pub aircraft_types: Arc<AircraftTypeTable>,
    pub events_tx: broadcast::Sender<OpsEvent>,
    pub auth: AuthConfig,
    /// Origin of the portal pages that open dispatch tickets; stamped into
    /// correlation tokens.
    pub portal_origin: String,
}
