use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crewdeck_core::directory::{MembershipDirectory, RouteDirectory};
use crewdeck_core::flight::Flight;
use crewdeck_core::repository::{FlightRepository, StoreError, TransitionOutcome};

/// Manages the flight lifecycle and its state transitions
pub struct FlightManager {
    flights: Arc<dyn FlightRepository>,
    memberships: Arc<dyn MembershipDirectory>,
    routes: Arc<dyn RouteDirectory>,
}

impl FlightManager {
    pub fn new(
        flights: Arc<dyn FlightRepository>,
        memberships: Arc<dyn MembershipDirectory>,
        routes: Arc<dyn RouteDirectory>,
    ) -> Self {
        Self {
            flights,
            memberships,
            routes,
        }
    }

    /// Reserve a route for a pilot. The pilot must hold an active
    /// membership in the VA and the route must belong to that VA.
    pub async fn reserve(
        &self,
        pilot_id: Uuid,
        va_id: Uuid,
        route_id: Uuid,
        fleet_id: Option<Uuid>,
    ) -> Result<Flight, FlightError> {
        let membership = self.memberships.membership(pilot_id, va_id).await?;
        if !membership.map(|m| m.active).unwrap_or(false) {
            return Err(FlightError::NotEligible);
        }

        let route = self
            .routes
            .route(route_id)
            .await?
            .filter(|r| r.va_id == va_id)
            .ok_or(FlightError::RouteNotFound(route_id))?;

        let flight = Flight::reserve(pilot_id, va_id, route_id, fleet_id, route.flight_number);
        self.flights.insert(&flight).await?;

        tracing::info!(
            "Flight {} ({}) reserved by pilot {}",
            flight.id,
            flight.flight_number,
            pilot_id
        );
        Ok(flight)
    }

    /// Transition: reserved → in_progress (departure stamped). Only the
    /// owning pilot may start, and only while the flight is reserved;
    /// concurrent starts resolve to a single winner in the repository.
    pub async fn start(&self, flight_id: Uuid, pilot_id: Uuid) -> Result<Flight, FlightError> {
        match self
            .flights
            .mark_started(flight_id, pilot_id, Utc::now())
            .await?
        {
            TransitionOutcome::Applied(flight) => {
                tracing::info!("Flight {} started by pilot {}", flight_id, pilot_id);
                Ok(flight)
            }
            TransitionOutcome::Conflict(actual) => Err(FlightError::InvalidTransition {
                from: actual.to_string(),
                to: "in_progress".to_string(),
            }),
            TransitionOutcome::Missing => Err(FlightError::NotFound(flight_id)),
        }
    }

    /// Transition: reserved → cancelled (terminal). The record stays
    /// queryable; nothing is deleted.
    pub async fn cancel(&self, flight_id: Uuid, pilot_id: Uuid) -> Result<Flight, FlightError> {
        match self
            .flights
            .mark_cancelled(flight_id, pilot_id, Utc::now())
            .await?
        {
            TransitionOutcome::Applied(flight) => {
                tracing::info!("Flight {} cancelled by pilot {}", flight_id, pilot_id);
                Ok(flight)
            }
            TransitionOutcome::Conflict(actual) => Err(FlightError::InvalidTransition {
                from: actual.to_string(),
                to: "cancelled".to_string(),
            }),
            TransitionOutcome::Missing => Err(FlightError::NotFound(flight_id)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FlightError {
    #[error("Flight not found: {0}")]
    NotFound(Uuid),

    #[error("Pilot does not hold an active membership in this VA")]
    NotEligible,

    #[error("Route not found in this VA: {0}")]
    RouteNotFound(Uuid),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}
