use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::flight::{Flight, FlightStatus};
use crate::report::{FlightReport, ValidationRecord, ValidationStatus};
use crate::standing::{PilotStanding, StandingDelta};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("duplicate {0}")]
    Duplicate(&'static str),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of a guarded compare-and-transition. `Conflict` carries the state
/// actually found, so callers can report what blocked them.
#[derive(Debug)]
pub enum TransitionOutcome<T, S> {
    Applied(T),
    Conflict(S),
    Missing,
}

/// Persistence seam for flight records. Every mutation is a guarded
/// compare-and-transition: the backend checks the expected state (and the
/// owning pilot, where one is given) in the same step that writes, so
/// concurrent callers resolve to exactly one `Applied`.
#[async_trait]
pub trait FlightRepository: Send + Sync {
    async fn insert(&self, flight: &Flight) -> StoreResult<()>;

    async fn get_flight(&self, id: Uuid) -> StoreResult<Option<Flight>>;

    async fn list_for_pilot(&self, pilot_id: Uuid, va_id: Option<Uuid>)
        -> StoreResult<Vec<Flight>>;

    /// reserved -> in_progress, stamping departure. Guard: status and owner.
    async fn mark_started(
        &self,
        id: Uuid,
        pilot_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<TransitionOutcome<Flight, FlightStatus>>;

    /// reserved -> cancelled (terminal). Guard: status and owner.
    async fn mark_cancelled(
        &self,
        id: Uuid,
        pilot_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<TransitionOutcome<Flight, FlightStatus>>;

    /// Record the external plan identifier, first writer wins. Returns the
    /// identifier actually stored, or `None` when the flight is unknown.
    async fn set_plan_id(&self, id: Uuid, plan_id: &str) -> StoreResult<Option<String>>;
}

/// Persistence seam for pilot reports.
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// File a report, completing its flight in the same serialized step:
    /// guard in_progress + owner on the flight, stamp arrival with `at`,
    /// insert the report as pending. One report per flight.
    async fn file_report(
        &self,
        report: &FlightReport,
        at: DateTime<Utc>,
    ) -> StoreResult<TransitionOutcome<FlightReport, FlightStatus>>;

    async fn get_report(&self, id: Uuid) -> StoreResult<Option<FlightReport>>;

    async fn get_by_flight(&self, flight_id: Uuid) -> StoreResult<Option<FlightReport>>;

    async fn list_for_va(
        &self,
        va_id: Uuid,
        status: Option<ValidationStatus>,
    ) -> StoreResult<Vec<FlightReport>>;

    /// pending -> approved/rejected, exactly once. Guard: pending. When
    /// `credit` is given, the pilot's standing is incremented in the same
    /// transaction (or equivalent), as an atomic add rather than a
    /// read-modify-write, so a verdict and its credit always land together.
    async fn finalize(
        &self,
        id: Uuid,
        record: &ValidationRecord,
        credit: Option<StandingDelta>,
    ) -> StoreResult<TransitionOutcome<FlightReport, ValidationStatus>>;
}

/// Read seam for pilot standings; writes happen only through
/// `ReportRepository::finalize`.
#[async_trait]
pub trait StandingRepository: Send + Sync {
    /// Zero standing for pilots with no approved reports yet.
    async fn get_standing(&self, pilot_id: Uuid, va_id: Uuid) -> StoreResult<PilotStanding>;

    async fn leaderboard(&self, va_id: Uuid, limit: i64) -> StoreResult<Vec<PilotStanding>>;
}
