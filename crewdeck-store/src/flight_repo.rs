use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crewdeck_core::flight::{Flight, FlightStatus};
use crewdeck_core::repository::{
    FlightRepository, StoreError, StoreResult, TransitionOutcome,
};

use crate::sqlx_err;

pub struct PostgresFlightRepository {
    pool: PgPool,
}

impl PostgresFlightRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn status_of(&self, id: Uuid) -> StoreResult<Option<FlightStatus>> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM flights WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| sqlx_err("flight", e))?;
        status.map(|s| parse_status(&s)).transpose()
    }
}

const FLIGHT_COLUMNS: &str = "id, pilot_id, va_id, route_id, fleet_id, flight_number, status, \
     plan_id, reserved_at, departure_time, arrival_time, cancelled_at";

#[derive(sqlx::FromRow)]
struct FlightRow {
    id: Uuid,
    pilot_id: Uuid,
    va_id: Uuid,
    route_id: Uuid,
    fleet_id: Option<Uuid>,
    flight_number: String,
    status: String,
    plan_id: Option<String>,
    reserved_at: DateTime<Utc>,
    departure_time: Option<DateTime<Utc>>,
    arrival_time: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl FlightRow {
    fn into_flight(self) -> StoreResult<Flight> {
        Ok(Flight {
            id: self.id,
            pilot_id: self.pilot_id,
            va_id: self.va_id,
            route_id: self.route_id,
            fleet_id: self.fleet_id,
            flight_number: self.flight_number,
            status: parse_status(&self.status)?,
            plan_id: self.plan_id,
            reserved_at: self.reserved_at,
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            cancelled_at: self.cancelled_at,
        })
    }
}

fn parse_status(s: &str) -> StoreResult<FlightStatus> {
    FlightStatus::parse(s)
        .ok_or_else(|| StoreError::Backend(format!("unknown flight status '{}'", s)))
}

#[async_trait]
impl FlightRepository for PostgresFlightRepository {
    async fn insert(&self, flight: &Flight) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO flights (id, pilot_id, va_id, route_id, fleet_id, flight_number, \
             status, plan_id, reserved_at, departure_time, arrival_time, cancelled_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(flight.id)
        .bind(flight.pilot_id)
        .bind(flight.va_id)
        .bind(flight.route_id)
        .bind(flight.fleet_id)
        .bind(&flight.flight_number)
        .bind(flight.status.as_str())
        .bind(&flight.plan_id)
        .bind(flight.reserved_at)
        .bind(flight.departure_time)
        .bind(flight.arrival_time)
        .bind(flight.cancelled_at)
        .execute(&self.pool)
        .await
        .map_err(|e| sqlx_err("flight", e))?;
        Ok(())
    }

    async fn get_flight(&self, id: Uuid) -> StoreResult<Option<Flight>> {
        let row: Option<FlightRow> = sqlx::query_as(&format!(
            "SELECT {} FROM flights WHERE id = $1",
            FLIGHT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| sqlx_err("flight", e))?;
        row.map(FlightRow::into_flight).transpose()
    }

    async fn list_for_pilot(
        &self,
        pilot_id: Uuid,
        va_id: Option<Uuid>,
    ) -> StoreResult<Vec<Flight>> {
        let rows: Vec<FlightRow> = sqlx::query_as(&format!(
            "SELECT {} FROM flights WHERE pilot_id = $1 \
             AND ($2::uuid IS NULL OR va_id = $2) ORDER BY reserved_at DESC",
            FLIGHT_COLUMNS
        ))
        .bind(pilot_id)
        .bind(va_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| sqlx_err("flight", e))?;
        rows.into_iter().map(FlightRow::into_flight).collect()
    }

    async fn mark_started(
        &self,
        id: Uuid,
        pilot_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<TransitionOutcome<Flight, FlightStatus>> {
        // The WHERE clause is the guard: only one concurrent caller sees a
        // row to update.
        let row: Option<FlightRow> = sqlx::query_as(&format!(
            "UPDATE flights SET status = 'in_progress', departure_time = $3 \
             WHERE id = $1 AND pilot_id = $2 AND status = 'reserved' RETURNING {}",
            FLIGHT_COLUMNS
        ))
        .bind(id)
        .bind(pilot_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| sqlx_err("flight", e))?;

        match row {
            Some(row) => Ok(TransitionOutcome::Applied(row.into_flight()?)),
            None => match self.status_of(id).await? {
                Some(status) => Ok(TransitionOutcome::Conflict(status)),
                None => Ok(TransitionOutcome::Missing),
            },
        }
    }

    async fn mark_cancelled(
        &self,
        id: Uuid,
        pilot_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<TransitionOutcome<Flight, FlightStatus>> {
        let row: Option<FlightRow> = sqlx::query_as(&format!(
            "UPDATE flights SET status = 'cancelled', cancelled_at = $3 \
             WHERE id = $1 AND pilot_id = $2 AND status = 'reserved' RETURNING {}",
            FLIGHT_COLUMNS
        ))
        .bind(id)
        .bind(pilot_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| sqlx_err("flight", e))?;

        match row {
            Some(row) => Ok(TransitionOutcome::Applied(row.into_flight()?)),
            None => match self.status_of(id).await? {
                Some(status) => Ok(TransitionOutcome::Conflict(status)),
                None => Ok(TransitionOutcome::Missing),
            },
        }
    }

    async fn set_plan_id(&self, id: Uuid, plan_id: &str) -> StoreResult<Option<String>> {
        sqlx::query("UPDATE flights SET plan_id = $2 WHERE id = $1 AND plan_id IS NULL")
            .bind(id)
            .bind(plan_id)
            .execute(&self.pool)
            .await
            .map_err(|e| sqlx_err("flight", e))?;

        // Read back what actually stuck, ours or an earlier writer's.
        let stored: Option<Option<String>> =
            sqlx::query_scalar("SELECT plan_id FROM flights WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| sqlx_err("flight", e))?;
        Ok(stored.flatten())
    }
}
