use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crewdeck_core::directory::{
    FleetAircraft, FleetDirectory, Membership, MembershipDirectory, Route, RouteDirectory,
    VaRole,
};
use crewdeck_core::repository::{StoreError, StoreResult};

use crate::sqlx_err;

/// Read-only lookups against the VA administration tables. This pipeline
/// never writes them.
pub struct PostgresDirectory {
    pool: PgPool,
}

impl PostgresDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct MembershipRow {
    pilot_id: Uuid,
    va_id: Uuid,
    role: String,
    active: bool,
}

fn parse_role(s: &str) -> StoreResult<VaRole> {
    match s {
        "owner" => Ok(VaRole::Owner),
        "admin" => Ok(VaRole::Admin),
        "pilot" => Ok(VaRole::Pilot),
        other => Err(StoreError::Backend(format!("unknown va role '{}'", other))),
    }
}

#[async_trait]
impl MembershipDirectory for PostgresDirectory {
    async fn membership(&self, pilot_id: Uuid, va_id: Uuid) -> StoreResult<Option<Membership>> {
        let row: Option<MembershipRow> = sqlx::query_as(
            "SELECT pilot_id, va_id, role, active FROM va_memberships \
             WHERE pilot_id = $1 AND va_id = $2",
        )
        .bind(pilot_id)
        .bind(va_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| sqlx_err("membership", e))?;

        row.map(|r| {
            Ok(Membership {
                pilot_id: r.pilot_id,
                va_id: r.va_id,
                role: parse_role(&r.role)?,
                active: r.active,
            })
        })
        .transpose()
    }
}

#[derive(sqlx::FromRow)]
struct RouteRow {
    id: Uuid,
    va_id: Uuid,
    flight_number: String,
    origin: String,
    destination: String,
    distance_nm: Option<f64>,
}

#[async_trait]
impl RouteDirectory for PostgresDirectory {
    async fn route(&self, route_id: Uuid) -> StoreResult<Option<Route>> {
        let row: Option<RouteRow> = sqlx::query_as(
            "SELECT id, va_id, flight_number, origin, destination, distance_nm \
             FROM routes WHERE id = $1",
        )
        .bind(route_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| sqlx_err("route", e))?;

        Ok(row.map(|r| Route {
            id: r.id,
            va_id: r.va_id,
            flight_number: r.flight_number,
            origin: r.origin,
            destination: r.destination,
            distance_nm: r.distance_nm,
        }))
    }
}

#[derive(sqlx::FromRow)]
struct FleetRow {
    id: Uuid,
    va_id: Uuid,
    type_code: String,
    name: String,
}

#[async_trait]
impl FleetDirectory for PostgresDirectory {
    async fn aircraft(&self, fleet_id: Uuid) -> StoreResult<Option<FleetAircraft>> {
        let row: Option<FleetRow> = sqlx::query_as(
            "SELECT id, va_id, type_code, name FROM fleet_aircraft WHERE id = $1",
        )
        .bind(fleet_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| sqlx_err("aircraft", e))?;

        Ok(row.map(|r| FleetAircraft {
            id: r.id,
            va_id: r.va_id,
            type_code: r.type_code,
            name: r.name,
        }))
    }
}
