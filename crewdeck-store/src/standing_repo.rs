use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crewdeck_core::repository::{StandingRepository, StoreResult};
use crewdeck_core::standing::PilotStanding;

use crate::sqlx_err;

pub struct PostgresStandingRepository {
    pool: PgPool,
}

impl PostgresStandingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct StandingRow {
    pilot_id: Uuid,
    va_id: Uuid,
    points: i64,
    flights: i64,
    hours: f64,
}

impl From<StandingRow> for PilotStanding {
    fn from(row: StandingRow) -> Self {
        PilotStanding {
            pilot_id: row.pilot_id,
            va_id: row.va_id,
            points: row.points,
            flights: row.flights,
            hours: row.hours,
        }
    }
}

#[async_trait]
impl StandingRepository for PostgresStandingRepository {
    async fn get_standing(&self, pilot_id: Uuid, va_id: Uuid) -> StoreResult<PilotStanding> {
        let row: Option<StandingRow> = sqlx::query_as(
            "SELECT pilot_id, va_id, points, flights, hours FROM pilot_standings \
             WHERE pilot_id = $1 AND va_id = $2",
        )
        .bind(pilot_id)
        .bind(va_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| sqlx_err("standing", e))?;
        Ok(row
            .map(PilotStanding::from)
            .unwrap_or_else(|| PilotStanding::zero(pilot_id, va_id)))
    }

    async fn leaderboard(&self, va_id: Uuid, limit: i64) -> StoreResult<Vec<PilotStanding>> {
        let rows: Vec<StandingRow> = sqlx::query_as(
            "SELECT pilot_id, va_id, points, flights, hours FROM pilot_standings \
             WHERE va_id = $1 ORDER BY points DESC, hours DESC LIMIT $2",
        )
        .bind(va_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| sqlx_err("standing", e))?;
        Ok(rows.into_iter().map(PilotStanding::from).collect())
    }
}
