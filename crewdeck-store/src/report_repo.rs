use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crewdeck_core::flight::FlightStatus;
use crewdeck_core::report::{FlightReport, ValidationRecord, ValidationStatus};
use crewdeck_core::repository::{
    ReportRepository, StoreError, StoreResult, TransitionOutcome,
};
use crewdeck_core::standing::StandingDelta;
use crewdeck_core::telemetry::TelemetrySample;

use crate::sqlx_err;

pub struct PostgresReportRepository {
    pool: PgPool,
}

impl PostgresReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Telemetry travels as jsonb text so the row stays plain sqlx types.
const REPORT_COLUMNS: &str = "id, flight_id, pilot_id, va_id, flight_number, origin, \
     destination, actual_departure, actual_arrival, duration_minutes, distance_nm, \
     fuel_used_kg, landing_rate_fpm, telemetry::text AS telemetry, validation_status, \
     points_awarded, validated_by, admin_notes, submitted_at, validated_at";

#[derive(sqlx::FromRow)]
struct ReportRow {
    id: Uuid,
    flight_id: Uuid,
    pilot_id: Uuid,
    va_id: Uuid,
    flight_number: String,
    origin: String,
    destination: String,
    actual_departure: DateTime<Utc>,
    actual_arrival: DateTime<Utc>,
    duration_minutes: i32,
    distance_nm: f64,
    fuel_used_kg: f64,
    landing_rate_fpm: f64,
    telemetry: String,
    validation_status: String,
    points_awarded: Option<i32>,
    validated_by: Option<Uuid>,
    admin_notes: Option<String>,
    submitted_at: DateTime<Utc>,
    validated_at: Option<DateTime<Utc>>,
}

impl ReportRow {
    fn into_report(self) -> StoreResult<FlightReport> {
        let telemetry: Vec<TelemetrySample> = serde_json::from_str(&self.telemetry)
            .map_err(|e| StoreError::Backend(format!("bad telemetry payload: {}", e)))?;
        Ok(FlightReport {
            id: self.id,
            flight_id: self.flight_id,
            pilot_id: self.pilot_id,
            va_id: self.va_id,
            flight_number: self.flight_number,
            origin: self.origin,
            destination: self.destination,
            actual_departure: self.actual_departure,
            actual_arrival: self.actual_arrival,
            duration_minutes: self.duration_minutes,
            distance_nm: self.distance_nm,
            fuel_used_kg: self.fuel_used_kg,
            landing_rate_fpm: self.landing_rate_fpm,
            telemetry,
            validation_status: parse_validation(&self.validation_status)?,
            points_awarded: self.points_awarded,
            validated_by: self.validated_by,
            admin_notes: self.admin_notes,
            submitted_at: self.submitted_at,
            validated_at: self.validated_at,
        })
    }
}

fn parse_validation(s: &str) -> StoreResult<ValidationStatus> {
    ValidationStatus::parse(s)
        .ok_or_else(|| StoreError::Backend(format!("unknown validation status '{}'", s)))
}

#[async_trait]
impl ReportRepository for PostgresReportRepository {
    async fn file_report(
        &self,
        report: &FlightReport,
        at: DateTime<Utc>,
    ) -> StoreResult<TransitionOutcome<FlightReport, FlightStatus>> {
        let mut tx = self.pool.begin().await.map_err(|e| sqlx_err("report", e))?;

        // Completing the flight is the winner-selection for double
        // submissions; losing it means some report already landed.
        let completed = sqlx::query(
            "UPDATE flights SET status = 'completed', arrival_time = $3 \
             WHERE id = $1 AND pilot_id = $2 AND status = 'in_progress'",
        )
        .bind(report.flight_id)
        .bind(report.pilot_id)
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(|e| sqlx_err("report", e))?
        .rows_affected();

        if completed == 0 {
            tx.rollback().await.map_err(|e| sqlx_err("report", e))?;
            let status: Option<String> =
                sqlx::query_scalar("SELECT status FROM flights WHERE id = $1")
                    .bind(report.flight_id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| sqlx_err("report", e))?;
            return match status {
                Some(s) => {
                    let status = FlightStatus::parse(&s).ok_or_else(|| {
                        StoreError::Backend(format!("unknown flight status '{}'", s))
                    })?;
                    Ok(TransitionOutcome::Conflict(status))
                }
                None => Ok(TransitionOutcome::Missing),
            };
        }

        let telemetry = serde_json::to_string(&report.telemetry)
            .map_err(|e| StoreError::Backend(format!("bad telemetry payload: {}", e)))?;

        sqlx::query(
            "INSERT INTO flight_reports (id, flight_id, pilot_id, va_id, flight_number, \
             origin, destination, actual_departure, actual_arrival, duration_minutes, \
             distance_nm, fuel_used_kg, landing_rate_fpm, telemetry, validation_status, \
             submitted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14::jsonb, $15, $16)",
        )
        .bind(report.id)
        .bind(report.flight_id)
        .bind(report.pilot_id)
        .bind(report.va_id)
        .bind(&report.flight_number)
        .bind(&report.origin)
        .bind(&report.destination)
        .bind(report.actual_departure)
        .bind(report.actual_arrival)
        .bind(report.duration_minutes)
        .bind(report.distance_nm)
        .bind(report.fuel_used_kg)
        .bind(report.landing_rate_fpm)
        .bind(&telemetry)
        .bind(report.validation_status.as_str())
        .bind(report.submitted_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| sqlx_err("report", e))?;

        tx.commit().await.map_err(|e| sqlx_err("report", e))?;
        Ok(TransitionOutcome::Applied(report.clone()))
    }

    async fn get_report(&self, id: Uuid) -> StoreResult<Option<FlightReport>> {
        let row: Option<ReportRow> = sqlx::query_as(&format!(
            "SELECT {} FROM flight_reports WHERE id = $1",
            REPORT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| sqlx_err("report", e))?;
        row.map(ReportRow::into_report).transpose()
    }

    async fn get_by_flight(&self, flight_id: Uuid) -> StoreResult<Option<FlightReport>> {
        let row: Option<ReportRow> = sqlx::query_as(&format!(
            "SELECT {} FROM flight_reports WHERE flight_id = $1",
            REPORT_COLUMNS
        ))
        .bind(flight_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| sqlx_err("report", e))?;
        row.map(ReportRow::into_report).transpose()
    }

    async fn list_for_va(
        &self,
        va_id: Uuid,
        status: Option<ValidationStatus>,
    ) -> StoreResult<Vec<FlightReport>> {
        let rows: Vec<ReportRow> = sqlx::query_as(&format!(
            "SELECT {} FROM flight_reports WHERE va_id = $1 \
             AND ($2::text IS NULL OR validation_status = $2) ORDER BY submitted_at DESC",
            REPORT_COLUMNS
        ))
        .bind(va_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| sqlx_err("report", e))?;
        rows.into_iter().map(ReportRow::into_report).collect()
    }

    async fn finalize(
        &self,
        id: Uuid,
        record: &ValidationRecord,
        credit: Option<StandingDelta>,
    ) -> StoreResult<TransitionOutcome<FlightReport, ValidationStatus>> {
        let mut tx = self.pool.begin().await.map_err(|e| sqlx_err("report", e))?;

        let row: Option<ReportRow> = sqlx::query_as(&format!(
            "UPDATE flight_reports SET validation_status = $2, points_awarded = $3, \
             validated_by = $4, admin_notes = $5, validated_at = $6 \
             WHERE id = $1 AND validation_status = 'pending' RETURNING {}",
            REPORT_COLUMNS
        ))
        .bind(id)
        .bind(record.status.as_str())
        .bind(record.points_awarded)
        .bind(record.validated_by)
        .bind(&record.admin_notes)
        .bind(record.validated_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| sqlx_err("report", e))?;

        let Some(row) = row else {
            tx.rollback().await.map_err(|e| sqlx_err("report", e))?;
            let status: Option<String> =
                sqlx::query_scalar("SELECT validation_status FROM flight_reports WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| sqlx_err("report", e))?;
            return match status {
                Some(s) => Ok(TransitionOutcome::Conflict(parse_validation(&s)?)),
                None => Ok(TransitionOutcome::Missing),
            };
        };

        // Verdict and credit land in the same transaction. The upsert is an
        // atomic add, so parallel approvals of different reports never lose
        // an increment.
        if let Some(delta) = credit {
            sqlx::query(
                "INSERT INTO pilot_standings (pilot_id, va_id, points, flights, hours) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (pilot_id, va_id) DO UPDATE SET \
                 points = pilot_standings.points + EXCLUDED.points, \
                 flights = pilot_standings.flights + EXCLUDED.flights, \
                 hours = pilot_standings.hours + EXCLUDED.hours",
            )
            .bind(row.pilot_id)
            .bind(row.va_id)
            .bind(delta.points)
            .bind(delta.flights)
            .bind(delta.hours)
            .execute(&mut *tx)
            .await
            .map_err(|e| sqlx_err("standing", e))?;
        }

        tx.commit().await.map_err(|e| sqlx_err("report", e))?;
        Ok(TransitionOutcome::Applied(row.into_report()?))
    }
}
