use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crewdeck_core::directory::MembershipDirectory;
use crewdeck_core::report::{FlightReport, ValidationRecord, ValidationStatus};
use crewdeck_core::repository::{ReportRepository, StoreError, TransitionOutcome};
use crewdeck_core::standing::StandingDelta;

use crate::scoring;

/// Staff decision on a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approved,
    Rejected,
}

impl Verdict {
    fn into_status(self) -> ValidationStatus {
        match self {
            Verdict::Approved => ValidationStatus::Approved,
            Verdict::Rejected => ValidationStatus::Rejected,
        }
    }
}

/// Effective-once review of pending reports. Role checks go through the
/// membership directory, never the auth token; the verdict and any standing
/// credit commit together in the repository.
pub struct ValidationWorkflow {
    reports: Arc<dyn ReportRepository>,
    memberships: Arc<dyn MembershipDirectory>,
}

impl ValidationWorkflow {
    pub fn new(
        reports: Arc<dyn ReportRepository>,
        memberships: Arc<dyn MembershipDirectory>,
    ) -> Self {
        Self {
            reports,
            memberships,
        }
    }

    /// Transition: pending → approved/rejected. Approval credits the
    /// pilot's standing with the override points or the scoring engine's
    /// suggestion; rejection records a zero-point verdict and leaves the
    /// standing untouched.
    pub async fn validate(
        &self,
        report_id: Uuid,
        admin_id: Uuid,
        verdict: Verdict,
        notes: Option<String>,
        points_override: Option<i32>,
    ) -> Result<FlightReport, ValidationError> {
        let report = self
            .reports
            .get_report(report_id)
            .await?
            .ok_or(ValidationError::ReportNotFound(report_id))?;

        let membership = self.memberships.membership(admin_id, report.va_id).await?;
        let allowed = membership
            .map(|m| m.active && m.role.can_validate())
            .unwrap_or(false);
        if !allowed {
            return Err(ValidationError::Forbidden);
        }

        let points = match verdict {
            Verdict::Approved => points_override
                .unwrap_or_else(|| scoring::suggested_points(report.distance_nm, report.landing_rate_fpm)),
            Verdict::Rejected => 0,
        };
        let record = ValidationRecord {
            status: verdict.into_status(),
            points_awarded: points,
            validated_by: admin_id,
            admin_notes: notes,
            validated_at: Utc::now(),
        };
        let credit = match verdict {
            Verdict::Approved => Some(StandingDelta {
                points: i64::from(points),
                flights: 1,
                hours: report.hours_flown(),
            }),
            Verdict::Rejected => None,
        };

        match self.reports.finalize(report_id, &record, credit).await? {
            TransitionOutcome::Applied(updated) => {
                tracing::info!(
                    "Report {} {} by {} ({} points)",
                    report_id,
                    updated.validation_status.as_str(),
                    admin_id,
                    points
                );
                Ok(updated)
            }
            TransitionOutcome::Conflict(_) => Err(ValidationError::AlreadyValidated(report_id)),
            TransitionOutcome::Missing => Err(ValidationError::ReportNotFound(report_id)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Report not found: {0}")]
    ReportNotFound(Uuid),

    #[error("Report already validated: {0}")]
    AlreadyValidated(Uuid),

    #[error("Caller is not an active owner or admin of this VA")]
    Forbidden,

    #[error(transparent)]
    Store(#[from] StoreError),
}
