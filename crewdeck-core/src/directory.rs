use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::repository::StoreResult;

/// Role a member holds within one VA. Roles are a property of the
/// membership, never of the auth token.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VaRole {
    Owner,
    Admin,
    Pilot,
}

impl VaRole {
    /// Only owners and admins may rule on pilot reports.
    pub fn can_validate(&self) -> bool {
        matches!(self, VaRole::Owner | VaRole::Admin)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub pilot_id: Uuid,
    pub va_id: Uuid,
    pub role: VaRole,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: Uuid,
    pub va_id: Uuid,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub distance_nm: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetAircraft {
    pub id: Uuid,
    pub va_id: Uuid,
    /// ICAO type designator, e.g. "B738".
    pub type_code: String,
    pub name: String,
}

/// Lookup seam for VA membership. Administration of memberships happens
/// elsewhere; this pipeline only reads.
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    async fn membership(&self, pilot_id: Uuid, va_id: Uuid) -> StoreResult<Option<Membership>>;
}

#[async_trait]
pub trait RouteDirectory: Send + Sync {
    async fn route(&self, route_id: Uuid) -> StoreResult<Option<Route>>;
}

#[async_trait]
pub trait FleetDirectory: Send + Sync {
    async fn aircraft(&self, fleet_id: Uuid) -> StoreResult<Option<FleetAircraft>>;
}
