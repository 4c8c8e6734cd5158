use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// How to address a plan at the provider: directly by identifier, or by the
/// account handle that produced it (resolved to that account's latest plan).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanLocator {
    Id(String),
    Handle(String),
}

/// The retrieved plan, flattened to what the portal shows plus the raw
/// provider document for anything else.
#[derive(Debug, Clone, Serialize)]
pub struct PlanData {
    pub plan_id: String,
    pub origin: String,
    pub destination: String,
    pub route: String,
    pub distance_nm: f64,
    pub fuel_plan_kg: Option<f64>,
    pub raw: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Plan not available: {0}")]
    Unavailable(String),

    #[error("Provider transport error: {0}")]
    Transport(String),
}

/// Read seam against the external plan provider.
#[async_trait]
pub trait PlanProvider: Send + Sync {
    async fn fetch_plan(&self, locator: &PlanLocator) -> Result<PlanData, ProviderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelUnits {
    Kgs,
    Lbs,
}

impl FuelUnits {
    pub fn as_str(&self) -> &'static str {
        match self {
            FuelUnits::Kgs => "KGS",
            FuelUnits::Lbs => "LBS",
        }
    }
}

/// Everything the provider's dispatch surface needs to prepare a plan.
/// Origin and destination come from the reserved route, never the client.
#[derive(Debug, Clone)]
pub struct PlanSpec {
    pub origin: String,
    pub destination: String,
    pub aircraft_code: String,
    pub flight_number: String,
    pub units: FuelUnits,
    pub cost_index: Option<u32>,
}

/// The form the portal client submits to open the provider's dispatch page.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchForm {
    pub url: String,
    pub fields: Vec<(String, String)>,
}

/// Build the dispatch submission for the provider's dispatch endpoint.
pub fn dispatch_form(base_url: &str, spec: &PlanSpec) -> DispatchForm {
    let (airline, fltnum) = split_flight_number(&spec.flight_number);
    let mut fields = vec![
        ("orig".to_string(), spec.origin.clone()),
        ("dest".to_string(), spec.destination.clone()),
        ("type".to_string(), spec.aircraft_code.clone()),
        ("airline".to_string(), airline),
        ("fltnum".to_string(), fltnum),
        ("units".to_string(), spec.units.as_str().to_string()),
    ];
    if let Some(ci) = spec.cost_index {
        fields.push(("civalue".to_string(), ci.to_string()));
    }
    DispatchForm {
        url: format!("{}/system/dispatch.php", base_url.trim_end_matches('/')),
        fields,
    }
}

/// "CDK101" → ("CDK", "101"). Numbers without a prefix keep an empty airline.
fn split_flight_number(flight_number: &str) -> (String, String) {
    let split = flight_number
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(flight_number.len());
    (
        flight_number[..split].to_string(),
        flight_number[split..].to_string(),
    )
}

/// Real provider adapter over its JSON API.
pub struct HttpPlanProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPlanProvider {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl PlanProvider for HttpPlanProvider {
    async fn fetch_plan(&self, locator: &PlanLocator) -> Result<PlanData, ProviderError> {
        let base = self.base_url.trim_end_matches('/');
        let request = match locator {
            PlanLocator::Id(id) => self.client.get(format!("{}/api/v1/plans/{}", base, id)),
            PlanLocator::Handle(handle) => self
                .client
                .get(format!("{}/api/v1/plans/latest", base))
                .query(&[("user", handle.as_str())]),
        };

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Unavailable(format!(
                "provider returned {}",
                response.status()
            )));
        }

        let doc: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("unreadable plan document: {}", e)))?;
        parse_plan_document(doc)
    }
}

/// Pull the fields the portal needs out of a provider plan document.
fn parse_plan_document(doc: serde_json::Value) -> Result<PlanData, ProviderError> {
    let plan_id = doc
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ProviderError::Unavailable("plan document has no id".to_string()))?
        .to_string();
    let origin = string_at(&doc, &["origin", "icao_code"])
        .ok_or_else(|| ProviderError::Unavailable("plan document has no origin".to_string()))?;
    let destination = string_at(&doc, &["destination", "icao_code"]).ok_or_else(|| {
        ProviderError::Unavailable("plan document has no destination".to_string())
    })?;
    let route = string_at(&doc, &["general", "route"]).unwrap_or_default();
    let distance_nm = doc
        .get("general")
        .and_then(|g| g.get("air_distance"))
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    let fuel_plan_kg = doc
        .get("fuel")
        .and_then(|f| f.get("plan_ramp"))
        .and_then(|v| v.as_f64());

    Ok(PlanData {
        plan_id,
        origin,
        destination,
        route,
        distance_nm,
        fuel_plan_kg,
        raw: doc,
    })
}

fn string_at(doc: &serde_json::Value, path: &[&str]) -> Option<String> {
    let mut cursor = doc;
    for key in path {
        cursor = cursor.get(key)?;
    }
    cursor.as_str().map(|s| s.to_string())
}

/// Deterministic stand-in used by tests and dev mode; answers every locator
/// except the magic id "missing".
pub struct MockPlanProvider;

#[async_trait]
impl PlanProvider for MockPlanProvider {
    async fn fetch_plan(&self, locator: &PlanLocator) -> Result<PlanData, ProviderError> {
        let plan_id = match locator {
            PlanLocator::Id(id) if id == "missing" => {
                return Err(ProviderError::Unavailable("no such plan".to_string()));
            }
            PlanLocator::Id(id) => id.clone(),
            PlanLocator::Handle(handle) => format!("latest_{}", handle),
        };
        Ok(PlanData {
            plan_id,
            origin: "EGLL".to_string(),
            destination: "EHAM".to_string(),
            route: "BPK7G BPK UL620 REDFA REDF1A".to_string(),
            distance_nm: 200.0,
            fuel_plan_kg: Some(4200.0),
            raw: serde_json::json!({"mock": true}),
        })
    }
}
