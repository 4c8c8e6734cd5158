use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::provider::{dispatch_form, PlanData, PlanLocator, PlanProvider, PlanSpec};
use crate::token::{canonicalize_origin, CorrelationToken};

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub provider_base_url: String,
    /// Push messages are accepted only from this origin.
    pub trusted_origin: String,
    /// Hard cap on the whole token exchange.
    pub resolution_timeout: Duration,
    /// How long after the dispatch surface closes before falling back.
    pub close_grace: Duration,
}

/// Resolution state of one pending generation. `Awaiting → Fulfilled` and
/// `Awaiting → Expired` race; `send_if_modified` on the owning watch channel
/// is the first-writer-wins flag, so exactly one transition ever lands.
#[derive(Debug, Clone)]
pub enum GenerationState {
    Awaiting,
    /// Close grace ran out with nothing remembered; a handle must be
    /// supplied explicitly. Still resolvable.
    ManualRequired,
    Fulfilled(PlanLocator),
    Expired,
}

struct Pending {
    flight_id: Uuid,
    pilot_id: Uuid,
    state: watch::Sender<GenerationState>,
}

/// Everything a client needs to open the provider's dispatch surface.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchTicket {
    pub token: CorrelationToken,
    pub provider_url: String,
    pub fields: Vec<(String, String)>,
    pub expires_at: DateTime<Utc>,
}

/// Provider push message, relayed by the portal's callback endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PushPayload {
    pub token: String,
    pub plan_id: Option<String>,
    pub user_handle: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Resolved,
    /// Untrusted origin, unknown token, already-resolved token or malformed
    /// payload. Deliberately indistinguishable to the sender.
    Ignored,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Aircraft type code is not usable: {0}")]
    InvalidAircraftCode(String),

    #[error("Plan generation timed out or the correlation is no longer active")]
    GenerationTimeout,

    #[error("No automatic resolution path left; supply a provider account handle")]
    ManualResolutionRequired,

    #[error("Plan could not be retrieved from the provider: {0}")]
    PlanUnavailable(String),
}

/// Coordinates plan generation against the external provider: issues
/// correlation tokens, races the provider's push callback against the
/// close-detection fallback, enforces the hard timeout, and fetches the
/// resolved plan. Callers gate `request_plan` on flight state; the bridge
/// itself never touches flight records.
#[derive(Clone)]
pub struct DispatchBridge {
    provider: Arc<dyn PlanProvider>,
    config: Arc<DispatchConfig>,
    pending: Arc<Mutex<HashMap<String, Pending>>>,
    /// Provider account handles by pilot, refreshed on every successful
    /// handle-based resolution.
    remembered: Arc<Mutex<HashMap<Uuid, String>>>,
}

impl DispatchBridge {
    pub fn new(provider: Arc<dyn PlanProvider>, config: DispatchConfig) -> Self {
        Self {
            provider,
            config: Arc::new(config),
            pending: Arc::new(Mutex::new(HashMap::new())),
            remembered: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a pending generation and hand back the dispatch ticket.
    /// Returns immediately; resolution is observed via `await_resolution`.
    pub fn request_plan(
        &self,
        flight_id: Uuid,
        pilot_id: Uuid,
        page_origin: &str,
        spec: PlanSpec,
    ) -> Result<DispatchTicket, DispatchError> {
        let code = spec.aircraft_code.trim();
        if code.len() < 3 {
            return Err(DispatchError::InvalidAircraftCode(
                spec.aircraft_code.clone(),
            ));
        }

        let now = Utc::now();
        let token = CorrelationToken::issue(page_origin, now);
        let (state, _) = watch::channel(GenerationState::Awaiting);
        self.pending.lock().expect("lock poisoned").insert(
            token.as_str().to_string(),
            Pending {
                flight_id,
                pilot_id,
                state,
            },
        );
        self.spawn_expiry_watchdog(token.as_str().to_string());

        let form = dispatch_form(&self.config.provider_base_url, &spec);
        tracing::info!(
            "Plan generation {} opened for flight {} ({} -> {}, {})",
            token,
            flight_id,
            spec.origin,
            spec.destination,
            code
        );
        Ok(DispatchTicket {
            token,
            provider_url: form.url,
            fields: form.fields,
            expires_at: now + chrono::Duration::from_std(self.config.resolution_timeout)
                .unwrap_or_else(|_| chrono::Duration::seconds(120)),
        })
    }

    /// Provider push channel. Only messages from the trusted origin are
    /// considered; everything else is dropped without side effects.
    pub fn deliver_push(&self, origin: &str, payload: &PushPayload) -> PushOutcome {
        if canonicalize_origin(origin) != canonicalize_origin(&self.config.trusted_origin) {
            tracing::warn!(
                "Discarding push for {} from untrusted origin {}",
                payload.token,
                origin
            );
            return PushOutcome::Ignored;
        }

        let locator = match (&payload.plan_id, &payload.user_handle) {
            (Some(id), _) => PlanLocator::Id(id.clone()),
            (None, Some(handle)) => PlanLocator::Handle(handle.clone()),
            (None, None) => {
                tracing::warn!("Discarding push for {}: no locator in payload", payload.token);
                return PushOutcome::Ignored;
            }
        };

        let won_for_pilot = {
            let pending = self.pending.lock().expect("lock poisoned");
            match pending.get(&payload.token) {
                Some(entry) if try_fulfill(&entry.state, &locator) => Some(entry.pilot_id),
                Some(_) => {
                    tracing::info!("Push for {} lost the resolution race", payload.token);
                    None
                }
                None => {
                    tracing::info!("Push for unrecognized token {}", payload.token);
                    None
                }
            }
        };

        match won_for_pilot {
            Some(pilot_id) => {
                if let PlanLocator::Handle(handle) = &locator {
                    self.remember_handle(pilot_id, handle);
                }
                tracing::info!("Token {} resolved by provider push", payload.token);
                PushOutcome::Resolved
            }
            None => PushOutcome::Ignored,
        }
    }

    /// The dispatch surface was reported closed. After the grace period,
    /// an unresolved token falls back to the pilot's remembered provider
    /// handle, or moves to ManualRequired when there is none.
    pub fn surface_closed(&self, token: &str) -> Result<(), DispatchError> {
        let pilot_id = {
            let pending = self.pending.lock().expect("lock poisoned");
            pending
                .get(token)
                .map(|p| p.pilot_id)
                .ok_or(DispatchError::GenerationTimeout)?
        };

        let pending = self.pending.clone();
        let remembered = self.remembered.clone();
        let grace = self.config.close_grace;
        let token = token.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;

            let fallback = remembered.lock().expect("lock poisoned").get(&pilot_id).cloned();
            let guard = pending.lock().expect("lock poisoned");
            let Some(entry) = guard.get(&token) else {
                return;
            };
            match fallback {
                Some(handle) => {
                    let locator = PlanLocator::Handle(handle);
                    if try_fulfill(&entry.state, &locator) {
                        tracing::info!("Token {} resolved via remembered handle", token);
                    }
                }
                None => {
                    let moved = entry.state.send_if_modified(|s| {
                        if matches!(s, GenerationState::Awaiting) {
                            *s = GenerationState::ManualRequired;
                            true
                        } else {
                            false
                        }
                    });
                    if moved {
                        tracing::info!("Token {} needs manual resolution", token);
                    }
                }
            }
        });
        Ok(())
    }

    /// Explicit resolution with a provider account handle, remembered for
    /// future close-detection fallbacks.
    pub fn resolve_manual(&self, token: &str, handle: &str) -> Result<(), DispatchError> {
        let handle = handle.trim();
        if handle.is_empty() {
            return Err(DispatchError::ManualResolutionRequired);
        }

        let pilot_id = {
            let pending = self.pending.lock().expect("lock poisoned");
            let entry = pending.get(token).ok_or(DispatchError::GenerationTimeout)?;
            let locator = PlanLocator::Handle(handle.to_string());
            // A live entry that refuses fulfilment was already fulfilled;
            // expired entries are removed from the map by the watchdog.
            try_fulfill(&entry.state, &locator).then_some(entry.pilot_id)
        };
        if let Some(pilot_id) = pilot_id {
            self.remember_handle(pilot_id, handle);
            tracing::info!("Token {} resolved manually", token);
        }
        Ok(())
    }

    /// Flight a live token was opened for, while the correlation is active.
    pub fn flight_for(&self, token: &str) -> Option<Uuid> {
        self.pending
            .lock()
            .expect("lock poisoned")
            .get(token)
            .map(|p| p.flight_id)
    }

    /// Pilot who opened a live token. Callers use this to refuse other
    /// pilots driving a token they happen to hold the string for.
    pub fn pilot_for(&self, token: &str) -> Option<Uuid> {
        self.pending
            .lock()
            .expect("lock poisoned")
            .get(token)
            .map(|p| p.pilot_id)
    }

    /// Single-resolution future for one token. Pends while the token is
    /// awaiting, then reports exactly one outcome of the resolution race.
    pub async fn await_resolution(&self, token: &str) -> Result<PlanLocator, DispatchError> {
        let mut rx = {
            let pending = self.pending.lock().expect("lock poisoned");
            pending
                .get(token)
                .map(|p| p.state.subscribe())
                .ok_or(DispatchError::GenerationTimeout)?
        };

        loop {
            let state = rx.borrow_and_update().clone();
            match state {
                GenerationState::Fulfilled(locator) => return Ok(locator),
                GenerationState::Expired => return Err(DispatchError::GenerationTimeout),
                GenerationState::ManualRequired => {
                    return Err(DispatchError::ManualResolutionRequired)
                }
                GenerationState::Awaiting => {
                    if rx.changed().await.is_err() {
                        // Watchdog dropped the entry; read the final state.
                        let last = rx.borrow().clone();
                        return match last {
                            GenerationState::Fulfilled(locator) => Ok(locator),
                            _ => Err(DispatchError::GenerationTimeout),
                        };
                    }
                }
            }
        }
    }

    /// Retrieve the plan behind a resolved locator.
    pub async fn fetch_plan(&self, locator: &PlanLocator) -> Result<PlanData, DispatchError> {
        self.provider
            .fetch_plan(locator)
            .await
            .map_err(|e| DispatchError::PlanUnavailable(e.to_string()))
    }

    fn remember_handle(&self, pilot_id: Uuid, handle: &str) {
        self.remembered
            .lock()
            .expect("lock poisoned")
            .insert(pilot_id, handle.to_string());
    }

    /// At the deadline the token stops being recognized: mark unresolved
    /// entries expired, then drop the entry either way. Late pushes find
    /// nothing and are discarded.
    fn spawn_expiry_watchdog(&self, token: String) {
        let pending = self.pending.clone();
        let timeout = self.config.resolution_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let mut guard = pending.lock().expect("lock poisoned");
            if let Some(entry) = guard.remove(&token) {
                let expired = entry.state.send_if_modified(|s| {
                    if matches!(
                        s,
                        GenerationState::Awaiting | GenerationState::ManualRequired
                    ) {
                        *s = GenerationState::Expired;
                        true
                    } else {
                        false
                    }
                });
                if expired {
                    tracing::warn!(
                        "Plan generation {} for flight {} expired unresolved",
                        token,
                        entry.flight_id
                    );
                }
            }
        });
    }
}

fn try_fulfill(state: &watch::Sender<GenerationState>, locator: &PlanLocator) -> bool {
    state.send_if_modified(|s| {
        if matches!(
            s,
            GenerationState::Awaiting | GenerationState::ManualRequired
        ) {
            *s = GenerationState::Fulfilled(locator.clone());
            true
        } else {
            false
        }
    })
}
