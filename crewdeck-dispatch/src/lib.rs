pub mod aircraft;
pub mod bridge;
pub mod provider;
pub mod token;

pub use aircraft::{AircraftTypeTable, TypeResolution};
pub use bridge::{
    DispatchBridge, DispatchConfig, DispatchError, DispatchTicket, PushOutcome, PushPayload,
};
pub use provider::{
    FuelUnits, HttpPlanProvider, MockPlanProvider, PlanData, PlanLocator, PlanProvider, PlanSpec,
};
pub use token::CorrelationToken;
