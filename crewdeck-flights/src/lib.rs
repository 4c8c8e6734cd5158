pub mod manager;

pub use manager::{FlightError, FlightManager};
