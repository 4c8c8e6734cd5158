pub mod directory;
pub mod events;
pub mod flight;
pub mod report;
pub mod repository;
pub mod standing;
pub mod telemetry;
