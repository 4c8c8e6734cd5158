pub mod app_config;
pub mod database;
pub mod directory_repo;
pub mod flight_repo;
pub mod memory;
pub mod report_repo;
pub mod standing_repo;

pub use app_config::Config;
pub use database::DbClient;
pub use directory_repo::PostgresDirectory;
pub use flight_repo::PostgresFlightRepository;
pub use memory::MemoryStore;
pub use report_repo::PostgresReportRepository;
pub use standing_repo::PostgresStandingRepository;

use crewdeck_core::repository::StoreError;

/// Map a sqlx error onto the storage seam, surfacing unique violations as
/// duplicates of the named entity.
pub(crate) fn sqlx_err(entity: &'static str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::Duplicate(entity);
        }
    }
    StoreError::Backend(err.to_string())
}
