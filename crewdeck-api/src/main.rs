use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crewdeck_api::{
    app,
    state::{AppState, AuthConfig},
};
use crewdeck_core::directory::{FleetDirectory, MembershipDirectory, RouteDirectory};
use crewdeck_core::repository::{FlightRepository, ReportRepository, StandingRepository};
use crewdeck_dispatch::{AircraftTypeTable, DispatchBridge, DispatchConfig, HttpPlanProvider};
use crewdeck_flights::FlightManager;
use crewdeck_pirep::{ReportAssembler, ValidationWorkflow};
use crewdeck_store::{
    DbClient, MemoryStore, PostgresDirectory, PostgresFlightRepository, PostgresReportRepository,
    PostgresStandingRepository,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type Stores = (
    Arc<dyn FlightRepository>,
    Arc<dyn ReportRepository>,
    Arc<dyn StandingRepository>,
    Arc<dyn MembershipDirectory>,
    Arc<dyn RouteDirectory>,
    Arc<dyn FleetDirectory>,
);

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crewdeck_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = crewdeck_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting CrewDeck API on port {}", config.server.port);

    let (flight_repo, report_repo, standing_repo, memberships, routes, fleet): Stores =
        match &config.database.url {
            Some(url) => {
                let db = DbClient::connect(&config.database, url)
                    .await
                    .expect("Failed to connect to Postgres");
                db.migrate().await.expect("Failed to run migrations");
                (
                    Arc::new(PostgresFlightRepository::new(db.pool.clone())),
                    Arc::new(PostgresReportRepository::new(db.pool.clone())),
                    Arc::new(PostgresStandingRepository::new(db.pool.clone())),
                    Arc::new(PostgresDirectory::new(db.pool.clone())),
                    Arc::new(PostgresDirectory::new(db.pool.clone())),
                    Arc::new(PostgresDirectory::new(db.pool.clone())),
                )
            }
            None => {
                tracing::warn!("No database configured, falling back to the in-memory store");
                let store = Arc::new(MemoryStore::new());
                (
                    store.clone(),
                    store.clone(),
                    store.clone(),
                    store.clone(),
                    store.clone(),
                    store,
                )
            }
        };

    let flights = Arc::new(FlightManager::new(
        flight_repo.clone(),
        memberships.clone(),
        routes.clone(),
    ));
    let assembler = Arc::new(ReportAssembler::new(
        flight_repo.clone(),
        report_repo.clone(),
        routes.clone(),
    ));
    let validation = Arc::new(ValidationWorkflow::new(
        report_repo.clone(),
        memberships.clone(),
    ));

    let provider = Arc::new(HttpPlanProvider::new(
        config.dispatch.provider_base_url.clone(),
    ));
    let bridge = DispatchBridge::new(
        provider,
        DispatchConfig {
            provider_base_url: config.dispatch.provider_base_url.clone(),
            trusted_origin: config.dispatch.trusted_origin.clone(),
            resolution_timeout: Duration::from_secs(config.dispatch.resolution_timeout_seconds),
            close_grace: Duration::from_secs(config.dispatch.close_grace_seconds),
        },
    );

    // SSE Broadcast Channel
    let (events_tx, _) = tokio::sync::broadcast::channel(256);

    let app_state = AppState {
        flights,
        assembler,
        validation,
        bridge,
        flight_repo,
        report_repo,
        standing_repo,
        memberships,
        routes,
        fleet,
        aircraft_types: Arc::new(AircraftTypeTable::with_defaults()),
        events_tx,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
            allow_dev_tokens: config.auth.allow_dev_tokens,
        },
        portal_origin: config.dispatch.portal_origin.clone(),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
