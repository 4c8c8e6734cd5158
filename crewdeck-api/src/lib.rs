use axum::{http::Method, middleware, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod dispatch;
pub mod error;
pub mod flights;
pub mod live;
pub mod reports;
pub mod standings;
pub mod state;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    // Everything behind the bearer token. The provider callback stays
    // outside: it authenticates by Origin, not by token.
    let protected = Router::new()
        .merge(flights::routes())
        .merge(dispatch::routes())
        .merge(reports::routes())
        .merge(standings::routes())
        .merge(live::routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::pilot_auth_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(auth::routes())
        .merge(dispatch::public_routes())
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
