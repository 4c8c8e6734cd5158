use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use crewdeck_api::auth::PilotClaims;
use crewdeck_api::state::{AppState, AuthConfig};
use crewdeck_core::directory::{FleetAircraft, Membership, Route, VaRole};
use crewdeck_dispatch::{AircraftTypeTable, DispatchBridge, DispatchConfig, MockPlanProvider};
use crewdeck_flights::FlightManager;
use crewdeck_pirep::{ReportAssembler, ValidationWorkflow};
use crewdeck_store::MemoryStore;

const SECRET: &str = "portal-test-secret";
const PROVIDER_ORIGIN: &str = "https://planner.example.com";

struct TestPortal {
    app: Router,
    va_id: Uuid,
    pilot_id: Uuid,
    admin_id: Uuid,
    route_id: Uuid,
    fleet_id: Uuid,
}

fn build_portal() -> TestPortal {
    let store = Arc::new(MemoryStore::new());
    let va_id = Uuid::new_v4();
    let pilot_id = Uuid::new_v4();
    let admin_id = Uuid::new_v4();
    let route_id = Uuid::new_v4();
    let fleet_id = Uuid::new_v4();

    store.seed_membership(Membership {
        pilot_id,
        va_id,
        role: VaRole::Pilot,
        active: true,
    });
    store.seed_membership(Membership {
        pilot_id: admin_id,
        va_id,
        role: VaRole::Admin,
        active: true,
    });
    store.seed_route(Route {
        id: route_id,
        va_id,
        flight_number: "CDK101".to_string(),
        origin: "EGLL".to_string(),
        destination: "OMDB".to_string(),
        distance_nm: Some(2980.0),
    });
    store.seed_aircraft(FleetAircraft {
        id: fleet_id,
        va_id,
        type_code: "B738".to_string(),
        name: "Boeing 737-800".to_string(),
    });

    let flights = Arc::new(FlightManager::new(
        store.clone(),
        store.clone(),
        store.clone(),
    ));
    let assembler = Arc::new(ReportAssembler::new(
        store.clone(),
        store.clone(),
        store.clone(),
    ));
    let validation = Arc::new(ValidationWorkflow::new(store.clone(), store.clone()));

    let bridge = DispatchBridge::new(
        Arc::new(MockPlanProvider),
        DispatchConfig {
            provider_base_url: PROVIDER_ORIGIN.to_string(),
            trusted_origin: PROVIDER_ORIGIN.to_string(),
            resolution_timeout: Duration::from_secs(120),
            close_grace: Duration::from_secs(5),
        },
    );

    let (events_tx, _) = tokio::sync::broadcast::channel(64);

    let state = AppState {
        flights,
        assembler,
        validation,
        bridge,
        flight_repo: store.clone(),
        report_repo: store.clone(),
        standing_repo: store.clone(),
        memberships: store.clone(),
        routes: store.clone(),
        fleet: store.clone(),
        aircraft_types: Arc::new(AircraftTypeTable::with_defaults()),
        events_tx,
        auth: AuthConfig {
            secret: SECRET.to_string(),
            expiration: 3600,
            allow_dev_tokens: true,
        },
        portal_origin: "http://localhost:8080".to_string(),
    };

    TestPortal {
        app: crewdeck_api::app(state),
        va_id,
        pilot_id,
        admin_id,
        route_id,
        fleet_id,
    }
}

fn bearer(pilot_id: Uuid) -> String {
    let claims = PilotClaims {
        sub: pilot_id,
        exp: (Utc::now() + ChronoDuration::hours(1)).timestamp() as usize,
    };
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {}", token)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn send_callback(app: &Router, origin: Option<&str>, body: Value) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/v1/dispatch/callback")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(origin) = origin {
        builder = builder.header(header::ORIGIN, origin);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn reserve(portal: &TestPortal, auth: &str) -> Value {
    let (status, flight) = send(
        &portal.app,
        "POST",
        "/v1/flights",
        Some(auth),
        Some(json!({
            "va_id": portal.va_id,
            "route_id": portal.route_id,
            "fleet_id": portal.fleet_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    flight
}

fn report_body() -> Value {
    let arrival = Utc::now();
    let departure = arrival - ChronoDuration::minutes(420);
    json!({
        "actual_departure": departure,
        "actual_arrival": arrival,
        "duration_minutes": 420,
        "distance_nm": 1200.0,
        "fuel_used_kg": 8300.0,
        "landing_rate_fpm": -40.0,
        "telemetry": [
            {
                "timestamp": departure,
                "latitude": 51.47,
                "longitude": -0.45,
                "altitude_ft": 2400.0,
                "ground_speed_kt": 180.0,
                "vertical_speed_fpm": 2100.0
            },
            {
                "timestamp": arrival,
                "latitude": 25.25,
                "longitude": 55.36,
                "altitude_ft": 38000.0,
                "ground_speed_kt": 455.0,
                "vertical_speed_fpm": 0.0
            }
        ]
    })
}

#[tokio::test]
async fn test_health_is_public() {
    let portal = build_portal();
    let (status, _) = send(&portal.app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let portal = build_portal();
    let (status, _) = send(&portal.app, "GET", "/v1/flights", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_dev_token_mint_round_trip() {
    let portal = build_portal();

    let (status, body) = send(
        &portal.app,
        "POST",
        "/v1/auth/token",
        None,
        Some(json!({ "pilot_id": portal.pilot_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, flights) = send(
        &portal.app,
        "GET",
        "/v1/flights",
        Some(&format!("Bearer {}", token)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(flights.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_full_flight_lifecycle() {
    let portal = build_portal();
    let pilot = bearer(portal.pilot_id);
    let admin = bearer(portal.admin_id);

    let flight = reserve(&portal, &pilot).await;
    assert_eq!(flight["status"], "reserved");
    assert_eq!(flight["flight_number"], "CDK101");
    assert!(flight["plan_id"].is_null());
    let flight_id = flight["id"].as_str().unwrap().to_string();

    let (status, started) = send(
        &portal.app,
        "POST",
        &format!("/v1/flights/{}/start", flight_id),
        Some(&pilot),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["status"], "in_progress");
    assert!(!started["departure_time"].is_null());

    let (status, report) = send(
        &portal.app,
        "POST",
        &format!("/v1/flights/{}/report", flight_id),
        Some(&pilot),
        Some(report_body()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(report["validation_status"], "pending");
    assert_eq!(report["origin"], "EGLL");
    assert_eq!(report["destination"], "OMDB");
    assert_eq!(report["telemetry_summary"]["sample_count"], 2);
    assert_eq!(report["telemetry_summary"]["max_altitude_ft"], 38000.0);
    let report_id = report["id"].as_str().unwrap().to_string();

    // Filing the report completed the flight in the same step.
    let (_, completed) = send(
        &portal.app,
        "GET",
        &format!("/v1/flights/{}", flight_id),
        Some(&pilot),
        None,
    )
    .await;
    assert_eq!(completed["status"], "completed");

    let (status, validated) = send(
        &portal.app,
        "POST",
        &format!("/v1/reports/{}/validate", report_id),
        Some(&admin),
        Some(json!({ "verdict": "approved", "admin_notes": "clean flight" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(validated["validation_status"], "approved");
    // 1200 nm at -40 fpm: 100 base + 50 + 100 distance + 50 + 100 landing.
    assert_eq!(validated["points_awarded"], 400);
    assert_eq!(
        validated["validated_by"].as_str().unwrap(),
        portal.admin_id.to_string()
    );

    let (status, standing) = send(
        &portal.app,
        "GET",
        &format!("/v1/vas/{}/pilots/{}/standing", portal.va_id, portal.pilot_id),
        Some(&pilot),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(standing["points"], 400);
    assert_eq!(standing["flights"], 1);
    assert_eq!(standing["hours"], 7.0);

    let (status, board) = send(
        &portal.app,
        "GET",
        &format!("/v1/vas/{}/leaderboard", portal.va_id),
        Some(&pilot),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let board = board.as_array().unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(
        board[0]["pilot_id"].as_str().unwrap(),
        portal.pilot_id.to_string()
    );
}

#[tokio::test]
async fn test_reserve_requires_active_membership() {
    let portal = build_portal();
    let stranger = bearer(Uuid::new_v4());

    let (status, body) = send(
        &portal.app,
        "POST",
        "/v1/flights",
        Some(&stranger),
        Some(json!({ "va_id": portal.va_id, "route_id": portal.route_id })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "not_eligible");
    assert_eq!(body["stage"], "reservation");
}

#[tokio::test]
async fn test_start_rejects_double_start() {
    let portal = build_portal();
    let pilot = bearer(portal.pilot_id);
    let flight = reserve(&portal, &pilot).await;
    let uri = format!("/v1/flights/{}/start", flight["id"].as_str().unwrap());

    let (status, _) = send(&portal.app, "POST", &uri, Some(&pilot), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&portal.app, "POST", &uri, Some(&pilot), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_transition");
    assert_eq!(body["stage"], "reservation");
}

#[tokio::test]
async fn test_cancel_is_terminal_and_reserved_only() {
    let portal = build_portal();
    let pilot = bearer(portal.pilot_id);

    let flight = reserve(&portal, &pilot).await;
    let flight_id = flight["id"].as_str().unwrap().to_string();
    let (status, cancelled) = send(
        &portal.app,
        "POST",
        &format!("/v1/flights/{}/cancel", flight_id),
        Some(&pilot),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    // Cancelled is terminal: it cannot be started afterwards.
    let (status, _) = send(
        &portal.app,
        "POST",
        &format!("/v1/flights/{}/start", flight_id),
        Some(&pilot),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // An in-progress flight cannot be cancelled.
    let second = reserve(&portal, &pilot).await;
    let second_id = second["id"].as_str().unwrap().to_string();
    send(
        &portal.app,
        "POST",
        &format!("/v1/flights/{}/start", second_id),
        Some(&pilot),
        None,
    )
    .await;
    let (status, _) = send(
        &portal.app,
        "POST",
        &format!("/v1/flights/{}/cancel", second_id),
        Some(&pilot),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_dispatch_push_and_plan_fetch() {
    let portal = build_portal();
    let pilot = bearer(portal.pilot_id);
    let flight = reserve(&portal, &pilot).await;
    let flight_id = flight["id"].as_str().unwrap().to_string();

    let (status, ticket) = send(
        &portal.app,
        "POST",
        &format!("/v1/flights/{}/dispatch", flight_id),
        Some(&pilot),
        Some(json!({ "aircraft": "Boeing 737-800 Zibo" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let token = ticket["token"].as_str().unwrap().to_string();
    assert!(token.starts_with("CDK1-"));
    assert_eq!(
        ticket["provider_url"],
        format!("{}/system/dispatch.php", PROVIDER_ORIGIN)
    );
    let fields = ticket["fields"].as_array().unwrap();
    assert!(fields
        .iter()
        .any(|f| f[0] == "type" && f[1] == "B738"));
    assert!(fields.iter().any(|f| f[0] == "orig" && f[1] == "EGLL"));

    let (status, outcome) = send_callback(
        &portal.app,
        Some(PROVIDER_ORIGIN),
        json!({ "token": token, "plan_id": "plan_abc123" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], "resolved");

    // Later pushes lose the race and change nothing.
    let (_, second) = send_callback(
        &portal.app,
        Some(PROVIDER_ORIGIN),
        json!({ "token": token, "plan_id": "plan_other" }),
    )
    .await;
    assert_eq!(second["outcome"], "ignored");

    let (status, plan) = send(
        &portal.app,
        "GET",
        &format!("/v1/dispatch/{}/plan", token),
        Some(&pilot),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plan["plan_id"], "plan_abc123");

    // The winning plan id is recorded on the flight and survives re-fetch.
    let (_, stored) = send(
        &portal.app,
        "GET",
        &format!("/v1/flights/{}", flight_id),
        Some(&pilot),
        None,
    )
    .await;
    assert_eq!(stored["plan_id"], "plan_abc123");

    let (status, refetched) = send(
        &portal.app,
        "GET",
        &format!("/v1/flights/{}/plan", flight_id),
        Some(&pilot),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(refetched["plan_id"], "plan_abc123");
}

#[tokio::test]
async fn test_dispatch_callback_from_unknown_origin_is_ignored() {
    let portal = build_portal();
    let pilot = bearer(portal.pilot_id);
    let flight = reserve(&portal, &pilot).await;
    let flight_id = flight["id"].as_str().unwrap().to_string();

    let (_, ticket) = send(
        &portal.app,
        "POST",
        &format!("/v1/flights/{}/dispatch", flight_id),
        Some(&pilot),
        Some(json!({ "aircraft": "B738" })),
    )
    .await;
    let token = ticket["token"].as_str().unwrap().to_string();

    let (status, outcome) = send_callback(
        &portal.app,
        Some("https://evil.example.net"),
        json!({ "token": token, "plan_id": "plan_evil" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], "ignored");

    let (_, outcome) = send_callback(
        &portal.app,
        None,
        json!({ "token": token, "plan_id": "plan_headless" }),
    )
    .await;
    assert_eq!(outcome["outcome"], "ignored");

    let (_, stored) = send(
        &portal.app,
        "GET",
        &format!("/v1/flights/{}", flight_id),
        Some(&pilot),
        None,
    )
    .await;
    assert!(stored["plan_id"].is_null());
}

#[tokio::test]
async fn test_dispatch_rejects_unresolvable_aircraft() {
    let portal = build_portal();
    let pilot = bearer(portal.pilot_id);
    let flight = reserve(&portal, &pilot).await;

    let (status, body) = send(
        &portal.app,
        "POST",
        &format!("/v1/flights/{}/dispatch", flight["id"].as_str().unwrap()),
        Some(&pilot),
        Some(json!({ "aircraft": "Sopwith Camel" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "invalid_aircraft_code");
    assert_eq!(body["stage"], "dispatch");
}

#[tokio::test]
async fn test_dispatch_requires_reserved_flight() {
    let portal = build_portal();
    let pilot = bearer(portal.pilot_id);
    let flight = reserve(&portal, &pilot).await;
    let flight_id = flight["id"].as_str().unwrap().to_string();

    send(
        &portal.app,
        "POST",
        &format!("/v1/flights/{}/start", flight_id),
        Some(&pilot),
        None,
    )
    .await;

    let (status, body) = send(
        &portal.app,
        "POST",
        &format!("/v1/flights/{}/dispatch", flight_id),
        Some(&pilot),
        Some(json!({ "aircraft": "B738" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_transition");
    assert_eq!(body["stage"], "dispatch");
}

#[tokio::test]
async fn test_unknown_dispatch_token_times_out() {
    let portal = build_portal();
    let pilot = bearer(portal.pilot_id);

    let (status, body) = send(
        &portal.app,
        "GET",
        "/v1/dispatch/CDK1-0-xxxx-deadbeef/plan",
        Some(&pilot),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["code"], "generation_timeout");
    assert_eq!(body["stage"], "dispatch");
}

#[tokio::test]
async fn test_manual_resolution_supplies_handle() {
    let portal = build_portal();
    let pilot = bearer(portal.pilot_id);
    let flight = reserve(&portal, &pilot).await;
    let flight_id = flight["id"].as_str().unwrap().to_string();

    let (_, ticket) = send(
        &portal.app,
        "POST",
        &format!("/v1/flights/{}/dispatch", flight_id),
        Some(&pilot),
        Some(json!({ "aircraft": "B738" })),
    )
    .await;
    let token = ticket["token"].as_str().unwrap().to_string();

    let (status, _) = send(
        &portal.app,
        "POST",
        &format!("/v1/dispatch/{}/closed", token),
        Some(&pilot),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, _) = send(
        &portal.app,
        "POST",
        &format!("/v1/dispatch/{}/resolve", token),
        Some(&pilot),
        Some(json!({ "user_handle": "pilot77" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, plan) = send(
        &portal.app,
        "GET",
        &format!("/v1/dispatch/{}/plan", token),
        Some(&pilot),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plan["plan_id"], "latest_pilot77");

    let (_, stored) = send(
        &portal.app,
        "GET",
        &format!("/v1/flights/{}", flight_id),
        Some(&pilot),
        None,
    )
    .await;
    assert_eq!(stored["plan_id"], "latest_pilot77");
}

#[tokio::test]
async fn test_dispatch_token_is_driven_only_by_its_pilot() {
    let portal = build_portal();
    let pilot = bearer(portal.pilot_id);
    let other = bearer(Uuid::new_v4());
    let flight = reserve(&portal, &pilot).await;
    let flight_id = flight["id"].as_str().unwrap().to_string();

    let (_, ticket) = send(
        &portal.app,
        "POST",
        &format!("/v1/flights/{}/dispatch", flight_id),
        Some(&pilot),
        Some(json!({ "aircraft": "B738" })),
    )
    .await;
    let token = ticket["token"].as_str().unwrap().to_string();

    // Holding the token string is not enough: another logged-in pilot can
    // neither close, resolve, nor collect the plan.
    let (status, body) = send(
        &portal.app,
        "POST",
        &format!("/v1/dispatch/{}/closed", token),
        Some(&other),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");
    assert_eq!(body["stage"], "dispatch");

    let (status, _) = send(
        &portal.app,
        "POST",
        &format!("/v1/dispatch/{}/resolve", token),
        Some(&other),
        Some(json!({ "user_handle": "hijacker" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &portal.app,
        "GET",
        &format!("/v1/dispatch/{}/plan", token),
        Some(&other),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Nothing stuck to the flight, and the owner can still resolve.
    let (_, stored) = send(
        &portal.app,
        "GET",
        &format!("/v1/flights/{}", flight_id),
        Some(&pilot),
        None,
    )
    .await;
    assert!(stored["plan_id"].is_null());

    let (status, _) = send(
        &portal.app,
        "POST",
        &format!("/v1/dispatch/{}/resolve", token),
        Some(&pilot),
        Some(json!({ "user_handle": "pilot77" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, plan) = send(
        &portal.app,
        "GET",
        &format!("/v1/dispatch/{}/plan", token),
        Some(&pilot),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plan["plan_id"], "latest_pilot77");
}

#[tokio::test]
async fn test_validation_requires_staff_role() {
    let portal = build_portal();
    let pilot = bearer(portal.pilot_id);
    let flight = reserve(&portal, &pilot).await;
    let flight_id = flight["id"].as_str().unwrap().to_string();

    send(
        &portal.app,
        "POST",
        &format!("/v1/flights/{}/start", flight_id),
        Some(&pilot),
        None,
    )
    .await;
    let (_, report) = send(
        &portal.app,
        "POST",
        &format!("/v1/flights/{}/report", flight_id),
        Some(&pilot),
        Some(report_body()),
    )
    .await;

    let (status, body) = send(
        &portal.app,
        "POST",
        &format!("/v1/reports/{}/validate", report["id"].as_str().unwrap()),
        Some(&pilot),
        Some(json!({ "verdict": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");
    assert_eq!(body["stage"], "validation");
}

#[tokio::test]
async fn test_report_queue_listing_and_points_override() {
    let portal = build_portal();
    let pilot = bearer(portal.pilot_id);
    let admin = bearer(portal.admin_id);
    let flight = reserve(&portal, &pilot).await;
    let flight_id = flight["id"].as_str().unwrap().to_string();

    send(
        &portal.app,
        "POST",
        &format!("/v1/flights/{}/start", flight_id),
        Some(&pilot),
        None,
    )
    .await;
    let (_, report) = send(
        &portal.app,
        "POST",
        &format!("/v1/flights/{}/report", flight_id),
        Some(&pilot),
        Some(report_body()),
    )
    .await;
    let report_id = report["id"].as_str().unwrap().to_string();

    // The queue is staff-only.
    let (status, _) = send(
        &portal.app,
        "GET",
        &format!("/v1/vas/{}/reports", portal.va_id),
        Some(&pilot),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, queue) = send(
        &portal.app,
        "GET",
        &format!("/v1/vas/{}/reports?status=pending", portal.va_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue.as_array().unwrap().len(), 1);

    let (status, _) = send(
        &portal.app,
        "GET",
        &format!("/v1/vas/{}/reports?status=bogus", portal.va_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, validated) = send(
        &portal.app,
        "POST",
        &format!("/v1/reports/{}/validate", report_id),
        Some(&admin),
        Some(json!({ "verdict": "approved", "points_override": 250 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(validated["points_awarded"], 250);

    let (_, pending) = send(
        &portal.app,
        "GET",
        &format!("/v1/vas/{}/reports?status=pending", portal.va_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(pending.as_array().unwrap().len(), 0);

    let (_, standing) = send(
        &portal.app,
        "GET",
        &format!("/v1/vas/{}/pilots/{}/standing", portal.va_id, portal.pilot_id),
        Some(&pilot),
        None,
    )
    .await;
    assert_eq!(standing["points"], 250);
}

#[tokio::test]
async fn test_validation_is_effective_once() {
    let portal = build_portal();
    let pilot = bearer(portal.pilot_id);
    let admin = bearer(portal.admin_id);
    let flight = reserve(&portal, &pilot).await;
    let flight_id = flight["id"].as_str().unwrap().to_string();

    send(
        &portal.app,
        "POST",
        &format!("/v1/flights/{}/start", flight_id),
        Some(&pilot),
        None,
    )
    .await;
    let (_, report) = send(
        &portal.app,
        "POST",
        &format!("/v1/flights/{}/report", flight_id),
        Some(&pilot),
        Some(report_body()),
    )
    .await;
    let uri = format!("/v1/reports/{}/validate", report["id"].as_str().unwrap());

    let (status, _) = send(
        &portal.app,
        "POST",
        &uri,
        Some(&admin),
        Some(json!({ "verdict": "rejected", "admin_notes": "telemetry gap" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The verdict holds; a second attempt conflicts and the rejection never
    // credited the pilot.
    let (status, body) = send(
        &portal.app,
        "POST",
        &uri,
        Some(&admin),
        Some(json!({ "verdict": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "already_validated");

    let (_, standing) = send(
        &portal.app,
        "GET",
        &format!("/v1/vas/{}/pilots/{}/standing", portal.va_id, portal.pilot_id),
        Some(&pilot),
        None,
    )
    .await;
    assert_eq!(standing["points"], 0);
    assert_eq!(standing["flights"], 0);
}

#[tokio::test]
async fn test_second_report_is_rejected() {
    let portal = build_portal();
    let pilot = bearer(portal.pilot_id);
    let flight = reserve(&portal, &pilot).await;
    let flight_id = flight["id"].as_str().unwrap().to_string();

    send(
        &portal.app,
        "POST",
        &format!("/v1/flights/{}/start", flight_id),
        Some(&pilot),
        None,
    )
    .await;
    let uri = format!("/v1/flights/{}/report", flight_id);

    let (status, _) = send(&portal.app, "POST", &uri, Some(&pilot), Some(report_body())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&portal.app, "POST", &uri, Some(&pilot), Some(report_body())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_transition");
    assert_eq!(body["stage"], "pirep");
}

#[tokio::test]
async fn test_position_reports_only_while_in_progress() {
    let portal = build_portal();
    let pilot = bearer(portal.pilot_id);
    let flight = reserve(&portal, &pilot).await;
    let flight_id = flight["id"].as_str().unwrap().to_string();
    let uri = format!("/v1/flights/{}/position", flight_id);
    let fix = json!({
        "latitude": 50.03,
        "longitude": 8.57,
        "altitude_ft": 34000.0,
        "ground_speed_kt": 452.0,
    });

    let (status, _) = send(&portal.app, "POST", &uri, Some(&pilot), Some(fix.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);

    send(
        &portal.app,
        "POST",
        &format!("/v1/flights/{}/start", flight_id),
        Some(&pilot),
        None,
    )
    .await;

    let (status, _) = send(&portal.app, "POST", &uri, Some(&pilot), Some(fix)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
}
