use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use borealis_client::HttpPricingClient;
use borealis_core::api::{ApiError, PricingApi, SpaceWeatherApi};
use borealis_core::domain::events::HistoricalCatalog;
use borealis_core::domain::geomag::{flatten_forecast, HistoryAnalytics};
use borealis_core::domain::policy::{PolicyInputs, QuoteRequest, ShieldingLevel};
use borealis_core::domain::quote::QuoteOutcome;
use borealis_core::flows::WorkflowStep;
use borealis_core::workflow::QuoteWorkflow;
use secrecy::SecretString;
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct Recorded {
    bodies: Arc<Mutex<Vec<(String, Value)>>>,
    authorization: Arc<Mutex<Option<String>>>,
    limit: Arc<Mutex<Option<String>>>,
}

impl Recorded {
    fn bodies(&self) -> Vec<(String, Value)> {
        self.bodies.lock().expect("bodies lock").clone()
    }
}

async fn run_live(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    *recorded.authorization.lock().expect("auth lock") = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let asset = body["asset_value_millions"].as_f64().unwrap_or_default();
    recorded.bodies.lock().expect("bodies lock").push(("/api/run".to_string(), body));
    Json(json!({
        "pricing_result": {
            "policy_status": "APPROVED",
            "final_premium_usd": asset * 5_000.0,
            "base_premium_usd": asset * 4_000.0
        },
        "individual_risk": { "incident_probability": 0.004, "risk_category": "LOW" },
        "portfolio_assessment": { "strategic_recommendation": "Maintain current exposure" }
    }))
}

async fn run_historical(State(recorded): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    let kp = body["historical_kp"].as_f64().unwrap_or_default();
    recorded.bodies.lock().expect("bodies lock").push(("/api/run-historical".to_string(), body));
    Json(json!({
        "pricing_result": {
            "policy_status": "REJECTED",
            "rejection_reason": "Storm exposure exceeds appetite"
        },
        "worst_case_kp": kp
    }))
}

async fn daily_geomag(
    State(recorded): State<Recorded>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    *recorded.limit.lock().expect("limit lock") = params.get("limit").cloned();
    Json(json!({
        "days": [
            { "date": "2024-05-09", "ap": 12.0, "kp_values": [2.0, 3.0], "kp_max": 3.0, "kp_avg": 2.5 },
            { "date": "2024-05-10", "ap": 207.0, "kp_values": [8.0, 9.0], "kp_max": 9.0, "kp_avg": 7.5 },
            { "date": "2024-05-11", "kp_max": null, "kp_avg": null }
        ]
    }))
}

async fn forecast() -> Json<Value> {
    Json(json!({
        "issued": "2024 May 10 1230 UTC",
        "observed_max_kp": 8.33,
        "expected_max_kp": 7.67,
        "days": ["2024-05-10", "2024-05-11", "2024-05-12"],
        "breakdown": [
            { "period": "00-03UT", "values": [4.0, 7.67, 3.0] },
            { "period": "03-06UT", "values": [5.0, 6.0, 2.67] }
        ],
        "rationale": "CME arrival expected"
    }))
}

async fn portfolio() -> Json<Value> {
    Json(json!({ "items": [{ "asset": "SAT-1" }, { "asset": "SAT-2" }] }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub listener");
    let address = listener.local_addr().expect("stub address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{address}")
}

async fn backend() -> (String, Recorded) {
    let recorded = Recorded::default();
    let router = Router::new()
        .route("/api/run", post(run_live))
        .route("/api/run-historical", post(run_historical))
        .route("/api/daily-geomag", get(daily_geomag))
        .route("/api/forecast-3day", get(forecast))
        .route("/api/portfolio", get(portfolio))
        .route("/api/health", get(health))
        .with_state(recorded.clone());
    (spawn(router).await, recorded)
}

fn client(base_url: &str) -> HttpPricingClient {
    HttpPricingClient::new(base_url, Duration::from_secs(5), None).expect("client")
}

fn inputs() -> PolicyInputs {
    PolicyInputs {
        asset_value_millions: 10.0,
        shielding_level: ShieldingLevel::Hardened,
        years_in_orbit: 3,
        adjustment_factor: 1.2,
    }
}

#[tokio::test]
async fn live_quote_posts_flat_inputs_to_run_endpoint() {
    let (base_url, recorded) = backend().await;

    let result = client(&base_url)
        .run_quote(&QuoteRequest::live(inputs()))
        .await
        .expect("live quote");

    assert_eq!(result.outcome(), QuoteOutcome::Approved { premium_usd: Some(50_000.0) });
    let bodies = recorded.bodies();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0].0, "/api/run");
    assert_eq!(
        bodies[0].1,
        json!({
            "asset_value_millions": 10.0,
            "shielding_level": "Hardened",
            "years_in_orbit": 3,
            "adjustment_factor": 1.2
        })
    );
}

#[tokio::test]
async fn historical_quote_echoes_event_fields() {
    let (base_url, recorded) = backend().await;
    let catalog = HistoricalCatalog::builtin();
    let event = catalog.find("bastille day storm 2004").expect("catalog event");

    let result = client(&base_url)
        .run_quote(&QuoteRequest::historical(inputs(), event.to_override()))
        .await
        .expect("historical quote");

    assert!(result.is_rejected());
    assert_eq!(result.worst_case_kp, Some(event.actual_kp));
    let bodies = recorded.bodies();
    assert_eq!(bodies[0].0, "/api/run-historical");
    assert_eq!(bodies[0].1["historical_kp"], json!(event.actual_kp));
    assert_eq!(bodies[0].1["historical_event_name"], json!("Bastille Day Storm 2004"));
    assert_eq!(bodies[0].1["historical_date"], json!(event.date));
}

#[tokio::test]
async fn api_key_is_sent_as_bearer_token() {
    let (base_url, recorded) = backend().await;
    let client = HttpPricingClient::new(
        base_url,
        Duration::from_secs(5),
        Some(SecretString::from("stub-token".to_string())),
    )
    .expect("client");

    client.run_quote(&QuoteRequest::live(inputs())).await.expect("live quote");

    assert_eq!(
        recorded.authorization.lock().expect("auth lock").as_deref(),
        Some("Bearer stub-token")
    );
}

#[tokio::test]
async fn space_weather_endpoints_decode() {
    let (base_url, recorded) = backend().await;
    let client = client(&base_url);

    let history = client.daily_geomag(30).await.expect("daily geomag");
    assert_eq!(recorded.limit.lock().expect("limit lock").as_deref(), Some("30"));
    assert_eq!(history.days.len(), 3);
    let analytics = HistoryAnalytics::from_days(&history.days);
    assert_eq!(analytics.total_days, 2);
    assert_eq!(analytics.max_kp, 9.0);
    assert_eq!(analytics.storm_days, 1);

    let forecast = client.forecast_three_day().await.expect("forecast");
    let points = flatten_forecast(&forecast);
    assert_eq!(points.len(), 6);
    assert_eq!(points[0].timestamp, "2024-05-10T00:00:00Z");

    let portfolio = client.portfolio().await.expect("portfolio");
    assert_eq!(portfolio.items.len(), 2);

    let health = client.health().await.expect("health");
    assert_eq!(health["status"], "ok");
}

#[tokio::test]
async fn error_status_surfaces_backend_detail() {
    let router = Router::new().route(
        "/api/run",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": "Workflow error: crew failed" })),
            )
        }),
    );
    let base_url = spawn(router).await;

    let error = client(&base_url)
        .run_quote(&QuoteRequest::live(inputs()))
        .await
        .expect_err("500 is an error");

    assert_eq!(
        error,
        ApiError::Status {
            endpoint: "/api/run",
            status: 500,
            body: "Workflow error: crew failed".to_string()
        }
    );
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let router = Router::new().route("/api/health", get(|| async { "definitely not json" }));
    let base_url = spawn(router).await;

    let error = client(&base_url).health().await.expect_err("plain text is not JSON");

    assert!(matches!(error, ApiError::Decode { endpoint: "/api/health", .. }));
}

#[tokio::test]
async fn slow_backend_maps_to_timeout() {
    let router = Router::new().route(
        "/api/portfolio",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(json!({ "items": [] }))
        }),
    );
    let base_url = spawn(router).await;
    let client = HttpPricingClient::new(base_url, Duration::from_millis(100), None).expect("client");

    let error = client.portfolio().await.expect_err("request should time out");

    assert!(matches!(error, ApiError::Timeout { .. }));
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = listener.local_addr().expect("address");
    drop(listener);

    let error = client(&format!("http://{address}"))
        .health()
        .await
        .expect_err("nothing listens on the port");

    assert!(matches!(error, ApiError::Network { endpoint: "/api/health", .. }));
}

#[tokio::test]
async fn workflow_reviews_quote_through_http_client() {
    let (base_url, _) = backend().await;
    let workflow = QuoteWorkflow::new(Arc::new(client(&base_url)));

    let run = workflow.submit(inputs(), None).await;

    assert_eq!(
        run.steps_visited(),
        vec![WorkflowStep::Configuring, WorkflowStep::Running, WorkflowStep::Reviewed]
    );
    let result = run.result.expect("reviewed result");
    assert_eq!(result.payable_premium_usd(), Some(50_000.0));
}
