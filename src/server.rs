// HTTP API for the Ruby AI server
//
// Routes:
// - /health, /metrics
// - /api/waitlist (signup and count)
// - /api/accounts/... (registration, tier changes, entitlement checks,
//   quota consumption, reports, AI questions, saved properties, dashboard)

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::accounts::dashboard::DashboardBuilder;
use crate::accounts::manager::UPGRADE_MESSAGE;
use crate::accounts::{EntitlementManager, InMemoryAccountStore, ManagerError, Profile};
use crate::config::Config;
use crate::entitlements::{EntitlementError, Feature, Tier};
use crate::metrics;
use crate::waitlist::{InMemoryWaitlistStore, Waitlist, WaitlistError};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub manager: EntitlementManager,
    pub waitlist: Waitlist,
    pub metrics_enabled: bool,
}

impl AppState {
    /// State backed by in-memory stores
    pub fn in_memory(config: &Config) -> Self {
        Self {
            manager: EntitlementManager::new(
                Arc::new(InMemoryAccountStore::new()),
                config.entitlements.max_conflict_retries,
            ),
            waitlist: Waitlist::new(
                Arc::new(InMemoryWaitlistStore::new()),
                &config.waitlist.source,
            ),
            metrics_enabled: config.metrics.enabled,
        }
    }
}

/// Error response with a JSON `{ "error": ... }` body
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<ManagerError> for ApiError {
    fn from(err: ManagerError) -> Self {
        match &err {
            ManagerError::AccountNotFound(_) => ApiError::new(StatusCode::NOT_FOUND, err.to_string()),
            ManagerError::Entitlement(EntitlementError::QuotaExceeded { .. })
            | ManagerError::SavedPropertyLimit { .. } => ApiError::new(
                StatusCode::PAYMENT_REQUIRED,
                format!("{}. {}", err, UPGRADE_MESSAGE),
            ),
            ManagerError::Entitlement(_) => ApiError::new(StatusCode::BAD_REQUEST, err.to_string()),
            ManagerError::Conflict { .. } => ApiError::new(StatusCode::CONFLICT, err.to_string()),
            ManagerError::Store(_) => {
                error!("Account store error: {}", err);
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong. Please try again.",
                )
            }
        }
    }
}

impl From<WaitlistError> for ApiError {
    fn from(err: WaitlistError) -> Self {
        let status = match err {
            WaitlistError::EmailRequired | WaitlistError::InvalidEmail => StatusCode::BAD_REQUEST,
            WaitlistError::AlreadyRegistered => StatusCode::CONFLICT,
            WaitlistError::Storage(_) => {
                return ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to join waitlist. Please try again.",
                )
            }
        };
        ApiError::new(status, err.to_string())
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn json_body(body: std::result::Result<Json<Value>, JsonRejection>) -> ApiResult<Value> {
    body.map(|Json(v)| v)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e)))
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let mut app = Router::new().route("/health", get(health_handler));

    if state.metrics_enabled {
        app = app.route("/metrics", get(metrics_handler));
    }

    app.route("/api/waitlist", post(join_waitlist).get(waitlist_count))
        .route("/api/accounts", post(register_account))
        .route("/api/accounts/{id}/tier", put(set_tier))
        .route("/api/accounts/{id}/dashboard", get(dashboard))
        .route(
            "/api/accounts/{id}/entitlements/{feature}",
            get(check_entitlement),
        )
        .route("/api/accounts/{id}/usage/{feature}", post(consume_usage))
        .route("/api/accounts/{id}/reports", post(generate_report))
        .route("/api/accounts/{id}/ai-questions", post(ask_ai_question))
        .route("/api/accounts/{id}/saved-properties", post(save_property))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server
pub async fn serve(config: &Config, state: AppState) -> Result<()> {
    metrics::init().context("Failed to initialize metrics")?;

    let addr = config.server.socket_addr()?;
    info!("Starting Ruby AI server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind server")?;

    axum::serve(listener, router(state))
        .await
        .context("Server error")?;

    Ok(())
}

/// Health check endpoint
async fn health_handler() -> impl IntoResponse {
    StatusCode::OK
}

/// Metrics endpoint handler
async fn metrics_handler() -> Response {
    match metrics::gather_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text).into_response(),
        Err(e) => {
            error!("Failed to gather metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error gathering metrics: {}", e),
            )
                .into_response()
        }
    }
}

async fn join_waitlist(
    State(state): State<AppState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let body = json_body(body)?;
    let email = body.get("email").and_then(Value::as_str);

    state.waitlist.join(email).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Successfully joined the waitlist!",
    })))
}

async fn waitlist_count(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let count = state.waitlist.count().await.map_err(|e| {
        error!("Waitlist count error: {}", e);
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to get waitlist count")
    })?;

    Ok(Json(json!({ "count": count, "configured": true })))
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    id: String,
    email: String,
    full_name: Option<String>,
    #[serde(default)]
    tier: Tier,
}

async fn register_account(
    State(state): State<AppState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Profile>)> {
    let request: RegisterRequest = serde_json::from_value(json_body(body)?)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;

    let mut profile = Profile::new(&request.id, &request.email, today()).with_tier(request.tier);
    if let Some(name) = request.full_name.as_deref() {
        profile = profile.with_full_name(name);
    }

    state
        .manager
        .register(profile.clone())
        .await
        .map_err(|e| match e {
            ManagerError::Store(crate::accounts::store::StoreError::AlreadyExists(id)) => {
                ApiError::new(StatusCode::CONFLICT, format!("Account already exists: {}", id))
            }
            other => other.into(),
        })?;

    Ok((StatusCode::CREATED, Json(profile)))
}

#[derive(Debug, Deserialize)]
struct TierRequest {
    tier: Tier,
}

async fn set_tier(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let request: TierRequest = serde_json::from_value(json_body(body)?)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;

    state.manager.set_tier(&id, request.tier).await?;
    Ok(Json(json!({ "id": id, "tier": request.tier })))
}

async fn dashboard(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let dashboard = DashboardBuilder::new(state.manager.clone())
        .build(&id, today())
        .await?;

    serde_json::to_value(dashboard)
        .map(Json)
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

async fn check_entitlement(
    State(state): State<AppState>,
    Path((id, feature)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let decision = state.manager.check_named(&id, &feature, today()).await?;
    Ok(Json(json!(decision)))
}

async fn consume_usage(
    State(state): State<AppState>,
    Path((id, feature)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let feature: Feature = feature
        .parse()
        .map_err(|e: EntitlementError| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;

    let decision = state.manager.consume(&id, feature, today()).await?;
    Ok(Json(json!(decision)))
}

async fn ask_ai_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let decision = state.manager.ask_ai_question(&id, today()).await?;
    Ok(Json(json!(decision)))
}

#[derive(Debug, Deserialize)]
struct ReportRequest {
    address: String,
}

async fn generate_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let request: ReportRequest = serde_json::from_value(json_body(body)?)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;

    let report = state
        .manager
        .generate_report(&id, &request.address, today())
        .await?;
    Ok((StatusCode::CREATED, Json(json!(report))))
}

#[derive(Debug, Deserialize)]
struct SavePropertyRequest {
    address: String,
    notes: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

async fn save_property(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let request: SavePropertyRequest = serde_json::from_value(json_body(body)?)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;

    let property = state
        .manager
        .save_property(&id, &request.address, request.notes, request.tags, today())
        .await?;
    Ok((StatusCode::CREATED, Json(json!(property))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        router(AppState::in_memory(&Config::default()))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn register(app: &Router, id: &str, tier: &str) {
        let (status, _) = send(
            app,
            "POST",
            "/api/accounts",
            Some(json!({ "id": id, "email": format!("{}@example.com", id), "tier": tier })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_health() {
        let (status, _) = send(&app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_waitlist_flow() {
        let app = app();

        let (status, body) = send(
            &app,
            "POST",
            "/api/waitlist",
            Some(json!({ "email": "Buyer@Example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, body) = send(
            &app,
            "POST",
            "/api/waitlist",
            Some(json!({ "email": "buyer@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "This email is already on the waitlist");

        let (status, body) = send(&app, "GET", "/api/waitlist", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["configured"], true);
    }

    #[tokio::test]
    async fn test_waitlist_bad_input() {
        let app = app();

        let (status, body) = send(&app, "POST", "/api/waitlist", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Email is required");

        let (status, _) = send(&app, "POST", "/api/waitlist", Some(json!({ "email": 42 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            "POST",
            "/api/waitlist",
            Some(json!({ "email": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Please enter a valid email address");
    }

    #[tokio::test]
    async fn test_report_quota_over_http() {
        let app = app();
        register(&app, "user-1", "free").await;

        for _ in 0..5 {
            let (status, _) = send(&app, "POST", "/api/accounts/user-1/usage/report", None).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send(&app, "GET", "/api/accounts/user-1/entitlements/report", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["allowed"], false);
        assert_eq!(body["remaining"], 0);

        let (status, _) = send(&app, "POST", "/api/accounts/user-1/usage/report", None).await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    }

    #[tokio::test]
    async fn test_unknown_feature() {
        let app = app();
        register(&app, "user-1", "pro").await;

        let (status, body) = send(
            &app,
            "GET",
            "/api/accounts/user-1/entitlements/teleport",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["allowed"], false);

        let (status, _) = send(&app, "POST", "/api/accounts/user-1/usage/teleport", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "POST", "/api/accounts/user-1/usage/export_pdf", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_account() {
        let (status, _) = send(&app(), "GET", "/api/accounts/ghost/dashboard", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upgrade_unlocks_pdf_export() {
        let app = app();
        register(&app, "user-1", "free").await;

        let (_, body) = send(&app, "GET", "/api/accounts/user-1/entitlements/export_pdf", None).await;
        assert_eq!(body["allowed"], false);

        let (status, _) = send(
            &app,
            "PUT",
            "/api/accounts/user-1/tier",
            Some(json!({ "tier": "pro" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, "GET", "/api/accounts/user-1/entitlements/export_pdf", None).await;
        assert_eq!(body["allowed"], true);
        assert_eq!(body["tier"], "pro");
    }

    #[tokio::test]
    async fn test_dashboard_after_activity() {
        let app = app();
        register(&app, "user-1", "free").await;

        let (status, _) = send(
            &app,
            "POST",
            "/api/accounts/user-1/reports",
            Some(json!({ "address": "10 Harbor Way" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = send(
            &app,
            "POST",
            "/api/accounts/user-1/saved-properties",
            Some(json!({ "address": "10 Harbor Way", "tags": ["flip"] })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(&app, "GET", "/api/accounts/user-1/dashboard", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["usage"]["reports_used"], 1);
        assert_eq!(body["saved_property_count"], 1);
        assert_eq!(body["recent_reports"][0]["address"], "10 Harbor Way");
        assert_eq!(body["first_name"], "there");
    }

    #[tokio::test]
    async fn test_ai_question_quota() {
        let app = app();
        register(&app, "user-1", "free").await;

        for expected_remaining in (0..10).rev() {
            let (status, body) =
                send(&app, "POST", "/api/accounts/user-1/ai-questions", None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["feature"], "ai_question");
            assert_eq!(body["remaining"], expected_remaining);
        }

        let (status, body) = send(&app, "POST", "/api/accounts/user-1/ai-questions", None).await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("Quota exceeded for ai_question"));

        let (status, _) = send(&app, "POST", "/api/accounts/ghost/ai-questions", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let app = app();
        register(&app, "user-1", "free").await;

        let (status, _) = send(
            &app,
            "POST",
            "/api/accounts",
            Some(json!({ "id": "user-1", "email": "other@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let _ = metrics::init();
        let app = app();

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
