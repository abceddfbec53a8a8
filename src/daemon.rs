use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Json, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::domains::assignment::{AssignUsersCommand, AssignedUser};
use crate::error::{ErrorKind, PlanAssignError, Result};
use crate::providers::sqlite::SqliteGateway;
use crate::services::assignment::AssignmentService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AssignmentService>,
    /// Cancelled on shutdown; each command runs under a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(service: AssignmentService) -> Self {
        Self {
            service: Arc::new(service),
            shutdown: CancellationToken::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignedUsersQuery {
    #[serde(default)]
    plan_id: i32,
    #[serde(default)]
    procedure_id: i32,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users", get(list_users))
        .route(
            "/PlanProcedureUser/assign",
            get(assigned_users).post(assign_users),
        )
        .route("/PlanProcedureUser", get(assigned_users))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: format!(
            "{}+{}",
            env!("CARGO_PKG_VERSION"),
            env!("PLAN_ASSIGN_GIT_SHA")
        ),
    })
}

async fn assign_users(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AssignUsersCommand>, JsonRejection>,
) -> impl IntoResponse {
    // Malformed bodies share the 400 `{ error }` shape with validation failures.
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return error_response(PlanAssignError::BadRequest(rejection.body_text()));
        }
    };
    let cancel = state.shutdown.child_token();
    match state.service.assign_users(payload, &cancel).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => error_response(err),
    }
}

async fn assigned_users(
    State(state): State<AppState>,
    Query(query): Query<AssignedUsersQuery>,
) -> impl IntoResponse {
    match state
        .service
        .assigned_users(query.plan_id, query.procedure_id)
        .await
    {
        Ok(users) => {
            let users: Vec<AssignedUser> = users.into_iter().map(AssignedUser::from).collect();
            (StatusCode::OK, Json(users)).into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn list_users(State(state): State<AppState>) -> impl IntoResponse {
    match state.service.list_users().await {
        Ok(users) => {
            let users: Vec<AssignedUser> = users.into_iter().map(AssignedUser::from).collect();
            (StatusCode::OK, Json(users)).into_response()
        }
        Err(err) => error_response(err),
    }
}

fn error_response(err: PlanAssignError) -> Response {
    let status = match err.kind() {
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Unhandled => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

pub async fn run_with_shutdown<F>(config: &Config, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let gateway = SqliteGateway::new(&config.database).await?;
    tracing::info!(
        sqlite_path = %config.database.sqlite_path,
        "Assignment store ready"
    );

    let state = AppState::new(AssignmentService::new(Arc::new(gateway)));
    let shutdown_token = state.shutdown.clone();
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| PlanAssignError::Runtime(e.to_string()))?;
    tracing::info!(%addr, "plan-assign listening");

    let shutdown = async move {
        shutdown.await;
        tracing::info!("Shutdown requested; cancelling in-flight assignments");
        shutdown_token.cancel();
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| PlanAssignError::Runtime(e.to_string()))?;

    Ok(())
}
