use axum::extract::{Query, State};
use axum::middleware;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use std::collections::HashSet;
use std::sync::Arc;

use crate::aggregate;
use crate::auth::{self, AuthedUser, UserStore};
use crate::cache::SheetCache;
use crate::error::{AppError, AppResult, LoggedJson};
use crate::sheets::{self, SheetsClient};
use crate::types::{
    AggregatedStats, ConnectRequest, ConnectResponse, EventListResponse, EventRow,
    EventsQueryParams, HealthResponse, LoginRequest, LoginResponse, StatsQueryParams,
};

pub struct AppState {
    pub cache: Arc<SheetCache>,
    pub sheets: SheetsClient,
    pub users: Arc<UserStore>,
    pub default_source: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/events", get(list_events))
        .route("/api/stats", get(stats))
        .route("/api/connect", post(connect))
        .layer(middleware::from_fn(auth::require_user));

    Router::new()
        .route("/health", get(health))
        .route("/api/login", post(login))
        .merge(protected)
        .layer(Extension(state.users.clone()))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// POST /api/login - verify credentials and report the resulting role. The
/// UI uses the role to decide which controls (Connect, source edit) to show.
async fn login(
    State(state): State<Arc<AppState>>,
    LoggedJson(req): LoggedJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let role = state.users.authenticate(&req.username, &req.password)?;
    tracing::info!(username = %req.username, role = %role, "login ok");
    Ok(Json(LoginResponse { role }))
}

/// GET /api/events - event ids available in the source, for the selector UI.
async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventsQueryParams>,
) -> AppResult<Json<EventListResponse>> {
    let source_id = params
        .source_id
        .unwrap_or_else(|| state.default_source.clone());
    let rows = load_rows(&state, &source_id).await?;
    let events = rows.iter().map(|r| r.id.clone()).collect();
    Ok(Json(EventListResponse { source_id, events }))
}

/// GET /api/stats - aggregate the selected events into combined totals.
/// No `ids` (or an empty list) selects every event in the source.
async fn stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatsQueryParams>,
) -> AppResult<Json<AggregatedStats>> {
    let source_id = params
        .source_id
        .unwrap_or_else(|| state.default_source.clone());
    let rows = load_rows(&state, &source_id).await?;

    let selected: HashSet<String> = params
        .ids
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    Ok(Json(aggregate::aggregate(&rows, &selected)))
}

/// POST /api/connect - admin-only: point the dashboard at a sheet (pasted URL
/// or bare id), prime the cache, and report how many rows it holds.
async fn connect(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthedUser>,
    LoggedJson(req): LoggedJson<ConnectRequest>,
) -> AppResult<Json<ConnectResponse>> {
    if !user.role.can_edit_sheet() {
        return Err(AppError::Forbidden(
            "admin role required to connect a sheet".to_string(),
        ));
    }
    let source_id = sheets::extract_sheet_id(&req.sheet).ok_or_else(|| {
        AppError::Validation("input does not look like a sheet id or sheet URL".to_string())
    })?;

    // Force a fresh snapshot for the newly connected source.
    state.cache.invalidate(&source_id).await;
    let rows = load_rows(&state, &source_id).await?;
    tracing::info!(
        username = %user.username,
        source_id = %source_id,
        rows = rows.len(),
        "sheet connected"
    );
    Ok(Json(ConnectResponse {
        source_id,
        row_count: rows.len(),
    }))
}

async fn load_rows(state: &AppState, source_id: &str) -> AppResult<Arc<Vec<EventRow>>> {
    let sheets = state.sheets.clone();
    let sid = source_id.to_string();
    let rows = state
        .cache
        .get_rows(source_id, || async move { sheets.fetch_rows(&sid).await })
        .await?;
    Ok(rows)
}
