//! HTTP routes for the settings server.
//!
//! # Endpoints
//!
//! - `GET /health`: Health check endpoint (no auth required)
//! - `GET /settings`, `PUT /settings`: the caller's whole settings document
//! - `GET /mcps`, `POST /mcps`: list or add custom MCP servers
//! - `PUT /mcps/{name}`, `DELETE /mcps/{name}`: edit or remove one by name

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, put},
    Extension, Json, Router,
};
use crudsync_core::models::{
    DeleteStatus, McpCreateRequest, McpDeleteResponse, McpUpdateRequest, MCP_SERVERS,
};
use crudsync_core::{McpServer, Settings};
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use super::auth::{auth_middleware, ApiKeyStore, AuthUser};
use super::storage::{SettingsStorage, StorageError};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub api_keys: Arc<ApiKeyStore>,
    pub storage: Arc<SettingsStorage>,
    /// Serializes read-modify-write cycles on settings documents.
    pub write_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(api_keys: ApiKeyStore, storage: SettingsStorage) -> Self {
        Self {
            api_keys: Arc::new(api_keys),
            storage: Arc::new(storage),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn load(&self, user_id: &str) -> Result<Settings, ApiError> {
        Ok(self.storage.load(user_id)?.unwrap_or_default())
    }

    fn store(&self, user_id: &str, mut settings: Settings) -> Result<Settings, ApiError> {
        settings.touch();
        self.storage.save(user_id, &settings)?;
        Ok(settings)
    }
}

/// Error body, `{"detail": "..."}`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    fn not_found(name: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("MCP '{}' not found", name))
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InvalidUserId(_) => Self::new(StatusCode::BAD_REQUEST, e.to_string()),
            _ => {
                tracing::error!("Storage error: {}", e);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to access settings")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint (no auth required)
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn get_settings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Settings>, ApiError> {
    Ok(Json(state.load(&user.user_id)?))
}

async fn put_settings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(settings): Json<Settings>,
) -> Result<Json<Settings>, ApiError> {
    for mcp in settings.mcps() {
        mcp.check()
            .map_err(|e| ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, e))?;
    }

    let _guard = state.write_lock.lock().await;
    let stored = state.store(&user.user_id, settings)?;
    tracing::debug!(user = %user.user_id, "settings replaced");
    Ok(Json(stored))
}

async fn list_mcps(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<McpServer>>, ApiError> {
    let settings = state.load(&user.user_id)?;
    Ok(Json(settings.mcps().to_vec()))
}

async fn create_mcp(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<McpCreateRequest>,
) -> Result<(StatusCode, Json<McpServer>), ApiError> {
    let server = McpServer::from(request);
    server
        .check()
        .map_err(|e| ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, e))?;

    let _guard = state.write_lock.lock().await;
    let settings = state.load(&user.user_id)?;
    if settings.find_mcp(&server.name).is_some() {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            format!("MCP '{}' already exists", server.name),
        ));
    }

    let next = MCP_SERVERS.rebuild(&settings, |items| items.push(server.clone()));
    state.store(&user.user_id, next)?;
    tracing::info!(user = %user.user_id, mcp = %server.name, "MCP created");
    Ok((StatusCode::CREATED, Json(server)))
}

async fn update_mcp(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(name): Path<String>,
    Json(update): Json<McpUpdateRequest>,
) -> Result<Json<McpServer>, ApiError> {
    let _guard = state.write_lock.lock().await;
    let settings = state.load(&user.user_id)?;

    let mut server = settings
        .find_mcp(&name)
        .cloned()
        .ok_or_else(|| ApiError::not_found(&name))?;
    server.apply_update(update);
    server
        .check()
        .map_err(|e| ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, e))?;

    let next = MCP_SERVERS.rebuild(&settings, |items| {
        if let Some(entry) = items.iter_mut().find(|m| m.name == name) {
            *entry = server.clone();
        }
    });
    state.store(&user.user_id, next)?;
    tracing::info!(user = %user.user_id, mcp = %name, "MCP updated");
    Ok(Json(server))
}

async fn delete_mcp(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(name): Path<String>,
) -> Result<Json<McpDeleteResponse>, ApiError> {
    let _guard = state.write_lock.lock().await;
    let settings = state.load(&user.user_id)?;

    if settings.find_mcp(&name).is_none() {
        return Ok(Json(McpDeleteResponse {
            status: DeleteStatus::NotFound,
        }));
    }

    let next = MCP_SERVERS.rebuild_collapsing(&settings, |items| items.retain(|m| m.name != name));
    state.store(&user.user_id, next)?;
    tracing::info!(user = %user.user_id, mcp = %name, "MCP deleted");
    Ok(Json(McpDeleteResponse {
        status: DeleteStatus::Deleted,
    }))
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    // Public routes (no auth)
    let public_routes = Router::new().route("/health", get(health));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/settings", get(get_settings).put(put_settings))
        .route("/mcps", get(list_mcps).post(create_mcp))
        .route("/mcps/", get(list_mcps).post(create_mcp))
        .route("/mcps/{name}", put(update_mcp).delete(delete_mcp))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
