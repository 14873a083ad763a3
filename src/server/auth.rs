//! API key authentication.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::routes::AppState;

/// API key entry in config
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeyEntry {
    pub key: String,
    pub user_id: String,
}

/// Config file structure
#[derive(Debug, Clone, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    api_keys: Vec<ApiKeyEntry>,
}

/// Authenticated user info, added to request extensions after auth
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: String,
}

/// API key store - maps key -> AuthUser
#[derive(Debug, Clone, Default)]
pub struct ApiKeyStore {
    keys: HashMap<String, AuthUser>,
}

impl ApiKeyStore {
    pub fn from_entries(entries: impl IntoIterator<Item = ApiKeyEntry>) -> Self {
        let keys = entries
            .into_iter()
            .map(|entry| {
                (
                    entry.key,
                    AuthUser {
                        user_id: entry.user_id,
                    },
                )
            })
            .collect();
        Self { keys }
    }

    /// Load API keys from config file
    pub fn load(config_path: &Path) -> Self {
        match std::fs::read_to_string(config_path) {
            Ok(contents) => match serde_yaml::from_str::<ConfigFile>(&contents) {
                Ok(config) => {
                    let store = Self::from_entries(config.api_keys);
                    tracing::info!("Loaded {} API key(s)", store.len());
                    store
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read config file {}: {}",
                    config_path.display(),
                    e
                );
                tracing::warn!("No API keys loaded - all authenticated requests will fail");
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Validate an API key and return the associated user
    pub fn validate(&self, key: &str) -> Option<AuthUser> {
        self.keys.get(key).cloned()
    }
}

/// Auth error response
#[derive(Serialize)]
struct AuthError {
    error: &'static str,
    message: &'static str,
}

fn unauthorized(error: &'static str, message: &'static str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(AuthError { error, message })).into_response()
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let api_key = match auth_header.map(|h| h.strip_prefix("Bearer ")) {
        Some(Some(key)) => key,
        Some(None) => {
            return unauthorized("invalid_auth", "Authorization header must use Bearer scheme")
        }
        None => return unauthorized("missing_auth", "Authorization header required"),
    };

    match state.api_keys.validate(api_key) {
        Some(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        None => unauthorized("invalid_key", "Invalid API key"),
    }
}
