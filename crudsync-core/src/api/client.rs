//! Thin JSON-over-HTTP client shared by the per-resource APIs.

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::RemoteError;

/// Authenticated HTTP client for a crudsync server.
#[derive(Debug, Clone)]
pub struct ApiClient {
    server_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(server_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            api_key: api_key.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Returns the server URL as configured.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Returns the API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// GET; `Ok(None)` when the server answers with an empty or `null` body.
    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<Option<R>, RemoteError> {
        self.request::<(), R>(Method::GET, path, None).await
    }

    pub async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<R>, RemoteError> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<R>, RemoteError> {
        self.request(Method::PUT, path, Some(body)).await
    }

    /// DELETE, ignoring any response body.
    pub async fn delete(&self, path: &str) -> Result<(), RemoteError> {
        self.request::<(), serde_json::Value>(Method::DELETE, path, None)
            .await
            .map(|_| ())
    }

    async fn request<B: Serialize, R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Option<R>, RemoteError> {
        let url = self.build_http_url(path);
        tracing::debug!(%method, url = %url, "sending request");

        let mut request = self
            .http
            .request(method, &url)
            .header("Authorization", format!("Bearer {}", self.api_key));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = error_message(status, &bytes);
            tracing::debug!(status = status.as_u16(), %message, "request failed");
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message,
            });
        }

        decode_body(&bytes)
    }

    fn build_http_url(&self, path: &str) -> String {
        let base = self.server_url.trim_end_matches('/');
        if base.starts_with("http://") || base.starts_with("https://") {
            format!("{}{}", base, path)
        } else {
            format!("http://{}{}", base, path)
        }
    }
}

/// Unwraps a response that must carry a body.
pub fn ensure_response<R>(response: Option<R>, message: &str) -> Result<R, RemoteError> {
    response.ok_or_else(|| RemoteError::EmptyResponse(message.to_string()))
}

fn decode_body<R: DeserializeOwned>(bytes: &[u8]) -> Result<Option<R>, RemoteError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
    if value.is_null() {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
}

/// Picks the most useful message out of an error body.
///
/// Servers answer with `{"detail": ...}`, `{"message": ...}` or
/// `{"error": ...}`; anything else falls back to the raw text or the status.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        for key in ["detail", "message", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        format!("Server returned status {}", status)
    } else {
        text
    }
}
