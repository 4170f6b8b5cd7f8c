//! Request/response types for the host HTTP bridge.
//!
//! The session provider builds an [`HttpRequest`], hands it to whatever
//! [`HttpClient`] the host injected and inspects the [`HttpResponse`]. A non-2xx
//! status is a normal response here; only transport failures are errors.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// Name of the header carrying the bearer credential.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

const CONTENT_TYPE_HEADER: &str = "Content-Type";
const JSON_MIME: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    /// Per-request deadline; the client default applies when `None`.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set `Authorization: Bearer <token>`, replacing any previous value.
    pub fn bearer_token(self, token: impl AsRef<str>) -> Self {
        let value = format!("Bearer {}", token.as_ref());
        self.header(AUTHORIZATION_HEADER, value)
    }

    /// Serialize `body` as the JSON payload.
    pub fn json<T: Serialize>(self, body: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| BridgeError::OperationFailed(format!("cannot encode request body: {e}")))?;
        Ok(self.body(bytes).header(CONTENT_TYPE_HEADER, JSON_MIME))
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, 200..=299)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            BridgeError::OperationFailed(format!(
                "cannot decode {} response body: {e}",
                self.status
            ))
        })
    }

    pub fn text(&self) -> Result<String> {
        std::str::from_utf8(&self.body)
            .map(str::to_owned)
            .map_err(|e| BridgeError::OperationFailed(format!("response body is not UTF-8: {e}")))
    }
}

/// Executes requests on behalf of the core.
///
/// Implementations map DNS, connection and timeout failures to
/// [`BridgeError::OperationFailed`] and return every HTTP status as `Ok`, so
/// callers can read the server's error body.
///
/// ```ignore
/// let response = client
///     .execute(HttpRequest::get(format!("{origin}/api/profile")).bearer_token(token))
///     .await?;
/// let user: User = response.json()?;
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_replaces_previous_header() {
        let request = HttpRequest::get("http://host/api/profile")
            .bearer_token("old")
            .bearer_token(String::from("new"))
            .timeout(Duration::from_secs(5));

        assert_eq!(request.method.to_string(), "GET");
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.headers[AUTHORIZATION_HEADER], "Bearer new");
        assert_eq!(request.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_json_payload() {
        let request = HttpRequest::post("http://host/api/login")
            .json(&serde_json::json!({ "email": "dj@example.com" }))
            .unwrap();

        assert_eq!(request.headers[CONTENT_TYPE_HEADER], JSON_MIME);
        assert_eq!(
            request.body.as_deref(),
            Some(br#"{"email":"dj@example.com"}"#.as_slice())
        );
    }

    #[test]
    fn test_response_decoding() {
        let conflict = HttpResponse::new(409, r#"{"error":"Email taken"}"#);
        assert!(!conflict.is_success());

        let body: serde_json::Value = conflict.json().unwrap();
        assert_eq!(body["error"], "Email taken");

        let garbage = HttpResponse::new(200, vec![0xff, 0xfe]);
        assert!(garbage.is_success());
        assert!(garbage.text().is_err());
        assert!(garbage.json::<serde_json::Value>().is_err());
    }
}
