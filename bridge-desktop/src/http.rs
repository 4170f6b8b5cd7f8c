use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse},
};
use reqwest::{Client, Method, RequestBuilder};
use std::time::Duration;
use tracing::{debug, warn};

/// Whole-request deadline used by [`ReqwestHttpClient::new`].
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("musicapp-core/", env!("CARGO_PKG_VERSION"));

/// [`HttpClient`] over a pooled `reqwest::Client`.
///
/// Cloning shares the connection pool.
#[derive(Clone)]
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Build a client whose requests give up after `timeout` unless the
    /// request carries its own deadline.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map(Self::from)
            .map_err(|e| BridgeError::NotAvailable(format!("cannot build HTTP client: {e}")))
    }

    fn prepare(&self, request: HttpRequest) -> RequestBuilder {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        };

        let builder = request
            .headers
            .into_iter()
            .fold(self.client.request(method, request.url), |builder, (name, value)| {
                builder.header(name, value)
            });
        let builder = match request.body {
            Some(body) => builder.body(body),
            None => builder,
        };
        match request.timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        }
    }
}

impl From<Client> for ReqwestHttpClient {
    fn from(client: Client) -> Self {
        Self { client }
    }
}

fn transport_error(e: reqwest::Error) -> BridgeError {
    let reason = if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("cannot reach server: {e}")
    } else {
        e.to_string()
    };
    BridgeError::OperationFailed(reason)
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method;
        debug!(%method, url = %request.url, "Sending request");

        let response = self.prepare(request).send().await.map_err(|e| {
            warn!(%method, error = %e, "Request failed before a response arrived");
            transport_error(e)
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_owned(), value.to_owned()))
            })
            .collect();
        let body = response.bytes().await.map_err(transport_error)?;

        debug!(%method, status, bytes = body.len(), "Response received");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::http::AUTHORIZATION_HEADER;

    #[test]
    fn test_prepare_copies_request_parts() {
        let client = ReqwestHttpClient::new().unwrap();
        let request = HttpRequest::post("http://127.0.0.1:5000/api/register")
            .bearer_token("abc")
            .body(&b"{}"[..])
            .timeout(Duration::from_secs(3));

        let built = client.prepare(request).build().unwrap();

        assert_eq!(built.method(), Method::POST);
        assert_eq!(built.url().path(), "/api/register");
        assert_eq!(built.headers()[AUTHORIZATION_HEADER], "Bearer abc");
        assert_eq!(built.timeout(), Some(&Duration::from_secs(3)));
        assert!(built.body().is_some());
    }

    #[test]
    fn test_delete_without_body() {
        let client = ReqwestHttpClient::from(Client::new());
        let built = client
            .prepare(HttpRequest::new(HttpMethod::Delete, "http://127.0.0.1:5000/api/songs/4"))
            .build()
            .unwrap();

        assert_eq!(built.method(), Method::DELETE);
        assert!(built.body().is_none());
        assert!(built.timeout().is_none());
    }

    #[tokio::test]
    async fn test_closed_port_is_a_transport_error() {
        let client = ReqwestHttpClient::with_timeout(Duration::from_secs(2)).unwrap();
        // Nothing listens on the discard port of the loopback interface.
        let result = client
            .execute(HttpRequest::get("http://127.0.0.1:9/api/profile"))
            .await;

        assert!(matches!(result, Err(BridgeError::OperationFailed(_))));
    }
}
