//! HTTP client the operator uses to talk to the shortening service.
//!
//! The client is stateless apart from its base URL and connection pool. It
//! never retries; every failure goes back to the caller, which decides
//! whether the convergence pass is aborted.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::api::dto::ShortenRequest;
use crate::operator::crd::Validity;
use crate::utils::time::format_expire_at;

/// Errors returned by [`ShortenerApi`] calls.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response (connection, timeout, body read).
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The body was not JSON, or a field had the wrong type.
    #[error("invalid response from {url}: {message}")]
    Decode { url: String, message: String },

    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client: {message}")]
    Build { message: String },

    /// The service answered, but not with what the protocol promises.
    #[error("unexpected response from {url}: {message}")]
    Protocol {
        url: String,
        status: Option<u16>,
        message: String,
    },
}

impl ClientError {
    /// HTTP status of the response, when the failure came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Protocol { status, .. } => *status,
            _ => None,
        }
    }
}

/// Operations of the shortening service, as seen by the operator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShortenerApi: Send + Sync {
    /// Creates a short code for `long_url`.
    async fn shorten(
        &self,
        long_url: &str,
        expire_at: Option<DateTime<Utc>>,
    ) -> Result<String, ClientError>;

    /// Returns the click count of `code`.
    async fn click_count(&self, code: &str) -> Result<u64, ClientError>;

    /// Returns whether `code` is still valid, in the resource's status form.
    async fn check_validity(&self, code: &str) -> Result<Validity, ClientError>;
}

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// [`ShortenerApi`] over HTTP/JSON.
#[derive(Clone)]
pub struct HttpShortenerClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpShortenerClient {
    /// Creates a new client targeting the given base URL.
    ///
    /// Every request is bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Build`] if the HTTP client cannot be
    /// constructed (e.g. no TLS backend is available).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Build {
                message: e.to_string(),
            })?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Sends a request and returns the JSON object in a 2xx response body.
    async fn send(&self, request: reqwest::RequestBuilder, url: &str) -> Result<Value, ClientError> {
        let response = request.send().await.map_err(|e| ClientError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| ClientError::Transport {
            url: url.to_string(),
            message: format!("failed reading body: {e}"),
        })?;

        if !status.is_success() {
            return Err(ClientError::Protocol {
                url: url.to_string(),
                status: Some(status.as_u16()),
                message: format!("status {status}: {}", String::from_utf8_lossy(&body).trim()),
            });
        }

        let value: Value = serde_json::from_slice(&body).map_err(|e| ClientError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        if !value.is_object() {
            return Err(ClientError::Decode {
                url: url.to_string(),
                message: "expected a JSON object".to_string(),
            });
        }

        Ok(value)
    }
}

/// Looks up `field` in a response object, distinguishing "missing" from
/// "wrong type".
fn field<'a, T>(
    body: &'a Value,
    url: &str,
    field: &str,
    extract: impl FnOnce(&'a Value) -> Option<T>,
) -> Result<T, ClientError> {
    let value = body.get(field).ok_or_else(|| ClientError::Protocol {
        url: url.to_string(),
        status: None,
        message: format!("response is missing '{field}'"),
    })?;

    extract(value).ok_or_else(|| ClientError::Decode {
        url: url.to_string(),
        message: format!("'{field}' has unexpected type: {value}"),
    })
}

#[async_trait]
impl ShortenerApi for HttpShortenerClient {
    async fn shorten(
        &self,
        long_url: &str,
        expire_at: Option<DateTime<Utc>>,
    ) -> Result<String, ClientError> {
        let url = self.url("shorten");
        let payload = ShortenRequest {
            long_url: long_url.to_string(),
            expire_at: expire_at.as_ref().map(format_expire_at),
        };

        debug!(url = %url, long_url = %long_url, "Shortening URL");

        let body = self.send(self.client.post(&url).json(&payload), &url).await?;
        let code = field(&body, &url, "short_url", |v| v.as_str().map(str::to_string))?;

        if code.is_empty() {
            return Err(ClientError::Protocol {
                url,
                status: None,
                message: "'short_url' is empty".to_string(),
            });
        }

        Ok(code)
    }

    async fn click_count(&self, code: &str) -> Result<u64, ClientError> {
        let url = self.url(&format!("count/{code}"));

        debug!(url = %url, "Fetching click count");

        let body = self.send(self.client.get(&url), &url).await?;
        field(&body, &url, "click_count", Value::as_u64)
    }

    async fn check_validity(&self, code: &str) -> Result<Validity, ClientError> {
        let url = self.url(&format!("valid/{code}"));

        debug!(url = %url, "Checking validity");

        let body = self.send(self.client.get(&url), &url).await?;
        field(&body, &url, "is_valid", Value::as_bool).map(Validity::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use serde_json::json;

    async fn spawn_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        format!("http://{addr}")
    }

    fn client(base_url: String) -> HttpShortenerClient {
        HttpShortenerClient::new(base_url, DEFAULT_REQUEST_TIMEOUT).unwrap()
    }

    #[tokio::test]
    async fn test_shorten_sends_empty_expiry() {
        let app = Router::new().route(
            "/shorten",
            post(|axum::Json(body): axum::Json<Value>| async move {
                assert_eq!(body["long_url"], "http://example.com");
                assert_eq!(body["expire_at"], "");
                axum::Json(json!({ "short_url": "ab3x" }))
            }),
        );
        let client = client(spawn_server(app).await);

        let code = client.shorten("http://example.com", None).await.unwrap();
        assert_eq!(code, "ab3x");
    }

    #[tokio::test]
    async fn test_shorten_sends_utc_expiry() {
        let app = Router::new().route(
            "/shorten",
            post(|axum::Json(body): axum::Json<Value>| async move {
                assert_eq!(body["expire_at"], "2030-01-02T03:04:05Z");
                axum::Json(json!({ "short_url": "Zz99" }))
            }),
        );
        let client = client(spawn_server(app).await);
        let at = "2030-01-02T03:04:05Z".parse::<DateTime<Utc>>().unwrap();

        assert_eq!(
            client.shorten("http://example.com", Some(at)).await.unwrap(),
            "Zz99"
        );
    }

    #[tokio::test]
    async fn test_click_count_and_validity() {
        let app = Router::new()
            .route(
                "/count/{code}",
                get(|| async { axum::Json(json!({ "click_count": 5 })) }),
            )
            .route(
                "/valid/{code}",
                get(|| async { axum::Json(json!({ "is_valid": false })) }),
            );
        let client = client(format!("{}/", spawn_server(app).await));

        assert_eq!(client.click_count("testShort").await.unwrap(), 5);
        assert_eq!(
            client.check_validity("testShort").await.unwrap(),
            Validity::False
        );
    }

    #[tokio::test]
    async fn test_missing_field_is_protocol_error() {
        let app = Router::new().route(
            "/valid/{code}",
            get(|| async { axum::Json(json!({ "valid": true })) }),
        );
        let client = client(spawn_server(app).await);

        let err = client.check_validity("abcd").await.unwrap_err();
        assert!(matches!(err, ClientError::Protocol { status: None, .. }));
    }

    #[tokio::test]
    async fn test_wrong_type_is_decode_error() {
        let app = Router::new().route(
            "/valid/{code}",
            get(|| async { axum::Json(json!({ "is_valid": "true" })) }),
        );
        let client = client(spawn_server(app).await);

        let err = client.check_validity("abcd").await.unwrap_err();
        assert!(matches!(err, ClientError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let app = Router::new().route("/count/{code}", get(|| async { "not json" }));
        let client = client(spawn_server(app).await);

        let err = client.click_count("abcd").await.unwrap_err();
        assert!(matches!(err, ClientError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_error_status_is_protocol_error() {
        let app = Router::new().route(
            "/count/{code}",
            get(|| async { (StatusCode::NOT_FOUND, "404 page not found") }),
        );
        let client = client(spawn_server(app).await);

        let err = client.click_count("abcd").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client =
            HttpShortenerClient::new(format!("http://{addr}"), Duration::from_secs(2)).unwrap();

        let err = client.click_count("abcd").await.unwrap_err();
        assert!(matches!(err, ClientError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_stalled_service_hits_timeout() {
        let app = Router::new().route(
            "/count/{code}",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                axum::Json(json!({ "click_count": 1 }))
            }),
        );
        let client =
            HttpShortenerClient::new(spawn_server(app).await, Duration::from_millis(200)).unwrap();

        let started = std::time::Instant::now();
        let err = client.click_count("abcd").await.unwrap_err();

        assert!(matches!(err, ClientError::Transport { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
