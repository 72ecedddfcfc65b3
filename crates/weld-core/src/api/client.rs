//! HTTP client for the Weld Connect API
//!
//! Thin wrapper over `reqwest` that:
//! - prefixes every path with the configured base URL
//! - attaches the API key as the `X-API-KEY` header
//! - normalizes non-success responses into [`ApiError::Request`]
//! - resolves `204 No Content` (and empty bodies) to `Value::Null`
//!
//! No retries are performed here. Callers decide whether to re-trigger.

use std::time::Duration;

use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::error::{ApiError, ApiResult};
use crate::config::Config;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Request timeout in seconds
const REQUEST_TIMEOUT: u64 = 30;

/// Client bound to one base URL and one API key
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ApiClient {
    /// Create a client for `base_url` authenticating with `api_key`
    ///
    /// Fails fast when the key is blank or the base URL is not absolute.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> ApiResult<Self> {
        let base_url = base_url.into();
        let api_key = api_key.into().trim().to_string();

        if api_key.is_empty() {
            return Err(ApiError::MissingApiKey);
        }

        match Url::parse(&base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => return Err(ApiError::InvalidBaseUrl { url: base_url }),
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT))
            .user_agent(concat!("weld-connect/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Create a client from configuration
    pub fn from_config(config: &Config) -> ApiResult<Self> {
        let key = config.api_key().ok_or(ApiError::MissingApiKey)?;
        Self::new(config.base_url.clone(), key)
    }

    /// The base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a GET and return the decoded JSON body
    pub async fn get(&self, path: &str) -> ApiResult<Value> {
        self.send(Method::GET, path, None).await
    }

    /// Issue a POST with an optional JSON body
    pub async fn post(&self, path: &str, body: Option<&Value>) -> ApiResult<Value> {
        self.send(Method::POST, path, body).await
    }

    /// GET and decode into `T`
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let value = self.get(path).await?;
        decode(path, value)
    }

    /// POST `body` and decode the response into `T`
    pub(crate) async fn post_json<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body).map_err(|source| ApiError::Decode {
            path: path.to_string(),
            source,
        })?;
        let value = self.post(path, Some(&body)).await?;
        decode(path, value)
    }

    /// POST without a body, ignoring whatever the server answers
    pub(crate) async fn post_empty(&self, path: &str) -> ApiResult<()> {
        self.post(path, None).await.map(|_| ())
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> ApiResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, path, "sending API request");

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(API_KEY_HEADER, &self.api_key);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        debug!(%method, path, %status, len = bytes.len(), "received API response");

        if !status.is_success() {
            return Err(ApiError::from_response(method, path, status, &bytes));
        }

        if status == StatusCode::NO_CONTENT || bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode {
            path: path.to_string(),
            source,
        })
    }
}

fn decode<T: DeserializeOwned>(path: &str, value: Value) -> ApiResult<T> {
    serde_json::from_value(value).map_err(|source| ApiError::Decode {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(server.uri(), "test-key").expect("api client")
    }

    #[test]
    fn test_blank_key_fails_fast() {
        let err = ApiClient::new("https://connect.weld.app", "  ").unwrap_err();
        assert!(matches!(err, ApiError::MissingApiKey));
    }

    #[test]
    fn test_invalid_base_url() {
        let err = ApiClient::new("connect.weld.app", "key").unwrap_err();
        assert!(matches!(err, ApiError::InvalidBaseUrl { .. }));

        let err = ApiClient::new("ftp://connect.weld.app", "key").unwrap_err();
        assert!(matches!(err, ApiError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = ApiClient::new("https://connect.weld.app/", "key").unwrap();
        assert_eq!(client.base_url(), "https://connect.weld.app");
    }

    #[tokio::test]
    async fn test_get_attaches_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/integrations"))
            .and(header("X-API-KEY", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let value = client.get("/integrations").await.expect("response");
        assert_eq!(value, json!({"data": []}));
    }

    #[tokio::test]
    async fn test_no_content_resolves_to_null() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/elt_syncs/s1/enable"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let value = client.post("/elt_syncs/s1/enable", None).await.expect("204 is ok");
        assert!(value.is_null());
    }

    #[tokio::test]
    async fn test_error_details_extracted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"details": "bad key"})))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.get("/integrations").await.unwrap_err();
        assert!(err.to_string().contains("bad key"));
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_error_without_body_uses_status_line() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.post("/elt_syncs", None).await.unwrap_err();
        assert_eq!(err.to_string(), "API POST failed: Internal Server Error");
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/echo"))
            .and(body_json(json!({"a": 1})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let value = client
            .post("/echo", Some(&json!({"a": 1})))
            .await
            .expect("response");
        assert_eq!(value["ok"], json!(true));
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.get("/integrations").await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_no_retry_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(client.get("/integrations").await.is_err());
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
    }
}
