//! Connection authorization callback
//!
//! After the user authorizes a connection in the browser, Weld redirects to
//! the bridge's redirect URI. A loopback server on 127.0.0.1 receives it and
//! hands the new connection id to whoever is waiting.
//!
//! Two shapes are accepted on [`CALLBACK_PATH`]:
//! - `GET ?connection_id=...` (or `connectionId`), the browser redirect
//! - `POST {"type": "auth-success", "connectionId": "..."}`, the completion
//!   message relayed by the authorize page
//!
//! Messages of any other type are ignored.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Path the redirect URI points at
pub const CALLBACK_PATH: &str = "/authorize-callback";

/// Message type signalling a completed authorization
pub const AUTH_SUCCESS: &str = "auth-success";

/// Errors from the callback listener
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Could not listen for the authorization callback on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out waiting for authorization")]
    Timeout,

    #[error("Authorization listener stopped")]
    Closed,
}

/// Completion message posted by the authorize page
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "connectionId", alias = "connection_id", default)]
    pub connection_id: Option<String>,
}

impl AuthMessage {
    /// Connection id carried by an `auth-success` message, if any
    pub fn connection_id(&self) -> Option<&str> {
        if self.kind != AUTH_SUCCESS {
            return None;
        }
        self.connection_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Connection id from an arbitrary JSON message; `None` for anything else
pub fn connection_id_from_message(value: &Value) -> Option<String> {
    let message: AuthMessage = serde_json::from_value(value.clone()).ok()?;
    message.connection_id().map(str::to_string)
}

/// Connection id from redirect query parameters
pub fn connection_id_from_query(params: &HashMap<String, String>) -> Option<String> {
    ["connection_id", "connectionId"]
        .iter()
        .filter_map(|key| params.get(*key))
        .map(|id| id.trim())
        .find(|id| !id.is_empty())
        .map(str::to_string)
}

/// Loopback server receiving authorization callbacks
pub struct AuthCallbackServer {
    addr: SocketAddr,
    connection_rx: mpsc::Receiver<String>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl AuthCallbackServer {
    /// Listen on 127.0.0.1:`port` (0 picks a free port)
    pub async fn start(port: u16) -> Result<Self, AuthError> {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| AuthError::Bind { addr, source })?;
        let addr = listener
            .local_addr()
            .map_err(|source| AuthError::Bind { addr, source })?;

        let (connection_tx, connection_rx) = mpsc::channel(4);
        let redirect_tx = connection_tx.clone();

        let app = Router::new().route(
            CALLBACK_PATH,
            get(move |query: Query<HashMap<String, String>>| {
                handle_redirect(query, redirect_tx.clone())
            })
            .post(move |message: Json<Value>| handle_message(message, connection_tx.clone())),
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                error!("authorization callback server error: {}", err);
            }
        });

        info!(%addr, "listening for authorization callback");
        Ok(Self {
            addr,
            connection_rx,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Redirect URI to register on the connection bridge
    pub fn redirect_uri(&self) -> String {
        format!("http://{}{}", self.addr, CALLBACK_PATH)
    }

    /// Next connection id received, or `None` once the server stopped
    pub async fn recv(&mut self) -> Option<String> {
        self.connection_rx.recv().await
    }

    /// Connection id received so far, without waiting
    pub fn try_recv(&mut self) -> Option<String> {
        self.connection_rx.try_recv().ok()
    }

    /// Wait for a connection id, giving up after `timeout`
    pub async fn wait_for_connection(&mut self, timeout: Duration) -> Result<String, AuthError> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(Some(id)) => Ok(id),
            Ok(None) => Err(AuthError::Closed),
            Err(_) => Err(AuthError::Timeout),
        }
    }

    /// Stop listening
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for AuthCallbackServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                handle.abort();
            }
        }
    }
}

async fn handle_redirect(
    Query(params): Query<HashMap<String, String>>,
    connection_tx: mpsc::Sender<String>,
) -> (StatusCode, Html<&'static str>) {
    match connection_id_from_query(&params) {
        Some(id) => {
            debug!(connection_id = %id, "authorization redirect received");
            let _ = connection_tx.try_send(id);
            (
                StatusCode::OK,
                Html(
                    r#"<!DOCTYPE html>
<html>
<head><title>Connection Authorized</title></head>
<body><h1>Connection authorized</h1><p>You can close this window and return to the terminal.</p></body>
</html>"#,
                ),
            )
        }
        None => (
            StatusCode::BAD_REQUEST,
            Html(
                r#"<!DOCTYPE html>
<html>
<head><title>Authorization Failed</title></head>
<body><h1>Authorization failed</h1><p>The callback did not include a connection id.</p></body>
</html>"#,
            ),
        ),
    }
}

async fn handle_message(
    Json(message): Json<Value>,
    connection_tx: mpsc::Sender<String>,
) -> StatusCode {
    match connection_id_from_message(&message) {
        Some(id) => {
            debug!(connection_id = %id, "authorization message received");
            let _ = connection_tx.try_send(id);
            StatusCode::NO_CONTENT
        }
        None => {
            debug!("ignoring non auth-success message");
            StatusCode::ACCEPTED
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_only_auth_success_messages_count() {
        assert_eq!(
            connection_id_from_message(&json!({"type": "auth-success", "connectionId": "c1"})),
            Some("c1".to_string())
        );
        assert_eq!(
            connection_id_from_message(&json!({"type": "resize", "connectionId": "c1"})),
            None
        );
        assert_eq!(connection_id_from_message(&json!({"type": "auth-success"})), None);
        assert_eq!(connection_id_from_message(&json!("auth-success")), None);
        assert_eq!(
            connection_id_from_message(&json!({"type": "auth-success", "connectionId": "  "})),
            None
        );
    }

    #[test]
    fn test_query_accepts_both_spellings() {
        let mut params = HashMap::new();
        params.insert("connectionId".to_string(), "c2".to_string());
        assert_eq!(connection_id_from_query(&params), Some("c2".to_string()));

        params.insert("connection_id".to_string(), "c3".to_string());
        assert_eq!(connection_id_from_query(&params), Some("c3".to_string()));

        assert_eq!(connection_id_from_query(&HashMap::new()), None);
    }

    #[tokio::test]
    async fn test_redirect_delivers_connection_id() {
        let mut server = AuthCallbackServer::start(0).await.unwrap();
        let url = format!("{}?connection_id=conn_42", server.redirect_uri());

        let response = reqwest::get(&url).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let id = server
            .wait_for_connection(Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(id, "conn_42");
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_posted_message_delivers_connection_id() {
        let mut server = AuthCallbackServer::start(0).await.unwrap();
        let client = reqwest::Client::new();

        let ignored = client
            .post(server.redirect_uri())
            .json(&json!({"type": "other", "connectionId": "nope"}))
            .send()
            .await
            .unwrap();
        assert_eq!(ignored.status(), reqwest::StatusCode::ACCEPTED);
        assert!(server.try_recv().is_none());

        let accepted = client
            .post(server.redirect_uri())
            .json(&json!({"type": "auth-success", "connectionId": "conn_7"}))
            .send()
            .await
            .unwrap();
        assert_eq!(accepted.status(), reqwest::StatusCode::NO_CONTENT);
        assert_eq!(
            server
                .wait_for_connection(Duration::from_secs(5))
                .await
                .unwrap(),
            "conn_7"
        );
    }

    #[tokio::test]
    async fn test_redirect_without_id_is_rejected() {
        let mut server = AuthCallbackServer::start(0).await.unwrap();
        let response = reqwest::get(server.redirect_uri()).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        assert!(matches!(
            server.wait_for_connection(Duration::from_millis(50)).await,
            Err(AuthError::Timeout)
        ));
    }

    #[test]
    fn test_redirect_uri_uses_callback_path() {
        let config = crate::config::Config::default();
        assert_eq!(
            config.redirect_uri(),
            format!("http://127.0.0.1:8765{}", CALLBACK_PATH)
        );
    }
}
