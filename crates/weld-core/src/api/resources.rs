//! Resource accessors
//!
//! One method per Weld Connect operation. Each is a straight request/response
//! mapping over [`ApiClient`]; there is no logic here beyond building paths.

use serde_json::Value;

use super::client::ApiClient;
use super::error::ApiResult;
use super::models::{
    AddSourceStreams, AddedSourceStreams, AvailableSourceStreamList, ConnectionBridge,
    CreateConnectionBridge, CreateEltSync, EltSync, EltSyncStatus, IntegrationList,
    SourceStreamParam,
};

impl ApiClient {
    /// `GET /integrations` - also validates the API key
    pub async fn list_integrations(&self) -> ApiResult<IntegrationList> {
        self.get_json("/integrations").await
    }

    /// `POST /connection_bridges`
    pub async fn create_connection_bridge(
        &self,
        request: &CreateConnectionBridge,
    ) -> ApiResult<ConnectionBridge> {
        self.post_json("/connection_bridges", request).await
    }

    /// `GET /connections/{id}/settings` - JSON-schema-like settings document
    pub async fn get_elt_settings(&self, connection_id: &str) -> ApiResult<Value> {
        self.get(&format!("/connections/{}/settings", connection_id))
            .await
    }

    /// `POST /elt_syncs`
    pub async fn create_elt_sync(&self, request: &CreateEltSync) -> ApiResult<EltSync> {
        self.post_json("/elt_syncs", request).await
    }

    /// `GET /elt_syncs/{id}`
    pub async fn get_elt_sync(&self, elt_sync_id: &str) -> ApiResult<EltSync> {
        self.get_json(&format!("/elt_syncs/{}", elt_sync_id)).await
    }

    /// `GET /elt_syncs/{id}/status`
    pub async fn get_elt_sync_status(&self, elt_sync_id: &str) -> ApiResult<EltSyncStatus> {
        self.get_json(&format!("/elt_syncs/{}/status", elt_sync_id))
            .await
    }

    /// `GET /elt_syncs/{id}/available_source_streams`
    pub async fn list_available_source_streams(
        &self,
        elt_sync_id: &str,
    ) -> ApiResult<AvailableSourceStreamList> {
        self.get_json(&format!(
            "/elt_syncs/{}/available_source_streams",
            elt_sync_id
        ))
        .await
    }

    /// `POST /elt_syncs/{id}/source_streams`
    pub async fn add_source_streams(
        &self,
        elt_sync_id: &str,
        streams: Vec<SourceStreamParam>,
    ) -> ApiResult<AddedSourceStreams> {
        let body = AddSourceStreams {
            source_streams: streams,
        };
        self.post_json(&format!("/elt_syncs/{}/source_streams", elt_sync_id), &body)
            .await
    }

    /// `POST /elt_syncs/{id}/enable`
    pub async fn enable_sync(&self, elt_sync_id: &str) -> ApiResult<()> {
        self.post_empty(&format!("/elt_syncs/{}/enable", elt_sync_id))
            .await
    }

    /// `POST /elt_syncs/{id}/disable`
    pub async fn disable_sync(&self, elt_sync_id: &str) -> ApiResult<()> {
        self.post_empty(&format!("/elt_syncs/{}/disable", elt_sync_id))
            .await
    }

    /// `POST /elt_syncs/{id}/start`
    pub async fn start_sync(&self, elt_sync_id: &str) -> ApiResult<()> {
        self.post_empty(&format!("/elt_syncs/{}/start", elt_sync_id))
            .await
    }

    /// `POST /elt_syncs/{id}/stop`
    pub async fn stop_sync(&self, elt_sync_id: &str) -> ApiResult<()> {
        self.post_empty(&format!("/elt_syncs/{}/stop", elt_sync_id))
            .await
    }

    /// `POST /elt_streams/{id}/request_run`
    pub async fn request_run(&self, elt_stream_id: &str) -> ApiResult<()> {
        self.post_empty(&format!("/elt_streams/{}/request_run", elt_stream_id))
            .await
    }

    /// `POST /elt_streams/{id}/request_full_refresh`
    pub async fn request_full_refresh(&self, elt_stream_id: &str) -> ApiResult<()> {
        self.post_empty(&format!(
            "/elt_streams/{}/request_full_refresh",
            elt_stream_id
        ))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::RunStatus;
    use crate::api::ApiError;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(server.uri(), "test-key").expect("api client")
    }

    #[tokio::test]
    async fn test_create_connection_bridge_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/connection_bridges"))
            .and(body_json(json!({
                "redirect_uri": "http://127.0.0.1:8765/authorize-callback",
                "label": "my-connection",
                "integration_id": "postgres"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "br_1",
                "authorize_url": "https://connect.weld.app/authorize/br_1",
                "created_at": "2024-01-01T00:00:00Z",
                "expires_at": "2024-01-01T01:00:00Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let bridge = client(&server)
            .create_connection_bridge(&CreateConnectionBridge {
                redirect_uri: "http://127.0.0.1:8765/authorize-callback".to_string(),
                label: "my-connection".to_string(),
                integration_id: "postgres".to_string(),
            })
            .await
            .expect("bridge");
        assert_eq!(bridge.id, "br_1");
        assert!(bridge.authorize_url.ends_with("br_1"));
    }

    #[tokio::test]
    async fn test_add_source_streams_wraps_array() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/elt_syncs/s1/source_streams"))
            .and(body_json(json!({
                "source_streams": [{
                    "name": "orders",
                    "excluded_columns": [],
                    "full_sync_always": false,
                    "full_sync_at_midnight": false,
                    "hashed_columns": [],
                    "incremental_pointer_id": "",
                    "protected_from_full_sync": false
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "source_streams": [{"id": "st1", "elt_sync_id": "s1", "name": "orders"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let added = client(&server)
            .add_source_streams("s1", vec![SourceStreamParam::empty("orders")])
            .await
            .expect("streams");
        assert_eq!(added.source_streams[0].id, "st1");
    }

    #[tokio::test]
    async fn test_lifecycle_verbs_accept_no_content() {
        let server = MockServer::start().await;
        for verb in ["enable", "disable", "start", "stop"] {
            Mock::given(method("POST"))
                .and(path(format!("/elt_syncs/s1/{}", verb)))
                .respond_with(ResponseTemplate::new(204))
                .expect(1)
                .mount(&server)
                .await;
        }

        let api = client(&server);
        api.enable_sync("s1").await.expect("enable");
        api.disable_sync("s1").await.expect("disable");
        api.start_sync("s1").await.expect("start");
        api.stop_sync("s1").await.expect("stop");
    }

    #[tokio::test]
    async fn test_stream_actions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/elt_streams/st1/request_run"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/elt_streams/st1/request_full_refresh"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({"message": "already queued"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server);
        api.request_run("st1").await.expect("run");
        let err = api.request_full_refresh("st1").await.unwrap_err();
        assert!(matches!(err, ApiError::Request { .. }));
        assert!(err.to_string().contains("already queued"));
    }

    #[tokio::test]
    async fn test_get_sync_and_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/elt_syncs/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "s1",
                "status": "RUNNING",
                "sync_interval": "0 * * * *",
                "streams": [{"id": "st1", "name": "orders"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/elt_syncs/s1/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "elt_sync_id": "s1",
                "source_streams": [{"name": "orders", "latest_sync": {"status": "COMPLETED", "bytes_synced": 512}}]
            })))
            .mount(&server)
            .await;

        let api = client(&server);
        let sync = api.get_elt_sync("s1").await.expect("sync");
        assert_eq!(sync.status, RunStatus::Running);
        assert_eq!(sync.streams[0].id, "st1");

        let status = api.get_elt_sync_status("s1").await.expect("status");
        let latest = status.source_streams[0].latest_sync.as_ref().unwrap();
        assert_eq!(latest.status, RunStatus::Completed);
        assert_eq!(latest.bytes_synced, 512);
    }

    #[tokio::test]
    async fn test_settings_schema_is_opaque() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/connections/c1/settings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "object",
                "properties": {"region": {"type": "string"}}
            })))
            .mount(&server)
            .await;

        let schema = client(&server).get_elt_settings("c1").await.expect("schema");
        assert_eq!(schema["properties"]["region"]["type"], json!("string"));
    }
}
