use crate::metrics::SharedMetrics;
use crate::model::{ApiObject, DeleteConfirmation, ObjectPatch, ObjectPayload};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("objects-api-checks/", env!("CARGO_PKG_VERSION"));

/// Status and JSON body of one API call.
///
/// A non-success status is not an error here; callers assert on it.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.body.clone())
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Typed client for the `/objects` REST resource.
#[derive(Clone)]
pub struct ObjectsClient {
    client: reqwest::Client,
    base_url: String,
    metrics: Option<SharedMetrics>,
}

impl ObjectsClient {
    pub fn new(base_url: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET /objects
    pub async fn list_all(&self) -> reqwest::Result<ApiResponse> {
        let request = self.client.get(self.url("/objects"));
        self.send(Method::GET, "/objects", request).await
    }

    /// GET /objects?id=..&id=.. (ids are sent in the given order)
    pub async fn list_by_ids<S: AsRef<str>>(&self, ids: &[S]) -> reqwest::Result<ApiResponse> {
        let query: Vec<(&str, &str)> = ids.iter().map(|id| ("id", id.as_ref())).collect();
        let request = self.client.get(self.url("/objects")).query(&query);
        self.send(Method::GET, "/objects", request).await
    }

    /// GET /objects/{id}
    pub async fn get(&self, id: &str) -> reqwest::Result<ApiResponse> {
        let request = self.client.get(self.object_url(id));
        self.send(Method::GET, "/objects/{id}", request).await
    }

    /// POST /objects
    pub async fn create(&self, payload: &ObjectPayload) -> reqwest::Result<ApiResponse> {
        let request = self.client.post(self.url("/objects")).json(payload);
        self.send(Method::POST, "/objects", request).await
    }

    /// PUT /objects/{id}
    pub async fn update(&self, id: &str, payload: &ObjectPayload) -> reqwest::Result<ApiResponse> {
        let request = self.client.put(self.object_url(id)).json(payload);
        self.send(Method::PUT, "/objects/{id}", request).await
    }

    /// PATCH /objects/{id}
    pub async fn patch(&self, id: &str, patch: &ObjectPatch) -> reqwest::Result<ApiResponse> {
        let request = self.client.patch(self.object_url(id)).json(patch);
        self.send(Method::PATCH, "/objects/{id}", request).await
    }

    /// DELETE /objects/{id}
    pub async fn delete(&self, id: &str) -> reqwest::Result<ApiResponse> {
        let request = self.client.delete(self.object_url(id));
        self.send(Method::DELETE, "/objects/{id}", request).await
    }

    /// Create an object and decode the echoed object in one step.
    pub async fn create_object(&self, payload: &ObjectPayload) -> anyhow::Result<ApiObject> {
        let response = self.create(payload).await?;
        if !response.is_success() {
            anyhow::bail!("POST /objects returned {}", response.status);
        }
        Ok(response.json()?)
    }

    /// Delete an object and decode the confirmation.
    pub async fn delete_object(&self, id: &str) -> anyhow::Result<DeleteConfirmation> {
        let response = self.delete(id).await?;
        if !response.is_success() {
            anyhow::bail!("DELETE /objects/{} returned {}", id, response.status);
        }
        Ok(response.json()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn object_url(&self, id: &str) -> String {
        format!("{}/objects/{}", self.base_url, id)
    }

    async fn send(
        &self,
        method: Method,
        route: &str,
        request: RequestBuilder,
    ) -> reqwest::Result<ApiResponse> {
        let start = Instant::now();

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(method = %method, route, error = %e, "Request failed");
                if let Some(metrics) = &self.metrics {
                    metrics.client_request_errors_total.inc();
                }
                return Err(e);
            }
        };

        let status = response.status();
        let bytes = response.bytes().await?;
        let elapsed = start.elapsed();

        // Error pages are not always JSON; keep them as a string so callers can report them
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        debug!(
            method = %method,
            route,
            status = status.as_u16(),
            elapsed_ms = elapsed.as_millis(),
            "Objects API response"
        );

        if let Some(metrics) = &self.metrics {
            metrics.record_client_request(method.as_str(), route, status.as_u16(), elapsed);
        }

        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base_url_is_normalized() {
        let client = ObjectsClient::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.object_url("7"), "http://localhost:8080/objects/7");
        assert_eq!(client.url("/objects"), "http://localhost:8080/objects");
    }

    #[test]
    fn test_response_decoding() {
        let response = ApiResponse {
            status: StatusCode::OK,
            body: json!({"id": "1", "name": "Google Pixel 6 Pro"}),
        };
        assert!(response.is_success());

        let object: ApiObject = response.json().unwrap();
        assert_eq!(object.id, "1");
        assert_eq!(object.name.as_deref(), Some("Google Pixel 6 Pro"));

        let wrong: Result<DeleteConfirmation, _> = response.json();
        assert!(wrong.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        // Port 9 (discard) on localhost is not expected to be serving HTTP
        let client = ObjectsClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        assert!(client.list_all().await.is_err());
    }
}
