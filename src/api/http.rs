use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;
use url::Url;

use crate::api::client::{ApiError, ResourceApi};
use crate::api::errors::{status_error, unwrap_envelope};
use crate::auth::AuthContext;
use crate::config::ClientConfig;
use crate::identity::RecordId;
use crate::resource::{Resource, ToggleRoute};

/// reqwest implementation of [`ResourceApi`] for one collection.
pub struct HttpResourceApi {
    client: reqwest::Client,
    collection_url: Url,
    toggle_route: ToggleRoute,
    auth: Arc<dyn AuthContext>,
}

impl HttpResourceApi {
    /// Collaborator for resource `R` under `<base_url>/api/`.
    pub fn for_resource<R: Resource>(
        client: reqwest::Client,
        base_url: &Url,
        auth: Arc<dyn AuthContext>,
    ) -> Result<Self, ApiError> {
        Self::new(client, base_url, R::NAME, R::TOGGLE_ROUTE, auth)
    }

    pub fn new(
        client: reqwest::Client,
        base_url: &Url,
        resource: &str,
        toggle_route: ToggleRoute,
        auth: Arc<dyn AuthContext>,
    ) -> Result<Self, ApiError> {
        let collection_url = collection_url(base_url, resource)?;
        Ok(Self {
            client,
            collection_url,
            toggle_route,
            auth,
        })
    }

    /// Shared client honouring the configured request timeout.
    pub fn build_client(config: &ClientConfig) -> Result<reqwest::Client, ApiError> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("almoner/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to build HTTP client: {e}")))
    }

    pub fn collection_url(&self) -> &Url {
        &self.collection_url
    }

    pub fn record_url(&self, id: &RecordId) -> Url {
        self.with_segments(&[id.as_str()])
    }

    pub fn toggle_url(&self, id: &RecordId) -> Url {
        match self.toggle_route {
            ToggleRoute::Prefix => self.with_segments(&["toggle", id.as_str()]),
            ToggleRoute::Suffix => self.with_segments(&[id.as_str(), "toggle"]),
        }
    }

    fn with_segments(&self, segments: &[&str]) -> Url {
        let mut url = self.collection_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        tracing::debug!(%method, %url, "API request");
        let builder = self.client.request(method, url);
        match self.auth.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await.map_err(network_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let reason = status.canonical_reason().unwrap_or_default();
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), "API request rejected");
        Err(status_error(status.as_u16(), reason, &body))
    }

    async fn json_body(response: Response) -> Result<Value, ApiError> {
        let text = response.text().await.map_err(network_error)?;
        if text.trim().is_empty() {
            return Err(ApiError::Decode("empty response body".into()));
        }
        let value: Value =
            serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(unwrap_envelope(value))
    }
}

#[async_trait]
impl ResourceApi for HttpResourceApi {
    async fn list(&self) -> Result<Vec<Value>, ApiError> {
        let response = self
            .send(self.request(Method::GET, self.collection_url.clone()))
            .await?;
        match Self::json_body(response).await? {
            Value::Array(items) => Ok(items),
            other => Err(ApiError::Decode(format!(
                "expected an array of records, got {other}"
            ))),
        }
    }

    async fn create(&self, body: Value) -> Result<Value, ApiError> {
        let response = self
            .send(self.request(Method::POST, self.collection_url.clone()).json(&body))
            .await?;
        Self::json_body(response).await
    }

    async fn update(&self, id: &RecordId, body: Value) -> Result<Value, ApiError> {
        let response = self
            .send(self.request(Method::PUT, self.record_url(id)).json(&body))
            .await?;
        Self::json_body(response).await
    }

    async fn toggle(&self, id: &RecordId) -> Result<Value, ApiError> {
        let response = self
            .send(self.request(Method::PATCH, self.toggle_url(id)))
            .await?;
        Self::json_body(response).await
    }

    async fn delete(&self, id: &RecordId) -> Result<(), ApiError> {
        self.send(self.request(Method::DELETE, self.record_url(id)))
            .await?;
        Ok(())
    }
}

fn network_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Network(format!("request timed out: {err}"))
    } else {
        ApiError::Network(err.to_string())
    }
}

/// `<base>/api/<resource>`, tolerating a base with or without a trailing
/// slash or an existing path prefix.
fn collection_url(base_url: &Url, resource: &str) -> Result<Url, ApiError> {
    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|_| ApiError::Network(format!("{base_url} cannot be used as a base URL")))?
        .pop_if_empty()
        .extend(["api", resource]);
    Ok(url)
}
