//! Workflow service client
//!
//! `WorkflowApi` is the seam between the persistence coordinator and the
//! remote service; `HttpWorkflowApi` is the reqwest implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::Value;

use crate::config::PersistenceConfig;
use crate::constants::paths;
use crate::error::{Result, StudioError};
use crate::wire::{ValidationResponse, WorkflowPayload, WorkflowRecord};

/// Remote workflow persistence
#[async_trait]
pub trait WorkflowApi: Send + Sync {
    /// `GET /workflows/{id}`
    async fn get(&self, workflow_id: &str) -> Result<WorkflowRecord>;

    /// `POST /workflows`
    async fn create(&self, payload: &WorkflowPayload) -> Result<WorkflowRecord>;

    /// `PUT /workflows/{id}`
    async fn update(&self, workflow_id: &str, payload: &WorkflowPayload) -> Result<WorkflowRecord>;

    /// `POST /workflows/validate`
    async fn validate(&self, payload: &WorkflowPayload) -> Result<ValidationResponse>;
}

/// HTTP client for the workflow service
pub struct HttpWorkflowApi {
    http_client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpWorkflowApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: None,
        })
    }

    pub fn from_config(config: &PersistenceConfig) -> Result<Self> {
        if config.api_url.trim().is_empty() {
            return Err(StudioError::Config("workflow API URL is empty".to_string()));
        }
        let api = Self::new(&config.api_url, config.request_timeout())?;
        Ok(match config.api_token {
            Some(ref token) => api.with_bearer_token(token),
            None => api,
        })
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// URL of one workflow, with the id encoded as a single path segment
    fn workflow_url(&self, workflow_id: &str) -> Result<reqwest::Url> {
        let invalid = || StudioError::Config(format!("invalid workflow API URL '{}'", self.base_url));
        let mut url = reqwest::Url::parse(&self.url(paths::WORKFLOWS)).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .push(workflow_id);
        Ok(url)
    }

    fn request(&self, method: Method, url: impl reqwest::IntoUrl) -> RequestBuilder {
        let request = self.http_client.request(method, url);
        match self.bearer_token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and return the JSON body, mapping failures
    async fn send(&self, request: RequestBuilder, workflow_id: Option<&str>) -> Result<Value> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            if let Some(id) = workflow_id {
                return Err(StudioError::NotFound(id.to_string()));
            }
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = server_detail(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
            return Err(StudioError::Server {
                status: status.as_u16(),
                detail,
            });
        }

        response
            .json()
            .await
            .map_err(|e| StudioError::Decode(e.to_string()))
    }
}

#[async_trait]
impl WorkflowApi for HttpWorkflowApi {
    async fn get(&self, workflow_id: &str) -> Result<WorkflowRecord> {
        let request = self.request(Method::GET, self.workflow_url(workflow_id)?);
        decode_record(self.send(request, Some(workflow_id)).await?)
    }

    async fn create(&self, payload: &WorkflowPayload) -> Result<WorkflowRecord> {
        let request = self
            .request(Method::POST, self.url(paths::WORKFLOWS))
            .json(payload);
        decode_record(self.send(request, None).await?)
    }

    async fn update(&self, workflow_id: &str, payload: &WorkflowPayload) -> Result<WorkflowRecord> {
        let request = self
            .request(Method::PUT, self.workflow_url(workflow_id)?)
            .json(payload);
        decode_record(self.send(request, Some(workflow_id)).await?)
    }

    async fn validate(&self, payload: &WorkflowPayload) -> Result<ValidationResponse> {
        let request = self
            .request(Method::POST, self.url(paths::VALIDATE))
            .json(payload);
        let body = self.send(request, None).await?;
        serde_json::from_value(body).map_err(|e| StudioError::Decode(e.to_string()))
    }
}

/// Decode a record, unwrapping a `workflow` or `data` envelope if present
pub fn decode_record(body: Value) -> Result<WorkflowRecord> {
    let inner = match body {
        Value::Object(mut map) if !map.contains_key("id") && !map.contains_key("workflow_id") => {
            match map.remove("workflow").or_else(|| map.remove("data")) {
                Some(inner) => inner,
                None => Value::Object(map),
            }
        }
        other => other,
    };
    serde_json::from_value(inner).map_err(|e| StudioError::Decode(e.to_string()))
}

/// Extract the human-readable detail from an error body
///
/// Understands `detail` (string or a list of `{msg}` items), `message`
/// and `error`. Returns `None` for non-JSON bodies.
pub fn server_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    for key in ["detail", "message", "error"] {
        match value.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
            Some(Value::Array(items)) => {
                let messages: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").or(Some(item)).and_then(Value::as_str))
                    .collect();
                if !messages.is_empty() {
                    return Some(messages.join("; "));
                }
            }
            _ => {}
        }
    }
    None
}
