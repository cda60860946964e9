// Backend client: executes tool calls against the hotel REST API
//
// The client never retries; recovering from a failed call is the model's
// decision in the next round. Every failure is classified so the
// orchestrator can decide trace status and what to feed back to the model.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::tools::{ArgIn, BackendMethod, ToolSpec};

/// Classified backend call failure
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The per-call timeout elapsed
    #[error("backend call timed out")]
    Timeout,

    /// Backend rejected the request (4xx); body is kept for the model
    #[error("backend returned {status}")]
    Backend4xx { status: u16, body: Value },

    /// Backend fault (5xx)
    #[error("backend returned {status}")]
    Backend5xx { status: u16 },

    /// Transport-level failure (connect, DNS, reset)
    #[error("backend unreachable: {0}")]
    Network(String),
}

impl DispatchError {
    /// Structured tool result handed back to the model for this failure
    pub fn as_model_result(&self) -> Value {
        match self {
            DispatchError::Timeout => json!({ "error": "TIMEOUT" }),
            DispatchError::Backend4xx { status, body } => {
                json!({ "error": "BACKEND_4XX", "status": status, "detail": body })
            }
            DispatchError::Backend5xx { status } => {
                json!({ "error": "BACKEND_5XX", "status": status })
            }
            DispatchError::Network(detail) => {
                json!({ "error": "NETWORK", "detail": detail })
            }
        }
    }
}

/// Seam between the orchestrator and the backend transport
#[async_trait]
pub trait ToolDispatcher: Send + Sync {
    /// Execute one validated tool call and return the parsed backend body
    async fn dispatch(
        &self,
        spec: &ToolSpec,
        args: &Value,
        bearer: Option<&str>,
    ) -> Result<Value, DispatchError>;
}

/// HTTP client for the hotel backend
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            timeout,
        }
    }

    /// Substitute `{placeholder}` path args from the arguments object
    fn render_path(spec: &ToolSpec, args: &Value) -> String {
        let mut path = spec.path.to_string();
        for arg in spec.args.iter().filter(|a| a.location == ArgIn::Path) {
            let value = match args.get(arg.name) {
                Some(Value::Number(n)) => n.to_string(),
                Some(Value::String(s)) => s.clone(),
                _ => String::new(),
            };
            path = path.replace(&format!("{{{}}}", arg.name), &value);
        }
        path
    }

    /// Project body args present in the arguments object into the JSON body
    fn render_body(spec: &ToolSpec, args: &Value) -> Option<Value> {
        if !matches!(spec.method, BackendMethod::Post | BackendMethod::Put) {
            return None;
        }
        let mut body = Map::new();
        for arg in spec.args.iter().filter(|a| a.location == ArgIn::Body) {
            if let Some(value) = args.get(arg.name) {
                if !value.is_null() {
                    body.insert(arg.name.to_string(), value.clone());
                }
            }
        }
        Some(Value::Object(body))
    }
}

#[async_trait]
impl ToolDispatcher for BackendClient {
    async fn dispatch(
        &self,
        spec: &ToolSpec,
        args: &Value,
        bearer: Option<&str>,
    ) -> Result<Value, DispatchError> {
        let method = match spec.method {
            BackendMethod::Get => Method::GET,
            BackendMethod::Post => Method::POST,
            BackendMethod::Put => Method::PUT,
            BackendMethod::Delete => Method::DELETE,
        };
        let url = format!("{}{}", self.base_url, Self::render_path(spec, args));

        debug!(tool = spec.name, %url, "Backend API call");

        let mut request = self
            .client
            .request(method, &url)
            .timeout(self.timeout)
            .header("Accept", "application/json");
        if let Some(token) = bearer {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        if let Some(body) = Self::render_body(spec, args) {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DispatchError::Timeout
            } else {
                DispatchError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| DispatchError::Network(e.to_string()))?;
        let body: Value =
            serde_json::from_str(&text).unwrap_or_else(|_| json!({ "raw_response": text }));

        if status.is_client_error() {
            return Err(DispatchError::Backend4xx {
                status: status.as_u16(),
                body,
            });
        }
        if status.is_server_error() {
            return Err(DispatchError::Backend5xx {
                status: status.as_u16(),
            });
        }

        debug!(tool = spec.name, status = status.as_u16(), "Backend API call succeeded");
        Ok(body)
    }
}
