use crate::model::{EvaluationRequest, Query};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "http://tuffpuff.com:8080";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    /// Unset means the request may stay pending for as long as the transport allows.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: None,
        }
    }
}

#[derive(Debug)]
pub enum DispatchError {
    Transport(reqwest::Error),
    Status { status: u16, body: String },
    Payload(serde_json::Error),
}

impl DispatchError {
    /// The service answered, but not with JSON.
    pub fn is_payload(&self) -> bool {
        matches!(self, DispatchError::Payload(_))
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Transport(err) => write!(f, "transport error: {err}"),
            DispatchError::Status { status, body } => {
                write!(f, "service responded with status {status}: {}", body.trim())
            }
            DispatchError::Payload(err) => write!(f, "response body is not json: {err}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Transport(err) => Some(err),
            DispatchError::Status { .. } => None,
            DispatchError::Payload(err) => Some(err),
        }
    }
}

impl From<reqwest::Error> for DispatchError {
    fn from(value: reqwest::Error) -> Self {
        DispatchError::Transport(value)
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(value: serde_json::Error) -> Self {
        DispatchError::Payload(value)
    }
}

/// Sends one query and resolves to the parsed JSON reply.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, query: &Query) -> impl Future<Output = Result<Value, DispatchError>> + Send;
}

/// Posts `{"query": ...}` to the classification service.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    client: Client,
    config: ClientConfig,
}

impl HttpDispatcher {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

impl Dispatcher for HttpDispatcher {
    async fn dispatch(&self, query: &Query) -> Result<Value, DispatchError> {
        debug!(endpoint = %self.config.endpoint, %query, "dispatching evaluation request");
        let mut request = self
            .client
            .post(&self.config.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .json(&EvaluationRequest { query });
        if let Some(timeout) = self.config.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "evaluation response received");
        if !status.is_success() {
            return Err(DispatchError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Replays a saved reply instead of contacting the service.
#[derive(Debug, Clone)]
pub struct StaticDispatcher {
    reply: Value,
}

impl StaticDispatcher {
    pub fn new(reply: Value) -> Self {
        Self { reply }
    }

    pub fn from_json(text: &str) -> Result<Self, DispatchError> {
        Ok(Self::new(serde_json::from_str(text)?))
    }
}

impl Dispatcher for StaticDispatcher {
    async fn dispatch(&self, query: &Query) -> Result<Value, DispatchError> {
        debug!(%query, "replaying saved evaluation response");
        Ok(self.reply.clone())
    }
}
