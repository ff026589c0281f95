//! HTTP client for the provider's replica endpoints.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue, USER_AGENT};
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tracing::debug;

use scalegate_scaling::{QueryError, ReplicaObservation, ReplicaQuery};

use crate::types::{FunctionStatus, ScaleServiceRequest};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// [`ReplicaQuery`] backed by a provider HTTP API.
#[derive(Clone)]
pub struct HttpReplicaQuery {
    base_url: String,
    client: Client<HttpConnector, Full<Bytes>>,
    authorization: Option<HeaderValue>,
    timeout: Duration,
}

impl HttpReplicaQuery {
    /// `base_url` is the provider root, e.g. `http://127.0.0.1:8081`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: Client::builder(TokioExecutor::new()).build_http(),
            authorization: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Per-request timeout, covering connect, headers and body.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send `value` as the `Authorization` header on every request.
    pub fn with_authorization(mut self, value: HeaderValue) -> Self {
        self.authorization = Some(value);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request(&self, method: Method, path: &str, body: Bytes) -> Result<Request<Full<Bytes>>, QueryError> {
        let mut builder = Request::builder()
            .method(method)
            .uri(format!("{}{path}", self.base_url))
            .header(USER_AGENT, "scalegate/0.1")
            .header(CONTENT_TYPE, "application/json");
        if let Some(auth) = &self.authorization {
            builder = builder.header(AUTHORIZATION, auth.clone());
        }
        builder
            .body(Full::new(body))
            .map_err(|e| QueryError::Transport(e.to_string()))
    }

    async fn send(&self, req: Request<Full<Bytes>>) -> Result<(StatusCode, Bytes), QueryError> {
        let uri = req.uri().clone();
        let exchange = async {
            let resp = self
                .client
                .request(req)
                .await
                .map_err(|e| QueryError::Transport(e.to_string()))?;
            let status = resp.status();
            let body = resp
                .into_body()
                .collect()
                .await
                .map_err(|e| QueryError::Transport(e.to_string()))?
                .to_bytes();
            Ok((status, body))
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => {
                if let Ok((status, _)) = &result {
                    debug!(%uri, %status, "provider responded");
                }
                result
            }
            Err(_) => Err(QueryError::Transport(format!(
                "request to {uri} timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

/// Function names become a single path segment; anything that would
/// change the path is rejected before a request is made.
fn valid_function_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn status_error(status: StatusCode, body: &Bytes) -> QueryError {
    QueryError::Status {
        status: status.as_u16(),
        body: String::from_utf8_lossy(body).trim().to_string(),
    }
}

#[async_trait]
impl ReplicaQuery for HttpReplicaQuery {
    async fn get_replicas(&self, function: &str) -> Result<ReplicaObservation, QueryError> {
        if !valid_function_name(function) {
            return Err(QueryError::NotFound(function.to_string()));
        }

        let req = self.build_request(Method::GET, &format!("/system/function/{function}"), Bytes::new())?;
        let (status, body) = self.send(req).await?;

        match status {
            StatusCode::OK => {
                let status: FunctionStatus =
                    serde_json::from_slice(&body).map_err(|e| QueryError::Decode(e.to_string()))?;
                Ok(status.observation())
            }
            StatusCode::NOT_FOUND => Err(QueryError::NotFound(function.to_string())),
            other => Err(status_error(other, &body)),
        }
    }

    async fn set_replicas(&self, function: &str, replicas: u64) -> Result<(), QueryError> {
        if !valid_function_name(function) {
            return Err(QueryError::NotFound(function.to_string()));
        }

        let payload = serde_json::to_vec(&ScaleServiceRequest {
            service_name: function.to_string(),
            replicas,
        })
        .map_err(|e| QueryError::Decode(e.to_string()))?;

        let req = self.build_request(
            Method::POST,
            &format!("/system/scale-function/{function}"),
            Bytes::from(payload),
        )?;
        let (status, body) = self.send(req).await?;

        match status {
            StatusCode::OK | StatusCode::ACCEPTED => Ok(()),
            StatusCode::NOT_FOUND => Err(QueryError::NotFound(function.to_string())),
            other => Err(status_error(other, &body)),
        }
    }
}
