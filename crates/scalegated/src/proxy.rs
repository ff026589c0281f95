//! Reverse proxy to the function upstream.
//!
//! Runs behind the scale gate, so by the time a request gets here the
//! function has at least one ready replica.

use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{
    CONNECTION, HOST, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, TE, TRAILER, TRANSFER_ENCODING,
    UPGRADE,
};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use http::Uri;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tracing::warn;

/// Drop hop-by-hop headers, including any named in `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<String> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();
    for name in named {
        headers.remove(name.as_str());
    }

    for name in [
        CONNECTION,
        PROXY_AUTHENTICATE,
        PROXY_AUTHORIZATION,
        TE,
        TRAILER,
        TRANSFER_ENCODING,
        UPGRADE,
    ] {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers.remove("proxy-connection");
}

/// Forwards requests to `{base_url}{path_and_query}`.
#[derive(Clone)]
pub struct UpstreamProxy {
    base_url: String,
    client: Client<HttpConnector, Body>,
}

impl UpstreamProxy {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::builder(TokioExecutor::new()).build_http(),
        }
    }

    fn upstream_uri(&self, req: &Request) -> Result<Uri, http::uri::InvalidUri> {
        let path_and_query = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        format!("{}{path_and_query}", self.base_url).parse()
    }

    pub async fn forward(&self, mut req: Request) -> Response {
        let uri = match self.upstream_uri(&req) {
            Ok(uri) => uri,
            Err(e) => {
                warn!(error = %e, base = %self.base_url, "invalid upstream uri");
                return (StatusCode::BAD_GATEWAY, format!("invalid upstream uri: {e}")).into_response();
            }
        };

        *req.uri_mut() = uri;
        req.headers_mut().remove(HOST);
        strip_hop_by_hop(req.headers_mut());

        match self.client.request(req).await {
            Ok(mut resp) => {
                strip_hop_by_hop(resp.headers_mut());
                resp.map(Body::new).into_response()
            }
            Err(e) => {
                warn!(error = %e, base = %self.base_url, "upstream request failed");
                (StatusCode::BAD_GATEWAY, format!("upstream request failed: {e}")).into_response()
            }
        }
    }
}

async fn forward(State(proxy): State<UpstreamProxy>, req: Request) -> Response {
    proxy.forward(req).await
}

/// Invocation routes, to be placed behind the scale gate.
pub fn router(proxy: UpstreamProxy) -> Router {
    Router::new()
        .route("/function/{*rest}", any(forward))
        .with_state(proxy)
}
