//! Passthrough to the upstream application.
//!
//! # Responsibilities
//! - Forward admitted requests to the configured upstream
//! - Strip hop-by-hop headers in both directions
//! - Add `X-Forwarded-For` / `X-Forwarded-Proto` and propagate `X-Request-ID`
//!
//! # Design Decisions
//! - Bodies are streamed, never buffered
//! - Upstream connection failures map to 502 Bad Gateway
//! - The client `Host` header is preserved

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{
        header::{self, HeaderName},
        uri::{Authority, PathAndQuery, Scheme},
        HeaderMap, HeaderValue, Request, StatusCode, Uri, Version,
    },
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::http::request::X_FORWARDED_FOR;
use crate::observability::metrics;
use crate::security::headers::X_REQUEST_ID;
use crate::security::nonce::RequestId;

const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Headers meaningful only for a single transport hop.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Error constructing an upstream.
#[derive(Debug, thiserror::Error)]
#[error("invalid upstream address `{0}`")]
pub struct InvalidUpstream(pub String);

/// HTTP client bound to one upstream address.
#[derive(Clone)]
pub struct Upstream {
    client: Client<HttpConnector, Body>,
    authority: Authority,
}

impl std::fmt::Debug for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upstream")
            .field("authority", &self.authority)
            .finish_non_exhaustive()
    }
}

impl Upstream {
    pub fn new(address: &str) -> Result<Self, InvalidUpstream> {
        let authority =
            Authority::from_str(address).map_err(|_| InvalidUpstream(address.to_string()))?;
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self { client, authority })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Forward `request` and stream back the upstream response.
    pub async fn forward(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        let request_id = request.extensions().get::<RequestId>().cloned();

        let (mut parts, body) = request.into_parts();
        let method = parts.method.clone();
        let path = parts.uri.path().to_string();

        strip_hop_by_hop(&mut parts.headers);
        if let Some(ip) = peer {
            append_forwarded_for(&mut parts.headers, &ip.to_string());
        }
        parts
            .headers
            .insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));
        if let Some(id) = &request_id {
            if let Ok(value) = HeaderValue::from_str(id.as_str()) {
                parts.headers.insert(X_REQUEST_ID, value);
            }
        }

        parts.uri = match self.upstream_uri(&parts.uri) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(error = %e, path = %path, "Failed to build upstream URI");
                return (StatusCode::BAD_REQUEST, "Invalid request").into_response();
            }
        };
        parts.version = Version::HTTP_11;

        tracing::debug!(
            request_id = ?request_id.as_ref().map(RequestId::as_str),
            method = %method,
            path = %path,
            upstream = %self.authority,
            "Forwarding request"
        );

        match self.client.request(Request::from_parts(parts, body)).await {
            Ok(response) => {
                metrics::record_upstream(response.status().as_u16(), start);
                let (mut parts, body) = response.into_parts();
                strip_hop_by_hop(&mut parts.headers);
                Response::from_parts(parts, Body::new(body))
            }
            Err(e) => {
                tracing::error!(
                    request_id = ?request_id.as_ref().map(RequestId::as_str),
                    upstream = %self.authority,
                    error = %e,
                    "Upstream error"
                );
                metrics::record_upstream(StatusCode::BAD_GATEWAY.as_u16(), start);
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
        }
    }

    fn upstream_uri(&self, original: &Uri) -> Result<Uri, axum::http::uri::InvalidUriParts> {
        let mut parts = original.clone().into_parts();
        parts.scheme = Some(Scheme::HTTP);
        parts.authority = Some(self.authority.clone());
        if parts.path_and_query.is_none() {
            parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        Uri::from_parts(parts)
    }
}

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_str(name.trim()).ok())
        .collect();

    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, ip: &str) {
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) if !existing.trim().is_empty() => format!("{existing}, {ip}"),
        _ => ip.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-custom-hop"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-custom-hop", HeaderValue::from_static("1"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key(header::CONTENT_TYPE));
    }

    #[test]
    fn test_append_forwarded_for() {
        let mut headers = HeaderMap::new();
        append_forwarded_for(&mut headers, "10.0.0.1");
        assert_eq!(headers[X_FORWARDED_FOR], "10.0.0.1");

        append_forwarded_for(&mut headers, "10.0.0.2");
        assert_eq!(headers[X_FORWARDED_FOR], "10.0.0.1, 10.0.0.2");
    }

    #[test]
    fn test_upstream_uri_rewrite() {
        let upstream = Upstream::new("127.0.0.1:3000").unwrap();
        let uri: Uri = "/projects?page=2".parse().unwrap();

        let rewritten = upstream.upstream_uri(&uri).unwrap();
        assert_eq!(rewritten.to_string(), "http://127.0.0.1:3000/projects?page=2");
    }

    #[test]
    fn test_invalid_upstream_address() {
        assert!(Upstream::new("not a host").is_err());
    }
}
