//! The security gate as axum middleware.
//!
//! Rejections short-circuit with a status and a short plain-text body. On
//! admission the nonce and request id go into request extensions for
//! downstream handlers, and the gate's headers are merged into whatever
//! response comes back, replacing any value the handler set.
//!
//! The gate only sees the declared `Content-Length`. Bodies without one
//! (chunked uploads) are capped at the same size by a
//! `RequestBodyLimitLayer` inside the gate; see [`guard_router`].

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;

use crate::observability::metrics;
use crate::security::gate::{GateRequest, RequestGate, SecurityDecision};

pub async fn security_gate_middleware(
    State(gate): State<RequestGate>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let decision = gate.evaluate(&GateRequest::from_request(&request));

    match decision {
        Ok(SecurityDecision::Admit(admission)) => {
            metrics::record_admitted();
            request.extensions_mut().insert(admission.nonce);
            request.extensions_mut().insert(admission.request_id);

            let mut response = next.run(request).await;
            merge_headers(response.headers_mut(), admission.headers);
            response
        }
        Ok(SecurityDecision::Reject(reason)) => {
            metrics::record_rejected(reason.as_str());
            (reason.status(), reason.message()).into_response()
        }
        Err(e) => {
            // Fail closed: an unverifiable request is never admitted.
            tracing::error!(error = %e, "Security gate fault, rejecting request");
            metrics::record_rejected("internal_error");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
        }
    }
}

/// Put `router` behind the gate, with streamed bodies capped at
/// `max_request_bytes`. Reading past the cap fails the body, which axum
/// extractors report as 413.
pub fn guard_router<S>(router: Router<S>, gate: RequestGate) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let max_body = usize::try_from(gate.config().max_request_bytes).unwrap_or(usize::MAX);

    router
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(middleware::from_fn_with_state(gate, security_gate_middleware))
}

/// Overwrite `target` with every header in `gate_headers`.
pub fn merge_headers(target: &mut HeaderMap, gate_headers: HeaderMap) {
    target.extend(gate_headers);
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_merge_replaces_existing() {
        let mut target = HeaderMap::new();
        target.insert("x-frame-options", HeaderValue::from_static("SAMEORIGIN"));
        target.insert("content-type", HeaderValue::from_static("text/html"));

        let mut gate_headers = HeaderMap::new();
        gate_headers.insert("x-frame-options", HeaderValue::from_static("DENY"));

        merge_headers(&mut target, gate_headers);
        assert_eq!(target.get_all("x-frame-options").iter().count(), 1);
        assert_eq!(target["x-frame-options"], "DENY");
        assert_eq!(target["content-type"], "text/html");
    }
}
