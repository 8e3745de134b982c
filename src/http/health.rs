//! Liveness endpoint.
//!
//! Reports only coarse status: no memory, uptime, or host details.

use std::time::Duration;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::time;

use crate::http::server::AppState;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: String,
    pub service: &'static str,
    pub version: &'static str,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub gate: &'static str,
    /// `healthy`, `unhealthy`, or `not_configured`.
    pub upstream: &'static str,
}

pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let upstream = match &state.upstream {
        None => "not_configured",
        Some(upstream) => {
            let addr = upstream.authority().as_str().to_string();
            match time::timeout(PROBE_TIMEOUT, TcpStream::connect(&addr)).await {
                Ok(Ok(_)) => "healthy",
                Ok(Err(e)) => {
                    tracing::warn!(upstream = %addr, error = %e, "Health probe failed: connection error");
                    "unhealthy"
                }
                Err(_) => {
                    tracing::warn!(upstream = %addr, "Health probe failed: timeout");
                    "unhealthy"
                }
            }
        }
    };

    let healthy = upstream != "unhealthy";
    let report = HealthReport {
        status: if healthy { "healthy" } else { "unhealthy" },
        timestamp: chrono::Utc::now().to_rfc3339(),
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        checks: HealthChecks {
            gate: "healthy",
            upstream,
        },
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}
