//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router (health endpoint, passthrough fallback)
//! - Wire up middleware (tracing, panic isolation, timeout, security gate,
//!   body size cap)
//! - Bind server to listener with peer addresses exposed to the gate
//! - Run the rate-limit sweeper alongside the server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::GuardConfig;
use crate::http::health::health_handler;
use crate::http::middleware::guard_router;
use crate::http::proxy::{InvalidUpstream, Upstream};
use crate::lifecycle::sweeper::Sweeper;
use crate::security::gate::RequestGate;

/// Application state injected into handlers.
#[derive(Clone, Debug, Default)]
pub struct AppState {
    pub upstream: Option<Arc<Upstream>>,
}

/// HTTP server fronting the application with the security gate.
pub struct HttpServer {
    router: Router,
    config: GuardConfig,
    gate: RequestGate,
}

impl HttpServer {
    /// Create a server with a gate built from `config`.
    pub fn new(config: GuardConfig) -> Result<Self, InvalidUpstream> {
        let gate = RequestGate::from_config(&config);
        Self::with_gate(config, gate)
    }

    /// Create a server around an existing gate.
    pub fn with_gate(config: GuardConfig, gate: RequestGate) -> Result<Self, InvalidUpstream> {
        let upstream = config
            .upstream
            .address
            .as_deref()
            .map(Upstream::new)
            .transpose()?
            .map(Arc::new);

        let state = AppState { upstream };
        let router = Self::build_router(&config, gate.clone(), state);

        Ok(Self {
            router,
            config,
            gate,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GuardConfig, gate: RequestGate, state: AppState) -> Router {
        let router = Router::new()
            .route("/healthz", get(health_handler))
            .fallback(passthrough_handler)
            .with_state(state);

        guard_router(router, gate)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(CatchPanicLayer::new())
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = ?self.config.upstream.address,
            "HTTP server starting"
        );

        let sweep_secs = self.config.rate_limit.sweep_interval_secs;
        if sweep_secs > 0 {
            let sweeper = Sweeper::new(self.gate.limiter().clone(), Duration::from_secs(sweep_secs));
            let sweeper_shutdown = shutdown.resubscribe();
            tokio::spawn(async move {
                sweeper.run(sweeper_shutdown).await;
            });
        }

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The fully layered router, for serving or driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn gate(&self) -> &RequestGate {
        &self.gate
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }
}

/// Forward to the upstream, or 404 when there is none.
async fn passthrough_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    match &state.upstream {
        Some(upstream) => upstream.forward(request).await,
        None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}
