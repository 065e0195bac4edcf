//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router around the docs pipeline
//! - Wire up middleware (request ID, tracing, timeout, CORS origin)
//! - Bound the number of requests in the pipeline
//! - Track cache writes scheduled by handlers
//! - Serve until shutdown, then drain pending cache writes

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request},
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::cache::CacheGateway;
use crate::config::ProxyConfig;
use crate::error::SetupError;
use crate::http::request::{request_id, UuidRequestId};
use crate::lifecycle::BackgroundTasks;
use crate::observability::metrics;
use crate::proxy::{DocsProxy, Handled};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<DocsProxy>,
    pub tasks: BackgroundTasks,
    /// Bounds requests in the pipeline at once; excess requests wait.
    pub in_flight: Arc<Semaphore>,
}

/// HTTP server for the docs proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    tasks: BackgroundTasks,
}

impl HttpServer {
    /// Create a server with the cache described by `config`.
    pub fn new(config: ProxyConfig) -> Result<Self, SetupError> {
        let cache = CacheGateway::from_config(&config.cache);
        Self::with_cache(config, cache)
    }

    /// Create a server around an existing cache.
    pub fn with_cache(config: ProxyConfig, cache: CacheGateway) -> Result<Self, SetupError> {
        let proxy = Arc::new(DocsProxy::new(&config, cache)?);
        let tasks = BackgroundTasks::new();
        let state = AppState {
            proxy,
            tasks: tasks.clone(),
            in_flight: Arc::new(Semaphore::new(
                config.listener.max_connections.min(Semaphore::MAX_PERMITS),
            )),
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            tasks,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            // Responses made outside the pipeline, like the timeout's 408.
            .layer(SetResponseHeaderLayer::if_not_present(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            ))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id(request),
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The router, for serving it elsewhere or driving it in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Cache writes scheduled by handlers that have not been drained yet.
    pub fn tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires, then drain pending cache writes.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, upstream = %self.config.upstream.base_url, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        self.tasks
            .drain(Duration::from_secs(self.config.timeouts.drain_secs))
            .await;
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Runs the pipeline and hands its cache write to the task registry.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let _permit = state.in_flight.clone().acquire_owned().await.ok();
    let Handled {
        response,
        background,
    } = state.proxy.handle(request).await;

    if let Some(task) = background {
        state.tasks.track(task);
    }
    metrics::record_request(response.status().as_u16(), start);
    response
}
