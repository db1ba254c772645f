//! Log filter gateway - HTTP JSON-RPC entry point.
//!
//! Serves the filter methods on `POST /`, plus `/health` and `/metrics`, and
//! runs the expiration sweep for the lifetime of the server.

use crate::domain::config::FilterServiceConfig;
use crate::domain::error::{ApiError, GatewayError};
use crate::middleware::{RequestTimer, RpcMetrics};
use crate::ports::{HeightResolver, LogSource, SystemTimeSource, TimeSource};
use crate::router::{route_method, AppState};
use crate::rpc::RpcHandlers;
use crate::service::{cleanup_task, LogFilterService};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info};

/// Log filter gateway service
pub struct FilterGatewayService {
    config: FilterServiceConfig,
    service: Arc<LogFilterService>,
    rpc_handlers: Arc<RpcHandlers>,
    metrics: Arc<RpcMetrics>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server_handle: Option<JoinHandle<std::io::Result<()>>>,
    sweeper_handle: Option<JoinHandle<()>>,
}

impl FilterGatewayService {
    /// Create the gateway over the given chain collaborators
    pub fn new(
        config: FilterServiceConfig,
        resolver: Arc<dyn HeightResolver>,
        source: Arc<dyn LogSource>,
    ) -> Result<Self, GatewayError> {
        Self::with_clock(config, resolver, source, Arc::new(SystemTimeSource))
    }

    /// Create the gateway with an explicit clock for filter expiration
    pub fn with_clock(
        config: FilterServiceConfig,
        resolver: Arc<dyn HeightResolver>,
        source: Arc<dyn LogSource>,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, GatewayError> {
        config.validate()?;

        let service = Arc::new(LogFilterService::new(&config, resolver, source, clock));
        let rpc_handlers = Arc::new(RpcHandlers::new(service.clone()));

        Ok(Self {
            config,
            service,
            rpc_handlers,
            metrics: Arc::new(RpcMetrics::new()),
            shutdown_tx: None,
            server_handle: None,
            sweeper_handle: None,
        })
    }

    /// Start the expiration sweep and, if enabled, the HTTP server.
    ///
    /// Returns the bound address when the HTTP server is running.
    pub async fn start(&mut self) -> Result<Option<SocketAddr>, GatewayError> {
        info!("Starting log filter gateway...");

        let registry = self.service.registry().clone();
        let sweep_interval = self.config.filters.sweep_interval;
        self.sweeper_handle = Some(tokio::spawn(cleanup_task(registry, sweep_interval)));

        if !self.config.http.enabled {
            info!("HTTP server disabled");
            return Ok(None);
        }

        let listener = tokio::net::TcpListener::bind(self.config.http_addr()).await?;
        let addr = listener.local_addr()?;
        let router = self.router();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        self.shutdown_tx = Some(shutdown_tx);
        self.server_handle = Some(tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        }));

        info!(addr = %addr, "HTTP server listening");
        Ok(Some(addr))
    }

    /// Stop accepting requests, wait for in-flight ones and stop the sweep.
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.server_handle.take() {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "HTTP server error"),
                Err(e) => error!(error = %e, "HTTP server task failed"),
            }
        }
        if let Some(handle) = self.sweeper_handle.take() {
            handle.abort();
        }
        info!("Log filter gateway stopped");
    }

    /// The filter service behind the endpoint
    pub fn service(&self) -> Arc<LogFilterService> {
        Arc::clone(&self.service)
    }

    /// Get metrics
    pub fn metrics(&self) -> Arc<RpcMetrics> {
        Arc::clone(&self.metrics)
    }

    /// HTTP router for JSON-RPC
    pub fn router(&self) -> Router {
        let state = AppState {
            rpc_handlers: Arc::clone(&self.rpc_handlers),
            metrics: Arc::clone(&self.metrics),
            registry: self.service.registry().clone(),
        };

        let middleware = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(RequestBodyLimitLayer::new(self.config.http.max_request_size));

        Router::new()
            .route("/", post(handle_json_rpc))
            .route("/health", get(health_check))
            .route("/metrics", get(metrics_export))
            .layer(middleware)
            .with_state(HandlerState {
                app: state,
                max_batch_size: self.config.http.max_batch_size,
            })
    }
}

#[derive(Clone)]
struct HandlerState {
    app: AppState,
    max_batch_size: usize,
}

fn error_response(id: Option<serde_json::Value>, error: ApiError) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "error": error,
        "id": id,
    })
}

/// Handle JSON-RPC request
async fn handle_json_rpc(State(state): State<HandlerState>, body: String) -> impl IntoResponse {
    let request: serde_json::Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(error_response(
                    None,
                    ApiError::parse_error(e.to_string()),
                )),
            );
        }
    };

    let response = match request {
        serde_json::Value::Array(requests) => {
            state.app.metrics.record_batch();
            if requests.is_empty() {
                error_response(None, ApiError::invalid_request("empty batch"))
            } else if requests.len() > state.max_batch_size {
                error_response(
                    None,
                    ApiError::invalid_request(format!(
                        "batch of {} exceeds maximum of {}",
                        requests.len(),
                        state.max_batch_size
                    )),
                )
            } else {
                // In order: a batch may poll a filter and then uninstall it
                let mut responses = Vec::with_capacity(requests.len());
                for req in &requests {
                    responses.push(process_single_request(&state.app, req).await);
                }
                serde_json::Value::Array(responses)
            }
        }
        single => process_single_request(&state.app, &single).await,
    };

    (StatusCode::OK, Json(response))
}

/// Process a single JSON-RPC request
async fn process_single_request(
    state: &AppState,
    request: &serde_json::Value,
) -> serde_json::Value {
    let id = request.get("id").cloned();

    if let Some(ref id_val) = id {
        // Null ID means notification; notifications are not supported
        if id_val.is_null() {
            return error_response(
                None,
                ApiError::invalid_request("null id (notifications not supported)"),
            );
        }
        if let Some(s) = id_val.as_str() {
            if s.is_empty() || s.len() > 256 {
                return error_response(
                    None,
                    ApiError::invalid_request("id string must be 1 to 256 chars"),
                );
            }
        }
        if !id_val.is_string() && !id_val.is_number() {
            return error_response(
                None,
                ApiError::invalid_request("id must be string or number"),
            );
        }
    }

    let method = match request.get("method").and_then(|m| m.as_str()) {
        Some(method) => method,
        None => return error_response(id, ApiError::invalid_request("missing method")),
    };
    let params = request.get("params");

    let timer = RequestTimer::new(Arc::clone(&state.metrics));
    match route_method(state, method, params).await {
        Ok(value) => {
            timer.finish(true);
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": value
            })
        }
        Err(e) => {
            timer.finish(false);
            error_response(id, e)
        }
    }
}

async fn health_check(State(state): State<HandlerState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "log-filters",
        "version": env!("CARGO_PKG_VERSION"),
        "filters": state.app.registry.stats_snapshot(),
    }))
}

async fn metrics_export(State(state): State<HandlerState>) -> impl IntoResponse {
    let body = state
        .app
        .metrics
        .to_prometheus(&state.app.registry.stats_snapshot());
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}
