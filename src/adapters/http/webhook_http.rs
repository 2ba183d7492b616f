//! Webhook HTTP server.
//!
//! Receives GitHub webhook deliveries and hands them to the linking
//! orchestrator. The event name comes from the `X-GitHub-Event` header.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::domain::errors::DomainError;
use crate::domain::models::ServerConfig;
use crate::services::event_bus::EventBus;
use crate::services::linking_orchestrator::{LinkingOrchestrator, WebhookOutcome};

/// Header carrying the GitHub event name.
pub const EVENT_HEADER: &str = "x-github-event";

/// Configuration for the Webhook HTTP Server.
#[derive(Debug, Clone)]
pub struct WebhookHttpConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for WebhookHttpConfig {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for WebhookHttpConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
        }
    }
}

/// Shared state for the Webhook HTTP server.
pub struct WebhookState {
    pub orchestrator: Arc<LinkingOrchestrator>,
    pub event_bus: Arc<EventBus>,
    pub config: WebhookHttpConfig,
}

/// Webhook HTTP Server.
pub struct WebhookHttpServer {
    state: Arc<WebhookState>,
}

impl WebhookHttpServer {
    pub fn new(
        orchestrator: Arc<LinkingOrchestrator>,
        event_bus: Arc<EventBus>,
        config: WebhookHttpConfig,
    ) -> Self {
        Self {
            state: Arc::new(WebhookState {
                orchestrator,
                event_bus,
                config,
            }),
        }
    }

    /// Build the router with all endpoints.
    pub fn build_router(&self) -> Router {
        Router::new()
            .route("/webhook", post(receive_webhook))
            .route("/health", get(health_check))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
    }

    fn addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.state.config.host, self.state.config.port).parse()
    }

    /// Start the server.
    pub async fn serve(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = self.addr()?;
        let router = self.build_router();

        tracing::info!("Webhook HTTP server listening on {}", addr);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;
        Ok(())
    }

    /// Start the server with a shutdown signal.
    pub async fn serve_with_shutdown<F>(
        self,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = self.addr()?;
        let router = self.build_router();

        tracing::info!("Webhook HTTP server listening on {}", addr);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

/// Error response structure.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>, code: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.to_string(),
        }),
    )
}

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    service: String,
    current_sequence: u64,
    subscriber_count: usize,
}

/// Receive one webhook delivery.
async fn receive_webhook(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookOutcome>, ApiError> {
    let event = headers
        .get(EVENT_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            api_error(
                StatusCode::BAD_REQUEST,
                "Missing X-GitHub-Event header",
                "missing_event_header",
            )
        })?;

    let payload: Value = serde_json::from_slice(&body).map_err(|e| {
        api_error(
            StatusCode::BAD_REQUEST,
            format!("Malformed JSON body: {e}"),
            "malformed_json",
        )
    })?;

    state
        .orchestrator
        .handle_webhook(event, payload)
        .await
        .map(Json)
        .map_err(|e| {
            let status = match e {
                DomainError::InvalidPayload(_) => StatusCode::UNPROCESSABLE_ENTITY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            tracing::warn!(event, error = %e, "Webhook handling failed");
            api_error(status, e.to_string(), e.code())
        })
}

/// Health check endpoint.
async fn health_check(State(state): State<Arc<WebhookState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "prlink-webhooks".to_string(),
        current_sequence: state.event_bus.current_sequence().0,
        subscriber_count: state.event_bus.subscriber_count(),
    })
}
