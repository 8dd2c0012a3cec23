//! HTTP server implementation using axum.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use futures_util::stream::StreamExt;
use futures_util::SinkExt;
use prodline_telemetry::Metrics;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{debug, info, warn};

use crate::config::DashboardConfig;
use crate::error::{DashboardError, DashboardResult};
use crate::feed::{run_production_feed, run_rates_feed};
use crate::registry::{SubscriberRegistry, Subscription, Topic, Topics};
use crate::state::DashboardState;
use crate::types::{HealthResponse, MessageResponse};

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    dashboard: DashboardState,
    registry: Arc<SubscriberRegistry>,
    config: Arc<DashboardConfig>,
}

impl AppState {
    pub fn new(
        dashboard: DashboardState,
        registry: Arc<SubscriberRegistry>,
        config: DashboardConfig,
    ) -> Self {
        Self {
            dashboard,
            registry,
            config: Arc::new(config),
        }
    }

    pub fn dashboard(&self) -> &DashboardState {
        &self.dashboard
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }
}

/// Create the axum router.
pub fn create_router(state: AppState) -> DashboardResult<Router> {
    let cors = cors_layer(state.config())?;
    Ok(Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/ws", get(ws_all))
        .route("/ws/production", get(ws_production))
        .route("/ws/rates", get(ws_rates))
        .merge(crate::api::routes())
        .layer(cors)
        .with_state(state))
}

fn cors_layer(config: &DashboardConfig) -> DashboardResult<CorsLayer> {
    let origins = config
        .cors_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|_| DashboardError::InvalidOrigin(origin.clone()))
        })
        .collect::<DashboardResult<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any))
}

async fn root() -> Json<MessageResponse> {
    Json(MessageResponse::new("prodline production line service is running"))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        subscribers: state.registry().len(),
    })
}

async fn metrics() -> Response {
    match Metrics::render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn ws_all(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws_handler(state, ws, Topics::ALL)
}

async fn ws_production(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws_handler(state, ws, Topics::only(Topic::Production))
}

async fn ws_rates(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws_handler(state, ws, Topics::only(Topic::Rates))
}

/// Register the subscriber before upgrading so a full registry answers 503.
fn ws_handler(state: AppState, ws: WebSocketUpgrade, topics: Topics) -> Response {
    let subscription = match state.registry().subscribe(topics) {
        Ok(subscription) => subscription,
        Err(e) => {
            warn!(
                error = %e,
                max = state.config().max_connections,
                "WebSocket subscription rejected"
            );
            return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
        }
    };

    info!(
        subscribers = state.registry().len(),
        "New WebSocket connection"
    );

    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, subscription, topics))
}

/// Serve one WebSocket connection until either side goes away.
async fn handle_ws_connection(
    socket: WebSocket,
    state: AppState,
    mut subscription: Subscription,
    topics: Topics,
) {
    let (mut sender, mut receiver) = socket.split();

    // Initial snapshot per topic
    for topic in topics.iter() {
        let json = match state
            .dashboard()
            .update_for(topic, Utc::now())
            .map_err(|e| e.to_string())
            .and_then(|msg| serde_json::to_string(&msg).map_err(|e| e.to_string()))
        {
            Ok(json) => json,
            Err(e) => {
                warn!(feed = topic.as_str(), error = %e, "Failed to build initial snapshot");
                continue;
            }
        };
        if sender.send(Message::Text(json.into())).await.is_err() {
            debug!("Failed to send initial snapshot, client disconnected");
            return;
        }
    }

    // Incoming frames only matter for close detection
    let mut incoming_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    debug!("Client sent close frame");
                    break;
                }
                Err(e) => {
                    debug!(error = %e, "WebSocket receive error");
                    break;
                }
                _ => {}
            }
        }
    });

    loop {
        tokio::select! {
            msg = subscription.recv() => {
                match msg {
                    Some(msg) => {
                        if sender.send(Message::Text(msg.into())).await.is_err() {
                            debug!("Failed to send message, client disconnected");
                            break;
                        }
                    }
                    None => {
                        debug!("Subscriber dropped by registry, closing connection");
                        let _ = sender.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
            _ = &mut incoming_task => {
                debug!("Incoming task completed, closing connection");
                break;
            }
        }
    }

    incoming_task.abort();
    drop(subscription);
    info!(
        subscribers = state.registry().len(),
        "WebSocket connection closed"
    );
}

/// Bind the configured address.
pub async fn bind(config: &DashboardConfig) -> DashboardResult<TcpListener> {
    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .map_err(|_| {
            DashboardError::InvalidAddress(format!("{}:{}", config.bind_address, config.port))
        })?;
    Ok(TcpListener::bind(addr).await?)
}

/// Run the dashboard on the configured address until `shutdown` is
/// cancelled.
pub async fn run_server(state: AppState, shutdown: CancellationToken) -> DashboardResult<()> {
    let listener = bind(state.config()).await?;
    serve(listener, state, shutdown).await
}

/// Serve on an already bound listener, running both feed timers alongside.
///
/// On cancellation the feeds stop, the registry is closed (ending every
/// WebSocket connection) and in-flight requests are drained.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> DashboardResult<()> {
    let app = create_router(state.clone())?;
    let config = state.config().clone();

    let production_feed = tokio::spawn(run_production_feed(
        state.dashboard().clone(),
        state.registry().clone(),
        Duration::from_millis(config.production_interval_ms),
        shutdown.child_token(),
    ));
    let rates_feed = tokio::spawn(run_rates_feed(
        state.dashboard().clone(),
        state.registry().clone(),
        Duration::from_millis(config.rates_interval_ms),
        shutdown.child_token(),
    ));

    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Starting dashboard server");
    }

    let registry = state.registry().clone();
    let signal = shutdown.clone();
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.cancelled().await;
            registry.close();
            info!("Dashboard server shutting down");
        })
        .await;

    // Also stops the feeds when the server exits on its own
    shutdown.cancel();
    for feed in [production_feed, rates_feed] {
        if let Err(e) = feed.await {
            warn!(error = %e, "Feed task failed");
        }
    }
    state.registry().close();

    result?;
    Ok(())
}
