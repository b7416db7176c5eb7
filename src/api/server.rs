//! HTTP API server: scoring, tracking and SSE event streaming

use super::{
    events::{Event, EventBroadcaster},
    state::SessionRegistry,
};
use crate::config::TrackingConfig;
use crate::error::{BreakinError, Result};
use crate::evaluation::Scorer;
use crate::tracking::LiveFeedbackEmitter;
use crate::types::{CodeSnapshot, EvaluationResult, EvaluationSummary, SessionIds};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{
        sse::{Event as SseEvent, KeepAlive},
        IntoResponse, Sse,
    },
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::{wrappers::BroadcastStream, StreamExt as _};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server address
    pub addr: SocketAddr,
    /// Event channel capacity
    pub event_capacity: usize,
    /// Period of heartbeat events on the stream
    pub heartbeat_interval: Duration,
    /// Idle time after which a server-side session is evicted (None keeps all)
    pub session_idle_timeout: Option<Duration>,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            addr: ([127, 0, 0, 1], 3000).into(),
            event_capacity: 1000,
            heartbeat_interval: Duration::from_secs(10),
            session_idle_timeout: Some(Duration::from_secs(3600)),
        }
    }
}

impl ApiServerConfig {
    pub fn from_tracking(config: &TrackingConfig) -> Result<Self> {
        Ok(Self {
            addr: config.socket_addr()?,
            event_capacity: config.event_capacity,
            heartbeat_interval: config.heartbeat_interval(),
            session_idle_timeout: config.session_idle_timeout(),
        })
    }
}

/// API server state
#[derive(Clone)]
struct AppState {
    /// Event broadcaster
    events: EventBroadcaster,
    /// Live feedback on the same channel
    feedback: LiveFeedbackEmitter,
    /// Per-session aggregators
    sessions: Arc<SessionRegistry>,
    /// Shared scorer
    scorer: Arc<Scorer>,
    /// Instance ID
    instance_id: String,
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    events: EventBroadcaster,
    sessions: Arc<SessionRegistry>,
    scorer: Arc<Scorer>,
    instance_id: String,
    /// Shutdown signal for background tasks
    shutdown_tx: tokio::sync::broadcast::Sender<()>,
    /// Heartbeat task handle for cleanup
    heartbeat_handle: Option<tokio::task::JoinHandle<()>>,
}

impl ApiServer {
    /// Create new API server with an entropy-seeded scorer
    pub fn new(config: ApiServerConfig) -> Self {
        Self::with_scorer(config, Arc::new(Scorer::new()))
    }

    /// Create new API server with a specific scorer
    pub fn with_scorer(config: ApiServerConfig, scorer: Arc<Scorer>) -> Self {
        let events = EventBroadcaster::new(config.event_capacity);
        let instance_id = uuid::Uuid::new_v4().to_string()[..8].to_string();

        // Create shutdown channel for graceful task termination
        let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);

        Self {
            config,
            events,
            sessions: Arc::new(SessionRegistry::new()),
            scorer,
            instance_id,
            shutdown_tx,
            heartbeat_handle: None,
        }
    }

    /// Get event broadcaster
    pub fn broadcaster(&self) -> &EventBroadcaster {
        &self.events
    }

    /// Get session registry
    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Get instance ID
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    fn app_state(&self) -> AppState {
        AppState {
            events: self.events.clone(),
            feedback: LiveFeedbackEmitter::new(self.events.clone()),
            sessions: self.sessions.clone(),
            scorer: self.scorer.clone(),
            instance_id: self.instance_id.clone(),
        }
    }

    /// Build router
    pub fn router(&self) -> Router {
        Self::build_router(self.app_state())
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            // Scoring and tracking
            .route("/evaluate/code-snapshot", post(evaluate_handler))
            .route("/track/code-snapshot", post(track_handler))
            .route("/track/summary", get(summary_handler))
            .route("/track/session", delete(clear_session_handler))
            // Event streaming
            .route("/events", get(events_handler))
            // Health check
            .route("/health", get(health_handler))
            // State
            .with_state(state)
            // Middleware
            .layer(CatchPanicLayer::new())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Start serving with dynamic port allocation
    ///
    /// Tries the configured address first, then attempts alternative ports
    /// if the primary port is unavailable.
    pub async fn serve(mut self) -> anyhow::Result<()> {
        let router = self.router();

        // Spawn heartbeat task with shutdown support; it also evicts idle sessions
        let events_clone = self.events.clone();
        let sessions_clone = self.sessions.clone();
        let instance_id_clone = self.instance_id.clone();
        let period = self.config.heartbeat_interval;
        let idle_timeout = self.config.session_idle_timeout;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let heartbeat_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let _ = events_clone.broadcast(Event::heartbeat(instance_id_clone.clone()));
                        if let Some(max_idle) = idle_timeout {
                            evict_idle_sessions(&sessions_clone, &events_clone, max_idle).await;
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Heartbeat task received shutdown signal");
                        break;
                    }
                }
            }
        });

        // Store heartbeat handle for cleanup
        self.heartbeat_handle = Some(heartbeat_handle);

        // Try configured address first
        match tokio::net::TcpListener::bind(self.config.addr).await {
            Ok(listener) => {
                info!(
                    "API server [{}] listening on http://{}",
                    self.instance_id, self.config.addr
                );
                axum::serve(listener, router).await?;
                return Ok(());
            }
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                debug!(
                    "Port {} in use, trying alternative ports...",
                    self.config.addr.port()
                );
            }
            Err(e) => return Err(e.into()),
        }

        // Try alternative ports (base+1 ..= base+10)
        let base_port = self.config.addr.port();
        for offset in 1..=10 {
            let alt_addr = SocketAddr::new(self.config.addr.ip(), base_port + offset);

            match tokio::net::TcpListener::bind(alt_addr).await {
                Ok(listener) => {
                    info!(
                        "API server [{}] listening on http://{}",
                        self.instance_id, alt_addr
                    );
                    axum::serve(listener, router).await?;
                    return Ok(());
                }
                Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(anyhow::anyhow!(
            "All ports ({}-{}) are in use. API server unavailable for instance {}.",
            base_port,
            base_port + 10,
            self.instance_id
        ))
    }
}

/// Evict idle sessions and announce each as cleared
async fn evict_idle_sessions(
    sessions: &SessionRegistry,
    events: &EventBroadcaster,
    max_idle: Duration,
) -> usize {
    let evicted = sessions.evict_idle(max_idle).await;
    let count = evicted.len();
    for ids in evicted {
        info!("Evicting idle session {}", ids);
        let _ = events.broadcast(Event::session_cleared(ids));
    }
    count
}

/// A snapshot accepted by the server
struct Processed {
    seq: u64,
    client_seq: u64,
    result: EvaluationResult,
}

/// Validate, number, score, record and announce one snapshot.
///
/// The server numbers every snapshot itself: a client that restarts begins
/// again at 1 and must not overwrite what it sent before.
async fn process_snapshot(
    state: &AppState,
    payload: std::result::Result<Json<CodeSnapshot>, JsonRejection>,
) -> Result<Processed> {
    let Json(mut snapshot) =
        payload.map_err(|rejection| BreakinError::InvalidSnapshot(rejection.body_text()))?;
    snapshot.validate()?;

    let ids = snapshot.session_ids();
    let aggregator = state.sessions.aggregator_for(&ids).await;
    let client_seq = snapshot.seq;
    let seq = aggregator.next_sequence().await;
    snapshot.seq = seq;
    if client_seq != 0 && client_seq != seq {
        debug!("Snapshot {} from {} recorded as {}", client_seq, ids, seq);
    }

    let result = state.scorer.evaluate(&snapshot)?;
    aggregator.record(snapshot, result.clone()).await;
    state.feedback.emit(&ids, seq, &result);

    Ok(Processed {
        seq,
        client_seq,
        result,
    })
}

/// Score a snapshot and return the evaluation
async fn evaluate_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CodeSnapshot>, JsonRejection>,
) -> Result<Json<EvaluationResult>> {
    match process_snapshot(&state, payload).await {
        Ok(processed) => Ok(Json(processed.result)),
        Err(e) => {
            warn!("Evaluation request failed: {}", e);
            Err(e)
        }
    }
}

/// Track response: callers are free to ignore it
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackResponse {
    pub accepted: bool,
    /// Sequence number the server recorded the snapshot under
    pub seq: u64,
    /// Sequence number the client sent, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_seq: Option<u64>,
}

/// Fire-and-forget snapshot tracking
async fn track_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CodeSnapshot>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let processed = process_snapshot(&state, payload).await.map_err(|e| {
        warn!("Track request failed: {}", e);
        e
    })?;
    Ok((
        StatusCode::ACCEPTED,
        Json(TrackResponse {
            accepted: true,
            seq: processed.seq,
            client_seq: (processed.client_seq != 0).then_some(processed.client_seq),
        }),
    ))
}

/// Rolling summary of a server-side session
async fn summary_handler(
    State(state): State<AppState>,
    Query(ids): Query<SessionIds>,
) -> Json<EvaluationSummary> {
    let summary = match state.sessions.get(&ids).await {
        Some(aggregator) => aggregator.summary().await,
        None => EvaluationSummary::empty(),
    };
    Json(summary)
}

/// Clear a server-side session
async fn clear_session_handler(
    State(state): State<AppState>,
    Query(ids): Query<SessionIds>,
) -> StatusCode {
    if let Some(aggregator) = state.sessions.remove(&ids).await {
        aggregator.clear().await;
        state.feedback.publish(Event::session_cleared(ids));
    }
    StatusCode::NO_CONTENT
}

/// SSE events handler
async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = std::result::Result<SseEvent, Infallible>>> {
    debug!("New SSE client connected");

    let rx = state.events.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => {
            // Convert Event to SSE Event
            let data = serde_json::to_string(&event).ok()?;
            Some(Ok(SseEvent::default().data(data).id(event.id)))
        }
        Err(_) => None, // Skip lagged messages
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Health check handler
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub instance_id: String,
    pub subscribers: usize,
    pub sessions: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.sessions.stats().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        instance_id: state.instance_id.clone(),
        subscribers: state.events.subscriber_count(),
        sessions: stats.sessions,
    })
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        // Send shutdown signal to background tasks
        let _ = self.shutdown_tx.send(());

        // Abort heartbeat task if it's still running
        if let Some(handle) = self.heartbeat_handle.take() {
            handle.abort();
            debug!("ApiServer dropped - heartbeat task aborted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::events::EventType;

    fn test_state() -> AppState {
        let events = EventBroadcaster::default();
        AppState {
            feedback: LiveFeedbackEmitter::new(events.clone()),
            events,
            sessions: Arc::new(SessionRegistry::new()),
            scorer: Arc::new(Scorer::seeded(5)),
            instance_id: "test-instance".to_string(),
        }
    }

    #[tokio::test]
    async fn test_server_creation() {
        let server = ApiServer::new(ApiServerConfig::default());
        assert_eq!(server.broadcaster().subscriber_count(), 0);
        assert_eq!(server.instance_id().len(), 8);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = health_handler(State(test_state())).await;
        assert_eq!(response.0.status, "ok");
        assert_eq!(response.0.instance_id, "test-instance");
        assert_eq!(response.0.sessions, 0);
    }

    #[tokio::test]
    async fn test_config_from_tracking() {
        let config = ApiServerConfig::from_tracking(&TrackingConfig {
            bind_addr: "0.0.0.0:8088".to_string(),
            ..TrackingConfig::default()
        })
        .unwrap();
        assert_eq!(config.addr.port(), 8088);
        assert_eq!(config.event_capacity, 1000);
        assert_eq!(config.session_idle_timeout, Some(Duration::from_secs(3600)));
    }

    #[tokio::test]
    async fn test_idle_eviction_announces_cleared_sessions() {
        let state = test_state();
        let mut rx = state.events.subscribe();
        let ids = SessionIds::new("dev-1", "sprint-1", "task-1");
        state.sessions.aggregator_for(&ids).await;

        assert_eq!(
            evict_idle_sessions(&state.sessions, &state.events, Duration::from_secs(60)).await,
            0
        );

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(
            evict_idle_sessions(&state.sessions, &state.events, Duration::from_millis(5)).await,
            1
        );
        assert_eq!(state.sessions.stats().await.sessions, 0);

        match rx.recv().await.unwrap().event_type {
            EventType::SessionCleared { session, .. } => assert_eq!(session, ids),
            other => panic!("Wrong event type: {:?}", other),
        }
    }
}
