//! Session controller wiring collector, dispatcher, aggregator and emitter

use crate::api::events::{Event, EventBroadcaster};
use crate::config::TrackingConfig;
use crate::services::ScoringClient;
use crate::tracking::aggregator::EvaluationAggregator;
use crate::tracking::collector::MetricsCollector;
use crate::tracking::dispatcher::SnapshotDispatcher;
use crate::tracking::feedback::LiveFeedbackEmitter;
use crate::types::{EvaluationResult, EvaluationSummary, SessionIds, SessionMetrics};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// One continuous period of coding activity for one user on one task.
///
/// Editor events are ignored until [`start`](Self::start) and after
/// [`stop`](Self::stop). Stopping refuses new dispatches but lets requests
/// already in flight finish.
pub struct TrackingSession {
    ids: SessionIds,
    collector: MetricsCollector,
    aggregator: EvaluationAggregator,
    emitter: LiveFeedbackEmitter,
    dispatcher: SnapshotDispatcher,
    tick_interval: Duration,
    active: Arc<AtomicBool>,
    /// Shutdown signal for the tick task
    shutdown_tx: broadcast::Sender<()>,
    tick_handle: Option<JoinHandle<()>>,
}

impl TrackingSession {
    /// Create a session with its own event channel
    pub fn new(ids: SessionIds, config: &TrackingConfig, client: Arc<dyn ScoringClient>) -> Self {
        Self::with_broadcaster(ids, config, client, EventBroadcaster::new(config.event_capacity))
    }

    /// Create a session publishing on an existing event channel
    pub fn with_broadcaster(
        ids: SessionIds,
        config: &TrackingConfig,
        client: Arc<dyn ScoringClient>,
        events: EventBroadcaster,
    ) -> Self {
        let collector = MetricsCollector::new();
        let aggregator = EvaluationAggregator::new();
        let emitter = LiveFeedbackEmitter::new(events);
        let dispatcher = SnapshotDispatcher::new(
            ids.clone(),
            client,
            aggregator.clone(),
            emitter.clone(),
            config.snapshot_cadence,
        );
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            ids,
            collector,
            aggregator,
            emitter,
            dispatcher,
            tick_interval: config.tick_interval(),
            active: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            tick_handle: None,
        }
    }

    pub fn ids(&self) -> &SessionIds {
        &self.ids
    }

    pub fn collector(&self) -> &MetricsCollector {
        &self.collector
    }

    pub fn aggregator(&self) -> &EvaluationAggregator {
        &self.aggregator
    }

    pub fn broadcaster(&self) -> &EventBroadcaster {
        self.emitter.broadcaster()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Begin tracking: start the session clock
    pub fn start(&mut self) {
        if self.active.swap(true, Ordering::SeqCst) {
            debug!("Session {} already active", self.ids);
            return;
        }

        let collector = self.collector.clone();
        let period = self.tick_interval;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        collector.tick().await;
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Tick task received shutdown signal");
                        break;
                    }
                }
            }
        });
        self.tick_handle = Some(handle);

        self.emitter.publish(Event::session_started(self.ids.clone()));
        info!("Tracking session {} started", self.ids);
    }

    /// Record an editor change; returns the dispatch task when the cadence fires
    pub async fn on_editor_change(&self, code: &str) -> Option<JoinHandle<Option<EvaluationResult>>> {
        if !self.is_active() {
            return None;
        }

        let metrics = self.collector.on_editor_change().await;
        if !self.dispatcher.is_due(metrics.code_changes) {
            return None;
        }

        // numbered here, in change order, before the task is scheduled
        let snapshot = self.dispatcher.prepare(code.to_string(), metrics);
        let dispatcher = self.dispatcher.clone();
        Some(tokio::spawn(async move { dispatcher.dispatch(snapshot).await }))
    }

    /// Editor tab visibility changed
    pub async fn on_visibility_change(&self, visible: bool) {
        if self.is_active() {
            self.collector.on_visibility_change(visible).await;
        }
    }

    /// Current counters
    pub async fn metrics(&self) -> SessionMetrics {
        self.collector.snapshot().await
    }

    /// Rolling summary of the session so far
    pub async fn summary(&self) -> EvaluationSummary {
        self.aggregator.summary().await
    }

    /// Final submission: score the current code, then stop
    pub async fn submit(&mut self, code: &str) -> EvaluationSummary {
        if self.is_active() {
            let metrics = self.collector.snapshot().await;
            let snapshot = self.dispatcher.prepare(code.to_string(), metrics);
            self.dispatcher.dispatch(snapshot).await;
        }
        self.stop().await
    }

    /// Stop the clock and refuse new dispatches. Idempotent.
    pub async fn stop(&mut self) -> EvaluationSummary {
        let was_active = self.active.swap(false, Ordering::SeqCst);
        self.halt_ticks();

        let summary = self.aggregator.summary().await;
        if was_active {
            self.emitter.publish(Event::session_ended(
                self.ids.clone(),
                summary.total_snapshots,
                summary.average_score,
            ));
            info!(
                "Tracking session {} ended: {} snapshots, average {}",
                self.ids, summary.total_snapshots, summary.average_score
            );
        }
        summary
    }

    /// Zero the counters and forget all evaluations
    pub async fn reset(&self) {
        self.collector.reset().await;
        self.aggregator.clear().await;
        self.emitter.publish(Event::session_cleared(self.ids.clone()));
    }

    fn halt_ticks(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.tick_handle.take() {
            handle.abort();
        }
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        self.halt_ticks();
    }
}
