//! Snapshot sampling and submission
//!
//! Delivery is at-most-once: a snapshot whose scoring call fails is logged
//! and dropped, never retried.

use crate::api::events::Event;
use crate::services::ScoringClient;
use crate::tracking::aggregator::EvaluationAggregator;
use crate::tracking::feedback::LiveFeedbackEmitter;
use crate::types::{CodeSnapshot, EvaluationResult, SessionIds, SessionMetrics};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Cadence rule: sample on every `cadence`-th code change.
///
/// Takes the counter value just produced by the collector; a cadence of 0
/// disables sampling.
pub fn should_dispatch(code_changes: u64, cadence: u64) -> bool {
    cadence != 0 && code_changes != 0 && code_changes % cadence == 0
}

/// Packages snapshots and routes their evaluations
#[derive(Clone)]
pub struct SnapshotDispatcher {
    session: SessionIds,
    client: Arc<dyn ScoringClient>,
    aggregator: EvaluationAggregator,
    emitter: LiveFeedbackEmitter,
    cadence: u64,
    last_seq: Arc<AtomicU64>,
}

impl SnapshotDispatcher {
    pub fn new(
        session: SessionIds,
        client: Arc<dyn ScoringClient>,
        aggregator: EvaluationAggregator,
        emitter: LiveFeedbackEmitter,
        cadence: u64,
    ) -> Self {
        Self {
            session,
            client,
            aggregator,
            emitter,
            cadence,
            last_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Whether the given fresh change count is a sampling point
    pub fn is_due(&self, code_changes: u64) -> bool {
        should_dispatch(code_changes, self.cadence)
    }

    /// Hand out the next sequence number
    pub fn allocate_seq(&self) -> u64 {
        self.last_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Number and timestamp a snapshot of the code at the moment of the change.
    ///
    /// Call this before handing the snapshot to another task so the sequence
    /// follows the order of changes, not the order tasks get scheduled.
    pub fn prepare(&self, code: String, metrics: SessionMetrics) -> CodeSnapshot {
        CodeSnapshot::new(self.allocate_seq(), code, metrics, &self.session)
    }

    /// Score a prepared snapshot and record the outcome.
    ///
    /// Never fails: on a scoring error the snapshot is dropped and `None`
    /// is returned.
    pub async fn dispatch(&self, snapshot: CodeSnapshot) -> Option<EvaluationResult> {
        let seq = snapshot.seq;
        debug!("Dispatching snapshot {} for {}", seq, self.session);

        match self.client.evaluate(&snapshot).await {
            Ok(result) => {
                self.aggregator.record(snapshot, result.clone()).await;
                self.emitter.emit(&self.session, seq, &result);
                Some(result)
            }
            Err(e) => {
                warn!("Dropping snapshot {} for {}: {}", seq, self.session, e);
                self.emitter
                    .publish(Event::snapshot_dropped(self.session.clone(), seq, e.to_string()));
                None
            }
        }
    }
}
