//! Snapshot/evaluation bookkeeping and rolling summary
//!
//! Pairs are keyed by snapshot sequence number, so a dropped or late
//! response never shifts another snapshot's score on the timeline.

use crate::evaluation::scorer::round_to;
use crate::types::{CodeSnapshot, EvaluationResult, EvaluationSummary, TimelinePoint};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Evaluation aggregator for one session
///
/// Cheap to clone; clones share the same state.
#[derive(Debug, Clone)]
pub struct EvaluationAggregator {
    inner: Arc<RwLock<AggregatorState>>,
}

#[derive(Debug, Default)]
struct AggregatorState {
    snapshots: BTreeMap<u64, CodeSnapshot>,
    results: BTreeMap<u64, EvaluationResult>,
    /// Last sequence number handed out by `next_sequence`
    last_seq: u64,
}

impl EvaluationAggregator {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(AggregatorState::default())),
        }
    }

    /// Allocate the next sequence number
    pub async fn next_sequence(&self) -> u64 {
        let mut state = self.inner.write().await;
        state.last_seq += 1;
        state.last_seq
    }

    /// Store a snapshot and its evaluation under the snapshot's seq
    pub async fn record(&self, snapshot: CodeSnapshot, result: EvaluationResult) {
        let mut state = self.inner.write().await;
        let seq = snapshot.seq;
        // keep the allocator ahead of externally numbered snapshots
        state.last_seq = state.last_seq.max(seq);
        state.snapshots.insert(seq, snapshot);
        state.results.insert(seq, result);
        debug!("Recorded evaluation for snapshot {}", seq);
    }

    /// Rolling statistics over everything recorded so far
    pub async fn summary(&self) -> EvaluationSummary {
        let state = self.inner.read().await;

        if state.snapshots.is_empty() {
            return EvaluationSummary::empty();
        }

        let average_score = if state.results.is_empty() {
            0.0
        } else {
            let total: f64 = state.results.values().map(|r| r.score).sum();
            round_to(total / state.results.len() as f64, 2)
        };

        let timeline = state
            .snapshots
            .iter()
            .map(|(seq, snapshot)| TimelinePoint {
                time: snapshot.timestamp,
                score: state.results.get(seq).map(|r| r.score).unwrap_or(0.0),
            })
            .collect();

        EvaluationSummary {
            total_snapshots: state.snapshots.len(),
            average_score,
            last_evaluation: state.results.values().next_back().cloned(),
            timeline,
        }
    }

    /// Number of recorded snapshots
    pub async fn len(&self) -> usize {
        self.inner.read().await.snapshots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.snapshots.is_empty()
    }

    /// Drop all snapshots and evaluations
    pub async fn clear(&self) {
        let mut state = self.inner.write().await;
        state.snapshots.clear();
        state.results.clear();
    }
}

impl Default for EvaluationAggregator {
    fn default() -> Self {
        Self::new()
    }
}
