//! Server-side registry of per-session aggregators

use crate::tracking::EvaluationAggregator;
use crate::types::SessionIds;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Aggregator plus the last time a snapshot was routed to it
#[derive(Debug, Clone)]
struct SessionEntry {
    aggregator: EvaluationAggregator,
    last_active: Instant,
}

/// One aggregator per (user, sprint, task); nothing is shared across sessions.
///
/// Entries live until removed explicitly or evicted by [`evict_idle`](Self::evict_idle).
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<SessionIds, SessionEntry>>>,
}

impl SessionRegistry {
    /// Create new session registry
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Aggregator for a session, created on first use; marks the session active
    pub async fn aggregator_for(&self, ids: &SessionIds) -> EvaluationAggregator {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.entry(ids.clone()).or_insert_with(|| SessionEntry {
            aggregator: EvaluationAggregator::new(),
            last_active: Instant::now(),
        });
        entry.last_active = Instant::now();
        entry.aggregator.clone()
    }

    /// Aggregator for a session, if one exists
    pub async fn get(&self, ids: &SessionIds) -> Option<EvaluationAggregator> {
        let sessions = self.sessions.read().await;
        sessions.get(ids).map(|entry| entry.aggregator.clone())
    }

    /// Forget a session
    pub async fn remove(&self, ids: &SessionIds) -> Option<EvaluationAggregator> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(ids).map(|entry| entry.aggregator)
    }

    /// Drop sessions that received no snapshot within `max_idle`
    pub async fn evict_idle(&self, max_idle: Duration) -> Vec<SessionIds> {
        let mut sessions = self.sessions.write().await;
        let idle: Vec<SessionIds> = sessions
            .iter()
            .filter(|(_, entry)| entry.last_active.elapsed() > max_idle)
            .map(|(ids, _)| ids.clone())
            .collect();

        for ids in &idle {
            sessions.remove(ids);
        }
        if !idle.is_empty() {
            debug!("Evicted {} idle sessions", idle.len());
        }
        idle
    }

    /// Get statistics
    pub async fn stats(&self) -> RegistryStats {
        let aggregators: Vec<EvaluationAggregator> = self
            .sessions
            .read()
            .await
            .values()
            .map(|entry| entry.aggregator.clone())
            .collect();

        let mut snapshots = 0;
        for aggregator in &aggregators {
            snapshots += aggregator.len().await;
        }

        RegistryStats {
            sessions: aggregators.len(),
            snapshots,
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub sessions: usize,
    pub snapshots: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CodeSnapshot, EvaluationMetrics, EvaluationResult, SessionMetrics};

    fn result() -> EvaluationResult {
        EvaluationResult {
            score: 6.0,
            feedback: String::new(),
            metrics: EvaluationMetrics {
                code_quality: 6.0,
                efficiency: 6.0,
                problem_solving: 7.0,
                creativity: 6.0,
            },
            suggestions: vec![],
        }
    }

    #[tokio::test]
    async fn test_aggregator_shared_per_session() {
        let registry = SessionRegistry::new();
        let ids = SessionIds::new("u", "s", "t");

        let first = registry.aggregator_for(&ids).await;
        first
            .record(
                CodeSnapshot::new(1, String::new(), SessionMetrics::new(), &ids),
                result(),
            )
            .await;

        let again = registry.aggregator_for(&ids).await;
        assert_eq!(again.len().await, 1);

        let stats = registry.stats().await;
        assert_eq!(stats, RegistryStats { sessions: 1, snapshots: 1 });
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let registry = SessionRegistry::new();
        let a = SessionIds::new("u1", "s", "t");
        let b = SessionIds::new("u2", "s", "t");

        registry
            .aggregator_for(&a)
            .await
            .record(
                CodeSnapshot::new(1, String::new(), SessionMetrics::new(), &a),
                result(),
            )
            .await;

        assert!(registry.get(&b).await.is_none());
        assert!(registry.aggregator_for(&b).await.is_empty().await);

        assert!(registry.remove(&a).await.is_some());
        assert!(registry.get(&a).await.is_none());
        assert_eq!(registry.stats().await.sessions, 1);
    }

    #[tokio::test]
    async fn test_idle_sessions_evicted() {
        let registry = SessionRegistry::new();
        let stale = SessionIds::new("u1", "s", "t");
        let fresh = SessionIds::new("u2", "s", "t");

        registry.aggregator_for(&stale).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        registry.aggregator_for(&fresh).await;

        let evicted = registry.evict_idle(Duration::from_millis(30)).await;
        assert_eq!(evicted, vec![stale.clone()]);
        assert!(registry.get(&stale).await.is_none());
        assert!(registry.get(&fresh).await.is_some());

        // touching a session keeps it alive
        tokio::time::sleep(Duration::from_millis(60)).await;
        registry.aggregator_for(&fresh).await;
        assert!(registry.evict_idle(Duration::from_millis(30)).await.is_empty());
    }
}
