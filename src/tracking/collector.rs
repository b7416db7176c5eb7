//! Per-session interaction counters

use crate::types::SessionMetrics;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::trace;

/// Metrics collector for one coding session
///
/// Cheap to clone; clones share the same counters.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<CollectorState>>,
}

#[derive(Debug)]
struct CollectorState {
    metrics: SessionMetrics,
    /// Focus time only accrues while the editor is visible
    focused: bool,
}

impl CollectorState {
    fn fresh() -> Self {
        Self {
            metrics: SessionMetrics::new(),
            focused: true,
        }
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(CollectorState::fresh())),
        }
    }

    /// Record one editor change and return the updated counters
    pub async fn on_editor_change(&self) -> SessionMetrics {
        let mut state = self.inner.lock().await;
        state.metrics.keystrokes = state.metrics.keystrokes.saturating_add(1);
        state.metrics.code_changes = state.metrics.code_changes.saturating_add(1);
        state.metrics.clone()
    }

    /// Advance the session clock by one second
    pub async fn tick(&self) -> SessionMetrics {
        let mut state = self.inner.lock().await;
        state.metrics.elapsed_time = state.metrics.elapsed_time.saturating_add(1);
        if state.focused {
            state.metrics.focus_time = state.metrics.focus_time.saturating_add(1);
        }
        trace!(
            "tick: elapsed={}s focus={}s",
            state.metrics.elapsed_time,
            state.metrics.focus_time
        );
        state.metrics.clone()
    }

    /// Editor tab became hidden (`false`) or visible again (`true`)
    pub async fn on_visibility_change(&self, visible: bool) {
        let mut state = self.inner.lock().await;
        if state.focused && !visible {
            state.metrics.tab_switches = state.metrics.tab_switches.saturating_add(1);
        }
        state.focused = visible;
    }

    /// Copy of the current counters
    pub async fn snapshot(&self) -> SessionMetrics {
        self.inner.lock().await.metrics.clone()
    }

    pub async fn is_focused(&self) -> bool {
        self.inner.lock().await.focused
    }

    /// Zero all counters and restart the session clock
    pub async fn reset(&self) {
        *self.inner.lock().await = CollectorState::fresh();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_editor_change_counts() {
        let collector = MetricsCollector::new();
        collector.on_editor_change().await;
        let metrics = collector.on_editor_change().await;

        assert_eq!(metrics.keystrokes, 2);
        assert_eq!(metrics.code_changes, 2);
        assert_eq!(metrics.elapsed_time, 0);
    }

    #[tokio::test]
    async fn test_tick_advances_elapsed_and_focus() {
        let collector = MetricsCollector::new();
        for _ in 0..3 {
            collector.tick().await;
        }
        let metrics = collector.snapshot().await;
        assert_eq!(metrics.elapsed_time, 3);
        assert_eq!(metrics.focus_time, 3);
    }

    #[tokio::test]
    async fn test_hidden_tab_pauses_focus_and_counts_switch() {
        let collector = MetricsCollector::new();
        collector.tick().await;
        collector.on_visibility_change(false).await;
        // a repeated hidden notification is not a second switch
        collector.on_visibility_change(false).await;
        collector.tick().await;
        collector.tick().await;
        collector.on_visibility_change(true).await;
        collector.tick().await;

        let metrics = collector.snapshot().await;
        assert_eq!(metrics.elapsed_time, 4);
        assert_eq!(metrics.focus_time, 2);
        assert_eq!(metrics.tab_switches, 1);
        assert!(collector.is_focused().await);
    }

    #[tokio::test]
    async fn test_reset_zeroes_counters() {
        let collector = MetricsCollector::new();
        collector.on_editor_change().await;
        collector.tick().await;
        collector.on_visibility_change(false).await;

        collector.reset().await;
        let metrics = collector.snapshot().await;
        assert_eq!(metrics.keystrokes, 0);
        assert_eq!(metrics.code_changes, 0);
        assert_eq!(metrics.elapsed_time, 0);
        assert_eq!(metrics.tab_switches, 0);
        assert!(collector.is_focused().await);
    }

    #[tokio::test]
    async fn test_clones_share_counters() {
        let collector = MetricsCollector::new();
        let other = collector.clone();
        other.on_editor_change().await;
        assert_eq!(collector.snapshot().await.code_changes, 1);
    }
}
