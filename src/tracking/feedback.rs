//! Live feedback notifications derived from evaluation results

use crate::api::events::{Event, EventBroadcaster, FeedbackKind};
use crate::types::{EvaluationResult, SessionIds};
use tracing::trace;

/// Code quality below this triggers a suggestion
const SUGGESTION_QUALITY_THRESHOLD: f64 = 6.0;

/// Efficiency above this triggers praise
const PRAISE_EFFICIENCY_THRESHOLD: f64 = 8.0;

const SUGGESTION_MESSAGE: &str =
    "Consider improving code structure and adding comments to explain your approach.";
const PRAISE_MESSAGE: &str = "Great focus and efficiency! Keep up the momentum.";

/// One notification for the UI layer
#[derive(Debug, Clone, PartialEq)]
pub struct LiveFeedback {
    pub kind: FeedbackKind,
    pub message: &'static str,
}

/// Notifications owed for a result; suggestion first, then praise
pub fn notifications_for(result: &EvaluationResult) -> Vec<LiveFeedback> {
    let mut notifications = Vec::new();
    if result.metrics.code_quality < SUGGESTION_QUALITY_THRESHOLD {
        notifications.push(LiveFeedback {
            kind: FeedbackKind::Suggestion,
            message: SUGGESTION_MESSAGE,
        });
    }
    if result.metrics.efficiency > PRAISE_EFFICIENCY_THRESHOLD {
        notifications.push(LiveFeedback {
            kind: FeedbackKind::Praise,
            message: PRAISE_MESSAGE,
        });
    }
    notifications
}

/// Publishes evaluation outcomes on the event channel
#[derive(Debug, Clone)]
pub struct LiveFeedbackEmitter {
    events: EventBroadcaster,
}

impl LiveFeedbackEmitter {
    pub fn new(events: EventBroadcaster) -> Self {
        Self { events }
    }

    pub fn broadcaster(&self) -> &EventBroadcaster {
        &self.events
    }

    /// Publish a `snapshot_evaluated` event plus any live feedback.
    ///
    /// Fire-and-forget: with nobody listening the events are dropped.
    pub fn emit(&self, session: &SessionIds, seq: u64, result: &EvaluationResult) -> Vec<LiveFeedback> {
        self.publish(Event::snapshot_evaluated(session.clone(), seq, result.score));

        let notifications = notifications_for(result);
        for notification in &notifications {
            self.publish(Event::live_feedback(
                session.clone(),
                seq,
                notification.kind,
                notification.message.to_string(),
                result.score,
            ));
        }
        notifications
    }

    /// Publish any other event on the same channel
    pub fn publish(&self, event: Event) {
        if self.events.broadcast(event).is_err() {
            trace!("No subscribers for live feedback event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::events::EventType;
    use crate::types::EvaluationMetrics;

    fn result(code_quality: f64, efficiency: f64) -> EvaluationResult {
        EvaluationResult {
            score: 7.0,
            feedback: String::new(),
            metrics: EvaluationMetrics {
                code_quality,
                efficiency,
                problem_solving: 8.0,
                creativity: 7.0,
            },
            suggestions: vec![],
        }
    }

    #[test]
    fn test_rules() {
        assert!(notifications_for(&result(7.0, 5.0)).is_empty());

        let low_quality = notifications_for(&result(5.9, 5.0));
        assert_eq!(low_quality.len(), 1);
        assert_eq!(low_quality[0].kind, FeedbackKind::Suggestion);

        let efficient = notifications_for(&result(6.0, 8.1));
        assert_eq!(efficient.len(), 1);
        assert_eq!(efficient[0].kind, FeedbackKind::Praise);

        // thresholds are strict
        assert!(notifications_for(&result(6.0, 8.0)).is_empty());
    }

    #[test]
    fn test_both_notifications_can_fire() {
        let kinds: Vec<FeedbackKind> = notifications_for(&result(5.0, 9.0))
            .into_iter()
            .map(|n| n.kind)
            .collect();
        assert_eq!(kinds, vec![FeedbackKind::Suggestion, FeedbackKind::Praise]);
    }

    #[test]
    fn test_emit_without_listeners_is_silent() {
        let emitter = LiveFeedbackEmitter::new(EventBroadcaster::new(8));
        let sent = emitter.emit(&SessionIds::new("u", "s", "t"), 1, &result(5.0, 9.0));
        assert_eq!(sent.len(), 2);
    }

    #[tokio::test]
    async fn test_emit_publishes_events_in_order() {
        let broadcaster = EventBroadcaster::new(8);
        let mut rx = broadcaster.subscribe();
        let emitter = LiveFeedbackEmitter::new(broadcaster);

        emitter.emit(&SessionIds::new("u", "s", "t"), 4, &result(5.0, 5.0));

        let first = rx.recv().await.unwrap();
        assert!(matches!(
            first.event_type,
            EventType::SnapshotEvaluated { seq: 4, .. }
        ));
        let second = rx.recv().await.unwrap();
        match second.event_type {
            EventType::LiveFeedback { kind, seq, .. } => {
                assert_eq!(kind, FeedbackKind::Suggestion);
                assert_eq!(seq, 4);
            }
            other => panic!("Wrong event type: {:?}", other),
        }
    }
}
