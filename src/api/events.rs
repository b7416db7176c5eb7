//! Event types and the broadcast channel behind the SSE endpoint

use crate::types::SessionIds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Kind of live feedback notification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    /// Code quality is low, nudge the developer
    Suggestion,
    /// Efficiency is high, encourage the developer
    Praise,
}

/// Event type discriminant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventType {
    /// Tracking session started
    SessionStarted {
        session: SessionIds,
        timestamp: DateTime<Utc>,
    },
    /// Tracking session stopped or submitted
    SessionEnded {
        session: SessionIds,
        total_snapshots: usize,
        average_score: f64,
        timestamp: DateTime<Utc>,
    },
    /// Session snapshots and evaluations cleared
    SessionCleared {
        session: SessionIds,
        timestamp: DateTime<Utc>,
    },
    /// Snapshot scored and recorded
    SnapshotEvaluated {
        session: SessionIds,
        seq: u64,
        score: f64,
        timestamp: DateTime<Utc>,
    },
    /// Snapshot could not be scored and was dropped
    SnapshotDropped {
        session: SessionIds,
        seq: u64,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    /// User-facing notification derived from an evaluation
    LiveFeedback {
        session: SessionIds,
        seq: u64,
        kind: FeedbackKind,
        message: String,
        score: f64,
        timestamp: DateTime<Utc>,
    },
    /// Heartbeat (published periodically when idle)
    Heartbeat {
        #[serde(default)]
        instance_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

/// Event wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event ID (for deduplication)
    pub id: String,
    /// Event payload
    #[serde(flatten)]
    pub event_type: EventType,
}

impl Event {
    /// Create new event
    pub fn new(event_type: EventType) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type,
        }
    }

    /// Create session started event
    pub fn session_started(session: SessionIds) -> Self {
        Self::new(EventType::SessionStarted {
            session,
            timestamp: Utc::now(),
        })
    }

    /// Create session ended event
    pub fn session_ended(session: SessionIds, total_snapshots: usize, average_score: f64) -> Self {
        Self::new(EventType::SessionEnded {
            session,
            total_snapshots,
            average_score,
            timestamp: Utc::now(),
        })
    }

    /// Create session cleared event
    pub fn session_cleared(session: SessionIds) -> Self {
        Self::new(EventType::SessionCleared {
            session,
            timestamp: Utc::now(),
        })
    }

    /// Create snapshot evaluated event
    pub fn snapshot_evaluated(session: SessionIds, seq: u64, score: f64) -> Self {
        Self::new(EventType::SnapshotEvaluated {
            session,
            seq,
            score,
            timestamp: Utc::now(),
        })
    }

    /// Create snapshot dropped event
    pub fn snapshot_dropped(session: SessionIds, seq: u64, reason: String) -> Self {
        Self::new(EventType::SnapshotDropped {
            session,
            seq,
            reason,
            timestamp: Utc::now(),
        })
    }

    /// Create live feedback event
    pub fn live_feedback(
        session: SessionIds,
        seq: u64,
        kind: FeedbackKind,
        message: String,
        score: f64,
    ) -> Self {
        Self::new(EventType::LiveFeedback {
            session,
            seq,
            kind,
            message,
            score,
            timestamp: Utc::now(),
        })
    }

    /// Create heartbeat event
    pub fn heartbeat(instance_id: String) -> Self {
        Self::new(EventType::Heartbeat {
            instance_id: Some(instance_id),
            timestamp: Utc::now(),
        })
    }
}

/// Event broadcaster using tokio broadcast channel
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<Event>,
}

impl EventBroadcaster {
    /// Create new broadcaster with channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Broadcast event to all subscribers
    pub fn broadcast(
        &self,
        event: Event,
    ) -> Result<usize, Box<broadcast::error::SendError<Event>>> {
        self.tx.send(event).map_err(Box::new)
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Get subscriber count
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(1000) // Default capacity: 1000 events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> SessionIds {
        SessionIds::new("dev-1", "sprint-1", "task-1")
    }

    #[test]
    fn test_event_creation() {
        let event = Event::snapshot_evaluated(ids(), 3, 7.4);
        match event.event_type {
            EventType::SnapshotEvaluated { seq, score, .. } => {
                assert_eq!(seq, 3);
                assert_eq!(score, 7.4);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_wire_format_is_flat() {
        let event = Event::live_feedback(
            ids(),
            1,
            FeedbackKind::Praise,
            "Great focus".to_string(),
            8.5,
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["id"], event.id.as_str());
        assert_eq!(json["type"], "live_feedback");
        assert_eq!(json["kind"], "praise");
        assert_eq!(json["session"]["userId"], "dev-1");
    }

    #[test]
    fn test_event_json_round_trip() {
        let event = Event::snapshot_dropped(ids(), 9, "timeout".to_string());
        let json = serde_json::to_string(&event).unwrap();
        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, event.id);
        assert_eq!(parsed.event_type, event.event_type);
    }

    #[tokio::test]
    async fn test_broadcaster() {
        let broadcaster = EventBroadcaster::new(10);
        let mut rx = broadcaster.subscribe();

        let event = Event::session_started(ids());
        broadcaster.broadcast(event.clone()).unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, event.id);
    }

    #[test]
    fn test_broadcast_without_subscribers_is_err() {
        let broadcaster = EventBroadcaster::new(4);
        assert!(broadcaster.broadcast(Event::heartbeat("i".into())).is_err());
    }
}
