//! Core data types for session tracking and evaluation
//!
//! All wire types serialize with camelCase field names so the editor client
//! and the scoring service agree on one JSON shape.

use crate::error::{BreakinError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one coding session (one user on one task)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIds {
    pub user_id: String,
    pub sprint_id: String,
    pub task_id: String,
}

impl SessionIds {
    pub fn new(
        user_id: impl Into<String>,
        sprint_id: impl Into<String>,
        task_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            sprint_id: sprint_id.into(),
            task_id: task_id.into(),
        }
    }
}

impl fmt::Display for SessionIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.user_id, self.sprint_id, self.task_id)
    }
}

/// In-session interaction counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetrics {
    pub keystrokes: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    /// Seconds since the session started
    pub elapsed_time: u64,
    /// Seconds the editor was focused
    pub focus_time: u64,
    pub tab_switches: u64,
    pub code_changes: u64,
}

impl SessionMetrics {
    /// Fresh counters starting now
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn starting_at(start_time: DateTime<Utc>) -> Self {
        Self {
            keystrokes: 0,
            start_time,
            elapsed_time: 0,
            focus_time: 0,
            tab_switches: 0,
            code_changes: 0,
        }
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A timestamped sample of in-progress code plus session metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSnapshot {
    /// Sequence number within the session; 0 means not yet assigned
    #[serde(default)]
    pub seq: u64,
    pub code: String,
    pub timestamp: DateTime<Utc>,
    pub metrics: SessionMetrics,
    pub user_id: String,
    pub sprint_id: String,
    pub task_id: String,
}

impl CodeSnapshot {
    /// Build a snapshot stamped with the current time
    pub fn new(seq: u64, code: String, metrics: SessionMetrics, ids: &SessionIds) -> Self {
        Self {
            seq,
            code,
            timestamp: Utc::now(),
            metrics,
            user_id: ids.user_id.clone(),
            sprint_id: ids.sprint_id.clone(),
            task_id: ids.task_id.clone(),
        }
    }

    pub fn session_ids(&self) -> SessionIds {
        SessionIds::new(&self.user_id, &self.sprint_id, &self.task_id)
    }

    /// Reject snapshots without a complete session identity
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("userId", &self.user_id),
            ("sprintId", &self.sprint_id),
            ("taskId", &self.task_id),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(BreakinError::InvalidSnapshot(format!(
                "missing required fields: {}",
                missing.join(", ")
            )))
        }
    }
}

/// Per-dimension scores, each in [0, 10]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationMetrics {
    pub code_quality: f64,
    pub efficiency: f64,
    pub problem_solving: f64,
    pub creativity: f64,
}

/// Scoring service output for one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    /// Overall score in [0, 10], one decimal place
    pub score: f64,
    pub feedback: String,
    pub metrics: EvaluationMetrics,
    /// At most three suggestions, most important first
    pub suggestions: Vec<String>,
}

/// One point on the score timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub time: DateTime<Utc>,
    pub score: f64,
}

/// Rolling statistics over all evaluations recorded in a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationSummary {
    pub total_snapshots: usize,
    pub average_score: f64,
    pub last_evaluation: Option<EvaluationResult>,
    pub timeline: Vec<TimelinePoint>,
}

impl EvaluationSummary {
    /// Summary of a session with nothing recorded
    pub fn empty() -> Self {
        Self {
            total_snapshots: 0,
            average_score: 0.0,
            last_evaluation: None,
            timeline: Vec::new(),
        }
    }
}
