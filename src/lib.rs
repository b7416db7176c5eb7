//! BreakIn Direct - Session Tracking & Evaluation Pipeline
//!
//! Tracks one developer's coding session on a sprint task and turns periodic
//! code snapshots into live feedback:
//! - Interaction counters sampled from editor events and a 1 s clock
//! - Snapshot dispatch every Nth code change
//! - Heuristic scoring with seedable randomness
//! - Rolling per-session summaries keyed by snapshot sequence number
//! - Live feedback notifications over a broadcast channel and SSE
//!
//! # Architecture
//!
//! - **Types**: Core data structures (CodeSnapshot, EvaluationResult, ...)
//! - **Evaluation**: Feature extraction and scoring
//! - **Tracking**: Collector, dispatcher, aggregator, emitter, session
//! - **Services**: Scoring clients (HTTP and in-process)
//! - **API**: axum server exposing scoring, tracking and event streams
//!
//! # Example
//!
//! ```ignore
//! use breakin_core::{LocalScoringClient, Scorer, SessionIds, TrackingConfig, TrackingSession};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = TrackingConfig::default();
//!     let client = Arc::new(LocalScoringClient::new(Arc::new(Scorer::new())));
//!     let mut session = TrackingSession::new(
//!         SessionIds::new("dev-1", "sprint-1", "task-1"),
//!         &config,
//!         client,
//!     );
//!
//!     session.start();
//!     session.on_editor_change("fn main() {}").await;
//!     let summary = session.submit("fn main() {}").await;
//!     println!("average score: {}", summary.average_score);
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod services;
pub mod tracking;
pub mod types;

// Re-export commonly used types
pub use config::TrackingConfig;
pub use error::{BreakinError, Result};
pub use evaluation::Scorer;
pub use services::{HttpScoringClient, LocalScoringClient, ScoringClient};
pub use tracking::{EvaluationAggregator, MetricsCollector, TrackingSession};
pub use types::{
    CodeSnapshot, EvaluationMetrics, EvaluationResult, EvaluationSummary, SessionIds,
    SessionMetrics, TimelinePoint,
};
