//! Client-side session tracking
//!
//! Data flow:
//!
//! ```text
//! MetricsCollector → SnapshotDispatcher → ScoringClient
//!                                              ↓
//!                 LiveFeedbackEmitter ← EvaluationAggregator
//! ```
//!
//! [`TrackingSession`] owns one of each and drives the session clock.

pub mod aggregator;
pub mod collector;
pub mod dispatcher;
pub mod feedback;
pub mod session;

pub use aggregator::EvaluationAggregator;
pub use collector::MetricsCollector;
pub use dispatcher::{should_dispatch, SnapshotDispatcher};
pub use feedback::{notifications_for, LiveFeedback, LiveFeedbackEmitter};
pub use session::TrackingSession;
