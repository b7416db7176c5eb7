//! Evaluation of code snapshots.
//!
//! A rule-based stand-in for model scoring: every snapshot is turned into a
//! score, a feedback line, four sub-scores and up to three suggestions.
//!
//! # Architecture
//!
//! - **FeatureExtractor**: counts lines, comment lines and comment markers
//! - **Scorer**: combines features, session metrics and random draws
//!
//! # Usage
//!
//! ```rust
//! use breakin_core::evaluation::Scorer;
//! use breakin_core::types::{CodeSnapshot, SessionIds, SessionMetrics};
//!
//! let ids = SessionIds::new("dev-1", "sprint-1", "task-1");
//! let snapshot = CodeSnapshot::new(1, "fn main() {}".to_string(), SessionMetrics::new(), &ids);
//!
//! let result = Scorer::seeded(7).evaluate(&snapshot).unwrap();
//! assert!(result.score <= 10.0);
//! ```

pub mod feature_extractor;
pub mod scorer;

pub use feature_extractor::{CodeFeatures, FeatureExtractor};
pub use scorer::{score_with, FeedbackBand, RandomDraws, Scorer};
