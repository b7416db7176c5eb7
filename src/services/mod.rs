//! Services layer for the tracking pipeline
//!
//! Provides access to the scoring service, remote or in-process.

pub mod scoring;

pub use scoring::{HttpScoringClient, LocalScoringClient, ScoringClient};
