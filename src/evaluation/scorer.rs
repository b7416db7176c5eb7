//! Heuristic scoring of code snapshots.
//!
//! # Algorithm
//!
//! ```text
//! efficiencyScore = min(10, focusTime / elapsedTime * 10)   (0 when elapsedTime = 0)
//! activityScore   = min(10, keystrokes / 100)
//! baseScore       = 6 + draw * 2
//! codeQuality     = min(10, baseScore + commentRatio * 2)
//! efficiency      = min(10, efficiencyScore * 0.7 + activityScore * 0.3)
//! score           = round1(codeQuality * 0.6 + efficiency * 0.4)
//! problemSolving  = min(10, 7 + draw * 2)
//! creativity      = min(10, 6 + draw * 3)
//! ```
//!
//! The three draws come from an injected random source. [`score_with`] takes
//! them explicitly so a caller can reproduce an exact result.

use crate::error::{BreakinError, Result};
use crate::evaluation::feature_extractor::{CodeFeatures, FeatureExtractor};
use crate::types::{CodeSnapshot, EvaluationMetrics, EvaluationResult, SessionMetrics};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use tracing::debug;

/// Upper bound of every score
pub const MAX_SCORE: f64 = 10.0;

/// Maximum number of suggestions returned
pub const MAX_SUGGESTIONS: usize = 3;

/// Code shorter than this (in characters) asks for more detail
const MIN_CODE_LENGTH: usize = 50;

/// Fewer comment markers than this asks for more comments
const MIN_COMMENT_MARKERS: usize = 3;

/// Scores below this ask for restructuring
const RESTRUCTURE_THRESHOLD: f64 = 7.0;

pub const SUGGEST_MORE_DETAIL: &str = "Add more implementation details";
pub const SUGGEST_MORE_COMMENTS: &str = "Add more comments to explain your logic";
pub const SUGGEST_BREAK_DOWN: &str = "Consider breaking down complex functions";
pub const SUGGEST_ERROR_HANDLING: &str = "Add error handling for edge cases";

/// Feedback band for a final score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackBand {
    Excellent,
    Good,
    Solid,
    NeedsImprovement,
}

impl FeedbackBand {
    pub fn for_score(score: f64) -> Self {
        if score >= 9.0 {
            FeedbackBand::Excellent
        } else if score >= 7.0 {
            FeedbackBand::Good
        } else if score >= 5.0 {
            FeedbackBand::Solid
        } else {
            FeedbackBand::NeedsImprovement
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            FeedbackBand::Excellent => {
                "Excellent work! Your code shows strong quality and efficient problem solving."
            }
            FeedbackBand::Good => {
                "Good progress. The solution is well structured with room for refinement."
            }
            FeedbackBand::Solid => "Solid start. Keep iterating on structure and clarity.",
            FeedbackBand::NeedsImprovement => {
                "Needs improvement. Focus on completing the implementation and documenting your approach."
            }
        }
    }
}

/// Uniform draws in [0, 1) consumed by one evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomDraws {
    pub base: f64,
    pub problem_solving: f64,
    pub creativity: f64,
}

impl RandomDraws {
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            base: rng.gen::<f64>(),
            problem_solving: rng.gen::<f64>(),
            creativity: rng.gen::<f64>(),
        }
    }

    /// All draws at zero, the lowest possible scores
    pub fn zero() -> Self {
        Self {
            base: 0.0,
            problem_solving: 0.0,
            creativity: 0.0,
        }
    }
}

/// Round half away from zero to `decimals` places
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn unit(draw: f64) -> f64 {
    if draw.is_finite() {
        draw.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Focus share of elapsed time on a 0-10 scale
pub fn efficiency_score(metrics: &SessionMetrics) -> f64 {
    if metrics.elapsed_time == 0 {
        return 0.0;
    }
    (metrics.focus_time as f64 / metrics.elapsed_time as f64 * 10.0).min(MAX_SCORE)
}

/// Typing activity on a 0-10 scale
pub fn activity_score(metrics: &SessionMetrics) -> f64 {
    (metrics.keystrokes as f64 / 100.0).min(MAX_SCORE)
}

/// Ordered suggestions for the given features and final score
pub fn suggestions_for(features: &CodeFeatures, score: f64) -> Vec<String> {
    let mut suggestions = Vec::with_capacity(MAX_SUGGESTIONS);

    if features.char_count < MIN_CODE_LENGTH {
        suggestions.push(SUGGEST_MORE_DETAIL);
    }
    if features.comment_markers < MIN_COMMENT_MARKERS {
        suggestions.push(SUGGEST_MORE_COMMENTS);
    }
    if score < RESTRUCTURE_THRESHOLD {
        suggestions.push(SUGGEST_BREAK_DOWN);
        suggestions.push(SUGGEST_ERROR_HANDLING);
    }

    suggestions
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(str::to_string)
        .collect()
}

/// Score a snapshot with explicit random draws
pub fn score_with(snapshot: &CodeSnapshot, draws: RandomDraws) -> EvaluationResult {
    let features = FeatureExtractor::extract(&snapshot.code);

    let base_score = 6.0 + unit(draws.base) * 2.0;
    let code_quality = (base_score + features.comment_ratio() * 2.0).min(MAX_SCORE);
    let efficiency = (efficiency_score(&snapshot.metrics) * 0.7
        + activity_score(&snapshot.metrics) * 0.3)
        .min(MAX_SCORE);
    let score = round_to(code_quality * 0.6 + efficiency * 0.4, 1);

    let problem_solving = (7.0 + unit(draws.problem_solving) * 2.0).min(MAX_SCORE);
    let creativity = (6.0 + unit(draws.creativity) * 3.0).min(MAX_SCORE);

    EvaluationResult {
        score,
        feedback: FeedbackBand::for_score(score).message().to_string(),
        metrics: EvaluationMetrics {
            code_quality,
            efficiency,
            problem_solving,
            creativity,
        },
        suggestions: suggestions_for(&features, score),
    }
}

/// Stateless scorer backed by a seedable random source
pub struct Scorer {
    rng: Mutex<StdRng>,
}

impl Scorer {
    /// Scorer seeded from OS entropy
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic scorer for reproducible runs
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Validate and score one snapshot
    pub fn evaluate(&self, snapshot: &CodeSnapshot) -> Result<EvaluationResult> {
        snapshot.validate()?;

        let draws = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| BreakinError::Scoring("random source lock poisoned".to_string()))?;
            RandomDraws::sample(&mut *rng)
        };

        let result = score_with(snapshot, draws);
        debug!(
            "Scored snapshot {} for {}: {} ({} suggestions)",
            snapshot.seq,
            snapshot.session_ids(),
            result.score,
            result.suggestions.len()
        );
        Ok(result)
    }
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new()
    }
}
