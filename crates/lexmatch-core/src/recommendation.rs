//! Caller-facing recommendation output.

use serde::{Deserialize, Serialize};

/// One ranked lawyer recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub lawyer_id: i64,
    /// 0–100.
    pub match_score: f64,
    pub justification: String,
    /// 1-based position after ranking.
    pub rank: usize,
}
