use lexmatch_core::RecommendationResult;

use crate::scoring::ScoredCandidate;

/// Orders scored candidates by match score and keeps the top N.
#[derive(Debug, Clone, Copy)]
pub struct RecommendationRanker {
    top_n: usize,
}

impl RecommendationRanker {
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Stable descending sort: equal scores keep their input order. Ranks
    /// are 1-based positions after sorting.
    pub fn rank(&self, mut scored: Vec<ScoredCandidate>) -> Vec<RecommendationResult> {
        scored.sort_by(|a, b| b.match_score.total_cmp(&a.match_score));
        scored
            .into_iter()
            .take(self.top_n)
            .enumerate()
            .map(|(i, c)| RecommendationResult {
                lawyer_id: c.lawyer_id,
                match_score: c.match_score,
                justification: c.justification,
                rank: i + 1,
            })
            .collect()
    }
}

impl Default for RecommendationRanker {
    fn default() -> Self {
        Self::new(10)
    }
}
