//! Blend the model's label distribution with deterministic business
//! adjustments into a 0–100 match score and its justification.

use lexmatch_core::{
    CaseFeatures, FailurePolicy, LawyerFeatures, LawyerRecord, SchemaError, UrgencyLevel,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::RecommendError;
use crate::model::{TrainedModel, expected_weight};

/// Every term that went into one candidate's score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    /// Probability per label, POOR..EXCELLENT.
    pub distribution: [f64; 4],
    /// Σ probability × weight, in [1, 4].
    pub base_score: f64,
    pub specialization_bonus: f64,
    pub urgency_adjustment: f64,
    pub efficiency_adjustment: f64,
    /// Base plus adjustments, floored at 0.
    pub adjusted_score: f64,
    pub experience_years: u32,
    pub cases_handled: u32,
    pub match_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub lawyer_id: i64,
    pub match_score: f64,
    pub justification: String,
    pub breakdown: ScoreBreakdown,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine {
    policy: FailurePolicy,
}

impl ScoringEngine {
    pub fn new(policy: FailurePolicy) -> Self {
        Self { policy }
    }

    /// Score every verified candidate, in input order.
    ///
    /// Unverified candidates are dropped. A candidate that cannot be scored
    /// is skipped or fails the whole call, per the failure policy.
    pub fn score_candidates(
        &self,
        model: &TrainedModel,
        case: &CaseFeatures,
        candidates: &[LawyerRecord],
    ) -> Result<Vec<ScoredCandidate>, RecommendError> {
        let mut scored = Vec::with_capacity(candidates.len());
        for record in candidates {
            let lawyer = LawyerFeatures::from(record);
            if !lawyer.verified {
                debug!(lawyer_id = record.id, "skipping unverified lawyer");
                continue;
            }
            match self.score(model, case, record.id, &lawyer) {
                Ok(candidate) => scored.push(candidate),
                Err(source) => match self.policy {
                    FailurePolicy::Skip => {
                        warn!(lawyer_id = record.id, error = %source, "skipping unscorable lawyer");
                    }
                    FailurePolicy::Abort => {
                        return Err(RecommendError::Candidate {
                            lawyer_id: record.id,
                            source,
                        });
                    }
                },
            }
        }
        Ok(scored)
    }

    /// Score one lawyer against `model`'s schema.
    pub fn score(
        &self,
        model: &TrainedModel,
        case: &CaseFeatures,
        lawyer_id: i64,
        lawyer: &LawyerFeatures,
    ) -> Result<ScoredCandidate, SchemaError> {
        let distribution = model.label_distribution(case, lawyer)?;
        let breakdown = breakdown(distribution, case, lawyer);
        Ok(ScoredCandidate {
            lawyer_id,
            match_score: breakdown.match_score,
            justification: justification(case, &breakdown),
            breakdown,
        })
    }
}

/// Apply the business adjustments to a label distribution.
pub fn breakdown(
    distribution: [f64; 4],
    case: &CaseFeatures,
    lawyer: &LawyerFeatures,
) -> ScoreBreakdown {
    let base_score = expected_weight(&distribution);
    let years = lawyer.experience_years;

    let specialization_bonus = if lawyer.specializes_in(case.case_type) {
        0.5
    } else {
        0.0
    };
    let urgency_adjustment = match case.urgency {
        UrgencyLevel::High if years >= 10 => 0.3,
        UrgencyLevel::High if years < 3 => -0.2,
        _ => 0.0,
    };
    let efficiency = lawyer.efficiency();
    let efficiency_adjustment = if (8.0..=15.0).contains(&efficiency) {
        0.2
    } else if efficiency > 20.0 {
        -0.1
    } else {
        0.0
    };

    let adjusted_score =
        (base_score + specialization_bonus + urgency_adjustment + efficiency_adjustment).max(0.0);
    let match_score = (adjusted_score / 4.0 * 100.0).clamp(0.0, 100.0);

    ScoreBreakdown {
        distribution,
        base_score,
        specialization_bonus,
        urgency_adjustment,
        efficiency_adjustment,
        adjusted_score,
        experience_years: years,
        cases_handled: lawyer.cases_handled,
        match_score,
    }
}

/// Explanation built from the same breakdown that produced the score.
pub fn justification(case: &CaseFeatures, breakdown: &ScoreBreakdown) -> String {
    let mut parts = Vec::with_capacity(4);

    if breakdown.specialization_bonus > 0.0 {
        parts.push(format!("Specializes in {} law.", case.case_type.display_name()));
    }

    let years = breakdown.experience_years;
    match years {
        16.. => parts.push(format!("Highly experienced ({years} years).")),
        9.. => parts.push(format!("Experienced ({years} years).")),
        4.. => parts.push(format!("Moderately experienced ({years} years).")),
        _ => {}
    }

    if breakdown.cases_handled > 50 {
        parts.push(format!(
            "Extensive case handling experience ({} cases).",
            breakdown.cases_handled
        ));
    }

    let band = match breakdown.match_score {
        s if s >= 90.0 => "Excellent match for your case requirements.",
        s if s >= 75.0 => "Very good match for your case requirements.",
        s if s >= 60.0 => "Good match for your case requirements.",
        _ => "Moderate match - may handle your case type.",
    };
    parts.push(band.to_string());

    parts.join(" ")
}
