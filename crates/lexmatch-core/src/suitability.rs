//! Rule-based suitability oracle.
//!
//! This is the ground truth for every training label, real or synthetic.
//! Both call sites go through [`assess`]; nothing else computes labels.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::case::{CaseFeatures, UrgencyLevel};
use crate::lawyer::LawyerFeatures;

/// Suitability tier of a lawyer for a case. Declaration order is the class
/// order used by the feature schema and by classifier distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuitabilityLabel {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl SuitabilityLabel {
    pub const ALL: [SuitabilityLabel; 4] = [Self::Poor, Self::Fair, Self::Good, Self::Excellent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Poor => "POOR",
            Self::Fair => "FAIR",
            Self::Good => "GOOD",
            Self::Excellent => "EXCELLENT",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let token = raw.trim().to_ascii_uppercase();
        Self::ALL.into_iter().find(|l| l.as_str() == token)
    }

    /// Position in [`Self::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Weight applied to this label's probability when blending a classifier
    /// distribution into a base score (range 1–4).
    pub fn weight(&self) -> f64 {
        (self.index() + 1) as f64
    }

    /// Classify a 0–10 oracle score.
    pub fn from_score(score: f64) -> Self {
        if score >= 8.0 {
            Self::Excellent
        } else if score >= 6.0 {
            Self::Good
        } else if score >= 4.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

impl fmt::Display for SuitabilityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper bound of the oracle's raw sum; scores are normalized against it.
pub const MAX_SCORE: f64 = 10.0;

/// Oracle score on a 0–10 scale.
pub fn suitability_score(case: &CaseFeatures, lawyer: &LawyerFeatures) -> f64 {
    let years = lawyer.experience_years;
    let raw = specialization_points(case, lawyer)
        + experience_points(years)
        + efficiency_points(lawyer.efficiency())
        + urgency_points(case.urgency, years)
        + breadth_points(lawyer.specialization_count());
    raw / MAX_SCORE * 10.0
}

/// Ground-truth label for a (case, lawyer) pair.
pub fn assess(case: &CaseFeatures, lawyer: &LawyerFeatures) -> SuitabilityLabel {
    SuitabilityLabel::from_score(suitability_score(case, lawyer))
}

fn specialization_points(case: &CaseFeatures, lawyer: &LawyerFeatures) -> f64 {
    if lawyer.specializes_in(case.case_type) {
        4.0
    } else if lawyer.has_related_specialization(case.case_type) {
        2.5
    } else {
        0.0
    }
}

fn experience_points(years: u32) -> f64 {
    match years {
        15.. => 2.5,
        10.. => 2.0,
        5.. => 1.5,
        2.. => 1.0,
        _ => 0.5,
    }
}

fn efficiency_points(efficiency: f64) -> f64 {
    if (8.0..=15.0).contains(&efficiency) {
        2.0
    } else if (5.0..=20.0).contains(&efficiency) {
        1.5
    } else if efficiency >= 3.0 {
        1.0
    } else {
        0.5
    }
}

fn urgency_points(urgency: UrgencyLevel, years: u32) -> f64 {
    match urgency {
        UrgencyLevel::High => match years {
            10.. => 1.0,
            5.. => 0.7,
            _ => 0.3,
        },
        UrgencyLevel::Medium => match years {
            5.. => 1.0,
            2.. => 0.8,
            _ => 0.5,
        },
        UrgencyLevel::Low => match years {
            1.. => 1.0,
            _ => 0.8,
        },
    }
}

fn breadth_points(specialization_count: usize) -> f64 {
    if (2..=4).contains(&specialization_count) {
        0.5
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::CaseType;

    fn case(t: CaseType, u: UrgencyLevel) -> CaseFeatures {
        CaseFeatures::new(t, u)
    }

    #[test]
    fn veteran_specialist_is_excellent() {
        // 4.0 + 2.0 + 2.0 (eff 10) + 1.0 = 9.0
        let lawyer = LawyerFeatures::new(12, 120, [CaseType::Criminal], true);
        let c = case(CaseType::Criminal, UrgencyLevel::High);
        assert!((suitability_score(&c, &lawyer) - 9.0).abs() < 1e-9);
        assert_eq!(assess(&c, &lawyer), SuitabilityLabel::Excellent);
    }

    #[test]
    fn junior_outsider_is_poor() {
        // 0 + 1.0 + 0.5 (eff 2.5) + 0.3 = 1.8
        let lawyer = LawyerFeatures::new(2, 5, [CaseType::Family], true);
        let c = case(CaseType::Criminal, UrgencyLevel::High);
        assert!((suitability_score(&c, &lawyer) - 1.8).abs() < 1e-9);
        assert_eq!(assess(&c, &lawyer), SuitabilityLabel::Poor);
    }

    #[test]
    fn related_specialization_earns_partial_credit() {
        // 2.5 + 1.5 + 2.0 + 1.0 + 0.5 (two specs) = 7.5
        let lawyer = LawyerFeatures::new(6, 60, [CaseType::Labor, CaseType::RealEstate], true);
        let c = case(CaseType::Corporate, UrgencyLevel::Medium);
        assert!((suitability_score(&c, &lawyer) - 7.5).abs() < 1e-9);
        assert_eq!(assess(&c, &lawyer), SuitabilityLabel::Good);
    }

    #[test]
    fn zero_experience_efficiency_is_floor() {
        // 4.0 + 0.5 + 0.5 (eff 0) + 0.8 (LOW, 0 yrs) = 5.8
        let lawyer = LawyerFeatures::new(0, 30, [CaseType::Family], false);
        let c = case(CaseType::Family, UrgencyLevel::Low);
        assert!((suitability_score(&c, &lawyer) - 5.8).abs() < 1e-9);
        assert_eq!(assess(&c, &lawyer), SuitabilityLabel::Fair);
    }

    #[test]
    fn breadth_bonus_bounds() {
        let c = case(CaseType::Civil, UrgencyLevel::Medium);
        let one = LawyerFeatures::new(5, 50, [CaseType::Civil], true);
        let four = LawyerFeatures::new(
            5,
            50,
            [CaseType::Civil, CaseType::Family, CaseType::Labor, CaseType::Criminal],
            true,
        );
        let five = LawyerFeatures::new(
            5,
            50,
            [
                CaseType::Civil,
                CaseType::Family,
                CaseType::Labor,
                CaseType::Criminal,
                CaseType::Corporate,
            ],
            true,
        );
        let base = suitability_score(&c, &one);
        assert!((suitability_score(&c, &four) - base - 0.5).abs() < 1e-9);
        assert!((suitability_score(&c, &five) - base).abs() < 1e-9);
    }

    #[test]
    fn label_thresholds() {
        assert_eq!(SuitabilityLabel::from_score(8.0), SuitabilityLabel::Excellent);
        assert_eq!(SuitabilityLabel::from_score(7.99), SuitabilityLabel::Good);
        assert_eq!(SuitabilityLabel::from_score(6.0), SuitabilityLabel::Good);
        assert_eq!(SuitabilityLabel::from_score(4.0), SuitabilityLabel::Fair);
        assert_eq!(SuitabilityLabel::from_score(3.99), SuitabilityLabel::Poor);
    }

    #[test]
    fn exact_match_tier_never_drops_with_experience() {
        for case_type in CaseType::ALL {
            for urgency in UrgencyLevel::ALL {
                let c = case(case_type, urgency);
                let mut prev = SuitabilityLabel::Poor;
                for years in 1..=20 {
                    // Constant efficiency isolates the experience effect.
                    let lawyer = LawyerFeatures::new(years, years * 10, [case_type], true);
                    let label = assess(&c, &lawyer);
                    assert!(
                        label >= prev,
                        "{case_type}/{urgency}: tier dropped at {years} years ({prev} -> {label})"
                    );
                    prev = label;
                }
            }
        }
    }

    #[test]
    fn weights_span_one_to_four() {
        assert_eq!(SuitabilityLabel::Poor.weight(), 1.0);
        assert_eq!(SuitabilityLabel::Excellent.weight(), 4.0);
    }
}
