//! Lawyer profiles and the features they contribute to matching.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::case::CaseType;

/// A lawyer profile as stored by the directory layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LawyerRecord {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    /// Free text, e.g. `"12 years"`.
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub cases_handled: Option<u32>,
    #[serde(default)]
    pub specializations: Vec<String>,
    #[serde(default)]
    pub credentials_verified: Option<bool>,
}

/// Normalized lawyer attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LawyerFeatures {
    pub experience_years: u32,
    pub cases_handled: u32,
    pub specializations: BTreeSet<CaseType>,
    pub verified: bool,
}

impl LawyerFeatures {
    pub fn new(
        experience_years: u32,
        cases_handled: u32,
        specializations: impl IntoIterator<Item = CaseType>,
        verified: bool,
    ) -> Self {
        Self {
            experience_years,
            cases_handled,
            specializations: specializations.into_iter().collect(),
            verified,
        }
    }

    /// Cases handled per year of experience; `0.0` when experience is zero.
    pub fn efficiency(&self) -> f64 {
        efficiency(self.cases_handled, self.experience_years)
    }

    pub fn specialization_count(&self) -> usize {
        self.specializations.len()
    }

    pub fn specializes_in(&self, case_type: CaseType) -> bool {
        self.specializations.contains(&case_type)
    }

    /// Whether any specialization is adjacent to `case_type`.
    pub fn has_related_specialization(&self, case_type: CaseType) -> bool {
        case_type
            .related()
            .iter()
            .any(|related| self.specializations.contains(related))
    }
}

impl From<&LawyerRecord> for LawyerFeatures {
    fn from(record: &LawyerRecord) -> Self {
        Self {
            experience_years: record
                .experience
                .as_deref()
                .map(parse_experience_years)
                .unwrap_or(0),
            cases_handled: record.cases_handled.unwrap_or(0),
            specializations: record
                .specializations
                .iter()
                .filter_map(|s| CaseType::parse(s))
                .collect(),
            verified: record.credentials_verified.unwrap_or(false),
        }
    }
}

/// Cases per year; `0.0` when `experience_years` is zero.
pub fn efficiency(cases_handled: u32, experience_years: u32) -> f64 {
    if experience_years == 0 {
        return 0.0;
    }
    f64::from(cases_handled) / f64::from(experience_years)
}

/// Extract years of experience from free text.
///
/// Takes the first run of ASCII digits: `"10 years"` → 10, `"7-9 yrs"` → 7.
/// Text without digits yields 0; values too large for `u32` saturate.
pub fn parse_experience_years(text: &str) -> u32 {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn experience_first_number_wins() {
        assert_eq!(parse_experience_years("10 years"), 10);
        assert_eq!(parse_experience_years("about 7-9 yrs"), 7);
        assert_eq!(parse_experience_years("  3"), 3);
    }

    #[test]
    fn experience_without_digits_is_zero() {
        assert_eq!(parse_experience_years(""), 0);
        assert_eq!(parse_experience_years("senior partner"), 0);
    }

    #[test]
    fn experience_overflow_saturates() {
        assert_eq!(parse_experience_years("99999999999999 years"), u32::MAX);
    }

    #[test]
    fn efficiency_zero_experience() {
        assert_eq!(efficiency(40, 0), 0.0);
        assert!((efficiency(120, 12) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn from_record_normalizes() {
        let rec = LawyerRecord {
            id: 1,
            name: "A. Counsel".into(),
            experience: Some("12 years".into()),
            cases_handled: Some(120),
            specializations: vec!["Criminal".into(), "Real Estate".into(), "Tax".into()],
            credentials_verified: Some(true),
        };
        let f = LawyerFeatures::from(&rec);
        assert_eq!(f.experience_years, 12);
        assert_eq!(f.cases_handled, 120);
        assert_eq!(f.specialization_count(), 2);
        assert!(f.specializes_in(CaseType::Criminal));
        assert!(f.specializes_in(CaseType::RealEstate));
        assert!(f.verified);
    }

    #[test]
    fn from_record_missing_fields() {
        let f = LawyerFeatures::from(&LawyerRecord::default());
        assert_eq!(f.experience_years, 0);
        assert_eq!(f.cases_handled, 0);
        assert!(f.specializations.is_empty());
        assert!(!f.verified);
    }

    #[test]
    fn related_specialization() {
        let f = LawyerFeatures::new(5, 40, [CaseType::Civil], true);
        assert!(f.has_related_specialization(CaseType::Criminal));
        assert!(!f.has_related_specialization(CaseType::Corporate));
    }
}
