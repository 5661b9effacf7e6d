//! Legal case vocabulary: case types, urgency, status, and the normalized
//! features a case contributes to a training example or scoring request.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Practice area of a legal case. The domain is fixed; its declaration order
/// is the categorical order used by the feature schema.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseType {
    Criminal,
    #[default]
    Civil,
    Family,
    Corporate,
    Labor,
    RealEstate,
}

impl CaseType {
    pub const ALL: [CaseType; 6] = [
        Self::Criminal,
        Self::Civil,
        Self::Family,
        Self::Corporate,
        Self::Labor,
        Self::RealEstate,
    ];

    /// Canonical schema token, e.g. `REAL_ESTATE`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Criminal => "CRIMINAL",
            Self::Civil => "CIVIL",
            Self::Family => "FAMILY",
            Self::Corporate => "CORPORATE",
            Self::Labor => "LABOR",
            Self::RealEstate => "REAL_ESTATE",
        }
    }

    /// Human-readable name used in justification text.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Criminal => "Criminal",
            Self::Civil => "Civil",
            Self::Family => "Family",
            Self::Corporate => "Corporate",
            Self::Labor => "Labor",
            Self::RealEstate => "Real Estate",
        }
    }

    /// Parse free text such as `"Real Estate"`, `"real-estate"` or `"CIVIL"`.
    ///
    /// Returns `None` for blank or unrecognized input.
    pub fn parse(raw: &str) -> Option<Self> {
        let token: String = raw
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        Self::ALL.into_iter().find(|t| t.as_str() == token)
    }

    /// Case types considered adjacent practice areas.
    ///
    /// A lawyer specialized in one of these earns partial credit for a case of
    /// this type, and synthetic lawyers carry them at elevated probability.
    pub fn related(&self) -> &'static [CaseType] {
        match self {
            Self::Criminal => &[Self::Civil],
            Self::Civil => &[Self::Criminal, Self::RealEstate, Self::Family],
            Self::Family => &[Self::Civil],
            Self::Corporate => &[Self::Labor, Self::RealEstate],
            Self::Labor => &[Self::Corporate, Self::Civil],
            Self::RealEstate => &[Self::Corporate, Self::Civil],
        }
    }

    pub fn is_related_to(&self, other: CaseType) -> bool {
        self.related().contains(&other)
    }
}

impl fmt::Display for CaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How quickly the client needs representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrgencyLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl UrgencyLevel {
    pub const ALL: [UrgencyLevel; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }

    /// Case-insensitive parse. Returns `None` for blank or unrecognized input.
    pub fn parse(raw: &str) -> Option<Self> {
        let token = raw.trim().to_ascii_uppercase();
        Self::ALL.into_iter().find(|u| u.as_str() == token)
    }
}

impl fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a case. Only `Completed` cases feed training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
    Completed,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Declined => "DECLINED",
            Self::Completed => "COMPLETED",
        }
    }

    /// Case-insensitive parse; `CLOSED` is accepted as an alias of `COMPLETED`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "ACCEPTED" => Some(Self::Accepted),
            "DECLINED" => Some(Self::Declined),
            "COMPLETED" | "CLOSED" => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// A case as stored by the case-management layer. Attributes are free text
/// and may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: i64,
    #[serde(default)]
    pub case_type: Option<String>,
    #[serde(default)]
    pub urgency: Option<String>,
    #[serde(default)]
    pub status: CaseStatus,
    #[serde(default)]
    pub lawyer_id: Option<i64>,
}

/// Normalized case attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CaseFeatures {
    pub case_type: CaseType,
    pub urgency: UrgencyLevel,
}

impl CaseFeatures {
    pub fn new(case_type: CaseType, urgency: UrgencyLevel) -> Self {
        Self { case_type, urgency }
    }

    /// Normalize raw attributes. Missing or unrecognized values fall back to
    /// `CIVIL` / `MEDIUM`.
    pub fn from_raw(case_type: Option<&str>, urgency: Option<&str>) -> Self {
        Self {
            case_type: case_type.and_then(CaseType::parse).unwrap_or_default(),
            urgency: urgency.and_then(UrgencyLevel::parse).unwrap_or_default(),
        }
    }
}

impl From<&CaseRecord> for CaseFeatures {
    fn from(record: &CaseRecord) -> Self {
        Self::from_raw(record.case_type.as_deref(), record.urgency.as_deref())
    }
}
