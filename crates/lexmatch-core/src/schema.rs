//! Feature schema shared by training and scoring.
//!
//! A schema is the ordered attribute list plus, for nominal attributes, the
//! ordered label domain. Feature vectors are encoded against a specific
//! schema instance: nominal values become their index in that instance's
//! domain, numeric values pass through. A classifier trained under one
//! schema is only ever queried with vectors encoded by the same instance.

use std::collections::HashMap;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema};
use thiserror::Error;

use crate::case::{CaseFeatures, CaseType, UrgencyLevel};
use crate::lawyer::LawyerFeatures;
use crate::suitability::SuitabilityLabel;

/// Arrow field metadata key holding a nominal attribute's domain.
pub const DOMAIN_METADATA_KEY: &str = "lexmatch.domain";

const YES: &str = "YES";
const NO: &str = "NO";

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("attribute '{0}' has no feature source")]
    UnknownAttribute(String),

    #[error("value '{value}' is not in the domain of attribute '{attribute}'")]
    UnknownValue { attribute: String, value: String },

    #[error("class attribute '{0}' must be nominal")]
    NumericClass(String),

    #[error("row has {actual} values, schema expects {expected}")]
    Arity { expected: usize, actual: usize },

    #[error("arrow schema mismatch: {0}")]
    Arrow(String),
}

/// Value type of an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKind {
    /// Categorical with a fixed, ordered domain.
    Nominal(Vec<String>),
    Numeric,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
}

impl Attribute {
    pub fn nominal<S: Into<String>>(name: &str, domain: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.to_string(),
            kind: AttributeKind::Nominal(domain.into_iter().map(Into::into).collect()),
        }
    }

    pub fn numeric(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: AttributeKind::Numeric,
        }
    }

    pub fn domain(&self) -> Option<&[String]> {
        match &self.kind {
            AttributeKind::Nominal(values) => Some(values),
            AttributeKind::Numeric => None,
        }
    }

    pub fn is_nominal(&self) -> bool {
        matches!(self.kind, AttributeKind::Nominal(_))
    }

    /// Index of `value` in this attribute's domain.
    pub fn index_of(&self, value: &str) -> Result<usize, SchemaError> {
        self.domain()
            .and_then(|d| d.iter().position(|v| v == value))
            .ok_or_else(|| SchemaError::UnknownValue {
                attribute: self.name.clone(),
                value: value.to_string(),
            })
    }
}

/// Ordered feature attributes plus the nominal class attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    relation: String,
    attributes: Vec<Attribute>,
    class: Attribute,
}

/// Shared handle; datasets and models hold the same instance.
pub type SchemaRef = Arc<FeatureSchema>;

impl FeatureSchema {
    pub fn new(
        relation: &str,
        attributes: Vec<Attribute>,
        class: Attribute,
    ) -> Result<Self, SchemaError> {
        if !class.is_nominal() {
            return Err(SchemaError::NumericClass(class.name));
        }
        for attr in &attributes {
            source_for(&attr.name)?;
        }
        Ok(Self {
            relation: relation.to_string(),
            attributes,
            class,
        })
    }

    /// The lawyer-recommendation schema.
    ///
    /// `case_type`, `urgency`, `experience_years`, `cases_handled`,
    /// `has_<type>` for every case type, `lawyer_efficiency`,
    /// `specialization_count`; class `suitability`.
    pub fn lawyer_recommendation() -> Self {
        let mut attributes = vec![
            Attribute::nominal("case_type", CaseType::ALL.map(|t| t.as_str())),
            Attribute::nominal("urgency", UrgencyLevel::ALL.map(|u| u.as_str())),
            Attribute::numeric("experience_years"),
            Attribute::numeric("cases_handled"),
        ];
        for t in CaseType::ALL {
            attributes.push(Attribute::nominal(&has_attribute(t), [YES, NO]));
        }
        attributes.push(Attribute::numeric("lawyer_efficiency"));
        attributes.push(Attribute::numeric("specialization_count"));

        Self {
            relation: "LawyerRecommendation".to_string(),
            attributes,
            class: Attribute::nominal("suitability", SuitabilityLabel::ALL.map(|l| l.as_str())),
        }
    }

    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn class_attribute(&self) -> &Attribute {
        &self.class
    }

    pub fn num_attributes(&self) -> usize {
        self.attributes.len()
    }

    pub fn num_classes(&self) -> usize {
        self.class.domain().map_or(0, <[String]>::len)
    }

    /// Textual identity of attribute order and domains.
    pub fn fingerprint(&self) -> String {
        let mut parts: Vec<String> = self.attributes.iter().map(describe).collect();
        parts.push(describe(&self.class));
        format!("{}[{}]", self.relation, parts.join(";"))
    }

    /// Encode a (case, lawyer) pair as a feature vector under this schema.
    pub fn encode(
        &self,
        case: &CaseFeatures,
        lawyer: &LawyerFeatures,
    ) -> Result<Vec<f64>, SchemaError> {
        self.attributes
            .iter()
            .map(|attr| match source_for(&attr.name)?.value(case, lawyer) {
                RawValue::Nominal(v) => attr.index_of(&v).map(|i| i as f64),
                RawValue::Numeric(x) => Ok(x),
            })
            .collect()
    }

    /// Class index of `label` under this schema.
    pub fn encode_label(&self, label: SuitabilityLabel) -> Result<usize, SchemaError> {
        self.class.index_of(label.as_str())
    }

    /// Map a class index back to a label.
    pub fn decode_label(&self, index: usize) -> Option<SuitabilityLabel> {
        self.class
            .domain()
            .and_then(|d| d.get(index))
            .and_then(|v| SuitabilityLabel::parse(v))
    }

    /// Arrow schema for tabular export: nominal → Utf8 (domain in field
    /// metadata), numeric → Float64, class last.
    pub fn to_arrow(&self) -> Schema {
        let fields: Vec<Field> = self
            .attributes
            .iter()
            .chain(std::iter::once(&self.class))
            .map(arrow_field)
            .collect();
        Schema::new(fields)
    }

    /// Rebuild a schema from an Arrow schema produced by [`Self::to_arrow`].
    pub fn from_arrow(relation: &str, schema: &Schema) -> Result<Self, SchemaError> {
        let mut attrs: Vec<Attribute> = schema
            .fields()
            .iter()
            .map(|f| -> Result<Attribute, SchemaError> {
                match f.data_type() {
                    DataType::Utf8 | DataType::LargeUtf8 => {
                        let domain = f.metadata().get(DOMAIN_METADATA_KEY).ok_or_else(|| {
                            SchemaError::Arrow(format!(
                                "field '{}' has no domain metadata",
                                f.name()
                            ))
                        })?;
                        Ok(Attribute::nominal(f.name(), domain.split(',')))
                    }
                    DataType::Float64 => Ok(Attribute::numeric(f.name())),
                    other => Err(SchemaError::Arrow(format!(
                        "field '{}' has unsupported type {other}",
                        f.name()
                    ))),
                }
            })
            .collect::<Result<_, _>>()?;
        let class = attrs
            .pop()
            .ok_or_else(|| SchemaError::Arrow("empty schema".into()))?;
        Self::new(relation, attrs, class)
    }
}

fn has_attribute(t: CaseType) -> String {
    format!("has_{}", t.as_str().to_ascii_lowercase())
}

fn describe(attr: &Attribute) -> String {
    match &attr.kind {
        AttributeKind::Nominal(d) => format!("{}{{{}}}", attr.name, d.join(",")),
        AttributeKind::Numeric => format!("{}:numeric", attr.name),
    }
}

fn arrow_field(attr: &Attribute) -> Field {
    match &attr.kind {
        AttributeKind::Nominal(domain) => Field::new(&attr.name, DataType::Utf8, false)
            .with_metadata(HashMap::from([(
                DOMAIN_METADATA_KEY.to_string(),
                domain.join(","),
            )])),
        AttributeKind::Numeric => Field::new(&attr.name, DataType::Float64, false),
    }
}

// ── Feature sources ──

enum RawValue {
    Nominal(String),
    Numeric(f64),
}

/// Where an attribute's value comes from, resolved by attribute name.
enum FeatureSource {
    CaseType,
    Urgency,
    ExperienceYears,
    CasesHandled,
    HasSpecialization(CaseType),
    Efficiency,
    SpecializationCount,
}

fn source_for(name: &str) -> Result<FeatureSource, SchemaError> {
    let source = match name {
        "case_type" => FeatureSource::CaseType,
        "urgency" => FeatureSource::Urgency,
        "experience_years" => FeatureSource::ExperienceYears,
        "cases_handled" => FeatureSource::CasesHandled,
        "lawyer_efficiency" => FeatureSource::Efficiency,
        "specialization_count" => FeatureSource::SpecializationCount,
        other => {
            let t = other
                .strip_prefix("has_")
                .and_then(CaseType::parse)
                .ok_or_else(|| SchemaError::UnknownAttribute(other.to_string()))?;
            FeatureSource::HasSpecialization(t)
        }
    };
    Ok(source)
}

impl FeatureSource {
    fn value(&self, case: &CaseFeatures, lawyer: &LawyerFeatures) -> RawValue {
        match self {
            Self::CaseType => RawValue::Nominal(case.case_type.as_str().to_string()),
            Self::Urgency => RawValue::Nominal(case.urgency.as_str().to_string()),
            Self::ExperienceYears => RawValue::Numeric(f64::from(lawyer.experience_years)),
            Self::CasesHandled => RawValue::Numeric(f64::from(lawyer.cases_handled)),
            Self::HasSpecialization(t) => {
                let flag = if lawyer.specializes_in(*t) { YES } else { NO };
                RawValue::Nominal(flag.to_string())
            }
            Self::Efficiency => RawValue::Numeric(lawyer.efficiency()),
            Self::SpecializationCount => RawValue::Numeric(lawyer.specialization_count() as f64),
        }
    }
}
