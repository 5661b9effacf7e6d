pub mod case;
pub mod config;
pub mod lawyer;
pub mod recommendation;
pub mod schema;
pub mod source;
pub mod suitability;

pub use case::{CaseFeatures, CaseRecord, CaseStatus, CaseType, UrgencyLevel};
pub use config::{ClassifierKind, ConfigError, FailurePolicy, RecommenderConfig, TreeConfig};
pub use lawyer::{LawyerFeatures, LawyerRecord, parse_experience_years};
pub use recommendation::RecommendationResult;
pub use schema::{Attribute, AttributeKind, FeatureSchema, SchemaError, SchemaRef};
pub use source::{CaseHistory, LawyerDirectory, SourceError};
pub use suitability::{SuitabilityLabel, assess, suitability_score};
