//! A fitted classifier bound to the schema it was trained under.

use std::fmt;

use chrono::{DateTime, Utc};
use lexmatch_core::{CaseFeatures, LawyerFeatures, SchemaError, SchemaRef, SuitabilityLabel};
use serde::Serialize;

use crate::classifier::Classifier;

/// Shown for `last_trained_at` before the first successful training.
pub const NEVER_TRAINED: &str = "Never";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub classifier_type: String,
    pub training_set_size: usize,
    pub last_trained_at: Option<DateTime<Utc>>,
    /// Cross-validated fraction of correctly classified examples, 0–1.
    pub accuracy: f64,
}

impl ModelInfo {
    /// Sentinel info reported before any model is installed.
    pub fn untrained(classifier_type: &str) -> Self {
        Self {
            classifier_type: classifier_type.to_string(),
            training_set_size: 0,
            last_trained_at: None,
            accuracy: 0.0,
        }
    }

    /// `YYYY-MM-DD HH:MM:SS` (UTC), or `"Never"`.
    pub fn last_trained_label(&self) -> String {
        match self.last_trained_at {
            Some(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => NEVER_TRAINED.to_string(),
        }
    }
}

/// Immutable once built; replaced wholesale on retraining.
pub struct TrainedModel {
    schema: SchemaRef,
    classifier: Box<dyn Classifier>,
    info: ModelInfo,
}

impl TrainedModel {
    pub fn new(schema: SchemaRef, classifier: Box<dyn Classifier>, info: ModelInfo) -> Self {
        Self {
            schema,
            classifier,
            info,
        }
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    /// Feature vector under this model's schema.
    pub fn encode(&self, case: &CaseFeatures, lawyer: &LawyerFeatures) -> Result<Vec<f64>, SchemaError> {
        self.schema.encode(case, lawyer)
    }

    /// Probability per label, indexed by [`SuitabilityLabel::index`]
    /// whatever the class order of the schema.
    pub fn label_distribution(
        &self,
        case: &CaseFeatures,
        lawyer: &LawyerFeatures,
    ) -> Result<[f64; 4], SchemaError> {
        let row = self.encode(case, lawyer)?;
        let dist = self.classifier.distribution(&row);
        let expected = self.schema.num_classes();
        if dist.len() != expected {
            return Err(SchemaError::Arity {
                expected,
                actual: dist.len(),
            });
        }

        let mut out = [0.0; 4];
        for (i, p) in dist.into_iter().enumerate() {
            if let Some(label) = self.schema.decode_label(i) {
                out[label.index()] += p;
            }
        }
        Ok(out)
    }
}

impl fmt::Debug for TrainedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainedModel")
            .field("schema", &self.schema.fingerprint())
            .field("classifier", &self.classifier.name())
            .field("info", &self.info)
            .finish()
    }
}

/// Σ probability × label weight, in [1, 4] for a proper distribution.
pub fn expected_weight(distribution: &[f64; 4]) -> f64 {
    SuitabilityLabel::ALL
        .iter()
        .map(|l| distribution[l.index()] * l.weight())
        .sum()
}
