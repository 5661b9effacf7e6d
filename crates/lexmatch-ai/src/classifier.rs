//! Classifier capability shared by training and scoring.
//!
//! Any implementation that can fit an [`EncodedDataset`] and return a
//! probability per class can back the recommender. The trainer builds fresh
//! instances through a [`ClassifierFactory`] so cross-validation folds never
//! share state with the installed model.

use std::sync::Arc;

use lexmatch_core::{ClassifierKind, TreeConfig};

use crate::TrainingError;
use crate::bayes::NaiveBayes;
use crate::dataset::EncodedDataset;
use crate::tree::DecisionTree;

pub trait Classifier: Send + Sync {
    /// Human-readable classifier type, reported in model info.
    fn name(&self) -> &'static str;

    fn fit(&mut self, data: &EncodedDataset) -> Result<(), TrainingError>;

    /// Probability per class index. Sums to 1. An unfitted classifier
    /// returns a uniform distribution.
    fn distribution(&self, row: &[f64]) -> Vec<f64>;

    /// Most probable class index; ties go to the lower index.
    fn predict(&self, row: &[f64]) -> usize {
        argmax(&self.distribution(row))
    }
}

/// Builds an unfitted classifier.
pub type ClassifierFactory = Arc<dyn Fn() -> Box<dyn Classifier> + Send + Sync>;

pub fn classifier_factory(kind: ClassifierKind, tree: TreeConfig) -> ClassifierFactory {
    match kind {
        ClassifierKind::DecisionTree => Arc::new(move || Box::new(DecisionTree::new(tree))),
        ClassifierKind::NaiveBayes => Arc::new(|| Box::new(NaiveBayes::new())),
    }
}

pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// Scale non-negative weights to sum to 1; uniform when they sum to 0.
pub(crate) fn normalize(mut weights: Vec<f64>) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if total > 0.0 {
        for w in &mut weights {
            *w /= total;
        }
    } else if !weights.is_empty() {
        let uniform = 1.0 / weights.len() as f64;
        weights.fill(uniform);
    }
    weights
}

/// Check every row has one value per schema attribute.
pub(crate) fn check_arity(data: &EncodedDataset) -> Result<(), TrainingError> {
    let expected = data.schema.num_attributes();
    match data.rows.iter().find(|r| r.len() != expected) {
        Some(row) => Err(lexmatch_core::SchemaError::Arity {
            expected,
            actual: row.len(),
        }
        .into()),
        None => Ok(()),
    }
}
