//! Fit a classifier and estimate its accuracy by stratified k-fold
//! cross-validation.

use std::sync::Arc;

use chrono::Utc;
use lexmatch_core::RecommenderConfig;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{info, warn};

use crate::TrainingError;
use crate::classifier::{ClassifierFactory, classifier_factory};
use crate::dataset::{EncodedDataset, TrainingDataset};
use crate::model::{ModelInfo, TrainedModel};

/// Cross-validation outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    /// Folds actually used: `min(configured, instances)`.
    pub folds: usize,
    pub instances: usize,
    pub correct: usize,
    /// `correct / instances`.
    pub accuracy: f64,
    /// `confusion[actual][predicted]`, by class index.
    pub confusion: Vec<Vec<usize>>,
}

pub struct ClassifierTrainer {
    factory: ClassifierFactory,
    folds: usize,
    seed: u64,
}

impl ClassifierTrainer {
    pub fn new(factory: ClassifierFactory, folds: usize, seed: u64) -> Self {
        Self {
            factory,
            folds,
            seed,
        }
    }

    pub fn from_config(config: &RecommenderConfig) -> Self {
        Self::new(
            classifier_factory(config.classifier, config.tree),
            config.cv_folds,
            config.cv_seed,
        )
    }

    pub fn classifier_name(&self) -> &'static str {
        (self.factory)().name()
    }

    /// Fit on the whole dataset, then cross-validate. The returned model is
    /// only built once both steps succeed.
    pub fn train(&self, dataset: &TrainingDataset) -> Result<TrainedModel, TrainingError> {
        if dataset.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }
        let data = dataset.encode()?;

        let mut classifier = (self.factory)();
        classifier.fit(&data)?;
        let evaluation = self.cross_validate(&data)?;

        info!(
            classifier = classifier.name(),
            instances = data.len(),
            folds = evaluation.folds,
            accuracy = evaluation.accuracy,
            "model trained"
        );

        let info = ModelInfo {
            classifier_type: classifier.name().to_string(),
            training_set_size: data.len(),
            last_trained_at: Some(Utc::now()),
            accuracy: evaluation.accuracy,
        };
        Ok(TrainedModel::new(Arc::clone(dataset.schema()), classifier, info))
    }

    /// Cross-validate on `dataset` without producing a model.
    pub fn evaluate(&self, dataset: &TrainingDataset) -> Result<Evaluation, TrainingError> {
        if dataset.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }
        self.cross_validate(&dataset.encode()?)
    }

    fn cross_validate(&self, data: &EncodedDataset) -> Result<Evaluation, TrainingError> {
        let k = data.num_classes();
        let mut confusion = vec![vec![0usize; k]; k];
        let folds = self.folds.min(data.len());

        if folds < 2 {
            warn!(instances = data.len(), "too few instances to cross-validate, scoring on training data");
            let mut classifier = (self.factory)();
            classifier.fit(data)?;
            for (row, &actual) in data.rows.iter().zip(&data.labels) {
                confusion[actual][classifier.predict(row)] += 1;
            }
            return Ok(summarize(1, confusion));
        }

        let assignment = stratified_folds(&data.labels, folds, self.seed);
        for fold in 0..folds {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..data.len()).partition(|&i| assignment[i] == fold);
            let mut classifier = (self.factory)();
            classifier.fit(&data.subset(&train))?;
            for i in test {
                let predicted = classifier.predict(&data.rows[i]);
                confusion[data.labels[i]][predicted] += 1;
            }
        }
        Ok(summarize(folds, confusion))
    }
}

fn summarize(folds: usize, confusion: Vec<Vec<usize>>) -> Evaluation {
    let instances: usize = confusion.iter().flatten().sum();
    let correct: usize = (0..confusion.len()).map(|c| confusion[c][c]).sum();
    let accuracy = if instances > 0 {
        correct as f64 / instances as f64
    } else {
        0.0
    };
    Evaluation {
        folds,
        instances,
        correct,
        accuracy,
        confusion,
    }
}

/// Fold index per instance. Instances are shuffled with `seed`, grouped by
/// class (stable), then dealt round-robin so each fold gets a near-equal
/// share of every class.
fn stratified_folds(labels: &[usize], folds: usize, seed: u64) -> Vec<usize> {
    let mut order: Vec<usize> = (0..labels.len()).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));
    order.sort_by_key(|&i| labels[i]);

    let mut assignment = vec![0; labels.len()];
    for (pos, i) in order.into_iter().enumerate() {
        assignment[i] = pos % folds;
    }
    assignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{TrainingExample, synthesize};
    use lexmatch_core::{CaseFeatures, CaseType, FeatureSchema, LawyerFeatures, UrgencyLevel};

    fn trainer() -> ClassifierTrainer {
        ClassifierTrainer::from_config(&RecommenderConfig::default())
    }

    fn dataset(examples: Vec<TrainingExample>) -> TrainingDataset {
        TrainingDataset::with_examples(Arc::new(FeatureSchema::lawyer_recommendation()), examples)
    }

    #[test]
    fn empty_dataset_is_a_training_error() {
        let err = trainer().train(&dataset(vec![])).unwrap_err();
        assert!(matches!(err, TrainingError::EmptyDataset));
        assert!(trainer().evaluate(&dataset(vec![])).is_err());
    }

    #[test]
    fn trains_on_synthetic_data() {
        let data = dataset(synthesize(300, 42));
        let model = trainer().train(&data).unwrap();
        let info = model.info();
        assert_eq!(info.training_set_size, 300);
        assert_eq!(info.classifier_type, "Decision Tree (C4.5)");
        assert!(info.last_trained_at.is_some());
        assert!(info.accuracy > 0.6, "cv accuracy {}", info.accuracy);
        assert!(Arc::ptr_eq(model.schema(), data.schema()));
    }

    #[test]
    fn evaluation_is_reproducible() {
        let data = dataset(synthesize(200, 7));
        let a = trainer().evaluate(&data).unwrap();
        let b = trainer().evaluate(&data).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.folds, 10);
        assert_eq!(a.instances, 200);
        assert_eq!(a.confusion.iter().flatten().sum::<usize>(), 200);
    }

    #[test]
    fn folds_capped_by_instances() {
        let data = dataset(synthesize(4, 1));
        let eval = trainer().evaluate(&data).unwrap();
        assert_eq!(eval.folds, 4);
        assert_eq!(eval.instances, 4);
    }

    #[test]
    fn single_instance_scores_on_itself() {
        let example = TrainingExample::labeled(
            CaseFeatures::new(CaseType::Family, UrgencyLevel::Low),
            LawyerFeatures::new(6, 60, [CaseType::Family], true),
        );
        let model = trainer().train(&dataset(vec![example])).unwrap();
        assert_eq!(model.info().training_set_size, 1);
        assert_eq!(model.info().accuracy, 1.0);
    }

    #[test]
    fn naive_bayes_is_selectable() {
        let config = RecommenderConfig {
            classifier: lexmatch_core::ClassifierKind::NaiveBayes,
            ..Default::default()
        };
        let model = ClassifierTrainer::from_config(&config)
            .train(&dataset(synthesize(150, 3)))
            .unwrap();
        assert_eq!(model.info().classifier_type, "Naive Bayes");
    }

    #[test]
    fn folds_are_stratified() {
        let labels: Vec<usize> = (0..40).map(|i| if i < 30 { 0 } else { 1 }).collect();
        let assignment = stratified_folds(&labels, 10, 1);
        for fold in 0..10 {
            let minority = (0..40)
                .filter(|&i| assignment[i] == fold && labels[i] == 1)
                .count();
            assert_eq!(minority, 1, "fold {fold}");
        }
    }
}
