//! The recommendation service: owns the installed model and exposes
//! train / recommend / model info / readiness.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use lexmatch_core::{
    CaseFeatures, CaseHistory, LawyerDirectory, LawyerRecord, RecommendationResult,
    RecommenderConfig,
};
use tracing::{debug, info};

use crate::RecommendError;
use crate::dataset::{DatasetBuilder, TrainingDataset};
use crate::model::{ModelInfo, TrainedModel};
use crate::ranking::RecommendationRanker;
use crate::scoring::ScoringEngine;
use crate::trainer::ClassifierTrainer;

/// Holds at most one installed [`TrainedModel`]. Training builds a complete
/// replacement and swaps the reference in one step; each recommendation
/// works from the model that was installed when it started.
pub struct RecommendationService {
    history: Arc<dyn CaseHistory>,
    directory: Arc<dyn LawyerDirectory>,
    builder: DatasetBuilder,
    trainer: ClassifierTrainer,
    engine: ScoringEngine,
    ranker: RecommendationRanker,
    model: RwLock<Option<Arc<TrainedModel>>>,
    /// Serializes training runs.
    training: Mutex<()>,
}

impl RecommendationService {
    pub fn new(
        history: Arc<dyn CaseHistory>,
        directory: Arc<dyn LawyerDirectory>,
        config: &RecommenderConfig,
    ) -> Self {
        Self {
            history,
            directory,
            builder: DatasetBuilder::from_config(config),
            trainer: ClassifierTrainer::from_config(config),
            engine: ScoringEngine::new(config.candidate_failure),
            ranker: RecommendationRanker::new(config.top_n),
            model: RwLock::new(None),
            training: Mutex::new(()),
        }
    }

    pub fn trainer(&self) -> &ClassifierTrainer {
        &self.trainer
    }

    /// Build the training dataset from current case history.
    pub fn build_dataset(&self) -> Result<TrainingDataset, RecommendError> {
        self.builder
            .build(self.history.as_ref())
            .map_err(RecommendError::Data)
    }

    /// Rebuild the dataset, fit, evaluate, and install the new model. On any
    /// failure the previously installed model stays in place.
    pub fn train_model(&self) -> Result<ModelInfo, RecommendError> {
        let _guard = self.training.lock().unwrap_or_else(PoisonError::into_inner);
        let dataset = self.build_dataset()?;
        let model = Arc::new(self.trainer.train(&dataset)?);
        let info = model.info().clone();

        *self.model.write().unwrap_or_else(PoisonError::into_inner) = Some(model);
        info!(
            instances = info.training_set_size,
            accuracy = info.accuracy,
            "installed new model"
        );
        Ok(info)
    }

    /// Rank every lawyer in the directory for `case`.
    pub fn recommend(&self, case: &CaseFeatures) -> Result<Vec<RecommendationResult>, RecommendError> {
        let model = self.current()?;
        let lawyers = self
            .directory
            .find_all_lawyers()
            .map_err(RecommendError::Directory)?;
        self.rank_with(&model, case, &lawyers)
    }

    /// Rank an explicit candidate list for `case`.
    pub fn recommend_for(
        &self,
        case: &CaseFeatures,
        candidates: &[LawyerRecord],
    ) -> Result<Vec<RecommendationResult>, RecommendError> {
        let model = self.current()?;
        self.rank_with(&model, case, candidates)
    }

    pub fn model_info(&self) -> ModelInfo {
        match self.snapshot() {
            Some(model) => model.info().clone(),
            None => ModelInfo::untrained(self.trainer.classifier_name()),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.snapshot().is_some()
    }

    fn rank_with(
        &self,
        model: &TrainedModel,
        case: &CaseFeatures,
        candidates: &[LawyerRecord],
    ) -> Result<Vec<RecommendationResult>, RecommendError> {
        let scored = self.engine.score_candidates(model, case, candidates)?;
        let results = self.ranker.rank(scored);
        debug!(
            case_type = %case.case_type,
            candidates = candidates.len(),
            returned = results.len(),
            "recommendation complete"
        );
        Ok(results)
    }

    fn snapshot(&self) -> Option<Arc<TrainedModel>> {
        self.model
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn current(&self) -> Result<Arc<TrainedModel>, RecommendError> {
        self.snapshot().ok_or(RecommendError::NotReady)
    }
}
