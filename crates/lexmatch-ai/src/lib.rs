//! Recommendation engine: dataset building, classifier training with
//! cross-validation, scoring, ranking, and the service that owns the
//! installed model.

mod error;
pub use error::{RecommendError, TrainingError};

pub mod bayes;
pub mod classifier;
pub mod dataset;
pub mod model;
pub mod ranking;
pub mod scheduler;
pub mod scoring;
pub mod service;
pub mod trainer;
pub mod tree;

pub use classifier::{Classifier, ClassifierFactory, classifier_factory};
pub use dataset::{DatasetBuilder, EncodedDataset, TrainingDataset, TrainingExample};
pub use model::{ModelInfo, TrainedModel};
pub use ranking::RecommendationRanker;
pub use scheduler::spawn_retrain_loop;
pub use scoring::{ScoreBreakdown, ScoredCandidate, ScoringEngine};
pub use service::RecommendationService;
pub use trainer::{ClassifierTrainer, Evaluation};
