//! Recommender configuration.
//!
//! Every setting has a default. A JSON file may override any subset, and
//! `LEXMATCH_*` environment variables override the file.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value '{value}' for {name}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Which classifier implementation the trainer fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    #[default]
    DecisionTree,
    NaiveBayes,
}

impl FromStr for ClassifierKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "decision_tree" | "j48" | "tree" => Ok(Self::DecisionTree),
            "naive_bayes" | "bayes" => Ok(Self::NaiveBayes),
            other => Err(format!("unknown classifier '{other}'")),
        }
    }
}

/// What scoring does when one candidate cannot be encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log and omit the candidate; score the rest.
    #[default]
    Skip,
    /// Fail the whole request.
    Abort,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            other => Err(format!("unknown failure policy '{other}'")),
        }
    }
}

/// Decision-tree induction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Minimum instances per branch for a split to be accepted. Default: `2`.
    pub min_leaf: usize,
    /// Pruning confidence factor in (0, 0.5]. Default: `0.25`.
    pub confidence: f64,
    /// Whether to run pessimistic-error pruning. Default: `true`.
    pub pruned: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            min_leaf: 2,
            confidence: 0.25,
            pruned: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    /// Below this many real examples, synthetic examples are added. Default: `100`.
    pub sparse_threshold: usize,
    /// Synthetic examples generated when data is sparse; `0` disables. Default: `300`.
    pub synthetic_count: usize,
    /// Seed for synthetic generation. Default: `42`.
    pub synthetic_seed: u64,
    /// Cross-validation folds. Default: `10`.
    pub cv_folds: usize,
    /// Seed for fold assignment. Default: `1`.
    pub cv_seed: u64,
    /// Recommendations returned per request. Default: `10`.
    pub top_n: usize,
    pub classifier: ClassifierKind,
    pub tree: TreeConfig,
    pub candidate_failure: FailurePolicy,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            sparse_threshold: 100,
            synthetic_count: 300,
            synthetic_seed: 42,
            cv_folds: 10,
            cv_seed: 1,
            top_n: 10,
            classifier: ClassifierKind::default(),
            tree: TreeConfig::default(),
            candidate_failure: FailurePolicy::default(),
        }
    }
}

impl RecommenderConfig {
    const ENV_SPARSE_THRESHOLD: &'static str = "LEXMATCH_SPARSE_THRESHOLD";
    const ENV_SYNTHETIC_COUNT: &'static str = "LEXMATCH_SYNTHETIC_COUNT";
    const ENV_SYNTHETIC_SEED: &'static str = "LEXMATCH_SYNTHETIC_SEED";
    const ENV_CV_FOLDS: &'static str = "LEXMATCH_CV_FOLDS";
    const ENV_TOP_N: &'static str = "LEXMATCH_TOP_N";
    const ENV_CLASSIFIER: &'static str = "LEXMATCH_CLASSIFIER";
    const ENV_CANDIDATE_FAILURE: &'static str = "LEXMATCH_CANDIDATE_FAILURE";

    /// Defaults, then the optional JSON file, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(p) => Self::from_json_file(p)?,
            None => Self::default(),
        };
        let config = base.with_env_overrides()?;
        config.validate()?;
        debug!(?config, "loaded recommender config");
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `LEXMATCH_*` variables on top of `self`.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        override_from_env(Self::ENV_SPARSE_THRESHOLD, &mut self.sparse_threshold)?;
        override_from_env(Self::ENV_SYNTHETIC_COUNT, &mut self.synthetic_count)?;
        override_from_env(Self::ENV_SYNTHETIC_SEED, &mut self.synthetic_seed)?;
        override_from_env(Self::ENV_CV_FOLDS, &mut self.cv_folds)?;
        override_from_env(Self::ENV_TOP_N, &mut self.top_n)?;
        override_from_env(Self::ENV_CLASSIFIER, &mut self.classifier)?;
        override_from_env(Self::ENV_CANDIDATE_FAILURE, &mut self.candidate_failure)?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cv_folds < 2 {
            return Err(ConfigError::Invalid(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        if self.top_n == 0 {
            return Err(ConfigError::Invalid("top_n must be positive".into()));
        }
        if !(self.tree.confidence > 0.0 && self.tree.confidence <= 0.5) {
            return Err(ConfigError::Invalid(format!(
                "tree.confidence must be in (0, 0.5], got {}",
                self.tree.confidence
            )));
        }
        if self.tree.min_leaf == 0 {
            return Err(ConfigError::Invalid("tree.min_leaf must be positive".into()));
        }
        Ok(())
    }
}

fn override_from_env<T: FromStr>(name: &'static str, slot: &mut T) -> Result<(), ConfigError> {
    if let Ok(raw) = env::var(name) {
        *slot = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            name,
            value: raw.clone(),
        })?;
    }
    Ok(())
}
