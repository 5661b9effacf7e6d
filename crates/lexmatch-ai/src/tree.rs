//! C4.5-style decision tree.
//!
//! Splits are chosen by gain ratio among attributes whose information gain
//! is at least the average. Nominal attributes split multiway (one branch
//! per domain value); numeric attributes split in two at a threshold, with
//! an MDL penalty on the gain for the number of candidate thresholds. After
//! growing, subtrees are replaced by leaves where the pessimistic error
//! estimate at the configured confidence does not get worse.
//!
//! Subtree raising is not performed.

use lexmatch_core::{AttributeKind, SuitabilityLabel, TreeConfig};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::TrainingError;
use crate::classifier::{Classifier, check_arity, normalize};
use crate::dataset::EncodedDataset;

/// Gains this close to the average still qualify for selection.
const GAIN_SLACK: f64 = 1e-3;
/// Upper bound on the minimum branch size for numeric splits.
const MAX_MIN_SPLIT: f64 = 25.0;

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        counts: Vec<f64>,
    },
    Nominal {
        attribute: usize,
        counts: Vec<f64>,
        children: Vec<Node>,
    },
    Numeric {
        attribute: usize,
        threshold: f64,
        counts: Vec<f64>,
        le: Box<Node>,
        gt: Box<Node>,
    },
}

impl Node {
    fn counts(&self) -> &[f64] {
        match self {
            Node::Leaf { counts } | Node::Nominal { counts, .. } | Node::Numeric { counts, .. } => {
                counts
            }
        }
    }

    /// Class counts of the leaf `row` lands in. Empty leaves defer to the
    /// nearest non-empty ancestor.
    fn leaf_counts(&self, row: &[f64]) -> &[f64] {
        let child = match self {
            Node::Leaf { counts } => return counts,
            Node::Nominal {
                attribute,
                children,
                ..
            } => value_index(row[*attribute]).and_then(|v| children.get(v)),
            Node::Numeric {
                attribute,
                threshold,
                le,
                gt,
                ..
            } => Some(if row[*attribute] <= *threshold { &**le } else { &**gt }),
        };
        match child {
            Some(c) => {
                let counts = c.leaf_counts(row);
                if total(counts) > 0.0 { counts } else { self.counts() }
            }
            None => self.counts(),
        }
    }

    fn leaves(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Nominal { children, .. } => children.iter().map(Node::leaves).sum(),
            Node::Numeric { le, gt, .. } => le.leaves() + gt.leaves(),
        }
    }
}

enum Split {
    Nominal { attribute: usize, arity: usize },
    Numeric { attribute: usize, threshold: f64 },
}

struct Candidate {
    split: Split,
    gain: f64,
    split_info: f64,
}

#[derive(Debug, Clone)]
pub struct DecisionTree {
    config: TreeConfig,
    num_classes: usize,
    root: Option<Node>,
}

impl DecisionTree {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            num_classes: SuitabilityLabel::ALL.len(),
            root: None,
        }
    }

    /// Number of leaves; `0` before fitting.
    pub fn leaves(&self) -> usize {
        self.root.as_ref().map_or(0, Node::leaves)
    }

    fn grow(&self, data: &EncodedDataset, arities: &[Option<usize>], idx: &[usize]) -> Node {
        let counts = class_counts(data, idx, self.num_classes);
        let n = idx.len();
        let classes_present = counts.iter().filter(|c| **c > 0.0).count();
        if n < 2 * self.config.min_leaf || classes_present <= 1 {
            return Node::Leaf { counts };
        }

        match self.best_split(data, arities, idx, &counts) {
            None => Node::Leaf { counts },
            Some(Split::Nominal { attribute, arity }) => {
                let mut parts = vec![Vec::new(); arity];
                for &i in idx {
                    if let Some(v) = value_index(data.rows[i][attribute]).filter(|v| *v < arity) {
                        parts[v].push(i);
                    }
                }
                let children = parts
                    .iter()
                    .map(|part| {
                        if part.is_empty() {
                            Node::Leaf {
                                counts: vec![0.0; self.num_classes],
                            }
                        } else {
                            self.grow(data, arities, part)
                        }
                    })
                    .collect();
                Node::Nominal {
                    attribute,
                    counts,
                    children,
                }
            }
            Some(Split::Numeric {
                attribute,
                threshold,
            }) => {
                let (le, gt): (Vec<usize>, Vec<usize>) = idx
                    .iter()
                    .partition(|&&i| data.rows[i][attribute] <= threshold);
                Node::Numeric {
                    attribute,
                    threshold,
                    counts,
                    le: Box::new(self.grow(data, arities, &le)),
                    gt: Box::new(self.grow(data, arities, &gt)),
                }
            }
        }
    }

    fn best_split(
        &self,
        data: &EncodedDataset,
        arities: &[Option<usize>],
        idx: &[usize],
        counts: &[f64],
    ) -> Option<Split> {
        let parent_entropy = entropy(counts);
        let candidates: Vec<Candidate> = arities
            .iter()
            .enumerate()
            .filter_map(|(attribute, arity)| match arity {
                Some(arity) => self.nominal_candidate(data, idx, attribute, *arity, parent_entropy),
                None => self.numeric_candidate(data, idx, attribute, parent_entropy),
            })
            .filter(|c| c.gain > 0.0 && c.split_info > 0.0)
            .collect();
        if candidates.is_empty() {
            return None;
        }

        let average_gain = candidates.iter().map(|c| c.gain).sum::<f64>() / candidates.len() as f64;
        candidates
            .into_iter()
            .filter(|c| c.gain >= average_gain - GAIN_SLACK)
            .max_by(|a, b| (a.gain / a.split_info).total_cmp(&(b.gain / b.split_info)))
            .map(|c| c.split)
    }

    fn nominal_candidate(
        &self,
        data: &EncodedDataset,
        idx: &[usize],
        attribute: usize,
        arity: usize,
        parent_entropy: f64,
    ) -> Option<Candidate> {
        let mut branches = vec![vec![0.0; self.num_classes]; arity];
        for &i in idx {
            if let Some(v) = value_index(data.rows[i][attribute]).filter(|v| *v < arity) {
                branches[v][data.labels[i]] += 1.0;
            }
        }
        let sizes: Vec<f64> = branches.iter().map(|b| total(b)).collect();
        let big_enough = sizes
            .iter()
            .filter(|s| **s >= self.config.min_leaf as f64)
            .count();
        if big_enough < 2 {
            return None;
        }

        let n: f64 = sizes.iter().sum();
        let children_entropy: f64 = branches
            .iter()
            .zip(&sizes)
            .map(|(b, s)| s / n * entropy(b))
            .sum();
        Some(Candidate {
            split: Split::Nominal { attribute, arity },
            gain: parent_entropy - children_entropy,
            split_info: entropy(&sizes),
        })
    }

    fn numeric_candidate(
        &self,
        data: &EncodedDataset,
        idx: &[usize],
        attribute: usize,
        parent_entropy: f64,
    ) -> Option<Candidate> {
        let mut sorted: Vec<(f64, usize)> = idx
            .iter()
            .map(|&i| (data.rows[i][attribute], data.labels[i]))
            .collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = sorted.len() as f64;
        let min_leaf = self.config.min_leaf as f64;
        let min_split = match 0.1 * n / self.num_classes as f64 {
            raw if raw < min_leaf => min_leaf,
            raw => raw.min(MAX_MIN_SPLIT),
        };

        let mut left = vec![0.0; self.num_classes];
        let mut right = vec![0.0; self.num_classes];
        for (_, label) in &sorted {
            right[*label] += 1.0;
        }

        let mut thresholds = 0usize;
        let mut best: Option<(f64, f64, f64)> = None; // (children entropy, threshold, left size)
        for i in 0..sorted.len() - 1 {
            let (value, label) = sorted[i];
            left[label] += 1.0;
            right[label] -= 1.0;
            if value >= sorted[i + 1].0 {
                continue;
            }
            let left_n = (i + 1) as f64;
            let right_n = n - left_n;
            if left_n < min_split || right_n < min_split {
                continue;
            }
            thresholds += 1;
            let children = left_n / n * entropy(&left) + right_n / n * entropy(&right);
            if best.is_none_or(|(e, _, _)| children < e) {
                best = Some((children, value, left_n));
            }
        }

        let (children_entropy, threshold, left_n) = best?;
        let penalty = (thresholds as f64).log2() / n;
        Some(Candidate {
            split: Split::Numeric {
                attribute,
                threshold,
            },
            gain: parent_entropy - children_entropy - penalty,
            split_info: entropy(&[left_n, n - left_n]),
        })
    }
}

impl Classifier for DecisionTree {
    fn name(&self) -> &'static str {
        "Decision Tree (C4.5)"
    }

    fn fit(&mut self, data: &EncodedDataset) -> Result<(), TrainingError> {
        if data.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }
        check_arity(data)?;
        self.num_classes = data.num_classes();
        if data.labels.iter().any(|l| *l >= self.num_classes) {
            return Err(TrainingError::Classifier("class index out of range".into()));
        }

        let arities: Vec<Option<usize>> = data
            .schema
            .attributes()
            .iter()
            .map(|a| match &a.kind {
                AttributeKind::Nominal(domain) => Some(domain.len()),
                AttributeKind::Numeric => None,
            })
            .collect();
        let idx: Vec<usize> = (0..data.len()).collect();
        let mut root = self.grow(data, &arities, &idx);
        if self.config.pruned {
            prune(&mut root, self.config.confidence);
        }
        self.root = Some(root);
        Ok(())
    }

    fn distribution(&self, row: &[f64]) -> Vec<f64> {
        match &self.root {
            Some(root) => normalize(root.leaf_counts(row).to_vec()),
            None => normalize(vec![0.0; self.num_classes]),
        }
    }
}

// ── Pruning ──

fn prune(node: &mut Node, confidence: f64) {
    match node {
        Node::Leaf { .. } => return,
        Node::Nominal { children, .. } => children.iter_mut().for_each(|c| prune(c, confidence)),
        Node::Numeric { le, gt, .. } => {
            prune(le, confidence);
            prune(gt, confidence);
        }
    }
    let as_leaf = leaf_error_estimate(node.counts(), confidence);
    let as_tree = subtree_error_estimate(node, confidence);
    if as_leaf <= as_tree + 0.1 {
        *node = Node::Leaf {
            counts: node.counts().to_vec(),
        };
    }
}

fn subtree_error_estimate(node: &Node, confidence: f64) -> f64 {
    match node {
        Node::Leaf { counts } => leaf_error_estimate(counts, confidence),
        Node::Nominal { children, .. } => children
            .iter()
            .map(|c| subtree_error_estimate(c, confidence))
            .sum(),
        Node::Numeric { le, gt, .. } => {
            subtree_error_estimate(le, confidence) + subtree_error_estimate(gt, confidence)
        }
    }
}

fn leaf_error_estimate(counts: &[f64], confidence: f64) -> f64 {
    let n = total(counts);
    let errors = n - counts.iter().copied().fold(0.0, f64::max);
    errors + extra_errors(n, errors, confidence)
}

/// Pessimistic additional errors for a leaf with `n` instances and `e`
/// observed errors: the upper confidence bound of the binomial error rate.
fn extra_errors(n: f64, e: f64, confidence: f64) -> f64 {
    if n <= 0.0 {
        return 0.0;
    }
    if e < 1.0 {
        let base = n * (1.0 - confidence.powf(1.0 / n));
        if e == 0.0 {
            return base;
        }
        return base + e * (extra_errors(n, 1.0, confidence) - base);
    }
    if e + 0.5 >= n {
        return (n - e).max(0.0);
    }
    let z = normal_upper_quantile(confidence);
    let f = (e + 0.5) / n;
    let z2 = z * z;
    let r = (f + z2 / (2.0 * n) + z * (f / n - f * f / n + z2 / (4.0 * n * n)).sqrt())
        / (1.0 + z2 / n);
    r * n - e
}

/// `z` with `P(Z > z) = p`, for `p` in (0, 1).
fn normal_upper_quantile(p: f64) -> f64 {
    Normal::standard().inverse_cdf(1.0 - p)
}

// ── Helpers ──

fn class_counts(data: &EncodedDataset, idx: &[usize], num_classes: usize) -> Vec<f64> {
    let mut counts = vec![0.0; num_classes];
    for &i in idx {
        counts[data.labels[i]] += 1.0;
    }
    counts
}

fn total(counts: &[f64]) -> f64 {
    counts.iter().sum()
}

/// Entropy in bits of a weight vector.
fn entropy(weights: &[f64]) -> f64 {
    let n = total(weights);
    if n <= 0.0 {
        return 0.0;
    }
    weights
        .iter()
        .filter(|w| **w > 0.0)
        .map(|w| {
            let p = w / n;
            -p * p.log2()
        })
        .sum()
}

fn value_index(value: f64) -> Option<usize> {
    (value >= 0.0 && value.fract() == 0.0).then_some(value as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{TrainingDataset, synthesize};
    use lexmatch_core::FeatureSchema;
    use std::sync::Arc;

    const EXPERIENCE: usize = 2;
    const HAS_CRIMINAL: usize = 4;

    fn schema() -> Arc<FeatureSchema> {
        Arc::new(FeatureSchema::lawyer_recommendation())
    }

    /// Rows that differ only in one column.
    fn single_feature(column: usize, values: &[(f64, usize)]) -> EncodedDataset {
        EncodedDataset {
            schema: schema(),
            rows: values
                .iter()
                .map(|(v, _)| {
                    let mut row = vec![0.0; 12];
                    row[column] = *v;
                    row
                })
                .collect(),
            labels: values.iter().map(|(_, l)| *l).collect(),
        }
    }

    fn row_with(column: usize, value: f64) -> Vec<f64> {
        let mut row = vec![0.0; 12];
        row[column] = value;
        row
    }

    #[test]
    fn numeric_threshold_separates_classes() {
        let values: Vec<(f64, usize)> = (0..20)
            .map(|y| (y as f64, if y >= 10 { 3 } else { 0 }))
            .collect();
        let data = single_feature(EXPERIENCE, &values);
        let mut tree = DecisionTree::new(TreeConfig::default());
        tree.fit(&data).unwrap();

        assert_eq!(tree.leaves(), 2);
        assert_eq!(tree.predict(&row_with(EXPERIENCE, 15.0)), 3);
        assert_eq!(tree.predict(&row_with(EXPERIENCE, 3.0)), 0);
        assert_eq!(tree.distribution(&row_with(EXPERIENCE, 15.0)), vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn nominal_split_on_flag() {
        // has_criminal: 0 = YES, 1 = NO.
        let values: Vec<(f64, usize)> = (0..12)
            .map(|i| if i % 2 == 0 { (0.0, 2) } else { (1.0, 1) })
            .collect();
        let data = single_feature(HAS_CRIMINAL, &values);
        let mut tree = DecisionTree::new(TreeConfig::default());
        tree.fit(&data).unwrap();

        assert_eq!(tree.predict(&row_with(HAS_CRIMINAL, 0.0)), 2);
        assert_eq!(tree.predict(&row_with(HAS_CRIMINAL, 1.0)), 1);
    }

    #[test]
    fn single_class_is_one_leaf() {
        let values: Vec<(f64, usize)> = (0..10).map(|y| (y as f64, 1)).collect();
        let mut tree = DecisionTree::new(TreeConfig::default());
        tree.fit(&single_feature(EXPERIENCE, &values)).unwrap();
        assert_eq!(tree.leaves(), 1);
        assert_eq!(tree.distribution(&row_with(EXPERIENCE, 100.0))[1], 1.0);
    }

    #[test]
    fn fits_oracle_labels_closely() {
        let dataset = TrainingDataset::with_examples(schema(), synthesize(300, 42));
        let data = dataset.encode().unwrap();
        let mut tree = DecisionTree::new(TreeConfig::default());
        tree.fit(&data).unwrap();

        let correct = data
            .rows
            .iter()
            .zip(&data.labels)
            .filter(|(row, label)| tree.predict(row) == **label)
            .count();
        let accuracy = correct as f64 / data.len() as f64;
        assert!(accuracy > 0.8, "training accuracy {accuracy}");
    }

    #[test]
    fn pruning_never_adds_leaves() {
        let dataset = TrainingDataset::with_examples(schema(), synthesize(300, 9));
        let data = dataset.encode().unwrap();

        let mut pruned = DecisionTree::new(TreeConfig::default());
        pruned.fit(&data).unwrap();
        let mut unpruned = DecisionTree::new(TreeConfig {
            pruned: false,
            ..Default::default()
        });
        unpruned.fit(&data).unwrap();

        assert!(pruned.leaves() <= unpruned.leaves());
    }

    #[test]
    fn distributions_sum_to_one() {
        let dataset = TrainingDataset::with_examples(schema(), synthesize(200, 5));
        let data = dataset.encode().unwrap();
        let mut tree = DecisionTree::new(TreeConfig::default());
        tree.fit(&data).unwrap();
        for row in &data.rows {
            let d = tree.distribution(row);
            assert_eq!(d.len(), 4);
            assert!((d.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn unfitted_is_uniform() {
        let tree = DecisionTree::new(TreeConfig::default());
        assert_eq!(tree.distribution(&[0.0; 12]), vec![0.25; 4]);
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let mut tree = DecisionTree::new(TreeConfig::default());
        let err = tree.fit(&single_feature(EXPERIENCE, &[])).unwrap_err();
        assert!(matches!(err, TrainingError::EmptyDataset));
    }

    #[test]
    fn wrong_row_width_is_rejected() {
        let data = EncodedDataset {
            schema: schema(),
            rows: vec![vec![0.0; 3]],
            labels: vec![0],
        };
        let mut tree = DecisionTree::new(TreeConfig::default());
        assert!(matches!(tree.fit(&data), Err(TrainingError::Schema(_))));
    }

    #[test]
    fn quantile_at_default_confidence() {
        assert!((normal_upper_quantile(0.25) - 0.674490).abs() < 1e-5);
        assert!((normal_upper_quantile(0.05) - 1.644854).abs() < 1e-5);
        assert!((normal_upper_quantile(0.01) - 2.326348).abs() < 1e-5);
    }

    #[test]
    fn extra_errors_for_pure_leaf() {
        // n * (1 - CF^(1/n)) with n = 6, CF = 0.25.
        assert!((extra_errors(6.0, 0.0, 0.25) - 1.2378).abs() < 1e-3);
        assert_eq!(extra_errors(0.0, 0.0, 0.25), 0.0);
    }

    #[test]
    fn entropy_bounds() {
        assert_eq!(entropy(&[5.0, 0.0]), 0.0);
        assert!((entropy(&[1.0, 1.0]) - 1.0).abs() < 1e-12);
        assert!((entropy(&[1.0, 1.0, 1.0, 1.0]) - 2.0).abs() < 1e-12);
    }
}
