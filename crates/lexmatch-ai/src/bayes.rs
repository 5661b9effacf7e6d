//! Naive Bayes with Laplace-smoothed nominal likelihoods and Gaussian
//! numeric likelihoods.

use lexmatch_core::{AttributeKind, SuitabilityLabel};
use statrs::distribution::{Continuous, Normal};

use crate::TrainingError;
use crate::classifier::{Classifier, check_arity, normalize};
use crate::dataset::EncodedDataset;

#[derive(Debug, Clone)]
enum Likelihood {
    /// `[class][value]` log-probabilities.
    Nominal(Vec<Vec<f64>>),
    /// One normal per class.
    Gaussian(Vec<Normal>),
}

#[derive(Debug, Clone)]
pub struct NaiveBayes {
    num_classes: usize,
    log_priors: Vec<f64>,
    likelihoods: Vec<Likelihood>,
}

impl NaiveBayes {
    pub fn new() -> Self {
        Self {
            num_classes: SuitabilityLabel::ALL.len(),
            log_priors: Vec::new(),
            likelihoods: Vec::new(),
        }
    }
}

impl Default for NaiveBayes {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for NaiveBayes {
    fn name(&self) -> &'static str {
        "Naive Bayes"
    }

    fn fit(&mut self, data: &EncodedDataset) -> Result<(), TrainingError> {
        if data.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }
        check_arity(data)?;
        let k = data.num_classes();
        if data.labels.iter().any(|l| *l >= k) {
            return Err(TrainingError::Classifier("class index out of range".into()));
        }

        let mut class_sizes = vec![0.0; k];
        for &l in &data.labels {
            class_sizes[l] += 1.0;
        }
        let n = data.len() as f64;
        let log_priors: Vec<f64> = class_sizes
            .iter()
            .map(|c| ((c + 1.0) / (n + k as f64)).ln())
            .collect();

        let likelihoods: Vec<Likelihood> = data
            .schema
            .attributes()
            .iter()
            .enumerate()
            .map(|(col, attr)| match &attr.kind {
                AttributeKind::Nominal(domain) => {
                    Ok(nominal_likelihood(data, col, domain.len(), &class_sizes))
                }
                AttributeKind::Numeric => gaussian_likelihood(data, col, &class_sizes),
            })
            .collect::<Result<_, _>>()?;

        self.num_classes = k;
        self.log_priors = log_priors;
        self.likelihoods = likelihoods;
        Ok(())
    }

    fn distribution(&self, row: &[f64]) -> Vec<f64> {
        if self.log_priors.is_empty() {
            return normalize(vec![0.0; self.num_classes]);
        }
        let mut scores = self.log_priors.clone();
        for (likelihood, &x) in self.likelihoods.iter().zip(row) {
            match likelihood {
                Likelihood::Nominal(table) => {
                    let v = x as usize;
                    if x < 0.0 || v >= table[0].len() {
                        continue;
                    }
                    for (c, s) in scores.iter_mut().enumerate() {
                        *s += table[c][v];
                    }
                }
                Likelihood::Gaussian(normals) => {
                    for (s, normal) in scores.iter_mut().zip(normals) {
                        *s += normal.ln_pdf(x);
                    }
                }
            }
        }

        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        normalize(scores.into_iter().map(|s| (s - max).exp()).collect())
    }
}

fn nominal_likelihood(
    data: &EncodedDataset,
    col: usize,
    arity: usize,
    class_sizes: &[f64],
) -> Likelihood {
    let mut counts = vec![vec![0.0; arity]; class_sizes.len()];
    for (row, &label) in data.rows.iter().zip(&data.labels) {
        let v = row[col] as usize;
        if row[col] >= 0.0 && v < arity {
            counts[label][v] += 1.0;
        }
    }
    let table = counts
        .into_iter()
        .zip(class_sizes)
        .map(|(values, size)| {
            values
                .into_iter()
                .map(|c| ((c + 1.0) / (size + arity as f64)).ln())
                .collect()
        })
        .collect();
    Likelihood::Nominal(table)
}

/// Per-class mean and deviation. The deviation is floored at a sixth of the
/// attribute's average gap between distinct values, so a class whose values
/// are all equal does not collapse to a point mass.
fn gaussian_likelihood(
    data: &EncodedDataset,
    col: usize,
    class_sizes: &[f64],
) -> Result<Likelihood, TrainingError> {
    let floor = precision(data.rows.iter().map(|r| r[col])) / 6.0;

    let mut sums = vec![0.0; class_sizes.len()];
    for (row, &label) in data.rows.iter().zip(&data.labels) {
        sums[label] += row[col];
    }
    let means: Vec<f64> = sums
        .iter()
        .zip(class_sizes)
        .map(|(s, n)| if *n > 0.0 { s / n } else { 0.0 })
        .collect();

    let mut squares = vec![0.0; class_sizes.len()];
    for (row, &label) in data.rows.iter().zip(&data.labels) {
        let d = row[col] - means[label];
        squares[label] += d * d;
    }
    let normals: Vec<Normal> = means
        .into_iter()
        .zip(squares)
        .zip(class_sizes)
        .map(|((mean, sq), n)| {
            let sd = if *n > 1.0 { (sq / (n - 1.0)).sqrt() } else { 0.0 };
            Normal::new(mean, sd.max(floor)).map_err(|e| {
                let name = &data.schema.attributes()[col].name;
                TrainingError::Classifier(format!("gaussian for '{name}': {e}"))
            })
        })
        .collect::<Result<_, _>>()?;
    Ok(Likelihood::Gaussian(normals))
}

/// Average gap between adjacent distinct values; `1.0` with fewer than two.
fn precision(values: impl Iterator<Item = f64>) -> f64 {
    let mut sorted: Vec<f64> = values.collect();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    if sorted.len() < 2 {
        return 1.0;
    }
    let span = sorted[sorted.len() - 1] - sorted[0];
    span / (sorted.len() - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{TrainingDataset, synthesize};
    use lexmatch_core::FeatureSchema;
    use std::sync::Arc;

    fn schema() -> Arc<FeatureSchema> {
        Arc::new(FeatureSchema::lawyer_recommendation())
    }

    fn row(years: f64, has_criminal: f64) -> Vec<f64> {
        let mut r = vec![0.0; 12];
        r[2] = years;
        r[4] = has_criminal;
        r
    }

    #[test]
    fn separates_on_numeric_and_nominal() {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for y in 0..10 {
            rows.push(row(y as f64, 1.0));
            labels.push(0);
            rows.push(row(15.0 + y as f64, 0.0));
            labels.push(3);
        }
        let data = EncodedDataset {
            schema: schema(),
            rows,
            labels,
        };
        let mut nb = NaiveBayes::new();
        nb.fit(&data).unwrap();

        assert_eq!(nb.predict(&row(20.0, 0.0)), 3);
        assert_eq!(nb.predict(&row(2.0, 1.0)), 0);
        let d = nb.distribution(&row(20.0, 0.0));
        assert_eq!(d.len(), 4);
        assert!(d[3] > 0.99);
    }

    #[test]
    fn constant_attribute_does_not_blow_up() {
        let data = EncodedDataset {
            schema: schema(),
            rows: vec![row(5.0, 0.0); 4],
            labels: vec![1, 1, 2, 2],
        };
        let mut nb = NaiveBayes::new();
        nb.fit(&data).unwrap();
        let d = nb.distribution(&row(50.0, 0.0));
        assert!(d.iter().all(|p| p.is_finite()));
        assert!((d.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn reasonable_on_oracle_labels() {
        let dataset = TrainingDataset::with_examples(schema(), synthesize(300, 42));
        let data = dataset.encode().unwrap();
        let mut nb = NaiveBayes::new();
        nb.fit(&data).unwrap();
        let correct = data
            .rows
            .iter()
            .zip(&data.labels)
            .filter(|(r, l)| nb.predict(r) == **l)
            .count();
        assert!(correct as f64 / data.len() as f64 > 0.5);
    }

    #[test]
    fn unfitted_is_uniform() {
        assert_eq!(NaiveBayes::new().distribution(&[0.0; 12]), vec![0.25; 4]);
    }

    #[test]
    fn non_finite_numeric_is_a_training_error() {
        let data = EncodedDataset {
            schema: schema(),
            rows: vec![row(f64::NAN, 0.0), row(3.0, 1.0)],
            labels: vec![0, 0],
        };
        let err = NaiveBayes::new().fit(&data).unwrap_err();
        assert!(matches!(err, TrainingError::Classifier(_)));
    }

    #[test]
    fn precision_is_average_gap() {
        assert_eq!(precision([1.0, 3.0, 5.0, 5.0].into_iter()), 2.0);
        assert_eq!(precision([4.0].into_iter()), 1.0);
    }
}
