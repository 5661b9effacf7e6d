//! Training datasets: labeled examples from case history, synthetic
//! augmentation for sparse history, and Arrow interop.
//!
//! Every label, real or synthetic, comes from [`assess`].

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, Float64Array, StringArray};
use arrow::datatypes::{Float64Type, Schema};
use arrow::record_batch::RecordBatch;
use lexmatch_core::{
    AttributeKind, CaseFeatures, CaseHistory, CaseType, FeatureSchema, LawyerFeatures,
    RecommenderConfig, SchemaError, SchemaRef, SourceError, SuitabilityLabel, UrgencyLevel,
    assess,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

/// Arrow schema metadata key holding the relation name.
pub const RELATION_METADATA_KEY: &str = "lexmatch.relation";

/// One labeled (case, lawyer) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    pub case: CaseFeatures,
    pub lawyer: LawyerFeatures,
    pub label: SuitabilityLabel,
}

impl TrainingExample {
    /// Label the pair with the suitability oracle.
    pub fn labeled(case: CaseFeatures, lawyer: LawyerFeatures) -> Self {
        let label = assess(&case, &lawyer);
        Self {
            case,
            lawyer,
            label,
        }
    }

    pub fn efficiency(&self) -> f64 {
        self.lawyer.efficiency()
    }

    pub fn specialization_count(&self) -> usize {
        self.lawyer.specialization_count()
    }
}

/// Ordered examples sharing one feature schema.
#[derive(Debug, Clone)]
pub struct TrainingDataset {
    schema: SchemaRef,
    examples: Vec<TrainingExample>,
}

impl TrainingDataset {
    pub fn new(schema: SchemaRef) -> Self {
        Self {
            schema,
            examples: Vec::new(),
        }
    }

    pub fn with_examples(schema: SchemaRef, examples: Vec<TrainingExample>) -> Self {
        Self { schema, examples }
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn examples(&self) -> &[TrainingExample] {
        &self.examples
    }

    pub fn push(&mut self, example: TrainingExample) {
        self.examples.push(example);
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Example count per label, in label order.
    pub fn label_counts(&self) -> [usize; 4] {
        let mut counts = [0; 4];
        for ex in &self.examples {
            counts[ex.label.index()] += 1;
        }
        counts
    }

    /// Encode every example against this dataset's schema.
    pub fn encode(&self) -> Result<EncodedDataset, SchemaError> {
        let mut rows = Vec::with_capacity(self.examples.len());
        let mut labels = Vec::with_capacity(self.examples.len());
        for ex in &self.examples {
            rows.push(self.schema.encode(&ex.case, &ex.lawyer)?);
            labels.push(self.schema.encode_label(ex.label)?);
        }
        Ok(EncodedDataset {
            schema: Arc::clone(&self.schema),
            rows,
            labels,
        })
    }

    /// One column per schema attribute plus the class column. Nominal values
    /// are written as their domain strings.
    pub fn to_record_batch(&self) -> Result<RecordBatch, SchemaError> {
        let encoded = self.encode()?;
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(self.schema.num_attributes() + 1);

        for (col, attr) in self.schema.attributes().iter().enumerate() {
            let values = encoded.rows.iter().map(|row| row[col]);
            let array: ArrayRef = match &attr.kind {
                AttributeKind::Nominal(domain) => Arc::new(StringArray::from(
                    values
                        .map(|v| domain[v as usize].as_str())
                        .collect::<Vec<_>>(),
                )),
                AttributeKind::Numeric => Arc::new(Float64Array::from(values.collect::<Vec<_>>())),
            };
            columns.push(array);
        }
        columns.push(Arc::new(StringArray::from(
            self.examples
                .iter()
                .map(|ex| ex.label.as_str())
                .collect::<Vec<_>>(),
        )));

        let schema = self.schema.to_arrow().with_metadata(HashMap::from([(
            RELATION_METADATA_KEY.to_string(),
            self.schema.relation().to_string(),
        )]));
        RecordBatch::try_new(Arc::new(schema), columns).map_err(|e| SchemaError::Arrow(e.to_string()))
    }

    /// Rebuild a dataset from batches written by [`Self::to_record_batch`].
    ///
    /// The feature schema is taken from the first batch, so a file written
    /// under a different domain order keeps that order. Derived attributes
    /// (efficiency, specialization count) are recomputed.
    pub fn from_record_batches(batches: &[RecordBatch]) -> Result<Self, SchemaError> {
        let first = batches
            .first()
            .ok_or_else(|| SchemaError::Arrow("no record batches".into()))?;
        let arrow_schema = first.schema();
        let relation = arrow_schema
            .metadata()
            .get(RELATION_METADATA_KEY)
            .map(String::as_str)
            .unwrap_or("LawyerRecommendation");
        let schema = Arc::new(FeatureSchema::from_arrow(relation, &arrow_schema)?);

        let mut examples = Vec::new();
        for batch in batches {
            check_same_schema(&arrow_schema, &batch.schema())?;
            for row in 0..batch.num_rows() {
                examples.push(example_at(&schema, batch, row)?);
            }
        }
        debug!(count = examples.len(), "decoded dataset from arrow");
        Ok(Self { schema, examples })
    }
}

fn check_same_schema(expected: &Schema, actual: &Schema) -> Result<(), SchemaError> {
    if expected.fields() != actual.fields() {
        return Err(SchemaError::Arrow("record batches have differing schemas".into()));
    }
    Ok(())
}

fn example_at(
    schema: &FeatureSchema,
    batch: &RecordBatch,
    row: usize,
) -> Result<TrainingExample, SchemaError> {
    let mut case = CaseFeatures::default();
    let mut lawyer = LawyerFeatures {
        verified: true,
        ..Default::default()
    };

    for (col, attr) in schema.attributes().iter().enumerate() {
        let column = batch.column(col);
        match &attr.kind {
            AttributeKind::Nominal(_) => {
                let v = string_at(column, &attr.name, row)?;
                attr.index_of(v)?;
                match attr.name.as_str() {
                    "case_type" => {
                        case.case_type = CaseType::parse(v).ok_or_else(|| unknown(&attr.name, v))?;
                    }
                    "urgency" => {
                        case.urgency = UrgencyLevel::parse(v).ok_or_else(|| unknown(&attr.name, v))?;
                    }
                    name => {
                        if let Some(suffix) = name.strip_prefix("has_") {
                            let t = CaseType::parse(suffix).ok_or_else(|| unknown(name, suffix))?;
                            if v == "YES" {
                                lawyer.specializations.insert(t);
                            }
                        }
                    }
                }
            }
            AttributeKind::Numeric => {
                let v = float_at(column, &attr.name, row)?;
                match attr.name.as_str() {
                    "experience_years" => lawyer.experience_years = count_value(&attr.name, v)?,
                    "cases_handled" => lawyer.cases_handled = count_value(&attr.name, v)?,
                    // Derived attributes are recomputed from the decoded features.
                    _ => {}
                }
            }
        }
    }

    let class = schema.class_attribute();
    let raw = string_at(batch.column(schema.num_attributes()), &class.name, row)?;
    class.index_of(raw)?;
    let label = SuitabilityLabel::parse(raw).ok_or_else(|| unknown(&class.name, raw))?;

    Ok(TrainingExample { case, lawyer, label })
}

fn unknown(attribute: &str, value: &str) -> SchemaError {
    SchemaError::UnknownValue {
        attribute: attribute.to_string(),
        value: value.to_string(),
    }
}

/// A non-negative whole number that fits a `u32`.
fn count_value(attribute: &str, v: f64) -> Result<u32, SchemaError> {
    if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= f64::from(u32::MAX) {
        Ok(v as u32)
    } else {
        Err(unknown(attribute, &v.to_string()))
    }
}

fn string_at<'a>(col: &'a ArrayRef, name: &str, row: usize) -> Result<&'a str, SchemaError> {
    let arr = col
        .as_string_opt::<i32>()
        .ok_or_else(|| SchemaError::Arrow(format!("column '{name}' is not utf8")))?;
    if arr.is_null(row) {
        return Err(SchemaError::Arrow(format!("null '{name}' at row {row}")));
    }
    Ok(arr.value(row))
}

fn float_at(col: &ArrayRef, name: &str, row: usize) -> Result<f64, SchemaError> {
    let arr = col
        .as_primitive_opt::<Float64Type>()
        .ok_or_else(|| SchemaError::Arrow(format!("column '{name}' is not float64")))?;
    if arr.is_null(row) {
        return Err(SchemaError::Arrow(format!("null '{name}' at row {row}")));
    }
    Ok(arr.value(row))
}

/// A dataset in numeric form: one row per example, class indices alongside.
#[derive(Debug, Clone)]
pub struct EncodedDataset {
    pub schema: SchemaRef,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<usize>,
}

impl EncodedDataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn num_classes(&self) -> usize {
        self.schema.num_classes()
    }

    /// Rows at `indices`, in that order.
    pub fn subset(&self, indices: &[usize]) -> EncodedDataset {
        EncodedDataset {
            schema: Arc::clone(&self.schema),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

// ── Builder ──

/// Assembles a [`TrainingDataset`] from case history, adding synthetic
/// examples when history is sparse.
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    schema: SchemaRef,
    sparse_threshold: usize,
    synthetic_count: usize,
    seed: u64,
}

impl DatasetBuilder {
    pub fn new(schema: SchemaRef, sparse_threshold: usize, synthetic_count: usize, seed: u64) -> Self {
        Self {
            schema,
            sparse_threshold,
            synthetic_count,
            seed,
        }
    }

    pub fn from_config(config: &RecommenderConfig) -> Self {
        Self::new(
            Arc::new(FeatureSchema::lawyer_recommendation()),
            config.sparse_threshold,
            config.synthetic_count,
            config.synthetic_seed,
        )
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Label every closed, assigned case and top up with synthetic examples
    /// when fewer than `sparse_threshold` were found.
    pub fn build(&self, history: &dyn CaseHistory) -> Result<TrainingDataset, SourceError> {
        let pairs = history.find_closed_cases_with_assigned_lawyer()?;
        let mut dataset = TrainingDataset::new(Arc::clone(&self.schema));
        for (case, lawyer) in &pairs {
            dataset.push(TrainingExample::labeled(
                CaseFeatures::from(case),
                LawyerFeatures::from(lawyer),
            ));
        }
        let real = dataset.len();

        let mut synthetic = 0;
        if real < self.sparse_threshold && self.synthetic_count > 0 {
            for example in synthesize(self.synthetic_count, self.seed) {
                dataset.push(example);
            }
            synthetic = self.synthetic_count;
        }

        info!(real, synthetic, total = dataset.len(), "built training dataset");
        Ok(dataset)
    }
}

/// Generate `count` labeled examples from a seeded RNG.
///
/// Case type is uniform; urgency is LOW 30% / MEDIUM 50% / HIGH 20%;
/// experience ~ N(8, 5) truncated and clipped to [1, 25]; cases handled is
/// experience × N(6, 4), at least 1. Each specialization is held with
/// probability 0.90 for the case's own type, 0.40 for a related type, and
/// 0.15 otherwise.
pub fn synthesize(count: usize, seed: u64) -> Vec<TrainingExample> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|_| synthetic_example(&mut rng)).collect()
}

fn synthetic_example(rng: &mut StdRng) -> TrainingExample {
    let case_type = CaseType::ALL[rng.gen_range(0..CaseType::ALL.len())];
    let urgency = match rng.r#gen::<f64>() {
        r if r < 0.3 => UrgencyLevel::Low,
        r if r < 0.8 => UrgencyLevel::Medium,
        _ => UrgencyLevel::High,
    };

    let years = ((gaussian(rng) * 5.0 + 8.0) as i64).clamp(1, 25);
    let cases = ((years as f64 * (6.0 + gaussian(rng) * 4.0)) as i64).max(1);

    let specializations = CaseType::ALL.into_iter().filter(|&t| {
        let p = if t == case_type {
            0.90
        } else if case_type.is_related_to(t) {
            0.40
        } else {
            0.15
        };
        rng.r#gen::<f64>() < p
    });
    let lawyer = LawyerFeatures::new(
        years as u32,
        u32::try_from(cases).unwrap_or(u32::MAX),
        specializations.collect::<Vec<_>>(),
        true,
    );

    TrainingExample::labeled(CaseFeatures::new(case_type, urgency), lawyer)
}

/// Standard normal sample (Box-Muller).
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.r#gen::<f64>();
    let u2: f64 = rng.r#gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
