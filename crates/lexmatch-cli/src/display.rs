//! Terminal rendering for recommendations, model status, and evaluations.

use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use lexmatch_ai::{Evaluation, ModelInfo, TrainingDataset};
use lexmatch_core::{CaseFeatures, RecommendationResult, SuitabilityLabel};

const JUSTIFICATION_WIDTH: usize = 72;

// ── Public API ──

/// Print a ranked recommendation list for `case`.
pub fn print_recommendations(case: &CaseFeatures, results: &[RecommendationResult]) {
    println!(
        "=== {} case, {} urgency ===",
        case.case_type.display_name(),
        case.urgency.as_str()
    );
    if results.is_empty() {
        println!("  No verified lawyers available.");
        return;
    }
    println!();
    for r in results {
        println!("  #{:<3} lawyer {:<8} {:>6.2}", r.rank, r.lawyer_id, r.match_score);
        for line in wrap(&r.justification, JUSTIFICATION_WIDTH) {
            println!("        {line}");
        }
    }
}

/// Print model status as a key/value card with a health line first.
pub fn print_model_info(info: &ModelInfo, ready: bool) {
    println!("Status");
    println!("  {:<20} {}", "ready", if ready { "yes" } else { "no" });
    println!("Model");
    println!("  {:<20} {}", "classifier", info.classifier_type);
    println!("  {:<20} {}", "training_set_size", info.training_set_size);
    println!("  {:<20} {}", "last_trained_at", info.last_trained_label());
    println!("  {:<20} {}", "accuracy", percent(info.accuracy));
}

/// Print a cross-validation summary with its confusion matrix.
pub fn print_evaluation(evaluation: &Evaluation, class_names: &[String]) {
    println!("Cross-validation");
    println!("  {:<20} {}", "folds", evaluation.folds);
    println!("  {:<20} {}", "instances", evaluation.instances);
    println!("  {:<20} {}", "correct", evaluation.correct);
    println!("  {:<20} {}", "accuracy", percent(evaluation.accuracy));
    println!();
    println!("Confusion matrix (rows = actual, columns = predicted)");
    for line in confusion_lines(&evaluation.confusion, class_names) {
        println!("  {line}");
    }
}

/// Print label composition and the first `preview` rows of a dataset batch.
pub fn print_dataset_summary(
    dataset: &TrainingDataset,
    batch: &RecordBatch,
    preview: usize,
) -> anyhow::Result<()> {
    println!("Dataset");
    println!("  {:<20} {}", "relation", dataset.schema().relation());
    println!("  {:<20} {}", "instances", dataset.len());
    let counts = dataset.label_counts();
    for label in SuitabilityLabel::ALL {
        println!("  {:<20} {}", label.as_str(), counts[label.index()]);
    }
    if preview > 0 && batch.num_rows() > 0 {
        let head = batch.slice(0, preview.min(batch.num_rows()));
        println!();
        println!("{}", pretty_format_batches(&[head])?);
    }
    Ok(())
}

// ── Helpers ──

fn percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

fn confusion_lines(confusion: &[Vec<usize>], class_names: &[String]) -> Vec<String> {
    let width = class_names
        .iter()
        .map(|n| n.len())
        .chain(confusion.iter().flatten().map(|c| c.to_string().len()))
        .max()
        .unwrap_or(1);
    let name = |i: usize| class_names.get(i).map(String::as_str).unwrap_or("?");

    let mut lines = Vec::with_capacity(confusion.len() + 1);
    let header: Vec<String> = (0..confusion.len())
        .map(|i| format!("{:>width$}", name(i)))
        .collect();
    lines.push(format!("{:<width$} {}", "", header.join(" ")));
    for (i, row) in confusion.iter().enumerate() {
        let cells: Vec<String> = row.iter().map(|c| format!("{c:>width$}")).collect();
        lines.push(format!("{:<width$} {}", name(i), cells.join(" ")));
    }
    lines
}

/// Greedy word wrap; a word longer than `width` gets its own line.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
