mod display;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use lexmatch_ai::{RecommendationService, TrainingDataset, spawn_retrain_loop};
use lexmatch_core::{
    CaseFeatures, CaseHistory, CaseType, LawyerDirectory, RecommenderConfig, UrgencyLevel,
};
use lexmatch_store::{MemoryStore, read_parquet, write_parquet};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "lexmatch", version, about = "Rank lawyers for a legal case")]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,

    /// JSON config file; `LEXMATCH_*` variables override it.
    #[arg(long, global = true, env = "LEXMATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct SourceArgs {
    /// JSON fixture with `lawyers` and `cases`.
    #[arg(long, global = true, env = "LEXMATCH_DATA")]
    data: Option<PathBuf>,

    /// DuckDB database file (requires the `duckdb` feature).
    #[arg(long, global = true, env = "LEXMATCH_DUCKDB", conflicts_with = "data")]
    duckdb: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Train a model and report its cross-validated accuracy.
    Train,
    /// Train, then rank every verified lawyer for a case.
    Recommend {
        /// Case type, e.g. CRIMINAL or "Real Estate".
        #[arg(long)]
        case_type: String,
        /// LOW, MEDIUM or HIGH.
        #[arg(long, default_value = "MEDIUM")]
        urgency: String,
        /// Override the configured result count.
        #[arg(long)]
        top: Option<usize>,
    },
    /// Report model status. With `--train`, train first.
    ModelInfo {
        #[arg(long)]
        train: bool,
    },
    /// Build the training dataset and write it as Parquet.
    ExportDataset {
        output: PathBuf,
        /// Rows to preview after writing.
        #[arg(long, default_value_t = 5)]
        preview: usize,
    },
    /// Cross-validate on a Parquet dataset, or on a freshly built one.
    Evaluate { input: Option<PathBuf> },
    /// Train, then retrain on a fixed interval until interrupted.
    Watch {
        #[arg(
            long,
            default_value_t = 3600,
            env = "LEXMATCH_RETRAIN_SECS",
            value_parser = clap::value_parser!(u64).range(1..)
        )]
        interval_secs: u64,
    },
}

type Sources = (Arc<dyn CaseHistory>, Arc<dyn LawyerDirectory>);

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let cli = Cli::parse();
    info!("lexmatch v{}", env!("CARGO_PKG_VERSION"));

    let mut config = RecommenderConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Command::Recommend { top: Some(top), .. } = &cli.command {
        anyhow::ensure!(*top > 0, "--top must be positive");
        config.top_n = *top;
    }

    let (history, directory) = open_sources(&cli.source)?;
    let service = Arc::new(RecommendationService::new(history, directory, &config));

    match cli.command {
        Command::Train => {
            service.train_model().context("training model")?;
            report_model(&service, cli.json)
        }
        Command::Recommend {
            case_type, urgency, ..
        } => {
            let case = parse_case(&case_type, &urgency);
            service.train_model().context("training model")?;
            let results = service.recommend(&case).context("ranking lawyers")?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                display::print_recommendations(&case, &results);
            }
            Ok(())
        }
        Command::ModelInfo { train } => {
            if train {
                service.train_model().context("training model")?;
            }
            report_model(&service, cli.json)
        }
        Command::ExportDataset { output, preview } => {
            let dataset = service.build_dataset().context("building dataset")?;
            let batch = dataset.to_record_batch().context("encoding dataset")?;
            write_parquet(&output, std::slice::from_ref(&batch))
                .with_context(|| format!("writing {}", output.display()))?;
            eprintln!("  Wrote {} rows to {}", batch.num_rows(), output.display());
            display::print_dataset_summary(&dataset, &batch, preview)
        }
        Command::Evaluate { input } => {
            let dataset = match input {
                Some(path) => load_dataset(&path)?,
                None => service.build_dataset().context("building dataset")?,
            };
            let evaluation = service
                .trainer()
                .evaluate(&dataset)
                .context("cross-validating")?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&evaluation)?);
            } else {
                let classes = dataset
                    .schema()
                    .class_attribute()
                    .domain()
                    .unwrap_or_default()
                    .to_vec();
                display::print_evaluation(&evaluation, &classes);
            }
            Ok(())
        }
        Command::Watch { interval_secs } => {
            let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
            runtime.block_on(watch(service, Duration::from_secs(interval_secs)))
        }
    }
}

fn open_sources(args: &SourceArgs) -> anyhow::Result<Sources> {
    if let Some(path) = &args.duckdb {
        return open_duckdb(path);
    }
    let store = match &args.data {
        Some(path) => MemoryStore::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => {
            info!("no data source given, training on synthetic examples only");
            MemoryStore::default()
        }
    };
    let store = Arc::new(store);
    let history: Arc<dyn CaseHistory> = store.clone();
    let directory: Arc<dyn LawyerDirectory> = store;
    Ok((history, directory))
}

#[cfg(feature = "duckdb")]
fn open_duckdb(path: &Path) -> anyhow::Result<Sources> {
    let store = lexmatch_store::DuckStore::open_persistent(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let store = Arc::new(store);
    let history: Arc<dyn CaseHistory> = store.clone();
    let directory: Arc<dyn LawyerDirectory> = store;
    Ok((history, directory))
}

#[cfg(not(feature = "duckdb"))]
fn open_duckdb(path: &Path) -> anyhow::Result<Sources> {
    anyhow::bail!(
        "cannot open {}: lexmatch was built without the `duckdb` feature",
        path.display()
    )
}

fn load_dataset(path: &Path) -> anyhow::Result<TrainingDataset> {
    let batches = read_parquet(path).with_context(|| format!("reading {}", path.display()))?;
    let dataset = TrainingDataset::from_record_batches(&batches)
        .with_context(|| format!("decoding dataset from {}", path.display()))?;
    eprintln!("  Read {} rows from {}", dataset.len(), path.display());
    Ok(dataset)
}

/// Unrecognized values fall back to CIVIL / MEDIUM, with a warning.
fn parse_case(case_type: &str, urgency: &str) -> CaseFeatures {
    if CaseType::parse(case_type).is_none() {
        warn!(value = case_type, "unrecognized case type, using CIVIL");
    }
    if UrgencyLevel::parse(urgency).is_none() {
        warn!(value = urgency, "unrecognized urgency, using MEDIUM");
    }
    CaseFeatures::from_raw(Some(case_type), Some(urgency))
}

fn report_model(service: &RecommendationService, json: bool) -> anyhow::Result<()> {
    let info = service.model_info();
    let ready = service.is_ready();
    if json {
        let body = serde_json::json!({
            "ready": ready,
            "classifier_type": info.classifier_type,
            "training_set_size": info.training_set_size,
            "last_trained_at": info.last_trained_label(),
            "accuracy": info.accuracy,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        display::print_model_info(&info, ready);
    }
    Ok(())
}

async fn watch(service: Arc<RecommendationService>, period: Duration) -> anyhow::Result<()> {
    let svc = Arc::clone(&service);
    match tokio::task::spawn_blocking(move || svc.train_model())
        .await
        .context("initial training task")?
    {
        Ok(info) => info!(
            instances = info.training_set_size,
            accuracy = info.accuracy,
            "initial model installed"
        ),
        Err(e) => warn!(error = %e, "initial training failed, waiting for next run"),
    }

    let handle = spawn_retrain_loop(service, period);
    info!(interval_secs = period.as_secs(), "retraining on interval, ctrl-c to stop");
    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    handle.abort();
    info!("stopped");
    Ok(())
}
