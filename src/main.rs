use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use calluna_vita::{
    evaluate, vita_selection, FeatureTable, ModelConfig, Outcome, Task, VitaConfig,
};

#[derive(Parser)]
#[command(name = "calluna")]
#[command(about = "Holdout-based variable selection and evaluation for random forests")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Shared forest tuning parameters.
#[derive(Args, Debug, Clone)]
struct ModelArgs {
    /// Number of trees per forest
    #[arg(long, default_value_t = 500)]
    trees: usize,

    /// Fraction of variables tried at each split
    #[arg(long, default_value_t = 0.2)]
    mtry_prop: f64,

    /// Minimum node size as a fraction of the sample count
    #[arg(long, default_value_t = 0.1)]
    min_node_prop: f64,

    /// Model task: "classification", "regression", or "probability"
    #[arg(long, default_value = "classification")]
    task: String,
}

#[derive(Subcommand)]
enum Command {
    /// Select informative variables via holdout permutation importance
    Select {
        /// Path to the input CSV file (header row required)
        #[arg(long)]
        data: PathBuf,

        /// Name of the outcome column
        #[arg(long)]
        outcome: String,

        /// P-value threshold for selection
        #[arg(long, default_value_t = 0.05)]
        threshold: f64,

        /// Confidence level for importance intervals
        #[arg(long, default_value_t = 0.95)]
        conf_level: f64,

        /// Write the per-variable report as TSV to this path
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Train on one dataset and score predictions on another
    Evaluate {
        /// Path to the training CSV file
        #[arg(long)]
        train: PathBuf,

        /// Path to the test CSV file
        #[arg(long)]
        test: PathBuf,

        /// Name of the outcome column
        #[arg(long)]
        outcome: String,

        /// Write a confusion-matrix plot as PNG to this path
        #[arg(long)]
        plot: Option<PathBuf>,

        /// Plot title
        #[arg(long)]
        title: Option<String>,

        #[command(flatten)]
        model: ModelArgs,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct SelectOutput {
    n_rows: usize,
    n_variables: usize,
    n_selected: usize,
    selected: Vec<String>,
}

#[derive(Serialize)]
struct EvaluateOutput {
    n_train: usize,
    n_test: usize,
    accuracy: f64,
    kappa: f64,
    levels: Vec<String>,
    counts: Vec<Vec<usize>>,
}

fn parse_task(s: &str) -> Result<Task> {
    match s {
        "classification" => Ok(Task::Classification),
        "regression" => Ok(Task::Regression),
        "probability" => Ok(Task::Probability),
        other => anyhow::bail!(
            "unknown task: {other} (expected classification, regression, or probability)"
        ),
    }
}

/// Parse a CSV file into a feature table plus the named outcome column.
///
/// Cells that fail to parse as numbers (including empty and "NA") become
/// NaN and surface later as missing-value errors with row and column info.
fn read_dataset(path: &Path, outcome: &str) -> Result<(FeatureTable, Outcome)> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .context("failed to read CSV header")?
        .iter()
        .map(str::to_string)
        .collect();
    let outcome_idx = headers
        .iter()
        .position(|h| h == outcome)
        .with_context(|| format!("outcome column '{outcome}' not found"))?;
    let names: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != outcome_idx)
        .map(|(_, h)| h.clone())
        .collect();

    let mut rows = Vec::new();
    let mut raw_outcome = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("failed to read CSV row {row_idx}"))?;
        let mut row = Vec::with_capacity(names.len());
        for (col_idx, cell) in record.iter().enumerate() {
            if col_idx == outcome_idx {
                raw_outcome.push(cell.to_string());
            } else {
                row.push(cell.trim().parse::<f64>().unwrap_or(f64::NAN));
            }
        }
        rows.push(row);
    }

    let table = FeatureTable::new(names, rows).context("inconsistent CSV row widths")?;
    let numeric: Option<Vec<f64>> = raw_outcome
        .iter()
        .map(|s| s.trim().parse::<f64>().ok())
        .collect();
    let outcome = match numeric {
        Some(values) => Outcome::Numeric(values),
        None => Outcome::Categorical(raw_outcome),
    };
    Ok((table, outcome))
}

fn write_report(path: &Path, report: &calluna_vita::SelectionReport) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record(["variable", "importance", "ci_lower", "ci_upper", "pvalue", "selected"])?;
    for v in report.variables() {
        writer.write_record([
            v.name.clone(),
            format!("{:.6}", v.importance),
            format!("{:.6}", v.ci_lower),
            format!("{:.6}", v.ci_upper),
            format!("{:.6}", v.pvalue),
            v.selected.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn build_model(args: &ModelArgs, seed: u64) -> Result<ModelConfig> {
    Ok(ModelConfig::new()
        .with_n_trees(args.trees)
        .with_mtry_prop(args.mtry_prop)
        .with_min_node_prop(args.min_node_prop)
        .with_task(parse_task(&args.task)?)
        .with_seed(seed))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Select {
            data,
            outcome,
            threshold,
            conf_level,
            output,
            model,
        } => {
            let (x, y) = read_dataset(&data, &outcome)?;
            info!(n_rows = x.n_rows(), n_cols = x.n_cols(), "dataset loaded");

            let config = VitaConfig::new(build_model(&model, cli.seed)?)
                .with_p_threshold(threshold)
                .with_conf_level(conf_level);
            let report = vita_selection(&config, &x, &y).context("variable selection failed")?;

            if let Some(path) = output {
                write_report(&path, &report)?;
                info!(path = %path.display(), "report written");
            }

            let selected = report.selected_names();
            let summary = SelectOutput {
                n_rows: x.n_rows(),
                n_variables: report.variables().len(),
                n_selected: selected.len(),
                selected,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Evaluate {
            train,
            test,
            outcome,
            plot,
            title,
            model,
        } => {
            let (x_train, y_train) = read_dataset(&train, &outcome)?;
            info!(n_rows = x_train.n_rows(), "training data loaded");
            let (x_test, y_test) = read_dataset(&test, &outcome)?;
            info!(n_rows = x_test.n_rows(), "test data loaded");

            let fitted = build_model(&model, cli.seed)?
                .train(&x_train, &y_train)
                .context("model training failed")?;
            let evaluation =
                evaluate(&fitted, &x_test, &y_test).context("evaluation failed")?;

            if let Some(path) = plot {
                evaluation
                    .plot(title.as_deref())
                    .save_png(&path, (800, 600))
                    .context("failed to write confusion plot")?;
                info!(path = %path.display(), "confusion plot written");
            }

            let table = evaluation.table();
            let summary = EvaluateOutput {
                n_train: x_train.n_rows(),
                n_test: x_test.n_rows(),
                accuracy: evaluation.accuracy(),
                kappa: evaluation.kappa(),
                levels: table.levels().to_vec(),
                counts: table.as_rows().to_vec(),
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
