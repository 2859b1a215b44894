//! CLI entry point for the ranked nearest-neighbor imputer.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use polars::io::csv::read::{CsvReadOptions, NullValues};
use polars::prelude::*;
use rknn_imputer::{
    DataMatrix, EstimatorKind, FailurePolicy, ImputationReport, ImputerConfig, RankKnnImputer,
    ZeroDistancePolicy,
};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// CLI-compatible estimator enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliEstimator {
    /// MultiSURF relevance filter (adaptive neighborhoods)
    Multisurf,
    /// ReliefF relevance filter (fixed neighbor count)
    Relieff,
    /// Random forest impurity importances
    RandomForest,
}

/// CLI-compatible zero distance policy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliZeroDistance {
    /// Floor distances before inverting them
    Cap,
    /// Use only donors identical to the row
    ExactMatches,
    /// Fail on identical donors
    Reject,
}

impl From<CliZeroDistance> for ZeroDistancePolicy {
    fn from(cli: CliZeroDistance) -> Self {
        match cli {
            CliZeroDistance::Cap => ZeroDistancePolicy::Cap,
            CliZeroDistance::ExactMatches => ZeroDistancePolicy::ExactMatches,
            CliZeroDistance::Reject => ZeroDistancePolicy::Reject,
        }
    }
}

/// CLI-compatible estimator failure policy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliFailurePolicy {
    /// Stop on the first estimator failure
    Abort,
    /// Leave affected cells missing
    Skip,
    /// Fill affected cells with the complete-case mean
    Mean,
}

impl From<CliFailurePolicy> for FailurePolicy {
    fn from(cli: CliFailurePolicy) -> Self {
        match cli {
            CliFailurePolicy::Abort => FailurePolicy::Abort,
            CliFailurePolicy::Skip => FailurePolicy::Skip,
            CliFailurePolicy::Mean => FailurePolicy::CompleteCaseMean,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Ranked nearest-neighbor imputation for numeric CSV data",
    long_about = "Fills missing values by ranking predictor columns with an importance \
                  estimator, trimming them at the elbow, and averaging the closest \
                  complete rows.\n\n\
                  EXAMPLES:\n  \
                  # Automatic neighbor count, '?' as missing marker\n  \
                  rknn-imputer -i data.csv\n\n  \
                  # Hot-deck imputation with ReliefF\n  \
                  rknn-imputer -i data.csv --k 1 --estimator relieff\n\n  \
                  # Only check that the file has something to impute\n  \
                  rknn-imputer -i data.csv --check"
)]
struct Args {
    /// Path to the CSV file to impute
    #[arg(short, long)]
    input: String,

    /// Output CSV path
    ///
    /// If not specified, writes ./outputs/<input_name>_imputed.csv
    #[arg(short, long)]
    output: Option<String>,

    /// Fixed number of donors per missing cell
    ///
    /// If not specified, the count is chosen per cell with the elbow method
    #[arg(long)]
    k: Option<usize>,

    /// Importance estimator used to rank predictors
    #[arg(long, value_enum)]
    estimator: Option<CliEstimator>,

    /// Neighbors per instance for ReliefF
    #[arg(long, default_value = "10")]
    relief_neighbors: usize,

    /// Number of trees for the random forest estimator
    #[arg(long, default_value = "100")]
    trees: usize,

    /// Random seed for the random forest estimator
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Cell text treated as missing (repeatable)
    #[arg(long = "missing-marker", default_value = "?")]
    missing_markers: Vec<String>,

    /// Handling of donors identical to the row under automatic k
    #[arg(long, value_enum)]
    zero_distance: Option<CliZeroDistance>,

    /// Handling of estimator failures
    #[arg(long, value_enum)]
    on_failure: Option<CliFailurePolicy>,

    /// JSON configuration file; command line flags override its values
    #[arg(long)]
    config: Option<String>,

    /// Only check that the input has missing values, then exit
    #[arg(long)]
    check: bool,

    /// Output the JSON report to stdout instead of a human-readable summary
    ///
    /// Disables all logs; useful for piping: `... --json | jq .missing_cells`
    #[arg(long)]
    json: bool,

    /// Write the JSON report next to the output file
    ///
    /// The report will be saved as <input_name>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and final result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    let config = build_config(&args)?;
    debug!("Configuration: {:?}", config);
    let imputer = RankKnnImputer::new(config)?;

    info!("Loading dataset from: {}", args.input);
    let data = load_csv(&args.input, &args.missing_markers)?;
    info!("Dataset loaded successfully: {:?}", data.shape());

    let matrix = DataMatrix::from_dataframe(&data)?;
    imputer.validate(&matrix)?;

    if args.check {
        println!(
            "{}: {} missing cells in {} rows x {} columns",
            args.input,
            matrix.missing_count(),
            matrix.n_rows(),
            matrix.n_cols()
        );
        return Ok(());
    }

    let outcome = imputer.impute_with_report(&matrix)?;
    if outcome.matrix.has_missing() {
        warn!(
            "{} cells could not be imputed and are written as empty",
            outcome.report.unfilled()
        );
    }

    let output_path = resolve_output_path(&args);
    let mut imputed = outcome.matrix.to_dataframe()?;
    write_csv(&mut imputed, &output_path)?;
    info!("Imputed dataset saved: {}", output_path.display());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.report)?);
        return Ok(());
    }

    if args.emit_report {
        let report_path = output_path
            .with_file_name(format!("{}_report.json", extract_file_stem(&args.input)));
        let file = File::create(&report_path)
            .with_context(|| format!("Failed to create {}", report_path.display()))?;
        serde_json::to_writer_pretty(file, &outcome.report)?;
        info!("Report written to: {}", report_path.display());
    }

    print_human_readable_summary(&outcome.report, &args, &output_path);

    Ok(())
}

/// Merge the optional JSON config file with command line overrides.
fn build_config(args: &Args) -> Result<ImputerConfig> {
    let mut config = match args.config {
        Some(ref path) => ImputerConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path))?,
        None => ImputerConfig::default(),
    };

    if args.k.is_some() {
        config.k = args.k;
    }

    if let Some(estimator) = args.estimator {
        config.estimator = match estimator {
            CliEstimator::Multisurf => EstimatorKind::MultiSurf,
            CliEstimator::Relieff => EstimatorKind::ReliefF {
                n_neighbors: args.relief_neighbors,
            },
            CliEstimator::RandomForest => EstimatorKind::RandomForest {
                n_estimators: args.trees,
                max_depth: None,
                min_samples_leaf: 1,
                max_features: None,
                seed: args.seed,
            },
        };
    }

    if let Some(policy) = args.zero_distance {
        config.zero_distance_policy = policy.into();
    }

    if let Some(policy) = args.on_failure {
        config.on_estimator_failure = policy.into();
    }

    config.validate()?;
    Ok(config)
}

/// Load a CSV file, reading every missing marker as null.
fn load_csv(path: &str, markers: &[String]) -> Result<DataFrame> {
    let null_values = NullValues::AllColumns(markers.iter().map(|m| m.as_str().into()).collect());

    CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(
            CsvParseOptions::default()
                .with_quote_char(Some(b'"'))
                .with_null_values(Some(null_values)),
        )
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
        .map_err(|e| anyhow!("Failed to read {}: {}", path, e))
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
        info!("Created output directory: {}", parent.display());
    }

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(df)?;
    Ok(())
}

fn resolve_output_path(args: &Args) -> PathBuf {
    match args.output {
        Some(ref output) => PathBuf::from(output),
        None => PathBuf::from("./outputs")
            .join(format!("{}_imputed.csv", extract_file_stem(&args.input))),
    }
}

/// Extract the file stem (name without extension) from a path.
fn extract_file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}

/// Print a human-readable summary of the imputation run.
fn print_human_readable_summary(report: &ImputationReport, args: &Args, output_path: &Path) {
    println!();
    println!("{}", "=".repeat(80));
    println!("IMPUTATION COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows x {} columns)",
        args.input, report.rows, report.columns
    );
    println!("Output: {}", output_path.display());
    println!();

    println!("Imputation Summary:");
    println!("  Duration: {}ms", report.duration_ms);
    println!("  Complete rows (donors): {}", report.complete_rows);
    println!(
        "  Missing cells: {} ({} by ranked neighbors, {} by complete-case mean, {} left empty)",
        report.missing_cells,
        report.neighbor_imputations(),
        report.fallback_imputations(),
        report.unfilled()
    );
    println!("  Re-ranked cells: {}", report.reranked());
    println!(
        "  Estimator fits: {} ({} served from cache)",
        report.estimator_fits, report.ranking_cache_hits
    );
    println!();

    if !report.column_reports.is_empty() {
        println!("{:<24} {:<10} Base predictors", "Column", "Missing");
        println!("{}", "-".repeat(60));
        for column in &report.column_reports {
            println!(
                "{:<24} {:<10} {:?}",
                truncate_str(&column.name, 23),
                column.missing_count,
                column.base_predictors
            );
        }
        println!();
    }

    if !report.failures.is_empty() {
        println!("Warnings:");
        for failure in report.failures.iter().take(10) {
            println!(
                "  ! row {} column {}: {}",
                failure.row, failure.column, failure.reason
            );
        }
        if report.failures.len() > 10 {
            println!("  ... and {} more", report.failures.len() - 10);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("Use --emit-report to save detailed JSON report");
    println!("{}", "=".repeat(80));
}

/// Truncate a string to max length with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
