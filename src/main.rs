//! Command-line entry point
//!
//! ```text
//! nutrition-eval assemble --results results --metadata dish_metadata.csv --output nutrition_evaluation.csv
//! nutrition-eval metrics --input nutrition_evaluation.csv --output metrics_analysis.csv
//! nutrition-eval run --results results --metadata dish_metadata.csv --output-dir output
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use nutrition_eval::config::stat_tests_path;
use nutrition_eval::{
    build_dataset, compare_conditions, compute_metrics, run_pipeline, split_metrics_table,
    summarize_conditions, AggregationPolicy, EvaluationConfig, JoinMode, PipelinePaths,
    WideTable,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "nutrition-eval", version, about = "Evaluate nutrition estimates against dish metadata")]
struct Cli {
    /// JSON configuration file; unspecified fields keep their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Candidate aggregation policy
    #[arg(long, global = true, value_enum)]
    policy: Option<PolicyArg>,

    /// Keep dishes missing from any source, with null cells
    #[arg(long, global = true)]
    lossless: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    ThresholdSum,
    MaxConfidence,
}

#[derive(Subcommand)]
enum Command {
    /// Join metadata and stored responses into the wide table
    Assemble {
        #[arg(long)]
        results: PathBuf,
        #[arg(long)]
        metadata: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Compute error metrics from a wide table
    Metrics {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Run statistical tests from a wide table, one file per nutrient
    Stats {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output_dir: PathBuf,
    },
    /// Mean prediction per condition
    Summary {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Split a metrics table into per-metric and per-nutrient tables
    Split {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        metrics_dir: PathBuf,
        #[arg(long)]
        nutrients_dir: PathBuf,
    },
    /// Run every stage
    Run {
        #[arg(long)]
        results: PathBuf,
        #[arg(long)]
        metadata: PathBuf,
        #[arg(long)]
        output_dir: PathBuf,
    },
}

fn load_config(cli: &Cli) -> Result<EvaluationConfig, nutrition_eval::EvaluationError> {
    let mut config = match &cli.config {
        Some(path) => EvaluationConfig::from_json_file(path)?,
        None => EvaluationConfig::default(),
    };
    if let Some(policy) = cli.policy {
        config.aggregation_policy = match policy {
            PolicyArg::ThresholdSum => AggregationPolicy::ThresholdSum,
            PolicyArg::MaxConfidence => AggregationPolicy::MaxConfidencePerItem,
        };
    }
    if cli.lossless {
        config.join_mode = JoinMode::Lossless;
    }
    config.validate()?;
    Ok(config)
}

fn read_table(path: &Path) -> Result<WideTable, nutrition_eval::EvaluationError> {
    if !path.exists() {
        return Err(nutrition_eval::EvaluationError::MissingFile(path.to_path_buf()));
    }
    WideTable::read_path(path)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = load_config(&cli)?;

    match &cli.command {
        Command::Assemble {
            results,
            metadata,
            output,
        } => {
            let (table, summary) = build_dataset(results, metadata, &config)?;
            table.write_path(output)?;
            println!(
                "{} dishes, {} responses read, {} missing, {} malformed",
                table.len(),
                summary.files_read,
                summary.missing,
                summary.malformed
            );
        }
        Command::Metrics { input, output } => {
            let table = read_table(input)?;
            compute_metrics(&table, &config).write_path(output)?;
        }
        Command::Stats { input, output_dir } => {
            let table = read_table(input)?;
            for &nutrient in &config.nutrients {
                compare_conditions(&table, nutrient, &config)
                    .write_path(&stat_tests_path(output_dir, nutrient))?;
            }
        }
        Command::Summary { input, output } => {
            let table = read_table(input)?;
            summarize_conditions(&table, &config).write_path(output)?;
        }
        Command::Split {
            input,
            metrics_dir,
            nutrients_dir,
        } => {
            let written = split_metrics_table(input, metrics_dir, nutrients_dir, &config)?;
            println!("{} tables written", written.len());
        }
        Command::Run {
            results,
            metadata,
            output_dir,
        } => {
            let paths = PipelinePaths {
                results_root: results.clone(),
                metadata_csv: metadata.clone(),
                output_dir: output_dir.clone(),
            };
            let report = run_pipeline(&paths, &config)?;
            println!(
                "{} dishes evaluated, {} files written to {}",
                report.dishes,
                report.outputs.len(),
                output_dir.display()
            );
        }
    }

    Ok(())
}
