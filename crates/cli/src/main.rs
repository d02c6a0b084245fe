use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use data_loader::{DataError, DataIndex, MovieId, UserId};
use predictor::{
    EngineConfig, EvaluationReport, Evaluator, MissingUserPolicy, PredictError, Prediction,
    PredictionEngine,
};
use sources::RuleMetric;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info};

/// Rating Predictor - MovieLens rating prediction engine
#[derive(Parser)]
#[command(name = "rating-predictor")]
#[command(about = "Predict MovieLens ratings from averages, genre clusters and association rules", long_about = None)]
struct Cli {
    /// Directory holding the MovieLens releases (one subdirectory each)
    #[arg(short, long, default_value = "data/raw")]
    data_dir: PathBuf,

    /// JSON file with engine settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,

    #[command(subcommand)]
    command: Commands,
}

/// Command-line overrides for the engine settings
#[derive(Args)]
struct ConfigOverrides {
    /// Weight of the movie average in the baseline
    #[arg(long, global = true)]
    alpha: Option<f64>,

    /// Weight of the rule prediction against the baseline
    #[arg(long, global = true)]
    beta: Option<f64>,

    /// Weight of the cluster-neighborhood average
    #[arg(long, global = true)]
    gamma: Option<f64>,

    /// Rule metric: confidence, support, lift, antecedent-support, consequent-support
    #[arg(long, global = true)]
    metric: Option<String>,

    /// Baseline for users without ratings: renormalize or zero-contribution
    #[arg(long, global = true)]
    missing_user_policy: Option<String>,

    /// Keep cluster memberships between predictions
    #[arg(long, global = true)]
    memoize: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict how a user would rate a movie, holding out their own rating
    Predict {
        /// Dataset name, e.g. ml-latest-small
        dataset: String,

        user_id: UserId,

        movie_id: MovieId,

        /// Show every signal behind the prediction
        #[arg(long)]
        explain: bool,
    },

    /// Hold out a random sample of ratings and score the predictions
    Evaluate {
        /// Dataset name, e.g. ml-latest-small
        dataset: String,

        /// Number of ratings to hold out
        sample_size: usize,

        /// Seed for the sample
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match data_error(&e) {
                Some(data_error) => error!("{}", data_error),
                None => error!("{:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = build_config(cli.config.as_deref(), &cli.overrides)?;

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Predict {
            dataset,
            user_id,
            movie_id,
            explain,
        } => handle_predict(&cli.data_dir, &dataset, config, user_id, movie_id, explain),
        Commands::Evaluate {
            dataset,
            sample_size,
            seed,
            json,
        } => handle_evaluate(&cli.data_dir, &dataset, config, sample_size, seed, json),
    }
}

/// Config file (or defaults) with command-line overrides applied
fn build_config(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };

    if let Some(alpha) = overrides.alpha {
        config = config.with_alpha(alpha);
    }
    if let Some(beta) = overrides.beta {
        config = config.with_beta(beta);
    }
    if let Some(gamma) = overrides.gamma {
        config = config.with_gamma(gamma);
    }
    if let Some(metric) = &overrides.metric {
        config = config.with_metric(metric.parse::<RuleMetric>()?);
    }
    if let Some(policy) = &overrides.missing_user_policy {
        config = config.with_missing_user_policy(policy.parse::<MissingUserPolicy>()?);
    }
    if overrides.memoize {
        config = config.with_memoize(true);
    }

    config.validate()?;
    Ok(config)
}

/// Load a dataset by name and wrap it in an engine
fn load_engine(data_dir: &Path, dataset: &str, config: EngineConfig) -> Result<PredictionEngine> {
    println!("Loading {} from {}...", dataset, data_dir.display());
    let start = Instant::now();
    let index = DataIndex::load_dataset(data_dir, dataset)
        .with_context(|| format!("Failed to load MovieLens dataset '{}'", dataset))?;
    let (users, movies, ratings) = index.counts();
    println!(
        "{} Loaded {} users, {} movies, {} ratings in {:?}",
        "✓".green(),
        users,
        movies,
        ratings,
        start.elapsed()
    );

    Ok(PredictionEngine::new(index, config)?)
}

/// Handle the 'predict' command
fn handle_predict(
    data_dir: &Path,
    dataset: &str,
    config: EngineConfig,
    user_id: UserId,
    movie_id: MovieId,
    explain: bool,
) -> Result<()> {
    let mut engine = load_engine(data_dir, dataset, config)?;

    // The user's own rating must not inform the prediction
    engine.delete_rating(user_id, movie_id)?;

    let prediction = engine.predict_detailed(user_id, movie_id)?;
    let title = engine.data_index().movie_by_id(movie_id)?.title.clone();
    info!(user_id, movie_id, value = prediction.value, "Predicted rating");

    print_prediction(&title, &prediction, explain);
    Ok(())
}

/// Handle the 'evaluate' command
fn handle_evaluate(
    data_dir: &Path,
    dataset: &str,
    config: EngineConfig,
    sample_size: usize,
    seed: u64,
    json: bool,
) -> Result<()> {
    let mut engine = load_engine(data_dir, dataset, config)?;

    let start = Instant::now();
    let report = Evaluator::new()
        .with_seed(seed)
        .run(&mut engine, sample_size)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
        println!("Evaluated in {:?}", start.elapsed());
    }
    Ok(())
}

/// Store lookup error behind `error`, if that is what stopped the run
fn data_error(error: &anyhow::Error) -> Option<&DataError> {
    error.chain().find_map(|cause| {
        cause
            .downcast_ref::<DataError>()
            .or_else(|| match cause.downcast_ref::<PredictError>() {
                Some(PredictError::Data(inner)) => Some(inner),
                _ => None,
            })
    })
}

/// Helper function to format and print a prediction
fn print_prediction(title: &str, prediction: &Prediction, explain: bool) {
    println!("{}", "Predicted Rating:".bold().blue());
    println!(
        "User {} / {}: {} (raw {:.4})",
        prediction.user_id,
        title,
        format!("{:.1}", prediction.rounded).green().bold(),
        prediction.value
    );

    if explain {
        let optional = |value: Option<f64>| match value {
            Some(value) => format!("{:.4}", value),
            None => "n/a".dimmed().to_string(),
        };
        println!("{}Movie average: {:.4}", "• ".cyan(), prediction.movie_average);
        println!("{}User average: {}", "• ".cyan(), optional(prediction.user_average));
        println!("{}Baseline: {:.4}", "• ".cyan(), prediction.baseline);
        println!(
            "{}Rule prediction: {} ({} relevant rules)",
            "• ".cyan(),
            optional(prediction.rule_prediction),
            prediction.relevant_rules
        );
        println!(
            "{}Neighborhood average: {}",
            "• ".cyan(),
            optional(prediction.neighborhood_average)
        );
    }
}

/// Helper function to format and print an evaluation report
fn print_report(report: &EvaluationReport) {
    let normalized = |value: Option<f64>| match value {
        Some(value) => format!(" (standardized: {:.4})", value),
        None => String::new(),
    };

    println!(
        "{}",
        format!("Evaluation on {} held-out ratings:", report.sample_size)
            .bold()
            .blue()
    );
    println!(
        "Model MSE:    {:.4}{}",
        report.mse_model,
        normalized(report.normalized_model)
    );
    println!(
        "Baseline MSE: {:.4}{}",
        report.mse_baseline,
        normalized(report.normalized_baseline)
    );
}
