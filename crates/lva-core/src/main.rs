//! LVA - latent volume of activity
//!
//! Command-line driver: load a dataset, train a predictor, and either
//! evaluate it on a held-out split or predict a single user's activity.
//! Payloads go to stdout as JSON; logs and errors go to stderr.

use clap::{Args, Parser, Subcommand};
use lva_common::error::format_error_human;
use lva_common::{Error, StructuredError, TrainingExample};
use lva_config::{load_config, validate_config, LearnerKind, LoadedConfig, LvaConfig};
use lva_core::dataset::{load_dataset, load_query, Dataset};
use lva_core::evaluate::{evaluate, split_examples};
use lva_core::exit_codes::ExitCode;
use lva_core::logging::{event_names, generate_run_id, init_logging, LogConfig, LogFormat, LogLevel, Stage};
use lva_core::{build_predictor, LearnerSpec, Predictor};
use serde::Serialize;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Predict user activity volume from action timestamps
#[derive(Parser)]
#[command(name = "lva")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Config file (TOML or JSON)
    #[arg(long, global = true, env = "LVA_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, global = true, value_enum, env = "LVA_LOG")]
    log_level: Option<LogLevel>,

    /// Log format; jsonl also reports errors as JSON
    #[arg(long, global = true, value_enum, env = "LVA_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Seed every learner RNG and the train/test split
    #[arg(long, global = true)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Train on part of a dataset and score predictions on the rest
    Evaluate(EvaluateArgs),

    /// Train on a dataset and predict one user's action count
    Predict(PredictArgs),

    /// Configuration management
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
struct LearnerArgs {
    /// Predictor to train (simple, hmm, partition, linear, ensemble)
    #[arg(long)]
    learner: Option<LearnerKind>,

    /// Override the number of activity-rate clusters
    #[arg(long)]
    clusters: Option<usize>,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// Dataset: JSON array of training examples
    #[arg(long)]
    data: PathBuf,

    /// Fraction of examples held out for scoring
    #[arg(long, default_value_t = 0.2)]
    test_fraction: f64,

    #[command(flatten)]
    learner: LearnerArgs,
}

#[derive(Args, Debug)]
struct PredictArgs {
    /// Dataset: JSON array of training examples
    #[arg(long)]
    data: PathBuf,

    /// Query: JSON object with user_id and history
    #[arg(long)]
    user: PathBuf,

    /// Prediction window in seconds
    #[arg(long)]
    period: f64,

    #[command(flatten)]
    learner: LearnerArgs,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the resolved configuration
    Show,
    /// Validate the resolved configuration
    Validate,
}

#[derive(Serialize)]
struct PredictionOutput {
    run_id: String,
    learner: String,
    user_id: u64,
    period: f64,
    predicted: f64,
}

// ============================================================================
// Main entry point
// ============================================================================

fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::new(cli.global.log_level, cli.global.log_format);
    init_logging(&log_config);

    let run_id = generate_run_id();
    info!(
        event = event_names::RUN_STARTED,
        run_id = %run_id,
        stage = %Stage::Init,
        "lva started"
    );

    let exit_code = match &cli.command {
        Commands::Evaluate(args) => run_evaluate(&cli.global, &log_config, &run_id, args),
        Commands::Predict(args) => run_predict(&cli.global, &log_config, &run_id, args),
        Commands::Config(args) => run_config(&cli.global, &log_config, args),
    };

    info!(
        event = event_names::RUN_FINISHED,
        run_id = %run_id,
        exit_code = exit_code.as_i32(),
        "lva finished"
    );
    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Command implementations
// ============================================================================

fn run_evaluate(
    global: &GlobalOpts,
    log: &LogConfig,
    run_id: &str,
    args: &EvaluateArgs,
) -> ExitCode {
    let result = (|| -> Result<serde_json::Value, Error> {
        let config = resolve_config(global, &args.learner)?;
        let dataset = load_data(&args.data, &config)?;
        let (train, test) = split_examples(&dataset.examples, args.test_fraction, config.seed)?;

        let predictor = train_predictor(&config, &train)?;
        info!(
            stage = %Stage::Evaluate,
            learner = %predictor.name(),
            test = test.len(),
            "evaluating on held-out examples"
        );
        let report = evaluate(predictor.as_ref(), train.len(), &test);
        Ok(serde_json::json!({
            "run_id": run_id,
            "dropped": dataset.dropped,
            "report": report,
        }))
    })();
    emit(result, log)
}

fn run_predict(
    global: &GlobalOpts,
    log: &LogConfig,
    run_id: &str,
    args: &PredictArgs,
) -> ExitCode {
    let result = (|| -> Result<PredictionOutput, Error> {
        let config = resolve_config(global, &args.learner)?;
        let dataset = load_data(&args.data, &config)?;
        let query = load_query(&args.user)?;

        let predictor = train_predictor(&config, &dataset.examples)?;
        info!(
            stage = %Stage::Predict,
            user_id = %query.user_id,
            period = args.period,
            "predicting"
        );
        let predicted = predictor.predict(&query, args.period)?;
        Ok(PredictionOutput {
            run_id: run_id.to_string(),
            learner: predictor.name(),
            user_id: query.user_id.0,
            period: args.period,
            predicted,
        })
    })();
    emit(result, log)
}

fn run_config(global: &GlobalOpts, log: &LogConfig, args: &ConfigArgs) -> ExitCode {
    let loaded = match load(global) {
        Ok(loaded) => loaded,
        Err(e) => return report_error(&e, log),
    };
    let output = match args.command {
        ConfigCommands::Show => serde_json::json!({
            "source": loaded.source.to_string(),
            "path": loaded.path,
            "config": loaded.config,
        }),
        ConfigCommands::Validate => serde_json::json!({
            "valid": true,
            "source": loaded.source.to_string(),
            "path": loaded.path,
        }),
    };
    emit(Ok(output), log)
}

// ============================================================================
// Helpers
// ============================================================================

fn load(global: &GlobalOpts) -> Result<LoadedConfig, Error> {
    let loaded = load_config(global.config.as_deref()).map_err(|e| Error::Config(e.to_string()))?;
    if loaded.path.is_none() {
        info!(
            event = event_names::CONFIG_DEFAULT_USED,
            "no config file found, using built-in defaults"
        );
    } else {
        info!(
            event = event_names::CONFIG_LOADED,
            source = %loaded.source,
            "configuration resolved"
        );
    }
    Ok(loaded)
}

/// Loaded config with command-line overrides applied and re-validated.
fn resolve_config(global: &GlobalOpts, learner: &LearnerArgs) -> Result<LvaConfig, Error> {
    let mut config = load(global)?.config;
    if let Some(seed) = global.seed {
        config.seed = Some(seed);
    }
    if let Some(kind) = learner.learner {
        config.learner = kind;
    }
    if let Some(k) = learner.clusters {
        config.clustering.clusters = k;
    }
    validate_config(&config).map_err(|e| Error::Config(e.to_string()))?;
    Ok(config)
}

fn load_data(path: &Path, config: &LvaConfig) -> Result<Dataset, Error> {
    info!(stage = %Stage::Load, path = %path.display(), "loading dataset");
    load_dataset(path, config.data.min_actions)
}

fn train_predictor(
    config: &LvaConfig,
    examples: &[TrainingExample],
) -> Result<Box<dyn Predictor>, Error> {
    let spec = LearnerSpec::from_config(config.learner, config);
    let mut predictor = build_predictor(&spec)?;
    info!(
        stage = %Stage::Learn,
        learner = %predictor.name(),
        examples = examples.len(),
        "training"
    );
    predictor.learn(examples)?;
    Ok(predictor)
}

fn emit<T: Serialize>(result: Result<T, Error>, log: &LogConfig) -> ExitCode {
    match result {
        Ok(payload) => match serde_json::to_string_pretty(&payload) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::Ok
            }
            Err(e) => report_error(&Error::Json(e), log),
        },
        Err(e) => report_error(&e, log),
    }
}

fn report_error(err: &Error, log: &LogConfig) -> ExitCode {
    let exit_code = ExitCode::from(err);
    error!(
        event = event_names::INTERNAL_ERROR,
        code = err.code(),
        error = %err,
        "command failed"
    );
    if log.structured_errors() {
        let structured = StructuredError::from(err)
            .with_context("exit_code", exit_code.as_i32())
            .with_context("exit_name", exit_code.code_name());
        eprintln!("{}", structured.to_json());
    } else {
        eprintln!("{}", format_error_human(err, std::io::stderr().is_terminal()));
    }
    exit_code
}
