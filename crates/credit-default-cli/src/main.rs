use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use credit_default_cli::evaluate::{print_records, run_evaluation};
use credit_default_cli::train::input::TrainConfig;
use credit_default_cli::train::trainer;

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(
            env_logger::Env::default()
                .filter_or("CREDIT_DEFAULT_LOG", "error,credit_default=info"),
        )
        .init();

    let matches = Command::new("credit-default")
        .version(clap::crate_version!())
        .about("Credit-card default classifier: tune, train and evaluate")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("train")
                .about("Clean the data, grid-search the pipeline, write the model and the metrics report")
                .arg(
                    Arg::new("config")
                        .help("Path to training configuration file. Without one (and without --train_data) a template is printed.")
                        .required(false)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("train_data")
                        .short('d')
                        .long("train_data")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help("Path to training data (CSV). Overrides the configuration file.")
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("test_data")
                        .short('t')
                        .long("test_data")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help("Path to test data (CSV). Overrides the configuration file.")
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("model_file")
                        .short('o')
                        .long("model_file")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help("File the fitted model is written to.")
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("metrics_file")
                        .short('m')
                        .long("metrics_file")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help("File the JSON-lines metrics report is written to.")
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("n_splits")
                        .short('k')
                        .long("n_splits")
                        .value_parser(clap::value_parser!(usize))
                        .help("Number of stratified cross-validation folds."),
                )
                .arg(
                    Arg::new("scoring")
                        .long("scoring")
                        .value_parser(["balanced_accuracy", "accuracy", "precision", "recall", "f1"])
                        .help("Criterion maximised by the grid search."),
                )
                .arg(
                    Arg::new("sequential")
                        .long("sequential")
                        .help("Evaluate cross-validation folds one at a time.")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("evaluate")
                .about("Score a saved model on a labeled CSV file and print JSON-lines records")
                .arg(
                    Arg::new("model")
                        .help("Path to a model written by `train`")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("data")
                        .help("Path to the labeled CSV file")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("train", sub_m)) => handle_train(sub_m),
        Some(("evaluate", sub_m)) => handle_evaluate(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let config_path: Option<&PathBuf> = matches.get_one("config");
    if config_path.is_none() && matches.get_one::<String>("train_data").is_none() {
        eprintln!("[credit-default] No config provided; template configuration:");
        println!("{}", TrainConfig::template()?);
        return Ok(());
    }
    if let Some(path) = config_path {
        log::info!("[credit-default] Training from config: {:?}", path);
    }

    let config = TrainConfig::from_arguments(config_path, matches)?;
    match trainer::run_training(&config) {
        Ok(_) => Ok(()),
        Err(e) => {
            log::error!("Training failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_evaluate(matches: &ArgMatches) -> Result<()> {
    let (Some(model), Some(data)) = (
        matches.get_one::<PathBuf>("model"),
        matches.get_one::<PathBuf>("data"),
    ) else {
        unreachable!("model and data are required arguments");
    };
    log::info!("[credit-default] Evaluating {:?} on {:?}", model, data);

    match run_evaluation(model, data) {
        Ok(records) => print_records(std::io::stdout().lock(), &records),
        Err(e) => {
            log::error!("Evaluation failed: {:#}", e);
            std::process::exit(1)
        }
    }
}
