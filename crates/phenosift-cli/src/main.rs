use anyhow::Result;
use clap::{Arg, ArgAction, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use phenosift_cli::pipeline::{run_cccv, run_cv, run_train, CccvTask, CvTask, TrainTask};
use phenosift_classifiers::models::factory::ClassifierRegistry;

fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    init_logging(matches.get_count("verbose"));

    let registry = ClassifierRegistry::builtin();
    match matches.subcommand() {
        Some(("train", sub_m)) => {
            let task = TrainTask::from_arguments(sub_m)?;
            match run_train(&task, &registry) {
                Ok(_) => Ok(()),
                Err(e) => {
                    log::error!("Training failed: {:#}", e);
                    std::process::exit(1)
                }
            }
        }
        Some(("cv", sub_m)) => {
            let task = CvTask::from_arguments(sub_m)?;
            match run_cv(&task, &registry) {
                Ok(_) => Ok(()),
                Err(e) => {
                    log::error!("Cross-validation failed: {:#}", e);
                    std::process::exit(1)
                }
            }
        }
        Some(("cccv", sub_m)) => {
            let task = CccvTask::from_arguments(sub_m)?;
            match run_cccv(&task, &registry) {
                Ok(_) => Ok(()),
                Err(e) => {
                    log::error!("Completeness/contamination analysis failed: {:#}", e);
                    std::process::exit(1)
                }
            }
        }
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn init_logging(verbosity: u8) {
    let default_filter = match verbosity {
        0 => "error,phenosift_cli=info,phenosift_classifiers=info",
        1 => "info,phenosift_cli=debug,phenosift_classifiers=debug",
        _ => "debug,phenosift_cli=trace,phenosift_classifiers=trace",
    };
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("PHENOSIFT_LOG", default_filter))
        .init();
}

fn build_cli() -> Command {
    Command::new("phenosift")
        .version(clap::crate_version!())
        .about("\u{1F9A0} phenosift - Genotype-based phenotype classification for microbial genomes")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase log verbosity (-v, -vv)")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(
            Command::new("train")
                .about("Train a classifier on a genotype/phenotype dataset and save it")
                .arg(model_type_arg())
                .arg(genotype_arg())
                .arg(phenotype_arg())
                .arg(
                    Arg::new("out")
                        .short('o')
                        .long("out")
                        .help("Path to write the trained classifier to")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("weights")
                        .short('w')
                        .long("weights")
                        .help("Also write ranked feature weights to <OUT>.rank")
                        .action(ArgAction::SetTrue),
                )
                .arg(n_features_arg())
                .arg(params_file_arg())
                .arg(param_arg()),
        )
        .subcommand(
            Command::new("cv")
                .about("Estimate classifier performance with replicated cross-validation")
                .arg(model_type_arg())
                .arg(genotype_arg())
                .arg(phenotype_arg())
                .arg(
                    Arg::new("folds")
                        .long("folds")
                        .help("Number of cross-validation folds")
                        .default_value("5")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("replicates")
                        .long("replicates")
                        .help("Number of cross-validation replicates")
                        .default_value("10")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(threads_arg())
                .arg(
                    Arg::new("groups")
                        .long("groups")
                        .help(
                            "Path to a taxonomic grouping file; folds become \
                             leave-one-group-out and the fold count is ignored",
                        )
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("rank")
                        .long("rank")
                        .help("Column of the grouping file to group by")
                        .requires("groups")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("optimize")
                        .long("optimize")
                        .help("Run a randomized parameter search before cross-validating")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("optimize_out")
                        .long("optimize-out")
                        .help("Path to write optimized parameters to (required with --optimize)")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("out")
                        .short('o')
                        .long("out")
                        .help("Path to write per-record misclassification rates to")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(n_features_arg())
                .arg(params_file_arg())
                .arg(param_arg()),
        )
        .subcommand(
            Command::new("cccv")
                .about(
                    "Estimate classifier robustness over a grid of simulated \
                     genome completeness and contamination levels",
                )
                .arg(model_type_arg())
                .arg(genotype_arg())
                .arg(phenotype_arg())
                .arg(
                    Arg::new("folds")
                        .long("folds")
                        .help("Number of cross-validation folds per grid point")
                        .default_value("5")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("replicates")
                        .long("replicates")
                        .help("Number of cross-validation replicates per grid point")
                        .default_value("10")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(threads_arg())
                .arg(
                    Arg::new("comple_steps")
                        .long("comple-steps")
                        .help("Comma-separated completeness levels to simulate")
                        .value_name("STEPS")
                        .value_delimiter(',')
                        .default_values(["0.0", "0.2", "0.4", "0.6", "0.8", "1.0"])
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("conta_steps")
                        .long("conta-steps")
                        .help("Comma-separated contamination levels to simulate")
                        .value_name("STEPS")
                        .value_delimiter(',')
                        .default_values(["0.0", "0.2", "0.4", "0.6", "0.8", "1.0"])
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("groups")
                        .long("groups")
                        .help("Not supported for this command; present for parity with cv")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath)
                        .hide(true),
                )
                .arg(
                    Arg::new("optimize")
                        .long("optimize")
                        .help("Not supported for this command; present for parity with cv")
                        .action(ArgAction::SetTrue)
                        .hide(true),
                )
                .arg(
                    Arg::new("out")
                        .short('o')
                        .long("out")
                        .help("Path to write the completeness/contamination grid to")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(n_features_arg())
                .arg(params_file_arg())
                .arg(param_arg()),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
}

fn model_type_arg() -> Arg {
    Arg::new("model_type")
        .short('m')
        .long("model-type")
        .help("Classifier family to use")
        .required(true)
        .value_parser(["svm", "xgb"])
        .value_hint(ValueHint::Other)
}

fn genotype_arg() -> Arg {
    Arg::new("genotype")
        .short('g')
        .long("genotype")
        .help("Path to the tab-separated genotype file")
        .required(true)
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath)
}

fn phenotype_arg() -> Arg {
    Arg::new("phenotype")
        .short('p')
        .long("phenotype")
        .help("Path to the tab-separated phenotype file")
        .required(true)
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath)
}

fn threads_arg() -> Arg {
    Arg::new("threads")
        .long("threads")
        .help("Number of worker threads; 0 uses all available cores")
        .default_value("1")
        .value_parser(clap::value_parser!(usize))
}

fn n_features_arg() -> Arg {
    Arg::new("n_features")
        .long("n-features")
        .help("Reduce the feature space to the top N features by univariate F-score")
        .value_name("N")
        .value_parser(clap::value_parser!(usize))
}

fn params_file_arg() -> Arg {
    Arg::new("params_file")
        .long("params-file")
        .help("JSON file with model parameters; overrides values given with --param")
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath)
}

fn param_arg() -> Arg {
    Arg::new("param")
        .long("param")
        .help("Model parameter as KEY=VALUE; may be given multiple times")
        .value_name("KEY=VALUE")
        .action(ArgAction::Append)
        .value_parser(clap::builder::NonEmptyStringValueParser::new())
}
