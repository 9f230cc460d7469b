//! Command-line argument collection for the pipeline tasks.
//!
//! The task structs in this module are plain data: they hold everything a
//! `run_*` function needs, already validated, so the orchestration code never
//! touches `clap` directly.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use serde_json::Value;

use phenosift_classifiers::config::ParamMap;

/// Errors raised while validating a task before any file is touched.
#[derive(Debug)]
pub enum TaskError {
    /// `--optimize` was given without a path to write the winning parameters.
    MissingOptimizeOut,
    /// Grouped cross-validation was requested for a command that cannot use it.
    GroupsNotSupported,
    /// Parameter optimization was requested for a command that cannot use it.
    OptimizeNotSupported,
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskError::MissingOptimizeOut => write!(
                f,
                "parameter optimization requires a path to save the optimized parameters to"
            ),
            TaskError::GroupsNotSupported => write!(
                f,
                "grouped cross-validation is not supported in completeness/contamination analysis"
            ),
            TaskError::OptimizeNotSupported => write!(
                f,
                "parameter optimization is not supported in completeness/contamination analysis"
            ),
        }
    }
}

impl std::error::Error for TaskError {}

/// Everything the `train` command needs.
#[derive(Debug, Clone)]
pub struct TrainTask {
    pub model_type: String,
    pub genotype: PathBuf,
    pub phenotype: PathBuf,
    pub out: PathBuf,
    pub weights: bool,
    pub n_features: Option<usize>,
    pub params_file: Option<PathBuf>,
    pub params: ParamMap,
}

impl TrainTask {
    pub fn from_arguments(matches: &ArgMatches) -> Result<Self> {
        Ok(TrainTask {
            model_type: required_string(matches, "model_type")?,
            genotype: required_path(matches, "genotype")?,
            phenotype: required_path(matches, "phenotype")?,
            out: required_path(matches, "out")?,
            weights: matches.get_flag("weights"),
            n_features: matches.get_one::<usize>("n_features").copied(),
            params_file: matches.get_one::<PathBuf>("params_file").cloned(),
            params: collect_params(matches)?,
        })
    }
}

/// Everything the `cv` command needs.
#[derive(Debug, Clone)]
pub struct CvTask {
    pub model_type: String,
    pub genotype: PathBuf,
    pub phenotype: PathBuf,
    pub folds: usize,
    pub replicates: usize,
    pub threads: usize,
    pub groups: Option<PathBuf>,
    pub rank: Option<String>,
    /// Destination for optimized parameters when a search was requested.
    pub optimize: Option<PathBuf>,
    pub out: Option<PathBuf>,
    pub n_features: Option<usize>,
    pub params_file: Option<PathBuf>,
    pub params: ParamMap,
}

impl CvTask {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        model_type: String,
        genotype: PathBuf,
        phenotype: PathBuf,
        folds: usize,
        replicates: usize,
        threads: usize,
        groups: Option<PathBuf>,
        rank: Option<String>,
        optimize: bool,
        optimize_out: Option<PathBuf>,
        out: Option<PathBuf>,
        n_features: Option<usize>,
        params_file: Option<PathBuf>,
        params: ParamMap,
    ) -> Result<Self, TaskError> {
        let optimize = match (optimize, optimize_out) {
            (true, Some(path)) => Some(path),
            (true, None) => return Err(TaskError::MissingOptimizeOut),
            (false, _) => None,
        };
        Ok(CvTask {
            model_type,
            genotype,
            phenotype,
            folds,
            replicates,
            threads,
            groups,
            rank,
            optimize,
            out,
            n_features,
            params_file,
            params,
        })
    }

    pub fn from_arguments(matches: &ArgMatches) -> Result<Self> {
        Ok(CvTask::new(
            required_string(matches, "model_type")?,
            required_path(matches, "genotype")?,
            required_path(matches, "phenotype")?,
            matches.get_one::<usize>("folds").copied().unwrap_or(5),
            matches.get_one::<usize>("replicates").copied().unwrap_or(10),
            matches.get_one::<usize>("threads").copied().unwrap_or(1),
            matches.get_one::<PathBuf>("groups").cloned(),
            matches.get_one::<String>("rank").cloned(),
            matches.get_flag("optimize"),
            matches.get_one::<PathBuf>("optimize_out").cloned(),
            matches.get_one::<PathBuf>("out").cloned(),
            matches.get_one::<usize>("n_features").copied(),
            matches.get_one::<PathBuf>("params_file").cloned(),
            collect_params(matches)?,
        )?)
    }
}

/// Everything the `cccv` command needs.
#[derive(Debug, Clone)]
pub struct CccvTask {
    pub model_type: String,
    pub genotype: PathBuf,
    pub phenotype: PathBuf,
    pub folds: usize,
    pub replicates: usize,
    pub threads: usize,
    pub comple_steps: Vec<f64>,
    pub conta_steps: Vec<f64>,
    pub out: PathBuf,
    pub n_features: Option<usize>,
    pub params_file: Option<PathBuf>,
    pub params: ParamMap,
}

impl CccvTask {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        model_type: String,
        genotype: PathBuf,
        phenotype: PathBuf,
        folds: usize,
        replicates: usize,
        threads: usize,
        groups: Option<PathBuf>,
        optimize: bool,
        comple_steps: Vec<f64>,
        conta_steps: Vec<f64>,
        out: PathBuf,
        n_features: Option<usize>,
        params_file: Option<PathBuf>,
        params: ParamMap,
    ) -> Result<Self, TaskError> {
        if groups.is_some() {
            return Err(TaskError::GroupsNotSupported);
        }
        if optimize {
            return Err(TaskError::OptimizeNotSupported);
        }
        Ok(CccvTask {
            model_type,
            genotype,
            phenotype,
            folds,
            replicates,
            threads,
            comple_steps,
            conta_steps,
            out,
            n_features,
            params_file,
            params,
        })
    }

    pub fn from_arguments(matches: &ArgMatches) -> Result<Self> {
        Ok(CccvTask::new(
            required_string(matches, "model_type")?,
            required_path(matches, "genotype")?,
            required_path(matches, "phenotype")?,
            matches.get_one::<usize>("folds").copied().unwrap_or(5),
            matches.get_one::<usize>("replicates").copied().unwrap_or(10),
            matches.get_one::<usize>("threads").copied().unwrap_or(1),
            matches.get_one::<PathBuf>("groups").cloned(),
            matches.get_flag("optimize"),
            collect_f64s(matches, "comple_steps"),
            collect_f64s(matches, "conta_steps"),
            required_path(matches, "out")?,
            matches.get_one::<usize>("n_features").copied(),
            matches.get_one::<PathBuf>("params_file").cloned(),
            collect_params(matches)?,
        )?)
    }
}

/// Splits a raw `KEY=VALUE` argument into its parts.
pub fn parse_param(raw: &str) -> Result<(String, Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("Invalid parameter '{}': expected KEY=VALUE", raw);
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("Invalid parameter '{}': empty key", raw);
    }
    Ok((key.to_string(), parse_param_value(value.trim())))
}

/// Interprets a raw parameter value as an integer, a float, a boolean or a
/// plain string, in that order.
fn parse_param_value(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(x) = raw.parse::<f64>() {
        if x.is_finite() {
            return Value::from(x);
        }
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

fn collect_params(matches: &ArgMatches) -> Result<ParamMap> {
    let mut params = ParamMap::new();
    if let Some(raw_params) = matches.get_many::<String>("param") {
        for raw in raw_params {
            let (key, value) =
                parse_param(raw).with_context(|| format!("Failed to parse --param {}", raw))?;
            params.insert(key, value);
        }
    }
    Ok(params)
}

fn collect_f64s(matches: &ArgMatches, id: &str) -> Vec<f64> {
    matches
        .get_many::<f64>(id)
        .map(|values| values.copied().collect())
        .unwrap_or_default()
}

fn required_path(matches: &ArgMatches, id: &str) -> Result<PathBuf> {
    matches
        .get_one::<PathBuf>(id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Missing required argument --{}", id.replace('_', "-")))
}

fn required_string(matches: &ArgMatches, id: &str) -> Result<String> {
    matches
        .get_one::<String>(id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Missing required argument --{}", id.replace('_', "-")))
}
