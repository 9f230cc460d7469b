//! The `cv` command: replicated cross-validation with optional grouped folds
//! and optional randomized hyper-parameter search.

use anyhow::Result;

use phenosift_classifiers::config::{merge_params, normalize_params};
use phenosift_classifiers::io::flat::{
    load_training_files, write_misclassifications_file, write_params_file,
};
use phenosift_classifiers::models::factory::ClassifierRegistry;

use crate::pipeline::apply_params_file;
use crate::pipeline::input::CvTask;

/// Number of random draws evaluated during a parameter search.
pub const PARAM_SEARCH_ITERATIONS: usize = 10;

pub fn run_cv(task: &CvTask, registry: &ClassifierRegistry) -> Result<()> {
    let params = normalize_params(task.params.clone());
    let use_groups = task.groups.is_some();
    let data = load_training_files(
        &task.genotype,
        &task.phenotype,
        task.groups.as_deref(),
        task.rank.as_deref(),
    )?;
    let mut params = apply_params_file(params, task.params_file.as_deref())?;

    let mut classifier = registry.build(&task.model_type, &params)?;

    if let Some(optimize_out) = &task.optimize {
        log::info!("Optimizing parameters. This may take some time...");
        let discovered = classifier.parameter_search(&data, PARAM_SEARCH_ITERATIONS)?;
        params = merge_params(&params, &discovered);
        write_params_file(optimize_out, &params)?;
        log::info!(
            "Optimized parameters written to file {}",
            optimize_out.display()
        );
        classifier = registry.build(&task.model_type, &params)?;
    }

    log::info!("Running CV...");
    let outcome = classifier.crossvalidate(
        &data,
        task.folds,
        task.replicates,
        use_groups,
        task.threads,
        task.n_features.is_some(),
        task.n_features,
    )?;
    log::info!(
        "CV score: {:.4} +/- {:.4}",
        outcome.score_mean,
        outcome.score_sd
    );

    if let Some(out) = &task.out {
        write_misclassifications_file(out, &data, &outcome.misclassification_rates, use_groups)?;
        log::info!("Misclassification rates written to file {}", out.display());
    }
    Ok(())
}
