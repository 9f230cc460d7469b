//! The `cccv` command: cross-validation over a completeness/contamination
//! grid, writing the resulting accuracy surface as nested JSON.

use anyhow::Result;

use phenosift_classifiers::config::normalize_params;
use phenosift_classifiers::io::flat::{load_training_files, write_cccv_accuracy_file};
use phenosift_classifiers::models::factory::ClassifierRegistry;

use crate::pipeline::apply_params_file;
use crate::pipeline::input::CccvTask;

pub fn run_cccv(task: &CccvTask, registry: &ClassifierRegistry) -> Result<()> {
    let params = normalize_params(task.params.clone());
    let data = load_training_files(&task.genotype, &task.phenotype, None, None)?;
    let params = apply_params_file(params, task.params_file.as_deref())?;

    let classifier = registry.build(&task.model_type, &params)?;

    log::info!("Running CCCV...");
    let grid = classifier.crossvalidate_cc(
        &data,
        task.folds,
        task.replicates,
        &task.comple_steps,
        &task.conta_steps,
        task.threads,
        task.n_features.is_some(),
        task.n_features,
    )?;

    write_cccv_accuracy_file(&task.out, &grid)?;
    log::info!("CCCV results written to file {}", task.out.display());
    Ok(())
}
