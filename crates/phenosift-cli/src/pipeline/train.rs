//! The `train` command: fit a classifier on the full dataset and save it.

use std::path::PathBuf;

use anyhow::Result;

use phenosift_classifiers::config::normalize_params;
use phenosift_classifiers::io::flat::{load_training_files, write_weights_file};
use phenosift_classifiers::io::serialization::save_classifier;
use phenosift_classifiers::models::factory::ClassifierRegistry;

use crate::pipeline::apply_params_file;
use crate::pipeline::input::TrainTask;

pub fn run_train(task: &TrainTask, registry: &ClassifierRegistry) -> Result<()> {
    let params = normalize_params(task.params.clone());
    let data = load_training_files(&task.genotype, &task.phenotype, None, None)?;
    let params = apply_params_file(params, task.params_file.as_deref())?;

    let mut classifier = registry.build(&task.model_type, &params)?;
    classifier.train(&data, task.n_features.is_some(), task.n_features)?;
    log::info!(
        "Training completed on {} records with {} features",
        data.len(),
        data.feature_names.len()
    );

    if task.weights {
        let weights = classifier.feature_weights()?;
        let rank_path = PathBuf::from(format!("{}.rank", task.out.display()));
        write_weights_file(&rank_path, &weights)?;
        log::info!("Feature weights written to file {}", rank_path.display());
    }

    save_classifier(classifier.as_ref(), &task.out)?;
    Ok(())
}
