//! Task definitions and orchestration for the train, cv and cccv commands.
//!
//! Each command is described by a validated task struct (see [`input`]) and
//! executed by a `run_*` function that receives the classifier registry
//! explicitly, so tests can substitute their own model builders.
pub mod cccv;
pub mod cv;
pub mod input;
pub mod train;

pub use cccv::run_cccv;
pub use cv::run_cv;
pub use input::{CccvTask, CvTask, TaskError, TrainTask};
pub use train::run_train;

use std::path::Path;

use anyhow::Result;
use phenosift_classifiers::config::{merge_params, ParamMap};
use phenosift_classifiers::io::flat::load_params_file;

/// Overlays an optional parameter file onto the caller's already normalized
/// parameters. File-supplied values win on collision. The runners call this
/// after data loading, not before.
pub(crate) fn apply_params_file(params: ParamMap, params_file: Option<&Path>) -> Result<ParamMap> {
    let Some(path) = params_file else {
        return Ok(params);
    };
    let loaded = load_params_file(path)?;
    log::info!("Parameters loaded from file: {:?}", loaded);
    Ok(merge_params(&params, &loaded))
}
