//! Classifier hyper-parameter handling.
//!
//! Callers pass hyper-parameters around as an untyped, ordered map (as they
//! arrive from the command line or a JSON file). Each model translates that
//! map into its own typed configuration at construction time, rejecting keys
//! it does not understand.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::ClassifierError;

/// Untyped hyper-parameter map, ordered by key for stable serialization.
pub type ParamMap = BTreeMap<String, Value>;

/// Restores canonical casing of parameter names that the argument layer
/// lowercases. Currently only the SVM regularization strength `C` is affected.
///
/// Running this twice is a no-op.
pub fn normalize_params(mut params: ParamMap) -> ParamMap {
    if let Some(value) = params.remove("c") {
        params.insert("C".to_string(), value);
    }
    params
}

/// Merges two parameter maps; values from `overlay` win on key collision.
///
/// Used to combine explicit caller parameters with parameters loaded from a
/// file, where the file-supplied values take precedence.
// TODO: confirm that file-supplied parameters really should override explicit
// command-line parameters, or whether the precedence ought to be reversed.
pub fn merge_params(base: &ParamMap, overlay: &ParamMap) -> ParamMap {
    let mut merged = base.clone();
    for (key, value) in overlay {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Typed hyper-parameters for the support-vector classifier.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct SvmParams {
    /// Regularization strength (upper-case by convention).
    #[serde(rename = "C")]
    pub c: f64,
    /// Optimizer stopping tolerance.
    pub tol: f64,
    /// One of "linear", "gaussian" or "polynomial".
    pub kernel: String,
    /// Width parameter of the gaussian kernel.
    pub gamma: f64,
    /// Degree of the polynomial kernel.
    pub degree: f64,
    /// Constant term of the polynomial kernel.
    pub coef0: f64,
}

impl Default for SvmParams {
    fn default() -> Self {
        SvmParams {
            c: 1.0,
            tol: 1e-3,
            kernel: "linear".to_string(),
            gamma: 0.1,
            degree: 3.0,
            coef0: 1.0,
        }
    }
}

impl SvmParams {
    /// Translates an untyped parameter map, starting from the defaults.
    /// Unknown keys are rejected so typos never pass silently.
    pub fn from_param_map(params: &ParamMap) -> Result<Self, ClassifierError> {
        typed_from_map("svm", params)
    }

    pub fn to_param_map(&self) -> Result<ParamMap, serde_json::Error> {
        typed_to_map(self)
    }
}

/// Typed hyper-parameters for the gradient-boosted tree classifier.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct XgbParams {
    pub max_depth: u32,
    pub n_estimators: u32,
    pub learning_rate: f64,
    /// Fraction of training rows sampled per boosting round.
    pub subsample: f64,
    /// Fraction of features sampled per tree.
    pub colsample: f64,
}

impl Default for XgbParams {
    fn default() -> Self {
        XgbParams {
            max_depth: 4,
            n_estimators: 50,
            learning_rate: 0.1,
            subsample: 1.0,
            colsample: 1.0,
        }
    }
}

impl XgbParams {
    pub fn from_param_map(params: &ParamMap) -> Result<Self, ClassifierError> {
        typed_from_map("xgb", params)
    }

    pub fn to_param_map(&self) -> Result<ParamMap, serde_json::Error> {
        typed_to_map(self)
    }
}

fn typed_from_map<T: for<'de> Deserialize<'de>>(
    model_type: &str,
    params: &ParamMap,
) -> Result<T, ClassifierError> {
    let object: serde_json::Map<String, Value> = params
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    serde_json::from_value(Value::Object(object)).map_err(|e| ClassifierError::InvalidParams {
        model_type: model_type.to_string(),
        message: e.to_string(),
    })
}

fn typed_to_map<T: Serialize>(typed: &T) -> Result<ParamMap, serde_json::Error> {
    let value = serde_json::to_value(typed)?;
    let Value::Object(object) = value else {
        // Typed parameter structs always serialize to an object.
        return Ok(ParamMap::new());
    };
    Ok(object.into_iter().collect())
}
