//! Trained-classifier persistence.
//!
//! A trained model is stored as a versioned JSON envelope: the model type and
//! its hyper-parameters, the feature space the model was trained on, and the
//! serialized backend model itself.
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::classifier_trait::PhenotypeClassifier;

/// Versioned on-disk snapshot of a trained classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedClassifier {
    pub format_version: u32,
    /// Producing crate and version, for provenance.
    pub created_by: String,
    pub model_type: String,
    /// Name of the trait the classifier predicts.
    pub trait_name: String,
    /// Hyper-parameters the classifier was built with.
    pub params: Value,
    /// Full feature table of the training data.
    pub feature_names: Vec<String>,
    /// Indices into `feature_names` if feature reduction was applied.
    pub selected_features: Option<Vec<usize>>,
    /// Serialized backend model.
    pub backend: Value,
}

impl SavedClassifier {
    pub const FORMAT_VERSION: u32 = 1;
}

/// Serializes a trained classifier to `path` as pretty-printed JSON.
pub fn save_classifier(classifier: &dyn PhenotypeClassifier, path: &Path) -> Result<()> {
    let state = classifier.export_state()?;
    let json = serde_json::to_string_pretty(&state)?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write classifier to {}", path.display()))?;
    log::info!("Classifier saved to {}", path.display());
    Ok(())
}

/// Reads a classifier envelope back from disk. Returns the envelope rather
/// than a live classifier; rebuilding a model from its backend payload is the
/// responsibility of the model wrappers.
pub fn load_saved_classifier(path: &Path) -> Result<SavedClassifier> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read classifier from {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Malformed classifier file {}", path.display()))
}
