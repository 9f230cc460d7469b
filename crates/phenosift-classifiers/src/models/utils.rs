//! Shared training plumbing used by the concrete model wrappers.

use anyhow::{bail, Result};
use ndarray::{Array2, Axis};

use crate::data_handling::TrainingData;
use crate::feature_selection::univariate_selection::{point_biserial, SelectKBest};
use crate::models::classifier_trait::FeatureWeight;

/// Everything a trained model remembers about the feature space it was
/// fitted on, independent of the backing model type.
#[derive(Debug, Clone)]
pub struct FittedState {
    /// Name of the trait the model was trained for.
    pub trait_name: String,
    /// Full feature table of the training data.
    pub all_features: Vec<String>,
    /// Indices into `all_features` if reduction was applied, best-scoring
    /// first; `None` when the model was trained on the full table.
    pub selected: Option<Vec<usize>>,
    /// Association weights aligned with the trained feature space.
    pub weights: Vec<f64>,
}

impl FittedState {
    /// Names of the features the model was actually trained on, in column
    /// order of the training matrix.
    pub fn trained_features(&self) -> Vec<String> {
        match &self.selected {
            Some(indices) => indices
                .iter()
                .map(|&i| self.all_features[i].clone())
                .collect(),
            None => self.all_features.clone(),
        }
    }

    /// Weights zipped with feature names, ordered by descending magnitude.
    /// Ties are broken by feature name for stable output.
    pub fn ranked_weights(&self) -> Vec<FeatureWeight> {
        let mut ranked: Vec<FeatureWeight> = self
            .trained_features()
            .into_iter()
            .zip(self.weights.iter().copied())
            .map(|(feature, weight)| FeatureWeight { feature, weight })
            .collect();
        ranked.sort_by(|a, b| {
            b.weight
                .abs()
                .partial_cmp(&a.weight.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.feature.cmp(&b.feature))
        });
        ranked
    }
}

/// Validates the feature-reduction request. `Some(k)` means "select the top
/// k features"; reduction without a feature count is rejected here so the
/// orchestrators never have to.
pub fn requested_feature_count(
    reduce_features: bool,
    n_features: Option<usize>,
) -> Result<Option<usize>> {
    if !reduce_features {
        return Ok(None);
    }
    match n_features {
        Some(0) => bail!("feature reduction requires a feature count of at least 1"),
        Some(k) => Ok(Some(k)),
        None => bail!("feature reduction requested without a feature count"),
    }
}

/// Builds the training matrix for a full-dataset fit: applies optional
/// univariate feature selection and computes the association weights of the
/// resulting feature space.
pub fn prepare_training(
    data: &TrainingData,
    reduce_features: bool,
    n_features: Option<usize>,
) -> Result<(Array2<f64>, Vec<bool>, FittedState)> {
    if data.is_empty() {
        bail!("cannot train on an empty dataset");
    }
    let y = data.labels();
    let full_x = data.to_matrix();

    let (x, selected) = match requested_feature_count(reduce_features, n_features)? {
        Some(k) => {
            let selection = SelectKBest::new(k).fit(&full_x, &y);
            log::info!(
                "Reduced feature space from {} to {} features",
                full_x.ncols(),
                selection.len()
            );
            (full_x.select(Axis(1), &selection), Some(selection))
        }
        None => (full_x, None),
    };

    let weights = point_biserial(&x, &y, true).to_vec();
    let state = FittedState {
        trait_name: data.trait_name.clone(),
        all_features: data.feature_names.clone(),
        selected,
        weights,
    };
    Ok((x, y, state))
}
