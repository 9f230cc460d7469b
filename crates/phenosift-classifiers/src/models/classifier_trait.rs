use anyhow::Result;
use ndarray::Array2;

use crate::config::ParamMap;
use crate::crossval::{CccvPoint, CvOutcome};
use crate::data_handling::TrainingData;
use crate::io::serialization::SavedClassifier;

/// One entry of a feature ranking: the feature's name and its signed
/// association weight with the positive phenotype class.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureWeight {
    pub feature: String,
    pub weight: f64,
}

/// The capability set shared by every phenotype classifier. This centralizes
/// the contract in the `models` module so implementations can live next to
/// model code, and keeps the trait object-safe so classifiers can be handed
/// out as `Box<dyn PhenotypeClassifier>` by the registry.
///
/// The matrix-level `fit`/`predict` pair is what the cross-validation engines
/// drive; `train` is the full-dataset entry point that also performs optional
/// feature reduction and records the trained feature space.
pub trait PhenotypeClassifier: Send + Sync {
    /// Registry name of this model family, e.g. "svm".
    fn model_type(&self) -> &'static str;

    /// An untrained copy with identical hyper-parameters. Used by the
    /// cross-validation engines to train one model per fold.
    fn fresh(&self) -> Box<dyn PhenotypeClassifier>;

    /// Fit on a dense presence/absence matrix with one label per row.
    fn fit(&mut self, x: &Array2<f64>, y: &[bool]) -> Result<()>;

    /// Predict one label per row of `x`. Errors if called before `fit`.
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<bool>>;

    /// Train on the complete dataset. With `reduce_features` the top
    /// `n_features` features by univariate F-score are selected first and the
    /// selection is recorded for later export.
    fn train(
        &mut self,
        data: &TrainingData,
        reduce_features: bool,
        n_features: Option<usize>,
    ) -> Result<()>;

    /// Association weights of the trained feature space, ordered by
    /// descending magnitude. Errors if called before `train`.
    fn feature_weights(&self) -> Result<Vec<FeatureWeight>>;

    /// Randomized hyper-parameter search: `n_iter` draws from a
    /// variant-specific distribution, each scored by internal 5-fold
    /// cross-validation. Returns the winning configuration as a parameter
    /// map suitable for rebuilding the classifier through the registry.
    fn parameter_search(&self, data: &TrainingData, n_iter: usize) -> Result<ParamMap>;

    /// Replicated k-fold (or leave-one-group-out) cross-validation.
    #[allow(clippy::too_many_arguments)]
    fn crossvalidate(
        &self,
        data: &TrainingData,
        cv: usize,
        n_replicates: usize,
        use_groups: bool,
        n_jobs: usize,
        reduce_features: bool,
        n_features: Option<usize>,
    ) -> Result<CvOutcome>;

    /// Cross-validation over a grid of simulated completeness/contamination
    /// levels applied to the test folds.
    #[allow(clippy::too_many_arguments)]
    fn crossvalidate_cc(
        &self,
        data: &TrainingData,
        cv: usize,
        n_replicates: usize,
        comple_steps: &[f64],
        conta_steps: &[f64],
        n_jobs: usize,
        reduce_features: bool,
        n_features: Option<usize>,
    ) -> Result<Vec<CccvPoint>>;

    /// Snapshot of the trained classifier for persistence. Errors if called
    /// before `train`.
    fn export_state(&self) -> Result<SavedClassifier>;
}
