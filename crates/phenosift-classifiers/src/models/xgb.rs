use anyhow::Result;
use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use ndarray::Array2;
use rand::Rng;

use crate::config::{ParamMap, XgbParams};
use crate::crossval::{self, CccvPoint, CvOutcome};
use crate::data_handling::TrainingData;
use crate::error::ClassifierError;
use crate::io::serialization::SavedClassifier;
use crate::models::classifier_trait::{FeatureWeight, PhenotypeClassifier};
use crate::models::utils::{prepare_training, FittedState};

pub const MODEL_TYPE: &str = "xgb";

const SEARCH_FOLDS: usize = 5;

/// Gradient-boosted tree classifier with log-likelihood loss. Labels are
/// mapped to the +1/-1 convention the boosting backend expects; predictions
/// come back as probabilities and are thresholded at 0.5.
pub struct XgbClassifier {
    model: Option<GBDT>,
    params: XgbParams,
    state: Option<FittedState>,
}

impl XgbClassifier {
    pub fn new(params: XgbParams) -> Self {
        XgbClassifier {
            model: None,
            params,
            state: None,
        }
    }

    pub fn params(&self) -> &XgbParams {
        &self.params
    }

    fn data_vec(x: &Array2<f64>, labels: Option<&[bool]>) -> DataVec {
        let mut rows = DataVec::new();
        for (i, row) in x.rows().into_iter().enumerate() {
            let features: Vec<f32> = row.iter().map(|&v| v as f32).collect();
            let label = match labels {
                Some(y) => {
                    if y[i] {
                        1.0
                    } else {
                        -1.0
                    }
                }
                None => 0.0,
            };
            rows.push(Data::new_training_data(features, 1.0, label, None));
        }
        rows
    }
}

impl PhenotypeClassifier for XgbClassifier {
    fn model_type(&self) -> &'static str {
        MODEL_TYPE
    }

    fn fresh(&self) -> Box<dyn PhenotypeClassifier> {
        Box::new(XgbClassifier::new(self.params.clone()))
    }

    fn fit(&mut self, x: &Array2<f64>, y: &[bool]) -> Result<()> {
        let mut config = Config::new();
        config.set_feature_size(x.ncols());
        config.set_shrinkage(self.params.learning_rate as f32);
        config.set_max_depth(self.params.max_depth);
        config.set_iterations(self.params.n_estimators as usize);
        config.set_data_sample_ratio(self.params.subsample);
        config.set_feature_sample_ratio(self.params.colsample);
        config.set_debug(false);
        config.set_training_optimization_level(2);
        config.set_loss("LogLikelyhood");

        let mut model = GBDT::new(&config);
        let mut train_rows = Self::data_vec(x, Some(y));
        model.fit(&mut train_rows);
        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<bool>> {
        let model = self.model.as_ref().ok_or(ClassifierError::NotTrained)?;
        let test_rows = Self::data_vec(x, None);
        let predictions = model.predict(&test_rows);
        Ok(predictions.iter().map(|&p| p > 0.5).collect())
    }

    fn train(
        &mut self,
        data: &TrainingData,
        reduce_features: bool,
        n_features: Option<usize>,
    ) -> Result<()> {
        let (x, y, state) = prepare_training(data, reduce_features, n_features)?;
        self.fit(&x, &y)?;
        self.state = Some(state);
        Ok(())
    }

    fn feature_weights(&self) -> Result<Vec<FeatureWeight>> {
        let state = self.state.as_ref().ok_or(ClassifierError::NotTrained)?;
        Ok(state.ranked_weights())
    }

    fn parameter_search(&self, data: &TrainingData, n_iter: usize) -> Result<ParamMap> {
        let mut rng = rand::thread_rng();
        let mut best: Option<(f64, XgbParams)> = None;

        for draw in 0..n_iter {
            let candidate = XgbParams {
                max_depth: rng.gen_range(2..=10),
                n_estimators: rng.gen_range(10..=100),
                learning_rate: 10f64.powf(rng.gen_range(-2.0..-0.3)),
                subsample: rng.gen_range(0.5..1.0),
                colsample: rng.gen_range(0.5..1.0),
            };
            let model = XgbClassifier::new(candidate.clone());
            let outcome = crossval::kfold(&model, data, SEARCH_FOLDS, 1, false, 1, false, None)?;
            log::debug!(
                "Search draw {}/{}: depth={} rounds={} eta={:.3} score={:.4}",
                draw + 1,
                n_iter,
                candidate.max_depth,
                candidate.n_estimators,
                candidate.learning_rate,
                outcome.score_mean
            );
            if best
                .as_ref()
                .map_or(true, |(score, _)| outcome.score_mean > *score)
            {
                best = Some((outcome.score_mean, candidate));
            }
        }

        let (_, winner) = best
            .ok_or_else(|| anyhow::anyhow!("parameter search requires at least one iteration"))?;
        Ok(winner.to_param_map()?)
    }

    fn crossvalidate(
        &self,
        data: &TrainingData,
        cv: usize,
        n_replicates: usize,
        use_groups: bool,
        n_jobs: usize,
        reduce_features: bool,
        n_features: Option<usize>,
    ) -> Result<CvOutcome> {
        crossval::kfold(
            self,
            data,
            cv,
            n_replicates,
            use_groups,
            n_jobs,
            reduce_features,
            n_features,
        )
    }

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
    ) -> Result<Vec<CccvPoint>> {
        crossval::completeness_contamination(
            self,
            data,
            cv,
            n_replicates,
            comple_steps,
            conta_steps,
            n_jobs,
            reduce_features,
            n_features,
        )
    }

    fn export_state(&self) -> Result<SavedClassifier> {
        let model = self.model.as_ref().ok_or(ClassifierError::NotTrained)?;
        let state = self.state.as_ref().ok_or(ClassifierError::NotTrained)?;
        Ok(SavedClassifier {
            format_version: SavedClassifier::FORMAT_VERSION,
            created_by: format!("phenosift-classifiers {}", env!("CARGO_PKG_VERSION")),
            model_type: MODEL_TYPE.to_string(),
            trait_name: state.trait_name.clone(),
            params: serde_json::to_value(&self.params)?,
            feature_names: state.all_features.clone(),
            selected_features: state.selected.clone(),
            backend: serde_json::to_value(model)?,
        })
    }
}
