use anyhow::{anyhow, Result};
use linfa::dataset::Pr;
use linfa::traits::Predict;
use linfa::Dataset;
use linfa_svm::Svm;
use linfa_svm::SvmParams as LinfaSvmParams;
use ndarray::{Array1, Array2};
use rand::Rng;

use crate::config::{ParamMap, SvmParams};
use crate::crossval::{self, CccvPoint, CvOutcome};
use crate::data_handling::TrainingData;
use crate::error::ClassifierError;
use crate::io::serialization::SavedClassifier;
use crate::models::classifier_trait::{FeatureWeight, PhenotypeClassifier};
use crate::models::utils::{prepare_training, FittedState};

pub const MODEL_TYPE: &str = "svm";

/// Number of folds used to score candidate configurations during the
/// randomized hyper-parameter search.
const SEARCH_FOLDS: usize = 5;

/// Support-vector classifier with Platt-scaled probability output.
pub struct SvmClassifier {
    model: Option<Svm<f64, Pr>>,
    params: SvmParams,
    state: Option<FittedState>,
}

impl SvmClassifier {
    pub fn new(params: SvmParams) -> Self {
        SvmClassifier {
            model: None,
            params,
            state: None,
        }
    }

    pub fn params(&self) -> &SvmParams {
        &self.params
    }

    fn configured_params(&self) -> Result<LinfaSvmParams<f64, Pr>> {
        let params = Svm::<f64, Pr>::params()
            .eps(self.params.tol)
            .pos_neg_weights(self.params.c, self.params.c);

        // Chain the kernel configuration based on the kernel type
        let params = match self.params.kernel.as_str() {
            "linear" => params.linear_kernel(),
            "gaussian" => params.gaussian_kernel(self.params.gamma),
            "polynomial" => params.polynomial_kernel(self.params.coef0, self.params.degree),
            other => {
                return Err(ClassifierError::InvalidParams {
                    model_type: MODEL_TYPE.to_string(),
                    message: format!(
                        "unsupported kernel type: {}. Valid options are: linear, gaussian, polynomial",
                        other
                    ),
                }
                .into())
            }
        };
        Ok(params)
    }
}

impl PhenotypeClassifier for SvmClassifier {
    fn model_type(&self) -> &'static str {
        MODEL_TYPE
    }

    fn fresh(&self) -> Box<dyn PhenotypeClassifier> {
        Box::new(SvmClassifier::new(self.params.clone()))
    }

    fn fit(&mut self, x: &Array2<f64>, y: &[bool]) -> Result<()> {
        let targets = Array1::from_vec(y.to_vec());
        let dataset = Dataset::new(x.to_owned(), targets);
        let params = self.configured_params()?;

        let model = <LinfaSvmParams<f64, Pr> as linfa::traits::Fit<_, _, _>>::fit(
            &params, &dataset,
        )
        .map_err(|e| anyhow!("SVM training failed: {}", e))?;
        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<bool>> {
        let model = self.model.as_ref().ok_or(ClassifierError::NotTrained)?;
        let predictions = model.predict(x.to_owned());
        let probabilities: Vec<Pr> = predictions.targets().to_vec();
        Ok(probabilities.iter().map(|p| **p > 0.5).collect())
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
        let mut best: Option<(f64, SvmParams)> = None;

        for draw in 0..n_iter {
            // Log-uniform draws over the usual ranges for margin classifiers.
            let candidate = SvmParams {
                c: 10f64.powf(rng.gen_range(-3.0..3.0)),
                tol: 10f64.powf(rng.gen_range(-5.0..-2.0)),
                ..self.params.clone()
            };
            let model = SvmClassifier::new(candidate.clone());
            let outcome = crossval::kfold(&model, data, SEARCH_FOLDS, 1, false, 1, false, None)?;
            log::debug!(
                "Search draw {}/{}: C={:.4} tol={:.2e} score={:.4}",
                draw + 1,
                n_iter,
                candidate.c,
                candidate.tol,
                outcome.score_mean
            );
            if best
                .as_ref()
                .map_or(true, |(score, _)| outcome.score_mean > *score)
            {
                best = Some((outcome.score_mean, candidate));
            }
        }

        let (_, winner) =
            best.ok_or_else(|| anyhow!("parameter search requires at least one iteration"))?;
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
