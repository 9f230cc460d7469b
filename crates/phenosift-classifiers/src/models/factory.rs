use crate::config::{ParamMap, SvmParams, XgbParams};
use crate::error::ClassifierError;
use crate::models::classifier_trait::PhenotypeClassifier;
use crate::models::svm::SvmClassifier;
use crate::models::xgb::XgbClassifier;

pub type BoxedClassifier = Box<dyn PhenotypeClassifier>;

/// Constructor for one model family: turns an untyped parameter map into a
/// ready-to-train classifier, or rejects the map.
pub type ClassifierBuilder =
    Box<dyn Fn(&ParamMap) -> Result<BoxedClassifier, ClassifierError> + Send + Sync>;

/// Immutable lookup table from model-type names to classifier builders.
///
/// The table is fixed at construction time and handed to the orchestration
/// layer, so the set of available models is explicit in the call graph
/// rather than living in mutable global state. Tests inject their own
/// builders through [`ClassifierRegistry::from_builders`].
pub struct ClassifierRegistry {
    builders: Vec<(String, ClassifierBuilder)>,
}

impl ClassifierRegistry {
    /// The registry shipped with this crate: `"svm"` and `"xgb"`.
    pub fn builtin() -> Self {
        let builders: Vec<(String, ClassifierBuilder)> = vec![
            (
                crate::models::svm::MODEL_TYPE.to_string(),
                Box::new(|params: &ParamMap| {
                    let typed = SvmParams::from_param_map(params)?;
                    Ok(Box::new(SvmClassifier::new(typed)) as BoxedClassifier)
                }),
            ),
            (
                crate::models::xgb::MODEL_TYPE.to_string(),
                Box::new(|params: &ParamMap| {
                    let typed = XgbParams::from_param_map(params)?;
                    Ok(Box::new(XgbClassifier::new(typed)) as BoxedClassifier)
                }),
            ),
        ];
        Self::from_builders(builders)
    }

    /// A registry with caller-supplied builders. First entry wins when two
    /// builders share a name.
    pub fn from_builders(builders: Vec<(String, ClassifierBuilder)>) -> Self {
        ClassifierRegistry { builders }
    }

    /// Model-type names in registration order.
    pub fn model_types(&self) -> Vec<&str> {
        self.builders.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Constructs a classifier of the requested type from an untyped
    /// parameter map.
    pub fn build(
        &self,
        model_type: &str,
        params: &ParamMap,
    ) -> Result<BoxedClassifier, ClassifierError> {
        let builder = self
            .builders
            .iter()
            .find(|(name, _)| name == model_type)
            .map(|(_, builder)| builder)
            .ok_or_else(|| ClassifierError::UnknownModelType(model_type.to_string()))?;
        builder(params)
    }
}

impl Default for ClassifierRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
