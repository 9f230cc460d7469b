use std::error::Error;
use std::fmt;

/// Custom error type for classifier construction and use
#[derive(Debug)]
pub enum ClassifierError {
    /// Requested model type is not present in the registry.
    UnknownModelType(String),
    /// Parameter map could not be translated into the model's typed configuration.
    InvalidParams { model_type: String, message: String },
    /// Prediction, weight extraction or export was requested before training.
    NotTrained,
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ClassifierError::UnknownModelType(name) => {
                write!(f, "Unknown model type: {}", name)
            }
            ClassifierError::InvalidParams {
                model_type,
                message,
            } => {
                write!(f, "Invalid parameters for model type {}: {}", model_type, message)
            }
            ClassifierError::NotTrained => write!(f, "Classifier has not been trained yet"),
        }
    }
}

impl Error for ClassifierError {}
