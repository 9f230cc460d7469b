pub mod classifier_trait;
pub mod factory;
pub mod svm;
pub mod utils;
pub mod xgb;
