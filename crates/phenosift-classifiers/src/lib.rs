//! phenosift-classifiers: machine-learning helpers for phenotype prediction.
//!
//! This crate provides model wrappers (SVM and gradient-boosted trees) behind a
//! common classifier trait, presence/absence data handling, univariate feature
//! selection, k-fold and leave-one-group-out cross-validation, and the flat-file
//! readers and writers used by the command-line tooling.
//!
//! The design favors small, testable modules; classifiers are constructed
//! through an injectable registry so higher layers never hard-code model types.
pub mod config;
pub mod crossval;
pub mod data_handling;
pub mod error;
pub mod feature_selection;
pub mod io;
pub mod models;
