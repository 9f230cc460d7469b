//! Feature selection utilities.
//!
//! This module contains univariate selection routines (a la scikit-learn)
//! for scoring and ranking presence/absence features against a binary
//! phenotype label.
pub mod univariate_selection;
