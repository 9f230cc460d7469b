//! Data structures and helpers for presence/absence training sets.
//!
//! This module defines `TrainingRecord` and `TrainingData` and contains
//! helpers for turning feature sets into dense matrices and for simulating
//! incomplete or contaminated records during resampled cross-validation.
use std::collections::HashSet;

use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::Rng;

/// One labelled sample: the set of features observed in it, its binary
/// phenotype label, and an optional grouping key for leave-one-group-out
/// cross-validation.
#[derive(Debug, Clone)]
pub struct TrainingRecord {
    pub identifier: String,
    /// Sorted, deduplicated indices into the feature table.
    pub features: Vec<usize>,
    pub label: bool,
    pub group: Option<String>,
}

/// A complete training set: the feature table shared by all records plus the
/// records themselves, in load order.
#[derive(Debug, Clone)]
pub struct TrainingData {
    /// Name of the predicted trait, taken from the phenotype file header.
    pub trait_name: String,
    /// Feature names in first-seen order; record feature indices point here.
    pub feature_names: Vec<String>,
    pub records: Vec<TrainingRecord>,
}

impl TrainingData {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Dense presence/absence matrix, one row per record in load order.
    pub fn to_matrix(&self) -> Array2<f64> {
        let mut x = Array2::zeros((self.records.len(), self.feature_names.len()));
        for (row, record) in self.records.iter().enumerate() {
            for &feature in &record.features {
                x[[row, feature]] = 1.0;
            }
        }
        x
    }

    pub fn labels(&self) -> Vec<bool> {
        self.records.iter().map(|r| r.label).collect()
    }

    /// True when every record carries a group assignment.
    pub fn has_groups(&self) -> bool {
        !self.records.is_empty() && self.records.iter().all(|r| r.group.is_some())
    }

    /// Builds rows for the given record indices with simulated data quality:
    /// each feature of a record survives with probability `comple`, then
    /// `round(m * conta)` foreign features (m being the record's original
    /// feature count) are drawn from a single randomly chosen other record.
    ///
    /// Rows keep the full feature width so any column selection fitted on
    /// unperturbed training folds still applies.
    pub fn perturbed_rows<R: Rng>(
        &self,
        rows: &[usize],
        comple: f64,
        conta: f64,
        rng: &mut R,
    ) -> Array2<f64> {
        let mut x = Array2::zeros((rows.len(), self.feature_names.len()));
        for (out_row, &record_idx) in rows.iter().enumerate() {
            let record = &self.records[record_idx];
            let mut kept: HashSet<usize> = record
                .features
                .iter()
                .copied()
                .filter(|_| rng.gen::<f64>() < comple)
                .collect();

            let n_foreign = (record.features.len() as f64 * conta).round() as usize;
            if n_foreign > 0 && self.records.len() > 1 {
                let donor = self.pick_donor(record_idx, rng);
                let candidates: Vec<usize> = self.records[donor]
                    .features
                    .iter()
                    .copied()
                    .filter(|f| !kept.contains(f))
                    .collect();
                for &feature in candidates.choose_multiple(rng, n_foreign) {
                    kept.insert(feature);
                }
            }

            for feature in kept {
                x[[out_row, feature]] = 1.0;
            }
        }
        x
    }

    fn pick_donor<R: Rng>(&self, exclude: usize, rng: &mut R) -> usize {
        let donor = rng.gen_range(0..self.records.len() - 1);
        if donor >= exclude {
            donor + 1
        } else {
            donor
        }
    }
}

/// Counts of positive and negative labels, used for logging summaries.
pub fn class_balance(labels: &[bool]) -> (usize, usize) {
    let positives = labels.iter().filter(|&&l| l).count();
    (positives, labels.len() - positives)
}

/// Selects rows of a label vector, mirroring matrix row selection.
pub fn select_labels(labels: &[bool], indices: &[usize]) -> Vec<bool> {
    indices.iter().map(|&i| labels[i]).collect()
}
