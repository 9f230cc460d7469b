//! Cross-validation engines shared by all classifier variants.
//!
//! Two entry points: [`kfold`] runs replicated k-fold (or leave-one-group-out)
//! cross-validation and reports balanced accuracy plus per-record
//! misclassification rates; [`completeness_contamination`] repeats k-fold
//! evaluation over a grid of simulated data-quality levels, perturbing only
//! the test folds so the trained models never see degraded records.
//!
//! Fold evaluations are independent and run on a dedicated rayon pool.
use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use ndarray::{Array2, Axis};
use rand::seq::SliceRandom;
use rand::thread_rng;
use rand::Rng;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::data_handling::{select_labels, TrainingData};
use crate::feature_selection::univariate_selection::SelectKBest;
use crate::models::classifier_trait::PhenotypeClassifier;
use crate::models::utils::requested_feature_count;

/// Aggregated result of a replicated cross-validation run.
#[derive(Debug, Clone)]
pub struct CvOutcome {
    /// Mean balanced accuracy over all (replicate, fold) evaluations.
    pub score_mean: f64,
    /// Population standard deviation of the per-fold scores.
    pub score_sd: f64,
    /// Per-record fraction of evaluations in which the record was
    /// misclassified, aligned with the record order of the training data.
    pub misclassification_rates: Vec<f64>,
}

/// Score summary for one completeness/contamination level pair.
#[derive(Debug, Clone)]
pub struct CccvPoint {
    pub comple: f64,
    pub conta: f64,
    pub score_mean: f64,
    pub score_sd: f64,
}

/// Mean recall over the classes present in the test fold. Folds holding a
/// single class degrade to plain recall of that class.
pub fn balanced_accuracy(truth: &[bool], predictions: &[bool]) -> f64 {
    let mut counts = [[0usize; 2]; 2]; // [class][correct]
    for (&label, &prediction) in truth.iter().zip(predictions) {
        let class = usize::from(label);
        let correct = usize::from(prediction == label);
        counts[class][correct] += 1;
    }

    let mut recall_sum = 0.0;
    let mut classes = 0;
    for class_counts in counts {
        let total = class_counts[0] + class_counts[1];
        if total > 0 {
            recall_sum += class_counts[1] as f64 / total as f64;
            classes += 1;
        }
    }
    if classes == 0 {
        return 0.0;
    }
    recall_sum / classes as f64
}

/// Replicated k-fold cross-validation.
///
/// With `use_groups` the folds are fixed by the records' group assignments
/// (one fold per distinct group, `cv` is ignored); otherwise each replicate
/// shuffles the records into `cv` folds of near-equal size. `n_jobs` sizes
/// the worker pool, `0` meaning one worker per core.
#[allow(clippy::too_many_arguments)]
pub fn kfold(
    proto: &dyn PhenotypeClassifier,
    data: &TrainingData,
    cv: usize,
    n_replicates: usize,
    use_groups: bool,
    n_jobs: usize,
    reduce_features: bool,
    n_features: Option<usize>,
) -> Result<CvOutcome> {
    let selection_size = requested_feature_count(reduce_features, n_features)?;
    let x = data.to_matrix();
    let y = data.labels();
    let pool = build_pool(n_jobs)?;
    let jobs = build_jobs(data, cv, n_replicates, use_groups, None)?;
    let evals = run_jobs(proto, data, &x, &y, &jobs, &pool, selection_size)?;
    Ok(aggregate(data.len(), &jobs, &evals))
}

/// Replicated k-fold cross-validation over a grid of completeness and
/// contamination levels. Returns one summary per level pair, iterating
/// completeness in the outer loop.
#[allow(clippy::too_many_arguments)]
pub fn completeness_contamination(
    proto: &dyn PhenotypeClassifier,
    data: &TrainingData,
    cv: usize,
    n_replicates: usize,
    comple_steps: &[f64],
    conta_steps: &[f64],
    n_jobs: usize,
    reduce_features: bool,
    n_features: Option<usize>,
) -> Result<Vec<CccvPoint>> {
    if comple_steps.is_empty() || conta_steps.is_empty() {
        bail!("completeness and contamination step lists must not be empty");
    }
    for &level in comple_steps.iter().chain(conta_steps) {
        if !(0.0..=1.0).contains(&level) {
            bail!("perturbation level {} outside the [0, 1] range", level);
        }
    }

    let selection_size = requested_feature_count(reduce_features, n_features)?;
    let x = data.to_matrix();
    let y = data.labels();
    let pool = build_pool(n_jobs)?;

    let mut points = Vec::with_capacity(comple_steps.len() * conta_steps.len());
    for &comple in comple_steps {
        for &conta in conta_steps {
            let jobs = build_jobs(data, cv, n_replicates, false, Some((comple, conta)))?;
            let evals = run_jobs(proto, data, &x, &y, &jobs, &pool, selection_size)?;
            let outcome = aggregate(data.len(), &jobs, &evals);
            log::debug!(
                "Completeness {:.2}, contamination {:.2}: {:.4} +/- {:.4}",
                comple,
                conta,
                outcome.score_mean,
                outcome.score_sd
            );
            points.push(CccvPoint {
                comple,
                conta,
                score_mean: outcome.score_mean,
                score_sd: outcome.score_sd,
            });
        }
    }
    Ok(points)
}

/// One train/test split; `perturb` carries the completeness/contamination
/// levels to apply to the test rows.
struct FoldJob {
    train_idx: Vec<usize>,
    test_idx: Vec<usize>,
    perturb: Option<(f64, f64)>,
}

fn build_pool(n_jobs: usize) -> Result<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(n_jobs)
        .build()
        .context("failed to build cross-validation thread pool")
}

fn build_jobs(
    data: &TrainingData,
    cv: usize,
    n_replicates: usize,
    use_groups: bool,
    perturb: Option<(f64, f64)>,
) -> Result<Vec<FoldJob>> {
    let n_records = data.len();
    if n_replicates == 0 {
        bail!("at least one replicate is required");
    }

    let mut jobs = Vec::new();
    if use_groups {
        // The fold layout is fixed by the groups; replicates still rerun the
        // (stochastic) model training.
        let folds = group_folds(data)?;
        for _ in 0..n_replicates {
            for fold in &folds {
                jobs.push(make_job(n_records, fold.clone(), perturb));
            }
        }
    } else {
        if cv < 2 {
            bail!("cross-validation requires at least two folds");
        }
        if cv > n_records {
            bail!("cannot split {} records into {} folds", n_records, cv);
        }
        let mut rng = thread_rng();
        for _ in 0..n_replicates {
            for fold in random_folds(n_records, cv, &mut rng) {
                jobs.push(make_job(n_records, fold, perturb));
            }
        }
    }
    Ok(jobs)
}

fn make_job(n_records: usize, test_idx: Vec<usize>, perturb: Option<(f64, f64)>) -> FoldJob {
    let mut in_test = vec![false; n_records];
    for &i in &test_idx {
        in_test[i] = true;
    }
    let train_idx = (0..n_records).filter(|&i| !in_test[i]).collect();
    FoldJob {
        train_idx,
        test_idx,
        perturb,
    }
}

fn random_folds<R: Rng>(n_records: usize, cv: usize, rng: &mut R) -> Vec<Vec<usize>> {
    let mut indices: Vec<usize> = (0..n_records).collect();
    indices.shuffle(rng);

    let base = n_records / cv;
    let extra = n_records % cv;
    let mut folds = Vec::with_capacity(cv);
    let mut start = 0;
    for fold in 0..cv {
        let size = base + usize::from(fold < extra);
        folds.push(indices[start..start + size].to_vec());
        start += size;
    }
    folds
}

fn group_folds(data: &TrainingData) -> Result<Vec<Vec<usize>>> {
    let mut by_group: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, record) in data.records.iter().enumerate() {
        match &record.group {
            Some(group) => by_group.entry(group).or_default().push(i),
            None => bail!(
                "record '{}' has no group assignment; leave-one-group-out \
                 cross-validation requires one per record",
                record.identifier
            ),
        }
    }
    if by_group.len() < 2 {
        bail!("leave-one-group-out cross-validation requires at least two distinct groups");
    }
    Ok(by_group.into_values().collect())
}

fn run_jobs(
    proto: &dyn PhenotypeClassifier,
    data: &TrainingData,
    x: &Array2<f64>,
    y: &[bool],
    jobs: &[FoldJob],
    pool: &ThreadPool,
    selection_size: Option<usize>,
) -> Result<Vec<(f64, Vec<usize>)>> {
    pool.install(|| {
        jobs.par_iter()
            .map(|job| eval_fold(proto, data, x, y, job, selection_size))
            .collect::<Result<Vec<_>>>()
    })
}

fn eval_fold(
    proto: &dyn PhenotypeClassifier,
    data: &TrainingData,
    x: &Array2<f64>,
    y: &[bool],
    job: &FoldJob,
    selection_size: Option<usize>,
) -> Result<(f64, Vec<usize>)> {
    let train_x = x.select(Axis(0), &job.train_idx);
    let train_y = select_labels(y, &job.train_idx);
    let test_x = match job.perturb {
        Some((comple, conta)) => {
            data.perturbed_rows(&job.test_idx, comple, conta, &mut thread_rng())
        }
        None => x.select(Axis(0), &job.test_idx),
    };
    let test_y = select_labels(y, &job.test_idx);

    // Column selection is fitted on the training fold only, then applied to
    // both sides so perturbed test rows stay aligned.
    let (train_x, test_x) = match selection_size {
        Some(k) => {
            let selection = SelectKBest::new(k).fit(&train_x, &train_y);
            (
                train_x.select(Axis(1), &selection),
                test_x.select(Axis(1), &selection),
            )
        }
        None => (train_x, test_x),
    };

    let mut model = proto.fresh();
    model.fit(&train_x, &train_y)?;
    let predictions = model.predict(&test_x)?;
    let score = balanced_accuracy(&test_y, &predictions);
    let misclassified = job
        .test_idx
        .iter()
        .zip(predictions.iter().zip(&test_y))
        .filter_map(|(&record, (prediction, label))| (prediction != label).then_some(record))
        .collect();
    Ok((score, misclassified))
}

fn aggregate(n_records: usize, jobs: &[FoldJob], evals: &[(f64, Vec<usize>)]) -> CvOutcome {
    let scores: Vec<f64> = evals.iter().map(|(score, _)| *score).collect();
    let score_mean = scores.iter().sum::<f64>() / scores.len() as f64;
    let variance = scores
        .iter()
        .map(|score| (score - score_mean).powi(2))
        .sum::<f64>()
        / scores.len() as f64;

    let mut tested = vec![0usize; n_records];
    let mut wrong = vec![0usize; n_records];
    for (job, (_, misclassified)) in jobs.iter().zip(evals) {
        for &record in &job.test_idx {
            tested[record] += 1;
        }
        for &record in misclassified {
            wrong[record] += 1;
        }
    }
    let misclassification_rates = tested
        .iter()
        .zip(&wrong)
        .map(|(&t, &w)| if t == 0 { 0.0 } else { w as f64 / t as f64 })
        .collect();

    CvOutcome {
        score_mean,
        score_sd: variance.sqrt(),
        misclassification_rates,
    }
}
