//! Integration tests for the pipeline runners, driven through an injected
//! classifier registry so no real model is trained.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use ndarray::Array2;
use serde_json::{json, Value};

use phenosift_cli::pipeline::{run_cccv, run_cv, run_train, CccvTask, CvTask, TrainTask};
use phenosift_classifiers::config::ParamMap;
use phenosift_classifiers::crossval::{CccvPoint, CvOutcome};
use phenosift_classifiers::data_handling::TrainingData;
use phenosift_classifiers::io::serialization::SavedClassifier;
use phenosift_classifiers::models::classifier_trait::{FeatureWeight, PhenotypeClassifier};
use phenosift_classifiers::models::factory::{
    BoxedClassifier, ClassifierBuilder, ClassifierRegistry,
};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Recorder {
    builds: Mutex<Vec<ParamMap>>,
    trains: Mutex<Vec<(bool, Option<usize>)>>,
    cv_calls: Mutex<Vec<(usize, usize, bool, usize)>>,
}

struct MockClassifier {
    recorder: Arc<Recorder>,
}

impl PhenotypeClassifier for MockClassifier {
    fn model_type(&self) -> &'static str {
        "mock"
    }

    fn fresh(&self) -> Box<dyn PhenotypeClassifier> {
        Box::new(MockClassifier {
            recorder: Arc::clone(&self.recorder),
        })
    }

    fn fit(&mut self, _x: &Array2<f64>, _y: &[bool]) -> Result<()> {
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<bool>> {
        Ok(vec![true; x.nrows()])
    }

    fn train(
        &mut self,
        _data: &TrainingData,
        reduce_features: bool,
        n_features: Option<usize>,
    ) -> Result<()> {
        self.recorder
            .trains
            .lock()
            .unwrap()
            .push((reduce_features, n_features));
        Ok(())
    }

    fn feature_weights(&self) -> Result<Vec<FeatureWeight>> {
        Ok(vec![
            FeatureWeight {
                feature: "F2".to_string(),
                weight: 1.5,
            },
            FeatureWeight {
                feature: "F1".to_string(),
                weight: -0.5,
            },
        ])
    }

    fn parameter_search(&self, _data: &TrainingData, _n_iter: usize) -> Result<ParamMap> {
        let mut best = ParamMap::new();
        best.insert("C".to_string(), json!(99.0));
        Ok(best)
    }

    fn crossvalidate(
        &self,
        data: &TrainingData,
        cv: usize,
        n_replicates: usize,
        use_groups: bool,
        n_jobs: usize,
        _reduce_features: bool,
        _n_features: Option<usize>,
    ) -> Result<CvOutcome> {
        self.recorder
            .cv_calls
            .lock()
            .unwrap()
            .push((cv, n_replicates, use_groups, n_jobs));
        // The second record is always "hard": misclassified half the time.
        let rates = (0..data.len())
            .map(|i| if i == 1 { 0.5 } else { 0.0 })
            .collect();
        Ok(CvOutcome {
            score_mean: 0.9,
            score_sd: 0.05,
            misclassification_rates: rates,
        })
    }

    fn crossvalidate_cc(
        &self,
        _data: &TrainingData,
        _cv: usize,
        _n_replicates: usize,
        comple_steps: &[f64],
        conta_steps: &[f64],
        _n_jobs: usize,
        _reduce_features: bool,
        _n_features: Option<usize>,
    ) -> Result<Vec<CccvPoint>> {
        let mut grid = Vec::new();
        for &comple in comple_steps {
            for &conta in conta_steps {
                grid.push(CccvPoint {
                    comple,
                    conta,
                    score_mean: 1.0,
                    score_sd: 0.0,
                });
            }
        }
        Ok(grid)
    }

    fn export_state(&self) -> Result<SavedClassifier> {
        Ok(SavedClassifier {
            format_version: SavedClassifier::FORMAT_VERSION,
            created_by: "phenosift-cli tests".to_string(),
            model_type: "mock".to_string(),
            trait_name: "Sporulation".to_string(),
            params: json!({}),
            feature_names: Vec::new(),
            selected_features: None,
            backend: Value::Null,
        })
    }
}

fn mock_registry(recorder: &Arc<Recorder>) -> ClassifierRegistry {
    let recorder = Arc::clone(recorder);
    let builders: Vec<(String, ClassifierBuilder)> = vec![(
        "mock".to_string(),
        Box::new(move |params: &ParamMap| {
            recorder.builds.lock().unwrap().push(params.clone());
            Ok(Box::new(MockClassifier {
                recorder: Arc::clone(&recorder),
            }) as BoxedClassifier)
        }),
    )];
    ClassifierRegistry::from_builders(builders)
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn write_fixtures(dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
    let genotype = dir.join("genotype.tsv");
    fs::write(
        &genotype,
        "# simulated annotations\n\
         s1\tF1\tF2\n\
         s2\tF2\tF3\n\
         s3\tF1\tF3\n\
         s4\tF4\n",
    )
    .unwrap();

    let phenotype = dir.join("phenotype.tsv");
    fs::write(
        &phenotype,
        "Identifier\tSporulation\ns1\tYES\ns2\tNO\ns3\tYES\ns4\tNO\n",
    )
    .unwrap();

    let groups = dir.join("groups.tsv");
    fs::write(
        &groups,
        "Identifier\tfamily\torder\ns1\tA\tX\ns2\tA\tX\ns3\tB\tY\ns4\tB\tY\n",
    )
    .unwrap();

    (genotype, phenotype, groups)
}

// ---------------------------------------------------------------------------
// train
// ---------------------------------------------------------------------------

#[test]
fn train_writes_classifier_and_rank_file() {
    let recorder = Arc::new(Recorder::default());
    let registry = mock_registry(&recorder);
    let dir = tempfile::tempdir().unwrap();
    let (genotype, phenotype, _) = write_fixtures(dir.path());
    let out = dir.path().join("sporulation.classifier");

    let task = TrainTask {
        model_type: "mock".to_string(),
        genotype,
        phenotype,
        out: out.clone(),
        weights: true,
        n_features: Some(2),
        params_file: None,
        params: ParamMap::new(),
    };
    run_train(&task, &registry).unwrap();

    let saved: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(saved["model_type"], json!("mock"));
    assert_eq!(saved["format_version"], json!(1));

    let ranking = fs::read_to_string(dir.path().join("sporulation.classifier.rank")).unwrap();
    assert!(ranking.starts_with("Rank\tFeature\tWeight"));
    assert!(ranking.contains("1\tF2\t1.500000"));
    assert!(ranking.contains("2\tF1\t-0.500000"));

    assert_eq!(recorder.builds.lock().unwrap().len(), 1);
    assert_eq!(
        recorder.trains.lock().unwrap().as_slice(),
        &[(true, Some(2))]
    );
}

#[test]
fn train_without_weights_flag_writes_no_rank_file() {
    let recorder = Arc::new(Recorder::default());
    let registry = mock_registry(&recorder);
    let dir = tempfile::tempdir().unwrap();
    let (genotype, phenotype, _) = write_fixtures(dir.path());
    let out = dir.path().join("plain.classifier");

    let task = TrainTask {
        model_type: "mock".to_string(),
        genotype,
        phenotype,
        out: out.clone(),
        weights: false,
        n_features: None,
        params_file: None,
        params: ParamMap::new(),
    };
    run_train(&task, &registry).unwrap();

    assert!(out.exists());
    assert!(!dir.path().join("plain.classifier.rank").exists());
    assert_eq!(
        recorder.trains.lock().unwrap().as_slice(),
        &[(false, None)]
    );
}

#[test]
fn train_merges_parameter_file_over_command_line_values() {
    let recorder = Arc::new(Recorder::default());
    let registry = mock_registry(&recorder);
    let dir = tempfile::tempdir().unwrap();
    let (genotype, phenotype, _) = write_fixtures(dir.path());
    let params_file = dir.path().join("params.json");
    fs::write(&params_file, r#"{"C": 7.0}"#).unwrap();

    let mut params = ParamMap::new();
    params.insert("c".to_string(), json!(2.0));
    let task = TrainTask {
        model_type: "mock".to_string(),
        genotype,
        phenotype,
        out: dir.path().join("merged.classifier"),
        weights: false,
        n_features: None,
        params_file: Some(params_file),
        params,
    };
    run_train(&task, &registry).unwrap();

    let builds = recorder.builds.lock().unwrap();
    assert_eq!(builds.len(), 1);
    assert_eq!(builds[0].get("C"), Some(&json!(7.0)));
    assert!(builds[0].get("c").is_none());
}

#[test]
fn train_loads_data_before_reading_the_parameter_file() {
    let recorder = Arc::new(Recorder::default());
    let registry = mock_registry(&recorder);
    let dir = tempfile::tempdir().unwrap();
    let params_file = dir.path().join("params.json");
    fs::write(&params_file, "not json").unwrap();

    let task = TrainTask {
        model_type: "mock".to_string(),
        genotype: dir.path().join("missing_genotype.tsv"),
        phenotype: dir.path().join("phenotype.tsv"),
        out: dir.path().join("never.classifier"),
        weights: false,
        n_features: None,
        params_file: Some(params_file),
        params: ParamMap::new(),
    };
    let err = run_train(&task, &registry).unwrap_err();

    // With both inputs broken, the data loading failure wins: the parameter
    // file is only read once the training files are in.
    let chain = format!("{:#}", err);
    assert!(chain.contains("Failed to open genotype file"));
    assert!(!chain.contains("parameter file"));
    assert!(recorder.builds.lock().unwrap().is_empty());
}

#[test]
fn train_reports_unknown_model_type() {
    let recorder = Arc::new(Recorder::default());
    let registry = mock_registry(&recorder);
    let dir = tempfile::tempdir().unwrap();
    let (genotype, phenotype, _) = write_fixtures(dir.path());

    let task = TrainTask {
        model_type: "svm".to_string(),
        genotype,
        phenotype,
        out: dir.path().join("never.classifier"),
        weights: false,
        n_features: None,
        params_file: None,
        params: ParamMap::new(),
    };
    let err = run_train(&task, &registry).unwrap_err();
    assert!(err.to_string().contains("Unknown model type"));
}

// ---------------------------------------------------------------------------
// cv
// ---------------------------------------------------------------------------

#[test]
fn cv_records_fold_configuration_and_writes_misclassifications() {
    let recorder = Arc::new(Recorder::default());
    let registry = mock_registry(&recorder);
    let dir = tempfile::tempdir().unwrap();
    let (genotype, phenotype, _) = write_fixtures(dir.path());
    let miscl_out = dir.path().join("misclassifications.tsv");

    let task = CvTask::new(
        "mock".to_string(),
        genotype,
        phenotype,
        3,
        7,
        2,
        None,
        None,
        false,
        None,
        Some(miscl_out.clone()),
        None,
        None,
        ParamMap::new(),
    )
    .unwrap();
    run_cv(&task, &registry).unwrap();

    assert_eq!(recorder.builds.lock().unwrap().len(), 1);
    assert_eq!(
        recorder.cv_calls.lock().unwrap().as_slice(),
        &[(3, 7, false, 2)]
    );

    let table = fs::read_to_string(&miscl_out).unwrap();
    assert!(table.starts_with("Identifier\tTrueLabel\tPredictedLabel\tMisclassificationRate"));
    assert!(table.contains("s2\tNO\tYES\t0.5000"));
    assert!(!table.contains("Group"));
    assert!(!table.contains("s1\t"));
}

#[test]
fn cv_without_output_path_skips_the_misclassification_table() {
    let recorder = Arc::new(Recorder::default());
    let registry = mock_registry(&recorder);
    let dir = tempfile::tempdir().unwrap();
    let (genotype, phenotype, _) = write_fixtures(dir.path());

    let task = CvTask::new(
        "mock".to_string(),
        genotype,
        phenotype,
        5,
        10,
        1,
        None,
        None,
        false,
        None,
        None,
        None,
        None,
        ParamMap::new(),
    )
    .unwrap();
    run_cv(&task, &registry).unwrap();

    // Only the three fixture files should be in the directory afterwards.
    let entries = fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(entries, 3);
}

#[test]
fn cv_optimize_rebuilds_with_discovered_parameters() {
    let recorder = Arc::new(Recorder::default());
    let registry = mock_registry(&recorder);
    let dir = tempfile::tempdir().unwrap();
    let (genotype, phenotype, _) = write_fixtures(dir.path());
    let optimize_out = dir.path().join("best_params.json");

    let mut params = ParamMap::new();
    params.insert("kernel".to_string(), json!("linear"));
    params.insert("C".to_string(), json!(2.0));
    let task = CvTask::new(
        "mock".to_string(),
        genotype,
        phenotype,
        5,
        10,
        1,
        None,
        None,
        true,
        Some(optimize_out.clone()),
        None,
        None,
        None,
        params,
    )
    .unwrap();
    run_cv(&task, &registry).unwrap();

    let builds = recorder.builds.lock().unwrap();
    assert_eq!(builds.len(), 2);
    assert_eq!(builds[0].get("C"), Some(&json!(2.0)));
    assert_eq!(builds[1].get("C"), Some(&json!(99.0)));
    assert_eq!(builds[1].get("kernel"), Some(&json!("linear")));

    let saved: Value = serde_json::from_str(&fs::read_to_string(&optimize_out).unwrap()).unwrap();
    assert_eq!(saved["C"], json!(99.0));
    assert_eq!(saved["kernel"], json!("linear"));
}

#[test]
fn cv_with_groups_runs_grouped_folds_and_reports_groups() {
    let recorder = Arc::new(Recorder::default());
    let registry = mock_registry(&recorder);
    let dir = tempfile::tempdir().unwrap();
    let (genotype, phenotype, groups) = write_fixtures(dir.path());
    let miscl_out = dir.path().join("misclassifications.tsv");

    let task = CvTask::new(
        "mock".to_string(),
        genotype,
        phenotype,
        5,
        10,
        1,
        Some(groups),
        Some("family".to_string()),
        false,
        None,
        Some(miscl_out.clone()),
        None,
        None,
        ParamMap::new(),
    )
    .unwrap();
    run_cv(&task, &registry).unwrap();

    assert_eq!(
        recorder.cv_calls.lock().unwrap().as_slice(),
        &[(5, 10, true, 1)]
    );

    let table = fs::read_to_string(&miscl_out).unwrap();
    assert!(table.starts_with("Identifier\tTrueLabel\tPredictedLabel\tMisclassificationRate\tGroup"));
    assert!(table.contains("s2\tNO\tYES\t0.5000\tA"));
}

// ---------------------------------------------------------------------------
// cccv
// ---------------------------------------------------------------------------

#[test]
fn cccv_writes_nested_accuracy_grid() {
    let recorder = Arc::new(Recorder::default());
    let registry = mock_registry(&recorder);
    let dir = tempfile::tempdir().unwrap();
    let (genotype, phenotype, _) = write_fixtures(dir.path());
    let out = dir.path().join("cccv.json");

    let task = CccvTask::new(
        "mock".to_string(),
        genotype,
        phenotype,
        2,
        1,
        1,
        None,
        false,
        vec![0.0, 0.5],
        vec![0.0],
        out.clone(),
        None,
        None,
        ParamMap::new(),
    )
    .unwrap();
    run_cccv(&task, &registry).unwrap();

    let grid: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(grid["0"]["0"]["score_mean"], json!(1.0));
    assert_eq!(grid["0"]["0"]["score_sd"], json!(0.0));
    assert!(grid["0.5"]["0"].is_object());
}
