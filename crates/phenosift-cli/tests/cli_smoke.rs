//! CLI binary smoke tests using assert_cmd.
//!
//! These tests exercise the compiled `phenosift` binary to verify that
//! argument parsing, help text, and error handling work end-to-end, plus a
//! few small real training runs on synthetic datasets.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("phenosift").unwrap()
}

/// A linearly separable dataset: positives carry `markerA`, negatives carry
/// `markerB`, and everyone shares two background features.
fn write_dataset(dir: &Path) -> (PathBuf, PathBuf) {
    let genotype = dir.join("genotype.tsv");
    let mut rows = String::new();
    for i in 0..5 {
        rows.push_str(&format!("pos{}\tmarkerA\tshared{}\n", i, i % 2));
    }
    for i in 0..5 {
        rows.push_str(&format!("neg{}\tmarkerB\tshared{}\n", i, i % 2));
    }
    fs::write(&genotype, rows).unwrap();

    let phenotype = dir.join("phenotype.tsv");
    let mut table = String::from("Identifier\tMotility\n");
    for i in 0..5 {
        table.push_str(&format!("pos{}\tYES\n", i));
    }
    for i in 0..5 {
        table.push_str(&format!("neg{}\tNO\n", i));
    }
    fs::write(&phenotype, table).unwrap();

    (genotype, phenotype)
}

// ---------------------------------------------------------------------------
// Top-level
// ---------------------------------------------------------------------------

#[test]
fn no_args_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_flag_lists_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("train"))
        .stdout(predicate::str::contains("cv"))
        .stdout(predicate::str::contains("cccv"));
}

#[test]
fn version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("phenosift"));
}

#[test]
fn cv_help_describes_grouped_folds() {
    // Grouped mode builds one fold per group and reruns them each replicate,
    // so it is the fold count that has no effect, not the replicate count.
    cmd()
        .args(["cv", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("the fold count is ignored"))
        .stdout(predicate::str::contains("replicates are ignored").not());
}

// ---------------------------------------------------------------------------
// Argument validation
// ---------------------------------------------------------------------------

#[test]
fn train_without_required_args_errors() {
    cmd()
        .arg("train")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn train_rejects_unknown_model_family() {
    cmd()
        .args(["train", "-m", "forest"])
        .args(["-g", "/nonexistent/g.tsv", "-p", "/nonexistent/p.tsv"])
        .args(["-o", "/nonexistent/out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn cv_optimize_without_destination_errors() {
    cmd()
        .args(["cv", "-m", "svm"])
        .args(["-g", "/nonexistent/g.tsv", "-p", "/nonexistent/p.tsv"])
        .arg("--optimize")
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires a path"));
}

#[test]
fn cccv_rejects_groups_before_touching_files() {
    // The rejection must come from task validation, not from a missing file.
    cmd()
        .args(["cccv", "-m", "svm"])
        .args(["-g", "/nonexistent/g.tsv", "-p", "/nonexistent/p.tsv"])
        .args(["-o", "/nonexistent/out.json"])
        .args(["--groups", "/nonexistent/groups.tsv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not supported"));
}

#[test]
fn cccv_rejects_optimize_before_touching_files() {
    cmd()
        .args(["cccv", "-m", "svm"])
        .args(["-g", "/nonexistent/g.tsv", "-p", "/nonexistent/p.tsv"])
        .args(["-o", "/nonexistent/out.json"])
        .arg("--optimize")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not supported"));
}

#[test]
fn train_with_missing_genotype_file_fails() {
    cmd()
        .args(["train", "-m", "xgb"])
        .args(["-g", "/nonexistent/g.tsv", "-p", "/nonexistent/p.tsv"])
        .args(["-o", "/nonexistent/out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open genotype file"));
}

// ---------------------------------------------------------------------------
// End-to-end runs
// ---------------------------------------------------------------------------

#[test]
fn train_produces_classifier_and_weights() {
    let dir = tempfile::tempdir().unwrap();
    let (genotype, phenotype) = write_dataset(dir.path());
    let out = dir.path().join("motility.classifier");

    cmd()
        .arg("train")
        .args(["-m", "xgb"])
        .arg("-g")
        .arg(&genotype)
        .arg("-p")
        .arg(&phenotype)
        .arg("-o")
        .arg(&out)
        .arg("--weights")
        .args(["--param", "max_depth=3"])
        .assert()
        .success();

    assert!(out.exists());
    let rank_path = dir.path().join("motility.classifier.rank");
    let ranking = fs::read_to_string(&rank_path).unwrap();
    assert!(ranking.starts_with("Rank\tFeature\tWeight"));
    assert!(ranking.contains("markerA"));
}

#[test]
fn cv_reports_score() {
    let dir = tempfile::tempdir().unwrap();
    let (genotype, phenotype) = write_dataset(dir.path());

    cmd()
        .arg("cv")
        .args(["-m", "xgb"])
        .arg("-g")
        .arg(&genotype)
        .arg("-p")
        .arg(&phenotype)
        .args(["--folds", "5", "--replicates", "2"])
        .assert()
        .success()
        .stderr(predicate::str::contains("CV score"));
}

#[test]
fn cccv_writes_parseable_grid() {
    let dir = tempfile::tempdir().unwrap();
    let (genotype, phenotype) = write_dataset(dir.path());
    let out = dir.path().join("cccv.json");

    cmd()
        .arg("cccv")
        .args(["-m", "xgb"])
        .arg("-g")
        .arg(&genotype)
        .arg("-p")
        .arg(&phenotype)
        .args(["--folds", "2", "--replicates", "1"])
        .args(["--comple-steps", "0.0,1.0", "--conta-steps", "0.0"])
        .arg("-o")
        .arg(&out)
        .assert()
        .success();

    let grid: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert!(grid["1"]["0"]["score_mean"].is_number());
    assert!(grid["0"]["0"]["score_sd"].is_number());
}
