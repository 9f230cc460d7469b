//! Readers and writers for the tab-separated flat files the pipelines consume
//! and produce.
//!
//! Input side: genotype files (one record per line, identifier followed by the
//! features present in it), phenotype files (identifier plus a YES/NO trait
//! column) and group files (identifier plus one column per taxonomic rank).
//! Output side: feature rankings, parameter files, misclassification tables
//! and completeness/contamination grids.
use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use csv::StringRecord;
use serde_json::Value;

use crate::config::ParamMap;
use crate::crossval::CccvPoint;
use crate::data_handling::{class_balance, TrainingData, TrainingRecord};
use crate::models::classifier_trait::FeatureWeight;

/// Reads a genotype file: tab-separated, `#` comment lines skipped, first
/// field the record identifier, remaining fields the features present in the
/// record. Rows may differ in length.
pub fn load_genotype_file(path: &Path) -> Result<Vec<(String, Vec<String>)>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_path(path)
        .with_context(|| format!("Failed to open genotype file: {}", path.display()))?;

    let mut records = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result
            .with_context(|| format!("Failed to read genotype row {}", row_idx + 1))?;
        let identifier = record
            .get(0)
            .ok_or_else(|| anyhow!("Empty genotype row {}", row_idx + 1))?
            .trim()
            .to_string();
        if !seen.insert(identifier.clone()) {
            bail!(
                "Duplicate identifier '{}' in genotype file (row {})",
                identifier,
                row_idx + 1
            );
        }
        let features = record
            .iter()
            .skip(1)
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        records.push((identifier, features));
    }
    log::info!("Loaded {} genotype records from {}", records.len(), path.display());
    Ok(records)
}

/// Reads a phenotype file: tab-separated with a two-column header, the second
/// header field naming the trait. Labels are YES/NO, case-insensitive.
/// Returns the trait name and the identifier-to-label map.
pub fn load_phenotype_file(path: &Path) -> Result<(String, HashMap<String, bool>)> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open phenotype file: {}", path.display()))?;

    let headers = reader
        .headers()
        .context("Failed to read phenotype header row")?
        .clone();
    if headers.len() != 2 {
        bail!(
            "Phenotype file must have exactly two columns (identifier and trait), found {}",
            headers.len()
        );
    }
    let trait_name = headers
        .get(1)
        .unwrap_or_default()
        .trim()
        .to_string();
    if trait_name.is_empty() {
        bail!("Phenotype file header does not name the trait");
    }

    let mut labels = HashMap::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result
            .with_context(|| format!("Failed to read phenotype row {}", row_idx + 2))?;
        let identifier = record.get(0).unwrap_or_default().trim().to_string();
        let label = parse_label(record.get(1).unwrap_or_default()).ok_or_else(|| {
            anyhow!(
                "Invalid label '{}' for '{}' in phenotype file (row {}); expected YES or NO",
                record.get(1).unwrap_or_default(),
                identifier,
                row_idx + 2
            )
        })?;
        if labels.insert(identifier.clone(), label).is_some() {
            bail!(
                "Duplicate identifier '{}' in phenotype file (row {})",
                identifier,
                row_idx + 2
            );
        }
    }
    log::info!(
        "Loaded {} phenotype labels for trait '{}' from {}",
        labels.len(),
        trait_name,
        path.display()
    );
    Ok((trait_name, labels))
}

/// Reads a group file: tab-separated with a header whose first column is the
/// identifier and whose remaining columns are named ranks. `rank` selects the
/// column (case-insensitive); `None` uses the first rank column.
pub fn load_groups_file(path: &Path, rank: Option<&str>) -> Result<HashMap<String, String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open groups file: {}", path.display()))?;

    let headers = reader
        .headers()
        .context("Failed to read groups header row")?
        .clone();
    if headers.len() < 2 {
        bail!("Groups file must have an identifier column and at least one rank column");
    }

    let rank_idx = match rank {
        Some(name) => find_column(&headers, name).ok_or_else(|| {
            anyhow!(
                "Rank '{}' not found in groups file; available ranks: {}",
                name,
                headers.iter().skip(1).collect::<Vec<_>>().join(", ")
            )
        })?,
        None => 1,
    };
    if rank_idx == 0 {
        bail!("Rank column cannot be the identifier column");
    }

    let mut groups = HashMap::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result
            .with_context(|| format!("Failed to read groups row {}", row_idx + 2))?;
        let identifier = record.get(0).unwrap_or_default().trim().to_string();
        let group = record
            .get(rank_idx)
            .ok_or_else(|| anyhow!("Missing rank value in groups file (row {})", row_idx + 2))?
            .trim()
            .to_string();
        if group.is_empty() {
            bail!("Empty rank value for '{}' in groups file (row {})", identifier, row_idx + 2);
        }
        groups.insert(identifier, group);
    }
    log::info!(
        "Loaded group assignments for {} records (rank column '{}') from {}",
        groups.len(),
        headers.get(rank_idx).unwrap_or_default(),
        path.display()
    );
    Ok(groups)
}

/// Loads and joins the training inputs into a single dataset.
///
/// Records present in only one of the genotype and phenotype files are
/// dropped with a warning; an empty intersection is an error. When a groups
/// file is given, every retained record must carry a group assignment and the
/// resulting dataset supports leave-one-group-out cross-validation.
pub fn load_training_files(
    genotype: &Path,
    phenotype: &Path,
    groups: Option<&Path>,
    rank: Option<&str>,
) -> Result<TrainingData> {
    let genotype_records = load_genotype_file(genotype)?;
    let (trait_name, labels) = load_phenotype_file(phenotype)?;
    let group_map = match groups {
        Some(path) => Some(load_groups_file(path, rank)?),
        None => None,
    };

    let mut feature_names: Vec<String> = Vec::new();
    let mut feature_index: HashMap<String, usize> = HashMap::new();
    let mut records = Vec::new();
    let mut unlabelled = 0usize;

    for (identifier, features) in genotype_records {
        let Some(&label) = labels.get(&identifier) else {
            unlabelled += 1;
            continue;
        };
        let group = match &group_map {
            Some(map) => Some(
                map.get(&identifier)
                    .ok_or_else(|| {
                        anyhow!("Record '{}' has no entry in the groups file", identifier)
                    })?
                    .clone(),
            ),
            None => None,
        };

        let mut indices: Vec<usize> = features
            .iter()
            .map(|name| {
                *feature_index.entry(name.clone()).or_insert_with(|| {
                    feature_names.push(name.clone());
                    feature_names.len() - 1
                })
            })
            .collect();
        indices.sort_unstable();
        indices.dedup();

        records.push(TrainingRecord {
            identifier,
            features: indices,
            label,
            group,
        });
    }

    if unlabelled > 0 {
        log::warn!(
            "Dropped {} genotype records without a phenotype label",
            unlabelled
        );
    }
    let orphan_labels = labels.len() - records.len();
    if orphan_labels > 0 {
        log::warn!(
            "{} phenotype labels have no matching genotype record",
            orphan_labels
        );
    }
    if records.is_empty() {
        bail!("Genotype and phenotype files share no record identifiers");
    }

    let (positives, negatives) =
        class_balance(&records.iter().map(|r| r.label).collect::<Vec<_>>());
    log::info!(
        "Training set for trait '{}': {} records over {} features ({} positive, {} negative)",
        trait_name,
        records.len(),
        feature_names.len(),
        positives,
        negatives
    );
    Ok(TrainingData {
        trait_name,
        feature_names,
        records,
    })
}

/// Writes a feature ranking: rank, feature name and signed weight per line.
pub fn write_weights_file(path: &Path, weights: &[FeatureWeight]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .with_context(|| format!("Failed to create weights file: {}", path.display()))?;
    writer.write_record(["Rank", "Feature", "Weight"])?;
    for (rank, entry) in weights.iter().enumerate() {
        writer.write_record([
            (rank + 1).to_string(),
            entry.feature.clone(),
            format!("{:.6}", entry.weight),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes a parameter map as pretty-printed JSON.
pub fn write_params_file(path: &Path, params: &ParamMap) -> Result<()> {
    let json = serde_json::to_string_pretty(params)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write parameters to {}", path.display()))?;
    Ok(())
}

/// Reads a parameter file; the file must contain a single JSON object.
pub fn load_params_file(path: &Path) -> Result<ParamMap> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read parameter file: {}", path.display()))?;
    let value: Value = serde_json::from_str(&json)
        .with_context(|| format!("Malformed JSON in parameter file: {}", path.display()))?;
    let Value::Object(object) = value else {
        bail!(
            "Parameter file {} must contain a JSON object",
            path.display()
        );
    };
    Ok(object.into_iter().collect())
}

/// Writes the records that were misclassified at least once during
/// cross-validation, with their true and predicted labels and their
/// misclassification rates. On a binary task a misclassified record was
/// predicted as the opposite of its true label. The `use_groups` flag records
/// whether the rates came from grouped folds and adds the group column.
pub fn write_misclassifications_file(
    path: &Path,
    data: &TrainingData,
    rates: &[f64],
    use_groups: bool,
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .with_context(|| format!("Failed to create misclassifications file: {}", path.display()))?;

    if use_groups {
        writer.write_record([
            "Identifier",
            "TrueLabel",
            "PredictedLabel",
            "MisclassificationRate",
            "Group",
        ])?;
    } else {
        writer.write_record(["Identifier", "TrueLabel", "PredictedLabel", "MisclassificationRate"])?;
    }

    for (record, &rate) in data.records.iter().zip(rates) {
        if rate <= 0.0 {
            continue;
        }
        let (true_label, predicted_label) = if record.label { ("YES", "NO") } else { ("NO", "YES") };
        let rate_text = format!("{:.4}", rate);
        if use_groups {
            writer.write_record([
                record.identifier.as_str(),
                true_label,
                predicted_label,
                rate_text.as_str(),
                record.group.as_deref().unwrap_or(""),
            ])?;
        } else {
            writer.write_record([
                record.identifier.as_str(),
                true_label,
                predicted_label,
                rate_text.as_str(),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Writes a completeness/contamination grid as nested JSON: completeness
/// level, then contamination level, then the score summary.
pub fn write_cccv_accuracy_file(path: &Path, grid: &[CccvPoint]) -> Result<()> {
    let mut outer = serde_json::Map::new();
    for point in grid {
        let inner = outer
            .entry(point.comple.to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        if let Value::Object(by_conta) = inner {
            by_conta.insert(
                point.conta.to_string(),
                serde_json::json!({
                    "score_mean": point.score_mean,
                    "score_sd": point.score_sd,
                }),
            );
        }
    }
    let json = serde_json::to_string_pretty(&Value::Object(outer))?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write accuracy grid to {}", path.display()))?;
    Ok(())
}

fn parse_label(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "YES" => Some(true),
        "NO" => Some(false),
        _ => None,
    }
}

/// Case-insensitive header lookup.
fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.trim().eq_ignore_ascii_case(name))
}
