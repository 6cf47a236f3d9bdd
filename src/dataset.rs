//! CSV dataset loading and stratified train/test splitting.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;

use crate::schema::{CATEGORICAL_FEATURES, FeatureTable, FeatureValue, TARGET_COLUMN};

/// Minimum rows per label class required before splitting, so the held-out
/// side always receives at least one example of every class.
pub const MIN_ROWS_PER_CLASS: usize = 5;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Dataset not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Dataset must contain a 'risk_level' target column")]
    MissingTarget,
    #[error("Dataset has a header but no data rows")]
    Empty,
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("class '{class}' has {rows} rows; need at least {min} per class")]
    TooFewRows {
        class: String,
        rows: usize,
        min: usize,
    },
    #[error("Invalid split fraction (need 0 < test_fraction < 1)")]
    InvalidSplit,
}

/// Labeled dataset loaded from a CSV file.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Feature column names in header order, target column excluded.
    pub feature_columns: Vec<String>,
    /// Feature rows aligned with `labels`.
    pub features: FeatureTable,
    /// Target label per row.
    pub labels: Vec<String>,
}

impl Dataset {
    /// Enumerate unique label classes in deterministic order.
    pub fn class_ids(&self) -> Vec<String> {
        let set: BTreeSet<&String> = self.labels.iter().collect();
        set.into_iter().cloned().collect()
    }

    /// Materialize the subset of rows selected by `indices`.
    pub fn subset(&self, indices: &[usize]) -> (FeatureTable, Vec<String>) {
        let rows = indices
            .iter()
            .map(|&i| self.features.rows[i].clone())
            .collect();
        let labels = indices.iter().map(|&i| self.labels[i].clone()).collect();
        (
            FeatureTable {
                columns: self.features.columns.clone(),
                rows,
            },
            labels,
        )
    }
}

/// Load a labeled dataset from a CSV file with a header row.
///
/// The header must contain the `risk_level` target column; every other
/// column becomes a feature column in header order. A missing file or a
/// missing target column is fatal.
pub fn load_dataset(path: &Path) -> Result<Dataset, DatasetError> {
    if !path.is_file() {
        return Err(DatasetError::NotFound(path.display().to_string()));
    }
    let text = fs::read_to_string(path)?;
    parse_dataset(&text)
}

fn parse_dataset(text: &str) -> Result<Dataset, DatasetError> {
    let mut lines = text.lines().enumerate();
    let header = loop {
        match lines.next() {
            Some((_, line)) if line.trim().is_empty() => continue,
            Some((_, line)) => break line,
            None => return Err(DatasetError::MissingTarget),
        }
    };
    let columns: Vec<String> = header.split(',').map(|c| c.trim().to_string()).collect();
    let target_idx = columns
        .iter()
        .position(|c| c == TARGET_COLUMN)
        .ok_or(DatasetError::MissingTarget)?;
    let feature_columns: Vec<String> = columns
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != target_idx)
        .map(|(_, name)| name.clone())
        .collect();

    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for (line_idx, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let cells: Vec<&str> = line.split(',').map(|c| c.trim()).collect();
        if cells.len() != columns.len() {
            return Err(DatasetError::Parse {
                line: line_idx + 1,
                message: format!(
                    "expected {} cells, found {}",
                    columns.len(),
                    cells.len()
                ),
            });
        }
        let mut row = Vec::with_capacity(feature_columns.len());
        for (idx, cell) in cells.iter().enumerate() {
            if idx == target_idx {
                labels.push((*cell).to_string());
                continue;
            }
            row.push(parse_cell(&columns[idx], cell));
        }
        rows.push(row);
    }
    if rows.is_empty() {
        return Err(DatasetError::Empty);
    }

    Ok(Dataset {
        features: FeatureTable {
            columns: feature_columns.clone(),
            rows,
        },
        feature_columns,
        labels,
    })
}

fn parse_cell(column: &str, cell: &str) -> FeatureValue {
    if CATEGORICAL_FEATURES.contains(&column) {
        return FeatureValue::Category(cell.to_string());
    }
    match cell.parse::<f64>() {
        Ok(v) => FeatureValue::Number(v),
        Err(_) => FeatureValue::Category(cell.to_string()),
    }
}

/// Row indices selected for each side of a split.
#[derive(Debug, Clone)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split row indices into train/test subsets, preserving per-class
/// proportions. Deterministic for a fixed seed. Fails fast when any class
/// has fewer than [`MIN_ROWS_PER_CLASS`] rows.
pub fn stratified_split(
    labels: &[String],
    test_fraction: f64,
    seed: u64,
) -> Result<SplitIndices, DatasetError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(DatasetError::InvalidSplit);
    }
    let mut by_class: BTreeMap<&String, Vec<usize>> = BTreeMap::new();
    for (idx, label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(idx);
    }
    for (class, indices) in &by_class {
        if indices.len() < MIN_ROWS_PER_CLASS {
            return Err(DatasetError::TooFewRows {
                class: (*class).clone(),
                rows: indices.len(),
                min: MIN_ROWS_PER_CLASS,
            });
        }
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();
    for (_class, mut indices) in by_class {
        indices.shuffle(&mut rng);
        let n = indices.len();
        let mut test_n = ((n as f64) * test_fraction).round() as usize;
        test_n = test_n.clamp(1, n - 1);
        test.extend_from_slice(&indices[..test_n]);
        train.extend_from_slice(&indices[test_n..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    Ok(SplitIndices { train, test })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_csv() -> String {
        let mut text = String::from(
            "noshow_count,reservation_count,weekday,hour,party_size,payment_method,risk_level\n",
        );
        for i in 0..6 {
            text.push_str(&format!("{i},10,Friday,19,4,credit_card,high\n"));
            text.push_str(&format!("{i},20,Monday,12,2,cash,low\n"));
        }
        text
    }

    #[test]
    fn parses_header_and_rows() {
        let dataset = parse_dataset(&sample_csv()).unwrap();
        assert_eq!(
            dataset.feature_columns,
            vec![
                "noshow_count",
                "reservation_count",
                "weekday",
                "hour",
                "party_size",
                "payment_method"
            ]
        );
        assert_eq!(dataset.labels.len(), 12);
        assert_eq!(dataset.class_ids(), vec!["high", "low"]);
        let weekday_idx = dataset.features.column_index("weekday").unwrap();
        assert_eq!(
            dataset.features.rows[0][weekday_idx].as_category(),
            Some("Friday")
        );
    }

    #[test]
    fn missing_target_column_is_fatal() {
        let text = "noshow_count,weekday\n1,Friday\n";
        assert!(matches!(
            parse_dataset(text),
            Err(DatasetError::MissingTarget)
        ));
    }

    #[test]
    fn ragged_row_is_a_parse_error() {
        let mut text = sample_csv();
        text.push_str("1,2,Friday\n");
        assert!(matches!(
            parse_dataset(&text),
            Err(DatasetError::Parse { .. })
        ));
    }

    #[test]
    fn split_is_stratified_and_deterministic() {
        let labels: Vec<String> = (0..30)
            .map(|i| if i % 3 == 0 { "high" } else { "low" }.to_string())
            .collect();
        let a = stratified_split(&labels, 0.2, 42).unwrap();
        let b = stratified_split(&labels, 0.2, 42).unwrap();
        assert_eq!(a.train, b.train);
        assert_eq!(a.test, b.test);
        assert_eq!(a.train.len() + a.test.len(), labels.len());
        let test_high = a.test.iter().filter(|&&i| labels[i] == "high").count();
        let test_low = a.test.iter().filter(|&&i| labels[i] == "low").count();
        assert_eq!(test_high, 2);
        assert_eq!(test_low, 4);
    }

    #[test]
    fn split_rejects_tiny_classes() {
        let mut labels = vec!["high".to_string(); 10];
        labels.push("rare".to_string());
        let err = stratified_split(&labels, 0.2, 42).unwrap_err();
        assert!(matches!(err, DatasetError::TooFewRows { .. }));
    }
}
