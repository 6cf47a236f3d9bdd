//! One-hot feature encoder.
//!
//! Fit exactly once against the training split, then frozen: the learned
//! category vocabulary never changes afterwards and travels inside the model
//! bundle so inference reproduces the training-time column mapping.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::FeatureTable;

#[derive(Debug, Error)]
pub enum EncodeError {
    /// A column required by the fitted schema is absent from the input.
    #[error("feature column '{0}' missing from input")]
    MissingColumn(String),
    #[error("column '{column}' row {row}: expected a {expected} value")]
    WrongKind {
        column: String,
        row: usize,
        expected: &'static str,
    },
    #[error("cannot fit encoder on an empty table")]
    EmptyFit,
}

/// A categorical column with the vocabulary learned at fit time, sorted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub name: String,
    pub categories: Vec<String>,
}

/// Frozen encoder state: one one-hot block per categorical column (in schema
/// order, vocabularies sorted), followed by numeric passthrough columns.
///
/// A category never seen at fit time encodes as an all-zero block rather
/// than an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedEncoder {
    pub categorical: Vec<CategoricalColumn>,
    pub numeric: Vec<String>,
}

impl FittedEncoder {
    /// Learn category vocabularies from the training split.
    pub fn fit(
        table: &FeatureTable,
        categorical: &[&str],
        numeric: &[&str],
    ) -> Result<Self, EncodeError> {
        if table.rows.is_empty() {
            return Err(EncodeError::EmptyFit);
        }
        let mut cat_columns = Vec::with_capacity(categorical.len());
        for &name in categorical {
            let idx = table
                .column_index(name)
                .ok_or_else(|| EncodeError::MissingColumn(name.to_string()))?;
            let mut seen = BTreeSet::new();
            for (row_idx, row) in table.rows.iter().enumerate() {
                let value = row[idx].as_category().ok_or(EncodeError::WrongKind {
                    column: name.to_string(),
                    row: row_idx,
                    expected: "categorical",
                })?;
                seen.insert(value.to_string());
            }
            cat_columns.push(CategoricalColumn {
                name: name.to_string(),
                categories: seen.into_iter().collect(),
            });
        }
        let mut num_columns = Vec::with_capacity(numeric.len());
        for &name in numeric {
            let idx = table
                .column_index(name)
                .ok_or_else(|| EncodeError::MissingColumn(name.to_string()))?;
            for (row_idx, row) in table.rows.iter().enumerate() {
                if row[idx].as_number().is_none() {
                    return Err(EncodeError::WrongKind {
                        column: name.to_string(),
                        row: row_idx,
                        expected: "numeric",
                    });
                }
            }
            num_columns.push(name.to_string());
        }
        Ok(Self {
            categorical: cat_columns,
            numeric: num_columns,
        })
    }

    /// Width of the encoded feature vectors this encoder produces.
    pub fn output_len(&self) -> usize {
        let cat: usize = self.categorical.iter().map(|c| c.categories.len()).sum();
        cat + self.numeric.len()
    }

    /// Validate structural invariants of the frozen state.
    pub fn validate(&self) -> Result<(), String> {
        if self.categorical.is_empty() && self.numeric.is_empty() {
            return Err("Encoder has no columns".to_string());
        }
        for column in &self.categorical {
            if column.categories.is_empty() {
                return Err(format!("Column '{}' has an empty vocabulary", column.name));
            }
            if !column.categories.is_sorted() {
                return Err(format!("Column '{}' vocabulary is not sorted", column.name));
            }
        }
        Ok(())
    }

    /// Encode a table into row-major `f32` vectors.
    ///
    /// Pure with respect to the fitted state. A missing column is a hard
    /// schema error; an unseen category value is not.
    pub fn transform(&self, table: &FeatureTable) -> Result<Vec<Vec<f32>>, EncodeError> {
        let mut cat_indices = Vec::with_capacity(self.categorical.len());
        for column in &self.categorical {
            let idx = table
                .column_index(&column.name)
                .ok_or_else(|| EncodeError::MissingColumn(column.name.clone()))?;
            cat_indices.push(idx);
        }
        let mut num_indices = Vec::with_capacity(self.numeric.len());
        for name in &self.numeric {
            let idx = table
                .column_index(name)
                .ok_or_else(|| EncodeError::MissingColumn(name.clone()))?;
            num_indices.push(idx);
        }

        let width = self.output_len();
        let mut out = Vec::with_capacity(table.rows.len());
        for (row_idx, row) in table.rows.iter().enumerate() {
            let mut encoded = Vec::with_capacity(width);
            for (column, &idx) in self.categorical.iter().zip(&cat_indices) {
                let value = row[idx].as_category().ok_or(EncodeError::WrongKind {
                    column: column.name.clone(),
                    row: row_idx,
                    expected: "categorical",
                })?;
                let hit = column.categories.binary_search_by(|c| c.as_str().cmp(value)).ok();
                for slot in 0..column.categories.len() {
                    encoded.push(if hit == Some(slot) { 1.0 } else { 0.0 });
                }
            }
            for (name, &idx) in self.numeric.iter().zip(&num_indices) {
                let value = row[idx].as_number().ok_or(EncodeError::WrongKind {
                    column: name.clone(),
                    row: row_idx,
                    expected: "numeric",
                })?;
                encoded.push(value as f32);
            }
            out.push(encoded);
        }
        Ok(out)
    }
}
