//! Model bundle persistence and prediction.
//!
//! The bundle pairs the frozen encoder and the trained forest with the
//! ordered feature column list recorded at training time, and is the single
//! JSON artifact both CLIs operate on. It is immutable once written; loading
//! validates the whole structure before any prediction happens.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encode::{EncodeError, FittedEncoder};
use crate::ml::forest::RandomForestModel;
use crate::schema::FeatureTable;

/// Bundle format version.
pub const BUNDLE_VERSION: i64 = 1;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("Model not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad model artifact: {0}")]
    Malformed(String),
    #[error("schema mismatch: column '{0}' recorded at training time is missing at inference")]
    SchemaMismatch(String),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Serialized pairing of the fitted pipeline with its feature schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    /// Bundle format version.
    pub bundle_version: i64,
    /// Feature column names in training order.
    pub feature_columns: Vec<String>,
    /// Frozen one-hot encoder.
    pub encoder: FittedEncoder,
    /// Trained forest.
    pub forest: RandomForestModel,
}

/// One prediction: the winning label plus the full class distribution.
///
/// Classes absent from the training split are absent from `proba`; callers
/// must not assume every conceivable label appears.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub risk_level: String,
    pub proba: BTreeMap<String, f64>,
}

impl ModelBundle {
    /// Validate structural invariants of the bundle.
    pub fn validate(&self) -> Result<(), String> {
        if self.bundle_version != BUNDLE_VERSION {
            return Err(format!(
                "Unsupported bundle version {} (expected {BUNDLE_VERSION})",
                self.bundle_version
            ));
        }
        if self.feature_columns.is_empty() {
            return Err("Bundle has no feature columns".to_string());
        }
        self.encoder.validate()?;
        self.forest.validate()?;
        if self.encoder.output_len() != self.forest.feature_len {
            return Err(format!(
                "Encoder produces {} columns but forest expects {}",
                self.encoder.output_len(),
                self.forest.feature_len
            ));
        }
        Ok(())
    }

    /// Write the bundle as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), BundleError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let bytes = serde_json::to_vec_pretty(self)
            .map_err(|err| BundleError::Malformed(err.to_string()))?;
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Load and validate a bundle from a JSON file.
    pub fn load(path: &Path) -> Result<Self, BundleError> {
        if !path.is_file() {
            return Err(BundleError::NotFound(path.display().to_string()));
        }
        let bytes = fs::read(path)?;
        let bundle: Self =
            serde_json::from_slice(&bytes).map_err(|err| BundleError::Malformed(err.to_string()))?;
        bundle.validate().map_err(BundleError::Malformed)?;
        Ok(bundle)
    }

    /// Predict labels and class distributions for a batch of raw records.
    ///
    /// Read-only with respect to the bundle; any batch size including 1 is
    /// fine. A feature column recorded at training time but absent from the
    /// input is a hard schema error.
    pub fn predict(&self, table: &FeatureTable) -> Result<Vec<Prediction>, BundleError> {
        for column in &self.feature_columns {
            if table.column_index(column).is_none() {
                return Err(BundleError::SchemaMismatch(column.clone()));
            }
        }
        let encoded = self.encoder.transform(table)?;
        let mut out = Vec::with_capacity(encoded.len());
        for row in &encoded {
            let proba = self.forest.predict_proba(row);
            let class_idx = self.forest.predict_class_index(row);
            let distribution: BTreeMap<String, f64> = self
                .forest
                .classes
                .iter()
                .zip(&proba)
                .map(|(class, &p)| (class.clone(), f64::from(p)))
                .collect();
            out.push(Prediction {
                risk_level: self.forest.classes[class_idx].clone(),
                proba: distribution,
            });
        }
        Ok(out)
    }
}
