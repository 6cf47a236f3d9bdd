//! Feature table types and the fixed reservation feature schema.

/// Name of the label column in training datasets.
pub const TARGET_COLUMN: &str = "risk_level";

/// Categorical feature columns, expanded via one-hot encoding.
pub const CATEGORICAL_FEATURES: [&str; 2] = ["weekday", "payment_method"];

/// Numeric feature columns, passed through unscaled.
pub const NUMERIC_FEATURES: [&str; 4] = [
    "noshow_count",
    "reservation_count",
    "hour",
    "party_size",
];

/// One cell of a feature table.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Number(f64),
    Category(String),
}

impl FeatureValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(v) => Some(*v),
            FeatureValue::Category(_) => None,
        }
    }

    pub fn as_category(&self) -> Option<&str> {
        match self {
            FeatureValue::Number(_) => None,
            FeatureValue::Category(v) => Some(v.as_str()),
        }
    }
}

/// Column-named table of raw feature records, shared by training and
/// inference. Rows are aligned with `columns`.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<FeatureValue>>,
}

impl FeatureTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }
}

/// Build a single-row table for one reservation, in canonical column order.
pub fn single_record(
    noshow_count: u32,
    reservation_count: u32,
    weekday: &str,
    hour: i64,
    party_size: u32,
    payment_method: &str,
) -> FeatureTable {
    FeatureTable {
        columns: vec![
            "noshow_count".to_string(),
            "reservation_count".to_string(),
            "weekday".to_string(),
            "hour".to_string(),
            "party_size".to_string(),
            "payment_method".to_string(),
        ],
        rows: vec![vec![
            FeatureValue::Number(f64::from(noshow_count)),
            FeatureValue::Number(f64::from(reservation_count)),
            FeatureValue::Category(weekday.to_string()),
            FeatureValue::Number(hour as f64),
            FeatureValue::Number(f64::from(party_size)),
            FeatureValue::Category(payment_method.to_string()),
        ]],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_record_matches_schema() {
        let table = single_record(3, 10, "Friday", 19, 4, "credit_card");
        assert_eq!(table.n_rows(), 1);
        assert_eq!(table.columns.len(), 6);
        for name in CATEGORICAL_FEATURES {
            let idx = table.column_index(name).unwrap();
            assert!(table.rows[0][idx].as_category().is_some());
        }
        for name in NUMERIC_FEATURES {
            let idx = table.column_index(name).unwrap();
            assert!(table.rows[0][idx].as_number().is_some());
        }
    }
}
