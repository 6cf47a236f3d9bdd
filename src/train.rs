//! End-to-end training flow: split, fit encoder, fit forest, evaluate.

use std::collections::BTreeMap;

use tracing::info;

use crate::bundle::{BUNDLE_VERSION, ModelBundle};
use crate::dataset::{Dataset, stratified_split};
use crate::encode::FittedEncoder;
use crate::ml::forest::{TrainDataset, TrainOptions, train_random_forest};
use crate::ml::metrics::{
    ConfusionMatrix, PerClassStats, accuracy, precision_recall_by_class,
};
use crate::schema::{CATEGORICAL_FEATURES, FeatureTable, NUMERIC_FEATURES};

/// Options for the whole training flow.
#[derive(Debug, Clone)]
pub struct TrainFlowOptions {
    /// Fraction of rows held out for evaluation.
    pub test_fraction: f64,
    /// Forest hyperparameters; the forest seed also seeds the split.
    pub forest: TrainOptions,
}

impl Default for TrainFlowOptions {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            forest: TrainOptions::default(),
        }
    }
}

/// Held-out evaluation of a freshly trained bundle. Diagnostic only; it has
/// no effect on the persisted artifact.
#[derive(Debug, Clone)]
pub struct EvalReport {
    pub accuracy: f32,
    pub classes: Vec<String>,
    pub per_class: Vec<PerClassStats>,
    pub confusion: ConfusionMatrix,
}

/// Train a model bundle on a labeled dataset and evaluate it on a stratified
/// held-out split.
pub fn train_bundle(
    dataset: &Dataset,
    options: &TrainFlowOptions,
) -> Result<(ModelBundle, EvalReport), String> {
    let classes = dataset.class_ids();
    let class_map: BTreeMap<&String, usize> =
        classes.iter().enumerate().map(|(idx, c)| (c, idx)).collect();

    let split = stratified_split(&dataset.labels, options.test_fraction, options.forest.seed)
        .map_err(|err| err.to_string())?;
    let (train_table, train_labels) = dataset.subset(&split.train);
    let (test_table, test_labels) = dataset.subset(&split.test);
    info!(
        train_rows = split.train.len(),
        test_rows = split.test.len(),
        classes = classes.len(),
        "dataset split"
    );

    let encoder = FittedEncoder::fit(&train_table, &CATEGORICAL_FEATURES, &NUMERIC_FEATURES)
        .map_err(|err| err.to_string())?;
    let x = encoder.transform(&train_table).map_err(|err| err.to_string())?;
    let y = class_indices(&train_labels, &class_map)?;

    let forest = train_random_forest(
        &TrainDataset {
            feature_len: encoder.output_len(),
            classes: classes.clone(),
            x,
            y,
        },
        &options.forest,
    )?;

    let report = evaluate(&encoder, &forest, &test_table, &test_labels, &class_map, classes.clone())?;
    info!(accuracy = report.accuracy, "held-out evaluation");

    let bundle = ModelBundle {
        bundle_version: BUNDLE_VERSION,
        feature_columns: dataset.feature_columns.clone(),
        encoder,
        forest,
    };
    bundle.validate()?;
    Ok((bundle, report))
}

fn class_indices(
    labels: &[String],
    class_map: &BTreeMap<&String, usize>,
) -> Result<Vec<usize>, String> {
    labels
        .iter()
        .map(|label| {
            class_map
                .get(label)
                .copied()
                .ok_or_else(|| format!("Unknown label class '{label}'"))
        })
        .collect()
}

fn evaluate(
    encoder: &FittedEncoder,
    forest: &crate::ml::forest::RandomForestModel,
    test_table: &FeatureTable,
    test_labels: &[String],
    class_map: &BTreeMap<&String, usize>,
    classes: Vec<String>,
) -> Result<EvalReport, String> {
    let encoded = encoder.transform(test_table).map_err(|err| err.to_string())?;
    let mut cm = ConfusionMatrix::new(classes.len());
    for (row, label) in encoded.iter().zip(test_labels) {
        let truth = class_map
            .get(label)
            .copied()
            .ok_or_else(|| format!("Unknown label class '{label}'"))?;
        cm.add(truth, forest.predict_class_index(row));
    }
    let acc = accuracy(&cm);
    let per_class = precision_recall_by_class(&cm);
    Ok(EvalReport {
        accuracy: acc,
        classes,
        per_class,
        confusion: cm,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::single_record;

    fn synthetic_dataset() -> Dataset {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20u32 {
            rows.push(
                single_record(5 + i % 3, 2, "Friday", 20, 6, "cash")
                    .rows
                    .remove(0),
            );
            labels.push("high".to_string());
            rows.push(
                single_record(1 + i % 2, 8, "Tuesday", 13, 2, "credit_card")
                    .rows
                    .remove(0),
            );
            labels.push("medium".to_string());
            rows.push(
                single_record(0, 15 + i % 4, "Monday", 11, 2, "credit_card")
                    .rows
                    .remove(0),
            );
            labels.push("low".to_string());
        }
        let columns = single_record(0, 0, "x", 0, 0, "x").columns;
        Dataset {
            feature_columns: columns.clone(),
            features: FeatureTable { columns, rows },
            labels,
        }
    }

    fn fast_options() -> TrainFlowOptions {
        TrainFlowOptions {
            forest: TrainOptions {
                n_trees: 30,
                ..TrainOptions::default()
            },
            ..TrainFlowOptions::default()
        }
    }

    #[test]
    fn trains_and_reports_three_classes() {
        let dataset = synthetic_dataset();
        let (bundle, report) = train_bundle(&dataset, &fast_options()).unwrap();
        assert_eq!(report.classes, vec!["high", "low", "medium"]);
        assert_eq!(report.per_class.len(), 3);
        assert!(report.accuracy >= 0.0 && report.accuracy <= 1.0);
        assert_eq!(bundle.forest.classes, report.classes);
        assert_eq!(bundle.feature_columns, dataset.feature_columns);
    }

    #[test]
    fn repeated_training_is_identical() {
        let dataset = synthetic_dataset();
        let (a, _) = train_bundle(&dataset, &fast_options()).unwrap();
        let (b, _) = train_bundle(&dataset, &fast_options()).unwrap();
        assert_eq!(a.encoder.categorical[0].categories, b.encoder.categorical[0].categories);
        let record = single_record(3, 10, "Friday", 19, 4, "credit_card");
        let pa = a.predict(&record).unwrap();
        let pb = b.predict(&record).unwrap();
        assert_eq!(pa[0].risk_level, pb[0].risk_level);
        assert_eq!(pa[0].proba, pb[0].proba);
    }

    #[test]
    fn unseen_feature_value_still_predicts() {
        let dataset = synthetic_dataset();
        let (bundle, _) = train_bundle(&dataset, &fast_options()).unwrap();
        let record = single_record(3, 10, "Friday", 19, 4, "crypto_xyz");
        let predictions = bundle.predict(&record).unwrap();
        let sum: f64 = predictions[0].proba.values().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn label_values_are_whatever_the_dataset_contains() {
        let mut dataset = synthetic_dataset();
        for label in &mut dataset.labels {
            if label == "medium" {
                *label = "elevated".to_string();
            }
        }
        let (bundle, _) = train_bundle(&dataset, &fast_options()).unwrap();
        assert!(bundle.forest.classes.contains(&"elevated".to_string()));
    }
}
