//! End-to-end training and inference against a synthetic reservation dataset.

use std::fs;
use std::path::Path;

use resrisk::bundle::{BundleError, ModelBundle};
use resrisk::dataset::{DatasetError, load_dataset};
use resrisk::ml::forest::TrainOptions;
use resrisk::schema::single_record;
use resrisk::train::{TrainFlowOptions, train_bundle};

const HEADER: &str =
    "noshow_count,reservation_count,weekday,hour,party_size,payment_method,risk_level";

fn write_dataset(path: &Path) {
    let mut text = format!("{HEADER}\n");
    for i in 0..20u32 {
        text.push_str(&format!("{},2,Friday,20,6,cash,high\n", 4 + i % 3));
        text.push_str(&format!("{},8,Saturday,18,4,mobile,medium\n", 1 + i % 2));
        text.push_str(&format!("0,{},Monday,12,2,credit_card,low\n", 10 + i % 5));
    }
    fs::write(path, text).unwrap();
}

fn fast_options() -> TrainFlowOptions {
    TrainFlowOptions {
        forest: TrainOptions {
            n_trees: 40,
            ..TrainOptions::default()
        },
        ..TrainFlowOptions::default()
    }
}

#[test]
fn train_save_load_predict_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("reservations.csv");
    write_dataset(&csv);

    let dataset = load_dataset(&csv).unwrap();
    let (bundle, report) = train_bundle(&dataset, &fast_options()).unwrap();
    assert_eq!(report.classes, vec!["high", "low", "medium"]);
    assert!(report.accuracy > 0.0);

    let model_path = dir.path().join("models").join("risk").join("bundle.json");
    bundle.save(&model_path).unwrap();
    let loaded = ModelBundle::load(&model_path).unwrap();

    let record = single_record(3, 10, "Friday", 19, 4, "credit_card");
    let in_memory = bundle.predict(&record).unwrap().remove(0);
    let from_disk = loaded.predict(&record).unwrap().remove(0);
    assert_eq!(in_memory.risk_level, from_disk.risk_level);
    assert_eq!(in_memory.proba, from_disk.proba);

    assert!(["high", "medium", "low"].contains(&from_disk.risk_level.as_str()));
    assert_eq!(from_disk.proba.len(), 3);
    let sum: f64 = from_disk.proba.values().sum();
    assert!((sum - 1.0).abs() < 1e-6);
    assert!(from_disk.proba.values().all(|&p| (0.0..=1.0).contains(&p)));
}

#[test]
fn unseen_payment_method_still_predicts() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("reservations.csv");
    write_dataset(&csv);

    let dataset = load_dataset(&csv).unwrap();
    let (bundle, _) = train_bundle(&dataset, &fast_options()).unwrap();
    let record = single_record(3, 10, "Friday", 19, 4, "crypto_xyz");
    let prediction = bundle.predict(&record).unwrap().remove(0);
    assert_eq!(prediction.proba.len(), 3);
    let sum: f64 = prediction.proba.values().sum();
    assert!((sum - 1.0).abs() < 1e-6);
}

#[test]
fn prediction_payload_is_one_json_line() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("reservations.csv");
    write_dataset(&csv);

    let dataset = load_dataset(&csv).unwrap();
    let (bundle, _) = train_bundle(&dataset, &fast_options()).unwrap();
    let record = single_record(3, 10, "Friday", 19, 4, "credit_card");
    let prediction = bundle.predict(&record).unwrap().remove(0);

    let line = serde_json::to_string(&prediction).unwrap();
    assert!(!line.contains('\n'));
    let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert!(parsed.get("risk_level").and_then(|v| v.as_str()).is_some());
    let proba = parsed.get("proba").and_then(|v| v.as_object()).unwrap();
    assert_eq!(proba.len(), 3);
}

#[test]
fn missing_dataset_is_not_found() {
    let err = load_dataset(Path::new("/no/such/reservations.csv")).unwrap_err();
    assert!(matches!(err, DatasetError::NotFound(_)));
}

#[test]
fn dataset_without_target_column_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("unlabeled.csv");
    fs::write(
        &csv,
        "noshow_count,reservation_count,weekday,hour,party_size,payment_method\n0,1,Monday,12,2,cash\n",
    )
    .unwrap();
    let err = load_dataset(&csv).unwrap_err();
    assert!(matches!(err, DatasetError::MissingTarget));
}

#[test]
fn missing_model_artifact_is_not_found() {
    let err = ModelBundle::load(Path::new("/no/such/model.json")).unwrap_err();
    assert!(matches!(err, BundleError::NotFound(_)));
}
