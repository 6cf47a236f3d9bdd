//! Train a reservation risk classifier from a CSV dataset and export the
//! model bundle.

use std::path::PathBuf;

use resrisk::dataset::load_dataset;
use resrisk::ml::forest::TrainOptions;
use resrisk::train::{TrainFlowOptions, train_bundle};

fn main() {
    resrisk::logging::init();
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let dataset = load_dataset(&options.data).map_err(|err| err.to_string())?;

    let flow = TrainFlowOptions {
        test_fraction: options.test_fraction,
        forest: TrainOptions {
            n_trees: options.trees,
            max_depth: options.max_depth,
            seed: options.seed,
            ..TrainOptions::default()
        },
    };
    let (bundle, report) = train_bundle(&dataset, &flow)?;
    bundle.save(&options.out).map_err(|err| err.to_string())?;

    println!("random forest reservation risk classifier");
    println!("accuracy: {:.4}", report.accuracy);
    for (idx, stats) in report.per_class.iter().enumerate() {
        println!(
            "class {:>2} {:<12}  precision={:.3}  recall={:.3}  f1={:.3}  support={}",
            idx,
            report.classes[idx],
            stats.precision,
            stats.recall,
            stats.f1,
            stats.support
        );
    }
    println!("confusion matrix (rows=true, cols=pred):");
    for truth in 0..report.confusion.n_classes {
        let mut row = String::new();
        for pred in 0..report.confusion.n_classes {
            row.push_str(&format!("{:6}", report.confusion.get(truth, pred)));
        }
        println!("{row}");
    }
    println!("model saved to: {}", options.out.display());
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    data: PathBuf,
    out: PathBuf,
    trees: usize,
    max_depth: usize,
    seed: u64,
    test_fraction: f64,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut data: Option<PathBuf> = None;
    let mut out = PathBuf::from("model.json");
    let mut trees = 300usize;
    let mut max_depth = 32usize;
    let mut seed = 42u64;
    let mut test_fraction = 0.2f64;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--data" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--data requires a value".to_string())?;
                data = Some(PathBuf::from(value));
            }
            "--out" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out requires a value".to_string())?;
                out = PathBuf::from(value);
            }
            "--trees" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--trees requires a value".to_string())?;
                trees = value
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid --trees value: {value}"))?;
            }
            "--max-depth" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--max-depth requires a value".to_string())?;
                max_depth = value
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid --max-depth value: {value}"))?;
            }
            "--seed" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--seed requires a value".to_string())?;
                seed = value
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid --seed value: {value}"))?;
            }
            "--test-fraction" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--test-fraction requires a value".to_string())?;
                test_fraction = value
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid --test-fraction value: {value}"))?;
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    let data = data.ok_or_else(help_text)?;
    Ok(CliOptions {
        data,
        out,
        trees,
        max_depth,
        seed,
        test_fraction,
    })
}

fn help_text() -> String {
    [
        "resrisk-train",
        "",
        "Trains a random-forest reservation risk classifier from a CSV dataset.",
        "",
        "Usage:",
        "  resrisk-train --data <csv> [--out model.json] [options]",
        "",
        "Options:",
        "  --data <csv>           Labeled dataset with a 'risk_level' column (required).",
        "  --out <file>           Output model bundle path (default: model.json).",
        "  --trees <n>            Trees in the ensemble (default: 300).",
        "  --max-depth <n>        Maximum tree depth (default: 32).",
        "  --seed <n>             Seed for the split and forest randomness (default: 42).",
        "  --test-fraction <f64>  Held-out evaluation fraction (default: 0.2).",
    ]
    .join("\n")
}
