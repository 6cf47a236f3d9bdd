//! Predict reservation risk for a single record using a trained bundle.
//!
//! Prints one JSON line: `{"risk_level": "...", "proba": {"<class>": p, ...}}`
//! so another process can consume the result.

use std::path::PathBuf;

use resrisk::bundle::ModelBundle;
use resrisk::schema::single_record;

fn main() {
    resrisk::logging::init();
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let bundle = ModelBundle::load(&options.model).map_err(|err| err.to_string())?;
    let record = single_record(
        options.noshow_count,
        options.reservation_count,
        &options.weekday,
        options.hour,
        options.party_size,
        &options.payment_method,
    );
    let mut predictions = bundle.predict(&record).map_err(|err| err.to_string())?;
    let prediction = predictions
        .pop()
        .ok_or_else(|| "No prediction produced".to_string())?;
    let line = serde_json::to_string(&prediction).map_err(|err| err.to_string())?;
    println!("{line}");
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    model: PathBuf,
    noshow_count: u32,
    reservation_count: u32,
    weekday: String,
    hour: i64,
    party_size: u32,
    payment_method: String,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut model: Option<PathBuf> = None;
    let mut noshow_count: Option<u32> = None;
    let mut reservation_count: Option<u32> = None;
    let mut weekday: Option<String> = None;
    let mut hour: Option<i64> = None;
    let mut party_size: Option<u32> = None;
    let mut payment_method: Option<String> = None;

    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        match flag {
            "-h" | "--help" => return Err(help_text()),
            "--model" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--model requires a value".to_string())?;
                model = Some(PathBuf::from(value));
            }
            "--weekday" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--weekday requires a value".to_string())?;
                weekday = Some(value.clone());
            }
            "--payment-method" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--payment-method requires a value".to_string())?;
                payment_method = Some(value.clone());
            }
            "--noshow-count" => {
                idx += 1;
                noshow_count = Some(parse_number(flag, args.get(idx))?);
            }
            "--reservation-count" => {
                idx += 1;
                reservation_count = Some(parse_number(flag, args.get(idx))?);
            }
            "--hour" => {
                idx += 1;
                hour = Some(parse_number(flag, args.get(idx))?);
            }
            "--party-size" => {
                idx += 1;
                party_size = Some(parse_number(flag, args.get(idx))?);
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    Ok(CliOptions {
        model: model.ok_or_else(|| required("--model"))?,
        noshow_count: noshow_count.ok_or_else(|| required("--noshow-count"))?,
        reservation_count: reservation_count.ok_or_else(|| required("--reservation-count"))?,
        weekday: weekday.ok_or_else(|| required("--weekday"))?,
        hour: hour.ok_or_else(|| required("--hour"))?,
        party_size: party_size.ok_or_else(|| required("--party-size"))?,
        payment_method: payment_method.ok_or_else(|| required("--payment-method"))?,
    })
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: Option<&String>) -> Result<T, String> {
    let value = value.ok_or_else(|| format!("{flag} requires a value"))?;
    value
        .parse::<T>()
        .map_err(|_| format!("Invalid {flag} value: {value}"))
}

fn required(flag: &str) -> String {
    format!("{flag} is required\n\n{}", help_text())
}

fn help_text() -> String {
    [
        "resrisk-predict",
        "",
        "Predicts the risk level for one reservation using a trained bundle.",
        "",
        "Usage:",
        "  resrisk-predict --model <file> --noshow-count <n> --reservation-count <n> \\",
        "                  --weekday <name> --hour <n> --party-size <n> --payment-method <name>",
        "",
        "Options:",
        "  --model <file>           Trained model bundle (required).",
        "  --noshow-count <n>       Prior no-shows for this party (required).",
        "  --reservation-count <n>  Prior completed reservations (required).",
        "  --weekday <name>         Reservation weekday (required).",
        "  --hour <n>               Reservation hour, 0-23 (required).",
        "  --party-size <n>         Number of guests (required).",
        "  --payment-method <name>  Payment method label (required).",
    ]
    .join("\n")
}
