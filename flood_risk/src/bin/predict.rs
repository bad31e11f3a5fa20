#!/usr/bin/env rust
//! Flood Risk Prediction
//!
//! Loads the persisted model / label-encoder pair once and predicts the risk
//! label for a single set of measurements. Any measurement not given on the
//! command line falls back to the demonstration sample
//! (rainfall 110, water level 3.8, elevation 40, soil moisture 70,
//! river distance 1.2).
//!
//! Usage:
//!   (from flood_risk/, so the default data/ and ml/ paths resolve)
//!   cargo run --bin predict
//!   cargo run --bin predict -- --rainfall 42 --water-level 1.1
//!
//! Options:
//!   --rainfall X --water-level X --elevation X --soil-moisture X --river-distance X
//!   --scores          Include per-class vote shares
//!   --json            Print the prediction as JSON
//!   --config PATH     TOML configuration file
//!
//! Environment:
//!   FLOOD_MODEL_PATH, FLOOD_ENCODER_PATH
//!   RUST_LOG - log filter (default: info)

use flood_risk::config::RiskConfig;
use flood_risk::logging::init_logging;
use flood_risk::model::{RiskError, Sample};
use flood_risk::predictor::Predictor;
use std::env;
use std::path::PathBuf;

fn main() {
    init_logging();

    if let Err(e) = run() {
        log::error!("Prediction failed: {}", e);
        eprintln!("\n❌ Prediction failed: {}\n", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), RiskError> {
    let args: Vec<String> = env::args().collect();
    let flag = |name: &str| {
        args.iter()
            .position(|a| a == name)
            .and_then(|i| args.get(i + 1))
            .cloned()
    };
    let number = |name: &str, default: f64| -> Result<f64, RiskError> {
        match flag(name) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| RiskError::Parse(format!("{} '{}' is not a number", name, raw))),
            None => Ok(default),
        }
    };

    let sample = Sample::new(
        number("--rainfall", 110.0)?,
        number("--water-level", 3.8)?,
        number("--elevation", 40.0)?,
        number("--soil-moisture", 70.0)?,
        number("--river-distance", 1.2)?,
    );
    let with_scores = args.iter().any(|a| a == "--scores");
    let as_json = args.iter().any(|a| a == "--json");

    let config_path = flag("--config").map(PathBuf::from);
    let config = RiskConfig::load(config_path.as_deref())?;
    let predictor = Predictor::from_config(&config)?;

    let prediction = if with_scores {
        predictor.predict_with_scores(&sample)?
    } else {
        predictor.predict_sample(&sample)?
    };

    if as_json {
        let json = serde_json::to_string_pretty(&prediction)
            .map_err(|e| RiskError::Prediction(e.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    println!("Predicted Flood Risk: {}", prediction.label);
    if let Some(scores) = &prediction.scores {
        for s in scores {
            println!("  {:<8} {:>5.1}%", s.label, s.score * 100.0);
        }
    }
    Ok(())
}
