#!/usr/bin/env rust
//! Flood Risk Model Training
//!
//! Trains the flood-risk classifier and writes the artifact pair:
//! 1. Read the labeled dataset (CSV with a `risk` column)
//! 2. Fit the label encoder on every distinct label
//! 3. Split rows 80/20 with a fixed seed
//! 4. Fit a 100-tree random forest on the training rows
//! 5. Print the held-out classification report
//! 6. Atomically write the model and label encoder
//!
//! Usage:
//!   (from flood_risk/, so the default data/ and ml/ paths resolve)
//!   cargo run --bin train_model
//!
//! Options:
//!   --config PATH     TOML configuration file (default: flood_risk.toml if present)
//!   --dataset PATH    Override the dataset location
//!   --seed N          Override the split / forest seed
//!
//! Environment:
//!   FLOOD_DATASET_PATH, FLOOD_MODEL_PATH, FLOOD_ENCODER_PATH, FLOOD_RISK_SEED
//!   RUST_LOG - log filter (default: info)

use flood_risk::config::RiskConfig;
use flood_risk::logging::init_logging;
use flood_risk::model::RiskError;
use flood_risk::trainer;
use std::env;
use std::path::PathBuf;

fn main() {
    init_logging();

    if let Err(e) = run() {
        log::error!("Training failed: {}", e);
        eprintln!("\n❌ Training failed: {}\n", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), RiskError> {
    println!("🌊 Flood Risk Model Training");
    println!("============================\n");

    let args: Vec<String> = env::args().collect();
    let flag = |name: &str| {
        args.iter()
            .position(|a| a == name)
            .and_then(|i| args.get(i + 1))
            .cloned()
    };

    let config_path = flag("--config").map(PathBuf::from);
    let mut config = RiskConfig::load(config_path.as_deref())?;
    if let Some(dataset) = flag("--dataset") {
        config = config.with_dataset(dataset);
    }
    if let Some(seed) = flag("--seed") {
        config.seed = seed
            .parse()
            .map_err(|_| RiskError::Parse(format!("--seed '{}' is not a u64", seed)))?;
    }

    println!("⚙️  Configuration:");
    println!("  - Dataset: {}", config.dataset_path.display());
    println!("  - Trees: {}", config.n_trees);
    println!("  - Evaluation fraction: {:.2}", config.test_fraction);
    println!("  - Seed: {}\n", config.seed);

    println!("🔍 Training...");
    let outcome = trainer::train(&config)?;
    println!(
        "✓ Trained on {} rows, evaluated on {}\n",
        outcome.split.train.len(),
        outcome.split.test.len()
    );

    println!("📈 Held-out evaluation");
    println!("{}", outcome.report);

    println!("✓ Model written to {}", outcome.model_path.display());
    println!("✓ Encoder written to {}", outcome.encoder_path.display());
    println!("  Training run: {}\n", outcome.training_id);
    println!("Model and label encoder saved successfully.");

    Ok(())
}
