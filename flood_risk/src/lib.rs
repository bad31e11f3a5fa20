/// flood_risk: flood-risk classification from five environmental measurements.
///
/// # Module structure
///
/// ```text
/// flood_risk
/// ├── model       - shared types (FeatureSchema, Sample, FeatureRow, RiskError)
/// ├── config      - paths + hyperparameters (defaults, flood_risk.toml, env)
/// ├── logging     - env_logger setup for the binaries
/// ├── dataset     - labeled CSV reader with column allow-list
/// ├── encoder     - string label ↔ integer code mapping
/// ├── split       - seeded train/evaluation partition
/// ├── forest
/// │   └── tree    - CART tree; the module itself is the random forest
/// ├── analysis
/// │   └── report  - precision / recall / F1 / support, accuracy
/// ├── artifact    - bitcode envelopes, atomic write-rename persistence
/// ├── trainer     - dataset → encoder + forest → artifacts
/// └── predictor   - immutable handle: artifacts → risk label
/// ```
///
/// Binaries: `train_model` (training run + report) and `predict`
/// (single-sample prediction).

/// Public modules
pub mod analysis;
pub mod artifact;
pub mod config;
pub mod dataset;
pub mod encoder;
pub mod forest;
pub mod logging;
pub mod model;
pub mod predictor;
pub mod split;
pub mod trainer;

pub use config::RiskConfig;
pub use model::{FeatureSchema, RiskError, Sample};
pub use predictor::{Predictor, RiskPrediction};
pub use trainer::{train, TrainingOutcome};
