/// Sample, FeatureSchema, FeatureRow, RiskError
/// core data structures and error handling
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O: only types, the canonical feature schema, and the
/// name-based mapping from a sample to the ordered vector a model consumes.

use std::collections::BTreeMap;
use std::path::PathBuf;

use bitcode::{Decode, Encode};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

/// Label column in the training dataset.
pub const LABEL_COLUMN: &str = "risk";

/// Rainfall, in millimetres.
pub const FEATURE_RAINFALL: &str = "rainfall";
/// Water level, in metres.
pub const FEATURE_WATER_LEVEL: &str = "water_level";
/// Elevation, in metres. Any real value.
pub const FEATURE_ELEVATION: &str = "elevation";
/// Soil moisture, in percent (0-100 expected, not validated).
pub const FEATURE_SOIL_MOISTURE: &str = "soil_moisture";
/// Distance to the nearest river, in kilometres.
pub const FEATURE_RIVER_DISTANCE: &str = "river_distance";

/// Canonical feature order for schema version 1.
pub const FEATURE_NAMES: [&str; 5] = [
    FEATURE_RAINFALL,
    FEATURE_WATER_LEVEL,
    FEATURE_ELEVATION,
    FEATURE_SOIL_MOISTURE,
    FEATURE_RIVER_DISTANCE,
];

/// Current version of the canonical feature schema.
pub const SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Feature schema
// ---------------------------------------------------------------------------

/// Ordered list of named numeric feature slots.
///
/// The schema used at fit time travels inside the model artifact. At predict
/// time every input is mapped through it by name, so a model can never be fed
/// columns in an order it was not trained on.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct FeatureSchema {
    pub version: u32,
    pub features: Vec<String>,
}

impl FeatureSchema {
    /// The five flood measurements in canonical order.
    pub fn flood_v1() -> Self {
        FeatureSchema {
            version: SCHEMA_VERSION,
            features: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.features.iter().any(|f| f == name)
    }

    /// Builds the schema-ordered vector from a name → value row.
    ///
    /// The row must carry exactly the schema's names: a missing feature or an
    /// unknown extra one is a `SchemaError`.
    pub fn vector_from_row(&self, row: &FeatureRow) -> Result<Vec<f64>, RiskError> {
        let unknown: Vec<&str> = row
            .keys()
            .map(String::as_str)
            .filter(|name| !self.contains(name))
            .collect();
        if !unknown.is_empty() {
            return Err(RiskError::Schema(format!(
                "unknown feature(s) {:?}; expected {:?}",
                unknown, self.features
            )));
        }

        self.features
            .iter()
            .map(|name| {
                row.get(name).copied().ok_or_else(|| {
                    RiskError::Schema(format!("missing feature '{}'", name))
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Sample types
// ---------------------------------------------------------------------------

/// Name → value map for name-based feature assembly.
pub type FeatureRow = BTreeMap<String, f64>;

/// One set of environmental measurements for a single location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub rainfall: f64,
    pub water_level: f64,
    pub elevation: f64,
    pub soil_moisture: f64,
    pub river_distance: f64,
}

impl Sample {
    pub fn new(
        rainfall: f64,
        water_level: f64,
        elevation: f64,
        soil_moisture: f64,
        river_distance: f64,
    ) -> Self {
        Sample {
            rainfall,
            water_level,
            elevation,
            soil_moisture,
            river_distance,
        }
    }

    /// The sample keyed by canonical feature name.
    pub fn to_row(&self) -> FeatureRow {
        let mut row = FeatureRow::new();
        row.insert(FEATURE_RAINFALL.to_string(), self.rainfall);
        row.insert(FEATURE_WATER_LEVEL.to_string(), self.water_level);
        row.insert(FEATURE_ELEVATION.to_string(), self.elevation);
        row.insert(FEATURE_SOIL_MOISTURE.to_string(), self.soil_moisture);
        row.insert(FEATURE_RIVER_DISTANCE.to_string(), self.river_distance);
        row
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Every failure the trainer or predictor can surface.
///
/// Nothing in the library catches these; they propagate to the binary, which
/// reports them and exits non-zero.
#[derive(Debug, Error)]
pub enum RiskError {
    /// A file exists but could not be read or written.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The requested file does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// An expected column or feature is missing or misnamed.
    #[error("schema error: {0}")]
    Schema(String),
    /// A value could not be coerced to a number.
    #[error("parse error: {0}")]
    Parse(String),
    /// Too few rows to split into train and evaluation subsets.
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    /// A persisted artifact is missing, corrupt, incompatible, or mismatched.
    #[error("failed to load artifact {}: {reason}", .path.display())]
    ArtifactLoad { path: PathBuf, reason: String },
    /// The feature vector does not have the shape the model expects.
    #[error("prediction error: {0}")]
    Prediction(String),
    /// Configuration file unreadable or invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl RiskError {
    /// Maps an `io::Error` on `path`, splitting out `NotFound`.
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            RiskError::NotFound(path)
        } else {
            RiskError::Io { path, source }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
