/// Inference over a persisted model / label-encoder pair.
///
/// `Predictor::load` is the only initialization step: it reads both
/// artifacts, checks they belong together, and returns an immutable handle.
/// The handle never reloads, so a running process keeps serving the pair it
/// started with even if a retrain later replaces the files. It is `Send +
/// Sync`; share it by reference across threads without locking.

use serde::Serialize;
use std::path::Path;

use crate::artifact;
use crate::config::RiskConfig;
use crate::encoder::LabelEncoder;
use crate::forest::RandomForest;
use crate::model::{FeatureRow, FeatureSchema, RiskError, Sample};

/// Vote share of one class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassScore {
    pub label: String,
    pub score: f64,
}

/// Decoded prediction. `scores` is only filled by `predict_with_scores`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskPrediction {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<Vec<ClassScore>>,
}

#[derive(Debug, Clone)]
pub struct Predictor {
    model: RandomForest,
    encoder: LabelEncoder,
    training_id: Option<String>,
}

impl Predictor {
    /// Loads and cross-checks both artifacts.
    ///
    /// Fails with `ArtifactLoad` if either file is missing, corrupt, of the
    /// wrong kind or format version, or if the two came from different
    /// training runs.
    pub fn load(model_path: &Path, encoder_path: &Path) -> Result<Self, RiskError> {
        let model = artifact::load_model(model_path)?;
        let encoder = artifact::load_encoder(encoder_path)?;

        if model.training_id != encoder.training_id {
            return Err(RiskError::ArtifactLoad {
                path: encoder_path.to_path_buf(),
                reason: format!(
                    "encoder is from training run '{}' but model is from '{}'",
                    encoder.training_id, model.training_id
                ),
            });
        }

        let predictor = Self::from_parts(model.value, encoder.value).map_err(|e| {
            RiskError::ArtifactLoad {
                path: model_path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        log::info!(
            "Loaded flood risk model ({} trees, classes {:?}, training run {})",
            predictor.model.n_trees(),
            predictor.encoder.classes(),
            model.training_id
        );
        Ok(Predictor {
            training_id: Some(model.training_id),
            ..predictor
        })
    }

    pub fn from_config(config: &RiskConfig) -> Result<Self, RiskError> {
        Self::load(&config.model_path, &config.encoder_path)
    }

    /// Builds a handle from in-memory parts; the class counts must agree.
    pub fn from_parts(model: RandomForest, encoder: LabelEncoder) -> Result<Self, RiskError> {
        if model.n_classes() as usize != encoder.len() {
            return Err(RiskError::Schema(format!(
                "model predicts {} classes but encoder knows {}",
                model.n_classes(),
                encoder.len()
            )));
        }
        Ok(Predictor {
            model,
            encoder,
            training_id: None,
        })
    }

    /// Predicts the risk label for five measurements.
    pub fn predict_risk(
        &self,
        rainfall: f64,
        water_level: f64,
        elevation: f64,
        soil_moisture: f64,
        river_distance: f64,
    ) -> Result<RiskPrediction, RiskError> {
        self.predict_sample(&Sample::new(
            rainfall,
            water_level,
            elevation,
            soil_moisture,
            river_distance,
        ))
    }

    pub fn predict_sample(&self, sample: &Sample) -> Result<RiskPrediction, RiskError> {
        self.predict_row(&sample.to_row())
    }

    /// Like `predict_sample`, plus each class's share of the tree votes.
    pub fn predict_with_scores(&self, sample: &Sample) -> Result<RiskPrediction, RiskError> {
        let vector = self.schema().vector_from_row(&sample.to_row())?;
        let votes = self.model.votes(&vector)?;
        let total = votes.iter().sum::<u32>().max(1) as f64;

        let scores = votes
            .iter()
            .enumerate()
            .map(|(code, &v)| {
                Ok(ClassScore {
                    label: self.encoder.decode(code as u32)?.to_string(),
                    score: v as f64 / total,
                })
            })
            .collect::<Result<Vec<_>, RiskError>>()?;

        let code = self.model.predict(&vector)?;
        Ok(RiskPrediction {
            label: self.encoder.decode(code)?.to_string(),
            scores: Some(scores),
        })
    }

    /// Name-based assembly: `row` must carry exactly the schema's features.
    pub fn predict_row(&self, row: &FeatureRow) -> Result<RiskPrediction, RiskError> {
        let vector = self.schema().vector_from_row(row)?;
        self.predict_vector(&vector)
    }

    /// `vector` must already be in schema order and of schema width.
    pub fn predict_vector(&self, vector: &[f64]) -> Result<RiskPrediction, RiskError> {
        let code = self.model.predict(vector)?;
        Ok(RiskPrediction {
            label: self.encoder.decode(code)?.to_string(),
            scores: None,
        })
    }

    /// The closed set of labels this predictor can return.
    pub fn labels(&self) -> &[String] {
        self.encoder.classes()
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.model.schema()
    }

    /// Training run recorded in the artifacts; `None` for `from_parts`.
    pub fn training_id(&self) -> Option<&str> {
        self.training_id.as_deref()
    }
}
