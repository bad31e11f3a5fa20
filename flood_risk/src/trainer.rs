/// Training pipeline: dataset → label encoder + random forest → artifacts.
///
/// Steps, in order:
/// 1. Read the dataset against the canonical feature schema
/// 2. Fit the label encoder on the full label column
/// 3. Seeded 80/20 train/evaluation split
/// 4. Fit the forest on the training rows
/// 5. Evaluate on the held-out rows
/// 6. Persist encoder and model as one pair (both staged, then renamed)
///
/// Persistence is last, so any earlier failure leaves nothing on disk, and a
/// failed write in step 6 leaves the previous pair in place. No
/// accuracy threshold gates step 6; the report is for a human to read.

use chrono::Utc;
use std::path::PathBuf;

use crate::analysis::report::{classification_report, ClassificationReport};
use crate::artifact;
use crate::config::RiskConfig;
use crate::dataset::{load_dataset, Dataset};
use crate::encoder::LabelEncoder;
use crate::forest::RandomForest;
use crate::model::{FeatureSchema, RiskError};
use crate::split::{select, train_test_split, SplitIndices};

/// In-memory result of fitting, before anything is written.
#[derive(Debug, Clone)]
pub struct TrainedArtifacts {
    pub model: RandomForest,
    pub encoder: LabelEncoder,
    pub split: SplitIndices,
    pub report: ClassificationReport,
}

/// Summary of a completed training run.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub report: ClassificationReport,
    pub split: SplitIndices,
    pub classes: Vec<String>,
    pub training_id: String,
    pub created_at: String,
    pub model_path: PathBuf,
    pub encoder_path: PathBuf,
}

/// Runs the whole pipeline against the configured dataset and paths.
pub fn train(config: &RiskConfig) -> Result<TrainingOutcome, RiskError> {
    config.validate()?;
    let dataset = load_dataset(&config.dataset_path, &FeatureSchema::flood_v1())?;
    let trained = fit(&dataset, config)?;
    persist(trained, config)
}

/// Steps 2-5 on an already-loaded dataset. Touches no files.
pub fn fit(dataset: &Dataset, config: &RiskConfig) -> Result<TrainedArtifacts, RiskError> {
    if dataset.len() < 2 {
        return Err(RiskError::InsufficientData(format!(
            "need at least 2 rows to train, dataset has {}",
            dataset.len()
        )));
    }

    let encoder = LabelEncoder::fit(&dataset.labels)?;
    let codes = encoder.encode_all(&dataset.labels)?;
    log::info!(
        "Fitted label encoder: {} classes {:?}",
        encoder.len(),
        encoder.classes()
    );

    let split = train_test_split(dataset.len(), config.test_fraction, config.seed)?;
    let x_train = select(&dataset.features, &split.train);
    let y_train = select(&codes, &split.train);
    let x_test = select(&dataset.features, &split.test);
    let y_test = select(&codes, &split.test);
    log::info!(
        "Split {} rows: {} train / {} evaluation (seed {})",
        dataset.len(),
        split.train.len(),
        split.test.len(),
        config.seed
    );

    let model = RandomForest::fit(
        &dataset.schema,
        &x_train,
        &y_train,
        encoder.len() as u32,
        &config.forest_params(),
    )?;
    log::info!("Trained random forest with {} trees", model.n_trees());

    let y_pred = model.predict_all(&x_test)?;
    let report = classification_report(&y_test, &y_pred, &encoder)?;
    log::info!("Held-out accuracy: {:.3}", report.accuracy);

    Ok(TrainedArtifacts {
        model,
        encoder,
        split,
        report,
    })
}

/// Step 6: writes both artifacts under a shared training id.
pub fn persist(trained: TrainedArtifacts, config: &RiskConfig) -> Result<TrainingOutcome, RiskError> {
    let now = Utc::now();
    let created_at = now.to_rfc3339();
    let training_id = format!("{}-seed{}", now.format("%Y%m%dT%H%M%S%.9fZ"), config.seed);

    artifact::save_pair(
        &config.model_path,
        &trained.model,
        &config.encoder_path,
        &trained.encoder,
        &training_id,
        &created_at,
    )?;

    Ok(TrainingOutcome {
        report: trained.report,
        split: trained.split,
        classes: trained.encoder.classes().to_vec(),
        training_id,
        created_at,
        model_path: config.model_path.clone(),
        encoder_path: config.encoder_path.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::parse_csv;

    fn small_dataset() -> Dataset {
        let mut csv = String::from("rainfall,water_level,elevation,soil_moisture,river_distance,risk\n");
        for i in 0..10 {
            let f = i as f64;
            csv.push_str(&format!("{},{},{},{},{},Low\n", 10.0 + f, 0.5, 150.0 + f, 20.0, 9.0));
            csv.push_str(&format!("{},{},{},{},{},High\n", 150.0 + f, 4.5, 20.0 + f, 85.0, 0.5));
        }
        parse_csv(&csv, &FeatureSchema::flood_v1()).unwrap()
    }

    fn quick_config() -> RiskConfig {
        RiskConfig {
            n_trees: 10,
            ..RiskConfig::default()
        }
    }

    #[test]
    fn test_fit_produces_consistent_encoder_and_model() {
        let trained = fit(&small_dataset(), &quick_config()).unwrap();
        assert_eq!(trained.encoder.classes(), &["High", "Low"]);
        assert_eq!(trained.model.n_classes(), 2);
        assert_eq!(trained.model.n_trees(), 10);
        assert_eq!(trained.split.train.len(), 16);
        assert_eq!(trained.split.test.len(), 4);
        assert_eq!(trained.report.total_support, 4);
        assert_eq!(trained.report.accuracy, 1.0);
    }

    #[test]
    fn test_fit_is_reproducible_for_fixed_seed() {
        let a = fit(&small_dataset(), &quick_config()).unwrap();
        let b = fit(&small_dataset(), &quick_config()).unwrap();
        assert_eq!(a.split, b.split);
        assert_eq!(a.model, b.model);
    }

    #[test]
    fn test_single_row_is_insufficient() {
        let csv = "rainfall,water_level,elevation,soil_moisture,river_distance,risk\n1,1,1,1,1,Low\n";
        let dataset = parse_csv(csv, &FeatureSchema::flood_v1()).unwrap();
        assert!(matches!(
            fit(&dataset, &quick_config()),
            Err(RiskError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_encoder_sees_labels_outside_train_split() {
        // One "Medium" row: wherever the split puts it, the encoder knows it.
        let mut dataset = small_dataset();
        dataset.features.push(vec![80.0, 2.5, 70.0, 50.0, 3.0]);
        dataset.labels.push("Medium".to_string());

        let trained = fit(&dataset, &quick_config()).unwrap();
        assert_eq!(trained.encoder.classes(), &["High", "Low", "Medium"]);
        assert_eq!(trained.model.n_classes(), 3);
    }
}
