/// Runtime configuration loader - parses flood_risk.toml
///
/// Keeps dataset and artifact locations plus training hyperparameters out of
/// the code. Precedence, lowest to highest:
/// 1. built-in defaults (paths relative to the working directory)
/// 2. TOML file: `--config PATH`, else `FLOOD_RISK_CONFIG`, else
///    `flood_risk.toml` if it exists
/// 3. environment variables (`.env` is loaded first if present)

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::forest::ForestParams;
use crate::model::RiskError;

pub const DEFAULT_CONFIG_FILE: &str = "flood_risk.toml";
pub const DEFAULT_DATASET_PATH: &str = "data/flood_data.csv";
pub const DEFAULT_STORAGE_ROOT: &str = "ml";
pub const MODEL_FILE_NAME: &str = "flood_risk_model.bin";
pub const ENCODER_FILE_NAME: &str = "label_encoder.bin";
pub const DEFAULT_SEED: u64 = 42;

pub const ENV_CONFIG: &str = "FLOOD_RISK_CONFIG";
pub const ENV_DATASET_PATH: &str = "FLOOD_DATASET_PATH";
pub const ENV_MODEL_PATH: &str = "FLOOD_MODEL_PATH";
pub const ENV_ENCODER_PATH: &str = "FLOOD_ENCODER_PATH";
pub const ENV_SEED: &str = "FLOOD_RISK_SEED";

/// Resolved configuration shared by the trainer and predictor.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskConfig {
    pub dataset_path: PathBuf,
    pub model_path: PathBuf,
    pub encoder_path: PathBuf,
    pub seed: u64,
    pub n_trees: usize,
    pub test_fraction: f64,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
}

/// On-disk shape of flood_risk.toml; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default, alias = "datasetPath")]
    dataset_path: Option<PathBuf>,
    #[serde(default, alias = "modelPath")]
    model_path: Option<PathBuf>,
    #[serde(default, alias = "encoderPath")]
    encoder_path: Option<PathBuf>,
    /// Puts both artifacts under this directory unless a path is given.
    #[serde(default)]
    storage_root: Option<PathBuf>,
    #[serde(default)]
    training: TrainingSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TrainingSection {
    seed: Option<u64>,
    n_trees: Option<usize>,
    test_fraction: Option<f64>,
    max_depth: Option<usize>,
    min_samples_split: Option<usize>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        let forest = ForestParams::default();
        RiskConfig {
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            model_path: Path::new(DEFAULT_STORAGE_ROOT).join(MODEL_FILE_NAME),
            encoder_path: Path::new(DEFAULT_STORAGE_ROOT).join(ENCODER_FILE_NAME),
            seed: DEFAULT_SEED,
            n_trees: forest.n_trees,
            test_fraction: 0.2,
            max_depth: forest.max_depth,
            min_samples_split: forest.min_samples_split,
        }
    }
}

impl RiskConfig {
    /// Loads configuration from all sources.
    ///
    /// An explicit `config_path` must exist; the default file is optional.
    pub fn load(config_path: Option<&Path>) -> Result<Self, RiskError> {
        dotenv::dotenv().ok();

        let explicit = config_path
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(ENV_CONFIG).map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_toml_file(&path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_toml_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => RiskConfig::default(),
        };

        config.apply_env(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, RiskError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| RiskError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&contents)
            .map_err(|e| RiskError::Config(format!("{}: {}", path.display(), e)))?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, RiskError> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| RiskError::Config(e.to_string()))?;

        let mut config = RiskConfig::default();
        if let Some(root) = &file.storage_root {
            config = config.with_storage_root(root);
        }
        if let Some(p) = file.dataset_path {
            config.dataset_path = p;
        }
        if let Some(p) = file.model_path {
            config.model_path = p;
        }
        if let Some(p) = file.encoder_path {
            config.encoder_path = p;
        }

        let t = file.training;
        config.seed = t.seed.unwrap_or(config.seed);
        config.n_trees = t.n_trees.unwrap_or(config.n_trees);
        config.test_fraction = t.test_fraction.unwrap_or(config.test_fraction);
        config.max_depth = t.max_depth.or(config.max_depth);
        config.min_samples_split = t.min_samples_split.unwrap_or(config.min_samples_split);

        config.validate()?;
        Ok(config)
    }

    /// Places both artifacts, under their standard file names, in `root`.
    pub fn with_storage_root(mut self, root: impl AsRef<Path>) -> Self {
        self.model_path = root.as_ref().join(MODEL_FILE_NAME);
        self.encoder_path = root.as_ref().join(ENCODER_FILE_NAME);
        self
    }

    pub fn with_dataset(mut self, path: impl Into<PathBuf>) -> Self {
        self.dataset_path = path.into();
        self
    }

    pub fn forest_params(&self) -> ForestParams {
        ForestParams {
            n_trees: self.n_trees,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            seed: self.seed,
        }
    }

    /// Overrides from environment variables, read through `lookup`.
    fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) -> Result<(), RiskError> {
        if let Some(p) = lookup(ENV_DATASET_PATH) {
            self.dataset_path = PathBuf::from(p);
        }
        if let Some(p) = lookup(ENV_MODEL_PATH) {
            self.model_path = PathBuf::from(p);
        }
        if let Some(p) = lookup(ENV_ENCODER_PATH) {
            self.encoder_path = PathBuf::from(p);
        }
        if let Some(s) = lookup(ENV_SEED) {
            self.seed = s
                .trim()
                .parse()
                .map_err(|_| RiskError::Config(format!("{}='{}' is not a u64", ENV_SEED, s)))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), RiskError> {
        if self.n_trees == 0 {
            return Err(RiskError::Config("n_trees must be at least 1".to_string()));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(RiskError::Config(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.model_path == self.encoder_path {
            return Err(RiskError::Config(format!(
                "model and encoder paths must differ (both {})",
                self.model_path.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_standard_layout() {
        let config = RiskConfig::default();
        assert_eq!(config.dataset_path, PathBuf::from("data/flood_data.csv"));
        assert_eq!(config.model_path, PathBuf::from("ml/flood_risk_model.bin"));
        assert_eq!(config.encoder_path, PathBuf::from("ml/label_encoder.bin"));
        assert_eq!(config.seed, 42);
        assert_eq!(config.n_trees, 100);
        assert_eq!(config.test_fraction, 0.2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_overrides_and_camel_case_aliases() {
        let config = RiskConfig::from_toml_str(
            r#"
            datasetPath = "/srv/flood/history.csv"
            modelPath = "/srv/flood/model.bin"
            encoder_path = "/srv/flood/encoder.bin"

            [training]
            seed = 7
            n_trees = 25
            "#,
        )
        .unwrap();

        assert_eq!(config.dataset_path, PathBuf::from("/srv/flood/history.csv"));
        assert_eq!(config.model_path, PathBuf::from("/srv/flood/model.bin"));
        assert_eq!(config.encoder_path, PathBuf::from("/srv/flood/encoder.bin"));
        assert_eq!(config.seed, 7);
        assert_eq!(config.n_trees, 25);
        assert_eq!(config.test_fraction, 0.2);
    }

    #[test]
    fn test_storage_root_places_siblings() {
        let config = RiskConfig::from_toml_str(r#"storage_root = "/var/lib/flood""#).unwrap();
        assert_eq!(config.model_path, PathBuf::from("/var/lib/flood/flood_risk_model.bin"));
        assert_eq!(config.encoder_path, PathBuf::from("/var/lib/flood/label_encoder.bin"));
        assert_eq!(config.model_path.parent(), config.encoder_path.parent());
    }

    #[test]
    fn test_unknown_key_is_config_error() {
        let result = RiskConfig::from_toml_str(r#"dataset = "x.csv""#);
        assert!(matches!(result, Err(RiskError::Config(_))));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let result = RiskConfig::from_toml_str("[training]\ntest_fraction = 1.5\n");
        assert!(matches!(result, Err(RiskError::Config(_))));

        let result = RiskConfig::from_toml_str("[training]\nn_trees = 0\n");
        assert!(matches!(result, Err(RiskError::Config(_))));
    }

    #[test]
    fn test_env_overrides_win() {
        let env: HashMap<&str, &str> = [
            (ENV_MODEL_PATH, "/tmp/m.bin"),
            (ENV_SEED, "99"),
        ]
        .into_iter()
        .collect();

        let mut config = RiskConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.model_path, PathBuf::from("/tmp/m.bin"));
        assert_eq!(config.encoder_path, PathBuf::from("ml/label_encoder.bin"));
        assert_eq!(config.seed, 99);
    }

    #[test]
    fn test_bad_env_seed_is_config_error() {
        let mut config = RiskConfig::default();
        let result = config.apply_env(|key| (key == ENV_SEED).then(|| "forty-two".to_string()));
        assert!(matches!(result, Err(RiskError::Config(_))));
    }
}
