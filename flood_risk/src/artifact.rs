/// Persisted model and label-encoder artifacts.
///
/// Each artifact is a bitcode-encoded `Envelope` wrapping the bitcode payload
/// of one object, tagged with its kind, the artifact format version, and the
/// id of the training run that produced it. Files are written with the
/// write-rename pattern so a concurrent reader sees either the old file or
/// the new one, never a partial write. A training run stages both files
/// before replacing either (`save_pair`).

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use bitcode::{Decode, Encode};

use crate::encoder::LabelEncoder;
use crate::forest::RandomForest;
use crate::model::RiskError;

/// Bumped on any incompatible change to the envelope or payload encoding.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

pub const KIND_MODEL: &str = "flood_risk.model";
pub const KIND_LABEL_ENCODER: &str = "flood_risk.label_encoder";

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
struct Envelope {
    format_version: u32,
    kind: String,
    training_id: String,
    created_at: String,
    payload: Vec<u8>,
}

/// A decoded artifact plus the provenance recorded alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub value: T,
    pub training_id: String,
    pub created_at: String,
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Atomically writes `data` to `path`.
///
/// 1. Write to `{path}.tmp`
/// 2. `sync_all()` to flush to disk
/// 3. `rename` temp to final path
///
/// The parent directory is created if missing. If any step fails, the file
/// previously at `path` is left as it was.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), RiskError> {
    let tmp_path = stage(path, data)?;
    commit(&tmp_path, path)
}

/// Steps 1 and 2 of `atomic_write`: returns the synced temp path. Nothing at
/// `path` itself is touched. A failed write removes its temp file.
fn stage(path: &Path, data: &[u8]) -> Result<PathBuf, RiskError> {
    let tmp_path = tmp_path_for(path);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| RiskError::from_io(parent, e))?;
        }
    }

    let write_tmp = || -> std::io::Result<()> {
        let mut file = File::create(&tmp_path)?;
        file.write_all(data)?;
        file.sync_all()
    };
    if let Err(e) = write_tmp() {
        discard(&tmp_path);
        return Err(RiskError::from_io(&tmp_path, e));
    }
    Ok(tmp_path)
}

/// Step 3 of `atomic_write`.
fn commit(tmp_path: &Path, path: &Path) -> Result<(), RiskError> {
    fs::rename(tmp_path, path).map_err(|e| {
        discard(tmp_path);
        RiskError::from_io(path, e)
    })
}

fn discard(tmp_path: &Path) {
    if let Err(e) = fs::remove_file(tmp_path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Could not remove temp file {}: {}", tmp_path.display(), e);
        }
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn envelope_bytes<T: Encode>(kind: &str, training_id: &str, created_at: &str, value: &T) -> Vec<u8> {
    let envelope = Envelope {
        format_version: ARTIFACT_FORMAT_VERSION,
        kind: kind.to_string(),
        training_id: training_id.to_string(),
        created_at: created_at.to_string(),
        payload: bitcode::encode(value),
    };
    bitcode::encode(&envelope)
}

fn save<T: Encode>(
    path: &Path,
    kind: &str,
    training_id: &str,
    created_at: &str,
    value: &T,
) -> Result<(), RiskError> {
    atomic_write(path, &envelope_bytes(kind, training_id, created_at, value))?;
    log::info!("Wrote {} artifact to {}", kind, path.display());
    Ok(())
}

pub fn save_model(
    path: &Path,
    model: &RandomForest,
    training_id: &str,
    created_at: &str,
) -> Result<(), RiskError> {
    save(path, KIND_MODEL, training_id, created_at, model)
}

pub fn save_encoder(
    path: &Path,
    encoder: &LabelEncoder,
    training_id: &str,
    created_at: &str,
) -> Result<(), RiskError> {
    save(path, KIND_LABEL_ENCODER, training_id, created_at, encoder)
}

/// Writes the model and encoder of one training run as a pair.
///
/// Both temp files are written and synced before either final path is
/// replaced. If staging either one fails, both temp files are removed and
/// the pair already on disk is untouched.
pub fn save_pair(
    model_path: &Path,
    model: &RandomForest,
    encoder_path: &Path,
    encoder: &LabelEncoder,
    training_id: &str,
    created_at: &str,
) -> Result<(), RiskError> {
    let encoder_tmp = stage(
        encoder_path,
        &envelope_bytes(KIND_LABEL_ENCODER, training_id, created_at, encoder),
    )?;
    let model_tmp = match stage(
        model_path,
        &envelope_bytes(KIND_MODEL, training_id, created_at, model),
    ) {
        Ok(tmp) => tmp,
        Err(e) => {
            discard(&encoder_tmp);
            return Err(e);
        }
    };

    if let Err(e) = commit(&encoder_tmp, encoder_path) {
        discard(&model_tmp);
        return Err(e);
    }
    // A failure here leaves a new encoder beside the previous model; the
    // training id check in `Predictor::load` refuses that pair.
    commit(&model_tmp, model_path)?;

    log::info!(
        "Wrote artifact pair {} + {} (training run {})",
        model_path.display(),
        encoder_path.display(),
        training_id
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

fn load<T: for<'a> Decode<'a>>(path: &Path, kind: &str) -> Result<Loaded<T>, RiskError> {
    let fail = |reason: String| RiskError::ArtifactLoad {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = fs::read(path).map_err(|e| fail(e.to_string()))?;
    let envelope: Envelope =
        bitcode::decode(&bytes).map_err(|e| fail(format!("not a flood_risk artifact ({})", e)))?;

    if envelope.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(fail(format!(
            "unsupported format version {} (expected {})",
            envelope.format_version, ARTIFACT_FORMAT_VERSION
        )));
    }
    if envelope.kind != kind {
        return Err(fail(format!(
            "artifact kind is '{}', expected '{}'",
            envelope.kind, kind
        )));
    }

    let value: T = bitcode::decode(&envelope.payload)
        .map_err(|e| fail(format!("corrupt {} payload ({})", kind, e)))?;

    Ok(Loaded {
        value,
        training_id: envelope.training_id,
        created_at: envelope.created_at,
    })
}

pub fn load_model(path: &Path) -> Result<Loaded<RandomForest>, RiskError> {
    let loaded: Loaded<RandomForest> = load(path, KIND_MODEL)?;
    loaded.value.validate().map_err(|reason| RiskError::ArtifactLoad {
        path: path.to_path_buf(),
        reason,
    })?;
    Ok(loaded)
}

pub fn load_encoder(path: &Path) -> Result<Loaded<LabelEncoder>, RiskError> {
    let loaded: Loaded<LabelEncoder> = load(path, KIND_LABEL_ENCODER)?;
    if loaded.value.is_empty() {
        return Err(RiskError::ArtifactLoad {
            path: path.to_path_buf(),
            reason: "label encoder has no classes".to_string(),
        });
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::ForestParams;
    use crate::model::FeatureSchema;

    fn tiny_forest() -> RandomForest {
        let schema = FeatureSchema {
            version: 1,
            features: vec!["a".to_string()],
        };
        let x = vec![vec![1.0], vec![2.0], vec![8.0], vec![9.0]];
        let y = vec![0, 0, 1, 1];
        let params = ForestParams {
            n_trees: 4,
            ..ForestParams::default()
        };
        RandomForest::fit(&schema, &x, &y, 2, &params).unwrap()
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs_and_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deep/model.bin");

        atomic_write(&path, b"payload").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"payload");
        assert!(!tmp_path_for(&path).exists(), "temp file should be renamed away");
    }

    #[test]
    fn test_atomic_write_overwrites_existing_and_leftover_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        fs::write(&path, b"version 1").unwrap();
        fs::write(tmp_path_for(&path), b"partial garbage").unwrap();

        atomic_write(&path, b"version 2").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"version 2");
        assert!(!tmp_path_for(&path).exists());
    }

    #[test]
    fn test_model_and_encoder_reload_identically() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.bin");
        let encoder_path = dir.path().join("encoder.bin");
        let forest = tiny_forest();
        let encoder = LabelEncoder::fit(&["Low", "High"]).unwrap();

        save_model(&model_path, &forest, "run-1", "2026-01-01T00:00:00Z").unwrap();
        save_encoder(&encoder_path, &encoder, "run-1", "2026-01-01T00:00:00Z").unwrap();

        let model = load_model(&model_path).unwrap();
        assert_eq!(model.value, forest);
        assert_eq!(model.training_id, "run-1");

        let loaded = load_encoder(&encoder_path).unwrap();
        assert_eq!(loaded.value, encoder);
        assert_eq!(loaded.created_at, "2026-01-01T00:00:00Z");
    }

    #[test]
    fn test_save_pair_writes_matching_training_ids() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.bin");
        let encoder_path = dir.path().join("encoder.bin");
        let encoder = LabelEncoder::fit(&["Low", "High"]).unwrap();

        save_pair(&model_path, &tiny_forest(), &encoder_path, &encoder, "run-7", "now").unwrap();

        assert_eq!(load_model(&model_path).unwrap().training_id, "run-7");
        assert_eq!(load_encoder(&encoder_path).unwrap().training_id, "run-7");
        assert!(!tmp_path_for(&model_path).exists());
        assert!(!tmp_path_for(&encoder_path).exists());
    }

    #[test]
    fn test_save_pair_failure_keeps_previous_pair() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.bin");
        let encoder_path = dir.path().join("encoder.bin");
        let encoder = LabelEncoder::fit(&["Low", "High"]).unwrap();
        save_pair(&model_path, &tiny_forest(), &encoder_path, &encoder, "run-1", "then").unwrap();

        // A directory squatting on the model's temp path makes staging fail
        let blocker = tmp_path_for(&model_path);
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), b"x").unwrap();

        let result = save_pair(&model_path, &tiny_forest(), &encoder_path, &encoder, "run-2", "now");
        assert!(matches!(result, Err(RiskError::Io { .. })), "got {:?}", result);

        assert_eq!(load_model(&model_path).unwrap().training_id, "run-1");
        assert_eq!(load_encoder(&encoder_path).unwrap().training_id, "run-1");
        assert!(
            !tmp_path_for(&encoder_path).exists(),
            "encoder temp file should be cleaned up"
        );
    }

    #[test]
    fn test_missing_file_is_artifact_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_model(&dir.path().join("absent.bin"));
        assert!(matches!(result, Err(RiskError::ArtifactLoad { .. })));
    }

    #[test]
    fn test_garbage_is_artifact_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        fs::write(&path, b"definitely not bitcode").unwrap();
        assert!(matches!(load_model(&path), Err(RiskError::ArtifactLoad { .. })));
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("encoder.bin");
        let encoder = LabelEncoder::fit(&["Low"]).unwrap();
        save_encoder(&path, &encoder, "run-1", "now").unwrap();

        match load_model(&path) {
            Err(RiskError::ArtifactLoad { reason, .. }) => assert!(reason.contains("kind")),
            other => panic!("expected ArtifactLoad, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_unsupported_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("encoder.bin");
        let envelope = Envelope {
            format_version: ARTIFACT_FORMAT_VERSION + 1,
            kind: KIND_LABEL_ENCODER.to_string(),
            training_id: "run-1".to_string(),
            created_at: "now".to_string(),
            payload: bitcode::encode(&LabelEncoder::fit(&["Low"]).unwrap()),
        };
        fs::write(&path, bitcode::encode(&envelope)).unwrap();

        match load_encoder(&path) {
            Err(RiskError::ArtifactLoad { reason, .. }) => assert!(reason.contains("version")),
            other => panic!("expected ArtifactLoad, got {:?}", other.map(|_| ())),
        }
    }
}
