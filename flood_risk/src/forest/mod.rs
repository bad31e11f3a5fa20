/// Random forest classifier.
///
/// An ensemble of independently grown CART trees. Each tree sees a bootstrap
/// resample of the training rows and examines `floor(sqrt(n_features))`
/// randomly chosen features per split. The final prediction is the majority
/// vote across trees; ties resolve to the lowest label code so that a fixed
/// forest always returns the same answer for the same input.
///
/// Submodules:
/// - `tree` - single CART tree (growth, traversal, structural validation).

pub mod tree;

use bitcode::{Decode, Encode};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::model::{FeatureSchema, RiskError};
use tree::{argmax, DecisionTree, TreeParams};

/// Hyperparameters for `RandomForest::fit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        ForestParams {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct RandomForest {
    schema: FeatureSchema,
    n_classes: u32,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fits `params.n_trees` trees on rows `x` with label codes `y`.
    pub fn fit(
        schema: &FeatureSchema,
        x: &[Vec<f64>],
        y: &[u32],
        n_classes: u32,
        params: &ForestParams,
    ) -> Result<Self, RiskError> {
        if x.is_empty() {
            return Err(RiskError::InsufficientData(
                "cannot fit a forest on zero rows".to_string(),
            ));
        }
        if x.len() != y.len() {
            return Err(RiskError::Schema(format!(
                "{} feature rows but {} labels",
                x.len(),
                y.len()
            )));
        }
        if let Some((i, row)) = x.iter().enumerate().find(|(_, r)| r.len() != schema.len()) {
            return Err(RiskError::Schema(format!(
                "row {} has {} features, schema {:?} expects {}",
                i,
                row.len(),
                schema.features,
                schema.len()
            )));
        }
        if let Some(&code) = y.iter().find(|&&c| c >= n_classes) {
            return Err(RiskError::Schema(format!(
                "label code {} out of range for {} classes",
                code, n_classes
            )));
        }
        if params.n_trees == 0 {
            return Err(RiskError::Config("n_trees must be at least 1".to_string()));
        }

        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            max_features: ((schema.len() as f64).sqrt().floor() as usize).max(1),
        };

        let n_rows = x.len();
        let mut master = ChaCha8Rng::seed_from_u64(params.seed);
        let trees = (0..params.n_trees)
            .map(|_| {
                let mut rng = ChaCha8Rng::seed_from_u64(master.r#gen::<u64>());
                let bootstrap: Vec<usize> = (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();
                DecisionTree::fit(x, y, &bootstrap, n_classes, &tree_params, &mut rng)
            })
            .collect();

        log::debug!(
            "Grew {} trees on {} rows ({} features per split)",
            params.n_trees,
            n_rows,
            tree_params.max_features
        );

        Ok(RandomForest {
            schema: schema.clone(),
            n_classes,
            trees,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn n_classes(&self) -> u32 {
        self.n_classes
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of trees voting for each class code.
    pub fn votes(&self, sample: &[f64]) -> Result<Vec<u32>, RiskError> {
        if sample.len() != self.schema.len() {
            return Err(RiskError::Prediction(format!(
                "model expects {} features {:?}, got {}",
                self.schema.len(),
                self.schema.features,
                sample.len()
            )));
        }
        let mut votes = vec![0u32; self.n_classes as usize];
        for tree in &self.trees {
            votes[tree.predict(sample) as usize] += 1;
        }
        Ok(votes)
    }

    /// Majority-vote class code.
    pub fn predict(&self, sample: &[f64]) -> Result<u32, RiskError> {
        Ok(argmax(&self.votes(sample)?))
    }

    pub fn predict_all(&self, rows: &[Vec<f64>]) -> Result<Vec<u32>, RiskError> {
        rows.iter().map(|r| self.predict(r)).collect()
    }

    /// Structural checks run after decoding a persisted forest.
    pub fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        if self.n_classes == 0 {
            return Err("forest has zero classes".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            if tree.n_classes() != self.n_classes {
                return Err(format!(
                    "tree {} has {} classes, forest has {}",
                    i,
                    tree.n_classes(),
                    self.n_classes
                ));
            }
            tree.validate(self.schema.len())
                .map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }
}
