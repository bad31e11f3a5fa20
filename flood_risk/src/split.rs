/// Seeded train/evaluation partitioning.
///
/// Row indices are shuffled with a `ChaCha8Rng` seeded from a `u64`, so the
/// same row count and seed yield the same partition on every platform. The
/// evaluation subset takes the first `ceil(n * test_fraction)` shuffled
/// indices; the rest train.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::model::RiskError;

/// Row indices of each subset, in shuffled order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

pub fn train_test_split(
    n_rows: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<SplitIndices, RiskError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(RiskError::Config(format!(
            "test_fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }

    let n_test = (n_rows as f64 * test_fraction).ceil() as usize;
    let n_train = n_rows.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(RiskError::InsufficientData(format!(
            "{} row(s) cannot be split into non-empty train and evaluation subsets \
             (test_fraction {})",
            n_rows, test_fraction
        )));
    }

    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok(SplitIndices {
        train,
        test: indices,
    })
}

/// Picks the rows at `indices` out of `items`.
pub fn select<T: Clone>(items: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| items[i].clone()).collect()
}
