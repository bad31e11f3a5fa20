/// CART decision tree with Gini impurity.
///
/// Nodes are stored flat in a `Vec` and reference children by index, which
/// keeps the tree trivially serializable. Each split compares one feature
/// against a real-valued threshold (midpoint between adjacent distinct
/// values); rows with `value <= threshold` go left.

use bitcode::{Decode, Encode};
use rand::seq::SliceRandom;
use rand::Rng;

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub enum Node {
    /// Training-row class counts that reached this leaf.
    Leaf { class_counts: Vec<u32> },
    Split {
        feature: u32,
        threshold: f64,
        left: u32,
        right: u32,
    },
}

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeParams {
    /// `None` grows until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Features examined per split.
    pub max_features: usize,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    n_classes: u32,
}

/// Best split found for one node.
struct Candidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl DecisionTree {
    /// Grows a tree over the rows of `x` listed in `indices`.
    ///
    /// `indices` may repeat rows (bootstrap resample). Callers guarantee it is
    /// non-empty, that every row has the same width, and that every label is
    /// below `n_classes`.
    pub fn fit<R: Rng>(
        x: &[Vec<f64>],
        y: &[u32],
        indices: &[usize],
        n_classes: u32,
        params: &TreeParams,
        rng: &mut R,
    ) -> Self {
        let mut tree = DecisionTree {
            nodes: Vec::new(),
            n_classes,
        };
        let mut rows = indices.to_vec();
        tree.grow(x, y, &mut rows, 0, params, rng);
        tree
    }

    pub fn n_classes(&self) -> u32 {
        self.n_classes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => {
                    1 + walk(nodes, *left as usize).max(walk(nodes, *right as usize))
                }
            }
        }
        if self.nodes.is_empty() { 0 } else { walk(&self.nodes, 0) }
    }

    /// Class counts of the leaf `sample` lands in.
    pub fn leaf_counts(&self, sample: &[f64]) -> &[u32] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { class_counts } => return class_counts,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if sample[*feature as usize] <= *threshold {
                        *left as usize
                    } else {
                        *right as usize
                    };
                }
            }
        }
    }

    /// Majority class of the leaf `sample` lands in; ties go to the lowest code.
    pub fn predict(&self, sample: &[f64]) -> u32 {
        argmax(self.leaf_counts(sample))
    }

    /// Structural checks run after decoding a persisted tree.
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { class_counts } => {
                    if class_counts.len() != self.n_classes as usize {
                        return Err(format!(
                            "leaf {} has {} class counts, expected {}",
                            i,
                            class_counts.len(),
                            self.n_classes
                        ));
                    }
                }
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature as usize >= n_features {
                        return Err(format!("node {} splits on feature {}", i, feature));
                    }
                    // Children are always pushed after their parent.
                    let in_range = |c: u32| (c as usize) > i && (c as usize) < self.nodes.len();
                    if !in_range(*left) || !in_range(*right) {
                        return Err(format!("node {} has out-of-range children", i));
                    }
                }
            }
        }
        Ok(())
    }

    fn grow<R: Rng>(
        &mut self,
        x: &[Vec<f64>],
        y: &[u32],
        rows: &mut [usize],
        depth: usize,
        params: &TreeParams,
        rng: &mut R,
    ) -> u32 {
        let node_id = self.nodes.len();
        let counts = class_counts(y, rows, self.n_classes);
        self.nodes.push(Node::Leaf {
            class_counts: counts.clone(),
        });

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_reached = params.max_depth.is_some_and(|max| depth >= max);
        if pure || depth_reached || rows.len() < params.min_samples_split.max(2) {
            return node_id as u32;
        }

        let best = match best_split(x, y, rows, self.n_classes, params.max_features, rng) {
            Some(best) => best,
            None => return node_id as u32, // every feature constant here
        };

        let n_left = partition(rows, |&r| x[r][best.feature] <= best.threshold);
        let (left_rows, right_rows) = rows.split_at_mut(n_left);
        let left = self.grow(x, y, left_rows, depth + 1, params, rng);
        let right = self.grow(x, y, right_rows, depth + 1, params, rng);

        self.nodes[node_id] = Node::Split {
            feature: best.feature as u32,
            threshold: best.threshold,
            left,
            right,
        };
        node_id as u32
    }
}

/// Examines features in random order until `max_features` non-constant ones
/// have been scored; constant features don't count toward the budget.
fn best_split<R: Rng>(
    x: &[Vec<f64>],
    y: &[u32],
    rows: &[usize],
    n_classes: u32,
    max_features: usize,
    rng: &mut R,
) -> Option<Candidate> {
    let n_features = x[rows[0]].len();
    let mut features: Vec<usize> = (0..n_features).collect();
    features.shuffle(rng);

    let mut best: Option<Candidate> = None;
    let mut visited = 0;
    for feature in features {
        if visited >= max_features.max(1) {
            break;
        }
        let Some(candidate) = best_split_on_feature(x, y, rows, n_classes, feature) else {
            continue;
        };
        visited += 1;
        if best.as_ref().is_none_or(|b| candidate.impurity < b.impurity) {
            best = Some(candidate);
        }
    }
    best
}

/// Lowest weighted Gini split on one feature, or `None` if it is constant
/// over `rows`.
fn best_split_on_feature(
    x: &[Vec<f64>],
    y: &[u32],
    rows: &[usize],
    n_classes: u32,
    feature: usize,
) -> Option<Candidate> {
    let mut sorted: Vec<(f64, u32)> = rows.iter().map(|&r| (x[r][feature], y[r])).collect();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n = sorted.len();
    let mut left = vec![0u32; n_classes as usize];
    let mut right = vec![0u32; n_classes as usize];
    for &(_, label) in &sorted {
        right[label as usize] += 1;
    }

    let mut best: Option<Candidate> = None;
    for k in 1..n {
        let (prev_value, prev_label) = sorted[k - 1];
        left[prev_label as usize] += 1;
        right[prev_label as usize] -= 1;

        let value = sorted[k].0;
        if prev_value >= value {
            continue;
        }

        let impurity = (k as f64 * gini(&left, k) + (n - k) as f64 * gini(&right, n - k)) / n as f64;
        if best.as_ref().is_none_or(|b| impurity < b.impurity) {
            let mid = prev_value + (value - prev_value) / 2.0;
            // Adjacent floats can round the midpoint up onto `value`.
            let threshold = if mid < value { mid } else { prev_value };
            best = Some(Candidate {
                feature,
                threshold,
                impurity,
            });
        }
    }
    best
}

fn gini(counts: &[u32], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

fn class_counts(y: &[u32], rows: &[usize], n_classes: u32) -> Vec<u32> {
    let mut counts = vec![0u32; n_classes as usize];
    for &r in rows {
        counts[y[r] as usize] += 1;
    }
    counts
}

/// Reorders `rows` so matching entries come first; returns how many matched.
fn partition<F: Fn(&usize) -> bool>(rows: &mut [usize], pred: F) -> usize {
    let mut next = 0;
    for i in 0..rows.len() {
        if pred(&rows[i]) {
            rows.swap(next, i);
            next += 1;
        }
    }
    next
}

/// Index of the largest count; ties resolve to the lowest index.
pub(crate) fn argmax(counts: &[u32]) -> u32 {
    let mut best = 0;
    for (i, &c) in counts.iter().enumerate() {
        if c > counts[best] {
            best = i;
        }
    }
    best as u32
}
