use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::model::{DecisionTree, Node, RandomForestModel};

/// Training hyperparameters for the forest.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Number of trees in the ensemble.
    pub n_trees: usize,
    /// Maximum tree depth.
    pub max_depth: usize,
    /// Minimum samples on each side of a split.
    pub min_samples_leaf: usize,
    /// Draw each tree's bootstrap with equal class weight, compensating for
    /// label imbalance in the raw dataset.
    pub balanced_bootstrap: bool,
    /// Seed for bootstrap and feature subsampling randomness.
    pub seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            n_trees: 300,
            max_depth: 32,
            min_samples_leaf: 1,
            balanced_bootstrap: true,
            seed: 42,
        }
    }
}

/// In-memory dataset used for training and evaluation.
#[derive(Debug, Clone)]
pub struct TrainDataset {
    /// Number of `f32` values in each feature vector.
    pub feature_len: usize,
    /// Ordered list of class identifiers.
    pub classes: Vec<String>,
    /// Feature matrix, row-major.
    pub x: Vec<Vec<f32>>,
    /// Class indices aligned with `x`.
    pub y: Vec<usize>,
}

/// Train a random forest with Gini splits and sqrt-feature subsampling.
pub fn train_random_forest(
    dataset: &TrainDataset,
    options: &TrainOptions,
) -> Result<RandomForestModel, String> {
    if dataset.x.len() != dataset.y.len() {
        return Err("Mismatched X/Y lengths".to_string());
    }
    if dataset.x.is_empty() {
        return Err("Empty dataset".to_string());
    }
    let n_classes = dataset.classes.len();
    if n_classes < 2 {
        return Err("Need at least 2 classes".to_string());
    }
    if options.n_trees == 0 {
        return Err("Need at least 1 tree".to_string());
    }
    for (idx, row) in dataset.x.iter().enumerate() {
        if row.len() != dataset.feature_len {
            return Err(format!(
                "Row {idx} has {} features but expected {}",
                row.len(),
                dataset.feature_len
            ));
        }
    }
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (idx, &label) in dataset.y.iter().enumerate() {
        if label >= n_classes {
            return Err(format!("Row {idx} has out-of-range class index {label}"));
        }
        by_class[label].push(idx);
    }
    for (class_idx, rows) in by_class.iter().enumerate() {
        if rows.is_empty() {
            return Err(format!(
                "Class '{}' has no training rows",
                dataset.classes[class_idx]
            ));
        }
    }

    let mtry = ((dataset.feature_len as f64).sqrt().ceil() as usize)
        .clamp(1, dataset.feature_len);
    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut grower = TreeGrower {
        x: &dataset.x,
        y: &dataset.y,
        n_classes,
        feature_len: dataset.feature_len,
        mtry,
        max_depth: options.max_depth.max(1),
        min_samples_leaf: options.min_samples_leaf.max(1),
    };

    let mut trees = Vec::with_capacity(options.n_trees);
    for _ in 0..options.n_trees {
        let sample = bootstrap_indices(
            &mut rng,
            dataset.x.len(),
            &by_class,
            options.balanced_bootstrap,
        );
        trees.push(grower.grow_tree(&mut rng, sample));
    }

    Ok(RandomForestModel {
        model_version: 1,
        feature_len: dataset.feature_len,
        classes: dataset.classes.clone(),
        trees,
    })
}

/// Bootstrap resample of row indices, optionally class-balanced.
fn bootstrap_indices(
    rng: &mut StdRng,
    n: usize,
    by_class: &[Vec<usize>],
    balanced: bool,
) -> Vec<usize> {
    let mut out = Vec::with_capacity(n);
    if balanced {
        let k = by_class.len();
        for _ in 0..n {
            let rows = &by_class[rng.random_range(0..k)];
            out.push(rows[rng.random_range(0..rows.len())]);
        }
    } else {
        for _ in 0..n {
            out.push(rng.random_range(0..n));
        }
    }
    out
}

struct TreeGrower<'a> {
    x: &'a [Vec<f32>],
    y: &'a [usize],
    n_classes: usize,
    feature_len: usize,
    mtry: usize,
    max_depth: usize,
    min_samples_leaf: usize,
}

impl TreeGrower<'_> {
    fn grow_tree(&mut self, rng: &mut StdRng, indices: Vec<usize>) -> DecisionTree {
        let mut nodes = Vec::new();
        self.grow_node(rng, &mut nodes, indices, 0);
        DecisionTree { nodes }
    }

    fn grow_node(
        &mut self,
        rng: &mut StdRng,
        nodes: &mut Vec<Node>,
        indices: Vec<usize>,
        depth: usize,
    ) -> u32 {
        let counts = self.class_counts(&indices);
        let node_idx = nodes.len();
        if depth >= self.max_depth
            || indices.len() < 2 * self.min_samples_leaf
            || is_pure(&counts)
        {
            nodes.push(leaf_node(&counts));
            return node_idx as u32;
        }

        let Some(split) = self.best_split(rng, &indices) else {
            nodes.push(leaf_node(&counts));
            return node_idx as u32;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[i][split.feature] <= split.threshold);
        // Placeholder so children land at higher indices.
        nodes.push(Node::Leaf {
            distribution: Vec::new(),
        });
        let left = self.grow_node(rng, nodes, left_rows, depth + 1);
        let right = self.grow_node(rng, nodes, right_rows, depth + 1);
        nodes[node_idx] = Node::Split {
            feature_index: split.feature as u16,
            threshold: split.threshold,
            left,
            right,
        };
        node_idx as u32
    }

    fn class_counts(&self, indices: &[usize]) -> Vec<u32> {
        let mut counts = vec![0u32; self.n_classes];
        for &i in indices {
            counts[self.y[i]] += 1;
        }
        counts
    }

    /// Search a random feature subset for the lowest-impurity split.
    fn best_split(&self, rng: &mut StdRng, indices: &[usize]) -> Option<SplitCandidate> {
        let mut features: Vec<usize> = (0..self.feature_len).collect();
        features.shuffle(rng);
        features.truncate(self.mtry);

        let mut best: Option<SplitCandidate> = None;
        for feature in features {
            let Some(candidate) = self.best_split_for_feature(indices, feature) else {
                continue;
            };
            let better = best
                .as_ref()
                .map(|b| candidate.impurity < b.impurity)
                .unwrap_or(true);
            if better {
                best = Some(candidate);
            }
        }
        best
    }

    fn best_split_for_feature(
        &self,
        indices: &[usize],
        feature: usize,
    ) -> Option<SplitCandidate> {
        let mut values: Vec<(f32, usize)> = indices
            .iter()
            .map(|&i| (self.x[i][feature], self.y[i]))
            .collect();
        values.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = values.len();
        let total = {
            let mut counts = vec![0u32; self.n_classes];
            for &(_, class) in &values {
                counts[class] += 1;
            }
            counts
        };

        let mut left = vec![0u32; self.n_classes];
        let mut best: Option<SplitCandidate> = None;
        for boundary in 1..n {
            left[values[boundary - 1].1] += 1;
            if values[boundary].0 == values[boundary - 1].0 {
                continue;
            }
            let left_n = boundary;
            let right_n = n - boundary;
            if left_n < self.min_samples_leaf || right_n < self.min_samples_leaf {
                continue;
            }
            let mut right = total.clone();
            for (r, l) in right.iter_mut().zip(&left) {
                *r -= l;
            }
            let impurity = (left_n as f64 * gini(&left, left_n)
                + right_n as f64 * gini(&right, right_n))
                / n as f64;
            let better = best
                .as_ref()
                .map(|b| impurity < b.impurity)
                .unwrap_or(true);
            if better {
                best = Some(SplitCandidate {
                    feature,
                    threshold: midpoint(values[boundary - 1].0, values[boundary].0),
                    impurity,
                });
            }
        }
        best
    }
}

#[derive(Debug, Clone)]
struct SplitCandidate {
    feature: usize,
    threshold: f32,
    impurity: f64,
}

fn is_pure(counts: &[u32]) -> bool {
    counts.iter().filter(|&&c| c > 0).count() <= 1
}

fn leaf_node(counts: &[u32]) -> Node {
    let total: u32 = counts.iter().sum();
    let distribution = if total == 0 {
        vec![1.0 / counts.len() as f32; counts.len()]
    } else {
        counts.iter().map(|&c| c as f32 / total as f32).collect()
    };
    Node::Leaf { distribution }
}

fn gini(counts: &[u32], n: usize) -> f64 {
    let n = n as f64;
    let mut sum_sq = 0.0;
    for &c in counts {
        let p = c as f64 / n;
        sum_sq += p * p;
    }
    1.0 - sum_sq
}

/// Split threshold between two adjacent sorted values, kept strictly below
/// the right value so `<=` routing separates them.
fn midpoint(low: f32, high: f32) -> f32 {
    let mid = low + (high - low) / 2.0;
    if mid >= high { low } else { mid }
}
