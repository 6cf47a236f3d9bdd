use serde::{Deserialize, Serialize};

/// One node of a decision tree, indexing into the tree's flat node array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Node {
    /// Internal split: `feature <= threshold` goes left, otherwise right.
    Split {
        feature_index: u16,
        threshold: f32,
        left: u32,
        right: u32,
    },
    /// Terminal node holding a normalized class distribution.
    Leaf { distribution: Vec<f32> },
}

/// A single CART tree stored as a flat node array rooted at index 0.
///
/// Children always sit at higher indices than their parent, so a validated
/// tree cannot loop during prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

impl DecisionTree {
    /// Walk the tree for a feature vector and return the leaf distribution.
    pub fn predict_distribution(&self, features: &[f32]) -> &[f32] {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature_index,
                    threshold,
                    left,
                    right,
                } => {
                    let value = features
                        .get(*feature_index as usize)
                        .copied()
                        .unwrap_or(0.0);
                    idx = if value <= *threshold {
                        *left as usize
                    } else {
                        *right as usize
                    };
                }
            }
        }
    }
}

/// Random-forest model for multi-class classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestModel {
    /// Model format version.
    pub model_version: i64,
    /// Number of `f32` values per feature vector.
    pub feature_len: usize,
    /// Ordered list of class identifiers.
    pub classes: Vec<String>,
    /// Trained trees.
    pub trees: Vec<DecisionTree>,
}

impl RandomForestModel {
    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<(), String> {
        if self.classes.len() < 2 {
            return Err("Model must contain at least 2 classes".to_string());
        }
        if self.trees.is_empty() {
            return Err("Model must contain at least 1 tree".to_string());
        }
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(format!("Tree {tree_idx} has no nodes"));
            }
            for (node_idx, node) in tree.nodes.iter().enumerate() {
                match node {
                    Node::Leaf { distribution } => {
                        if distribution.len() != self.classes.len() {
                            return Err(format!(
                                "Tree {tree_idx} node {node_idx} has {} probabilities but expected {}",
                                distribution.len(),
                                self.classes.len()
                            ));
                        }
                    }
                    Node::Split {
                        feature_index,
                        left,
                        right,
                        ..
                    } => {
                        if *feature_index as usize >= self.feature_len {
                            return Err(format!(
                                "Tree {tree_idx} node {node_idx} splits on feature {feature_index} out of {}",
                                self.feature_len
                            ));
                        }
                        let n = tree.nodes.len();
                        for child in [*left as usize, *right as usize] {
                            if child <= node_idx || child >= n {
                                return Err(format!(
                                    "Tree {tree_idx} node {node_idx} has invalid child index {child}"
                                ));
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Predict class probabilities by averaging per-tree leaf distributions.
    ///
    /// One entry per class in `classes` order, values in `[0, 1]` summing
    /// to 1.
    pub fn predict_proba(&self, features: &[f32]) -> Vec<f32> {
        let k = self.classes.len();
        let mut sums = vec![0.0f32; k];
        for tree in &self.trees {
            let distribution = tree.predict_distribution(features);
            for (slot, &p) in sums.iter_mut().zip(distribution.iter()) {
                *slot += p;
            }
        }
        let total: f32 = sums.iter().sum();
        if total <= 0.0 {
            return vec![1.0 / k as f32; k];
        }
        for v in &mut sums {
            *v /= total;
        }
        sums
    }

    /// Predict the best class index for a feature vector.
    pub fn predict_class_index(&self, features: &[f32]) -> usize {
        argmax(&self.predict_proba(features))
    }
}

pub(crate) fn argmax(values: &[f32]) -> usize {
    let mut best_idx = 0usize;
    let mut best_val = f32::NEG_INFINITY;
    for (idx, &v) in values.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best_idx = idx;
        }
    }
    best_idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_split_tree() -> DecisionTree {
        DecisionTree {
            nodes: vec![
                Node::Split {
                    feature_index: 0,
                    threshold: 0.5,
                    left: 1,
                    right: 2,
                },
                Node::Leaf {
                    distribution: vec![1.0, 0.0],
                },
                Node::Leaf {
                    distribution: vec![0.0, 1.0],
                },
            ],
        }
    }

    #[test]
    fn tree_routes_on_threshold() {
        let tree = single_split_tree();
        assert_eq!(tree.predict_distribution(&[0.0]), &[1.0, 0.0]);
        assert_eq!(tree.predict_distribution(&[0.5]), &[1.0, 0.0]);
        assert_eq!(tree.predict_distribution(&[0.6]), &[0.0, 1.0]);
    }

    #[test]
    fn forest_averages_tree_votes() {
        let model = RandomForestModel {
            model_version: 1,
            feature_len: 1,
            classes: vec!["a".into(), "b".into()],
            trees: vec![
                single_split_tree(),
                DecisionTree {
                    nodes: vec![Node::Leaf {
                        distribution: vec![0.5, 0.5],
                    }],
                },
            ],
        };
        model.validate().unwrap();
        let proba = model.predict_proba(&[0.0]);
        assert!((proba[0] - 0.75).abs() < 1e-6);
        assert!((proba[1] - 0.25).abs() < 1e-6);
        assert_eq!(model.predict_class_index(&[0.0]), 0);
        assert_eq!(model.predict_class_index(&[1.0]), 1);
    }

    #[test]
    fn validate_rejects_bad_child_index() {
        let model = RandomForestModel {
            model_version: 1,
            feature_len: 1,
            classes: vec!["a".into(), "b".into()],
            trees: vec![DecisionTree {
                nodes: vec![Node::Split {
                    feature_index: 0,
                    threshold: 0.0,
                    left: 0,
                    right: 1,
                }],
            }],
        };
        assert!(model.validate().is_err());
    }
}
