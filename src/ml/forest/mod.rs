//! Random-forest classifier over encoded feature vectors.
//!
//! An ensemble of independently trained CART trees: each tree is grown on a
//! class-balanced bootstrap resample with random feature subsampling at every
//! split, votes with its leaf class distribution, and the forest averages the
//! votes. Models serialize to JSON via serde and reload byte-for-byte.

mod model;
mod train;

pub use model::{DecisionTree, Node, RandomForestModel};
pub use train::{TrainDataset, TrainOptions, train_random_forest};
