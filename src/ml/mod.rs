//! Machine learning building blocks for training and inference.

pub mod forest;
pub mod metrics;
