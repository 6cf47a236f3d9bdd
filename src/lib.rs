//! Reservation no-show risk classification.
//!
//! A deterministic one-hot feature encoder plus a random-forest classifier,
//! trained from a labeled CSV dataset and persisted as a single JSON model
//! bundle that the inference CLI loads unmodified.

/// Model bundle persistence and prediction.
pub mod bundle;
/// CSV dataset loading and stratified splitting.
pub mod dataset;
/// One-hot feature encoding.
pub mod encode;
/// Logging setup for the CLIs.
pub mod logging;
/// Machine learning building blocks.
pub mod ml;
/// Feature table types and the fixed reservation schema.
pub mod schema;
/// End-to-end training flow.
pub mod train;
