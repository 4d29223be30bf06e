//! Inference module
//!
//! Applies a fitted artifact to schema-less prediction records.

mod engine;

pub use engine::{predict, InferenceEngine};
