//! Inference domain: the three-target prediction pipeline.

pub mod domain;
pub mod service;

pub use domain::{format_value, Failure, FailureKind, Outcome, PredictionResult, Target};
pub use service::{predict, predict_batch};
