// lib.rs - loads the NPK models once and serves three-target predictions
pub mod api;
pub mod common;
pub mod features;
pub mod inference;
pub mod models;

pub use common::{NpkError, NpkResult};
pub use features::InputRecord;
pub use inference::{predict, predict_batch, PredictionResult, Target};
pub use models::{ModelRegistry, RegistryCache};
