//! Model artefacts: on-disk format, regressors and the load-once registry.

pub mod domain;
pub mod registry;
pub mod regressors;
pub mod repo_fs;

pub use domain::{ModelArtifact, ModelId, ModelInfo, ModelKind, Regressor};
pub use registry::{ModelRegistry, RegistryCache};
