//! Domain types for pre-trained model artefacts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::error::NpkResult;
use crate::features::FeatureRow;

use super::regressors::{BoostedModel, ForestModel, LinearModel, TreeModel};

/// Registry key of a model: the artefact file name without its extension.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    /// Construct a model identifier from a string slice.
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Supported regressor families.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Linear,
    Tree,
    Forest,
    GradientBoosting,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Linear => "linear",
            ModelKind::Tree => "tree",
            ModelKind::Forest => "forest",
            ModelKind::GradientBoosting => "gradient_boosting",
        }
    }
}

/// Anything that turns one feature row into one scalar.
pub trait Regressor: Send + Sync {
    fn kind(&self) -> ModelKind;

    /// Column names the model reads, in training order.
    fn features(&self) -> &[String];

    fn predict(&self, row: &FeatureRow) -> NpkResult<f64>;
}

/// Serialized artefact as stored on disk, tagged by `kind`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Linear(LinearModel),
    Tree(TreeModel),
    Forest(ForestModel),
    GradientBoosting(BoostedModel),
}

impl ModelArtifact {
    /// Parse and validate an artefact from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, String> {
        let artifact: ModelArtifact = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Structural checks that make prediction total: matching lengths and
    /// in-range, forward-only tree links.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ModelArtifact::Linear(m) => m.validate(),
            ModelArtifact::Tree(m) => m.validate(),
            ModelArtifact::Forest(m) => m.validate(),
            ModelArtifact::GradientBoosting(m) => m.validate(),
        }
    }

    fn inner(&self) -> &dyn Regressor {
        match self {
            ModelArtifact::Linear(m) => m,
            ModelArtifact::Tree(m) => m,
            ModelArtifact::Forest(m) => m,
            ModelArtifact::GradientBoosting(m) => m,
        }
    }
}

impl Regressor for ModelArtifact {
    fn kind(&self) -> ModelKind {
        self.inner().kind()
    }

    fn features(&self) -> &[String] {
        self.inner().features()
    }

    fn predict(&self, row: &FeatureRow) -> NpkResult<f64> {
        self.inner().predict(row)
    }
}

/// Listing entry for a loaded artefact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: ModelId,
    pub kind: ModelKind,
    pub features: Vec<String>,
    /// SHA-256 of the artefact bytes, empty for in-memory models.
    pub sha256: String,
}
