//! Concrete regressor families stored in artefact files.
//!
//! Every model reads its inputs by column name, so rows may carry extra
//! columns in any order. A column the model needs but the row lacks is an
//! inference error, as is a non-finite output.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::common::error::{NpkError, NpkResult};
use crate::features::FeatureRow;

use super::domain::{ModelKind, Regressor};

/// `intercept + Σ coefficient_i * x_i`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub features: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

/// One node of a flattened binary regression tree. Node 0 is the root.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// Go `left` when `x[feature] <= threshold`, otherwise `right`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf { leaf: f64 },
}

/// Flattened tree; children always sit at higher indices than their parent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tree(pub Vec<TreeNode>);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeModel {
    pub features: Vec<String>,
    pub nodes: Tree,
}

/// Mean of the member trees.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    pub features: Vec<String>,
    pub trees: Vec<Tree>,
}

/// `init + learning_rate * Σ tree(x)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoostedModel {
    pub features: Vec<String>,
    pub init: f64,
    pub learning_rate: f64,
    pub trees: Vec<Tree>,
}

fn validate_features(features: &[String]) -> Result<(), String> {
    if features.is_empty() {
        return Err("model declares no features".to_string());
    }
    let mut seen = HashSet::new();
    for name in features {
        if !seen.insert(name.as_str()) {
            return Err(format!("duplicate feature '{name}'"));
        }
    }
    Ok(())
}

fn validate_finite(label: &str, value: f64) -> Result<(), String> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(format!("{label} is not finite"))
    }
}

fn validate_trees(trees: &[Tree], n_features: usize) -> Result<(), String> {
    if trees.is_empty() {
        return Err("ensemble has no trees".to_string());
    }
    for (idx, tree) in trees.iter().enumerate() {
        tree.validate(n_features)
            .map_err(|e| format!("tree {idx}: {e}"))?;
    }
    Ok(())
}

/// Pull the model's columns out of the row, in the model's order.
fn gather(features: &[String], row: &FeatureRow) -> NpkResult<Vec<f64>> {
    features
        .iter()
        .map(|name| {
            row.get(name).ok_or_else(|| {
                NpkError::inference(format!(
                    "input is missing column '{name}' required by the model"
                ))
            })
        })
        .collect()
}

fn finite(value: f64) -> NpkResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(NpkError::inference(format!("model produced a non-finite value ({value})")))
    }
}

impl Tree {
    fn validate(&self, n_features: usize) -> Result<(), String> {
        let len = self.0.len();
        if len == 0 {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.0.iter().enumerate() {
            match *node {
                TreeNode::Leaf { leaf } => validate_finite(&format!("leaf {idx}"), leaf)?,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= n_features {
                        return Err(format!("node {idx} splits on unknown feature {feature}"));
                    }
                    validate_finite(&format!("threshold of node {idx}"), threshold)?;
                    for child in [left, right] {
                        if child <= idx || child >= len {
                            return Err(format!("node {idx} links to invalid child {child}"));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Walk from the root to a leaf. Links only move forward, so this ends.
    fn evaluate(&self, x: &[f64]) -> NpkResult<f64> {
        let mut idx = 0;
        loop {
            let node = self
                .0
                .get(idx)
                .ok_or_else(|| NpkError::inference(format!("tree node {idx} out of range")))?;
            match *node {
                TreeNode::Leaf { leaf } => return Ok(leaf),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = x.get(feature).copied().ok_or_else(|| {
                        NpkError::inference(format!("tree splits on unknown feature {feature}"))
                    })?;
                    idx = if value <= threshold { left } else { right };
                }
            }
        }
    }
}

impl LinearModel {
    pub(crate) fn validate(&self) -> Result<(), String> {
        validate_features(&self.features)?;
        if self.coefficients.len() != self.features.len() {
            return Err(format!(
                "{} coefficients for {} features",
                self.coefficients.len(),
                self.features.len()
            ));
        }
        for (name, coef) in self.features.iter().zip(&self.coefficients) {
            validate_finite(&format!("coefficient for '{name}'"), *coef)?;
        }
        validate_finite("intercept", self.intercept)
    }
}

impl TreeModel {
    pub(crate) fn validate(&self) -> Result<(), String> {
        validate_features(&self.features)?;
        self.nodes.validate(self.features.len())
    }
}

impl ForestModel {
    pub(crate) fn validate(&self) -> Result<(), String> {
        validate_features(&self.features)?;
        validate_trees(&self.trees, self.features.len())
    }
}

impl BoostedModel {
    pub(crate) fn validate(&self) -> Result<(), String> {
        validate_features(&self.features)?;
        validate_finite("init", self.init)?;
        validate_finite("learning_rate", self.learning_rate)?;
        validate_trees(&self.trees, self.features.len())
    }
}

impl Regressor for LinearModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Linear
    }

    fn features(&self) -> &[String] {
        &self.features
    }

    fn predict(&self, row: &FeatureRow) -> NpkResult<f64> {
        let x = gather(&self.features, row)?;
        let dot: f64 = x.iter().zip(&self.coefficients).map(|(x, c)| x * c).sum();
        finite(self.intercept + dot)
    }
}

impl Regressor for TreeModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Tree
    }

    fn features(&self) -> &[String] {
        &self.features
    }

    fn predict(&self, row: &FeatureRow) -> NpkResult<f64> {
        let x = gather(&self.features, row)?;
        finite(self.nodes.evaluate(&x)?)
    }
}

impl Regressor for ForestModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Forest
    }

    fn features(&self) -> &[String] {
        &self.features
    }

    fn predict(&self, row: &FeatureRow) -> NpkResult<f64> {
        if self.trees.is_empty() {
            return Err(NpkError::inference("forest has no trees"));
        }
        let x = gather(&self.features, row)?;
        let mut sum = 0.0;
        for tree in &self.trees {
            sum += tree.evaluate(&x)?;
        }
        finite(sum / self.trees.len() as f64)
    }
}

impl Regressor for BoostedModel {
    fn kind(&self) -> ModelKind {
        ModelKind::GradientBoosting
    }

    fn features(&self) -> &[String] {
        &self.features
    }

    fn predict(&self, row: &FeatureRow) -> NpkResult<f64> {
        let x = gather(&self.features, row)?;
        let mut sum = 0.0;
        for tree in &self.trees {
            sum += tree.evaluate(&x)?;
        }
        finite(self.init + self.learning_rate * sum)
    }
}
