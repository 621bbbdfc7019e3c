//! Domain definitions for prediction targets and per-target outcomes.

use std::fmt;

use crate::common::error::NpkError;

/// Unit every prediction is reported in.
pub const UNIT: &str = "mg/Kg";

/// Message shown when a target's model is absent from the registry.
pub const NO_MODEL_MESSAGE: &str = "no model selected";

/// Nutrients predicted for every request, each by its own model.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Target {
    Nitrogen,
    Phosphorus,
    Potassium,
}

impl Target {
    pub const ALL: [Target; 3] = [Target::Nitrogen, Target::Phosphorus, Target::Potassium];

    /// Registry key of the model that predicts this target.
    pub fn model_name(&self) -> &'static str {
        match self {
            Target::Nitrogen => "Model N",
            Target::Phosphorus => "Model P",
            Target::Potassium => "Model K",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Target::Nitrogen => "Nitrogen",
            Target::Phosphorus => "Phosphorus",
            Target::Potassium => "Potassium",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Target::Nitrogen => "nitrogen",
            Target::Phosphorus => "phosphorus",
            Target::Potassium => "potassium",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FailureKind {
    MissingModel,
    Inference,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::MissingModel => "missing_model",
            FailureKind::Inference => "inference_error",
        }
    }
}

/// Why a single target has no value.
#[derive(Clone, Debug, PartialEq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    /// Human readable text for the result card.
    pub fn display(&self) -> String {
        match self.kind {
            FailureKind::MissingModel => NO_MODEL_MESSAGE.to_string(),
            FailureKind::Inference => format!(
                "An error occurred while generating predictions: {}",
                self.message
            ),
        }
    }
}

impl From<NpkError> for Failure {
    fn from(err: NpkError) -> Self {
        let kind = match err {
            NpkError::MissingModel { .. } => FailureKind::MissingModel,
            _ => FailureKind::Inference,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

/// Value or failure of one target.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Value(f64),
    Failed(Failure),
}

impl Outcome {
    pub fn value(&self) -> Option<f64> {
        match self {
            Outcome::Value(v) => Some(*v),
            Outcome::Failed(_) => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Value(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Value(v) => f.write_str(&format_value(*v)),
            Outcome::Failed(failure) => f.write_str(&failure.display()),
        }
    }
}

/// Two decimals followed by the unit, e.g. `12.34 mg/Kg`.
pub fn format_value(value: f64) -> String {
    format!("{value:.2} {UNIT}")
}

/// One slot per target, always all three.
#[derive(Clone, Debug, PartialEq)]
pub struct PredictionResult {
    pub nitrogen: Outcome,
    pub phosphorus: Outcome,
    pub potassium: Outcome,
}

impl PredictionResult {
    pub fn get(&self, target: Target) -> &Outcome {
        match target {
            Target::Nitrogen => &self.nitrogen,
            Target::Phosphorus => &self.phosphorus,
            Target::Potassium => &self.potassium,
        }
    }

    pub fn entries(&self) -> [(Target, &Outcome); 3] {
        Target::ALL.map(|t| (t, self.get(t)))
    }

    /// Targets whose models produced a value.
    pub fn succeeded(&self) -> usize {
        self.entries().iter().filter(|(_, o)| o.is_ok()).count()
    }
}
