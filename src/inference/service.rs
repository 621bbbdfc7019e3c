//! The prediction pipeline: one record in, one slot per target out.
//!
//! Each target is computed by its own call and fails on its own; a missing
//! or broken model never affects the other two.

use std::time::Instant;

use tracing::debug;

use crate::common::error::NpkResult;
use crate::common::time;
use crate::features::{FeatureRow, InputRecord};
use crate::models::ModelRegistry;

use super::domain::{Failure, Outcome, PredictionResult, Target};

/// Look up the target's model and run it on `row`.
pub fn predict_value(registry: &ModelRegistry, target: Target, row: &FeatureRow) -> NpkResult<f64> {
    let model = registry.lookup(target.model_name())?;
    model.predict(row)
}

/// Compute a single target, turning any error into a failed slot.
pub fn predict_target(registry: &ModelRegistry, target: Target, row: &FeatureRow) -> Outcome {
    match predict_value(registry, target, row) {
        Ok(value) => Outcome::Value(value),
        Err(err) => {
            debug!(
                nutrient = target.label(),
                model = target.model_name(),
                error = %err,
                "prediction failed"
            );
            Outcome::Failed(Failure::from(err))
        }
    }
}

/// Run all three targets for one record.
pub fn predict(registry: &ModelRegistry, input: &InputRecord) -> PredictionResult {
    let start = Instant::now();
    let row = input.to_row();

    let result = PredictionResult {
        nitrogen: predict_target(registry, Target::Nitrogen, &row),
        phosphorus: predict_target(registry, Target::Phosphorus, &row),
        potassium: predict_target(registry, Target::Potassium, &row),
    };

    debug!(
        succeeded = result.succeeded(),
        dur_ms = time::elapsed_ms(start),
        "prediction request served"
    );
    result
}

/// Run [`predict`] for every record, preserving order.
pub fn predict_batch(registry: &ModelRegistry, inputs: &[InputRecord]) -> Vec<PredictionResult> {
    inputs.iter().map(|input| predict(registry, input)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::NpkError;
    use crate::inference::domain::FailureKind;
    use crate::models::regressors::LinearModel;
    use crate::models::{ModelKind, Regressor};

    struct Exploding;

    impl Regressor for Exploding {
        fn kind(&self) -> ModelKind {
            ModelKind::Linear
        }

        fn features(&self) -> &[String] {
            &[]
        }

        fn predict(&self, _row: &FeatureRow) -> NpkResult<f64> {
            Err(NpkError::inference("shape mismatch"))
        }
    }

    fn rh_model(intercept: f64) -> LinearModel {
        LinearModel {
            features: vec!["RH".to_string()],
            coefficients: vec![0.1],
            intercept,
        }
    }

    fn full_registry() -> ModelRegistry {
        ModelRegistry::empty()
            .with_model("Model N", rh_model(1.0))
            .with_model("Model P", rh_model(2.0))
            .with_model("Model K", rh_model(3.0))
    }

    #[test]
    fn all_three_targets_are_filled() {
        let input = InputRecord {
            relative_humidity: 80.0,
            ..Default::default()
        };
        let result = predict(&full_registry(), &input);
        assert_eq!(result.nitrogen.value(), Some(9.0));
        assert_eq!(result.phosphorus.value(), Some(10.0));
        assert_eq!(result.potassium.value(), Some(11.0));
        assert_eq!(result.succeeded(), 3);
    }

    #[test]
    fn missing_model_only_fails_its_slot() {
        let registry = ModelRegistry::empty()
            .with_model("Model N", rh_model(1.0))
            .with_model("Model K", rh_model(3.0));
        let result = predict(&registry, &InputRecord::default());

        assert!(result.nitrogen.is_ok());
        assert!(result.potassium.is_ok());
        match &result.phosphorus {
            Outcome::Failed(f) => assert_eq!(f.kind, FailureKind::MissingModel),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(result.phosphorus.to_string(), "no model selected");
    }

    #[test]
    fn raising_model_only_fails_its_slot() {
        let registry = ModelRegistry::empty()
            .with_model("Model N", Exploding)
            .with_model("Model P", rh_model(2.0))
            .with_model("Model K", rh_model(3.0));
        let result = predict(&registry, &InputRecord::default());

        assert_eq!(result.succeeded(), 2);
        assert_eq!(
            result.nitrogen.to_string(),
            "An error occurred while generating predictions: shape mismatch"
        );
    }

    #[test]
    fn empty_registry_still_yields_three_slots() {
        let result = predict(&ModelRegistry::empty(), &InputRecord::default());
        assert_eq!(result.entries().len(), 3);
        assert_eq!(result.succeeded(), 0);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let registry = full_registry();
        let input = InputRecord {
            air_pressure: 1010.0,
            avg_temperature: 27.5,
            relative_humidity: 80.0,
            solar_radiation: 200.0,
            rainfall: 5.0,
            wind_speed: 3.2,
        };
        assert_eq!(predict(&registry, &input), predict(&registry, &input));
    }

    #[test]
    fn batch_keeps_order() {
        let registry = full_registry();
        let inputs = [
            InputRecord {
                relative_humidity: 10.0,
                ..Default::default()
            },
            InputRecord {
                relative_humidity: 20.0,
                ..Default::default()
            },
        ];
        let results = predict_batch(&registry, &inputs);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].nitrogen.value(), Some(2.0));
        assert_eq!(results[1].nitrogen.value(), Some(3.0));
    }
}
