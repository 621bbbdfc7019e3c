//! Input features: the six environmental measurements and the single-row
//! shape handed to models.

pub mod domain;

pub use domain::{Feature, FeatureRow, InputRecord};
