//! Core input definitions.
//!
//! Values are forwarded as entered. No range validation happens here; a
//! physically meaningless reading still reaches the models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::common::error::{NpkError, NpkResult};

/// One of the six measured inputs.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Feature {
    AirPressure,
    AvgTemperature,
    RelativeHumidity,
    SolarRadiation,
    Rainfall,
    WindSpeed,
}

impl Feature {
    /// All features in form order.
    pub const ALL: [Feature; 6] = [
        Feature::AirPressure,
        Feature::AvgTemperature,
        Feature::RelativeHumidity,
        Feature::SolarRadiation,
        Feature::Rainfall,
        Feature::WindSpeed,
    ];

    /// Column name the models were trained against.
    pub fn column(&self) -> &'static str {
        match self {
            Feature::AirPressure => "Tekanan Udara",
            Feature::AvgTemperature => "Suhu Avg",
            Feature::RelativeHumidity => "RH",
            Feature::SolarRadiation => "SR",
            Feature::Rainfall => "Rainfall",
            Feature::WindSpeed => "WS",
        }
    }

    /// Key used in JSON bodies and query strings.
    pub fn key(&self) -> &'static str {
        match self {
            Feature::AirPressure => "air_pressure",
            Feature::AvgTemperature => "avg_temperature",
            Feature::RelativeHumidity => "relative_humidity",
            Feature::SolarRadiation => "solar_radiation",
            Feature::Rainfall => "rainfall",
            Feature::WindSpeed => "wind_speed",
        }
    }

    /// Human readable label for forms and CLI output.
    pub fn label(&self) -> &'static str {
        match self {
            Feature::AirPressure => "Air Pressure",
            Feature::AvgTemperature => "Average Temperature",
            Feature::RelativeHumidity => "Relative Humidity",
            Feature::SolarRadiation => "Solar Radiation",
            Feature::Rainfall => "Rainfall",
            Feature::WindSpeed => "Wind Speed",
        }
    }
}

/// The six named inputs of a prediction request. Absent fields default to 0.0.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputRecord {
    pub air_pressure: f64,
    pub avg_temperature: f64,
    pub relative_humidity: f64,
    pub solar_radiation: f64,
    pub rainfall: f64,
    pub wind_speed: f64,
}

impl InputRecord {
    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::AirPressure => self.air_pressure,
            Feature::AvgTemperature => self.avg_temperature,
            Feature::RelativeHumidity => self.relative_humidity,
            Feature::SolarRadiation => self.solar_radiation,
            Feature::Rainfall => self.rainfall,
            Feature::WindSpeed => self.wind_speed,
        }
    }

    pub fn set(&mut self, feature: Feature, value: f64) {
        let slot = match feature {
            Feature::AirPressure => &mut self.air_pressure,
            Feature::AvgTemperature => &mut self.avg_temperature,
            Feature::RelativeHumidity => &mut self.relative_humidity,
            Feature::SolarRadiation => &mut self.solar_radiation,
            Feature::Rainfall => &mut self.rainfall,
            Feature::WindSpeed => &mut self.wind_speed,
        };
        *slot = value;
    }

    /// Iterate `(feature, value)` pairs in form order.
    pub fn values(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL.iter().map(move |f| (*f, self.get(*f)))
    }

    /// Build a record from submitted form fields, looked up by key. Absent and
    /// blank fields keep their 0.0 default; anything else must parse as a
    /// number.
    pub fn from_form<F>(lookup: F) -> NpkResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut record = Self::default();
        for feature in Feature::ALL {
            let Some(raw) = lookup(feature.key()) else {
                continue;
            };
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let value = raw.parse::<f64>().map_err(|_| {
                NpkError::invalid(format!("{} must be a number, got '{raw}'", feature.label()))
            })?;
            record.set(feature, value);
        }
        Ok(record)
    }

    /// Convert into the one-row table models consume.
    pub fn to_row(&self) -> FeatureRow {
        self.values()
            .map(|(feature, value)| (feature.column(), value))
            .collect()
    }
}

/// A single tabular row keyed by column name. Lookups are by name, so column
/// order never matters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureRow {
    columns: BTreeMap<String, f64>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: f64) {
        self.columns.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns.get(column).copied()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for FeatureRow {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut row = FeatureRow::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}
