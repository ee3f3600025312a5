//! Vital-sign data models.
//!
//! Stored under the `healthData` key as camelCase JSON, one snapshot at a
//! time.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BloodPressure {
    pub systolic: u32,
    pub diastolic: u32,
}

/// The user's most recent measurements. Saving replaces the whole value.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VitalsSnapshot {
    /// Beats per minute.
    pub heart_rate: u32,
    /// mmHg.
    pub blood_pressure: BloodPressure,
    /// Breaths per minute.
    pub respiratory_rate: u32,
    /// Kilograms.
    pub weight: f64,
    /// Degrees Celsius.
    pub temperature: f64,
}

/// One editable field of a [`VitalsSnapshot`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum VitalMetric {
    HeartRate,
    BloodPressure,
    RespiratoryRate,
    Weight,
    Temperature,
}

impl VitalMetric {
    pub const ALL: [VitalMetric; 5] = [
        VitalMetric::HeartRate,
        VitalMetric::BloodPressure,
        VitalMetric::RespiratoryRate,
        VitalMetric::Weight,
        VitalMetric::Temperature,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VitalMetric::HeartRate => "heartRate",
            VitalMetric::BloodPressure => "bloodPressure",
            VitalMetric::RespiratoryRate => "respiratoryRate",
            VitalMetric::Weight => "weight",
            VitalMetric::Temperature => "temperature",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            VitalMetric::HeartRate => "bpm",
            VitalMetric::BloodPressure => "mmHg",
            VitalMetric::RespiratoryRate => "breaths/min",
            VitalMetric::Weight => "kg",
            VitalMetric::Temperature => "°C",
        }
    }
}

impl VitalsSnapshot {
    /// Current value of `metric` formatted the way the edit dialog pre-fills it.
    pub fn display_value(&self, metric: VitalMetric) -> String {
        match metric {
            VitalMetric::HeartRate => self.heart_rate.to_string(),
            VitalMetric::BloodPressure => format!(
                "{}/{}",
                self.blood_pressure.systolic, self.blood_pressure.diastolic
            ),
            VitalMetric::RespiratoryRate => self.respiratory_rate.to_string(),
            VitalMetric::Weight => self.weight.to_string(),
            VitalMetric::Temperature => self.temperature.to_string(),
        }
    }
}
