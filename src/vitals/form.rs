use serde::{Deserialize, Serialize};

use crate::{
    error::{FieldErrors, HealthError, HealthResult},
    models::{BloodPressure, VitalMetric, VitalsSnapshot},
};

/// Raw text from the "add health data" screen.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VitalsForm {
    pub heart_rate: String,
    pub systolic: String,
    pub diastolic: String,
    pub respiratory_rate: String,
    pub weight: String,
    pub temperature: String,
}

impl VitalsForm {
    /// Reports every blank field first; only a fully filled form is checked
    /// for unparsable values.
    pub fn parse(&self) -> Result<VitalsSnapshot, FieldErrors> {
        let fields = [
            ("heartRate", &self.heart_rate),
            ("systolic", &self.systolic),
            ("diastolic", &self.diastolic),
            ("respiratoryRate", &self.respiratory_rate),
            ("weight", &self.weight),
            ("temperature", &self.temperature),
        ];

        let missing: Vec<String> = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(FieldErrors::missing(missing));
        }

        let mut invalid = Vec::new();
        let mut whole = |name: &str, raw: &str| {
            parse_whole(raw).unwrap_or_else(|| {
                invalid.push(name.to_string());
                0
            })
        };
        let heart_rate = whole("heartRate", &self.heart_rate);
        let systolic = whole("systolic", &self.systolic);
        let diastolic = whole("diastolic", &self.diastolic);
        let respiratory_rate = whole("respiratoryRate", &self.respiratory_rate);

        let weight = parse_positive(&self.weight);
        if weight.is_none() {
            invalid.push("weight".into());
        }
        let temperature = parse_positive(&self.temperature);
        if temperature.is_none() {
            invalid.push("temperature".into());
        }

        if !invalid.is_empty() {
            return Err(FieldErrors::invalid(invalid));
        }

        Ok(VitalsSnapshot {
            heart_rate,
            blood_pressure: BloodPressure {
                systolic,
                diastolic,
            },
            respiratory_rate,
            weight: weight.unwrap_or_default(),
            temperature: temperature.unwrap_or_default(),
        })
    }
}

/// Apply a single-metric edit. Blood pressure is entered as `systolic/diastolic`.
pub fn apply_metric_edit(
    snapshot: VitalsSnapshot,
    metric: VitalMetric,
    raw: &str,
) -> HealthResult<VitalsSnapshot> {
    if raw.trim().is_empty() {
        return Err(HealthError::Validation(FieldErrors::missing(vec![
            metric.as_str().to_string(),
        ])));
    }

    let invalid = || HealthError::Validation(FieldErrors::invalid(vec![metric.as_str().to_string()]));
    let mut updated = snapshot;

    match metric {
        VitalMetric::HeartRate => updated.heart_rate = parse_whole(raw).ok_or_else(invalid)?,
        VitalMetric::RespiratoryRate => {
            updated.respiratory_rate = parse_whole(raw).ok_or_else(invalid)?
        }
        VitalMetric::BloodPressure => {
            let (systolic, diastolic) = raw.split_once('/').ok_or_else(invalid)?;
            updated.blood_pressure = BloodPressure {
                systolic: parse_whole(systolic).ok_or_else(invalid)?,
                diastolic: parse_whole(diastolic).ok_or_else(invalid)?,
            };
        }
        VitalMetric::Weight => updated.weight = parse_positive(raw).ok_or_else(invalid)?,
        VitalMetric::Temperature => {
            updated.temperature = parse_positive(raw).ok_or_else(invalid)?
        }
    }

    Ok(updated)
}

/// Non-negative whole number; `"72.0"` is accepted, `"72.5"` is not.
pub(crate) fn parse_whole(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<u32>() {
        return Some(value);
    }
    let value: f64 = trimmed.parse().ok()?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
        Some(value as u32)
    } else {
        None
    }
}

pub(crate) fn parse_positive(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0)
}
