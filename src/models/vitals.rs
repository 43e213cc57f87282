use serde::{Deserialize, Serialize};

/// One reading from the external device feed.
///
/// Read-only from this system's perspective; the feed owns the data and
/// this crate only validates and displays it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalsReading {
    pub id: i64,
    /// Device/subject identifier, e.g. "PD01".
    pub subject_id: String,
    /// Display name of the monitored patient.
    pub display_name: String,
    pub heart_rate: f64,
    pub oxygen_saturation: f64,
    /// Whether the device reports itself active.
    pub active: bool,
    /// Unix timestamp of the reading.
    pub recorded_at: i64,
    /// Condition label, e.g. "Normal" or "Critical".
    pub condition: String,
}

impl VitalsReading {
    pub fn is_critical(&self) -> bool {
        self.condition.eq_ignore_ascii_case("critical")
    }

    /// Field presence is not trusted from the feed: numbers must be
    /// finite and identifiers non-blank. Returns the offending field.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.subject_id.trim().is_empty() {
            return Err("subject_id");
        }
        if !self.heart_rate.is_finite() {
            return Err("heart_rate");
        }
        if !self.oxygen_saturation.is_finite() {
            return Err("oxygen_saturation");
        }
        Ok(())
    }
}
