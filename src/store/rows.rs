//! Row validation at the data-access boundary.
//!
//! The backend client returns loose JSON; rows are checked here before
//! anything downstream trusts field presence. Malformed rows are rejected
//! with `BackendError::InvalidRow` naming the collection and field.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::BackendError;
use crate::models::{ClientMetadata, DeviceClass, ProfileRecord, VisitRecord};

fn required_str(row: &Value, collection: &str, field: &str) -> Result<String, BackendError> {
    match row.get(field).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Ok(s.to_string()),
        Some(_) => Err(BackendError::InvalidRow(format!(
            "{collection}.{field} is blank"
        ))),
        None => Err(BackendError::InvalidRow(format!(
            "{collection}.{field} is missing"
        ))),
    }
}

/// Free-text columns may legitimately be empty strings but must exist.
fn text_column(row: &Value, collection: &str, field: &str) -> Result<String, BackendError> {
    row.get(field)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| BackendError::InvalidRow(format!("{collection}.{field} is missing")))
}

fn timestamp(row: &Value, collection: &str, field: &str) -> Result<DateTime<Utc>, BackendError> {
    let raw = required_str(row, collection, field)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            BackendError::InvalidRow(format!("{collection}.{field} is not a timestamp: {e}"))
        })
}

pub fn parse_profile_row(row: &Value) -> Result<ProfileRecord, BackendError> {
    Ok(ProfileRecord {
        user_id: required_str(row, "user_profiles", "user_id")?,
        title: required_str(row, "user_profiles", "title")?,
        description: text_column(row, "user_profiles", "description")?,
        category: text_column(row, "user_profiles", "category")?,
        notes: text_column(row, "user_profiles", "notes")?,
        updated_at: timestamp(row, "user_profiles", "updated_at")?,
    })
}

pub fn parse_visit_row(row: &Value) -> Result<VisitRecord, BackendError> {
    let data = row.get("visit_data").ok_or_else(|| {
        BackendError::InvalidRow("user_visits.visit_data is missing".into())
    })?;

    let agent = required_str(data, "user_visits.visit_data", "agent")?;
    let device = data
        .get("device")
        .and_then(Value::as_str)
        .and_then(DeviceClass::from_str)
        // Old rows may predate the device column; re-classify from the agent.
        .unwrap_or_else(|| DeviceClass::classify(&agent));

    Ok(VisitRecord {
        id: required_str(row, "user_visits", "id")?,
        user_id: required_str(row, "user_visits", "user_id")?,
        visit_time: timestamp(row, "user_visits", "visit_time")?,
        visit_data: ClientMetadata {
            agent,
            device,
            url: text_column(data, "user_visits.visit_data", "url")?,
        },
    })
}
