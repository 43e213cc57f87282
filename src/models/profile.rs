use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One intake/problem description submitted by the patient.
///
/// Rows are append-only: an update inserts a new row and the row with the
/// newest `updated_at` for a user is the current profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub notes: String,
    pub updated_at: DateTime<Utc>,
}

/// The form subset of a profile row (everything the patient types).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileFields {
    pub title: String,
    pub description: String,
    pub category: String,
    pub notes: String,
}

impl ProfileFields {
    /// The intake form marks every field required.
    /// Returns the name of the first blank field, if any.
    pub fn first_blank_field(&self) -> Option<&'static str> {
        if self.title.trim().is_empty() {
            Some("title")
        } else if self.description.trim().is_empty() {
            Some("description")
        } else if self.category.trim().is_empty() {
            Some("category")
        } else if self.notes.trim().is_empty() {
            Some("notes")
        } else {
            None
        }
    }
}

impl ProfileRecord {
    /// The form subset of this row.
    pub fn fields(&self) -> ProfileFields {
        ProfileFields {
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            notes: self.notes.clone(),
        }
    }
}
