//! The course record and its field list.
//!
//! A [`Course`] is the only entity in the catalog. Every field is free text;
//! all of them except `description` must be non-empty when a course is added.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Form and JSON keys that must carry a non-empty value on a new course,
/// in the order they are reported when missing.
pub const REQUIRED_FIELDS: [&str; 8] = [
    "code",
    "name",
    "instructor",
    "semester",
    "schedule",
    "classroom",
    "prerequisites",
    "grading",
];

/// Key of the one optional field.
pub const DESCRIPTION_FIELD: &str = "description";

/// A single course in the catalog.
///
/// Field names serialize exactly as declared; this is the on-disk shape of
/// each element of the catalog array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Course code, e.g. `CS203`. Used for lookup; not enforced unique.
    pub code: String,
    /// Course title.
    pub name: String,
    /// Who teaches it.
    pub instructor: String,
    /// Term the course runs in.
    pub semester: String,
    /// Meeting days and times.
    pub schedule: String,
    /// Where it meets.
    pub classroom: String,
    /// Prerequisites as free text.
    pub prerequisites: String,
    /// Grading scheme as free text.
    pub grading: String,
    /// Optional long description.
    #[serde(default)]
    pub description: String,
}

impl Course {
    /// Build a course from submitted form fields.
    ///
    /// Absent keys become empty strings. No validation happens here; see
    /// [`crate::catalog::CatalogService::validate_new_course`].
    #[must_use]
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        let take = |key: &str| fields.get(key).cloned().unwrap_or_default();
        Self {
            code: take("code"),
            name: take("name"),
            instructor: take("instructor"),
            semester: take("semester"),
            schedule: take("schedule"),
            classroom: take("classroom"),
            prerequisites: take("prerequisites"),
            grading: take("grading"),
            description: take(DESCRIPTION_FIELD),
        }
    }

    /// Look up a field value by its key.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        let value = match key {
            "code" => &self.code,
            "name" => &self.name,
            "instructor" => &self.instructor,
            "semester" => &self.semester,
            "schedule" => &self.schedule,
            "classroom" => &self.classroom,
            "prerequisites" => &self.prerequisites,
            "grading" => &self.grading,
            DESCRIPTION_FIELD => &self.description,
            _ => return None,
        };
        Some(value.as_str())
    }

    /// Whether the course has a non-empty description.
    #[must_use]
    pub fn has_description(&self) -> bool {
        !self.description.is_empty()
    }
}

impl std::fmt::Display for Course {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.code, self.name)
    }
}
