//! Catalog queries over a [`CourseStore`].
//!
//! [`CatalogService`] holds no state of its own beyond the store handle;
//! every call reloads the full course list.

use std::collections::HashMap;
use std::sync::Arc;

use crate::course::{Course, REQUIRED_FIELDS};
use crate::error::Result;
use crate::store::CourseStore;

/// Outcome of checking a submitted course for missing values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Every required field has a value.
    Valid,
    /// One or more required fields are empty or absent.
    Invalid {
        /// The empty fields, in [`REQUIRED_FIELDS`] order.
        missing_fields: Vec<&'static str>,
    },
}

impl ValidationResult {
    /// Whether the submission passed validation.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// The user-facing message for an invalid submission.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Valid => None,
            Self::Invalid { missing_fields } => {
                Some(format!("Missing fields: {}", missing_fields.join(", ")))
            }
        }
    }
}

/// The data behind the catalog listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogView {
    /// All courses in insertion order.
    pub courses: Vec<Course>,
    /// Number of courses.
    pub course_count: usize,
}

/// Query operations over the stored catalog.
#[derive(Debug, Clone)]
pub struct CatalogService {
    store: Arc<dyn CourseStore>,
}

impl CatalogService {
    /// Create a service over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn CourseStore>) -> Self {
        Self { store }
    }

    /// Return every course, exactly as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn list(&self) -> Result<Vec<Course>> {
        self.store.load_all().await
    }

    /// Find the first course whose code matches exactly.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<Course>> {
        let courses = self.list().await?;
        Ok(find_first(&courses, code).cloned())
    }

    /// Load the catalog listing along with its course count.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn catalog_view(&self) -> Result<CatalogView> {
        let courses = self.list().await?;
        Ok(CatalogView {
            course_count: courses.len(),
            courses,
        })
    }

    /// Persist a new course at the end of the catalog.
    ///
    /// Callers are expected to have validated the course first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub async fn add(&self, course: Course) -> Result<()> {
        self.store.append_one(course).await
    }

    /// Check a submitted course for empty required fields.
    ///
    /// A key that is absent counts as empty. `description` is never required.
    #[must_use]
    pub fn validate_new_course(fields: &HashMap<String, String>) -> ValidationResult {
        let missing_fields: Vec<&'static str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|field| fields.get(*field).map_or(true, String::is_empty))
            .collect();

        if missing_fields.is_empty() {
            ValidationResult::Valid
        } else {
            ValidationResult::Invalid { missing_fields }
        }
    }
}

/// Linear scan for the first course with exactly this code.
#[must_use]
pub fn find_first<'a>(courses: &'a [Course], code: &str) -> Option<&'a Course> {
    courses.iter().find(|course| course.code == code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::tests::sample_course;
    use crate::store::MemoryStore;

    fn service_with(courses: Vec<Course>) -> CatalogService {
        CatalogService::new(Arc::new(MemoryStore::with_courses(courses)))
    }

    fn complete_fields() -> HashMap<String, String> {
        [
            ("code", "CS203"),
            ("name", "Systems"),
            ("instructor", "A"),
            ("semester", "F24"),
            ("schedule", "MWF"),
            ("classroom", "101"),
            ("prerequisites", "none"),
            ("grading", "A-F"),
            ("description", ""),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_find_first_returns_first_match() {
        let mut second = sample_course("CS203");
        second.name = "Duplicate".to_string();
        let courses = vec![sample_course("CS101"), sample_course("CS203"), second];

        let found = find_first(&courses, "CS203").unwrap();
        assert_eq!(found.name, "Systems");
    }

    #[test]
    fn test_find_first_every_member_is_found() {
        let courses = vec![
            sample_course("CS101"),
            sample_course("CS203"),
            sample_course("MA110"),
        ];
        for course in &courses {
            let found = find_first(&courses, &course.code).unwrap();
            assert_eq!(found.code, course.code);
        }
    }

    #[test]
    fn test_find_first_is_case_sensitive() {
        let courses = vec![sample_course("CS203")];
        assert!(find_first(&courses, "cs203").is_none());
        assert!(find_first(&courses, "CS203 ").is_none());
    }

    #[test]
    fn test_find_first_empty() {
        assert!(find_first(&[], "CS203").is_none());
    }

    #[tokio::test]
    async fn test_list_empty_store() {
        let service = service_with(vec![]);
        assert!(service.list().await.unwrap().is_empty());

        let view = service.catalog_view().await.unwrap();
        assert_eq!(view.course_count, 0);
        assert!(view.courses.is_empty());
    }

    #[tokio::test]
    async fn test_catalog_view_counts_courses() {
        let service = service_with(vec![sample_course("CS101"), sample_course("CS203")]);
        let view = service.catalog_view().await.unwrap();
        assert_eq!(view.course_count, 2);
        assert_eq!(view.courses[1].code, "CS203");
    }

    #[tokio::test]
    async fn test_find_by_code_not_found() {
        let service = service_with(vec![sample_course("CS101"), sample_course("CS203")]);
        assert!(service.find_by_code("ZZ999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_then_find() {
        let service = service_with(vec![]);
        let course = Course::from_fields(&complete_fields());
        assert!(CatalogService::validate_new_course(&complete_fields()).is_valid());

        service.add(course.clone()).await.unwrap();

        let all = service.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(service.find_by_code("CS203").await.unwrap(), Some(course));
    }

    #[test]
    fn test_validate_complete_is_valid() {
        assert_eq!(
            CatalogService::validate_new_course(&complete_fields()),
            ValidationResult::Valid
        );
    }

    #[test]
    fn test_validate_ignores_description() {
        let mut fields = complete_fields();
        fields.remove("description");
        assert!(CatalogService::validate_new_course(&fields).is_valid());
    }

    #[test]
    fn test_validate_missing_instructor() {
        let mut fields = complete_fields();
        fields.insert("instructor".to_string(), String::new());

        let result = CatalogService::validate_new_course(&fields);
        assert_eq!(
            result,
            ValidationResult::Invalid {
                missing_fields: vec!["instructor"]
            }
        );
        assert_eq!(result.message().unwrap(), "Missing fields: instructor");
    }

    #[test]
    fn test_validate_reports_in_field_order() {
        let mut fields = complete_fields();
        fields.remove("grading");
        fields.insert("code".to_string(), String::new());
        fields.insert("classroom".to_string(), String::new());

        let result = CatalogService::validate_new_course(&fields);
        assert_eq!(
            result.message().unwrap(),
            "Missing fields: code, classroom, grading"
        );
    }

    #[test]
    fn test_validate_empty_submission_lists_everything() {
        let result = CatalogService::validate_new_course(&HashMap::new());
        match result {
            ValidationResult::Invalid { missing_fields } => {
                assert_eq!(missing_fields, REQUIRED_FIELDS.to_vec());
            }
            ValidationResult::Valid => panic!("empty submission must be invalid"),
        }
    }

    #[test]
    fn test_validate_whitespace_counts_as_value() {
        let mut fields = complete_fields();
        fields.insert("schedule".to_string(), " ".to_string());
        assert!(CatalogService::validate_new_course(&fields).is_valid());
    }

    #[test]
    fn test_valid_has_no_message() {
        assert!(ValidationResult::Valid.message().is_none());
    }
}
