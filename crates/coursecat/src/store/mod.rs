//! Storage layer for coursecat.
//!
//! The catalog is a single ordered list of courses. Every read loads the
//! whole list and every write appends one course and rewrites the whole list;
//! nothing is cached between calls.

mod json_file;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::course::Course;
use crate::error::Result;

pub use json_file::{encode_catalog, JsonFileStore};

/// Backing store for the course list.
#[async_trait]
pub trait CourseStore: Send + Sync + std::fmt::Debug {
    /// Load every stored course in insertion order.
    ///
    /// A store that has never been written to yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing data cannot be read or parsed.
    async fn load_all(&self) -> Result<Vec<Course>>;

    /// Append one course to the end of the stored list.
    ///
    /// # Errors
    ///
    /// Returns an error if the existing list cannot be loaded or the new
    /// list cannot be persisted.
    async fn append_one(&self, course: Course) -> Result<()>;
}

/// Statistics about the stored catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    /// Whether the catalog file exists yet.
    pub exists: bool,
    /// Total number of courses stored.
    pub total_courses: usize,
    /// Size of the catalog file in bytes.
    pub file_size_bytes: u64,
    /// When the catalog file was last written.
    pub last_modified: Option<DateTime<Utc>>,
}

/// In-process store with the same semantics as [`JsonFileStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    courses: RwLock<Vec<Course>>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given courses.
    #[must_use]
    pub fn with_courses(courses: Vec<Course>) -> Self {
        Self {
            courses: RwLock::new(courses),
        }
    }
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn load_all(&self) -> Result<Vec<Course>> {
        Ok(self.courses.read().await.clone())
    }

    async fn append_one(&self, course: Course) -> Result<()> {
        self.courses.write().await.push(course);
        Ok(())
    }
}
