//! JSON document store.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{CatalogStats, CourseStore};
use crate::course::Course;
use crate::error::{Error, Result};

/// Source of per-store ids that keep temp file names apart.
static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(0);

/// Stores the catalog as one pretty-printed JSON array in a single file.
///
/// Appends go through one writer lock and replace the file atomically
/// (temp file in the same directory, then rename), so concurrent appends
/// never drop each other's records and readers never see a partial file.
#[derive(Debug)]
pub struct JsonFileStore {
    /// Path to the catalog file.
    path: PathBuf,
    /// Held for the whole read-append-write cycle.
    writer: Mutex<()>,
    /// Distinguishes this store's temp file from other stores in the process.
    id: u64,
}

impl JsonFileStore {
    /// Create a store backed by the file at `path`.
    ///
    /// The file and its parent directories are created on first append.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
            id: NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Get the path to the catalog file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get catalog statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn stats(&self) -> Result<CatalogStats> {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => Some(metadata),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(source) => {
                return Err(Error::StorageRead {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let total_courses = self.load_all().await?.len();

        Ok(CatalogStats {
            exists: metadata.is_some(),
            total_courses,
            file_size_bytes: metadata.as_ref().map_or(0, std::fs::Metadata::len),
            last_modified: metadata
                .and_then(|m| m.modified().ok())
                .map(DateTime::<Utc>::from),
        })
    }

    fn parent_dir(&self) -> PathBuf {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("catalog");
        self.parent_dir().join(format!(
            ".{file_name}.tmp.{}.{}",
            std::process::id(),
            self.id
        ))
    }

    async fn write_atomic(&self, bytes: &[u8]) -> Result<()> {
        let parent = self.parent_dir();
        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|source| Error::DirectoryCreate {
                path: parent.clone(),
                source,
            })?;

        let tmp = self.temp_path();

        let result = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(bytes).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, &self.path).await
        }
        .await;

        if let Err(source) = result {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Error::StorageWrite {
                path: self.path.clone(),
                source,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CourseStore for JsonFileStore {
    async fn load_all(&self) -> Result<Vec<Course>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No catalog at {}, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(Error::StorageRead {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_slice(&bytes).map_err(|source| Error::StorageCorrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn append_one(&self, course: Course) -> Result<()> {
        let _guard = self.writer.lock().await;

        let mut courses = self.load_all().await?;
        let code = course.code.clone();
        courses.push(course);
        let bytes = encode_catalog(&courses)?;
        self.write_atomic(&bytes).await?;

        info!(
            "Appended course {} to {} ({} total)",
            code,
            self.path.display(),
            courses.len()
        );
        Ok(())
    }
}

/// Serialize a course list the way it is stored on disk: a JSON array
/// indented with four spaces.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_catalog(courses: &[Course]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    courses.serialize(&mut serializer)?;
    Ok(buf)
}
