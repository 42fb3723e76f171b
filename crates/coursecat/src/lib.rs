//! `coursecat` - A small course catalog web service
//!
//! This library provides the catalog model, a JSON file store, and the HTTP
//! front end for listing, viewing and adding courses.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod catalog;
pub mod cli;
pub mod config;
pub mod course;
pub mod error;
pub mod logging;
pub mod store;
pub mod web;

pub use catalog::{CatalogService, CatalogView, ValidationResult};
pub use config::Config;
pub use course::Course;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use store::{CatalogStats, CourseStore, JsonFileStore, MemoryStore};
pub use web::{build_router, AppState};
