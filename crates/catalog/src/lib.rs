//! Guideline catalog wire/boundary support.
//!
//! This crate owns the static lookup table of study categories and the guidelines (test
//! protocols) that can be ordered under each of them. The table is kept as YAML, either the
//! copy built into the crate or an operator-supplied override file.
//!
//! This crate focuses on:
//! - strict serialisation/deserialisation of the catalog file
//! - translation between the wire structs and domain types
//! - lookups keyed by `(category, study)`
//!
//! Pricing arithmetic does not live here; see `lab-core`.

pub mod guidelines;

// Re-export facades
pub use guidelines::{CatalogCategory, Estimate, GuidelineCatalog, GuidelineEntry};

/// Errors returned by the `catalog` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("translation error: {0}")]
    Translation(String),

    #[error("unknown study category: {0}")]
    UnknownCategory(String),

    #[error("unknown study '{study}' in category '{category}'")]
    UnknownStudy { category: String, study: String },
}

/// Type alias for Results that can fail with a [`CatalogError`].
pub type CatalogResult<T> = Result<T, CatalogError>;
