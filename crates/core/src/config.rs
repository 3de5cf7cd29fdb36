//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Binaries read the environment in `main` and hand the raw values to
//! the helpers here, so request handling never touches process-wide environment variables.

use crate::constants::{DEFAULT_PUBLIC_BASE_URL, DEFAULT_QUOTATION_PREFIX, DEFAULT_UPLOAD_DIR};
use crate::validation::validate_quotation_prefix;
use crate::{PortalError, PortalResult};
use catalog::GuidelineCatalog;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    upload_dir: PathBuf,
    public_base_url: String,
    quotation_prefix: String,
    catalog_file: Option<PathBuf>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// The public base URL is stored without a trailing slash.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::InvalidInput` if the base URL is empty or not http(s), or if the
    /// quotation prefix fails [`validate_quotation_prefix`].
    pub fn new(
        upload_dir: PathBuf,
        public_base_url: String,
        quotation_prefix: String,
        catalog_file: Option<PathBuf>,
    ) -> PortalResult<Self> {
        let public_base_url = public_base_url.trim().trim_end_matches('/').to_string();
        if public_base_url.is_empty() {
            return Err(PortalError::InvalidInput(
                "public_base_url cannot be empty".into(),
            ));
        }
        if !(public_base_url.starts_with("http://") || public_base_url.starts_with("https://")) {
            return Err(PortalError::InvalidInput(
                "public_base_url must start with http:// or https://".into(),
            ));
        }

        validate_quotation_prefix(&quotation_prefix)?;

        Ok(Self {
            upload_dir,
            public_base_url,
            quotation_prefix,
            catalog_file,
        })
    }

    /// Build a configuration from optional raw values, falling back to the defaults in
    /// [`crate::constants`] for anything missing or blank.
    pub fn from_values(
        upload_dir: Option<String>,
        public_base_url: Option<String>,
        quotation_prefix: Option<String>,
        catalog_file: Option<String>,
    ) -> PortalResult<Self> {
        fn non_blank(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self::new(
            PathBuf::from(non_blank(upload_dir).unwrap_or_else(|| DEFAULT_UPLOAD_DIR.into())),
            non_blank(public_base_url).unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.into()),
            non_blank(quotation_prefix).unwrap_or_else(|| DEFAULT_QUOTATION_PREFIX.into()),
            non_blank(catalog_file).map(PathBuf::from),
        )
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    pub fn quotation_prefix(&self) -> &str {
        &self.quotation_prefix
    }

    pub fn catalog_file(&self) -> Option<&Path> {
        self.catalog_file.as_deref()
    }
}

/// Resolve the guideline catalog: the override file if one is configured, otherwise the
/// catalog built into the `catalog` crate.
pub fn resolve_catalog(cfg: &CoreConfig) -> PortalResult<GuidelineCatalog> {
    match cfg.catalog_file() {
        Some(path) => Ok(GuidelineCatalog::load(path)?),
        None => Ok(GuidelineCatalog::builtin()?),
    }
}

/// Make sure the upload directory exists and is a directory.
///
/// This is intended to be run once at startup, before the upload store is constructed.
pub fn prepare_upload_dir(path: &Path) -> PortalResult<()> {
    if path.exists() && !path.is_dir() {
        return Err(PortalError::InvalidInput(format!(
            "upload path exists but is not a directory: {}",
            path.display()
        )));
    }
    std::fs::create_dir_all(path).map_err(PortalError::UploadDirCreation)
}
