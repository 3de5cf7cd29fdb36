//! Content-addressed upload store
//!
//! [`UploadStore`] writes uploaded bytes under their SHA-256 digest and hands back the metadata
//! the portal shows next to a checkpoint: original name, size, public URL, key and MIME type.
//!
//! # Security Model
//!
//! - The root directory is canonicalised once at construction
//! - Keys are accepted only as 64 lower-case hex characters, so a key can never name a path
//!   outside the root
//! - Original file names are reduced to their final component and never touch the filesystem

use crate::{FilesError, FALLBACK_MIME_TYPE, HASH_FOLDER_NAME};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Metadata for a stored upload
///
/// Serialised in the shape the portal front end expects. `url` is accepted as an alias of
/// `objectUrl` when reading metadata produced by older upload endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub original_name: String,

    /// Size in bytes
    pub size: u64,

    #[serde(alias = "url")]
    pub object_url: String,

    /// Hex SHA-256 digest of the content
    pub key: String,

    pub mime_type: String,

    pub stored_at: DateTime<Utc>,
}

/// Result of storing one file of a batch.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum UploadOutcome {
    Stored { file: UploadedFile },
    #[serde(rename_all = "camelCase")]
    Failed { original_name: String, reason: String },
}

impl UploadOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, UploadOutcome::Stored { .. })
    }
}

/// Upload storage rooted at a single directory.
#[derive(Debug)]
pub struct UploadStore {
    root_directory: PathBuf,

    /// Public URL prefix for stored objects, without a trailing slash
    public_base_url: String,
}

impl UploadStore {
    /// Creates a new `UploadStore`
    ///
    /// # Arguments
    ///
    /// * `root_directory` - Existing directory that holds uploads
    /// * `public_base_url` - URL prefix under which `GET /files/{key}` is served
    ///
    /// # Errors
    ///
    /// Returns `FilesError::InvalidRootDirectory` if the directory does not exist, is not a
    /// directory, or cannot be canonicalised.
    pub fn new(root_directory: &Path, public_base_url: &str) -> Result<Self, FilesError> {
        if !root_directory.exists() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Directory does not exist: {}",
                root_directory.display()
            )));
        }

        if !root_directory.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                root_directory.display()
            )));
        }

        let root_directory = root_directory.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        Ok(Self {
            root_directory,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Stores one upload and returns its metadata.
    ///
    /// Storing content that is already present leaves the existing file untouched and returns
    /// the same key.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - `original_name` is blank
    /// - The storage directory cannot be created or the file cannot be written (I/O)
    pub fn store(&self, original_name: &str, bytes: &[u8]) -> Result<UploadedFile, FilesError> {
        let original_name = display_name(original_name)?;

        let key = hex::encode(Sha256::digest(bytes));
        let storage_path = self.storage_path(&key);

        if storage_path.exists() {
            tracing::debug!("upload {} already stored", key);
        } else {
            if let Some(parent) = storage_path.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    FilesError::Io(std::io::Error::new(
                        e.kind(),
                        format!(
                            "Failed to create storage directory {}: {}",
                            parent.display(),
                            e
                        ),
                    ))
                })?;
            }

            fs::write(&storage_path, bytes).map_err(|e| {
                FilesError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to write upload to {}: {}", storage_path.display(), e),
                ))
            })?;
            tracing::info!("stored upload {} ({} bytes)", key, bytes.len());
        }

        Ok(UploadedFile {
            original_name,
            size: bytes.len() as u64,
            object_url: self.object_url(&key),
            mime_type: sniff_mime_type(bytes).to_string(),
            key,
            stored_at: Utc::now(),
        })
    }

    /// Stores each file independently. A failure is reported in place and does not stop the
    /// remaining files.
    pub fn store_batch<N, B>(&self, files: &[(N, B)]) -> Vec<UploadOutcome>
    where
        N: AsRef<str>,
        B: AsRef<[u8]>,
    {
        files
            .iter()
            .map(|(name, bytes)| match self.store(name.as_ref(), bytes.as_ref()) {
                Ok(file) => UploadOutcome::Stored { file },
                Err(e) => {
                    tracing::warn!("upload of {:?} failed: {}", name.as_ref(), e);
                    UploadOutcome::Failed {
                        original_name: name.as_ref().to_string(),
                        reason: e.to_string(),
                    }
                }
            })
            .collect()
    }

    /// Reads a stored upload by key.
    ///
    /// # Errors
    ///
    /// Returns `FilesError::InvalidKey` for malformed keys, `FilesError::NotFound` when nothing
    /// is stored under the key, and `FilesError::Io` if reading fails.
    pub fn read(&self, key: &str) -> Result<Vec<u8>, FilesError> {
        let storage_path = self.existing_path(key)?;

        fs::read(&storage_path).map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read upload from {}: {}", storage_path.display(), e),
            ))
        })
    }

    /// Removes a stored upload by key.
    ///
    /// Keys are content hashes, so identical bytes uploaded for different orders share one
    /// object. Removing the key removes it for every upload that produced it.
    ///
    /// # Errors
    ///
    /// Same as [`Self::read`].
    pub fn remove(&self, key: &str) -> Result<(), FilesError> {
        let storage_path = self.existing_path(key)?;

        fs::remove_file(&storage_path).map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to remove upload at {}: {}",
                    storage_path.display(),
                    e
                ),
            ))
        })?;
        tracing::info!("removed upload {}", key);

        Ok(())
    }

    /// Public URL of the object stored under `key`.
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    #[must_use]
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    fn existing_path(&self, key: &str) -> Result<PathBuf, FilesError> {
        validate_key(key)?;

        let storage_path = self.storage_path(key);
        if !storage_path.is_file() {
            return Err(FilesError::NotFound(key.to_string()));
        }
        Ok(storage_path)
    }

    /// `<root>/sha256/<shard1>/<shard2>/<key>`; `key` must already be validated.
    fn storage_path(&self, key: &str) -> PathBuf {
        self.root_directory
            .join(HASH_FOLDER_NAME)
            .join(&key[0..2])
            .join(&key[2..4])
            .join(key)
    }
}

/// Best-effort MIME type of `bytes`.
pub fn sniff_mime_type(bytes: &[u8]) -> &'static str {
    infer::get(bytes)
        .map(|kind| kind.mime_type())
        .unwrap_or(FALLBACK_MIME_TYPE)
}

fn validate_key(key: &str) -> Result<(), FilesError> {
    let valid = key.len() == 64
        && key
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
    if valid {
        Ok(())
    } else {
        Err(FilesError::InvalidKey(key.to_string()))
    }
}

/// Final path component of a client-supplied name, trimmed.
fn display_name(original_name: &str) -> Result<String, FilesError> {
    let name = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() {
        return Err(FilesError::InvalidName(original_name.to_string()));
    }
    Ok(name.to_string())
}
