//! Lab File Storage
//!
//! Storage for documents uploaded against an order, most commonly at the document
//! verification checkpoint.
//!
//! ## Design Principles
//!
//! - Uploaded bytes are content-addressed by SHA-256; the hex digest is the upload key
//! - Identical content is stored once and uploading it again is a no-op
//! - Upload metadata is returned to the caller and is not part of the priced or staged records
//! - Each file in a batch succeeds or fails on its own
//!
//! ## Storage Layout
//!
//! ```text
//! <upload_dir>/
//! └── sha256/
//!     └── ab/
//!         └── cd/
//!             └── abcd3f9e…
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use lab_files::UploadStore;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = UploadStore::new(Path::new("uploads"), "http://localhost:3000/files")?;
//! let uploaded = store.store("protocol.pdf", b"%PDF-1.4")?;
//! println!("{}", uploaded.object_url);
//! # Ok(())
//! # }
//! ```

mod store;

pub use store::{sniff_mime_type, UploadOutcome, UploadStore, UploadedFile};

/// Directory under the upload root that holds SHA-256 addressed content.
pub const HASH_FOLDER_NAME: &str = "sha256";

/// MIME type reported when the content cannot be sniffed.
pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Errors that can occur during upload storage
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Root directory does not exist or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// Key is not a 64-character hex SHA-256 digest
    #[error("Invalid upload key: {0}")]
    InvalidKey(String),

    /// Original file name was empty
    #[error("Invalid file name: {0}")]
    InvalidName(String),

    /// No upload stored under this key
    #[error("Upload not found: {0}")]
    NotFound(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
