//! MediBook upload storage
//!
//! Binary uploads (appointment documents, profile images) are kept apart from the YAML documents
//! that reference them. Documents only ever hold an upload *reference* of the form
//! `/uploads/<sha256>`.
//!
//! ## Design Principles
//!
//! - Uploads are content-addressed by SHA-256, so identical bytes are stored once
//! - Uploads are immutable once written
//! - Each upload has a YAML metadata sidecar (original filename, media type, size)
//! - A missing upload never invalidates the document that references it
//!
//! ## Storage Layout
//!
//! ```text
//! <data_dir>/uploads/
//! └── sha256/
//!     └── ab/
//!         └── cd/
//!             ├── abcd3f9e…         # raw bytes
//!             └── abcd3f9e….yaml    # FileMetadata
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use medibook_files::FilesService;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = FilesService::new(Path::new("booking_data/uploads"))?;
//! let stored = service.store(b"%PDF-1.7 ...", "referral.pdf")?;
//! assert!(stored.reference.starts_with("/uploads/"));
//! # Ok(())
//! # }
//! ```

mod files;

pub use files::{FileMetadata, FilesService};
pub use medibook_uuid::Sha256Hash;

/// Name of the uploads directory below the data directory.
pub const UPLOADS_FOLDER_NAME: &str = "uploads";

/// URL prefix of upload references stored in documents.
pub const UPLOAD_REFERENCE_PREFIX: &str = "/uploads/";

/// Errors that can occur during upload operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Root directory could not be created or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// The upload carried no bytes
    #[error("Upload is empty: {0}")]
    EmptyUpload(String),

    /// No upload is stored under the given hash
    #[error("Upload not found: {0}")]
    NotFound(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata sidecar could not be (de)serialised
    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_yaml::Error),

    /// Hash or id failed validation
    #[error("UUID error: {0}")]
    Uuid(#[from] medibook_uuid::UuidError),
}
