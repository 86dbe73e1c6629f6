//! Content-addressed upload storage service
//!
//! [`FilesService`] owns the `uploads/` directory below the data directory. Callers hand it raw
//! bytes plus the client-supplied filename and receive a [`FileMetadata`] whose `reference` is
//! what gets persisted in appointment and profile documents.
//!
//! # Content Addressing
//!
//! - **Deduplication**: storing the same bytes twice returns the original metadata
//! - **Integrity**: the filename is the SHA-256 of the content
//! - **Deterministic paths**: `sha256/<h[0..2]>/<h[2..4]>/<h>`
//!
//! Client filenames are recorded in metadata only and never influence the on-disk path, so a
//! hostile filename cannot escape the uploads root.

use crate::{FilesError, UPLOAD_REFERENCE_PREFIX};
use chrono::{DateTime, Utc};
use medibook_types::NonEmptyText;
use medibook_uuid::Sha256Hash;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Metadata for a stored upload
///
/// Serialised to YAML next to the binary so the upload can be served back with its media type.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FileMetadata {
    /// Hashing algorithm used (always "sha256")
    pub hash_algorithm: String,

    /// Hexadecimal digest of the file content
    pub hash: Sha256Hash,

    /// Path relative to the uploads root where the bytes are stored
    pub relative_path: String,

    /// Reference persisted in documents (`/uploads/<hash>`)
    pub reference: String,

    /// Size of the file in bytes
    pub size_bytes: u64,

    /// Detected media type (MIME type), if available
    ///
    /// Best-effort detection from magic bytes; `None` for plain text and unknown formats.
    pub media_type: Option<String>,

    /// Filename supplied by the client
    pub original_filename: NonEmptyText,

    /// UTC timestamp when the bytes were first stored
    pub stored_at: DateTime<Utc>,
}

/// Service for storing and reading uploads
///
/// Cheap to clone; holds only the canonicalised root path.
#[derive(Debug, Clone)]
pub struct FilesService {
    root_directory: PathBuf,
}

impl FilesService {
    /// Creates a `FilesService` rooted at `root_directory`, creating the directory if needed.
    ///
    /// # Arguments
    ///
    /// * `root_directory` - The uploads directory (usually `<data_dir>/uploads`)
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidRootDirectory`] if the path exists but is not a directory, or
    /// cannot be created or canonicalised.
    pub fn new(root_directory: &Path) -> Result<Self, FilesError> {
        if root_directory.exists() && !root_directory.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                root_directory.display()
            )));
        }

        fs::create_dir_all(root_directory).map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot create {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        let root_directory = root_directory.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        Ok(Self { root_directory })
    }

    /// Stores `bytes` in content-addressed storage.
    ///
    /// # Arguments
    ///
    /// * `bytes` - Upload content
    /// * `original_filename` - Client filename; blank names are recorded as `upload`
    ///
    /// # Returns
    ///
    /// The upload's metadata. If identical content is already stored the existing metadata is
    /// returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - `bytes` is empty
    /// - the storage directory or files cannot be written (I/O)
    /// - the metadata sidecar cannot be serialised
    pub fn store(&self, bytes: &[u8], original_filename: &str) -> Result<FileMetadata, FilesError> {
        if bytes.is_empty() {
            return Err(FilesError::EmptyUpload(original_filename.to_owned()));
        }

        let hash = Self::hash_of(bytes);

        let storage_path = self.storage_path(&hash);
        let metadata_path = Self::metadata_path(&storage_path);

        if storage_path.exists() {
            if let Ok(existing) = self.metadata(hash.as_str()) {
                tracing::debug!("upload {} already stored", hash);
                return Ok(existing);
            }
        }

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
                format!("Failed to write file to {}: {}", storage_path.display(), e),
            ))
        })?;

        let original_filename = NonEmptyText::new(sanitise_filename(original_filename))
            .or_else(|_| NonEmptyText::new("upload"))
            .map_err(|e| FilesError::EmptyUpload(e.to_string()))?;

        let metadata = FileMetadata {
            hash_algorithm: "sha256".into(),
            relative_path: Self::relative_path(&hash),
            reference: format!("{}{}", UPLOAD_REFERENCE_PREFIX, hash),
            hash,
            size_bytes: bytes.len() as u64,
            media_type: infer::get(bytes).map(|kind| kind.mime_type().to_owned()),
            original_filename,
            stored_at: Utc::now(),
        };

        fs::write(&metadata_path, serde_yaml::to_string(&metadata)?)?;
        tracing::info!(
            "stored upload {} ({} bytes)",
            metadata.hash,
            metadata.size_bytes
        );

        Ok(metadata)
    }

    /// Retrieves the bytes of a stored upload.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::Uuid`] for a malformed hash, [`FilesError::NotFound`] when nothing
    /// is stored under it, or an I/O error if reading fails.
    pub fn read(&self, hash: &str) -> Result<Vec<u8>, FilesError> {
        let hash = Sha256Hash::parse(hash)?;
        let storage_path = self.storage_path(&hash);

        if !storage_path.is_file() {
            return Err(FilesError::NotFound(hash.to_string()));
        }

        fs::read(&storage_path).map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read file from {}: {}", storage_path.display(), e),
            ))
        })
    }

    /// Loads the metadata sidecar of a stored upload.
    ///
    /// # Errors
    ///
    /// Same as [`FilesService::read`], plus [`FilesError::Metadata`] for a corrupt sidecar.
    pub fn metadata(&self, hash: &str) -> Result<FileMetadata, FilesError> {
        let hash = Sha256Hash::parse(hash)?;
        let metadata_path = Self::metadata_path(&self.storage_path(&hash));

        if !metadata_path.is_file() {
            return Err(FilesError::NotFound(hash.to_string()));
        }

        let contents = fs::read_to_string(&metadata_path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    fn hash_of(bytes: &[u8]) -> Sha256Hash {
        let digest: [u8; 32] = Sha256::digest(bytes).into();
        Sha256Hash::from_bytes(&digest)
    }

    /// Extracts the hash from an upload reference such as `/uploads/<hash>`.
    pub fn hash_from_reference(reference: &str) -> Option<&str> {
        reference.strip_prefix(UPLOAD_REFERENCE_PREFIX)
    }

    /// Returns the uploads root directory.
    #[must_use]
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    fn storage_path(&self, hash: &Sha256Hash) -> PathBuf {
        self.root_directory.join(Self::relative_path(hash))
    }

    /// `sha256/<shard1>/<shard2>/<hash>`
    fn relative_path(hash: &Sha256Hash) -> String {
        let hex = hash.as_str();
        format!("sha256/{}/{}/{}", &hex[0..2], &hex[2..4], hex)
    }

    fn metadata_path(storage_path: &Path) -> PathBuf {
        storage_path.with_extension("yaml")
    }
}

/// Keeps only the final path component of a client filename.
fn sanitise_filename(name: &str) -> &str {
    name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(name).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn service(temp: &TempDir) -> FilesService {
        FilesService::new(&temp.path().join("uploads")).expect("uploads root should be created")
    }

    #[test]
    fn test_new_creates_missing_root() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let root = temp.path().join("uploads");
        assert!(!root.exists());

        FilesService::new(&root).expect("should create root");

        assert!(root.is_dir());
    }

    #[test]
    fn test_new_rejects_file_as_root() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let root = temp.path().join("uploads");
        fs::write(&root, "not a directory").expect("Failed to write file");

        let result = FilesService::new(&root);

        assert!(matches!(result, Err(FilesError::InvalidRootDirectory(_))));
    }

    #[test]
    fn test_store_writes_sharded_file_and_reference() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let service = service(&temp);

        let metadata = service
            .store(b"blood results", "results.txt")
            .expect("store should succeed");

        let hex = metadata.hash.as_str();
        assert_eq!(metadata.reference, format!("/uploads/{hex}"));
        assert_eq!(
            metadata.relative_path,
            format!("sha256/{}/{}/{}", &hex[0..2], &hex[2..4], hex)
        );
        assert_eq!(metadata.size_bytes, 13);
        assert_eq!(metadata.original_filename.as_str(), "results.txt");
        assert!(service.root_directory().join(&metadata.relative_path).is_file());
    }

    #[test]
    fn test_store_same_content_is_deduplicated() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let service = service(&temp);

        let first = service.store(b"same bytes", "a.txt").expect("first store");
        let second = service.store(b"same bytes", "b.txt").expect("second store");

        assert_eq!(first, second);
        assert_eq!(second.original_filename.as_str(), "a.txt");
    }

    #[test]
    fn test_store_rejects_empty_upload() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let service = service(&temp);

        let result = service.store(b"", "empty.pdf");

        assert!(matches!(result, Err(FilesError::EmptyUpload(_))));
    }

    #[test]
    fn test_store_detects_media_type() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let service = service(&temp);

        let metadata = service.store(PNG_HEADER, "avatar.png").expect("store png");

        assert_eq!(metadata.media_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_store_strips_directories_from_filename() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let service = service(&temp);

        let metadata = service
            .store(b"scan", "../../etc/passwd")
            .expect("store should succeed");

        assert_eq!(metadata.original_filename.as_str(), "passwd");
        assert!(metadata.relative_path.starts_with("sha256/"));
    }

    #[test]
    fn test_read_returns_stored_bytes_and_metadata() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let service = service(&temp);
        let stored = service.store(b"x-ray report", "xray.txt").expect("store");

        let bytes = service.read(stored.hash.as_str()).expect("read");
        let metadata = service.metadata(stored.hash.as_str()).expect("metadata");

        assert_eq!(bytes, b"x-ray report");
        assert_eq!(metadata, stored);
    }

    #[test]
    fn test_read_unknown_hash_is_not_found() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let service = service(&temp);

        let result = service.read(&"a".repeat(64));

        assert!(matches!(result, Err(FilesError::NotFound(_))));
    }

    #[test]
    fn test_read_rejects_malformed_hash() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let service = service(&temp);

        let result = service.read("../secret");

        assert!(matches!(result, Err(FilesError::Uuid(_))));
    }

    #[test]
    fn test_hash_from_reference() {
        assert_eq!(
            FilesService::hash_from_reference("/uploads/abc"),
            Some("abc")
        );
        assert_eq!(FilesService::hash_from_reference("abc"), None);
    }
}
