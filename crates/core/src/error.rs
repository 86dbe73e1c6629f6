#[allow(clippy::single_component_path_imports)]
use serde_yaml;

/// Errors raised by MediBook core services.
///
/// The first six variants form the caller-facing taxonomy and map one-to-one onto HTTP status
/// codes. The remaining variants are storage faults and always surface as internal errors.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not authenticated: {0}")]
    Unauthenticated(String),
    #[error("not authorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("data integrity fault: {0}")]
    DataIntegrity(String),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write document: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read document: {0}")]
    FileRead(std::io::Error),
    #[error("failed to delete document: {0}")]
    FileDelete(std::io::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
    #[error("upload error: {0}")]
    Files(#[from] medibook_files::FilesError),
    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),
}

impl BookingError {
    /// True for faults that must not be described to the caller.
    pub fn is_internal(&self) -> bool {
        !matches!(
            self,
            BookingError::InvalidInput(_)
                | BookingError::Unauthenticated(_)
                | BookingError::Unauthorized(_)
                | BookingError::NotFound(_)
                | BookingError::Conflict(_)
        )
    }
}

impl From<medibook_types::TextError> for BookingError {
    fn from(e: medibook_types::TextError) -> Self {
        BookingError::InvalidInput(e.to_string())
    }
}

impl From<medibook_uuid::UuidError> for BookingError {
    fn from(e: medibook_uuid::UuidError) -> Self {
        BookingError::InvalidInput(e.to_string())
    }
}

pub type BookingResult<T> = std::result::Result<T, BookingError>;
