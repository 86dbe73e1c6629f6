//! Sharded YAML document collections.
//!
//! Every collection (identities, doctor profiles, appointments) is a directory tree using the
//! sharded canonical-id layout:
//!
//! ```text
//! <collection>/
//! └── 55/
//!     └── 0e/
//!         └── 550e8400e29b41d4a716446655440000/
//!             └── <file>.yaml
//! ```
//!
//! Writes go through a temporary file and a rename so a reader never observes a half-written
//! document. Listing walks all three shard levels. [`DocumentStore::list`] skips (with a warning)
//! anything it cannot read or parse; [`DocumentStore::try_list`] fails instead, and backs every
//! uniqueness check.

use crate::constants::ID_ALLOCATION_ATTEMPTS;
use crate::{BookingError, BookingResult};
use medibook_uuid::RecordId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{self, ErrorKind};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// A collection of YAML documents of type `T`, one per record id.
pub struct DocumentStore<T> {
    dir: PathBuf,
    file_name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for DocumentStore<T> {
    fn clone(&self) -> Self {
        Self {
            dir: self.dir.clone(),
            file_name: self.file_name,
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for DocumentStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("dir", &self.dir)
            .field("file_name", &self.file_name)
            .finish()
    }
}

impl<T> DocumentStore<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Creates a store rooted at `dir`. No I/O happens until the first write.
    pub fn new(dir: PathBuf, file_name: &'static str) -> Self {
        Self {
            dir,
            file_name,
            _marker: PhantomData,
        }
    }

    /// Returns the collection root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Allocates a fresh record id and creates its directory.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::StorageDirCreation`] if directory creation fails or no unused id
    /// is found within the retry budget.
    pub fn allocate_id(&self) -> BookingResult<RecordId> {
        self.allocate_id_with(RecordId::new)
    }

    /// Allocates a record id drawn from `id_source`, retrying on collision.
    pub(crate) fn allocate_id_with(
        &self,
        mut id_source: impl FnMut() -> RecordId,
    ) -> BookingResult<RecordId> {
        for _attempt in 0..ID_ALLOCATION_ATTEMPTS {
            let id = id_source();
            let candidate = id.sharded_dir(&self.dir);

            if candidate.exists() {
                continue;
            }

            if let Some(parent) = candidate.parent() {
                fs::create_dir_all(parent).map_err(BookingError::StorageDirCreation)?;
            }

            match fs::create_dir(&candidate) {
                Ok(()) => return Ok(id),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(BookingError::StorageDirCreation(e)),
            }
        }

        Err(BookingError::StorageDirCreation(io::Error::new(
            ErrorKind::AlreadyExists,
            format!(
                "failed to allocate a unique record directory after {} attempts",
                ID_ALLOCATION_ATTEMPTS
            ),
        )))
    }

    /// Writes `doc` as the document for `id`, replacing any previous version.
    pub fn save(&self, id: &RecordId, doc: &T) -> BookingResult<()> {
        let record_dir = id.sharded_dir(&self.dir);
        fs::create_dir_all(&record_dir).map_err(BookingError::StorageDirCreation)?;

        let yaml = serde_yaml::to_string(doc).map_err(BookingError::YamlSerialization)?;
        let path = record_dir.join(self.file_name);
        let tmp = record_dir.join(format!("{}.tmp", self.file_name));

        fs::write(&tmp, yaml).map_err(BookingError::FileWrite)?;
        fs::rename(&tmp, &path).map_err(BookingError::FileWrite)?;
        Ok(())
    }

    /// Loads the document for `id`, or `None` if it does not exist.
    pub fn load(&self, id: &RecordId) -> BookingResult<Option<T>> {
        let path = id.sharded_dir(&self.dir).join(self.file_name);
        if !path.is_file() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path).map_err(BookingError::FileRead)?;
        let doc = serde_yaml::from_str(&contents).map_err(BookingError::YamlDeserialization)?;
        Ok(Some(doc))
    }

    /// Removes the record directory for `id`. Returns `false` if nothing was stored.
    pub fn delete(&self, id: &RecordId) -> BookingResult<bool> {
        let record_dir = id.sharded_dir(&self.dir);
        if !record_dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&record_dir).map_err(BookingError::FileDelete)?;
        Ok(true)
    }

    /// Loads every parseable document in the collection.
    ///
    /// A missing collection directory yields an empty list. Unreadable or unparseable documents
    /// are skipped with a warning; use [`DocumentStore::try_list`] where a skipped record would
    /// break an invariant.
    pub fn list(&self) -> Vec<T> {
        match self.walk(false) {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!("failed to list {}: {}", self.dir.display(), e);
                Vec::new()
            }
        }
    }

    /// Loads every document in the collection, failing on the first record that cannot be read.
    ///
    /// # Errors
    ///
    /// - [`BookingError::FileRead`] if a directory or document cannot be read
    /// - [`BookingError::DataIntegrity`] if a document does not parse
    pub fn try_list(&self) -> BookingResult<Vec<T>> {
        self.walk(true)
    }

    fn walk(&self, strict: bool) -> BookingResult<Vec<T>> {
        let mut docs = Vec::new();

        for s1 in self.subdirs(&self.dir, strict)? {
            for s2 in self.subdirs(&s1, strict)? {
                for record in self.subdirs(&s2, strict)? {
                    let doc_path = record.join(self.file_name);
                    let contents = match fs::read_to_string(&doc_path) {
                        Ok(contents) => contents,
                        // Record directory allocated but not yet written.
                        Err(e) if e.kind() == ErrorKind::NotFound => continue,
                        Err(e) => {
                            tracing::warn!("failed to read {}: {}", doc_path.display(), e);
                            if strict {
                                return Err(BookingError::FileRead(e));
                            }
                            continue;
                        }
                    };

                    match serde_yaml::from_str::<T>(&contents) {
                        Ok(doc) => docs.push(doc),
                        Err(e) if strict => {
                            tracing::error!(
                                "data integrity issue: cannot parse {}: {}",
                                doc_path.display(),
                                e
                            );
                            return Err(BookingError::DataIntegrity(
                                "Could not process request due to a server data error.".into(),
                            ));
                        }
                        Err(e) => {
                            tracing::warn!(
                                "failed to parse {}: {} - {}",
                                self.file_name,
                                doc_path.display(),
                                e
                            );
                        }
                    }
                }
            }
        }

        Ok(docs)
    }

    /// Child directories of `dir`. A directory that does not exist has none.
    fn subdirs(&self, dir: &Path, strict: bool) -> BookingResult<Vec<PathBuf>> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                tracing::warn!("failed to read directory {}: {}", dir.display(), e);
                return if strict {
                    Err(BookingError::FileRead(e))
                } else {
                    Ok(Vec::new())
                };
            }
        };

        let mut dirs = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_dir() {
                        dirs.push(path);
                    }
                }
                Err(e) if strict => return Err(BookingError::FileRead(e)),
                Err(e) => tracing::warn!("skipping entry in {}: {}", dir.display(), e),
            }
        }
        Ok(dirs)
    }

    /// Removes the whole collection directory.
    pub fn clear(&self) -> BookingResult<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir).map_err(BookingError::FileDelete)?;
        }
        Ok(())
    }
}
