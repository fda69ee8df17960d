//! JSON File Repository
//!
//! One pretty-printed JSON file per entity at `<dataRoot>/<path>/<id>.json`.
//! Blocking I/O on the caller's thread, no locking: concurrent writers to the
//! same id race at the filesystem level and the last write wins.

use std::fs;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use lite_domain::{CrudRepository, Identifiable, Repository, RepositoryError, RepositoryResult};
use lite_shared::{JsonRepositoryConfig, ListingPolicy};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// File extension of every storage unit
pub const EXTENSION: &str = "json";

/// CRUD repository storing each entity in its own JSON file
#[derive(Debug)]
pub struct JsonFileRepository<T> {
    dir: PathBuf,
    listing: ListingPolicy,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for JsonFileRepository<T> {
    fn clone(&self) -> Self {
        Self {
            dir: self.dir.clone(),
            listing: self.listing,
            _entity: PhantomData,
        }
    }
}

impl<T> JsonFileRepository<T>
where
    T: Identifiable + Serialize + DeserializeOwned,
{
    /// Create a repository storing files under `<data_root>/<path>`.
    ///
    /// `path` must stay inside `data_root`: absolute paths and `..` segments
    /// are rejected. Nothing is touched on disk until the first operation.
    pub fn new(data_root: impl Into<PathBuf>, path: impl Into<String>) -> lite_shared::Result<Self> {
        Self::from_config(&JsonRepositoryConfig::new(data_root, path))
    }

    /// Create a repository from validated configuration
    pub fn from_config(config: &JsonRepositoryConfig) -> lite_shared::Result<Self> {
        config.validate("json")?;
        Ok(Self {
            dir: config.storage_dir(),
            listing: config.listing,
            _entity: PhantomData,
        })
    }

    pub fn with_listing(mut self, listing: ListingPolicy) -> Self {
        self.listing = listing;
        self
    }

    pub fn listing(&self) -> ListingPolicy {
        self.listing
    }

    /// Directory holding this repository's files
    pub fn storage_dir(&self) -> &Path {
        &self.dir
    }

    /// File an entity with this id is stored in
    pub fn storage_path(&self, id: &T::Id) -> RepositoryResult<PathBuf> {
        let stem = file_stem(id.to_string())?;
        Ok(self.dir.join(format!("{}.{}", stem, EXTENSION)))
    }

    /// Decode every stored entry, one result per file.
    ///
    /// Unlike [`find_all`](CrudRepository::find_all), a corrupt file does not
    /// fail the whole listing; it shows up as an `Err` in its slot.
    pub fn scan(&self) -> RepositoryResult<Vec<RepositoryResult<T>>> {
        if self.listing == ListingPolicy::Disabled {
            return Err(RepositoryError::Unsupported {
                operation: "find_all".to_string(),
            });
        }

        self.ensure_dir()?;

        let entries =
            fs::read_dir(&self.dir).map_err(|e| RepositoryError::io(display(&self.dir), &e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RepositoryError::io(display(&self.dir), &e))?;
            let path = entry.path();
            let is_file = entry
                .file_type()
                .map_err(|e| RepositoryError::io(display(&path), &e))?
                .is_file();
            if is_file && path.extension().is_some_and(|ext| ext == EXTENSION) {
                files.push(path);
            }
        }
        files.sort();

        debug!("Scanning {} entries in {}", files.len(), self.dir.display());

        Ok(files
            .iter()
            .map(|path| {
                let decoded = read_entity(path);
                if let Err(err) = &decoded {
                    warn!("Unreadable entry: {}", err);
                }
                decoded
            })
            .collect())
    }

    /// Create the storage directory if missing
    fn ensure_dir(&self) -> RepositoryResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| RepositoryError::io(display(&self.dir), &e))
    }
}

impl<T> Repository<T> for JsonFileRepository<T> where T: Identifiable + Serialize + DeserializeOwned {}

impl<T> CrudRepository<T> for JsonFileRepository<T>
where
    T: Identifiable + Serialize + DeserializeOwned,
{
    fn save(&self, entity: T) -> RepositoryResult<T> {
        let path = self.storage_path(entity.id())?;
        self.ensure_dir()?;

        let content = serde_json::to_string_pretty(&entity).map_err(|e| RepositoryError::Encode {
            id: entity.id_text(),
            message: e.to_string(),
        })?;

        fs::write(&path, content).map_err(|e| RepositoryError::io(display(&path), &e))?;

        debug!("Saved {}", path.display());
        Ok(entity)
    }

    fn find(&self, id: &T::Id) -> RepositoryResult<Option<T>> {
        let path = self.storage_path(id)?;
        match read_entity(&path) {
            Ok(entity) => Ok(Some(entity)),
            Err(RepositoryError::Io {
                kind: ErrorKind::NotFound,
                ..
            }) => {
                debug!("No entry at {}", path.display());
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn find_all(&self) -> RepositoryResult<Vec<T>> {
        self.scan()?.into_iter().collect()
    }

    fn delete_by_id(&self, id: &T::Id) -> RepositoryResult<bool> {
        let path = self.storage_path(id)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Deleted {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(RepositoryError::io(display(&path), &e)),
        }
    }
}

fn read_entity<T: DeserializeOwned>(path: &Path) -> RepositoryResult<T> {
    let content = fs::read_to_string(path).map_err(|e| RepositoryError::io(display(path), &e))?;
    serde_json::from_str(&content).map_err(|e| RepositoryError::Decode {
        key: display(path),
        message: e.to_string(),
    })
}

/// Validate the textual id as a single file name component
fn file_stem(id: String) -> RepositoryResult<String> {
    let reason = if id.is_empty() {
        Some("empty id")
    } else if id == "." || id == ".." {
        Some("reserved file name")
    } else if id.contains(['/', '\\']) {
        Some("contains a path separator")
    } else if id.contains('\0') {
        Some("contains a NUL byte")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(RepositoryError::InvalidId {
            id,
            reason: reason.to_string(),
        }),
        None => Ok(id),
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
