//! Configuration types for repository backends

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::error::{ConfigError, InvalidConfigError};

/// Whether a file repository enumerates its directory on `find_all`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingPolicy {
    /// List and decode every entry
    #[default]
    Eager,
    /// Refuse to list; `find_all` reports the operation as unsupported
    Disabled,
}

/// Configuration for a JSON-file-per-entity repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonRepositoryConfig {
    /// Root data folder
    pub data_root: PathBuf,

    /// Folder under the root holding this repository's files
    #[serde(default)]
    pub path: String,

    /// Listing behavior for `find_all`
    #[serde(default)]
    pub listing: ListingPolicy,
}

impl JsonRepositoryConfig {
    pub fn new(data_root: impl Into<PathBuf>, path: impl Into<String>) -> Self {
        Self {
            data_root: data_root.into(),
            path: path.into(),
            listing: ListingPolicy::default(),
        }
    }

    pub fn with_listing(mut self, listing: ListingPolicy) -> Self {
        self.listing = listing;
        self
    }

    /// `<dataRoot>/<path>`
    pub fn storage_dir(&self) -> PathBuf {
        self.data_root.join(&self.path)
    }

    /// Check that the layout stays inside the data root
    pub fn validate(&self, section: &str) -> crate::Result<()> {
        if self.data_root.as_os_str().is_empty() {
            return Err(invalid(section, "dataRoot", "must not be empty"));
        }

        for component in Path::new(&self.path).components() {
            match component {
                Component::ParentDir => {
                    return Err(invalid(section, "path", "must not contain '..'"));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(invalid(section, "path", "must be relative to dataRoot"));
                }
                Component::CurDir | Component::Normal(_) => {}
            }
        }

        Ok(())
    }
}

/// Configuration for a document-store repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRepositoryConfig {
    /// Collection name in the document store
    pub collection: String,

    /// Document field holding the entity's textual id
    #[serde(default = "default_id_field")]
    pub id_field: String,
}

fn default_id_field() -> String {
    "id".to_string()
}

impl DocumentRepositoryConfig {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id_field: default_id_field(),
        }
    }

    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    pub fn validate(&self, section: &str) -> crate::Result<()> {
        if self.collection.trim().is_empty() {
            return Err(invalid(section, "collection", "must not be empty"));
        }
        if self.id_field.trim().is_empty() {
            return Err(invalid(section, "idField", "must not be empty"));
        }
        Ok(())
    }
}

/// Named repository configurations, as loaded from a config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoriesConfig {
    /// File-backed repositories by name
    #[serde(default)]
    pub json: BTreeMap<String, JsonRepositoryConfig>,

    /// Document-store repositories by name
    #[serde(default)]
    pub documents: BTreeMap<String, DocumentRepositoryConfig>,
}

impl RepositoriesConfig {
    /// Load configuration from a `.json`, `.yaml` or `.yml` file
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let content = std::fs::read_to_string(path)?;
        match extension.as_str() {
            "json" => Self::from_json_str(&content),
            "yaml" | "yml" => Self::from_yaml_str(&content),
            _ => Err(ConfigError::UnsupportedFormat(extension)),
        }
    }

    pub fn from_json_str(content: &str) -> crate::Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> crate::Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        for (name, repo) in &self.json {
            repo.validate(&format!("json.{}", name))?;
        }
        for (name, repo) in &self.documents {
            repo.validate(&format!("documents.{}", name))?;
        }
        Ok(())
    }

    pub fn json_repository(&self, name: &str) -> Option<&JsonRepositoryConfig> {
        self.json.get(name)
    }

    pub fn document_repository(&self, name: &str) -> Option<&DocumentRepositoryConfig> {
        self.documents.get(name)
    }
}

fn invalid(section: &str, field: &str, reason: &str) -> ConfigError {
    InvalidConfigError {
        section: section.to_string(),
        field: field.to_string(),
        reason: reason.to_string(),
    }
    .into()
}
