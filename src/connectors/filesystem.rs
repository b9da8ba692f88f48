use crate::catalog::Catalog;
use crate::constants::{FILESYSTEM_CONNECTOR, FILESYSTEM_CONNECTOR_TYPE};
use crate::error::{ConnectorError, Result};
use crate::models::{AtlasEntity, Entity, EntityType};
use crate::pipeline::{Connector, ConnectorBase};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilesystemConfig {
    pub root_path: PathBuf,
    /// Allow-list such as `[".csv", ".xlsx"]`; `None` or empty keeps every file.
    #[serde(default)]
    pub file_extensions: Option<Vec<String>>,
    #[serde(default = "default_recursive")]
    pub recursive: bool,
    #[serde(default)]
    pub use_gateway: bool,
    #[serde(default)]
    pub gateway_id: Option<String>,
    #[serde(default)]
    pub collection_name: Option<String>,
    #[serde(default)]
    pub qualified_name_prefix: Option<String>,
}

fn default_recursive() -> bool {
    true
}

impl FilesystemConfig {
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            file_extensions: None,
            recursive: true,
            use_gateway: false,
            gateway_id: None,
            collection_name: None,
            qualified_name_prefix: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub path: String,
    pub relative_path: String,
    pub size: u64,
    /// Suffix including the dot, in its original case; empty when absent.
    pub extension: String,
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryInfo {
    pub name: String,
    pub path: String,
    pub relative_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilesystemMetadata {
    pub root_path: String,
    pub files: Vec<FileInfo>,
    pub directories: Vec<DirectoryInfo>,
}

/// Lowercase, dot-prefixed, without blanks. An empty result disables filtering.
fn normalize_extensions(extensions: Option<&[String]>) -> Option<Vec<String>> {
    let normalized: Vec<String> = extensions
        .unwrap_or_default()
        .iter()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty() && e != ".")
        .map(|e| if e.starts_with('.') { e } else { format!(".{}", e) })
        .collect();
    (!normalized.is_empty()).then_some(normalized)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Scans a directory tree and describes its files and folders.
pub struct FilesystemConnector {
    base: ConnectorBase,
    config: FilesystemConfig,
    extensions: Option<Vec<String>>,
}

impl FilesystemConnector {
    pub fn new(catalog: Arc<dyn Catalog>, config: FilesystemConfig) -> Result<Self> {
        super::check_gateway(config.use_gateway, config.gateway_id.as_deref())?;
        let base = ConnectorBase::new(
            catalog,
            FILESYSTEM_CONNECTOR_TYPE,
            config.collection_name.clone(),
            config.qualified_name_prefix.clone(),
        );
        let extensions = normalize_extensions(config.file_extensions.as_deref());
        Ok(Self {
            base,
            config,
            extensions,
        })
    }

    pub fn config(&self) -> &FilesystemConfig {
        &self.config
    }

    pub fn extensions(&self) -> Option<&[String]> {
        self.extensions.as_deref()
    }

    fn matches_extension(&self, path: &Path) -> bool {
        match &self.extensions {
            None => true,
            Some(allowed) => {
                let suffix = path
                    .extension()
                    .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
                    .unwrap_or_default();
                allowed.iter().any(|a| *a == suffix)
            }
        }
    }

    fn walk(
        &self,
        root: &Path,
        dir: &Path,
        files: &mut Vec<FileInfo>,
        directories: &mut Vec<DirectoryInfo>,
    ) -> Result<()> {
        let read_failed = |e: std::io::Error| {
            ConnectorError::Connection(format!("failed to read {}: {}", dir.display(), e))
        };
        let mut entries = fs::read_dir(dir)
            .map_err(read_failed)?
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(read_failed)?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let path = entry.path();
            let is_symlink = entry.file_type().map(|t| t.is_symlink()).unwrap_or(false);
            let metadata = match fs::metadata(&path) {
                Ok(m) => m,
                Err(e) => {
                    debug!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            let relative_path = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_string_lossy()
                .into_owned();

            if metadata.is_dir() {
                directories.push(DirectoryInfo {
                    name: display_name(&path),
                    path: path.to_string_lossy().into_owned(),
                    relative_path,
                });
                // symlinked directories are listed but not followed
                if self.config.recursive && !is_symlink {
                    self.walk(root, &path, files, directories)?;
                }
            } else if metadata.is_file() {
                if !self.matches_extension(&path) {
                    continue;
                }
                files.push(FileInfo {
                    name: display_name(&path),
                    path: path.to_string_lossy().into_owned(),
                    relative_path,
                    size: metadata.len(),
                    extension: path
                        .extension()
                        .map(|e| format!(".{}", e.to_string_lossy()))
                        .unwrap_or_default(),
                    modified: metadata.modified().ok().map(DateTime::<Utc>::from),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Connector for FilesystemConnector {
    type Metadata = FilesystemMetadata;

    fn name(&self) -> &'static str {
        FILESYSTEM_CONNECTOR
    }

    fn base(&self) -> &ConnectorBase {
        &self.base
    }

    /// A missing root yields empty listings rather than an error.
    #[instrument(skip(self), fields(root = %self.config.root_path.display()))]
    async fn extract_metadata(&self) -> Result<FilesystemMetadata> {
        let root = &self.config.root_path;
        info!(recursive = self.config.recursive, "Scanning file system");

        if !root.is_dir() {
            warn!("Path does not exist or is not a directory: {}", root.display());
            return Ok(FilesystemMetadata {
                root_path: root.to_string_lossy().into_owned(),
                files: Vec::new(),
                directories: Vec::new(),
            });
        }

        let root = fs::canonicalize(root).map_err(|e| {
            ConnectorError::Connection(format!("failed to resolve {}: {}", root.display(), e))
        })?;
        let mut files = Vec::new();
        let mut directories = Vec::new();
        self.walk(&root, &root, &mut files, &mut directories)?;

        info!(
            "Found {} files and {} directories",
            files.len(),
            directories.len()
        );

        Ok(FilesystemMetadata {
            root_path: root.to_string_lossy().into_owned(),
            files,
            directories,
        })
    }

    fn transform_to_atlas(&self, metadata: &FilesystemMetadata) -> Result<Vec<AtlasEntity>> {
        let root_path = &metadata.root_path;
        let mut entities = Vec::with_capacity(1 + metadata.directories.len() + metadata.files.len());

        entities.push(
            Entity::new(
                EntityType::FsPath,
                self.base.create_qualified_name([root_path]),
                display_name(Path::new(root_path)),
            )
            .with_attribute("path", root_path.clone())
            .with_attribute("description", "Root directory")
            .to_atlas(),
        );

        for directory in &metadata.directories {
            entities.push(
                Entity::new(
                    EntityType::FsPath,
                    self.base.create_qualified_name([&directory.path]),
                    directory.name.clone(),
                )
                .with_attribute("path", directory.path.clone())
                .with_attribute("description", "Directory")
                .to_atlas(),
            );
        }

        for file in &metadata.files {
            entities.push(
                Entity::new(
                    EntityType::DataSet,
                    self.base.create_qualified_name([&file.path]),
                    file.name.clone(),
                )
                .with_attribute("description", format!("File: {}", file.name))
                .with_attribute("fileExtension", file.extension.clone())
                .with_attribute("fileSize", file.size)
                .to_atlas(),
            );
        }

        info!("Transformed {} entities", entities.len());
        Ok(entities)
    }
}
