use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use joymap_logical::{BlobStore, Error as StoreError, Result as StoreResult};

use crate::config::{parse_config, ConfigError, Settings};

const DEFAULT_WORKSPACE_PATH: &str = ".config/joymap";
const CONFIG_FILE_NAME: &str = "joymap.yaml";
const BLOB_EXTENSION: &str = "blob";

/// Directory holding the config file and persisted blobs.
#[derive(Debug, Clone)]
pub struct Workspace {
    path: PathBuf,
}

impl Workspace {
    pub fn new(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_owned(),
            None => Self::default_path()?,
        };

        if !path.exists() {
            std::fs::create_dir_all(&path)?;
        } else if !path.is_dir() {
            return Err(ConfigError::PathIsNotDirectory(
                path.display().to_string(),
            ));
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config_path(&self) -> PathBuf {
        self.path.join(CONFIG_FILE_NAME)
    }

    /// Settings from the config file, or defaults when there is none.
    pub fn load_settings(&self) -> Result<Settings, ConfigError> {
        match std::fs::read_to_string(self.config_path()) {
            Ok(input) => parse_config(&input),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn file_store(&self) -> FileStore {
        FileStore::new(&self.path)
    }

    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let path = std::env::var("HOME")
            .map(PathBuf::from)
            .map(|p| p.join(DEFAULT_WORKSPACE_PATH))
            .map_err(|_| ConfigError::EnvVarNotSet("HOME".to_string()))?;

        Ok(path)
    }
}

/// Blob store keeping one file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_owned(),
        }
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.dir.join(key).with_extension(BLOB_EXTENSION)
    }
}

impl BlobStore for FileStore {
    fn load(&self, key: &str) -> StoreResult<Vec<u8>> {
        match std::fs::read(self.blob_path(key)) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(key.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, key: &str, data: &[u8]) -> StoreResult<()> {
        // Replace the blob atomically.
        let path = self.blob_path(key);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}
