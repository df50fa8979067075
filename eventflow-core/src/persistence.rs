use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;

/// File names are prefixed so the seed directory can be shared
const FILE_PREFIX: &str = "eventflow_";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("stored value is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub type BoxedPersistence = std::sync::Arc<dyn Persistence>;

/// A key-value store for last-known state, used only as a cold-start seed.
/// The first successful sync tick overwrites everything it holds.
pub trait Persistence: Send + Sync {
    fn save(&self, key: &str, value: &Value) -> Result<(), PersistenceError>;
    fn load(&self, key: &str) -> Result<Option<Value>, PersistenceError>;
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

/// Keys outside the mirrored collections
pub mod keys {
    pub const CURRENT_USER: &str = "currentUser";
    pub const DARK_MODE: &str = "darkMode";
}

/// Persistence backed by one JSON file per key
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}{}.json", FILE_PREFIX, key))
    }
}

impl Persistence for FileStore {
    fn save(&self, key: &str, value: &Value) -> Result<(), PersistenceError> {
        let text = serde_json::to_string(value)?;
        fs::write(self.path_for(key), text)?;

        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Value>, PersistenceError> {
        let text = match fs::read_to_string(self.path_for(key)) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(serde_json::from_str(&text)?))
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
