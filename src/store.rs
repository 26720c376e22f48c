//! Byte store abstraction.
//!
//! The pipeline never touches the filesystem or network directly — source
//! bytes and watermark overlays come through a [`ByteStore`], and derived
//! outputs can be persisted through the same interface. Two implementations
//! ship with the crate:
//!
//! - [`LocalStore`] — keys resolve to files under a root directory. Used by
//!   the CLI. Keys are jailed to the root: absolute paths and `..` traversal
//!   are rejected.
//! - [`MemStore`] — a HashMap of buffers. Used by tests and embedders that
//!   already hold the bytes.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// A fetched object: raw bytes plus the content type when the store knows it.
#[derive(Debug, Clone)]
pub struct ObjectData {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Source of image bytes and sink for derived outputs.
///
/// Implementations must be safe to share across request threads.
pub trait ByteStore: Send + Sync {
    /// Fetch an object by key.
    fn get(&self, key: &str) -> Result<ObjectData, StoreError>;

    /// Persist a derived object. Returns the reference under which it was
    /// stored (for [`LocalStore`], the path relative to the root).
    fn put(&self, key: &str, bytes: &[u8]) -> Result<String, StoreError>;
}

/// Filesystem-backed store rooted at a directory.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key to a path under the root, rejecting escapes.
    fn resolve(&self, key: &str) -> Result<PathBuf, StoreError> {
        let rel = Path::new(key);
        let escapes = rel.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if key.is_empty() || escapes {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

/// Content type guess from a key's extension. Only formats the pipeline can
/// produce are mapped; anything else is `None`.
fn guess_content_type(key: &str) -> Option<String> {
    let ext = Path::new(key).extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => return None,
    };
    Some(mime.to_string())
}

impl ByteStore for LocalStore {
    fn get(&self, key: &str) -> Result<ObjectData, StoreError> {
        let path = self.resolve(key)?;
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(key.to_string()));
            }
            Err(e) => return Err(StoreError::Io(e)),
        };
        Ok(ObjectData {
            bytes,
            content_type: guess_content_type(key),
        })
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<String, StoreError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;
        Ok(key.to_string())
    }
}

/// In-memory store. Uses Mutex (not RefCell) so it is Sync and works from
/// rayon worker threads.
#[derive(Default)]
pub struct MemStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object, replacing any previous value under the key.
    pub fn insert(&self, key: impl Into<String>, bytes: Vec<u8>) {
        self.objects.lock().unwrap().insert(key.into(), bytes);
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

impl ByteStore for MemStore {
    fn get(&self, key: &str) -> Result<ObjectData, StoreError> {
        let objects = self.objects.lock().unwrap();
        let bytes = objects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        Ok(ObjectData {
            bytes,
            content_type: guess_content_type(key),
        })
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<String, StoreError> {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
        Ok(key.to_string())
    }
}
