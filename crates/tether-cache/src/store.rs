//! Storage backends for the cache.
//!
//! [`KvStore`] holds a handful of small records under fixed keys. [`BlobStore`]
//! holds one file-like blob per session. Both come with a filesystem
//! implementation for real use and an in-memory one for tests.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::Result;

const BLOB_EXTENSION: &str = "json";

/// Filesystem-safe blob name for a session ID.
///
/// ASCII letters, digits and `-` are kept. `_` becomes `__` and every other
/// byte becomes `_XX` (uppercase hex), so distinct IDs never share a name.
pub fn blob_name(session_id: &str) -> String {
    let mut stem = String::with_capacity(session_id.len());
    for byte in session_id.bytes() {
        match byte {
            b'_' => stem.push_str("__"),
            b if b.is_ascii_alphanumeric() || b == b'-' => stem.push(b as char),
            b => stem.push_str(&format!("_{:02X}", b)),
        }
    }
    format!("{}.{}", stem, BLOB_EXTENSION)
}

/// Small records under fixed keys.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// One blob per session, addressed by [`blob_name`].
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn read(&self, name: &str) -> Result<Option<String>>;

    async fn write(&self, name: &str, contents: &str) -> Result<()>;

    /// Delete a blob. Deleting a missing blob is not an error.
    async fn delete(&self, name: &str) -> Result<()>;

    /// Size in bytes, or `None` if the blob does not exist.
    async fn size(&self, name: &str) -> Result<Option<u64>>;

    /// Names of all stored blobs.
    async fn list(&self) -> Result<Vec<String>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Filesystem
// ─────────────────────────────────────────────────────────────────────────────

async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn remove_optional(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Write through a temp file and rename so readers never see a partial file.
async fn write_atomic(dir: &Path, name: &str, contents: &str) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let tmp = dir.join(format!(".{}.tmp", name));
    tokio::fs::write(&tmp, contents).await?;
    tokio::fs::rename(&tmp, dir.join(name)).await?;
    Ok(())
}

/// [`KvStore`] keeping each key in `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FsKvStore {
    dir: PathBuf,
}

impl FsKvStore {
    /// The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_name(key: &str) -> String {
        format!("{}.{}", key, BLOB_EXTENSION)
    }
}

#[async_trait]
impl KvStore for FsKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        read_optional(&self.dir.join(Self::file_name(key))).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        write_atomic(&self.dir, &Self::file_name(key), value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        remove_optional(&self.dir.join(Self::file_name(key))).await
    }
}

/// [`BlobStore`] keeping blobs as files in one directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    dir: PathBuf,
}

impl FsBlobStore {
    /// The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn read(&self, name: &str) -> Result<Option<String>> {
        read_optional(&self.dir.join(name)).await
    }

    async fn write(&self, name: &str, contents: &str) -> Result<()> {
        write_atomic(&self.dir, name, contents).await
    }

    async fn delete(&self, name: &str) -> Result<()> {
        remove_optional(&self.dir.join(name)).await
    }

    async fn size(&self, name: &str) -> Result<Option<u64>> {
        match tokio::fs::metadata(self.dir.join(name)).await {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == BLOB_EXTENSION)
                && let Some(name) = path.file_name().and_then(|n| n.to_str())
                && !name.starts_with('.')
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory
// ─────────────────────────────────────────────────────────────────────────────

/// [`KvStore`] backed by a map. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// [`BlobStore`] backed by a map. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn read(&self, name: &str) -> Result<Option<String>> {
        Ok(self.blobs.lock().get(name).cloned())
    }

    async fn write(&self, name: &str, contents: &str) -> Result<()> {
        self.blobs.lock().insert(name.to_string(), contents.to_string());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.blobs.lock().remove(name);
        Ok(())
    }

    async fn size(&self, name: &str) -> Result<Option<u64>> {
        Ok(self.blobs.lock().get(name).map(|b| b.len() as u64))
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.blobs.lock().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
