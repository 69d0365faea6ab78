/*!
 * Snapshot Stores
 * Key → blob storage backends for kernel snapshots
 */

use crate::core::errors::KernelError;
use crate::core::types::KernelResult;
use ahash::AHashMap;
use parking_lot::RwLock;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Durable key/blob store
///
/// `store` must replace the blob for `key` atomically: a reader sees either
/// the previous blob or the new one, never a mix.
#[cfg_attr(test, mockall::automock)]
pub trait SnapshotStore {
    /// Read the blob stored under `key`, if any
    fn load(&self, key: &str) -> KernelResult<Option<Vec<u8>>>;

    /// Replace the blob stored under `key`
    fn store(&self, key: &str, blob: &[u8]) -> KernelResult<()>;
}

/// In-process store
///
/// Share it through an `Arc` to carry snapshots across kernel rebuilds within
/// one host process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: RwLock<AHashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.read().contains_key(key)
    }

    pub fn remove(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.write().remove(key)
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self, key: &str) -> KernelResult<Option<Vec<u8>>> {
        Ok(self.blobs.read().get(key).cloned())
    }

    fn store(&self, key: &str, blob: &[u8]) -> KernelResult<()> {
        self.blobs.write().insert(key.to_string(), blob.to_vec());
        Ok(())
    }
}

/// One file per key under a root directory
///
/// Writes go to a temporary sibling file which is then renamed over the
/// target, so a crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn open(root: impl AsRef<Path>) -> KernelResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "File store opened");
        Ok(Self { root })
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> KernelResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(KernelError::Storage(
                format!("invalid store key '{}'", key).into(),
            ));
        }
        Ok(self.root.join(format!("{}.json", key)))
    }
}

impl SnapshotStore for FileStore {
    fn load(&self, key: &str) -> KernelResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, key: &str, blob: &[u8]) -> KernelResult<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(blob)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), bytes = blob.len(), "Snapshot blob written");
        Ok(())
    }
}
