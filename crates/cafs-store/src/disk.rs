//! Filesystem-backed block store.
//!
//! Layout under the root directory:
//!
//! ```text
//! objects/<first 2 hex chars>/<remaining 62 hex chars>   bincode StoredObject
//! pins/<64 hex chars>                                     empty marker file
//! ```
//!
//! Objects are written to a temporary sibling and hard-linked into place, so
//! a reader never observes a half-written object and an existing object is
//! never replaced.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, trace, warn};

use cafs_types::Key;

use crate::error::{StoreError, StoreResult};
use crate::object::{Links, ObjectKind, StoredObject};
use crate::traits::{BlockStore, PutResult};

const OBJECTS_DIR: &str = "objects";
const PINS_DIR: &str = "pins";

#[derive(Debug)]
pub struct DiskBlockStore {
    root: PathBuf,
    tmp_counter: AtomicU64,
}

impl DiskBlockStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(OBJECTS_DIR)).await?;
        fs::create_dir_all(root.join(PINS_DIR)).await?;
        debug!(root = %root.display(), "opened disk block store");
        Ok(Self {
            root,
            tmp_counter: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &Key) -> PathBuf {
        let hex = key.to_hex();
        self.root.join(OBJECTS_DIR).join(&hex[..2]).join(&hex[2..])
    }

    fn pin_path(&self, key: &Key) -> PathBuf {
        self.root.join(PINS_DIR).join(key.to_hex())
    }

    /// Count of stored objects. Walks the objects directory.
    pub async fn object_count(&self) -> StoreResult<usize> {
        let mut count = 0;
        let mut shards = fs::read_dir(self.root.join(OBJECTS_DIR)).await?;
        while let Some(shard) = shards.next_entry().await? {
            if !shard.file_type().await?.is_dir() {
                continue;
            }
            let mut entries = fs::read_dir(shard.path()).await?;
            while let Some(entry) = entries.next_entry().await? {
                if entry.file_type().await?.is_file() && !is_temp(&entry.path()) {
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    pub async fn is_pinned(&self, key: &Key) -> StoreResult<bool> {
        Ok(fs::try_exists(self.pin_path(key)).await?)
    }

    async fn write_object(&self, object: StoredObject) -> StoreResult<PutResult> {
        let key = object.compute_key();
        let size = object.size;
        let path = self.object_path(&key);

        if fs::try_exists(&path).await? {
            trace!(key = %key.short_hex(), "object already present");
            return Ok(PutResult {
                key,
                size,
                created: false,
            });
        }

        let encoded =
            bincode::serialize(&object).map_err(|e| StoreError::Serialization(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("tmp-{}-{n}", std::process::id()));
        fs::write(&tmp, &encoded).await?;

        // Linking never replaces an existing file, so of several concurrent
        // puts of the same object exactly one reports `created`.
        let published = fs::hard_link(&tmp, &path).await;
        let _ = fs::remove_file(&tmp).await;
        let created = match published {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => false,
            Err(e) => return Err(e.into()),
        };

        trace!(key = %key.short_hex(), size, created, "wrote object");
        Ok(PutResult { key, size, created })
    }

    async fn read_object(&self, key: &Key) -> StoreResult<StoredObject> {
        let bytes = match fs::read(self.object_path(key)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StoreError::NotFound(*key)),
            Err(e) => return Err(e.into()),
        };
        let object: StoredObject =
            bincode::deserialize(&bytes).map_err(|e| StoreError::CorruptObject {
                key: *key,
                reason: e.to_string(),
            })?;
        let computed = object.compute_key();
        if computed != *key {
            return Err(StoreError::CorruptObject {
                key: *key,
                reason: format!("content hashes to {computed}"),
            });
        }
        Ok(object)
    }

    async fn closure(&self, key: &Key, recursive: bool) -> StoreResult<Vec<Key>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut stack = vec![*key];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let object = self.read_object(&current).await?;
            out.push(current);
            if recursive && object.kind == ObjectKind::Node {
                stack.extend(object.to_links(&current)?.iter().map(|link| link.key));
            }
        }
        Ok(out)
    }
}

fn is_temp(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.starts_with("tmp-"))
}

#[async_trait]
impl BlockStore for DiskBlockStore {
    async fn put(&self, content: &[u8]) -> StoreResult<PutResult> {
        self.write_object(StoredObject::blob(content.to_vec())).await
    }

    async fn put_node(&self, links: &Links) -> StoreResult<PutResult> {
        self.write_object(StoredObject::node(links)?).await
    }

    async fn get(&self, key: &Key) -> StoreResult<Vec<u8>> {
        Ok(self.read_object(key).await?.data)
    }

    async fn get_node(&self, key: &Key) -> StoreResult<Links> {
        self.read_object(key).await?.to_links(key)
    }

    async fn has(&self, key: &Key) -> StoreResult<bool> {
        Ok(fs::try_exists(self.object_path(key)).await?)
    }

    async fn delete(&self, key: &Key) -> StoreResult<()> {
        match fs::remove_file(self.object_path(key)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StoreError::NotFound(*key)),
            Err(e) => return Err(e.into()),
        }
        match fs::remove_file(self.pin_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Reads the whole closure before placing any marker. If placing one
    /// fails, the markers this call added are removed again.
    async fn pin(&self, key: &Key, recursive: bool) -> StoreResult<()> {
        let keys = self.closure(key, recursive).await?;
        let mut placed = Vec::new();
        let result: StoreResult<()> = async {
            for k in &keys {
                let marker = self.pin_path(k);
                if !fs::try_exists(&marker).await? {
                    fs::write(&marker, b"").await?;
                    placed.push(marker);
                }
            }
            Ok(())
        }
        .await;

        if let Err(e) = result {
            warn!(key = %key, placed = placed.len(), error = %e, "pin failed, removing new markers");
            for marker in &placed {
                let _ = fs::remove_file(marker).await;
            }
            return Err(e);
        }
        Ok(())
    }

    async fn unpin(&self, key: &Key, recursive: bool) -> StoreResult<()> {
        if !self.is_pinned(key).await? {
            return Err(StoreError::NotPinned(*key));
        }
        for k in self.closure(key, recursive).await? {
            match fs::remove_file(self.pin_path(&k)).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Link, LinkKind};

    #[tokio::test]
    async fn put_get_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let key = {
            let store = DiskBlockStore::open(dir.path()).await.unwrap();
            store.put(b"persisted").await.unwrap().key
        };
        let store = DiskBlockStore::open(dir.path()).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), b"persisted");
        assert_eq!(store.object_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn second_put_is_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskBlockStore::open(dir.path()).await.unwrap();
        assert!(store.put(b"same").await.unwrap().created);
        assert!(!store.put(b"same").await.unwrap().created);
        assert_eq!(store.object_count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_puts_create_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(DiskBlockStore::open(dir.path()).await.unwrap());

        for round in 0..10 {
            let content = format!("contended {round}").into_bytes();
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let store = store.clone();
                    let content = content.clone();
                    tokio::spawn(async move { store.put(&content).await.unwrap() })
                })
                .collect();

            let mut created = 0;
            for handle in handles {
                if handle.await.unwrap().created {
                    created += 1;
                }
            }
            assert_eq!(created, 1, "round {round}");
        }
        assert_eq!(store.object_count().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn corrupted_object_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskBlockStore::open(dir.path()).await.unwrap();
        let key = store.put(b"original").await.unwrap().key;

        let tampered = bincode::serialize(&StoredObject::blob(b"tampered".to_vec())).unwrap();
        fs::write(store.object_path(&key), tampered).await.unwrap();

        assert!(matches!(
            store.get(&key).await,
            Err(StoreError::CorruptObject { .. })
        ));
    }

    #[tokio::test]
    async fn delete_and_missing_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskBlockStore::open(dir.path()).await.unwrap();
        let key = store.put(b"gone soon").await.unwrap().key;
        store.delete(&key).await.unwrap();
        assert!(!store.has(&key).await.unwrap());
        assert!(store.delete(&key).await.unwrap_err().is_absent());
    }

    #[tokio::test]
    async fn recursive_pin_and_unpin() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskBlockStore::open(dir.path()).await.unwrap();
        let child = store.put(b"child").await.unwrap();
        let links =
            Links::from_links([Link::new("c", child.key, child.size, LinkKind::File)]).unwrap();
        let root = store.put_node(&links).await.unwrap().key;

        store.pin(&root, true).await.unwrap();
        assert!(store.is_pinned(&child.key).await.unwrap());

        store.unpin(&root, true).await.unwrap();
        assert!(!store.is_pinned(&root).await.unwrap());
        assert!(!store.is_pinned(&child.key).await.unwrap());
        assert!(matches!(
            store.unpin(&root, true).await,
            Err(StoreError::NotPinned(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_pin_removes_markers_it_placed() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskBlockStore::open(dir.path()).await.unwrap();
        let child = store.put(b"child").await.unwrap();
        let links =
            Links::from_links([Link::new("c", child.key, child.size, LinkKind::File)]).unwrap();
        let root = store.put_node(&links).await.unwrap().key;

        // A dangling link into a missing directory makes the child's marker
        // unwritable; the root's marker is placed first.
        std::os::unix::fs::symlink(
            dir.path().join("missing/dir/marker"),
            store.pin_path(&child.key),
        )
        .unwrap();

        assert!(store.pin(&root, true).await.is_err());
        assert!(!store.is_pinned(&root).await.unwrap());
    }
}
