use async_trait::async_trait;

use cafs_types::Key;

use crate::error::{StoreError, StoreResult};
use crate::hasher::ContentHasher;
use crate::object::{Links, StoredObject};

/// Outcome of a successful `put` or `put_node`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PutResult {
    pub key: Key,
    /// Cumulative size of the stored object (see [`crate::StoredObject`]).
    pub size: u64,
    /// `false` when an identical object was already present.
    pub created: bool,
}

/// Content-addressed block store.
///
/// All implementations must satisfy these invariants:
/// - The store chooses keys. The same bytes always yield the same key, and
///   putting them twice leaves a single object.
/// - Objects are immutable once written.
/// - Implementations are safe for concurrent use; callers coordinate nothing
///   across independent writes.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Key that `put(content)` assigns, computed without touching storage.
    fn key_for(&self, content: &[u8]) -> Key {
        ContentHasher::BLOB.hash(content)
    }

    /// Key that `put_node(links)` assigns, computed without touching storage.
    fn node_key_for(&self, links: &Links) -> StoreResult<Key> {
        Ok(StoredObject::node(links)?.compute_key())
    }

    /// Store raw content.
    async fn put(&self, content: &[u8]) -> StoreResult<PutResult>;

    /// Store a directory node referencing child keys.
    async fn put_node(&self, links: &Links) -> StoreResult<PutResult>;

    /// Read an object's bytes. Missing keys are [`StoreError::NotFound`].
    ///
    /// [`StoreError::NotFound`]: crate::StoreError::NotFound
    async fn get(&self, key: &Key) -> StoreResult<Vec<u8>>;

    /// Read and decode a directory node.
    async fn get_node(&self, key: &Key) -> StoreResult<Links>;

    async fn has(&self, key: &Key) -> StoreResult<bool>;

    /// Follow a slash-separated `path` of link names down from the node at
    /// `root`. An empty path resolves to `root` itself.
    async fn resolve(&self, root: &Key, path: &str) -> StoreResult<Key> {
        let mut current = *root;
        for name in path.split('/').filter(|segment| !segment.is_empty()) {
            let links = self.get_node(&current).await?;
            let link = links.get(name).ok_or_else(|| StoreError::NoSuchLink {
                node: current,
                name: name.to_string(),
            })?;
            current = link.key;
        }
        Ok(current)
    }

    /// Remove an object. A missing key is [`StoreError::NotFound`], which
    /// callers undoing their own writes treat as success.
    ///
    /// [`StoreError::NotFound`]: crate::StoreError::NotFound
    async fn delete(&self, key: &Key) -> StoreResult<()>;

    /// Mark `key` (and, if `recursive`, everything it links to) as retained.
    ///
    /// Stores without garbage collection need not track pins.
    async fn pin(&self, _key: &Key, _recursive: bool) -> StoreResult<()> {
        Ok(())
    }

    /// Drop a pin. Unpinning a key that is not pinned is
    /// [`StoreError::NotPinned`].
    ///
    /// [`StoreError::NotPinned`]: crate::StoreError::NotPinned
    async fn unpin(&self, _key: &Key, _recursive: bool) -> StoreResult<()> {
        Ok(())
    }
}
