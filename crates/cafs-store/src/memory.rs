use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::trace;

use cafs_types::Key;

use crate::error::{StoreError, StoreResult};
use crate::object::{Links, ObjectKind, StoredObject};
use crate::traits::{BlockStore, PutResult};

/// In-memory, HashMap-based block store.
///
/// Intended for tests and embedding. Objects and pins live behind `RwLock`s
/// for safe concurrent access; objects are cloned on read.
pub struct MemoryBlockStore {
    objects: RwLock<HashMap<Key, StoredObject>>,
    pins: RwLock<HashSet<Key>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            pins: RwLock::new(HashSet::new()),
        }
    }

    /// Number of objects currently stored.
    pub fn object_count(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes of object data held.
    pub fn total_bytes(&self) -> u64 {
        self.objects
            .read()
            .expect("lock poisoned")
            .values()
            .map(|obj| obj.data.len() as u64)
            .sum()
    }

    /// Sorted list of every stored key.
    pub fn keys(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = self
            .objects
            .read()
            .expect("lock poisoned")
            .keys()
            .copied()
            .collect();
        keys.sort();
        keys
    }

    pub fn is_pinned(&self, key: &Key) -> bool {
        self.pins.read().expect("lock poisoned").contains(key)
    }

    pub fn pin_count(&self) -> usize {
        self.pins.read().expect("lock poisoned").len()
    }

    fn insert(&self, object: StoredObject) -> PutResult {
        let key = object.compute_key();
        let size = object.size;
        let mut map = self.objects.write().expect("lock poisoned");
        let created = !map.contains_key(&key);
        if created {
            map.insert(key, object);
        }
        trace!(key = %key.short_hex(), created, "stored object");
        PutResult { key, size, created }
    }

    /// `key` followed by every key reachable through node links.
    fn closure(&self, key: &Key, recursive: bool) -> StoreResult<Vec<Key>> {
        let map = self.objects.read().expect("lock poisoned");
        if !map.contains_key(key) {
            return Err(StoreError::NotFound(*key));
        }
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut stack = vec![*key];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            out.push(current);
            if !recursive {
                break;
            }
            if let Some(obj) = map.get(&current) {
                if obj.kind == ObjectKind::Node {
                    stack.extend(obj.to_links(&current)?.iter().map(|link| link.key));
                }
            }
        }
        Ok(out)
    }
}

impl Default for MemoryBlockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn put(&self, content: &[u8]) -> StoreResult<PutResult> {
        Ok(self.insert(StoredObject::blob(content.to_vec())))
    }

    async fn put_node(&self, links: &Links) -> StoreResult<PutResult> {
        Ok(self.insert(StoredObject::node(links)?))
    }

    async fn get(&self, key: &Key) -> StoreResult<Vec<u8>> {
        let map = self.objects.read().expect("lock poisoned");
        map.get(key)
            .map(|obj| obj.data.clone())
            .ok_or(StoreError::NotFound(*key))
    }

    async fn get_node(&self, key: &Key) -> StoreResult<Links> {
        let map = self.objects.read().expect("lock poisoned");
        map.get(key)
            .ok_or(StoreError::NotFound(*key))?
            .to_links(key)
    }

    async fn has(&self, key: &Key) -> StoreResult<bool> {
        Ok(self.objects.read().expect("lock poisoned").contains_key(key))
    }

    async fn delete(&self, key: &Key) -> StoreResult<()> {
        let removed = self.objects.write().expect("lock poisoned").remove(key);
        if removed.is_none() {
            return Err(StoreError::NotFound(*key));
        }
        self.pins.write().expect("lock poisoned").remove(key);
        Ok(())
    }

    async fn pin(&self, key: &Key, recursive: bool) -> StoreResult<()> {
        let keys = self.closure(key, recursive)?;
        self.pins.write().expect("lock poisoned").extend(keys);
        Ok(())
    }

    async fn unpin(&self, key: &Key, recursive: bool) -> StoreResult<()> {
        if !self.is_pinned(key) {
            return Err(StoreError::NotPinned(*key));
        }
        let keys = self.closure(key, recursive)?;
        let mut pins = self.pins.write().expect("lock poisoned");
        for k in keys {
            pins.remove(&k);
        }
        Ok(())
    }
}

impl std::fmt::Debug for MemoryBlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBlockStore")
            .field("object_count", &self.object_count())
            .field("pin_count", &self.pin_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Link, LinkKind};

    async fn small_tree(store: &MemoryBlockStore) -> (Key, Key, Key) {
        let a = store.put(b"file a").await.unwrap().key;
        let b = store.put(b"file b").await.unwrap().key;
        let links = Links::from_links([
            Link::new("a.txt", a, 6, LinkKind::File),
            Link::new("b.txt", b, 6, LinkKind::File),
        ])
        .unwrap();
        let root = store.put_node(&links).await.unwrap().key;
        (root, a, b)
    }

    #[tokio::test]
    async fn put_then_get() {
        let store = MemoryBlockStore::new();
        let put = store.put(b"hello world").await.unwrap();
        assert!(put.created);
        assert_eq!(put.size, 11);
        assert_eq!(store.get(&put.key).await.unwrap(), b"hello world");
        assert!(store.has(&put.key).await.unwrap());
    }

    #[tokio::test]
    async fn identical_content_is_stored_once() {
        let store = MemoryBlockStore::new();
        let first = store.put(b"identical").await.unwrap();
        let second = store.put(b"identical").await.unwrap();
        assert_eq!(first.key, second.key);
        assert!(first.created);
        assert!(!second.created);
        assert_eq!(store.object_count(), 1);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = MemoryBlockStore::new();
        let key = Key::digest_of(b"never written");
        assert!(matches!(
            store.get(&key).await,
            Err(StoreError::NotFound(k)) if k == key
        ));
        assert!(!store.has(&key).await.unwrap());
    }

    #[tokio::test]
    async fn nodes_decode_back_to_links() {
        let store = MemoryBlockStore::new();
        let (root, a, _) = small_tree(&store).await;
        let links = store.get_node(&root).await.unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links.get("a.txt").unwrap().key, a);
        assert!(matches!(
            store.get_node(&a).await,
            Err(StoreError::CorruptObject { .. })
        ));
    }

    #[tokio::test]
    async fn resolve_walks_link_names() {
        let store = MemoryBlockStore::new();
        let (root, a, _) = small_tree(&store).await;
        let outer = store
            .put_node(&Links::from_links([Link::new("inner", root, 0, LinkKind::Directory)]).unwrap())
            .await
            .unwrap()
            .key;

        assert_eq!(store.resolve(&outer, "").await.unwrap(), outer);
        assert_eq!(store.resolve(&outer, "inner").await.unwrap(), root);
        assert_eq!(store.resolve(&outer, "/inner/a.txt").await.unwrap(), a);
        assert_eq!(store.resolve(&outer, "inner//a.txt/").await.unwrap(), a);

        assert!(matches!(
            store.resolve(&outer, "inner/zzz").await,
            Err(StoreError::NoSuchLink { node, name }) if node == root && name == "zzz"
        ));
        assert!(matches!(
            store.resolve(&outer, "inner/a.txt/deeper").await,
            Err(StoreError::CorruptObject { .. })
        ));
    }

    #[tokio::test]
    async fn predicted_keys_match_stored_keys() {
        let store = MemoryBlockStore::new();
        let predicted = store.key_for(b"soon");
        assert_eq!(store.put(b"soon").await.unwrap().key, predicted);

        let links = Links::from_links([Link::new("x", predicted, 4, LinkKind::File)]).unwrap();
        let predicted = store.node_key_for(&links).unwrap();
        assert_eq!(store.put_node(&links).await.unwrap().key, predicted);
    }

    #[tokio::test]
    async fn delete_reports_missing_keys() {
        let store = MemoryBlockStore::new();
        let key = store.put(b"to delete").await.unwrap().key;
        store.delete(&key).await.unwrap();
        assert!(store.is_empty());

        let err = store.delete(&key).await.unwrap_err();
        assert!(err.is_absent());
    }

    #[tokio::test]
    async fn recursive_pin_covers_children() {
        let store = MemoryBlockStore::new();
        let (root, a, b) = small_tree(&store).await;

        store.pin(&root, true).await.unwrap();
        assert!(store.is_pinned(&root));
        assert!(store.is_pinned(&a));
        assert!(store.is_pinned(&b));

        store.unpin(&root, true).await.unwrap();
        assert_eq!(store.pin_count(), 0);
    }

    #[tokio::test]
    async fn shallow_pin_covers_only_root() {
        let store = MemoryBlockStore::new();
        let (root, a, _) = small_tree(&store).await;
        store.pin(&root, false).await.unwrap();
        assert!(store.is_pinned(&root));
        assert!(!store.is_pinned(&a));
    }

    #[tokio::test]
    async fn unpin_without_pin_is_not_pinned() {
        let store = MemoryBlockStore::new();
        let key = store.put(b"loose").await.unwrap().key;
        let err = store.unpin(&key, true).await.unwrap_err();
        assert!(matches!(err, StoreError::NotPinned(k) if k == key));
        assert!(err.is_absent());
    }

    #[tokio::test]
    async fn delete_drops_pin() {
        let store = MemoryBlockStore::new();
        let key = store.put(b"pinned").await.unwrap().key;
        store.pin(&key, false).await.unwrap();
        store.delete(&key).await.unwrap();
        assert!(!store.is_pinned(&key));
    }

    #[test]
    fn debug_format() {
        let store = MemoryBlockStore::default();
        let debug = format!("{store:?}");
        assert!(debug.contains("MemoryBlockStore"));
        assert!(debug.contains("object_count"));
    }
}
