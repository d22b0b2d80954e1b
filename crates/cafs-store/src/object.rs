use serde::{Deserialize, Serialize};

use cafs_types::Key;

use crate::error::{StoreError, StoreResult};
use crate::hasher::ContentHasher;

/// The kind of object stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Raw file content.
    Blob,
    /// Merkle directory node: an encoded [`Links`] set.
    Node,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blob => write!(f, "blob"),
            Self::Node => write!(f, "node"),
        }
    }
}

/// A stored object: kind tag + bytes + cumulative size.
///
/// For blobs `size` is the byte length. For nodes it is the encoded length
/// plus the sizes of every linked child, so a root node reports the size of
/// the whole tree beneath it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub kind: ObjectKind,
    pub data: Vec<u8>,
    pub size: u64,
}

impl StoredObject {
    pub fn blob(data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self {
            kind: ObjectKind::Blob,
            data,
            size,
        }
    }

    /// Encode `links` as a directory node.
    pub fn node(links: &Links) -> StoreResult<Self> {
        let data =
            serde_json::to_vec(links).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let size = data.len() as u64 + links.cumulative_size();
        Ok(Self {
            kind: ObjectKind::Node,
            data,
            size,
        })
    }

    /// The content-address key for this object.
    pub fn compute_key(&self) -> Key {
        ContentHasher::for_kind(self.kind).hash(&self.data)
    }

    /// Decode a node object back into its links.
    pub fn to_links(&self, key: &Key) -> StoreResult<Links> {
        if self.kind != ObjectKind::Node {
            return Err(StoreError::CorruptObject {
                key: *key,
                reason: format!("expected node, got {}", self.kind),
            });
        }
        serde_json::from_slice(&self.data).map_err(|e| StoreError::CorruptObject {
            key: *key,
            reason: e.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    File,
    Directory,
}

/// One named child reference inside a directory node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    pub key: Key,
    /// Cumulative size of the referenced object.
    pub size: u64,
    pub kind: LinkKind,
}

impl Link {
    pub fn new(name: impl Into<String>, key: Key, size: u64, kind: LinkKind) -> Self {
        Self {
            name: name.into(),
            key,
            size,
            kind,
        }
    }
}

/// Ordered, name-unique link set for a directory node.
///
/// Links are kept sorted by name so the encoded node (and therefore its key)
/// does not depend on the order children were added in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Links {
    links: Vec<Link>,
}

impl Links {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an iterator, rejecting repeated names.
    pub fn from_links(links: impl IntoIterator<Item = Link>) -> StoreResult<Self> {
        let mut set = Self::new();
        for link in links {
            set.add(link)?;
        }
        Ok(set)
    }

    pub fn add(&mut self, link: Link) -> StoreResult<()> {
        match self
            .links
            .binary_search_by(|existing| existing.name.as_str().cmp(&link.name))
        {
            Ok(_) => Err(StoreError::DuplicateLink(link.name)),
            Err(pos) => {
                self.links.insert(pos, link);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Link> {
        self.links
            .binary_search_by(|existing| existing.name.as_str().cmp(name))
            .ok()
            .map(|pos| &self.links[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn cumulative_size(&self) -> u64 {
        self.links.iter().map(|link| link.size).sum()
    }
}

impl<'a> IntoIterator for &'a Links {
    type Item = &'a Link;
    type IntoIter = std::slice::Iter<'a, Link>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.iter()
    }
}
