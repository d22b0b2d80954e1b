use cafs_types::Key;

use crate::object::ObjectKind;

/// Domain-separated BLAKE3 content hasher.
///
/// The domain tag is prepended to every hash so that a blob and a directory
/// node with identical bytes never share a key.
#[derive(Clone, Copy, Debug)]
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    pub const BLOB: Self = Self::new("cafs-blob-v1");
    pub const NODE: Self = Self::new("cafs-node-v1");

    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// The hasher a store uses for objects of `kind`.
    pub fn for_kind(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Blob => Self::BLOB,
            ObjectKind::Node => Self::NODE,
        }
    }

    pub fn hash(&self, data: &[u8]) -> Key {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        Key::from_digest(*hasher.finalize().as_bytes())
    }

    pub fn verify(&self, data: &[u8], expected: &Key) -> bool {
        self.hash(data) == *expected
    }

    pub fn domain(&self) -> &str {
        self.domain
    }
}
