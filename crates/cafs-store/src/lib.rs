//! Content-addressed block storage for CAFS.
//!
//! The store, not the caller, decides every object's [`Key`]: blobs are
//! hashed from their bytes and directory nodes from their encoded link set,
//! each under its own hashing domain.
//!
//! # Object Types
//!
//! - Blob -- raw file content
//! - Node -- a merkle directory node: sorted [`Links`] to child keys
//!
//! # Storage Backends
//!
//! All backends implement the [`BlockStore`] trait:
//!
//! - [`MemoryBlockStore`] -- `HashMap`-based store for tests and embedding
//! - [`DiskBlockStore`] -- one file per object under a root directory
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written; identical content yields one object.
//! 2. `put` reports whether it created the object, so callers undoing their
//!    own writes never remove objects that predate them.
//! 3. Deleting or unpinning something that is not there is reported as
//!    [`StoreError::NotFound`] / [`StoreError::NotPinned`], which callers may
//!    treat as success (see [`StoreError::is_absent`]).

pub mod disk;
pub mod error;
pub mod hasher;
pub mod memory;
pub mod object;
pub mod traits;

pub use cafs_types::Key;
pub use disk::DiskBlockStore;
pub use error::{StoreError, StoreResult};
pub use hasher::ContentHasher;
pub use memory::MemoryBlockStore;
pub use object::{Link, LinkKind, Links, ObjectKind, StoredObject};
pub use traits::{BlockStore, PutResult};
