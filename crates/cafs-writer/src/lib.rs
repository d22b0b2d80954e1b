//! Writes a virtual file tree into a content-addressed block store.
//!
//! A write runs in two phases. Planning enumerates the tree and orders it
//! so every directory follows its children and every hook file follows the
//! paths it depends on; any configuration problem (duplicate path, unknown
//! dependency, cycle) is reported before a single object is stored.
//! Writing then stores each node in order, feeding hooks the keys they
//! asked for, and records every object it creates in a [`Ledger`]. If
//! anything goes wrong mid-write, the ledger is replayed in reverse to
//! delete those objects, leaving the store as it was.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cafs_fs::{Directory, FileNode, RegularFile};
//! use cafs_store::MemoryBlockStore;
//! use cafs_types::Context;
//! use cafs_writer::TreeWriter;
//!
//! # async fn run() -> Result<(), cafs_writer::WriteError> {
//! let index = FileNode::from(RegularFile::from_bytes("index.html", "hi"));
//! let tree = FileNode::from(Directory::with_children("/site", [index]));
//! let writer = TreeWriter::new(Arc::new(MemoryBlockStore::new()));
//! let outcome = writer.write_tree(&Context::background(), &tree).await?;
//! println!("{}", outcome.root_key);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod ledger;
pub mod phase;
pub mod writer;

pub use config::{HookVisibility, WriterConfig};
pub use error::{WriteError, WriteResult};
pub use ledger::{Ledger, RollbackReport};
pub use phase::WritePhase;
pub use writer::{write_tree, TreeWriter, WriteOutcome};
