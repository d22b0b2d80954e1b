//! Write-order planning for CAFS trees.
//!
//! A tree is written bottom-up: a directory's key depends on its children's
//! keys. Hook files add edges that cut across the tree, since a hook's
//! transform needs the keys of arbitrary other paths. [`DependencyGraph`]
//! merges both kinds of edge and produces a [`WriteOrder`] in which every
//! node follows everything it depends on.

pub mod error;
pub mod graph;

pub use error::{DagError, DagResult};
pub use graph::{plan, DependencyGraph, EdgeKind, WriteOrder};
