//! Virtual file trees for the content-addressed file system.
//!
//! A tree is built from [`FileNode`] values: [`RegularFile`]s carrying a
//! single-use [`ContentSource`], and [`Directory`]s holding ordered children.
//! A regular file may carry a [`Hook`]: a content [`Transform`] plus the set
//! of paths elsewhere in the tree whose keys it needs before it can run.
//!
//! Paths are slash-separated and rooted. Attaching a child to a directory
//! fixes the child's path as `parent.path + "/" + child.name`; nothing
//! re-derives paths after the tree is handed to a writer.

pub mod content;
pub mod error;
pub mod hook;
pub mod local;
pub mod node;
pub mod path_map;

pub use content::ContentSource;
pub use error::{FsError, FsResult};
pub use hook::{transform_fn, FnTransform, Hook, Transform, TransformError};
pub use local::load_local;
pub use node::{base_name, join_path, Directory, FileNode, RegularFile};
pub use path_map::PathMap;
