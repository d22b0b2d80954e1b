//! Foundation types for the content-addressed file system (CAFS).
//!
//! Every other CAFS crate depends on `cafs-types`.
//!
//! # Key Types
//!
//! - [`Key`] -- Content-address key (BLAKE3 digest) assigned by a block store
//! - [`Context`] -- Cancellation and deadline signal threaded through writes
//! - [`PathKind`] -- Classification of user-supplied path strings

pub mod context;
pub mod error;
pub mod key;
pub mod path;

pub use context::{Context, ContextError};
pub use error::TypeError;
pub use key::Key;
pub use path::{abs_path, path_kind, PathKind};
