use thiserror::Error;

use cafs_dag::DagError;
use cafs_fs::{FsError, TransformError};
use cafs_store::StoreError;
use cafs_types::ContextError;

use crate::phase::WritePhase;

#[derive(Debug, Error)]
pub enum WriteError {
    /// The tree cannot be ordered. Nothing was written.
    #[error(transparent)]
    Configuration(#[from] DagError),

    #[error("failed to read content of {path}: {source}")]
    ContentRead {
        path: String,
        #[source]
        source: FsError,
    },

    /// A hook's transform failed. Displays the transform's own message.
    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("failed to store {path}: {source}")]
    StoreWrite {
        path: String,
        #[source]
        source: StoreError,
    },

    /// The write was cancelled or ran past its deadline.
    #[error("write aborted: {0}")]
    Context(#[from] ContextError),

    #[error(transparent)]
    Tree(#[from] FsError),

    /// A directory came up before one of its children had a key.
    #[error("{0} has not been written yet")]
    OutOfOrder(String),
}

impl WriteError {
    /// True when the tree was rejected during planning.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Phase the write was in when this error stopped it.
    pub fn phase(&self) -> WritePhase {
        if self.is_configuration() {
            WritePhase::Planning
        } else {
            WritePhase::Writing
        }
    }
}

pub type WriteResult<T> = Result<T, WriteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_message_passes_through() {
        let err = WriteError::from(TransformError::new("oh noes it broke"));
        assert_eq!(err.to_string(), "oh noes it broke");
        assert_eq!(err.phase(), WritePhase::Writing);
        assert!(!err.is_configuration());
    }

    #[test]
    fn planning_errors_are_configuration() {
        let err = WriteError::from(DagError::DuplicatePath("/a/b".into()));
        assert!(err.is_configuration());
        assert_eq!(err.phase(), WritePhase::Planning);
        assert_eq!(err.to_string(), DagError::DuplicatePath("/a/b".into()).to_string());
    }
}
