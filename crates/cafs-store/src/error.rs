use cafs_types::Key;

/// Errors from block store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(Key),

    /// Unpin (or a delete implemented as unpin) on a key with no pin.
    #[error("not pinned: {0}")]
    NotPinned(Key),

    /// A path lookup named a link the directory node does not have.
    #[error("node {node} has no link named {name:?}")]
    NoSuchLink { node: Key, name: String },

    /// The object data is malformed or does not hash to its key.
    #[error("corrupt object {key}: {reason}")]
    CorruptObject { key: Key, reason: String },

    /// A link set named the same child twice.
    #[error("duplicate link name: {0}")]
    DuplicateLink(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// True for outcomes that mean "already gone": a missing object or a
    /// missing pin. Rollback treats these as success.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::NotPinned(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
