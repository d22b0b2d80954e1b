use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    /// A file's content source was read a second time.
    #[error("content of {0} was already consumed")]
    ContentConsumed(String),

    /// A file-only operation was attempted on a directory.
    #[error("{0} is a directory")]
    NotFile(String),

    /// A directory operation was attempted on a regular file.
    #[error("{0} is not a directory")]
    NotDirectory(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A path was recorded twice in one path map.
    #[error("path already recorded: {0}")]
    PathAlreadyRecorded(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type FsResult<T> = Result<T, FsError>;
