use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{FsError, FsResult};

enum Source {
    Bytes(Vec<u8>),
    Reader(Box<dyn AsyncRead + Send + Unpin>),
    /// Opened only when read, so building a large tree holds no handles.
    Local(PathBuf),
}

/// Single-use byte source for a regular file.
///
/// The first [`read_all`](Self::read_all) consumes the source; any later read
/// fails with [`FsError::ContentConsumed`]. Content is never rewound.
pub struct ContentSource {
    inner: Mutex<Option<Source>>,
}

impl ContentSource {
    fn wrap(source: Source) -> Self {
        Self {
            inner: Mutex::new(Some(source)),
        }
    }

    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::wrap(Source::Bytes(data.into()))
    }

    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self::wrap(Source::Reader(Box::new(reader)))
    }

    pub fn from_local(path: impl Into<PathBuf>) -> Self {
        Self::wrap(Source::Local(path.into()))
    }

    pub fn is_consumed(&self) -> bool {
        self.inner.lock().expect("lock poisoned").is_none()
    }

    /// Read the entire source. `owner` is the virtual path used in errors.
    pub async fn read_all(&self, owner: &str) -> FsResult<Vec<u8>> {
        let source = self
            .inner
            .lock()
            .expect("lock poisoned")
            .take()
            .ok_or_else(|| FsError::ContentConsumed(owner.to_string()))?;

        let io_err = |source| FsError::Io {
            path: owner.to_string(),
            source,
        };
        match source {
            Source::Bytes(data) => Ok(data),
            Source::Reader(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf).await.map_err(io_err)?;
                Ok(buf)
            }
            Source::Local(path) => tokio::fs::read(&path).await.map_err(io_err),
        }
    }
}

impl fmt::Debug for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.inner.lock().expect("lock poisoned") {
            None => "consumed",
            Some(Source::Bytes(_)) => "bytes",
            Some(Source::Reader(_)) => "reader",
            Some(Source::Local(_)) => "local",
        };
        f.debug_tuple("ContentSource").field(&state).finish()
    }
}
