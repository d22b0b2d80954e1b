//! Classification of user-supplied path strings.
//!
//! A path handed to CAFS tooling may name a local file, a remote URL, or an
//! object inside a content-addressed store (`/ipfs/<key>`, `/map/<key>`,
//! `/mem/<key>`). These helpers decide which, and normalize local paths.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathKind {
    /// The empty string.
    None,
    /// An `http://` or `https://` URL.
    Http,
    Ipfs,
    Map,
    Mem,
    /// Anything else: absolute or relative filesystem paths.
    Local,
}

impl PathKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Http => "http",
            Self::Ipfs => "ipfs",
            Self::Map => "map",
            Self::Mem => "mem",
            Self::Local => "local",
        }
    }

    /// True for store-backed schemes that must never be resolved against the
    /// local filesystem.
    pub fn is_virtual(&self) -> bool {
        matches!(self, Self::Ipfs | Self::Map | Self::Mem)
    }
}

impl fmt::Display for PathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify `path`.
pub fn path_kind(path: &str) -> PathKind {
    if path.is_empty() {
        return PathKind::None;
    }
    if path.starts_with("http://") || path.starts_with("https://") {
        return PathKind::Http;
    }

    let first_segment = path
        .strip_prefix('/')
        .and_then(|rest| rest.split('/').next());
    match first_segment {
        Some("ipfs") => PathKind::Ipfs,
        Some("map") => PathKind::Map,
        Some("mem") => PathKind::Mem,
        _ => PathKind::Local,
    }
}

/// Resolve `path` to an absolute form.
///
/// Empty strings, URLs and store-backed paths come back untouched. Local
/// paths are joined onto the current directory when relative and lexically
/// cleaned (`.` and `..` removed).
pub fn abs_path(path: &str) -> Result<String, TypeError> {
    let kind = path_kind(path);
    if kind != PathKind::Local {
        return Ok(path.to_string());
    }

    let candidate = Path::new(path);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        std::env::current_dir()?.join(candidate)
    };
    Ok(clean(&joined).to_string_lossy().into_owned())
}

fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
