//! Build a virtual tree from a directory on the local filesystem.

use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::content::ContentSource;
use crate::error::{FsError, FsResult};
use crate::node::{Directory, FileNode, RegularFile};

/// Load `root` into a tree rooted at `/<root's name>`.
///
/// Entries are visited in file-name order so repeated loads produce the
/// same tree. File contents are opened lazily, at write time. Symlinks and
/// other special files are skipped.
pub fn load_local(root: impl AsRef<Path>) -> FsResult<FileNode> {
    let root = root.as_ref();
    let io_err = |source: std::io::Error| FsError::Io {
        path: root.display().to_string(),
        source,
    };

    let canonical = std::fs::canonicalize(root).map_err(io_err)?;
    let name = canonical
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let virtual_root = format!("/{name}");

    if !canonical.is_dir() {
        return Ok(RegularFile::new(virtual_root, ContentSource::from_local(canonical)).into());
    }

    let mut tree = Directory::new(virtual_root);
    for entry in WalkDir::new(&canonical).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| io_err(e.into()))?;
        let relative = entry
            .path()
            .strip_prefix(&canonical)
            .map_err(|_| FsError::InvalidPath(entry.path().display().to_string()))?;
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let file_type = entry.file_type();
        if file_type.is_dir() {
            tree.make_dir_p(&relative)?;
        } else if file_type.is_file() {
            let (parent, file_name) = relative.rsplit_once('/').unwrap_or(("", relative.as_str()));
            let file = RegularFile::new(file_name, ContentSource::from_local(entry.path()));
            tree.insert(parent, file)?;
        } else {
            debug!(path = %entry.path().display(), "skipping non-regular file");
        }
    }
    Ok(tree.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_nested_directories_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("data");
        std::fs::create_dir_all(root.join("sub/deeper")).unwrap();
        std::fs::write(root.join("b.txt"), "bee").unwrap();
        std::fs::write(root.join("a.txt"), "ay").unwrap();
        std::fs::write(root.join("sub/deeper/c.txt"), "sea").unwrap();
        std::fs::create_dir(root.join("empty")).unwrap();

        let tree = load_local(&root).unwrap();
        let paths: Vec<_> = tree.iter().map(FileNode::path).collect();
        assert_eq!(
            paths,
            [
                "/data",
                "/data/a.txt",
                "/data/b.txt",
                "/data/empty",
                "/data/sub",
                "/data/sub/deeper",
                "/data/sub/deeper/c.txt",
            ]
        );

        let c = tree.find("/data/sub/deeper/c.txt").unwrap().as_file().unwrap();
        assert_eq!(c.read_all().await.unwrap(), b"sea");
    }

    #[tokio::test]
    async fn single_file_becomes_root_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solo.txt");
        std::fs::write(&path, "alone").unwrap();

        let tree = load_local(&path).unwrap();
        assert_eq!(tree.path(), "/solo.txt");
        assert!(!tree.is_directory());
        assert_eq!(tree.as_file().unwrap().read_all().await.unwrap(), b"alone");
    }

    #[test]
    fn missing_root_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_local(dir.path().join("nope")),
            Err(FsError::Io { .. })
        ));
    }
}
