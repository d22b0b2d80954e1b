//! File and directory nodes.

use crate::content::ContentSource;
use crate::error::{FsError, FsResult};
use crate::hook::Hook;

/// Join a child name onto a parent path.
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Final segment of a slash-separated path (`"/a/b.txt"` → `"b.txt"`).
pub fn base_name(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}

/// A node in a virtual file tree.
#[derive(Debug)]
pub enum FileNode {
    File(RegularFile),
    Directory(Directory),
}

impl FileNode {
    pub fn path(&self) -> &str {
        match self {
            Self::File(f) => &f.path,
            Self::Directory(d) => &d.path,
        }
    }

    pub fn name(&self) -> &str {
        base_name(self.path())
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    /// Ordered children; empty for regular files.
    pub fn children(&self) -> &[FileNode] {
        match self {
            Self::File(_) => &[],
            Self::Directory(d) => &d.children,
        }
    }

    pub fn hook(&self) -> Option<&Hook> {
        match self {
            Self::File(f) => f.hook.as_ref(),
            Self::Directory(_) => None,
        }
    }

    pub fn as_file(&self) -> FsResult<&RegularFile> {
        match self {
            Self::File(f) => Ok(f),
            Self::Directory(d) => Err(FsError::NotFile(d.path.clone())),
        }
    }

    /// Pre-order traversal. `visit` receives each node and its depth below
    /// `self`; returning an error stops the walk.
    pub fn walk<E>(&self, visit: &mut impl FnMut(&FileNode, usize) -> Result<(), E>) -> Result<(), E> {
        self.walk_at(0, visit)
    }

    fn walk_at<E>(
        &self,
        depth: usize,
        visit: &mut impl FnMut(&FileNode, usize) -> Result<(), E>,
    ) -> Result<(), E> {
        visit(self, depth)?;
        for child in self.children() {
            child.walk_at(depth + 1, visit)?;
        }
        Ok(())
    }

    /// Pre-order iterator over this node and every descendant.
    pub fn iter(&self) -> Preorder<'_> {
        Preorder { stack: vec![self] }
    }

    /// Find a node by exact path.
    pub fn find(&self, path: &str) -> Option<&FileNode> {
        self.iter().find(|node| node.path() == path)
    }

    fn set_path(&mut self, path: String) {
        match self {
            Self::File(f) => f.path = path,
            Self::Directory(d) => d.set_path(path),
        }
    }
}

impl From<RegularFile> for FileNode {
    fn from(file: RegularFile) -> Self {
        Self::File(file)
    }
}

impl From<Directory> for FileNode {
    fn from(dir: Directory) -> Self {
        Self::Directory(dir)
    }
}

pub struct Preorder<'a> {
    stack: Vec<&'a FileNode>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a FileNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

// ---------------------------------------------------------------------------
// RegularFile
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct RegularFile {
    path: String,
    content: ContentSource,
    hook: Option<Hook>,
}

impl RegularFile {
    pub fn new(path: impl Into<String>, content: ContentSource) -> Self {
        Self {
            path: path.into(),
            content,
            hook: None,
        }
    }

    pub fn from_bytes(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::new(path, ContentSource::from_bytes(data))
    }

    /// Attach a hook, turning this into a hook file.
    pub fn with_hook(mut self, hook: Hook) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn hook(&self) -> Option<&Hook> {
        self.hook.as_ref()
    }

    pub fn content(&self) -> &ContentSource {
        &self.content
    }

    /// Consume the content source.
    pub async fn read_all(&self) -> FsResult<Vec<u8>> {
        self.content.read_all(&self.path).await
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Directory {
    path: String,
    children: Vec<FileNode>,
}

impl Directory {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(
        path: impl Into<String>,
        children: impl IntoIterator<Item = FileNode>,
    ) -> Self {
        let mut dir = Self::new(path);
        for child in children {
            dir.add_child(child);
        }
        dir
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn children(&self) -> &[FileNode] {
        &self.children
    }

    /// Attach `child`, fixing its path (and its descendants' paths) under
    /// this directory. Duplicate names are left for the planner to reject.
    pub fn add_child(&mut self, child: impl Into<FileNode>) {
        let mut child = child.into();
        let path = join_path(&self.path, child.name());
        child.set_path(path);
        self.children.push(child);
    }

    pub fn child_dir(&self, name: &str) -> Option<&Directory> {
        self.children.iter().find_map(|child| match child {
            FileNode::Directory(d) if child.name() == name => Some(d),
            _ => None,
        })
    }

    /// Ensure every directory along `relative` exists below this one,
    /// creating missing ones, and return the deepest.
    pub fn make_dir_p(&mut self, relative: &str) -> FsResult<&mut Directory> {
        let mut dir = self;
        for segment in relative.split('/').filter(|s| !s.is_empty() && *s != ".") {
            if segment == ".." {
                return Err(FsError::InvalidPath(relative.to_string()));
            }
            let idx = match dir.children.iter().position(|c| c.name() == segment) {
                Some(idx) => idx,
                None => {
                    let created = Directory::new(join_path(&dir.path, segment));
                    dir.children.push(created.into());
                    dir.children.len() - 1
                }
            };
            dir = match &mut dir.children[idx] {
                FileNode::Directory(child) => child,
                FileNode::File(file) => return Err(FsError::NotDirectory(file.path.clone())),
            };
        }
        Ok(dir)
    }

    /// Attach `child` beneath the directory at `relative`, creating
    /// intermediate directories as needed.
    pub fn insert(&mut self, relative: &str, child: impl Into<FileNode>) -> FsResult<()> {
        self.make_dir_p(relative)?.add_child(child);
        Ok(())
    }

    fn set_path(&mut self, path: String) {
        self.path = path;
        for child in &mut self.children {
            let child_path = join_path(&self.path, child.name());
            child.set_path(child_path);
        }
    }
}
