use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use cafs_types::Key;

use crate::error::{FsError, FsResult};

/// Virtual path → content-address key, filled as a tree is written.
///
/// Append-only: recording the same path twice is an error, so a key handed
/// to a hook can never change underneath it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathMap {
    entries: BTreeMap<String, Key>,
}

impl PathMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, path: impl Into<String>, key: Key) -> FsResult<()> {
        let path = path.into();
        if self.entries.contains_key(&path) {
            return Err(FsError::PathAlreadyRecorded(path));
        }
        self.entries.insert(path, key);
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&Key> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Key)> {
        self.entries.iter().map(|(path, key)| (path.as_str(), key))
    }

    /// A copy holding only the entries for `paths` that are already recorded.
    pub fn restricted_to<'a>(&self, paths: impl IntoIterator<Item = &'a String>) -> Self {
        let entries = paths
            .into_iter()
            .filter_map(|path| self.entries.get(path).map(|key| (path.clone(), *key)))
            .collect();
        Self { entries }
    }

    pub fn into_inner(self) -> BTreeMap<String, Key> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a PathMap {
    type Item = (&'a String, &'a Key);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Key>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
