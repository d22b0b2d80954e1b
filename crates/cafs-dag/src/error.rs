//! Error types for write-order planning.

/// Errors that make a tree unwritable. All are detected before any store
/// mutation happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DagError {
    /// Two nodes in the tree share a path.
    #[error("duplicate path in tree: {0}")]
    DuplicatePath(String),

    /// A child's name cannot form a path segment under its parent: it is
    /// empty, `.` or `..`, or contains a `/`.
    #[error("invalid path in tree: {0}")]
    InvalidPath(String),

    /// A hook names a dependency path that is not in the tree.
    #[error("unresolved dependency: {path} depends on missing path {dependency}")]
    UnresolvedDependency {
        /// The hook file declaring the dependency.
        path: String,
        /// The path that did not resolve.
        dependency: String,
    },

    /// The combined directory and hook edges form a cycle.
    #[error("dependency cycle: {}", .cycle.join(" -> "))]
    DependencyCycle {
        /// Paths along the cycle; the first path is repeated at the end.
        cycle: Vec<String>,
    },
}

/// Convenience alias for planning results.
pub type DagResult<T> = Result<T, DagError>;
