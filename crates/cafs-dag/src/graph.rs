//! Dependency graph construction and topological ordering.
//!
//! # Invariants
//!
//! - Every path in the tree is unique.
//! - Every hook dependency resolves to a node in the same tree.
//! - In a [`WriteOrder`], a directory follows all of its children and a hook
//!   file follows all of its declared dependencies.
//! - Nodes with no ordering constraint between them keep their pre-order
//!   (tree traversal) order, so planning the same tree twice gives the same
//!   order.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use tracing::debug;

use cafs_fs::{join_path, FileNode};

use crate::error::{DagError, DagResult};

/// Why one node must be written before another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// The prerequisite is a child of the dependent directory.
    Child,
    /// The prerequisite is a declared hook dependency.
    Hook,
}

/// Nodes of one tree plus the prerequisite edges between them.
#[derive(Debug)]
pub struct DependencyGraph<'a> {
    /// Every node, in pre-order.
    nodes: Vec<&'a FileNode>,
    index: HashMap<&'a str, usize>,
    /// `prerequisites[i]` must all be written before `nodes[i]`.
    prerequisites: Vec<Vec<(usize, EdgeKind)>>,
}

impl<'a> DependencyGraph<'a> {
    /// Enumerate `root` and resolve every edge.
    ///
    /// Fails on duplicate paths and on hook dependencies that name a path
    /// outside the tree.
    pub fn build(root: &'a FileNode) -> DagResult<Self> {
        let nodes: Vec<&FileNode> = root.iter().collect();

        let mut index = HashMap::with_capacity(nodes.len());
        for (i, &node) in nodes.iter().enumerate() {
            if index.insert(node.path(), i).is_some() {
                return Err(DagError::DuplicatePath(node.path().to_string()));
            }
        }

        let mut prerequisites = Vec::with_capacity(nodes.len());
        let mut edge_count = 0;
        for &node in &nodes {
            for child in node.children() {
                check_child(node, child)?;
            }
            let mut edges: Vec<(usize, EdgeKind)> = node
                .children()
                .iter()
                .map(|child| (index[child.path()], EdgeKind::Child))
                .collect();

            if let Some(hook) = node.hook() {
                for dependency in hook.dependencies() {
                    let target = index.get(dependency.as_str()).copied().ok_or_else(|| {
                        DagError::UnresolvedDependency {
                            path: node.path().to_string(),
                            dependency: dependency.clone(),
                        }
                    })?;
                    edges.push((target, EdgeKind::Hook));
                }
            }

            edge_count += edges.len();
            prerequisites.push(edges);
        }

        debug!(
            root = root.path(),
            nodes = nodes.len(),
            edges = edge_count,
            "built dependency graph"
        );
        Ok(Self {
            nodes,
            index,
            prerequisites,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Paths that must be written before `path`, with the reason for each.
    pub fn prerequisites_of(&self, path: &str) -> Option<Vec<(&'a str, EdgeKind)>> {
        let &i = self.index.get(path)?;
        Some(
            self.prerequisites[i]
                .iter()
                .map(|&(j, kind)| (self.nodes[j].path(), kind))
                .collect(),
        )
    }

    /// Topologically order the graph.
    ///
    /// Kahn's algorithm with a min-heap on pre-order index: among nodes
    /// whose prerequisites are all written, the one that appears first in
    /// the tree goes next.
    pub fn write_order(&self) -> DagResult<WriteOrder<'a>> {
        let n = self.nodes.len();
        let mut pending: Vec<usize> = self.prerequisites.iter().map(Vec::len).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, edges) in self.prerequisites.iter().enumerate() {
            for &(j, _) in edges {
                dependents[j].push(i);
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = pending
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(n);
        while let Some(Reverse(i)) = ready.pop() {
            order.push(self.nodes[i]);
            for &dependent in &dependents[i] {
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    ready.push(Reverse(dependent));
                }
            }
        }

        if order.len() < n {
            let cycle = self.find_cycle(&pending);
            debug!(cycle = ?cycle, "dependency cycle detected");
            return Err(DagError::DependencyCycle { cycle });
        }
        Ok(WriteOrder { nodes: order })
    }

    /// Extract one cycle from the nodes Kahn's algorithm could not emit.
    ///
    /// Every unemitted node still waits on at least one unemitted
    /// prerequisite, so following those edges must revisit a node.
    fn find_cycle(&self, pending: &[usize]) -> Vec<String> {
        let Some(start) = pending.iter().position(|&count| count > 0) else {
            return Vec::new();
        };

        let mut trail: Vec<usize> = Vec::new();
        let mut seen_at: HashMap<usize, usize> = HashMap::new();
        let mut current = start;
        loop {
            if let Some(&pos) = seen_at.get(&current) {
                let mut cycle: Vec<String> = trail[pos..]
                    .iter()
                    .map(|&i| self.nodes[i].path().to_string())
                    .collect();
                cycle.push(self.nodes[current].path().to_string());
                return cycle;
            }
            seen_at.insert(current, trail.len());
            trail.push(current);

            match self.prerequisites[current]
                .iter()
                .find(|&&(j, _)| pending[j] > 0)
            {
                Some(&(next, _)) => current = next,
                None => return vec![self.nodes[current].path().to_string()],
            }
        }
    }
}

/// Nodes in an order that satisfies every prerequisite edge. The tree's
/// root is always last.
#[derive(Debug, Clone)]
pub struct WriteOrder<'a> {
    nodes: Vec<&'a FileNode>,
}

impl<'a> WriteOrder<'a> {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a FileNode> + '_ {
        self.nodes.iter().copied()
    }

    pub fn paths(&self) -> Vec<&'a str> {
        self.nodes.iter().map(|node| node.path()).collect()
    }

    /// Position of `path` in the order.
    pub fn position(&self, path: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.path() == path)
    }
}

impl<'a> IntoIterator for WriteOrder<'a> {
    type Item = &'a FileNode;
    type IntoIter = std::vec::IntoIter<&'a FileNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

/// Build the graph for `root` and order it.
pub fn plan(root: &FileNode) -> DagResult<WriteOrder<'_>> {
    DependencyGraph::build(root)?.write_order()
}

/// A child must sit exactly one well-formed segment below its parent.
fn check_child(parent: &FileNode, child: &FileNode) -> DagResult<()> {
    let name = child.name();
    let well_formed = !name.is_empty()
        && name != "."
        && name != ".."
        && child.path() == join_path(parent.path(), name);
    if well_formed {
        Ok(())
    } else {
        Err(DagError::InvalidPath(child.path().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cafs_fs::{transform_fn, Directory, Hook, RegularFile};
    use proptest::prelude::*;

    fn plain(name: &str) -> FileNode {
        RegularFile::from_bytes(name, name).into()
    }

    fn hooked(name: &str, deps: &[&str]) -> FileNode {
        RegularFile::from_bytes(name, name)
            .with_hook(Hook::new(
                transform_fn(|content, _| Ok(content)),
                deps.iter().copied(),
            ))
            .into()
    }

    fn dir(path: &str, children: Vec<FileNode>) -> FileNode {
        Directory::with_children(path, children).into()
    }

    /// The tree from the hook scenario: b needs d, c needs b.
    fn scenario_tree() -> FileNode {
        dir(
            "/a",
            vec![
                hooked("b.txt", &["/a/d.txt"]),
                hooked("c.txt", &["/a/b.txt"]),
                plain("d.txt"),
            ],
        )
    }

    #[test]
    fn hook_chain_orders_dependencies_first() {
        let tree = scenario_tree();
        let order = plan(&tree).unwrap();
        assert_eq!(order.paths(), ["/a/d.txt", "/a/b.txt", "/a/c.txt", "/a"]);
    }

    #[test]
    fn unconstrained_nodes_keep_traversal_order() {
        let tree = dir(
            "/r",
            vec![
                dir("x", vec![plain("1"), plain("2")]),
                plain("y"),
                dir("z", vec![]),
            ],
        );
        let order = plan(&tree).unwrap();
        assert_eq!(
            order.paths(),
            ["/r/x/1", "/r/x/2", "/r/x", "/r/y", "/r/z", "/r"]
        );
    }

    #[test]
    fn planning_is_deterministic() {
        let first: Vec<String> = plan(&scenario_tree())
            .unwrap()
            .paths()
            .into_iter()
            .map(String::from)
            .collect();
        for _ in 0..5 {
            let tree = scenario_tree();
            let again = plan(&tree).unwrap();
            assert_eq!(again.paths(), first);
        }
    }

    #[test]
    fn dependencies_may_cross_subtrees() {
        let tree = dir(
            "/root",
            vec![
                dir("left", vec![hooked("uses.txt", &["/root/right/deep/src.txt"])]),
                dir("right", vec![dir("deep", vec![plain("src.txt")])]),
            ],
        );
        let order = plan(&tree).unwrap();
        let pos = |p: &str| order.position(p).unwrap();
        assert!(pos("/root/right/deep/src.txt") < pos("/root/left/uses.txt"));
        assert!(pos("/root/left/uses.txt") < pos("/root/left"));
        assert_eq!(order.paths().last(), Some(&"/root"));
    }

    #[test]
    fn hook_may_depend_on_a_directory() {
        let tree = dir(
            "/r",
            vec![
                hooked("manifest", &["/r/data"]),
                dir("data", vec![plain("one")]),
            ],
        );
        let order = plan(&tree).unwrap();
        assert_eq!(order.paths(), ["/r/data/one", "/r/data", "/r/manifest", "/r"]);
    }

    #[test]
    fn unresolved_dependency_is_rejected() {
        let tree = dir("/a", vec![hooked("b.txt", &["/a/missing.txt"])]);
        let err = DependencyGraph::build(&tree).unwrap_err();
        assert_eq!(
            err,
            DagError::UnresolvedDependency {
                path: "/a/b.txt".into(),
                dependency: "/a/missing.txt".into(),
            }
        );
    }

    #[test]
    fn duplicate_paths_are_rejected() {
        let tree = dir("/a", vec![plain("same"), plain("same")]);
        assert_eq!(
            DependencyGraph::build(&tree).unwrap_err(),
            DagError::DuplicatePath("/a/same".into())
        );
    }

    #[test]
    fn empty_child_name_is_rejected() {
        let tree = dir("/a", vec![plain("b"), plain("")]);
        assert_eq!(
            DependencyGraph::build(&tree).unwrap_err(),
            DagError::InvalidPath("/a/".into())
        );
    }

    #[test]
    fn dot_segments_are_rejected() {
        for name in [".", ".."] {
            let tree = dir("/a", vec![dir("sub", vec![plain(name)])]);
            assert_eq!(
                plan(&tree).unwrap_err(),
                DagError::InvalidPath(format!("/a/sub/{name}"))
            );
        }
    }

    #[test]
    fn mutual_hooks_form_a_cycle() {
        let tree = dir(
            "/a",
            vec![hooked("x", &["/a/y"]), hooked("y", &["/a/x"])],
        );
        match plan(&tree).unwrap_err() {
            DagError::DependencyCycle { cycle } => {
                assert_eq!(cycle.first(), cycle.last());
                assert!(cycle.contains(&"/a/x".to_string()));
                assert!(cycle.contains(&"/a/y".to_string()));
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let tree = dir("/a", vec![hooked("me", &["/a/me"])]);
        assert_eq!(
            plan(&tree).unwrap_err(),
            DagError::DependencyCycle {
                cycle: vec!["/a/me".into(), "/a/me".into()],
            }
        );
    }

    #[test]
    fn depending_on_an_ancestor_is_a_cycle() {
        let tree = dir("/a", vec![dir("sub", vec![hooked("f", &["/a"])])]);
        match plan(&tree).unwrap_err() {
            DagError::DependencyCycle { cycle } => {
                for path in ["/a", "/a/sub", "/a/sub/f"] {
                    assert!(cycle.contains(&path.to_string()), "{path} missing from {cycle:?}");
                }
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn cycle_error_lists_path() {
        let err = DagError::DependencyCycle {
            cycle: vec!["/a".into(), "/b".into(), "/a".into()],
        };
        assert_eq!(err.to_string(), "dependency cycle: /a -> /b -> /a");
    }

    #[test]
    fn prerequisites_report_edge_kinds() {
        let tree = scenario_tree();
        let graph = DependencyGraph::build(&tree).unwrap();
        assert_eq!(graph.len(), 4);
        assert_eq!(
            graph.prerequisites_of("/a/c.txt").unwrap(),
            [("/a/b.txt", EdgeKind::Hook)]
        );
        assert_eq!(graph.prerequisites_of("/a").unwrap().len(), 3);
        assert!(graph.prerequisites_of("/nowhere").is_none());
    }

    #[test]
    fn single_file_tree() {
        let tree = plain("/only.txt");
        assert_eq!(plan(&tree).unwrap().paths(), ["/only.txt"]);
    }

    fn acyclic_specs() -> impl Strategy<Value = Vec<Vec<prop::sample::Index>>> {
        prop::collection::vec(prop::collection::vec(any::<prop::sample::Index>(), 0..4), 1..16)
    }

    proptest! {
        #[test]
        fn acyclic_hooks_always_order(specs in acyclic_specs()) {
            // File i lives in /r/d{i % 3} and may only depend on files before it.
            let path_of = |i: usize| format!("/r/d{}/f{i}", i % 3);
            let mut root = Directory::new("/r");
            for (i, picks) in specs.iter().enumerate() {
                let deps: Vec<String> = if i == 0 {
                    Vec::new()
                } else {
                    picks.iter().map(|pick| path_of(pick.index(i))).collect()
                };
                let file = RegularFile::from_bytes(format!("f{i}"), vec![i as u8])
                    .with_hook(Hook::new(transform_fn(|c, _| Ok(c)), deps));
                root.insert(&format!("d{}", i % 3), file).unwrap();
            }
            let tree: FileNode = root.into();

            let graph = DependencyGraph::build(&tree).unwrap();
            let order = graph.write_order().unwrap();
            prop_assert_eq!(order.len(), graph.len());
            prop_assert_eq!(order.paths().last().copied(), Some("/r"));

            for node in tree.iter() {
                let at = order.position(node.path()).unwrap();
                for (prereq, _) in graph.prerequisites_of(node.path()).unwrap() {
                    prop_assert!(order.position(prereq).unwrap() < at);
                }
            }
        }
    }
}
