//! In-memory mirror of resolved directory handles.
//!
//! The tree is rebuilt from scratch on every access grant and grows lazily as
//! paths are resolved. Nodes are only pruned by explicit directory removal.
//! Children are kept in a plain vector and looked up by exact name; their
//! order carries no meaning.

use tracing::trace;

use crate::handle::DirRef;
use crate::path::FsPath;

/// One cached directory.
#[derive(Debug)]
pub struct TreeNode {
    name: String,
    handle: DirRef,
    children: Vec<TreeNode>,
    cached_count: usize,
}

impl TreeNode {
    fn new(name: impl Into<String>, handle: DirRef) -> Self {
        Self {
            name: name.into(),
            handle,
            children: Vec::new(),
            cached_count: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> &DirRef {
        &self.handle
    }

    pub fn children(&self) -> &[TreeNode] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Children added minus directories removed, as counted on mutation.
    pub fn cached_count(&self) -> usize {
        self.cached_count
    }

    /// Exact-name lookup among direct children.
    pub fn find_child(&self, name: &str) -> Option<&TreeNode> {
        self.children.iter().find(|child| child.name == name)
    }

    fn find_child_mut(&mut self, name: &str) -> Option<&mut TreeNode> {
        self.children.iter_mut().find(|child| child.name == name)
    }

    /// Insert a child unless one with that name exists. Returns whether it was
    /// inserted.
    fn add_child(&mut self, name: &str, handle: DirRef) -> bool {
        if self.find_child(name).is_some() {
            return false;
        }
        self.children.push(TreeNode::new(name, handle));
        self.cached_count += 1;
        true
    }

    fn remove_child(&mut self, name: &str) -> Option<TreeNode> {
        let index = self.children.iter().position(|child| child.name == name)?;
        self.cached_count = self.cached_count.saturating_sub(1);
        Some(self.children.remove(index))
    }
}

/// Tree of cached directory handles rooted at the granted access point.
#[derive(Debug)]
pub struct HandleTree {
    root: TreeNode,
    cached_entries: usize,
}

impl HandleTree {
    /// Fresh tree whose root holds the granted handle.
    pub fn new(root: DirRef) -> Self {
        Self {
            root: TreeNode::new("", root),
            cached_entries: 0,
        }
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    /// Tree-wide count of cached entries.
    pub fn cached_entries(&self) -> usize {
        self.cached_entries
    }

    /// Node at `path`, if every segment has been cached.
    pub fn node(&self, path: &FsPath) -> Option<&TreeNode> {
        path.segments()
            .try_fold(&self.root, |node, segment| node.find_child(segment))
    }

    fn node_mut(&mut self, path: &FsPath) -> Option<&mut TreeNode> {
        let mut node = &mut self.root;
        for segment in path.segments() {
            node = node.find_child_mut(segment)?;
        }
        Some(node)
    }

    /// Record `handle` as child `name` of the node at `parent`.
    ///
    /// Adding a name that is already cached is a silent no-op; callers treat
    /// both outcomes alike. Returns `None` if `parent` itself is not cached.
    pub fn add_child(&mut self, parent: &FsPath, name: &str, handle: DirRef) -> Option<bool> {
        let inserted = self.node_mut(parent)?.add_child(name, handle);
        if inserted {
            self.cached_entries += 1;
            trace!(parent = %parent, name = %name, total = self.cached_entries, "Cached directory handle");
        } else {
            trace!(parent = %parent, name = %name, "Directory handle already cached");
        }
        Some(inserted)
    }

    /// Detach child `name` of the node at `parent`.
    pub fn remove_child(&mut self, parent: &FsPath, name: &str) -> Option<TreeNode> {
        let removed = self.node_mut(parent)?.remove_child(name)?;
        self.cached_entries = self.cached_entries.saturating_sub(1);
        trace!(parent = %parent, name = %name, total = self.cached_entries, "Detached cached directory");
        Some(removed)
    }

    /// Summary of the cache contents.
    pub fn stats(&self) -> TreeStats {
        fn visit(node: &TreeNode, depth: usize, stats: &mut TreeStats) {
            stats.nodes += 1;
            stats.max_depth = stats.max_depth.max(depth);
            for child in &node.children {
                visit(child, depth + 1, stats);
            }
        }

        let mut stats = TreeStats {
            cached_entries: self.cached_entries,
            nodes: 0,
            max_depth: 0,
        };
        visit(&self.root, 0, &mut stats);
        stats
    }
}

/// Statistics about the handle cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeStats {
    /// Tree-wide cached-entry counter
    pub cached_entries: usize,
    /// Nodes currently reachable, root included
    pub nodes: usize,
    /// Deepest cached level (root is 0)
    pub max_depth: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::MemoryDirectory;

    fn handle() -> DirRef {
        MemoryDirectory::new_root().into_ref()
    }

    fn p(path: &str) -> FsPath {
        FsPath::parse(path).unwrap()
    }

    #[test]
    fn test_new_tree_is_empty() {
        let tree = HandleTree::new(handle());
        assert_eq!(tree.root().name(), "");
        assert_eq!(tree.cached_entries(), 0);
        assert!(!tree.root().has_children());
        assert!(tree.node(&FsPath::root()).is_some());
    }

    #[test]
    fn test_add_child_is_idempotent() {
        let mut tree = HandleTree::new(handle());

        assert_eq!(tree.add_child(&FsPath::root(), "a", handle()), Some(true));
        assert_eq!(tree.add_child(&FsPath::root(), "a", handle()), Some(false));

        assert_eq!(tree.cached_entries(), 1);
        assert_eq!(tree.root().children().len(), 1);
        assert_eq!(tree.root().cached_count(), 1);
    }

    #[test]
    fn test_add_child_under_missing_parent() {
        let mut tree = HandleTree::new(handle());
        assert_eq!(tree.add_child(&p("/missing"), "x", handle()), None);
        assert_eq!(tree.cached_entries(), 0);
    }

    #[test]
    fn test_nested_lookup() {
        let mut tree = HandleTree::new(handle());
        tree.add_child(&FsPath::root(), "a", handle());
        tree.add_child(&p("/a"), "b", handle());

        assert_eq!(tree.node(&p("/a/b")).unwrap().name(), "b");
        assert!(tree.node(&p("/a/c")).is_none());
        assert!(tree.node(&p("/b")).is_none());
    }

    #[test]
    fn test_exact_name_match() {
        let mut tree = HandleTree::new(handle());
        tree.add_child(&FsPath::root(), "Docs", handle());

        assert!(tree.root().find_child("Docs").is_some());
        assert!(tree.root().find_child("docs").is_none());
    }

    #[test]
    fn test_remove_child_decrements_counters() {
        let mut tree = HandleTree::new(handle());
        tree.add_child(&FsPath::root(), "a", handle());
        tree.add_child(&FsPath::root(), "b", handle());

        let removed = tree.remove_child(&FsPath::root(), "a").unwrap();
        assert_eq!(removed.name(), "a");
        assert_eq!(tree.cached_entries(), 1);
        assert_eq!(tree.root().cached_count(), 1);
        assert!(tree.remove_child(&FsPath::root(), "a").is_none());
        assert_eq!(tree.cached_entries(), 1);
    }

    #[test]
    fn test_stats() {
        let mut tree = HandleTree::new(handle());
        tree.add_child(&FsPath::root(), "a", handle());
        tree.add_child(&p("/a"), "b", handle());
        tree.add_child(&FsPath::root(), "c", handle());

        let stats = tree.stats();
        assert_eq!(stats.cached_entries, 3);
        assert_eq!(stats.nodes, 4);
        assert_eq!(stats.max_depth, 2);
    }
}
