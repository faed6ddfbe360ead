//! Property tests for the handle cache.

mod common;

use common::memory_fs;
use handlefs_core::FsPath;
use handlefs_core::tree::TreeNode;
use proptest::prelude::*;

fn names_unique(node: &TreeNode) -> bool {
    let mut names: Vec<&str> = node.children().iter().map(TreeNode::name).collect();
    let total = names.len();
    names.sort_unstable();
    names.dedup();
    names.len() == total && node.children().iter().all(names_unique)
}

fn path_strategy() -> impl Strategy<Value = String> {
    // Small alphabet so paths share prefixes often
    prop::collection::vec(prop::sample::select(vec!["a", "b", "c"]), 1..4)
        .prop_map(|segments| format!("/{}", segments.join("/")))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_tree_children_stay_unique(paths in prop::collection::vec(path_strategy(), 1..12)) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let (_root, mut fs) = memory_fs();
            for path in &paths {
                let path = FsPath::parse(path).unwrap();
                fs.mkdir(&path, true).await.unwrap();
                // Bounce through the root to exercise cached lookups
                fs.resolve(&FsPath::root(), false).await.unwrap();
                fs.resolve(&path, false).await.unwrap();
            }

            let tree = fs.resolver().tree().unwrap();
            prop_assert!(names_unique(tree.root()));

            // No removals happened, so every insert left exactly one node
            let stats = tree.stats();
            prop_assert_eq!(stats.cached_entries, stats.nodes - 1);

            for path in &paths {
                let path = FsPath::parse(path).unwrap();
                prop_assert!(tree.node(&path).is_some());
            }
            Ok(())
        })?;
    }
}
