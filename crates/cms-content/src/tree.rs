//! Tree assembly from flat parent-indexed records.
//!
//! [`NavigationTree`] groups items into buckets keyed by parent key, with
//! `None` as the root sentinel. Items are stored once in a flat `Vec` and
//! buckets hold indices, so assembling the tree never clones records.
//!
//! Malformed input is reported, never silently repaired:
//! - duplicate keys and cycles unreachable from the root are
//!   [`ContentError::Structural`]
//! - exceeding `max_depth` while expanding is [`ContentError::Structural`]
//!
//! Items whose parent is absent from the input are grafted under the root.

use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use cms_config::TreeOrder;
use cms_storage::{ContentNode, UnitRecord};

use crate::error::ContentError;

/// An item that can be placed in a [`NavigationTree`].
pub trait TreeItem {
    /// Identity used by children to reference this item.
    type Key: Clone + Eq + Hash + Debug;

    fn key(&self) -> Self::Key;

    /// Key of the parent item, `None` for top-level items.
    fn parent_key(&self) -> Option<Self::Key>;

    /// Sibling position used by [`OrderKey::Position`].
    fn position(&self) -> u32 {
        0
    }

    /// Creation time used by [`OrderKey::Created`].
    fn created_at(&self) -> Option<DateTime<Utc>> {
        None
    }
}

impl TreeItem for ContentNode {
    type Key = u64;

    fn key(&self) -> u64 {
        self.page_id
    }

    fn parent_key(&self) -> Option<u64> {
        self.parent_page_id
    }

    fn position(&self) -> u32 {
        self.position
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }
}

impl TreeItem for UnitRecord {
    type Key = u64;

    fn key(&self) -> u64 {
        self.id
    }

    fn parent_key(&self) -> Option<u64> {
        self.parent_id
    }

    fn position(&self) -> u32 {
        self.position
    }
}

/// Sibling ordering. Ties are always broken by input order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrderKey {
    /// Input order.
    Source,
    /// Menu position.
    #[default]
    Position,
    /// Creation timestamp.
    Created,
}

impl From<TreeOrder> for OrderKey {
    fn from(order: TreeOrder) -> Self {
        match order {
            TreeOrder::Source => Self::Source,
            TreeOrder::Position => Self::Position,
            TreeOrder::Created => Self::Created,
        }
    }
}

/// Where [`NavigationTree::to_tree`] starts expanding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RootSelector<K> {
    /// Top-level items (the root sentinel's children).
    Root,
    /// Children of the item with this key.
    Node(K),
}

/// An item with its assembled children.
#[derive(Debug, PartialEq)]
pub struct TreeNode<'a, T> {
    pub item: &'a T,
    /// Distance from the expansion root, starting at 0.
    pub depth: usize,
    pub children: Vec<TreeNode<'a, T>>,
}

impl<T> TreeNode<'_, T> {
    /// Number of nodes in this subtree, including this one.
    #[must_use]
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::count).sum::<usize>()
    }
}

/// Parent-bucketed index over a flat item list.
#[derive(Debug)]
pub struct NavigationTree<T: TreeItem> {
    items: Vec<T>,
    index: HashMap<T::Key, usize>,
    buckets: HashMap<Option<T::Key>, Vec<usize>>,
}

impl<T: TreeItem> NavigationTree<T> {
    /// Group `items` by parent and order each bucket.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::Structural`] for duplicate keys or parent
    /// cycles that are not reachable from the root.
    pub fn build(items: Vec<T>, order: OrderKey) -> Result<Self, ContentError> {
        let mut index = HashMap::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            if index.insert(item.key(), i).is_some() {
                return Err(ContentError::Structural(format!(
                    "duplicate key {:?}",
                    item.key()
                )));
            }
        }

        let mut buckets: HashMap<Option<T::Key>, Vec<usize>> = HashMap::new();
        for (i, item) in items.iter().enumerate() {
            // Orphans are grafted under the root sentinel
            let parent = item.parent_key().filter(|p| index.contains_key(p));
            buckets.entry(parent).or_default().push(i);
        }

        for bucket in buckets.values_mut() {
            match order {
                OrderKey::Source => {}
                OrderKey::Position => bucket.sort_by_key(|&i| (items[i].position(), i)),
                OrderKey::Created => bucket.sort_by_key(|&i| (items[i].created_at(), i)),
            }
        }

        let tree = Self {
            items,
            index,
            buckets,
        };
        tree.check_reachable()?;
        Ok(tree)
    }

    /// Every item must be reachable from the root; anything left over sits on
    /// a parent cycle.
    fn check_reachable(&self) -> Result<(), ContentError> {
        let mut reached = vec![false; self.items.len()];
        let mut queue: VecDeque<usize> = self.children_of(None).iter().copied().collect();
        while let Some(i) = queue.pop_front() {
            reached[i] = true;
            let key = self.items[i].key();
            queue.extend(self.children_of(Some(&key)));
        }

        match reached.iter().position(|&r| !r) {
            Some(i) => Err(ContentError::Structural(format!(
                "parent cycle through {:?}",
                self.items[i].key()
            ))),
            None => Ok(()),
        }
    }

    fn children_of(&self, parent: Option<&T::Key>) -> &[usize] {
        self.buckets
            .get(&parent.cloned())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in input order.
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Look up an item by key.
    #[must_use]
    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.index.get(key).map(|&i| &self.items[i])
    }

    /// Ordered children of `parent` (`None` for top-level items).
    pub fn children(&self, parent: Option<&T::Key>) -> impl Iterator<Item = &T> {
        self.children_of(parent).iter().map(|&i| &self.items[i])
    }

    /// Expand the tree below `root`.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::NotFound`] if the selected root key is absent
    /// and [`ContentError::Structural`] if nesting exceeds `max_depth`.
    pub fn to_tree(
        &self,
        root: &RootSelector<T::Key>,
        max_depth: usize,
    ) -> Result<Vec<TreeNode<'_, T>>, ContentError> {
        let parent = match root {
            RootSelector::Root => None,
            RootSelector::Node(key) => {
                if !self.index.contains_key(key) {
                    return Err(ContentError::NotFound(format!("tree node {key:?}")));
                }
                Some(key)
            }
        };
        self.expand(parent, 0, max_depth)
    }

    fn expand(
        &self,
        parent: Option<&T::Key>,
        depth: usize,
        max_depth: usize,
    ) -> Result<Vec<TreeNode<'_, T>>, ContentError> {
        let children = self.children_of(parent);
        if children.is_empty() {
            return Ok(Vec::new());
        }
        if depth >= max_depth {
            return Err(ContentError::Structural(format!(
                "tree deeper than {max_depth} levels"
            )));
        }

        children
            .iter()
            .map(|&i| {
                let item = &self.items[i];
                let key = item.key();
                Ok(TreeNode {
                    item,
                    depth,
                    children: self.expand(Some(&key), depth + 1, max_depth)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Item {
        key: &'static str,
        parent: Option<&'static str>,
        position: u32,
    }

    impl TreeItem for Item {
        type Key = &'static str;

        fn key(&self) -> &'static str {
            self.key
        }

        fn parent_key(&self) -> Option<&'static str> {
            self.parent
        }

        fn position(&self) -> u32 {
            self.position
        }
    }

    fn item(key: &'static str, parent: Option<&'static str>, position: u32) -> Item {
        Item {
            key,
            parent,
            position,
        }
    }

    fn shape(nodes: &[TreeNode<'_, Item>]) -> Vec<(String, usize)> {
        let mut out = Vec::new();
        for node in nodes {
            out.push((node.item.key.to_owned(), node.depth));
            out.extend(shape(&node.children));
        }
        out
    }

    #[test]
    fn test_build_orders_by_position() {
        // A root, B and C children of A with positions 2 and 1
        let tree = NavigationTree::build(
            vec![
                item("A", None, 0),
                item("B", Some("A"), 2),
                item("C", Some("A"), 1),
            ],
            OrderKey::Position,
        )
        .unwrap();

        let nodes = tree.to_tree(&RootSelector::Root, 64).unwrap();
        assert_eq!(
            shape(&nodes),
            vec![("A".to_owned(), 0), ("C".to_owned(), 1), ("B".to_owned(), 1)]
        );
    }

    #[test]
    fn test_source_order_keeps_input() {
        let tree = NavigationTree::build(
            vec![
                item("A", None, 0),
                item("B", Some("A"), 2),
                item("C", Some("A"), 1),
            ],
            OrderKey::Source,
        )
        .unwrap();
        let children: Vec<_> = tree.children(Some(&"A")).map(|i| i.key).collect();
        assert_eq!(children, vec!["B", "C"]);
    }

    #[test]
    fn test_position_ties_keep_input_order() {
        let tree = NavigationTree::build(
            vec![item("X", None, 1), item("Y", None, 0), item("Z", None, 1)],
            OrderKey::Position,
        )
        .unwrap();
        let roots: Vec<_> = tree.children(None).map(|i| i.key).collect();
        assert_eq!(roots, vec!["Y", "X", "Z"]);
    }

    #[test]
    fn test_orphan_grafted_under_root() {
        let tree = NavigationTree::build(
            vec![item("A", None, 0), item("D", Some("Z"), 0)],
            OrderKey::Position,
        )
        .unwrap();
        let nodes = tree.to_tree(&RootSelector::Root, 64).unwrap();

        let roots: Vec<_> = nodes.iter().map(|n| n.item.key).collect();
        assert_eq!(roots, vec!["A", "D"]);
        assert_eq!(nodes.iter().map(TreeNode::count).sum::<usize>(), 2);
    }

    #[test]
    fn test_node_count_preserved() {
        let items: Vec<_> = (0..50u32)
            .map(|i| {
                let key: &'static str = Box::leak(format!("n{i}").into_boxed_str());
                let parent: Option<&'static str> = if i == 0 {
                    None
                } else {
                    Some(Box::leak(format!("n{}", i / 3).into_boxed_str()))
                };
                item(key, parent, 50 - i)
            })
            .collect();

        let tree = NavigationTree::build(items, OrderKey::Position).unwrap();
        let nodes = tree.to_tree(&RootSelector::Root, 64).unwrap();
        assert_eq!(nodes.iter().map(TreeNode::count).sum::<usize>(), 50);
    }

    #[test]
    fn test_unreachable_cycle_is_structural_error() {
        let result = NavigationTree::build(
            vec![item("R", None, 0), item("A", Some("B"), 0), item("B", Some("A"), 0)],
            OrderKey::Position,
        );
        assert!(matches!(result, Err(ContentError::Structural(_))));
    }

    #[test]
    fn test_self_parent_is_structural_error() {
        let result = NavigationTree::build(vec![item("A", Some("A"), 0)], OrderKey::Source);
        assert!(matches!(result, Err(ContentError::Structural(_))));
    }

    #[test]
    fn test_duplicate_key_is_structural_error() {
        let result =
            NavigationTree::build(vec![item("A", None, 0), item("A", None, 1)], OrderKey::Source);
        assert!(matches!(result, Err(ContentError::Structural(_))));
    }

    #[test]
    fn test_max_depth_exceeded() {
        let tree = NavigationTree::build(
            vec![
                item("A", None, 0),
                item("B", Some("A"), 0),
                item("C", Some("B"), 0),
            ],
            OrderKey::Source,
        )
        .unwrap();

        assert!(tree.to_tree(&RootSelector::Root, 3).is_ok());
        assert!(matches!(
            tree.to_tree(&RootSelector::Root, 2),
            Err(ContentError::Structural(_))
        ));
    }

    #[test]
    fn test_expand_from_node() {
        let tree = NavigationTree::build(
            vec![
                item("A", None, 0),
                item("B", Some("A"), 0),
                item("C", Some("B"), 0),
            ],
            OrderKey::Source,
        )
        .unwrap();

        let nodes = tree.to_tree(&RootSelector::Node("A"), 64).unwrap();
        assert_eq!(shape(&nodes), vec![("B".to_owned(), 0), ("C".to_owned(), 1)]);
        assert!(matches!(
            tree.to_tree(&RootSelector::Node("Q"), 64),
            Err(ContentError::NotFound(_))
        ));
    }

    #[test]
    fn test_empty_input() {
        let tree = NavigationTree::<Item>::build(Vec::new(), OrderKey::Position).unwrap();
        assert!(tree.is_empty());
        assert!(tree.to_tree(&RootSelector::Root, 1).unwrap().is_empty());
    }

    #[test]
    fn test_content_nodes_order_by_created() {
        // Node 2 comes first in the input but was created later
        let first = cms_storage::MockStore::node(2, 20, None, "en", "b");
        let second = cms_storage::MockStore::node(1, 10, None, "en", "a");

        let tree = NavigationTree::build(vec![first, second], OrderKey::Created).unwrap();
        let roots: Vec<_> = tree.children(None).map(|n| n.page_id).collect();
        assert_eq!(roots, vec![10, 20]);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.get(&20).map(|n| n.id), Some(2));
    }
}
