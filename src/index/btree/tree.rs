//! B-tree search, insert and split.
//!
//! The tree holds only its root page ID. Every node is fetched through the
//! [`NodeStore`] when needed and dropped once the operation is done, so no
//! node keeps a reference to its parent. Split propagation instead records
//! the child index taken at each level on the way down (the *trail*) and
//! replays it from the root to rebuild the ancestor chain.

use tracing::{debug, warn};

use crate::common::config::{FillFactor, PAGE_ID_SIZE, SLOT_OFFSET_SIZE};
use crate::common::{Error, PageId, Result};
use crate::index::btree::node::NODE_HEADER_SIZE;
use crate::index::btree::{Item, Node, NodeStore};

/// Where a key lives, or would be inserted.
#[derive(Debug)]
pub struct InsertionPoint {
    /// Whether `node` already holds the key.
    pub found: bool,
    /// Index of the key in `node`, or where it would be inserted.
    pub index: usize,
    /// The node the descent stopped at: the holder of the key, or a leaf.
    pub node: Node,
    /// Child index chosen at each internal node, root first. Empty when
    /// `node` is the root.
    pub trail: Vec<usize>,
}

/// Shape of a tree, gathered by [`BTree::stats`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TreeStats {
    pub nodes: usize,
    pub items: usize,
    pub height: usize,
}

/// An ordered map from byte-string keys to byte-string values, stored as a
/// B-tree of slotted pages.
///
/// # Example
/// ```
/// use slotkv::{BTree, Item, MemoryNodeStore, PageId};
///
/// let mut tree = BTree::new(MemoryNodeStore::new(128), PageId::NULL);
/// for key in ["b", "a", "c"] {
///     tree.insert(Item::new(key, "value").unwrap()).unwrap();
/// }
/// assert_eq!(tree.find(b"a").unwrap().value(), b"value");
/// assert!(tree.find(b"z").is_err());
/// ```
pub struct BTree<S: NodeStore> {
    root: PageId,
    store: S,
    fill: FillFactor,
}

impl<S: NodeStore> BTree<S> {
    /// Open the tree rooted at `root` ([`PageId::NULL`] for an empty tree).
    pub fn new(store: S, root: PageId) -> Self {
        Self::with_fill_factor(store, root, FillFactor::default())
    }

    /// Like [`BTree::new`] with explicit split thresholds.
    pub fn with_fill_factor(store: S, root: PageId, fill: FillFactor) -> Self {
        Self { root, store, fill }
    }

    /// Current root page, [`PageId::NULL`] while the tree is empty.
    #[inline]
    pub fn root(&self) -> PageId {
        self.root
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_null()
    }

    #[inline]
    pub fn fill_factor(&self) -> FillFactor {
        self.fill
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Look up the item stored under `key`.
    ///
    /// # Errors
    /// [`Error::NotFound`] if the key is absent or the tree is empty.
    pub fn find(&mut self, key: &[u8]) -> Result<Item> {
        if self.root.is_null() {
            return Err(Error::NotFound);
        }

        let mut node = self.store.read_node(self.root)?;
        loop {
            let (found, index) = node.find_key(key);
            if found {
                return Ok(node.items.swap_remove(index));
            }
            if node.is_leaf() {
                return Err(Error::NotFound);
            }
            node = self.store.read_node(node.children[index])?;
        }
    }

    /// Descend towards `key` without failing at a leaf.
    ///
    /// # Errors
    /// [`Error::NotFound`] if the tree is empty.
    pub fn find_insertion_point(&mut self, key: &[u8]) -> Result<InsertionPoint> {
        if self.root.is_null() {
            return Err(Error::NotFound);
        }

        let mut trail = Vec::new();
        let mut node = self.store.read_node(self.root)?;
        loop {
            let (found, index) = node.find_key(key);
            if found || node.is_leaf() {
                return Ok(InsertionPoint {
                    found,
                    index,
                    node,
                    trail,
                });
            }
            trail.push(index);
            node = self.store.read_node(node.children[index])?;
        }
    }

    /// Insert `item`, replacing the value of an existing equal key.
    ///
    /// Nodes pushed past the max fill threshold are split bottom-up; if the
    /// root itself overflows, a new root is created above it.
    pub fn insert(&mut self, item: Item) -> Result<()> {
        if self.root.is_null() {
            let mut root = self.store.new_node()?;
            root.add_item(item, 0);
            self.store.write_node(&root)?;
            self.root = root.page_id();
            debug!(root = self.root.0, "created root");
            return Ok(());
        }

        let InsertionPoint {
            found,
            index,
            mut node,
            trail,
        } = self.find_insertion_point(item.key())?;

        if found {
            node.replace_item(item, index);
        } else {
            node.add_item(item, index);
        }

        if !self.is_overfull(&node) {
            return self.store.write_node(&node);
        }
        self.rebalance(node, &trail)
    }

    /// Split every overfull node on the path from `node` up to the root.
    ///
    /// `node` has been modified but not written. Each level either fits and
    /// is written, which ends the cascade, or is split into its parent,
    /// which then becomes the modified node one level up.
    fn rebalance(&mut self, mut node: Node, trail: &[usize]) -> Result<()> {
        let mut path = self.ancestors(trail)?;
        loop {
            if !self.is_overfull(&node) {
                return self.store.write_node(&node);
            }
            let Some(mut parent) = path.pop() else {
                break;
            };
            self.split_into(&mut parent, node, trail[path.len()])?;
            node = parent;
        }
        self.grow_root(node)
    }

    /// Add levels above an overfull root until it fits or cannot be split,
    /// then write it and make it the tree's root.
    fn grow_root(&mut self, mut root: Node) -> Result<()> {
        while self.is_overfull(&root) && self.split_index(&root).is_some() {
            let mut new_root = self.store.new_node()?;
            new_root.add_child(root.page_id(), 0);
            self.split_into(&mut new_root, root, 0)?;
            debug!(root = new_root.page_id().0, "tree grew a level");
            root = new_root;
        }
        if self.is_overfull(&root) {
            warn!(page_id = root.page_id().0, "root cannot be split");
        }
        self.store.write_node(&root)?;
        self.root = root.page_id();
        Ok(())
    }

    /// Re-read the nodes from the root down to the parent of the node the
    /// trail leads to.
    fn ancestors(&mut self, trail: &[usize]) -> Result<Vec<Node>> {
        let mut path = Vec::with_capacity(trail.len());
        let Some((_, replay)) = trail.split_last() else {
            return Ok(path);
        };

        let mut current = self.store.read_node(self.root)?;
        for &index in replay {
            let next = self.store.read_node(current.children[index])?;
            path.push(current);
            current = next;
        }
        path.push(current);
        Ok(path)
    }

    /// Split `child`, the child of `parent` at `child_index`, until every
    /// piece fits, and write the pieces. `parent` receives one separator per
    /// split and is left for the caller to write.
    fn split_into(&mut self, parent: &mut Node, child: Node, child_index: usize) -> Result<()> {
        // Pieces further right are handled first, so inserting into `parent`
        // never shifts the index of a pending piece.
        let mut pending = vec![(child, child_index)];
        while let Some((mut node, index)) = pending.pop() {
            if !self.is_overfull(&node) {
                self.store.write_node(&node)?;
                continue;
            }
            let Some(split) = self.split_index(&node) else {
                warn!(page_id = node.page_id().0, "node cannot be split");
                self.store.write_node(&node)?;
                continue;
            };
            let sibling = self.split_at(parent, &mut node, index, split)?;
            pending.push((node, index));
            pending.push((sibling, index + 1));
        }
        Ok(())
    }

    /// Move the item at `split` up into `parent` at `child_index` and the
    /// items after it into a new right sibling, which is returned. Nothing
    /// is written.
    fn split_at(
        &mut self,
        parent: &mut Node,
        child: &mut Node,
        child_index: usize,
        split: usize,
    ) -> Result<Node> {
        let mut sibling = self.store.new_node()?;

        let mut upper = child.items.split_off(split);
        let middle = upper.remove(0);
        sibling.items = upper;
        if !child.is_leaf() {
            sibling.children = child.children.split_off(split + 1);
        }

        parent.add_item(middle, child_index);
        parent.add_child(sibling.page_id(), child_index + 1);

        debug!(
            page_id = child.page_id().0,
            sibling = sibling.page_id().0,
            parent = parent.page_id().0,
            left = child.items.len(),
            right = sibling.items.len(),
            "split node"
        );
        Ok(sibling)
    }

    /// Index of the item to promote when splitting `node`, always in
    /// `1..items.len()`.
    ///
    /// Walks the items accumulating their encoded size (directory entry
    /// included) and stops at the first one that takes the left half past
    /// the min fill threshold. That item normally stays on the left; if it
    /// would push the left half past the max fill threshold it is promoted
    /// instead. If only the last item would cross, splits at the midpoint.
    /// Returns `None` for nodes with fewer than two items.
    fn split_index(&self, node: &Node) -> Option<usize> {
        let len = node.items.len();
        if len < 2 {
            return None;
        }

        let max_node_size = self.store.max_node_size();
        let threshold = self.fill.min_bytes(max_node_size);
        let limit = self.fill.max_bytes(max_node_size);
        let mut size = NODE_HEADER_SIZE + PAGE_ID_SIZE;
        for (i, item) in node.items[..len - 1].iter().enumerate() {
            size += PAGE_ID_SIZE + SLOT_OFFSET_SIZE + item.serialized_size();
            if size > threshold {
                if size > limit && i > 0 {
                    return Some(i);
                }
                return Some(i + 1);
            }
        }
        Some(len / 2)
    }

    #[inline]
    fn is_overfull(&self, node: &Node) -> bool {
        node.serialized_size() > self.fill.max_bytes(self.store.max_node_size())
    }

    /// Call `f` with every node reachable from the root and its depth
    /// (root = 0), depth-first in key order.
    pub fn visit<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&Node, usize),
    {
        if self.root.is_null() {
            return Ok(());
        }

        let mut stack = vec![(self.root, 0usize)];
        while let Some((page_id, depth)) = stack.pop() {
            let node = self.store.read_node(page_id)?;
            f(&node, depth);
            for &child in node.children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        Ok(())
    }

    /// Count nodes, items and levels.
    pub fn stats(&mut self) -> Result<TreeStats> {
        let mut stats = TreeStats::default();
        self.visit(|node, depth| {
            stats.nodes += 1;
            stats.items += node.items.len();
            stats.height = stats.height.max(depth + 1);
        })?;
        Ok(stats)
    }

    /// Render the tree one node per line, indented by depth. Keys are shown
    /// lossily as UTF-8. Meant for debugging small trees.
    pub fn dump(&mut self) -> Result<String> {
        let mut out = String::new();
        self.visit(|node, depth| {
            let keys: Vec<_> = node
                .items
                .iter()
                .map(|item| String::from_utf8_lossy(item.key()).into_owned())
                .collect();
            let children: Vec<_> = node.children.iter().map(|id| id.0).collect();
            out.push_str(&format!(
                "{}node {} keys={:?} children={:?}\n",
                "  ".repeat(depth),
                node.page_id.0,
                keys,
                children
            ));
        })?;
        Ok(out)
    }
}
