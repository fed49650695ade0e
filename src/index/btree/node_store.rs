//! Node I/O capability consumed by the B-tree.
//!
//! [`BTree`](super::BTree) never touches files directly. It reads, writes
//! and allocates nodes through a [`NodeStore`], which is implemented by the
//! file-backed [`PageStore`](crate::storage::PageStore) and by the
//! in-memory [`MemoryNodeStore`].

use std::collections::HashMap;

use crate::common::{Error, PageId, Result};
use crate::index::btree::Node;

/// Something that can persist B-tree nodes.
pub trait NodeStore {
    /// Load the node stored at `page_id`.
    fn read_node(&mut self, page_id: PageId) -> Result<Node>;

    /// Persist `node` at its page ID.
    fn write_node(&mut self, node: &Node) -> Result<()>;

    /// Allocate a page and return an empty node for it.
    ///
    /// The node is not persisted until passed to [`NodeStore::write_node`].
    fn new_node(&mut self) -> Result<Node>;

    /// Largest encoded node size the store can hold (the page size).
    fn max_node_size(&self) -> usize;
}

impl<S: NodeStore + ?Sized> NodeStore for &mut S {
    fn read_node(&mut self, page_id: PageId) -> Result<Node> {
        (**self).read_node(page_id)
    }

    fn write_node(&mut self, node: &Node) -> Result<()> {
        (**self).write_node(node)
    }

    fn new_node(&mut self) -> Result<Node> {
        (**self).new_node()
    }

    fn max_node_size(&self) -> usize {
        (**self).max_node_size()
    }
}

/// Counters kept by [`MemoryNodeStore`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NodeStoreStats {
    pub reads: u64,
    pub writes: u64,
    pub allocations: u64,
}

/// A [`NodeStore`] that keeps encoded pages in a `HashMap`.
///
/// Every write encodes the node into a page-sized buffer and every read
/// decodes it again, so the tree sees exactly what a file would give back.
///
/// # Example
/// ```
/// use slotkv::{BTree, Item, MemoryNodeStore, PageId};
///
/// let mut tree = BTree::new(MemoryNodeStore::new(4096), PageId::NULL);
/// tree.insert(Item::new(b"k".to_vec(), b"v".to_vec()).unwrap()).unwrap();
/// assert_eq!(tree.find(b"k").unwrap().value(), b"v");
/// ```
#[derive(Debug)]
pub struct MemoryNodeStore {
    pages: HashMap<PageId, Box<[u8]>>,
    next_page_id: PageId,
    max_node_size: usize,
    stats: NodeStoreStats,
}

impl MemoryNodeStore {
    /// Create an empty store whose pages are `max_node_size` bytes.
    pub fn new(max_node_size: usize) -> Self {
        Self {
            pages: HashMap::new(),
            next_page_id: PageId::new(1),
            max_node_size,
            stats: NodeStoreStats::default(),
        }
    }

    /// Number of pages written at least once.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// IDs of all written pages, in no particular order.
    pub fn page_ids(&self) -> impl Iterator<Item = PageId> + '_ {
        self.pages.keys().copied()
    }

    pub fn stats(&self) -> NodeStoreStats {
        self.stats
    }
}

impl NodeStore for MemoryNodeStore {
    fn read_node(&mut self, page_id: PageId) -> Result<Node> {
        self.stats.reads += 1;
        let buf = self
            .pages
            .get(&page_id)
            .ok_or(Error::InvalidPageId(page_id))?;
        Node::from_buffer(page_id, buf)
    }

    fn write_node(&mut self, node: &Node) -> Result<()> {
        self.stats.writes += 1;
        let size = node.serialized_size();
        if size > self.max_node_size {
            return Err(Error::NodeOverflow {
                page_id: node.page_id(),
                size,
                max: self.max_node_size,
            });
        }
        let mut buf = vec![0u8; self.max_node_size].into_boxed_slice();
        node.write_to_buffer(&mut buf)?;
        self.pages.insert(node.page_id(), buf);
        Ok(())
    }

    fn new_node(&mut self) -> Result<Node> {
        self.stats.allocations += 1;
        let page_id = self.next_page_id;
        self.next_page_id = PageId::new(page_id.0 + 1);
        Ok(Node::new(page_id))
    }

    fn max_node_size(&self) -> usize {
        self.max_node_size
    }
}
