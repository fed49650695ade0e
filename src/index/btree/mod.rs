//! B-tree index over slotted pages.
//!
//! - [`Item`] - A length-checked key/value pair
//! - [`Node`] - One tree page and its binary codec
//! - [`NodeStore`] - The node I/O capability the tree is generic over
//! - [`BTree`] - Search, insert and split

mod item;
mod node;
mod node_store;
mod tree;

pub use item::Item;
pub use node::{Node, NODE_HEADER_SIZE};
pub use node_store::{MemoryNodeStore, NodeStore, NodeStoreStats};
pub use tree::{BTree, InsertionPoint, TreeStats};
