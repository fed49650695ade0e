//! B-tree node and its slotted-page codec.
//!
//! # Page Layout
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       1     is_leaf (1 = leaf, 0 = internal)
//! 1       2     item count N (u16)
//! 3       ...   directory, one entry per item:
//!                 child[i]  (u64, internal nodes only)
//!                 offset[i] (u16, absolute offset of item i's payload)
//! ...     8     trailing child[N] (internal nodes only)
//!
//!         ...   free space
//!
//! ...     ...   payloads, written back-to-front from the end of the page:
//!                 key_len (u8) | key | value_len (u8) | value
//! ```
//! The directory grows from the front and the payloads from the back, so a
//! node can be searched through fixed-size entries without scanning the
//! variable-length region.

use std::cmp::Ordering;

use crate::common::config::{PAGE_ID_SIZE, SLOT_OFFSET_SIZE};
use crate::common::{Error, PageId, Result};
use crate::index::btree::Item;
use crate::storage::cursor::{ReadCursor, WriteCursor};

/// Fixed part of a node page: leaf flag and item count.
pub const NODE_HEADER_SIZE: usize = 3;

const LEAF_FLAG: u8 = 1;
const INTERNAL_FLAG: u8 = 0;

/// In-memory form of one B-tree page.
///
/// Invariants:
/// - `items` are sorted by key (unsigned byte order) with no duplicates.
/// - A leaf has no children; an internal node has `items.len() + 1`.
/// - `children[i]` holds keys below `items[i]`, `children[items.len()]`
///   holds keys above the last item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub(crate) page_id: PageId,
    pub(crate) items: Vec<Item>,
    pub(crate) children: Vec<PageId>,
}

impl Node {
    /// Create an empty leaf for `page_id`.
    pub fn new(page_id: PageId) -> Self {
        Self {
            page_id,
            items: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Decode a node previously written with [`Node::write_to_buffer`].
    pub fn from_buffer(page_id: PageId, buf: &[u8]) -> Result<Self> {
        let mut node = Self::new(page_id);
        node.read_from_buffer(buf)?;
        Ok(node)
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    #[inline]
    pub fn children(&self) -> &[PageId] {
        &self.children
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Bytes needed to encode this node.
    ///
    /// Always reserves room for `items.len() + 1` child pointers, leaf or
    /// not, so a leaf never has to be resized to become internal.
    pub fn serialized_size(&self) -> usize {
        NODE_HEADER_SIZE
            + (self.items.len() + 1) * PAGE_ID_SIZE
            + self.items.len() * SLOT_OFFSET_SIZE
            + self.items.iter().map(Item::serialized_size).sum::<usize>()
    }

    /// Encode into `buf`. Bytes between the directory and the payloads are
    /// left as they were.
    ///
    /// # Errors
    /// [`Error::OutOfBounds`] if the node does not fit in `buf`.
    pub fn write_to_buffer(&self, buf: &mut [u8]) -> Result<()> {
        let is_leaf = self.is_leaf();
        let mut cursor = WriteCursor::new(buf);

        cursor.put_u8(if is_leaf { LEAF_FLAG } else { INTERNAL_FLAG })?;
        cursor.put_u16(self.items.len() as u16)?;

        for (i, item) in self.items.iter().enumerate() {
            if !is_leaf {
                cursor.put_u64(self.children[i].0)?;
            }

            cursor.prepend(item.value())?;
            cursor.prepend_u8(item.value().len() as u8)?;
            cursor.prepend(item.key())?;
            let offset = cursor.prepend_u8(item.key().len() as u8)?;

            cursor.put_u16(offset as u16)?;
        }

        if let Some(last) = self.children.last() {
            cursor.put_u64(last.0)?;
        }
        Ok(())
    }

    /// Replace this node's items and children with those encoded in `buf`.
    ///
    /// # Errors
    /// [`Error::OutOfBounds`] if the directory or an offset points outside
    /// `buf`, which means the page is corrupt.
    pub fn read_from_buffer(&mut self, buf: &[u8]) -> Result<()> {
        let mut cursor = ReadCursor::new(buf);
        let is_leaf = cursor.read_u8()? == LEAF_FLAG;
        let count = cursor.read_u16()? as usize;

        let mut items = Vec::with_capacity(count);
        let mut children = Vec::with_capacity(if is_leaf { 0 } else { count + 1 });

        for _ in 0..count {
            if !is_leaf {
                children.push(PageId::new(cursor.read_u64()?));
            }
            let offset = cursor.read_u16()? as usize;

            let mut payload = ReadCursor::at(buf, offset)?;
            let key_len = payload.read_u8()? as usize;
            let key = payload.read_bytes(key_len)?;
            let value_len = payload.read_u8()? as usize;
            let value = payload.read_bytes(value_len)?;
            items.push(Item::from_parts(key, value));
        }

        if !is_leaf {
            children.push(PageId::new(cursor.read_u64()?));
        }

        self.items = items;
        self.children = children;
        Ok(())
    }

    /// Locate `key` in this node.
    ///
    /// Returns `(true, i)` if `items[i]` has exactly this key. Otherwise
    /// returns `(false, i)` where `i` is the first item with a greater key
    /// (or `items.len()`), which is both the insertion point and the child
    /// to descend into.
    pub fn find_key(&self, key: &[u8]) -> (bool, usize) {
        for (i, item) in self.items.iter().enumerate() {
            match item.key().cmp(key) {
                Ordering::Equal => return (true, i),
                Ordering::Greater => return (false, i),
                Ordering::Less => {}
            }
        }
        (false, self.items.len())
    }

    /// Insert `item` at `index`, shifting later items right.
    ///
    /// # Panics
    /// Panics if `index > items.len()`.
    pub fn add_item(&mut self, item: Item, index: usize) {
        self.items.insert(index, item);
    }

    /// Insert a child pointer at `index`, shifting later children right.
    ///
    /// # Panics
    /// Panics if `index > children.len()`.
    pub fn add_child(&mut self, page_id: PageId, index: usize) {
        self.children.insert(index, page_id);
    }

    /// Overwrite the item at `index` in place.
    pub(crate) fn replace_item(&mut self, item: Item, index: usize) {
        self.items[index] = item;
    }

    /// Remove and return the first item, along with the first child for an
    /// internal node.
    ///
    /// # Errors
    /// [`Error::EmptyNode`] if the node has no items.
    pub fn pop(&mut self) -> Result<(Item, Option<PageId>)> {
        if self.items.is_empty() {
            return Err(Error::EmptyNode);
        }
        let item = self.items.remove(0);
        let child = if self.is_leaf() {
            None
        } else {
            Some(self.children.remove(0))
        };
        Ok((item, child))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::{btree_map, vec};
    use proptest::prelude::*;

    fn item(key: &str, value: &str) -> Item {
        Item::new(key.as_bytes().to_vec(), value.as_bytes().to_vec()).unwrap()
    }

    fn roundtrip(node: &Node, page_size: usize) -> Node {
        let mut buf = vec![0u8; page_size];
        node.write_to_buffer(&mut buf).unwrap();
        Node::from_buffer(node.page_id(), &buf).unwrap()
    }

    #[test]
    fn test_leaf_roundtrip() {
        let mut node = Node::new(PageId::new(1));
        node.add_item(item("Key1", "Value 1"), 0);
        node.add_item(item("Key2", "Value 2"), 1);

        let decoded = roundtrip(&node, 4096);
        assert_eq!(node, decoded);
        assert!(decoded.is_leaf());
    }

    #[test]
    fn test_internal_roundtrip() {
        let mut node = Node::new(PageId::new(1));
        node.add_item(item("b", "2"), 0);
        node.add_item(item("d", "4"), 1);
        node.add_child(PageId::new(2), 0);
        node.add_child(PageId::new(3), 1);
        node.add_child(PageId::new(4), 2);

        let decoded = roundtrip(&node, 256);
        assert_eq!(node, decoded);
        assert!(!decoded.is_leaf());
    }

    #[test]
    fn test_internal_node_without_items_roundtrip() {
        let mut node = Node::new(PageId::new(5));
        node.add_child(PageId::new(9), 0);

        let decoded = roundtrip(&node, 64);
        assert_eq!(decoded.children(), &[PageId::new(9)]);
        assert!(decoded.items().is_empty());
    }

    #[test]
    fn test_leaf_byte_layout() {
        let mut node = Node::new(PageId::new(1));
        node.add_item(item("ab", "xyz"), 0);

        let mut buf = vec![0u8; 64];
        node.write_to_buffer(&mut buf).unwrap();

        assert_eq!(buf[0], 1); // leaf
        assert_eq!(&buf[1..3], &1u16.to_le_bytes());
        // payload is 1 + 2 + 1 + 3 = 7 bytes at the end of the page
        assert_eq!(&buf[3..5], &57u16.to_le_bytes());
        assert_eq!(&buf[57..64], &[2, b'a', b'b', 3, b'x', b'y', b'z']);
    }

    #[test]
    fn test_internal_byte_layout() {
        let mut node = Node::new(PageId::new(1));
        node.add_item(item("k", ""), 0);
        node.add_child(PageId::new(7), 0);
        node.add_child(PageId::new(8), 1);

        let mut buf = vec![0u8; 64];
        node.write_to_buffer(&mut buf).unwrap();

        assert_eq!(buf[0], 0); // internal
        assert_eq!(&buf[3..11], &7u64.to_le_bytes());
        assert_eq!(&buf[11..13], &61u16.to_le_bytes());
        assert_eq!(&buf[13..21], &8u64.to_le_bytes());
        assert_eq!(&buf[61..64], &[1, b'k', 0]);
    }

    #[test]
    fn test_write_to_small_buffer_fails() {
        let mut node = Node::new(PageId::new(1));
        node.add_item(item("key", "a value that does not fit"), 0);

        let mut buf = vec![0u8; 16];
        assert!(matches!(
            node.write_to_buffer(&mut buf),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_corrupt_offset_is_error() {
        let mut buf = vec![0u8; 64];
        buf[0] = 1;
        buf[1..3].copy_from_slice(&1u16.to_le_bytes());
        buf[3..5].copy_from_slice(&500u16.to_le_bytes());

        assert!(matches!(
            Node::from_buffer(PageId::new(1), &buf),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_serialized_size() {
        let mut node = Node::new(PageId::new(1));
        assert_eq!(node.serialized_size(), 3 + 8);

        node.add_item(item("1", "Value1"), 0);
        // 3 + 2×8 + 2 + (2 + 1 + 6)
        assert_eq!(node.serialized_size(), 30);
    }

    #[test]
    fn test_find_key() {
        let mut node = Node::new(PageId::new(1));
        node.add_item(item("Key1", "Value 1"), 0);
        node.add_item(item("Key3", "Value 3"), 1);

        assert_eq!(node.find_key(b"Key1"), (true, 0));
        assert_eq!(node.find_key(b"Key3"), (true, 1));
        assert_eq!(node.find_key(b"Key0"), (false, 0));
        assert_eq!(node.find_key(b"Key2"), (false, 1));
        assert_eq!(node.find_key(b"Key4"), (false, 2));
        assert_eq!(node.find_key(b""), (false, 0));
    }

    #[test]
    fn test_find_key_is_unsigned_bytewise() {
        let mut node = Node::new(PageId::new(1));
        node.add_item(Item::new(vec![0x7F], Vec::new()).unwrap(), 0);
        node.add_item(Item::new(vec![0x80], Vec::new()).unwrap(), 1);

        assert_eq!(node.find_key(&[0x7F, 0x00]), (false, 1));
        assert_eq!(node.find_key(&[0xFF]), (false, 2));
    }

    #[test]
    fn test_add_item_and_child_shift_right() {
        let mut node = Node::new(PageId::new(1));
        node.add_item(item("c", ""), 0);
        node.add_item(item("a", ""), 0);
        node.add_item(item("b", ""), 1);
        let keys: Vec<&[u8]> = node.items().iter().map(Item::key).collect();
        assert_eq!(keys, vec![&b"a"[..], &b"b"[..], &b"c"[..]]);

        node.add_child(PageId::new(3), 0);
        node.add_child(PageId::new(1), 0);
        node.add_child(PageId::new(2), 1);
        assert_eq!(
            node.children(),
            &[PageId::new(1), PageId::new(2), PageId::new(3)]
        );
    }

    #[test]
    fn test_pop() {
        let mut leaf = Node::new(PageId::new(1));
        leaf.add_item(item("a", "1"), 0);
        leaf.add_item(item("b", "2"), 1);

        let (first, child) = leaf.pop().unwrap();
        assert_eq!(first.key(), b"a");
        assert_eq!(child, None);
        assert_eq!(leaf.items().len(), 1);

        let mut internal = Node::new(PageId::new(2));
        internal.add_item(item("m", ""), 0);
        internal.add_child(PageId::new(10), 0);
        internal.add_child(PageId::new(11), 1);

        let (_, child) = internal.pop().unwrap();
        assert_eq!(child, Some(PageId::new(10)));
        assert_eq!(internal.children(), &[PageId::new(11)]);

        let mut empty = Node::new(PageId::new(3));
        assert!(matches!(empty.pop(), Err(Error::EmptyNode)));
    }

    fn arb_node() -> impl Strategy<Value = Node> {
        (
            btree_map(vec(any::<u8>(), 0..16), vec(any::<u8>(), 0..16), 0..12),
            any::<bool>(),
            1u64..1000,
        )
            .prop_map(|(entries, internal, base)| {
                let mut node = Node::new(PageId::new(base));
                for (key, value) in entries {
                    node.items.push(Item::new(key, value).unwrap());
                }
                if internal {
                    node.children = (0..=node.items.len() as u64)
                        .map(|i| PageId::new(base + i + 1))
                        .collect();
                }
                node
            })
    }

    proptest! {
        #[test]
        fn prop_codec_roundtrip(node in arb_node()) {
            let mut buf = vec![0u8; 1024];
            node.write_to_buffer(&mut buf).unwrap();
            let decoded = Node::from_buffer(node.page_id(), &buf).unwrap();
            prop_assert_eq!(decoded, node);
        }

        #[test]
        fn prop_serialized_size_fits(node in arb_node()) {
            let mut buf = vec![0u8; node.serialized_size()];
            prop_assert!(node.write_to_buffer(&mut buf).is_ok());
        }
    }
}
