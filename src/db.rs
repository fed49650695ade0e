//! Database facade - a B-tree over a single file.
//!
//! [`Database`] wires the [`PageStore`] into the [`BTree`] by implementing
//! [`NodeStore`] for it, and exposes `insert`/`get` plus open/close.

use std::path::Path;

use parking_lot::Mutex;
use tracing::debug;

use crate::common::config::Options;
use crate::common::{Error, PageId, Result};
use crate::index::btree::{BTree, Item, Node, NodeStore, TreeStats};
use crate::storage::PageStore;

impl NodeStore for PageStore {
    fn read_node(&mut self, page_id: PageId) -> Result<Node> {
        if page_id.is_null() {
            return Err(Error::InvalidPageId(page_id));
        }
        let page = self.read_page(page_id)?;
        Node::from_buffer(page_id, page.as_slice())
    }

    fn write_node(&mut self, node: &Node) -> Result<()> {
        let page_id = node.page_id();
        if page_id.is_null() {
            return Err(Error::InvalidPageId(page_id));
        }
        let size = node.serialized_size();
        if size > self.page_size() {
            return Err(Error::NodeOverflow {
                page_id,
                size,
                max: self.page_size(),
            });
        }
        let mut page = self.new_page(page_id);
        node.write_to_buffer(page.as_mut_slice())?;
        self.write_page(&page)
    }

    fn new_node(&mut self) -> Result<Node> {
        if self.is_closed() {
            return Err(Error::FileClosed);
        }
        Ok(Node::new(self.allocate_page_id()))
    }

    fn max_node_size(&self) -> usize {
        self.page_size()
    }
}

/// An embedded key-value store backed by one file.
///
/// All operations take one exclusive lock around the tree, so a `Database`
/// can be shared between threads, but they never run concurrently.
///
/// The root page ID is not part of the file's metadata. Callers that reopen
/// a file must keep [`Database::root`] and pass it to [`Database::open_at`].
///
/// # Example
/// ```no_run
/// use slotkv::{Database, Options};
///
/// let db = Database::open("my_database.db", Options::default()).unwrap();
/// db.insert(b"key", b"value").unwrap();
/// assert_eq!(db.get(b"key").unwrap(), b"value");
///
/// let root = db.root();
/// db.close().unwrap();
///
/// let db = Database::open_at("my_database.db", Options::default(), root).unwrap();
/// assert_eq!(db.get(b"key").unwrap(), b"value");
/// ```
pub struct Database {
    tree: Mutex<BTree<PageStore>>,
}

impl Database {
    /// Open or create a database file with an empty tree.
    pub fn open<P: AsRef<Path>>(path: P, options: Options) -> Result<Self> {
        Self::open_at(path, options, PageId::NULL)
    }

    /// Open or create a database file whose tree is rooted at `root`.
    pub fn open_at<P: AsRef<Path>>(path: P, options: Options, root: PageId) -> Result<Self> {
        let store = PageStore::open(path, &options)?;
        if root > store.max_page_id() {
            return Err(Error::InvalidPageId(root));
        }
        debug!(root = root.0, "opened tree");
        Ok(Self {
            tree: Mutex::new(BTree::with_fill_factor(store, root, options.fill)),
        })
    }

    /// Insert or replace the value stored under `key`.
    pub fn insert(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let item = Item::new(key, value)?;
        self.tree.lock().insert(item)
    }

    /// Fetch the value stored under `key`.
    ///
    /// # Errors
    /// [`Error::NotFound`] if the key was never inserted.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        Ok(self.tree.lock().find(key)?.into_value())
    }

    /// Current root page ID, needed to reopen the file.
    pub fn root(&self) -> PageId {
        self.tree.lock().root()
    }

    /// Node, item and level counts of the tree.
    pub fn stats(&self) -> Result<TreeStats> {
        self.tree.lock().stats()
    }

    /// Persist metadata and sync without closing.
    pub fn flush(&self) -> Result<()> {
        self.tree.lock().store_mut().flush()
    }

    /// Persist metadata and close the file.
    ///
    /// Dropping a `Database` also closes it, but any error is only logged.
    pub fn close(self) -> Result<()> {
        self.tree.into_inner().into_store().close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn small_pages() -> Options {
        Options::default().page_size(128)
    }

    #[test]
    fn test_insert_and_get() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db"), Options::default()).unwrap();

        db.insert(b"hello", b"world").unwrap();
        assert_eq!(db.get(b"hello").unwrap(), b"world");
        assert!(matches!(db.get(b"missing"), Err(Error::NotFound)));
    }

    #[test]
    fn test_get_on_empty_database() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db"), Options::default()).unwrap();

        assert_eq!(db.root(), PageId::NULL);
        assert!(matches!(db.get(b"anything"), Err(Error::NotFound)));
    }

    #[test]
    fn test_validation_errors_surface() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db"), Options::default()).unwrap();

        assert!(matches!(
            db.insert(&[0u8; 256], b"v"),
            Err(Error::KeyTooLong { .. })
        ));
        assert!(matches!(
            db.insert(b"k", &[0u8; 256]),
            Err(Error::ValueTooLong { .. })
        ));
        assert_eq!(db.root(), PageId::NULL);
    }

    #[test]
    fn test_page_store_rejects_metadata_page_as_node() {
        let dir = tempdir().unwrap();
        let mut store = PageStore::open(dir.path().join("test.db"), &small_pages()).unwrap();

        assert!(matches!(
            store.read_node(PageId::NULL),
            Err(Error::InvalidPageId(PageId::NULL))
        ));
        assert!(matches!(
            store.write_node(&Node::new(PageId::NULL)),
            Err(Error::InvalidPageId(PageId::NULL))
        ));
    }

    #[test]
    fn test_page_store_node_roundtrip() {
        let dir = tempdir().unwrap();
        let mut store = PageStore::open(dir.path().join("test.db"), &small_pages()).unwrap();

        let mut node = store.new_node().unwrap();
        node.add_item(Item::new(b"a".to_vec(), b"1".to_vec()).unwrap(), 0);
        node.add_item(Item::new(b"b".to_vec(), b"2".to_vec()).unwrap(), 1);
        store.write_node(&node).unwrap();

        assert_eq!(store.read_node(node.page_id()).unwrap(), node);
        assert_eq!(store.max_node_size(), 128);
    }

    #[test]
    fn test_page_store_rejects_oversized_node() {
        let dir = tempdir().unwrap();
        let mut store = PageStore::open(dir.path().join("test.db"), &small_pages()).unwrap();

        let mut node = store.new_node().unwrap();
        node.add_item(Item::new(vec![1u8; 100], vec![2u8; 100]).unwrap(), 0);
        assert!(matches!(
            store.write_node(&node),
            Err(Error::NodeOverflow { max: 128, .. })
        ));
    }

    #[test]
    fn test_max_size_items_in_600_byte_pages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let options = Options::default().page_size(600);
        let key = [b'k'; 255];
        let value = [b'v'; 255];

        let db = Database::open(&path, options).unwrap();
        db.insert(&key, &value).unwrap();
        db.insert(b"a", b"1").unwrap();
        assert_eq!(db.get(&key).unwrap(), value);
        assert_eq!(db.get(b"a").unwrap(), b"1");

        let root = db.root();
        db.close().unwrap();
        let db = Database::open_at(&path, options, root).unwrap();
        assert_eq!(db.get(&key).unwrap(), value);
        assert_eq!(db.get(b"a").unwrap(), b"1");
    }

    #[test]
    fn test_open_at_rejects_unallocated_root() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        Database::open(&path, Options::default()).unwrap().close().unwrap();

        assert!(matches!(
            Database::open_at(&path, Options::default(), PageId::new(5)),
            Err(Error::InvalidPageId(PageId(5)))
        ));
    }

    #[test]
    fn test_database_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Database>();
    }
}
