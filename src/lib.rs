//! slotkv - An embedded, single-file, ordered key-value store.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            slotkv                               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                  Facade (db)                             │   │
//! │  │        Database: open / insert / get / close             │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │               Index Layer (index/btree)                  │   │
//! │  │      BTree search / insert / split over a NodeStore      │   │
//! │  │      Node (slotted-page codec) + Item (key/value)        │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │               Storage Layer (storage/)                   │   │
//! │  │   PageStore (file I/O, free list) + Metadata (page 0)    │   │
//! │  │   Page + ReadCursor / WriteCursor                        │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, Error, config)
//! - [`storage`] - Disk I/O and page formats
//! - [`index`] - The B-tree
//! - [`db`] - The file-backed facade
//!
//! # Quick Start
//! ```no_run
//! use slotkv::{Database, Options};
//!
//! let db = Database::open("my_database.db", Options::default()).unwrap();
//! db.insert(b"key", b"value").unwrap();
//! assert_eq!(db.get(b"key").unwrap(), b"value");
//! db.close().unwrap();
//! ```

pub mod common;
pub mod db;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{FillFactor, Options, DEFAULT_PAGE_SIZE, MAX_KEY_SIZE, MAX_VALUE_SIZE};
pub use common::{Error, PageId, Result};

pub use db::Database;
pub use index::btree::{BTree, Item, MemoryNodeStore, Node, NodeStore, TreeStats};
pub use storage::{Metadata, Page, PageStore};
