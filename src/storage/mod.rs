//! Storage layer - disk I/O and page formats.
//!
//! This module handles persistent storage:
//! - [`PageStore`] - File I/O, page allocation and the free list
//! - [`Metadata`] - The allocation record kept in page 0
//! - [`Page`] - A page-sized buffer tagged with its ID
//! - [`cursor`] - Bounds-checked readers/writers used by the page codecs

pub mod cursor;
mod metadata;
mod page;
mod page_store;

pub use metadata::Metadata;
pub use page::Page;
pub use page_store::PageStore;
