//! Common types and utilities shared across slotkv.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and [`Options`](config::Options)
//! - Error types
//! - Identifiers (PageId)

pub mod config;
pub mod error;
mod page_id;

pub use error::{Error, Result};
pub use page_id::PageId;
