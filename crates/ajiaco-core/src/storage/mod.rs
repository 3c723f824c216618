//! Storage layer for Ajiaco.
//!
//! This module provides a sled-based storage engine: the DDL side (create,
//! drop, schema catalog), row access for units of work, atomic write batches
//! and the one-row stamp table.

mod address;
mod config;
mod engine;
mod row;
mod stamp;
mod table;
mod transaction;

pub mod key;

pub use address::{StorageAddress, IN_MEMORY_ADDRESSES, SLED_SCHEME};
pub use config::StorageConfig;
pub use engine::StorageEngine;
pub use row::StoredRow;
pub use stamp::Stamp;
pub use table::{ForeignKeyRef, TableSchema};
pub use transaction::{WriteBatch, WriteOp};
