//! Durable storage for nodes and relations
//!
//! `SqliteStore` owns the connection and transaction scoping; `queries`
//! holds the SQL for both tables.

pub(crate) mod queries;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{OpenStore, StorageError, StorageResult};
