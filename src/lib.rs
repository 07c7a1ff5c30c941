//! provstore: Provenance Store
//!
//! Records PROV provenance facts ("subject had relationship verb to object,
//! during run R") over SQLite and answers run-scoped queries.
//!
//! # Core Concepts
//!
//! - **Nodes**: entities, activities and agents, unique by label
//! - **Relations**: append-only subject-verb-object statements grouped by run id
//! - **Batches**: nodes and relations ingested in one all-or-nothing transaction
//!
//! # Example
//!
//! ```
//! use provstore::{NewNode, NewRelation, OpenStore, ProvenanceApi, SqliteStore, Verb};
//!
//! let store = SqliteStore::open_in_memory().unwrap();
//! let api = ProvenanceApi::new(&store);
//! let created = api
//!     .ingest(
//!         "run-1",
//!         &[NewNode::entity("report.csv"), NewNode::activity("export")],
//!         &[NewRelation::new("report.csv", Verb::WasGeneratedBy, "export")],
//!     )
//!     .unwrap();
//! assert_eq!(api.relations_for_run("run-1").unwrap(), created);
//! ```

pub mod config;
mod error;
pub mod mcp;
mod model;
pub mod provenance;
pub mod storage;

pub use config::{ConfigError, StoreConfig};
pub use error::{ProvError, ProvResult};
pub use model::{
    Metadata, MetadataValue, NewNode, NewRelation, Node, NodeType, ProvenanceRecord, Relation,
    RelationId, Verb,
};
pub use provenance::ProvenanceApi;
pub use storage::{OpenStore, SqliteStore, StorageError, StorageResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
