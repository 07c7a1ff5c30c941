//! Provenance data model

mod metadata;
mod node;
mod relation;


pub use metadata::{Metadata, MetadataValue};
pub use node::{NewNode, Node, NodeType};
pub use relation::{NewRelation, ProvenanceRecord, Relation, RelationId, Verb};
