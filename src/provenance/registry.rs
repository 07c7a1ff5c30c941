//! Node registry: get-or-create and lookup of nodes by label

use crate::error::{ProvError, ProvResult};
use crate::model::{NewNode, Node};
use crate::storage::queries;
use rusqlite::Connection;

/// Register a node, returning the stored node for its label.
///
/// An existing label is the normal case: the stored node comes back unchanged
/// and the supplied type, description and metadata are discarded.
pub(crate) fn register(conn: &Connection, new: &NewNode) -> ProvResult<Node> {
    let (node, created) = queries::get_or_create_node(conn, new)?;
    if created {
        tracing::debug!(label = %node.label, node_type = %node.node_type, "registered node");
    } else {
        tracing::debug!(label = %node.label, "node already registered");
    }
    Ok(node)
}

pub(crate) fn lookup(conn: &Connection, label: &str) -> ProvResult<Node> {
    queries::find_node(conn, label)?.ok_or_else(|| ProvError::NotFound(label.to_string()))
}

/// Resolve a label to the row id relations reference.
pub(crate) fn resolve(conn: &Connection, label: &str) -> ProvResult<i64> {
    queries::find_node_id(conn, label)?.ok_or_else(|| ProvError::NotFound(label.to_string()))
}
