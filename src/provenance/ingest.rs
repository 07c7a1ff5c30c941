//! Batch ingestion: nodes and relations committed as one unit

use super::{ledger, registry};
use crate::error::{ProvError, ProvResult};
use crate::model::{NewNode, NewRelation, Relation};
use rusqlite::Connection;

/// Register `nodes`, then link `relations` under `run_id`, on a connection
/// the caller has already placed inside a transaction.
///
/// Each relation may reference batch nodes or nodes stored earlier. An
/// unresolvable label becomes `ProvError::Reference`, and the caller must
/// roll back. Relations come back in input order.
pub(crate) fn ingest(
    tx: &Connection,
    run_id: &str,
    nodes: &[NewNode],
    relations: &[NewRelation],
) -> ProvResult<Vec<Relation>> {
    for node in nodes {
        registry::register(tx, node)?;
    }

    relations
        .iter()
        .map(|rel| {
            ledger::link(tx, run_id, rel).map_err(|e| match e {
                ProvError::NotFound(label) => ProvError::Reference { label },
                other => other,
            })
        })
        .collect()
}
