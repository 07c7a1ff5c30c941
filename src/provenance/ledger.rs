//! Relation ledger: append-only relation writes and run-scoped reads

use super::registry;
use crate::error::ProvResult;
use crate::model::{NewRelation, Relation};
use crate::storage::queries;
use rusqlite::Connection;

/// Persist a relation under `run_id`.
///
/// Both endpoints must already exist (`NotFound` otherwise); nodes are never
/// created here. Start and end times are stored as given.
pub(crate) fn link(conn: &Connection, run_id: &str, new: &NewRelation) -> ProvResult<Relation> {
    let subject_id = registry::resolve(conn, &new.subject_label)?;
    let object_id = registry::resolve(conn, &new.object_label)?;
    let relation = queries::insert_relation(conn, subject_id, object_id, run_id, new)?;
    tracing::debug!(id = %relation.id, run_id = %run_id, relation = %relation, "linked relation");
    Ok(relation)
}

pub(crate) fn list_by_run(conn: &Connection, run_id: &str) -> ProvResult<Vec<Relation>> {
    Ok(queries::relations_for_run(conn, run_id)?)
}
