//! Node and relation SQL, shared by autocommit calls and batch transactions.
//!
//! Every function takes a `&Connection`; a `Transaction` derefs to one, so
//! the same statements run inside or outside a batch.

use super::traits::{StorageError, StorageResult};
use crate::model::{Metadata, NewNode, NewRelation, Node, NodeType, Relation, RelationId, Verb};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Current time at the precision the store keeps, so a freshly created row
/// compares equal to the same row read back.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339, so text order matches time order.
fn encode_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_time(s: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::DateParse(format!("{s}: {e}")))
}

/// True when `e` is a `UNIQUE` constraint failure (not a foreign key or
/// other constraint).
pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

// === Nodes ===

/// Raw node columns, decoded outside the rusqlite row callback
struct NodeRow {
    label: String,
    node_type: String,
    description: String,
    metadata_json: String,
    created_at: String,
    updated_at: String,
}

impl NodeRow {
    const COLUMNS: &'static str = "label, node_type, description, metadata_json, created_at, updated_at";

    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            label: row.get(0)?,
            node_type: row.get(1)?,
            description: row.get(2)?,
            metadata_json: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn into_node(self) -> StorageResult<Node> {
        let node_type: NodeType = self
            .node_type
            .parse()
            .map_err(|_| StorageError::Corrupt(format!("node {}: node_type {}", self.label, self.node_type)))?;
        Ok(Node {
            node_type,
            description: self.description,
            metadata: serde_json::from_str(&self.metadata_json)?,
            created_at: decode_time(&self.created_at)?,
            updated_at: decode_time(&self.updated_at)?,
            label: self.label,
        })
    }
}

/// Load a node by label
pub fn find_node(conn: &Connection, label: &str) -> StorageResult<Option<Node>> {
    let sql = format!("SELECT {} FROM nodes WHERE label = ?1", NodeRow::COLUMNS);
    conn.query_row(&sql, params![label], NodeRow::read)
        .optional()?
        .map(NodeRow::into_node)
        .transpose()
}

/// Row id of the node with `label`, for use as a relation foreign key
pub fn find_node_id(conn: &Connection, label: &str) -> StorageResult<Option<i64>> {
    Ok(conn
        .query_row("SELECT id FROM nodes WHERE label = ?1", params![label], |row| row.get(0))
        .optional()?)
}

/// Return the node stored under `new.label`, inserting it first if absent.
///
/// The boolean is true when this call created the row.
pub fn get_or_create_node(conn: &Connection, new: &NewNode) -> StorageResult<(Node, bool)> {
    if let Some(existing) = find_node(conn, &new.label)? {
        return Ok((existing, false));
    }
    create_or_reread(conn, new)
}

/// Insert `new` and read the stored row back.
///
/// A concurrent insert of the same label from another connection makes the
/// insert a no-op; the winner's row is then returned unchanged.
fn create_or_reread(conn: &Connection, new: &NewNode) -> StorageResult<(Node, bool)> {
    let created_here = insert_node(conn, new)?;
    if !created_here {
        tracing::warn!(label = %new.label, "label registered concurrently, re-reading winner");
    }

    let node = find_node(conn, &new.label)?
        .ok_or_else(|| StorageError::Corrupt(format!("node {} missing after insert", new.label)))?;
    Ok((node, created_here))
}

/// Insert a node row. Returns false if the label is already taken.
pub fn insert_node(conn: &Connection, new: &NewNode) -> StorageResult<bool> {
    let created = encode_time(&now());
    let inserted = conn.execute(
        r#"
        INSERT INTO nodes (label, node_type, description, metadata_json, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?5)
        "#,
        params![
            new.label,
            new.node_type.as_str(),
            new.description,
            serde_json::to_string(&new.metadata)?,
            created,
        ],
    );

    match inserted {
        Ok(_) => Ok(true),
        Err(e) if is_unique_violation(&e) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

// === Relations ===

struct RelationRow {
    id: i64,
    subject_label: String,
    verb: String,
    object_label: String,
    run_id: String,
    start_time: Option<String>,
    end_time: Option<String>,
    metadata_json: String,
    created_at: String,
    updated_at: String,
}

impl RelationRow {
    const SELECT: &'static str = r#"
        SELECT r.id, s.label, r.verb, o.label, r.run_id, r.start_time, r.end_time,
               r.metadata_json, r.created_at, r.updated_at
        FROM relations r
        JOIN nodes s ON s.id = r.subject_id
        JOIN nodes o ON o.id = r.object_id
    "#;

    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            subject_label: row.get(1)?,
            verb: row.get(2)?,
            object_label: row.get(3)?,
            run_id: row.get(4)?,
            start_time: row.get(5)?,
            end_time: row.get(6)?,
            metadata_json: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_relation(self) -> StorageResult<Relation> {
        let verb: Verb = self
            .verb
            .parse()
            .map_err(|_| StorageError::Corrupt(format!("relation {}: verb {}", self.id, self.verb)))?;
        Ok(Relation {
            id: RelationId::from_raw(self.id),
            subject_label: self.subject_label,
            verb,
            object_label: self.object_label,
            run_id: self.run_id,
            start_time: self.start_time.as_deref().map(decode_time).transpose()?,
            end_time: self.end_time.as_deref().map(decode_time).transpose()?,
            metadata: serde_json::from_str::<Metadata>(&self.metadata_json)?,
            created_at: decode_time(&self.created_at)?,
            updated_at: decode_time(&self.updated_at)?,
        })
    }
}

/// Insert a relation between two resolved node ids and return the stored row.
///
/// No deduplication: identical statements produce distinct rows. `created_at`
/// is read from the clock here, so callers hold the write lock (an
/// immediate transaction) to keep it monotonic with the row id across
/// connections.
pub fn insert_relation(
    conn: &Connection,
    subject_id: i64,
    object_id: i64,
    run_id: &str,
    new: &NewRelation,
) -> StorageResult<Relation> {
    let created = encode_time(&now());
    conn.execute(
        r#"
        INSERT INTO relations (subject_id, verb, object_id, run_id, start_time, end_time,
                               metadata_json, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
        "#,
        params![
            subject_id,
            new.verb.as_str(),
            object_id,
            run_id,
            new.start_time.as_ref().map(encode_time),
            new.end_time.as_ref().map(encode_time),
            serde_json::to_string(&new.metadata)?,
            created,
        ],
    )?;

    let id = conn.last_insert_rowid();
    load_relation(conn, RelationId::from_raw(id))?
        .ok_or_else(|| StorageError::Corrupt(format!("relation {id} missing after insert")))
}

/// Load a relation by id
pub fn load_relation(conn: &Connection, id: RelationId) -> StorageResult<Option<Relation>> {
    let sql = format!("{} WHERE r.id = ?1", RelationRow::SELECT);
    conn.query_row(&sql, params![id.as_i64()], RelationRow::read)
        .optional()?
        .map(RelationRow::into_relation)
        .transpose()
}

/// All relations tagged with `run_id`, oldest first; rows created in the
/// same instant keep insertion order.
pub fn relations_for_run(conn: &Connection, run_id: &str) -> StorageResult<Vec<Relation>> {
    let sql = format!(
        "{} WHERE r.run_id = ?1 ORDER BY r.created_at ASC, r.id ASC",
        RelationRow::SELECT
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![run_id], RelationRow::read)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(RelationRow::into_relation).collect()
}
