//! MCP tool parameter structs with schemars-derived JSON schemas.
//!
//! Vocabulary fields arrive as strings and are parsed at the boundary, so an
//! unknown node type or verb is rejected before the store is touched.

use crate::error::ProvError;
use crate::model::{Metadata, NewNode, NewRelation};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};

fn to_metadata(map: Option<Map<String, Value>>) -> Result<Metadata, serde_json::Error> {
    match map {
        Some(map) => serde_json::from_value(Value::Object(map)),
        None => Ok(Metadata::new()),
    }
}

/// A parameter set that failed boundary validation
#[derive(Debug, thiserror::Error)]
pub enum ParamError {
    #[error(transparent)]
    Prov(#[from] ProvError),

    #[error("Invalid metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

// ── Node params ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RegisterNodeParams {
    #[schemars(description = "Unique label identifying the node")]
    pub label: String,
    #[schemars(description = "One of: entity, activity, agent")]
    pub node_type: String,
    #[schemars(description = "Free-text description (used only on first registration)")]
    pub description: Option<String>,
    #[schemars(description = "Arbitrary JSON object stored as-is")]
    pub metadata: Option<Map<String, Value>>,
}

impl RegisterNodeParams {
    pub fn into_new_node(self) -> Result<NewNode, ParamError> {
        Ok(NewNode {
            node_type: self.node_type.parse()?,
            label: self.label,
            description: self.description.unwrap_or_default(),
            metadata: to_metadata(self.metadata)?,
        })
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetNodeParams {
    #[schemars(description = "The node label")]
    pub label: String,
}

// ── Relation params ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RelationSpecParams {
    pub subject_label: String,
    #[schemars(description = "PROV verb, e.g. used, was_generated_by, was_derived_from")]
    pub verb: String,
    pub object_label: String,
    #[schemars(description = "RFC 3339 timestamp")]
    pub start_time: Option<DateTime<Utc>>,
    #[schemars(description = "RFC 3339 timestamp")]
    pub end_time: Option<DateTime<Utc>>,
    pub metadata: Option<Map<String, Value>>,
}

impl RelationSpecParams {
    pub fn into_new_relation(self) -> Result<NewRelation, ParamError> {
        let mut relation = NewRelation::new(self.subject_label, self.verb.parse()?, self.object_label)
            .with_times(self.start_time, self.end_time);
        relation.metadata = to_metadata(self.metadata)?;
        Ok(relation)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LinkRelationParams {
    #[schemars(description = "Run identifier grouping this relation")]
    pub run_id: String,
    #[serde(flatten)]
    pub relation: RelationSpecParams,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListRelationsParams {
    #[schemars(description = "Run identifier to list relations for")]
    pub run_id: String,
}

// ── Batch params ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
pub struct IngestParams {
    #[schemars(description = "Run identifier applied to every relation in the batch")]
    pub run_id: String,
    #[serde(default)]
    pub nodes: Vec<RegisterNodeParams>,
    #[serde(default)]
    pub relations: Vec<RelationSpecParams>,
}

impl IngestParams {
    /// Validate every node and relation before any write.
    pub fn into_batch(self) -> Result<(String, Vec<NewNode>, Vec<NewRelation>), ParamError> {
        let nodes = self
            .nodes
            .into_iter()
            .map(RegisterNodeParams::into_new_node)
            .collect::<Result<Vec<_>, _>>()?;
        let relations = self
            .relations
            .into_iter()
            .map(RelationSpecParams::into_new_relation)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((self.run_id, nodes, relations))
    }
}
