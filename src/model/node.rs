//! Provenance nodes: entities, activities and agents

use super::metadata::{Metadata, MetadataValue};
use crate::error::ProvError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// PROV node classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NodeType {
    /// A dataset, file or other thing with fixed aspects
    Entity,
    /// A processing step occurring over a period of time
    Activity,
    /// Something bearing responsibility for an activity
    Agent,
}

impl NodeType {
    pub const ALL: [NodeType; 3] = [NodeType::Entity, NodeType::Activity, NodeType::Agent];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Entity => "entity",
            NodeType::Activity => "activity",
            NodeType::Agent => "agent",
        }
    }
}

impl std::str::FromStr for NodeType {
    type Err = ProvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ProvError::InvalidEnum {
                kind: "node_type",
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for NodeType {
    type Error = ProvError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<NodeType> for String {
    fn from(t: NodeType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored provenance node, identified by its label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub label: String,
    pub node_type: NodeType,
    pub description: String,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.node_type, self.label)
    }
}

/// Fields supplied when registering a node.
///
/// Only used when the label is new; a registration for an existing label
/// returns the stored node and discards these fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNode {
    pub label: String,
    pub node_type: NodeType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl NewNode {
    pub fn new(label: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            label: label.into(),
            node_type,
            description: String::new(),
            metadata: Metadata::new(),
        }
    }

    pub fn entity(label: impl Into<String>) -> Self {
        Self::new(label, NodeType::Entity)
    }

    pub fn activity(label: impl Into<String>) -> Self {
        Self::new(label, NodeType::Activity)
    }

    pub fn agent(label: impl Into<String>) -> Self {
        Self::new(label, NodeType::Agent)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
