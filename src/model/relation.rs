//! Relations: timestamped subject-verb-object statements between nodes

use super::metadata::{Metadata, MetadataValue};
use crate::error::ProvError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage-assigned identifier of a relation row
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationId(i64);

impl RelationId {
    pub(crate) fn from_raw(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for RelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// PROV relation vocabulary.
///
/// Canonical form is snake_case; parsing also accepts kebab-case and the
/// PROV-O camelCase spelling (`wasGeneratedBy`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Verb {
    Used,
    WasGeneratedBy,
    WasDerivedFrom,
    WasAssociatedWith,
    WasAttributedTo,
    WasInformedBy,
    ActedOnBehalfOf,
    WasStartedBy,
    WasEndedBy,
    WasInvalidatedBy,
    HadMember,
    WasInfluencedBy,
}

impl Verb {
    pub const ALL: [Verb; 12] = [
        Verb::Used,
        Verb::WasGeneratedBy,
        Verb::WasDerivedFrom,
        Verb::WasAssociatedWith,
        Verb::WasAttributedTo,
        Verb::WasInformedBy,
        Verb::ActedOnBehalfOf,
        Verb::WasStartedBy,
        Verb::WasEndedBy,
        Verb::WasInvalidatedBy,
        Verb::HadMember,
        Verb::WasInfluencedBy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Used => "used",
            Verb::WasGeneratedBy => "was_generated_by",
            Verb::WasDerivedFrom => "was_derived_from",
            Verb::WasAssociatedWith => "was_associated_with",
            Verb::WasAttributedTo => "was_attributed_to",
            Verb::WasInformedBy => "was_informed_by",
            Verb::ActedOnBehalfOf => "acted_on_behalf_of",
            Verb::WasStartedBy => "was_started_by",
            Verb::WasEndedBy => "was_ended_by",
            Verb::WasInvalidatedBy => "was_invalidated_by",
            Verb::HadMember => "had_member",
            Verb::WasInfluencedBy => "was_influenced_by",
        }
    }
}

/// Lowercase with separators removed, so `was-generated-by`,
/// `was_generated_by` and `wasGeneratedBy` compare equal.
fn fold(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

impl std::str::FromStr for Verb {
    type Err = ProvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = fold(s);
        Verb::ALL
            .into_iter()
            .find(|v| fold(v.as_str()) == folded)
            .ok_or_else(|| ProvError::InvalidEnum {
                kind: "verb",
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for Verb {
    type Error = ProvError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Verb> for String {
    fn from(v: Verb) -> Self {
        v.as_str().to_string()
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored relation, with its endpoints resolved to labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: RelationId,
    pub subject_label: String,
    pub verb: Verb,
    pub object_label: String,
    pub run_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.subject_label, self.verb, self.object_label)
    }
}

/// Fields supplied when creating a relation.
///
/// `run_id` is carried for clients that echo it, but is never used: the run
/// id passed to `link` or the batch run id is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRelation {
    pub subject_label: String,
    pub verb: Verb,
    pub object_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl NewRelation {
    pub fn new(subject_label: impl Into<String>, verb: Verb, object_label: impl Into<String>) -> Self {
        Self {
            subject_label: subject_label.into(),
            verb,
            object_label: object_label.into(),
            run_id: None,
            start_time: None,
            end_time: None,
            metadata: Metadata::new(),
        }
    }

    pub fn with_times(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A batch of nodes and relations ingested atomically under one run id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub run_id: String,
    #[serde(default)]
    pub nodes: Vec<super::node::NewNode>,
    #[serde(default)]
    pub relations: Vec<NewRelation>,
}
