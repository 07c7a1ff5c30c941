//! Provenance API: the operations request adapters call.
//!
//! Each method picks its own transaction scope. Node registration and
//! reads run in autocommit mode. `link` and `ingest` take the write lock
//! before reading the clock, so `created_at` never runs behind the row id;
//! `ingest` holds that one transaction across every registration and link
//! it performs.

use crate::error::ProvResult;
use crate::model::{NewNode, NewRelation, Node, ProvenanceRecord, Relation};
use crate::storage::SqliteStore;

use super::{ingest, ledger, registry};

/// Provenance operations over a shared store.
pub struct ProvenanceApi<'a> {
    store: &'a SqliteStore,
}

impl<'a> ProvenanceApi<'a> {
    pub fn new(store: &'a SqliteStore) -> Self {
        Self { store }
    }

    // === Node registry ===

    /// Get-or-create a node by label.
    ///
    /// Never fails for an existing label; the stored node is returned and
    /// the new fields are ignored.
    pub fn register_node(&self, node: &NewNode) -> ProvResult<Node> {
        self.store.with_conn(|conn| registry::register(conn, node))
    }

    /// Fetch a node by label, or `NotFound`.
    pub fn get_node(&self, label: &str) -> ProvResult<Node> {
        self.store.with_conn(|conn| registry::lookup(conn, label))
    }

    // === Relation ledger ===

    /// Record `relation` under `run_id`. Both endpoints must already exist.
    pub fn link(&self, run_id: &str, relation: &NewRelation) -> ProvResult<Relation> {
        self.store.with_transaction(|tx| ledger::link(tx, run_id, relation))
    }

    /// Relations for `run_id` in creation order; empty for an unknown run.
    pub fn relations_for_run(&self, run_id: &str) -> ProvResult<Vec<Relation>> {
        self.store.with_conn(|conn| ledger::list_by_run(conn, run_id))
    }

    // === Batch ingestion ===

    /// Register `nodes` and link `relations` under `run_id`, all or nothing.
    ///
    /// Fails with `Reference` naming the first unresolvable label; nothing
    /// from the batch is persisted in that case.
    pub fn ingest(
        &self,
        run_id: &str,
        nodes: &[NewNode],
        relations: &[NewRelation],
    ) -> ProvResult<Vec<Relation>> {
        let result = self
            .store
            .with_transaction(|tx| ingest::ingest(tx, run_id, nodes, relations));

        match &result {
            Ok(created) => tracing::info!(
                run_id = %run_id,
                nodes = nodes.len(),
                relations = created.len(),
                "committed provenance batch"
            ),
            Err(e) => tracing::warn!(run_id = %run_id, error = %e, "provenance batch rolled back"),
        }
        result
    }

    /// `ingest` for a deserialized request body.
    pub fn ingest_record(&self, record: &ProvenanceRecord) -> ProvResult<Vec<Relation>> {
        self.ingest(&record.run_id, &record.nodes, &record.relations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProvError;
    use crate::model::{Metadata, MetadataValue, NodeType, Verb};
    use crate::storage::OpenStore;
    use serde_json::json;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn nested_metadata() -> Metadata {
        serde_json::from_value(json!({ "a": [1, 2], "b": { "c": true } })).unwrap()
    }

    // === Scenario: the same entity is registered twice ===
    #[test]
    fn re_registering_returns_original_node() {
        let store = store();
        let api = ProvenanceApi::new(&store);

        let first = api
            .register_node(&NewNode::entity("dataset-1").with_description("raw"))
            .unwrap();
        let second = api
            .register_node(
                &NewNode::agent("dataset-1")
                    .with_description("changed")
                    .with_metadata("k", "v"),
            )
            .unwrap();

        assert_eq!(second.label, "dataset-1");
        assert_eq!(second.node_type, NodeType::Entity);
        assert_eq!(second.description, "raw");
        assert!(second.metadata.is_empty());
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second, first);
    }

    #[test]
    fn lookup_of_unknown_label_is_not_found() {
        let store = store();
        let api = ProvenanceApi::new(&store);
        match api.get_node("nope") {
            Err(ProvError::NotFound(label)) => assert_eq!(label, "nope"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn registered_node_is_returned_by_lookup() {
        let store = store();
        let api = ProvenanceApi::new(&store);
        let created = api
            .register_node(&NewNode::activity("train").with_description("fit model"))
            .unwrap();
        let found = api.get_node("train").unwrap();
        assert_eq!(found, created);
        assert_eq!(found.created_at, found.updated_at);
        assert_eq!(found.to_string(), "activity: train");
    }

    // === Scenario: relation between unregistered nodes ===
    #[test]
    fn link_requires_both_endpoints() {
        let store = store();
        let api = ProvenanceApi::new(&store);
        api.register_node(&NewNode::entity("out")).unwrap();

        let missing_object = api.link("r1", &NewRelation::new("out", Verb::WasGeneratedBy, "job"));
        assert!(matches!(missing_object, Err(ProvError::NotFound(ref l)) if l == "job"));

        let missing_subject = api.link("r1", &NewRelation::new("in", Verb::Used, "out"));
        assert!(matches!(missing_subject, Err(ProvError::NotFound(ref l)) if l == "in"));

        // Link never creates nodes on its own
        assert!(matches!(api.get_node("job"), Err(ProvError::NotFound(_))));
        assert!(api.relations_for_run("r1").unwrap().is_empty());
    }

    #[test]
    fn identical_links_are_distinct_rows() {
        let store = store();
        let api = ProvenanceApi::new(&store);
        api.register_node(&NewNode::entity("a")).unwrap();
        api.register_node(&NewNode::activity("b")).unwrap();

        let rel = NewRelation::new("a", Verb::WasGeneratedBy, "b");
        let first = api.link("r1", &rel).unwrap();
        let second = api.link("r1", &rel).unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(api.relations_for_run("r1").unwrap().len(), 2);
    }

    #[test]
    fn link_accepts_end_before_start() {
        let store = store();
        let api = ProvenanceApi::new(&store);
        api.register_node(&NewNode::entity("a")).unwrap();
        api.register_node(&NewNode::activity("b")).unwrap();

        let start = chrono::DateTime::parse_from_rfc3339("2025-02-01T00:00:00Z").unwrap().with_timezone(&chrono::Utc);
        let end = chrono::DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z").unwrap().with_timezone(&chrono::Utc);
        let rel = api
            .link("r1", &NewRelation::new("a", Verb::Used, "b").with_times(Some(start), Some(end)))
            .unwrap();
        assert_eq!(rel.start_time, Some(start));
        assert_eq!(rel.end_time, Some(end));
    }

    // === Scenario: relations listed per run ===
    #[test]
    fn relations_for_run_follow_insertion_order() {
        let store = store();
        let api = ProvenanceApi::new(&store);
        for label in ["raw", "clean", "model"] {
            api.register_node(&NewNode::entity(label)).unwrap();
        }
        api.register_node(&NewNode::activity("pipeline")).unwrap();

        let r1 = api.link("run", &NewRelation::new("raw", Verb::Used, "pipeline")).unwrap();
        let other = api.link("other", &NewRelation::new("clean", Verb::WasDerivedFrom, "raw")).unwrap();
        let r2 = api.link("run", &NewRelation::new("clean", Verb::WasDerivedFrom, "raw")).unwrap();
        let r3 = api.link("run", &NewRelation::new("model", Verb::WasGeneratedBy, "pipeline")).unwrap();

        let ids: Vec<_> = api.relations_for_run("run").unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![r1.id, r2.id, r3.id]);
        assert_eq!(api.relations_for_run("other").unwrap(), vec![other]);
    }

    #[test]
    fn unknown_run_is_empty() {
        let store = store();
        let api = ProvenanceApi::new(&store);
        assert!(api.relations_for_run("never-ran").unwrap().is_empty());
    }

    #[test]
    fn nested_metadata_round_trips() {
        let store = store();
        let api = ProvenanceApi::new(&store);
        let mut node = NewNode::entity("a");
        node.metadata = nested_metadata();
        api.register_node(&node).unwrap();
        api.register_node(&NewNode::agent("b")).unwrap();

        let mut rel = NewRelation::new("a", Verb::WasAttributedTo, "b");
        rel.metadata = nested_metadata();
        api.link("r", &rel).unwrap();

        assert_eq!(api.get_node("a").unwrap().metadata, nested_metadata());
        let listed = api.relations_for_run("r").unwrap();
        assert_eq!(listed[0].metadata, nested_metadata());
        assert_eq!(
            listed[0].metadata.get("b"),
            Some(&MetadataValue::Object(
                [("c".to_string(), MetadataValue::Bool(true))].into_iter().collect()
            ))
        );
    }

    #[test]
    fn large_unsigned_metadata_round_trips() {
        let store = store();
        let api = ProvenanceApi::new(&store);
        let node = NewNode::entity("blob").with_metadata("checksum", u64::MAX);
        api.register_node(&node).unwrap();

        let stored = api.get_node("blob").unwrap();
        assert_eq!(stored.metadata.get("checksum"), Some(&MetadataValue::UInt(u64::MAX)));
        assert_eq!(
            serde_json::to_string(&stored.metadata).unwrap(),
            r#"{"checksum":18446744073709551615}"#
        );
    }

    #[test]
    fn metadata_keeps_caller_key_order() {
        let store = store();
        let api = ProvenanceApi::new(&store);
        api.register_node(&NewNode::entity("a")).unwrap();
        api.register_node(&NewNode::activity("b")).unwrap();

        let rel = NewRelation::new("a", Verb::WasGeneratedBy, "b")
            .with_metadata("zeta", 1i64)
            .with_metadata("alpha", 2i64)
            .with_metadata("mid", 3i64);
        api.link("r", &rel).unwrap();

        let listed = api.relations_for_run("r").unwrap();
        let keys: Vec<&str> = listed[0].metadata.keys().map(String::as_str).collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    // === Scenario: batch ingestion ===
    #[test]
    fn ingest_creates_nodes_and_relations() {
        let store = store();
        let api = ProvenanceApi::new(&store);

        let created = api
            .ingest(
                "r1",
                &[NewNode::entity("A"), NewNode::activity("B")],
                &[NewRelation::new("A", Verb::WasGeneratedBy, "B")],
            )
            .unwrap();

        assert_eq!(created.len(), 1);
        assert_eq!(created[0].run_id, "r1");
        assert_eq!(api.relations_for_run("r1").unwrap(), created);
        assert_eq!(api.get_node("B").unwrap().node_type, NodeType::Activity);
    }

    #[test]
    fn ingest_returns_relations_in_input_order() {
        let store = store();
        let api = ProvenanceApi::new(&store);
        let relations = [
            NewRelation::new("out", Verb::WasGeneratedBy, "job"),
            NewRelation::new("job", Verb::Used, "in"),
            NewRelation::new("job", Verb::WasAssociatedWith, "bot"),
        ];
        let created = api
            .ingest(
                "r",
                &[
                    NewNode::entity("in"),
                    NewNode::entity("out"),
                    NewNode::activity("job"),
                    NewNode::agent("bot"),
                ],
                &relations,
            )
            .unwrap();

        let verbs: Vec<Verb> = created.iter().map(|r| r.verb).collect();
        assert_eq!(verbs, vec![Verb::WasGeneratedBy, Verb::Used, Verb::WasAssociatedWith]);
    }

    #[test]
    fn ingest_reuses_previously_stored_nodes() {
        let store = store();
        let api = ProvenanceApi::new(&store);
        let original = api
            .register_node(&NewNode::entity("shared").with_description("first"))
            .unwrap();

        let created = api
            .ingest(
                "r2",
                &[NewNode::activity("step"), NewNode::agent("shared").with_description("second")],
                &[
                    NewRelation::new("shared", Verb::Used, "step"),
                    NewRelation::new("step", Verb::Used, "shared"),
                ],
            )
            .unwrap();

        assert_eq!(created.len(), 2);
        assert_eq!(api.get_node("shared").unwrap(), original);
    }

    #[test]
    fn ingest_may_reference_nodes_outside_the_batch() {
        let store = store();
        let api = ProvenanceApi::new(&store);
        api.register_node(&NewNode::agent("operator")).unwrap();

        let created = api
            .ingest(
                "r",
                &[NewNode::activity("job")],
                &[NewRelation::new("job", Verb::WasAssociatedWith, "operator")],
            )
            .unwrap();
        assert_eq!(created[0].object_label, "operator");
    }

    #[test]
    fn ingest_batch_run_id_overrides_relation_run_id() {
        let store = store();
        let api = ProvenanceApi::new(&store);
        let mut rel = NewRelation::new("A", Verb::WasGeneratedBy, "B");
        rel.run_id = Some("someone-else".into());

        let record = ProvenanceRecord {
            run_id: "batch".into(),
            nodes: vec![NewNode::entity("A"), NewNode::activity("B")],
            relations: vec![rel],
        };
        let created = api.ingest_record(&record).unwrap();

        assert_eq!(created[0].run_id, "batch");
        assert!(api.relations_for_run("someone-else").unwrap().is_empty());
    }

    // === Scenario: batch with a dangling reference ===
    #[test]
    fn ingest_with_unknown_label_rolls_back_everything() {
        let store = store();
        let api = ProvenanceApi::new(&store);

        let err = api
            .ingest(
                "r1",
                &[NewNode::entity("A"), NewNode::activity("B")],
                &[
                    NewRelation::new("A", Verb::WasGeneratedBy, "B"),
                    NewRelation::new("A", Verb::WasDerivedFrom, "ghost"),
                ],
            )
            .unwrap_err();

        match &err {
            ProvError::Reference { label } => assert_eq!(label, "ghost"),
            other => panic!("expected Reference, got {other:?}"),
        }
        assert_eq!(err.label(), Some("ghost"));
        assert!(matches!(api.get_node("A"), Err(ProvError::NotFound(_))));
        assert!(matches!(api.get_node("B"), Err(ProvError::NotFound(_))));
        assert!(api.relations_for_run("r1").unwrap().is_empty());
    }

    #[test]
    fn failed_batch_leaves_prior_state_untouched() {
        let store = store();
        let api = ProvenanceApi::new(&store);
        api.ingest("r1", &[NewNode::entity("A"), NewNode::activity("B")], &[NewRelation::new("A", Verb::WasGeneratedBy, "B")])
            .unwrap();

        let result = api.ingest(
            "r1",
            &[NewNode::entity("C")],
            &[
                NewRelation::new("C", Verb::WasDerivedFrom, "A"),
                NewRelation::new("missing", Verb::Used, "B"),
            ],
        );

        assert!(matches!(result, Err(ProvError::Reference { .. })));
        assert!(api.get_node("C").is_err());
        assert_eq!(api.relations_for_run("r1").unwrap().len(), 1);
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let store = store();
        let api = ProvenanceApi::new(&store);
        assert!(api.ingest("r", &[], &[]).unwrap().is_empty());
    }
}
