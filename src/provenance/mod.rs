//! Provenance core: node registry, relation ledger and batch ingestion.

pub mod api;
mod ingest;
mod ledger;
mod registry;

pub use api::ProvenanceApi;
