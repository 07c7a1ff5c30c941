//! MCP server for provstore: exposes node registration, relation linking,
//! run listing and batch ingestion via the Model Context Protocol.
//!
//! Tools: register_node, get_node, link_relation, list_relations,
//! ingest_provenance.

pub mod params;

use params::*;
use crate::{OpenStore, ProvenanceApi, SqliteStore, StoreConfig};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ok_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    match serde_json::to_string_pretty(value) {
        Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
        Err(e) => err_text(format!("failed to encode result: {}", e)),
    }
}

fn err_text(msg: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(msg)]))
}

// ---------------------------------------------------------------------------
// ProvStoreMcpServer
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ProvStoreMcpServer {
    store: Arc<SqliteStore>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl ProvStoreMcpServer {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self {
            store,
            tool_router: Self::tool_router(),
        }
    }

    fn api(&self) -> ProvenanceApi<'_> {
        ProvenanceApi::new(&self.store)
    }

    // ── Node tools ──────────────────────────────────────────────────────

    #[tool(description = "Register a provenance node (entity, activity or agent). Returns the existing node if the label is already registered")]
    fn register_node(
        &self,
        Parameters(p): Parameters<RegisterNodeParams>,
    ) -> Result<CallToolResult, McpError> {
        let node = match p.into_new_node() {
            Ok(node) => node,
            Err(e) => return err_text(e.to_string()),
        };
        match self.api().register_node(&node) {
            Ok(stored) => ok_json(&stored),
            Err(e) => err_text(e.to_string()),
        }
    }

    #[tool(description = "Get a provenance node by label")]
    fn get_node(
        &self,
        Parameters(p): Parameters<GetNodeParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.api().get_node(&p.label) {
            Ok(node) => ok_json(&node),
            Err(e) => err_text(e.to_string()),
        }
    }

    // ── Relation tools ──────────────────────────────────────────────────

    #[tool(description = "Record a relation between two registered nodes under a run id")]
    fn link_relation(
        &self,
        Parameters(p): Parameters<LinkRelationParams>,
    ) -> Result<CallToolResult, McpError> {
        let relation = match p.relation.into_new_relation() {
            Ok(relation) => relation,
            Err(e) => return err_text(e.to_string()),
        };
        match self.api().link(&p.run_id, &relation) {
            Ok(stored) => ok_json(&stored),
            Err(e) => err_text(e.to_string()),
        }
    }

    #[tool(description = "List the relations recorded for a run, oldest first")]
    fn list_relations(
        &self,
        Parameters(p): Parameters<ListRelationsParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.api().relations_for_run(&p.run_id) {
            Ok(relations) => ok_json(&relations),
            Err(e) => err_text(e.to_string()),
        }
    }

    // ── Batch tools ─────────────────────────────────────────────────────

    #[tool(description = "Atomically register nodes and record relations under one run id. Nothing is stored if any relation references an unknown label")]
    fn ingest_provenance(
        &self,
        Parameters(p): Parameters<IngestParams>,
    ) -> Result<CallToolResult, McpError> {
        let (run_id, nodes, relations) = match p.into_batch() {
            Ok(batch) => batch,
            Err(e) => return err_text(e.to_string()),
        };
        match self.api().ingest(&run_id, &nodes, &relations) {
            Ok(created) => ok_json(&serde_json::json!({ "relations": created })),
            Err(e) => err_text(e.to_string()),
        }
    }
}

#[tool_handler]
impl ServerHandler for ProvStoreMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "provstore MCP server for PROV provenance nodes and run-scoped relations".into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run_mcp_server(db_path: PathBuf, config: &StoreConfig) -> i32 {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "failed to create tokio runtime");
            return 1;
        }
    };

    rt.block_on(async {
        let store = match SqliteStore::open_with_config(&db_path, config) {
            Ok(s) => Arc::new(s),
            Err(e) => {
                tracing::error!(path = %db_path.display(), error = %e, "failed to open database");
                return 1;
            }
        };

        let server = ProvStoreMcpServer::new(store);

        tracing::info!(path = %db_path.display(), "provstore mcp server starting on stdio");

        let service = match server.serve(rmcp::transport::stdio()).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "failed to start MCP server");
                return 1;
            }
        };

        if let Err(e) = service.waiting().await {
            tracing::error!(error = %e, "MCP server error");
            return 1;
        }

        0
    })
}

/// In-memory server, for embedding and tests
pub fn in_memory_server() -> Result<ProvStoreMcpServer, crate::StorageError> {
    Ok(ProvStoreMcpServer::new(Arc::new(SqliteStore::open_in_memory()?)))
}
