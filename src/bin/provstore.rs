//! provstore CLI: provenance store with MCP server.
//!
//! Usage:
//!   provstore mcp [--db path] [--config file]
//!   provstore node <register|get> ...
//!   provstore relation <link|list> ...
//!   provstore ingest <file|->

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use provstore::{
    Metadata, NewNode, NewRelation, NodeType, ProvenanceApi, ProvenanceRecord, SqliteStore,
    StoreConfig, Verb,
};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "provstore", version, about = "PROV provenance store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP (Model Context Protocol) server on stdio
    Mcp,
    /// Register and look up nodes
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
    /// Record and list relations
    Relation {
        #[command(subcommand)]
        action: RelationAction,
    },
    /// Ingest a JSON provenance record (nodes + relations) atomically
    Ingest {
        /// Path to the record, or `-` for stdin
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum NodeAction {
    /// Register a node (returns the existing node if the label is taken)
    Register {
        label: String,
        /// entity, activity or agent
        node_type: NodeType,
        #[arg(long, default_value = "")]
        description: String,
        /// Metadata as a JSON object
        #[arg(long)]
        metadata: Option<String>,
    },
    /// Show a node by label
    Get { label: String },
}

#[derive(Subcommand)]
enum RelationAction {
    /// Record a relation between two registered nodes
    Link {
        #[arg(long)]
        run_id: String,
        subject: String,
        verb: Verb,
        object: String,
        /// RFC 3339 start time
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        /// RFC 3339 end time
        #[arg(long)]
        end: Option<DateTime<Utc>>,
        /// Metadata as a JSON object
        #[arg(long)]
        metadata: Option<String>,
    },
    /// List relations for a run, oldest first
    List { run_id: String },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    // stdout carries command output and the MCP stdio transport
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<StoreConfig, String> {
    match path {
        Some(p) => StoreConfig::load(p).map_err(|e| format!("Failed to load config {}: {}", p.display(), e)),
        None => Ok(StoreConfig::default()),
    }
}

fn parse_metadata(raw: Option<&str>) -> Result<Metadata, String> {
    match raw {
        Some(text) => serde_json::from_str(text).map_err(|e| format!("invalid metadata JSON: {}", e)),
        None => Ok(Metadata::new()),
    }
}

fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_node(api: &ProvenanceApi<'_>, action: NodeAction) -> i32 {
    let result = match action {
        NodeAction::Register { label, node_type, description, metadata } => {
            let metadata = match parse_metadata(metadata.as_deref()) {
                Ok(m) => m,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return 1;
                }
            };
            let mut node = NewNode::new(label, node_type).with_description(description);
            node.metadata = metadata;
            api.register_node(&node)
        }
        NodeAction::Get { label } => api.get_node(&label),
    };
    match result {
        Ok(node) => print_json(&node),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_relation(api: &ProvenanceApi<'_>, action: RelationAction) -> i32 {
    match action {
        RelationAction::Link { run_id, subject, verb, object, start, end, metadata } => {
            let metadata = match parse_metadata(metadata.as_deref()) {
                Ok(m) => m,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return 1;
                }
            };
            let mut relation = NewRelation::new(subject, verb, object).with_times(start, end);
            relation.metadata = metadata;
            match api.link(&run_id, &relation) {
                Ok(stored) => print_json(&stored),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    1
                }
            }
        }
        RelationAction::List { run_id } => match api.relations_for_run(&run_id) {
            Ok(relations) => print_json(&relations),
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
    }
}

fn read_record(file: &PathBuf) -> Result<ProvenanceRecord, String> {
    let mut text = String::new();
    if file.as_os_str() == "-" {
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| format!("cannot read stdin: {}", e))?;
    } else {
        text = std::fs::read_to_string(file)
            .map_err(|e| format!("cannot read '{}': {}", file.display(), e))?;
    }
    serde_json::from_str(&text).map_err(|e| format!("invalid provenance record: {}", e))
}

fn cmd_ingest(api: &ProvenanceApi<'_>, file: &PathBuf) -> i32 {
    let record = match read_record(file) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    match api.ingest_record(&record) {
        Ok(created) => print_json(&serde_json::json!({ "relations": created })),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match load_config(cli.config.as_ref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let db_path = config.resolve_db_path(cli.db);

    if let Commands::Mcp = cli.command {
        std::process::exit(provstore::mcp::run_mcp_server(db_path, &config));
    }

    let store = match SqliteStore::open_with_config(&db_path, &config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: Failed to open database {}: {}", db_path.display(), e);
            std::process::exit(1);
        }
    };
    let api = ProvenanceApi::new(&store);

    let code = match cli.command {
        Commands::Mcp => 0,
        Commands::Node { action } => cmd_node(&api, action),
        Commands::Relation { action } => cmd_relation(&api, action),
        Commands::Ingest { file } => cmd_ingest(&api, &file),
    };
    std::process::exit(code);
}
