//! Plexus Hybrid CLI — hybrid retrieval engine with an MCP server.
//!
//! Usage:
//!   plexus-hybrid mcp [--transport stdio] [--db path]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "plexus-hybrid", version, about = "Hybrid retrieval engine and temporal knowledge graph")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP (Model Context Protocol) server
    Mcp {
        /// Transport type (currently only stdio)
        #[arg(long, default_value = "stdio")]
        transport: String,
        /// Path to SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Mcp { transport, db } => {
            if transport != "stdio" {
                eprintln!("error: only 'stdio' transport is currently supported");
                std::process::exit(1);
            }
            let code = plexus_hybrid::mcp::run_mcp_server(db);
            std::process::exit(code);
        }
    }
}
