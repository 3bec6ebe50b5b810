//! kgraph CLI - index a directory into a code knowledge graph and query it.
//!
//! Usage:
//!   kgraph index                       # Index and print the run report
//!   kgraph stats                       # Graph statistics
//!   kgraph search <query>              # Search names and docs
//!   kgraph impact <node-id> -d 3       # What a change may affect
//!   kgraph path <start-id> <end-id>    # Shortest path
//!
//! Logs go to stderr (`RUST_LOG`, default `info`); results are JSON on stdout.

use clap::Parser;
use kgraph::cli::{run, Cli};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
