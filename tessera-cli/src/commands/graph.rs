use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use tessera_core::store::GraphStore;

#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Workspace root (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Number of symbols to list
    #[arg(long, default_value_t = 20)]
    pub top: usize,
}

pub async fn run(args: GraphArgs) -> anyhow::Result<()> {
    let workspace = super::Workspace::open(&args.path)?;
    let store = workspace.existing_store()?;
    let view = store.load_graph().await.context("Failed to load graph from database")?;

    println!(
        "{} symbols, {} edges",
        view.node_count(),
        view.edge_count()
    );
    let ranked = view.most_referenced(args.top);
    if ranked.is_empty() {
        println!("No references recorded.");
        return Ok(());
    }

    println!();
    println!("  {:>5}  {:<12} {:<40} PATH", "REFS", "KIND", "SYMBOL");
    for (node, refs) in ranked {
        println!(
            "  {refs:>5}  {:<12} {:<40} {}",
            node.kind.as_str(),
            node.fqname,
            node.path
        );
    }
    Ok(())
}
