use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use tessera_core::pipeline::{LAST_INDEX_AT_KEY, last_index_stats};
use tessera_core::store::GraphStore;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Workspace root (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: StatusArgs) -> anyhow::Result<()> {
    let workspace = super::Workspace::open(&args.path)?;
    let store = workspace.existing_store()?;

    let stats = store.stats().await.context("Failed to read database stats")?;
    let last_run = last_index_stats(&store)
        .await
        .context("Failed to read last index stats")?;
    let last_at = store.get_checkpoint(LAST_INDEX_AT_KEY).await?;

    if args.json {
        let value = serde_json::json!({
            "root": workspace.root,
            "database": workspace.db_path(),
            "store": stats,
            "last_index": last_run,
            "last_index_at": last_at,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Tessera status for {}", workspace.root.display());
    println!();
    println!("  Database: {}", workspace.db_path().display());
    if stats.db_size_bytes > 0 {
        println!("  Size:     {}", format_bytes(stats.db_size_bytes));
    }
    println!();

    println!("  Files: {}", stats.total_files);
    println!();

    println!("  Symbols: {} total", stats.total_nodes);
    let mut kinds: Vec<_> = stats.nodes_by_kind.iter().collect();
    kinds.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (kind, count) in &kinds {
        println!("    {kind:<20} {count:>6}");
    }
    println!();

    println!("  Edges: {} total", stats.total_edges);
    let mut kinds: Vec<_> = stats.edges_by_kind.iter().collect();
    kinds.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (kind, count) in &kinds {
        println!("    {kind:<20} {count:>6}");
    }
    println!();

    match (last_at, last_run) {
        (Some(at), Some(run)) => {
            println!("  Last full index: {at}");
            println!(
                "    {} files indexed, {} skipped, {} failed, {} via fallback",
                run.indexed, run.skipped, run.failed, run.fallback
            );
            println!(
                "    {} unresolved imports, {} unresolved calls",
                run.unresolved_imports, run.unresolved_calls
            );
        }
        _ => println!("  Last full index: (none)"),
    }

    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
