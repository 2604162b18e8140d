use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Workspace root (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Reindex only these files (relative to the workspace root)
    #[arg(long, num_args = 1..)]
    pub files: Vec<PathBuf>,
}

pub async fn run(args: IndexArgs, quiet: bool) -> anyhow::Result<()> {
    let workspace = super::Workspace::open(&args.path)?;
    let pipeline = workspace.pipeline(quiet)?;

    let stats = if args.files.is_empty() {
        pipeline.full_index().await.context("Indexing failed")?
    } else {
        pipeline
            .index_files(&args.files)
            .await
            .context("Indexing failed")?
    };

    if !quiet {
        super::print_index_summary(&stats);
    }
    Ok(())
}
