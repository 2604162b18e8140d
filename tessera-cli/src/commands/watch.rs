use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use tokio::sync::broadcast::error::RecvError;

use tessera_core::PipelineEvent;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Workspace root (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Debounce window in milliseconds (overrides config)
    #[arg(long)]
    pub debounce_ms: Option<u64>,
}

pub async fn run(args: WatchArgs, quiet: bool) -> anyhow::Result<()> {
    let mut workspace = super::Workspace::open(&args.path)?;
    workspace.config.watch.enabled = true;
    if let Some(ms) = args.debounce_ms {
        workspace.config.watch.debounce_ms = ms;
    }

    let pipeline = Arc::new(workspace.pipeline(quiet)?);
    let mut events = pipeline.subscribe();
    let stats = pipeline.start().await.context("Indexing failed")?;
    if !quiet {
        super::print_index_summary(&stats);
        println!("Watching {} (Ctrl-C to stop)", workspace.root.display());
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => report(&event, quiet),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Dropped pipeline events");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    pipeline.stop();
    pipeline.store().save().await.context("Cannot flush database")?;
    Ok(())
}

fn report(event: &PipelineEvent, quiet: bool) {
    match event {
        PipelineEvent::Failed { operation, message } => {
            eprintln!("{operation} failed: {message}");
        }
        _ if quiet => {}
        PipelineEvent::FileIndexed { path } => println!("indexed {path}"),
        PipelineEvent::FileRemoved { path } => println!("removed {path}"),
        PipelineEvent::IndexStarted | PipelineEvent::IndexCompleted(_) => {}
    }
}
