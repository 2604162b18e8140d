pub mod graph;
pub mod index;
pub mod init;
pub mod status;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Subcommand;

use tessera_core::config::{TESSERA_DIR, TesseraConfig};
use tessera_core::progress::{BarProgress, IndexProgress, Silent};
use tessera_core::store::{GraphStore, SqliteStore};
use tessera_core::{IndexPipeline, IndexStats};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create `.tessera/config.toml` and build the initial index
    Init(init::InitArgs),
    /// Rebuild the index, or reindex specific files
    Index(index::IndexArgs),
    /// Index, then keep the graph fresh as files change
    Watch(watch::WatchArgs),
    /// Show what the index currently holds
    Status(status::StatusArgs),
    /// List the most-referenced symbols
    Graph(graph::GraphArgs),
}

pub async fn run(cmd: Command, quiet: bool) -> anyhow::Result<()> {
    match cmd {
        Command::Init(args) => init::run(args, quiet).await,
        Command::Index(args) => index::run(args, quiet).await,
        Command::Watch(args) => watch::run(args, quiet).await,
        Command::Status(args) => status::run(args).await,
        Command::Graph(args) => graph::run(args).await,
    }
}

/// An initialized workspace: canonical root plus its loaded config.
#[derive(Debug)]
pub struct Workspace {
    pub root: PathBuf,
    pub config: TesseraConfig,
}

impl Workspace {
    /// Resolve `path` and load its config. Fails if `tessera init` has not run.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let root = canonical_root(path)?;
        if !root.join(TESSERA_DIR).exists() {
            anyhow::bail!(
                "Tessera is not initialized in {}. Run `tessera init` first.",
                root.display()
            );
        }
        let config = TesseraConfig::load(&root).context("Cannot load config")?;
        Ok(Self { root, config })
    }

    pub fn db_path(&self) -> PathBuf {
        self.config.db_path(&self.root)
    }

    /// Open the store, requiring the database to exist already.
    pub fn existing_store(&self) -> anyhow::Result<SqliteStore> {
        let db_path = self.db_path();
        if !db_path.exists() {
            anyhow::bail!(
                "Database not found: {}. Run `tessera index` first.",
                db_path.display()
            );
        }
        self.open_store()
    }

    pub fn open_store(&self) -> anyhow::Result<SqliteStore> {
        let db_path = self.db_path();
        SqliteStore::open(&db_path)
            .with_context(|| format!("Cannot open database: {}", db_path.display()))
    }

    pub fn pipeline(&self, quiet: bool) -> anyhow::Result<IndexPipeline> {
        let store: Arc<dyn GraphStore> = Arc::new(self.open_store()?);
        let progress: Arc<dyn IndexProgress> = if quiet {
            Arc::new(Silent)
        } else {
            Arc::new(BarProgress::stderr())
        };
        let pipeline = IndexPipeline::new(&self.root, self.config.clone(), store)
            .context("Cannot load ignore rules")?
            .with_progress(progress);
        Ok(pipeline)
    }
}

pub fn canonical_root(path: &Path) -> anyhow::Result<PathBuf> {
    std::fs::canonicalize(path).with_context(|| format!("Cannot resolve path: {}", path.display()))
}

pub fn print_index_summary(stats: &IndexStats) {
    println!(
        "Indexed {} of {} files in {}",
        stats.indexed,
        stats.files_seen,
        indicatif::HumanDuration(stats.duration)
    );
    println!(
        "  unchanged {}, skipped {}, failed {}, fallback {}",
        stats.unchanged, stats.skipped, stats.failed, stats.fallback
    );
    println!(
        "  {} symbols, {} import edges, {} call edges",
        stats.nodes_created, stats.import_edges, stats.call_edges
    );
    if stats.unresolved_imports + stats.unresolved_calls > 0 {
        println!(
            "  unresolved: {} imports, {} calls",
            stats.unresolved_imports, stats.unresolved_calls
        );
    }
}
