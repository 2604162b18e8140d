use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use tessera_core::config::{LanguageConfig, TesseraConfig};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Workspace root (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Comma-separated list of languages to index (default: all)
    #[arg(long)]
    pub languages: Option<String>,

    /// Custom database location
    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// Overwrite an existing config
    #[arg(long)]
    pub force: bool,

    /// Write the config without building the index
    #[arg(long)]
    pub no_index: bool,
}

pub async fn run(args: InitArgs, quiet: bool) -> anyhow::Result<()> {
    let root = super::canonical_root(&args.path)?;
    let config_path = TesseraConfig::path_for(&root);
    if config_path.exists() && !args.force {
        anyhow::bail!(
            "Config already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let mut config = TesseraConfig::default();
    if let Some(languages) = &args.languages {
        let ids: Vec<String> = languages
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        config.index.languages = LanguageConfig::Explicit(ids);
    }
    if let Some(db_path) = args.db_path {
        config.store.path = db_path;
    }
    config.validate().context("Invalid config")?;
    let written = config.save(&root).context("Cannot write config")?;
    if !quiet {
        println!("Wrote {}", written.display());
    }

    if args.no_index {
        return Ok(());
    }

    let workspace = super::Workspace::open(&root)?;
    let pipeline = workspace.pipeline(quiet)?;
    let stats = pipeline.full_index().await.context("Indexing failed")?;
    if !quiet {
        super::print_index_summary(&stats);
    }
    Ok(())
}
