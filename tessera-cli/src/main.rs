use std::process::ExitCode;

use clap::Parser;
use tessera_core::TesseraError;
use tessera_core::error::{ConfigError, StoreError};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "tessera",
    version,
    about = "Index a source tree into a symbol-level dependency graph"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// How the process ends. The discriminant is the exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success = 0,
    Failure = 1,
    BadConfig = 2,
    NoWorkspace = 3,
    Database = 4,
}

/// Message fragments for errors that carry no typed cause, checked in order.
const MESSAGE_RULES: &[(&str, Outcome)] = &[
    ("not initialized", Outcome::NoWorkspace),
    ("cannot resolve path", Outcome::NoWorkspace),
    ("config", Outcome::BadConfig),
    ("database", Outcome::Database),
    ("sqlite", Outcome::Database),
];

impl Outcome {
    fn of(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            match cause.downcast_ref::<TesseraError>() {
                Some(TesseraError::Config(_)) => return Self::BadConfig,
                Some(TesseraError::Store(_)) => return Self::Database,
                _ => {}
            }
            if cause.is::<ConfigError>() {
                return Self::BadConfig;
            }
            if cause.is::<StoreError>() {
                return Self::Database;
            }
        }

        let text = format!("{err:#}").to_lowercase();
        MESSAGE_RULES
            .iter()
            .find(|(fragment, _)| text.contains(fragment))
            .map_or(Self::Failure, |&(_, outcome)| outcome)
    }
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        ExitCode::from(outcome as u8)
    }
}

fn init_tracing(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error"
    } else {
        ["warn", "info", "debug"]
            .get(usize::from(verbose))
            .copied()
            .unwrap_or("trace")
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(verbose > 1)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: Failed to create runtime: {e}");
            return Outcome::Failure.into();
        }
    };

    let outcome = match runtime.block_on(commands::run(cli.command, cli.quiet)) {
        Ok(()) => Outcome::Success,
        Err(e) => {
            eprintln!("Error: {e:#}");
            Outcome::of(&e)
        }
    };
    outcome.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn missing_workspace_is_3() {
        let err = anyhow::anyhow!("Tessera is not initialized in /foo. Run `tessera init` first.");
        assert_eq!(Outcome::of(&err), Outcome::NoWorkspace);
        let err = anyhow::anyhow!("Cannot resolve path: /nonexistent");
        assert_eq!(Outcome::of(&err), Outcome::NoWorkspace);
    }

    #[test]
    fn typed_config_error_is_2_under_context() {
        let err = anyhow::Error::new(ConfigError::Parse("expected `]`".into())).context("Cannot load");
        assert_eq!(Outcome::of(&err), Outcome::BadConfig);

        let wrapped: Result<(), TesseraError> =
            Err(TesseraError::Config(ConfigError::Invalid("batch_size is 0".into())));
        let err = wrapped.context("Indexing failed").unwrap_err();
        assert_eq!(Outcome::of(&err), Outcome::BadConfig);
    }

    #[test]
    fn store_errors_are_4() {
        let err = anyhow::Error::new(StoreError::TransactionState("no open transaction".into()))
            .context("Indexing failed");
        assert_eq!(Outcome::of(&err), Outcome::Database);
        let err = anyhow::anyhow!("Cannot open database: /foo/.tessera/graph.db");
        assert_eq!(Outcome::of(&err), Outcome::Database);
    }

    #[test]
    fn anything_else_is_1() {
        let err = anyhow::anyhow!("Something unexpected happened");
        assert_eq!(Outcome::of(&err), Outcome::Failure);
        assert_eq!(Outcome::Failure as u8, 1);
    }
}
