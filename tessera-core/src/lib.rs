//! Tessera core library: configuration, graph store, scanner, watcher, and the indexing pipeline.
//!
//! The main entry point is [`pipeline::IndexPipeline`], which extracts every
//! workspace file with `tessera-graphs` and persists symbols and their
//! references through a [`store::GraphStore`].

pub mod config;
pub mod error;
pub mod ignore;
pub mod pipeline;
pub mod progress;
pub mod scan;
pub mod store;
pub mod types;
pub mod watch;

pub use config::TesseraConfig;
pub use error::{Result, TesseraError};
pub use pipeline::{IndexPipeline, PendingEdges, PipelineEvent};
pub use store::{GraphStore, SqliteStore};
pub use types::{Edge, EdgeKind, IndexStats, NodeId, SourceFile, SymbolNode};
