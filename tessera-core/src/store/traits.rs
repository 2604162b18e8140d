use tessera_graphs::Symbol;

use crate::types::{
    Edge, EdgeId, EdgeKind, GraphView, NodeId, SourceFile, StoreStats, SymbolNode,
};

/// The graph store abstraction. The indexing pipeline reads and writes through this trait.
#[async_trait::async_trait]
pub trait GraphStore: Send + Sync {
    // ── Files ──────────────────────────────────────────────────────

    /// Insert or replace the record for `file.path`.
    async fn upsert_file(&self, file: &SourceFile) -> crate::error::Result<()>;

    async fn get_file_by_path(&self, path: &str) -> crate::error::Result<Option<SourceFile>>;

    /// Remove a file record. Returns whether a row existed.
    async fn delete_file(&self, path: &str) -> crate::error::Result<bool>;

    /// All tracked files, ordered by path.
    async fn get_all_files(&self) -> crate::error::Result<Vec<SourceFile>>;

    // ── Nodes ──────────────────────────────────────────────────────

    /// Insert a symbol owned by `path`. Returns the new node's ID.
    async fn insert_node(&self, path: &str, symbol: &Symbol) -> crate::error::Result<NodeId>;

    /// Delete every node owned by `path`. Returns the number removed.
    async fn delete_nodes_by_path(&self, path: &str) -> crate::error::Result<u64>;

    /// Nodes owned by `path` in insertion order.
    async fn get_nodes_by_path(&self, path: &str) -> crate::error::Result<Vec<SymbolNode>>;

    /// Every node in insertion order.
    async fn get_all_nodes(&self) -> crate::error::Result<Vec<SymbolNode>>;

    // ── Edges ──────────────────────────────────────────────────────

    /// Insert an edge with the default weight. Never deduplicates.
    async fn insert_edge(
        &self,
        kind: EdgeKind,
        source: NodeId,
        target: NodeId,
    ) -> crate::error::Result<EdgeId>;

    async fn get_all_edges(&self) -> crate::error::Result<Vec<Edge>>;

    // ── Checkpoints ────────────────────────────────────────────────

    /// Get a stored metadata value.
    async fn get_checkpoint(&self, kind: &str) -> crate::error::Result<Option<String>>;

    /// Set a stored metadata value.
    async fn set_checkpoint(&self, kind: &str, value: &str) -> crate::error::Result<()>;

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Delete all files, nodes, and edges.
    async fn clear_index(&self) -> crate::error::Result<()>;

    /// Flush pending writes to durable storage. Default: no-op.
    async fn save(&self) -> crate::error::Result<()> {
        Ok(())
    }

    // ── Transactions ──────────────────────────────────────────────

    /// Begin an explicit transaction. Operations between begin and commit
    /// are executed atomically. Default: no-op (each operation auto-commits).
    async fn begin_transaction(&self) -> crate::error::Result<()> {
        Ok(())
    }

    /// Commit the current transaction started by `begin_transaction`.
    async fn commit_transaction(&self) -> crate::error::Result<()> {
        Ok(())
    }

    /// Roll back the current transaction started by `begin_transaction`.
    async fn rollback_transaction(&self) -> crate::error::Result<()> {
        Ok(())
    }

    // ── Metrics ────────────────────────────────────────────────────

    /// Get summary statistics about the store.
    async fn stats(&self) -> crate::error::Result<StoreStats>;

    // ── Graph loading ──────────────────────────────────────────────

    /// Load all nodes and edges into a petgraph view.
    async fn load_graph(&self) -> crate::error::Result<GraphView> {
        let nodes = self.get_all_nodes().await?;
        let edges = self.get_all_edges().await?;
        Ok(GraphView::from_parts(nodes, &edges))
    }
}
