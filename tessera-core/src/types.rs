use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use tessera_graphs::{ByteRange, SymbolKind};

// ── Typed ID wrappers ──────────────────────────────────────────────

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

typed_id!(NodeId);
typed_id!(EdgeId);

// ── Files and symbols ──────────────────────────────────────────────

/// A tracked source file, identified by its workspace-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// `/`-separated path relative to the workspace root.
    pub path: String,
    pub language: String,
    /// Hex SHA-256 of the BOM-stripped content.
    pub hash: String,
    pub size: u64,
    pub indexed_at: DateTime<Utc>,
}

/// A persisted declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolNode {
    pub id: NodeId,
    pub kind: SymbolKind,
    pub name: String,
    pub fqname: String,
    /// Owning file path.
    pub path: String,
    pub range: ByteRange,
}

impl SymbolNode {
    /// `name == target`, `fqname == target`, or `fqname` ends in `.target`.
    pub fn matches_reference(&self, target: &str) -> bool {
        if self.name == target || self.fqname == target {
            return true;
        }
        self.fqname
            .strip_suffix(target)
            .is_some_and(|prefix| prefix.ends_with('.'))
    }
}

// ── Edges ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Imports,
    Calls,
}

impl EdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Imports => "imports",
            Self::Calls => "calls",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "imports" => Some(Self::Imports),
            "calls" => Some(Self::Calls),
            _ => None,
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed reference between two symbol nodes. Never deduplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub kind: EdgeKind,
    pub source: NodeId,
    pub target: NodeId,
    pub weight: f64,
    pub created_at: DateTime<Utc>,
}

// ── Statistics ─────────────────────────────────────────────────────

/// Aggregate counters for one indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub files_seen: u64,
    /// Files whose hash changed and were committed.
    pub indexed: u64,
    pub unchanged: u64,
    /// Ignored, oversized, unreadable, or binary files.
    pub skipped: u64,
    /// Files whose transaction was rolled back.
    pub failed: u64,
    /// Files recovered by the regex fallback.
    pub fallback: u64,
    pub nodes_created: u64,
    pub import_edges: u64,
    pub call_edges: u64,
    pub unresolved_imports: u64,
    pub unresolved_calls: u64,
    pub duration: Duration,
}

impl IndexStats {
    pub fn edges_created(&self) -> u64 {
        self.import_edges + self.call_edges
    }

    /// Fold another run's counters into this one.
    pub fn merge(&mut self, other: &IndexStats) {
        self.files_seen += other.files_seen;
        self.indexed += other.indexed;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.fallback += other.fallback;
        self.nodes_created += other.nodes_created;
        self.import_edges += other.import_edges;
        self.call_edges += other.call_edges;
        self.unresolved_imports += other.unresolved_imports;
        self.unresolved_calls += other.unresolved_calls;
        self.duration += other.duration;
    }
}

/// Aggregate statistics about the graph store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_files: u64,
    pub total_nodes: u64,
    pub total_edges: u64,
    /// Node count broken down by `SymbolKind`.
    pub nodes_by_kind: HashMap<String, u64>,
    /// Edge count broken down by `EdgeKind`.
    pub edges_by_kind: HashMap<String, u64>,
    /// Database file size in bytes (0 for in-memory stores).
    pub db_size_bytes: u64,
}

// ── In-memory graph ────────────────────────────────────────────────

/// A petgraph view over stored nodes and edges.
#[derive(Debug)]
pub struct GraphView {
    pub graph: DiGraph<NodeId, EdgeKind>,
    pub node_to_index: HashMap<NodeId, NodeIndex>,
    nodes: HashMap<NodeId, SymbolNode>,
}

impl GraphView {
    /// Build from nodes and edges. Edges with a missing endpoint are skipped.
    pub fn from_parts(nodes: Vec<SymbolNode>, edges: &[Edge]) -> Self {
        let mut graph = DiGraph::<NodeId, EdgeKind>::with_capacity(nodes.len(), edges.len());
        let mut node_to_index = HashMap::with_capacity(nodes.len());
        let mut by_id = HashMap::with_capacity(nodes.len());

        for node in nodes {
            let idx = graph.add_node(node.id);
            node_to_index.insert(node.id, idx);
            by_id.insert(node.id, node);
        }

        for edge in edges {
            if let (Some(&src), Some(&dst)) =
                (node_to_index.get(&edge.source), node_to_index.get(&edge.target))
            {
                graph.add_edge(src, dst, edge.kind);
            }
        }

        Self {
            graph,
            node_to_index,
            nodes: by_id,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, id: NodeId) -> Option<&SymbolNode> {
        self.nodes.get(&id)
    }

    /// Number of incoming edges to `id`.
    pub fn in_degree(&self, id: NodeId) -> usize {
        self.node_to_index.get(&id).map_or(0, |&idx| {
            self.graph.edges_directed(idx, Direction::Incoming).count()
        })
    }

    /// Nodes ordered by incoming edge count, highest first, ties by fqname.
    pub fn most_referenced(&self, limit: usize) -> Vec<(&SymbolNode, usize)> {
        let mut ranked: Vec<(&SymbolNode, usize)> = self
            .graph
            .node_indices()
            .filter_map(|idx| {
                let node = self.nodes.get(&self.graph[idx])?;
                let incoming = self.graph.edges_directed(idx, Direction::Incoming).count();
                (incoming > 0).then_some((node, incoming))
            })
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.fqname.cmp(&b.0.fqname)));
        ranked.truncate(limit);
        ranked
    }
}
