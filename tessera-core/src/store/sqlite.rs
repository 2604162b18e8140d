use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tessera_graphs::{ByteRange, Symbol, SymbolKind};

use crate::error::{StoreError, TesseraError};
use crate::types::{Edge, EdgeId, EdgeKind, NodeId, SourceFile, StoreStats, SymbolNode};

use super::GraphStore;
use super::schema;

/// SQLite-backed implementation of `GraphStore`.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn open(path: &Path) -> crate::error::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(crate::error::IndexError::Io)?;
        }
        let conn = Connection::open(path).map_err(StoreError::Sqlite)?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(path.to_path_buf()),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> crate::error::Result<Self> {
        let conn = Connection::open_in_memory().map_err(StoreError::Sqlite)?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        store.initialize()?;
        Ok(store)
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn initialize(&self) -> crate::error::Result<()> {
        let conn = self.conn.lock().expect("tessera store mutex poisoned");

        conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;",
        )
        .map_err(StoreError::Sqlite)?;

        // Silently ignored for in-memory databases
        let _ = conn.execute_batch("PRAGMA journal_mode = WAL;");

        conn.execute_batch(schema::SCHEMA_SQL)
            .map_err(StoreError::Sqlite)?;

        conn.execute(
            "INSERT OR IGNORE INTO tessera_meta (key, value) VALUES ('schema_version', ?1)",
            params![schema::SCHEMA_VERSION],
        )
        .map_err(StoreError::Sqlite)?;

        Ok(())
    }
}

// ── Row mapping ────────────────────────────────────────────────────

fn to_sql_int<T: TryInto<i64>>(value: T) -> i64 {
    value.try_into().unwrap_or(i64::MAX)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidRow(format!("bad timestamp `{raw}`: {e}")))
}

struct RawNode {
    id: i64,
    path: String,
    kind: String,
    name: String,
    fqname: String,
    start: i64,
    end: i64,
}

const NODE_COLUMNS: &str = "id, path, kind, name, fqname, start_byte, end_byte";

fn read_node(row: &Row<'_>) -> rusqlite::Result<RawNode> {
    Ok(RawNode {
        id: row.get(0)?,
        path: row.get(1)?,
        kind: row.get(2)?,
        name: row.get(3)?,
        fqname: row.get(4)?,
        start: row.get(5)?,
        end: row.get(6)?,
    })
}

impl TryFrom<RawNode> for SymbolNode {
    type Error = StoreError;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let kind = SymbolKind::parse(&raw.kind)
            .ok_or_else(|| StoreError::InvalidRow(format!("unknown symbol kind `{}`", raw.kind)))?;
        let start = usize::try_from(raw.start)
            .map_err(|_| StoreError::InvalidRow(format!("negative start byte {}", raw.start)))?;
        let end = usize::try_from(raw.end)
            .map_err(|_| StoreError::InvalidRow(format!("negative end byte {}", raw.end)))?;
        Ok(Self {
            id: NodeId(raw.id),
            kind,
            name: raw.name,
            fqname: raw.fqname,
            path: raw.path,
            range: ByteRange::new(start, end),
        })
    }
}

fn collect_nodes(raw: Vec<RawNode>) -> crate::error::Result<Vec<SymbolNode>> {
    raw.into_iter()
        .map(|r| SymbolNode::try_from(r).map_err(TesseraError::Store))
        .collect()
}

fn read_file(row: &Row<'_>) -> rusqlite::Result<(String, String, String, i64, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn file_from_raw(raw: (String, String, String, i64, String)) -> Result<SourceFile, StoreError> {
    let (path, language, hash, size, indexed_at) = raw;
    Ok(SourceFile {
        path,
        language,
        hash,
        size: u64::try_from(size).unwrap_or(0),
        indexed_at: parse_timestamp(&indexed_at)?,
    })
}

#[async_trait::async_trait]
impl GraphStore for SqliteStore {
    // ── Files ──────────────────────────────────────────────────────

    async fn upsert_file(&self, file: &SourceFile) -> crate::error::Result<()> {
        let conn = self.conn.lock().expect("tessera store mutex poisoned");
        conn.execute(
            "INSERT INTO files (path, language, hash, size, indexed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(path) DO UPDATE SET
                language = excluded.language,
                hash = excluded.hash,
                size = excluded.size,
                indexed_at = excluded.indexed_at",
            params![
                file.path,
                file.language,
                file.hash,
                to_sql_int(file.size),
                file.indexed_at.to_rfc3339(),
            ],
        )
        .map_err(StoreError::Sqlite)?;
        Ok(())
    }

    async fn get_file_by_path(&self, path: &str) -> crate::error::Result<Option<SourceFile>> {
        let conn = self.conn.lock().expect("tessera store mutex poisoned");
        let raw = conn
            .query_row(
                "SELECT path, language, hash, size, indexed_at FROM files WHERE path = ?1",
                params![path],
                read_file,
            )
            .optional()
            .map_err(StoreError::Sqlite)?;
        Ok(raw.map(file_from_raw).transpose()?)
    }

    async fn delete_file(&self, path: &str) -> crate::error::Result<bool> {
        let conn = self.conn.lock().expect("tessera store mutex poisoned");
        let removed = conn
            .execute("DELETE FROM files WHERE path = ?1", params![path])
            .map_err(StoreError::Sqlite)?;
        Ok(removed > 0)
    }

    async fn get_all_files(&self) -> crate::error::Result<Vec<SourceFile>> {
        let conn = self.conn.lock().expect("tessera store mutex poisoned");
        let mut stmt = conn
            .prepare("SELECT path, language, hash, size, indexed_at FROM files ORDER BY path")
            .map_err(StoreError::Sqlite)?;
        let raw = stmt
            .query_map([], read_file)
            .map_err(StoreError::Sqlite)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::Sqlite)?;
        raw.into_iter()
            .map(|r| file_from_raw(r).map_err(TesseraError::Store))
            .collect()
    }

    // ── Nodes ──────────────────────────────────────────────────────

    async fn insert_node(&self, path: &str, symbol: &Symbol) -> crate::error::Result<NodeId> {
        let conn = self.conn.lock().expect("tessera store mutex poisoned");
        conn.execute(
            "INSERT INTO nodes (path, kind, name, fqname, start_byte, end_byte)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                path,
                symbol.kind.as_str(),
                symbol.name,
                symbol.fqname,
                to_sql_int(symbol.range.start),
                to_sql_int(symbol.range.end),
            ],
        )
        .map_err(StoreError::Sqlite)?;
        Ok(NodeId(conn.last_insert_rowid()))
    }

    async fn delete_nodes_by_path(&self, path: &str) -> crate::error::Result<u64> {
        let conn = self.conn.lock().expect("tessera store mutex poisoned");
        let removed = conn
            .execute("DELETE FROM nodes WHERE path = ?1", params![path])
            .map_err(StoreError::Sqlite)?;
        Ok(removed as u64)
    }

    async fn get_nodes_by_path(&self, path: &str) -> crate::error::Result<Vec<SymbolNode>> {
        let conn = self.conn.lock().expect("tessera store mutex poisoned");
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {NODE_COLUMNS} FROM nodes WHERE path = ?1 ORDER BY id"
            ))
            .map_err(StoreError::Sqlite)?;
        let raw = stmt
            .query_map(params![path], read_node)
            .map_err(StoreError::Sqlite)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::Sqlite)?;
        collect_nodes(raw)
    }

    async fn get_all_nodes(&self) -> crate::error::Result<Vec<SymbolNode>> {
        let conn = self.conn.lock().expect("tessera store mutex poisoned");
        let mut stmt = conn
            .prepare(&format!("SELECT {NODE_COLUMNS} FROM nodes ORDER BY id"))
            .map_err(StoreError::Sqlite)?;
        let raw = stmt
            .query_map([], read_node)
            .map_err(StoreError::Sqlite)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::Sqlite)?;
        collect_nodes(raw)
    }

    // ── Edges ──────────────────────────────────────────────────────

    async fn insert_edge(
        &self,
        kind: EdgeKind,
        source: NodeId,
        target: NodeId,
    ) -> crate::error::Result<EdgeId> {
        let conn = self.conn.lock().expect("tessera store mutex poisoned");
        conn.execute(
            "INSERT INTO edges (kind, source_id, target_id, weight, created_at)
             VALUES (?1, ?2, ?3, 1.0, ?4)",
            params![kind.as_str(), source.0, target.0, Utc::now().to_rfc3339()],
        )
        .map_err(StoreError::Sqlite)?;
        Ok(EdgeId(conn.last_insert_rowid()))
    }

    async fn get_all_edges(&self) -> crate::error::Result<Vec<Edge>> {
        let conn = self.conn.lock().expect("tessera store mutex poisoned");
        let mut stmt = conn
            .prepare(
                "SELECT id, kind, source_id, target_id, weight, created_at
                 FROM edges ORDER BY id",
            )
            .map_err(StoreError::Sqlite)?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .map_err(StoreError::Sqlite)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::Sqlite)?;

        let mut edges = Vec::with_capacity(raw.len());
        for (id, kind, source, target, weight, created_at) in raw {
            let kind = EdgeKind::parse(&kind)
                .ok_or_else(|| StoreError::InvalidRow(format!("unknown edge kind `{kind}`")))?;
            edges.push(Edge {
                id: EdgeId(id),
                kind,
                source: NodeId(source),
                target: NodeId(target),
                weight,
                created_at: parse_timestamp(&created_at)?,
            });
        }
        Ok(edges)
    }

    // ── Checkpoints ────────────────────────────────────────────────

    async fn get_checkpoint(&self, kind: &str) -> crate::error::Result<Option<String>> {
        let conn = self.conn.lock().expect("tessera store mutex poisoned");
        conn.query_row(
            "SELECT value FROM tessera_meta WHERE key = ?1",
            params![kind],
            |row| row.get(0),
        )
        .optional()
        .map_err(StoreError::Sqlite)
        .map_err(TesseraError::Store)
    }

    async fn set_checkpoint(&self, kind: &str, value: &str) -> crate::error::Result<()> {
        let conn = self.conn.lock().expect("tessera store mutex poisoned");
        conn.execute(
            "INSERT INTO tessera_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![kind, value],
        )
        .map_err(StoreError::Sqlite)?;
        Ok(())
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    async fn clear_index(&self) -> crate::error::Result<()> {
        let conn = self.conn.lock().expect("tessera store mutex poisoned");
        conn.execute_batch(
            "DELETE FROM edges;
             DELETE FROM nodes;
             DELETE FROM files;",
        )
        .map_err(StoreError::Sqlite)?;
        Ok(())
    }

    async fn save(&self) -> crate::error::Result<()> {
        if self.db_path.is_none() {
            return Ok(());
        }
        let conn = self.conn.lock().expect("tessera store mutex poisoned");
        if !conn.is_autocommit() {
            return Err(StoreError::TransactionState(
                "cannot checkpoint inside an open transaction".into(),
            )
            .into());
        }
        // Returns (busy, log frames, checkpointed frames); only success matters.
        conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
            .map_err(StoreError::Sqlite)?;
        Ok(())
    }

    // ── Transactions ──────────────────────────────────────────────

    async fn begin_transaction(&self) -> crate::error::Result<()> {
        let conn = self.conn.lock().expect("tessera store mutex poisoned");
        if !conn.is_autocommit() {
            return Err(StoreError::TransactionState("transaction already active".into()).into());
        }
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(StoreError::Sqlite)?;
        Ok(())
    }

    async fn commit_transaction(&self) -> crate::error::Result<()> {
        let conn = self.conn.lock().expect("tessera store mutex poisoned");
        if conn.is_autocommit() {
            return Err(StoreError::TransactionState("no active transaction to commit".into()).into());
        }
        conn.execute_batch("COMMIT").map_err(StoreError::Sqlite)?;
        Ok(())
    }

    async fn rollback_transaction(&self) -> crate::error::Result<()> {
        let conn = self.conn.lock().expect("tessera store mutex poisoned");
        if conn.is_autocommit() {
            return Err(
                StoreError::TransactionState("no active transaction to roll back".into()).into(),
            );
        }
        conn.execute_batch("ROLLBACK").map_err(StoreError::Sqlite)?;
        Ok(())
    }

    // ── Metrics ────────────────────────────────────────────────────

    async fn stats(&self) -> crate::error::Result<StoreStats> {
        let conn = self.conn.lock().expect("tessera store mutex poisoned");

        let total_files: u64 = conn
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))
            .map_err(StoreError::Sqlite)?;
        let total_nodes: u64 = conn
            .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))
            .map_err(StoreError::Sqlite)?;
        let total_edges: u64 = conn
            .query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))
            .map_err(StoreError::Sqlite)?;

        let mut stmt = conn
            .prepare("SELECT kind, COUNT(*) FROM nodes GROUP BY kind")
            .map_err(StoreError::Sqlite)?;
        let nodes_by_kind: HashMap<String, u64> = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
            })
            .map_err(StoreError::Sqlite)?
            .collect::<rusqlite::Result<HashMap<_, _>>>()
            .map_err(StoreError::Sqlite)?;

        let mut stmt = conn
            .prepare("SELECT kind, COUNT(*) FROM edges GROUP BY kind")
            .map_err(StoreError::Sqlite)?;
        let edges_by_kind: HashMap<String, u64> = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
            })
            .map_err(StoreError::Sqlite)?
            .collect::<rusqlite::Result<HashMap<_, _>>>()
            .map_err(StoreError::Sqlite)?;

        let db_size_bytes = self
            .db_path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map_or(0, |m| m.len());

        Ok(StoreStats {
            total_files,
            total_nodes,
            total_edges,
            nodes_by_kind,
            edges_by_kind,
            db_size_bytes,
        })
    }
}
