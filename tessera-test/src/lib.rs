//! Integration test utilities and fixture workspaces for Tessera.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tessera_core::IndexPipeline;
use tessera_core::config::TesseraConfig;
use tessera_core::error::{Result, StoreError};
use tessera_core::store::{GraphStore, SqliteStore};
use tessera_core::types::{Edge, EdgeId, EdgeKind, NodeId, SourceFile, StoreStats, SymbolNode};
use tessera_graphs::Symbol;

/// A temporary workspace populated with source files.
#[derive(Debug)]
pub struct TestWorkspace {
    pub dir: tempfile::TempDir,
}

impl TestWorkspace {
    pub fn empty() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create tempdir"),
        }
    }

    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let ws = Self::empty();
        for (path, content) in files {
            ws.write(path, content);
        }
        ws
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create or overwrite a workspace file, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(path, content).expect("write fixture file");
    }

    pub fn remove(&self, rel: &str) {
        std::fs::remove_file(self.path().join(rel)).expect("remove fixture file");
    }

    /// `a.ts` imports and calls `bar` from `b.ts`.
    pub fn two_file_ts() -> Self {
        Self::with_files(&[
            (
                "a.ts",
                "import { bar } from './b';\nexport function foo() {\n  return bar();\n}\n",
            ),
            ("b.ts", "export function bar() {}\n"),
        ])
    }

    /// A singleton class and a caller that goes through it.
    pub fn logger_ts() -> Self {
        Self::with_files(&[
            (
                "src/logger.ts",
                "export class Logger {\n  static getInstance() {\n    return new Logger();\n  }\n}\n",
            ),
            (
                "src/main.ts",
                "import { Logger } from './logger';\n\nexport function run() {\n  Logger.getInstance();\n}\n",
            ),
        ])
    }

    /// One small module per supported language.
    pub fn multi_lang() -> Self {
        Self::with_files(&[
            (
                "web/util.ts",
                "export const VERSION = '1';\nexport function format(x: string): string {\n  return x.trim();\n}\n",
            ),
            (
                "web/app.ts",
                "import { format } from './util';\n\nclass App {\n  render(): string {\n    return format(' hi ');\n  }\n}\n",
            ),
            (
                "web/legacy.js",
                "const { format } = require('./util');\nfunction boot() {\n  format('x');\n}\n",
            ),
            (
                "py/pkg/helpers.py",
                "MAX_ITEMS = 10\n\ndef clamp(n):\n    return min(n, MAX_ITEMS)\n",
            ),
            (
                "py/pkg/main.py",
                "from .helpers import clamp\n\nclass Runner:\n    def go(self):\n        return clamp(3)\n",
            ),
            (
                "go/server.go",
                "package main\n\ntype Server struct {\n\tPort int\n}\n\nfunc (s *Server) Start() {\n\tlisten(s.Port)\n}\n\nfunc listen(port int) {}\n",
            ),
            (
                "java/Service.java",
                "package app;\n\npublic class Service {\n    public void run() {\n        Repo.load();\n    }\n}\n",
            ),
            (
                "java/Repo.java",
                "package app;\n\npublic class Repo {\n    public static void load() {}\n}\n",
            ),
            (
                "cs/Program.cs",
                "namespace Demo\n{\n    public class Program\n    {\n        public static void Main()\n        {\n            Greeter.Hello();\n        }\n    }\n}\n",
            ),
            (
                "cs/Greeter.cs",
                "namespace Demo\n{\n    public static class Greeter\n    {\n        public static void Hello() {}\n    }\n}\n",
            ),
            (
                "kt/App.kt",
                "package demo\n\nobject Config {\n    fun load() {}\n}\n\nfun main() {\n    Config.load()\n}\n",
            ),
            ("README.md", "# not indexed\n"),
        ])
    }

    /// Build a pipeline over an in-memory store with no batch pause.
    pub fn pipeline(&self) -> Arc<IndexPipeline> {
        self.pipeline_with(TesseraConfig::default())
    }

    pub fn pipeline_with(&self, config: TesseraConfig) -> Arc<IndexPipeline> {
        let store: Arc<dyn GraphStore> =
            Arc::new(SqliteStore::in_memory().expect("open in-memory store"));
        self.pipeline_on(store, config)
    }

    /// Build a pipeline over a caller-supplied store.
    pub fn pipeline_on(
        &self,
        store: Arc<dyn GraphStore>,
        mut config: TesseraConfig,
    ) -> Arc<IndexPipeline> {
        config.index.batch_pause_ms = 0;
        Arc::new(IndexPipeline::new(self.path(), config, store).expect("build pipeline"))
    }
}

type UpsertHook = Box<dyn FnMut(&str) + Send>;

/// An in-memory store that can refuse writes for chosen paths and run a hook
/// after each file record is written.
pub struct ScriptedStore {
    inner: SqliteStore,
    refused: Mutex<HashSet<String>>,
    on_upsert: Mutex<Option<UpsertHook>>,
}

impl std::fmt::Debug for ScriptedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedStore")
            .field("refused", &self.refused)
            .finish_non_exhaustive()
    }
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteStore::in_memory().expect("open in-memory store"),
            refused: Mutex::new(HashSet::new()),
            on_upsert: Mutex::new(None),
        }
    }

    /// Make node writes and deletes for `path` fail until [`ScriptedStore::allow`].
    pub fn refuse(&self, path: &str) {
        self.refused.lock().expect("refused mutex poisoned").insert(path.to_string());
    }

    pub fn allow(&self, path: &str) {
        self.refused.lock().expect("refused mutex poisoned").remove(path);
    }

    pub fn on_upsert(&self, hook: impl FnMut(&str) + Send + 'static) {
        *self.on_upsert.lock().expect("hook mutex poisoned") = Some(Box::new(hook));
    }

    fn check(&self, path: &str) -> Result<()> {
        if self.refused.lock().expect("refused mutex poisoned").contains(path) {
            return Err(StoreError::InvalidRow(format!("write refused for {path}")).into());
        }
        Ok(())
    }
}

impl Default for ScriptedStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl GraphStore for ScriptedStore {
    async fn upsert_file(&self, file: &SourceFile) -> Result<()> {
        self.inner.upsert_file(file).await?;
        if let Some(hook) = self.on_upsert.lock().expect("hook mutex poisoned").as_mut() {
            hook(&file.path);
        }
        Ok(())
    }

    async fn get_file_by_path(&self, path: &str) -> Result<Option<SourceFile>> {
        self.inner.get_file_by_path(path).await
    }

    async fn delete_file(&self, path: &str) -> Result<bool> {
        self.inner.delete_file(path).await
    }

    async fn get_all_files(&self) -> Result<Vec<SourceFile>> {
        self.inner.get_all_files().await
    }

    async fn insert_node(&self, path: &str, symbol: &Symbol) -> Result<NodeId> {
        self.check(path)?;
        self.inner.insert_node(path, symbol).await
    }

    async fn delete_nodes_by_path(&self, path: &str) -> Result<u64> {
        self.check(path)?;
        self.inner.delete_nodes_by_path(path).await
    }

    async fn get_nodes_by_path(&self, path: &str) -> Result<Vec<SymbolNode>> {
        self.inner.get_nodes_by_path(path).await
    }

    async fn get_all_nodes(&self) -> Result<Vec<SymbolNode>> {
        self.inner.get_all_nodes().await
    }

    async fn insert_edge(&self, kind: EdgeKind, source: NodeId, target: NodeId) -> Result<EdgeId> {
        self.inner.insert_edge(kind, source, target).await
    }

    async fn get_all_edges(&self) -> Result<Vec<Edge>> {
        self.inner.get_all_edges().await
    }

    async fn get_checkpoint(&self, kind: &str) -> Result<Option<String>> {
        self.inner.get_checkpoint(kind).await
    }

    async fn set_checkpoint(&self, kind: &str, value: &str) -> Result<()> {
        self.inner.set_checkpoint(kind, value).await
    }

    async fn clear_index(&self) -> Result<()> {
        self.inner.clear_index().await
    }

    async fn save(&self) -> Result<()> {
        self.inner.save().await
    }

    async fn begin_transaction(&self) -> Result<()> {
        self.inner.begin_transaction().await
    }

    async fn commit_transaction(&self) -> Result<()> {
        self.inner.commit_transaction().await
    }

    async fn rollback_transaction(&self) -> Result<()> {
        self.inner.rollback_transaction().await
    }

    async fn stats(&self) -> Result<StoreStats> {
        self.inner.stats().await
    }
}

/// Find a node by fully-qualified name.
pub async fn node_by_fqname(store: &dyn GraphStore, fqname: &str) -> Option<SymbolNode> {
    store
        .get_all_nodes()
        .await
        .expect("load nodes")
        .into_iter()
        .find(|n| n.fqname == fqname)
}
