//! The indexing pipeline.
//!
//! Pass 1 reads, hashes, and extracts each file, replacing that file's nodes
//! inside one transaction and deferring its imports and calls into a
//! [`PendingEdges`] value. Pass 2 ([`resolve::resolve_pending`]) consumes that
//! value once the whole batch is committed, so files can reference symbols
//! declared in files processed after them.

pub mod resolve;

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use tessera_graphs::{
    ByteRange, ExtractionMethod, LanguageRegistry, ParseResult, content_hash,
    extract_with_fallback, strip_bom,
};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

pub use resolve::{ResolveStats, resolve_pending};

use crate::config::{LanguageConfig, TesseraConfig};
use crate::error::{IndexError, Result, StoreError};
use crate::ignore::{GlobIgnore, IgnoreRules};
use crate::progress::{IndexProgress, Silent};
use crate::scan::{Scanner, relative_path};
use crate::store::GraphStore;
use crate::types::{IndexStats, NodeId, SourceFile};
use crate::watch::{FileWatcher, WatchEvent};

/// Checkpoint key holding the JSON stats of the last full index.
pub const LAST_INDEX_KEY: &str = "last_index_stats";
/// Checkpoint key holding the RFC 3339 time of the last full index.
pub const LAST_INDEX_AT_KEY: &str = "last_index_at";

// ── Deferred edges ─────────────────────────────────────────────────

/// A file committed in pass 1 whose imports and calls still need resolving.
#[derive(Debug, Clone)]
pub struct PendingFile {
    pub path: String,
    pub language: String,
    pub result: ParseResult,
    /// fqname → node id for this file; the first symbol wins on duplicates.
    pub node_map: HashMap<String, NodeId>,
    /// This file's nodes with their ranges, in insertion order.
    pub nodes: Vec<(NodeId, ByteRange)>,
}

impl PendingFile {
    /// Source of this file's import edges.
    pub fn first_node(&self) -> Option<NodeId> {
        self.nodes.first().map(|(id, _)| *id)
    }

    /// The first node in insertion order whose range contains the call.
    pub fn enclosing(&self, call: &tessera_graphs::CallSite) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, range)| range.contains(&call.range))
            .map(|(id, _)| *id)
    }
}

/// Output of pass 1, consumed by value in pass 2.
#[derive(Debug, Clone, Default)]
pub struct PendingEdges {
    files: Vec<PendingFile>,
}

impl PendingEdges {
    pub fn push(&mut self, file: PendingFile) {
        self.files.push(file);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.path.as_str())
    }

    pub fn into_files(self) -> Vec<PendingFile> {
        self.files
    }
}

// ── Events ─────────────────────────────────────────────────────────

/// Notifications published to subscribers of a running pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    IndexStarted,
    IndexCompleted(IndexStats),
    FileIndexed { path: String },
    FileRemoved { path: String },
    Failed { operation: String, message: String },
}

/// Read the stats recorded by the last successful full index.
pub async fn last_index_stats(store: &dyn GraphStore) -> Result<Option<IndexStats>> {
    let Some(raw) = store.get_checkpoint(LAST_INDEX_KEY).await? else {
        return Ok(None);
    };
    let stats = serde_json::from_str(&raw).map_err(StoreError::Serialization)?;
    Ok(Some(stats))
}

fn absorb(stats: &mut IndexStats, resolved: ResolveStats) {
    stats.import_edges += resolved.import_edges;
    stats.call_edges += resolved.call_edges;
    stats.unresolved_imports += resolved.unresolved_imports;
    stats.unresolved_calls += resolved.unresolved_calls;
}

// ── Pipeline ───────────────────────────────────────────────────────

struct WatchHandle {
    _watcher: FileWatcher,
    _task: JoinHandle<()>,
}

/// Indexes one workspace into a [`GraphStore`] and keeps it fresh.
///
/// Full runs, incremental runs and removals take turns. Reads through
/// [`IndexPipeline::store`] are not serialized and may see a file's rows
/// before its transaction commits.
pub struct IndexPipeline {
    root: PathBuf,
    config: TesseraConfig,
    store: Arc<dyn GraphStore>,
    registry: Arc<LanguageRegistry>,
    ignore: Arc<dyn IgnoreRules>,
    progress: Arc<dyn IndexProgress>,
    events: broadcast::Sender<PipelineEvent>,
    queue: Mutex<VecDeque<WatchEvent>>,
    draining: AtomicBool,
    watch: Mutex<Option<WatchHandle>>,
    /// Held for every store mutation; the store shares one connection and one transaction slot.
    writer: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for IndexPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexPipeline")
            .field("root", &self.root)
            .field("languages", &self.registry.language_ids())
            .field("ignore", &self.ignore.patterns())
            .finish_non_exhaustive()
    }
}

impl IndexPipeline {
    /// Build a pipeline for `root`, loading `.tesseraignore` merged with the configured exclusions.
    ///
    /// `root` is canonicalized so scanned and watched paths share one absolute prefix.
    pub fn new(root: &Path, config: TesseraConfig, store: Arc<dyn GraphStore>) -> Result<Self> {
        let root = std::fs::canonicalize(root).map_err(IndexError::from)?;
        let ignore = GlobIgnore::load(&root, &config.index.exclude_dirs)?;
        let registry = match &config.index.languages {
            LanguageConfig::Auto => LanguageRegistry::new(),
            LanguageConfig::Explicit(ids) => LanguageRegistry::with_languages(ids),
        };
        let (events, _) = broadcast::channel(256);
        Ok(Self {
            root,
            config,
            store,
            registry: Arc::new(registry),
            ignore: Arc::new(ignore),
            progress: Arc::new(Silent),
            events,
            queue: Mutex::new(VecDeque::new()),
            draining: AtomicBool::new(false),
            watch: Mutex::new(None),
            writer: tokio::sync::Mutex::new(()),
        })
    }

    /// Replace the ignore rules.
    #[must_use]
    pub fn with_ignore(mut self, ignore: Arc<dyn IgnoreRules>) -> Self {
        self.ignore = ignore;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn IndexProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &TesseraConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: PipelineEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn fail(&self, operation: &str, error: &dyn std::fmt::Display) {
        warn!(operation, error = %error, "Pipeline operation failed");
        self.emit(PipelineEvent::Failed {
            operation: operation.to_string(),
            message: error.to_string(),
        });
    }

    fn scanner(&self) -> Scanner<'_> {
        Scanner::new(
            &self.root,
            &self.registry,
            self.ignore.as_ref(),
            &self.config.index.languages,
        )
    }

    /// Language for an indexable, non-ignored workspace path.
    fn accepts(&self, rel: &str) -> Option<&'static str> {
        if self.ignore.should_ignore(rel) {
            return None;
        }
        self.scanner().classify(rel)
    }

    // ── Full index ─────────────────────────────────────────────────

    /// Clear the store and rebuild it from every file in the workspace.
    #[instrument(skip_all, name = "full_index", fields(root = %self.root.display()))]
    pub async fn full_index(&self) -> Result<IndexStats> {
        self.emit(PipelineEvent::IndexStarted);
        let _writer = self.writer.lock().await;
        match self.run_full_index().await {
            Ok(stats) => {
                if let Err(e) = self.record_run(&stats).await {
                    warn!(error = %e, "Failed to record index stats");
                }
                self.emit(PipelineEvent::IndexCompleted(stats.clone()));
                Ok(stats)
            }
            Err(e) => {
                self.progress.finished();
                self.fail("full_index", &e);
                Err(e)
            }
        }
    }

    async fn run_full_index(&self) -> Result<IndexStats> {
        let start = Instant::now();
        self.store.clear_index().await?;

        let files = self.scanner().scan();
        let mut stats = IndexStats {
            files_seen: files.len() as u64,
            ..IndexStats::default()
        };

        self.progress.extracting(files.len() as u64);
        let mut pending = PendingEdges::default();
        let pause = Duration::from_millis(self.config.index.batch_pause_ms);
        for batch in files.chunks(self.config.index.batch_size.max(1)) {
            for file in batch {
                self.process_file(&file.rel_path, &mut stats, &mut pending)
                    .await;
                self.progress.file_done(&file.rel_path);
            }
            if pause.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(pause).await;
            }
        }

        self.progress.resolving(pending.len());
        let resolved = resolve_pending(self.store.as_ref(), &self.registry, pending).await?;
        absorb(&mut stats, resolved);
        self.progress.finished();

        self.store.save().await?;
        stats.duration = start.elapsed();

        info!(
            files = stats.files_seen,
            indexed = stats.indexed,
            skipped = stats.skipped,
            failed = stats.failed,
            fallback = stats.fallback,
            nodes = stats.nodes_created,
            edges = stats.edges_created(),
            duration = ?stats.duration,
            "Full index complete"
        );
        Ok(stats)
    }

    async fn record_run(&self, stats: &IndexStats) -> Result<()> {
        let json = serde_json::to_string(stats).map_err(StoreError::Serialization)?;
        self.store.set_checkpoint(LAST_INDEX_KEY, &json).await?;
        self.store
            .set_checkpoint(LAST_INDEX_AT_KEY, &Utc::now().to_rfc3339())
            .await
    }

    // ── Incremental updates ────────────────────────────────────────

    /// Index specific files now, resolving their edges after all of them are committed.
    ///
    /// Paths may be absolute or workspace-relative. A path that no longer exists is removed.
    #[instrument(skip_all, name = "index_files", fields(count = paths.len()))]
    pub async fn index_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<IndexStats> {
        let _writer = self.writer.lock().await;
        match self.run_index_files(paths).await {
            Ok(stats) => Ok(stats),
            Err(e) => {
                self.fail("index_files", &e);
                Err(e)
            }
        }
    }

    async fn run_index_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<IndexStats> {
        let start = Instant::now();
        let mut stats = IndexStats::default();
        let mut pending = PendingEdges::default();

        for path in paths {
            stats.files_seen += 1;
            let Some(rel) = relative_path(&self.root, path.as_ref()) else {
                debug!(path = %path.as_ref().display(), "Outside workspace, skipping");
                stats.skipped += 1;
                continue;
            };
            if self.root.join(&rel).exists() {
                self.process_file(&rel, &mut stats, &mut pending).await;
            } else if let Err(e) = self.remove_path(&rel).await {
                warn!(path = %rel, error = %e, "Failed to remove file, rolled back");
                stats.failed += 1;
            }
        }

        let resolved = resolve_pending(self.store.as_ref(), &self.registry, pending).await?;
        absorb(&mut stats, resolved);
        self.store.save().await?;
        stats.duration = start.elapsed();
        debug!(
            indexed = stats.indexed,
            unchanged = stats.unchanged,
            edges = stats.edges_created(),
            "Incremental index complete"
        );
        Ok(stats)
    }

    /// Reindex one changed file and resolve its edges immediately.
    pub async fn index_file(&self, path: impl AsRef<Path>) -> Result<IndexStats> {
        self.index_files(&[path.as_ref()]).await
    }

    /// Remove a path's nodes and file record in one transaction. Edges are left in place.
    pub async fn remove_file(&self, rel: &str) -> Result<bool> {
        let _writer = self.writer.lock().await;
        self.remove_path(rel).await
    }

    async fn remove_path(&self, rel: &str) -> Result<bool> {
        self.store.begin_transaction().await?;
        let removed = async {
            let nodes = self.store.delete_nodes_by_path(rel).await?;
            let file = self.store.delete_file(rel).await?;
            Ok::<_, crate::error::TesseraError>(nodes > 0 || file)
        }
        .await;

        let committed = match removed {
            Ok(existed) => self.store.commit_transaction().await.map(|()| existed),
            Err(e) => Err(e),
        };
        match committed {
            Ok(existed) => {
                if existed {
                    debug!(path = rel, "Removed file from index");
                    self.emit(PipelineEvent::FileRemoved {
                        path: rel.to_string(),
                    });
                }
                Ok(existed)
            }
            Err(e) => {
                self.rollback(rel).await;
                Err(e)
            }
        }
    }

    async fn rollback(&self, rel: &str) {
        if let Err(e) = self.store.rollback_transaction().await {
            debug!(path = rel, error = %e, "Rollback skipped");
        }
    }

    // ── Per-file pass 1 ────────────────────────────────────────────

    async fn process_file(&self, rel: &str, stats: &mut IndexStats, pending: &mut PendingEdges) {
        let Some(language) = self.accepts(rel) else {
            debug!(path = rel, "Ignored or unsupported, skipping");
            stats.skipped += 1;
            return;
        };

        let text = match self.read_source(rel) {
            Ok(Some(text)) => text,
            Ok(None) => {
                stats.skipped += 1;
                return;
            }
            Err(e) => {
                warn!(path = rel, error = %e, "Failed to read file");
                stats.skipped += 1;
                return;
            }
        };

        let hash = content_hash(strip_bom(&text));
        match self.store.get_file_by_path(rel).await {
            Ok(Some(existing)) if existing.hash == hash => {
                debug!(path = rel, "Unchanged, skipping");
                stats.unchanged += 1;
                return;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(path = rel, error = %e, "Failed to look up file");
                stats.failed += 1;
                return;
            }
        }

        let result = self.extract(language, rel, &text);
        if result.method == ExtractionMethod::RegexFallback {
            stats.fallback += 1;
        }

        match self.commit_file(rel, language, text.len() as u64, result).await {
            Ok(entry) => {
                stats.indexed += 1;
                stats.nodes_created += entry.nodes.len() as u64;
                pending.push(entry);
                self.emit(PipelineEvent::FileIndexed {
                    path: rel.to_string(),
                });
            }
            Err(e) => {
                warn!(path = rel, error = %e, "Failed to process file, rolled back");
                stats.failed += 1;
            }
        }
    }

    /// Read a file as text. `Ok(None)` means it is oversized or binary.
    fn read_source(&self, rel: &str) -> std::io::Result<Option<String>> {
        let abs = self.root.join(rel);
        let max = self.config.index.max_file_bytes;
        let size = std::fs::metadata(&abs)?.len();
        if size > max as u64 {
            debug!(path = rel, size, max, "Oversized, skipping");
            return Ok(None);
        }
        let bytes = std::fs::read(&abs)?;
        if bytes.contains(&0) {
            debug!(path = rel, "Binary content, skipping");
            return Ok(None);
        }
        match String::from_utf8(bytes) {
            Ok(text) => Ok(Some(text)),
            Err(_) => {
                debug!(path = rel, "Not valid UTF-8, skipping");
                Ok(None)
            }
        }
    }

    fn extract(&self, language: &str, rel: &str, text: &str) -> ParseResult {
        match self.registry.get(language) {
            Some(lang) => extract_with_fallback(
                lang.as_ref(),
                Path::new(rel),
                Some(text),
                self.config.index.max_file_bytes,
            ),
            None => ParseResult::empty(content_hash(strip_bom(text)), ExtractionMethod::Guarded),
        }
    }

    /// Replace a file's nodes and record in one transaction.
    async fn commit_file(
        &self,
        rel: &str,
        language: &str,
        size: u64,
        result: ParseResult,
    ) -> Result<PendingFile> {
        self.store.begin_transaction().await?;
        let written = self.write_file(rel, language, size, &result).await;
        let committed = match written {
            Ok(nodes) => self.store.commit_transaction().await.map(|()| nodes),
            Err(e) => Err(e),
        };
        match committed {
            Ok(nodes) => {
                let mut node_map = HashMap::with_capacity(nodes.len());
                for (symbol, (id, _)) in result.symbols.iter().zip(&nodes) {
                    node_map.entry(symbol.fqname.clone()).or_insert(*id);
                }
                Ok(PendingFile {
                    path: rel.to_string(),
                    language: language.to_string(),
                    result,
                    node_map,
                    nodes,
                })
            }
            Err(e) => {
                self.rollback(rel).await;
                Err(e)
            }
        }
    }

    async fn write_file(
        &self,
        rel: &str,
        language: &str,
        size: u64,
        result: &ParseResult,
    ) -> Result<Vec<(NodeId, ByteRange)>> {
        self.store.delete_nodes_by_path(rel).await?;
        let mut nodes = Vec::with_capacity(result.symbols.len());
        for symbol in &result.symbols {
            let id = self.store.insert_node(rel, symbol).await?;
            nodes.push((id, symbol.range));
        }
        self.store
            .upsert_file(&SourceFile {
                path: rel.to_string(),
                language: language.to_string(),
                hash: result.hash.clone(),
                size,
                indexed_at: Utc::now(),
            })
            .await?;
        Ok(nodes)
    }

    // ── Change queue ───────────────────────────────────────────────

    pub fn enqueue(&self, event: WatchEvent) {
        self.queue
            .lock()
            .expect("change queue mutex poisoned")
            .push_back(event);
    }

    fn next_event(&self) -> Option<WatchEvent> {
        self.queue
            .lock()
            .expect("change queue mutex poisoned")
            .pop_front()
    }

    fn queue_is_empty(&self) -> bool {
        self.queue
            .lock()
            .expect("change queue mutex poisoned")
            .is_empty()
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Process queued changes. Returns immediately if another drain is running.
    ///
    /// Returns the number of events this call handled.
    #[instrument(skip_all, name = "drain_changes")]
    pub async fn drain(&self) -> usize {
        if self.draining.swap(true, Ordering::AcqRel) {
            return 0;
        }
        let mut handled = 0;
        loop {
            while let Some(event) = self.next_event() {
                self.handle_event(event).await;
                handled += 1;
            }
            self.draining.store(false, Ordering::Release);
            // Re-check so an event queued after the last pop is not stranded.
            if self.queue_is_empty() || self.draining.swap(true, Ordering::AcqRel) {
                break;
            }
        }
        if handled > 0 {
            debug!(handled, "Change queue drained");
        }
        handled
    }

    async fn handle_event(&self, event: WatchEvent) {
        match event {
            WatchEvent::Changed(rel) => {
                // index_files already emitted Failed for this path.
                if let Err(e) = self.index_file(rel.as_str()).await {
                    debug!(path = %rel, error = %e, "Queued reindex failed");
                }
            }
            WatchEvent::Removed(rel) => {
                if let Err(e) = self.remove_file(&rel).await {
                    self.fail("remove_file", &e);
                }
            }
        }
    }

    // ── Watching ───────────────────────────────────────────────────

    /// Run a full index, then watch the workspace if watching is enabled.
    pub async fn start(self: &Arc<Self>) -> Result<IndexStats> {
        let stats = self.full_index().await?;
        if !self.config.watch.enabled {
            return Ok(stats);
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let debounce = Duration::from_millis(self.config.watch.debounce_ms);
        let watcher = match FileWatcher::new(&self.root, debounce, tx, self.watch_filter()) {
            Ok(watcher) => watcher,
            Err(e) => {
                self.fail("watch", &e);
                return Err(e.into());
            }
        };

        let pipeline = Arc::clone(self);
        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                pipeline.enqueue(event);
                let drainer = Arc::clone(&pipeline);
                tokio::spawn(async move {
                    drainer.drain().await;
                });
            }
            debug!("Watch channel closed");
        });

        *self.watch.lock().expect("watch handle mutex poisoned") = Some(WatchHandle {
            _watcher: watcher,
            _task: task,
        });
        Ok(stats)
    }

    /// Stop watching. An in-flight drain runs to completion.
    pub fn stop(&self) -> bool {
        let handle = self.watch.lock().expect("watch handle mutex poisoned").take();
        if handle.is_some() {
            info!(root = %self.root.display(), "Stopped watching");
        }
        handle.is_some()
    }

    pub fn is_watching(&self) -> bool {
        self.watch
            .lock()
            .expect("watch handle mutex poisoned")
            .is_some()
    }

    fn watch_filter(&self) -> impl Fn(&str) -> bool + Send + 'static {
        let registry = Arc::clone(&self.registry);
        let ignore = Arc::clone(&self.ignore);
        let languages = self.config.index.languages.clone();
        move |rel: &str| {
            !ignore.should_ignore(rel)
                && registry
                    .for_file(Path::new(rel))
                    .is_some_and(|lang| languages.allows(lang.id()))
        }
    }
}
