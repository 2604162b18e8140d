//! End-to-end indexing tests over real workspaces on disk.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tessera_core::config::TesseraConfig;
use tessera_core::store::GraphStore;
use tessera_core::watch::WatchEvent;
use tessera_core::{EdgeKind, PipelineEvent};
use tessera_graphs::extract::recover;
use tessera_graphs::{ExtractionMethod, content_hash};
use tessera_test::{ScriptedStore, TestWorkspace, node_by_fqname};

/// `(kind, source fqname, target fqname)` for every edge whose endpoints both exist.
async fn edge_triples(store: &dyn GraphStore) -> HashSet<(EdgeKind, String, String)> {
    let nodes = store.get_all_nodes().await.expect("load nodes");
    let name = |id| {
        nodes
            .iter()
            .find(|n| n.id == id)
            .map(|n| n.fqname.clone())
    };
    store
        .get_all_edges()
        .await
        .expect("load edges")
        .into_iter()
        .filter_map(|e| Some((e.kind, name(e.source)?, name(e.target)?)))
        .collect()
}

fn triple(kind: EdgeKind, source: &str, target: &str) -> (EdgeKind, String, String) {
    (kind, source.to_string(), target.to_string())
}

#[tokio::test]
async fn two_file_workspace_links_import_and_call() {
    let ws = TestWorkspace::two_file_ts();
    let pipeline = ws.pipeline();

    let stats = pipeline.full_index().await.expect("full index");
    assert_eq!(stats.indexed, 2, "both files should be indexed");
    assert_eq!(stats.nodes_created, 2, "one symbol per file");
    assert_eq!(stats.import_edges, 1);
    assert_eq!(stats.call_edges, 1);

    let store = pipeline.store().as_ref();
    let edges = edge_triples(store).await;
    assert!(edges.contains(&triple(EdgeKind::Imports, "foo", "bar")));
    assert!(edges.contains(&triple(EdgeKind::Calls, "foo", "bar")));

    let stats = store.stats().await.expect("store stats");
    assert_eq!(stats.total_files, 2);
    assert_eq!(stats.total_nodes, 2);
    assert_eq!(stats.total_edges, 2);
}

#[tokio::test]
async fn forward_references_resolve_across_batches() {
    let ws = TestWorkspace::two_file_ts();
    let mut config = TesseraConfig::default();
    config.index.batch_size = 1;
    let pipeline = ws.pipeline_with(config);

    pipeline.full_index().await.expect("full index");

    // a.ts is committed in the first batch, before bar exists.
    let edges = edge_triples(pipeline.store().as_ref()).await;
    assert!(
        edges.contains(&triple(EdgeKind::Imports, "foo", "bar")),
        "import should resolve once every batch is committed: {edges:?}"
    );
    assert!(edges.contains(&triple(EdgeKind::Calls, "foo", "bar")));
}

#[tokio::test]
async fn dotted_call_links_class_and_method() {
    let ws = TestWorkspace::logger_ts();
    let pipeline = ws.pipeline();
    let stats = pipeline.full_index().await.expect("full index");
    assert_eq!(stats.call_edges, 2, "one edge for the receiver and one for the method");

    let edges = edge_triples(pipeline.store().as_ref()).await;
    assert!(edges.contains(&triple(EdgeKind::Calls, "run", "Logger")));
    assert!(edges.contains(&triple(EdgeKind::Calls, "run", "Logger.getInstance")));
    assert!(edges.contains(&triple(EdgeKind::Imports, "run", "Logger")));
}

#[tokio::test]
async fn ignored_directories_are_not_indexed() {
    let ws = TestWorkspace::two_file_ts();
    ws.write("debug/test.ts", "export function probe() {}\n");
    ws.write("node_modules/lib/index.js", "function vendored() {}\n");
    ws.write(".tesseraignore", "debug/\n");

    let pipeline = ws.pipeline();
    pipeline.full_index().await.expect("full index");

    let store = pipeline.store();
    let files: Vec<_> = store
        .get_all_files()
        .await
        .expect("list files")
        .into_iter()
        .map(|f| f.path)
        .collect();
    assert_eq!(files, vec!["a.ts", "b.ts"]);
    assert!(node_by_fqname(store.as_ref(), "probe").await.is_none());
    assert!(node_by_fqname(store.as_ref(), "vendored").await.is_none());
}

#[tokio::test]
async fn unchanged_files_are_skipped_on_reindex() {
    let ws = TestWorkspace::two_file_ts();
    let pipeline = ws.pipeline();
    pipeline.full_index().await.expect("full index");
    let before = pipeline.store().stats().await.expect("stats");

    let stats = pipeline
        .index_files(&["a.ts", "b.ts"])
        .await
        .expect("incremental index");
    assert_eq!(stats.unchanged, 2);
    assert_eq!(stats.indexed, 0);
    assert_eq!(stats.edges_created(), 0);

    let after = pipeline.store().stats().await.expect("stats");
    assert_eq!(before.total_nodes, after.total_nodes);
    assert_eq!(before.total_edges, after.total_edges);
}

#[tokio::test]
async fn edited_file_replaces_its_symbols() {
    let ws = TestWorkspace::two_file_ts();
    let pipeline = ws.pipeline();
    pipeline.full_index().await.expect("full index");
    let store = pipeline.store().as_ref();
    let old_bar = node_by_fqname(store, "bar").await.expect("bar indexed");

    ws.write("b.ts", "export function bar() {}\nexport function baz() {}\n");
    let stats = pipeline.index_file("b.ts").await.expect("reindex b.ts");
    assert_eq!(stats.indexed, 1);
    assert_eq!(stats.nodes_created, 2);

    let new_bar = node_by_fqname(store, "bar").await.expect("bar reindexed");
    assert_ne!(old_bar.id, new_bar.id, "nodes are recreated, not updated");
    assert!(node_by_fqname(store, "baz").await.is_some());

    let hash = store
        .get_file_by_path("b.ts")
        .await
        .expect("query file")
        .expect("b.ts recorded")
        .hash;
    assert_eq!(
        hash,
        content_hash("export function bar() {}\nexport function baz() {}\n")
    );
}

#[tokio::test]
async fn deleted_file_leaves_dangling_edges() {
    let ws = TestWorkspace::two_file_ts();
    let pipeline = ws.pipeline();
    pipeline.full_index().await.expect("full index");

    ws.remove("b.ts");
    pipeline.index_file("b.ts").await.expect("process removal");

    let store = pipeline.store();
    assert!(store.get_file_by_path("b.ts").await.expect("query").is_none());
    assert!(node_by_fqname(store.as_ref(), "bar").await.is_none());
    // Edges into the removed file stay until the next full rebuild.
    assert_eq!(store.get_all_edges().await.expect("edges").len(), 2);
    let graph = store.load_graph().await.expect("graph");
    assert_eq!(graph.edge_count(), 0, "dangling edges are left out of the view");

    pipeline.full_index().await.expect("rebuild");
    assert!(store.get_all_edges().await.expect("edges").is_empty());
}

#[tokio::test]
async fn multi_language_workspace() {
    let ws = TestWorkspace::multi_lang();
    let pipeline = ws.pipeline();
    let stats = pipeline.full_index().await.expect("full index");
    assert_eq!(stats.indexed, 11, "README is not a source file");
    assert_eq!(stats.failed, 0);

    let store = pipeline.store().as_ref();
    let languages: HashSet<_> = store
        .get_all_files()
        .await
        .expect("files")
        .into_iter()
        .map(|f| f.language)
        .collect();
    for lang in ["typescript", "javascript", "python", "go", "java", "csharp", "kotlin"] {
        assert!(languages.contains(lang), "missing {lang} in {languages:?}");
    }

    for fqname in [
        "App.render",
        "VERSION",
        "boot",
        "MAX_ITEMS",
        "Runner.go",
        "Server",
        "Start",
        "Service.run",
        "Demo.Greeter.Hello",
        "Demo.Program.Main",
        "Config.load",
    ] {
        assert!(
            node_by_fqname(store, fqname).await.is_some(),
            "expected symbol {fqname}"
        );
    }

    // Calls inside a method are attributed to the first enclosing symbol, the class.
    let edges = edge_triples(store).await;
    assert!(edges.contains(&triple(EdgeKind::Imports, "App", "format")));
    assert!(edges.contains(&triple(EdgeKind::Calls, "App", "format")));
    assert!(edges.contains(&triple(EdgeKind::Imports, "Runner", "clamp")));
    assert!(edges.contains(&triple(EdgeKind::Calls, "Runner", "clamp")));
    assert!(edges.contains(&triple(EdgeKind::Calls, "Start", "listen")));
    assert!(edges.contains(&triple(EdgeKind::Calls, "Service", "Repo")));
    assert!(edges.contains(&triple(EdgeKind::Calls, "Demo.Program", "Demo.Greeter")));
    assert!(edges.contains(&triple(EdgeKind::Calls, "Demo.Program", "Demo.Greeter.Hello")));
    assert!(edges.contains(&triple(EdgeKind::Calls, "main", "Config")));

    let format_imports = edges
        .iter()
        .filter(|(kind, _, target)| *kind == EdgeKind::Imports && target == "format")
        .count();
    assert_eq!(format_imports, 2, "app.ts and legacy.js both import format");
}

#[tokio::test]
async fn language_filter_limits_indexing() {
    let ws = TestWorkspace::multi_lang();
    let mut config = TesseraConfig::default();
    config.index.languages =
        tessera_core::config::LanguageConfig::Explicit(vec!["python".into()]);
    let pipeline = ws.pipeline_with(config);

    let stats = pipeline.full_index().await.expect("full index");
    assert_eq!(stats.indexed, 2);
    let files = pipeline.store().get_all_files().await.expect("files");
    assert!(files.iter().all(|f| f.language == "python"));
}

#[test]
fn unparseable_source_falls_back_to_patterns() {
    let text = "class Broken {\n  def run(self):\n    pass\n\ndef helper():\n    run()\n";
    let outcome = tessera_graphs::ParseOutcome::Unparseable {
        hash: content_hash(text),
    };
    let result = recover("python", Path::new("broken.py"), text, outcome);

    assert_eq!(result.method, ExtractionMethod::RegexFallback);
    assert!(result.symbols.iter().any(|s| s.name == "helper"));
    assert!(result.imports.is_empty(), "fallback never yields imports");
    assert!(result.calls.is_empty(), "fallback never yields calls");
    assert_eq!(result.hash, content_hash(text));
}

const GARBLED_TS: &str = "\u{a4}\u{a4}\u{a4}\u{a4} \u{a4}\u{a4}\u{a4}\u{a4} \u{a4}\u{a4}\u{a4}\u{a4} \u{a4}\u{a4}\u{a4}\u{a4} \u{a4}\u{a4}\u{a4}\u{a4} \u{a4}\u{a4}\u{a4}\u{a4}\n\
    \u{a4}\u{a4}\u{a4}\u{a4} \u{a4}\u{a4}\u{a4}\u{a4} \u{a4}\u{a4}\u{a4}\u{a4} \u{a4}\u{a4}\u{a4}\u{a4} \u{a4}\u{a4}\u{a4}\u{a4} \u{a4}\u{a4}\u{a4}\u{a4}\n\
    export function survivor() {\n  return 1;\n}\n";

#[test]
fn garbled_source_is_extracted_by_patterns() {
    let registry = tessera_graphs::LanguageRegistry::new();
    let lang = registry.get("typescript").expect("typescript registered");
    let result = tessera_graphs::extract_with_fallback(
        lang.as_ref(),
        Path::new("garbled.ts"),
        Some(GARBLED_TS),
        tessera_graphs::MAX_SOURCE_BYTES,
    );
    assert_eq!(result.method, ExtractionMethod::RegexFallback);
    let names: Vec<_> = result.symbols.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["survivor"]);
}

#[tokio::test]
async fn garbled_file_is_indexed_through_fallback() {
    let ws = TestWorkspace::with_files(&[
        ("garbled.ts", GARBLED_TS),
        ("ok.ts", "export function fine() {}\n"),
    ]);
    let pipeline = ws.pipeline();

    let stats = pipeline.full_index().await.expect("full index");
    assert_eq!(stats.indexed, 2);
    assert_eq!(stats.fallback, 1, "only the garbled file needs patterns");
    assert_eq!(stats.failed, 0);

    let store = pipeline.store().as_ref();
    let survivor = node_by_fqname(store, "survivor").await.expect("survivor node");
    assert_eq!(survivor.path, "garbled.ts");
    assert!(node_by_fqname(store, "fine").await.is_some());
}

#[tokio::test]
async fn last_run_stats_are_persisted() {
    let ws = TestWorkspace::two_file_ts();
    let pipeline = ws.pipeline();
    let mut events = pipeline.subscribe();
    let stats = pipeline.full_index().await.expect("full index");

    assert_eq!(events.recv().await.expect("event"), PipelineEvent::IndexStarted);
    let recorded = tessera_core::pipeline::last_index_stats(pipeline.store().as_ref())
        .await
        .expect("read checkpoint")
        .expect("checkpoint written");
    assert_eq!(recorded.indexed, stats.indexed);
    assert_eq!(recorded.edges_created(), stats.edges_created());
}

#[tokio::test]
async fn watcher_picks_up_new_files() {
    let ws = TestWorkspace::two_file_ts();
    let root = ws.path().canonicalize().expect("canonical root");
    let mut config = TesseraConfig::default();
    config.watch.debounce_ms = 50;
    config.index.batch_pause_ms = 0;
    let store: std::sync::Arc<dyn GraphStore> = std::sync::Arc::new(
        tessera_core::SqliteStore::in_memory().expect("in-memory store"),
    );
    let pipeline = std::sync::Arc::new(
        tessera_core::IndexPipeline::new(&root, config, store).expect("pipeline"),
    );

    pipeline.start().await.expect("start");
    assert!(pipeline.is_watching());
    let mut events = pipeline.subscribe();

    ws.write("c.ts", "import { bar } from './b';\nexport function qux() { bar(); }\n");

    let indexed = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match events.recv().await {
                Ok(PipelineEvent::FileIndexed { path }) if path == "c.ts" => break,
                Ok(_) => {}
                Err(e) => panic!("event channel failed: {e}"),
            }
        }
    })
    .await;
    assert!(indexed.is_ok(), "c.ts was never indexed");

    let edges = edge_triples(pipeline.store().as_ref()).await;
    assert!(edges.contains(&triple(EdgeKind::Calls, "qux", "bar")));
    assert!(pipeline.stop());
    assert!(!pipeline.is_watching());
}

#[tokio::test]
async fn failed_removal_does_not_abort_the_batch() {
    let ws = TestWorkspace::two_file_ts();
    let store = Arc::new(ScriptedStore::new());
    let pipeline = ws.pipeline_on(store.clone(), TesseraConfig::default());
    store.refuse("gone.ts");

    let stats = pipeline
        .index_files(&["b.ts", "a.ts", "gone.ts"])
        .await
        .expect("batch completes despite one failure");
    assert_eq!(stats.indexed, 2);
    assert_eq!(stats.failed, 1, "the refused removal is counted");
    assert_eq!(stats.edges_created(), 2, "pass 2 still runs");

    let edges = edge_triples(pipeline.store().as_ref()).await;
    assert!(edges.contains(&triple(EdgeKind::Imports, "foo", "bar")));
    assert!(edges.contains(&triple(EdgeKind::Calls, "foo", "bar")));
}

#[tokio::test]
async fn failed_file_is_rolled_back_and_retried_later() {
    let ws = TestWorkspace::two_file_ts();
    let store = Arc::new(ScriptedStore::new());
    let pipeline = ws.pipeline_on(store.clone(), TesseraConfig::default());
    store.refuse("b.ts");

    let stats = pipeline.full_index().await.expect("full index");
    assert_eq!(stats.indexed, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.unresolved_imports, 1, "b.ts never committed");
    assert!(store.get_file_by_path("b.ts").await.unwrap().is_none());
    assert!(store.get_nodes_by_path("b.ts").await.unwrap().is_empty());

    store.allow("b.ts");
    let stats = pipeline.index_file("b.ts").await.expect("retry");
    assert_eq!(stats.indexed, 1);
    assert_eq!(stats.failed, 0);
    assert!(node_by_fqname(pipeline.store().as_ref(), "bar").await.is_some());
}

#[tokio::test]
async fn events_queued_mid_drain_are_handled_by_that_drain() {
    let ws = TestWorkspace::with_files(&[
        ("first.ts", "export function first() {}\n"),
        ("second.ts", "export function second() {}\n"),
    ]);
    let store = Arc::new(ScriptedStore::new());
    let pipeline = ws.pipeline_on(store.clone(), TesseraConfig::default());

    let queued_while_draining = Arc::new(AtomicBool::new(false));
    let weak = Arc::downgrade(&pipeline);
    let flag = Arc::clone(&queued_while_draining);
    store.on_upsert(move |path| {
        if path != "first.ts" {
            return;
        }
        if let Some(pipeline) = weak.upgrade() {
            flag.store(pipeline.is_draining(), Ordering::SeqCst);
            pipeline.enqueue(WatchEvent::Changed("second.ts".into()));
        }
    });

    pipeline.enqueue(WatchEvent::Changed("first.ts".into()));
    assert_eq!(pipeline.drain().await, 2);
    assert!(queued_while_draining.load(Ordering::SeqCst));
    assert!(!pipeline.is_draining());
    assert_eq!(pipeline.drain().await, 0, "nothing left behind");

    let store = pipeline.store().as_ref();
    assert!(node_by_fqname(store, "first").await.is_some());
    assert!(node_by_fqname(store, "second").await.is_some());
}

#[tokio::test]
async fn drain_continues_past_a_failing_event() {
    let ws = TestWorkspace::two_file_ts();
    let store = Arc::new(ScriptedStore::new());
    let pipeline = ws.pipeline_on(store.clone(), TesseraConfig::default());
    store.refuse("a.ts");

    pipeline.enqueue(WatchEvent::Changed("a.ts".into()));
    pipeline.enqueue(WatchEvent::Changed("b.ts".into()));
    assert_eq!(pipeline.drain().await, 2);

    let store = pipeline.store().as_ref();
    assert!(node_by_fqname(store, "foo").await.is_none());
    assert!(node_by_fqname(store, "bar").await.is_some());
}
