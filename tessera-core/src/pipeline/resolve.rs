//! Pass 2: turn deferred imports and calls into edges against the complete node set.

use std::collections::HashMap;

use tessera_graphs::resolve::candidate_paths;
use tessera_graphs::{CallSite, ImportDeclaration, LanguageRegistry};
use tracing::{debug, info, instrument, warn};

use super::{PendingEdges, PendingFile};
use crate::store::GraphStore;
use crate::types::{EdgeKind, SymbolNode};

/// Counters produced by one resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    pub import_edges: u64,
    pub call_edges: u64,
    pub unresolved_imports: u64,
    pub unresolved_calls: u64,
}

/// Resolve every pending file inside one transaction.
///
/// On any store error the transaction is rolled back and the error returned.
#[instrument(skip_all, name = "resolve_edges", fields(files = pending.len()))]
pub async fn resolve_pending(
    store: &dyn GraphStore,
    registry: &LanguageRegistry,
    pending: PendingEdges,
) -> crate::error::Result<ResolveStats> {
    if pending.is_empty() {
        return Ok(ResolveStats::default());
    }

    let all_nodes = store.get_all_nodes().await?;

    store.begin_transaction().await?;
    let mut resolver = Resolver {
        store,
        registry,
        all_nodes: &all_nodes,
        file_nodes: HashMap::new(),
        stats: ResolveStats::default(),
    };
    let result = resolver.run(pending.into_files()).await;
    match result {
        Ok(()) => store.commit_transaction().await?,
        Err(e) => {
            warn!(error = %e, "Edge resolution failed, rolling back");
            if let Err(rollback) = store.rollback_transaction().await {
                warn!(error = %rollback, "Rollback failed");
            }
            return Err(e);
        }
    }

    let stats = resolver.stats;
    info!(
        import_edges = stats.import_edges,
        call_edges = stats.call_edges,
        unresolved_imports = stats.unresolved_imports,
        unresolved_calls = stats.unresolved_calls,
        "Edge resolution complete"
    );
    Ok(stats)
}

struct Resolver<'a> {
    store: &'a dyn GraphStore,
    registry: &'a LanguageRegistry,
    all_nodes: &'a [SymbolNode],
    /// Target file → its nodes, filled lazily. `None` marks a path with no file record.
    file_nodes: HashMap<String, Option<Vec<SymbolNode>>>,
    stats: ResolveStats,
}

impl Resolver<'_> {
    async fn run(&mut self, files: Vec<PendingFile>) -> crate::error::Result<()> {
        for file in files {
            for import in &file.result.imports {
                self.resolve_import(&file, import).await?;
            }
            for call in &file.result.calls {
                self.resolve_call(&file, call).await?;
            }
        }
        Ok(())
    }

    async fn resolve_import(
        &mut self,
        file: &PendingFile,
        import: &ImportDeclaration,
    ) -> crate::error::Result<()> {
        let Some(resolution) = self
            .registry
            .get(&file.language)
            .map(|lang| lang.module_resolution())
        else {
            return Ok(());
        };

        let candidates = candidate_paths(&file.path, &import.specifier, &resolution);
        if candidates.is_empty() {
            debug!(path = %file.path, specifier = %import.specifier, "Bare import, not resolved");
            self.stats.unresolved_imports += 1;
            return Ok(());
        }

        let mut target_nodes = None;
        for candidate in candidates {
            if let Some(nodes) = self.nodes_for(&candidate).await? {
                target_nodes = Some(nodes);
                break;
            }
        }
        let Some(target_nodes) = target_nodes else {
            debug!(path = %file.path, specifier = %import.specifier, "Import target not indexed");
            self.stats.unresolved_imports += 1;
            return Ok(());
        };

        let Some(source) = file.first_node() else {
            debug!(path = %file.path, "Importing file has no symbols");
            self.stats.unresolved_imports += 1;
            return Ok(());
        };

        for name in &import.names {
            match target_nodes
                .iter()
                .find(|n| n.name == *name || n.fqname == *name)
            {
                Some(target) => {
                    self.store
                        .insert_edge(EdgeKind::Imports, source, target.id)
                        .await?;
                    self.stats.import_edges += 1;
                }
                None => {
                    debug!(path = %file.path, name = %name, specifier = %import.specifier, "Imported name not found");
                    self.stats.unresolved_imports += 1;
                }
            }
        }
        Ok(())
    }

    async fn resolve_call(&mut self, file: &PendingFile, call: &CallSite) -> crate::error::Result<()> {
        let Some(caller) = file.enclosing(call) else {
            debug!(path = %file.path, callee = %call.callee, "Call outside any symbol");
            return Ok(());
        };

        let parts: Vec<&str> = match call.callee.rsplit_once('.') {
            Some((head, tail)) => vec![head, tail],
            None => vec![call.callee.as_str()],
        };

        let mut created = 0;
        for part in parts {
            if part.is_empty() {
                continue;
            }
            if let Some(target) = self.all_nodes.iter().find(|n| n.matches_reference(part)) {
                self.store
                    .insert_edge(EdgeKind::Calls, caller, target.id)
                    .await?;
                created += 1;
            }
        }

        if created == 0 {
            debug!(path = %file.path, callee = %call.callee, "Call target not found");
            self.stats.unresolved_calls += 1;
        }
        self.stats.call_edges += created;
        Ok(())
    }

    /// Nodes of an indexed file, or `None` when no file record exists at `path`.
    async fn nodes_for(&mut self, path: &str) -> crate::error::Result<Option<Vec<SymbolNode>>> {
        if let Some(cached) = self.file_nodes.get(path) {
            return Ok(cached.clone());
        }
        let nodes = if self.store.get_file_by_path(path).await?.is_some() {
            Some(self.store.get_nodes_by_path(path).await?)
        } else {
            None
        };
        self.file_nodes.insert(path.to_string(), nodes.clone());
        Ok(nodes)
    }
}
