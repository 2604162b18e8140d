//! Debounced file-system watching.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::error::IndexError;
use crate::scan::relative_path;

/// A settled change to a workspace file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WatchEvent {
    /// Added or modified; the path exists when the event fires.
    Changed(String),
    /// Unlinked.
    Removed(String),
}

impl WatchEvent {
    pub fn path(&self) -> &str {
        match self {
            Self::Changed(path) | Self::Removed(path) => path,
        }
    }
}

/// Owns the debouncer. Dropping it stops watching and closes the event channel.
pub struct FileWatcher {
    _debouncer: Debouncer<notify::RecommendedWatcher>,
    root: PathBuf,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher").field("root", &self.root).finish()
    }
}

impl FileWatcher {
    /// Watch `root` recursively, sending events for workspace paths accepted by `filter`.
    pub fn new<F>(
        root: &Path,
        debounce: Duration,
        tx: mpsc::UnboundedSender<WatchEvent>,
        filter: F,
    ) -> Result<Self, IndexError>
    where
        F: Fn(&str) -> bool + Send + 'static,
    {
        let event_root = root.to_path_buf();
        let mut debouncer = new_debouncer(debounce, move |res: DebounceEventResult| match res {
            Ok(events) => {
                let mut seen = HashSet::new();
                for event in events {
                    if !seen.insert(event.path.clone()) {
                        continue;
                    }
                    let Some(rel) = relative_path(&event_root, &event.path) else {
                        continue;
                    };
                    if !filter(&rel) {
                        continue;
                    }
                    let watch_event = if event.path.is_file() {
                        WatchEvent::Changed(rel)
                    } else if event.path.exists() {
                        continue;
                    } else {
                        WatchEvent::Removed(rel)
                    };
                    // Receiver gone means the pipeline stopped.
                    let _ = tx.send(watch_event);
                }
            }
            Err(e) => error!(error = %e, "Watch error"),
        })?;

        debouncer
            .watcher()
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| IndexError::Watch(format!("Failed to watch {}: {e}", root.display())))?;

        info!(root = %root.display(), "Watching for changes");

        Ok(Self {
            _debouncer: debouncer,
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
