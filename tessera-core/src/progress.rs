//! Progress display for full index runs.

use indicatif::{ProgressBar, ProgressStyle};

/// Observes the two passes of a full index.
pub trait IndexProgress: Send + Sync {
    /// Pass 1 is about to extract `total` files.
    fn extracting(&self, total: u64);

    /// One file left pass 1, whatever its outcome.
    fn file_done(&self, path: &str);

    /// Pass 2 is resolving edges for `files` committed files.
    fn resolving(&self, files: usize);

    /// The run ended, successfully or not.
    fn finished(&self);
}

/// Draws nothing. Used by library callers and the watcher.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl IndexProgress for Silent {
    fn extracting(&self, _total: u64) {}
    fn file_done(&self, _path: &str) {}
    fn resolving(&self, _files: usize) {}
    fn finished(&self) {}
}

const EXTRACT_TEMPLATE: &str = "{spinner:.green} extracting [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}";
const RESOLVE_TEMPLATE: &str = "{spinner:.green} {msg}";

/// A single stderr bar that switches style between passes.
#[derive(Debug)]
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn stderr() -> Self {
        Self {
            bar: ProgressBar::new(0),
        }
    }

    /// Tracks state without drawing.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn message(&self) -> String {
        self.bar.message()
    }

    fn restyle(&self, template: &str) {
        match ProgressStyle::with_template(template) {
            Ok(style) => self.bar.set_style(style.progress_chars("=> ")),
            Err(_) => self.bar.set_style(ProgressStyle::default_bar()),
        }
    }
}

impl IndexProgress for BarProgress {
    fn extracting(&self, total: u64) {
        self.restyle(EXTRACT_TEMPLATE);
        self.bar.set_length(total);
        self.bar.reset();
    }

    fn file_done(&self, path: &str) {
        self.bar.set_message(path.to_string());
        self.bar.inc(1);
    }

    fn resolving(&self, files: usize) {
        self.restyle(RESOLVE_TEMPLATE);
        let noun = if files == 1 { "file" } else { "files" };
        self.bar.set_message(format!("resolving edges for {files} {noun}"));
        self.bar.tick();
    }

    fn finished(&self) {
        self.bar.finish_and_clear();
    }
}
