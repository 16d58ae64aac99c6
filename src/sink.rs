//! Where finished pages go.

use crate::error::Result;
use crate::inflect;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Persists finished pages. Called from worker threads.
pub trait OutputSink: Send + Sync {
    fn write(&self, subject: &str, text: &str) -> Result<()>;
}

/// Discards pages.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn write(&self, _subject: &str, _text: &str) -> Result<()> {
        Ok(())
    }
}

/// Writes `<dir>/<underscored name>.md`, skipping blank pages and unchanged
/// files.
#[derive(Debug, Clone)]
pub struct DiskSink {
    dir: PathBuf,
}

impl DiskSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, subject: &str) -> PathBuf {
        self.dir.join(inflect::page_path(subject))
    }
}

impl OutputSink for DiskSink {
    fn write(&self, subject: &str, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            debug!(subject, "blank page, not written");
            return Ok(());
        }
        let path = self.path_for(subject);
        if fs::read_to_string(&path).is_ok_and(|existing| existing == text) {
            debug!(subject, path = %path.display(), "page unchanged");
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, text)?;
        info!(subject, path = %path.display(), "wrote page");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_nested_paths() {
        let dir = TempDir::new().unwrap();
        let sink = DiskSink::new(dir.path());
        sink.write("Billing::Invoice", "# Invoice\n").unwrap();
        let written = fs::read_to_string(dir.path().join("billing/invoice.md")).unwrap();
        assert_eq!(written, "# Invoice\n");
    }

    #[test]
    fn blank_pages_are_skipped() {
        let dir = TempDir::new().unwrap();
        let sink = DiskSink::new(dir.path());
        sink.write("Empty", "\n").unwrap();
        assert!(!sink.path_for("Empty").exists());
    }

    #[test]
    fn unchanged_pages_are_not_rewritten() {
        let dir = TempDir::new().unwrap();
        let sink = DiskSink::new(dir.path());
        sink.write("Same", "# Same\n").unwrap();
        let path = sink.path_for("Same");
        let before = fs::metadata(&path).unwrap().modified().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        sink.write("Same", "# Same\n").unwrap();
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), before);
    }
}
