//! Configs-directory watcher for autoload hot-reload.

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error};

const DEBOUNCE: Duration = Duration::from_millis(100);

/// Watches the configs directory and emits a rescan signal whenever a
/// mapping file is created, modified or removed.
pub struct ConfigsWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<()>,
}

impl ConfigsWatcher {
    pub fn new(dir: &Path) -> Result<Self> {
        let (tx, rx) = mpsc::channel(10);

        // notify callbacks run on their own OS thread, not in Tokio context,
        // so the runtime handle is captured up front.
        let runtime_handle = tokio::runtime::Handle::current();

        let mut watcher =
            notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    if !matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    ) {
                        return;
                    }
                    if !event.paths.iter().any(is_mapping_file) {
                        return;
                    }
                    debug!(paths = ?event.paths, "mapping file changed");
                    let tx = tx.clone();
                    runtime_handle.spawn(async move {
                        // Debounce: wait for file writes to complete.
                        tokio::time::sleep(DEBOUNCE).await;
                        // A full channel already carries a pending rescan.
                        let _ = tx.try_send(());
                    });
                }
                Err(e) => error!("watch error: {e}"),
            })?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch configs dir {}", dir.display()))?;

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Wait for the next change. Returns None if the watcher closed.
    pub async fn next_change(&mut self) -> Option<()> {
        self.rx.recv().await
    }
}

fn is_mapping_file(path: &std::path::PathBuf) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn file_write_triggers_a_signal() -> Result<()> {
        let dir = TempDir::new()?;
        let mut watcher = ConfigsWatcher::new(dir.path())?;

        tokio::time::sleep(Duration::from_millis(50)).await;
        std::fs::write(dir.path().join("test.yml"), "name: t\n")?;

        let signal =
            tokio::time::timeout(Duration::from_secs(2), watcher.next_change()).await?;
        assert_eq!(signal, Some(()));
        Ok(())
    }

    #[tokio::test]
    async fn unrelated_files_are_ignored() -> Result<()> {
        let dir = TempDir::new()?;
        let mut watcher = ConfigsWatcher::new(dir.path())?;

        tokio::time::sleep(Duration::from_millis(50)).await;
        std::fs::write(dir.path().join("notes.txt"), "hello")?;

        let signal =
            tokio::time::timeout(Duration::from_millis(500), watcher.next_change()).await;
        assert!(signal.is_err(), "txt file should not trigger a rescan");
        Ok(())
    }
}
