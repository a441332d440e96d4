//! Runtime loop - device table, tick scheduling, autoload.
//!
//! One control loop per process: a `tokio::time::interval` at the configured
//! poll rate drains device events and ticks every pad independently. Pads
//! fail independently; a sink error removes only the offending pad. The
//! autoload table is shared with the configs watcher behind a lock because
//! rescans mutate state read by every pad's selection.

use crate::cli::ReplCommand;
use crate::config::watcher::ConfigsWatcher;
use crate::device::{DeviceEvent, DeviceId};
use crate::mapping::{
    select_autoload, CompiledAutoload, FocusContext, Mapping, MappingConfig,
};
use crate::output::{ConsoleSink, OutputSink};
use crate::pad::GyroGatePad;
use anyhow::Result;
use colored::Colorize;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Parsed mappings from the configs directory, keyed by file path.
pub struct AutoloadTable {
    dir: PathBuf,
    entries: HashMap<PathBuf, TableEntry>,
}

struct TableEntry {
    mtime: SystemTime,
    mapping: Mapping,
}

impl AutoloadTable {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            entries: HashMap::new(),
        }
    }

    /// Scan the configs directory: parse new and modified files (mtime
    /// gated), drop entries whose file vanished. Bad files are logged and
    /// skipped; they never take down the loop. Returns the table size.
    pub fn rescan(&mut self) -> usize {
        let mut seen = Vec::new();
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %self.dir.display(), "configs dir not readable: {e}");
                self.entries.clear();
                return 0;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let is_mapping = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yml") | Some("yaml")
            );
            if !is_mapping {
                continue;
            }
            seen.push(path.clone());

            let mtime = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            if let Some(existing) = self.entries.get(&path) {
                if existing.mtime == mtime {
                    continue;
                }
            }

            match load_entry(&path) {
                Ok(mapping) => {
                    info!(path = %path.display(), mapping = %mapping.name(), "mapping loaded");
                    self.entries.insert(path, TableEntry { mtime, mapping });
                }
                Err(e) => {
                    warn!(path = %path.display(), "rejecting mapping: {e:#}");
                    self.entries.remove(&path);
                }
            }
        }

        self.entries.retain(|path, _| seen.contains(path));
        self.entries.len()
    }

    /// Autoload rules of every loaded mapping that declares one.
    pub fn candidates(&self) -> Vec<CompiledAutoload> {
        self.entries
            .values()
            .filter_map(|entry| entry.mapping.autoload().cloned())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<Mapping> {
        self.entries
            .values()
            .find(|entry| entry.mapping.name() == name)
            .map(|entry| entry.mapping.clone())
    }
}

fn load_entry(path: &std::path::Path) -> Result<Mapping> {
    let text = std::fs::read_to_string(path)?;
    let config = MappingConfig::from_yaml(&text)?;
    Ok(Mapping::from_config(config)?)
}

struct PadEntry {
    pad: GyroGatePad,
    sink: Box<dyn OutputSink>,
}

/// The process-wide control loop.
pub struct Runtime {
    pads: HashMap<DeviceId, PadEntry>,
    autoload: Arc<Mutex<AutoloadTable>>,
    focus_rx: watch::Receiver<FocusContext>,
    device_rx: mpsc::UnboundedReceiver<DeviceEvent>,
    repl_rx: mpsc::UnboundedReceiver<ReplCommand>,
    watcher: Option<ConfigsWatcher>,
    tick_period: f32,
}

impl Runtime {
    pub fn new(
        poll_rate: u32,
        autoload: Arc<Mutex<AutoloadTable>>,
        device_rx: mpsc::UnboundedReceiver<DeviceEvent>,
        repl_rx: mpsc::UnboundedReceiver<ReplCommand>,
        focus_rx: watch::Receiver<FocusContext>,
        watcher: Option<ConfigsWatcher>,
    ) -> Self {
        Self {
            pads: HashMap::new(),
            autoload,
            focus_rx,
            device_rx,
            repl_rx,
            watcher,
            tick_period: 1.0 / poll_rate.max(1) as f32,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        {
            let mut table = self.autoload.lock();
            let count = table.rescan();
            info!(count, "initial configs scan");
        }

        let mut interval = tokio::time::interval(Duration::from_secs_f32(self.tick_period));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut last_tick = tokio::time::Instant::now();
        let mut focus_open = true;
        let mut repl_open = true;

        info!("runtime loop started");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    while let Ok(event) = self.device_rx.try_recv() {
                        self.handle_device_event(event);
                    }
                    let now = tokio::time::Instant::now();
                    let dt = (now - last_tick).as_secs_f32();
                    last_tick = now;
                    self.tick_pads(dt).await;
                }
                changed = self.focus_rx.changed(), if focus_open => {
                    if changed.is_err() {
                        debug!("focus channel closed");
                        focus_open = false;
                    } else {
                        self.evaluate_autoload();
                    }
                }
                signal = next_watcher_change(&mut self.watcher) => {
                    if signal.is_some() {
                        self.rescan_and_autoload();
                    } else {
                        self.watcher = None;
                    }
                }
                command = self.repl_rx.recv(), if repl_open => {
                    match command {
                        Some(ReplCommand::Quit) => {
                            info!("quit requested");
                            break;
                        }
                        Some(command) => self.handle_command(command),
                        None => repl_open = false,
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    fn handle_device_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::Connected { id, name } => {
                info!(id, %name, "🎮 pad connected");
                let mapping = self
                    .select_mapping_for(&name)
                    .unwrap_or_else(Mapping::default_xbox);
                info!(id, mapping = %mapping.name(), "initial mapping");
                let pad = GyroGatePad::new(id, name, mapping, self.tick_period);
                self.pads.insert(
                    id,
                    PadEntry {
                        pad,
                        sink: Box::new(ConsoleSink::new()),
                    },
                );
            }
            DeviceEvent::Disconnected { id } => {
                if let Some(entry) = self.pads.remove(&id) {
                    info!(id, name = %entry.pad.name(), "pad disconnected");
                }
            }
            DeviceEvent::Sample { id, sample } => {
                if let Some(entry) = self.pads.get_mut(&id) {
                    entry.pad.handle_sample(sample);
                }
            }
        }
    }

    async fn tick_pads(&mut self, dt: f32) {
        let mut failed = Vec::new();
        for (id, entry) in &mut self.pads {
            if let Err(e) = entry.pad.tick(dt, entry.sink.as_mut()).await {
                error!(id, name = %entry.pad.name(), "pad tick failed, removing: {e:#}");
                failed.push(*id);
            }
        }
        for id in failed {
            self.pads.remove(&id);
        }
    }

    fn select_mapping_for(&self, controller: &str) -> Option<Mapping> {
        let focus = self.focus_rx.borrow().clone();
        let ctx = FocusContext {
            exe: focus.exe,
            window_title: focus.window_title,
            controller: controller.to_string(),
        };
        let table = self.autoload.lock();
        let candidates = table.candidates();
        let selected = select_autoload(&candidates, &ctx, None)?;
        table.get(&selected.mapping_name)
    }

    /// Re-run selection for every pad against the current focus.
    fn evaluate_autoload(&mut self) {
        let focus = self.focus_rx.borrow().clone();
        let table = self.autoload.lock();
        let candidates = table.candidates();
        for entry in self.pads.values_mut() {
            let ctx = FocusContext {
                exe: focus.exe.clone(),
                window_title: focus.window_title.clone(),
                controller: entry.pad.name().to_string(),
            };
            let current = entry.pad.mapping().name().to_string();
            if let Some(selected) = select_autoload(&candidates, &ctx, Some(&current)) {
                if let Some(mapping) = table.get(&selected.mapping_name) {
                    entry.pad.set_mapping(mapping);
                }
            }
        }
    }

    fn rescan_and_autoload(&mut self) {
        let count = {
            let mut table = self.autoload.lock();
            table.rescan()
        };
        info!(count, "configs rescanned");
        self.evaluate_autoload();
    }

    fn handle_command(&mut self, command: ReplCommand) {
        match command {
            ReplCommand::ListPads => {
                if self.pads.is_empty() {
                    println!("no pads connected");
                }
                for entry in self.pads.values() {
                    println!(
                        "  [{}] {} → {}{}",
                        entry.pad.id(),
                        entry.pad.name().bold(),
                        entry.pad.mapping().name().green(),
                        if entry.pad.is_calibrating() {
                            " (calibrating)".yellow().to_string()
                        } else {
                            String::new()
                        }
                    );
                }
            }
            ReplCommand::ListLayers => {
                for entry in self.pads.values() {
                    println!("  {} ({})", entry.pad.name().bold(), entry.pad.mapping().name());
                    for layer in entry.pad.mapping().layer_names() {
                        let marker = if entry.pad.mapping().is_layer_active(layer) {
                            "on ".green()
                        } else {
                            "off".dimmed()
                        };
                        println!("    [{marker}] {layer}");
                    }
                }
            }
            ReplCommand::SetLayer { name, active } => {
                for entry in self.pads.values_mut() {
                    entry.pad.mapping_mut().set_layer_activation(&name, active);
                }
            }
            ReplCommand::Calibrate(calibrating) => {
                for entry in self.pads.values_mut() {
                    entry.pad.set_calibrating(calibrating);
                }
            }
            ReplCommand::Reload => self.rescan_and_autoload(),
            // Quit is handled by the loop itself.
            ReplCommand::Quit => {}
        }
    }
}

async fn next_watcher_change(watcher: &mut Option<ConfigsWatcher>) -> Option<()> {
    match watcher.as_mut() {
        Some(watcher) => watcher.next_change().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn rescan_loads_drops_and_rejects() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.yml"), "name: alpha\nmapping:\n  S: X_A\n").unwrap();
        fs::write(dir.path().join("b.yaml"), "name: beta\n").unwrap();
        fs::write(dir.path().join("broken.yml"), "name: [oops\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut table = AutoloadTable::new(dir.path().to_path_buf());
        assert_eq!(table.rescan(), 2);
        assert!(table.get("alpha").is_some());
        assert!(table.get("beta").is_some());

        // Unchanged files are not re-parsed; a second pass is stable.
        assert_eq!(table.rescan(), 2);

        fs::remove_file(dir.path().join("a.yml")).unwrap();
        assert_eq!(table.rescan(), 1);
        assert!(table.get("alpha").is_none());
    }

    #[test]
    fn candidates_only_include_mappings_with_rules() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("auto.yml"),
            "name: auto\nautoload:\n  exe: \"game\\\\.exe\"\n",
        )
        .unwrap();
        fs::write(dir.path().join("manual.yml"), "name: manual\n").unwrap();

        let mut table = AutoloadTable::new(dir.path().to_path_buf());
        table.rescan();
        let candidates = table.candidates();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].mapping_name, "auto");
    }
}
