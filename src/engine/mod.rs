// Copyright 2025 Eric Jingryd (tidynest@proton.me)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! src/engine/mod.rs
//!
//! Dispatch engine and reload coordination
//!
//! The [`Engine`] owns the installed configuration (mode graph,
//! blacklist, interpreter, watch set), the active-mode pointer and the
//! keymap. Every intercepted key event flows through [`Engine::handle`],
//! which returns a [`Disposition`] telling the OS callback whether to
//! swallow or forward the event. This is the latency-critical path: it
//! does a bounded number of HashMap lookups and at most one detached
//! process spawn, never any I/O or recompilation.
//!
//! Recompilation runs through [`Engine::reload`] on the event loop.
//! Out-of-band reload requests (signals, IPC) only flip an atomic flag
//! via [`ReloadHandle`]; the rebuild itself happens when the loop next
//! calls [`Engine::tick`], preserving the single-writer invariant.

pub mod runner;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::graph::{BindingKey, Blacklist, Mode, ModeGraph, WatchSet, DEFAULT_MODE};
use crate::core::keymap::{Keymap, KeymapError, LayoutSource};
use crate::core::parser::{compile, CompileError, CompileOutput};
use crate::core::types::{Action, KeyFingerprint, ModifierSet, ProcessScope, RawKeyEvent};
use crate::hotload::Hotloader;

pub use runner::{CommandRunner, ShellRunner};

/// The engine's entire outward decision per event.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Disposition {
    /// Event is consumed; the foreground application never sees it.
    Swallow,
    /// Event passes through unmodified.
    Forward,
}

/// The configuration installed by one successful compile, replaced as
/// a unit on every reload.
#[derive(Debug)]
struct InstalledConfig {
    graph: ModeGraph,
    blacklist: Blacklist,
    shell: String,
    watch: WatchSet,
}

impl From<CompileOutput> for InstalledConfig {
    fn from(output: CompileOutput) -> Self {
        for warning in &output.warnings {
            warn!("{}", warning);
        }
        Self {
            graph: output.graph,
            blacklist: output.blacklist,
            shell: output.shell,
            watch: output.watch,
        }
    }
}

/// Handle given to asynchronous contexts (signal handlers, IPC) to
/// request a reload. It only records the request; the rebuild runs on
/// the event loop.
#[derive(Clone, Debug, Default)]
pub struct ReloadHandle {
    pending: Arc<AtomicBool>,
}

impl ReloadHandle {
    pub fn request(&self) {
        self.pending.store(true, Ordering::SeqCst);
    }

    fn take(&self) -> bool {
        self.pending.swap(false, Ordering::SeqCst)
    }
}

/// Hotkey rule engine: compiled configuration plus dispatch state.
#[derive(Debug)]
pub struct Engine<R: CommandRunner = ShellRunner> {
    config_path: PathBuf,
    keymap: Keymap,
    config: InstalledConfig,
    active_mode: String,
    runner: R,
    reload: ReloadHandle,
}

impl Engine<ShellRunner> {
    /// Compiles the rule file and builds an engine around it. A compile
    /// failure here is fatal: the daemon has no last-good configuration
    /// to fall back to yet.
    pub fn new(config_path: PathBuf, keymap: Keymap) -> Result<Self, CompileError> {
        Self::with_runner(config_path, keymap, ShellRunner)
    }
}

impl<R: CommandRunner> Engine<R> {
    pub fn with_runner(
        config_path: PathBuf,
        keymap: Keymap,
        runner: R,
    ) -> Result<Self, CompileError> {
        let output = compile(&config_path, &keymap)?;
        Ok(Self {
            config_path,
            keymap,
            config: output.into(),
            active_mode: DEFAULT_MODE.to_string(),
            runner,
            reload: ReloadHandle::default(),
        })
    }

    /// Decides the fate of one intercepted key event.
    pub fn handle(&mut self, event: &RawKeyEvent, process: &str) -> Disposition {
        if self.config.blacklist.contains(process) {
            return Disposition::Forward;
        }

        let Some(mode) = self.config.graph.get(&self.active_mode) else {
            return Disposition::Forward;
        };

        let fingerprint = event.fingerprint();
        let masks = fingerprint.modifiers.candidate_masks();

        let mut action = lookup(mode, &masks, fingerprint.key_code, process);
        if action.is_none() && mode.inherit && mode.name != DEFAULT_MODE {
            if let Some(default) = self.config.graph.get(DEFAULT_MODE) {
                action = lookup(default, &masks, fingerprint.key_code, process);
            }
        }

        match action {
            Some(Action::ShellCommand(command)) => {
                debug!(%fingerprint, process, command = %command, "chord matched");
                self.runner.spawn(&self.config.shell, &command);
                Disposition::Swallow
            }
            Some(Action::ModeSwitch(target)) => {
                debug!(%fingerprint, from = %self.active_mode, to = %target, "mode switch");
                self.active_mode = target;
                Disposition::Swallow
            }
            Some(Action::Forward) => Disposition::Forward,
            None if mode_captures(&self.config.graph, &self.active_mode) => Disposition::Swallow,
            None => Disposition::Forward,
        }
    }

    /// Recompiles the rule file and installs the result.
    ///
    /// On success the whole (graph, blacklist, shell, watch) tuple is
    /// replaced and the active mode resets to default. On failure the
    /// previous configuration stays installed and in effect.
    pub fn reload(&mut self) -> Result<(), CompileError> {
        match compile(&self.config_path, &self.keymap) {
            Ok(output) => {
                self.config = output.into();
                self.active_mode = DEFAULT_MODE.to_string();
                info!(
                    config = %self.config_path.display(),
                    modes = self.config.graph.len(),
                    "configuration reloaded"
                );
                Ok(())
            }
            Err(err) => {
                warn!("reload failed, keeping previous configuration: {}", err);
                Err(err)
            }
        }
    }

    /// Handle for asynchronous reload requests.
    pub fn reload_handle(&self) -> ReloadHandle {
        self.reload.clone()
    }

    /// One event-loop turn of reload coordination: recompiles if a
    /// watched file changed or an out-of-band request is pending, and
    /// refreshes the watch registrations from the new watch set.
    pub fn tick(&mut self, hotloader: &mut Hotloader) {
        let pending = self.reload.take();
        if !pending && !hotloader.poll() {
            return;
        }
        if self.reload().is_ok() {
            hotloader.rewatch(&self.config.watch);
        }
    }

    /// Reacts to an OS layout change: rebuild the keymap first (key
    /// literal resolution depends on it), then recompile. If the new
    /// layout yields no table the stale one is kept and the reload is
    /// skipped.
    pub fn layout_changed(&mut self, layout: &dyn LayoutSource) -> Result<(), KeymapError> {
        self.keymap.rebuild(layout)?;
        let _ = self.reload();
        Ok(())
    }

    pub fn active_mode(&self) -> &str {
        &self.active_mode
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    pub fn watch_set(&self) -> &WatchSet {
        &self.config.watch
    }

    pub fn graph(&self) -> &ModeGraph {
        &self.config.graph
    }
}

/// Lookup order within one mode: for every candidate mask, the
/// process-scoped binding wins over the any-process binding, and more
/// specific (sided) masks win over generic ones.
fn lookup(mode: &Mode, masks: &[ModifierSet], key_code: u32, process: &str) -> Option<Action> {
    for &mask in masks {
        let key = BindingKey::new(
            KeyFingerprint::new(mask, key_code),
            ProcessScope::Process(process.to_string()),
        );
        if let Some(action) = mode.action_for(&key) {
            return Some(action.clone());
        }
    }
    for &mask in masks {
        let key = BindingKey::new(KeyFingerprint::new(mask, key_code), ProcessScope::Any);
        if let Some(action) = mode.action_for(&key) {
            return Some(action.clone());
        }
    }
    None
}

fn mode_captures(graph: &ModeGraph, name: &str) -> bool {
    graph.get(name).map(|m| m.capture).unwrap_or(false)
}

#[cfg(test)]
mod tests;
