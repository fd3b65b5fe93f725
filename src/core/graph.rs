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

//! src/core/graph.rs
//!
//! The compiled binding table: modes, the mode graph, the process
//! blacklist and the watch set.
//!
//! These structures are produced by one compile pass, installed as a
//! unit, and replaced as a unit on every successful recompile. Lookup
//! is HashMap-based; a binding is keyed by its chord fingerprint plus
//! its process scope.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::core::types::{Action, KeyFingerprint, ProcessScope};

/// Name of the mode that must exist after every successful compile.
pub const DEFAULT_MODE: &str = "default";

/// Primary plus secondary lookup key of a binding.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct BindingKey {
    pub fingerprint: KeyFingerprint,
    pub scope: ProcessScope,
}

impl BindingKey {
    pub fn new(fingerprint: KeyFingerprint, scope: ProcessScope) -> Self {
        Self { fingerprint, scope }
    }
}

/// A named, switchable binding context.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Mode {
    pub name: String,
    /// Unmatched events are swallowed instead of forwarded.
    pub capture: bool,
    /// Unmatched lookups fall back to the default mode before giving up.
    pub inherit: bool,
    bindings: HashMap<BindingKey, Action>,
}

impl Mode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capture: false,
            inherit: false,
            bindings: HashMap::new(),
        }
    }

    /// Inserts a binding; a duplicate (fingerprint, scope) is rejected
    /// rather than silently overwritten.
    pub fn insert(&mut self, key: BindingKey, action: Action) -> Result<(), BindingKey> {
        if self.bindings.contains_key(&key) {
            return Err(key);
        }
        self.bindings.insert(key, action);
        Ok(())
    }

    pub fn action_for(&self, key: &BindingKey) -> Option<&Action> {
        self.bindings.get(key)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&BindingKey, &Action)> {
        self.bindings.iter()
    }
}

/// Mapping from mode name to mode.
///
/// Invariant after a successful compile: a mode named [`DEFAULT_MODE`]
/// exists and every `ModeSwitch` action targets a mode in this graph.
/// Both are enforced by the compiler, never rechecked at dispatch time.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ModeGraph {
    modes: HashMap<String, Mode>,
}

impl ModeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Mode> {
        self.modes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modes.contains_key(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Mode> {
        self.modes.get_mut(name)
    }

    /// Inserts a new empty mode, failing if the name is taken.
    pub fn declare(&mut self, mode: Mode) -> Result<(), String> {
        if self.modes.contains_key(&mode.name) {
            return Err(mode.name);
        }
        self.modes.insert(mode.name.clone(), mode);
        Ok(())
    }

    /// Fetches a mode for binding insertion, creating the default mode
    /// on first use. Any other mode must have been declared.
    pub fn get_or_default(&mut self, name: &str) -> Option<&mut Mode> {
        if name == DEFAULT_MODE && !self.modes.contains_key(DEFAULT_MODE) {
            self.modes
                .insert(DEFAULT_MODE.to_string(), Mode::new(DEFAULT_MODE));
        }
        self.modes.get_mut(name)
    }

    /// Makes the default mode exist, for rule files that never mention it.
    pub fn ensure_default(&mut self) {
        self.modes
            .entry(DEFAULT_MODE.to_string())
            .or_insert_with(|| Mode::new(DEFAULT_MODE));
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mode> {
        self.modes.values()
    }
}

/// Process names globally exempt from interception. Exact,
/// case-sensitive comparison.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Blacklist {
    names: HashSet<String>,
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// The rule file plus every successfully included file, as watched by
/// the hot-reload coordinator. Rebuilt from scratch on every
/// successful compile since includes may change.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct WatchSet {
    paths: BTreeSet<PathBuf>,
}

impl WatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a path; returns false if it was already watched.
    pub fn insert(&mut self, path: PathBuf) -> bool {
        self.paths.insert(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ModifierSet;

    fn key(mask: ModifierSet, code: u32) -> BindingKey {
        BindingKey::new(KeyFingerprint::new(mask, code), ProcessScope::Any)
    }

    #[test]
    fn test_duplicate_binding_rejected() {
        let mut mode = Mode::new("default");
        let k = key(ModifierSet::CMD, 0x28);

        assert!(mode
            .insert(k.clone(), Action::ShellCommand("echo one".into()))
            .is_ok());
        assert!(mode
            .insert(k, Action::ShellCommand("echo two".into()))
            .is_err());
        assert_eq!(mode.len(), 1);
    }

    #[test]
    fn test_process_scope_is_part_of_the_key() {
        let mut mode = Mode::new("default");
        let fp = KeyFingerprint::new(ModifierSet::CMD, 0x28);

        mode.insert(
            BindingKey::new(fp, ProcessScope::Any),
            Action::Forward,
        )
        .unwrap();
        mode.insert(
            BindingKey::new(fp, ProcessScope::Process("Finder".into())),
            Action::ShellCommand("open ~".into()),
        )
        .unwrap();

        assert_eq!(mode.len(), 2);
    }

    #[test]
    fn test_graph_declares_modes_once() {
        let mut graph = ModeGraph::new();
        assert!(graph.declare(Mode::new("vim")).is_ok());
        assert!(graph.declare(Mode::new("vim")).is_err());
    }

    #[test]
    fn test_default_mode_created_on_first_use() {
        let mut graph = ModeGraph::new();
        assert!(!graph.contains(DEFAULT_MODE));
        assert!(graph.get_or_default(DEFAULT_MODE).is_some());
        assert!(graph.contains(DEFAULT_MODE));

        // Undeclared non-default modes are not created implicitly.
        assert!(graph.get_or_default("vim").is_none());
    }

    #[test]
    fn test_blacklist_is_case_sensitive() {
        let mut blacklist = Blacklist::new();
        blacklist.insert("Terminal");
        assert!(blacklist.contains("Terminal"));
        assert!(!blacklist.contains("terminal"));
    }

    #[test]
    fn test_watch_set_deduplicates() {
        let mut watch = WatchSet::new();
        assert!(watch.insert(PathBuf::from("/tmp/a.conf")));
        assert!(!watch.insert(PathBuf::from("/tmp/a.conf")));
        assert_eq!(watch.len(), 1);
    }
}
