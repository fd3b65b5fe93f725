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

//! File system watcher for live rule-file monitoring
//!
//! Uses OS-level file watching via the notify crate. The watcher holds
//! the watch set produced by the last successful compile; after every
//! reload the registrations are rebuilt from scratch, since `load`
//! directives may have changed which files matter.
//!
//! Notifications arrive on an mpsc channel and are drained
//! non-blockingly by the event loop; the watcher never runs compile
//! work itself.

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::{
    path::PathBuf,
    sync::mpsc::{channel, Receiver},
};
use tracing::{debug, warn};

use crate::core::graph::WatchSet;

/// Watches the rule file and its includes for modifications.
pub struct Hotloader {
    watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    watched: Vec<PathBuf>,
}

impl Hotloader {
    pub fn new() -> Result<Self, notify::Error> {
        let (tx, rx) = channel();

        let watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;

        Ok(Hotloader {
            watcher,
            rx,
            watched: Vec::new(),
        })
    }

    /// Replaces all watch registrations with the given set.
    ///
    /// A path that cannot be registered (e.g. deleted since the
    /// compile) is logged and skipped; the remaining paths stay
    /// watched.
    pub fn rewatch(&mut self, watch: &WatchSet) {
        for path in self.watched.drain(..) {
            let _ = self.watcher.unwatch(&path);
        }

        for path in watch.iter() {
            match self.watcher.watch(path, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    debug!(path = %path.display(), "watching rule file");
                    self.watched.push(path.to_path_buf());
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "could not watch rule file");
                }
            }
        }
    }

    /// Checks for file change events (non-blocking).
    ///
    /// Modify covers in-place writes; Create and Remove cover editors
    /// that replace the file by rename.
    pub fn poll(&self) -> bool {
        let mut changed = false;
        while let Ok(event_result) = self.rx.try_recv() {
            if let Ok(event) = event_result {
                if matches!(
                    event.kind,
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                ) {
                    changed = true;
                }
            }
        }
        changed
    }

    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }
}
