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

mod dispatch_tests;
mod reload_tests;

use std::sync::{Arc, Mutex};

use crate::engine::runner::CommandRunner;

/// Records spawned commands instead of launching them.
#[derive(Clone, Default)]
pub(crate) struct RecordingRunner {
    spawned: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingRunner {
    pub(crate) fn spawned(&self) -> Vec<(String, String)> {
        self.spawned.lock().unwrap().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn spawn(&self, shell: &str, command: &str) {
        self.spawned
            .lock()
            .unwrap()
            .push((shell.to_string(), command.to_string()));
    }
}
