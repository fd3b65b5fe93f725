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

//! Reload coordination tests
//!
//! Atomic install of a recompiled configuration, last-good retention
//! on compile failure, deferred out-of-band reload requests and keymap
//! rebuild behaviour on layout change.

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use super::RecordingRunner;
use crate::core::keymap::{Keymap, LayoutSource, Translation, UsQwertyLayout};
use crate::core::types::RawKeyEvent;
use crate::engine::{Disposition, Engine};
use crate::hotload::Hotloader;

fn write_config(text: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("chorddrc");
    fs::write(&path, text).unwrap();
    (dir, path)
}

fn engine(text: &str) -> (TempDir, PathBuf, Engine<RecordingRunner>, RecordingRunner) {
    let (dir, path) = write_config(text);
    let keymap = Keymap::build(&UsQwertyLayout).unwrap();
    let runner = RecordingRunner::default();
    let engine = Engine::with_runner(path.clone(), keymap, runner.clone()).unwrap();
    (dir, path, engine, runner)
}

fn cmd_key(key_code: u32) -> RawKeyEvent {
    RawKeyEvent {
        key_code,
        cmd_left: true,
        ..Default::default()
    }
}

#[test]
fn test_startup_compile_failure_is_fatal() {
    let (_dir, path) = write_config("cmd - k \"missing colon\"\n");
    let keymap = Keymap::build(&UsQwertyLayout).unwrap();
    assert!(Engine::new(path, keymap).is_err());
}

#[test]
fn test_successful_reload_installs_new_bindings() {
    let (_dir, path, mut engine, _runner) = engine("cmd - k : \"echo old\"\n");

    fs::write(&path, "cmd - j : \"echo new\"\n").unwrap();
    engine.reload().unwrap();

    assert_eq!(engine.handle(&cmd_key(0x28), "Finder"), Disposition::Forward);
    assert_eq!(engine.handle(&cmd_key(0x26), "Finder"), Disposition::Swallow);
}

#[test]
fn test_failed_reload_keeps_previous_configuration() {
    let (_dir, path, mut engine, runner) = engine("cmd - k : \"echo old\"\n");

    fs::write(&path, "cmd - k \"syntax error\"\n").unwrap();
    assert!(engine.reload().is_err());

    // Previous bindings stay dispatch-reachable and unchanged.
    assert_eq!(engine.handle(&cmd_key(0x28), "Finder"), Disposition::Swallow);
    assert_eq!(runner.spawned().len(), 1);
}

#[test]
fn test_reload_resets_active_mode_to_default() {
    let text = "mode vim\nctrl - g : @vim\n";
    let (_dir, path, mut engine, _runner) = engine(text);

    let enter = RawKeyEvent {
        key_code: 0x05,
        ctrl_left: true,
        ..Default::default()
    };
    engine.handle(&enter, "Finder");
    assert_eq!(engine.active_mode(), "vim");

    fs::write(&path, text).unwrap();
    engine.reload().unwrap();
    assert_eq!(engine.active_mode(), "default");
}

#[test]
fn test_out_of_band_request_is_deferred_to_tick() {
    let (_dir, path, mut engine, _runner) = engine("cmd - k : \"echo old\"\n");
    let handle = engine.reload_handle();

    fs::write(&path, "cmd - j : \"echo new\"\n").unwrap();

    // The request alone must not touch the installed configuration.
    handle.request();
    assert_eq!(engine.handle(&cmd_key(0x28), "Finder"), Disposition::Swallow);

    let mut hotloader = Hotloader::new().unwrap();
    engine.tick(&mut hotloader);

    assert_eq!(engine.handle(&cmd_key(0x28), "Finder"), Disposition::Forward);
    assert_eq!(engine.handle(&cmd_key(0x26), "Finder"), Disposition::Swallow);

    // The flag is consumed; watch registrations now track the new set.
    assert_eq!(hotloader.watched().len(), engine.watch_set().len());
}

#[test]
fn test_tick_without_changes_is_a_no_op() {
    let (_dir, _path, mut engine, _runner) = engine("cmd - k : \"echo k\"\n");
    let mut hotloader = Hotloader::new().unwrap();

    engine.tick(&mut hotloader);
    assert!(hotloader.watched().is_empty());
    assert_eq!(engine.handle(&cmd_key(0x28), "Finder"), Disposition::Swallow);
}

#[test]
fn test_layout_change_failure_keeps_stale_keymap() {
    struct EmptyLayout;
    impl LayoutSource for EmptyLayout {
        fn translate(&self, _key_code: u32) -> Translation {
            Translation::None
        }
    }

    let (_dir, _path, mut engine, _runner) = engine("cmd - k : \"echo k\"\n");

    assert!(engine.layout_changed(&EmptyLayout).is_err());

    // Stale keymap still resolves; bindings still dispatch.
    assert_eq!(engine.keymap().resolve('k'), Some(0x28));
    assert_eq!(engine.handle(&cmd_key(0x28), "Finder"), Disposition::Swallow);
}

#[test]
fn test_layout_change_success_recompiles() {
    let (_dir, path, mut engine, _runner) = engine("cmd - k : \"echo old\"\n");

    fs::write(&path, "cmd - j : \"echo new\"\n").unwrap();
    engine.layout_changed(&UsQwertyLayout).unwrap();

    assert_eq!(engine.handle(&cmd_key(0x26), "Finder"), Disposition::Swallow);
}
