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

//! Dispatch engine tests
//!
//! Per-event decision logic: blacklist bypass, mode lookup order,
//! capture and inherit behaviour, mode switching, process scoping and
//! sided modifier matching.

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use super::RecordingRunner;
use crate::core::keymap::{Keymap, UsQwertyLayout};
use crate::core::types::RawKeyEvent;
use crate::engine::{Disposition, Engine};

fn write_config(text: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("chorddrc");
    fs::write(&path, text).unwrap();
    (dir, path)
}

fn engine(text: &str) -> (TempDir, Engine<RecordingRunner>, RecordingRunner) {
    let (dir, path) = write_config(text);
    let keymap = Keymap::build(&UsQwertyLayout).unwrap();
    let runner = RecordingRunner::default();
    let engine = Engine::with_runner(path, keymap, runner.clone()).unwrap();
    (dir, engine, runner)
}

fn cmd_key(key_code: u32) -> RawKeyEvent {
    RawKeyEvent {
        key_code,
        cmd_left: true,
        ..Default::default()
    }
}

#[test]
fn test_matched_chord_spawns_once_and_swallows() {
    let (_dir, mut engine, runner) = engine("shell \"/bin/sh\"\ncmd + alt - r : \"echo reload\"\n");

    let event = RawKeyEvent {
        key_code: 0x0F, // 'r'
        cmd_left: true,
        alt_left: true,
        ..Default::default()
    };
    assert_eq!(engine.handle(&event, "Finder"), Disposition::Swallow);
    assert_eq!(
        runner.spawned(),
        vec![("/bin/sh".to_string(), "echo reload".to_string())]
    );
}

#[test]
fn test_blacklisted_process_always_forwards() {
    let (_dir, mut engine, runner) =
        engine("blacklist \"Terminal\"\ncmd - k : \"echo k\"\n");

    assert_eq!(engine.handle(&cmd_key(0x28), "Terminal"), Disposition::Forward);
    assert!(runner.spawned().is_empty());

    // Same chord from another process still matches.
    assert_eq!(engine.handle(&cmd_key(0x28), "Finder"), Disposition::Swallow);
    assert_eq!(runner.spawned().len(), 1);
}

#[test]
fn test_unmatched_chord_forwards_in_non_capture_mode() {
    let (_dir, mut engine, runner) = engine("cmd - k : \"echo k\"\n");

    let event = RawKeyEvent {
        key_code: 0x28, // 'k'
        cmd_left: true,
        shift_left: true,
        ..Default::default()
    };
    assert_eq!(engine.handle(&event, "Finder"), Disposition::Forward);
    assert!(runner.spawned().is_empty());
}

#[test]
fn test_capture_mode_swallows_unmatched_without_spawning() {
    let (_dir, mut engine, runner) = engine("mode default capture\ncmd - k : \"echo k\"\n");

    assert_eq!(engine.handle(&cmd_key(0x26), "Finder"), Disposition::Swallow);
    assert!(runner.spawned().is_empty());
}

#[test]
fn test_mode_switch_changes_active_mode() {
    let text = r#"
mode vim capture
ctrl - g : @vim
vim < ctrl - c : @default
"#;
    let (_dir, mut engine, runner) = engine(text);
    assert_eq!(engine.active_mode(), "default");

    let enter = RawKeyEvent {
        key_code: 0x05, // 'g'
        ctrl_left: true,
        ..Default::default()
    };
    assert_eq!(engine.handle(&enter, "Finder"), Disposition::Swallow);
    assert_eq!(engine.active_mode(), "vim");
    assert!(runner.spawned().is_empty());

    let exit = RawKeyEvent {
        key_code: 0x08, // 'c'
        ctrl_left: true,
        ..Default::default()
    };
    assert_eq!(engine.handle(&exit, "Finder"), Disposition::Swallow);
    assert_eq!(engine.active_mode(), "default");
}

#[test]
fn test_inherit_mode_falls_back_to_default() {
    let text = r#"
mode vim inherit
cmd - k : "echo from default"
ctrl - g : @vim
"#;
    let (_dir, mut engine, runner) = engine(text);

    let enter = RawKeyEvent {
        key_code: 0x05,
        ctrl_left: true,
        ..Default::default()
    };
    engine.handle(&enter, "Finder");
    assert_eq!(engine.active_mode(), "vim");

    // Not bound in vim, found in default via inherit.
    assert_eq!(engine.handle(&cmd_key(0x28), "Finder"), Disposition::Swallow);
    assert_eq!(runner.spawned().len(), 1);
}

#[test]
fn test_non_inherit_mode_does_not_fall_back() {
    let text = r#"
mode vim
cmd - k : "echo from default"
ctrl - g : @vim
"#;
    let (_dir, mut engine, runner) = engine(text);

    let enter = RawKeyEvent {
        key_code: 0x05,
        ctrl_left: true,
        ..Default::default()
    };
    engine.handle(&enter, "Finder");

    assert_eq!(engine.handle(&cmd_key(0x28), "Finder"), Disposition::Forward);
    assert!(runner.spawned().is_empty());
}

#[test]
fn test_explicit_forward_action() {
    let (_dir, mut engine, runner) = engine("mode default capture\ncmd - k : forward\n");

    assert_eq!(engine.handle(&cmd_key(0x28), "Finder"), Disposition::Forward);
    assert!(runner.spawned().is_empty());
}

#[test]
fn test_process_scoped_binding_wins_over_any() {
    let text = "cmd - k : \"echo any\"\ncmd - k [\"Finder\"] : \"echo finder\"\n";
    let (_dir, mut engine, runner) = engine(text);

    engine.handle(&cmd_key(0x28), "Finder");
    engine.handle(&cmd_key(0x28), "Safari");

    let commands: Vec<String> = runner.spawned().into_iter().map(|(_, c)| c).collect();
    assert_eq!(commands, vec!["echo finder".to_string(), "echo any".to_string()]);
}

#[test]
fn test_process_scope_is_case_sensitive() {
    let (_dir, mut engine, runner) = engine("cmd - k [\"Finder\"] : \"echo finder\"\n");

    assert_eq!(engine.handle(&cmd_key(0x28), "finder"), Disposition::Forward);
    assert!(runner.spawned().is_empty());
}

#[test]
fn test_generic_binding_matches_either_side() {
    let (_dir, mut engine, _runner) = engine("cmd - k : \"echo k\"\n");

    let left = RawKeyEvent {
        key_code: 0x28,
        cmd_left: true,
        ..Default::default()
    };
    let right = RawKeyEvent {
        key_code: 0x28,
        cmd_right: true,
        ..Default::default()
    };
    assert_eq!(engine.handle(&left, "Finder"), Disposition::Swallow);
    assert_eq!(engine.handle(&right, "Finder"), Disposition::Swallow);
}

#[test]
fn test_sided_binding_matches_only_that_side() {
    let (_dir, mut engine, _runner) = engine("lcmd - k : \"echo left only\"\n");

    let left = RawKeyEvent {
        key_code: 0x28,
        cmd_left: true,
        ..Default::default()
    };
    let right = RawKeyEvent {
        key_code: 0x28,
        cmd_right: true,
        ..Default::default()
    };
    assert_eq!(engine.handle(&left, "Finder"), Disposition::Swallow);
    assert_eq!(engine.handle(&right, "Finder"), Disposition::Forward);
}

#[test]
fn test_sided_binding_wins_over_generic() {
    let text = "lcmd - k : \"echo sided\"\ncmd - k : \"echo generic\"\n";
    let (_dir, mut engine, runner) = engine(text);

    let left = RawKeyEvent {
        key_code: 0x28,
        cmd_left: true,
        ..Default::default()
    };
    engine.handle(&left, "Finder");

    let commands: Vec<String> = runner.spawned().into_iter().map(|(_, c)| c).collect();
    assert_eq!(commands, vec!["echo sided".to_string()]);
}

#[test]
fn test_extra_modifiers_do_not_match() {
    let (_dir, mut engine, _runner) = engine("cmd - k : \"echo k\"\n");

    let event = RawKeyEvent {
        key_code: 0x28,
        cmd_left: true,
        ctrl_left: true,
        ..Default::default()
    };
    assert_eq!(engine.handle(&event, "Finder"), Disposition::Forward);
}
