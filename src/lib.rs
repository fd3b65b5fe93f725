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

//! chordd — modal hotkey daemon rule engine
//!
//! Compiles a user-authored rule file into an in-memory binding table
//! and decides, per intercepted key event, whether to swallow the event
//! and run an action, switch modes, or let it pass through to the
//! foreground application.
//!
//! # Features
//!
//! - **Rule language:** modes, chord bindings, per-application scoping,
//!   `load`/`blacklist`/`shell` directives
//! - **Layout awareness:** key literals resolve against the active
//!   keyboard layout and recompile when it changes
//! - **Modal dispatch:** capture modes, default-mode inheritance and
//!   mode-switch actions
//! - **Hot reload:** watched rule files recompile on change; the new
//!   tables install atomically or not at all
//!
//! # Architecture
//!
//! - **`core`:** the compiler pipeline (tokenizer, parser, keymap) and
//!   the compiled artifact (mode graph, blacklist, watch set)
//! - **`engine`:** per-event dispatch and reload coordination
//! - **`hotload`:** OS file watching via the notify crate
//!
//! The OS integration itself (event tap, layout-change notifications,
//! signal handling) is an external collaborator: it feeds
//! [`core::RawKeyEvent`]s into [`engine::Engine::handle`] and reacts to
//! the returned [`engine::Disposition`]. After the first successful
//! startup compile the engine never exposes an empty or half-built
//! binding table.
//!
//! # Examples
//!
//! ## Compiling a rule file
//!
//! ```no_run
//! use chordd::core::{compile, Keymap, UsQwertyLayout};
//! use std::path::Path;
//!
//! let keymap = Keymap::build(&UsQwertyLayout)?;
//! let output = compile(Path::new("/home/user/.chorddrc"), &keymap)?;
//! println!("{} modes compiled", output.graph.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Dispatching an event
//!
//! ```no_run
//! use chordd::core::{Keymap, RawKeyEvent, UsQwertyLayout};
//! use chordd::engine::{Disposition, Engine};
//! use std::path::PathBuf;
//!
//! let keymap = Keymap::build(&UsQwertyLayout)?;
//! let mut engine = Engine::new(PathBuf::from("/home/user/.chorddrc"), keymap)?;
//!
//! let event = RawKeyEvent { key_code: 0x0F, cmd_left: true, alt_left: true, ..Default::default() };
//! match engine.handle(&event, "Finder") {
//!     Disposition::Swallow => {} // consume the OS event
//!     Disposition::Forward => {} // hand it back to the application
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod core;
pub mod engine;
pub mod hotload;

// Re-export commonly used types for convenience
pub use crate::core::{Action, KeyFingerprint, ModifierSet, ProcessScope, RawKeyEvent};
pub use crate::engine::{Disposition, Engine};
