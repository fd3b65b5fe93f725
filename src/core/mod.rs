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

//! src/core/mod.rs
//!
//! Core rule-engine module
//!
//! Contains the compiler pipeline and the compiled artifact:
//! - Token and type definitions for chords, actions and scopes
//! - The tokenizer and the rule-file parser
//! - The layout-aware keymap resolver
//! - The mode graph, blacklist and watch set
//!
//! Everything here is isolated from OS integration and I/O callbacks so
//! the whole pipeline unit-tests against in-memory rule text.

pub mod graph;
pub mod keymap;
pub mod parser;
pub mod tokenizer;
pub mod types;

pub use graph::{Blacklist, BindingKey, Mode, ModeGraph, WatchSet, DEFAULT_MODE};
pub use keymap::{Keymap, KeymapError, LayoutSource, Translation, UsQwertyLayout};
pub use parser::{compile, compile_str, CompileError, CompileOutput, CompileWarning, ParseError};
pub use types::{Action, KeyFingerprint, ModifierSet, ProcessScope, RawKeyEvent};

#[cfg(test)]
mod tests;
