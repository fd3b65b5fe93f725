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

//! src/core/keymap.rs
//!
//! Layout-aware key literal resolution
//!
//! The rule language names keys by the character they produce, but the
//! binding table stores hardware key codes. This module builds the
//! character-to-code table for the active keyboard layout by walking the
//! platform's representable keycode range and inverting the code-to-char
//! translation. The table is valid only for the layout it was built
//! under and is rebuilt wholesale (never merged) on a layout change.
//!
//! The OS layout itself is consumed through the [`LayoutSource`] trait;
//! the daemon embedder supplies a platform-backed implementation, while
//! [`UsQwertyLayout`] covers the CLI and tests.

use std::collections::HashMap;
use thiserror::Error;

/// Upper bound of the platform's representable keycode range.
pub const KEYCODE_RANGE: u32 = 128;

/// Result of translating one key code under a layout.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Translation {
    /// Plain key-down yields this character.
    Char(char),
    /// The code is a dead-key prefix; ask [`LayoutSource::translate_dead`]
    /// for the character the dead key itself represents.
    DeadKey,
    /// The code yields nothing under this layout.
    None,
}

/// Supplies code-to-character translation data for the active layout.
///
/// A pure function of OS layout state at the moment of the call; the
/// keymap snapshots it during [`Keymap::build`] and never consults it
/// on the dispatch path.
pub trait LayoutSource {
    /// Translates a plain key-down of `key_code`.
    fn translate(&self, key_code: u32) -> Translation;

    /// For a dead-key prefix, the character the dead key represents
    /// (the result of retranslating it combined with space).
    fn translate_dead(&self, _key_code: u32) -> Option<char> {
        None
    }
}

/// Errors raised while building the keymap.
#[derive(Debug, Error)]
pub enum KeymapError {
    /// The layout provided no translation data at all. Fatal at
    /// startup; on a later layout change the stale table is retained.
    #[error("active keyboard layout provided no translation data")]
    LayoutUnavailable,
}

/// Character-to-keycode table for one keyboard layout.
#[derive(Clone, Debug, Default)]
pub struct Keymap {
    table: HashMap<char, u32>,
}

impl Keymap {
    /// Builds a fresh table by walking the whole keycode range.
    ///
    /// When two codes produce the same character the lowest code wins,
    /// which keeps the main block ahead of the keypad.
    pub fn build(layout: &dyn LayoutSource) -> Result<Self, KeymapError> {
        let mut table = HashMap::new();

        for key_code in 0..KEYCODE_RANGE {
            let character = match layout.translate(key_code) {
                Translation::Char(c) => Some(c),
                Translation::DeadKey => layout.translate_dead(key_code),
                Translation::None => None,
            };

            if let Some(c) = character {
                table.entry(c).or_insert(key_code);
            }
        }

        if table.is_empty() {
            return Err(KeymapError::LayoutUnavailable);
        }

        Ok(Self { table })
    }

    /// Rebuilds for the current layout, retaining the previous table if
    /// the new one cannot be built. Lookups keep answering either way.
    pub fn rebuild(&mut self, layout: &dyn LayoutSource) -> Result<(), KeymapError> {
        let fresh = Self::build(layout)?;
        *self = fresh;
        Ok(())
    }

    /// Resolves a literal key character to its key code.
    pub fn resolve(&self, character: char) -> Option<u32> {
        self.table.get(&character).copied()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Iterates over the (character, key code) entries, unordered.
    pub fn iter(&self) -> impl Iterator<Item = (char, u32)> + '_ {
        self.table.iter().map(|(&c, &code)| (c, code))
    }
}

/// Layout-independent named keys.
///
/// These keys have fixed virtual key codes on the platform regardless
/// of the active layout, so the rule language accepts them by name and
/// bypasses the keymap.
pub fn keycode_from_literal(name: &str) -> Option<u32> {
    let code = match name {
        "return" => 0x24,
        "tab" => 0x30,
        "space" => 0x31,
        "backspace" => 0x33,
        "escape" => 0x35,
        "delete" => 0x75,
        "home" => 0x73,
        "end" => 0x77,
        "pageup" => 0x74,
        "pagedown" => 0x79,
        "insert" => 0x72,
        "left" => 0x7B,
        "right" => 0x7C,
        "down" => 0x7D,
        "up" => 0x7E,
        "f1" => 0x7A,
        "f2" => 0x78,
        "f3" => 0x63,
        "f4" => 0x76,
        "f5" => 0x60,
        "f6" => 0x61,
        "f7" => 0x62,
        "f8" => 0x64,
        "f9" => 0x65,
        "f10" => 0x6D,
        "f11" => 0x67,
        "f12" => 0x6F,
        _ => return None,
    };
    Some(code)
}

/// ANSI US virtual keycode table.
const US_QWERTY: [(u32, char); 48] = [
    (0x00, 'a'),
    (0x01, 's'),
    (0x02, 'd'),
    (0x03, 'f'),
    (0x04, 'h'),
    (0x05, 'g'),
    (0x06, 'z'),
    (0x07, 'x'),
    (0x08, 'c'),
    (0x09, 'v'),
    (0x0B, 'b'),
    (0x0C, 'q'),
    (0x0D, 'w'),
    (0x0E, 'e'),
    (0x0F, 'r'),
    (0x10, 'y'),
    (0x11, 't'),
    (0x12, '1'),
    (0x13, '2'),
    (0x14, '3'),
    (0x15, '4'),
    (0x16, '6'),
    (0x17, '5'),
    (0x18, '='),
    (0x19, '9'),
    (0x1A, '7'),
    (0x1B, '-'),
    (0x1C, '8'),
    (0x1D, '0'),
    (0x1E, ']'),
    (0x1F, 'o'),
    (0x20, 'u'),
    (0x21, '['),
    (0x22, 'i'),
    (0x23, 'p'),
    (0x25, 'l'),
    (0x26, 'j'),
    (0x27, '\''),
    (0x28, 'k'),
    (0x29, ';'),
    (0x2A, '\\'),
    (0x2B, ','),
    (0x2C, '/'),
    (0x2D, 'n'),
    (0x2E, 'm'),
    (0x2F, '.'),
    (0x31, ' '),
    (0x32, '`'),
];

/// Built-in US QWERTY layout for the CLI and tests.
///
/// The daemon embedder replaces this with a platform-backed
/// [`LayoutSource`] reflecting the user's actual layout.
#[derive(Clone, Copy, Debug, Default)]
pub struct UsQwertyLayout;

impl LayoutSource for UsQwertyLayout {
    fn translate(&self, key_code: u32) -> Translation {
        US_QWERTY
            .iter()
            .find(|&&(code, _)| code == key_code)
            .map(|&(_, c)| Translation::Char(c))
            .unwrap_or(Translation::None)
    }
}
