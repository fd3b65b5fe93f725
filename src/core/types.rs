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

//! src/core/types.rs
//!
//! Core type definitions for the hotkey rule engine
//!
//! This module defines the fundamental types used throughout the daemon:
//! - `ModifierSet`: Bitmask over modifier keys, with left/right qualification
//! - `KeyFingerprint`: The canonical (modifiers, key code) identity of a chord
//! - `Action`: What a binding does (run a command, switch mode, pass through)
//! - `ProcessScope`: Optional per-application scoping of a binding
//! - `RawKeyEvent`: The one type mirroring the OS event representation
//!
//! All types implement serialization and are designed for consistent
//! hashing: two chords declaring the same modifiers in a different order
//! produce identical fingerprints.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bitmask over keyboard modifier keys.
///
/// Each of command, alt, shift and control has three bits: left, right
/// and generic. A sided bit always implies the generic bit, so a chord
/// declared with `lcmd` carries `LCMD | CMD` while a chord declared with
/// plain `cmd` carries only `CMD`. The `fn` modifier has a single bit.
///
/// # Hash Implementation
/// Hash and equality are defined on the raw mask, which makes modifier
/// declaration order irrelevant by construction.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct ModifierSet(pub u32);

impl ModifierSet {
    pub const LALT: ModifierSet = ModifierSet(1 << 0);
    pub const RALT: ModifierSet = ModifierSet(1 << 1);
    pub const ALT: ModifierSet = ModifierSet(1 << 2);
    pub const LSHIFT: ModifierSet = ModifierSet(1 << 3);
    pub const RSHIFT: ModifierSet = ModifierSet(1 << 4);
    pub const SHIFT: ModifierSet = ModifierSet(1 << 5);
    pub const LCMD: ModifierSet = ModifierSet(1 << 6);
    pub const RCMD: ModifierSet = ModifierSet(1 << 7);
    pub const CMD: ModifierSet = ModifierSet(1 << 8);
    pub const LCTRL: ModifierSet = ModifierSet(1 << 9);
    pub const RCTRL: ModifierSet = ModifierSet(1 << 10);
    pub const CTRL: ModifierSet = ModifierSet(1 << 11);
    pub const FN: ModifierSet = ModifierSet(1 << 12);

    /// The four sided modifier groups as (left, right, generic) triples.
    const GROUPS: [(ModifierSet, ModifierSet, ModifierSet); 4] = [
        (Self::LALT, Self::RALT, Self::ALT),
        (Self::LSHIFT, Self::RSHIFT, Self::SHIFT),
        (Self::LCMD, Self::RCMD, Self::CMD),
        (Self::LCTRL, Self::RCTRL, Self::CTRL),
    ];

    pub const fn empty() -> Self {
        ModifierSet(0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn union(self, other: ModifierSet) -> Self {
        ModifierSet(self.0 | other.0)
    }

    pub const fn contains(self, other: ModifierSet) -> bool {
        self.0 & other.0 == other.0
    }

    const fn intersects(self, other: ModifierSet) -> bool {
        self.0 & other.0 != 0
    }

    /// Parses a modifier name from the rule language.
    ///
    /// Sided names yield the sided bit together with its generic bit.
    /// `hyper` and `meh` are aggregate names carried over from the
    /// original daemon's rule language.
    pub fn from_name(name: &str) -> Option<ModifierSet> {
        let flags = match name {
            "cmd" => Self::CMD,
            "lcmd" => Self::LCMD.union(Self::CMD),
            "rcmd" => Self::RCMD.union(Self::CMD),
            "alt" => Self::ALT,
            "lalt" => Self::LALT.union(Self::ALT),
            "ralt" => Self::RALT.union(Self::ALT),
            "shift" => Self::SHIFT,
            "lshift" => Self::LSHIFT.union(Self::SHIFT),
            "rshift" => Self::RSHIFT.union(Self::SHIFT),
            "ctrl" => Self::CTRL,
            "lctrl" => Self::LCTRL.union(Self::CTRL),
            "rctrl" => Self::RCTRL.union(Self::CTRL),
            "fn" => Self::FN,
            "hyper" => Self::CMD
                .union(Self::ALT)
                .union(Self::SHIFT)
                .union(Self::CTRL),
            "meh" => Self::ALT.union(Self::SHIFT).union(Self::CTRL),
            _ => return None,
        };
        Some(flags)
    }

    /// Enumerates the masks a live event can match against, most
    /// specific first.
    ///
    /// A binding declared with a sided modifier must only match that
    /// side, while a binding declared with the generic modifier matches
    /// either side. For every modifier group held down, the event
    /// therefore matches both its sided mask and the mask with the side
    /// collapsed to the generic bit. With four groups this is at most
    /// sixteen candidates; one or two held modifiers yield two to four.
    pub fn candidate_masks(self) -> Vec<ModifierSet> {
        let mut masks = vec![ModifierSet(self.0 & Self::FN.0)];

        for (left, right, generic) in Self::GROUPS {
            if !self.intersects(left.union(right).union(generic)) {
                continue;
            }

            let sided = ModifierSet(self.0 & left.union(right).0);
            let mut next = Vec::with_capacity(masks.len() * 2);
            for mask in &masks {
                if !sided.is_empty() {
                    next.push(mask.union(sided).union(generic));
                }
                next.push(mask.union(generic));
            }
            masks = next;
        }

        masks
    }
}

impl fmt::Display for ModifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(ModifierSet, &str); 13] = [
            (ModifierSet::LCMD, "lcmd"),
            (ModifierSet::RCMD, "rcmd"),
            (ModifierSet::CMD, "cmd"),
            (ModifierSet::LALT, "lalt"),
            (ModifierSet::RALT, "ralt"),
            (ModifierSet::ALT, "alt"),
            (ModifierSet::LSHIFT, "lshift"),
            (ModifierSet::RSHIFT, "rshift"),
            (ModifierSet::SHIFT, "shift"),
            (ModifierSet::LCTRL, "lctrl"),
            (ModifierSet::RCTRL, "rctrl"),
            (ModifierSet::CTRL, "ctrl"),
            (ModifierSet::FN, "fn"),
        ];

        let mut written = ModifierSet::empty();
        let mut first = true;
        for (flags, name) in NAMES {
            // A sided name subsumes its generic bit, so skip the generic
            // name once a side has been printed.
            if self.contains(flags) && !written.intersects(flags) {
                if !first {
                    write!(f, " + ")?;
                }
                write!(f, "{}", name)?;
                written = written.union(flags);
                first = false;
            }
        }
        Ok(())
    }
}

/// Canonical identity of a chord: normalized modifiers plus key code.
///
/// Equality and hashing are defined solely on this pair, so equivalent
/// chords hash identically regardless of how they were declared.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct KeyFingerprint {
    pub modifiers: ModifierSet,
    pub key_code: u32,
}

impl KeyFingerprint {
    pub fn new(modifiers: ModifierSet, key_code: u32) -> Self {
        Self {
            modifiers,
            key_code,
        }
    }
}

impl fmt::Display for KeyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.is_empty() {
            write!(f, "0x{:02X}", self.key_code)
        } else {
            write!(f, "{} - 0x{:02X}", self.modifiers, self.key_code)
        }
    }
}

/// What a matched binding does.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Action {
    /// Launch a shell command asynchronously and swallow the event.
    ShellCommand(String),
    /// Replace the active mode and swallow the event.
    ModeSwitch(String),
    /// Explicit passthrough: forward the event unmodified.
    Forward,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::ShellCommand(cmd) => write!(f, "\"{}\"", cmd),
            Action::ModeSwitch(mode) => write!(f, "@{}", mode),
            Action::Forward => write!(f, "forward"),
        }
    }
}

/// Secondary binding key: which foreground application a binding
/// applies to. Comparison is exact and case-sensitive.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ProcessScope {
    /// Binding applies regardless of the foreground process.
    Any,
    /// Binding applies only while the named process is foreground.
    Process(String),
}

impl fmt::Display for ProcessScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessScope::Any => Ok(()),
            ProcessScope::Process(name) => write!(f, "[\"{}\"]", name),
        }
    }
}

/// A key event as delivered by the OS event source.
///
/// This is the only type that mirrors the platform's event
/// representation: per-side modifier booleans plus a hardware key code.
/// The dispatch engine never touches it directly; it goes through
/// [`RawKeyEvent::fingerprint`] first.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
pub struct RawKeyEvent {
    pub key_code: u32,
    pub alt: bool,
    pub alt_left: bool,
    pub alt_right: bool,
    pub shift: bool,
    pub shift_left: bool,
    pub shift_right: bool,
    pub cmd: bool,
    pub cmd_left: bool,
    pub cmd_right: bool,
    pub ctrl: bool,
    pub ctrl_left: bool,
    pub ctrl_right: bool,
    pub fn_key: bool,
}

impl RawKeyEvent {
    /// Translates the raw event into the canonical fingerprint.
    ///
    /// Sided booleans set both the sided and generic bits; a generic
    /// boolean without side information (synthetic events) sets only
    /// the generic bit.
    pub fn fingerprint(&self) -> KeyFingerprint {
        let mut flags = ModifierSet::empty();

        let groups = [
            (
                self.alt,
                self.alt_left,
                self.alt_right,
                ModifierSet::LALT,
                ModifierSet::RALT,
                ModifierSet::ALT,
            ),
            (
                self.shift,
                self.shift_left,
                self.shift_right,
                ModifierSet::LSHIFT,
                ModifierSet::RSHIFT,
                ModifierSet::SHIFT,
            ),
            (
                self.cmd,
                self.cmd_left,
                self.cmd_right,
                ModifierSet::LCMD,
                ModifierSet::RCMD,
                ModifierSet::CMD,
            ),
            (
                self.ctrl,
                self.ctrl_left,
                self.ctrl_right,
                ModifierSet::LCTRL,
                ModifierSet::RCTRL,
                ModifierSet::CTRL,
            ),
        ];

        for (generic, left, right, lbit, rbit, gbit) in groups {
            if left {
                flags = flags.union(lbit).union(gbit);
            }
            if right {
                flags = flags.union(rbit).union(gbit);
            }
            if generic {
                flags = flags.union(gbit);
            }
        }

        if self.fn_key {
            flags = flags.union(ModifierSet::FN);
        }

        KeyFingerprint::new(flags, self.key_code)
    }
}
