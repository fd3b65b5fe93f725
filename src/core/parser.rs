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

//! src/core/parser.rs
//!
//! Rule-file compiler
//!
//! Consumes the token stream produced by the tokenizer and builds the
//! compiled artifact: a [`ModeGraph`], a [`Blacklist`], the command
//! interpreter and the [`WatchSet`] for the hot-reload coordinator.
//!
//! Statement forms:
//! - `mode <name> [capture] [inherit]` — declare a mode and select it
//!   for the bindings that follow
//! - `[mode <] modifier (+ modifier)* - key ["process"] : action` —
//!   declare a binding; the action is a quoted shell command, `@mode`
//!   for a mode switch, or `forward`
//! - `load "path"`, `blacklist "name"`, `shell "path"` — directives
//!
//! Error policy: syntax errors, duplicate bindings and unresolvable
//! mode references abort the compile with line/column context. A key
//! literal with no mapping under the current layout only drops that
//! binding with a warning, and an include path that cannot be read is
//! a warning as well. Include contents are parsed after the including
//! file finishes, depth first, with a cycle guard on the watch set.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::graph::{Blacklist, BindingKey, Mode, ModeGraph, WatchSet, DEFAULT_MODE};
use crate::core::keymap::{keycode_from_literal, Keymap};
use crate::core::tokenizer::{tokenize, Token, TokenKind};
use crate::core::types::{Action, KeyFingerprint, ModifierSet, ProcessScope};

/// Fallback command interpreter when neither the rule file nor the
/// environment names one.
const FALLBACK_SHELL: &str = "/bin/bash";

/// Unrecoverable compile errors with source position context.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unterminated string literal on line {line}:{col}")]
    UnterminatedString { line: usize, col: usize },

    #[error("syntax error on line {line}:{col}: expected {expected}, found {found}")]
    UnexpectedToken {
        line: usize,
        col: usize,
        expected: String,
        found: String,
    },

    #[error("syntax error on line {line}: statement ends early, expected {expected}")]
    UnexpectedEnd { line: usize, expected: String },

    #[error("invalid key code '0x{text}' on line {line}:{col}")]
    InvalidKeycode {
        line: usize,
        col: usize,
        text: String,
    },

    #[error("unknown modifier '{name}' on line {line}:{col}")]
    UnknownModifier {
        name: String,
        line: usize,
        col: usize,
    },

    #[error("unknown key name '{name}' on line {line}:{col}")]
    UnknownKeyName {
        name: String,
        line: usize,
        col: usize,
    },

    #[error("duplicate binding {chord} in mode '{mode}' on line {line}")]
    DuplicateBinding {
        line: usize,
        mode: String,
        chord: String,
    },

    #[error("mode '{name}' redeclared on line {line}")]
    DuplicateMode { line: usize, name: String },

    #[error("binding on line {line} references undeclared mode '{name}'")]
    UndeclaredMode { line: usize, name: String },

    #[error("mode switch on line {line} targets unknown mode '{name}'")]
    UnknownModeTarget { line: usize, name: String },
}

/// Compile failure: either the rule file cannot be read or its content
/// does not parse. Both leave the previously installed configuration
/// untouched.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{}: {source}", file.display())]
    Parse {
        file: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("could not read rule file {}: {source}", file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Non-fatal findings of a compile pass.
#[derive(Debug, Error)]
pub enum CompileWarning {
    #[error("{}:{line}: key '{key}' has no mapping under the current layout; binding skipped", file.display())]
    UnresolvedKey {
        file: PathBuf,
        line: usize,
        key: char,
    },

    #[error("could not load included file {}: {reason}", file.display())]
    UnreadableInclude { file: PathBuf, reason: String },

    #[error("file {} included more than once; repeat ignored", file.display())]
    DuplicateInclude { file: PathBuf },
}

/// Everything one successful compile pass produces, installed and
/// replaced as a unit.
#[derive(Debug)]
pub struct CompileOutput {
    pub graph: ModeGraph,
    pub blacklist: Blacklist,
    /// Command interpreter for `ShellCommand` actions.
    pub shell: String,
    pub watch: WatchSet,
    pub warnings: Vec<CompileWarning>,
}

/// Compiles the rule file at `path`, following `load` directives.
pub fn compile(path: &Path, keymap: &Keymap) -> Result<CompileOutput, CompileError> {
    let root = absolute(path);
    let mut pass = Pass::new(keymap);
    pass.watch.insert(root.clone());

    let text = fs::read_to_string(&root).map_err(|source| CompileError::Io {
        file: root.clone(),
        source,
    })?;
    pass.parse_file(&text, &root)?;
    pass.finish()
}

/// Compiles rule text directly, attributing diagnostics to `origin`.
/// Include paths resolve relative to `origin`'s directory.
pub fn compile_str(
    text: &str,
    origin: &Path,
    keymap: &Keymap,
) -> Result<CompileOutput, CompileError> {
    let mut pass = Pass::new(keymap);
    pass.watch.insert(origin.to_path_buf());
    pass.parse_file(text, origin)?;
    pass.finish()
}

fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// State accumulated across one compile pass, root file plus includes.
struct Pass<'a> {
    keymap: &'a Keymap,
    graph: ModeGraph,
    blacklist: Blacklist,
    shell: Option<String>,
    watch: WatchSet,
    warnings: Vec<CompileWarning>,
    /// Explicitly declared mode names, for redeclaration detection.
    declared: HashSet<String>,
    /// Mode-switch targets to validate once the whole graph exists,
    /// so forward references work.
    switch_targets: Vec<(PathBuf, usize, String)>,
}

impl<'a> Pass<'a> {
    fn new(keymap: &'a Keymap) -> Self {
        Self {
            keymap,
            graph: ModeGraph::new(),
            blacklist: Blacklist::new(),
            shell: None,
            watch: WatchSet::new(),
            warnings: Vec::new(),
            declared: HashSet::new(),
            switch_targets: Vec::new(),
        }
    }

    /// Parses one file's statements, then processes its `load`
    /// directives depth first.
    fn parse_file(&mut self, text: &str, origin: &Path) -> Result<(), CompileError> {
        let tokens = tokenize(text).map_err(|source| CompileError::Parse {
            file: origin.to_path_buf(),
            source,
        })?;

        let mut loads = Vec::new();
        let mut selected = DEFAULT_MODE.to_string();

        let mut i = 0;
        while i < tokens.len() {
            let line = tokens[i].line;
            let mut j = i;
            while j < tokens.len() && tokens[j].line == line {
                j += 1;
            }
            self.parse_statement(&tokens[i..j], origin, &mut selected, &mut loads)
                .map_err(|source| CompileError::Parse {
                    file: origin.to_path_buf(),
                    source,
                })?;
            i = j;
        }

        for load in loads {
            let resolved = resolve_include(origin, &load);
            if !self.watch.insert(resolved.clone()) {
                self.warnings
                    .push(CompileWarning::DuplicateInclude { file: resolved });
                continue;
            }
            match fs::read_to_string(&resolved) {
                Ok(included) => self.parse_file(&included, &resolved)?,
                Err(err) => self.warnings.push(CompileWarning::UnreadableInclude {
                    file: resolved,
                    reason: err.to_string(),
                }),
            }
        }

        Ok(())
    }

    fn finish(mut self) -> Result<CompileOutput, CompileError> {
        self.graph.ensure_default();

        for (file, line, target) in &self.switch_targets {
            if !self.graph.contains(target) {
                return Err(CompileError::Parse {
                    file: file.clone(),
                    source: ParseError::UnknownModeTarget {
                        line: *line,
                        name: target.clone(),
                    },
                });
            }
        }

        let shell = self
            .shell
            .or_else(|| env::var("SHELL").ok().filter(|s| !s.is_empty()))
            .unwrap_or_else(|| FALLBACK_SHELL.to_string());

        Ok(CompileOutput {
            graph: self.graph,
            blacklist: self.blacklist,
            shell,
            watch: self.watch,
            warnings: self.warnings,
        })
    }

    fn parse_statement(
        &mut self,
        toks: &[Token],
        origin: &Path,
        selected: &mut String,
        loads: &mut Vec<String>,
    ) -> Result<(), ParseError> {
        let mut cursor = Cursor::new(toks);

        if cursor.peek_ident("mode") && matches!(cursor.kind_at(1), Some(TokenKind::Ident)) {
            cursor.advance();
            return self.parse_mode_decl(&mut cursor, selected);
        }
        if cursor.peek_ident("load") {
            cursor.advance();
            let path = cursor.expect(TokenKind::Str, "include path string")?;
            loads.push(path.text.clone());
            return cursor.expect_end("end of line");
        }
        if cursor.peek_ident("blacklist") {
            cursor.advance();
            let name = cursor.expect_name("process name")?;
            self.blacklist.insert(name);
            return cursor.expect_end("end of line");
        }
        if cursor.peek_ident("shell") {
            cursor.advance();
            let path = cursor.expect(TokenKind::Str, "interpreter path string")?;
            self.shell = Some(path.text.clone());
            return cursor.expect_end("end of line");
        }

        self.parse_binding(&mut cursor, origin, selected)
    }

    fn parse_mode_decl(
        &mut self,
        cursor: &mut Cursor<'_>,
        selected: &mut String,
    ) -> Result<(), ParseError> {
        let name_tok = cursor.expect(TokenKind::Ident, "mode name")?;
        let name = name_tok.text.clone();
        let line = name_tok.line;

        let mut capture = false;
        let mut inherit = false;
        let mut has_flags = false;
        while !cursor.done() {
            let flag = cursor.expect(TokenKind::Ident, "mode flag 'capture' or 'inherit'")?;
            match flag.text.as_str() {
                "capture" => capture = true,
                "inherit" => inherit = true,
                other => {
                    return Err(ParseError::UnexpectedToken {
                        line: flag.line,
                        col: flag.col,
                        expected: "mode flag 'capture' or 'inherit'".to_string(),
                        found: format!("'{}'", other),
                    })
                }
            }
            has_flags = true;
        }

        if has_flags {
            // Flags may only be attached once per mode.
            if self.declared.contains(&name) {
                return Err(ParseError::DuplicateMode { line, name });
            }
            self.declared.insert(name.clone());
            if !self.graph.contains(&name) {
                let _ = self.graph.declare(Mode::new(name.clone()));
            }
            if let Some(mode) = self.graph.get_mut(&name) {
                mode.capture = capture;
                mode.inherit = inherit;
            }
        } else if !self.graph.contains(&name) {
            let _ = self.graph.declare(Mode::new(name.clone()));
        }

        *selected = name;
        Ok(())
    }

    fn parse_binding(
        &mut self,
        cursor: &mut Cursor<'_>,
        origin: &Path,
        selected: &str,
    ) -> Result<(), ParseError> {
        let line = cursor.line();

        // Optional `name <` mode prefix.
        let mut target_mode = selected.to_string();
        if matches!(cursor.kind_at(0), Some(TokenKind::Ident))
            && matches!(cursor.kind_at(1), Some(TokenKind::Less))
        {
            let name = cursor.expect(TokenKind::Ident, "mode name")?.text.clone();
            cursor.advance(); // consume '<'
            if !self.graph.contains(&name) {
                return Err(ParseError::UndeclaredMode { line, name });
            }
            target_mode = name;
        }

        // Modifier chain: ident (+ ident)*
        let mut modifiers = ModifierSet::empty();
        loop {
            let tok = cursor.expect(TokenKind::Ident, "modifier name")?;
            let flags = ModifierSet::from_name(&tok.text).ok_or_else(|| {
                ParseError::UnknownModifier {
                    name: tok.text.clone(),
                    line: tok.line,
                    col: tok.col,
                }
            })?;
            modifiers = modifiers.union(flags);

            if matches!(cursor.kind_at(0), Some(TokenKind::Plus)) {
                cursor.advance();
            } else {
                break;
            }
        }

        cursor.expect(TokenKind::Dash, "'-'")?;

        // Key literal: hex code, named key, or a character resolved
        // through the keymap. An unresolved character drops only this
        // binding, with a warning.
        let mut skip = false;
        let key_tok = cursor
            .next()
            .ok_or_else(|| ParseError::UnexpectedEnd {
                line,
                expected: "key literal".to_string(),
            })?
            .clone();
        let key_code = match key_tok.kind {
            TokenKind::KeyHex => u32::from_str_radix(&key_tok.text, 16).map_err(|_| {
                ParseError::InvalidKeycode {
                    line: key_tok.line,
                    col: key_tok.col,
                    text: key_tok.text.clone(),
                }
            })?,
            TokenKind::Ident if key_tok.text.chars().count() > 1 => {
                keycode_from_literal(&key_tok.text).ok_or_else(|| ParseError::UnknownKeyName {
                    name: key_tok.text.clone(),
                    line: key_tok.line,
                    col: key_tok.col,
                })?
            }
            TokenKind::Ident | TokenKind::Key => {
                let c = key_tok.text.chars().next().unwrap_or('\0');
                match self.keymap.resolve(c) {
                    Some(code) => code,
                    None => {
                        self.warnings.push(CompileWarning::UnresolvedKey {
                            file: origin.to_path_buf(),
                            line: key_tok.line,
                            key: c,
                        });
                        skip = true;
                        0
                    }
                }
            }
            _ => {
                return Err(ParseError::UnexpectedToken {
                    line: key_tok.line,
                    col: key_tok.col,
                    expected: "key literal".to_string(),
                    found: describe(&key_tok),
                })
            }
        };

        // Optional ["process"] scope.
        let mut scope = ProcessScope::Any;
        if matches!(cursor.kind_at(0), Some(TokenKind::LBracket)) {
            cursor.advance();
            let name = cursor.expect_name("process name")?;
            cursor.expect(TokenKind::RBracket, "']'")?;
            scope = ProcessScope::Process(name);
        }

        cursor.expect(TokenKind::Colon, "':'")?;

        // Action.
        let action = match cursor.kind_at(0) {
            Some(TokenKind::Str) => {
                let cmd = cursor.expect(TokenKind::Str, "shell command")?;
                Action::ShellCommand(cmd.text.clone())
            }
            Some(TokenKind::At) => {
                cursor.advance();
                let target = cursor.expect(TokenKind::Ident, "mode name")?;
                if !skip {
                    self.switch_targets.push((
                        origin.to_path_buf(),
                        target.line,
                        target.text.clone(),
                    ));
                }
                Action::ModeSwitch(target.text.clone())
            }
            Some(TokenKind::Ident) if cursor.peek_ident("forward") => {
                cursor.advance();
                Action::Forward
            }
            _ => {
                return Err(cursor.unexpected("a quoted command, '@mode' or 'forward'"));
            }
        };

        cursor.expect_end("end of line")?;

        if skip {
            return Ok(());
        }

        let fingerprint = KeyFingerprint::new(modifiers, key_code);
        let key = BindingKey::new(fingerprint, scope);
        let chord = format!("{}{}", key.fingerprint, key.scope);
        let mode = self
            .graph
            .get_or_default(&target_mode)
            .ok_or_else(|| ParseError::UndeclaredMode {
                line,
                name: target_mode.clone(),
            })?;
        mode.insert(key, action)
            .map_err(|_| ParseError::DuplicateBinding {
                line,
                mode: target_mode,
                chord,
            })?;

        Ok(())
    }
}

fn resolve_include(origin: &Path, include: &str) -> PathBuf {
    let expanded = shellexpand::tilde(include);
    let candidate = Path::new(expanded.as_ref());
    if candidate.is_absolute() {
        absolute(candidate)
    } else {
        let base = origin.parent().unwrap_or_else(|| Path::new("."));
        absolute(&base.join(candidate))
    }
}

fn describe(tok: &Token) -> String {
    match tok.kind {
        TokenKind::Ident => format!("identifier '{}'", tok.text),
        TokenKind::Str => "string literal".to_string(),
        TokenKind::KeyHex => format!("key code '0x{}'", tok.text),
        _ => format!("'{}'", tok.text),
    }
}

/// Cursor over one statement's tokens.
struct Cursor<'a> {
    toks: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(toks: &'a [Token]) -> Self {
        Self { toks, pos: 0 }
    }

    fn line(&self) -> usize {
        self.toks.first().map(|t| t.line).unwrap_or(0)
    }

    fn done(&self) -> bool {
        self.pos >= self.toks.len()
    }

    fn kind_at(&self, offset: usize) -> Option<TokenKind> {
        self.toks.get(self.pos + offset).map(|t| t.kind)
    }

    fn peek_ident(&self, text: &str) -> bool {
        self.toks
            .get(self.pos)
            .map(|t| t.kind == TokenKind::Ident && t.text == text)
            .unwrap_or(false)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn next(&mut self) -> Option<&'a Token> {
        let tok = self.toks.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<&'a Token, ParseError> {
        match self.toks.get(self.pos) {
            Some(tok) if tok.kind == kind => {
                self.pos += 1;
                Ok(tok)
            }
            Some(tok) => Err(ParseError::UnexpectedToken {
                line: tok.line,
                col: tok.col,
                expected: expected.to_string(),
                found: describe(tok),
            }),
            None => Err(ParseError::UnexpectedEnd {
                line: self.line(),
                expected: expected.to_string(),
            }),
        }
    }

    /// Accepts either a string literal or a bare identifier.
    fn expect_name(&mut self, expected: &str) -> Result<String, ParseError> {
        match self.kind_at(0) {
            Some(TokenKind::Str) => Ok(self.expect(TokenKind::Str, expected)?.text.clone()),
            _ => Ok(self.expect(TokenKind::Ident, expected)?.text.clone()),
        }
    }

    fn expect_end(&mut self, expected: &str) -> Result<(), ParseError> {
        match self.toks.get(self.pos) {
            None => Ok(()),
            Some(tok) => Err(ParseError::UnexpectedToken {
                line: tok.line,
                col: tok.col,
                expected: expected.to_string(),
                found: describe(tok),
            }),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.toks.get(self.pos) {
            Some(tok) => ParseError::UnexpectedToken {
                line: tok.line,
                col: tok.col,
                expected: expected.to_string(),
                found: describe(tok),
            },
            None => ParseError::UnexpectedEnd {
                line: self.line(),
                expected: expected.to_string(),
            },
        }
    }
}
