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

//! src/core/tokenizer.rs
//!
//! Rule-file tokenizer
//!
//! Turns rule-file text into a flat token stream. The rule language is
//! line oriented, so the tokenizer scans line by line, attaching a
//! 1-based (line, column) position to every token for diagnostics.
//! `#` starts a comment running to the end of the line.
//!
//! Individual token shapes are recognised with nom combinators; the
//! surrounding scan loop owns position bookkeeping. Tokens live only
//! for the duration of one compile pass.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while},
    character::complete::{char, hex_digit1, satisfy},
    combinator::{map, opt, recognize, value},
    sequence::{delimited, pair, preceded},
    IResult, Parser,
};

use crate::core::parser::ParseError;

/// Lexical category of a token.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenKind {
    /// Identifier: modifier names, mode names, directive keywords,
    /// named keys and single-character key literals.
    Ident,
    /// Double-quoted string literal (text holds the unescaped content).
    Str,
    /// Hex keycode literal `0x..` (text holds the digits).
    KeyHex,
    /// Bare punctuation key literal, e.g. `.` or `,`.
    Key,
    Plus,
    Dash,
    Colon,
    Less,
    At,
    LBracket,
    RBracket,
}

/// One token with its source position.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub col: usize,
}

fn ident(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

fn hex_keycode(input: &str) -> IResult<&str, &str> {
    preceded(tag("0x"), hex_digit1).parse(input)
}

fn string_literal(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            opt(nom::bytes::complete::escaped_transform(
                is_not("\"\\"),
                '\\',
                alt((value('"', char('"')), value('\\', char('\\')))),
            )),
            Option::unwrap_or_default,
        ),
        char('"'),
    )
    .parse(input)
}

/// Tokenizes a whole rule file.
///
/// The only lexical error is an unterminated string; every other
/// character lexes as either an operator or a bare key literal, and
/// misuse surfaces as a parse error with position instead.
pub fn tokenize(content: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let mut rest = line;

        loop {
            rest = rest.trim_start();
            if rest.is_empty() || rest.starts_with('#') {
                break;
            }
            let col = line.len() - rest.len() + 1;

            if let Ok((remaining, digits)) = hex_keycode(rest) {
                tokens.push(Token {
                    kind: TokenKind::KeyHex,
                    text: digits.to_string(),
                    line: line_no,
                    col,
                });
                rest = remaining;
                continue;
            }

            if let Ok((remaining, name)) = ident(rest) {
                tokens.push(Token {
                    kind: TokenKind::Ident,
                    text: name.to_string(),
                    line: line_no,
                    col,
                });
                rest = remaining;
                continue;
            }

            if rest.starts_with('"') {
                let (remaining, text) = string_literal(rest).map_err(|_| {
                    ParseError::UnterminatedString {
                        line: line_no,
                        col,
                    }
                })?;
                tokens.push(Token {
                    kind: TokenKind::Str,
                    text,
                    line: line_no,
                    col,
                });
                rest = remaining;
                continue;
            }

            // Operators; anything else is a bare key literal.
            let c = match rest.chars().next() {
                Some(c) => c,
                None => break,
            };
            let kind = match c {
                '+' => TokenKind::Plus,
                '-' => TokenKind::Dash,
                ':' => TokenKind::Colon,
                '<' => TokenKind::Less,
                '@' => TokenKind::At,
                '[' => TokenKind::LBracket,
                ']' => TokenKind::RBracket,
                _ => TokenKind::Key,
            };
            tokens.push(Token {
                kind,
                text: c.to_string(),
                line: line_no,
                col,
            });
            rest = &rest[c.len_utf8()..];
        }
    }

    Ok(tokens)
}
