//! VRML97 scanner: character stream → token stream.
//!
//! Lenient by design: it never fails. Unclassified characters come out as
//! opaque `Symbol` tokens and the parser decides whether they are an error.
//! Lines are 1-based, columns 0-based; a CR LF pair counts as one line break.

use crate::field::FieldType;
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::{take_till, take_while};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Id,
    Def,
    EventIn,
    EventOut,
    ExposedField,
    ExternProto,
    False,
    Field,
    Is,
    Null,
    Proto,
    Route,
    To,
    True,
    Use,
    /// Field-type keyword; only recognized right after an interface keyword.
    FieldType(FieldType),
    Integer,
    HexInteger,
    Real,
    String,
    Period,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    /// Any other single character, passed through untouched.
    Symbol,
    Eof,
}

const KEYWORDS: [(&str, TokenKind); 14] = [
    ("DEF", TokenKind::Def),
    ("eventIn", TokenKind::EventIn),
    ("eventOut", TokenKind::EventOut),
    ("exposedField", TokenKind::ExposedField),
    ("EXTERNPROTO", TokenKind::ExternProto),
    ("FALSE", TokenKind::False),
    ("field", TokenKind::Field),
    ("IS", TokenKind::Is),
    ("NULL", TokenKind::Null),
    ("PROTO", TokenKind::Proto),
    ("ROUTE", TokenKind::Route),
    ("TO", TokenKind::To),
    ("TRUE", TokenKind::True),
    ("USE", TokenKind::Use),
];

impl TokenKind {
    /// True for `eventIn`, `eventOut`, `exposedField` and `field`.
    pub fn is_interface_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::EventIn | TokenKind::EventOut | TokenKind::ExposedField | TokenKind::Field
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text of the token. String tokens keep their delimiters.
    pub text: String,
    pub line: usize,
    pub column: usize,
}

// ─── Character classes ───────────────────────────────────────────────────

fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | ',' | '\r' | '\n')
}

fn is_id_rest(c: char) -> bool {
    let code = c as u32;
    code > 0x20
        && code != 0x7f
        && !matches!(
            c,
            '"' | '#' | '\'' | ',' | '.' | '[' | ']' | '\\' | '{' | '}'
        )
}

fn is_id_first(c: char) -> bool {
    is_id_rest(c) && !c.is_ascii_digit() && c != '+' && c != '-'
}

/// Byte length of the leading run of characters matching `pred`.
fn run_len(input: &str, pred: impl Fn(char) -> bool) -> usize {
    let mut rest = input;
    take_while::<_, _, ContextError>(0.., pred)
        .parse_next(&mut rest)
        .map_or(0, |s: &str| s.len())
}

// ─── Scanner ─────────────────────────────────────────────────────────────

pub struct Scanner<'a> {
    rest: &'a str,
    line: usize,
    column: usize,
    after_cr: bool,
    prev: TokenKind,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            rest: input,
            line: 1,
            column: 0,
            after_cr: false,
            prev: TokenKind::Eof,
        }
    }

    /// Produce the next token. Returns `Eof` forever once input is exhausted.
    pub fn next_token(&mut self) -> Token {
        self.skip_separators_and_comments();

        let (line, column) = (self.line, self.column);
        let Some(c) = self.rest.chars().next() else {
            return Token {
                kind: TokenKind::Eof,
                text: String::new(),
                line,
                column,
            };
        };

        let (kind, len) = match c {
            '[' => (TokenKind::LBracket, 1),
            ']' => (TokenKind::RBracket, 1),
            '{' => (TokenKind::LBrace, 1),
            '}' => (TokenKind::RBrace, 1),
            '"' => (TokenKind::String, self.string_len()),
            '0'..='9' | '+' | '-' | '.' => self.number(),
            c if is_id_first(c) => {
                let len = run_len(self.rest, is_id_rest);
                (self.classify_identifier(&self.rest[..len]), len)
            }
            c => (TokenKind::Symbol, c.len_utf8()),
        };

        let text = self.rest[..len].to_string();
        self.advance(len);
        self.prev = kind;
        log::trace!("token {kind:?} {text:?} at {line}:{column}");

        Token {
            kind,
            text,
            line,
            column,
        }
    }

    fn classify_identifier(&self, text: &str) -> TokenKind {
        if let Some((_, kind)) = KEYWORDS.iter().find(|(kw, _)| *kw == text) {
            return *kind;
        }
        if self.prev.is_interface_keyword()
            && let Some(t) = FieldType::from_keyword(text)
        {
            return TokenKind::FieldType(t);
        }
        TokenKind::Id
    }

    /// Length of a `"`-delimited string starting at the cursor. `\"` does not
    /// terminate it; an unterminated string runs to end of input.
    fn string_len(&self) -> usize {
        let mut escaped = false;
        for (i, c) in self.rest.char_indices().skip(1) {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => return i + 1,
                _ => {}
            }
        }
        self.rest.len()
    }

    /// Numbers, or the lone `.` / sign that looked like the start of one.
    fn number(&self) -> (TokenKind, usize) {
        let s = self.rest;
        let bytes = s.as_bytes();
        let digit_at = |i: usize| bytes.get(i).is_some_and(u8::is_ascii_digit);

        let mut len = 0;
        if matches!(bytes[0], b'+' | b'-') {
            len = 1;
        }
        let starts_number = digit_at(len) || (bytes.get(len) == Some(&b'.') && digit_at(len + 1));
        if !starts_number {
            return if bytes[0] == b'.' {
                (TokenKind::Period, 1)
            } else {
                (TokenKind::Symbol, 1)
            };
        }

        if bytes.get(len) == Some(&b'0') && matches!(bytes.get(len + 1), Some(b'x' | b'X')) {
            let hex = run_len(&s[len + 2..], |c| c.is_ascii_hexdigit());
            if hex > 0 {
                return (TokenKind::HexInteger, len + 2 + hex);
            }
        }

        let mut kind = TokenKind::Integer;
        len += run_len(&s[len..], |c| c.is_ascii_digit());
        if bytes.get(len) == Some(&b'.') {
            kind = TokenKind::Real;
            len += 1;
            len += run_len(&s[len..], |c| c.is_ascii_digit());
        }
        if matches!(bytes.get(len), Some(b'e' | b'E')) {
            let mut exp = len + 1;
            if matches!(bytes.get(exp), Some(b'+' | b'-')) {
                exp += 1;
            }
            if digit_at(exp) {
                kind = TokenKind::Real;
                len = exp + run_len(&s[exp..], |c| c.is_ascii_digit());
            }
        }
        (kind, len)
    }

    fn skip_separators_and_comments(&mut self) {
        loop {
            let ws = run_len(self.rest, is_separator);
            self.advance(ws);
            if !self.rest.starts_with('#') {
                break;
            }
            let mut rest = self.rest;
            let comment = take_till::<_, _, ContextError>(0.., ['\n', '\r'])
                .parse_next(&mut rest)
                .map_or(self.rest.len(), |s: &str| s.len());
            self.advance(comment);
        }
    }

    fn advance(&mut self, len: usize) {
        let (consumed, rest) = self.rest.split_at(len);
        for c in consumed.chars() {
            match c {
                '\n' if self.after_cr => {}
                '\r' | '\n' => {
                    self.line += 1;
                    self.column = 0;
                }
                _ => self.column += 1,
            }
            self.after_cr = c == '\r';
        }
        self.rest = rest;
    }
}

impl Iterator for Scanner<'_> {
    type Item = Token;

    /// Yields tokens up to, but not including, `Eof`.
    fn next(&mut self) -> Option<Token> {
        let token = self.next_token();
        (token.kind != TokenKind::Eof).then_some(token)
    }
}
