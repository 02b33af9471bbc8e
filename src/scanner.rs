//! Module `scanner` implements a one‑pass, streaming lexer for the Replit language.
//!
//! It transforms a source string into a sequence of `Token<'a>`s, skipping whitespace
//! and comments, and emitting exactly one `EOF` token at the end. Designed as a `FusedIterator`,
//! it can be chained safely with other iterator adapters.
//!
//! # Public API
//!
//! - `Scanner::new(src: &'a str) -> Scanner<'a>`
//!   Create a new lexer over the input text.
//!
//! - `impl Iterator for Scanner<'a>`
//!   Yields `Result<Token<'a>, ReplitError>` on each `.next()`, where `Ok(token)` is a scanned token
//!   and `Err` reports a lexing error with line and column. Scanning continues after an error
//!   so every problem in the input is reported.
//!
//! - `Scanner::reset()` rewinds to the beginning of the input.
//!
//! # Token Recognition
//!
//! - Punctuation: `(`, `)`, `{`, `}`, `[`, `]`, `,`, `.`, `;`, `:`.
//! - Operators: `+ - * / % = ! < >`, the two‑character forms `!= == <= >= -> += -= *= /=`,
//!   and `&&`/`||` as spellings of `and`/`or`.
//! - String literals: `"` … `"`, multi‑line, with `\n \t \r \0 \\ \"` escapes.
//! - Numeric literals: integer and optional fractional part.
//! - Identifiers/keywords: alphanumeric/_ sequences, resolved via a perfect‑hash `KEYWORDS` map.
//! - Comments: `//` to end of line and `/* … */`.
//!
//! # Example
//!
//! ```rust
//! use replit_lang::scanner::Scanner;
//!
//! let mut scanner = Scanner::new("print 123; // example");
//! for result in &mut scanner {
//!     match result {
//!         Ok(token) => println!("{}", token),
//!         Err(err) => eprintln!("Lex error: {}", err),
//!     }
//! }
//! ```

use crate::error::{ReplitError, Result};
use crate::token::{Position, Token, TokenType};
use log::{info, trace};
use memchr::{memchr, memchr_iter, memmem};
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"       => TokenType::AND,
    b"break"     => TokenType::BREAK,
    b"class"     => TokenType::CLASS,
    b"continue"  => TokenType::CONTINUE,
    b"else"      => TokenType::ELSE,
    b"extends"   => TokenType::EXTENDS,
    b"false"     => TokenType::FALSE,
    b"fn"        => TokenType::FN,
    b"for"       => TokenType::FOR,
    b"if"        => TokenType::IF,
    b"let"       => TokenType::VAR,
    b"nil"       => TokenType::NIL,
    b"or"        => TokenType::OR,
    b"override"  => TokenType::OVERRIDE,
    b"print"     => TokenType::PRINT,
    b"private"   => TokenType::PRIVATE,
    b"protected" => TokenType::PROTECTED,
    b"public"    => TokenType::PUBLIC,
    b"return"    => TokenType::RETURN,
    b"super"     => TokenType::SUPER,
    b"this"      => TokenType::THIS,
    b"true"      => TokenType::TRUE,
    b"var"       => TokenType::VAR,
    b"virtual"   => TokenType::VIRTUAL,
    b"while"     => TokenType::WHILE,
};

/// A single pass **scanner / lexer** that converts source text into a
/// sequence of [`Token`]s.  The lifetime `'a` ties every emitted token’s
/// `lexeme` slice back to the original source buffer.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    text: &'a str,
    src: &'a [u8],              // same buffer, byte view
    start: usize,               // index of the *first* byte of the current lexeme
    curr: usize,                // index *one past* the last byte examined
    line: usize,                // 1‑based line counter (\n increments)
    line_start: usize,          // byte index where the current line begins
    token_line: usize,          // line of `start`
    token_column: usize,        // column of `start`
    pending: Option<TokenType>, // recognised token kind waiting to be emitted
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `text`.
    #[inline]
    pub fn new(text: &'a str) -> Self {
        info!("Scanner created over {} bytes", text.len());

        Self {
            text,
            src: text.as_bytes(),
            start: 0,
            curr: 0,
            line: 1,
            line_start: 0,
            token_line: 1,
            token_column: 1,
            pending: None,
        }
    }

    /// Rewind to the beginning of the input; the next call to `next()`
    /// yields the first token again.
    pub fn reset(&mut self) {
        trace!("Scanner reset");

        self.start = 0;
        self.curr = 0;
        self.line = 1;
        self.line_start = 0;
        self.token_line = 1;
        self.token_column = 1;
        self.pending = None;
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    const fn len(&self) -> usize {
        self.src.len()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.len()
    }

    /// Advance one byte and return it.  Callers guard with [`is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.src[self.curr];
        self.curr += 1;
        b
    }

    /// Peek at the current byte without consuming it.  Returns `0` past EOF.
    #[inline(always)]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.src[self.curr]
        }
    }

    #[inline(always)]
    fn peek_next(&self) -> u8 {
        if self.curr + 1 >= self.len() {
            0
        } else {
            self.src[self.curr + 1]
        }
    }

    /// Conditionally consume a byte **iff** it matches `expected`.
    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Record that a `\n` ending at `self.curr` was consumed.
    #[inline(always)]
    fn newline(&mut self) {
        self.line += 1;
        self.line_start = self.curr;
    }

    #[inline]
    fn here(&self) -> Position {
        Position::new(self.line, self.curr - self.line_start + 1)
    }

    #[inline]
    fn token_start(&self) -> Position {
        Position::new(self.token_line, self.token_column)
    }

    /// Pick `long` if the next byte is `next`, otherwise `short`.
    #[inline(always)]
    fn either(&mut self, next: u8, long: TokenType, short: TokenType) -> TokenType {
        if self.match_byte(next) {
            long
        } else {
            short
        }
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* token starting at `self.curr`.  If the lexeme produces an
    /// actual token the kind is stored in `self.pending`.  Whitespace and
    /// comments are skipped by returning `Ok(())` with `pending = None`.
    fn scan_token(&mut self) -> Result<()> {
        let b = self.advance();

        let tt = match b {
            // ── single‑character punctuators ──────────────────────────────
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b'[' => TokenType::LEFT_BRACKET,
            b']' => TokenType::RIGHT_BRACKET,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b';' => TokenType::SEMICOLON,
            b':' => TokenType::COLON,
            b'%' => TokenType::PERCENT,

            // ── operators with an optional second character ──────────────
            b'+' => self.either(b'=', TokenType::PLUS_EQUAL, TokenType::PLUS),
            b'*' => self.either(b'=', TokenType::STAR_EQUAL, TokenType::STAR),
            b'!' => self.either(b'=', TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.either(b'=', TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            b'<' => self.either(b'=', TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.either(b'=', TokenType::GREATER_EQUAL, TokenType::GREATER),
            b'-' => {
                if self.match_byte(b'>') {
                    TokenType::ARROW
                } else {
                    self.either(b'=', TokenType::MINUS_EQUAL, TokenType::MINUS)
                }
            }

            b'&' if self.match_byte(b'&') => TokenType::AND,
            b'|' if self.match_byte(b'|') => TokenType::OR,

            // ── whitespace / newline ─────────────────────────────────────
            b' ' | b'\r' | b'\t' => return Ok(()),

            b'\n' => {
                self.newline();
                return Ok(());
            }

            // ── comments and slash ───────────────────────────────────────
            b'/' => {
                if self.match_byte(b'/') {
                    // Fast‑forward to the next newline; the newline itself is
                    // scanned normally so line tracking stays in one place.
                    match memchr(b'\n', &self.src[self.curr..]) {
                        Some(pos) => self.curr += pos,
                        None => self.curr = self.len(),
                    }

                    return Ok(());
                }

                if self.match_byte(b'*') {
                    return self.skip_block_comment();
                }

                self.either(b'=', TokenType::SLASH_EQUAL, TokenType::SLASH)
            }

            b'"' => return self.parse_string(),

            b'0'..=b'9' => self.parse_number(),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.parse_identifier(),

            // ── unexpected character ─────────────────────────────────────
            _ => {
                // Swallow the rest of a multi‑byte character so it is reported once.
                if b >= 0x80 {
                    while !self.is_at_end() && (self.peek() & 0xC0) == 0x80 {
                        self.advance();
                    }
                }

                let ch: &str = self.text.get(self.start..self.curr).unwrap_or("?");

                return Err(ReplitError::lex(
                    self.token_start(),
                    format!("Unexpected character: {}", ch),
                ));
            }
        };

        self.pending = Some(tt);

        Ok(())
    }

    fn skip_block_comment(&mut self) -> Result<()> {
        let rest: &[u8] = &self.src[self.curr..];

        let Some(end) = memmem::find(rest, b"*/") else {
            return Err(ReplitError::lex(
                self.token_start(),
                "Unterminated block comment.",
            ));
        };

        for offset in memchr_iter(b'\n', &rest[..end]) {
            self.line += 1;
            self.line_start = self.curr + offset + 1;
        }

        self.curr += end + 2;

        Ok(())
    }

    /// Parse a double‑quoted string literal.
    ///
    /// * `self.start` still points to the opening `"`.
    /// * When we return, `self.curr` points **past** the closing `"`.
    fn parse_string(&mut self) -> Result<()> {
        let mut value: String = String::new();
        let mut segment: usize = self.curr;

        while !self.is_at_end() && self.peek() != b'"' {
            match self.advance() {
                b'\n' => self.newline(),

                b'\\' => {
                    value.push_str(&self.text[segment..self.curr - 1]);

                    let escape_at: Position = Position::new(self.line, self.curr - self.line_start);

                    if self.is_at_end() {
                        break;
                    }

                    let escaped: char = match self.advance() {
                        b'n' => '\n',
                        b't' => '\t',
                        b'r' => '\r',
                        b'0' => '\0',
                        b'\\' => '\\',
                        b'"' => '"',
                        other => {
                            return Err(ReplitError::lex(
                                escape_at,
                                format!("Invalid escape sequence: \\{}", other as char),
                            ));
                        }
                    };

                    value.push(escaped);
                    segment = self.curr;
                }

                _ => {}
            }
        }

        if self.is_at_end() {
            return Err(ReplitError::lex(self.token_start(), "Unterminated string."));
        }

        value.push_str(&self.text[segment..self.curr]);

        self.advance(); // consume closing quote

        self.pending = Some(TokenType::STRING(value));

        Ok(())
    }

    /// Parse a numeric literal (`123`, `3.14`).  Fractions are optional.
    fn parse_number(&mut self) -> TokenType {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance(); // consume "."

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let s: &str = &self.text[self.start..self.curr];

        // digits with at most one interior dot always parse
        TokenType::NUMBER(s.parse::<f64>().unwrap_or(0.0))
    }

    /// Parse an identifier and decide if it is a **keyword** or a generic
    /// `IDENTIFIER` token.
    fn parse_identifier(&mut self) -> TokenType {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        let slice: &[u8] = &self.src[self.start..self.curr];

        KEYWORDS
            .get(slice)
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.curr <= self.len() {
            // EOF guard – emit exactly one EOF then terminate.
            if self.curr == self.len() {
                let at: Position = self.here();
                self.curr += 1; // fused from here on
                return Some(Ok(Token::new(TokenType::EOF, "", at.line, at.column)));
            }

            self.start = self.curr;
            self.token_line = self.line;
            self.token_column = self.curr - self.line_start + 1;
            self.pending = None;

            if let Err(e) = self.scan_token() {
                return Some(Err(e));
            }

            if let Some(tt) = self.pending.take() {
                let lex: &'a str = &self.text[self.start..self.curr];
                trace!("Scanned token ({:?}) at {}", tt, self.token_start());

                return Some(Ok(Token::new(
                    tt,
                    lex,
                    self.token_line,
                    self.token_column,
                )));
            }
            // Otherwise it was whitespace / comment → continue loop.
        }

        None // already yielded EOF
    }
}

impl<'a> FusedIterator for Scanner<'a> {}

/// Scan the whole input, stopping at the first lexical error.
pub fn tokenize(text: &str) -> Result<Vec<Token<'_>>> {
    Scanner::new(text).collect()
}
