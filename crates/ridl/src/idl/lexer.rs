// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tokenizer for the IDL syntax.

use crate::idl::ParseError;

/// Token payload. Literal values are decoded here so the parser never
/// re-inspects raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier or qualified identifier (`Name`, `program.Name`).
    Identifier,
    /// Quoted string, with quotes stripped and escapes applied.
    StringLiteral(String),
    IntLiteral(i64),
    DoubleLiteral(f64),
    /// One of `{ } ( ) [ ] < > , ; : =`.
    Symbol(char),
}

/// A token with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Raw token text as written.
    pub text: String,
    /// 1-based line.
    pub line: usize,
    /// 0-based column of the first character.
    pub pos: usize,
}

impl Token {
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn is_identifier(&self, text: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text == text
    }

    pub fn is_symbol(&self, symbol: char) -> bool {
        self.kind == TokenKind::Symbol(symbol)
    }
}

const SYMBOLS: &[char] = &['{', '}', '(', ')', '[', ']', '<', '>', ',', ';', ':', '='];

struct Lexer<'a> {
    chars: Vec<char>,
    index: usize,
    line: usize,
    pos: usize,
    lines: &'a [String],
}

/// Tokenize a whole source blob. Returns the token stream and the raw
/// source lines (for diagnostics further down the pipeline).
pub(crate) fn tokenize(source: &str) -> Result<(Vec<Token>, Vec<String>), ParseError> {
    let lines: Vec<String> = source.lines().map(str::to_string).collect();
    let mut lexer = Lexer {
        chars: source.chars().collect(),
        index: 0,
        line: 1,
        pos: 0,
        lines: &lines,
    };
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok((tokens, lines))
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.index += 1;
        if c == '\n' {
            self.line += 1;
            self.pos = 0;
        } else {
            self.pos += 1;
        }
        Some(c)
    }

    fn line_text(&self, line: usize) -> &str {
        self.lines.get(line - 1).map(String::as_str).unwrap_or("")
    }

    fn error(&self, message: impl Into<String>, line: usize, pos: usize, len: usize) -> ParseError {
        ParseError::new(message, line, pos, len, self.line_text(line))
    }

    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        self.skip_trivia()?;
        let (line, pos) = (self.line, self.pos);
        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(None),
        };

        if SYMBOLS.contains(&c) {
            self.bump();
            return Ok(Some(Token {
                kind: TokenKind::Symbol(c),
                text: c.to_string(),
                line,
                pos,
            }));
        }
        if c == '"' || c == '\'' {
            return self.string_literal(c).map(Some);
        }
        if c.is_ascii_digit() || ((c == '-' || c == '+') && self.peek_at(1).is_some_and(|n| n.is_ascii_digit() || n == '.')) {
            return self.number().map(Some);
        }
        if c == '.' && self.peek_at(1).is_some_and(|n| n.is_ascii_digit()) {
            return self.number().map(Some);
        }
        if c.is_ascii_alphabetic() || c == '_' {
            return self.identifier().map(Some);
        }

        Err(self.error(format!("Unknown token start '{}'", c), line, pos, 1))
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => self.skip_line(),
                Some('/') if self.peek_at(1) == Some('/') => self.skip_line(),
                Some('/') if self.peek_at(1) == Some('*') => {
                    let (line, pos) = (self.line, self.pos);
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                            None => {
                                return Err(self.error(
                                    "Unterminated block comment",
                                    line,
                                    pos,
                                    2,
                                ))
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn string_literal(&mut self, quote: char) -> Result<Token, ParseError> {
        let (line, pos) = (self.line, self.pos);
        let mut text = String::new();
        let mut value = String::new();
        text.push(quote);
        self.bump();
        loop {
            match self.bump() {
                Some(c) if c == quote => {
                    text.push(quote);
                    break;
                }
                Some('\\') => {
                    let escaped = self.bump().ok_or_else(|| {
                        self.error("Unterminated string literal", line, pos, text.chars().count())
                    })?;
                    text.push('\\');
                    text.push(escaped);
                    value.push(match escaped {
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        '0' => '\0',
                        other => other,
                    });
                }
                Some('\n') | None => {
                    return Err(self.error(
                        "Unterminated string literal",
                        line,
                        pos,
                        text.chars().count(),
                    ))
                }
                Some(c) => {
                    text.push(c);
                    value.push(c);
                }
            }
        }
        Ok(Token {
            kind: TokenKind::StringLiteral(value),
            text,
            line,
            pos,
        })
    }

    fn number(&mut self) -> Result<Token, ParseError> {
        let (line, pos) = (self.line, self.pos);
        let mut text = String::new();
        if matches!(self.peek(), Some('-') | Some('+')) {
            text.push(self.bump().unwrap_or('-'));
        }
        // Hex integers.
        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x') | Some('X')) {
            text.push(self.bump().unwrap_or('0'));
            text.push(self.bump().unwrap_or('x'));
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                text.push(self.bump().unwrap_or('0'));
            }
            let digits = text.trim_start_matches(['-', '+']);
            let negative = text.starts_with('-');
            let value = i64::from_str_radix(&digits[2..], 16).map_err(|_| {
                self.error(
                    format!("Invalid hex literal '{}'", text),
                    line,
                    pos,
                    text.chars().count(),
                )
            })?;
            return Ok(Token {
                kind: TokenKind::IntLiteral(if negative { -value } else { value }),
                text,
                line,
                pos,
            });
        }

        let mut is_double = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(self.bump().unwrap_or('0'));
            } else if c == '.' && !is_double {
                is_double = true;
                text.push(self.bump().unwrap_or('.'));
            } else if (c == 'e' || c == 'E') && !text.ends_with(['e', 'E']) {
                is_double = true;
                text.push(self.bump().unwrap_or('e'));
                if matches!(self.peek(), Some('-') | Some('+')) {
                    text.push(self.bump().unwrap_or('-'));
                }
            } else {
                break;
            }
        }

        let kind = if is_double {
            TokenKind::DoubleLiteral(text.parse::<f64>().map_err(|_| {
                self.error(
                    format!("Invalid number '{}'", text),
                    line,
                    pos,
                    text.chars().count(),
                )
            })?)
        } else {
            TokenKind::IntLiteral(text.parse::<i64>().map_err(|_| {
                self.error(
                    format!("Invalid integer '{}'", text),
                    line,
                    pos,
                    text.chars().count(),
                )
            })?)
        };
        Ok(Token {
            kind,
            text,
            line,
            pos,
        })
    }

    fn identifier(&mut self) -> Result<Token, ParseError> {
        let (line, pos) = (self.line, self.pos);
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                text.push(self.bump().unwrap_or('_'));
            } else if c == '.'
                && self
                    .peek_at(1)
                    .is_some_and(|n| n.is_ascii_alphabetic() || n == '_')
            {
                // Qualified identifier: program.Type or Enum.VALUE.
                text.push(self.bump().unwrap_or('.'));
            } else {
                break;
            }
        }
        Ok(Token {
            kind: TokenKind::Identifier,
            text,
            line,
            pos,
        })
    }
}
