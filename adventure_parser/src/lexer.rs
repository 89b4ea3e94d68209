//! Tokenizes the legacy expression grammar's source text.
//!
//! The grammar is small enough that a single upfront `tokenize` pass (rather
//! than a streaming `Iterator<Item = Token>`) keeps the parser simple: the
//! whole fragment between `<[` and `]>` is already in memory by the time the
//! renderer hands it here.

use crate::error::LexError;
use adventure_ast::Position;

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Str(String),
    RawStr(String),
    Num(f64),
    Dollar,
    Equals,
    LParen,
    RParen,
    Comma,
    Semicolon,
    Eof,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

impl Token {
    const fn new(kind: TokenKind, position: Position) -> Self {
        Self { kind, position }
    }
}

struct Cursor {
    chars: Vec<char>,
    index: usize,
    line: u32,
    column: u32,
}

impl Cursor {
    fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            index: 0,
            line: 1,
            column: 1,
        }
    }

    fn pos(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.chars.get(self.index + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.index += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }
}

/// Turns `src` into a token stream ending in `TokenKind::Eof`.
pub fn tokenize(src: &str) -> Result<Vec<Token>, LexError> {
    let mut cursor = Cursor::new(src);
    let mut tokens = Vec::new();

    loop {
        skip_whitespace(&mut cursor);
        let start = cursor.pos();
        let Some(c) = cursor.peek() else {
            tokens.push(Token::new(TokenKind::Eof, start));
            break;
        };

        let kind = match c {
            '$' => {
                cursor.advance();
                TokenKind::Dollar
            }
            '=' => {
                cursor.advance();
                TokenKind::Equals
            }
            '(' => {
                cursor.advance();
                TokenKind::LParen
            }
            ')' => {
                cursor.advance();
                TokenKind::RParen
            }
            ',' => {
                cursor.advance();
                TokenKind::Comma
            }
            ';' => {
                cursor.advance();
                TokenKind::Semicolon
            }
            '"' => lex_string(&mut cursor, start)?,
            '`' => lex_raw_string(&mut cursor, start)?,
            c if c.is_ascii_digit() => lex_number(&mut cursor, start)?,
            c if is_ident_start(c) => lex_ident(&mut cursor),
            other => return Err(LexError::UnexpectedChar { found: other, position: start }),
        };

        tokens.push(Token::new(kind, start));
    }

    Ok(tokens)
}

fn skip_whitespace(cursor: &mut Cursor) {
    while matches!(cursor.peek(), Some(c) if c.is_whitespace()) {
        cursor.advance();
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn lex_ident(cursor: &mut Cursor) -> TokenKind {
    let mut buf = String::new();
    while matches!(cursor.peek(), Some(c) if is_ident_continue(c)) {
        buf.push(cursor.advance().expect("peeked"));
    }
    TokenKind::Ident(buf)
}

fn lex_number(cursor: &mut Cursor, start: Position) -> Result<TokenKind, LexError> {
    let mut buf = String::new();
    while matches!(cursor.peek(), Some(c) if c.is_ascii_digit()) {
        buf.push(cursor.advance().expect("peeked"));
    }
    if cursor.peek() == Some('.') && matches!(cursor.peek2(), Some(c) if c.is_ascii_digit()) {
        buf.push(cursor.advance().expect("peeked"));
        while matches!(cursor.peek(), Some(c) if c.is_ascii_digit()) {
            buf.push(cursor.advance().expect("peeked"));
        }
    }
    buf.parse::<f64>()
        .map(TokenKind::Num)
        .map_err(|_| LexError::InvalidNumber { text: buf, position: start })
}

fn lex_string(cursor: &mut Cursor, start: Position) -> Result<TokenKind, LexError> {
    cursor.advance(); // opening quote
    let mut buf = String::new();
    loop {
        match cursor.advance() {
            None => return Err(LexError::UnterminatedString { position: start }),
            Some('"') => break,
            Some('\\') => match cursor.advance() {
                Some('n') => buf.push('\n'),
                Some('t') => buf.push('\t'),
                Some('r') => buf.push('\r'),
                Some('"') => buf.push('"'),
                Some('\\') => buf.push('\\'),
                Some(other) => buf.push(other),
                None => return Err(LexError::UnterminatedString { position: start }),
            },
            Some(c) => buf.push(c),
        }
    }
    Ok(TokenKind::Str(buf))
}

fn lex_raw_string(cursor: &mut Cursor, start: Position) -> Result<TokenKind, LexError> {
    cursor.advance(); // opening backtick
    let mut buf = String::new();
    loop {
        match cursor.advance() {
            None => return Err(LexError::UnterminatedRawString { position: start }),
            Some('`') => break,
            Some(c) => buf.push(c),
        }
    }
    Ok(TokenKind::RawStr(buf))
}
