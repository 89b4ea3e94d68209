//! Error and result types for the lexer and parser.

use adventure_ast::Position;
use std::fmt;
use thiserror::Error;

/// An error raised while turning source text into tokens.
#[derive(Debug, Clone, Error)]
pub enum LexError {
    #[error("unexpected character '{found}' at line {}, col {}", .position.line, .position.column)]
    UnexpectedChar { found: char, position: Position },
    #[error("unterminated string literal starting at line {}, col {}", .position.line, .position.column)]
    UnterminatedString { position: Position },
    #[error("unterminated raw string literal starting at line {}, col {}", .position.line, .position.column)]
    UnterminatedRawString { position: Position },
    #[error("invalid number literal '{text}' at line {}, col {}", .position.line, .position.column)]
    InvalidNumber { text: String, position: Position },
}

/// An error raised while parsing a token stream into an expression tree.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("expected {expected}, found {found} at line {}, col {}", .position.line, .position.column)]
    Expected {
        expected: &'static str,
        found: String,
        position: Position,
    },
    #[error("the expression grammar forbids an empty sequence")]
    EmptySequence,
    #[error("abrupt end of expression")]
    AbruptEnd,
}

impl ParseError {
    pub(crate) fn expected(expected: &'static str, found: impl fmt::Display, position: Position) -> Self {
        Self::Expected {
            expected,
            found: found.to_string(),
            position,
        }
    }
}
