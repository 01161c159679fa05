use logos::Logos;
use std::fmt;
use thiserror::Error;

use crate::Span;

/// Token kinds produced by the scanner.
///
/// A run of digits and `.` is always read as a number literal (no sign, no
/// exponent). Anything else that is not whitespace or a parenthesis is a
/// symbol, so operators such as `+` and `<=` lex the same way identifiers do.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"\s+")] // Skip whitespace
#[logos(error = LexErrorKind)]
pub enum TokenKind {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[regex(r"[0-9.]+", |lex| {
        let slice = lex.slice();
        slice
            .parse::<f64>()
            .map_err(|_| LexErrorKind::InvalidNumberFormat(slice.to_string()))
    })]
    Number(f64),
    #[regex(r"[^\s()0-9.][^\s()]*", |lex| lex.slice().to_string())]
    Symbol(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Symbol(s) => write!(f, "{}", s),
            TokenKind::Number(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Error)]
pub enum LexErrorKind {
    #[error("invalid number literal '{0}'")]
    InvalidNumberFormat(String),
    #[default]
    #[error("invalid token")]
    InvalidToken,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{error} at position {}", .span.start)]
pub struct LexError {
    pub error: LexErrorKind,
    pub span: Span,
}

impl LexError {
    /// Byte offset into the input where the offending literal starts.
    pub fn position(&self) -> usize {
        self.span.start
    }
}

pub type LexResult<T> = Result<T, LexError>;

/// Scans `input` left to right into tokens.
///
/// Fails only on a digit/dot run that is not a valid float, such as `..5`.
pub fn tokenize(input: &str) -> LexResult<Vec<Token>> {
    TokenKind::lexer(input)
        .spanned()
        .map(|(result, range)| match result {
            Ok(kind) => Ok(Token {
                kind,
                span: range.into(),
            }),
            Err(error) => Err(LexError {
                error,
                span: range.into(),
            }),
        })
        .collect()
}
