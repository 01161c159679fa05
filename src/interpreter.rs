use crate::environment::Environment;
use crate::evaluator::{EvalError, MAX_EVAL_DEPTH, evaluate_with_limit};
use crate::lexer::{LexError, tokenize};
use crate::parser::{ParseError, parse};
use crate::source::Span;
use crate::types::Value;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;
use tracing::debug;

/// Any failure from running source text through the pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("Lexer Error: {0}")]
    Lex(#[from] LexError),
    #[error("Parse Error: {0}")]
    Parse(#[from] ParseError),
    #[error("Error: {0}")]
    Eval(#[from] EvalError),
}

impl Error {
    /// Source location to point at, when the error has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Lex(err) => Some(err.span),
            Error::Parse(ParseError::UnexpectedToken { found, .. }) => Some(found.span),
            Error::Parse(ParseError::TooDeep { span }) => Some(*span),
            Error::Parse(ParseError::LexerError(err)) => Some(err.span),
            Error::Parse(ParseError::UnexpectedEof(_)) => None,
            Error::Eval(err) => Some(err.span()),
        }
    }
}

/// Runs every top-level form in `source` against `env` and returns the value
/// of the last one.
///
/// Forms are evaluated as they are parsed, so definitions made before a
/// failing form stay in `env`.
pub fn execute(source: &str, env: &Rc<RefCell<Environment>>) -> Result<Value, Error> {
    execute_with_limit(source, env, MAX_EVAL_DEPTH)
}

pub fn execute_with_limit(
    source: &str,
    env: &Rc<RefCell<Environment>>,
    max_depth: usize,
) -> Result<Value, Error> {
    let tokens = tokenize(source)?;
    let mut result = Value::Unspecified;
    let mut index = 0;
    while index < tokens.len() {
        let (node, next) = parse(&tokens, index)?;
        debug!(form = %node, "evaluating top-level form");
        result = evaluate_with_limit(&node, env, max_depth)?;
        index = next;
    }
    Ok(result)
}
