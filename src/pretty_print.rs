use crate::{EnvError, Error, EvalError, ParseError};
use ariadne::{Label, Report, ReportKind, Source};
use std::io;
use std::ops::Range;

type ErrorReport<'a> = Report<'a, (&'a str, Range<usize>)>;

fn report<'a>(
    source_id: &'a str,
    range: Range<usize>,
    message: impl ToString,
    label: impl ToString,
) -> ErrorReport<'a> {
    Report::build(ReportKind::Error, (source_id, range.clone()))
        .with_message(message)
        .with_label(Label::new((source_id, range)).with_message(label))
        .finish()
}

impl EvalError {
    fn report<'a>(&self, source_id: &'a str) -> ErrorReport<'a> {
        let range = self.span().to_range();
        match self {
            EvalError::EnvError(EnvError::UnboundVariable(symbol, _)) => report(
                source_id,
                range,
                format!("Unbound symbol `{}`", symbol),
                "This symbol is not defined in the current scope",
            ),
            EvalError::NotAProcedure(found, _) => report(
                source_id,
                range,
                format!("Not a procedure: {}", found),
                "This expression cannot be called as a procedure",
            ),
            EvalError::InvalidArguments(message, _) => {
                report(source_id, range, "Invalid arguments", message)
            }
            EvalError::ArityMismatch { name, expected, .. } => report(
                source_id,
                range,
                self,
                format!("`{}` takes {} parameters", name, expected),
            ),
            EvalError::TypeMismatch { found, .. } => report(
                source_id,
                range,
                "Type mismatch",
                format!("Expected number, found {}", found),
            ),
            EvalError::NotASymbol(found, _) => report(
                source_id,
                range,
                format!("Not a symbol: {}", found),
                "Expected a symbol here",
            ),
            EvalError::InvalidSpecialForm(message, _) => report(
                source_id,
                range,
                format!("Invalid special form: {}", message),
                "This special form is malformed or incomplete",
            ),
            EvalError::EmptyApplication(_) => {
                report(source_id, range, self, "Nothing to call here")
            }
            EvalError::RecursionLimit { limit, .. } => report(
                source_id,
                range,
                self,
                format!("Evaluation nested more than {} levels here", limit),
            ),
        }
    }
}

impl ParseError {
    fn report<'a>(&self, source_id: &'a str, input: &str) -> ErrorReport<'a> {
        match self {
            ParseError::UnexpectedToken { found, expected } => report(
                source_id,
                found.span.to_range(),
                format!("Unexpected token: {}", found.kind),
                format!("Expected {expected}"),
            ),
            ParseError::UnexpectedEof(expected) => {
                let end = input.len();
                report(
                    source_id,
                    end.saturating_sub(1)..end,
                    "Unexpected end of input",
                    format!("Expected {expected}"),
                )
            }
            ParseError::TooDeep { span } => report(
                source_id,
                span.to_range(),
                self,
                "This list opens one level too many",
            ),
            ParseError::LexerError(lex_err) => report(
                source_id,
                lex_err.span.to_range(),
                "Lexer Error",
                lex_err.error.to_string(),
            ),
        }
    }
}

impl Error {
    /// Prints an annotated report of this error against `input` to stderr.
    pub fn pretty_print(&self, source_id: &str, input: &str) -> io::Result<()> {
        let report = match self {
            Error::Lex(lex_err) => report(
                source_id,
                lex_err.span.to_range(),
                "Lexer Error",
                lex_err.error.to_string(),
            ),
            Error::Parse(parse_err) => parse_err.report(source_id, input),
            Error::Eval(eval_err) => eval_err.report(source_id),
        };
        report.eprint((source_id, Source::from(input)))
    }
}
