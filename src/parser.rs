use crate::Span;
use crate::lexer::{LexError, Token, TokenKind};
use crate::stack::ensure_sufficient_stack;
use crate::types::{Node, Sexpr};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("unexpected token '{}' at {}, expected {expected}", .found.kind, .found.span)]
    UnexpectedToken { found: Token, expected: String },
    #[error("unexpected end of input, expected {0}")]
    UnexpectedEof(String),
    #[error("expression nested more than {} levels deep at {span}", MAX_PARSE_DEPTH)]
    TooDeep { span: Span },
    #[error(transparent)]
    LexerError(#[from] LexError), // Only produced by `parse_str`
}

/// Deepest list nesting the parser accepts.
pub const MAX_PARSE_DEPTH: usize = 512;

// Result type alias for convenience
pub type ParseResult<T> = Result<T, ParseError>;

/// Recursive-descent reader over a borrowed token slice.
///
/// Each call to [`Parser::parse_expr`] consumes exactly one form, leaving the
/// cursor on the token right after it.
pub struct Parser<'a> {
    tokens: &'a [Token],
    position: usize,
    depth: usize, // Lists currently open
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Parser::starting_at(tokens, 0)
    }

    pub fn starting_at(tokens: &'a [Token], position: usize) -> Self {
        Parser {
            tokens,
            position,
            depth: 0,
        }
    }

    /// Index of the next unconsumed token.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    // Consumes the next token if available.
    fn next_token(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.position)?;
        self.position += 1;
        Some(token)
    }

    fn peek_token(&self) -> Option<&'a Token> {
        self.tokens.get(self.position)
    }

    /// Parses a single form: an atom, or a parenthesised list of forms.
    pub fn parse_expr(&mut self) -> ParseResult<Node> {
        match self.next_token() {
            Some(Token {
                kind: TokenKind::LParen,
                span,
            }) => ensure_sufficient_stack(|| self.parse_list(*span)),
            Some(Token {
                kind: TokenKind::Number(n),
                span,
            }) => Ok(Node::new(Sexpr::Number(*n), *span)),
            Some(Token {
                kind: TokenKind::Symbol(s),
                span,
            }) => Ok(Node::new(Sexpr::Symbol(s.clone()), *span)),
            // Only a stray ')' is left
            Some(found) => Err(ParseError::UnexpectedToken {
                found: found.clone(),
                expected: "an expression".to_string(),
            }),
            None => Err(ParseError::UnexpectedEof("an expression".to_string())),
        }
    }

    /// Parses the rest of a list whose '(' has already been consumed.
    fn parse_list(&mut self, lparen_span: Span) -> ParseResult<Node> {
        if self.depth >= MAX_PARSE_DEPTH {
            return Err(ParseError::TooDeep { span: lparen_span });
        }
        self.depth += 1;

        let mut elements = Vec::new();
        loop {
            match self.peek_token() {
                Some(Token {
                    kind: TokenKind::RParen,
                    span,
                }) => {
                    self.position += 1;
                    self.depth -= 1;
                    return Ok(Node::new(Sexpr::List(elements), lparen_span.merge(*span)));
                }
                Some(_) => elements.push(self.parse_expr()?),
                None => return Err(ParseError::UnexpectedEof(")".to_string())),
            }
        }
    }
}

/// Parses one form starting at token index `start`.
///
/// Returns the form and the index just past it, so callers can step through a
/// token stream holding several top-level forms.
pub fn parse(tokens: &[Token], start: usize) -> ParseResult<(Node, usize)> {
    let mut parser = Parser::starting_at(tokens, start);
    let node = parser.parse_expr()?;
    Ok((node, parser.position()))
}

// Helper function to lex and parse a single form directly (useful for tests and REPL)
pub fn parse_str(input: &str) -> ParseResult<Node> {
    let tokens = crate::lexer::tokenize(input)?;
    let mut parser = Parser::new(&tokens);
    let expr = parser.parse_expr()?;

    match parser.next_token() {
        Some(found) => Err(ParseError::UnexpectedToken {
            found: found.clone(),
            expected: "end of input".to_string(),
        }),
        None => Ok(expr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn assert_parse(input: &str, expected: Node) {
        match parse_str(input) {
            Ok(result) => assert_eq!(result, expected, "Input: '{}'", input),
            Err(e) => panic!("Parsing failed for input '{}': {}", input, e),
        }
    }

    // Helper function to parse a single expression, then get its string representation.
    fn assert_parsed_sexpr_string(input: &str, expected_output: &str) {
        let node = match parse_str(input) {
            Ok(result) => result,
            Err(e) => panic!("Parsing failed for input '{}': {}", input, e),
        };
        assert_eq!(node.to_string(), expected_output, "Input: '{}'", input);
    }

    fn node_number(n: f64, start: usize, end: usize) -> Node {
        Node::new_number(n, Span::new(start, end))
    }

    fn node_symbol(s: &str, start: usize, end: usize) -> Node {
        Node::new_symbol(s, Span::new(start, end))
    }

    fn node_list(nodes: Vec<Node>, start: usize, end: usize) -> Node {
        Node::new_list(nodes, Span::new(start, end))
    }

    #[test]
    fn test_parse_atoms() {
        assert_parse("123", node_number(123.0, 0, 3));
        assert_parse("symbol", node_symbol("symbol", 0, 6));
        assert_parse("+", node_symbol("+", 0, 1));
    }

    #[test]
    fn test_parse_empty_list() {
        assert_parse("()", node_list(vec![], 0, 2));
        assert_parse("( )", node_list(vec![], 0, 3));
    }

    #[test]
    fn test_parse_simple_list() {
        assert_parse(
            "(+ 10 3)",
            node_list(
                vec![
                    node_symbol("+", 1, 2),
                    node_number(10.0, 3, 5),
                    node_number(3.0, 6, 7),
                ],
                0,
                8,
            ),
        );
    }

    #[test]
    fn test_parse_nested_list() {
        assert_parse(
            "(a (b c) d)",
            node_list(
                vec![
                    node_symbol("a", 1, 2),
                    node_list(vec![node_symbol("b", 4, 5), node_symbol("c", 6, 7)], 3, 8),
                    node_symbol("d", 9, 10),
                ],
                0,
                11,
            ),
        );
        assert_parsed_sexpr_string("(()())", "(() ())");
        assert_parsed_sexpr_string(
            "(define (square x)\n (* x x))",
            "(define (square x) (* x x))",
        );
    }

    #[test]
    fn test_parse_returns_next_index() {
        let tokens = tokenize("(define x 5) (+ x 1) y").unwrap();

        let (first, next) = parse(&tokens, 0).unwrap();
        assert_eq!(first.to_string(), "(define x 5)");
        assert_eq!(next, 5);

        let (second, next) = parse(&tokens, next).unwrap();
        assert_eq!(second.to_string(), "(+ x 1)");
        assert_eq!(next, 10);

        let (third, next) = parse(&tokens, next).unwrap();
        assert_eq!(third, node_symbol("y", 21, 22));
        assert_eq!(next, tokens.len());
    }

    #[test]
    fn test_parse_consumes_exactly_one_form() {
        for input in ["(+ (* 2 3 5) (+ 6 5 3 1))", "((()))", "(a (b (c d)) e)", "42"] {
            let tokens = tokenize(input).unwrap();
            let (_, next) = parse(&tokens, 0).unwrap();
            assert_eq!(next, tokens.len(), "Input: '{}'", input);
        }
    }

    #[test]
    fn test_parse_unterminated_list() {
        let tokens = tokenize("(+ 1 2").unwrap();
        let err = parse(&tokens, 0).unwrap_err();
        assert_eq!(err, ParseError::UnexpectedEof(")".to_string()));
        assert_eq!(err.to_string(), "unexpected end of input, expected )");
        assert!(matches!(
            parse_str("(a (b c)"),
            Err(ParseError::UnexpectedEof(_))
        ));
    }

    #[test]
    fn test_parse_trailing_close_paren() {
        let tokens = tokenize("(+ 1 2))").unwrap();
        let (node, next) = parse(&tokens, 0).unwrap();
        assert_eq!(node.to_string(), "(+ 1 2)");
        assert_eq!(next, 5);

        let err = parse(&tokens, next).unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnexpectedToken { found: Token { kind: TokenKind::RParen, .. }, .. }
        ));
        assert!(matches!(
            parse_str("(+ 1 2))"),
            Err(ParseError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_parse_past_end() {
        let tokens = tokenize("").unwrap();
        assert_eq!(
            parse(&tokens, 0),
            Err(ParseError::UnexpectedEof("an expression".to_string()))
        );
    }

    fn nested(levels: usize) -> String {
        format!("{}{}", "(".repeat(levels), ")".repeat(levels))
    }

    #[test]
    fn test_parse_depth_limit() {
        assert!(parse_str(&nested(MAX_PARSE_DEPTH)).is_ok());
        assert!(matches!(
            parse_str(&nested(MAX_PARSE_DEPTH + 1)),
            Err(ParseError::TooDeep { span }) if span == Span::new(MAX_PARSE_DEPTH, MAX_PARSE_DEPTH + 1)
        ));
    }

    #[test]
    fn test_parse_unclosed_deep_nesting_is_error() {
        let tokens = tokenize(&"(".repeat(100_000)).unwrap();
        assert!(matches!(
            parse(&tokens, 0),
            Err(ParseError::TooDeep { .. })
        ));
    }

    #[test]
    fn test_sibling_lists_do_not_accumulate_depth() {
        let input = format!("(list {})", "(a) ".repeat(MAX_PARSE_DEPTH * 2));
        assert!(parse_str(&input).is_ok());
    }

    #[test]
    fn test_parse_str_propagates_lexer_error() {
        assert!(matches!(
            parse_str("(+ ..5 1)"),
            Err(ParseError::LexerError(_))
        ));
    }
}
