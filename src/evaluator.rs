use crate::environment::{EnvError, Environment};
use crate::source::Span;
use crate::stack::ensure_sufficient_stack;
use crate::types::{Lambda, Node, Procedure, Sexpr, Value};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use thiserror::Error;
use tracing::trace;

/// Default bound on nested `evaluate` calls before giving up.
///
/// Every procedure call costs two levels (the call form, then its body), so
/// the default leaves room for roughly 5000 calls in flight. The stack grows
/// on demand, so the ceiling is this number and not the thread's stack size.
pub const MAX_EVAL_DEPTH: usize = 10_000;

// --- Evaluation Error ---
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error(transparent)]
    EnvError(#[from] EnvError),
    #[error("expected a procedure, but got: {0}")]
    NotAProcedure(String, Span),
    #[error("{0}")]
    InvalidArguments(String, Span),
    #[error("{name} expects {expected} parameters but was passed {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },
    #[error("'{operator}' expects a number for argument {position}, got {found}")]
    TypeMismatch {
        operator: String,
        position: usize,
        found: &'static str,
        span: Span,
    },
    #[error("expected a symbol, but got: {0}")]
    NotASymbol(String, Span),
    #[error("{0}")]
    InvalidSpecialForm(String, Span),
    #[error("cannot evaluate an empty list")]
    EmptyApplication(Span),
    #[error("recursion depth exceeded")]
    RecursionLimit { limit: usize, span: Span },
}

impl EvalError {
    pub fn span(&self) -> Span {
        match self {
            EvalError::EnvError(EnvError::UnboundVariable(_, span))
            | EvalError::NotAProcedure(_, span)
            | EvalError::InvalidArguments(_, span)
            | EvalError::ArityMismatch { span, .. }
            | EvalError::TypeMismatch { span, .. }
            | EvalError::NotASymbol(_, span)
            | EvalError::InvalidSpecialForm(_, span)
            | EvalError::EmptyApplication(span)
            | EvalError::RecursionLimit { span, .. } => *span,
        }
    }
}

// Result type alias for convenience
pub type EvalResult<T = Value> = Result<T, EvalError>;

/// Names handled by the evaluator itself rather than looked up.
pub fn special_form_identifiers() -> HashSet<String> {
    ["define", "if"].iter().map(|s| s.to_string()).collect()
}

// --- Evaluate Function ---

/// Evaluates a given AST Node within the specified environment.
pub fn evaluate(node: &Node, env: &Rc<RefCell<Environment>>) -> EvalResult {
    evaluate_with_limit(node, env, MAX_EVAL_DEPTH)
}

/// Like [`evaluate`], but fails once evaluation nests deeper than `limit`.
pub fn evaluate_with_limit(
    node: &Node,
    env: &Rc<RefCell<Environment>>,
    limit: usize,
) -> EvalResult {
    Evaluator { limit }.eval(node, env, 0)
}

struct Evaluator {
    limit: usize,
}

impl Evaluator {
    fn eval(&self, node: &Node, env: &Rc<RefCell<Environment>>, depth: usize) -> EvalResult {
        if depth >= self.limit {
            return Err(EvalError::RecursionLimit {
                limit: self.limit,
                span: node.span,
            });
        }

        ensure_sufficient_stack(|| self.eval_node(node, env, depth))
    }

    fn eval_node(&self, node: &Node, env: &Rc<RefCell<Environment>>, depth: usize) -> EvalResult {
        match &node.kind {
            Sexpr::Number(n) => Ok(Value::Number(*n)),

            Sexpr::Symbol(name) => Ok(env.borrow().get(name, node.span)?),

            Sexpr::List(elements) => match &elements[..] {
                [] => Err(EvalError::EmptyApplication(node.span)),
                [first, rest @ ..] => match first.as_symbol() {
                    Some("define") => self.eval_define(rest, env, depth, node.span),
                    Some("if") => self.eval_if(rest, env, depth, node.span),
                    _ => self.eval_application(first, rest, env, depth, node.span),
                },
            },
        }
    }

    fn eval_application(
        &self,
        operator: &Node,
        operands: &[Node],
        env: &Rc<RefCell<Environment>>,
        depth: usize,
        span: Span,
    ) -> EvalResult {
        // Arguments first, left to right, then the operator.
        let args = operands
            .iter()
            .map(|operand| self.eval(operand, env, depth + 1))
            .collect::<EvalResult<Vec<Value>>>()?;

        match self.eval(operator, env, depth + 1)? {
            Value::Procedure(Procedure::Primitive(func, _)) => func(&args, span),
            Value::Procedure(Procedure::Lambda(lambda)) => {
                self.apply_lambda(&lambda, args, depth, span)
            }
            other => Err(EvalError::NotAProcedure(
                format!("{} ({})", operator, other.type_name()),
                operator.span,
            )),
        }
    }

    fn apply_lambda(
        &self,
        lambda: &Lambda,
        args: Vec<Value>,
        depth: usize,
        span: Span,
    ) -> EvalResult {
        if args.len() != lambda.params.len() {
            return Err(EvalError::ArityMismatch {
                name: lambda.name.clone(),
                expected: lambda.params.len(),
                found: args.len(),
                span,
            });
        }
        trace!(name = %lambda.name, depth, "calling procedure");

        let call_env = Environment::new_enclosed(lambda.env.clone());
        {
            let mut frame = call_env.borrow_mut();
            for (param, arg) in lambda.params.iter().zip(args) {
                frame.define(param.clone(), arg);
            }
        }

        let mut result = Value::Unspecified;
        for expr in &lambda.body {
            result = self.eval(expr, &call_env, depth + 1)?;
        }
        Ok(result)
    }

    fn eval_define(
        &self,
        operands: &[Node],
        env: &Rc<RefCell<Environment>>,
        depth: usize,
        span: Span,
    ) -> EvalResult {
        let [target, body @ ..] = operands else {
            return Err(define_arity_error(span));
        };
        if body.is_empty() {
            return Err(define_arity_error(span));
        }

        match &target.kind {
            Sexpr::Symbol(name) => {
                let [expr] = body else {
                    return Err(EvalError::InvalidSpecialForm(
                        "define of a variable takes exactly 2 arguments".to_string(),
                        span,
                    ));
                };
                let value = self.eval(expr, env, depth + 1)?;
                trace!(%name, "define variable");
                env.borrow_mut().define(name.clone(), value);
                Ok(Value::Unspecified)
            }
            Sexpr::List(signature) => {
                let Some((name_node, param_nodes)) = signature.split_first() else {
                    return Err(EvalError::InvalidSpecialForm(
                        "define needs a procedure name".to_string(),
                        target.span,
                    ));
                };
                // Validate the whole signature before binding anything.
                let name = symbol_name(name_node)?;
                let params = param_nodes
                    .iter()
                    .map(symbol_name)
                    .collect::<EvalResult<Vec<String>>>()?;

                trace!(%name, ?params, "define procedure");
                let lambda = Lambda {
                    name: name.clone(),
                    params,
                    body: body.to_vec(),
                    env: env.clone(),
                };
                env.borrow_mut()
                    .define(name, Value::Procedure(Procedure::Lambda(Rc::new(lambda))));
                Ok(Value::Unspecified)
            }
            Sexpr::Number(_) => Err(EvalError::NotASymbol(target.to_string(), target.span)),
        }
    }

    fn eval_if(
        &self,
        operands: &[Node],
        env: &Rc<RefCell<Environment>>,
        depth: usize,
        span: Span,
    ) -> EvalResult {
        let [condition, consequent, alternate] = operands else {
            return Err(EvalError::InvalidSpecialForm(
                "if takes 3 arguments".to_string(),
                span,
            ));
        };

        // Only the chosen branch is evaluated.
        if self.eval(condition, env, depth + 1)?.is_truthy() {
            self.eval(consequent, env, depth + 1)
        } else {
            self.eval(alternate, env, depth + 1)
        }
    }
}

fn define_arity_error(span: Span) -> EvalError {
    EvalError::InvalidSpecialForm("define takes at least 2 arguments".to_string(), span)
}

fn symbol_name(node: &Node) -> EvalResult<String> {
    node.as_symbol()
        .map(str::to_string)
        .ok_or_else(|| EvalError::NotASymbol(node.to_string(), node.span))
}
