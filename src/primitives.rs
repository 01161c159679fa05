use crate::{EvalError, EvalResult, Span, Value};

// Checks the number of arguments
macro_rules! check_arity {
    // Variant for minimum number of args
    ($args:expr, min $expected:expr, $span:expr, $name:expr) => {
        if $args.len() < $expected {
            return Err(EvalError::InvalidArguments(
                format!(
                    "Primitive '{}' expects at least {} arguments, got {}",
                    $name,
                    $expected,
                    $args.len()
                ),
                $span,
            ));
        }
    };
    ($args:expr, $expected:expr, $span:expr, $name:expr) => {
        if $args.len() != $expected {
            return Err(EvalError::InvalidArguments(
                format!(
                    "Primitive '{}' expects exactly {} arguments, got {}",
                    $name,
                    $expected,
                    $args.len()
                ),
                $span,
            ));
        }
    };
}

fn expect_number(value: &Value, span: Span, operator: &str, position: usize) -> EvalResult<f64> {
    value.as_number().ok_or_else(|| EvalError::TypeMismatch {
        operator: operator.to_string(),
        position,
        found: value.type_name(),
        span,
    })
}

/// Folds the arguments left to right: `(op a b c)` is `(a op b) op c`.
fn fold_numbers<F: Fn(f64, f64) -> f64>(
    args: &[Value],
    span: Span,
    func: F,
    operator: &str,
) -> EvalResult {
    check_arity!(args, min 1, span, operator);
    let mut acc = expect_number(&args[0], span, operator, 1)?;
    for (i, value) in args.iter().enumerate().skip(1) {
        acc = func(acc, expect_number(value, span, operator, i + 1)?);
    }
    Ok(Value::Number(acc))
}

fn compare_numbers<F: Fn(f64, f64) -> bool>(
    args: &[Value],
    span: Span,
    compare: F,
    operator: &str,
) -> EvalResult {
    check_arity!(args, 2, span, operator);
    let left = expect_number(&args[0], span, operator, 1)?;
    let right = expect_number(&args[1], span, operator, 2)?;
    Ok(Value::from_bool(compare(left, right)))
}

pub fn prim_add(args: &[Value], span: Span) -> EvalResult {
    fold_numbers(args, span, |acc, val| acc + val, "+")
}

pub fn prim_sub(args: &[Value], span: Span) -> EvalResult {
    fold_numbers(args, span, |acc, val| acc - val, "-")
}

pub fn prim_mul(args: &[Value], span: Span) -> EvalResult {
    fold_numbers(args, span, |acc, val| acc * val, "*")
}

// Division by zero yields inf/NaN like any other float operation.
pub fn prim_div(args: &[Value], span: Span) -> EvalResult {
    fold_numbers(args, span, |acc, val| acc / val, "/")
}

pub fn prim_equals(args: &[Value], span: Span) -> EvalResult {
    compare_numbers(args, span, |left, right| left == right, "=")
}

pub fn prim_less_than(args: &[Value], span: Span) -> EvalResult {
    compare_numbers(args, span, |left, right| left < right, "<")
}

pub fn prim_less_than_or_equals(args: &[Value], span: Span) -> EvalResult {
    compare_numbers(args, span, |left, right| left <= right, "<=")
}

pub fn prim_greater_than(args: &[Value], span: Span) -> EvalResult {
    compare_numbers(args, span, |left, right| left > right, ">")
}

pub fn prim_greater_than_or_equals(args: &[Value], span: Span) -> EvalResult {
    compare_numbers(args, span, |left, right| left >= right, ">=")
}

pub fn prim_not(args: &[Value], span: Span) -> EvalResult {
    check_arity!(args, 1, span, "not");
    Ok(Value::from_bool(!args[0].is_truthy()))
}

// `and`/`or` are ordinary procedures: both operands were already evaluated
// by the caller, and the result is one of them.
pub fn prim_and(args: &[Value], span: Span) -> EvalResult {
    check_arity!(args, 2, span, "and");
    if args[0].is_truthy() {
        Ok(args[1].clone())
    } else {
        Ok(args[0].clone())
    }
}

pub fn prim_or(args: &[Value], span: Span) -> EvalResult {
    check_arity!(args, 2, span, "or");
    if args[0].is_truthy() {
        Ok(args[0].clone())
    } else {
        Ok(args[1].clone())
    }
}

/// The line `print` writes for `args`: each value's display form, space-separated.
pub fn format_print_line(args: &[Value]) -> String {
    args.iter()
        .map(Value::to_string)
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn prim_print(args: &[Value], _span: Span) -> EvalResult {
    println!("{}", format_print_line(args));
    Ok(args.last().cloned().unwrap_or(Value::Unspecified))
}
