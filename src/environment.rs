use crate::primitives;
use crate::source::Span;
use crate::types::{PrimitiveFunc, Procedure, Value};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvError {
    #[error("{0} is not defined")]
    UnboundVariable(String, Span), // Symbol name, span where lookup happened
}

/// One scope of bindings.
///
/// The global scope is created once per session and mutated in place by
/// `define`. A procedure call gets a fresh frame whose `outer` is the
/// procedure's defining scope, so parameters shadow without copying and free
/// names resolve against whatever the defining scope holds at lookup time.
#[derive(Debug, Default)]
pub struct Environment {
    outer: Option<Rc<RefCell<Environment>>>,
    bindings: HashMap<String, Value>,
}

impl Environment {
    /// Creates a new, empty top-level environment.
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Environment::default()))
    }

    /// Creates a top-level environment holding the primitive procedures.
    pub fn new_global_populated() -> Rc<RefCell<Environment>> {
        let env_ptr = Environment::new();
        {
            let mut env = env_ptr.borrow_mut();
            env.add_primitive("+", primitives::prim_add);
            env.add_primitive("-", primitives::prim_sub);
            env.add_primitive("*", primitives::prim_mul);
            env.add_primitive("/", primitives::prim_div);
            env.add_primitive("=", primitives::prim_equals);
            env.add_primitive("<", primitives::prim_less_than);
            env.add_primitive("<=", primitives::prim_less_than_or_equals);
            env.add_primitive(">", primitives::prim_greater_than);
            env.add_primitive(">=", primitives::prim_greater_than_or_equals);
            env.add_primitive("not", primitives::prim_not);
            env.add_primitive("and", primitives::prim_and);
            env.add_primitive("or", primitives::prim_or);
            env.add_primitive("print", primitives::prim_print);
        }
        env_ptr
    }

    /// Creates a new environment enclosed within an outer one.
    pub fn new_enclosed(outer_env: Rc<RefCell<Environment>>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Environment {
            outer: Some(outer_env),
            bindings: HashMap::new(),
        }))
    }

    /// Binds `name` in this frame, replacing any earlier binding here.
    pub fn define(&mut self, name: String, value: Value) {
        self.bindings.insert(name, value);
    }

    /// Looks up a variable's value, walking outward through enclosing frames.
    /// `lookup_span` is the location where the variable was referenced, used for error reporting.
    pub fn get(&self, name: &str, lookup_span: Span) -> Result<Value, EnvError> {
        if let Some(value) = self.bindings.get(name) {
            Ok(value.clone())
        } else {
            match &self.outer {
                Some(outer_env_ptr) => outer_env_ptr.borrow().get(name, lookup_span),
                None => Err(EnvError::UnboundVariable(name.to_string(), lookup_span)),
            }
        }
    }

    fn add_primitive(&mut self, name: &'static str, func: PrimitiveFunc) {
        self.define(
            name.to_string(),
            Value::Procedure(Procedure::Primitive(func, name)),
        );
    }

    /// Gets every identifier visible from this environment.
    pub fn get_identifiers(&self) -> HashSet<String> {
        let mut identifiers: HashSet<String> = self.bindings.keys().cloned().collect();
        if let Some(outer_env_ptr) = &self.outer {
            identifiers.extend(outer_env_ptr.borrow().get_identifiers());
        }
        identifiers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    #[test]
    fn test_define_and_get_global() {
        let env = Environment::new();
        env.borrow_mut().define("x".to_string(), num(10.0));

        let result = env.borrow().get("x", Span::default());
        assert_eq!(result, Ok(num(10.0)));
    }

    #[test]
    fn test_get_unbound_global() {
        let env = Environment::new();
        let span = Span::new(3, 4);
        let result = env.borrow().get("y", span);
        assert_eq!(result, Err(EnvError::UnboundVariable("y".to_string(), span)));
        assert_eq!(result.unwrap_err().to_string(), "y is not defined");
    }

    #[test]
    fn test_redefine_overwrites() {
        let env = Environment::new();
        env.borrow_mut().define("x".to_string(), num(1.0));
        env.borrow_mut().define("x".to_string(), num(2.0));
        assert_eq!(env.borrow().get("x", Span::default()), Ok(num(2.0)));
    }

    #[test]
    fn test_enclosed_sees_later_outer_definitions() {
        let global_env = Environment::new();
        let local_env = Environment::new_enclosed(global_env.clone());
        local_env.borrow_mut().define("y".to_string(), num(20.0));

        // Defined after the enclosed frame exists
        global_env.borrow_mut().define("x".to_string(), num(10.0));

        assert_eq!(local_env.borrow().get("x", Span::default()), Ok(num(10.0)));
        assert_eq!(local_env.borrow().get("y", Span::default()), Ok(num(20.0)));
        assert!(global_env.borrow().get("y", Span::default()).is_err());
    }

    #[test]
    fn test_shadowing() {
        let global_env = Environment::new();
        global_env.borrow_mut().define("x".to_string(), num(10.0));

        let local_env = Environment::new_enclosed(global_env.clone());
        local_env.borrow_mut().define("x".to_string(), num(50.0));

        assert_eq!(local_env.borrow().get("x", Span::default()), Ok(num(50.0)));
        assert_eq!(global_env.borrow().get("x", Span::default()), Ok(num(10.0)));
    }

    #[test]
    fn test_global_identifiers() {
        let global_env = Environment::new_global_populated();
        let local_env = Environment::new_enclosed(global_env);
        local_env.borrow_mut().define("n".to_string(), num(1.0));

        let identifiers = local_env.borrow().get_identifiers();
        for name in ["+", "-", "*", "/", "=", "<", ">", "<=", ">=", "not", "and", "or", "print", "n"] {
            assert!(identifiers.contains(name), "missing {}", name);
        }
    }
}
