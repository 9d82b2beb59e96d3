use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a scope.  Blocks, calls and closures all hold one; a
/// scope lives as long as its longest holder.
pub type EnvRef = Rc<RefCell<Environment>>;

/// One scope in the chain: its own bindings plus a link to the enclosing
/// scope (none for the globals).  Lookups only ever walk outward.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// A fresh child scope of `enclosing`, already wrapped for sharing.
    pub fn child_of(enclosing: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(enclosing))))
    }

    /// Insert or overwrite in this scope.  Redeclaration is legal.
    pub fn define(&mut self, name: &str, value: Value) {
        debug!("define '{}' = {:?}", name, value);
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(RuntimeError::undefined_variable(name))
        }
    }

    /// Update the innermost scope that already binds `name`.  Never creates
    /// a binding.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(RuntimeError::undefined_variable(name))
        }
    }

    /// Walk exactly `distance` enclosing links.
    pub fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
        let mut current = Rc::clone(env);

        for _ in 0..distance {
            let next = current.borrow().enclosing.clone()?;
            current = next;
        }

        Some(current)
    }

    /// Read `name` from exactly the scope `distance` links out, without
    /// searching further.
    pub fn get_at(env: &EnvRef, distance: usize, name: &Token) -> Result<Value, RuntimeError> {
        let scope =
            Self::ancestor(env, distance).ok_or_else(|| RuntimeError::undefined_variable(name))?;

        let value = scope.borrow().values.get(&name.lexeme).cloned();

        value.ok_or_else(|| RuntimeError::undefined_variable(name))
    }

    pub fn assign_at(
        env: &EnvRef,
        distance: usize,
        name: &Token,
        value: Value,
    ) -> Result<(), RuntimeError> {
        let scope =
            Self::ancestor(env, distance).ok_or_else(|| RuntimeError::undefined_variable(name))?;

        let mut scope = scope.borrow_mut();

        match scope.values.get_mut(&name.lexeme) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RuntimeError::undefined_variable(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeErrorKind;

    fn ident(name: &str) -> Token {
        Token::synthetic(name, 1)
    }

    #[test]
    fn get_searches_outward() {
        let globals: EnvRef = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define("a", Value::Number(1.0));

        let inner = Environment::child_of(&globals);

        assert_eq!(inner.borrow().get(&ident("a")).ok(), Some(Value::Number(1.0)));
    }

    #[test]
    fn assign_never_creates_a_binding() {
        let globals: EnvRef = Rc::new(RefCell::new(Environment::new()));

        let err = globals
            .borrow_mut()
            .assign(&ident("missing"), Value::Nil)
            .unwrap_err();

        assert_eq!(err.kind, RuntimeErrorKind::UndefinedVariable);
        assert!(globals.borrow().get(&ident("missing")).is_err());
    }

    #[test]
    fn assign_updates_the_defining_scope() {
        let globals: EnvRef = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define("a", Value::Number(1.0));

        let inner = Environment::child_of(&globals);
        inner
            .borrow_mut()
            .assign(&ident("a"), Value::Number(2.0))
            .unwrap();

        assert_eq!(globals.borrow().get(&ident("a")).ok(), Some(Value::Number(2.0)));
    }

    #[test]
    fn get_at_skips_shadowing_scopes() {
        let globals: EnvRef = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define("a", Value::from("outer"));

        let inner = Environment::child_of(&globals);
        inner.borrow_mut().define("a", Value::from("inner"));

        assert_eq!(
            Environment::get_at(&inner, 1, &ident("a")).ok(),
            Some(Value::from("outer"))
        );
        assert_eq!(
            Environment::get_at(&inner, 0, &ident("a")).ok(),
            Some(Value::from("inner"))
        );

        Environment::assign_at(&inner, 1, &ident("a"), Value::from("changed")).unwrap();
        assert_eq!(
            globals.borrow().get(&ident("a")).ok(),
            Some(Value::from("changed"))
        );
        assert_eq!(
            inner.borrow().get(&ident("a")).ok(),
            Some(Value::from("inner"))
        );
    }

    #[test]
    fn get_at_past_the_root_is_an_error() {
        let globals: EnvRef = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define("a", Value::Nil);

        assert!(Environment::get_at(&globals, 3, &ident("a")).is_err());
    }
}
