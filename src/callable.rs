//! Function values: user-defined closures and host-provided natives.

use std::fmt;
use std::rc::Rc;

use chrono::Utc;
use log::{debug, info};

use crate::ast::FunctionDecl;
use crate::class::LoxInstance;
use crate::environment::{EnvRef, Environment};
use crate::error::RuntimeError;
use crate::interpreter::{Flow, Interpreter};
use crate::token::Token;
use crate::value::Value;

/// A function implemented by the host.
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value]) -> Value,
}

impl NativeFunction {
    /// `clock()`: seconds since the UNIX epoch, with sub-second precision.
    pub fn clock() -> Self {
        NativeFunction {
            name: "clock",
            arity: 0,
            func: |_args| {
                let now = Utc::now();
                let seconds = now.timestamp() as f64
                    + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0;

                debug!("clock() -> {}", seconds);

                Value::Number(seconds)
            },
        }
    }

    pub fn call(&self, args: &[Value]) -> Value {
        (self.func)(args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

/// A declaration paired with the scope it was declared in.
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: EnvRef,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        LoxFunction {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// A copy of this method whose closure is a fresh child scope binding
    /// `this` to `instance`.  Every access binds anew.
    pub fn bind(&self, instance: Rc<LoxInstance>) -> LoxFunction {
        debug!(
            "Binding method '{}' to {} instance",
            self.name(),
            instance.class().name
        );

        let env = Environment::child_of(&self.closure);
        env.borrow_mut().define("this", Value::Instance(instance));

        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: env,
            is_initializer: self.is_initializer,
        }
    }

    /// Run the body in a new scope under the closure, with parameters bound
    /// positionally.  The caller has already checked the arity.
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        info!("Calling function '{}' with {} argument(s)", self.name(), args.len());

        let env = Environment::child_of(&self.closure);

        {
            let mut scope = env.borrow_mut();
            for (param, arg) in self.declaration.params.iter().zip(args) {
                scope.define(&param.lexeme, arg);
            }
        }

        let flow = interpreter.execute_block(&self.declaration.body, env)?;

        if self.is_initializer {
            // `init` always yields its instance, even on a bare `return;`.
            let this = Token::synthetic("this", self.declaration.name.line);
            return Environment::get_at(&self.closure, 0, &this);
        }

        let result = match flow {
            Flow::Return(value) => value,
            Flow::Normal => Value::Nil,
        };

        debug!("Function '{}' returned {:?}", self.name(), result);

        Ok(result)
    }
}

impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}
