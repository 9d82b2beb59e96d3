//! Tree-walking evaluator.
//!
//! Statements produce a [`Flow`]: either fall through normally or carry a
//! `return` value up to the nearest function call.  Runtime errors travel
//! separately as `Err(RuntimeError)` and are never intercepted by calls, so
//! they always reach the driver.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, ExprKind, FunctionDecl, LiteralValue, Stmt};
use crate::callable::{LoxFunction, NativeFunction};
use crate::class::{LoxClass, LoxInstance};
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, RuntimeError, RuntimeErrorKind};
use crate::resolver::Resolver;
use crate::token::{Token, TokenType};
use crate::value::{format_number, Value};

/// Outcome of executing a statement.
#[derive(Debug)]
pub enum Flow {
    Normal,
    /// A `return` is unwinding toward its function call.
    Return(Value),
}

/// Convenient alias for evaluator results.
pub type IResult<T> = Result<T, RuntimeError>;

/// Deepest allowed nesting of Lox function and class calls.
pub const MAX_CALL_DEPTH: usize = 1024;

/// Grow the native stack when less than this remains at a call.
const RED_ZONE: usize = 128 * 1024;

/// Size of each stack segment allocated on growth.
const STACK_GROWTH: usize = 2 * 1024 * 1024;

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    /// Binding distances from the resolver.  Absent means global.
    locals: HashMap<ExprId, usize>,
    output: Box<dyn Write>,
    /// Lox calls currently on the stack.
    depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter that prints to stdout.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// An interpreter whose `print` statements write to `output`.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'clock'");

        globals
            .borrow_mut()
            .define("clock", Value::NativeFunction(Rc::new(NativeFunction::clock())));

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output,
            depth: 0,
        }
    }

    pub fn globals(&self) -> &EnvRef {
        &self.globals
    }

    /// Record that the variable expression `id` binds `depth` scopes out.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        debug!("Expression {} resolved at depth {}", id, depth);
        self.locals.insert(id, depth);
    }

    /// Execute an already-resolved program, stopping at the first runtime
    /// error.
    pub fn interpret(&mut self, statements: &[Stmt]) -> IResult<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            self.execute(stmt)?;
        }

        info!("Interpretation completed successfully");

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    pub fn execute(&mut self, stmt: &Stmt) -> IResult<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print {
                keyword,
                expression,
            } => {
                let value = self.evaluate(expression)?;

                writeln!(self.output, "{}", value).map_err(|e| {
                    RuntimeError::new(RuntimeErrorKind::Output, keyword, e.to_string())
                })?;

                debug!("Printed value: {}", value);
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                self.environment.borrow_mut().define(&name.lexeme, value);
            }

            Stmt::Block(statements) => {
                let env = Environment::child_of(&self.environment);
                return self.execute_block(statements, env);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_stmt) = else_branch {
                    return self.execute(else_stmt);
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);

                let closure = Rc::clone(&self.environment);
                let function = LoxFunction::new(Rc::clone(decl), closure, false);

                self.environment
                    .borrow_mut()
                    .define(&decl.name.lexeme, Value::Function(Rc::new(function)));
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Returning value: {:?}", value);

                return Ok(Flow::Return(value));
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.declare_class(name, superclass.as_ref(), methods)?,
        }

        Ok(Flow::Normal)
    }

    /// Run `statements` with `env` as the current scope.  The previous scope
    /// is restored on every exit path: normal completion, `return`, or error.
    pub fn execute_block(&mut self, statements: &[Stmt], env: EnvRef) -> IResult<Flow> {
        let previous = mem::replace(&mut self.environment, env);

        let result = self.execute_all(statements);

        self.environment = previous;

        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> IResult<Flow> {
        for stmt in statements {
            if let Flow::Return(value) = self.execute(stmt)? {
                return Ok(Flow::Return(value));
            }
        }

        Ok(Flow::Normal)
    }

    fn declare_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> IResult<()> {
        let superclass = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let at = match &expr.kind {
                        ExprKind::Variable(token) => token,
                        _ => name,
                    };

                    return Err(RuntimeError::new(
                        RuntimeErrorKind::InheritanceError,
                        at,
                        "Superclass must be a class.",
                    ));
                }
            },
            None => None,
        };

        // Bound first so methods can refer to the class by name.
        self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

        let previous = superclass.as_ref().map(|class| {
            let env = Environment::child_of(&self.environment);
            env.borrow_mut().define("super", Value::Class(Rc::clone(class)));
            mem::replace(&mut self.environment, env)
        });

        let methods: HashMap<String, Rc<LoxFunction>> = methods
            .iter()
            .map(|decl| {
                let is_init = decl.name.lexeme == "init";
                let function =
                    LoxFunction::new(Rc::clone(decl), Rc::clone(&self.environment), is_init);

                (decl.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        let class = LoxClass::new(name.lexeme.clone(), superclass, methods);

        if let Some(previous) = previous {
            self.environment = previous;
        }

        info!("Class '{}' declared", name.lexeme);

        self.environment
            .borrow_mut()
            .assign(name, Value::Class(Rc::new(class)))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        match &expr.kind {
            ExprKind::Literal(lit) => Ok(match lit {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            ExprKind::Grouping(inner) => self.evaluate(inner),

            ExprKind::Unary { operator, right } => {
                let right = self.evaluate(right)?;

                match (&operator.token_type, right) {
                    (TokenType::BANG, value) => Ok(Value::Bool(!value.is_truthy())),
                    (TokenType::MINUS, Value::Number(n)) => Ok(Value::Number(-n)),
                    _ => Err(RuntimeError::type_error(operator, "Operand must be a number.")),
                }
            }

            ExprKind::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;

                binary(operator, left, right)
            }

            ExprKind::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;

                let short_circuit = match operator.token_type {
                    TokenType::OR => left.is_truthy(),
                    _ => !left.is_truthy(),
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            ExprKind::Variable(name) => self.look_up_variable(name, expr.id),

            ExprKind::This(keyword) => self.look_up_variable(keyword, expr.id),

            ExprKind::Assign { name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(&expr.id) {
                    Some(&distance) => {
                        Environment::assign_at(&self.environment, distance, name, value.clone())?
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                Ok(value)
            }

            ExprKind::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),

            ExprKind::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),
                _ => Err(RuntimeError::type_error(name, "Only instances have properties.")),
            },

            ExprKind::Set {
                object,
                name,
                value,
            } => self.evaluate_set(object, name, value),

            ExprKind::Super { keyword, method } => self.evaluate_super(expr.id, keyword, method),
        }
    }

    // The helpers below keep their locals out of `evaluate`'s frame, which
    // every level of Lox recursion passes through.

    #[inline(never)]
    fn evaluate_call(
        &mut self,
        callee: &Expr,
        paren: &Token,
        arguments: &[Expr],
    ) -> IResult<Value> {
        let callee = self.evaluate(callee)?;

        let mut args = Vec::with_capacity(arguments.len());
        for arg in arguments {
            args.push(self.evaluate(arg)?);
        }

        self.call_value(&callee, paren, args)
    }

    #[inline(never)]
    fn evaluate_set(&mut self, object: &Expr, name: &Token, value: &Expr) -> IResult<Value> {
        let Value::Instance(instance) = self.evaluate(object)? else {
            return Err(RuntimeError::type_error(name, "Only instances have fields."));
        };

        let value = self.evaluate(value)?;
        instance.set(name, value.clone());

        Ok(value)
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> IResult<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    /// `super.method`: find `method` starting at the superclass captured
    /// when the class was declared, then bind it to the current `this`.
    #[inline(never)]
    fn evaluate_super(&self, id: ExprId, keyword: &Token, method: &Token) -> IResult<Value> {
        let distance = self
            .locals
            .get(&id)
            .copied()
            .ok_or_else(|| RuntimeError::undefined_variable(keyword))?;

        let Value::Class(superclass) = Environment::get_at(&self.environment, distance, keyword)?
        else {
            return Err(RuntimeError::type_error(keyword, "Superclass must be a class."));
        };

        // `this` lives in the scope just inside the one holding `super`.
        let this = Token::synthetic("this", keyword.line);
        let object = match distance.checked_sub(1) {
            Some(d) => Environment::get_at(&self.environment, d, &this)?,
            None => return Err(RuntimeError::undefined_variable(&this)),
        };

        let Value::Instance(instance) = object else {
            return Err(RuntimeError::type_error(keyword, "Only instances have properties."));
        };

        let found = superclass
            .find_method(&method.lexeme)
            .ok_or_else(|| RuntimeError::undefined_property(method))?;

        Ok(Value::Function(Rc::new(found.bind(instance))))
    }

    /// Check the callee kind and arity, then invoke.  Nothing runs if either
    /// check fails.
    ///
    /// Lox calls are counted: past [`MAX_CALL_DEPTH`] the call fails with a
    /// `StackOverflow` error instead of exhausting the native stack, and the
    /// stack is grown on demand below that.
    fn call_value(&mut self, callee: &Value, paren: &Token, args: Vec<Value>) -> IResult<Value> {
        match callee {
            Value::NativeFunction(native) => {
                check_arity(native.arity, &args, paren)?;
                Ok(native.call(&args))
            }

            Value::Function(_) | Value::Class(_) => {
                if self.depth >= MAX_CALL_DEPTH {
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::StackOverflow,
                        paren,
                        "Stack overflow.",
                    ));
                }

                self.depth += 1;

                let result = stacker::maybe_grow(RED_ZONE, STACK_GROWTH, || {
                    self.call_lox(callee, paren, args)
                });

                self.depth -= 1;

                result
            }

            _ => Err(RuntimeError::type_error(
                paren,
                "Can only call functions and classes.",
            )),
        }
    }

    fn call_lox(&mut self, callee: &Value, paren: &Token, args: Vec<Value>) -> IResult<Value> {
        match callee {
            Value::Function(function) => {
                check_arity(function.arity(), &args, paren)?;
                function.call(self, args)
            }

            Value::Class(class) => {
                check_arity(class.arity(), &args, paren)?;
                LoxClass::instantiate(class, self, args)
            }

            _ => Err(RuntimeError::type_error(
                paren,
                "Can only call functions and classes.",
            )),
        }
    }
}

fn check_arity(arity: usize, args: &[Value], paren: &Token) -> IResult<()> {
    if args.len() == arity {
        return Ok(());
    }

    Err(RuntimeError::new(
        RuntimeErrorKind::ArityError,
        paren,
        format!("Expected {} arguments but got {}.", arity, args.len()),
    ))
}

/// Eager binary operators.  Both operands are already evaluated, left first.
fn binary(operator: &Token, left: Value, right: Value) -> IResult<Value> {
    use crate::value::Value::{Number, String as Str};

    match operator.token_type {
        TokenType::EQUAL_EQUAL => return Ok(Value::Bool(left == right)),
        TokenType::BANG_EQUAL => return Ok(Value::Bool(left != right)),
        TokenType::PLUS => {
            return match (left, right) {
                (Number(a), Number(b)) => Ok(Number(a + b)),
                (Str(a), Str(b)) => Ok(Str(a + &b)),
                (Str(a), Number(b)) => Ok(Str(a + &format_number(b))),
                (Number(a), Str(b)) => Ok(Str(format_number(a) + &b)),
                _ => Err(RuntimeError::type_error(
                    operator,
                    "Operands must be two numbers or two strings.",
                )),
            };
        }
        _ => {}
    }

    let (Number(a), Number(b)) = (left, right) else {
        return Err(RuntimeError::type_error(operator, "Operands must be numbers."));
    };

    let value = match operator.token_type {
        TokenType::MINUS => Number(a - b),
        TokenType::STAR => Number(a * b),
        TokenType::SLASH => Number(a / b),
        TokenType::GREATER => Value::Bool(a > b),
        TokenType::GREATER_EQUAL => Value::Bool(a >= b),
        TokenType::LESS => Value::Bool(a < b),
        TokenType::LESS_EQUAL => Value::Bool(a <= b),
        _ => {
            return Err(RuntimeError::type_error(
                operator,
                format!("Invalid binary operator '{}'.", operator.lexeme),
            ))
        }
    };

    Ok(value)
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// One persistent interpreter fed source text piece by piece.  Globals,
/// functions and classes defined by one `run` stay visible to the next.
pub struct Session {
    interpreter: Interpreter,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Session {
            interpreter: Interpreter::new(),
        }
    }

    pub fn with_output(output: Box<dyn Write>) -> Self {
        Session {
            interpreter: Interpreter::with_output(output),
        }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Resolve, then run, an already-parsed program.  A resolve error means
    /// nothing in `program` runs.
    pub fn execute(&mut self, program: &[Stmt]) -> Result<(), LoxError> {
        Resolver::new(&mut self.interpreter).resolve(program)?;

        info!("Program resolved; executing");

        self.interpreter.interpret(program)?;

        Ok(())
    }

    /// Scan, parse, resolve and run `source`.  Lex and parse errors are all
    /// reported together; resolve and runtime errors stop at the first.
    pub fn run(&mut self, source: &str) -> Result<(), Vec<LoxError>> {
        let program = crate::parse_source(source)?;

        self.execute(&program).map_err(|e| vec![e])
    }
}
