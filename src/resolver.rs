//! Static resolver pass.
//!
//! One depth-first walk over the program, run before evaluation, which:
//! 1. Mirrors the runtime scope nesting with a stack of `name → defined?`
//!    frames (blocks, function bodies, the `this` frame of every method and
//!    the `super` frame of every subclass).
//! 2. Reports static errors: reading a local in its own initializer,
//!    `return` outside a function, returning a value from `init`, `this` or
//!    `super` outside a method, and a class inheriting from itself.
//! 3. Tells the interpreter, for each variable, `this` and `super`
//!    occurrence, how many scopes out its binding lives.  Anything not found
//!    in a frame is left unrecorded and treated as global.

use crate::ast::{Expr, ExprId, ExprKind, FunctionDecl, Stmt};
use crate::error::{ResolveError, ResolveErrorKind};
use crate::interpreter::Interpreter;
use crate::token::Token;
use log::{debug, info};
use std::collections::HashMap;
use std::rc::Rc;

type Result<T> = std::result::Result<T, ResolveError>;

/// What kind of function body are we in?  Drives the `return` checks.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

pub struct Resolver<'interp> {
    interpreter: &'interp mut Interpreter,
    scopes: Vec<HashMap<String, bool>>, // false=declared, true=defined
    current_function: FunctionType,
    current_class: ClassType,
}

impl<'interp> Resolver<'interp> {
    pub fn new(interpreter: &'interp mut Interpreter) -> Self {
        Resolver {
            interpreter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    /// Walk all top‑level statements, stopping at the first static error.
    pub fn resolve(&mut self, statements: &[Stmt]) -> Result<()> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt)?;
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                let result = self.resolve_all(statements);
                self.end_scope();
                result?;
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr)?;
                }
                self.define(name);
            }

            Stmt::Function(decl) => {
                // Defined before the body so the function can recurse.
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_function(decl, FunctionType::Function)?;
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods)?,

            Stmt::Expression(expr) => self.resolve_expr(expr)?,

            Stmt::Print { expression, .. } => self.resolve_expr(expression)?,

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(then_branch)?;
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb)?;
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(body)?;
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    return Err(ResolveError::new(
                        ResolveErrorKind::ReturnOutsideFunction,
                        keyword,
                    ));
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        return Err(ResolveError::new(
                            ResolveErrorKind::ReturnValueFromInitializer,
                            keyword,
                        ));
                    }

                    self.resolve_expr(expr)?;
                }
            }
        }

        Ok(())
    }

    fn resolve_all(&mut self, statements: &[Stmt]) -> Result<()> {
        for s in statements {
            self.resolve_stmt(s)?;
        }

        Ok(())
    }

    fn resolve_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<()> {
        debug!("Resolving class '{}'", name.lexeme);

        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(name);
        self.define(name);

        let result = self.resolve_class_body(name, superclass, methods);

        self.current_class = enclosing_class;

        result
    }

    /// Frame layout, outermost first: `super` (subclasses only), `this`,
    /// then each method's parameters.  This matches the scopes the
    /// interpreter builds at declaration and bind time.
    fn resolve_class_body(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<()> {
        if let Some(superclass) = superclass {
            if let ExprKind::Variable(super_name) = &superclass.kind {
                if super_name.lexeme == name.lexeme {
                    return Err(ResolveError::new(
                        ResolveErrorKind::SelfInheritance,
                        super_name,
                    ));
                }
            }

            self.current_class = ClassType::Subclass;
            self.resolve_expr(superclass)?;

            self.begin_scope();
            self.define_synthetic("super");
        }

        self.begin_scope();
        self.define_synthetic("this");

        let mut result = Ok(());

        for method in methods {
            let kind = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };

            result = self.resolve_function(method, kind);
            if result.is_err() {
                break;
            }
        }

        self.end_scope();

        if superclass.is_some() {
            self.end_scope();
        }

        result
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) -> Result<()> {
        match &expr.kind {
            ExprKind::Literal(_) => {}

            ExprKind::Grouping(inner) => self.resolve_expr(inner)?,

            ExprKind::Unary { right, .. } => self.resolve_expr(right)?,

            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)?;
            }

            ExprKind::Variable(name) => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        return Err(ResolveError::new(
                            ResolveErrorKind::InitializerSelfReference,
                            name,
                        ));
                    }
                }

                self.resolve_local(expr.id, name);
            }

            ExprKind::Assign { name, value } => {
                self.resolve_expr(value)?;
                self.resolve_local(expr.id, name);
            }

            ExprKind::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee)?;
                for arg in arguments {
                    self.resolve_expr(arg)?;
                }
            }

            // Property names are looked up dynamically; only the object is
            // resolved.
            ExprKind::Get { object, .. } => self.resolve_expr(object)?,

            ExprKind::Set { object, value, .. } => {
                self.resolve_expr(value)?;
                self.resolve_expr(object)?;
            }

            ExprKind::This(keyword) => {
                if self.current_class == ClassType::None {
                    return Err(ResolveError::new(
                        ResolveErrorKind::ThisOutsideClass,
                        keyword,
                    ));
                }

                self.resolve_local(expr.id, keyword);
            }

            ExprKind::Super { keyword, .. } => {
                match self.current_class {
                    ClassType::None => {
                        return Err(ResolveError::new(
                            ResolveErrorKind::SuperOutsideClass,
                            keyword,
                        ))
                    }
                    ClassType::Class => {
                        return Err(ResolveError::new(
                            ResolveErrorKind::SuperWithoutSuperclass,
                            keyword,
                        ))
                    }
                    ClassType::Subclass => {}
                }

                self.resolve_local(expr.id, keyword);
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function’s parameters + body.
    fn resolve_function(&mut self, decl: &FunctionDecl, kind: FunctionType) -> Result<()> {
        let enclosing = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        let result = self.resolve_all(&decl.body);
        self.end_scope();

        self.current_function = enclosing;

        result
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Redeclaring a name in the same scope is allowed, as at runtime.
    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), false);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    fn define_synthetic(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record `id` as a local at the depth of the innermost frame holding
    /// `name`; leave it unrecorded (global) if no frame does.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                self.interpreter.resolve(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}
