//! Centralised error hierarchy.
//!
//! Every stage (scanner, parser, resolver, evaluator, CLI) reports failures
//! through one of the types defined here.  Lex and parse errors are plain
//! line-tagged messages; resolve and runtime errors additionally carry the
//! offending [`Token`] and a machine-checkable kind so a driver (or a test)
//! can distinguish e.g. an arity mismatch from an undefined variable.
//!
//! The module **does not** print diagnostics itself.

use std::fmt;
use thiserror::Error;

use log::info;

use crate::token::{Token, TokenType};

/// Canonical error type used at the crate boundary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex { message: String, line: usize },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        line: usize,
        /// ` at 'x'` / ` at end`, already formatted.
        location: String,
    },

    /// Static error found by the resolver before anything runs.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Error raised while evaluating.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl LoxError {
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Parse error located at `token`.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        let location = match token.token_type {
            TokenType::EOF => " at end".to_string(),
            _ => format!(" at '{}'", token.lexeme),
        };

        LoxError::Parse {
            message,
            line: token.line,
            location,
        }
    }

    /// Lex, parse and resolve errors are static: nothing was executed.
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            LoxError::Lex { .. } | LoxError::Parse { .. } | LoxError::Resolve(_)
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolver errors
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveErrorKind {
    /// `var a = a;` inside a local scope.
    InitializerSelfReference,
    ReturnOutsideFunction,
    ReturnValueFromInitializer,
    ThisOutsideClass,
    SuperOutsideClass,
    SuperWithoutSuperclass,
    SelfInheritance,
}

impl ResolveErrorKind {
    fn message(self) -> &'static str {
        match self {
            ResolveErrorKind::InitializerSelfReference => {
                "Can't read local variable in its own initializer."
            }
            ResolveErrorKind::ReturnOutsideFunction => "Can't return from top-level code.",
            ResolveErrorKind::ReturnValueFromInitializer => {
                "Can't return a value from an initializer."
            }
            ResolveErrorKind::ThisOutsideClass => "Can't use 'this' outside of a class.",
            ResolveErrorKind::SuperOutsideClass => "Can't use 'super' outside of a class.",
            ResolveErrorKind::SuperWithoutSuperclass => {
                "Can't use 'super' in a class with no superclass."
            }
            ResolveErrorKind::SelfInheritance => "A class can't inherit from itself.",
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("[line {}] Error at '{}': {}", .token.line, .token.lexeme, .message)]
pub struct ResolveError {
    pub kind: ResolveErrorKind,
    pub token: Token,
    pub message: String,
}

impl ResolveError {
    pub fn new(kind: ResolveErrorKind, token: &Token) -> Self {
        info!(
            "Creating Resolve error: line={}, kind={:?}",
            token.line, kind
        );

        ResolveError {
            kind,
            token: token.clone(),
            message: kind.message().to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Runtime errors
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// Wrong operand kind for an operator, call target or property target.
    TypeError,
    ArityError,
    UndefinedVariable,
    UndefinedProperty,
    /// Superclass expression is not a class.
    InheritanceError,
    /// Lox calls nested deeper than the interpreter allows.
    StackOverflow,
    /// The `print` sink could not be written.
    Output,
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuntimeErrorKind::TypeError => "TypeError",
            RuntimeErrorKind::ArityError => "ArityError",
            RuntimeErrorKind::UndefinedVariable => "UndefinedVariable",
            RuntimeErrorKind::UndefinedProperty => "UndefinedProperty",
            RuntimeErrorKind::InheritanceError => "InheritanceError",
            RuntimeErrorKind::StackOverflow => "StackOverflow",
            RuntimeErrorKind::Output => "OutputError",
        };

        f.write_str(name)
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}\n[line {}]", .token.line)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub token: Token,
    pub message: String,
}

impl RuntimeError {
    pub fn new<S: Into<String>>(kind: RuntimeErrorKind, token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Runtime error: line={}, kind={}, msg={}",
            token.line, kind, message
        );

        RuntimeError {
            kind,
            token: token.clone(),
            message,
        }
    }

    pub fn type_error<S: Into<String>>(token: &Token, msg: S) -> Self {
        Self::new(RuntimeErrorKind::TypeError, token, msg)
    }

    pub fn undefined_variable(token: &Token) -> Self {
        Self::new(
            RuntimeErrorKind::UndefinedVariable,
            token,
            format!("Undefined variable '{}'.", token.lexeme),
        )
    }

    pub fn undefined_property(token: &Token) -> Self {
        Self::new(
            RuntimeErrorKind::UndefinedProperty,
            token,
            format!("Undefined property '{}'.", token.lexeme),
        )
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
