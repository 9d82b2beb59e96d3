pub mod ast;
pub mod callable;
pub mod class;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

pub use error::LoxError;
pub use interpreter::{Interpreter, Session};
pub use value::Value;

use log::debug;

/// Scan and parse `source`.  All lex and parse errors are returned together;
/// a program is produced only if there were none.
pub fn parse_source(source: &str) -> std::result::Result<Vec<ast::Stmt>, Vec<LoxError>> {
    let (tokens, mut errors) = scanner::Scanner::new(source).scan_all();

    debug!(
        "Scanned {} tokens with {} lex error(s)",
        tokens.len(),
        errors.len()
    );

    match parser::Parser::new(tokens).parse() {
        Ok(program) if errors.is_empty() => Ok(program),
        Ok(_) => Err(errors),
        Err(parse_errors) => {
            errors.extend(parse_errors);
            Err(errors)
        }
    }
}
