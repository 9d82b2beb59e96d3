#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use rox::error::RuntimeError;
use rox::{LoxError, Session};

/// A `print` sink that can be read back after the session has taken it.
#[derive(Clone, Default)]
pub struct Capture(Rc<RefCell<Vec<u8>>>);

impl Capture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn session() -> (Session, Capture) {
    let capture = Capture::default();
    (Session::with_output(Box::new(capture.clone())), capture)
}

/// Run `source` in a fresh session; returns what was printed and the outcome.
pub fn run(source: &str) -> (String, Result<(), Vec<LoxError>>) {
    let (mut session, capture) = session();
    let result = session.run(source);
    (capture.contents(), result)
}

/// Run `source` and return its output, failing the test on any error.
pub fn run_ok(source: &str) -> String {
    let (output, result) = run(source);

    if let Err(errors) = result {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        panic!("program failed: {:?}\noutput so far:\n{}", messages, output);
    }

    output
}

/// Run `source`, expecting it to fail at runtime.  Returns the output printed
/// before the failure and the error.
pub fn run_err(source: &str) -> (String, RuntimeError) {
    let (output, result) = run(source);

    match result {
        Err(mut errors) if errors.len() == 1 => match errors.remove(0) {
            LoxError::Runtime(e) => (output, e),
            other => panic!("expected a runtime error, got: {}", other),
        },
        Err(errors) => panic!("expected one runtime error, got {}", errors.len()),
        Ok(()) => panic!("expected a runtime error, program succeeded:\n{}", output),
    }
}
