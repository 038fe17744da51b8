// File: src/errors.rs
//
// Structured error types for dukkha's two failure domains: errors raised
// while compiling (lexical, syntactic, semantic-at-compile) and errors
// raised while executing bytecode (runtime-type, runtime-name,
// runtime-opcode). `Display` produces exactly the diagnostic line the
// host shell writes to stderr; any terminal styling is applied by the
// caller around that string, not inside it, so the contract stays plain.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub got: Option<String>,
}

impl CompileError {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self { line, column, message: message.into(), got: None }
    }

    pub fn with_got(mut self, got: impl Into<String>) -> Self {
        self.got = Some(got.into());
        self
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error at: {}:{} - {}", self.line, self.column, self.message)?;
        if let Some(got) = &self.got {
            write!(f, ", got {got}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub line: usize,
    pub ip: usize,
    pub message: String,
}

impl RuntimeError {
    pub fn new(line: usize, ip: usize, message: impl Into<String>) -> Self {
        Self { line, ip, message: message.into() }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Runtime error on {}:{}: {}", self.line, self.ip, self.message)
    }
}

impl std::error::Error for RuntimeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_format() {
        let err = CompileError::new(3, 5, "';' expected");
        assert_eq!(err.to_string(), "Error at: 3:5 - ';' expected");
    }

    #[test]
    fn compile_error_format_with_got() {
        let err = CompileError::new(3, 5, "';' expected").with_got("Semicolon");
        assert_eq!(err.to_string(), "Error at: 3:5 - ';' expected, got Semicolon");
    }

    #[test]
    fn runtime_error_format() {
        let err = RuntimeError::new(4, 12, "undefined global 'x'");
        assert_eq!(err.to_string(), "Runtime error on 4:12: undefined global 'x'");
    }
}
