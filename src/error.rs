use num_enum::IntoPrimitive;
use strum_macros::Display;
use thiserror::Error;

/// The four fatal error categories a program can raise.
///
/// The discriminants double as process exit codes for the command line driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive)]
#[repr(u8)]
pub enum ErrorKind {
    #[strum(serialize = "SYNTAX_ERROR")]
    Syntax = 65,
    #[strum(serialize = "NAME_ERROR")]
    Name = 66,
    #[strum(serialize = "TYPE_ERROR")]
    Type = 67,
    #[strum(serialize = "FAULT_ERROR")]
    Fault = 68,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}{}: {message}", on_line(.line))]
pub struct InterpreterError {
    pub kind: ErrorKind,
    pub message: String,
    pub line: Option<usize>,
}

fn on_line(line: &Option<usize>) -> String {
    match line {
        Some(line) => format!(" on line {}", line),
        None => String::new(),
    }
}

impl InterpreterError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, line: Option<usize>) -> Self {
        InterpreterError {
            kind,
            message: message.into(),
            line,
        }
    }
    pub fn syntax(message: impl Into<String>, line: usize) -> Self {
        Self::new(ErrorKind::Syntax, message, Some(line))
    }
    pub fn name(message: impl Into<String>, line: Option<usize>) -> Self {
        Self::new(ErrorKind::Name, message, line)
    }
    pub fn type_error(message: impl Into<String>, line: Option<usize>) -> Self {
        Self::new(ErrorKind::Type, message, line)
    }
    pub fn fault(message: impl Into<String>, line: Option<usize>) -> Self {
        Self::new(ErrorKind::Fault, message, line)
    }
    pub fn exit_code(&self) -> i32 {
        i32::from(u8::from(self.kind))
    }
}

pub type Result<T> = std::result::Result<T, InterpreterError>;

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn display_with_line() {
        let err = InterpreterError::name("unknown variable x", Some(12));
        assert_eq!(format!("{}", err), "NAME_ERROR on line 12: unknown variable x");
    }

    #[test]
    fn display_without_line() {
        let err = InterpreterError::type_error("No class named main found", None);
        assert_eq!(format!("{}", err), "TYPE_ERROR: No class named main found");
    }

    #[test]
    fn exit_codes_follow_kind() {
        assert_eq!(InterpreterError::syntax("x", 1).exit_code(), 65);
        assert_eq!(InterpreterError::fault("x", None).exit_code(), 68);
    }
}
