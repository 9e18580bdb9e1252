use std::fmt;

use minipy::ParseError;

/// The exception class a runtime failure is reported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Exception,
    AssertionError,
    AttributeError,
    IndexError,
    KeyError,
    NameError,
    NotImplementedError,
    OSError,
    OverflowError,
    RecursionError,
    RuntimeError,
    TypeError,
    UnboundLocalError,
    ValueError,
    ZeroDivisionError,
}

impl ErrorKind {
    /// Every kind, in the order the builtin table exposes them.
    pub const ALL: [ErrorKind; 15] = [
        ErrorKind::Exception,
        ErrorKind::AssertionError,
        ErrorKind::AttributeError,
        ErrorKind::IndexError,
        ErrorKind::KeyError,
        ErrorKind::NameError,
        ErrorKind::NotImplementedError,
        ErrorKind::OSError,
        ErrorKind::OverflowError,
        ErrorKind::RecursionError,
        ErrorKind::RuntimeError,
        ErrorKind::TypeError,
        ErrorKind::UnboundLocalError,
        ErrorKind::ValueError,
        ErrorKind::ZeroDivisionError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Exception => "Exception",
            ErrorKind::AssertionError => "AssertionError",
            ErrorKind::AttributeError => "AttributeError",
            ErrorKind::IndexError => "IndexError",
            ErrorKind::KeyError => "KeyError",
            ErrorKind::NameError => "NameError",
            ErrorKind::NotImplementedError => "NotImplementedError",
            ErrorKind::OSError => "OSError",
            ErrorKind::OverflowError => "OverflowError",
            ErrorKind::RecursionError => "RecursionError",
            ErrorKind::RuntimeError => "RuntimeError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::UnboundLocalError => "UnboundLocalError",
            ErrorKind::ValueError => "ValueError",
            ErrorKind::ZeroDivisionError => "ZeroDivisionError",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// `except`-style matching: `Exception` covers every kind, and
    /// `NameError` covers `UnboundLocalError`.
    pub fn is_subclass_of(self, other: ErrorKind) -> bool {
        self == other
            || other == ErrorKind::Exception
            || (self == ErrorKind::UnboundLocalError && other == ErrorKind::NameError)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An exception raised while executing a code object.
///
/// `line` is the line, relative to the code object's source, of the innermost
/// statement that was executing when the exception was raised.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}{}", message_suffix(.message))]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    pub line: Option<usize>,
}

fn message_suffix(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(": {}", message)
    }
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        RuntimeError {
            kind,
            message: message.into(),
            line: None,
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValueError, message)
    }

    pub fn index_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IndexError, message)
    }

    pub fn name_error(name: &str) -> Self {
        Self::new(
            ErrorKind::NameError,
            format!("name '{}' is not defined", name),
        )
    }

    pub fn zero_division(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ZeroDivisionError, message)
    }

    pub fn overflow(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OverflowError, message)
    }

    /// Record the statement line unless an inner statement already did.
    pub fn at_line(mut self, line: usize) -> Self {
        if self.line.is_none() {
            self.line = Some(line);
        }
        self
    }
}

impl From<std::io::Error> for RuntimeError {
    fn from(err: std::io::Error) -> Self {
        RuntimeError::new(ErrorKind::OSError, err.to_string())
    }
}

/// Source text that could not be compiled into a code object.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{location}: SyntaxError: {error}")]
pub struct CompileError {
    /// The `path:line` label the code object would have carried.
    pub location: String,
    #[source]
    pub error: ParseError,
}

/// A code object that raised while executing.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{location}: {error}")]
pub struct ExecError {
    pub location: String,
    /// Line, within this code object, of the top-level statement that raised.
    /// Differs from `error.line` when the exception came from inside a
    /// function defined elsewhere.
    pub line: usize,
    #[source]
    pub error: RuntimeError,
}
