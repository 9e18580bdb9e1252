use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};

/// A syntax error with its position inside the unit source.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} (line {line}, column {column})")]
pub struct ParseError {
    pub message: String,
    /// 1-based line within the parsed source.
    pub line: usize,
    /// 1-based column within that line.
    pub column: usize,
    pub notes: Vec<String>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        ParseError {
            message: message.into(),
            line,
            column,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    ///
    /// `span` is a byte range in whichever file `file_id` names; callers map
    /// [`ParseError::line`] back onto the host document before calling this.
    pub fn to_diagnostic(&self, file_id: usize, span: Range<usize>) -> Diagnostic<usize> {
        Diagnostic::new(Severity::Error)
            .with_message(format!("SyntaxError: {}", self.message))
            .with_labels(vec![Label::primary(file_id, span)])
            .with_notes(self.notes.clone())
    }
}
