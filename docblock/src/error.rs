use interpreter::{CompileError, ExecError};

/// Failures while locating or claiming regions of a document.
#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    #[error("{location}:{line}: couldn't find the end of the region starting here")]
    UnterminatedRegion { location: String, line: usize },

    #[error("{location}:{line}: region {edge} must fall on a line boundary")]
    Misaligned {
        location: String,
        line: usize,
        edge: &'static str,
    },

    #[error("{location}:{line}: region is already claimed")]
    AlreadyClaimed { location: String, line: usize },

    #[error("{location}:{line}: no region of the document contains this candidate")]
    UnknownRegion { location: String, line: usize },

    #[error("region at line {line} already holds a parsed artifact")]
    AlreadyParsed { line: usize },
}

/// Why processing one document stopped.
#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error(transparent)]
    Matcher(#[from] MatcherError),

    /// The extracted text of a block is not valid source.
    #[error("{location}: SyntaxError: {} (line {line})", .source.error.message)]
    Extraction {
        /// `path:line` tag of the block.
        location: String,
        /// Document line the error points at.
        line: usize,
        source: CompileError,
    },

    /// A block raised while executing.
    #[error("{location}: {} (line {line})", .source.error)]
    Execution {
        location: String,
        line: usize,
        source: ExecError,
    },

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl DocError {
    /// Document line the failure points at, when there is one.
    pub fn line(&self) -> Option<usize> {
        match self {
            DocError::Extraction { line, .. } | DocError::Execution { line, .. } => Some(*line),
            DocError::Matcher(
                MatcherError::UnterminatedRegion { line, .. }
                | MatcherError::Misaligned { line, .. }
                | MatcherError::AlreadyClaimed { line, .. }
                | MatcherError::UnknownRegion { line, .. }
                | MatcherError::AlreadyParsed { line },
            ) => Some(*line),
            DocError::Io { .. } => None,
        }
    }
}
