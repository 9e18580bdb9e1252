pub mod dialect;
pub mod document;
pub mod error;
pub mod execute;
pub mod extract;
pub mod plugin;

pub use dialect::{Dialect, EndPattern};
pub use document::{Candidate, Document, Region};
pub use error::{DocError, MatcherError};
pub use execute::{ExecContext, execute_code_block};
pub use extract::{CodeBlock, dedent, find_code_blocks, strip_comment_markers};
pub use interpreter::STACK_SIZE;
pub use plugin::{CodeBlocks, DocumentReport, Plugin, Runner};
