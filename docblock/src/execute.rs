use std::io::Write;

use interpreter::{BUILTINS_KEY, Namespace, exec};
use tracing::{debug, trace};

use crate::document::{Document, Region};
use crate::error::DocError;
use crate::extract::CodeBlock;

/// State threaded through every execution for one document.
pub struct ExecContext<'a> {
    pub namespace: Namespace,
    pub output: &'a mut dyn Write,
    /// Units that ran to completion so far.
    pub executed: usize,
}

impl<'a> ExecContext<'a> {
    pub fn new(output: &'a mut dyn Write) -> Self {
        ExecContext {
            namespace: Namespace::new(),
            output,
            executed: 0,
        }
    }
}

/// Run the region's code block, if it has one, against the shared namespace.
///
/// Returns whether anything ran. `__builtins__` never survives the call, even
/// when the block raises.
pub fn execute_code_block(
    region: &Region,
    document: &Document,
    ctx: &mut ExecContext<'_>,
) -> Result<bool, DocError> {
    let Some(block) = region.parsed::<CodeBlock>() else {
        return Ok(false);
    };
    debug!(location = %block.code.location, "executing code block");

    let result = exec(&block.code, &mut ctx.namespace, &mut *ctx.output);
    if ctx.namespace.remove(BUILTINS_KEY).is_some() {
        trace!(location = %document.location(), "removed {}", BUILTINS_KEY);
    }

    result.map_err(|error| DocError::Execution {
        location: block.code.location.clone(),
        line: block.document_line(error.line),
        source: error,
    })?;
    Ok(true)
}
