//! Parse and execute passes, and the runner that sequences them.

use std::io::Write;

use interpreter::Namespace;
use tracing::debug;

use crate::document::{Document, Region};
use crate::error::DocError;
use crate::execute::{ExecContext, execute_code_block};
use crate::extract::find_code_blocks;

/// Extraction logic hooked into document processing.
///
/// `parse` runs once per document before any execution; `execute` then runs
/// once per region in textual order.
pub trait Plugin {
    fn name(&self) -> &'static str;

    fn parse(&self, document: &mut Document) -> Result<(), DocError>;

    /// Returns whether the region was executed by this plugin.
    fn execute(
        &self,
        region: &Region,
        document: &Document,
        ctx: &mut ExecContext<'_>,
    ) -> Result<bool, DocError>;
}

/// Python code blocks in either markup dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct CodeBlocks;

impl Plugin for CodeBlocks {
    fn name(&self) -> &'static str {
        "code-blocks"
    }

    fn parse(&self, document: &mut Document) -> Result<(), DocError> {
        find_code_blocks(document).map(drop)
    }

    fn execute(
        &self,
        region: &Region,
        document: &Document,
        ctx: &mut ExecContext<'_>,
    ) -> Result<bool, DocError> {
        execute_code_block(region, document, ctx)
    }
}

/// What processing one document did.
#[derive(Debug)]
pub struct DocumentReport {
    pub location: String,
    /// Code units that ran.
    pub executed: usize,
    /// The namespace as the last unit left it.
    pub namespace: Namespace,
}

pub struct Runner {
    plugins: Vec<Box<dyn Plugin>>,
}

impl Default for Runner {
    fn default() -> Self {
        Runner::new().with(CodeBlocks)
    }
}

impl Runner {
    /// A runner with no plugins.
    pub fn new() -> Self {
        Runner {
            plugins: Vec::new(),
        }
    }

    pub fn with(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn plugin_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.plugins.iter().map(|p| p.name())
    }

    /// Run only the parse passes.
    pub fn parse_document(&self, document: &mut Document) -> Result<(), DocError> {
        for plugin in &self.plugins {
            debug!(plugin = plugin.name(), location = %document.location(), "parse pass");
            plugin.parse(document)?;
        }
        Ok(())
    }

    /// Parse the document, then execute its regions in order with one shared
    /// namespace. The first failure stops the document.
    pub fn run_document(
        &self,
        document: &mut Document,
        output: &mut dyn Write,
    ) -> Result<DocumentReport, DocError> {
        self.parse_document(document)?;
        let mut ctx = ExecContext::new(output);
        self.execute_regions(document, &mut ctx)?;
        Ok(DocumentReport {
            location: document.location().to_string(),
            executed: ctx.executed,
            namespace: ctx.namespace,
        })
    }

    /// Run the execute passes over an already parsed document, counting each
    /// unit that completes in `ctx.executed`.
    pub fn execute_regions(
        &self,
        document: &Document,
        ctx: &mut ExecContext<'_>,
    ) -> Result<(), DocError> {
        for region in document.regions() {
            for plugin in &self.plugins {
                if plugin.execute(region, document, ctx)? {
                    ctx.executed += 1;
                }
            }
        }
        debug!(location = %document.location(), executed = ctx.executed, "document finished");
        Ok(())
    }
}
