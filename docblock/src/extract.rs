//! Turning a claimed region into a compiled code unit.

use interpreter::{CodeObject, compile};
use tracing::debug;

use crate::dialect::Dialect;
use crate::document::Document;
use crate::error::DocError;

/// One extracted block: its recovered source and compiled form.
#[derive(Debug, Clone)]
pub struct CodeBlock {
    pub source: String,
    pub code: CodeObject,
    /// Document line that line 1 of `source` came from.
    pub first_line: usize,
}

impl CodeBlock {
    /// Document line for a line number reported against `source`.
    pub fn document_line(&self, line: usize) -> usize {
        self.first_line + line.saturating_sub(1)
    }
}

/// Remove the leading whitespace every non-blank line shares.
///
/// Blank and whitespace-only lines neither count toward the common prefix nor
/// get touched.
pub fn dedent(text: &str) -> String {
    let mut common: Option<&str> = None;
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let indent = &line[..line.len() - line.trim_start().len()];
        common = Some(match common {
            None => indent,
            Some(prefix) => common_prefix(prefix, indent),
        });
    }
    let prefix = match common {
        Some(prefix) if !prefix.is_empty() => prefix,
        _ => return text.to_string(),
    };

    text.split_inclusive('\n')
        .map(|line| {
            if line.trim().is_empty() {
                line
            } else {
                line.strip_prefix(prefix).unwrap_or(line)
            }
        })
        .collect()
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let len = a
        .char_indices()
        .zip(b.chars())
        .find(|((_, x), y)| x != y)
        .map_or(a.len().min(b.len()), |((i, _), _)| i);
    &a[..len]
}

/// Strip a leading `%` and at most one following space from each line.
pub fn strip_comment_markers(text: &str) -> String {
    text.split_inclusive('\n')
        .map(|line| match line.strip_prefix('%') {
            Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
            None => line,
        })
        .collect()
}

/// Find, compile and claim every code block in the document.
///
/// Returns how many blocks were claimed. Nothing is executed.
pub fn find_code_blocks(document: &mut Document) -> Result<usize, DocError> {
    let dialect = Dialect::for_location(document.location());
    let start = dialect.start();
    let candidates = document.find_regions(start, dialect.end())?;
    let count = candidates.len();

    for candidate in candidates {
        // Every candidate begins with a start match.
        let marker_end = start.find(&candidate.source).map_or(0, |m| m.end());
        let mut source = dedent(&candidate.source[marker_end..]);
        if dialect.strips_comment_markers() {
            source = strip_comment_markers(&source);
        }
        let first_line = candidate.lineno + candidate.source[..marker_end].matches('\n').count();
        let location = format!("{}:{}", document.location(), candidate.lineno);

        let code = compile(&source, location.clone()).map_err(|error| DocError::Extraction {
            line: first_line + error.error.line.saturating_sub(1),
            location,
            source: error,
        })?;
        debug!(
            location = %code.location,
            dialect = dialect.name(),
            statements = code.module.body.len(),
            "extracted code block"
        );

        let region = document.claim_region(&candidate)?;
        region.set_parsed(CodeBlock {
            source,
            code,
            first_line,
        })?;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedent_removes_the_shared_indent() {
        assert_eq!(dedent("\n    x = 1\n    if x:\n        y\n"), "\nx = 1\nif x:\n    y\n");
        assert_eq!(dedent("x\n  y\n"), "x\n  y\n");
    }

    #[test]
    fn dedent_ignores_blank_lines() {
        assert_eq!(dedent("   a\n\n  \n   b\n"), "a\n\n  \nb\n");
    }

    #[test]
    fn dedent_is_idempotent_under_reindentation() {
        let body = "x = 1\nif x:\n    y = 2\n\nprint(y)\n";
        for indent in ["", " ", "    ", "\t"] {
            let shifted: String = body
                .split_inclusive('\n')
                .map(|l| {
                    if l.trim().is_empty() {
                        l.to_string()
                    } else {
                        format!("{indent}{l}")
                    }
                })
                .collect();
            assert_eq!(dedent(&shifted), body);
            assert_eq!(dedent(&dedent(&shifted)), body);
        }
    }

    #[test]
    fn comment_markers_lose_one_space_at_most() {
        assert_eq!(
            strip_comment_markers("\n% y = 2\n%if y:\n%     z = 1\nplain\n"),
            "\ny = 2\nif y:\n    z = 1\nplain\n"
        );
    }

    #[test]
    fn first_line_accounts_for_option_lines() {
        let mut doc = Document::new(
            "doc.rst",
            "Intro\n\n.. code-block:: python\n    :linenos:\n\n    x = 1\n",
        );
        find_code_blocks(&mut doc).unwrap();
        let block = doc
            .regions()
            .find_map(|r| r.parsed::<CodeBlock>())
            .unwrap();
        assert_eq!(block.code.location, "doc.rst:3");
        assert_eq!(block.first_line, 5);
        assert_eq!(block.document_line(2), 6);
        assert_eq!(block.source, "\nx = 1\n");
    }
}
