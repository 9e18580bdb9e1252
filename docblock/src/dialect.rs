//! Markup dialects and the boundary patterns that delimit code blocks.

use std::sync::LazyLock;

use regex::Regex;

/// `.. code-block:: python`, `.. code:: python`, `.. invisible-code-block: python`
/// plus any `:option:` lines directly below.
static DIRECTIVE_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\.\.\s*(?:invisible-)?code(?:-block)?::?\s*python\b(?:\s*:[\w-]+:.*\n)*")
        .unwrap()
});

/// The newline before the first non-indented, non-blank line, or end of text.
static DIRECTIVE_END: LazyLock<EndPattern> =
    LazyLock::new(|| EndPattern::new(r"(\n)(?:\z|\S)|\z").unwrap());

static FENCED_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(?:```python|% invisible-code-block:\s+python)$").unwrap()
});

/// The newline before a closing fence, or a `% ` comment line followed by a
/// blank line.
static FENCED_END: LazyLock<EndPattern> =
    LazyLock::new(|| EndPattern::new(r"(?m)(\n)```(?:\n|\z)|^(% [\S ]*\n)\n").unwrap());

/// A region-end pattern.
///
/// Where a region stops can depend on what follows it, so the boundary is
/// the end of the first capture group that took part in the match, or the
/// end of the whole match when no group did.
#[derive(Debug, Clone)]
pub struct EndPattern {
    regex: Regex,
}

impl EndPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(EndPattern {
            regex: Regex::new(pattern)?,
        })
    }

    /// Byte offset of the first boundary at or after `from`.
    pub fn find_boundary(&self, text: &str, from: usize) -> Option<usize> {
        let captures = self.regex.captures_at(text, from)?;
        let whole = captures.get(0)?;
        Some(
            captures
                .iter()
                .skip(1)
                .flatten()
                .next()
                .map_or(whole.end(), |group| group.end()),
        )
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// The markup flavour a document is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// reStructuredText `code-block` directives.
    Directive,
    /// Markdown/MyST backtick fences and `%` invisible blocks.
    Fenced,
}

impl Dialect {
    /// `.md` documents are fenced; everything else uses directives.
    pub fn for_location(location: &str) -> Self {
        if location.ends_with(".md") {
            Dialect::Fenced
        } else {
            Dialect::Directive
        }
    }

    pub fn start(self) -> &'static Regex {
        match self {
            Dialect::Directive => &DIRECTIVE_START,
            Dialect::Fenced => &FENCED_START,
        }
    }

    pub fn end(self) -> &'static EndPattern {
        match self {
            Dialect::Directive => &DIRECTIVE_END,
            Dialect::Fenced => &FENCED_END,
        }
    }

    /// Whether source lines may carry a `%` comment marker to strip.
    pub fn strips_comment_markers(self) -> bool {
        self == Dialect::Fenced
    }

    pub fn name(self) -> &'static str {
        match self {
            Dialect::Directive => "directive",
            Dialect::Fenced => "fenced",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_matches(dialect: Dialect, text: &str) -> bool {
        dialect.start().is_match(text)
    }

    #[test]
    fn dialect_follows_the_suffix() {
        assert_eq!(Dialect::for_location("guide.md"), Dialect::Fenced);
        assert_eq!(Dialect::for_location("guide.rst"), Dialect::Directive);
        assert_eq!(Dialect::for_location("README.txt"), Dialect::Directive);
        assert_eq!(Dialect::for_location("notes.md.rst"), Dialect::Directive);
    }

    #[test]
    fn directive_start_forms() {
        for text in [
            ".. code-block:: python\n",
            ".. code:: python\n",
            ".. invisible-code-block: python\n",
            "..code-block::python\n",
        ] {
            assert!(start_matches(Dialect::Directive, text), "{:?}", text);
        }
        assert!(!start_matches(Dialect::Directive, ".. code-block:: pythonic\n"));
        assert!(!start_matches(Dialect::Directive, "   .. code-block:: python\n"));
        assert!(!start_matches(Dialect::Directive, ".. code-block:: rust\n"));
    }

    #[test]
    fn directive_start_absorbs_options() {
        let text = ".. code-block:: python\n    :linenos:\n    :emphasize-lines: 1\n\n    x = 1\n";
        let m = Dialect::Directive.start().find(text).unwrap();
        assert_eq!(&text[m.end()..], "\n    x = 1\n");
    }

    #[test]
    fn fenced_start_forms() {
        assert!(start_matches(Dialect::Fenced, "```python\n"));
        assert!(start_matches(Dialect::Fenced, "% invisible-code-block: python\n"));
        assert!(!start_matches(Dialect::Fenced, "```python3\n"));
        assert!(!start_matches(Dialect::Fenced, "```rust\n"));
    }

    #[test]
    fn directive_end_boundaries() {
        let end = Dialect::Directive.end();
        let text = "x\n    y\n\nText";
        assert_eq!(end.find_boundary(text, 0), Some(9));
        assert_eq!(end.find_boundary("x\n    y\n", 0), Some(8));
        assert_eq!(end.find_boundary("x\n    y", 0), Some(7));
    }

    #[test]
    fn fenced_end_boundaries() {
        let end = Dialect::Fenced.end();
        assert_eq!(end.find_boundary("```python\nx = 1\n```\n", 9), Some(16));
        assert_eq!(end.find_boundary("```python\nx = 1\n```", 9), Some(16));
        let text = "% invisible-code-block: python\n% y = 2\n\nmore";
        assert_eq!(end.find_boundary(text, 30), Some(39));
    }

    #[test]
    fn fenced_end_ignores_percent_mid_line() {
        let end = Dialect::Fenced.end();
        let text = "```python\nz = 7 % 3\n\nprint(z)\n```\n";
        assert_eq!(end.find_boundary(text, 9), Some(30));
    }
}
