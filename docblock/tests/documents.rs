use std::fs;

use docblock::{
    CodeBlock, DocError, Document, ExecContext, MatcherError, Runner, execute_code_block,
    find_code_blocks,
};
use interpreter::{BUILTINS_KEY, RuntimeValue};

fn run(location: &str, text: &str) -> (String, docblock::DocumentReport) {
    let mut document = Document::new(location, text);
    let mut output = Vec::new();
    let report = Runner::default()
        .run_document(&mut document, &mut output)
        .expect("document failed");
    (String::from_utf8(output).unwrap(), report)
}

fn run_err(location: &str, text: &str) -> DocError {
    let mut document = Document::new(location, text);
    let mut output = Vec::new();
    Runner::default()
        .run_document(&mut document, &mut output)
        .expect_err("expected the document to fail")
}

#[test]
fn blocks_share_one_namespace() {
    let text = "\
Title
=====

.. code-block:: python

    x = 1

Some prose.

.. code-block:: python

    print(x)
";
    let (output, report) = run("document.rst", text);
    assert_eq!(output, "1\n");
    assert_eq!(report.executed, 2);
    assert_eq!(report.namespace.get("x"), Some(&RuntimeValue::Int(1)));
}

#[test]
fn builtins_are_removed_after_every_block() {
    let (_, report) = run("document.rst", ".. code-block:: python\n\n    n = len([1, 2])\n");
    assert!(!report.namespace.contains(BUILTINS_KEY));

    let mut document = Document::new("document.rst", ".. code-block:: python\n\n    1 / 0\n");
    find_code_blocks(&mut document).unwrap();
    let mut output = Vec::new();
    let mut ctx = ExecContext::new(&mut output);
    for region in document.regions() {
        assert!(execute_code_block(region, &document, &mut ctx).is_err());
    }
    assert!(!ctx.namespace.contains(BUILTINS_KEY));
}

#[test]
fn unmatched_regions_stay_unclaimed() {
    let text = ".. code-block:: rust\n\n    fn main() {}\n\nProse.\n";
    let mut document = Document::new("document.rst", text);
    let mut output = Vec::new();
    let report = Runner::default()
        .run_document(&mut document, &mut output)
        .unwrap();
    assert_eq!(report.executed, 0);
    assert!(document.regions().all(|r| !r.is_claimed()));
    assert!(output.is_empty());
}

#[test]
fn fenced_blocks_and_invisible_comments() {
    let text = "\
# Title

```python
a = 2
```

% invisible-code-block: python
% y = a * 2
% print(y)

Done.
";
    let (output, report) = run("guide.md", text);
    assert_eq!(output, "4\n");
    assert_eq!(report.executed, 2);
}

#[test]
fn invisible_block_matches_its_directive_twin() {
    let mut fenced = Document::new("a.md", "% invisible-code-block: python\n% y = 2\n\n");
    find_code_blocks(&mut fenced).unwrap();
    let block = fenced.regions().find_map(|r| r.parsed::<CodeBlock>()).unwrap();
    assert_eq!(block.source.trim(), "y = 2");

    let (_, from_fenced) = run("a.md", "% invisible-code-block: python\n% y = 2\n\n");
    let (_, from_directive) = run("a.rst", ".. code-block:: python\n\n    y = 2\n");
    assert_eq!(from_fenced.namespace.get("y"), Some(&RuntimeValue::Int(2)));
    assert_eq!(from_fenced.namespace.get("y"), from_directive.namespace.get("y"));
}

#[test]
fn syntax_errors_carry_the_directive_line() {
    let text = "Broken\n\n.. code-block:: python\n\n    def (:\n        pass\n";
    let err = run_err("document.rst", text);
    let DocError::Extraction { location, line, .. } = &err else {
        panic!("expected an extraction failure, got {err:?}");
    };
    assert_eq!(location, "document.rst:3");
    assert_eq!(*line, 5);
    assert!(err.to_string().starts_with("document.rst:3: SyntaxError"));
}

#[test]
fn runtime_errors_point_at_the_document_line() {
    let text = "\
.. code-block:: python

    def boom():
        return 1 / 0

.. code-block:: python

    x = 1
    boom()
";
    let err = run_err("document.rst", text);
    let DocError::Execution { location, line, .. } = &err else {
        panic!("expected an execution failure, got {err:?}");
    };
    assert_eq!(location, "document.rst:6");
    assert_eq!(*line, 9);
    assert!(err.to_string().contains("ZeroDivisionError"));
}

#[test]
fn a_failing_block_stops_the_document() {
    let text = "\
.. code-block:: python

    print('first')
    missing

.. code-block:: python

    print('never')
";
    let mut document = Document::new("document.rst", text);
    let mut output = Vec::new();
    let err = Runner::default()
        .run_document(&mut document, &mut output)
        .unwrap_err();
    assert!(err.to_string().contains("NameError"));
    assert_eq!(String::from_utf8(output).unwrap(), "first\n");
}

#[test]
fn empty_block_at_end_of_document() {
    let (_, report) = run("document.rst", "Text\n\n.. code-block:: python");
    assert_eq!(report.executed, 1);
    let (_, report) = run("document.rst", "Text\n\n.. code-block:: python\n");
    assert_eq!(report.executed, 1);
    let (_, report) = run("guide.md", "```python\n```\n");
    assert_eq!(report.executed, 1);
}

#[test]
fn last_line_without_newline_is_part_of_the_block() {
    let (_, report) = run("document.rst", ".. code-block:: python\n\n    x = 5");
    assert_eq!(report.namespace.get("x"), Some(&RuntimeValue::Int(5)));
    let (_, report) = run("guide.md", "```python\nx = 6\n```");
    assert_eq!(report.namespace.get("x"), Some(&RuntimeValue::Int(6)));
}

#[test]
fn directive_variants_and_options() {
    let text = "\
.. invisible-code-block: python

    a = 1

.. code:: python

    b = a + 1

.. code-block:: python
    :caption: adding
    :linenos:

    c = b + 1
";
    let (_, report) = run("document.rst", text);
    assert_eq!(report.executed, 3);
    assert_eq!(report.namespace.get("c"), Some(&RuntimeValue::Int(3)));
}

#[test]
fn unclosed_fence_is_reported() {
    let err = run_err("guide.md", "Intro\n\n```python\nx = 1\n");
    assert!(matches!(
        err,
        DocError::Matcher(MatcherError::UnterminatedRegion { line: 3, .. })
    ));
}

#[test]
fn documents_read_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.md");
    fs::write(&path, "```python\nprint(sum([1, 2, 3]))\n```\n").unwrap();

    let mut document = Document::from_path(&path).unwrap();
    assert_eq!(document.location(), path.display().to_string());
    let mut output = Vec::new();
    Runner::default()
        .run_document(&mut document, &mut output)
        .unwrap();
    assert_eq!(output, b"6\n");

    let missing = Document::from_path(dir.path().join("absent.rst")).unwrap_err();
    assert!(matches!(missing, DocError::Io { .. }));
}
