use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use docblock::{Document, ExecContext, Runner};

use crate::config::Config;

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    /// Code blocks that ran to completion. For a failed document these are
    /// the blocks before the failing one.
    pub executed: usize,
    pub outcome: TestOutcome,
}

impl TestResult {
    fn label(&self) -> String {
        let name = self
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("?");
        match self.outcome {
            TestOutcome::Pass => format!("{} ({} blocks)", name, self.executed),
            TestOutcome::Fail(_) => format!("{} (failed after {} blocks)", name, self.executed),
        }
    }
}

/// Run every code block of one document; it passes when none fails.
fn run_single_test(path: &Path, runner: &Runner) -> TestResult {
    let mut document = match Document::from_path(path) {
        Ok(d) => d,
        Err(e) => {
            return TestResult {
                path: path.to_path_buf(),
                executed: 0,
                outcome: TestOutcome::Fail(e.to_string()),
            };
        }
    };

    let mut output_buf = Vec::new();
    let mut ctx = ExecContext::new(&mut output_buf);
    let result = runner
        .parse_document(&mut document)
        .and_then(|()| runner.execute_regions(&document, &mut ctx));
    let executed = ctx.executed;
    drop(ctx);

    let outcome = match result {
        Ok(()) => TestOutcome::Pass,
        Err(err) => {
            let output = String::from_utf8_lossy(&output_buf);
            let mut reason = err.to_string();
            if !output.trim().is_empty() {
                reason.push_str("\noutput before the failure:\n");
                reason.push_str(output.trim_end());
            }
            TestOutcome::Fail(reason)
        }
    };
    TestResult {
        path: path.to_path_buf(),
        executed,
        outcome,
    }
}

/// Documents under `root`, keyed by their folder relative to it. Top-level
/// documents land under "", and both keys and files come back sorted.
fn discover_categorized(root: &Path, config: &Config) -> BTreeMap<String, Vec<PathBuf>> {
    let mut found = BTreeMap::new();
    collect_documents(root, root, config, &mut found);
    found.values_mut().for_each(|files: &mut Vec<PathBuf>| files.sort());
    found
}

fn collect_documents(
    dir: &Path,
    root: &Path,
    config: &Config,
    out: &mut BTreeMap<String, Vec<PathBuf>>,
) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for path in entries.filter_map(|e| e.ok()).map(|e| e.path()) {
        if path.is_dir() {
            if !config.is_excluded(&path) {
                collect_documents(&path, root, config, out);
            }
        } else if config.is_document(&path) {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

/// Print the categories found under `path`.
pub fn list_categories(path: &Path, config: &Config) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path, config);
    if categories.is_empty() {
        eprintln!("no documents found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        let label = if cat.is_empty() { "(root)" } else { cat.as_str() };
        eprintln!("  {} ({} documents)", label, files.len());
    }
}

const GREEN: &str = "32";
const RED: &str = "31";
const BOLD: &str = "1";

/// Wrap `text` in an ANSI SGR sequence unless color is off.
fn paint(text: &str, sgr: &str, no_color: bool) -> String {
    if no_color {
        text.to_string()
    } else {
        format!("\x1b[{}m{}\x1b[0m", sgr, text)
    }
}

/// Pick the categories to run. Unknown names only warn.
fn select_categories<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a Vec<PathBuf>> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v)).collect();
    }
    let mut filtered = BTreeMap::new();
    for requested in requested {
        let req = requested.trim_matches('/');
        let mut found = false;
        for (cat, files) in all {
            if cat == req || cat.starts_with(&format!("{}/", req)) {
                filtered.insert(cat.as_str(), files);
                found = true;
            }
        }
        if !found {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all.keys()
                    .map(|k| if k.is_empty() { "(root)" } else { k.as_str() })
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    filtered
}

/// Run every document under `path`, or `path` itself when it is a file,
/// optionally restricted to `categories`. The result is the process exit code.
pub fn run_tests(path: &Path, config: &Config, no_color: bool, categories: &[String]) -> i32 {
    let runner = Runner::default();

    let all_categories = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        discover_categorized(path, config)
    };
    if all_categories.is_empty() {
        eprintln!("no documents found in {}", path.display());
        return 1;
    }

    let run_categories = if path.is_file() {
        select_categories(&all_categories, &[])
    } else {
        select_categories(&all_categories, categories)
    };
    if run_categories.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    'categories: for (cat, files) in &run_categories {
        if !path.is_file() {
            let header = if cat.is_empty() { "(root)" } else { *cat };
            eprintln!();
            eprintln!("{}", paint(header, BOLD, no_color));
        }

        for file in *files {
            let result = run_single_test(file, &runner);
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", paint("PASS", GREEN, no_color), result.label());
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", paint("FAIL", RED, no_color), result.label());
                    failures.push(result);
                    if config.fail_fast {
                        break 'categories;
                    }
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    summarize(passed, failures.len(), no_color)
}

fn summarize(passed: usize, failed: usize, no_color: bool) -> i32 {
    if failed == 0 {
        eprintln!(
            "test result: {}. {} passed, 0 failed",
            paint("ok", GREEN, no_color),
            passed
        );
        return 0;
    }
    eprintln!(
        "test result: {}. {} passed, {} failed (of {})",
        paint("FAILED", RED, no_color),
        passed,
        failed,
        passed + failed
    );
    1
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write(root: &Path, relative: &str, text: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn documents_are_grouped_by_folder() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "intro.md", "");
        write(root, "guide/basics.rst", "");
        write(root, "guide/advanced/more.txt", "");
        write(root, "guide/notes.py", "");
        write(root, "target/generated.md", "");

        let categories = discover_categorized(root, &Config::default());
        let names: Vec<&str> = categories.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["", "guide", "guide/advanced"]);
        assert_eq!(categories["guide"].len(), 1);

        let selected = select_categories(&categories, &["guide".to_string()]);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn passing_and_failing_documents() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Runner::default();
        let good = write(
            dir.path(),
            "good.rst",
            ".. code-block:: python\n\n    x = 1\n\n.. code-block:: python\n\n    assert x == 1\n",
        );
        let bad = write(
            dir.path(),
            "bad.md",
            "```python\nprint('hello')\nassert 1 == 2, 'nope'\n```\n",
        );

        let result = run_single_test(&good, &runner);
        assert!(matches!(result.outcome, TestOutcome::Pass));
        assert_eq!(result.executed, 2);

        let result = run_single_test(&bad, &runner);
        let TestOutcome::Fail(reason) = &result.outcome else {
            panic!("expected a failure");
        };
        assert!(reason.contains("AssertionError: nope"));
        assert!(reason.contains("hello"));
        assert_eq!(result.executed, 0);
    }

    #[test]
    fn failed_documents_count_the_blocks_before_the_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "partial.md",
            "```python\nx = 1\n```\n\n```python\ny = x + 1\n```\n\n```python\nz = 1 / 0\n```\n\n```python\nw = 0\n```\n",
        );
        let result = run_single_test(&path, &Runner::default());
        assert!(matches!(result.outcome, TestOutcome::Fail(_)));
        assert_eq!(result.executed, 2);
        assert_eq!(result.label(), "partial.md (failed after 2 blocks)");
    }

    #[test]
    fn exit_code_reflects_failures() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "ok.md", "```python\nx = 1\n```\n");
        assert_eq!(run_tests(dir.path(), &Config::default(), true, &[]), 0);

        write(dir.path(), "sub/broken.md", "```python\ndef (:\n```\n");
        assert_eq!(run_tests(dir.path(), &Config::default(), true, &[]), 1);
        assert_eq!(
            run_tests(dir.path(), &Config::default(), true, &["sub".to_string()]),
            1
        );
    }
}
