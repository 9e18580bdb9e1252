mod config;
mod test_runner;

use std::io::Write;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::process;
use std::thread;

use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::EnvFilter;

use docblock::{CodeBlock, DocError, Document, Runner};

use crate::config::Config;

const SUBCOMMANDS: &[&str] = &["run", "test", "help"];

/// Global options that take a value, so the value is not mistaken for a
/// subcommand or file.
const VALUE_FLAGS: &[&str] = &["--config"];

#[derive(Parser)]
#[command(
    name = "docrun",
    version,
    about = "Execute the Python code blocks embedded in prose documents"
)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log matching and execution steps to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (default: docrun.toml in the test root)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every code block of one document
    Run(RunArgs),

    /// Run a document or every document under a directory as tests
    Test(TestArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Document to execute (.md uses fenced blocks, anything else directives)
    file: String,

    /// Extract and compile only, don't execute (exit 0 if valid)
    #[arg(long)]
    check: bool,

    /// List each code block's location and first line
    #[arg(long)]
    list_blocks: bool,

    /// Print the extracted source of each code block
    #[arg(long)]
    dump: bool,

    /// Suppress program output (just check for errors)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a document or a directory containing them
    path: String,

    /// Run only documents in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

/// `docrun file.md` works like `docrun run file.md`.
fn insert_implicit_run(mut args: Vec<String>) -> Vec<String> {
    let mut i = 1;
    while i < args.len() {
        let arg = args[i].as_str();
        if VALUE_FLAGS.contains(&arg) {
            i += 2;
            continue;
        }
        if !arg.starts_with('-') {
            if !SUBCOMMANDS.contains(&arg) {
                args.insert(i, "run".to_string());
            }
            break;
        }
        i += 1;
    }
    args
}

fn init_tracing(verbose: bool, no_color: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .init();
}

fn main() {
    let cli = Cli::parse_from(insert_implicit_run(std::env::args().collect()));
    init_tracing(cli.verbose, cli.no_color);

    // Recursion in documented code runs on the native stack.
    let worker = thread::Builder::new()
        .name("docrun".to_string())
        .stack_size(docblock::STACK_SIZE)
        .spawn(move || dispatch(cli));
    let exit_code = match worker.map(thread::JoinHandle::join) {
        Ok(Ok(code)) => code,
        Ok(Err(_)) => 101,
        Err(e) => {
            eprintln!("error: {}", e);
            1
        }
    };
    process::exit(exit_code);
}

fn dispatch(cli: Cli) -> i32 {
    match cli.command {
        Command::Run(run_args) => do_run(run_args, cli.no_color),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            let config = match Config::discover(path, cli.config.as_deref()) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("error: {}", e);
                    return 1;
                }
            };
            if test_args.list_categories {
                test_runner::list_categories(path, &config);
                return 0;
            }
            test_runner::run_tests(path, &config, cli.no_color, &test_args.category)
        }
    }
}

fn do_run(args: RunArgs, no_color: bool) -> i32 {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let mut document = match Document::from_path(&args.file) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {}", e);
            return 1;
        }
    };

    let mut files = SimpleFiles::new();
    let file_id = files.add(
        document.location().to_string(),
        document.source().to_string(),
    );
    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    let runner = Runner::default();

    if args.check || args.list_blocks || args.dump {
        if let Err(error) = runner.parse_document(&mut document) {
            emit_doc_error(&writer, &config, &files, file_id, &error);
            return 1;
        }
        let blocks: Vec<&CodeBlock> = document
            .regions()
            .filter_map(|r| r.parsed::<CodeBlock>())
            .collect();

        if args.list_blocks {
            for block in &blocks {
                let first = block
                    .source
                    .lines()
                    .find(|l| !l.trim().is_empty())
                    .unwrap_or("(empty)");
                println!("{}  {}", block.code.location, first.trim_end());
            }
        }
        if args.dump {
            for block in &blocks {
                println!("# {}", block.code.location);
                println!("{}", block.source.trim_matches('\n'));
                println!();
            }
        }
        if args.check {
            eprintln!("ok: {} code blocks in {} compiled", blocks.len(), args.file);
        }
        return 0;
    }

    let result = if args.quiet {
        runner.run_document(&mut document, &mut std::io::sink())
    } else {
        let mut stdout = std::io::stdout().lock();
        let result = runner.run_document(&mut document, &mut stdout);
        let _ = stdout.flush();
        result
    };

    match result {
        Ok(report) => {
            tracing::debug!(location = %report.location, executed = report.executed, "done");
            0
        }
        Err(error) => {
            emit_doc_error(&writer, &config, &files, file_id, &error);
            1
        }
    }
}

fn emit_doc_error(
    writer: &StandardStream,
    config: &term::Config,
    files: &SimpleFiles<String, String>,
    file_id: usize,
    error: &DocError,
) {
    let Some(line) = error.line() else {
        eprintln!("error: {}", error);
        return;
    };
    let source = files.get(file_id).map(|f| f.source().as_str()).unwrap_or("");
    let span = line_span(source, line);

    let diagnostic = match error {
        DocError::Extraction {
            location, source, ..
        } => source
            .error
            .to_diagnostic(file_id, span)
            .with_notes(vec![format!("in code block at {}", location)]),
        DocError::Execution {
            location, source, ..
        } => Diagnostic::error()
            .with_message(source.error.to_string())
            .with_labels(vec![Label::primary(file_id, span).with_message("raised here")])
            .with_notes(vec![format!("in code block at {}", location)]),
        DocError::Matcher(err) => Diagnostic::error()
            .with_message(err.to_string())
            .with_labels(vec![Label::primary(file_id, span)]),
        DocError::Io { .. } => Diagnostic::error().with_message(error.to_string()),
    };
    let _ = term::emit_to_write_style(&mut writer.lock(), config, files, &diagnostic);
}

/// Byte range of the text on a 1-based line, without its indentation.
fn line_span(source: &str, line: usize) -> Range<usize> {
    let mut offset = 0;
    for (number, text) in source.split_inclusive('\n').enumerate() {
        if number + 1 == line {
            let content = text.trim_end();
            let indent = content.len() - content.trim_start().len();
            return offset + indent..offset + content.len();
        }
        offset += text.len();
    }
    source.len()..source.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_file_runs() {
        assert_eq!(
            insert_implicit_run(args(&["docrun", "guide.md"])),
            args(&["docrun", "run", "guide.md"])
        );
        assert_eq!(
            insert_implicit_run(args(&["docrun", "--config", "x.toml", "guide.md"])),
            args(&["docrun", "--config", "x.toml", "run", "guide.md"])
        );
        assert_eq!(
            insert_implicit_run(args(&["docrun", "test", "docs"])),
            args(&["docrun", "test", "docs"])
        );
    }

    #[test]
    fn spans_skip_indentation() {
        let source = "a\n    b = 1\n";
        assert_eq!(line_span(source, 2), 6..11);
        assert_eq!(line_span(source, 9), 12..12);
    }
}
