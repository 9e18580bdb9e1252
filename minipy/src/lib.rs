//! Lexer, parser and syntax tree for the Python subset run from documentation
//! code blocks.

pub mod ast;
pub mod parser;

pub use ast::Module;
pub use parser::{ParseError, Parser, parse};
