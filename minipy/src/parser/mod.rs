pub mod error;
mod expression;
pub mod lexer;
mod statement;

pub use error::ParseError;

use crate::ast::Module;
use crate::parser::lexer::{Spanned, Token};

/// Parser entry point.
pub struct Parser {
    source: String,
}

impl Parser {
    pub fn new(source: impl Into<String>) -> Self {
        Parser {
            source: source.into(),
        }
    }

    /// Parse the source text into a complete Module.
    pub fn parse(&self) -> Result<Module, ParseError> {
        let tokens = lexer::tokenize(&self.source)?;
        let mut cursor = Cursor::new(tokens);
        cursor.parse_module()
    }
}

/// Shorthand for `Parser::new(source).parse()`.
pub fn parse(source: &str) -> Result<Module, ParseError> {
    Parser::new(source).parse()
}

// ---------------------------------------------------------------------------
// Token cursor shared by the statement and expression parsers
// ---------------------------------------------------------------------------

pub(crate) struct Cursor {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Enclosing `while`/`for` bodies, reset inside `def`.
    loop_depth: usize,
    function_depth: usize,
    /// Expression nesting at the cursor, see `expression::MAX_NESTING`.
    nesting: usize,
}

impl Cursor {
    fn new(tokens: Vec<Spanned>) -> Self {
        Cursor {
            tokens,
            pos: 0,
            loop_depth: 0,
            function_depth: 0,
            nesting: 0,
        }
    }

    fn current(&self) -> &Spanned {
        // The lexer always terminates the stream with EndOfFile.
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn peek(&self) -> &Token {
        &self.current().token
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + offset).min(last)].token
    }

    fn advance(&mut self) -> Spanned {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<Spanned, ParseError> {
        if self.at(token) {
            Ok(self.advance())
        } else {
            Err(self.error_here(format!("invalid syntax: expected {}", what)))
        }
    }

    fn expect_name(&mut self, what: &str) -> Result<String, ParseError> {
        match self.peek().clone() {
            Token::Name(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.error_here(format!("invalid syntax: expected {}", what))),
        }
    }

    fn position(&self) -> (usize, usize) {
        let current = self.current();
        (current.line, current.column)
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        let (line, column) = self.position();
        ParseError::new(message, line, column)
    }
}
