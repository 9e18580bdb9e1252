use crate::parser::error::ParseError;

/// Deepest block nesting the lexer accepts.
const MAX_INDENT_LEVELS: usize = 100;

// ---------------------------------------------------------------------------
// Token types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Int(i64),
    /// An integer literal outside the `i64` range, as its digits.
    LongInt {
        digits: String,
        radix: u32,
    },
    Float(f64),
    Str(String),

    Name(String),

    // Keywords
    None,
    True,
    False,
    And,
    Or,
    Not,
    If,
    Elif,
    Else,
    While,
    For,
    In,
    Is,
    Def,
    Return,
    Pass,
    Break,
    Continue,
    Global,
    Del,
    Assert,
    Raise,
    Lambda,

    // Operators
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    Assign,      // =
    EqEq,        // ==
    NotEq,       // !=
    Lt,
    Gt,
    LtEq,
    GtEq,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    DoubleSlashAssign,
    PercentAssign,

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Semicolon,
    At,

    // Layout
    Newline,
    Indent,
    Dedent,
    EndOfFile,
}

/// A token with the 1-based line and column it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

fn keyword(word: &str) -> Option<Token> {
    let token = match word {
        "None" => Token::None,
        "True" => Token::True,
        "False" => Token::False,
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "if" => Token::If,
        "elif" => Token::Elif,
        "else" => Token::Else,
        "while" => Token::While,
        "for" => Token::For,
        "in" => Token::In,
        "is" => Token::Is,
        "def" => Token::Def,
        "return" => Token::Return,
        "pass" => Token::Pass,
        "break" => Token::Break,
        "continue" => Token::Continue,
        "global" => Token::Global,
        "del" => Token::Del,
        "assert" => Token::Assert,
        "raise" => Token::Raise,
        "lambda" => Token::Lambda,
        _ => return None,
    };
    Some(token)
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

/// Turn source text into a token stream with explicit INDENT/DEDENT layout
/// tokens. Blank and comment-only lines produce no tokens, and newlines
/// inside brackets are ignored.
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, ParseError> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    depth: usize,
    indents: Vec<usize>,
    tokens: Vec<Spanned>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            depth: 0,
            indents: vec![0],
            tokens: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.line, self.column)
    }

    fn push(&mut self, token: Token, line: usize, column: usize) {
        self.tokens.push(Spanned { token, line, column });
    }

    fn last_is_newline(&self) -> bool {
        matches!(
            self.tokens.last().map(|t| &t.token),
            None | Some(Token::Newline) | Some(Token::Indent) | Some(Token::Dedent)
        )
    }

    fn run(mut self) -> Result<Vec<Spanned>, ParseError> {
        let mut at_line_start = true;

        while self.pos < self.chars.len() {
            if at_line_start && self.depth == 0 {
                at_line_start = false;
                if self.handle_indentation()? {
                    at_line_start = true;
                    continue;
                }
            }

            let Some(c) = self.peek() else { break };
            let (line, column) = (self.line, self.column);

            match c {
                '\n' => {
                    self.bump();
                    if self.depth == 0 {
                        if !self.last_is_newline() {
                            self.push(Token::Newline, line, column);
                        }
                        at_line_start = true;
                    }
                }
                ' ' | '\t' | '\r' | '\x0c' => {
                    self.bump();
                }
                '#' => self.skip_comment(),
                '\\' => {
                    self.bump();
                    match self.peek() {
                        Some('\n') => {
                            self.bump();
                        }
                        Some('\r') if self.peek_at(1) == Some('\n') => {
                            self.bump();
                            self.bump();
                        }
                        _ => return Err(self.error("unexpected character after line continuation character")),
                    }
                }
                '0'..='9' => self.lex_number(line, column)?,
                '.' if matches!(self.peek_at(1), Some('0'..='9')) => self.lex_number(line, column)?,
                '"' | '\'' => {
                    let s = self.lex_string(false)?;
                    self.push(Token::Str(s), line, column);
                }
                c if c.is_alphabetic() || c == '_' => self.lex_word(line, column)?,
                _ => self.lex_operator(line, column)?,
            }
        }

        if self.depth > 0 {
            return Err(self.error("unexpected EOF: unclosed bracket"));
        }

        let (line, column) = (self.line, self.column);
        if !self.last_is_newline() {
            self.push(Token::Newline, line, column);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(Token::Dedent, line, column);
        }
        self.push(Token::EndOfFile, line, column);
        Ok(self.tokens)
    }

    /// Measure the indentation of a logical line and emit layout tokens.
    /// Returns true if the line was blank or comment-only and was consumed.
    fn handle_indentation(&mut self) -> Result<bool, ParseError> {
        let mut width = 0;
        while let Some(c) = self.peek() {
            match c {
                ' ' => width += 1,
                '\t' => width = (width / 8 + 1) * 8,
                '\x0c' => width = 0,
                _ => break,
            }
            self.bump();
        }

        match self.peek() {
            None => return Ok(true),
            Some('\n') => {
                self.bump();
                return Ok(true);
            }
            Some('\r') if self.peek_at(1) == Some('\n') => {
                self.bump();
                self.bump();
                return Ok(true);
            }
            Some('#') => {
                self.skip_comment();
                if self.peek() == Some('\n') {
                    self.bump();
                }
                return Ok(true);
            }
            _ => {}
        }

        let (line, column) = (self.line, self.column);
        let current = self.indents.last().copied().unwrap_or(0);
        if width > current {
            if self.indents.len() > MAX_INDENT_LEVELS {
                return Err(ParseError::new("too many levels of indentation", line, column));
            }
            self.indents.push(width);
            self.push(Token::Indent, line, column);
        } else if width < current {
            while self.indents.last().copied().unwrap_or(0) > width {
                self.indents.pop();
                self.push(Token::Dedent, line, column);
            }
            if self.indents.last().copied().unwrap_or(0) != width {
                return Err(ParseError::new(
                    "unindent does not match any outer indentation level",
                    line,
                    column,
                ));
            }
        }
        Ok(false)
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn lex_number(&mut self, line: usize, column: usize) -> Result<(), ParseError> {
        let start = self.pos;

        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x' | 'X' | 'o' | 'O' | 'b' | 'B')) {
            self.bump();
            let radix = match self.bump() {
                Some('x' | 'X') => 16,
                Some('o' | 'O') => 8,
                _ => 2,
            };
            let digits_start = self.pos;
            while let Some(c) = self.peek() {
                if c.is_digit(radix) || c == '_' {
                    self.bump();
                } else {
                    break;
                }
            }
            let digits: String = self.chars[digits_start..self.pos]
                .iter()
                .filter(|c| **c != '_')
                .collect();
            if digits.is_empty() {
                return Err(ParseError::new("invalid integer literal", line, column));
            }
            self.push_int(digits, radix, line, column);
            return Ok(());
        }

        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | '_' => {
                    self.bump();
                }
                '.' if !is_float => {
                    is_float = true;
                    self.bump();
                }
                'e' | 'E' => {
                    let sign = matches!(self.peek_at(1), Some('+' | '-'));
                    let digit_at = if sign { 2 } else { 1 };
                    if !matches!(self.peek_at(digit_at), Some('0'..='9')) {
                        break;
                    }
                    is_float = true;
                    self.bump();
                    if sign {
                        self.bump();
                    }
                }
                _ => break,
            }
        }

        if matches!(self.peek(), Some(c) if c.is_alphabetic() || c == '_') {
            return Err(ParseError::new("invalid decimal literal", line, column));
        }

        let text: String = self.chars[start..self.pos]
            .iter()
            .filter(|c| **c != '_')
            .collect();
        if is_float {
            let value = text
                .parse::<f64>()
                .map_err(|_| ParseError::new("invalid float literal", line, column))?;
            self.push(Token::Float(value), line, column);
        } else {
            self.push_int(text, 10, line, column);
        }
        Ok(())
    }

    /// Push an integer literal whose digits are known to be valid.
    fn push_int(&mut self, digits: String, radix: u32, line: usize, column: usize) {
        let token = match i64::from_str_radix(&digits, radix) {
            Ok(value) => Token::Int(value),
            Err(_) => Token::LongInt { digits, radix },
        };
        self.push(token, line, column);
    }

    fn lex_word(&mut self, line: usize, column: usize) -> Result<(), ParseError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let word: String = self.chars[start..self.pos].iter().collect();

        // String prefixes
        if matches!(self.peek(), Some('"' | '\'')) {
            match word.to_ascii_lowercase().as_str() {
                "r" => {
                    let s = self.lex_string(true)?;
                    self.push(Token::Str(s), line, column);
                    return Ok(());
                }
                "u" => {
                    let s = self.lex_string(false)?;
                    self.push(Token::Str(s), line, column);
                    return Ok(());
                }
                "f" | "rf" | "fr" => {
                    return Err(ParseError::new("f-strings are not supported", line, column));
                }
                "b" | "br" | "rb" => {
                    return Err(ParseError::new("bytes literals are not supported", line, column));
                }
                _ => {}
            }
        }

        match keyword(&word) {
            Some(token) => self.push(token, line, column),
            None => self.push(Token::Name(word), line, column),
        }
        Ok(())
    }

    fn lex_string(&mut self, raw: bool) -> Result<String, ParseError> {
        let (line, column) = (self.line, self.column);
        let Some(quote) = self.bump() else {
            return Err(self.error("expected string literal"));
        };
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.bump();
            self.bump();
        }

        let mut value = String::new();
        loop {
            let Some(c) = self.bump() else {
                let message = if triple {
                    "unterminated triple-quoted string literal"
                } else {
                    "unterminated string literal"
                };
                return Err(ParseError::new(message, line, column));
            };

            if c == quote {
                if !triple {
                    break;
                }
                if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                    self.bump();
                    self.bump();
                    break;
                }
                value.push(c);
                continue;
            }

            match c {
                '\n' if !triple => {
                    return Err(ParseError::new("unterminated string literal", line, column));
                }
                '\\' if raw => {
                    value.push('\\');
                    if let Some(next) = self.bump() {
                        value.push(next);
                    }
                }
                '\\' => self.lex_escape(&mut value)?,
                _ => value.push(c),
            }
        }
        Ok(value)
    }

    fn lex_escape(&mut self, value: &mut String) -> Result<(), ParseError> {
        let Some(c) = self.bump() else {
            return Err(self.error("unterminated string literal"));
        };
        match c {
            '\n' => {}
            'n' => value.push('\n'),
            't' => value.push('\t'),
            'r' => value.push('\r'),
            '0' => value.push('\0'),
            '\\' => value.push('\\'),
            '\'' => value.push('\''),
            '"' => value.push('"'),
            'x' | 'u' => {
                let len = if c == 'x' { 2 } else { 4 };
                let mut digits = String::new();
                for _ in 0..len {
                    match self.bump() {
                        Some(d) if d.is_ascii_hexdigit() => digits.push(d),
                        _ => return Err(self.error("truncated escape sequence")),
                    }
                }
                let code = u32::from_str_radix(&digits, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| self.error("invalid escape sequence"))?;
                value.push(code);
            }
            other => {
                value.push('\\');
                value.push(other);
            }
        }
        Ok(())
    }

    fn lex_operator(&mut self, line: usize, column: usize) -> Result<(), ParseError> {
        let Some(c) = self.bump() else {
            return Ok(());
        };
        let next = self.peek();

        let (token, extra) = match (c, next) {
            ('*', Some('*')) => (Token::DoubleStar, 1),
            ('*', Some('=')) => (Token::StarAssign, 1),
            ('/', Some('/')) => {
                if self.peek_at(1) == Some('=') {
                    (Token::DoubleSlashAssign, 2)
                } else {
                    (Token::DoubleSlash, 1)
                }
            }
            ('/', Some('=')) => (Token::SlashAssign, 1),
            ('+', Some('=')) => (Token::PlusAssign, 1),
            ('-', Some('=')) => (Token::MinusAssign, 1),
            ('%', Some('=')) => (Token::PercentAssign, 1),
            ('=', Some('=')) => (Token::EqEq, 1),
            ('!', Some('=')) => (Token::NotEq, 1),
            ('<', Some('=')) => (Token::LtEq, 1),
            ('>', Some('=')) => (Token::GtEq, 1),
            ('+', _) => (Token::Plus, 0),
            ('-', _) => (Token::Minus, 0),
            ('*', _) => (Token::Star, 0),
            ('/', _) => (Token::Slash, 0),
            ('%', _) => (Token::Percent, 0),
            ('=', _) => (Token::Assign, 0),
            ('<', _) => (Token::Lt, 0),
            ('>', _) => (Token::Gt, 0),
            ('(', _) => (Token::LParen, 0),
            (')', _) => (Token::RParen, 0),
            ('[', _) => (Token::LBracket, 0),
            (']', _) => (Token::RBracket, 0),
            ('{', _) => (Token::LBrace, 0),
            ('}', _) => (Token::RBrace, 0),
            (',', _) => (Token::Comma, 0),
            (':', _) => (Token::Colon, 0),
            ('.', _) => (Token::Dot, 0),
            (';', _) => (Token::Semicolon, 0),
            ('@', _) => (Token::At, 0),
            ('<', Some('<')) | ('>', Some('>')) => {
                return Err(ParseError::new(
                    format!("bitwise operator '{}{}' is not supported", c, c),
                    line,
                    column,
                ));
            }
            ('&' | '|' | '^' | '~', _) => {
                return Err(ParseError::new(
                    format!("bitwise operator '{}' is not supported", c),
                    line,
                    column,
                ));
            }
            (other, _) => {
                return Err(ParseError::new(
                    format!("invalid character '{}'", other),
                    line,
                    column,
                ));
            }
        };

        for _ in 0..extra {
            self.bump();
        }

        match token {
            Token::LParen | Token::LBracket | Token::LBrace => self.depth += 1,
            Token::RParen | Token::RBracket | Token::RBrace => {
                if self.depth == 0 {
                    return Err(ParseError::new(
                        format!("unmatched '{}'", c),
                        line,
                        column,
                    ));
                }
                self.depth -= 1;
            }
            _ => {}
        }

        self.push(token, line, column);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .expect("tokenize failed")
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn simple_assignment() {
        assert_eq!(
            kinds("x = 1\n"),
            vec![
                Token::Name("x".into()),
                Token::Assign,
                Token::Int(1),
                Token::Newline,
                Token::EndOfFile,
            ]
        );
    }

    #[test]
    fn leading_blank_lines_produce_nothing() {
        assert_eq!(kinds("\n\n   \n# comment\n"), vec![Token::EndOfFile]);
    }

    #[test]
    fn indentation_layout() {
        let tokens = kinds("if x:\n    y = 1\nz = 2\n");
        assert!(tokens.contains(&Token::Indent));
        let indent = tokens.iter().position(|t| *t == Token::Indent).unwrap();
        let dedent = tokens.iter().position(|t| *t == Token::Dedent).unwrap();
        assert!(indent < dedent);
        assert_eq!(tokens.last(), Some(&Token::EndOfFile));
    }

    #[test]
    fn dedent_emitted_at_eof() {
        let tokens = kinds("def f():\n    return 1");
        let dedents = tokens.iter().filter(|t| **t == Token::Dedent).count();
        assert_eq!(dedents, 1);
    }

    #[test]
    fn brackets_join_lines() {
        let tokens = kinds("x = [1,\n     2]\n");
        let newlines = tokens.iter().filter(|t| **t == Token::Newline).count();
        assert_eq!(newlines, 1);
    }

    #[test]
    fn string_escapes_and_triple_quotes() {
        assert_eq!(kinds("'a\\nb'")[0], Token::Str("a\nb".into()));
        assert_eq!(kinds("r'a\\nb'")[0], Token::Str("a\\nb".into()));
        assert_eq!(kinds("\"\"\"one\ntwo\"\"\"")[0], Token::Str("one\ntwo".into()));
    }

    #[test]
    fn numbers() {
        assert_eq!(kinds("1_000")[0], Token::Int(1000));
        assert_eq!(kinds("0xff")[0], Token::Int(255));
        assert_eq!(kinds("2.5")[0], Token::Float(2.5));
        assert_eq!(kinds("1e3")[0], Token::Float(1000.0));
    }

    #[test]
    fn integers_beyond_i64_keep_their_digits() {
        assert_eq!(kinds("9223372036854775807")[0], Token::Int(i64::MAX));
        assert_eq!(
            kinds("9_223_372_036_854_775_808")[0],
            Token::LongInt {
                digits: "9223372036854775808".into(),
                radix: 10
            }
        );
        assert_eq!(
            kinds("0x1_0000_0000_0000_0000")[0],
            Token::LongInt {
                digits: "10000000000000000".into(),
                radix: 16
            }
        );
        assert!(tokenize("0x").is_err());
    }

    #[test]
    fn bitwise_operators_are_rejected() {
        let err = tokenize("print(1 << 70)").unwrap_err();
        assert_eq!(err.message, "bitwise operator '<<' is not supported");
        assert_eq!((err.line, err.column), (1, 9));
        for source in ["a >> 1", "a & b", "a | b", "a ^ b", "~a"] {
            let err = tokenize(source).unwrap_err();
            assert!(err.message.starts_with("bitwise operator"), "{}", source);
        }
    }

    #[test]
    fn deep_indentation_is_an_error() {
        let mut source = String::new();
        for level in 0..120 {
            source.push_str(&" ".repeat(level));
            source.push_str("if x:\n");
        }
        source.push_str(&" ".repeat(120));
        source.push_str("pass\n");
        let err = tokenize(&source).unwrap_err();
        assert_eq!(err.message, "too many levels of indentation");
        assert_eq!(err.line, 102);
    }

    #[test]
    fn compound_operators() {
        assert_eq!(
            kinds("a //= 2 ** 3"),
            vec![
                Token::Name("a".into()),
                Token::DoubleSlashAssign,
                Token::Int(2),
                Token::DoubleStar,
                Token::Int(3),
                Token::Newline,
                Token::EndOfFile,
            ]
        );
    }

    #[test]
    fn inconsistent_dedent_is_an_error() {
        let err = tokenize("if x:\n        y = 1\n    z = 2\n").unwrap_err();
        assert!(err.message.contains("unindent"));
        assert_eq!(err.line, 3);
    }

    #[test]
    fn unterminated_string_reports_position() {
        let err = tokenize("x = 'abc\n").unwrap_err();
        assert_eq!((err.line, err.column), (1, 5));
    }

    #[test]
    fn f_strings_are_rejected() {
        let err = tokenize("f'{x}'").unwrap_err();
        assert!(err.message.contains("f-strings"));
    }
}
