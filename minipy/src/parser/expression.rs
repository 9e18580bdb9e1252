use std::rc::Rc;

use crate::ast::{
    BinaryOperator, BoolOperator, CompareOperator, Expr, FunctionDef, Stmt, StmtKind,
    UnaryOperator,
};
use crate::parser::error::ParseError;
use crate::parser::lexer::Token;
use crate::parser::Cursor;

// ---------------------------------------------------------------------------
// Binding powers, loosest first
// ---------------------------------------------------------------------------

const BP_CONDITIONAL: u8 = 2;
const BP_OR: u8 = 4;
const BP_AND: u8 = 6;
const BP_NOT: u8 = 8;
pub(crate) const BP_COMPARISON: u8 = 10;
const BP_UNARY: u8 = 40;

/// Deepest expression nesting the parser accepts. Operator chains count one
/// level per operator, so this also bounds the depth of the resulting tree.
const MAX_NESTING: usize = 200;

fn infix_bp(token: &Token) -> Option<(u8, u8)> {
    let bp = match token {
        Token::Or => (BP_OR, BP_OR + 1),
        Token::And => (BP_AND, BP_AND + 1),
        Token::Plus | Token::Minus => (20, 21),
        Token::Star | Token::Slash | Token::DoubleSlash | Token::Percent => (30, 31),
        // Right-associative and tighter than a unary operator on its left.
        Token::DoubleStar => (51, 50),
        _ => return None,
    };
    Some(bp)
}

fn binary_operator(token: &Token) -> Option<BinaryOperator> {
    let operator = match token {
        Token::Plus => BinaryOperator::Addition,
        Token::Minus => BinaryOperator::Subtraction,
        Token::Star => BinaryOperator::Multiplication,
        Token::Slash => BinaryOperator::Division,
        Token::DoubleSlash => BinaryOperator::FloorDivision,
        Token::Percent => BinaryOperator::Modulo,
        Token::DoubleStar => BinaryOperator::Power,
        _ => return None,
    };
    Some(operator)
}

impl Cursor {
    /// Comma-separated expressions; more than one (or a trailing comma)
    /// builds a tuple.
    pub(crate) fn parse_expr_list(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_expr(0)?;
        if !self.at(&Token::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&Token::Comma) {
            if !self.starts_expression() {
                break;
            }
            items.push(self.parse_expr(0)?);
        }
        Ok(Expr::Tuple(items))
    }

    fn starts_expression(&self) -> bool {
        matches!(
            self.peek(),
            Token::Int(_)
                | Token::LongInt { .. }
                | Token::Float(_)
                | Token::Str(_)
                | Token::Name(_)
                | Token::None
                | Token::True
                | Token::False
                | Token::LParen
                | Token::LBracket
                | Token::LBrace
                | Token::Minus
                | Token::Plus
                | Token::Not
                | Token::Lambda
        )
    }

    // ------------------------------------------------------------------
    // Pratt parser core
    // ------------------------------------------------------------------

    pub(crate) fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let entry = self.nesting;
        let result = self.parse_nested_expr(min_bp);
        self.nesting = entry;
        result
    }

    /// Count one more level of expression nesting.
    fn nest(&mut self) -> Result<(), ParseError> {
        self.nesting += 1;
        if self.nesting <= MAX_NESTING {
            return Ok(());
        }
        let message = match self.peek() {
            Token::LParen | Token::LBracket | Token::LBrace => "too many nested parentheses",
            _ => "expression is too deeply nested",
        };
        Err(self.error_here(message))
    }

    fn parse_nested_expr(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        self.nest()?;
        let mut left = self.parse_prefix()?;

        loop {
            // Postfix: calls, subscripts and attribute access bind tightest.
            match self.peek() {
                Token::LParen => {
                    self.nest()?;
                    left = self.parse_call(left)?;
                    continue;
                }
                Token::LBracket => {
                    self.nest()?;
                    left = self.parse_subscript(left)?;
                    continue;
                }
                Token::Dot => {
                    self.nest()?;
                    self.advance();
                    let attr = self.expect_name("an attribute name after '.'")?;
                    left = Expr::Attribute {
                        value: Box::new(left),
                        attr,
                    };
                    continue;
                }
                _ => {}
            }

            // Conditional expression: body if test else orelse
            if self.at(&Token::If) {
                if BP_CONDITIONAL < min_bp {
                    break;
                }
                self.nest()?;
                self.advance();
                let test = self.parse_expr(BP_OR)?;
                self.expect(&Token::Else, "'else' in conditional expression")?;
                let orelse = self.parse_expr(BP_CONDITIONAL)?;
                left = Expr::Conditional {
                    test: Box::new(test),
                    body: Box::new(left),
                    orelse: Box::new(orelse),
                };
                continue;
            }

            // Comparison chains: a < b <= c
            if self.peek_comparison().is_some() {
                if BP_COMPARISON < min_bp {
                    break;
                }
                self.nest()?;
                let mut comparisons = Vec::new();
                while let Some((operator, width)) = self.peek_comparison() {
                    for _ in 0..width {
                        self.advance();
                    }
                    let right = self.parse_expr(BP_COMPARISON + 1)?;
                    comparisons.push((operator, right));
                }
                left = Expr::Compare {
                    left: Box::new(left),
                    comparisons,
                };
                continue;
            }

            let Some((l_bp, r_bp)) = infix_bp(self.peek()) else {
                break;
            };
            if l_bp < min_bp {
                break;
            }

            self.nest()?;
            let op = self.advance();
            let right = self.parse_expr(r_bp)?;

            left = match op.token {
                Token::And => Expr::BoolOp {
                    operator: BoolOperator::And,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                Token::Or => Expr::BoolOp {
                    operator: BoolOperator::Or,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                ref token => match binary_operator(token) {
                    Some(operator) => Expr::Binary {
                        operator,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    None => {
                        return Err(ParseError::new(
                            "unexpected infix operator",
                            op.line,
                            op.column,
                        ));
                    }
                },
            };
        }

        Ok(left)
    }

    /// The comparison operator at the cursor and how many tokens it spans.
    fn peek_comparison(&self) -> Option<(CompareOperator, usize)> {
        let found = match self.peek() {
            Token::EqEq => (CompareOperator::Equal, 1),
            Token::NotEq => (CompareOperator::NotEqual, 1),
            Token::Lt => (CompareOperator::Less, 1),
            Token::LtEq => (CompareOperator::LessOrEqual, 1),
            Token::Gt => (CompareOperator::Greater, 1),
            Token::GtEq => (CompareOperator::GreaterOrEqual, 1),
            Token::In => (CompareOperator::In, 1),
            Token::Not if self.peek_at(1) == &Token::In => (CompareOperator::NotIn, 2),
            Token::Is if self.peek_at(1) == &Token::Not => (CompareOperator::IsNot, 2),
            Token::Is => (CompareOperator::Is, 1),
            _ => return None,
        };
        Some(found)
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance();

        match token.token {
            // Literals
            Token::Int(n) => Ok(Expr::Int(n)),
            Token::LongInt { digits, radix } => Ok(Expr::LongInt { digits, radix }),
            Token::Float(n) => Ok(Expr::Float(n)),
            Token::Str(mut s) => {
                // Adjacent string literals concatenate.
                while let Token::Str(next) = self.peek() {
                    s.push_str(next);
                    self.advance();
                }
                Ok(Expr::Str(s))
            }
            Token::None => Ok(Expr::None),
            Token::True => Ok(Expr::Bool(true)),
            Token::False => Ok(Expr::Bool(false)),
            Token::Name(name) => Ok(Expr::Name(name)),

            // Unary operators
            Token::Minus => Ok(Expr::Unary {
                operator: UnaryOperator::Negation,
                operand: Box::new(self.parse_expr(BP_UNARY)?),
            }),
            Token::Plus => Ok(Expr::Unary {
                operator: UnaryOperator::Identity,
                operand: Box::new(self.parse_expr(BP_UNARY)?),
            }),
            Token::Not => Ok(Expr::Unary {
                operator: UnaryOperator::Not,
                operand: Box::new(self.parse_expr(BP_NOT)?),
            }),

            // Parenthesized expression or tuple
            Token::LParen => {
                if self.eat(&Token::RParen) {
                    return Ok(Expr::Tuple(Vec::new()));
                }
                let first = self.parse_expr(0)?;
                self.reject_comprehension("generator expressions")?;
                if self.eat(&Token::RParen) {
                    return Ok(first);
                }
                let mut items = vec![first];
                while self.eat(&Token::Comma) {
                    if self.at(&Token::RParen) {
                        break;
                    }
                    items.push(self.parse_expr(0)?);
                }
                self.expect(&Token::RParen, "')'")?;
                Ok(Expr::Tuple(items))
            }

            Token::LBracket => {
                let mut items = Vec::new();
                while !self.at(&Token::RBracket) {
                    items.push(self.parse_expr(0)?);
                    self.reject_comprehension("list comprehensions")?;
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(&Token::RBracket, "']'")?;
                Ok(Expr::List(items))
            }

            Token::LBrace => {
                let mut entries = Vec::new();
                while !self.at(&Token::RBrace) {
                    let key = self.parse_expr(0)?;
                    if matches!(self.peek(), Token::Comma | Token::RBrace) {
                        return Err(self.error_here("set literals are not supported"));
                    }
                    self.expect(&Token::Colon, "':' in dict literal")?;
                    let value = self.parse_expr(0)?;
                    self.reject_comprehension("dict comprehensions")?;
                    entries.push((key, value));
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(&Token::RBrace, "'}'")?;
                Ok(Expr::Dict(entries))
            }

            Token::Lambda => {
                let params = self.parse_params(&Token::Colon)?;
                self.expect(&Token::Colon, "':' after lambda parameters")?;
                let body = self.parse_expr(0)?;
                Ok(Expr::Lambda(Rc::new(FunctionDef {
                    name: "<lambda>".to_string(),
                    params,
                    body: vec![Stmt {
                        kind: StmtKind::Return(Some(body)),
                        line: token.line,
                    }],
                    line: token.line,
                })))
            }

            Token::Star | Token::DoubleStar => Err(ParseError::new(
                "starred expressions are not supported",
                token.line,
                token.column,
            )),

            Token::Newline | Token::EndOfFile => Err(ParseError::new(
                "invalid syntax: unexpected end of line",
                token.line,
                token.column,
            )),

            other => Err(ParseError::new(
                format!("invalid syntax: unexpected {}", describe_token(&other)),
                token.line,
                token.column,
            )),
        }
    }

    fn reject_comprehension(&self, what: &str) -> Result<(), ParseError> {
        if self.at(&Token::For) {
            Err(self.error_here(format!("{} are not supported", what)))
        } else {
            Ok(())
        }
    }

    fn parse_call(&mut self, func: Expr) -> Result<Expr, ParseError> {
        self.expect(&Token::LParen, "'('")?;
        let mut args = Vec::new();
        let mut keywords: Vec<(String, Expr)> = Vec::new();

        while !self.at(&Token::RParen) {
            if matches!(self.peek(), Token::Star | Token::DoubleStar) {
                return Err(self.error_here("argument unpacking is not supported"));
            }
            let is_keyword = matches!(self.peek(), Token::Name(_)) && self.peek_at(1) == &Token::Assign;
            if is_keyword {
                let (line, column) = self.position();
                let name = self.expect_name("a keyword argument name")?;
                self.advance();
                if keywords.iter().any(|(k, _)| *k == name) {
                    return Err(ParseError::new(
                        format!("keyword argument repeated: {}", name),
                        line,
                        column,
                    ));
                }
                keywords.push((name, self.parse_expr(0)?));
            } else {
                if !keywords.is_empty() {
                    return Err(self.error_here("positional argument follows keyword argument"));
                }
                args.push(self.parse_expr(0)?);
                self.reject_comprehension("generator expressions")?;
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen, "')'")?;

        Ok(Expr::Call {
            func: Box::new(func),
            args,
            keywords,
        })
    }

    fn parse_subscript(&mut self, value: Expr) -> Result<Expr, ParseError> {
        self.expect(&Token::LBracket, "'['")?;

        let lower = if self.at(&Token::Colon) {
            None
        } else {
            Some(self.parse_expr(0)?)
        };

        let index = if self.eat(&Token::Colon) {
            let upper = if matches!(self.peek(), Token::Colon | Token::RBracket) {
                None
            } else {
                Some(Box::new(self.parse_expr(0)?))
            };
            let step = if self.eat(&Token::Colon) && !self.at(&Token::RBracket) {
                Some(Box::new(self.parse_expr(0)?))
            } else {
                None
            };
            Expr::Slice {
                lower: lower.map(Box::new),
                upper,
                step,
            }
        } else {
            match lower {
                Some(first) if self.at(&Token::Comma) => {
                    let mut items = vec![first];
                    while self.eat(&Token::Comma) {
                        if self.at(&Token::RBracket) {
                            break;
                        }
                        items.push(self.parse_expr(0)?);
                    }
                    Expr::Tuple(items)
                }
                Some(index) => index,
                None => return Err(self.error_here("invalid syntax: empty subscript")),
            }
        };

        self.expect(&Token::RBracket, "']'")?;
        Ok(Expr::Subscript {
            value: Box::new(value),
            index: Box::new(index),
        })
    }
}

fn describe_token(token: &Token) -> String {
    match token {
        Token::Name(name) => format!("name '{}'", name),
        Token::Indent => "indent".to_string(),
        Token::Dedent => "unindent".to_string(),
        Token::RParen => "')'".to_string(),
        Token::RBracket => "']'".to_string(),
        Token::RBrace => "'}'".to_string(),
        Token::Colon => "':'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Assign => "'='".to_string(),
        Token::Slash => "'/'".to_string(),
        Token::DoubleSlash => "'//'".to_string(),
        Token::Percent => "'%'".to_string(),
        Token::EqEq => "'=='".to_string(),
        Token::NotEq => "'!='".to_string(),
        Token::Lt => "'<'".to_string(),
        Token::Gt => "'>'".to_string(),
        Token::LtEq => "'<='".to_string(),
        Token::GtEq => "'>='".to_string(),
        Token::Dot => "'.'".to_string(),
        Token::Semicolon => "';'".to_string(),
        Token::At => "'@'".to_string(),
        other => format!("{:?}", other).to_lowercase(),
    }
}
