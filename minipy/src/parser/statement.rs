use std::rc::Rc;

use crate::ast::{BinaryOperator, Expr, FunctionDef, Module, Param, Stmt, StmtKind, Target};
use crate::parser::error::ParseError;
use crate::parser::lexer::Token;
use crate::parser::Cursor;

/// Statement keywords of the full language that this subset rejects.
const UNSUPPORTED_STATEMENTS: &[(&str, &str)] = &[
    ("class", "class definitions"),
    ("import", "import statements"),
    ("from", "import statements"),
    ("try", "try statements"),
    ("except", "try statements"),
    ("finally", "try statements"),
    ("with", "with statements"),
    ("yield", "generators"),
    ("async", "async code"),
    ("await", "async code"),
    ("nonlocal", "nonlocal declarations"),
    ("match", "match statements"),
];

impl Cursor {
    pub(crate) fn parse_module(&mut self) -> Result<Module, ParseError> {
        let mut body = Vec::new();
        while !self.at(&Token::EndOfFile) {
            if self.eat(&Token::Newline) {
                continue;
            }
            if self.at(&Token::Indent) {
                return Err(self.error_here("unexpected indent"));
            }
            if self.at(&Token::Dedent) {
                return Err(self.error_here("unexpected unindent"));
            }
            body.extend(self.parse_statement()?);
        }
        Ok(Module { body })
    }

    fn parse_statement(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let (line, _) = self.position();
        match self.peek() {
            Token::If => {
                self.advance();
                Ok(vec![self.parse_if(line)?])
            }
            Token::While => Ok(vec![self.parse_while()?]),
            Token::For => Ok(vec![self.parse_for()?]),
            Token::Def => Ok(vec![self.parse_def()?]),
            Token::At => Err(self.error_here("decorators are not supported")),
            Token::Name(name) if self.peek_at(1) != &Token::Assign => {
                match UNSUPPORTED_STATEMENTS.iter().find(|(kw, _)| kw == name) {
                    Some((_, what)) => Err(self.error_here(format!("{} are not supported", what))),
                    None => self.parse_simple_line(),
                }
            }
            _ => self.parse_simple_line(),
        }
    }

    /// `small_stmt (';' small_stmt)* NEWLINE`
    fn parse_simple_line(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = vec![self.parse_small_statement()?];
        while self.eat(&Token::Semicolon) {
            if self.at(&Token::Newline) {
                break;
            }
            stmts.push(self.parse_small_statement()?);
        }
        self.expect(&Token::Newline, "end of statement")?;
        Ok(stmts)
    }

    fn parse_small_statement(&mut self) -> Result<Stmt, ParseError> {
        let (line, _) = self.position();
        let kind = match self.peek() {
            Token::Pass => {
                self.advance();
                StmtKind::Pass
            }
            Token::Break => {
                if self.loop_depth == 0 {
                    return Err(self.error_here("'break' outside loop"));
                }
                self.advance();
                StmtKind::Break
            }
            Token::Continue => {
                if self.loop_depth == 0 {
                    return Err(self.error_here("'continue' not properly in loop"));
                }
                self.advance();
                StmtKind::Continue
            }
            Token::Return => {
                if self.function_depth == 0 {
                    return Err(self.error_here("'return' outside function"));
                }
                self.advance();
                if self.at_statement_end() {
                    StmtKind::Return(None)
                } else {
                    StmtKind::Return(Some(self.parse_expr_list()?))
                }
            }
            Token::Global => {
                self.advance();
                let mut names = vec![self.expect_name("a name after 'global'")?];
                while self.eat(&Token::Comma) {
                    names.push(self.expect_name("a name after ','")?);
                }
                StmtKind::Global(names)
            }
            Token::Del => {
                self.advance();
                let (line, column) = self.position();
                let expr = self.parse_expr_list()?;
                let targets = match expr {
                    Expr::Tuple(items) => items
                        .into_iter()
                        .map(|item| to_target(item, line, column))
                        .collect::<Result<Vec<_>, _>>()?,
                    other => vec![to_target(other, line, column)?],
                };
                StmtKind::Delete(targets)
            }
            Token::Assert => {
                self.advance();
                let test = self.parse_expr(0)?;
                let message = if self.eat(&Token::Comma) {
                    Some(self.parse_expr(0)?)
                } else {
                    None
                };
                StmtKind::Assert { test, message }
            }
            Token::Raise => {
                self.advance();
                if self.at_statement_end() {
                    StmtKind::Raise(None)
                } else {
                    StmtKind::Raise(Some(self.parse_expr(0)?))
                }
            }
            _ => self.parse_expression_statement()?,
        };
        Ok(Stmt { kind, line })
    }

    fn parse_expression_statement(&mut self) -> Result<StmtKind, ParseError> {
        let (line, column) = self.position();
        let first = self.parse_expr_list()?;

        if self.at(&Token::Assign) {
            let mut targets = vec![to_target(first, line, column)?];
            loop {
                self.advance();
                let (line, column) = self.position();
                let next = self.parse_expr_list()?;
                if self.at(&Token::Assign) {
                    targets.push(to_target(next, line, column)?);
                } else {
                    return Ok(StmtKind::Assign { targets, value: next });
                }
            }
        }

        if let Some(operator) = augmented_operator(self.peek()) {
            self.advance();
            let target = match to_target(first, line, column)? {
                Target::Tuple(_) => {
                    return Err(ParseError::new(
                        "illegal expression for augmented assignment",
                        line,
                        column,
                    ));
                }
                target => target,
            };
            let value = self.parse_expr_list()?;
            return Ok(StmtKind::AugAssign {
                target,
                operator,
                value,
            });
        }

        Ok(StmtKind::Expr(first))
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.peek(),
            Token::Newline | Token::Semicolon | Token::EndOfFile
        )
    }

    // ------------------------------------------------------------------
    // Compound statements
    // ------------------------------------------------------------------

    /// Parse an indented block (or a same-line simple statement) after ':'.
    fn parse_suite(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&Token::Colon, "':'")?;
        if !self.eat(&Token::Newline) {
            return self.parse_simple_line();
        }
        if !self.eat(&Token::Indent) {
            return Err(self.error_here("expected an indented block"));
        }
        let mut body = Vec::new();
        while !self.eat(&Token::Dedent) {
            if self.at(&Token::EndOfFile) {
                break;
            }
            if self.eat(&Token::Newline) {
                continue;
            }
            body.extend(self.parse_statement()?);
        }
        Ok(body)
    }

    /// Called with the `if` or `elif` keyword already consumed.
    fn parse_if(&mut self, line: usize) -> Result<Stmt, ParseError> {
        let test = self.parse_expr(0)?;
        let body = self.parse_suite()?;
        let orelse = match self.peek() {
            Token::Elif => {
                let (elif_line, _) = self.position();
                self.advance();
                vec![self.parse_if(elif_line)?]
            }
            Token::Else => {
                self.advance();
                self.parse_suite()?
            }
            _ => Vec::new(),
        };
        Ok(Stmt {
            kind: StmtKind::If { test, body, orelse },
            line,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        let (line, _) = self.position();
        self.advance();
        let test = self.parse_expr(0)?;
        let body = self.parse_loop_body()?;
        let orelse = self.parse_optional_else()?;
        Ok(Stmt {
            kind: StmtKind::While { test, body, orelse },
            line,
        })
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let (line, _) = self.position();
        self.advance();

        let (target_line, target_column) = self.position();
        let mut items = vec![self.parse_expr(super::expression::BP_COMPARISON + 1)?];
        let mut is_tuple = false;
        while self.eat(&Token::Comma) {
            is_tuple = true;
            if self.at(&Token::In) {
                break;
            }
            items.push(self.parse_expr(super::expression::BP_COMPARISON + 1)?);
        }
        let target_expr = if is_tuple {
            Expr::Tuple(items)
        } else {
            items.remove(0)
        };
        let target = to_target(target_expr, target_line, target_column)?;

        self.expect(&Token::In, "'in'")?;
        let iter = self.parse_expr_list()?;
        let body = self.parse_loop_body()?;
        let orelse = self.parse_optional_else()?;
        Ok(Stmt {
            kind: StmtKind::For {
                target,
                iter,
                body,
                orelse,
            },
            line,
        })
    }

    fn parse_loop_body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.loop_depth += 1;
        let body = self.parse_suite();
        self.loop_depth -= 1;
        body
    }

    fn parse_optional_else(&mut self) -> Result<Vec<Stmt>, ParseError> {
        if self.eat(&Token::Else) {
            self.parse_suite()
        } else {
            Ok(Vec::new())
        }
    }

    fn parse_def(&mut self) -> Result<Stmt, ParseError> {
        let (line, _) = self.position();
        self.advance();
        let name = self.expect_name("a function name after 'def'")?;
        self.expect(&Token::LParen, "'(' after the function name")?;
        let params = self.parse_params(&Token::RParen)?;
        self.expect(&Token::RParen, "')'")?;
        if self.at(&Token::Minus) && self.peek_at(1) == &Token::Gt {
            return Err(self.error_here("return annotations are not supported"));
        }
        let saved_loops = std::mem::replace(&mut self.loop_depth, 0);
        self.function_depth += 1;
        let body = self.parse_suite();
        self.function_depth -= 1;
        self.loop_depth = saved_loops;
        let body = body?;
        Ok(Stmt {
            kind: StmtKind::FunctionDef(Rc::new(FunctionDef {
                name,
                params,
                body,
                line,
            })),
            line,
        })
    }

    /// Parameter list shared by `def` and `lambda`, stopping at `close`.
    pub(crate) fn parse_params(&mut self, close: &Token) -> Result<Vec<Param>, ParseError> {
        let mut params: Vec<Param> = Vec::new();
        while !self.at(close) {
            if matches!(self.peek(), Token::Star | Token::DoubleStar) {
                return Err(self.error_here("variadic parameters are not supported"));
            }
            let (line, column) = self.position();
            let name = self.expect_name("a parameter name")?;
            if params.iter().any(|p| p.name == name) {
                return Err(ParseError::new(
                    format!("duplicate argument '{}' in function definition", name),
                    line,
                    column,
                ));
            }
            if self.at(&Token::Colon) && close == &Token::RParen {
                return Err(self.error_here("parameter annotations are not supported"));
            }
            let default = if self.eat(&Token::Assign) {
                Some(self.parse_expr(0)?)
            } else {
                if params.iter().any(|p| p.default.is_some()) {
                    return Err(ParseError::new(
                        "non-default argument follows default argument",
                        line,
                        column,
                    ));
                }
                None
            };
            params.push(Param { name, default });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(params)
    }
}

fn augmented_operator(token: &Token) -> Option<BinaryOperator> {
    let operator = match token {
        Token::PlusAssign => BinaryOperator::Addition,
        Token::MinusAssign => BinaryOperator::Subtraction,
        Token::StarAssign => BinaryOperator::Multiplication,
        Token::SlashAssign => BinaryOperator::Division,
        Token::DoubleSlashAssign => BinaryOperator::FloorDivision,
        Token::PercentAssign => BinaryOperator::Modulo,
        _ => return None,
    };
    Some(operator)
}

/// Reinterpret a parsed expression as an assignment target.
fn to_target(expr: Expr, line: usize, column: usize) -> Result<Target, ParseError> {
    match expr {
        Expr::Name(name) => Ok(Target::Name(name)),
        Expr::Subscript { value, index } => Ok(Target::Subscript {
            value: *value,
            index: *index,
        }),
        Expr::Tuple(items) | Expr::List(items) => Ok(Target::Tuple(
            items
                .into_iter()
                .map(|item| to_target(item, line, column))
                .collect::<Result<Vec<_>, _>>()?,
        )),
        Expr::Attribute { .. } => Err(ParseError::new(
            "attribute assignment is not supported",
            line,
            column,
        )),
        other => Err(ParseError::new(
            format!("cannot assign to {}", describe(&other)),
            line,
            column,
        )),
    }
}

fn describe(expr: &Expr) -> &'static str {
    match expr {
        Expr::None
        | Expr::Bool(_)
        | Expr::Int(_)
        | Expr::LongInt { .. }
        | Expr::Float(_)
        | Expr::Str(_) => "literal",
        Expr::Call { .. } => "function call",
        Expr::Lambda(_) => "lambda",
        Expr::Conditional { .. } => "conditional expression",
        Expr::Compare { .. } => "comparison",
        Expr::Dict(_) => "dict literal",
        _ => "expression",
    }
}
