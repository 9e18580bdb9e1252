pub mod operator;

use std::rc::Rc;

pub use operator::{BinaryOperator, BoolOperator, CompareOperator, UnaryOperator};

/// A parsed compilation unit: the top-level statements of one code block.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub body: Vec<Stmt>,
}

impl Module {
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// A statement together with the 1-based source line it starts on.
#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    /// Expression evaluated for its side effects.
    Expr(Expr),
    /// `a = b = value`: every target receives the same value.
    Assign { targets: Vec<Target>, value: Expr },
    /// `target op= value`
    AugAssign {
        target: Target,
        operator: BinaryOperator,
        value: Expr,
    },
    Pass,
    Break,
    Continue,
    Return(Option<Expr>),
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    For {
        target: Target,
        iter: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    FunctionDef(Rc<FunctionDef>),
    Global(Vec<String>),
    Delete(Vec<Target>),
    Assert { test: Expr, message: Option<Expr> },
    Raise(Option<Expr>),
}

/// Anything that can appear on the left of `=`, after `for`, or after `del`.
#[derive(Debug, Clone)]
pub enum Target {
    Name(String),
    Subscript { value: Expr, index: Expr },
    Tuple(Vec<Target>),
}

/// A `def` or `lambda`. Lambdas are stored with a single `return` body.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
}

/// An expression AST node.
#[derive(Debug, Clone)]
pub enum Expr {
    // Literals
    None,
    Bool(bool),
    Int(i64),
    /// An integer literal too large for `i64`, kept as digits in `radix`.
    LongInt {
        digits: String,
        radix: u32,
    },
    Float(f64),
    Str(String),

    Name(String),

    // Displays
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),

    // Operations
    Unary {
        operator: UnaryOperator,
        operand: Box<Expr>,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    BoolOp {
        operator: BoolOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `a < b <= c` keeps every link so each operand is evaluated once.
    Compare {
        left: Box<Expr>,
        comparisons: Vec<(CompareOperator, Expr)>,
    },
    /// `body if test else orelse`
    Conditional {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },

    // Access
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        keywords: Vec<(String, Expr)>,
    },
    Attribute {
        value: Box<Expr>,
        attr: String,
    },
    Subscript {
        value: Box<Expr>,
        index: Box<Expr>,
    },
    /// Only valid as the index of a subscript.
    Slice {
        lower: Option<Box<Expr>>,
        upper: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },

    Lambda(Rc<FunctionDef>),
}
