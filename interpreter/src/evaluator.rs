use std::rc::Rc;

use dashu_int::IBig;
use minipy::ast::{BoolOperator, Expr, UnaryOperator};

use crate::error::{ErrorKind, RuntimeError};
use crate::evaluator_helpers::{binary_op, compare, get_item, slice, slice_bound};
use crate::executor::Interpreter;
use crate::methods;
use crate::runtime_value::{CallArgs, Dict, ExceptionValue, RuntimeValue};

/// Deepest combined nesting of sub-expressions and the calls they make.
pub const MAX_DEPTH: usize = 8000;

impl Interpreter<'_> {
    /// Evaluate an expression AST node to produce a RuntimeValue.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<RuntimeValue, RuntimeError> {
        if self.depth >= MAX_DEPTH {
            return Err(RuntimeError::new(
                ErrorKind::RecursionError,
                "maximum recursion depth exceeded",
            ));
        }
        self.depth += 1;
        let result = self.evaluate_expr(expr);
        self.depth -= 1;
        result
    }

    fn evaluate_expr(&mut self, expr: &Expr) -> Result<RuntimeValue, RuntimeError> {
        match expr {
            // --- Literals ---
            Expr::None => Ok(RuntimeValue::None),
            Expr::Bool(b) => Ok(RuntimeValue::Bool(*b)),
            Expr::Int(n) => Ok(RuntimeValue::Int(*n)),
            Expr::LongInt { digits, radix } => IBig::from_str_radix(digits, *radix)
                .map(RuntimeValue::from_ibig)
                .map_err(|_| RuntimeError::value_error(format!("invalid integer literal {}", digits))),
            Expr::Float(n) => Ok(RuntimeValue::Float(*n)),
            Expr::Str(s) => Ok(RuntimeValue::Str(s.clone())),

            // --- References ---
            Expr::Name(name) => self.load_name(name),

            // --- Displays ---
            Expr::List(items) => Ok(RuntimeValue::list(self.evaluate_all(items)?)),
            Expr::Tuple(items) => Ok(RuntimeValue::tuple(self.evaluate_all(items)?)),
            Expr::Dict(entries) => {
                let mut dict = Dict::new();
                for (key, value) in entries {
                    let key = self.evaluate(key)?;
                    let value = self.evaluate(value)?;
                    dict.insert(key, value)?;
                }
                Ok(RuntimeValue::dict(dict))
            }

            // --- Operations ---
            Expr::Unary { operator, operand } => {
                let operand = self.evaluate(operand)?;
                unary_op(*operator, &operand)
            }
            Expr::Binary {
                operator,
                left,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary_op(*operator, &left, &right)
            }
            Expr::BoolOp {
                operator,
                left,
                right,
            } => {
                // Short-circuit: the deciding operand is the result.
                let left = self.evaluate(left)?;
                match (operator, left.is_truthy()) {
                    (BoolOperator::And, false) | (BoolOperator::Or, true) => Ok(left),
                    _ => self.evaluate(right),
                }
            }
            Expr::Compare { left, comparisons } => {
                let mut current = self.evaluate(left)?;
                for (operator, operand) in comparisons {
                    let right = self.evaluate(operand)?;
                    if !compare(*operator, &current, &right)? {
                        return Ok(RuntimeValue::Bool(false));
                    }
                    current = right;
                }
                Ok(RuntimeValue::Bool(true))
            }
            Expr::Conditional { test, body, orelse } => {
                if self.evaluate(test)?.is_truthy() {
                    self.evaluate(body)
                } else {
                    self.evaluate(orelse)
                }
            }

            // --- Access ---
            Expr::Call {
                func,
                args,
                keywords,
            } => {
                let callee = self.evaluate(func)?;
                let positional = self.evaluate_all(args)?;
                let mut evaluated = Vec::with_capacity(keywords.len());
                for (name, value) in keywords {
                    evaluated.push((name.clone(), self.evaluate(value)?));
                }
                self.call_value(
                    &callee,
                    CallArgs {
                        positional,
                        keywords: evaluated,
                    },
                )
            }
            Expr::Attribute { value, attr } => {
                let receiver = self.evaluate(value)?;
                methods::lookup(&receiver, attr)
            }
            Expr::Subscript { value, index } => {
                let container = self.evaluate(value)?;
                if let Expr::Slice { lower, upper, step } = index.as_ref() {
                    let lower = self.evaluate_bound(lower.as_deref())?;
                    let upper = self.evaluate_bound(upper.as_deref())?;
                    let step = self.evaluate_bound(step.as_deref())?;
                    return slice(&container, lower, upper, step);
                }
                let index = self.evaluate(index)?;
                get_item(&container, &index)
            }
            Expr::Slice { .. } => Err(RuntimeError::type_error(
                "slices are only valid inside a subscript",
            )),

            Expr::Lambda(def) => self.make_function(def),
        }
    }

    fn evaluate_all(&mut self, exprs: &[Expr]) -> Result<Vec<RuntimeValue>, RuntimeError> {
        exprs.iter().map(|expr| self.evaluate(expr)).collect()
    }

    fn evaluate_bound(&mut self, bound: Option<&Expr>) -> Result<Option<i64>, RuntimeError> {
        match bound {
            Some(expr) => {
                let value = self.evaluate(expr)?;
                slice_bound(&value)
            }
            None => Ok(None),
        }
    }

    /// Call any callable value with already-evaluated arguments.
    pub fn call_value(
        &mut self,
        callee: &RuntimeValue,
        args: CallArgs,
    ) -> Result<RuntimeValue, RuntimeError> {
        match callee {
            RuntimeValue::Function(function) => self.call_function(function, args),
            RuntimeValue::Builtin(builtin) => (builtin.func)(self, args),
            RuntimeValue::ExceptionType(kind) => {
                args.no_keywords(kind.name())?;
                Ok(RuntimeValue::Exception(Rc::new(ExceptionValue {
                    kind: *kind,
                    args: args.positional,
                })))
            }
            RuntimeValue::Method(method) => {
                methods::call_method(self, &method.receiver, method.name, args)
            }
            other => Err(RuntimeError::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }
}

fn unary_op(operator: UnaryOperator, operand: &RuntimeValue) -> Result<RuntimeValue, RuntimeError> {
    let bad_operand = || {
        RuntimeError::type_error(format!(
            "bad operand type for {}: '{}'",
            operator,
            operand.type_name()
        ))
    };
    match operator {
        UnaryOperator::Not => Ok(RuntimeValue::Bool(!operand.is_truthy())),
        UnaryOperator::Negation => match operand {
            RuntimeValue::Bool(b) => Ok(RuntimeValue::Int(-(*b as i64))),
            RuntimeValue::Int(n) => Ok(match n.checked_neg() {
                Some(negated) => RuntimeValue::Int(negated),
                None => RuntimeValue::from_ibig(-IBig::from(*n)),
            }),
            RuntimeValue::BigInt(n) => Ok(RuntimeValue::from_ibig(-IBig::clone(n))),
            RuntimeValue::Float(n) => Ok(RuntimeValue::Float(-n)),
            _ => Err(bad_operand()),
        },
        UnaryOperator::Identity => match operand {
            RuntimeValue::Bool(b) => Ok(RuntimeValue::Int(*b as i64)),
            RuntimeValue::Int(_) | RuntimeValue::BigInt(_) | RuntimeValue::Float(_) => {
                Ok(operand.clone())
            }
            _ => Err(bad_operand()),
        },
    }
}
