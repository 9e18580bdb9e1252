use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use dashu_int::IBig;
use indexmap::IndexMap;
use minipy::ast::FunctionDef;

use crate::builtins::BuiltinTable;
use crate::error::{ErrorKind, RuntimeError};
use crate::executor::Interpreter;

/// The local bindings of one function activation. Closures keep a handle to
/// the scopes they were defined in, so later assignments stay visible.
pub type LocalScope = Rc<RefCell<IndexMap<String, RuntimeValue>>>;

/// Deepest container nesting that `repr()` and `==` will walk.
pub const MAX_NESTING_DEPTH: usize = 1000;

/// A runtime value produced by evaluating an expression.
#[derive(Debug, Clone)]
pub enum RuntimeValue {
    None,
    Bool(bool),
    Int(i64),
    /// An integer outside the `i64` range. Results that fit are always `Int`.
    BigInt(Rc<IBig>),
    Float(f64),
    Str(String),
    List(Rc<RefCell<Vec<RuntimeValue>>>),
    Tuple(Rc<Vec<RuntimeValue>>),
    Dict(Rc<RefCell<Dict>>),
    Range(Range),
    Function(Rc<Function>),
    Builtin(Builtin),
    /// An exception class such as `ValueError`; calling it builds an instance.
    ExceptionType(ErrorKind),
    Exception(Rc<ExceptionValue>),
    /// A method looked up on a receiver, waiting to be called.
    Method(Rc<BoundMethod>),
    /// The builtin table injected into a namespace under `__builtins__`.
    Builtins(Rc<BuiltinTable>),
}

impl RuntimeValue {
    pub fn str(value: impl Into<String>) -> Self {
        RuntimeValue::Str(value.into())
    }

    pub fn list(items: Vec<RuntimeValue>) -> Self {
        RuntimeValue::List(Rc::new(RefCell::new(items)))
    }

    pub fn tuple(items: Vec<RuntimeValue>) -> Self {
        RuntimeValue::Tuple(Rc::new(items))
    }

    pub fn dict(dict: Dict) -> Self {
        RuntimeValue::Dict(Rc::new(RefCell::new(dict)))
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            RuntimeValue::None => false,
            RuntimeValue::Bool(b) => *b,
            RuntimeValue::Int(n) => *n != 0,
            RuntimeValue::Float(n) => *n != 0.0,
            RuntimeValue::Str(s) => !s.is_empty(),
            RuntimeValue::List(items) => !items.borrow().is_empty(),
            RuntimeValue::Tuple(items) => !items.is_empty(),
            RuntimeValue::Dict(dict) => !dict.borrow().is_empty(),
            RuntimeValue::Range(range) => range.len() > 0,
            _ => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            RuntimeValue::None => "NoneType",
            RuntimeValue::Bool(_) => "bool",
            RuntimeValue::Int(_) | RuntimeValue::BigInt(_) => "int",
            RuntimeValue::Float(_) => "float",
            RuntimeValue::Str(_) => "str",
            RuntimeValue::List(_) => "list",
            RuntimeValue::Tuple(_) => "tuple",
            RuntimeValue::Dict(_) => "dict",
            RuntimeValue::Range(_) => "range",
            RuntimeValue::Function(_) => "function",
            RuntimeValue::Builtin(_) => "builtin_function_or_method",
            RuntimeValue::ExceptionType(_) => "type",
            RuntimeValue::Exception(exc) => exc.kind.name(),
            RuntimeValue::Method(_) => "method",
            RuntimeValue::Builtins(_) => "module",
        }
    }

    /// `is` semantics: reference identity for containers and callables,
    /// value identity for immutable scalars.
    pub fn is_same(&self, other: &RuntimeValue) -> bool {
        match (self, other) {
            (RuntimeValue::None, RuntimeValue::None) => true,
            (RuntimeValue::Bool(a), RuntimeValue::Bool(b)) => a == b,
            (RuntimeValue::Int(a), RuntimeValue::Int(b)) => a == b,
            (RuntimeValue::BigInt(a), RuntimeValue::BigInt(b)) => a == b,
            (RuntimeValue::Float(a), RuntimeValue::Float(b)) => a.to_bits() == b.to_bits(),
            (RuntimeValue::Str(a), RuntimeValue::Str(b)) => a == b,
            (RuntimeValue::List(a), RuntimeValue::List(b)) => Rc::ptr_eq(a, b),
            (RuntimeValue::Tuple(a), RuntimeValue::Tuple(b)) => Rc::ptr_eq(a, b),
            (RuntimeValue::Dict(a), RuntimeValue::Dict(b)) => Rc::ptr_eq(a, b),
            (RuntimeValue::Function(a), RuntimeValue::Function(b)) => Rc::ptr_eq(a, b),
            (RuntimeValue::Builtin(a), RuntimeValue::Builtin(b)) => a.name == b.name,
            (RuntimeValue::ExceptionType(a), RuntimeValue::ExceptionType(b)) => a == b,
            (RuntimeValue::Exception(a), RuntimeValue::Exception(b)) => Rc::ptr_eq(a, b),
            (RuntimeValue::Builtins(a), RuntimeValue::Builtins(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// The `repr()` form of the value. Containers nested past
    /// `MAX_NESTING_DEPTH` print as `...`; `try_repr` reports them instead.
    pub fn repr(&self) -> String {
        self.try_repr().unwrap_or_else(|_| "...".to_string())
    }

    /// `repr()` that raises `RecursionError` for containers nested too deeply.
    pub fn try_repr(&self) -> Result<String, RuntimeError> {
        let mut out = String::new();
        self.write_repr(&mut out, &mut Vec::new(), 0)?;
        Ok(out)
    }

    /// `str()` with the same nesting limit as `try_repr`.
    pub fn try_str(&self) -> Result<String, RuntimeError> {
        match self {
            RuntimeValue::Str(s) => Ok(s.clone()),
            RuntimeValue::Exception(exc) => Ok(exc.message()),
            other => other.try_repr(),
        }
    }

    fn write_repr(
        &self,
        out: &mut String,
        seen: &mut Vec<usize>,
        depth: usize,
    ) -> Result<(), RuntimeError> {
        if depth > MAX_NESTING_DEPTH {
            return Err(nesting_error("while getting the repr of an object"));
        }
        match self {
            RuntimeValue::None => out.push_str("None"),
            RuntimeValue::Bool(true) => out.push_str("True"),
            RuntimeValue::Bool(false) => out.push_str("False"),
            RuntimeValue::Int(n) => out.push_str(&n.to_string()),
            RuntimeValue::BigInt(n) => out.push_str(&n.to_string()),
            RuntimeValue::Float(n) => out.push_str(&format_float(*n)),
            RuntimeValue::Str(s) => out.push_str(&quote_str(s)),
            RuntimeValue::List(items) => {
                let id = Rc::as_ptr(items) as *const () as usize;
                if seen.contains(&id) {
                    out.push_str("[...]");
                    return Ok(());
                }
                seen.push(id);
                out.push('[');
                write_items(&items.borrow(), out, seen, depth)?;
                out.push(']');
                seen.pop();
            }
            RuntimeValue::Tuple(items) => {
                out.push('(');
                write_items(items, out, seen, depth)?;
                if items.len() == 1 {
                    out.push(',');
                }
                out.push(')');
            }
            RuntimeValue::Dict(dict) => {
                let id = Rc::as_ptr(dict) as *const () as usize;
                if seen.contains(&id) {
                    out.push_str("{...}");
                    return Ok(());
                }
                seen.push(id);
                out.push('{');
                for (i, (key, value)) in dict.borrow().items().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    key.write_repr(out, seen, depth + 1)?;
                    out.push_str(": ");
                    value.write_repr(out, seen, depth + 1)?;
                }
                out.push('}');
                seen.pop();
            }
            RuntimeValue::Range(range) => {
                if range.step == 1 {
                    out.push_str(&format!("range({}, {})", range.start, range.stop));
                } else {
                    out.push_str(&format!(
                        "range({}, {}, {})",
                        range.start, range.stop, range.step
                    ));
                }
            }
            RuntimeValue::Function(func) => {
                out.push_str(&format!("<function {}>", func.def.name));
            }
            RuntimeValue::Builtin(builtin) if builtin.is_type() => {
                out.push_str(&format!("<class '{}'>", builtin.name));
            }
            RuntimeValue::Builtin(builtin) => {
                out.push_str(&format!("<built-in function {}>", builtin.name));
            }
            RuntimeValue::ExceptionType(kind) => out.push_str(&format!("<class '{}'>", kind)),
            RuntimeValue::Exception(exc) => {
                out.push_str(exc.kind.name());
                out.push('(');
                write_items(&exc.args, out, seen, depth)?;
                out.push(')');
            }
            RuntimeValue::Method(method) => {
                out.push_str(&format!(
                    "<built-in method {} of {} object>",
                    method.name,
                    method.receiver.type_name()
                ));
            }
            RuntimeValue::Builtins(_) => out.push_str("<module 'builtins' (built-in)>"),
        }
        Ok(())
    }

    /// `==` that raises `RecursionError` for containers nested too deeply.
    pub fn try_eq(&self, other: &RuntimeValue) -> Result<bool, RuntimeError> {
        self.eq_at(other, 0)
    }

    fn eq_at(&self, other: &RuntimeValue, depth: usize) -> Result<bool, RuntimeError> {
        use RuntimeValue as V;
        if depth > MAX_NESTING_DEPTH {
            return Err(nesting_error("in comparison"));
        }
        Ok(match (self, other) {
            (V::None, V::None) => true,
            (V::Str(a), V::Str(b)) => a == b,
            (V::List(a), V::List(b)) => {
                Rc::ptr_eq(a, b) || items_eq(&a.borrow(), &b.borrow(), depth)?
            }
            (V::Tuple(a), V::Tuple(b)) => Rc::ptr_eq(a, b) || items_eq(a, b, depth)?,
            (V::Dict(a), V::Dict(b)) => Rc::ptr_eq(a, b) || a.borrow().eq_at(&b.borrow(), depth)?,
            (V::Range(a), V::Range(b)) => a == b,
            (V::Function(a), V::Function(b)) => Rc::ptr_eq(a, b),
            (V::Builtin(a), V::Builtin(b)) => a.name == b.name,
            (V::ExceptionType(a), V::ExceptionType(b)) => a == b,
            (V::Exception(a), V::Exception(b)) => Rc::ptr_eq(a, b),
            (V::Method(a), V::Method(b)) => a.name == b.name && a.receiver.is_same(&b.receiver),
            (V::Builtins(a), V::Builtins(b)) => Rc::ptr_eq(a, b),
            (V::BigInt(a), V::BigInt(b)) => a == b,
            // A big int never holds a value that fits in `Int`.
            (V::BigInt(_), V::Int(_) | V::Bool(_)) | (V::Int(_) | V::Bool(_), V::BigInt(_)) => false,
            // NaN != NaN per IEEE 754
            (a, b) => match (a.as_number(), b.as_number()) {
                (Some(Number::Int(x)), Some(Number::Int(y))) => x == y,
                (Some(x), Some(y)) => x.to_f64() == y.to_f64(),
                _ => false,
            },
        })
    }
}

fn nesting_error(context: &str) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::RecursionError,
        format!("maximum recursion depth exceeded {}", context),
    )
}

fn write_items(
    items: &[RuntimeValue],
    out: &mut String,
    seen: &mut Vec<usize>,
    depth: usize,
) -> Result<(), RuntimeError> {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        item.write_repr(out, seen, depth + 1)?;
    }
    Ok(())
}

fn items_eq(left: &[RuntimeValue], right: &[RuntimeValue], depth: usize) -> Result<bool, RuntimeError> {
    if left.len() != right.len() {
        return Ok(false);
    }
    for (a, b) in left.iter().zip(right) {
        if !a.eq_at(b, depth + 1)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// `str()` of a value: strings print bare, exceptions print their message,
/// everything else falls back to `repr()`.
impl fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeValue::Str(s) => f.write_str(s),
            RuntimeValue::Exception(exc) => f.write_str(&exc.message()),
            other => f.write_str(&other.repr()),
        }
    }
}

/// Containers nested past `MAX_NESTING_DEPTH` compare unequal here;
/// `try_eq` reports them instead.
impl PartialEq for RuntimeValue {
    fn eq(&self, other: &Self) -> bool {
        self.try_eq(other).unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Numbers
// ---------------------------------------------------------------------------

/// A numeric view of `bool`, `int` and `float` values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn to_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(n) => n,
        }
    }
}

impl RuntimeValue {
    /// Big ints are seen as their nearest float.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            RuntimeValue::Bool(b) => Some(Number::Int(*b as i64)),
            RuntimeValue::Int(n) => Some(Number::Int(*n)),
            RuntimeValue::BigInt(n) => Some(Number::Float(big_to_f64(n))),
            RuntimeValue::Float(n) => Some(Number::Float(*n)),
            _ => None,
        }
    }

    /// Wrap an arbitrary-precision result, keeping `Int` whenever it fits.
    pub fn from_ibig(value: IBig) -> Self {
        match i64::try_from(value.clone()) {
            Ok(n) => RuntimeValue::Int(n),
            Err(_) => RuntimeValue::BigInt(Rc::new(value)),
        }
    }

    /// The exact integer held by `bool`, `int` and big `int` values.
    pub fn as_ibig(&self) -> Option<IBig> {
        match self {
            RuntimeValue::Bool(b) => Some(IBig::from(*b as i64)),
            RuntimeValue::Int(n) => Some(IBig::from(*n)),
            RuntimeValue::BigInt(n) => Some(IBig::clone(n)),
            _ => None,
        }
    }
}

/// Nearest float to a big integer; infinite when out of the float range.
pub fn big_to_f64(value: &IBig) -> f64 {
    value.to_string().parse().unwrap_or(f64::INFINITY)
}

/// Format a float the way `repr(float)` does: shortest round-trip digits,
/// always with a fractional part or exponent.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let abs = value.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let formatted = format!("{:e}", value);
        if let Some((mantissa, exponent)) = formatted.split_once('e') {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            return format!("{}e{}{:02}", mantissa, sign, exponent.abs());
        }
        return formatted;
    }
    let formatted = format!("{}", value);
    if formatted.contains('.') {
        formatted
    } else {
        format!("{}.0", formatted)
    }
}

/// Quote a string the way `repr(str)` does.
pub fn quote_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => {
                let code = c as u32;
                if code < 0x100 {
                    out.push_str(&format!("\\x{:02x}", code));
                } else {
                    out.push_str(&format!("\\u{:04x}", code));
                }
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

// ---------------------------------------------------------------------------
// Ranges
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl Range {
    pub fn new(start: i64, stop: i64, step: i64) -> Result<Self, RuntimeError> {
        if step == 0 {
            return Err(RuntimeError::value_error("range() arg 3 must not be zero"));
        }
        Ok(Range { start, stop, step })
    }

    pub fn len(&self) -> usize {
        let (start, stop, step) = (self.start as i128, self.stop as i128, self.step as i128);
        let span = if step > 0 { stop - start } else { start - stop };
        if span <= 0 {
            0
        } else {
            ((span - 1) / step.abs() + 1) as usize
        }
    }

    pub fn get(&self, index: usize) -> Option<i64> {
        if index < self.len() {
            Some(self.start + self.step * index as i64)
        } else {
            None
        }
    }

    pub fn contains(&self, value: i64) -> bool {
        let in_bounds = if self.step > 0 {
            self.start <= value && value < self.stop
        } else {
            self.stop < value && value <= self.start
        };
        in_bounds && (value - self.start) % self.step == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + use<> {
        let Range { start, step, .. } = *self;
        (0..self.len()).map(move |i| start + step * i as i64)
    }
}

// ---------------------------------------------------------------------------
// Dicts
// ---------------------------------------------------------------------------

/// The hashable projection of a value. Keys that compare equal (`1`, `1.0`,
/// `True`) project to the same `DictKey`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DictKey {
    None,
    Int(i64),
    BigInt(IBig),
    Float(u64),
    Str(String),
    Tuple(Vec<DictKey>),
    Identity(usize),
    Named(&'static str),
}

impl DictKey {
    pub fn from_value(value: &RuntimeValue) -> Result<Self, RuntimeError> {
        Ok(match value {
            RuntimeValue::None => DictKey::None,
            RuntimeValue::Bool(b) => DictKey::Int(*b as i64),
            RuntimeValue::Int(n) => DictKey::Int(*n),
            RuntimeValue::BigInt(n) => DictKey::BigInt(IBig::clone(n)),
            RuntimeValue::Float(n) => {
                if n.fract() == 0.0 && *n >= i64::MIN as f64 && *n < i64::MAX as f64 {
                    DictKey::Int(*n as i64)
                } else {
                    DictKey::Float(n.to_bits())
                }
            }
            RuntimeValue::Str(s) => DictKey::Str(s.clone()),
            RuntimeValue::Tuple(items) => DictKey::Tuple(
                items
                    .iter()
                    .map(DictKey::from_value)
                    .collect::<Result<_, _>>()?,
            ),
            RuntimeValue::Function(func) => {
                DictKey::Identity(Rc::as_ptr(func) as *const () as usize)
            }
            RuntimeValue::Exception(exc) => {
                DictKey::Identity(Rc::as_ptr(exc) as *const () as usize)
            }
            RuntimeValue::Builtin(builtin) => DictKey::Named(builtin.name),
            RuntimeValue::ExceptionType(kind) => DictKey::Named(kind.name()),
            other => {
                return Err(RuntimeError::type_error(format!(
                    "unhashable type: '{}'",
                    other.type_name()
                )));
            }
        })
    }
}

/// An insertion-ordered mapping. Each entry keeps the key value it was
/// first inserted with, so `{1: 'a'}` still prints `1` after `d[1.0] = 'b'`.
#[derive(Debug, Clone, Default)]
pub struct Dict {
    entries: IndexMap<DictKey, (RuntimeValue, RuntimeValue)>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &RuntimeValue) -> Result<Option<RuntimeValue>, RuntimeError> {
        let key = DictKey::from_value(key)?;
        Ok(self.entries.get(&key).map(|(_, value)| value.clone()))
    }

    pub fn contains(&self, key: &RuntimeValue) -> Result<bool, RuntimeError> {
        Ok(self.entries.contains_key(&DictKey::from_value(key)?))
    }

    pub fn insert(&mut self, key: RuntimeValue, value: RuntimeValue) -> Result<(), RuntimeError> {
        let hashed = DictKey::from_value(&key)?;
        match self.entries.get_mut(&hashed) {
            Some(entry) => entry.1 = value,
            None => {
                self.entries.insert(hashed, (key, value));
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, key: &RuntimeValue) -> Result<Option<RuntimeValue>, RuntimeError> {
        let key = DictKey::from_value(key)?;
        Ok(self.entries.shift_remove(&key).map(|(_, value)| value))
    }

    pub fn pop_last(&mut self) -> Option<(RuntimeValue, RuntimeValue)> {
        self.entries.pop().map(|(_, entry)| entry)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn keys(&self) -> Vec<RuntimeValue> {
        self.entries.values().map(|(key, _)| key.clone()).collect()
    }

    pub fn values(&self) -> Vec<RuntimeValue> {
        self.entries.values().map(|(_, value)| value.clone()).collect()
    }

    pub fn items(&self) -> Vec<(RuntimeValue, RuntimeValue)> {
        self.entries.values().cloned().collect()
    }
}

impl Dict {
    fn eq_at(&self, other: &Dict, depth: usize) -> Result<bool, RuntimeError> {
        if self.len() != other.len() {
            return Ok(false);
        }
        for (key, (_, value)) in &self.entries {
            match other.entries.get(key) {
                Some((_, theirs)) if value.eq_at(theirs, depth + 1)? => {}
                _ => return Ok(false),
            }
        }
        Ok(true)
    }
}

impl PartialEq for Dict {
    fn eq(&self, other: &Self) -> bool {
        self.eq_at(other, 0).unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Callables
// ---------------------------------------------------------------------------

/// A user-defined function or lambda.
pub struct Function {
    pub def: Rc<FunctionDef>,
    /// One slot per parameter, filled when the parameter has a default.
    pub defaults: Vec<Option<RuntimeValue>>,
    /// Scopes of the enclosing function activations, outermost first.
    pub enclosing: Vec<LocalScope>,
    /// Names bound in the body, which resolve to the activation's locals.
    pub locals: HashSet<String>,
    /// Names declared `global` in the body.
    pub globals: HashSet<String>,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.def.name)
            .field("params", &self.def.params.len())
            .finish()
    }
}

pub type BuiltinFn = fn(&mut Interpreter<'_>, CallArgs) -> Result<RuntimeValue, RuntimeError>;

/// A native function exposed through the builtin table.
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

impl Builtin {
    /// Builtins that double as type objects for `isinstance`.
    pub fn is_type(&self) -> bool {
        matches!(
            self.name,
            "bool" | "int" | "float" | "str" | "list" | "tuple" | "dict" | "range"
        )
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Builtin({})", self.name)
    }
}

#[derive(Debug, Clone)]
pub struct BoundMethod {
    pub receiver: RuntimeValue,
    pub name: &'static str,
}

/// A raised or constructed exception instance.
#[derive(Debug, Clone)]
pub struct ExceptionValue {
    pub kind: ErrorKind,
    pub args: Vec<RuntimeValue>,
}

impl ExceptionValue {
    /// `str(exc)`: empty for no arguments, the bare argument for one, the
    /// argument tuple otherwise.
    pub fn message(&self) -> String {
        match self.args.as_slice() {
            [] => String::new(),
            [single] => single.to_string(),
            many => RuntimeValue::tuple(many.to_vec()).repr(),
        }
    }

    pub fn to_error(&self) -> RuntimeError {
        // KeyError shows the missing key in repr form.
        let message = match (self.kind, self.args.as_slice()) {
            (ErrorKind::KeyError, [key]) => key.repr(),
            _ => self.message(),
        };
        RuntimeError::new(self.kind, message)
    }
}

/// Positional and keyword arguments of a call, in source order.
#[derive(Debug, Default)]
pub struct CallArgs {
    pub positional: Vec<RuntimeValue>,
    pub keywords: Vec<(String, RuntimeValue)>,
}

impl CallArgs {
    pub fn new(positional: Vec<RuntimeValue>) -> Self {
        CallArgs {
            positional,
            keywords: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
    }

    pub fn take_keyword(&mut self, name: &str) -> Option<RuntimeValue> {
        let index = self.keywords.iter().position(|(key, _)| key == name)?;
        Some(self.keywords.remove(index).1)
    }

    /// Fail on any keyword argument that was not taken.
    pub fn no_keywords(&self, func: &str) -> Result<(), RuntimeError> {
        match self.keywords.first() {
            Some((key, _)) => Err(RuntimeError::type_error(format!(
                "{}() got an unexpected keyword argument '{}'",
                func, key
            ))),
            None => Ok(()),
        }
    }

    pub fn check_arity(&self, func: &str, min: usize, max: usize) -> Result<(), RuntimeError> {
        self.no_keywords(func)?;
        let given = self.positional.len();
        if given < min {
            return Err(RuntimeError::type_error(format!(
                "{}() expected at least {} argument{}, got {}",
                func,
                min,
                if min == 1 { "" } else { "s" },
                given
            )));
        }
        if given > max {
            return Err(RuntimeError::type_error(format!(
                "{}() expected at most {} argument{}, got {}",
                func,
                max,
                if max == 1 { "" } else { "s" },
                given
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_repr() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(-0.0), "-0.0");
        assert_eq!(format_float(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_float(1e16), "1e+16");
        assert_eq!(format_float(1.5e-7), "1.5e-07");
        assert_eq!(format_float(f64::INFINITY), "inf");
    }

    #[test]
    fn string_repr_picks_quotes() {
        assert_eq!(quote_str("a"), "'a'");
        assert_eq!(quote_str("it's"), "\"it's\"");
        assert_eq!(quote_str("a'\"b"), "'a\\'\"b'");
        assert_eq!(quote_str("x\ny"), "'x\\ny'");
    }

    #[test]
    fn container_repr() {
        let value = RuntimeValue::list(vec![
            RuntimeValue::Int(1),
            RuntimeValue::str("a"),
            RuntimeValue::tuple(vec![RuntimeValue::None]),
        ]);
        assert_eq!(value.repr(), "[1, 'a', (None,)]");
    }

    #[test]
    fn self_containing_list_repr() {
        let value = RuntimeValue::list(vec![RuntimeValue::Int(1)]);
        if let RuntimeValue::List(items) = &value {
            items.borrow_mut().push(value.clone());
        }
        assert_eq!(value.repr(), "[1, [...]]");
        if let RuntimeValue::List(items) = &value {
            items.borrow_mut().clear();
        }
    }

    #[test]
    fn equal_numbers_share_a_dict_slot() {
        let mut dict = Dict::new();
        dict.insert(RuntimeValue::Int(1), RuntimeValue::str("a")).unwrap();
        dict.insert(RuntimeValue::Float(1.0), RuntimeValue::str("b")).unwrap();
        dict.insert(RuntimeValue::Bool(true), RuntimeValue::str("c")).unwrap();
        assert_eq!(dict.len(), 1);
        assert_eq!(RuntimeValue::dict(dict).repr(), "{1: 'c'}");
    }

    #[test]
    fn lists_are_unhashable() {
        let err = DictKey::from_value(&RuntimeValue::list(vec![])).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: unhashable type: 'list'");
    }

    #[test]
    fn range_length_and_membership() {
        let range = Range::new(10, 0, -3).unwrap();
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![10, 7, 4, 1]);
        assert_eq!(range.len(), 4);
        assert!(range.contains(4));
        assert!(!range.contains(0));
        assert!(Range::new(0, 1, 0).is_err());
    }

    #[test]
    fn cross_type_numeric_equality() {
        assert_eq!(RuntimeValue::Int(1), RuntimeValue::Float(1.0));
        assert_eq!(RuntimeValue::Bool(true), RuntimeValue::Int(1));
        assert_ne!(RuntimeValue::Float(f64::NAN), RuntimeValue::Float(f64::NAN));
        assert_ne!(RuntimeValue::str("1"), RuntimeValue::Int(1));
    }
}
