//! The builtin table injected into every executed namespace.

use std::cmp::Ordering;
use std::rc::Rc;

use dashu_int::IBig;
use indexmap::IndexMap;
use minipy::ast::BinaryOperator;

use crate::error::{ErrorKind, RuntimeError};
use crate::evaluator_helpers::{as_index, binary_op, collect_items, iterate, order};
use crate::executor::Interpreter;
use crate::methods::pairs_of;
use crate::runtime_value::{
    Builtin, BuiltinFn, CallArgs, Dict, Number, Range, RuntimeValue, big_to_f64,
};

const FUNCTIONS: &[(&str, BuiltinFn)] = &[
    ("abs", builtin_abs),
    ("all", builtin_all),
    ("any", builtin_any),
    ("bool", builtin_bool),
    ("dict", builtin_dict),
    ("enumerate", builtin_enumerate),
    ("float", builtin_float),
    ("int", builtin_int),
    ("isinstance", builtin_isinstance),
    ("len", builtin_len),
    ("list", builtin_list),
    ("max", builtin_max),
    ("min", builtin_min),
    ("print", builtin_print),
    ("range", builtin_range),
    ("repr", builtin_repr),
    ("reversed", builtin_reversed),
    ("round", builtin_round),
    ("sorted", builtin_sorted),
    ("str", builtin_str),
    ("sum", builtin_sum),
    ("tuple", builtin_tuple),
    ("zip", builtin_zip),
];

/// Name → value table of builtin functions and exception classes.
#[derive(Debug)]
pub struct BuiltinTable {
    entries: IndexMap<&'static str, RuntimeValue>,
}

impl BuiltinTable {
    pub fn standard() -> Self {
        let mut entries = IndexMap::new();
        for &(name, func) in FUNCTIONS {
            entries.insert(name, RuntimeValue::Builtin(Builtin { name, func }));
        }
        for kind in ErrorKind::ALL {
            entries.insert(kind.name(), RuntimeValue::ExceptionType(kind));
        }
        BuiltinTable { entries }
    }

    /// The per-thread table shared by every namespace, so `__builtins__`
    /// is the same object everywhere.
    pub fn shared() -> Rc<Self> {
        thread_local! {
            static SHARED: Rc<BuiltinTable> = Rc::new(BuiltinTable::standard());
        }
        SHARED.with(Rc::clone)
    }

    pub fn get(&self, name: &str) -> Option<RuntimeValue> {
        self.entries.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Stable sort by `key(item)` (or the items themselves), as `sorted` and
/// `list.sort` do.
pub(crate) fn sort_values(
    interp: &mut Interpreter<'_>,
    items: Vec<RuntimeValue>,
    key: Option<RuntimeValue>,
    reverse: bool,
) -> Result<Vec<RuntimeValue>, RuntimeError> {
    let key = key.filter(|k| !matches!(k, RuntimeValue::None));
    let mut keyed = Vec::with_capacity(items.len());
    for item in items {
        let sort_key = match &key {
            Some(func) => interp.call_value(func, CallArgs::new(vec![item.clone()]))?,
            None => item.clone(),
        };
        keyed.push((sort_key, item));
    }

    let mut failure = None;
    keyed.sort_by(|(a, _), (b, _)| {
        let ordering = match order(a, b, "<") {
            Ok(ordering) => ordering.unwrap_or(Ordering::Equal),
            Err(err) => {
                failure.get_or_insert(err);
                Ordering::Equal
            }
        };
        if reverse { ordering.reverse() } else { ordering }
    });
    if let Some(err) = failure {
        return Err(err);
    }
    Ok(keyed.into_iter().map(|(_, item)| item).collect())
}

// ---------------------------------------------------------------------------
// I/O
// ---------------------------------------------------------------------------

fn builtin_print(interp: &mut Interpreter<'_>, mut args: CallArgs) -> Result<RuntimeValue, RuntimeError> {
    let sep = text_keyword(&mut args, "sep", " ")?;
    let end = text_keyword(&mut args, "end", "\n")?;
    args.no_keywords("print")?;
    let line = args
        .positional
        .iter()
        .map(RuntimeValue::try_str)
        .collect::<Result<Vec<_>, _>>()?
        .join(&sep);
    write!(interp.output, "{}{}", line, end)?;
    Ok(RuntimeValue::None)
}

fn text_keyword(args: &mut CallArgs, name: &str, default: &str) -> Result<String, RuntimeError> {
    match args.take_keyword(name) {
        None | Some(RuntimeValue::None) => Ok(default.to_string()),
        Some(RuntimeValue::Str(s)) => Ok(s),
        Some(other) => Err(RuntimeError::type_error(format!(
            "{} must be None or a string, not {}",
            name,
            other.type_name()
        ))),
    }
}

fn builtin_repr(_: &mut Interpreter<'_>, args: CallArgs) -> Result<RuntimeValue, RuntimeError> {
    args.check_arity("repr", 1, 1)?;
    Ok(RuntimeValue::Str(args.positional[0].try_repr()?))
}

// ---------------------------------------------------------------------------
// Type constructors
// ---------------------------------------------------------------------------

fn builtin_str(_: &mut Interpreter<'_>, args: CallArgs) -> Result<RuntimeValue, RuntimeError> {
    args.check_arity("str", 0, 1)?;
    Ok(RuntimeValue::Str(match args.positional.first() {
        Some(value) => value.try_str()?,
        None => String::new(),
    }))
}

fn builtin_bool(_: &mut Interpreter<'_>, args: CallArgs) -> Result<RuntimeValue, RuntimeError> {
    args.check_arity("bool", 0, 1)?;
    Ok(RuntimeValue::Bool(
        args.positional.first().is_some_and(RuntimeValue::is_truthy),
    ))
}

fn builtin_int(_: &mut Interpreter<'_>, mut args: CallArgs) -> Result<RuntimeValue, RuntimeError> {
    let base = args.take_keyword("base");
    args.check_arity("int", 0, 2)?;
    let base = match args.positional.get(1).cloned().or(base) {
        Some(value) => Some(as_index(&value).ok_or_else(|| {
            RuntimeError::type_error("int() base must be an integer")
        })?),
        None => None,
    };
    let Some(value) = args.positional.first() else {
        return Ok(RuntimeValue::Int(0));
    };
    match (value, base) {
        (RuntimeValue::Str(text), base) => parse_int(text, base.unwrap_or(10)),
        (_, Some(_)) => Err(RuntimeError::type_error(
            "int() can't convert non-string with explicit base",
        )),
        (RuntimeValue::Bool(b), None) => Ok(RuntimeValue::Int(*b as i64)),
        (RuntimeValue::Int(_) | RuntimeValue::BigInt(_), None) => Ok(value.clone()),
        (RuntimeValue::Float(f), None) => float_to_int(*f),
        (other, None) => Err(RuntimeError::type_error(format!(
            "int() argument must be a string or a real number, not '{}'",
            other.type_name()
        ))),
    }
}

fn parse_int(text: &str, base: i64) -> Result<RuntimeValue, RuntimeError> {
    let invalid = || {
        RuntimeError::value_error(format!(
            "invalid literal for int() with base {}: {}",
            base,
            RuntimeValue::str(text).repr()
        ))
    };
    if !(2..=36).contains(&base) {
        return Err(RuntimeError::value_error("int() base must be >= 2 and <= 36"));
    }
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') || digits.contains("__") {
        return Err(invalid());
    }
    let digits = digits.replace('_', "");
    if !digits.chars().all(|c| c.is_digit(base as u32)) {
        return Err(invalid());
    }
    let magnitude = IBig::from_str_radix(&digits, base as u32).map_err(|_| invalid())?;
    Ok(RuntimeValue::from_ibig(if negative { -magnitude } else { magnitude }))
}

fn float_to_int(value: f64) -> Result<RuntimeValue, RuntimeError> {
    if value.is_nan() {
        return Err(RuntimeError::value_error("cannot convert float NaN to integer"));
    }
    if value.is_infinite() {
        return Err(RuntimeError::overflow("cannot convert float infinity to integer"));
    }
    let truncated = value.trunc();
    if truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
        return Ok(RuntimeValue::Int(truncated as i64));
    }
    // `{:.0}` prints every integral digit of the float exactly.
    format!("{:.0}", truncated)
        .parse::<IBig>()
        .map(RuntimeValue::from_ibig)
        .map_err(|_| RuntimeError::overflow("integer result too large"))
}

fn builtin_float(_: &mut Interpreter<'_>, args: CallArgs) -> Result<RuntimeValue, RuntimeError> {
    args.check_arity("float", 0, 1)?;
    match args.positional.first() {
        None => Ok(RuntimeValue::Float(0.0)),
        Some(RuntimeValue::Str(text)) => text
            .trim()
            .replace('_', "")
            .parse::<f64>()
            .map(RuntimeValue::Float)
            .map_err(|_| {
                RuntimeError::value_error(format!(
                    "could not convert string to float: {}",
                    RuntimeValue::str(text.as_str()).repr()
                ))
            }),
        Some(RuntimeValue::BigInt(n)) => match big_to_f64(n) {
            f if f.is_infinite() => Err(RuntimeError::overflow("int too large to convert to float")),
            f => Ok(RuntimeValue::Float(f)),
        },
        Some(value) => match value.as_number() {
            Some(n) => Ok(RuntimeValue::Float(n.to_f64())),
            None => Err(RuntimeError::type_error(format!(
                "float() argument must be a string or a real number, not '{}'",
                value.type_name()
            ))),
        },
    }
}

fn builtin_list(_: &mut Interpreter<'_>, args: CallArgs) -> Result<RuntimeValue, RuntimeError> {
    args.check_arity("list", 0, 1)?;
    Ok(RuntimeValue::list(match args.positional.first() {
        Some(iterable) => collect_items(iterable)?,
        None => Vec::new(),
    }))
}

fn builtin_tuple(_: &mut Interpreter<'_>, args: CallArgs) -> Result<RuntimeValue, RuntimeError> {
    args.check_arity("tuple", 0, 1)?;
    Ok(match args.positional.first() {
        Some(RuntimeValue::Tuple(items)) => RuntimeValue::Tuple(Rc::clone(items)),
        Some(iterable) => RuntimeValue::tuple(collect_items(iterable)?),
        None => RuntimeValue::tuple(Vec::new()),
    })
}

fn builtin_dict(_: &mut Interpreter<'_>, mut args: CallArgs) -> Result<RuntimeValue, RuntimeError> {
    let keywords = std::mem::take(&mut args.keywords);
    args.check_arity("dict", 0, 1)?;
    let mut dict = Dict::new();
    if let Some(source) = args.positional.first() {
        for (key, value) in pairs_of(source)? {
            dict.insert(key, value)?;
        }
    }
    for (key, value) in keywords {
        dict.insert(RuntimeValue::Str(key), value)?;
    }
    Ok(RuntimeValue::dict(dict))
}

fn builtin_range(_: &mut Interpreter<'_>, args: CallArgs) -> Result<RuntimeValue, RuntimeError> {
    args.check_arity("range", 1, 3)?;
    let mut bounds = Vec::with_capacity(3);
    for value in &args.positional {
        bounds.push(as_index(value).ok_or_else(|| {
            RuntimeError::type_error(format!(
                "'{}' object cannot be interpreted as an integer",
                value.type_name()
            ))
        })?);
    }
    let range = match bounds.as_slice() {
        [stop] => Range::new(0, *stop, 1)?,
        [start, stop] => Range::new(*start, *stop, 1)?,
        [start, stop, step, ..] => Range::new(*start, *stop, *step)?,
        [] => return Err(RuntimeError::type_error("range expected at least 1 argument, got 0")),
    };
    Ok(RuntimeValue::Range(range))
}

// ---------------------------------------------------------------------------
// Sequences
// ---------------------------------------------------------------------------

fn builtin_len(_: &mut Interpreter<'_>, args: CallArgs) -> Result<RuntimeValue, RuntimeError> {
    args.check_arity("len", 1, 1)?;
    let len = match &args.positional[0] {
        RuntimeValue::Str(s) => s.chars().count(),
        RuntimeValue::List(items) => items.borrow().len(),
        RuntimeValue::Tuple(items) => items.len(),
        RuntimeValue::Dict(dict) => dict.borrow().len(),
        RuntimeValue::Range(range) => range.len(),
        other => {
            return Err(RuntimeError::type_error(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )));
        }
    };
    Ok(RuntimeValue::Int(len as i64))
}

fn builtin_sorted(interp: &mut Interpreter<'_>, mut args: CallArgs) -> Result<RuntimeValue, RuntimeError> {
    let key = args.take_keyword("key");
    let reverse = args.take_keyword("reverse").is_some_and(|v| v.is_truthy());
    args.check_arity("sorted", 1, 1)?;
    let items = collect_items(&args.positional[0])?;
    Ok(RuntimeValue::list(sort_values(interp, items, key, reverse)?))
}

fn builtin_reversed(_: &mut Interpreter<'_>, args: CallArgs) -> Result<RuntimeValue, RuntimeError> {
    args.check_arity("reversed", 1, 1)?;
    let mut items = collect_items(&args.positional[0])?;
    items.reverse();
    Ok(RuntimeValue::list(items))
}

fn builtin_enumerate(_: &mut Interpreter<'_>, mut args: CallArgs) -> Result<RuntimeValue, RuntimeError> {
    let start = args.take_keyword("start");
    args.check_arity("enumerate", 1, 2)?;
    let start = match args.positional.get(1).or(start.as_ref()) {
        Some(value) => as_index(value).ok_or_else(|| {
            RuntimeError::type_error(format!(
                "'{}' object cannot be interpreted as an integer",
                value.type_name()
            ))
        })?,
        None => 0,
    };
    let pairs = iterate(&args.positional[0])?
        .zip(start..)
        .map(|(item, i)| RuntimeValue::tuple(vec![RuntimeValue::Int(i), item]))
        .collect();
    Ok(RuntimeValue::list(pairs))
}

fn builtin_zip(_: &mut Interpreter<'_>, args: CallArgs) -> Result<RuntimeValue, RuntimeError> {
    args.no_keywords("zip")?;
    let columns = args
        .positional
        .iter()
        .map(collect_items)
        .collect::<Result<Vec<_>, _>>()?;
    let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
    let zipped = (0..rows)
        .map(|row| RuntimeValue::tuple(columns.iter().map(|col| col[row].clone()).collect()))
        .collect();
    Ok(RuntimeValue::list(zipped))
}

fn builtin_all(_: &mut Interpreter<'_>, args: CallArgs) -> Result<RuntimeValue, RuntimeError> {
    args.check_arity("all", 1, 1)?;
    Ok(RuntimeValue::Bool(iterate(&args.positional[0])?.all(|v| v.is_truthy())))
}

fn builtin_any(_: &mut Interpreter<'_>, args: CallArgs) -> Result<RuntimeValue, RuntimeError> {
    args.check_arity("any", 1, 1)?;
    Ok(RuntimeValue::Bool(iterate(&args.positional[0])?.any(|v| v.is_truthy())))
}

// ---------------------------------------------------------------------------
// Numbers
// ---------------------------------------------------------------------------

fn builtin_abs(_: &mut Interpreter<'_>, args: CallArgs) -> Result<RuntimeValue, RuntimeError> {
    args.check_arity("abs", 1, 1)?;
    if let RuntimeValue::BigInt(n) = &args.positional[0] {
        let n = IBig::clone(n);
        return Ok(RuntimeValue::from_ibig(if n < IBig::ZERO { -n } else { n }));
    }
    match args.positional[0].as_number() {
        Some(Number::Int(n)) => Ok(match n.checked_abs() {
            Some(abs) => RuntimeValue::Int(abs),
            None => RuntimeValue::from_ibig(-IBig::from(n)),
        }),
        Some(Number::Float(n)) => Ok(RuntimeValue::Float(n.abs())),
        None => Err(RuntimeError::type_error(format!(
            "bad operand type for abs(): '{}'",
            args.positional[0].type_name()
        ))),
    }
}

fn builtin_round(_: &mut Interpreter<'_>, mut args: CallArgs) -> Result<RuntimeValue, RuntimeError> {
    let ndigits = args.take_keyword("ndigits");
    args.check_arity("round", 1, 2)?;
    let ndigits = match args.positional.get(1).cloned().or(ndigits) {
        None | Some(RuntimeValue::None) => None,
        Some(value) => Some(as_index(&value).ok_or_else(|| {
            RuntimeError::type_error(format!(
                "'{}' object cannot be interpreted as an integer",
                value.type_name()
            ))
        })?),
    };
    if let RuntimeValue::BigInt(n) = &args.positional[0] {
        return match ndigits {
            Some(digits) if digits < 0 => {
                let factor = 10f64.powi(digits.clamp(-308, 0).unsigned_abs() as i32);
                float_to_int((big_to_f64(n) / factor).round_ties_even() * factor)
            }
            _ => Ok(args.positional[0].clone()),
        };
    }
    let number = args.positional[0].as_number().ok_or_else(|| {
        RuntimeError::type_error(format!(
            "type {} doesn't define __round__ method",
            args.positional[0].type_name()
        ))
    })?;
    match (number, ndigits) {
        (Number::Int(n), None) => Ok(RuntimeValue::Int(n)),
        (Number::Int(n), Some(digits)) if digits >= 0 => Ok(RuntimeValue::Int(n)),
        (Number::Int(n), Some(digits)) => {
            let factor = 10f64.powi(digits.clamp(-18, 0).unsigned_abs() as i32);
            float_to_int((n as f64 / factor).round_ties_even() * factor)
        }
        (Number::Float(f), None) => float_to_int(f.round_ties_even()),
        (Number::Float(f), Some(digits)) => {
            let factor = 10f64.powi(digits.clamp(-308, 308) as i32);
            Ok(RuntimeValue::Float((f * factor).round_ties_even() / factor))
        }
    }
}

fn builtin_sum(_: &mut Interpreter<'_>, mut args: CallArgs) -> Result<RuntimeValue, RuntimeError> {
    let start = args.take_keyword("start");
    args.check_arity("sum", 1, 2)?;
    let mut total = args
        .positional
        .get(1)
        .cloned()
        .or(start)
        .unwrap_or(RuntimeValue::Int(0));
    if let RuntimeValue::Str(_) = total {
        return Err(RuntimeError::type_error(
            "sum() can't sum strings [use ''.join(seq) instead]",
        ));
    }
    for item in iterate(&args.positional[0])? {
        total = binary_op(BinaryOperator::Addition, &total, &item)?;
    }
    Ok(total)
}

fn builtin_min(interp: &mut Interpreter<'_>, args: CallArgs) -> Result<RuntimeValue, RuntimeError> {
    extremum(interp, args, "min", Ordering::Less)
}

fn builtin_max(interp: &mut Interpreter<'_>, args: CallArgs) -> Result<RuntimeValue, RuntimeError> {
    extremum(interp, args, "max", Ordering::Greater)
}

/// `min`/`max` over one iterable or several arguments; the first of equal
/// candidates wins.
fn extremum(
    interp: &mut Interpreter<'_>,
    mut args: CallArgs,
    name: &str,
    wanted: Ordering,
) -> Result<RuntimeValue, RuntimeError> {
    let key = args
        .take_keyword("key")
        .filter(|k| !matches!(k, RuntimeValue::None));
    let default = args.take_keyword("default");
    args.check_arity(name, 1, usize::MAX)?;
    let candidates = if args.len() == 1 {
        collect_items(&args.positional[0])?
    } else {
        args.positional
    };

    let symbol = if wanted == Ordering::Less { "<" } else { ">" };
    let mut best: Option<(RuntimeValue, RuntimeValue)> = None;
    for item in candidates {
        let item_key = match &key {
            Some(func) => interp.call_value(func, CallArgs::new(vec![item.clone()]))?,
            None => item.clone(),
        };
        let replace = match &best {
            None => true,
            Some((best_key, _)) => order(&item_key, best_key, symbol)? == Some(wanted),
        };
        if replace {
            best = Some((item_key, item));
        }
    }
    match (best, default) {
        (Some((_, item)), _) => Ok(item),
        (None, Some(default)) => Ok(default),
        (None, None) => Err(RuntimeError::value_error(format!(
            "{}() arg is an empty sequence",
            name
        ))),
    }
}

// ---------------------------------------------------------------------------
// Introspection
// ---------------------------------------------------------------------------

fn builtin_isinstance(_: &mut Interpreter<'_>, args: CallArgs) -> Result<RuntimeValue, RuntimeError> {
    args.check_arity("isinstance", 2, 2)?;
    let (value, classinfo) = (&args.positional[0], &args.positional[1]);
    let classes = match classinfo {
        RuntimeValue::Tuple(items) => items.to_vec(),
        other => vec![other.clone()],
    };
    for class in &classes {
        if instance_of(value, class)? {
            return Ok(RuntimeValue::Bool(true));
        }
    }
    Ok(RuntimeValue::Bool(false))
}

fn instance_of(value: &RuntimeValue, class: &RuntimeValue) -> Result<bool, RuntimeError> {
    match class {
        RuntimeValue::Builtin(builtin) if builtin.is_type() => Ok(match builtin.name {
            "int" => matches!(
                value,
                RuntimeValue::Int(_) | RuntimeValue::BigInt(_) | RuntimeValue::Bool(_)
            ),
            name => value.type_name() == name,
        }),
        RuntimeValue::ExceptionType(kind) => Ok(match value {
            RuntimeValue::Exception(exc) => exc.kind.is_subclass_of(*kind),
            _ => false,
        }),
        _ => Err(RuntimeError::type_error(
            "isinstance() arg 2 must be a type, a tuple of types, or a union",
        )),
    }
}
