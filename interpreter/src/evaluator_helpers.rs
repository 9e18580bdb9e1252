//! Operator semantics shared by the evaluator, the executor and the builtins.

use std::cmp::Ordering;

use dashu_int::IBig;
use dashu_int::ops::BitTest;
use minipy::ast::{BinaryOperator, CompareOperator};

use crate::error::{ErrorKind, RuntimeError};
use crate::runtime_value::{Number, Range, RuntimeValue, big_to_f64};

/// Longest sequence `*` repetition may produce.
const MAX_REPEAT_LEN: usize = 1 << 26;

/// Widest integer, in bits, that `*` and `**` may produce.
const MAX_INT_BITS: usize = 1 << 20;

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

pub fn binary_op(
    op: BinaryOperator,
    left: &RuntimeValue,
    right: &RuntimeValue,
) -> Result<RuntimeValue, RuntimeError> {
    use RuntimeValue as V;

    if let Some((a, b)) = big_operands(left, right) {
        return big_int_op(op, a, b);
    }
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return numeric_op(op, a, b);
    }

    match (op, left, right) {
        (BinaryOperator::Addition, V::Str(a), V::Str(b)) => Ok(V::Str(format!("{}{}", a, b))),
        (BinaryOperator::Addition, V::List(a), V::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(V::list(items))
        }
        (BinaryOperator::Addition, V::Tuple(a), V::Tuple(b)) => {
            Ok(V::tuple(a.iter().chain(b.iter()).cloned().collect()))
        }
        (BinaryOperator::Multiplication, seq, count) if as_index(count).is_some() => {
            repeat(op, seq, count)
        }
        (BinaryOperator::Multiplication, count, seq) if as_index(count).is_some() => {
            repeat(op, seq, count)
        }
        (BinaryOperator::Modulo, V::Str(format), args) => percent_format(format, args),
        _ => Err(unsupported_operands(&op.to_string(), left, right)),
    }
}

/// Both operands as exact integers, when at least one of them is a big int.
fn big_operands(left: &RuntimeValue, right: &RuntimeValue) -> Option<(IBig, IBig)> {
    if !matches!(left, RuntimeValue::BigInt(_)) && !matches!(right, RuntimeValue::BigInt(_)) {
        return None;
    }
    Some((left.as_ibig()?, right.as_ibig()?))
}

fn numeric_op(op: BinaryOperator, a: Number, b: Number) -> Result<RuntimeValue, RuntimeError> {
    use BinaryOperator as Op;
    use Number::Int;

    // i64 overflow continues in arbitrary precision.
    let widen = |x: i64, y: i64| big_int_op(op, IBig::from(x), IBig::from(y));
    match op {
        Op::Addition | Op::Subtraction | Op::Multiplication => match (a, b) {
            (Int(x), Int(y)) => {
                let result = match op {
                    Op::Addition => x.checked_add(y),
                    Op::Subtraction => x.checked_sub(y),
                    _ => x.checked_mul(y),
                };
                match result {
                    Some(n) => Ok(RuntimeValue::Int(n)),
                    None => widen(x, y),
                }
            }
            _ => {
                let (x, y) = (a.to_f64(), b.to_f64());
                Ok(RuntimeValue::Float(match op {
                    Op::Addition => x + y,
                    Op::Subtraction => x - y,
                    _ => x * y,
                }))
            }
        },
        Op::Division => {
            let y = b.to_f64();
            if y == 0.0 {
                return Err(RuntimeError::zero_division("division by zero"));
            }
            Ok(RuntimeValue::Float(a.to_f64() / y))
        }
        Op::FloorDivision => match (a, b) {
            (Int(_), Int(0)) => Err(RuntimeError::zero_division(
                "integer division or modulo by zero",
            )),
            (Int(x), Int(y)) => match floor_div(x, y) {
                Some(n) => Ok(RuntimeValue::Int(n)),
                None => widen(x, y),
            },
            _ => {
                let (x, y) = (a.to_f64(), b.to_f64());
                if y == 0.0 {
                    return Err(RuntimeError::zero_division("float floor division by zero"));
                }
                Ok(RuntimeValue::Float((x / y).floor()))
            }
        },
        Op::Modulo => match (a, b) {
            (Int(_), Int(0)) => Err(RuntimeError::zero_division(
                "integer division or modulo by zero",
            )),
            (Int(x), Int(y)) => {
                let r = x.wrapping_rem(y);
                Ok(RuntimeValue::Int(if r != 0 && (r < 0) != (y < 0) { r + y } else { r }))
            }
            _ => {
                let (x, y) = (a.to_f64(), b.to_f64());
                if y == 0.0 {
                    return Err(RuntimeError::zero_division("float modulo"));
                }
                let r = x % y;
                Ok(RuntimeValue::Float(if r != 0.0 && (r < 0.0) != (y < 0.0) {
                    r + y
                } else {
                    r
                }))
            }
        },
        Op::Power => match (a, b) {
            (Int(x), Int(y)) if y >= 0 => {
                match u32::try_from(y).ok().and_then(|exp| x.checked_pow(exp)) {
                    Some(n) => Ok(RuntimeValue::Int(n)),
                    None => widen(x, y),
                }
            }
            _ => {
                let (x, y) = (a.to_f64(), b.to_f64());
                if x == 0.0 && y < 0.0 {
                    return Err(RuntimeError::zero_division(
                        "0.0 cannot be raised to a negative power",
                    ));
                }
                if x < 0.0 && y.fract() != 0.0 {
                    return Err(RuntimeError::value_error(
                        "negative number cannot be raised to a fractional power",
                    ));
                }
                Ok(RuntimeValue::Float(x.powf(y)))
            }
        },
    }
}

/// Integer arithmetic where an operand or the result leaves the `i64` range.
fn big_int_op(op: BinaryOperator, x: IBig, y: IBig) -> Result<RuntimeValue, RuntimeError> {
    use BinaryOperator as Op;

    let too_large = || RuntimeError::overflow("integer result too large");
    let result = match op {
        Op::Addition => x + y,
        Op::Subtraction => x - y,
        Op::Multiplication => {
            if x.bit_len() + y.bit_len() > MAX_INT_BITS {
                return Err(too_large());
            }
            x * y
        }
        Op::Division => {
            if y == IBig::ZERO {
                return Err(RuntimeError::zero_division("division by zero"));
            }
            let (x, y) = (big_to_f64(&x), big_to_f64(&y));
            if x.is_infinite() || y.is_infinite() {
                return Err(RuntimeError::overflow("int too large to convert to float"));
            }
            return Ok(RuntimeValue::Float(x / y));
        }
        Op::FloorDivision | Op::Modulo => {
            if y == IBig::ZERO {
                return Err(RuntimeError::zero_division(
                    "integer division or modulo by zero",
                ));
            }
            let (quotient, remainder) = (&x / &y, &x % &y);
            // `/` and `%` truncate; Python rounds toward negative infinity.
            let adjust = remainder != IBig::ZERO && (remainder < IBig::ZERO) != (y < IBig::ZERO);
            match (op, adjust) {
                (Op::FloorDivision, true) => quotient - IBig::ONE,
                (Op::FloorDivision, false) => quotient,
                (_, true) => remainder + y,
                (_, false) => remainder,
            }
        }
        Op::Power => {
            if y < IBig::ZERO {
                let (x, y) = (big_to_f64(&x), big_to_f64(&y));
                if x == 0.0 {
                    return Err(RuntimeError::zero_division(
                        "0.0 cannot be raised to a negative power",
                    ));
                }
                return Ok(RuntimeValue::Float(x.powf(y)));
            }
            let exponent = usize::try_from(y).map_err(|_| too_large())?;
            if x.bit_len() <= 1 {
                // 0, 1 and -1 stay small for any exponent.
                let parity = if exponent == 0 { 0 } else { 2 - exponent % 2 };
                x.pow(parity)
            } else if x.bit_len().saturating_mul(exponent) > MAX_INT_BITS {
                return Err(too_large());
            } else {
                x.pow(exponent)
            }
        }
    };
    Ok(RuntimeValue::from_ibig(result))
}

fn floor_div(x: i64, y: i64) -> Option<i64> {
    let q = x.checked_div(y)?;
    if x % y != 0 && ((x < 0) != (y < 0)) {
        Some(q - 1)
    } else {
        Some(q)
    }
}

fn repeat(
    op: BinaryOperator,
    seq: &RuntimeValue,
    count: &RuntimeValue,
) -> Result<RuntimeValue, RuntimeError> {
    let times = as_index(count).unwrap_or(0).max(0) as usize;
    let too_long = || RuntimeError::overflow("repeated sequence is too long");
    match seq {
        RuntimeValue::Str(s) => {
            if s.len().checked_mul(times).is_none_or(|n| n > MAX_REPEAT_LEN) {
                return Err(too_long());
            }
            Ok(RuntimeValue::Str(s.repeat(times)))
        }
        RuntimeValue::List(items) => {
            let items = items.borrow();
            if items.len().checked_mul(times).is_none_or(|n| n > MAX_REPEAT_LEN) {
                return Err(too_long());
            }
            Ok(RuntimeValue::list(repeat_items(&items, times)))
        }
        RuntimeValue::Tuple(items) => {
            if items.len().checked_mul(times).is_none_or(|n| n > MAX_REPEAT_LEN) {
                return Err(too_long());
            }
            Ok(RuntimeValue::tuple(repeat_items(&items, times)))
        }
        other => Err(unsupported_operands(&op.to_string(), other, count)),
    }
}

fn repeat_items(items: &[RuntimeValue], times: usize) -> Vec<RuntimeValue> {
    items.iter().cloned().cycle().take(items.len() * times).collect()
}

pub fn unsupported_operands(op: &str, left: &RuntimeValue, right: &RuntimeValue) -> RuntimeError {
    RuntimeError::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op,
        left.type_name(),
        right.type_name()
    ))
}

/// `printf`-style `str % args` supporting `%s`, `%r`, `%d`, `%i`, `%f` and `%%`.
fn percent_format(format: &str, args: &RuntimeValue) -> Result<RuntimeValue, RuntimeError> {
    let args = match args {
        RuntimeValue::Tuple(items) => items.to_vec(),
        other => vec![other.clone()],
    };
    let mut args = args.into_iter();
    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let spec = chars.next();
        if spec == Some('%') {
            out.push('%');
            continue;
        }
        let arg = args
            .next()
            .ok_or_else(|| RuntimeError::type_error("not enough arguments for format string"))?;
        match spec {
            Some('s') => out.push_str(&arg.try_str()?),
            Some('r') => out.push_str(&arg.try_repr()?),
            Some('d' | 'i') if matches!(arg, RuntimeValue::BigInt(_)) => {
                out.push_str(&arg.to_string())
            }
            Some(spec @ ('d' | 'i' | 'f')) => {
                let number = arg.as_number().ok_or_else(|| {
                    RuntimeError::type_error(format!(
                        "%{} format: a real number is required, not {}",
                        spec,
                        arg.type_name()
                    ))
                })?;
                match (spec, number) {
                    ('f', n) => out.push_str(&format!("{:.6}", n.to_f64())),
                    (_, Number::Int(n)) => out.push_str(&n.to_string()),
                    (_, Number::Float(n)) => out.push_str(&format!("{}", n.trunc() as i64)),
                }
            }
            Some(other) => {
                return Err(RuntimeError::value_error(format!(
                    "unsupported format character '{}'",
                    other
                )));
            }
            None => return Err(RuntimeError::value_error("incomplete format")),
        }
    }
    if args.next().is_some() {
        return Err(RuntimeError::type_error(
            "not all arguments converted during string formatting",
        ));
    }
    Ok(RuntimeValue::Str(out))
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

pub fn compare(
    op: CompareOperator,
    left: &RuntimeValue,
    right: &RuntimeValue,
) -> Result<bool, RuntimeError> {
    Ok(match op {
        CompareOperator::Equal => left.try_eq(right)?,
        CompareOperator::NotEqual => !left.try_eq(right)?,
        CompareOperator::Is => left.is_same(right),
        CompareOperator::IsNot => !left.is_same(right),
        CompareOperator::In => contains(right, left)?,
        CompareOperator::NotIn => !contains(right, left)?,
        CompareOperator::Less => order(left, right, "<")? == Some(Ordering::Less),
        CompareOperator::LessOrEqual => matches!(
            order(left, right, "<=")?,
            Some(Ordering::Less | Ordering::Equal)
        ),
        CompareOperator::Greater => order(left, right, ">")? == Some(Ordering::Greater),
        CompareOperator::GreaterOrEqual => matches!(
            order(left, right, ">=")?,
            Some(Ordering::Greater | Ordering::Equal)
        ),
    })
}

/// Ordering between two values; `None` when they are unordered (NaN).
pub fn order(
    left: &RuntimeValue,
    right: &RuntimeValue,
    symbol: &str,
) -> Result<Option<Ordering>, RuntimeError> {
    use RuntimeValue as V;

    if let Some((a, b)) = big_operands(left, right) {
        return Ok(Some(a.cmp(&b)));
    }
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return Ok(match (a, b) {
            (Number::Int(x), Number::Int(y)) => Some(x.cmp(&y)),
            _ => a.to_f64().partial_cmp(&b.to_f64()),
        });
    }
    match (left, right) {
        (V::Str(a), V::Str(b)) => Ok(Some(a.cmp(b))),
        (V::List(a), V::List(b)) => order_sequences(&a.borrow(), &b.borrow(), symbol),
        (V::Tuple(a), V::Tuple(b)) => order_sequences(a, b, symbol),
        _ => Err(RuntimeError::type_error(format!(
            "'{}' not supported between instances of '{}' and '{}'",
            symbol,
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn order_sequences(
    left: &[RuntimeValue],
    right: &[RuntimeValue],
    symbol: &str,
) -> Result<Option<Ordering>, RuntimeError> {
    for (a, b) in left.iter().zip(right) {
        if !a.try_eq(b)? {
            return order(a, b, symbol);
        }
    }
    Ok(Some(left.len().cmp(&right.len())))
}

/// The `in` operator, with the container on the left.
pub fn contains(container: &RuntimeValue, item: &RuntimeValue) -> Result<bool, RuntimeError> {
    match container {
        RuntimeValue::Str(haystack) => match item {
            RuntimeValue::Str(needle) => Ok(haystack.contains(needle.as_str())),
            other => Err(RuntimeError::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        RuntimeValue::List(items) => contains_item(&items.borrow(), item),
        RuntimeValue::Tuple(items) => contains_item(items, item),
        RuntimeValue::Dict(dict) => dict.borrow().contains(item),
        RuntimeValue::Range(range) => Ok(match item.as_number() {
            Some(Number::Int(n)) => range.contains(n),
            Some(Number::Float(f)) => f.fract() == 0.0 && range.contains(f as i64),
            None => false,
        }),
        other => Err(RuntimeError::type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

fn contains_item(items: &[RuntimeValue], item: &RuntimeValue) -> Result<bool, RuntimeError> {
    for candidate in items {
        if candidate.try_eq(item)? {
            return Ok(true);
        }
    }
    Ok(false)
}

// ---------------------------------------------------------------------------
// Indexing
// ---------------------------------------------------------------------------

/// Integer view used for indices and repetition counts.
pub fn as_index(value: &RuntimeValue) -> Option<i64> {
    match value {
        RuntimeValue::Int(n) => Some(*n),
        RuntimeValue::Bool(b) => Some(*b as i64),
        _ => None,
    }
}

fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let index = if index < 0 { index + len } else { index };
    (0..len).contains(&index).then_some(index as usize)
}

fn sequence_index(
    container: &RuntimeValue,
    index: &RuntimeValue,
    len: usize,
) -> Result<usize, RuntimeError> {
    let name = container.type_name();
    if let RuntimeValue::BigInt(_) = index {
        return Err(RuntimeError::index_error(
            "cannot fit 'int' into an index-sized integer",
        ));
    }
    let raw = as_index(index).ok_or_else(|| {
        RuntimeError::type_error(format!(
            "{} indices must be integers or slices, not {}",
            name,
            index.type_name()
        ))
    })?;
    normalize_index(raw, len).ok_or_else(|| {
        let what = match container {
            RuntimeValue::Str(_) => "string",
            RuntimeValue::Range(_) => "range object",
            _ => name,
        };
        RuntimeError::index_error(format!("{} index out of range", what))
    })
}

fn key_error(key: &RuntimeValue) -> RuntimeError {
    RuntimeError::new(ErrorKind::KeyError, key.repr())
}

pub fn get_item(container: &RuntimeValue, index: &RuntimeValue) -> Result<RuntimeValue, RuntimeError> {
    match container {
        RuntimeValue::List(items) => {
            let items = items.borrow();
            let i = sequence_index(container, index, items.len())?;
            Ok(items[i].clone())
        }
        RuntimeValue::Tuple(items) => {
            let i = sequence_index(container, index, items.len())?;
            Ok(items[i].clone())
        }
        RuntimeValue::Str(s) => {
            let count = s.chars().count();
            let i = sequence_index(container, index, count)?;
            Ok(RuntimeValue::Str(
                s.chars().nth(i).map(String::from).unwrap_or_default(),
            ))
        }
        RuntimeValue::Range(range) => {
            let i = sequence_index(container, index, range.len())?;
            Ok(RuntimeValue::Int(range.start + range.step * i as i64))
        }
        RuntimeValue::Dict(dict) => dict.borrow().get(index)?.ok_or_else(|| key_error(index)),
        other => Err(RuntimeError::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

pub fn set_item(
    container: &RuntimeValue,
    index: &RuntimeValue,
    value: RuntimeValue,
) -> Result<(), RuntimeError> {
    match container {
        RuntimeValue::List(items) => {
            let len = items.borrow().len();
            let i = sequence_index(container, index, len)?;
            items.borrow_mut()[i] = value;
            Ok(())
        }
        RuntimeValue::Dict(dict) => dict.borrow_mut().insert(index.clone(), value),
        other => Err(RuntimeError::type_error(format!(
            "'{}' object does not support item assignment",
            other.type_name()
        ))),
    }
}

pub fn delete_item(container: &RuntimeValue, index: &RuntimeValue) -> Result<(), RuntimeError> {
    match container {
        RuntimeValue::List(items) => {
            let len = items.borrow().len();
            let i = sequence_index(container, index, len)?;
            items.borrow_mut().remove(i);
            Ok(())
        }
        RuntimeValue::Dict(dict) => match dict.borrow_mut().remove(index)? {
            Some(_) => Ok(()),
            None => Err(key_error(index)),
        },
        other => Err(RuntimeError::type_error(format!(
            "'{}' object doesn't support item deletion",
            other.type_name()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Slicing
// ---------------------------------------------------------------------------

/// Clamp slice bounds to a sequence of `len` items, returning the effective
/// `(start, stop, step)`.
fn adjust_slice(
    len: usize,
    lower: Option<i64>,
    upper: Option<i64>,
    step: Option<i64>,
) -> Result<(i64, i64, i64), RuntimeError> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(RuntimeError::value_error("slice step cannot be zero"));
    }
    let len = len as i64;
    let clamp = |bound: i64, low: i64, high: i64| {
        if bound < 0 {
            (bound + len).max(low)
        } else {
            bound.min(high)
        }
    };
    Ok(if step > 0 {
        (
            lower.map_or(0, |b| clamp(b, 0, len)),
            upper.map_or(len, |b| clamp(b, 0, len)),
            step,
        )
    } else {
        (
            lower.map_or(len - 1, |b| clamp(b, -1, len - 1)),
            upper.map_or(-1, |b| clamp(b, -1, len - 1)),
            step,
        )
    })
}

fn slice_positions(start: i64, stop: i64, step: i64) -> impl Iterator<Item = usize> {
    let mut i = start;
    std::iter::from_fn(move || {
        let more = if step > 0 { i < stop } else { i > stop };
        if more {
            let current = i as usize;
            i += step;
            Some(current)
        } else {
            None
        }
    })
}

/// Convert a slice bound to an integer, treating `None` as absent.
pub fn slice_bound(value: &RuntimeValue) -> Result<Option<i64>, RuntimeError> {
    match value {
        RuntimeValue::None => Ok(None),
        other => as_index(other).map(Some).ok_or_else(|| {
            RuntimeError::type_error("slice indices must be integers or None")
        }),
    }
}

pub fn slice(
    container: &RuntimeValue,
    lower: Option<i64>,
    upper: Option<i64>,
    step: Option<i64>,
) -> Result<RuntimeValue, RuntimeError> {
    match container {
        RuntimeValue::List(items) => {
            let items = items.borrow();
            let (start, stop, step) = adjust_slice(items.len(), lower, upper, step)?;
            Ok(RuntimeValue::list(
                slice_positions(start, stop, step)
                    .map(|i| items[i].clone())
                    .collect(),
            ))
        }
        RuntimeValue::Tuple(items) => {
            let (start, stop, step) = adjust_slice(items.len(), lower, upper, step)?;
            Ok(RuntimeValue::tuple(
                slice_positions(start, stop, step)
                    .map(|i| items[i].clone())
                    .collect(),
            ))
        }
        RuntimeValue::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let (start, stop, step) = adjust_slice(chars.len(), lower, upper, step)?;
            Ok(RuntimeValue::Str(
                slice_positions(start, stop, step).map(|i| chars[i]).collect(),
            ))
        }
        RuntimeValue::Range(range) => {
            let (start, stop, step) = adjust_slice(range.len(), lower, upper, step)?;
            Ok(RuntimeValue::Range(Range {
                start: range.start + start * range.step,
                stop: range.start + stop * range.step,
                step: range.step * step,
            }))
        }
        other => Err(RuntimeError::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Iteration
// ---------------------------------------------------------------------------

/// A snapshot iterator over an iterable value. Ranges are produced lazily.
pub enum ValueIter {
    Items(std::vec::IntoIter<RuntimeValue>),
    Range(Range, usize),
}

impl Iterator for ValueIter {
    type Item = RuntimeValue;

    fn next(&mut self) -> Option<RuntimeValue> {
        match self {
            ValueIter::Items(items) => items.next(),
            ValueIter::Range(range, index) => {
                let value = range.get(*index)?;
                *index += 1;
                Some(RuntimeValue::Int(value))
            }
        }
    }
}

pub fn iterate(value: &RuntimeValue) -> Result<ValueIter, RuntimeError> {
    let items = match value {
        RuntimeValue::List(items) => items.borrow().clone(),
        RuntimeValue::Tuple(items) => items.to_vec(),
        RuntimeValue::Str(s) => s.chars().map(|c| RuntimeValue::Str(c.into())).collect(),
        RuntimeValue::Dict(dict) => dict.borrow().keys(),
        RuntimeValue::Range(range) => return Ok(ValueIter::Range(*range, 0)),
        other => {
            return Err(RuntimeError::type_error(format!(
                "'{}' object is not iterable",
                other.type_name()
            )));
        }
    };
    Ok(ValueIter::Items(items.into_iter()))
}

pub fn collect_items(value: &RuntimeValue) -> Result<Vec<RuntimeValue>, RuntimeError> {
    Ok(iterate(value)?.collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> RuntimeValue {
        RuntimeValue::Int(n)
    }

    #[test]
    fn floor_division_and_modulo_round_toward_negative_infinity() {
        let div = binary_op(BinaryOperator::FloorDivision, &int(-7), &int(2)).unwrap();
        let rem = binary_op(BinaryOperator::Modulo, &int(-7), &int(2)).unwrap();
        assert_eq!(div, int(-4));
        assert_eq!(rem, int(1));
        let rem = binary_op(BinaryOperator::Modulo, &int(7), &int(-2)).unwrap();
        assert_eq!(rem, int(-1));
    }

    #[test]
    fn integer_overflow_widens() {
        let product = binary_op(BinaryOperator::Multiplication, &int(i64::MAX), &int(2)).unwrap();
        assert_eq!(product.repr(), "18446744073709551614");
        let back = binary_op(BinaryOperator::FloorDivision, &product, &int(2)).unwrap();
        assert_eq!(back, int(i64::MAX));
        let negated = binary_op(BinaryOperator::FloorDivision, &int(i64::MIN), &int(-1)).unwrap();
        assert_eq!(negated.repr(), "9223372036854775808");
    }

    #[test]
    fn big_int_division_rounds_toward_negative_infinity() {
        let big = binary_op(BinaryOperator::Power, &int(-10), &int(19)).unwrap();
        let div = binary_op(BinaryOperator::FloorDivision, &big, &int(3)).unwrap();
        let rem = binary_op(BinaryOperator::Modulo, &big, &int(3)).unwrap();
        assert_eq!(div.repr(), "-3333333333333333334");
        assert_eq!(rem, int(2));
    }

    #[test]
    fn huge_powers_are_an_overflow() {
        let err = binary_op(BinaryOperator::Power, &int(10), &int(1 << 40)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::OverflowError);
        let one = binary_op(BinaryOperator::Power, &int(-1), &int(1 << 40)).unwrap();
        assert_eq!(one, int(1));
    }

    #[test]
    fn big_ints_order_against_small_ones() {
        let big = binary_op(BinaryOperator::Power, &int(2), &int(64)).unwrap();
        assert!(compare(CompareOperator::Greater, &big, &int(i64::MAX)).unwrap());
        assert!(!compare(CompareOperator::Equal, &big, &int(0)).unwrap());
        assert!(compare(CompareOperator::Less, &big, &RuntimeValue::Float(1e300)).unwrap());
    }

    #[test]
    fn sequence_repetition() {
        let list = RuntimeValue::list(vec![int(0)]);
        let repeated = binary_op(BinaryOperator::Multiplication, &list, &int(3)).unwrap();
        assert_eq!(repeated.repr(), "[0, 0, 0]");
        let pair = RuntimeValue::tuple(vec![int(1), RuntimeValue::str("a")]);
        let repeated = binary_op(BinaryOperator::Multiplication, &int(2), &pair).unwrap();
        assert_eq!(repeated.repr(), "(1, 'a', 1, 'a')");
    }

    #[test]
    fn percent_formatting() {
        let args = RuntimeValue::tuple(vec![RuntimeValue::str("x"), int(3)]);
        let out = binary_op(BinaryOperator::Modulo, &RuntimeValue::str("%s=%d%%"), &args).unwrap();
        assert_eq!(out, RuntimeValue::str("x=3%"));
    }

    #[test]
    fn slices_follow_sequence_rules() {
        let list = RuntimeValue::list((0..5).map(int).collect());
        let reversed = slice(&list, None, None, Some(-1)).unwrap();
        assert_eq!(reversed.repr(), "[4, 3, 2, 1, 0]");
        let tail = slice(&list, Some(-2), None, None).unwrap();
        assert_eq!(tail.repr(), "[3, 4]");
        let text = slice(&RuntimeValue::str("hello"), Some(1), Some(100), Some(2)).unwrap();
        assert_eq!(text, RuntimeValue::str("el"));
    }

    #[test]
    fn mixed_type_ordering_is_a_type_error() {
        let err = compare(CompareOperator::Less, &int(1), &RuntimeValue::str("a")).unwrap_err();
        assert_eq!(
            err.message,
            "'<' not supported between instances of 'int' and 'str'"
        );
    }

    #[test]
    fn missing_dict_key_reports_repr() {
        let dict = RuntimeValue::dict(Default::default());
        let err = get_item(&dict, &RuntimeValue::str("k")).unwrap_err();
        assert_eq!(err.to_string(), "KeyError: 'k'");
    }
}
