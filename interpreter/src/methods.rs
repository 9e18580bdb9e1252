//! Methods of the built-in container and string types.

use std::cell::RefCell;
use std::rc::Rc;

use crate::builtins::sort_values;
use crate::error::{ErrorKind, RuntimeError};
use crate::evaluator_helpers::{as_index, collect_items};
use crate::executor::Interpreter;
use crate::runtime_value::{BoundMethod, CallArgs, Dict, Number, RuntimeValue};

const LIST_METHODS: &[&str] = &[
    "append", "clear", "copy", "count", "extend", "index", "insert", "pop", "remove", "reverse",
    "sort",
];
const TUPLE_METHODS: &[&str] = &["count", "index"];
const DICT_METHODS: &[&str] = &[
    "clear", "copy", "get", "items", "keys", "pop", "popitem", "setdefault", "update", "values",
];
const STR_METHODS: &[&str] = &[
    "capitalize", "count", "endswith", "find", "format", "index", "isalpha", "isdigit", "isspace",
    "join", "lower", "lstrip", "replace", "rstrip", "split", "splitlines", "startswith", "strip",
    "title", "upper",
];

/// Resolve `receiver.attr` to a bound method.
pub fn lookup(receiver: &RuntimeValue, attr: &str) -> Result<RuntimeValue, RuntimeError> {
    let table: &[&'static str] = match receiver {
        RuntimeValue::List(_) => LIST_METHODS,
        RuntimeValue::Tuple(_) => TUPLE_METHODS,
        RuntimeValue::Dict(_) => DICT_METHODS,
        RuntimeValue::Str(_) => STR_METHODS,
        RuntimeValue::Exception(exc) if attr == "args" => {
            return Ok(RuntimeValue::tuple(exc.args.clone()));
        }
        _ => &[],
    };
    match table.iter().find(|name| **name == attr) {
        Some(&name) => Ok(RuntimeValue::Method(Rc::new(BoundMethod {
            receiver: receiver.clone(),
            name,
        }))),
        None => Err(RuntimeError::new(
            ErrorKind::AttributeError,
            format!(
                "'{}' object has no attribute '{}'",
                receiver.type_name(),
                attr
            ),
        )),
    }
}

pub fn call_method(
    interp: &mut Interpreter<'_>,
    receiver: &RuntimeValue,
    name: &str,
    args: CallArgs,
) -> Result<RuntimeValue, RuntimeError> {
    match receiver {
        RuntimeValue::List(items) => list_method(interp, items, name, args),
        RuntimeValue::Tuple(items) => sequence_method(items, "tuple", name, args),
        RuntimeValue::Dict(dict) => dict_method(dict, name, args),
        RuntimeValue::Str(s) => str_method(s, name, args),
        other => Err(RuntimeError::new(
            ErrorKind::AttributeError,
            format!("'{}' object has no attribute '{}'", other.type_name(), name),
        )),
    }
}

// ---------------------------------------------------------------------------
// list / tuple
// ---------------------------------------------------------------------------

fn list_method(
    interp: &mut Interpreter<'_>,
    items: &Rc<RefCell<Vec<RuntimeValue>>>,
    name: &str,
    mut args: CallArgs,
) -> Result<RuntimeValue, RuntimeError> {
    let method = format!("list.{}", name);
    match name {
        "append" => {
            args.check_arity(&method, 1, 1)?;
            let value = args.positional.remove(0);
            items.borrow_mut().push(value);
        }
        "extend" => {
            args.check_arity(&method, 1, 1)?;
            let extra = collect_items(&args.positional[0])?;
            items.borrow_mut().extend(extra);
        }
        "insert" => {
            args.check_arity(&method, 2, 2)?;
            let index = integer_arg(&args.positional[0])?;
            let value = args.positional.remove(1);
            let len = items.borrow().len() as i64;
            let index = if index < 0 { (index + len).max(0) } else { index.min(len) };
            items.borrow_mut().insert(index as usize, value);
        }
        "pop" => {
            args.check_arity(&method, 0, 1)?;
            let len = items.borrow().len() as i64;
            if len == 0 {
                return Err(RuntimeError::index_error("pop from empty list"));
            }
            let index = match args.positional.first() {
                Some(value) => integer_arg(value)?,
                None => -1,
            };
            let index = if index < 0 { index + len } else { index };
            if !(0..len).contains(&index) {
                return Err(RuntimeError::index_error("pop index out of range"));
            }
            return Ok(items.borrow_mut().remove(index as usize));
        }
        "remove" => {
            args.check_arity(&method, 1, 1)?;
            let position = items.borrow().iter().position(|v| v == &args.positional[0]);
            match position {
                Some(index) => {
                    items.borrow_mut().remove(index);
                }
                None => {
                    return Err(RuntimeError::value_error("list.remove(x): x not in list"));
                }
            }
        }
        "reverse" => {
            args.check_arity(&method, 0, 0)?;
            items.borrow_mut().reverse();
        }
        "sort" => {
            let key = args.take_keyword("key");
            let reverse = args
                .take_keyword("reverse")
                .is_some_and(|value| value.is_truthy());
            args.check_arity(&method, 0, 0)?;
            let current = items.borrow().clone();
            let sorted = sort_values(interp, current, key, reverse)?;
            *items.borrow_mut() = sorted;
        }
        "copy" => {
            args.check_arity(&method, 0, 0)?;
            return Ok(RuntimeValue::list(items.borrow().clone()));
        }
        "clear" => {
            args.check_arity(&method, 0, 0)?;
            items.borrow_mut().clear();
        }
        _ => {
            let snapshot = items.borrow().clone();
            return sequence_method(&snapshot, "list", name, args);
        }
    }
    Ok(RuntimeValue::None)
}

fn sequence_method(
    items: &[RuntimeValue],
    type_name: &str,
    name: &str,
    args: CallArgs,
) -> Result<RuntimeValue, RuntimeError> {
    let method = format!("{}.{}", type_name, name);
    args.check_arity(&method, 1, 1)?;
    let needle = &args.positional[0];
    match name {
        "count" => Ok(RuntimeValue::Int(
            items.iter().filter(|v| *v == needle).count() as i64,
        )),
        "index" => items
            .iter()
            .position(|v| v == needle)
            .map(|i| RuntimeValue::Int(i as i64))
            .ok_or_else(|| {
                RuntimeError::value_error(format!("{} is not in {}", needle.repr(), type_name))
            }),
        _ => Err(RuntimeError::new(
            ErrorKind::AttributeError,
            format!("'{}' object has no attribute '{}'", type_name, name),
        )),
    }
}

fn integer_arg(value: &RuntimeValue) -> Result<i64, RuntimeError> {
    as_index(value).ok_or_else(|| {
        RuntimeError::type_error(format!(
            "'{}' object cannot be interpreted as an integer",
            value.type_name()
        ))
    })
}

// ---------------------------------------------------------------------------
// dict
// ---------------------------------------------------------------------------

fn dict_method(
    dict: &Rc<RefCell<Dict>>,
    name: &str,
    mut args: CallArgs,
) -> Result<RuntimeValue, RuntimeError> {
    let method = format!("dict.{}", name);
    match name {
        "get" => {
            args.check_arity(&method, 1, 2)?;
            let found = dict.borrow().get(&args.positional[0])?;
            Ok(found.unwrap_or_else(|| args.positional.get(1).cloned().unwrap_or(RuntimeValue::None)))
        }
        "keys" => {
            args.check_arity(&method, 0, 0)?;
            Ok(RuntimeValue::list(dict.borrow().keys()))
        }
        "values" => {
            args.check_arity(&method, 0, 0)?;
            Ok(RuntimeValue::list(dict.borrow().values()))
        }
        "items" => {
            args.check_arity(&method, 0, 0)?;
            let pairs = dict
                .borrow()
                .items()
                .into_iter()
                .map(|(k, v)| RuntimeValue::tuple(vec![k, v]))
                .collect();
            Ok(RuntimeValue::list(pairs))
        }
        "pop" => {
            args.check_arity(&method, 1, 2)?;
            let removed = dict.borrow_mut().remove(&args.positional[0])?;
            match (removed, args.positional.get(1)) {
                (Some(value), _) => Ok(value),
                (None, Some(default)) => Ok(default.clone()),
                (None, None) => Err(RuntimeError::new(
                    ErrorKind::KeyError,
                    args.positional[0].repr(),
                )),
            }
        }
        "popitem" => {
            args.check_arity(&method, 0, 0)?;
            let last = dict.borrow_mut().pop_last();
            last.map(|(k, v)| RuntimeValue::tuple(vec![k, v])).ok_or_else(|| {
                RuntimeError::new(ErrorKind::KeyError, "'popitem(): dictionary is empty'")
            })
        }
        "setdefault" => {
            args.check_arity(&method, 1, 2)?;
            let key = args.positional[0].clone();
            if let Some(existing) = dict.borrow().get(&key)? {
                return Ok(existing);
            }
            let default = args.positional.get(1).cloned().unwrap_or(RuntimeValue::None);
            dict.borrow_mut().insert(key, default.clone())?;
            Ok(default)
        }
        "update" => {
            let keywords = std::mem::take(&mut args.keywords);
            args.check_arity(&method, 0, 1)?;
            let pairs = match args.positional.first() {
                Some(source) => pairs_of(source)?,
                None => Vec::new(),
            };
            let mut dict = dict.borrow_mut();
            for (key, value) in pairs {
                dict.insert(key, value)?;
            }
            for (key, value) in keywords {
                dict.insert(RuntimeValue::Str(key), value)?;
            }
            Ok(RuntimeValue::None)
        }
        "copy" => {
            args.check_arity(&method, 0, 0)?;
            Ok(RuntimeValue::dict(dict.borrow().clone()))
        }
        "clear" => {
            args.check_arity(&method, 0, 0)?;
            dict.borrow_mut().clear();
            Ok(RuntimeValue::None)
        }
        _ => Err(RuntimeError::new(
            ErrorKind::AttributeError,
            format!("'dict' object has no attribute '{}'", name),
        )),
    }
}

/// Key/value pairs from a dict or from an iterable of two-item sequences.
pub(crate) fn pairs_of(
    source: &RuntimeValue,
) -> Result<Vec<(RuntimeValue, RuntimeValue)>, RuntimeError> {
    if let RuntimeValue::Dict(dict) = source {
        return Ok(dict.borrow().items());
    }
    collect_items(source)?
        .iter()
        .enumerate()
        .map(|(i, element)| {
            let mut pair = collect_items(element)?;
            if pair.len() != 2 {
                return Err(RuntimeError::value_error(format!(
                    "dictionary update sequence element #{} has length {}; 2 is required",
                    i,
                    pair.len()
                )));
            }
            let value = pair.pop().unwrap_or(RuntimeValue::None);
            let key = pair.pop().unwrap_or(RuntimeValue::None);
            Ok((key, value))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// str
// ---------------------------------------------------------------------------

fn str_arg<'v>(value: &'v RuntimeValue, method: &str) -> Result<&'v str, RuntimeError> {
    match value {
        RuntimeValue::Str(s) => Ok(s),
        other => Err(RuntimeError::type_error(format!(
            "{}() argument must be str, not {}",
            method,
            other.type_name()
        ))),
    }
}

fn strings(parts: impl IntoIterator<Item = String>) -> RuntimeValue {
    RuntimeValue::list(parts.into_iter().map(RuntimeValue::Str).collect())
}

fn str_method(s: &str, name: &str, mut args: CallArgs) -> Result<RuntimeValue, RuntimeError> {
    let method = format!("str.{}", name);
    if name == "format" {
        let keywords = std::mem::take(&mut args.keywords);
        return Ok(RuntimeValue::Str(format_str(s, &args.positional, &keywords)?));
    }
    if name == "split" {
        let sep = args.take_keyword("sep");
        let maxsplit = args.take_keyword("maxsplit");
        args.check_arity(&method, 0, 2)?;
        let mut positional = args.positional.into_iter();
        let sep = positional.next().or(sep).unwrap_or(RuntimeValue::None);
        let maxsplit = match positional.next().or(maxsplit) {
            Some(value) => integer_arg(&value)?,
            None => -1,
        };
        return split(s, &sep, maxsplit);
    }

    let value = match name {
        "upper" | "lower" | "title" | "capitalize" | "splitlines" | "isalpha" | "isdigit"
        | "isspace" => {
            args.check_arity(&method, 0, 0)?;
            match name {
                "upper" => RuntimeValue::str(s.to_uppercase()),
                "lower" => RuntimeValue::str(s.to_lowercase()),
                "title" => RuntimeValue::str(title_case(s)),
                "capitalize" => {
                    let mut chars = s.chars();
                    RuntimeValue::str(match chars.next() {
                        Some(first) => {
                            first.to_uppercase().collect::<String>()
                                + &chars.as_str().to_lowercase()
                        }
                        None => String::new(),
                    })
                }
                "splitlines" => strings(s.lines().map(String::from)),
                "isalpha" => RuntimeValue::Bool(!s.is_empty() && s.chars().all(char::is_alphabetic)),
                "isdigit" => RuntimeValue::Bool(!s.is_empty() && s.chars().all(|c| c.is_ascii_digit())),
                _ => RuntimeValue::Bool(!s.is_empty() && s.chars().all(char::is_whitespace)),
            }
        }
        "strip" | "lstrip" | "rstrip" => {
            args.check_arity(&method, 0, 1)?;
            let chars: Option<Vec<char>> = match args.positional.first() {
                None | Some(RuntimeValue::None) => None,
                Some(value) => Some(str_arg(value, &method)?.chars().collect()),
            };
            let matches = |c: char| match &chars {
                Some(set) => set.contains(&c),
                None => c.is_whitespace(),
            };
            RuntimeValue::str(match name {
                "strip" => s.trim_matches(matches),
                "lstrip" => s.trim_start_matches(matches),
                _ => s.trim_end_matches(matches),
            })
        }
        "join" => {
            args.check_arity(&method, 1, 1)?;
            let items = collect_items(&args.positional[0])?;
            let mut parts = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    RuntimeValue::Str(part) => parts.push(part.as_str()),
                    other => {
                        return Err(RuntimeError::type_error(format!(
                            "sequence item {}: expected str instance, {} found",
                            i,
                            other.type_name()
                        )));
                    }
                }
            }
            RuntimeValue::str(parts.join(s))
        }
        "replace" => {
            args.check_arity(&method, 2, 3)?;
            let old = str_arg(&args.positional[0], &method)?;
            let new = str_arg(&args.positional[1], &method)?;
            match args.positional.get(2).map(integer_arg).transpose()? {
                Some(count) if count >= 0 => RuntimeValue::str(s.replacen(old, new, count as usize)),
                _ => RuntimeValue::str(s.replace(old, new)),
            }
        }
        "startswith" | "endswith" => {
            args.check_arity(&method, 1, 1)?;
            let candidates = match &args.positional[0] {
                RuntimeValue::Tuple(items) => items.to_vec(),
                other => vec![other.clone()],
            };
            let mut found = false;
            for candidate in &candidates {
                let affix = str_arg(candidate, &method)?;
                found |= if name == "startswith" {
                    s.starts_with(affix)
                } else {
                    s.ends_with(affix)
                };
            }
            RuntimeValue::Bool(found)
        }
        "find" | "index" => {
            args.check_arity(&method, 1, 1)?;
            let needle = str_arg(&args.positional[0], &method)?;
            match s.find(needle) {
                Some(byte) => RuntimeValue::Int(s[..byte].chars().count() as i64),
                None if name == "find" => RuntimeValue::Int(-1),
                None => return Err(RuntimeError::value_error("substring not found")),
            }
        }
        "count" => {
            args.check_arity(&method, 1, 1)?;
            let needle = str_arg(&args.positional[0], &method)?;
            if needle.is_empty() {
                RuntimeValue::Int(s.chars().count() as i64 + 1)
            } else {
                RuntimeValue::Int(s.matches(needle).count() as i64)
            }
        }
        _ => {
            return Err(RuntimeError::new(
                ErrorKind::AttributeError,
                format!("'str' object has no attribute '{}'", name),
            ));
        }
    };
    Ok(value)
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut previous_cased = false;
    for c in s.chars() {
        if previous_cased {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        previous_cased = c.is_alphabetic();
    }
    out
}

fn split(s: &str, sep: &RuntimeValue, maxsplit: i64) -> Result<RuntimeValue, RuntimeError> {
    match sep {
        RuntimeValue::None => {
            if maxsplit < 0 {
                return Ok(strings(s.split_whitespace().map(String::from)));
            }
            let mut parts = Vec::new();
            let mut rest = s.trim_start();
            while !rest.is_empty() {
                if parts.len() as i64 == maxsplit {
                    parts.push(rest.to_string());
                    break;
                }
                match rest.find(char::is_whitespace) {
                    Some(end) => {
                        parts.push(rest[..end].to_string());
                        rest = rest[end..].trim_start();
                    }
                    None => {
                        parts.push(rest.to_string());
                        break;
                    }
                }
            }
            Ok(strings(parts))
        }
        RuntimeValue::Str(sep) if sep.is_empty() => {
            Err(RuntimeError::value_error("empty separator"))
        }
        RuntimeValue::Str(sep) => Ok(if maxsplit < 0 {
            strings(s.split(sep.as_str()).map(String::from))
        } else {
            strings(s.splitn(maxsplit as usize + 1, sep.as_str()).map(String::from))
        }),
        other => Err(RuntimeError::type_error(format!(
            "must be str or None, not {}",
            other.type_name()
        ))),
    }
}

// ---- str.format ----

fn format_str(
    template: &str,
    args: &[RuntimeValue],
    kwargs: &[(String, RuntimeValue)],
) -> Result<String, RuntimeError> {
    let mut out = String::with_capacity(template.len());
    let mut next_auto = 0;
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => field.push(c),
                        None => {
                            return Err(RuntimeError::value_error(
                                "expected '}' before end of string",
                            ));
                        }
                    }
                }
                let (field, spec) = field.split_once(':').unwrap_or((field.as_str(), ""));
                let (name, conversion) = match field.split_once('!') {
                    Some((name, conversion)) => (name, Some(conversion)),
                    None => (field, None),
                };
                let value = if name.is_empty() {
                    next_auto += 1;
                    positional_field(args, next_auto - 1)?
                } else if let Ok(index) = name.parse::<usize>() {
                    positional_field(args, index)?
                } else {
                    kwargs
                        .iter()
                        .find(|(key, _)| key == name)
                        .map(|(_, value)| value)
                        .ok_or_else(|| RuntimeError::new(ErrorKind::KeyError, format!("'{}'", name)))?
                };
                let converted;
                let value = match conversion {
                    Some("r") => {
                        converted = RuntimeValue::Str(value.try_repr()?);
                        &converted
                    }
                    Some("s") => {
                        converted = RuntimeValue::Str(value.try_str()?);
                        &converted
                    }
                    Some(other) => {
                        return Err(RuntimeError::value_error(format!(
                            "Unknown conversion specifier {}",
                            other
                        )));
                    }
                    None => value,
                };
                out.push_str(&apply_format_spec(value, spec)?);
            }
            '}' => {
                return Err(RuntimeError::value_error(
                    "Single '}' encountered in format string",
                ));
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

fn positional_field(args: &[RuntimeValue], index: usize) -> Result<&RuntimeValue, RuntimeError> {
    args.get(index).ok_or_else(|| {
        RuntimeError::index_error(format!(
            "Replacement index {} out of range for positional args tuple",
            index
        ))
    })
}

/// `[[fill]align][0][width][,][.precision][type]` for the `s d f %` types.
fn apply_format_spec(value: &RuntimeValue, spec: &str) -> Result<String, RuntimeError> {
    if spec.is_empty() {
        return value.try_str();
    }
    let chars: Vec<char> = spec.chars().collect();
    let mut i = 0;
    let is_align = |c: char| matches!(c, '<' | '>' | '^');
    let (mut fill, mut align) = (' ', None);
    if chars.len() >= 2 && is_align(chars[1]) {
        (fill, align) = (chars[0], Some(chars[1]));
        i = 2;
    } else if is_align(chars[0]) {
        align = Some(chars[0]);
        i = 1;
    }
    if align.is_none() && chars.get(i) == Some(&'0') {
        (fill, align) = ('0', Some('>'));
        i += 1;
    }
    let mut width = 0usize;
    while let Some(d) = chars.get(i).and_then(|c| c.to_digit(10)) {
        width = width * 10 + d as usize;
        i += 1;
    }
    let grouping = chars.get(i) == Some(&',');
    if grouping {
        i += 1;
    }
    let mut precision = None;
    if chars.get(i) == Some(&'.') {
        i += 1;
        let mut digits = 0usize;
        while let Some(d) = chars.get(i).and_then(|c| c.to_digit(10)) {
            digits = digits * 10 + d as usize;
            i += 1;
        }
        precision = Some(digits);
    }
    let kind = chars.get(i).copied();
    if i + kind.map_or(0, |_| 1) != chars.len() {
        return Err(RuntimeError::value_error("Invalid format specifier"));
    }

    let number = value.as_number();
    let unknown = |code: char| {
        RuntimeError::value_error(format!(
            "Unknown format code '{}' for object of type '{}'",
            code,
            value.type_name()
        ))
    };
    let mut body = match (kind, number) {
        (None | Some('d'), _) if matches!(value, RuntimeValue::BigInt(_)) => value.to_string(),
        (Some('f'), Some(n)) => format!("{:.*}", precision.unwrap_or(6), n.to_f64()),
        (Some('%'), Some(n)) => format!("{:.*}%", precision.unwrap_or(6), n.to_f64() * 100.0),
        (Some('d'), Some(Number::Int(n))) => n.to_string(),
        (None, Some(Number::Float(n))) if precision.is_some() => {
            format!("{:.*}", precision.unwrap_or(6), n)
        }
        (None | Some('s'), _) => {
            let text = value.try_str()?;
            match (precision, number) {
                (Some(p), None) => text.chars().take(p).collect(),
                _ => text,
            }
        }
        (Some(code), _) => return Err(unknown(code)),
    };
    if grouping {
        body = group_thousands(&body);
    }

    let len = body.chars().count();
    if len >= width {
        return Ok(body);
    }
    let pad = width - len;
    let align = align.unwrap_or(if number.is_some() { '>' } else { '<' });
    let repeat = |n: usize| fill.to_string().repeat(n);
    Ok(match align {
        '<' => body + &repeat(pad),
        '^' => repeat(pad / 2) + &body + &repeat(pad - pad / 2),
        _ if fill == '0' && body.starts_with('-') => format!("-{}{}", repeat(pad), &body[1..]),
        _ => repeat(pad) + &body,
    })
}

fn group_thousands(number: &str) -> String {
    let (sign, rest) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let split = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    let (digits, tail) = rest.split_at(split);
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{}{}{}", sign, grouped, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_fields_and_specs() {
        let args = [RuntimeValue::str("pi"), RuntimeValue::Float(3.14159)];
        let out = format_str("{} = {:.2f}", &args, &[]).unwrap();
        assert_eq!(out, "pi = 3.14");
        let out = format_str("{1}|{0!r}|{{}}", &args, &[]).unwrap();
        assert_eq!(out, "3.14159|'pi'|{}");
        let kwargs = [("n".to_string(), RuntimeValue::Int(1234567))];
        assert_eq!(format_str("{n:,}", &[], &kwargs).unwrap(), "1,234,567");
        assert_eq!(format_str("{n:>10}", &[], &kwargs).unwrap(), "   1234567");
        assert_eq!(
            format_str("[{:^7}]", &[RuntimeValue::str("ab")], &[]).unwrap(),
            "[  ab   ]"
        );
        assert_eq!(format_str("{:05d}", &[RuntimeValue::Int(-42)], &[]).unwrap(), "-0042");
    }

    #[test]
    fn format_big_ints() {
        let big = RuntimeValue::from_ibig(dashu_int::IBig::from(10u8).pow(20));
        assert_eq!(
            format_str("{:,}", &[big.clone()], &[]).unwrap(),
            "100,000,000,000,000,000,000"
        );
        assert_eq!(
            format_str("{:d}|{}", &[big.clone(), big], &[]).unwrap(),
            "100000000000000000000|100000000000000000000"
        );
    }

    #[test]
    fn format_errors() {
        assert!(format_str("{", &[], &[]).is_err());
        let err = format_str("{0}", &[], &[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IndexError);
    }

    #[test]
    fn split_variants() {
        let sep = RuntimeValue::str(",");
        assert_eq!(split("a,b,,c", &sep, -1).unwrap().repr(), "['a', 'b', '', 'c']");
        assert_eq!(split("a,b,c", &sep, 1).unwrap().repr(), "['a', 'b,c']");
        assert_eq!(
            split("  one two  three ", &RuntimeValue::None, -1).unwrap().repr(),
            "['one', 'two', 'three']"
        );
        assert_eq!(
            split("one two three", &RuntimeValue::None, 1).unwrap().repr(),
            "['one', 'two three']"
        );
    }

    #[test]
    fn unknown_attribute() {
        let err = lookup(&RuntimeValue::Int(1), "real").unwrap_err();
        assert_eq!(err.to_string(), "AttributeError: 'int' object has no attribute 'real'");
    }
}
