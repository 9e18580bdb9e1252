use indexmap::IndexMap;
use indexmap::map::Iter;

use crate::runtime_value::RuntimeValue;

/// Key under which `exec` injects the builtin table.
pub const BUILTINS_KEY: &str = "__builtins__";

/// A mutable name → value mapping serving as both the global and the local
/// scope of executed code. Bindings keep their insertion order.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    bindings: IndexMap<String, RuntimeValue>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&RuntimeValue> {
        self.bindings.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: RuntimeValue) {
        self.bindings.insert(name.into(), value);
    }

    /// Remove a binding, keeping the order of the others.
    pub fn remove(&mut self, name: &str) -> Option<RuntimeValue> {
        self.bindings.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn iter(&self) -> Iter<'_, String, RuntimeValue> {
        self.bindings.iter()
    }
}

impl<'a> IntoIterator for &'a Namespace {
    type Item = (&'a String, &'a RuntimeValue);
    type IntoIter = Iter<'a, String, RuntimeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.bindings.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_keeps_insertion_order() {
        let mut ns = Namespace::new();
        ns.set("a", RuntimeValue::Int(1));
        ns.set(BUILTINS_KEY, RuntimeValue::None);
        ns.set("b", RuntimeValue::Int(2));
        assert!(ns.remove(BUILTINS_KEY).is_some());
        assert_eq!(ns.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(ns.remove(BUILTINS_KEY).is_none());
    }

    #[test]
    fn rebinding_keeps_position() {
        let mut ns = Namespace::new();
        ns.set("x", RuntimeValue::Int(1));
        ns.set("y", RuntimeValue::Int(2));
        ns.set("x", RuntimeValue::Int(3));
        assert_eq!(ns.names().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(ns.get("x"), Some(&RuntimeValue::Int(3)));
    }
}
