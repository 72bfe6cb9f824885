//! Capture environment: the name → value bindings visible during a scan.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use itertools::Itertools;

use crate::match_result::MatchResult;
use crate::pattern::Pattern;

/// A value bound to a capture name.
///
/// Captures default to the [`MatchResult`] of the sub-match that produced
/// them. Callbacks may store anything else, including patterns, which a later
/// [`Pattern::named`] reference will then match against.
#[derive(Debug, Clone)]
pub enum Value {
    Text(String),
    Int(i64),
    Match(MatchResult),
    List(Vec<Value>),
    Pattern(Pattern),
}

impl Value {
    /// Render the value as subject text. Lists concatenate their items and
    /// patterns render as the empty string.
    pub fn to_text(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Int(n) => n.to_string(),
            Value::Match(m) => m.as_str().to_owned(),
            Value::List(items) => items.iter().map(Value::to_text).join(""),
            Value::Pattern(_) => String::new(),
        }
    }

    /// Interpret the value as an integer. Text is parsed after trimming.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Match(m) => m.as_str().trim().parse().ok(),
            Value::List(_) | Value::Pattern(_) => None,
        }
    }

    pub fn as_match(&self) -> Option<&MatchResult> {
        match self {
            Value::Match(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Use the value as a pattern: stored patterns as-is, anything else as a
    /// literal of its text.
    pub fn to_pattern(&self) -> Pattern {
        match self {
            Value::Pattern(p) => p.clone(),
            other => Pattern::literal(&other.to_text()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::List(items) => write!(f, "[{}]", items.iter().join(", ")),
            Value::Pattern(p) => write!(f, "{p}"),
            other => f.write_str(&other.to_text()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Pattern(a), Value::Pattern(b)) => a.ptr_eq(b),
            (Value::List(_) | Value::Pattern(_), _) | (_, Value::List(_) | Value::Pattern(_)) => {
                false
            }
            (a, b) => a.to_text() == b.to_text(),
        }
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        !matches!(self, Value::List(_) | Value::Pattern(_)) && self.to_text() == *other
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<MatchResult> for Value {
    fn from(m: MatchResult) -> Self {
        Value::Match(m)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Pattern> for Value {
    fn from(p: Pattern) -> Self {
        Value::Pattern(p)
    }
}

/// Name → last committed value.
///
/// Cloned wholesale to snapshot before a [`Pattern::reference`] call and
/// restored afterwards, so nested calls cannot leak bindings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Captures {
    bindings: BTreeMap<String, Value>,
}

impl Captures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn insert(&mut self, name: &str, value: Value) {
        self.bindings.insert(name.to_owned(), value);
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.bindings.iter()
    }
}

impl<'a> IntoIterator for &'a Captures {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_text_flattens_lists() {
        let v = Value::List(vec!["ab".into(), Value::Int(3), "c".into()]);
        assert_eq!(v.to_text(), "ab3c");
        assert_eq!(v.to_string(), "[ab, 3, c]");
    }

    #[test]
    fn as_int_parses_text() {
        assert_eq!(Value::from(" 42 ").as_int(), Some(42));
        assert_eq!(Value::from("x").as_int(), None);
        assert_eq!(Value::Int(-3).as_int(), Some(-3));
    }

    #[test]
    fn text_and_int_compare_by_text() {
        assert_eq!(Value::Int(7), Value::from("7"));
        assert_eq!(Value::from("abc"), "abc");
        assert_ne!(Value::List(vec![]), "");
    }

    #[test]
    fn insert_replaces_previous_binding() {
        let mut c = Captures::new();
        c.insert("x", "one".into());
        c.insert("x", "two".into());
        assert_eq!(c.len(), 1);
        assert_eq!(c.get("x"), Some(&Value::from("two")));
        assert!(c.contains("x"));
        assert!(!c.contains("y"));
    }

    #[test]
    fn iteration_is_name_ordered() {
        let mut c = Captures::new();
        c.insert("b", Value::Int(2));
        c.insert("a", Value::Int(1));
        let names: Vec<&str> = c.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }
}
