//! Parameters of the position, length and character-set primitives.
//!
//! A parameter is resolved each time its node is attempted, so it can follow
//! captures made earlier in the same scan or values that change between
//! scans.

use std::fmt;
use std::sync::Arc;

use crate::captures::Value;
use crate::needle::Needle;

use super::char_class::CharSet;

/// A value type a [`Param`] can produce and store back in a capture.
pub trait ParamValue: Clone + Send + Sync + 'static {
    fn from_value(value: &Value) -> Option<Self>;
    fn to_value(&self) -> Value;
}

impl ParamValue for usize {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_int().and_then(|n| usize::try_from(n).ok())
    }

    fn to_value(&self) -> Value {
        Value::Int(i64::try_from(*self).unwrap_or(i64::MAX))
    }
}

impl ParamValue for CharSet {
    fn from_value(value: &Value) -> Option<Self> {
        Some(CharSet::new(&value.to_text()))
    }

    fn to_value(&self) -> Value {
        Value::Text(self.to_text())
    }
}

#[derive(Clone)]
pub enum Param<T> {
    /// A value fixed at construction.
    Fixed(T),
    /// The current value of a capture, or `initial` while it is unbound.
    Capture { name: String, initial: Option<T> },
    /// Evaluated at match time.
    Lazy(Arc<dyn Fn() -> T + Send + Sync>),
    /// Read the capture (or `initial`), pass it through `update`, store the
    /// result back under `name` and use it. Each attempt advances the state.
    Stateful {
        name: String,
        initial: T,
        update: Arc<dyn Fn(T) -> T + Send + Sync>,
    },
}

impl<T: ParamValue> Param<T> {
    pub fn capture(name: &str) -> Self {
        Param::Capture {
            name: name.to_owned(),
            initial: None,
        }
    }

    pub fn capture_or(name: &str, initial: T) -> Self {
        Param::Capture {
            name: name.to_owned(),
            initial: Some(initial),
        }
    }

    pub fn lazy(f: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Param::Lazy(Arc::new(f))
    }

    pub fn stateful(
        name: &str,
        initial: T,
        update: impl Fn(T) -> T + Send + Sync + 'static,
    ) -> Self {
        Param::Stateful {
            name: name.to_owned(),
            initial,
            update: Arc::new(update),
        }
    }

    /// The parameter's value for this attempt. `None` when a capture holds
    /// something that does not convert, which fails the node.
    pub(crate) fn resolve(&self, needle: &mut Needle) -> Option<T> {
        match self {
            Param::Fixed(value) => Some(value.clone()),
            Param::Capture { name, initial } => match needle.captures().get(name) {
                Some(value) => T::from_value(value),
                None => initial.clone(),
            },
            Param::Lazy(f) => Some(f()),
            Param::Stateful {
                name,
                initial,
                update,
            } => {
                let current = match needle.captures().get(name) {
                    Some(value) => T::from_value(value)?,
                    None => initial.clone(),
                };
                let next = update(current);
                needle.capture(name, next.to_value());
                Some(next)
            }
        }
    }
}

impl<T> From<T> for Param<T> {
    fn from(value: T) -> Self {
        Param::Fixed(value)
    }
}

impl From<&str> for Param<CharSet> {
    fn from(chars: &str) -> Self {
        Param::Fixed(CharSet::new(chars))
    }
}

impl<T: fmt::Display> fmt::Display for Param<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Fixed(value) => write!(f, "{value}"),
            Param::Capture { name, .. } | Param::Stateful { name, .. } => write!(f, "*{name}"),
            Param::Lazy(_) => f.write_str("*?"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subject::Subject;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn needle() -> Needle {
        Needle::new(Arc::new(Subject::new("subject")))
    }

    #[test]
    fn fixed_value() {
        let mut n = needle();
        assert_eq!(Param::from(4usize).resolve(&mut n), Some(4));
    }

    #[test]
    fn capture_reads_binding_or_initial() {
        let mut n = needle();
        let p: Param<usize> = Param::capture_or("n", 2);
        assert_eq!(p.resolve(&mut n), Some(2));
        n.capture("n", Value::from("7"));
        assert_eq!(p.resolve(&mut n), Some(7));
    }

    #[test]
    fn unconvertible_capture_fails() {
        let mut n = needle();
        n.capture("n", Value::from("seven"));
        assert_eq!(Param::<usize>::capture("n").resolve(&mut n), None);
        n.capture("n", Value::Int(-1));
        assert_eq!(Param::<usize>::capture("n").resolve(&mut n), None);
    }

    #[test]
    fn unbound_capture_without_initial_fails() {
        let mut n = needle();
        assert_eq!(Param::<usize>::capture("missing").resolve(&mut n), None);
    }

    #[test]
    fn lazy_is_evaluated_every_time() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let p = Param::lazy(move || c.fetch_add(1, Ordering::SeqCst));
        let mut n = needle();
        assert_eq!(p.resolve(&mut n), Some(0));
        assert_eq!(p.resolve(&mut n), Some(1));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn stateful_writes_back() {
        let mut n = needle();
        let p = Param::stateful("i", 0usize, |i| i + 1);
        assert_eq!(p.resolve(&mut n), Some(1));
        assert_eq!(p.resolve(&mut n), Some(2));
        assert_eq!(n.captures().get("i"), Some(&Value::Int(2)));
    }

    #[test]
    fn charset_from_capture_text() {
        let mut n = needle();
        n.capture("delims", Value::from(",;"));
        let set = Param::<CharSet>::capture("delims").resolve(&mut n);
        assert_eq!(set, Some(CharSet::new(";,")));
    }
}
