//! Capture specifications and the two capture disciplines.
//!
//! [`Pattern::capture`] queues its assignment on the needle so that it only
//! runs once the whole scan has succeeded. [`Pattern::capture_now`] assigns
//! on every sub-match, whether or not the overall match later fails.

use std::fmt;
use std::sync::Arc;

use crate::captures::Value;
use crate::match_result::MatchResult;
use crate::needle::Needle;

use super::Pattern;
use super::node::State;

/// Computes a capture's new value from the sub-match, its end offset and the
/// capture's previous value.
pub type CaptureFn = Arc<dyn Fn(&MatchResult, usize, Option<&Value>) -> Value + Send + Sync>;

/// What a capture node does with a sub-match.
///
/// Without a callback the new value is the [`MatchResult`] itself, appended
/// when the previous value is a [`Value::List`]. A capture without a name
/// still runs its callback, which makes it usable as a plain match hook.
#[derive(Clone, Default)]
pub struct Capture {
    name: Option<String>,
    initial: Option<Value>,
    callback: Option<CaptureFn>,
}

impl Capture {
    /// An anonymous capture; only useful together with [`Capture::with`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_owned()),
            ..Self::default()
        }
    }

    /// Value seen as "previous" while the name is still unbound.
    ///
    /// `Capture::named("items").initial(Value::List(vec![]))` collects every
    /// sub-match into a list.
    pub fn initial(mut self, value: impl Into<Value>) -> Self {
        self.initial = Some(value.into());
        self
    }

    pub fn with(
        mut self,
        callback: impl Fn(&MatchResult, usize, Option<&Value>) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.callback = Some(Arc::new(callback));
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Compute the new value for `matched` and bind it.
    pub(crate) fn assign(&self, needle: &mut Needle, matched: MatchResult, end: usize) {
        let previous = self
            .name
            .as_deref()
            .and_then(|name| needle.captures().get(name))
            .or(self.initial.as_ref());
        let value = match (&self.callback, previous) {
            (Some(callback), previous) => callback(&matched, end, previous),
            (None, Some(Value::List(items))) => {
                let mut items = items.clone();
                items.push(Value::Match(matched));
                Value::List(items)
            }
            (None, _) => Value::Match(matched),
        };
        if let Some(name) = &self.name {
            needle.capture(name, value);
        }
    }
}

impl From<&str> for Capture {
    fn from(name: &str) -> Self {
        Capture::named(name)
    }
}

impl fmt::Debug for Capture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capture")
            .field("name", &self.name)
            .field("initial", &self.initial)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// Capture on overall success: queue the assignment, undone by any pull
/// past it.
pub(super) fn on_success(
    inner: &Pattern,
    capture: &Arc<Capture>,
    needle: &mut Needle,
    state: Option<State>,
) -> Option<State> {
    let (start, prior) = match state {
        None => (needle.cursor(), None),
        Some(State::Deferred {
            checkpoint,
            start,
            inner,
        }) => {
            needle.pull(checkpoint);
            (start, Some(*inner))
        }
        Some(_) => return None,
    };
    let inner = inner.attempt(needle, prior)?;
    let end = needle.cursor();
    let checkpoint = needle.defer(capture.clone(), start, end);
    Some(State::Deferred {
        checkpoint,
        start,
        inner: Box::new(inner),
    })
}

/// Capture on every sub-match, immediately.
pub(super) fn on_match(
    inner: &Pattern,
    capture: &Capture,
    needle: &mut Needle,
    state: Option<State>,
) -> Option<State> {
    let (start, prior) = match state {
        None => (needle.cursor(), None),
        Some(State::Captured { start, inner }) => (start, Some(*inner)),
        Some(_) => return None,
    };
    let inner = inner.attempt(needle, prior)?;
    let end = needle.cursor();
    let matched = needle.matched(start, end);
    capture.assign(needle, matched, end);
    Some(State::Captured {
        start,
        inner: Box::new(inner),
    })
}
