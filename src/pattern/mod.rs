//! Composable, resumable pattern values.
//!
//! A [`Pattern`] is an immutable tree of matching nodes behind an [`Arc`]:
//! cloning is cheap and the same pattern can be scanned any number of times,
//! from any number of threads.
//!
//! # Building patterns
//!
//! | Constructor / operator         | SNOBOL4        | Matches                                      |
//! |--------------------------------|----------------|----------------------------------------------|
//! | [`Pattern::literal`], `&str`   | `'text'`       | The text itself                              |
//! | [`Pattern::regex`]             |                | A regular expression anchored at the cursor  |
//! | [`Pattern::any`]               | `ANY(s)`       | One char in `s`                              |
//! | [`Pattern::not_any`]           | `NOTANY(s)`    | One char not in `s`                          |
//! | [`Pattern::span`]              | `SPAN(s)`      | Longest non-empty run of chars in `s`        |
//! | [`Pattern::break_at`]          | `BREAK(s)`     | Everything up to the next char in `s`        |
//! | [`Pattern::breakx`]            | `BREAKX(s)`    | `BREAK`, extended past a member on backtrack |
//! | [`Pattern::arb`]               | `ARB`          | Anything, shortest first                     |
//! | [`Pattern::rem`]               | `REM`          | The rest of the subject                      |
//! | [`Pattern::len`]               | `LEN(n)`       | Exactly `n` chars                            |
//! | [`Pattern::pos`] / `rpos`      | `POS(n)`       | Zero width, at offset `n` (from the end)     |
//! | [`Pattern::tab`] / `rtab`      | `TAB(n)`       | Up to offset `n` (from the end)              |
//! | [`Pattern::succeed`]           | `SUCCEED`      | Empty, on every retry                        |
//! | [`Pattern::fail`]              | `FAIL`         | Nothing                                      |
//! | [`Pattern::abort`]             | `ABORT`        | Nothing, and stops the whole scan            |
//! | [`Pattern::fence`]             | `FENCE`        | Empty; backtracking into it stops the scan   |
//! | [`Pattern::fence_with`]        | `FENCE(p)`     | First match of `p`, never retried            |
//! | [`Pattern::arbno`]             | `ARBNO(p)`     | Zero or more `p`, most first                 |
//! | `a & b`                        | `a b`          | `a` then `b`                                 |
//! | `a \| b`                       | `a \| b`       | `a`, else `b`                                |
//! | `-a`                           |                | `a`, ignoring ASCII case                     |
//! | [`Pattern::capture`]           | `a . name`     | `a`; binds `name` if the scan succeeds       |
//! | [`Pattern::capture_now`]       | `a $ name`     | `a`; binds `name` on every match of `a`      |
//! | [`Pattern::named`]             | `*name`        | Whatever `name` is bound to                  |
//! | [`Pattern::deferred`]          |                | The pattern a closure returns, at match time |

pub mod capture;
pub mod char_class;
pub mod param;

mod node;
mod primitives;


use std::fmt;
use std::ops::{BitAnd, BitOr, Neg};
use std::sync::{Arc, OnceLock};

use crate::needle::Needle;

pub use capture::{Capture, CaptureFn};
pub use char_class::CharSet;
pub use param::{Param, ParamValue};

use node::{Node, Source, State};
use primitives::RegexLeaf;

#[derive(Clone)]
pub struct Pattern(Arc<Node>);

impl Pattern {
    fn node(node: Node) -> Self {
        Pattern(Arc::new(node))
    }

    /// Run one attempt of this pattern at the needle's cursor. See
    /// [`node`] for the protocol. An aborted needle fails every attempt.
    pub(crate) fn attempt(&self, needle: &mut Needle, state: Option<State>) -> Option<State> {
        if needle.is_aborted() {
            return None;
        }
        self.0.attempt(needle, state)
    }

    /// Do both handles share the same tree?
    pub fn ptr_eq(&self, other: &Pattern) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    // ─── Leaves ──────────────────────────────────────────────────────────────

    pub fn literal(text: &str) -> Self {
        Self::node(Node::Literal(text.chars().collect()))
    }

    /// Matches the empty string, once.
    pub fn empty() -> Self {
        Self::literal("")
    }

    /// A regular expression, anchored at the cursor and matched against the
    /// rest of the subject.
    pub fn regex(source: &str) -> Result<Self, regex::Error> {
        Ok(Self::node(Node::Regex(RegexLeaf::new(source)?)))
    }

    pub fn any(chars: &str) -> Self {
        Self::any_with(chars.into())
    }

    pub fn any_with(chars: Param<CharSet>) -> Self {
        Self::node(Node::Any(chars))
    }

    pub fn not_any(chars: &str) -> Self {
        Self::not_any_with(chars.into())
    }

    pub fn not_any_with(chars: Param<CharSet>) -> Self {
        Self::node(Node::NotAny(chars))
    }

    pub fn span(chars: &str) -> Self {
        Self::span_with(chars.into())
    }

    pub fn span_with(chars: Param<CharSet>) -> Self {
        Self::node(Node::Span(chars))
    }

    pub fn break_at(chars: &str) -> Self {
        Self::break_at_with(chars.into())
    }

    pub fn break_at_with(chars: Param<CharSet>) -> Self {
        Self::node(Node::Break(chars))
    }

    pub fn breakx(chars: &str) -> Self {
        Self::breakx_with(chars.into())
    }

    pub fn breakx_with(chars: Param<CharSet>) -> Self {
        Self::node(Node::BreakX(chars))
    }

    pub fn arb() -> Self {
        Self::node(Node::Arb)
    }

    pub fn rem() -> Self {
        Self::node(Node::Rem)
    }

    pub fn len(n: usize) -> Self {
        Self::len_with(n.into())
    }

    pub fn len_with(n: Param<usize>) -> Self {
        Self::node(Node::Len(n))
    }

    pub fn pos(n: usize) -> Self {
        Self::pos_with(n.into())
    }

    pub fn pos_with(n: Param<usize>) -> Self {
        Self::node(Node::Pos(n))
    }

    pub fn rpos(n: usize) -> Self {
        Self::rpos_with(n.into())
    }

    pub fn rpos_with(n: Param<usize>) -> Self {
        Self::node(Node::RPos(n))
    }

    pub fn tab(n: usize) -> Self {
        Self::tab_with(n.into())
    }

    pub fn tab_with(n: Param<usize>) -> Self {
        Self::node(Node::Tab(n))
    }

    pub fn rtab(n: usize) -> Self {
        Self::rtab_with(n.into())
    }

    pub fn rtab_with(n: Param<usize>) -> Self {
        Self::node(Node::RTab(n))
    }

    pub fn succeed() -> Self {
        Self::node(Node::Succeed)
    }

    pub fn fail() -> Self {
        Self::node(Node::Fail)
    }

    pub fn abort() -> Self {
        Self::node(Node::Abort)
    }

    pub fn fence() -> Self {
        Self::node(Node::Fence(None))
    }

    pub fn fence_with(pattern: impl Into<Pattern>) -> Self {
        Self::node(Node::Fence(Some(Source::Fixed(pattern.into()))))
    }

    // ─── Combinators ─────────────────────────────────────────────────────────

    /// `self` followed by `next`.
    pub fn then(self, next: impl Into<Pattern>) -> Self {
        let next = next.into();
        match &*self.0 {
            Node::Concat(children) => {
                let mut children = children.clone();
                children.push(next);
                Self::node(Node::Concat(children))
            }
            _ => Self::node(Node::Concat(vec![self, next])),
        }
    }

    /// `self`, or else `alternative`.
    pub fn or(self, alternative: impl Into<Pattern>) -> Self {
        let alternative = alternative.into();
        match &*self.0 {
            Node::Choose(alternatives) => {
                let mut alternatives = alternatives.clone();
                alternatives.push(alternative);
                Self::node(Node::Choose(alternatives))
            }
            _ => Self::node(Node::Choose(vec![self, alternative])),
        }
    }

    /// Concatenate every pattern in order. Nothing at all matches the empty
    /// string.
    pub fn all_of<P: Into<Pattern>>(patterns: impl IntoIterator<Item = P>) -> Self {
        let children: Vec<Pattern> = patterns.into_iter().map(Into::into).collect();
        if children.is_empty() {
            Self::empty()
        } else {
            Self::node(Node::Concat(children))
        }
    }

    /// Try every pattern in order. Nothing at all never matches.
    pub fn any_of<P: Into<Pattern>>(patterns: impl IntoIterator<Item = P>) -> Self {
        let alternatives: Vec<Pattern> = patterns.into_iter().map(Into::into).collect();
        if alternatives.is_empty() {
            Self::fail()
        } else {
            Self::node(Node::Choose(alternatives))
        }
    }

    pub fn arbno(pattern: impl Into<Pattern>) -> Self {
        Self::node(Node::Arbno(Source::Fixed(pattern.into())))
    }

    /// `ARBNO(*name)`: repeat whatever `name` is bound to when reached.
    pub fn arbno_named(name: &str) -> Self {
        Self::node(Node::Arbno(Source::Named(name.to_owned())))
    }

    /// Repeat the pattern `resolve` returns when reached.
    pub fn arbno_deferred(resolve: impl Fn() -> Pattern + Send + Sync + 'static) -> Self {
        Self::node(Node::Arbno(Source::Lazy(Arc::new(resolve))))
    }

    /// Match `self` ignoring ASCII case.
    pub fn insensitive(self) -> Self {
        Self::node(Node::CaseInsensitive(self))
    }

    // ─── Captures and references ─────────────────────────────────────────────

    /// Bind the match of `self` once the whole scan has succeeded. Captures
    /// from alternatives that were tried and abandoned never appear.
    pub fn capture(self, capture: impl Into<Capture>) -> Self {
        Self::node(Node::OnSuccess(self, Arc::new(capture.into())))
    }

    /// Bind the match of `self` every time it matches, even if the scan then
    /// backtracks past it or fails.
    pub fn capture_now(self, capture: impl Into<Capture>) -> Self {
        Self::node(Node::OnMatch(self, Arc::new(capture.into())))
    }

    /// Match `pattern` in a capture scope of its own.
    pub fn reference(pattern: impl Into<Pattern>) -> Self {
        Self::node(Node::Match(Source::Fixed(pattern.into())))
    }

    /// Match whatever `name` is bound to when this node is reached: a stored
    /// [`Value::Pattern`](crate::Value::Pattern) as a pattern, any other value
    /// as a literal of its text. An unbound name matches the empty string.
    pub fn named(name: &str) -> Self {
        Self::node(Node::Match(Source::Named(name.to_owned())))
    }

    /// Match the pattern `resolve` returns, calling it each time this node is
    /// reached. This is how patterns refer to themselves.
    pub fn deferred(resolve: impl Fn() -> Pattern + Send + Sync + 'static) -> Self {
        Self::node(Node::Match(Source::Lazy(Arc::new(resolve))))
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<&str> for Pattern {
    fn from(text: &str) -> Self {
        Pattern::literal(text)
    }
}

impl From<String> for Pattern {
    fn from(text: String) -> Self {
        Pattern::literal(&text)
    }
}

impl From<&Pattern> for Pattern {
    fn from(pattern: &Pattern) -> Self {
        pattern.clone()
    }
}

impl<P: Into<Pattern>> BitAnd<P> for Pattern {
    type Output = Pattern;

    fn bitand(self, rhs: P) -> Pattern {
        self.then(rhs)
    }
}

impl<P: Into<Pattern>> BitOr<P> for Pattern {
    type Output = Pattern;

    fn bitor(self, rhs: P) -> Pattern {
        self.or(rhs)
    }
}

impl Neg for Pattern {
    type Output = Pattern;

    fn neg(self) -> Pattern {
        self.insensitive()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({})", self.0)
    }
}

/// A pattern that can be referred to before it is defined.
///
/// ```rust
/// use cannonbol::{Forward, Pattern};
///
/// // list = '(' item ARBNO(',' item) ')';  item = SPAN(digits) | list
/// let list = Forward::new();
/// let item = Pattern::span("0123456789") | list.pattern();
/// list.define(Pattern::from("(") & item.clone() & Pattern::arbno(Pattern::from(",") & item) & ")");
///
/// let anchored = Pattern::pos(0) & list.pattern() & Pattern::rpos(0);
/// assert!(anchored.scan("(1,(2,3))").is_some());
/// assert!(anchored.scan("(1,(2,3)").is_none());
/// ```
///
/// References hold the definition strongly, so a self-referential pattern is
/// a reference cycle: build it once and keep it.
#[derive(Clone, Default)]
pub struct Forward {
    slot: Arc<OnceLock<Pattern>>,
}

impl Forward {
    pub fn new() -> Self {
        Self::default()
    }

    /// A reference to the definition, resolved at match time. Until
    /// [`Forward::define`] is called it matches the empty string.
    pub fn pattern(&self) -> Pattern {
        let slot = self.slot.clone();
        Pattern::deferred(move || slot.get().cloned().unwrap_or_default())
    }

    /// Set the definition. Returns `false` (and changes nothing) if one was
    /// already set.
    pub fn define(&self, pattern: impl Into<Pattern>) -> bool {
        self.slot.set(pattern.into()).is_ok()
    }

    pub fn is_defined(&self) -> bool {
        self.slot.get().is_some()
    }
}

impl fmt::Debug for Forward {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Forward")
            .field("defined", &self.is_defined())
            .finish()
    }
}
