//! Pattern nodes, their resumption state and the combinators.
//!
//! Every node implements one operation, [`Node::attempt`]:
//!
//! * with no prior state, try a first match at the needle's cursor;
//! * with the state returned by an earlier success, restore the needle to
//!   where that attempt started and produce the *next* alternative.
//!
//! `None` means there are no (more) alternatives and the needle is back where
//! the attempt started. That is what lets [`Node::Concat`] backtrack locally:
//! only the failing child's left neighbour is asked to try again.

use std::fmt;
use std::sync::Arc;

use itertools::Itertools;

use crate::needle::{Checkpoint, Needle};

use super::Pattern;
use super::capture::{self, Capture};
use super::char_class::CharSet;
use super::param::Param;
use super::primitives::{self, RegexLeaf};

/// Where a reference node gets its pattern from.
#[derive(Clone)]
pub(crate) enum Source {
    Fixed(Pattern),
    /// The current value of a capture, used as a pattern. Unbound = empty.
    Named(String),
    /// Evaluated every time the node is reached.
    Lazy(Arc<dyn Fn() -> Pattern + Send + Sync>),
}

impl Source {
    pub fn resolve(&self, needle: &Needle) -> Pattern {
        match self {
            Source::Fixed(pattern) => pattern.clone(),
            Source::Named(name) => needle
                .captures()
                .get(name)
                .map(|value| value.to_pattern())
                .unwrap_or_default(),
            Source::Lazy(resolve) => resolve(),
        }
    }
}

pub(crate) enum Node {
    Literal(Vec<char>),
    Regex(RegexLeaf),

    Any(Param<CharSet>),
    NotAny(Param<CharSet>),
    Span(Param<CharSet>),
    Break(Param<CharSet>),
    BreakX(Param<CharSet>),

    Arb,
    Rem,
    Len(Param<usize>),
    Pos(Param<usize>),
    RPos(Param<usize>),
    Tab(Param<usize>),
    RTab(Param<usize>),

    Succeed,
    Fail,
    Abort,
    /// Bare `Fence` when `None`, otherwise commit to the first match of the source.
    Fence(Option<Source>),

    Concat(Vec<Pattern>),
    Choose(Vec<Pattern>),
    Arbno(Source),
    CaseInsensitive(Pattern),

    OnSuccess(Pattern, Arc<Capture>),
    OnMatch(Pattern, Arc<Capture>),
    Match(Source),
}

/// What a node needs to produce its next alternative.
///
/// Opaque outside this module: callers only hand it back to the node that
/// produced it.
pub(crate) enum State {
    /// Single-alternative consuming leaves and `Succeed`.
    Pushed(Checkpoint),
    /// Zero-width, single-alternative nodes.
    Zero,
    /// `Arb`, `Span` and `BreakX`: the length (or scan start) for the next
    /// alternative.
    Run { next: usize, checkpoint: Checkpoint },
    /// `Fence(p)`: p matched and is not retried.
    Committed(Checkpoint),
    Concat(Vec<Option<State>>),
    Choose { index: usize, inner: Box<State> },
    /// Completed repetitions, each with the needle state before it.
    Arbno {
        pattern: Pattern,
        reps: Vec<(Checkpoint, State)>,
    },
    Case(Box<State>),
    Deferred {
        checkpoint: Checkpoint,
        start: usize,
        inner: Box<State>,
    },
    Captured { start: usize, inner: Box<State> },
    Match { pattern: Pattern, inner: Box<State> },
}

impl Node {
    pub fn attempt(&self, needle: &mut Needle, state: Option<State>) -> Option<State> {
        match self {
            Node::Literal(text) => primitives::literal(text, needle, state),
            Node::Regex(regex) => primitives::regex(regex, needle, state),
            Node::Any(set) => primitives::any(set, needle, state),
            Node::NotAny(set) => primitives::not_any(set, needle, state),
            Node::Span(set) => primitives::span(set, needle, state),
            Node::Break(set) => primitives::break_at(set, needle, state),
            Node::BreakX(set) => primitives::breakx(set, needle, state),
            Node::Arb => primitives::arb(needle, state),
            Node::Rem => primitives::rem(needle, state),
            Node::Len(n) => primitives::len(n, needle, state),
            Node::Pos(n) => primitives::pos(n, needle, state),
            Node::RPos(n) => primitives::rpos(n, needle, state),
            Node::Tab(n) => primitives::tab(n, needle, state),
            Node::RTab(n) => primitives::rtab(n, needle, state),
            Node::Succeed => primitives::succeed(needle, state),
            Node::Fail => None,
            Node::Abort => {
                needle.abort();
                None
            }
            Node::Fence(None) => primitives::fence(needle, state),
            Node::Fence(Some(source)) => primitives::fence_with(source, needle, state),
            Node::Concat(children) => concat(children, needle, state),
            Node::Choose(alternatives) => choose(alternatives, needle, state),
            Node::Arbno(source) => arbno(source, needle, state),
            Node::CaseInsensitive(inner) => case_insensitive(inner, needle, state),
            Node::OnSuccess(inner, spec) => capture::on_success(inner, spec, needle, state),
            Node::OnMatch(inner, spec) => capture::on_match(inner, spec, needle, state),
            Node::Match(source) => reference(source, needle, state),
        }
    }
}

// ─── Combinators ─────────────────────────────────────────────────────────────

/// Sequence. A child's failure asks its left neighbour for the next
/// alternative before the child is retried from scratch.
fn concat(children: &[Pattern], needle: &mut Needle, state: Option<State>) -> Option<State> {
    let n = children.len();
    let (mut slots, mut i) = match state {
        None => ((0..n).map(|_| None).collect::<Vec<_>>(), 0),
        Some(State::Concat(slots)) if n > 0 => (slots, n - 1),
        Some(_) => return None,
    };
    while i < n {
        let prior = slots[i].take();
        match children[i].attempt(needle, prior) {
            Some(next) => {
                slots[i] = Some(next);
                i += 1;
            }
            None if i == 0 => return None,
            None => i -= 1,
        }
    }
    Some(State::Concat(slots))
}

/// Alternation, in declaration order. Each alternative is exhausted before
/// the next one is tried.
fn choose(alternatives: &[Pattern], needle: &mut Needle, state: Option<State>) -> Option<State> {
    let (mut index, mut prior) = match state {
        None => (0, None),
        Some(State::Choose { index, inner }) => (index, Some(*inner)),
        Some(_) => return None,
    };
    while let Some(alternative) = alternatives.get(index) {
        if let Some(inner) = alternative.attempt(needle, prior.take()) {
            return Some(State::Choose {
                index,
                inner: Box::new(inner),
            });
        }
        index += 1;
    }
    None
}

/// Zero or more repetitions: greedy first, then the last repetition's next
/// alternative, then one repetition fewer. Every kept repetition consumes
/// something, so growth stops at the end of the subject.
fn arbno(source: &Source, needle: &mut Needle, state: Option<State>) -> Option<State> {
    let (pattern, mut reps) = match state {
        None => (source.resolve(needle), Vec::new()),
        Some(State::Arbno { pattern, mut reps }) => {
            let (checkpoint, last) = reps.pop()?;
            match consuming(&pattern, needle, checkpoint, Some(last)) {
                Some(next) => reps.push((checkpoint, next)),
                None if needle.is_aborted() => return None,
                None => return Some(State::Arbno { pattern, reps }),
            }
            (pattern, reps)
        }
        Some(_) => return None,
    };
    loop {
        let checkpoint = needle.checkpoint();
        match consuming(&pattern, needle, checkpoint, None) {
            Some(rep) => reps.push((checkpoint, rep)),
            None => break,
        }
    }
    if needle.is_aborted() {
        return None;
    }
    Some(State::Arbno { pattern, reps })
}

/// The next alternative of one repetition that moves past `checkpoint`,
/// skipping alternatives that match the empty string. `None` leaves the
/// needle at `checkpoint`.
fn consuming(
    pattern: &Pattern,
    needle: &mut Needle,
    checkpoint: Checkpoint,
    mut prior: Option<State>,
) -> Option<State> {
    loop {
        let rep = pattern.attempt(needle, prior)?;
        if needle.cursor() > checkpoint.cursor() {
            return Some(rep);
        }
        prior = Some(rep);
    }
}

/// Match `inner` with the ignore-case flag set, restoring the caller's flag
/// on the way out.
fn case_insensitive(inner: &Pattern, needle: &mut Needle, state: Option<State>) -> Option<State> {
    let prior = match state {
        None => None,
        Some(State::Case(inner)) => Some(*inner),
        Some(_) => return None,
    };
    let outer = needle.ignore_case();
    needle.set_ignore_case(true);
    let result = inner.attempt(needle, prior);
    needle.set_ignore_case(outer);
    result.map(|inner| State::Case(Box::new(inner)))
}

/// Match a referenced pattern in a capture scope of its own: whatever the
/// call binds is rolled back afterwards, success or failure.
fn reference(source: &Source, needle: &mut Needle, state: Option<State>) -> Option<State> {
    let (pattern, prior) = match state {
        None => (source.resolve(needle), None),
        Some(State::Match { pattern, inner }) => (pattern, Some(*inner)),
        Some(_) => return None,
    };
    let snapshot = needle.captures().clone();
    let result = pattern.attempt(needle, prior);
    needle.restore_captures(snapshot);
    result.map(|inner| State::Match {
        pattern,
        inner: Box::new(inner),
    })
}

// ─── Display ─────────────────────────────────────────────────────────────────

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Fixed(pattern) => write!(f, "{pattern}"),
            Source::Named(name) => write!(f, "*{name}"),
            Source::Lazy(_) => f.write_str("*?"),
        }
    }
}

/// SNOBOL4-flavoured rendering; parenthesised wherever precedence needs it.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Literal(text) => write!(f, "{:?}", text.iter().collect::<String>()),
            Node::Regex(regex) => write!(f, "/{}/", regex.source()),
            Node::Any(set) => write!(f, "ANY({set})"),
            Node::NotAny(set) => write!(f, "NOTANY({set})"),
            Node::Span(set) => write!(f, "SPAN({set})"),
            Node::Break(set) => write!(f, "BREAK({set})"),
            Node::BreakX(set) => write!(f, "BREAKX({set})"),
            Node::Arb => f.write_str("ARB"),
            Node::Rem => f.write_str("REM"),
            Node::Len(n) => write!(f, "LEN({n})"),
            Node::Pos(n) => write!(f, "POS({n})"),
            Node::RPos(n) => write!(f, "RPOS({n})"),
            Node::Tab(n) => write!(f, "TAB({n})"),
            Node::RTab(n) => write!(f, "RTAB({n})"),
            Node::Succeed => f.write_str("SUCCEED"),
            Node::Fail => f.write_str("FAIL"),
            Node::Abort => f.write_str("ABORT"),
            Node::Fence(None) => f.write_str("FENCE"),
            Node::Fence(Some(source)) => write!(f, "FENCE({source})"),
            Node::Concat(children) => {
                write!(f, "({})", children.iter().join(" "))
            }
            Node::Choose(alternatives) => {
                write!(f, "({})", alternatives.iter().join(" | "))
            }
            Node::Arbno(source) => write!(f, "ARBNO({source})"),
            Node::CaseInsensitive(inner) => write!(f, "-{inner}"),
            Node::OnSuccess(inner, capture) => {
                write!(f, "{inner} . {}", capture.name().unwrap_or("_"))
            }
            Node::OnMatch(inner, capture) => {
                write!(f, "{inner} $ {}", capture.name().unwrap_or("_"))
            }
            Node::Match(source) => write!(f, "MATCH({source})"),
        }
    }
}
