//! Leaf matchers.
//!
//! Most leaves have a single alternative: they push on the first attempt and
//! pull (then fail) when asked for another. `Arb`, `Span`, `BreakX` and
//! `Succeed` produce further alternatives on backtrack.

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::needle::Needle;

use super::char_class::CharSet;
use super::node::{Source, State};
use super::param::Param;

/// A regular expression anchored at the cursor.
///
/// Both a case-sensitive and a case-insensitive build are kept so the
/// needle's ignore-case flag can be honoured per attempt.
pub(crate) struct RegexLeaf {
    source: String,
    exact: Regex,
    folded: Regex,
}

impl RegexLeaf {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let anchored = format!(r"\A(?:{source})");
        Ok(Self {
            source: source.to_owned(),
            exact: Regex::new(&anchored)?,
            folded: RegexBuilder::new(&anchored).case_insensitive(true).build()?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Length in chars of the match at the cursor, if any.
    fn match_len(&self, needle: &Needle) -> Option<usize> {
        let regex = if needle.ignore_case() {
            &self.folded
        } else {
            &self.exact
        };
        let tail = needle.tail();
        regex.find(tail).map(|m| tail[..m.end()].chars().count())
    }
}

/// Single alternative: consume `len` chars, or fail; undo on backtrack.
fn once(
    needle: &mut Needle,
    state: Option<State>,
    len: impl FnOnce(&mut Needle) -> Option<usize>,
) -> Option<State> {
    match state {
        None => {
            let len = len(needle)?;
            (len <= needle.remaining()).then(|| State::Pushed(needle.push(len)))
        }
        Some(State::Pushed(checkpoint)) => {
            needle.pull(checkpoint);
            None
        }
        Some(_) => None,
    }
}

/// Single alternative, zero width: succeed once if `test` holds.
fn zero_width(
    needle: &mut Needle,
    state: Option<State>,
    test: impl FnOnce(&mut Needle) -> Option<bool>,
) -> Option<State> {
    match state {
        None => test(needle)?.then_some(State::Zero),
        Some(_) => None,
    }
}

pub(super) fn literal(text: &[char], needle: &mut Needle, state: Option<State>) -> Option<State> {
    once(needle, state, |needle| {
        needle.looking_at(text).then_some(text.len())
    })
}

pub(super) fn regex(regex: &RegexLeaf, needle: &mut Needle, state: Option<State>) -> Option<State> {
    once(needle, state, |needle| regex.match_len(needle))
}

// ─── Character classes ───────────────────────────────────────────────────────

pub(super) fn any(
    set: &Param<CharSet>,
    needle: &mut Needle,
    state: Option<State>,
) -> Option<State> {
    once(needle, state, |needle| {
        let set = set.resolve(needle)?;
        needle.peek().filter(|&ch| set.contains(ch)).map(|_| 1)
    })
}

pub(super) fn not_any(
    set: &Param<CharSet>,
    needle: &mut Needle,
    state: Option<State>,
) -> Option<State> {
    once(needle, state, |needle| {
        let set = set.resolve(needle)?;
        needle.peek().filter(|&ch| !set.contains(ch)).map(|_| 1)
    })
}

/// The longest non-empty run of members first, one char shorter per backtrack.
pub(super) fn span(
    set: &Param<CharSet>,
    needle: &mut Needle,
    state: Option<State>,
) -> Option<State> {
    let len = match state {
        None => {
            let set = set.resolve(needle)?;
            set.run_len(needle.rest(), true)
        }
        Some(State::Run { next, checkpoint }) => {
            needle.pull(checkpoint);
            next
        }
        Some(_) => return None,
    };
    if len == 0 {
        return None;
    }
    let checkpoint = needle.push(len);
    Some(State::Run {
        next: len - 1,
        checkpoint,
    })
}

/// Everything up to the next member, or to the end of the subject.
pub(super) fn break_at(
    set: &Param<CharSet>,
    needle: &mut Needle,
    state: Option<State>,
) -> Option<State> {
    once(needle, state, |needle| {
        let set = set.resolve(needle)?;
        Some(set.run_len(needle.rest(), false))
    })
}

/// Like `break_at`, but each backtrack steps over the member it stopped at
/// and breaks on the following one.
pub(super) fn breakx(
    set: &Param<CharSet>,
    needle: &mut Needle,
    state: Option<State>,
) -> Option<State> {
    let from = match state {
        None => 0,
        Some(State::Run { next, checkpoint }) => {
            needle.pull(checkpoint);
            next
        }
        Some(_) => return None,
    };
    let set = set.resolve(needle)?;
    let rest = needle.rest();
    if from > rest.len() {
        return None;
    }
    let len = from + set.run_len(&rest[from..], false);
    let checkpoint = needle.push(len);
    Some(State::Run {
        next: len + 1,
        checkpoint,
    })
}

// ─── Length and position ─────────────────────────────────────────────────────

/// Zero chars first, one more per backtrack.
pub(super) fn arb(needle: &mut Needle, state: Option<State>) -> Option<State> {
    let len = match state {
        None => 0,
        Some(State::Run { next, checkpoint }) => {
            needle.pull(checkpoint);
            next
        }
        Some(_) => return None,
    };
    if len > needle.remaining() {
        return None;
    }
    let checkpoint = needle.push(len);
    Some(State::Run {
        next: len + 1,
        checkpoint,
    })
}

pub(super) fn rem(needle: &mut Needle, state: Option<State>) -> Option<State> {
    once(needle, state, |needle| Some(needle.remaining()))
}

pub(super) fn len(n: &Param<usize>, needle: &mut Needle, state: Option<State>) -> Option<State> {
    once(needle, state, |needle| n.resolve(needle))
}

pub(super) fn pos(n: &Param<usize>, needle: &mut Needle, state: Option<State>) -> Option<State> {
    zero_width(needle, state, |needle| {
        n.resolve(needle).map(|n| needle.cursor() == n)
    })
}

pub(super) fn rpos(n: &Param<usize>, needle: &mut Needle, state: Option<State>) -> Option<State> {
    zero_width(needle, state, |needle| {
        n.resolve(needle).map(|n| needle.remaining() == n)
    })
}

/// Up to absolute offset `n`; fails if the cursor is already past it.
pub(super) fn tab(n: &Param<usize>, needle: &mut Needle, state: Option<State>) -> Option<State> {
    once(needle, state, |needle| {
        n.resolve(needle)?.checked_sub(needle.cursor())
    })
}

/// Up to `n` chars before the end; fails if fewer than `n` remain.
pub(super) fn rtab(n: &Param<usize>, needle: &mut Needle, state: Option<State>) -> Option<State> {
    once(needle, state, |needle| {
        let n = n.resolve(needle)?;
        needle.remaining().checked_sub(n)
    })
}

// ─── Control ─────────────────────────────────────────────────────────────────

/// Zero width, matches again on every backtrack.
pub(super) fn succeed(needle: &mut Needle, state: Option<State>) -> Option<State> {
    if let Some(State::Pushed(checkpoint)) = state {
        needle.pull(checkpoint);
    }
    Some(State::Pushed(needle.push(0)))
}

/// Zero width going forward; backtracking into it aborts the whole scan.
pub(super) fn fence(needle: &mut Needle, state: Option<State>) -> Option<State> {
    match state {
        None => Some(State::Zero),
        Some(_) => {
            debug!(cursor = needle.cursor(), "backtracked into FENCE, aborting scan");
            needle.abort();
            None
        }
    }
}

/// Commit to the first match of the source; never retried.
pub(super) fn fence_with(
    source: &Source,
    needle: &mut Needle,
    state: Option<State>,
) -> Option<State> {
    match state {
        None => {
            let checkpoint = needle.checkpoint();
            let pattern = source.resolve(needle);
            pattern
                .attempt(needle, None)
                .map(|_| State::Committed(checkpoint))
        }
        Some(State::Committed(checkpoint)) => {
            needle.pull(checkpoint);
            None
        }
        Some(_) => None,
    }
}
