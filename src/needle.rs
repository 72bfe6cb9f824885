//! Match cursor threaded through every pattern attempt.
//!
//! A [`Needle`] is created per scan and owned exclusively by it. It holds the
//! scan position together with all the ambient state pattern nodes share:
//! captures, the abort flag, the ignore-case flag and the queue of deferred
//! captures that only commit if the whole scan succeeds.
//!
//! Every backtrack point follows the same discipline: [`Needle::push`] (or
//! [`Needle::defer`]) returns a [`Checkpoint`] of the state before the
//! change, and [`Needle::pull`] puts that state back.

use std::sync::Arc;

use crate::captures::{Captures, Value};
use crate::match_result::MatchResult;
use crate::pattern::Capture;
use crate::subject::Subject;

/// Needle state saved before a push, restored by a pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Checkpoint {
    match_start: Option<usize>,
    cursor: usize,
    deferred: usize,
    ignore_case: bool,
}

impl Checkpoint {
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

/// A capture queued by an on-success capture node.
#[derive(Debug)]
struct Deferred {
    capture: Arc<Capture>,
    start: usize,
    end: usize,
}

#[derive(Debug)]
pub(crate) struct Needle {
    subject: Arc<Subject>,
    cursor: usize,
    /// Set by the first push that consumes input; zero-width nodes never set it.
    match_start: Option<usize>,
    captures: Captures,
    aborted: bool,
    ignore_case: bool,
    deferred: Vec<Deferred>,
}

impl Needle {
    pub fn new(subject: Arc<Subject>) -> Self {
        Self {
            subject,
            cursor: 0,
            match_start: None,
            captures: Captures::new(),
            aborted: false,
            ignore_case: false,
            deferred: Vec::new(),
        }
    }

    /// Prepare for an attempt at a new start offset.
    ///
    /// Captures survive: immediate captures from earlier offsets stay visible.
    pub fn reset(&mut self, offset: usize, ignore_case: bool) {
        self.cursor = offset;
        self.match_start = None;
        self.ignore_case = ignore_case;
        self.deferred.clear();
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Chars left between the cursor and the end of the subject.
    pub fn remaining(&self) -> usize {
        self.subject.len() - self.cursor
    }

    /// The unconsumed part of the subject.
    pub fn rest(&self) -> &[char] {
        &self.subject.chars()[self.cursor..]
    }

    /// The unconsumed part of the subject as text.
    pub fn tail(&self) -> &str {
        self.subject.tail(self.cursor)
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().first().copied()
    }

    /// Does the unconsumed text start with `text`? Honours the ignore-case flag.
    pub fn looking_at(&self, text: &[char]) -> bool {
        let rest = self.rest();
        rest.len() >= text.len()
            && rest.iter().zip(text).all(|(a, b)| {
                if self.ignore_case {
                    a.eq_ignore_ascii_case(b)
                } else {
                    a == b
                }
            })
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            match_start: self.match_start,
            cursor: self.cursor,
            deferred: self.deferred.len(),
            ignore_case: self.ignore_case,
        }
    }

    /// Consume `len` chars. The caller must have checked `len <= remaining()`.
    pub fn push(&mut self, len: usize) -> Checkpoint {
        let checkpoint = self.checkpoint();
        if len > 0 {
            self.match_start.get_or_insert(self.cursor);
        }
        self.cursor += len;
        checkpoint
    }

    /// Queue `capture` over `start..end`, to be assigned if the scan succeeds.
    pub fn defer(&mut self, capture: Arc<Capture>, start: usize, end: usize) -> Checkpoint {
        let checkpoint = self.checkpoint();
        self.deferred.push(Deferred {
            capture,
            start,
            end,
        });
        checkpoint
    }

    /// Undo everything since `checkpoint` was taken.
    pub fn pull(&mut self, checkpoint: Checkpoint) {
        self.match_start = checkpoint.match_start;
        self.cursor = checkpoint.cursor;
        self.deferred.truncate(checkpoint.deferred);
        self.ignore_case = checkpoint.ignore_case;
    }

    pub fn abort(&mut self) {
        self.aborted = true;
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    pub fn set_ignore_case(&mut self, ignore_case: bool) {
        self.ignore_case = ignore_case;
    }

    pub fn captures(&self) -> &Captures {
        &self.captures
    }

    pub fn capture(&mut self, name: &str, value: Value) {
        self.captures.insert(name, value);
    }

    pub fn restore_captures(&mut self, snapshot: Captures) {
        self.captures = snapshot;
    }

    pub fn into_captures(self) -> Captures {
        self.captures
    }

    /// A result for `start..end` carrying the current captures.
    pub fn matched(&self, start: usize, end: usize) -> MatchResult {
        MatchResult::new(self.subject.clone(), start, end, self.captures.clone())
    }

    /// Run the deferred captures in match order and build the overall result.
    pub fn commit(&mut self) -> MatchResult {
        for Deferred {
            capture,
            start,
            end,
        } in std::mem::take(&mut self.deferred)
        {
            let matched = self.matched(start, end);
            capture.assign(self, matched, end);
        }
        let start = self.match_start.unwrap_or(self.cursor);
        self.matched(start, self.cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn needle(s: &str) -> Needle {
        Needle::new(Arc::new(Subject::new(s)))
    }

    #[test]
    fn push_then_pull_restores_position() {
        let mut n = needle("abcdef");
        let first = n.push(2);
        let second = n.push(3);
        assert_eq!(n.cursor(), 5);
        n.pull(second);
        assert_eq!(n.cursor(), 2);
        n.pull(first);
        assert_eq!(n.cursor(), 0);
    }

    #[test]
    fn zero_width_push_leaves_match_start_unset() {
        let mut n = needle("abc");
        n.reset(1, false);
        n.push(0);
        assert_eq!(n.commit().start(), 1);
        n.reset(1, false);
        n.push(0);
        n.push(2);
        let m = n.commit();
        assert_eq!((m.start(), m.end()), (1, 3));
        assert_eq!(m.as_str(), "bc");
    }

    #[test]
    fn pull_restores_ignore_case() {
        let mut n = needle("abc");
        let cp = n.push(0);
        n.set_ignore_case(true);
        n.pull(cp);
        assert!(!n.ignore_case());
    }

    #[test]
    fn looking_at_respects_ignore_case() {
        let mut n = needle("Hello");
        let hello: Vec<char> = "hello".chars().collect();
        assert!(!n.looking_at(&hello));
        n.set_ignore_case(true);
        assert!(n.looking_at(&hello));
        let longer: Vec<char> = "hello!".chars().collect();
        assert!(!n.looking_at(&longer));
    }

    #[test]
    fn pull_drops_later_deferred_captures() {
        let mut n = needle("abc");
        let capture = Arc::new(Capture::named("x"));
        let before = n.defer(capture.clone(), 0, 1);
        n.defer(capture, 0, 2);
        n.pull(before);
        n.push(1);
        n.commit();
        assert_eq!(n.captures().get("x"), None);
    }

    #[test]
    fn commit_runs_deferred_in_order() {
        let mut n = needle("abc");
        let capture = Arc::new(Capture::named("x"));
        n.defer(capture.clone(), 0, 1);
        n.defer(capture, 0, 2);
        n.push(2);
        n.commit();
        assert_eq!(n.captures().get("x").map(Value::to_text), Some("ab".to_owned()));
    }
}
