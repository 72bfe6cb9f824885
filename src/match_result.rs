//! The immutable result of a successful scan or sub-match.

use std::fmt;
use std::sync::Arc;

use crate::captures::{Captures, Value};
use crate::subject::Subject;

/// A matched span of a subject plus the captures visible when it was taken.
///
/// Spans are half-open char ranges: `start..end`. A zero-length match has
/// `start == end`.
#[derive(Clone)]
pub struct MatchResult {
    subject: Arc<Subject>,
    start: usize,
    end: usize,
    captures: Captures,
}

impl MatchResult {
    pub(crate) fn new(subject: Arc<Subject>, start: usize, end: usize, captures: Captures) -> Self {
        Self {
            subject,
            start,
            end,
            captures,
        }
    }

    /// Char offset of the first matched character.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Char offset one past the last matched character.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Matched length in chars.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The matched text.
    pub fn as_str(&self) -> &str {
        self.subject.slice(self.start, self.end)
    }

    /// The whole subject the match was taken from.
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    pub fn captures(&self) -> &Captures {
        &self.captures
    }

    /// Shorthand for `self.captures().get(name)`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.captures.get(name)
    }

    /// The subject with the matched span replaced by `replacement`.
    pub fn replace_match_with(&self, replacement: &str) -> String {
        let before = self.subject.slice(0, self.start);
        let after = self.subject.tail(self.end);
        let mut out = String::with_capacity(before.len() + replacement.len() + after.len());
        out.push_str(before);
        out.push_str(replacement);
        out.push_str(after);
        out
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchResult")
            .field("text", &self.as_str())
            .field("start", &self.start)
            .field("end", &self.end)
            .field("captures", &self.captures)
            .finish()
    }
}

/// Two results are equal when they cover the same span of equal subjects.
/// Captures are not compared.
impl PartialEq for MatchResult {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start
            && self.end == other.end
            && self.subject.as_str() == other.subject.as_str()
    }
}

impl PartialEq<&str> for MatchResult {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl PartialEq<str> for MatchResult {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}
