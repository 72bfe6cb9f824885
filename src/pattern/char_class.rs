//! Character sets for the Any/NotAny/Span/Break/BreakX primitives.
//!
//! Membership is plain `char` equality: no case folding, no Unicode classes.

use std::fmt;

use itertools::Itertools;

/// A set of characters, built from the characters of a string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharSet {
    /// Sorted and deduplicated.
    members: Vec<char>,
}

impl CharSet {
    pub fn new(chars: &str) -> Self {
        Self {
            members: chars.chars().sorted_unstable().dedup().collect(),
        }
    }

    pub fn contains(&self, ch: char) -> bool {
        self.members.binary_search(&ch).is_ok()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The members as a string, in char order.
    pub fn to_text(&self) -> String {
        self.members.iter().collect()
    }

    /// Length of the leading run of `text` whose chars are (`inside = true`)
    /// or are not (`inside = false`) members of the set.
    pub fn run_len(&self, text: &[char], inside: bool) -> usize {
        text.iter()
            .take_while(|&&ch| self.contains(ch) == inside)
            .count()
    }
}

impl From<&str> for CharSet {
    fn from(chars: &str) -> Self {
        CharSet::new(chars)
    }
}

/// Quoted, so a set renders the way it is written in a pattern.
impl fmt::Display for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_text())
    }
}
