//! Subject text addressed by character index.
//!
//! All positions are **character** (not byte) indices. The byte offset table
//! lets regex leaves and result slicing work on the source `str`.

/// A subject string together with its char → byte offset table.
#[derive(Debug)]
pub(crate) struct Subject {
    text: String,
    chars: Vec<char>,
    /// Byte offset of every char, plus one trailing entry for `text.len()`.
    offsets: Vec<usize>,
}

impl Subject {
    pub fn new(text: &str) -> Self {
        let (offsets, chars): (Vec<usize>, Vec<char>) = text.char_indices().unzip();
        let mut offsets = offsets;
        offsets.push(text.len());
        Self {
            text: text.to_owned(),
            chars,
            offsets,
        }
    }

    /// Number of characters in the subject.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// The text between two char offsets (`start..end`, clamped to the subject).
    pub fn slice(&self, start: usize, end: usize) -> &str {
        let end = end.min(self.len());
        let start = start.min(end);
        &self.text[self.offsets[start]..self.offsets[end]]
    }

    /// The text from char offset `start` to the end of the subject.
    pub fn tail(&self, start: usize) -> &str {
        self.slice(start, self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_follow_multibyte_chars() {
        let s = Subject::new("aé€b");
        assert_eq!(s.len(), 4);
        assert_eq!(s.slice(1, 3), "é€");
        assert_eq!(s.tail(3), "b");
        assert_eq!(s.tail(4), "");
    }

    #[test]
    fn slice_is_clamped() {
        let s = Subject::new("abc");
        assert_eq!(s.slice(2, 10), "c");
        assert_eq!(s.slice(5, 1), "");
    }

    #[test]
    fn empty_subject() {
        let s = Subject::new("");
        assert_eq!(s.len(), 0);
        assert_eq!(s.tail(0), "");
    }
}
