//! The outer scan loop and its options.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, trace};

use crate::captures::{Captures, Value};
use crate::match_result::MatchResult;
use crate::needle::Needle;
use crate::pattern::Pattern;
use crate::subject::Subject;

/// How a scan is run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Only try start offset 0.
    pub anchor: bool,
    /// Compare literals and regexes ignoring ASCII case for the whole scan.
    pub ignore_case: bool,
    /// Report a failed match as [`ScanError::NoMatch`] instead of `None`.
    pub raise_error: bool,
    /// Return the subject with the matched span replaced by this text.
    pub replace_match_with: Option<String>,
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anchored(mut self) -> Self {
        self.anchor = true;
        self
    }

    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    pub fn raise_error(mut self) -> Self {
        self.raise_error = true;
        self
    }

    pub fn replace_with(mut self, replacement: &str) -> Self {
        self.replace_match_with = Some(replacement.to_owned());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("pattern did not match")]
    NoMatch,
}

/// What [`scan`] produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Matched(MatchResult),
    /// The subject with the match replaced, when
    /// [`ScanOptions::replace_match_with`] is set.
    Replaced(String),
    NoMatch,
}

impl Outcome {
    pub fn is_match(&self) -> bool {
        !matches!(self, Outcome::NoMatch)
    }
}

/// Scan `subject` for `pattern` with every option honoured.
pub fn scan(
    pattern: &Pattern,
    subject: &str,
    options: &ScanOptions,
) -> Result<Outcome, ScanError> {
    let Finished { result, .. } = drive(pattern, subject, options);
    match (result, &options.replace_match_with) {
        (None, _) if options.raise_error => Err(ScanError::NoMatch),
        (None, _) => Ok(Outcome::NoMatch),
        (Some(m), Some(replacement)) => Ok(Outcome::Replaced(m.replace_match_with(replacement))),
        (Some(m), None) => Ok(Outcome::Matched(m)),
    }
}

struct Finished {
    result: Option<MatchResult>,
    /// The final capture environment, successful or not.
    captures: Captures,
}

/// Try the pattern at each start offset in turn until it matches, the
/// offsets run out or the scan is aborted.
fn drive(pattern: &Pattern, subject: &str, options: &ScanOptions) -> Finished {
    let subject = Arc::new(Subject::new(subject));
    let last = if options.anchor { 0 } else { subject.len() };
    let mut needle = Needle::new(subject);

    for offset in 0..=last {
        needle.reset(offset, options.ignore_case);
        trace!(offset, "trying pattern");
        let matched = pattern.attempt(&mut needle, None).is_some();
        if needle.is_aborted() {
            debug!(offset, "scan aborted");
            break;
        }
        if matched {
            let result = needle.commit();
            debug!(start = result.start(), end = result.end(), "pattern matched");
            let captures = result.captures().clone();
            return Finished {
                result: Some(result),
                captures,
            };
        }
    }
    Finished {
        result: None,
        captures: needle.into_captures(),
    }
}

impl Pattern {
    /// Find the first match in `subject`, trying each start offset in turn.
    pub fn scan(&self, subject: &str) -> Option<MatchResult> {
        drive(self, subject, &ScanOptions::default()).result
    }

    /// Like [`Pattern::scan`], honouring `anchor`, `ignore_case` and
    /// `raise_error`.
    pub fn scan_with(
        &self,
        subject: &str,
        options: &ScanOptions,
    ) -> Result<Option<MatchResult>, ScanError> {
        match drive(self, subject, options).result {
            None if options.raise_error => Err(ScanError::NoMatch),
            result => Ok(result),
        }
    }

    /// `subject` with the first match replaced, or `None` if nothing matched.
    pub fn replace(&self, subject: &str, replacement: &str) -> Option<String> {
        self.scan(subject).map(|m| m.replace_match_with(replacement))
    }

    /// Scan, then hand the result and the listed captures to `then`, whose
    /// return value becomes the result of the scan.
    ///
    /// `then` is called on failure too, with `None` and whatever immediate
    /// captures the failed scan left behind; with `raise_error` set a failure
    /// is reported as [`ScanError::NoMatch`] instead.
    ///
    /// ```rust
    /// use cannonbol::{Pattern, ScanOptions};
    ///
    /// let key = Pattern::break_at("=").capture("key");
    /// let value = Pattern::rem().capture("value");
    /// let pair = key & "=" & value;
    ///
    /// let options = ScanOptions::new();
    /// let parsed = pair.scan_then("name=snobol", &options, ["key", "value"], |m, [k, v]| {
    ///     m.map(|_| (k.map(|k| k.to_text()), v.map(|v| v.to_text())))
    /// });
    /// let expected = (Some("name".to_owned()), Some("snobol".to_owned()));
    /// assert_eq!(parsed, Ok(Some(expected)));
    /// ```
    pub fn scan_then<const N: usize, R>(
        &self,
        subject: &str,
        options: &ScanOptions,
        names: [&str; N],
        then: impl FnOnce(Option<&MatchResult>, [Option<&Value>; N]) -> R,
    ) -> Result<R, ScanError> {
        let Finished { result, captures } = drive(self, subject, options);
        if result.is_none() && options.raise_error {
            return Err(ScanError::NoMatch);
        }
        let values = names.map(|name| captures.get(name));
        Ok(then(result.as_ref(), values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unanchored_finds_later_offset() {
        let m = Pattern::from("lo").scan("hello").unwrap();
        assert_eq!((m.start(), m.end()), (3, 5));
    }

    #[test]
    fn anchored_only_tries_offset_zero() {
        let p = Pattern::from("lo");
        let options = ScanOptions::new().anchored();
        assert_eq!(p.scan_with("hello", &options), Ok(None));
        assert!(p.scan_with("lore", &options).unwrap().is_some());
    }

    #[test]
    fn raise_error_reports_no_match() {
        let options = ScanOptions::new().raise_error();
        assert_eq!(
            Pattern::from("x").scan_with("abc", &options),
            Err(ScanError::NoMatch)
        );
        assert_eq!(
            scan(&Pattern::from("x"), "abc", &options),
            Err(ScanError::NoMatch)
        );
        assert_eq!(ScanError::NoMatch.to_string(), "pattern did not match");
    }

    #[test]
    fn replace_option_splices_subject() {
        let options = ScanOptions::new().replace_with("there");
        let outcome = scan(&Pattern::from("world"), "hello world!", &options).unwrap();
        assert_eq!(outcome, Outcome::Replaced("hello there!".to_owned()));
        assert_eq!(
            Pattern::from("o").replace("foo", "0"),
            Some("f0o".to_owned())
        );
    }

    #[test]
    fn no_match_outcome() {
        let outcome = scan(&Pattern::from("z"), "abc", &ScanOptions::new()).unwrap();
        assert!(!outcome.is_match());
    }

    #[test]
    fn ignore_case_option() {
        let options = ScanOptions::new().ignore_case();
        let m = Pattern::from("WORLD").scan_with("Hello World", &options).unwrap();
        assert_eq!(m.map(|m| m.as_str().to_owned()), Some("World".to_owned()));
        assert!(Pattern::from("WORLD").scan("Hello World").is_none());
    }

    #[test]
    fn empty_subject_matches_empty_pattern() {
        let m = Pattern::empty().scan("").unwrap();
        assert!(m.is_empty());
        assert!(Pattern::from("a").scan("").is_none());
    }

    #[test]
    fn zero_width_match_at_end_of_subject() {
        let m = Pattern::rpos(0).scan("abc").unwrap();
        assert_eq!((m.start(), m.end()), (3, 3));
    }

    #[test]
    fn scan_then_receives_named_captures() {
        let p = Pattern::span("0123456789").capture("n") & "-" & Pattern::rem().capture("rest");
        let names = ["n", "rest", "missing"];
        let out = p
            .scan_then("x 12-ab", &ScanOptions::new(), names, |m, [n, rest, missing]| {
                (
                    m.map(|m| m.as_str().to_owned()),
                    n.map(Value::to_text),
                    rest.map(Value::to_text),
                    missing.is_none(),
                )
            })
            .unwrap();
        assert_eq!(
            out,
            (
                Some("12-ab".to_owned()),
                Some("12".to_owned()),
                Some("ab".to_owned()),
                true
            )
        );
    }

    #[test]
    fn scan_then_called_on_failure() {
        let p = Pattern::from("a").capture_now("seen") & "z";
        let seen = p
            .scan_then("ab", &ScanOptions::new(), ["seen"], |m, [seen]| {
                assert!(m.is_none());
                seen.map(Value::to_text)
            })
            .unwrap();
        assert_eq!(seen, Some("a".to_owned()));
        let err = p.scan_then("ab", &ScanOptions::new().raise_error(), ["seen"], |_, _| ());
        assert_eq!(err, Err(ScanError::NoMatch));
    }
}
