//! Recursive descent parser for textual SNOBOL4-style patterns and grammars.
//!
//! ```text
//! grammar     := rule+
//! rule        := name '=' alternation ';'
//! alternation := sequence ('|' sequence)*
//! sequence    := unary*
//! unary       := '-' unary | primary (('.' | '$') name)*
//! primary     := 'text' | "text" | /regex/ | '(' alternation ')' | '*' name
//!              | BUILTIN | BUILTIN '(' args ')' | rule
//! ```
//!
//! Juxtaposition concatenates and binds tighter than `|`. `. name` captures
//! on overall success, `$ name` on every sub-match, `*name` matches whatever
//! `name` holds when reached, and a leading `-` ignores case.

use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::Chars;

use phf::{Map, phf_map};
use thiserror::Error;
use tracing::warn;

use crate::pattern::{CharSet, Forward, Param, Pattern};

/// Errors from [`parse`] and [`parse_grammar`]. Offsets count chars from the
/// start of the source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected character {found:?} at offset {at}")]
    UnexpectedChar { found: char, at: usize },
    #[error("unexpected end of pattern at offset {at}")]
    UnexpectedEnd { at: usize },
    #[error("expected a name at offset {at}")]
    ExpectedName { at: usize },
    #[error("unclosed string literal starting at offset {at}")]
    UnclosedString { at: usize },
    #[error("unclosed regex starting at offset {at}")]
    UnclosedRegex { at: usize },
    #[error("invalid regex at offset {at}: {message}")]
    InvalidRegex { at: usize, message: String },
    #[error("invalid number at offset {at}")]
    InvalidNumber { at: usize },
    #[error("unknown name {name:?} at offset {at}")]
    UnknownName { name: String, at: usize },
    #[error("{name} needs an argument list at offset {at}")]
    MissingArguments { name: String, at: usize },
    #[error("rule {name:?} defined twice (second definition at offset {at})")]
    DuplicateRule { name: String, at: usize },
    #[error("grammar has no rules")]
    EmptyGrammar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    Arb,
    Rem,
    Fail,
    Succeed,
    Abort,
    Fence,
    Len,
    Pos,
    RPos,
    Tab,
    RTab,
    Any,
    NotAny,
    Span,
    Break,
    BreakX,
    Arbno,
}

const NAME_TO_BUILTIN_MAP: Map<&'static str, Builtin> = phf_map! {
    "ARB" => Builtin::Arb,
    "REM" => Builtin::Rem,
    "FAIL" => Builtin::Fail,
    "SUCCEED" => Builtin::Succeed,
    "ABORT" => Builtin::Abort,
    "FENCE" => Builtin::Fence,
    "LEN" => Builtin::Len,
    "POS" => Builtin::Pos,
    "RPOS" => Builtin::RPos,
    "TAB" => Builtin::Tab,
    "RTAB" => Builtin::RTab,
    "ANY" => Builtin::Any,
    "NOTANY" => Builtin::NotAny,
    "SPAN" => Builtin::Span,
    "BREAK" => Builtin::Break,
    "BREAKX" => Builtin::BreakX,
    "ARBNO" => Builtin::Arbno,
};

/// Parse a single pattern expression. Names that are not builtins are an
/// error; use [`parse_grammar`] for patterns that refer to each other.
pub fn parse(src: &str) -> Result<Pattern, ParseError> {
    let mut parser = Parser::new(src, None);
    let pattern = parser.alternation()?;
    parser.expect_end()?;
    Ok(pattern)
}

/// A set of named, possibly mutually recursive patterns.
///
/// Rules reference each other through [`Forward`] handles, so a recursive
/// grammar is a reference cycle and lives as long as the process.
#[derive(Debug, Clone)]
pub struct Grammar {
    start: String,
    rules: BTreeMap<String, Forward>,
}

impl Grammar {
    /// The first rule in the source.
    pub fn start(&self) -> Pattern {
        self.rule(&self.start).unwrap_or_default()
    }

    pub fn start_name(&self) -> &str {
        &self.start
    }

    pub fn rule(&self, name: &str) -> Option<Pattern> {
        self.rules.get(name).map(Forward::pattern)
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }
}

/// Parse `name = expr ;` rules. Bare names that are not builtins refer to
/// rules, defined before or after the reference. A rule that is referenced
/// but never defined matches the empty string.
pub fn parse_grammar(src: &str) -> Result<Grammar, ParseError> {
    let mut parser = Parser::new(src, Some(BTreeMap::new()));
    let mut start = None;
    loop {
        parser.skip_space();
        if parser.peek().is_none() {
            break;
        }
        let at = parser.at;
        let name = parser.name()?;
        parser.expect('=')?;
        let body = parser.alternation()?;
        parser.expect(';')?;
        if !parser.rule(&name).define(body) {
            return Err(ParseError::DuplicateRule { name, at });
        }
        start.get_or_insert(name);
    }
    let start = start.ok_or(ParseError::EmptyGrammar)?;
    let rules = parser.rules.unwrap_or_default();
    for (name, rule) in &rules {
        if !rule.is_defined() {
            warn!(
                rule = %name,
                "grammar rule is referenced but never defined; it matches the empty string"
            );
        }
    }
    Ok(Grammar { start, rules })
}

struct Parser<'a> {
    chars: Peekable<Chars<'a>>,
    /// Offset of the next char.
    at: usize,
    /// Rule handles by name, when parsing a grammar.
    rules: Option<BTreeMap<String, Forward>>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, rules: Option<BTreeMap<String, Forward>>) -> Self {
        Self {
            chars: src.chars().peekable(),
            at: 0,
            rules,
        }
    }

    // ─── Expressions ─────────────────────────────────────────────────────────

    fn alternation(&mut self) -> Result<Pattern, ParseError> {
        let mut pattern = self.sequence()?;
        while self.eat('|') {
            pattern = pattern | self.sequence()?;
        }
        Ok(pattern)
    }

    /// Items up to `|`, `)`, `;` or the end. Nothing at all is the empty
    /// pattern.
    fn sequence(&mut self) -> Result<Pattern, ParseError> {
        let mut items = Vec::new();
        loop {
            self.skip_space();
            match self.peek() {
                None | Some('|' | ')' | ';') => break,
                _ => items.push(self.unary()?),
            }
        }
        Ok(items.into_iter().reduce(|a, b| a & b).unwrap_or_default())
    }

    fn unary(&mut self) -> Result<Pattern, ParseError> {
        if self.eat('-') {
            return Ok(-self.unary()?);
        }
        let mut pattern = self.primary()?;
        loop {
            if self.eat('.') {
                pattern = pattern.capture(self.name()?.as_str());
            } else if self.eat('$') {
                pattern = pattern.capture_now(self.name()?.as_str());
            } else {
                return Ok(pattern);
            }
        }
    }

    fn primary(&mut self) -> Result<Pattern, ParseError> {
        self.skip_space();
        let at = self.at;
        match self.peek() {
            Some('\'' | '"') => Ok(Pattern::literal(&self.string()?)),
            Some('/') => self.regex(),
            Some('(') => {
                self.bump();
                let inner = self.alternation()?;
                self.expect(')')?;
                Ok(inner)
            }
            Some('*') => {
                self.bump();
                Ok(Pattern::named(&self.name()?))
            }
            Some(c) if is_name_start(c) => {
                let name = self.name()?;
                self.word(name, at)
            }
            Some(found) => Err(ParseError::UnexpectedChar { found, at }),
            None => Err(ParseError::UnexpectedEnd { at }),
        }
    }

    /// A builtin, or a rule reference when parsing a grammar.
    fn word(&mut self, name: String, at: usize) -> Result<Pattern, ParseError> {
        if let Some(&builtin) = NAME_TO_BUILTIN_MAP.get(name.as_str()) {
            return self.builtin(builtin, &name);
        }
        if self.rules.is_none() {
            return Err(ParseError::UnknownName { name, at });
        }
        Ok(self.rule(&name).pattern())
    }

    fn builtin(&mut self, builtin: Builtin, name: &str) -> Result<Pattern, ParseError> {
        Ok(match builtin {
            Builtin::Arb => Pattern::arb(),
            Builtin::Rem => Pattern::rem(),
            Builtin::Fail => Pattern::fail(),
            Builtin::Succeed => Pattern::succeed(),
            Builtin::Abort => Pattern::abort(),
            // FENCE alone, or FENCE(p) when the parenthesis follows directly
            Builtin::Fence if self.peek() == Some('(') => {
                Pattern::fence_with(self.arguments(name, Self::alternation)?)
            }
            Builtin::Fence => Pattern::fence(),
            Builtin::Arbno => Pattern::arbno(self.arguments(name, Self::alternation)?),
            Builtin::Len => Pattern::len_with(self.arguments(name, Self::number)?),
            Builtin::Pos => Pattern::pos_with(self.arguments(name, Self::number)?),
            Builtin::RPos => Pattern::rpos_with(self.arguments(name, Self::number)?),
            Builtin::Tab => Pattern::tab_with(self.arguments(name, Self::number)?),
            Builtin::RTab => Pattern::rtab_with(self.arguments(name, Self::number)?),
            Builtin::Any => Pattern::any_with(self.arguments(name, Self::char_set)?),
            Builtin::NotAny => Pattern::not_any_with(self.arguments(name, Self::char_set)?),
            Builtin::Span => Pattern::span_with(self.arguments(name, Self::char_set)?),
            Builtin::Break => Pattern::break_at_with(self.arguments(name, Self::char_set)?),
            Builtin::BreakX => Pattern::breakx_with(self.arguments(name, Self::char_set)?),
        })
    }

    /// `( inner )`, with the parenthesis directly after the builtin's name.
    fn arguments<T>(
        &mut self,
        name: &str,
        inner: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.peek() != Some('(') {
            return Err(ParseError::MissingArguments {
                name: name.to_owned(),
                at: self.at,
            });
        }
        self.bump();
        let value = inner(self)?;
        self.expect(')')?;
        Ok(value)
    }

    // ─── Arguments ───────────────────────────────────────────────────────────

    /// A count, or `*name` to read it from a capture at match time.
    fn number(&mut self) -> Result<Param<usize>, ParseError> {
        if self.eat('*') {
            return Ok(Param::capture(&self.name()?));
        }
        let at = self.at;
        let mut digits = String::new();
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            digits.push(c);
            self.bump();
        }
        digits
            .parse()
            .map(Param::Fixed)
            .map_err(|_| ParseError::InvalidNumber { at })
    }

    /// A quoted set of chars, or `*name`.
    fn char_set(&mut self) -> Result<Param<CharSet>, ParseError> {
        if self.eat('*') {
            return Ok(Param::capture(&self.name()?));
        }
        let at = self.at;
        match self.peek() {
            Some('\'' | '"') => Ok(Param::from(self.string()?.as_str())),
            Some(found) => Err(ParseError::UnexpectedChar { found, at }),
            None => Err(ParseError::UnexpectedEnd { at }),
        }
    }

    // ─── Tokens ──────────────────────────────────────────────────────────────

    /// A literal in either quote. `\n`, `\t` and `\` before any other char
    /// are escapes.
    fn string(&mut self) -> Result<String, ParseError> {
        let at = self.at;
        let quote = self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(ParseError::UnclosedString { at }),
                Some(c) if Some(c) == quote => return Ok(text),
                Some('\\') => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some(c) => text.push(c),
                    None => return Err(ParseError::UnclosedString { at }),
                },
                Some(c) => text.push(c),
            }
        }
    }

    /// `/source/`; `\/` stands for a slash, other escapes go to the regex
    /// as written.
    fn regex(&mut self) -> Result<Pattern, ParseError> {
        let at = self.at;
        self.bump();
        let mut source = String::new();
        loop {
            match self.bump() {
                None => return Err(ParseError::UnclosedRegex { at }),
                Some('/') => break,
                Some('\\') => match self.bump() {
                    Some('/') => source.push('/'),
                    Some(c) => {
                        source.push('\\');
                        source.push(c);
                    }
                    None => return Err(ParseError::UnclosedRegex { at }),
                },
                Some(c) => source.push(c),
            }
        }
        Pattern::regex(&source).map_err(|e| ParseError::InvalidRegex {
            at,
            message: e.to_string(),
        })
    }

    fn name(&mut self) -> Result<String, ParseError> {
        self.skip_space();
        let at = self.at;
        if !self.peek().is_some_and(is_name_start) {
            return Err(ParseError::ExpectedName { at });
        }
        let mut name = String::new();
        while let Some(c) = self.peek().filter(|&c| c.is_alphanumeric() || c == '_') {
            name.push(c);
            self.bump();
        }
        Ok(name)
    }

    // ─── Helpers ─────────────────────────────────────────────────────────────

    /// The handle for rule `name`, created on first mention.
    fn rule(&mut self, name: &str) -> Forward {
        self.rules
            .get_or_insert_with(BTreeMap::new)
            .entry(name.to_owned())
            .or_default()
            .clone()
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.at += 1;
        Some(c)
    }

    fn skip_space(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Skip space, then consume `c` if it is next.
    fn eat(&mut self, c: char) -> bool {
        self.skip_space();
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), ParseError> {
        self.skip_space();
        let at = self.at;
        match self.bump() {
            Some(found) if found == c => Ok(()),
            Some(found) => Err(ParseError::UnexpectedChar { found, at }),
            None => Err(ParseError::UnexpectedEnd { at }),
        }
    }

    fn expect_end(&mut self) -> Result<(), ParseError> {
        self.skip_space();
        match self.peek() {
            Some(found) => Err(ParseError::UnexpectedChar { found, at: self.at }),
            None => Ok(()),
        }
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captures::Value;
    use pretty_assertions::assert_eq;

    fn matched(src: &str, subject: &str) -> Option<String> {
        parse(src)
            .unwrap()
            .scan(subject)
            .map(|m| m.as_str().to_owned())
    }

    // --- Expressions ---

    #[test]
    fn literals_and_alternation() {
        let src = "('can' | 'cannon') ('n' | 'non') ('o' | 'b') 'ol'";
        assert_eq!(matched(src, "snobol4 + rust = cannonbol!"), Some("cannonbol".into()));
        assert_eq!(matched(r#""a\"b""#, r#"xa"b"#), Some(r#"a"b"#.into()));
    }

    #[test]
    fn empty_source_is_empty_pattern() {
        let m = parse("").unwrap().scan("abc").unwrap();
        assert_eq!((m.start(), m.end()), (0, 0));
    }

    #[test]
    fn builtins_and_captures() {
        let p = parse("POS(0) SPAN('0123456789') . n RPOS(0)").unwrap();
        let m = p.scan("123").unwrap();
        assert_eq!(m.get("n").map(Value::to_text), Some("123".into()));
        assert!(p.scan("12x").is_none());
    }

    #[test]
    fn numeric_argument_from_capture() {
        let src = "SPAN('0123456789') $ n ':' LEN(*n)";
        assert_eq!(matched(src, "3:abcdef"), Some("3:abc".into()));
    }

    #[test]
    fn set_argument_from_capture() {
        let src = "ANY('.,;') $ d BREAK(*d) . field *d";
        let m = parse(src).unwrap().scan(";abc;def").unwrap();
        assert_eq!(m.as_str(), ";abc;");
        assert_eq!(m.get("field").map(Value::to_text), Some("abc".into()));
    }

    #[test]
    fn fence_forms() {
        assert_eq!(matched("ANY('AB') FENCE '+'", "1AB+"), None);
        assert_eq!(matched("ANY('AB') FENCE '+'", "1A+"), Some("A+".into()));
        assert_eq!(matched("FENCE('a' | 'ab') 'c'", "xabc"), None);
        // backtracking into a bare FENCE at offset 0 ends the scan
        assert_eq!(matched("FENCE ('a' | 'ab') 'c'", "xabc"), None);
        assert_eq!(matched("'x' FENCE ('a' | 'ab') 'c'", "xabc"), Some("xabc".into()));
    }

    #[test]
    fn arbno_and_regex() {
        assert_eq!(matched("POS(0) ARBNO('ab' | 'a') 'b' RPOS(0)", "aab"), Some("aab".into()));
        let m = parse(r"/[0-9]+/ . n '\/' /[0-9]+\// . d").unwrap().scan("x 3/4/").unwrap();
        assert_eq!(m.get("n").map(Value::to_text), Some("3".into()));
        assert_eq!(m.get("d").map(Value::to_text), Some("4/".into()));
    }

    #[test]
    fn case_insensitive_prefix() {
        assert_eq!(matched("-'hello' ' World'", "HELLO World"), Some("HELLO World".into()));
        assert_eq!(matched("-'hello' ' World'", "HELLO WORLD"), None);
    }

    #[test]
    fn named_reference() {
        assert_eq!(matched("ANY('abc') $ c *c", "xabbc"), Some("bb".into()));
    }

    #[test]
    fn display_of_parsed_pattern() {
        assert_eq!(parse("ARB | REM 'x'").unwrap().to_string(), r#"(ARB | (REM "x"))"#);
        assert_eq!(parse("LEN(*n) . x").unwrap().to_string(), "LEN(*n) . x");
    }

    // --- Errors ---

    #[test]
    fn error_offsets() {
        let cases = [
            ("'abc", ParseError::UnclosedString { at: 0 }),
            ("'a' FOO", ParseError::UnknownName { name: "FOO".into(), at: 4 }),
            ("LEN(x)", ParseError::InvalidNumber { at: 4 }),
            ("('a'", ParseError::UnexpectedEnd { at: 4 }),
            ("LEN", ParseError::MissingArguments { name: "LEN".into(), at: 3 }),
            ("'a' )", ParseError::UnexpectedChar { found: ')', at: 4 }),
            ("'a' . 9", ParseError::ExpectedName { at: 6 }),
            ("/ab", ParseError::UnclosedRegex { at: 0 }),
        ];
        for (src, expected) in cases {
            assert_eq!(parse(src).err(), Some(expected), "source {src:?}");
        }
        assert!(matches!(parse("/[/"), Err(ParseError::InvalidRegex { at: 0, .. })));
    }

    #[test]
    fn error_messages() {
        let err = parse("'a' FOO").err().unwrap();
        assert_eq!(err.to_string(), r#"unknown name "FOO" at offset 4"#);
    }

    // --- Grammars ---

    const NESTED_LIST: &str = "
        top  = POS(0) list RPOS(0) ;
        list = '(' item ARBNO(',' item) ')' ;
        item = SPAN('0123456789') | list ;
    ";

    #[test]
    fn recursive_grammar() {
        let grammar = parse_grammar(NESTED_LIST).unwrap();
        assert_eq!(grammar.start_name(), "top");
        assert_eq!(grammar.rule_names().collect::<Vec<_>>(), ["item", "list", "top"]);
        let top = grammar.start();
        assert!(top.scan("(12,(3,45,(6)),78)").is_some());
        assert!(top.scan("(12,(34)").is_none());
        assert!(grammar.rule("item").unwrap().scan("x(1)").is_some());
        assert!(grammar.rule("nope").is_none());
    }

    #[test]
    fn undefined_rule_matches_empty() {
        let grammar = parse_grammar("s = 'a' missing 'b' ;").unwrap();
        let m = grammar.start().scan("xab").unwrap();
        assert_eq!(m.as_str(), "ab");
    }

    #[test]
    fn grammar_errors() {
        assert_eq!(parse_grammar("  ").err(), Some(ParseError::EmptyGrammar));
        assert_eq!(
            parse_grammar("a = 'x' ; a = 'y' ;").err(),
            Some(ParseError::DuplicateRule { name: "a".into(), at: 10 })
        );
        assert_eq!(
            parse_grammar("a = 'x'").err(),
            Some(ParseError::UnexpectedEnd { at: 7 })
        );
    }
}
