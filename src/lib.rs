//! SNOBOL4-style pattern matching with full backtracking.
//!
//! Patterns are built from primitives and combined by concatenation (`&`),
//! alternation (`|`), repetition, capture and recursion. A scan tries the
//! pattern at each start offset of the subject; when part of a pattern fails,
//! the engine asks the parts already matched for their next alternative
//! instead of starting over.
//!
//! # Example
//!
//! ```rust
//! use cannonbol::Pattern;
//!
//! // "can" "n" "o" fails on "ol"; backtracking into the earlier
//! // alternations finds "can" "non" "b" "ol".
//! let word = (Pattern::from("can") | "cannon")
//!     & (Pattern::from("n") | "non")
//!     & (Pattern::from("o") | "b")
//!     & "ol";
//! let m = word.scan("snobol4 + rust = cannonbol!").unwrap();
//! assert_eq!(m.as_str(), "cannonbol");
//!
//! // Captures bind only if the whole scan succeeds.
//! let digits = Pattern::span("0123456789").capture("n");
//! let m = (Pattern::from("#") & digits).scan("issue #42").unwrap();
//! assert_eq!(m.get("n").unwrap().to_text(), "42");
//! ```

mod captures;
mod match_result;
mod needle;
pub mod parser;
pub mod pattern;
mod scan;
mod subject;

pub use captures::{Captures, Value};
pub use match_result::MatchResult;
pub use parser::{Grammar, ParseError, parse, parse_grammar};
pub use pattern::{Capture, CaptureFn, CharSet, Forward, Param, ParamValue, Pattern};
pub use scan::{Outcome, ScanError, ScanOptions, scan};
