//! Wildcard matching for trusted-node patterns.
//!
//! Operators may list trusted nodes as patterns instead of exact names, e.g.
//! `CN=node*,OU=ops,O=example`.  Three pattern forms are supported:
//!
//! | Pattern | Semantics |
//! |---------|-----------|
//! | `/regex/` | regular expression, must match the whole candidate |
//! | contains `*` or `?` | glob: `*` any run of characters, `?` exactly one |
//! | anything else | exact match |
//!
//! Patterns are compiled once; [`match_any`] is the one-shot convenience used
//! where no compiled set is kept.

use regex::{Regex, RegexBuilder};
use tracing::warn;

/// Compiled size limit for pattern regexes (the `regex` crate default).
const REGEX_SIZE_LIMIT: usize = 10 * (1 << 20);

/// A compiled wildcard pattern.
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    source: String,
    matcher: Matcher,
}

#[derive(Debug, Clone)]
enum Matcher {
    Exact {
        value: String,
        case_insensitive: bool,
    },
    Regex(Regex),
    /// A pattern that failed to compile; never matches.
    Invalid,
}

impl WildcardPattern {
    /// Compile `pattern`.
    pub fn new(pattern: &str, case_insensitive: bool) -> Self {
        Self::with_size_limit(pattern, case_insensitive, REGEX_SIZE_LIMIT)
    }

    fn with_size_limit(pattern: &str, case_insensitive: bool, size_limit: usize) -> Self {
        let matcher = if let Some(body) = regex_body(pattern) {
            compile_or_invalid(pattern, &format!("^(?:{body})$"), case_insensitive, size_limit)
        } else if pattern.contains(['*', '?']) {
            // Literals are escaped; only the compiled size limit can reject it.
            compile_or_invalid(pattern, &glob_to_regex(pattern), case_insensitive, size_limit)
        } else {
            Matcher::Exact {
                value: fold(pattern, case_insensitive),
                case_insensitive,
            }
        };

        Self {
            source: pattern.to_owned(),
            matcher,
        }
    }

    /// Returns `true` if `candidate` matches this pattern.
    pub fn matches(&self, candidate: &str) -> bool {
        match &self.matcher {
            Matcher::Exact {
                value,
                case_insensitive,
            } => *value == fold(candidate, *case_insensitive),
            Matcher::Regex(re) => re.is_match(candidate),
            Matcher::Invalid => false,
        }
    }

    /// The pattern as configured.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Returns `true` if `candidate` matches at least one of `patterns`.
pub fn match_any<S: AsRef<str>>(patterns: &[S], candidate: &str, case_insensitive: bool) -> bool {
    patterns
        .iter()
        .any(|p| WildcardPattern::new(p.as_ref(), case_insensitive).matches(candidate))
}

fn regex_body(pattern: &str) -> Option<&str> {
    if pattern.len() >= 2 {
        pattern.strip_prefix('/')?.strip_suffix('/')
    } else {
        None
    }
}

fn glob_to_regex(pattern: &str) -> String {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            _ => re.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4]))),
        }
    }
    re.push('$');
    re
}

fn compile_or_invalid(
    pattern: &str,
    source: &str,
    case_insensitive: bool,
    size_limit: usize,
) -> Matcher {
    RegexBuilder::new(source)
        .case_insensitive(case_insensitive)
        .size_limit(size_limit)
        .build()
        .map_or_else(
            |e| {
                warn!(pattern = %pattern, error = %e, "Invalid pattern, it will never match");
                Matcher::Invalid
            },
            Matcher::Regex,
        )
}

fn fold(s: &str, case_insensitive: bool) -> String {
    if case_insensitive {
        s.to_lowercase()
    } else {
        s.to_owned()
    }
}
