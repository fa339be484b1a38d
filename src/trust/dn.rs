//! Distinguished name parsing and normalization.
//!
//! Parses RFC 4514 / RFC 2253 distinguished names (`CN=node1,OU=ops,O=example`)
//! into an ordered list of RDNs and renders a canonical string used for
//! comparison against the trusted-node list.
//!
//! # Ordering
//!
//! RDNs are stored in LDAP order: index `0` is the right-most, most general
//! component (`O=example` above).  [`DistinguishedName::normalized`] reverses
//! that order back and joins with `,`, so normalized strings read
//! most-specific first and have no whitespace around separators:
//!
//! | Input | Normalized |
//! |-------|------------|
//! | `CN=node1, OU=ops, O=example` | `CN=node1,OU=ops,O=example` |
//! | `OU=b+CN=a;O=x` | `CN=a+OU=b,O=x` |
//! | `CN="node, one"` | `CN=node\, one` |
//!
//! # Equality
//!
//! Two names are equal when they have the same RDNs in the same order.
//! Attribute types compare ASCII case-insensitively, text values compare
//! case-insensitively after unescaping, and members of a multi-valued RDN
//! are compared as a set.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Characters escaped with a backslash wherever they appear in a value.
const ESCAPED_CHARS: &str = ",=+<>#;\"\\";

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// A distinguished name that could not be parsed.
///
/// Offsets count characters from the start of the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnError {
    /// An attribute type was not followed by `=`.
    #[error("expected '=' after attribute type at offset {0}")]
    MissingEquals(usize),

    /// The attribute type is neither a keyword nor a dotted OID.
    #[error("invalid attribute type at offset {0}")]
    InvalidAttributeType(usize),

    /// A backslash was followed by something other than a special character
    /// or two hex digits.
    #[error("invalid escape sequence at offset {0}")]
    InvalidEscape(usize),

    /// A `#` value without an even, non-zero number of hex digits.
    #[error("invalid hex-encoded value at offset {0}")]
    InvalidHex(usize),

    /// A quoted value was never closed.
    #[error("unterminated quoted value starting at offset {0}")]
    UnterminatedQuote(usize),

    /// A character that cannot appear at this position.
    #[error("unexpected character {ch:?} at offset {offset}")]
    UnexpectedCharacter {
        /// The offending character.
        ch: char,
        /// Its offset.
        offset: usize,
    },

    /// Two separators in a row, or a trailing separator.
    #[error("empty name component at offset {0}")]
    EmptyComponent(usize),
}

// ─────────────────────────────────────────────────────────────────────────────
// Attribute values
// ─────────────────────────────────────────────────────────────────────────────

/// The value half of an attribute type/value pair.
#[derive(Debug, Clone)]
pub enum AttributeValue {
    /// A string value (already unescaped).
    Text(String),
    /// A BER/DER value written in `#hex` form.
    Binary(Vec<u8>),
}

/// Comparison key for a value; text compares case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum ValueKey {
    Text(String),
    Binary(Vec<u8>),
}

impl AttributeValue {
    fn key(&self) -> ValueKey {
        match self {
            Self::Text(s) => ValueKey::Text(s.to_uppercase()),
            Self::Binary(b) => ValueKey::Binary(b.clone()),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write_escaped(f, s),
            Self::Binary(b) => write!(f, "#{}", hex::encode(b)),
        }
    }
}

/// Escape a text value the way LDAP names render: special characters
/// everywhere, spaces only at either end.
fn write_escaped(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    let chars: Vec<char> = value.chars().collect();
    let lead = chars.iter().take_while(|c| **c == ' ').count();
    let trail_start = chars.len() - chars.iter().rev().take_while(|c| **c == ' ').count();

    for (i, c) in chars.iter().enumerate() {
        if i < lead || i >= trail_start || ESCAPED_CHARS.contains(*c) {
            f.write_str("\\")?;
        }
        write!(f, "{c}")?;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Attribute type/value pair and RDN
// ─────────────────────────────────────────────────────────────────────────────

/// One `type=value` pair.
#[derive(Debug, Clone)]
pub struct AttributeTypeAndValue {
    attr_type: String,
    value: AttributeValue,
}

impl AttributeTypeAndValue {
    /// Build a pair.  The type keeps the case it is given in.
    pub fn new(attr_type: impl Into<String>, value: AttributeValue) -> Self {
        Self {
            attr_type: attr_type.into(),
            value,
        }
    }

    /// Attribute type as written (`CN`, `cn`, `2.5.4.3`, ...).
    pub fn attr_type(&self) -> &str {
        &self.attr_type
    }

    /// Attribute value.
    pub fn value(&self) -> &AttributeValue {
        &self.value
    }

    fn key(&self) -> (String, ValueKey) {
        (self.attr_type.to_ascii_uppercase(), self.value.key())
    }
}

impl fmt::Display for AttributeTypeAndValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.attr_type, self.value)
    }
}

/// A relative distinguished name: one or more attribute pairs joined by `+`.
///
/// Members are kept sorted by their comparison key so that `a=1+b=2` and
/// `b=2+a=1` render and compare identically.
#[derive(Debug, Clone)]
pub struct Rdn {
    attributes: Vec<AttributeTypeAndValue>,
}

impl Rdn {
    /// Build an RDN from its members.
    pub fn new(mut attributes: Vec<AttributeTypeAndValue>) -> Self {
        attributes.sort_by_cached_key(AttributeTypeAndValue::key);
        Self { attributes }
    }

    /// Members in canonical order.
    pub fn attributes(&self) -> &[AttributeTypeAndValue] {
        &self.attributes
    }
}

impl PartialEq for Rdn {
    fn eq(&self, other: &Self) -> bool {
        self.attributes.len() == other.attributes.len()
            && self
                .attributes
                .iter()
                .zip(&other.attributes)
                .all(|(a, b)| a.key() == b.key())
    }
}

impl Eq for Rdn {}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, atv) in self.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str("+")?;
            }
            write!(f, "{atv}")?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Distinguished name
// ─────────────────────────────────────────────────────────────────────────────

/// A parsed distinguished name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistinguishedName {
    /// LDAP order: most general component first.
    rdns: Vec<Rdn>,
}

impl DistinguishedName {
    /// Parse an RFC 4514 string.  The empty string is the empty name.
    pub fn parse(input: &str) -> Result<Self, DnError> {
        Parser::new(input).parse_name().map(|rdns| Self { rdns })
    }

    /// Build a name from RDNs already in LDAP order (the order they appear
    /// in a DER-encoded certificate subject).
    pub fn from_ldap_order(rdns: Vec<Rdn>) -> Self {
        Self { rdns }
    }

    /// RDNs in LDAP order (most general first).
    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// `true` for the empty name.
    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }

    /// Canonical comma-joined form, most specific RDN first.
    pub fn normalized(&self) -> String {
        self.rdns
            .iter()
            .rev()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized())
    }
}

impl FromStr for DistinguishedName {
    type Err = DnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parse `input` and return the name together with its normalized string.
pub fn normalize(input: &str) -> Result<(DistinguishedName, String), DnError> {
    let dn = DistinguishedName::parse(input)?;
    let normalized = dn.normalized();
    Ok((dn, normalized))
}

/// Normalized string of `input`.
///
/// # Errors
///
/// Returns `Error::InvalidDn` if `input` is not a valid name.
pub fn canonicalize(input: &str) -> crate::Result<String> {
    Ok(DistinguishedName::parse(input)?.normalized())
}

// ─────────────────────────────────────────────────────────────────────────────
// Parser
// ─────────────────────────────────────────────────────────────────────────────

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn skip_spaces(&mut self) {
        while self.peek() == Some(' ') {
            self.pos += 1;
        }
    }

    /// Components in string order, returned reversed (LDAP order).
    fn parse_name(mut self) -> Result<Vec<Rdn>, DnError> {
        let mut rdns = Vec::new();
        if self.chars.is_empty() {
            return Ok(rdns);
        }

        loop {
            rdns.push(self.parse_rdn()?);
            match self.peek() {
                None => break,
                Some(',' | ';') => self.pos += 1,
                Some(ch) => {
                    return Err(DnError::UnexpectedCharacter {
                        ch,
                        offset: self.pos,
                    });
                }
            }
        }

        rdns.reverse();
        Ok(rdns)
    }

    fn parse_rdn(&mut self) -> Result<Rdn, DnError> {
        let mut attributes = vec![self.parse_atv()?];
        while self.peek() == Some('+') {
            self.pos += 1;
            attributes.push(self.parse_atv()?);
        }
        Ok(Rdn::new(attributes))
    }

    fn parse_atv(&mut self) -> Result<AttributeTypeAndValue, DnError> {
        self.skip_spaces();
        if matches!(self.peek(), None | Some(',' | ';' | '+')) {
            return Err(DnError::EmptyComponent(self.pos));
        }

        let attr_type = self.parse_type()?;
        self.skip_spaces();
        if self.peek() != Some('=') {
            return Err(DnError::MissingEquals(self.pos));
        }
        self.pos += 1;
        self.skip_spaces();

        let value = match self.peek() {
            Some('#') => self.parse_hex_value()?,
            Some('"') => self.parse_quoted_value()?,
            _ => self.parse_string_value()?,
        };
        Ok(AttributeTypeAndValue::new(attr_type, value))
    }

    fn parse_type(&mut self) -> Result<String, DnError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let attr_type: String = self.chars[start..self.pos].iter().collect();
        if is_valid_attr_type(&attr_type) {
            Ok(attr_type)
        } else {
            Err(DnError::InvalidAttributeType(start))
        }
    }

    /// `#` followed by hex pairs.
    fn parse_hex_value(&mut self) -> Result<AttributeValue, DnError> {
        let start = self.pos;
        self.pos += 1;
        let digits_start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
            self.pos += 1;
        }
        let digits: String = self.chars[digits_start..self.pos].iter().collect();
        if digits.is_empty() {
            return Err(DnError::InvalidHex(start));
        }
        let bytes = hex::decode(&digits).map_err(|_| DnError::InvalidHex(start))?;
        self.expect_value_end()?;
        Ok(AttributeValue::Binary(bytes))
    }

    fn parse_quoted_value(&mut self) -> Result<AttributeValue, DnError> {
        let start = self.pos;
        self.pos += 1;
        let mut buf = Vec::new();
        loop {
            match self.peek() {
                None => return Err(DnError::UnterminatedQuote(start)),
                Some('"') => {
                    self.pos += 1;
                    break;
                }
                Some('\\') => self.parse_escape(&mut buf)?,
                Some(c) => {
                    push_char(&mut buf, c);
                    self.pos += 1;
                }
            }
        }
        self.expect_value_end()?;
        Ok(decode_text(&buf))
    }

    /// Unquoted value up to the next unescaped separator.  Unescaped trailing
    /// spaces are not part of the value.
    fn parse_string_value(&mut self) -> Result<AttributeValue, DnError> {
        let mut buf = Vec::new();
        let mut significant = 0;
        loop {
            match self.peek() {
                None | Some(',' | ';' | '+') => break,
                Some('\\') => {
                    self.parse_escape(&mut buf)?;
                    significant = buf.len();
                }
                Some(' ') => {
                    buf.push(b' ');
                    self.pos += 1;
                }
                Some('"') => {
                    return Err(DnError::UnexpectedCharacter {
                        ch: '"',
                        offset: self.pos,
                    });
                }
                Some(c) => {
                    push_char(&mut buf, c);
                    self.pos += 1;
                    significant = buf.len();
                }
            }
        }
        buf.truncate(significant);
        Ok(decode_text(&buf))
    }

    /// Consume `\c` or `\XX` and append the decoded bytes.
    fn parse_escape(&mut self, buf: &mut Vec<u8>) -> Result<(), DnError> {
        let at = self.pos;
        match (self.peek_at(1), self.peek_at(2)) {
            (Some(hi), Some(lo)) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
                let pair: String = [hi, lo].iter().collect();
                let byte = u8::from_str_radix(&pair, 16).map_err(|_| DnError::InvalidEscape(at))?;
                buf.push(byte);
                self.pos += 3;
                Ok(())
            }
            (Some(c), _) if ESCAPED_CHARS.contains(c) || c == ' ' => {
                push_char(buf, c);
                self.pos += 2;
                Ok(())
            }
            _ => Err(DnError::InvalidEscape(at)),
        }
    }

    /// After a quoted or hex value only spaces may precede the separator.
    fn expect_value_end(&mut self) -> Result<(), DnError> {
        self.skip_spaces();
        match self.peek() {
            None | Some(',' | ';' | '+') => Ok(()),
            Some(ch) => Err(DnError::UnexpectedCharacter {
                ch,
                offset: self.pos,
            }),
        }
    }
}

/// Escaped bytes that are not UTF-8 decode to U+FFFD, as LDAP names do.
fn decode_text(buf: &[u8]) -> AttributeValue {
    AttributeValue::Text(String::from_utf8_lossy(buf).into_owned())
}

fn push_char(buf: &mut Vec<u8>, c: char) {
    let mut tmp = [0u8; 4];
    buf.extend_from_slice(c.encode_utf8(&mut tmp).as_bytes());
}

/// Keyword (`CN`, `x-custom`) or dotted OID, optionally prefixed `OID.`.
fn is_valid_attr_type(attr_type: &str) -> bool {
    let oid = attr_type
        .strip_prefix("OID.")
        .or_else(|| attr_type.strip_prefix("oid."));
    if let Some(oid) = oid {
        return is_numeric_oid(oid);
    }

    let mut chars = attr_type.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => chars.all(|c| c.is_ascii_alphanumeric() || c == '-'),
        Some(c) if c.is_ascii_digit() => is_numeric_oid(attr_type),
        _ => false,
    }
}

fn is_numeric_oid(s: &str) -> bool {
    !s.is_empty()
        && s
            .split('.')
            .all(|arc| !arc.is_empty() && arc.chars().all(|c| c.is_ascii_digit()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
