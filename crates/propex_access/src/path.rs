//! Property path parsing: `address.country.name`, `scores[math]`,
//! `orders[2].total`.
//!
//! A path is a sequence of property names separated by dots, each
//! optionally followed by bracket groups. A bracket key is an integer
//! index, a quoted textual key (single or double quotes, no escapes)
//! or a bare textual key; which of those is meaningful depends on the
//! shape of the value the key is applied to, decided during the walk,
//! not here. Parse errors carry the byte offset of the offending
//! character.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

// -----------------------------------------------------------------------------
// Errors

/// Why a property path failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathErrorKind {
    #[error("empty property path")]
    Empty,
    #[error("expected a property name")]
    ExpectedName,
    #[error("unexpected character `{0}`")]
    UnexpectedCharacter(char),
    #[error("unclosed `[`")]
    UnclosedBracket,
    #[error("unclosed quote in bracket key")]
    UnclosedQuote,
    #[error("empty bracket key")]
    EmptyKey,
    #[error("index does not fit in usize")]
    IndexOverflow,
}

/// A property path parse failure, with the byte offset where parsing
/// stopped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid property path `{path}` at offset {offset}: {kind}")]
pub struct PathParseError {
    pub path: String,
    pub offset: usize,
    pub kind: PathErrorKind,
}

// -----------------------------------------------------------------------------
// Segments

/// One bracket key, as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyToken {
    /// An unquoted all-digit key: `[2]`.
    Index(usize),
    /// A quoted textual key: `['a.b']`.
    Quoted(String),
    /// A bare textual key: `[math]`.
    Bare(String),
}

impl KeyToken {
    /// Returns the key as text, regardless of spelling.
    pub fn as_text(&self) -> std::borrow::Cow<'_, str> {
        match self {
            KeyToken::Index(index) => std::borrow::Cow::Owned(index.to_string()),
            KeyToken::Quoted(text) | KeyToken::Bare(text) => std::borrow::Cow::Borrowed(text),
        }
    }

    /// Returns the numeric index, if this key can address a sequence.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            KeyToken::Index(index) => Some(*index),
            KeyToken::Quoted(_) | KeyToken::Bare(_) => None,
        }
    }
}

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A named property, resolved through the descriptor set.
    Property { name: String, offset: usize },
    /// A bracket key, dispatched on the container shape.
    Key { token: KeyToken, offset: usize },
}

impl PathSegment {
    /// Returns the segment as it would be reported in an error, the
    /// property name or the key text.
    pub fn display_name(&self) -> String {
        match self {
            PathSegment::Property { name, .. } => name.clone(),
            PathSegment::Key { token, .. } => token.as_text().into_owned(),
        }
    }

    /// Returns the byte offset of this segment in the original text.
    pub fn offset(&self) -> usize {
        match self {
            PathSegment::Property { offset, .. } | PathSegment::Key { offset, .. } => *offset,
        }
    }
}

// -----------------------------------------------------------------------------
// PropertyPath

/// A parsed property path.
///
/// # Examples
///
/// ```
/// use propex_access::{KeyToken, PathSegment, PropertyPath};
///
/// let path: PropertyPath = "orders[2].total".parse().unwrap();
/// assert_eq!(path.segments().len(), 3);
/// assert!(matches!(
///     &path.segments()[1],
///     PathSegment::Key { token: KeyToken::Index(2), .. }
/// ));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
    raw: String,
    segments: Vec<PathSegment>,
}

impl PropertyPath {
    /// Parses a textual property path.
    pub fn parse(raw: &str) -> Result<Self, PathParseError> {
        Parser::new(raw).run()
    }

    /// Returns the path as originally written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the parsed segments, in walk order.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Splits off the final segment, leaving the parent walk.
    ///
    /// Paths always have at least one segment, so this never fails.
    pub(crate) fn split_last(&self) -> (&[PathSegment], &PathSegment) {
        let (last, parents) = self
            .segments
            .split_last()
            .unwrap_or_else(|| unreachable!("parsed paths are never empty"));
        (parents, last)
    }
}

impl FromStr for PropertyPath {
    type Err = PathParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

impl fmt::Display for PropertyPath {
    /// Writes the canonical spelling of the path.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            match segment {
                PathSegment::Property { name, .. } => {
                    if !first {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                PathSegment::Key { token, .. } => match token {
                    KeyToken::Index(index) => write!(f, "[{index}]")?,
                    KeyToken::Bare(text) => write!(f, "[{text}]")?,
                    KeyToken::Quoted(text) => {
                        if text.contains('\'') {
                            write!(f, "[\"{text}\"]")?;
                        } else {
                            write!(f, "['{text}']")?;
                        }
                    }
                },
            }
            first = false;
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Parser

struct Parser<'a> {
    raw: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    segments: Vec<PathSegment>,
}

impl<'a> Parser<'a> {
    fn new(raw: &'a str) -> Self {
        Self {
            raw,
            chars: raw.char_indices().peekable(),
            segments: Vec::new(),
        }
    }

    fn fail(&self, offset: usize, kind: PathErrorKind) -> PathParseError {
        PathParseError {
            path: self.raw.to_string(),
            offset,
            kind,
        }
    }

    fn run(mut self) -> Result<PropertyPath, PathParseError> {
        if self.raw.is_empty() {
            return Err(self.fail(0, PathErrorKind::Empty));
        }

        // A path opens with a name or a bracket group on the root.
        match self.chars.peek().copied() {
            Some((_, '[')) => {}
            _ => self.property()?,
        }

        while let Some((offset, ch)) = self.chars.peek().copied() {
            match ch {
                '.' => {
                    self.chars.next();
                    self.property()?;
                }
                '[' => {
                    self.chars.next();
                    self.key(offset)?;
                }
                other => return Err(self.fail(offset, PathErrorKind::UnexpectedCharacter(other))),
            }
        }

        Ok(PropertyPath {
            raw: self.raw.to_string(),
            segments: self.segments,
        })
    }

    fn property(&mut self) -> Result<(), PathParseError> {
        let (start, first) = match self.chars.peek().copied() {
            Some(pair) => pair,
            None => return Err(self.fail(self.raw.len(), PathErrorKind::ExpectedName)),
        };
        if !(first.is_alphabetic() || first == '_') {
            return Err(self.fail(start, PathErrorKind::ExpectedName));
        }

        let mut end = start;
        while let Some((offset, ch)) = self.chars.peek().copied() {
            if ch.is_alphanumeric() || ch == '_' {
                self.chars.next();
                end = offset + ch.len_utf8();
            } else {
                break;
            }
        }
        self.segments.push(PathSegment::Property {
            name: self.raw[start..end].to_string(),
            offset: start,
        });
        Ok(())
    }

    /// Parses a bracket key; `open` is the offset of the `[`.
    fn key(&mut self, open: usize) -> Result<(), PathParseError> {
        let token = match self.chars.peek().copied() {
            Some((start, quote @ ('\'' | '"'))) => {
                self.chars.next();
                let text = self.quoted(start, quote)?;
                match self.chars.next() {
                    Some((_, ']')) => {}
                    Some((offset, other)) => {
                        return Err(self.fail(offset, PathErrorKind::UnexpectedCharacter(other)));
                    }
                    None => return Err(self.fail(open, PathErrorKind::UnclosedBracket)),
                }
                KeyToken::Quoted(text)
            }
            _ => {
                let text = self.bare(open)?;
                if text.is_empty() {
                    return Err(self.fail(open, PathErrorKind::EmptyKey));
                }
                if text.chars().all(|ch| ch.is_ascii_digit()) {
                    let index = text
                        .parse::<usize>()
                        .map_err(|_| self.fail(open + 1, PathErrorKind::IndexOverflow))?;
                    KeyToken::Index(index)
                } else {
                    KeyToken::Bare(text)
                }
            }
        };
        self.segments.push(PathSegment::Key { token, offset: open });
        Ok(())
    }

    fn quoted(&mut self, start: usize, quote: char) -> Result<String, PathParseError> {
        let mut text = String::new();
        for (_, ch) in self.chars.by_ref() {
            if ch == quote {
                return Ok(text);
            }
            text.push(ch);
        }
        Err(self.fail(start, PathErrorKind::UnclosedQuote))
    }

    fn bare(&mut self, open: usize) -> Result<String, PathParseError> {
        let path = self.raw;
        let mut text = String::new();
        for (offset, ch) in self.chars.by_ref() {
            match ch {
                ']' => return Ok(text),
                // A stray `[` inside a bare key is a typo, not key text.
                '[' => {
                    return Err(PathParseError {
                        path: path.to_string(),
                        offset,
                        kind: PathErrorKind::UnexpectedCharacter('['),
                    });
                }
                _ => text.push(ch),
            }
        }
        Err(self.fail(open, PathErrorKind::UnclosedBracket))
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> PropertyPath {
        PropertyPath::parse(raw).unwrap()
    }

    fn kind(raw: &str) -> (usize, PathErrorKind) {
        let err = PropertyPath::parse(raw).unwrap_err();
        (err.offset, err.kind)
    }

    #[test]
    fn dotted_properties() {
        let path = parse("address.country.name");
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Property { name: "address".into(), offset: 0 },
                PathSegment::Property { name: "country".into(), offset: 8 },
                PathSegment::Property { name: "name".into(), offset: 16 },
            ]
        );
    }

    #[test]
    fn bracket_keys() {
        let path = parse("scores[math]");
        assert_eq!(
            path.segments()[1],
            PathSegment::Key { token: KeyToken::Bare("math".into()), offset: 6 }
        );

        let path = parse("orders[2].total");
        assert_eq!(
            path.segments()[1],
            PathSegment::Key { token: KeyToken::Index(2), offset: 6 }
        );
        assert_eq!(
            path.segments()[2],
            PathSegment::Property { name: "total".into(), offset: 10 }
        );
    }

    #[test]
    fn quoted_keys_stay_textual() {
        let path = parse("scores['2']");
        assert_eq!(
            path.segments()[1],
            PathSegment::Key { token: KeyToken::Quoted("2".into()), offset: 6 }
        );

        let path = parse("scores[\"a.b\"]");
        assert_eq!(
            path.segments()[1],
            PathSegment::Key { token: KeyToken::Quoted("a.b".into()), offset: 6 }
        );
    }

    #[test]
    fn chained_brackets_and_root_key() {
        let path = parse("grid[1][2]");
        assert_eq!(path.segments().len(), 3);

        let path = parse("[0].name");
        assert_eq!(
            path.segments()[0],
            PathSegment::Key { token: KeyToken::Index(0), offset: 0 }
        );
    }

    #[test]
    fn parse_errors_carry_offsets() {
        assert_eq!(kind(""), (0, PathErrorKind::Empty));
        assert_eq!(kind("a..b"), (2, PathErrorKind::ExpectedName));
        assert_eq!(kind("a."), (2, PathErrorKind::ExpectedName));
        assert_eq!(kind("1name"), (0, PathErrorKind::ExpectedName));
        assert_eq!(kind("a[0"), (1, PathErrorKind::UnclosedBracket));
        assert_eq!(kind("a[]"), (1, PathErrorKind::EmptyKey));
        assert_eq!(kind("a['x"), (2, PathErrorKind::UnclosedQuote));
        assert_eq!(kind("a b"), (1, PathErrorKind::UnexpectedCharacter(' ')));
    }

    #[test]
    fn bare_keys_reject_nested_brackets() {
        assert_eq!(kind("a[b[c]"), (3, PathErrorKind::UnexpectedCharacter('[')));
        assert_eq!(kind("grid[1][x[0]]"), (9, PathErrorKind::UnexpectedCharacter('[')));

        // Quoted keys still take anything up to the closing quote.
        let path = parse("a['b[c']");
        assert_eq!(
            path.segments()[1],
            PathSegment::Key { token: KeyToken::Quoted("b[c".into()), offset: 1 }
        );
    }

    #[test]
    fn display_is_canonical() {
        for raw in ["address.country.name", "scores[math]", "orders[2].total", "[0].name"] {
            assert_eq!(parse(raw).to_string(), raw);
        }
        assert_eq!(parse("scores[\"k\"]").to_string(), "scores['k']");
    }
}
