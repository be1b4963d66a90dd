//! Access failures and near-miss property suggestions.

use std::fmt;

use thiserror::Error;

use crate::convert::ConversionError;
use crate::path::PathParseError;

// -----------------------------------------------------------------------------
// Suggestions

/// Close matches for a misspelled property name, capped in count and
/// edit distance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Suggestions(Vec<String>);

/// Edits beyond this distance stop reading as a typo.
const MAX_DISTANCE: usize = 2;
/// More than a few matches stop being a suggestion and start being a
/// listing.
const MAX_MATCHES: usize = 3;

impl Suggestions {
    /// Collects the candidate names within edit distance of `wanted`,
    /// closest first.
    pub fn for_name<'a, I>(wanted: &str, candidates: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut scored: Vec<(usize, &str)> = candidates
            .into_iter()
            .filter_map(|candidate| {
                let distance = edit_distance(wanted, candidate);
                (distance <= MAX_DISTANCE).then_some((distance, candidate))
            })
            .collect();
        scored.sort_by_key(|&(distance, name)| (distance, name));
        scored.truncate(MAX_MATCHES);
        Suggestions(scored.into_iter().map(|(_, name)| name.to_string()).collect())
    }

    /// Returns the suggested names, closest first.
    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Suggestions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        f.write_str("; did you mean ")?;
        for (i, name) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "`{name}`")?;
        }
        f.write_str("?")
    }
}

/// Levenshtein distance over chars, single-row rolling table.
fn edit_distance(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }
    let b_chars: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b_chars.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut previous_diagonal = row[0];
        row[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let substitution = previous_diagonal + usize::from(ca != cb);
            previous_diagonal = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(previous_diagonal + 1);
        }
    }
    row[b_chars.len()]
}

// -----------------------------------------------------------------------------
// PropertyAccessError

/// Everything that can go wrong resolving, reading, coercing or
/// writing a property path.
#[derive(Debug, Error)]
pub enum PropertyAccessError {
    /// The path text itself does not parse.
    #[error(transparent)]
    InvalidPath(#[from] PathParseError),

    /// The path is structurally inapplicable to the value it met, e.g.
    /// a named property applied to a sequence, an out-of-range index
    /// with growing disabled, or an index past the growth limit.
    #[error("invalid property `{property}` in path `{path}`: {reason}")]
    InvalidProperty {
        path: String,
        property: String,
        reason: String,
    },

    /// The property exists on the type but exposes no getter, or the
    /// name is unknown on the type when reading.
    #[error("property `{property}` of {type_name} is not readable in path `{path}`{suggestions}")]
    NotReadable {
        path: String,
        property: String,
        type_name: String,
        suggestions: Suggestions,
    },

    /// The property exposes no setter, or the name is unknown on the
    /// type when writing.
    #[error("property `{property}` of {type_name} is not writable in path `{path}`{suggestions}")]
    NotWritable {
        path: String,
        property: String,
        type_name: String,
        suggestions: Suggestions,
    },

    /// An intermediate step of the path held null and growing was
    /// disabled or impossible. `property` is the joined path up to and
    /// including the null step, `type_name` the type holding it.
    #[error("property `{property}` of {type_name} is null in nested path `{path}`")]
    NullValueInNestedPath {
        path: String,
        property: String,
        type_name: String,
    },

    /// The value could not be coerced to the declared property type.
    #[error(
        "cannot apply value `{value}` of type {actual} to property `{property}` \
         of declared type {expected} in path `{path}`"
    )]
    TypeMismatch {
        path: String,
        property: String,
        expected: String,
        actual: String,
        value: String,
        #[source]
        source: ConversionError,
    },
}

impl PropertyAccessError {
    /// Returns the property name the error is attributed to, if any.
    pub fn property(&self) -> Option<&str> {
        match self {
            PropertyAccessError::InvalidPath(_) => None,
            PropertyAccessError::InvalidProperty { property, .. }
            | PropertyAccessError::NotReadable { property, .. }
            | PropertyAccessError::NotWritable { property, .. }
            | PropertyAccessError::NullValueInNestedPath { property, .. }
            | PropertyAccessError::TypeMismatch { property, .. } => Some(property),
        }
    }

    /// Returns the near-miss suggestions attached to the error, if any.
    pub fn suggestions(&self) -> Option<&Suggestions> {
        match self {
            PropertyAccessError::NotReadable { suggestions, .. }
            | PropertyAccessError::NotWritable { suggestions, .. } => Some(suggestions),
            _ => None,
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_basics() {
        assert_eq!(edit_distance("age", "age"), 0);
        assert_eq!(edit_distance("ag", "age"), 1);
        assert_eq!(edit_distance("nmae", "name"), 2);
        assert_eq!(edit_distance("", "abc"), 3);
    }

    #[test]
    fn suggestions_are_capped_and_ordered() {
        let suggestions =
            Suggestions::for_name("ag", ["tag", "ago", "agent", "age", "wholly_unrelated"].into_iter());
        assert_eq!(suggestions.names(), &["age", "ago", "tag"]);
    }

    #[test]
    fn no_suggestions_for_distant_names() {
        let suggestions = Suggestions::for_name("ag", ["country", "street"].into_iter());
        assert!(suggestions.is_empty());
        assert_eq!(suggestions.to_string(), "");
    }

    #[test]
    fn suggestion_rendering() {
        let suggestions = Suggestions::for_name("ag", ["age"].into_iter());
        assert_eq!(suggestions.to_string(), "; did you mean `age`?");
    }
}
