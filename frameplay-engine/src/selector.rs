//! Parameter reference grammar.
//!
//! A string leaf refers to a parameter either by its exact name or as
//! `NAME#SELECTOR`, where the selector is one of `#<index>`, `#RAND`, `#PERM`
//! or `#UNIQ`. Any parameter key may be used as `NAME`. When the text before a
//! `#` is not a key, the leaf is a literal unless it looks like an identifier
//! followed by a valid selector, which keeps ordinary prose and URLs
//! containing `#` out of the grammar.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::ParameterSet;
use crate::error::SelectorError;

/// Reduction applied to a list-valued parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Element at a zero-based index.
    Index(usize),
    /// Uniformly random element, drawn per occurrence.
    Rand,
    /// The whole list, freshly shuffled per occurrence.
    Perm,
    /// Next element of a session-wide permutation.
    Uniq,
}

impl Selector {
    /// Parse the text after `#`.
    #[must_use]
    pub fn parse(suffix: &str) -> Option<Self> {
        match suffix {
            "RAND" => Some(Self::Rand),
            "PERM" => Some(Self::Perm),
            "UNIQ" => Some(Self::Uniq),
            // Too many digits for usize is still an index, just never in range.
            digits if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
                Some(Self::Index(digits.parse().unwrap_or(usize::MAX)))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "#{index}"),
            Self::Rand => f.write_str("#RAND"),
            Self::Perm => f.write_str("#PERM"),
            Self::Uniq => f.write_str("#UNIQ"),
        }
    }
}

/// A string leaf recognised as a parameter reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference<'a> {
    pub name: &'a str,
    /// `None` for an exact-name reference.
    pub selector: Option<Selector>,
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("identifier pattern is valid"))
}

/// Classify a string leaf against the parameters of the chosen set.
///
/// Returns `Ok(None)` for literal strings.
///
/// # Errors
///
/// * [`SelectorError::MalformedSelector`] when the text before a `#` is a
///   parameter but the rest is not a known selector.
/// * [`SelectorError::UndefinedParameter`] when an identifier-like `NAME` is
///   followed by a valid selector but is not a parameter.
pub fn parse_reference<'a>(
    leaf: &'a str,
    params: &ParameterSet,
) -> Result<Option<Reference<'a>>, SelectorError> {
    if params.contains_key(leaf) {
        return Ok(Some(Reference {
            name: leaf,
            selector: None,
        }));
    }

    // Keys may themselves contain `#`, so try every split point in order.
    for (at, _) in leaf.match_indices('#') {
        let (name, suffix) = (&leaf[..at], &leaf[at + 1..]);
        if !params.contains_key(name) {
            continue;
        }
        return match Selector::parse(suffix) {
            Some(selector) => Ok(Some(Reference {
                name,
                selector: Some(selector),
            })),
            None => Err(SelectorError::MalformedSelector {
                name: name.to_string(),
                suffix: suffix.to_string(),
            }),
        };
    }

    let Some((name, suffix)) = leaf.split_once('#') else {
        return Ok(None);
    };
    match Selector::parse(suffix) {
        Some(selector) if identifier_pattern().is_match(name) => {
            Err(SelectorError::UndefinedParameter {
                name: name.to_string(),
                selector: selector.to_string(),
            })
        }
        _ => Ok(None),
    }
}
