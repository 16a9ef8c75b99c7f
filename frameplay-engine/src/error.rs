//! Error and warning types for frame generation.
//!
//! Fatal problems abort the whole expansion and surface as [`RandomizerError`].
//! Missing participant data never blocks a session; it is reported through
//! [`Warning`] values collected on the expansion result.

use serde::Serialize;
use smallvec::SmallVec;
use thiserror::Error;

/// Problems with a weight vector handed to the sampler.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WeightError {
    #[error("weight list is empty")]
    Empty,
    #[error("weight {index} must be a finite non-negative number (got {value})")]
    Invalid { index: usize, value: f64 },
    #[error("all weights are zero; no parameter set can be selected")]
    ZeroTotal,
    #[error("expected {expected} weights (one per parameter set) but found {actual}")]
    CountMismatch { expected: usize, actual: usize },
}

/// Problems resolving a single parameter reference inside a template.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SelectorError {
    #[error("index {index} is out of range for `{name}` ({len} elements)")]
    IndexOutOfRange {
        name: String,
        index: usize,
        len: usize,
    },
    #[error("`{name}{selector}` needs a list value but `{name}` is not a list")]
    NotAList { name: String, selector: String },
    #[error("`{name}{selector}` draws from an empty list")]
    EmptyList { name: String, selector: String },
    #[error("`{name}{selector}` refers to a parameter that is not defined")]
    UndefinedParameter { name: String, selector: String },
    #[error("`{name}#{suffix}` is not a valid selector (expected #<index>, #RAND, #PERM or #UNIQ)")]
    MalformedSelector { name: String, suffix: String },
}

/// A [`SelectorError`] located at a JSON path inside a template.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("at {path}: {kind}")]
pub struct SubstitutionError {
    pub path: String,
    #[source]
    pub kind: SelectorError,
}

/// Fatal errors raised while generating a frame list.
#[derive(Debug, Error)]
pub enum RandomizerError {
    #[error("frameList must contain at least one frame template")]
    EmptyFrameList,
    #[error("parameterSets must contain at least one parameter set")]
    EmptyParameterSets,
    #[error("parameterSetWeights: {0}")]
    Weights(#[from] WeightError),
    #[error("age bracket {bracket}: {source}")]
    Bracket {
        bracket: usize,
        #[source]
        source: WeightError,
    },
    #[error("frame template {index} {source}")]
    Template {
        index: usize,
        #[source]
        source: SubstitutionError,
    },
    #[error("frame resolver failed on template {index}: {source}")]
    Callback {
        index: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
    #[error("invalid frame configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Recoverable data problems. The expansion falls back to a default and
/// carries on.
#[derive(Debug, Clone, Error, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    #[error("child birth date unavailable; treating age as 0 days")]
    MissingBirthDate,
    #[error("child birth date `{raw}` is not a valid date; treating age as 0 days")]
    InvalidBirthDate { raw: String },
    #[error("no age bracket matches age {age_days:.1} days; using equal weights")]
    NoMatchingAgeBracket { age_days: f64 },
}

pub type Warnings = SmallVec<[Warning; 2]>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_errors_name_index_and_path() {
        let err = RandomizerError::Template {
            index: 2,
            source: SubstitutionError {
                path: String::from("/images/0"),
                kind: SelectorError::IndexOutOfRange {
                    name: String::from("L"),
                    index: 3,
                    len: 3,
                },
            },
        };
        let message = err.to_string();
        assert!(message.contains("template 2"));
        assert!(message.contains("/images/0"));
        assert!(message.contains("index 3"));
    }

    #[test]
    fn warnings_serialize_with_kind_tag() {
        let value = serde_json::to_value(Warning::InvalidBirthDate {
            raw: String::from("soon"),
        })
        .unwrap();
        assert_eq!(value["kind"], "invalid_birth_date");
        assert_eq!(value["raw"], "soon");
    }
}
