//! Age-conditioned weight resolution.
//!
//! Studies may weight parameter sets differently by participant age. A weight
//! spec is either a flat list (one weight per parameter set) or a list of age
//! brackets, tested in order; the first bracket containing the child's age in
//! days supplies the weights. Missing birth dates and unmatched ages fall back
//! to defaults instead of failing the session.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RandomizerError, Warning, WeightError, Warnings};
use crate::numbers::seconds_to_days;
use crate::sampler::total_weight;

/// Weight configuration for a parameter-set collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WeightSpec {
    Flat(Vec<f64>),
    Brackets(Vec<AgeBracket>),
}

/// Weights applying to children whose age in days lies in `[min_age, max_age]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeBracket {
    #[serde(alias = "minAgeDays")]
    pub min_age: f64,
    #[serde(alias = "maxAgeDays")]
    pub max_age: f64,
    pub weights: Vec<f64>,
}

impl AgeBracket {
    #[must_use]
    pub fn contains(&self, age_days: f64) -> bool {
        self.min_age <= age_days && age_days <= self.max_age
    }
}

/// Birth date as reported by the child data layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum BirthDate {
    Known(NaiveDate),
    Missing,
    Invalid(String),
}

impl BirthDate {
    /// Parse a raw birthday string as `YYYY-MM-DD` or an RFC 3339 timestamp.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Missing;
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Self::Known(date);
        }
        DateTime::parse_from_rfc3339(trimmed).map_or_else(
            |_| Self::Invalid(trimmed.to_string()),
            |stamp| Self::Known(stamp.with_timezone(&Utc).date_naive()),
        )
    }

    /// Age in fractional days at `now`, or the warning explaining why age 0
    /// was substituted.
    #[must_use]
    pub fn age_days(&self, now: DateTime<Utc>) -> (f64, Option<Warning>) {
        match self {
            Self::Known(date) => {
                let born = date.and_time(NaiveTime::MIN).and_utc();
                (seconds_to_days((now - born).num_seconds()), None)
            }
            Self::Missing => (0.0, Some(Warning::MissingBirthDate)),
            Self::Invalid(raw) => (0.0, Some(Warning::InvalidBirthDate { raw: raw.clone() })),
        }
    }
}

/// Source of a participant's birth date.
pub trait ChildRecord {
    fn birth_date(&self) -> BirthDate;
}

impl ChildRecord for BirthDate {
    fn birth_date(&self) -> BirthDate {
        self.clone()
    }
}

impl ChildRecord for NaiveDate {
    fn birth_date(&self) -> BirthDate {
        BirthDate::Known(*self)
    }
}

/// Minimal serialisable child record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChildProfile {
    pub id: String,
    #[serde(default)]
    pub birthday: Option<String>,
}

impl ChildRecord for ChildProfile {
    fn birth_date(&self) -> BirthDate {
        self.birthday
            .as_deref()
            .map_or(BirthDate::Missing, BirthDate::parse)
    }
}

/// Flat weights ready for the sampler plus how they were obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedWeights {
    pub weights: Vec<f64>,
    /// Index of the matching age bracket, if brackets were used.
    pub bracket: Option<usize>,
    /// Age used for bracket matching, if brackets were used.
    pub age_days: Option<f64>,
    pub warnings: Warnings,
}

impl ResolvedWeights {
    fn equal(candidates: usize) -> Self {
        Self {
            weights: vec![1.0; candidates],
            bracket: None,
            age_days: None,
            warnings: Warnings::new(),
        }
    }
}

/// Produce the flat weight list for `candidates` parameter sets.
///
/// # Errors
///
/// Returns an error when the selected weight list does not have one entry per
/// parameter set.
pub fn resolve_weights<C: ChildRecord + ?Sized>(
    spec: Option<&WeightSpec>,
    candidates: usize,
    child: &C,
    now: DateTime<Utc>,
) -> Result<ResolvedWeights, RandomizerError> {
    let brackets = match spec {
        None => return Ok(ResolvedWeights::equal(candidates)),
        Some(WeightSpec::Flat(weights)) => {
            check_count(weights, candidates)?;
            return Ok(ResolvedWeights {
                weights: weights.clone(),
                ..ResolvedWeights::equal(0)
            });
        }
        Some(WeightSpec::Brackets(brackets)) => brackets,
    };

    let (age_days, birth_warning) = child.birth_date().age_days(now);
    let mut resolved = ResolvedWeights::equal(candidates);
    resolved.age_days = Some(age_days);
    if let Some(warning) = birth_warning {
        log::warn!("{warning}");
        resolved.warnings.push(warning);
    }

    if let Some(index) = brackets.iter().position(|bracket| bracket.contains(age_days)) {
        let weights = &brackets[index].weights;
        check_count(weights, candidates)
            .and_then(|()| total_weight(weights).map(drop))
            .map_err(|source| RandomizerError::Bracket {
                bracket: index,
                source,
            })?;
        log::debug!("age {age_days:.1} days matched bracket {index}");
        resolved.weights.clone_from(weights);
        resolved.bracket = Some(index);
    } else {
        let warning = Warning::NoMatchingAgeBracket { age_days };
        log::warn!("{warning}");
        resolved.warnings.push(warning);
    }
    Ok(resolved)
}

/// Verify a weight list has one entry per parameter set.
///
/// # Errors
///
/// Returns [`WeightError::CountMismatch`] on a length mismatch.
pub const fn check_count(weights: &[f64], candidates: usize) -> Result<(), WeightError> {
    if weights.len() == candidates {
        Ok(())
    } else {
        Err(WeightError::CountMismatch {
            expected: candidates,
            actual: weights.len(),
        })
    }
}
