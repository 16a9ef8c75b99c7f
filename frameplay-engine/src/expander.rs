//! Frame-list expansion.
//!
//! One expansion picks a parameter set, then walks the frame list in order:
//! each template is merged over the common properties, substituted with the
//! chosen parameters and handed to the host's [`FrameResolver`]. Unique-draw
//! cursors are shared across the whole list, so templates are processed
//! strictly in sequence and any error aborts the expansion.

use std::convert::Infallible;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use serde_json::Value;

use crate::config::{ConditionLog, ConditionRecord, FrameConfig};
use crate::error::{RandomizerError, Warnings};
use crate::merge::deep_merge;
use crate::permutation::PermutationState;
use crate::rng::RngBundle;
use crate::sampler::draw_weighted;
use crate::substitute::Substituter;
use crate::weights::{ChildRecord, resolve_weights};

/// Turns a resolved template into zero or more playable frames.
pub trait FrameResolver {
    type Frame;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Resolve one template produced by the randomized frame `frame_id`.
    ///
    /// # Errors
    ///
    /// Implementations fail when the template cannot become a frame; the
    /// expansion stops at the first failure.
    fn resolve_frame(
        &mut self,
        frame_id: &str,
        template: Value,
    ) -> Result<Vec<Self::Frame>, Self::Error>;
}

/// Adapter implementing [`FrameResolver`] for a closure.
pub struct FnResolver<F>(pub F);

impl<F, T, E> FrameResolver for FnResolver<F>
where
    F: FnMut(&str, Value) -> Result<Vec<T>, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    type Frame = T;
    type Error = E;

    fn resolve_frame(&mut self, frame_id: &str, template: Value) -> Result<Vec<T>, E> {
        (self.0)(frame_id, template)
    }
}

/// Resolver that returns each template unchanged as a single frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughResolver;

impl FrameResolver for PassthroughResolver {
    type Frame = Value;
    type Error = Infallible;

    fn resolve_frame(&mut self, _frame_id: &str, template: Value) -> Result<Vec<Value>, Infallible> {
        Ok(vec![template])
    }
}

/// How the condition was chosen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionTrace {
    /// Flat weights fed to the sampler.
    pub weights: Vec<f64>,
    pub roll: f64,
    pub total_weight: f64,
    /// Index of the matching age bracket, if brackets were configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bracket: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_days: Option<f64>,
}

/// Result of a successful expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion<T> {
    pub frames: Vec<T>,
    pub condition: ConditionRecord,
    pub trace: SelectionTrace,
    pub warnings: Warnings,
}

impl<T> Expansion<T> {
    /// Split into the generated frames and the condition record.
    #[must_use]
    pub fn into_parts(self) -> (Vec<T>, ConditionRecord) {
        (self.frames, self.condition)
    }

    /// Store the condition under `frame_id` in a response's condition log.
    pub fn record_into(&self, log: &mut ConditionLog, frame_id: &str) {
        log.insert(frame_id, self.condition.clone());
    }
}

/// Orchestrates a single expansion of one randomized frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameListExpander<'a> {
    frame_id: &'a str,
    config: &'a FrameConfig,
}

impl<'a> FrameListExpander<'a> {
    #[must_use]
    pub const fn new(frame_id: &'a str, config: &'a FrameConfig) -> Self {
        Self { frame_id, config }
    }

    /// Pick a parameter set for `child`.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty parameter-set collection or unusable
    /// weights.
    pub fn select_condition<C, R>(
        &self,
        child: &C,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<(ConditionRecord, SelectionTrace, Warnings), RandomizerError>
    where
        C: ChildRecord + ?Sized,
        R: Rng,
    {
        let sets = &self.config.parameter_sets;
        if sets.is_empty() {
            return Err(RandomizerError::EmptyParameterSets);
        }
        let resolved = resolve_weights(
            self.config.parameter_set_weights.as_ref(),
            sets.len(),
            child,
            now,
        )?;
        let draw = draw_weighted(&resolved.weights, rng)?;
        log::debug!(
            "{}: condition {} of {} (roll {:.3} / {:.3})",
            self.frame_id,
            draw.index,
            sets.len(),
            draw.roll,
            draw.total
        );
        let condition = ConditionRecord {
            condition_num: draw.index,
            parameter_set: sets[draw.index].clone(),
        };
        let trace = SelectionTrace {
            weights: resolved.weights,
            roll: draw.roll,
            total_weight: draw.total,
            bracket: resolved.bracket,
            age_days: resolved.age_days,
        };
        Ok((condition, trace, resolved.warnings))
    }

    /// Run the full expansion with explicit random streams.
    ///
    /// # Errors
    ///
    /// Returns the first configuration, substitution or resolver error; no
    /// frames are returned in that case.
    pub fn expand<F, C, R1, R2>(
        &self,
        resolver: &mut F,
        child: &C,
        now: DateTime<Utc>,
        condition_rng: &mut R1,
        selector_rng: &mut R2,
    ) -> Result<Expansion<F::Frame>, RandomizerError>
    where
        F: FrameResolver + ?Sized,
        C: ChildRecord + ?Sized,
        R1: Rng,
        R2: Rng,
    {
        if self.config.frame_list.is_empty() {
            return Err(RandomizerError::EmptyFrameList);
        }
        let (condition, trace, warnings) = self.select_condition(child, now, condition_rng)?;

        let common = self.config.common_properties();
        let mut permutations = PermutationState::new();
        let mut frames = Vec::new();
        for (index, template) in self.config.frame_list.iter().enumerate() {
            let merged = deep_merge(&common, template);
            let resolved =
                Substituter::new(&condition.parameter_set, &mut permutations, &mut *selector_rng)
                    .substitute(&merged)
                    .map_err(|source| RandomizerError::Template { index, source })?;
            let produced = resolver
                .resolve_frame(self.frame_id, resolved)
                .map_err(|source| RandomizerError::Callback {
                    index,
                    source: Box::new(source),
                })?;
            log::debug!(
                "{}: template {index} produced {} frame(s)",
                self.frame_id,
                produced.len()
            );
            frames.extend(produced);
        }

        Ok(Expansion {
            frames,
            condition,
            trace,
            warnings,
        })
    }
}

/// Generate the concrete frames for a randomized frame.
///
/// `past_sessions` is accepted for hosts that pass session history along; it
/// does not influence the draw.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, a reference cannot be
/// resolved, or the resolver fails.
pub fn generate<P, F, C>(
    frame_id: &str,
    config: &FrameConfig,
    _past_sessions: &[P],
    resolver: &mut F,
    child: &C,
    now: DateTime<Utc>,
    rngs: &mut RngBundle,
) -> Result<Expansion<F::Frame>, RandomizerError>
where
    F: FrameResolver + ?Sized,
    C: ChildRecord + ?Sized,
{
    config.validate()?;
    let (condition_rng, selector_rng) = rngs.split();
    FrameListExpander::new(frame_id, config).expand(resolver, child, now, condition_rng, selector_rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights::BirthDate;
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use serde_json::json;
    use std::fmt;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn config(value: Value) -> FrameConfig {
        serde_json::from_value(value).unwrap()
    }

    #[derive(Debug)]
    struct Refused;

    impl fmt::Display for Refused {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("refused")
        }
    }

    impl std::error::Error for Refused {}

    #[test]
    fn merges_substitutes_and_flattens() {
        let cfg = config(json!({
            "commonFrameProperties": {"kind": "exp-video", "size": 10},
            "frameList": [{"src": "STIM#0"}, {"src": "STIM#1", "kind": "exp-test"}],
            "parameterSets": [{"STIM": ["a", "b"]}]
        }));
        let mut seen_ids = Vec::new();
        let mut resolver = FnResolver(|frame_id: &str, template: Value| {
            seen_ids.push(frame_id.to_string());
            Ok::<_, Refused>(vec![template.clone(), template])
        });
        let mut rngs = RngBundle::from_user_seed(4);
        let expansion = generate::<(), _, _>(
            "trials",
            &cfg,
            &[],
            &mut resolver,
            &BirthDate::Missing,
            now(),
            &mut rngs,
        )
        .unwrap();
        assert_eq!(expansion.frames.len(), 4);
        assert_eq!(
            expansion.frames[0],
            json!({"kind": "exp-video", "size": 10, "src": "a"})
        );
        assert_eq!(
            expansion.frames[3],
            json!({"kind": "exp-test", "size": 10, "src": "b"})
        );
        assert_eq!(seen_ids, vec!["trials", "trials"]);
        assert_eq!(expansion.condition.condition_num, 0);
        assert!(expansion.warnings.is_empty());
    }

    #[test]
    fn uniq_cursor_spans_templates() {
        let cfg = config(json!({
            "frameList": [{"pick": "L#UNIQ"}, {"pick": "L#UNIQ"}, {"pick": "L#UNIQ"}, {"pick": "L#UNIQ"}],
            "parameterSets": [{"L": [1, 2, 3]}]
        }));
        let expander = FrameListExpander::new("uniq", &cfg);
        let mut condition_rng = ChaCha20Rng::seed_from_u64(1);
        let mut selector_rng = ChaCha20Rng::seed_from_u64(2);
        let expansion = expander
            .expand(
                &mut PassthroughResolver,
                &BirthDate::Missing,
                now(),
                &mut condition_rng,
                &mut selector_rng,
            )
            .unwrap();
        let picks: Vec<i64> = expansion
            .frames
            .iter()
            .map(|frame| frame["pick"].as_i64().unwrap())
            .collect();
        let mut first_three = picks[..3].to_vec();
        first_three.sort_unstable();
        assert_eq!(first_three, vec![1, 2, 3]);
        assert_eq!(picks[3], picks[0]);
    }

    #[test]
    fn substitution_errors_report_template_index() {
        let cfg = config(json!({
            "frameList": [{"a": "L#0"}, {"b": ["L#5"]}],
            "parameterSets": [{"L": ["only"]}]
        }));
        let mut rngs = RngBundle::from_user_seed(9);
        let err = generate::<(), _, _>(
            "broken",
            &cfg,
            &[],
            &mut PassthroughResolver,
            &BirthDate::Missing,
            now(),
            &mut rngs,
        )
        .unwrap_err();
        let RandomizerError::Template { index, source } = err else {
            panic!("expected template error, got {err:?}");
        };
        assert_eq!(index, 1);
        assert_eq!(source.path, "/b/0");
    }

    #[test]
    fn resolver_failures_abort_remaining_templates() {
        let cfg = config(json!({
            "frameList": [{"n": 0}, {"n": 1}, {"n": 2}],
            "parameterSets": [{}]
        }));
        let mut calls = 0;
        let mut resolver = FnResolver(|_: &str, template: Value| {
            calls += 1;
            if template["n"] == json!(1) {
                Err(Refused)
            } else {
                Ok(vec![template])
            }
        });
        let mut rngs = RngBundle::from_user_seed(3);
        let err = generate::<(), _, _>(
            "abort",
            &cfg,
            &[],
            &mut resolver,
            &BirthDate::Missing,
            now(),
            &mut rngs,
        )
        .unwrap_err();
        assert!(matches!(err, RandomizerError::Callback { index: 1, .. }));
        assert_eq!(calls, 2);
    }

    #[test]
    fn zero_weights_fail_before_any_template() {
        let cfg = config(json!({
            "frameList": [{}],
            "parameterSets": [{}, {}],
            "parameterSetWeights": [0, 0]
        }));
        let mut rngs = RngBundle::from_user_seed(3);
        let err = generate::<(), _, _>(
            "zero",
            &cfg,
            &[],
            &mut PassthroughResolver,
            &BirthDate::Missing,
            now(),
            &mut rngs,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RandomizerError::Weights(crate::error::WeightError::ZeroTotal)
        ));
    }

    #[test]
    fn condition_is_recorded_under_frame_id() {
        let cfg = config(json!({
            "frameList": [{}],
            "parameterSets": [{"X": 1}, {"X": 2}],
            "parameterSetWeights": [0, 1]
        }));
        let mut rngs = RngBundle::from_user_seed(12);
        let expansion = generate::<(), _, _>(
            "pref",
            &cfg,
            &[],
            &mut PassthroughResolver,
            &BirthDate::Missing,
            now(),
            &mut rngs,
        )
        .unwrap();
        let mut log = ConditionLog::new();
        expansion.record_into(&mut log, "pref");
        assert_eq!(log.get("pref").unwrap().condition_num, 1);
        let (frames, condition) = expansion.into_parts();
        assert_eq!(frames.len(), 1);
        assert_eq!(condition.parameter_set["X"], json!(2));
    }
}
