//! Randomized frame configuration and the per-response condition log.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RandomizerError;
use crate::weights::{WeightSpec, check_count};

/// Named values filling in one session's templates.
pub type ParameterSet = Map<String, Value>;

/// Declarative configuration of a randomized frame sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameConfig {
    /// Properties merged underneath every entry of `frame_list`.
    #[serde(default)]
    pub common_frame_properties: Map<String, Value>,
    pub frame_list: Vec<Value>,
    pub parameter_sets: Vec<ParameterSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_set_weights: Option<WeightSpec>,
}

impl FrameConfig {
    /// Load a frame configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or the configuration is
    /// invalid.
    pub fn from_json(json: &str) -> Result<Self, RandomizerError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the structural invariants that do not depend on the participant.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty frame list, an empty parameter-set
    /// collection, or a weight list (flat or per bracket) whose length differs
    /// from the number of parameter sets.
    pub fn validate(&self) -> Result<(), RandomizerError> {
        if self.frame_list.is_empty() {
            return Err(RandomizerError::EmptyFrameList);
        }
        if self.parameter_sets.is_empty() {
            return Err(RandomizerError::EmptyParameterSets);
        }
        let candidates = self.parameter_sets.len();
        match &self.parameter_set_weights {
            None => {}
            Some(WeightSpec::Flat(weights)) => check_count(weights, candidates)?,
            Some(WeightSpec::Brackets(brackets)) => {
                for (bracket, entry) in brackets.iter().enumerate() {
                    check_count(&entry.weights, candidates)
                        .map_err(|source| RandomizerError::Bracket { bracket, source })?;
                }
            }
        }
        Ok(())
    }

    /// Common properties as a JSON object value.
    #[must_use]
    pub fn common_properties(&self) -> Value {
        Value::Object(self.common_frame_properties.clone())
    }
}

/// Provenance of the parameter set chosen for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionRecord {
    pub condition_num: usize,
    pub parameter_set: ParameterSet,
}

/// Condition records keyed by the id of the randomized frame that produced
/// them, ready to be stored with a response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionLog(BTreeMap<String, ConditionRecord>);

impl ConditionLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the condition for `frame_id`, returning any earlier record.
    pub fn insert(
        &mut self,
        frame_id: impl Into<String>,
        record: ConditionRecord,
    ) -> Option<ConditionRecord> {
        self.0.insert(frame_id.into(), record)
    }

    #[must_use]
    pub fn get(&self, frame_id: &str) -> Option<&ConditionRecord> {
        self.0.get(frame_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConditionRecord)> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
